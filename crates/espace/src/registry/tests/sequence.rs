use std::collections::HashSet;
use std::sync::Arc;

use super::common::*;
use crate::error::ErrorKind;
use crate::registry::sequence::{NumberPrefix, RegistryNumber, SequenceGenerator};
use crate::registry::service::ServiceError;
use crate::validation::ValidationError;

#[test]
fn registry_numbers_render_prefix_region_and_sequence() {
    let number = RegistryNumber {
        prefix: NumberPrefix::Draft,
        soato: REGION,
        sequence: 4,
    };

    assert_eq!(number.to_string(), "T1703-4");
    assert_eq!("T1703-4".parse::<RegistryNumber>(), Ok(number));
}

#[test]
fn malformed_registry_numbers_are_rejected() {
    for raw in ["", "B", "X1703-1", "B1703", "B1703-", "B17a3-1", "B-1", "B1703-1-2"] {
        match raw.parse::<RegistryNumber>() {
            Err(ValidationError::InvalidNumber(value)) => assert_eq!(value, raw),
            other => panic!("expected invalid number for {raw:?}, got {other:?}"),
        }
    }
}

#[test]
fn generator_counts_each_prefix_and_region_separately() {
    let harness = Harness::new();
    let generator = SequenceGenerator::new(harness.store.clone());

    let first = generator.next(NumberPrefix::Entity, REGION).expect("number");
    let second = generator.next(NumberPrefix::Entity, REGION).expect("number");
    let draft = generator.next(NumberPrefix::Draft, REGION).expect("number");
    let elsewhere = generator.next(NumberPrefix::Entity, OTHER_REGION).expect("number");

    assert_eq!(first.to_string(), "B1703-1");
    assert_eq!(second.to_string(), "B1703-2");
    assert_eq!(draft.to_string(), "T1703-1");
    assert_eq!(elsewhere.to_string(), "B1726-1");
}

#[test]
fn first_entities_in_a_region_are_numbered_from_one() {
    let harness = Harness::new();

    let first = harness
        .entities
        .create(&staff(), entity_submission(REGION))
        .expect("first entity");
    let second = harness
        .entities
        .create(&staff(), entity_submission(REGION))
        .expect("second entity");

    assert_eq!(first.entity_number.to_string(), "B1703-1");
    assert_eq!(second.entity_number.to_string(), "B1703-2");
    assert_eq!(first.entity_soato, REGION);
}

#[test]
fn sequential_creations_use_every_number_once() {
    let harness = Harness::new();

    let sequences: Vec<u64> = (0..25)
        .map(|_| {
            harness
                .entities
                .create(&staff(), entity_submission(REGION))
                .expect("entity")
                .entity_number
                .sequence
        })
        .collect();

    assert_eq!(sequences, (1..=25).collect::<Vec<u64>>());
}

#[test]
fn concurrent_creations_never_share_a_number() {
    let harness = Harness::new();
    let service = harness.entities.clone();

    let numbers: Vec<String> = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                scope.spawn(move || {
                    (0..10)
                        .map(|_| {
                            service
                                .create(&staff(), entity_submission(REGION))
                                .expect("entity")
                                .entity_number
                                .to_string()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        workers
            .into_iter()
            .flat_map(|worker| worker.join().expect("worker thread"))
            .collect()
    });

    let unique: HashSet<&String> = numbers.iter().collect();
    assert_eq!(numbers.len(), 80);
    assert_eq!(unique.len(), 80);
    assert_eq!(harness.store.entity_count().expect("count"), 80);
}

#[test]
fn stale_counter_collision_is_retried_with_a_fresh_number() {
    // The scripted store hands out "1" twice: once for the first entity and once,
    // stale, for the second.
    let harness = Harness::with_sequences(|store| ScriptedSequences::new(store, vec![1, 1]));

    let first = harness
        .entities
        .create(&staff(), entity_submission(REGION))
        .expect("first entity");
    let second = harness
        .entities
        .create(&staff(), entity_submission(REGION))
        .expect("second entity");

    assert_eq!(first.entity_number.to_string(), "B1703-1");
    assert_eq!(second.entity_number.to_string(), "B1703-2");
    assert_eq!(harness.store.entity_count().expect("count"), 2);
}

#[test]
fn exhausted_retries_surface_a_retryable_conflict() {
    let harness = Harness::with_sequences(|_| FrozenSequences(7));

    harness
        .entities
        .create(&staff(), entity_submission(REGION))
        .expect("first entity takes the frozen number");

    match harness.entities.create(&staff(), entity_submission(REGION)) {
        Err(error @ ServiceError::SequenceExhausted { .. }) => {
            assert_eq!(error.kind(), ErrorKind::Conflict);
            assert!(error.is_retryable());
        }
        other => panic!("expected exhausted sequence, got {other:?}"),
    }
    assert_eq!(harness.store.entity_count().expect("count"), 1);
}

#[test]
fn drafts_are_numbered_by_district_region() {
    let harness = Harness::new();

    let draft = harness
        .drafts
        .create(&applicant(), draft_submission(REGION))
        .expect("draft");

    assert_eq!(draft.entity_draft_number.to_string(), "T1703-1");
    assert_eq!(draft.entity_draft_soato, REGION);
}

#[test]
fn missing_district_soato_is_rejected_before_numbering() {
    let harness = Harness::new();
    let mut submission = entity_submission(REGION);
    submission.location.district.soato = crate::geography::Soato(0);

    match harness.entities.create(&staff(), submission) {
        Err(ServiceError::Validation(ValidationError::MissingSoato)) => {}
        other => panic!("expected missing soato, got {other:?}"),
    }

    let next = SequenceGenerator::new(harness.store.clone())
        .next(NumberPrefix::Entity, REGION)
        .expect("number");
    assert_eq!(next.sequence, 1);
}
