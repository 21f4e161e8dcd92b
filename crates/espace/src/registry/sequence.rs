//! Per-region registry numbering.
//!
//! Numbers read `<prefix><soato>-<sequence>`: `B1703-12` is the twelfth entity of region
//! 1703 and `T1703-4` its fourth draft. The counter behind each `(prefix, soato)` scope
//! lives in the persistence engine and is advanced atomically; repositories additionally
//! reject a duplicate `(soato, number)` so a stale counter surfaces as a conflict instead
//! of a silently reused number.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::geography::Soato;
use crate::storage::RepositoryError;
use crate::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumberPrefix {
    Entity,
    Draft,
}

impl NumberPrefix {
    pub fn letter(self) -> char {
        match self {
            NumberPrefix::Entity => 'B',
            NumberPrefix::Draft => 'T',
        }
    }

    fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'B' => Some(NumberPrefix::Entity),
            'T' => Some(NumberPrefix::Draft),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceScope {
    pub prefix: NumberPrefix,
    pub soato: Soato,
}

impl SequenceScope {
    pub fn new(prefix: NumberPrefix, soato: Soato) -> Self {
        Self { prefix, soato }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistryNumber {
    pub prefix: NumberPrefix,
    pub soato: Soato,
    pub sequence: u64,
}

impl RegistryNumber {
    pub fn scope(&self) -> SequenceScope {
        SequenceScope::new(self.prefix, self.soato)
    }
}

impl fmt::Display for RegistryNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}-{}", self.prefix.letter(), self.soato, self.sequence)
    }
}

impl FromStr for RegistryNumber {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidNumber(value.to_string());
        let mut chars = value.chars();
        let prefix = chars
            .next()
            .and_then(NumberPrefix::from_letter)
            .ok_or_else(invalid)?;
        let (soato, sequence) = chars.as_str().split_once('-').ok_or_else(invalid)?;
        let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(soato) || !all_digits(sequence) {
            return Err(invalid());
        }

        Ok(Self {
            prefix,
            soato: soato.parse().map_err(|_| invalid())?,
            sequence: sequence.parse().map_err(|_| invalid())?,
        })
    }
}

impl Serialize for RegistryNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RegistryNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Atomic per-scope counter provided by the persistence engine.
pub trait SequenceStore: Send + Sync {
    /// Advance the counter for `scope` and return the new value. The first call for a
    /// scope continues from the numbers already stored in it.
    fn next_value(&self, scope: SequenceScope) -> Result<u64, RepositoryError>;
}

#[derive(Clone)]
pub struct SequenceGenerator {
    store: Arc<dyn SequenceStore>,
}

impl SequenceGenerator {
    pub fn new(store: Arc<dyn SequenceStore>) -> Self {
        Self { store }
    }

    pub fn next(&self, prefix: NumberPrefix, soato: Soato) -> Result<RegistryNumber, RepositoryError> {
        let sequence = self.store.next_value(SequenceScope::new(prefix, soato))?;
        Ok(RegistryNumber {
            prefix,
            soato,
            sequence,
        })
    }
}

impl fmt::Debug for SequenceGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceGenerator").finish_non_exhaustive()
    }
}
