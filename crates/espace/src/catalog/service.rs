use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::domain::{
    GroupInput, GroupProperty, GroupPropertyView, Property, PropertyInput,
};
use super::repository::PropertyCatalog;
use crate::clock::Clock;
use crate::error::ErrorKind;
use crate::ids::{GroupId, PropertyId, StatusId};
use crate::pagination::{Page, PageRequest};
use crate::storage::RepositoryError;
use crate::validation::ValidationError;

/// Administration of property definitions and the groups that lay them out.
pub struct CatalogService<C> {
    catalog: Arc<C>,
    clock: Arc<dyn Clock>,
}

impl<C> CatalogService<C>
where
    C: PropertyCatalog + 'static,
{
    pub fn new(catalog: Arc<C>, clock: Arc<dyn Clock>) -> Self {
        Self { catalog, clock }
    }

    pub fn catalog(&self) -> Arc<C> {
        self.catalog.clone()
    }

    pub fn create_property(&self, input: PropertyInput) -> Result<Property, CatalogError> {
        validate_property(&input)?;
        let now = self.clock.now();
        let property = Property {
            id: PropertyId::generate(),
            name: input.name.trim().to_string(),
            label: input.label,
            placeholder: input.placeholder,
            kind: input.kind,
            validation: input.validation,
            description: input.description,
            collection_name: input.collection_name,
            active: input.active,
            is_required: input.is_required,
            with_confirmation: input.with_confirmation,
            options: input.options,
            created_at: now,
            updated_at: now,
        };

        let stored = self.catalog.insert_property(property)?;
        tracing::info!(property_id = %stored.id, kind = stored.kind.label(), "property created");
        Ok(stored)
    }

    pub fn update_property(
        &self,
        id: PropertyId,
        input: PropertyInput,
    ) -> Result<Property, CatalogError> {
        validate_property(&input)?;
        let existing = self.property(id)?;
        let property = Property {
            id,
            name: input.name.trim().to_string(),
            label: input.label,
            placeholder: input.placeholder,
            kind: input.kind,
            validation: input.validation,
            description: input.description,
            collection_name: input.collection_name,
            active: input.active,
            is_required: input.is_required,
            with_confirmation: input.with_confirmation,
            options: input.options,
            created_at: existing.created_at,
            updated_at: self.clock.now(),
        };

        Ok(self.catalog.replace_property(property)?)
    }

    pub fn property(&self, id: PropertyId) -> Result<Property, CatalogError> {
        self.catalog
            .property(&id)?
            .ok_or_else(|| CatalogError::NotFound {
                resource: "property",
                id: id.to_string(),
            })
    }

    pub fn list_properties(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Property>, CatalogError> {
        Ok(self.catalog.search_properties(search, page)?)
    }

    pub fn create_group(&self, input: GroupInput) -> Result<GroupPropertyView, CatalogError> {
        self.validate_group(&input)?;
        let now = self.clock.now();
        let group = GroupProperty {
            id: GroupId::generate(),
            name: input.name.trim().to_string(),
            description: input.description,
            step: input.step,
            group_type: input.group_type,
            active: input.active,
            members: input.members,
            read_statuses: input.read_statuses,
            write_statuses: input.write_statuses,
            created_at: now,
            updated_at: now,
        };

        let stored = self.catalog.insert_group(group)?;
        tracing::info!(group_id = %stored.id, members = stored.members.len(), "group created");
        self.view(stored, false)
    }

    pub fn update_group(
        &self,
        id: GroupId,
        input: GroupInput,
    ) -> Result<GroupPropertyView, CatalogError> {
        self.validate_group(&input)?;
        let existing = self.stored_group(id)?;
        let group = GroupProperty {
            id,
            name: input.name.trim().to_string(),
            description: input.description,
            step: input.step,
            group_type: input.group_type,
            active: input.active,
            members: input.members,
            read_statuses: input.read_statuses,
            write_statuses: input.write_statuses,
            created_at: existing.created_at,
            updated_at: self.clock.now(),
        };

        let stored = self.catalog.replace_group(group)?;
        self.view(stored, false)
    }

    pub fn group(&self, id: GroupId) -> Result<GroupPropertyView, CatalogError> {
        let group = self.stored_group(id)?;
        self.view(group, false)
    }

    pub fn delete_group(&self, id: GroupId) -> Result<(), CatalogError> {
        self.catalog.remove_group(&id).map_err(|err| match err {
            RepositoryError::NotFound => CatalogError::NotFound {
                resource: "group",
                id: id.to_string(),
            },
            other => CatalogError::Repository(other),
        })
    }

    /// Active groups of a form type, ordered by step and then name.
    pub fn groups(
        &self,
        group_type: Option<u32>,
        step: Option<u32>,
    ) -> Result<Vec<GroupPropertyView>, CatalogError> {
        let groups = self
            .sorted_groups(group_type)?
            .into_iter()
            .filter(|group| step.map_or(true, |wanted| group.step == wanted));

        groups.map(|group| self.view(group, false)).collect()
    }

    /// Groups a record in `status` may show. Readable-only groups come back disabled.
    pub fn groups_for_status(
        &self,
        status: &StatusId,
        group_type: Option<u32>,
    ) -> Result<Vec<GroupPropertyView>, CatalogError> {
        let groups = self
            .sorted_groups(group_type)?
            .into_iter()
            .filter(|group| group.readable_in(status));

        groups
            .map(|group| {
                let disabled = !group.writable_in(status);
                self.view(group, disabled)
            })
            .collect()
    }

    fn sorted_groups(&self, group_type: Option<u32>) -> Result<Vec<GroupProperty>, CatalogError> {
        let mut groups: Vec<GroupProperty> = self
            .catalog
            .groups(group_type)?
            .into_iter()
            .filter(|group| group.active)
            .collect();
        groups.sort_by(|a, b| a.step.cmp(&b.step).then_with(|| a.name.cmp(&b.name)));
        Ok(groups)
    }

    fn stored_group(&self, id: GroupId) -> Result<GroupProperty, CatalogError> {
        self.catalog
            .group(&id)?
            .ok_or_else(|| CatalogError::NotFound {
                resource: "group",
                id: id.to_string(),
            })
    }

    fn validate_group(&self, input: &GroupInput) -> Result<(), CatalogError> {
        if input.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name").into());
        }

        let mut orders = HashSet::new();
        let mut members = HashSet::new();
        for member in &input.members {
            if !orders.insert(member.order) {
                return Err(ValidationError::DuplicateOrder(member.order).into());
            }
            if !members.insert(member.property_id) {
                return Err(ValidationError::DuplicateMember(member.property_id.to_string()).into());
            }
        }

        let ids: Vec<PropertyId> = input.members.iter().map(|m| m.property_id).collect();
        let known: HashSet<PropertyId> = self
            .catalog
            .properties(&ids)?
            .into_iter()
            .map(|property| property.id)
            .collect();
        if let Some(missing) = ids.iter().find(|id| !known.contains(id)) {
            return Err(CatalogError::UnknownProperty(*missing));
        }

        Ok(())
    }

    fn view(
        &self,
        group: GroupProperty,
        is_disabled: bool,
    ) -> Result<GroupPropertyView, CatalogError> {
        let members = group.ordered_members();
        let ids: Vec<PropertyId> = members.iter().map(|member| member.property_id).collect();
        let mut definitions: HashMap<PropertyId, Property> = self
            .catalog
            .properties(&ids)?
            .into_iter()
            .map(|property| (property.id, property))
            .collect();

        let mut properties = Vec::with_capacity(members.len());
        for member in members {
            match definitions.remove(&member.property_id) {
                Some(property) => properties.push(property),
                None => tracing::debug!(
                    group_id = %group.id,
                    property_id = %member.property_id,
                    "group member without definition skipped"
                ),
            }
        }

        Ok(GroupPropertyView {
            id: group.id,
            name: group.name,
            description: group.description,
            step: group.step,
            group_type: group.group_type,
            is_disabled,
            properties,
        })
    }
}

fn validate_property(input: &PropertyInput) -> Result<(), ValidationError> {
    if input.name.trim().is_empty() {
        return Err(ValidationError::EmptyField("name"));
    }
    if input.kind.needs_options() && input.options.is_empty() {
        return Err(ValidationError::MissingOptions(input.kind.label()));
    }
    if input.options.iter().any(|option| option.name.trim().is_empty()) {
        return Err(ValidationError::EmptyField("property_options.name"));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("group references unknown property {0}")]
    UnknownProperty(PropertyId),
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Validation(_) | CatalogError::UnknownProperty(_) => ErrorKind::Validation,
            CatalogError::NotFound { .. } => ErrorKind::NotFound,
            CatalogError::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,
            CatalogError::Repository(RepositoryError::Conflict) => ErrorKind::Conflict,
            CatalogError::Repository(RepositoryError::Unavailable(_)) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::domain::{GroupMember, PropertyKind, PropertyOption};
    use crate::catalog::memory::InMemoryPropertyCatalog;
    use crate::clock::SystemClock;

    fn service() -> CatalogService<InMemoryPropertyCatalog> {
        CatalogService::new(
            Arc::new(InMemoryPropertyCatalog::default()),
            Arc::new(SystemClock),
        )
    }

    fn text(name: &str) -> PropertyInput {
        PropertyInput {
            name: name.to_string(),
            label: name.to_uppercase(),
            placeholder: String::new(),
            kind: PropertyKind::Text,
            validation: String::new(),
            description: String::new(),
            collection_name: String::new(),
            active: true,
            is_required: false,
            with_confirmation: false,
            options: Vec::new(),
        }
    }

    fn group(name: &str, members: Vec<GroupMember>) -> GroupInput {
        GroupInput {
            name: name.to_string(),
            description: String::new(),
            step: 1,
            group_type: 1,
            active: true,
            members,
            read_statuses: Vec::new(),
            write_statuses: Vec::new(),
        }
    }

    #[test]
    fn select_properties_need_options() {
        let service = service();
        let mut input = text("land_use");
        input.kind = PropertyKind::Select;

        match service.create_property(input.clone()) {
            Err(CatalogError::Validation(ValidationError::MissingOptions("select"))) => {}
            other => panic!("expected missing options, got {other:?}"),
        }

        input.options.push(PropertyOption {
            name: "Residential".to_string(),
            value: "residential".to_string(),
        });
        let stored = service.create_property(input).expect("select with options");
        assert_eq!(stored.options.len(), 1);
    }

    #[test]
    fn group_view_orders_members_by_order_field() {
        let service = service();
        let area = service.create_property(text("area")).expect("area");
        let floors = service.create_property(text("floors")).expect("floors");
        let owner = service.create_property(text("owner")).expect("owner");

        let view = service
            .create_group(group(
                "Building",
                vec![
                    GroupMember { property_id: owner.id, order: 30 },
                    GroupMember { property_id: area.id, order: 10 },
                    GroupMember { property_id: floors.id, order: 20 },
                ],
            ))
            .expect("group created");

        let names: Vec<&str> = view.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["area", "floors", "owner"]);
    }

    #[test]
    fn group_rejects_duplicate_orders_and_unknown_members() {
        let service = service();
        let area = service.create_property(text("area")).expect("area");
        let floors = service.create_property(text("floors")).expect("floors");

        let duplicate = service.create_group(group(
            "Building",
            vec![
                GroupMember { property_id: area.id, order: 1 },
                GroupMember { property_id: floors.id, order: 1 },
            ],
        ));
        assert!(matches!(
            duplicate,
            Err(CatalogError::Validation(ValidationError::DuplicateOrder(1)))
        ));

        let ghost = PropertyId::generate();
        let unknown = service.create_group(group(
            "Building",
            vec![GroupMember { property_id: ghost, order: 1 }],
        ));
        match unknown {
            Err(CatalogError::UnknownProperty(id)) => assert_eq!(id, ghost),
            other => panic!("expected unknown property, got {other:?}"),
        }
    }

    #[test]
    fn groups_for_status_disable_read_only_groups() {
        let service = service();
        let area = service.create_property(text("area")).expect("area");
        let review = StatusId::generate();
        let other = StatusId::generate();

        let mut editable = group("Editable", vec![GroupMember { property_id: area.id, order: 1 }]);
        editable.write_statuses.push(review);
        let mut readonly = group("Readonly", Vec::new());
        readonly.read_statuses.push(review);
        let mut hidden = group("Hidden", Vec::new());
        hidden.read_statuses.push(other);

        service.create_group(editable).expect("editable");
        service.create_group(readonly).expect("readonly");
        service.create_group(hidden).expect("hidden");

        let views = service
            .groups_for_status(&review, Some(1))
            .expect("groups load");
        let flags: Vec<(&str, bool)> = views
            .iter()
            .map(|view| (view.name.as_str(), view.is_disabled))
            .collect();
        assert_eq!(flags, vec![("Editable", false), ("Readonly", true)]);
    }

    #[test]
    fn deleting_missing_group_is_not_found() {
        let service = service();
        let error = service
            .delete_group(GroupId::generate())
            .expect_err("nothing to delete");
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }
}
