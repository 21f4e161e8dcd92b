use std::collections::HashMap;
use std::sync::Mutex;

use super::domain::{GroupProperty, Property};
use super::repository::PropertyCatalog;
use crate::ids::{GroupId, PropertyId};
use crate::pagination::{Page, PageRequest};
use crate::storage::{lock, RepositoryError};

#[derive(Debug, Default)]
struct CatalogState {
    properties: HashMap<PropertyId, Property>,
    groups: HashMap<GroupId, GroupProperty>,
}

/// Property catalog kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryPropertyCatalog {
    state: Mutex<CatalogState>,
}

impl PropertyCatalog for InMemoryPropertyCatalog {
    fn insert_property(&self, property: Property) -> Result<Property, RepositoryError> {
        let mut state = lock(&self.state)?;
        if state.properties.contains_key(&property.id) {
            return Err(RepositoryError::Conflict);
        }
        state.properties.insert(property.id, property.clone());
        Ok(property)
    }

    fn replace_property(&self, property: Property) -> Result<Property, RepositoryError> {
        let mut state = lock(&self.state)?;
        match state.properties.get_mut(&property.id) {
            Some(slot) => {
                *slot = property.clone();
                Ok(property)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        Ok(lock(&self.state)?.properties.get(id).cloned())
    }

    fn properties(&self, ids: &[PropertyId]) -> Result<Vec<Property>, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(ids
            .iter()
            .filter_map(|id| state.properties.get(id).cloned())
            .collect())
    }

    fn search_properties(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Property>, RepositoryError> {
        let needle = search
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty());

        let mut matches: Vec<Property> = lock(&self.state)?
            .properties
            .values()
            .filter(|property| match &needle {
                Some(needle) => {
                    property.name.to_lowercase().contains(needle)
                        || property.label.to_lowercase().contains(needle)
                }
                None => true,
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.name.cmp(&b.name)));

        Ok(page.window(matches))
    }

    fn insert_group(&self, group: GroupProperty) -> Result<GroupProperty, RepositoryError> {
        let mut state = lock(&self.state)?;
        if state.groups.contains_key(&group.id) {
            return Err(RepositoryError::Conflict);
        }
        state.groups.insert(group.id, group.clone());
        Ok(group)
    }

    fn replace_group(&self, group: GroupProperty) -> Result<GroupProperty, RepositoryError> {
        let mut state = lock(&self.state)?;
        match state.groups.get_mut(&group.id) {
            Some(slot) => {
                *slot = group.clone();
                Ok(group)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn group(&self, id: &GroupId) -> Result<Option<GroupProperty>, RepositoryError> {
        Ok(lock(&self.state)?.groups.get(id).cloned())
    }

    fn remove_group(&self, id: &GroupId) -> Result<(), RepositoryError> {
        lock(&self.state)?
            .groups
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn groups(&self, group_type: Option<u32>) -> Result<Vec<GroupProperty>, RepositoryError> {
        Ok(lock(&self.state)?
            .groups
            .values()
            .filter(|group| group_type.map_or(true, |wanted| group.group_type == wanted))
            .cloned()
            .collect())
    }
}
