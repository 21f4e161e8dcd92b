use super::domain::{GroupProperty, Property};
use crate::ids::{GroupId, PropertyId};
use crate::pagination::{Page, PageRequest};
use crate::storage::RepositoryError;

/// Storage for property definitions and their groups.
pub trait PropertyCatalog: Send + Sync {
    fn insert_property(&self, property: Property) -> Result<Property, RepositoryError>;
    fn replace_property(&self, property: Property) -> Result<Property, RepositoryError>;
    fn property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError>;
    /// Batch lookup; ids without a definition are simply absent from the result.
    fn properties(&self, ids: &[PropertyId]) -> Result<Vec<Property>, RepositoryError>;
    /// Case-insensitive search over name and label, newest first.
    fn search_properties(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Property>, RepositoryError>;

    fn insert_group(&self, group: GroupProperty) -> Result<GroupProperty, RepositoryError>;
    fn replace_group(&self, group: GroupProperty) -> Result<GroupProperty, RepositoryError>;
    fn group(&self, id: &GroupId) -> Result<Option<GroupProperty>, RepositoryError>;
    fn remove_group(&self, id: &GroupId) -> Result<(), RepositoryError>;
    fn groups(&self, group_type: Option<u32>) -> Result<Vec<GroupProperty>, RepositoryError>;
}
