//! Property catalog: typed field definitions and the ordered groups that lay them
//! out on registration forms.

pub mod domain;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    GroupInput, GroupMember, GroupProperty, GroupPropertyView, Property, PropertyInput,
    PropertyKind, PropertyOption,
};
pub use memory::InMemoryPropertyCatalog;
pub use repository::PropertyCatalog;
pub use router::catalog_router;
pub use service::{CatalogError, CatalogService};
