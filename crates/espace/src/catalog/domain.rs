use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{GroupId, PropertyId, StatusId};

/// Input widget a property is rendered with. Stored values stay plain strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Text,
    Textarea,
    Number,
    Date,
    Select,
    Radio,
    Checkbox,
    File,
}

impl PropertyKind {
    pub fn label(self) -> &'static str {
        match self {
            PropertyKind::Text => "text",
            PropertyKind::Textarea => "textarea",
            PropertyKind::Number => "number",
            PropertyKind::Date => "date",
            PropertyKind::Select => "select",
            PropertyKind::Radio => "radio",
            PropertyKind::Checkbox => "checkbox",
            PropertyKind::File => "file",
        }
    }

    pub fn needs_options(self) -> bool {
        matches!(
            self,
            PropertyKind::Select | PropertyKind::Radio | PropertyKind::Checkbox
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyOption {
    pub name: String,
    pub value: String,
}

/// A typed field definition referenced by id from entities and drafts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub name: String,
    pub label: String,
    pub placeholder: String,
    #[serde(rename = "type")]
    pub kind: PropertyKind,
    pub validation: String,
    pub description: String,
    pub collection_name: String,
    #[serde(rename = "status")]
    pub active: bool,
    pub is_required: bool,
    pub with_confirmation: bool,
    #[serde(rename = "property_options")]
    pub options: Vec<PropertyOption>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyInput {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub placeholder: String,
    #[serde(rename = "type")]
    pub kind: PropertyKind,
    #[serde(default)]
    pub validation: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub collection_name: String,
    #[serde(rename = "status", default = "enabled")]
    pub active: bool,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub with_confirmation: bool,
    #[serde(rename = "property_options", default)]
    pub options: Vec<PropertyOption>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub property_id: PropertyId,
    pub order: u32,
}

/// Ordered set of properties shown together on one step of a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupProperty {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub step: u32,
    pub group_type: u32,
    pub active: bool,
    pub members: Vec<GroupMember>,
    pub read_statuses: Vec<StatusId>,
    pub write_statuses: Vec<StatusId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GroupProperty {
    pub fn readable_in(&self, status: &StatusId) -> bool {
        self.read_statuses.contains(status) || self.writable_in(status)
    }

    pub fn writable_in(&self, status: &StatusId) -> bool {
        self.write_statuses.contains(status)
    }

    /// Members sorted by their explicit order.
    pub fn ordered_members(&self) -> Vec<GroupMember> {
        let mut members = self.members.clone();
        members.sort_by_key(|member| member.order);
        members
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub step: u32,
    #[serde(default)]
    pub group_type: u32,
    #[serde(rename = "status", default = "enabled")]
    pub active: bool,
    #[serde(rename = "properties", default)]
    pub members: Vec<GroupMember>,
    #[serde(default)]
    pub read_statuses: Vec<StatusId>,
    #[serde(default)]
    pub write_statuses: Vec<StatusId>,
}

/// A group with its property definitions joined in member order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupPropertyView {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub step: u32,
    pub group_type: u32,
    pub is_disabled: bool,
    pub properties: Vec<Property>,
}
