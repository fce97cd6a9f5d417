//! Record, schema and grant types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// A JSON-compatible scalar stored on a record.
pub type FieldValue = serde_json::Value;

/// Name of the implicit primary key field.
pub const PK_FIELD: &str = "pk";

/// Field holding the public discoverability flag.
pub const DISCOVERABLE_FIELD: &str = "discoverable_when_public";

/// Reference field linking a resource to its parent collection.
pub const PARENT_FIELD: &str = "parent";

/// Native record identifier.
///
/// Identifiers are only unique within a content type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectId {
    Int(i64),
    Text(String),
}

impl ObjectId {
    /// Coerces a textual identifier to the same representation as `self`.
    ///
    /// `self` acts as the sample element that fixes the native type.
    pub fn coerce_like(&self, raw: &str) -> StorageResult<ObjectId> {
        match self {
            ObjectId::Int(_) => raw.trim().parse::<i64>().map(ObjectId::Int).map_err(|_| {
                StorageError::IdentifierCoercion {
                    value: raw.to_string(),
                    expected: "integer",
                }
            }),
            ObjectId::Text(_) => Ok(ObjectId::Text(raw.to_string())),
        }
    }

    /// Reads an identifier out of a stored reference value.
    pub fn from_value(value: &FieldValue) -> Option<ObjectId> {
        match value {
            FieldValue::Number(n) => n.as_i64().map(ObjectId::Int),
            FieldValue::String(s) => Some(ObjectId::Text(s.clone())),
            _ => None,
        }
    }

    /// Converts the identifier into a storable value.
    pub fn to_value(&self) -> FieldValue {
        match self {
            ObjectId::Int(i) => FieldValue::from(*i),
            ObjectId::Text(s) => FieldValue::from(s.as_str()),
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectId::Int(i) => write!(f, "{i}"),
            ObjectId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for ObjectId {
    fn from(value: i64) -> Self {
        ObjectId::Int(value)
    }
}

impl From<i32> for ObjectId {
    fn from(value: i32) -> Self {
        ObjectId::Int(i64::from(value))
    }
}

impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        ObjectId::Text(value.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(value: String) -> Self {
        ObjectId::Text(value)
    }
}

/// Kind of a declared field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    Integer,
    Bool,
    Json,
    /// Reference to a record of another content type.
    Reference { target: String },
}

/// A declared field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDef {
    /// Returns the referenced content type for reference fields.
    pub fn target(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Reference { target } => Some(target),
            _ => None,
        }
    }
}

/// Where a content type carries an optional access concept.
///
/// Discoverability and subscriptions may live on the resource itself, on
/// its parent collection, or not exist at all for the type. Consumers query
/// the capability before building a filter instead of probing for fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Capability {
    OnSelf,
    OnParent,
    #[default]
    Absent,
}

/// Schema of a content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub app_label: String,
    pub content_type: String,
    pub fields: Vec<FieldDef>,
    pub discoverability: Capability,
    pub subscriptions: Capability,
}

impl Schema {
    /// Creates a schema with no fields and no capabilities.
    pub fn new(app_label: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            app_label: app_label.into(),
            content_type: content_type.into(),
            fields: Vec::new(),
            discoverability: Capability::Absent,
            subscriptions: Capability::Absent,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            kind,
        });
        self
    }

    pub fn with_reference(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.with_field(
            name,
            FieldKind::Reference {
                target: target.into(),
            },
        )
    }

    pub fn with_discoverability(mut self, capability: Capability) -> Self {
        self.discoverability = capability;
        self
    }

    pub fn with_subscriptions(mut self, capability: Capability) -> Self {
        self.subscriptions = capability;
        self
    }

    /// Looks up a declared field. The implicit `pk` field is not listed.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns true if the field exists, including the implicit `pk`.
    pub fn has_field(&self, name: &str) -> bool {
        name == PK_FIELD || self.field(name).is_some()
    }

    /// The permission that grants read access to records of this type.
    pub fn view_permission(&self) -> String {
        format!("{}.view_{}", self.app_label, self.content_type)
    }

    /// The parent reference field, if the type has one.
    pub fn parent_field(&self) -> Option<&FieldDef> {
        self.field(PARENT_FIELD).filter(|f| f.target().is_some())
    }

    /// Returns the single reference field pointing at `target`.
    ///
    /// Zero or several such fields violate the structural precondition of
    /// parent/child filtering.
    pub fn reference_to(&self, target: &str) -> StorageResult<&FieldDef> {
        let mut matches = self.fields.iter().filter(|f| f.target() == Some(target));
        match (matches.next(), matches.next()) {
            (Some(field), None) => Ok(field),
            (None, _) => Err(StorageError::StructuralPrecondition {
                message: format!(
                    "content type '{}' has no reference to '{}'",
                    self.content_type, target
                ),
            }),
            (Some(_), Some(_)) => Err(StorageError::StructuralPrecondition {
                message: format!(
                    "content type '{}' has several references to '{}'",
                    self.content_type, target
                ),
            }),
        }
    }

    /// Checks that declared capabilities are backed by the fields they need.
    pub fn check_capabilities(&self) -> StorageResult<()> {
        if self.discoverability == Capability::OnSelf
            && self.field(DISCOVERABLE_FIELD).map(|f| &f.kind) != Some(&FieldKind::Bool)
        {
            return Err(StorageError::StructuralPrecondition {
                message: format!(
                    "content type '{}' declares discoverability without a boolean '{}' field",
                    self.content_type, DISCOVERABLE_FIELD
                ),
            });
        }
        let needs_parent = self.discoverability == Capability::OnParent
            || self.subscriptions == Capability::OnParent;
        if needs_parent && self.parent_field().is_none() {
            return Err(StorageError::StructuralPrecondition {
                message: format!(
                    "content type '{}' delegates to its parent without a '{}' reference",
                    self.content_type, PARENT_FIELD
                ),
            });
        }
        Ok(())
    }
}

/// A stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub pk: ObjectId,
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(pk: impl Into<ObjectId>) -> Self {
        Self {
            pk: pk.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Sets a field value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Reads a field value; `pk` resolves to the primary key.
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        if name == PK_FIELD {
            return Some(self.pk.to_value());
        }
        self.fields.get(name).cloned()
    }

    /// Reads a reference field as an identifier. Null references yield `None`.
    pub fn reference(&self, name: &str) -> Option<ObjectId> {
        self.fields.get(name).and_then(ObjectId::from_value)
    }
}

/// An explicit permission assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub id: i64,
    pub content_type: String,
    pub object_id: ObjectId,
    pub user: String,
    pub permission: String,
}
