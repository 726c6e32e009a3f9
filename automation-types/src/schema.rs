//! Connection-type schemas: which connection fields exist and which are secret.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub is_encrypted: bool,
    pub is_optional: bool,
    pub field_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTypeSchema {
    pub name: String,
    pub fields: BTreeMap<String, FieldDefinition>,
}

impl ConnectionTypeSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>, definition: FieldDefinition) -> Self {
        self.fields.insert(field.into(), definition);
        self
    }
}

/// Lookup from connection-type name to schema.
#[derive(Clone, Debug, Default)]
pub struct ConnectionTypeSchemas {
    types: HashMap<String, ConnectionTypeSchema>,
}

impl ConnectionTypeSchemas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, schema: ConnectionTypeSchema) {
        self.types.insert(schema.name.clone(), schema);
    }

    pub fn get(&self, connection_type: &str) -> Option<&ConnectionTypeSchema> {
        self.types.get(connection_type)
    }

    /// Whether a connection field holds a secret. Unknown types and unknown
    /// fields are treated as secret.
    pub fn is_field_encrypted(&self, connection_type: &str, field: &str) -> bool {
        self.types
            .get(connection_type)
            .and_then(|schema| schema.fields.get(field))
            .is_none_or(|definition| definition.is_encrypted)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl FromIterator<ConnectionTypeSchema> for ConnectionTypeSchemas {
    fn from_iter<I: IntoIterator<Item = ConnectionTypeSchema>>(iter: I) -> Self {
        let mut schemas = Self::new();
        for schema in iter {
            schemas.insert(schema);
        }
        schemas
    }
}
