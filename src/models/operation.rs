//! Operation descriptor models.
//!
//! This module defines the structured request an agent sends to the
//! `database_query` tool, and the scalar values it may carry.

use crate::error::ValidationError;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// CRUD action requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    Find,
    Create,
    Update,
    Delete,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for OperationType {
    type Err = ValidationError;

    /// Case-insensitive; anything else is `InvalidOperationType`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "find" => Ok(Self::Find),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(ValidationError::InvalidOperationType),
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar value bound to a statement parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ScalarValue {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
}

impl ScalarValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(v) => f.write_str(v),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Input for the `database_query` tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct OperationDescriptor {
    /// Name of the table to interact with (e.g., 'Reservations', 'Rooms')
    pub table_name: String,
    /// Type of operation to execute ('find', 'create', 'update', 'delete')
    pub operation_type: String,
    /// Column name to filter on (used for 'find', 'update', 'delete')
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_key: Option<String>,
    /// Value to match for the filter_key
    #[schemars(with = "Option<ScalarValue>")]
    #[serde(
        default,
        deserialize_with = "deserialize_filter_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub filter_value: Option<String>,
    /// Data for 'create' or 'update' operations as a column-to-value mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, ScalarValue>>,
}

impl OperationDescriptor {
    pub fn new(table_name: impl Into<String>, operation_type: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            operation_type: operation_type.into(),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter_key = Some(key.into());
        self.filter_value = Some(value.into());
        self
    }

    pub fn with_data(mut self, column: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.data
            .get_or_insert_with(BTreeMap::new)
            .insert(column.into(), value.into());
        self
    }

    /// Filter pair, if both halves are present and non-empty.
    pub fn filter(&self) -> Option<(&str, &str)> {
        let key = self.filter_key.as_deref().filter(|k| !k.is_empty())?;
        let value = self.filter_value.as_deref().filter(|v| !v.is_empty())?;
        Some((key, value))
    }

    /// Data mapping, if present and non-empty.
    pub fn data(&self) -> Option<&BTreeMap<String, ScalarValue>> {
        self.data.as_ref().filter(|d| !d.is_empty())
    }
}

/// Agents often send numeric filter values unquoted; accept any scalar and
/// keep its text form. `null` counts as absent.
fn deserialize_filter_value<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<ScalarValue>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_null()).map(|v| v.to_string()))
}
