//! Setting and category models.
//!
//! A [`Setting`] is one scoped, versioned configuration value. Several
//! settings may share a key; the resolver picks the most specific effective
//! one for a request.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::SettingScope;
use crate::error::{EngineError, EngineResult};

/// The declared type of a setting value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// An exact decimal number.
    Number,
    /// A boolean flag.
    Boolean,
    /// Free text.
    String,
    /// An arbitrary JSON document.
    Json,
    /// A JSON array.
    Array,
}

/// A typed setting value.
///
/// # Example
///
/// ```
/// use pricing_engine::models::{DataType, SettingValue};
///
/// let value = SettingValue::from_json(DataType::Number, serde_json::json!(1000)).unwrap();
/// assert_eq!(value.as_decimal(), Some(rust_decimal::Decimal::from(1000)));
/// assert_eq!(value.data_type(), DataType::Number);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// An exact decimal number.
    Number(Decimal),
    /// A boolean flag.
    Boolean(bool),
    /// Free text.
    Text(String),
    /// An arbitrary JSON document.
    Json(serde_json::Value),
    /// A JSON array.
    Array(Vec<serde_json::Value>),
}

impl SettingValue {
    /// Returns the data type tag matching this value.
    pub fn data_type(&self) -> DataType {
        match self {
            SettingValue::Number(_) => DataType::Number,
            SettingValue::Boolean(_) => DataType::Boolean,
            SettingValue::Text(_) => DataType::String,
            SettingValue::Json(_) => DataType::Json,
            SettingValue::Array(_) => DataType::Array,
        }
    }

    /// Converts a raw JSON value into a typed value of the declared type.
    ///
    /// Numbers may be given as JSON numbers or numeric strings. Any other
    /// mismatch between the declared type and the JSON shape is a
    /// validation error.
    pub fn from_json(data_type: DataType, raw: serde_json::Value) -> EngineResult<Self> {
        use serde_json::Value;

        match (data_type, raw) {
            (DataType::Number, Value::Number(n)) => Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .map(SettingValue::Number)
                .map_err(|e| EngineError::validation("value", e.to_string())),
            (DataType::Number, Value::String(s)) => Decimal::from_str(s.trim())
                .map(SettingValue::Number)
                .map_err(|_| EngineError::validation("value", format!("'{}' is not a number", s))),
            (DataType::Boolean, Value::Bool(b)) => Ok(SettingValue::Boolean(b)),
            (DataType::String, Value::String(s)) => Ok(SettingValue::Text(s)),
            (DataType::Array, Value::Array(items)) => Ok(SettingValue::Array(items)),
            (DataType::Json, other) => Ok(SettingValue::Json(other)),
            (expected, other) => Err(EngineError::validation(
                "value",
                format!("expected {:?} value, got {}", expected, other),
            )),
        }
    }

    /// Converts the value into plain JSON, used for audit snapshots.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            SettingValue::Number(d) => serde_json::Value::String(d.normalize().to_string()),
            SettingValue::Boolean(b) => serde_json::Value::Bool(*b),
            SettingValue::Text(s) => serde_json::Value::String(s.clone()),
            SettingValue::Json(v) => v.clone(),
            SettingValue::Array(items) => serde_json::Value::Array(items.clone()),
        }
    }

    /// Returns the numeric value, if this is a number.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            SettingValue::Number(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the text value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Decimal> for SettingValue {
    fn from(value: Decimal) -> Self {
        SettingValue::Number(value)
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Boolean(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Text(value.to_string())
    }
}

/// A scoped configuration record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Setting {
    /// Unique identifier.
    pub id: Uuid,
    /// The parameter name (e.g. "lease.fee_per_kg").
    pub key: String,
    /// The typed value.
    pub value: SettingValue,
    /// The declared type of `value`.
    pub data_type: DataType,
    /// The category this setting belongs to, if any.
    pub category_id: Option<Uuid>,
    /// Optional human description.
    pub description: Option<String>,
    /// The dimensions this setting is restricted to.
    pub scope: SettingScope,
    /// Higher priority wins between equally specific candidates.
    pub priority: i32,
    /// The instant from which the setting applies.
    pub effective_date: DateTime<Utc>,
    /// The instant at which the setting stops applying.
    pub expiry_date: Option<DateTime<Utc>>,
    /// Inactive settings never resolve.
    pub active: bool,
    /// Incremented on every update, starting at 1.
    pub version: u32,
    /// Actor that created the setting.
    pub created_by: String,
    /// Actor that last updated the setting.
    pub updated_by: String,
    /// When the setting was created.
    pub created_at: DateTime<Utc>,
    /// When the setting was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Setting {
    /// Returns true if the setting is active and inside its validity window at `at`.
    ///
    /// The window is `effective_date <= at < expiry_date`.
    pub fn is_effective_at(&self, at: DateTime<Utc>) -> bool {
        self.active
            && self.effective_date <= at
            && self.expiry_date.is_none_or(|expiry| expiry > at)
    }

    /// Returns true if the setting is active but its window has not opened yet.
    pub fn is_scheduled_at(&self, at: DateTime<Utc>) -> bool {
        self.active && self.effective_date > at
    }

    /// Returns true if the setting's expiry date has passed.
    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry <= at)
    }
}

/// A named group of settings (e.g. "pricing", "deposits", "tax").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier.
    pub id: Uuid,
    /// Unique category name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
}

/// Options accompanying a `set_setting` call.
///
/// Everything except `actor` has a sensible default: global scope, priority
/// 0, effective immediately, never expiring, active.
#[derive(Debug, Clone, Default)]
pub struct SetSettingOptions {
    /// Category to file the setting under.
    pub category_id: Option<Uuid>,
    /// Declared type; must agree with the value when given.
    pub data_type: Option<DataType>,
    /// The exact scope to upsert.
    pub scope: SettingScope,
    /// Tie-break priority.
    pub priority: i32,
    /// Start of the validity window; defaults to now.
    pub effective_date: Option<DateTime<Utc>>,
    /// End of the validity window.
    pub expiry_date: Option<DateTime<Utc>>,
    /// Whether the setting is active; defaults to true.
    pub active: Option<bool>,
    /// Optional description.
    pub description: Option<String>,
    /// Compare-and-swap token. `None` means last writer wins; `Some(0)`
    /// asserts that no setting exists yet for the exact scope.
    pub expected_version: Option<u32>,
    /// Who is making the change.
    pub actor: String,
    /// Why the change is being made.
    pub reason: Option<String>,
}

impl SetSettingOptions {
    /// Creates options for the given actor with all other fields defaulted.
    pub fn by(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            ..Self::default()
        }
    }

    /// Sets the scope.
    pub fn scope(mut self, scope: SettingScope) -> Self {
        self.scope = scope;
        self
    }

    /// Sets the priority.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the category.
    pub fn category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Sets the validity window.
    pub fn window(mut self, effective: DateTime<Utc>, expiry: Option<DateTime<Utc>>) -> Self {
        self.effective_date = Some(effective);
        self.expiry_date = expiry;
        self
    }

    /// Sets the audit reason.
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
