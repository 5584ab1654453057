//! Pricing rule models.
//!
//! A [`PricingRule`] is a conditional price adjustment: a list of
//! [`Condition`]s over scope fields and a list of [`Action`]s applied in
//! order to the running price when every condition holds.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::OperationType;

/// The category of a pricing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Quantity-based discount; applied to aggregates in bulk pricing.
    VolumeDiscount,
    /// Discount tied to a customer tier.
    CustomerDiscount,
    /// An added charge (delivery, weekend, hazardous handling).
    Surcharge,
    /// A time-boxed promotional adjustment.
    Promotion,
    /// Overrides the running price with a fixed amount.
    FixedPrice,
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleType::VolumeDiscount => "volume_discount",
            RuleType::CustomerDiscount => "customer_discount",
            RuleType::Surcharge => "surcharge",
            RuleType::Promotion => "promotion",
            RuleType::FixedPrice => "fixed_price",
        };
        f.write_str(name)
    }
}

/// A scope field a condition can inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeField {
    /// `ScopeRequest::outlet_id`.
    OutletId,
    /// `ScopeRequest::cylinder_type`.
    CylinderType,
    /// `ScopeRequest::customer_tier`.
    CustomerTier,
    /// `ScopeRequest::operation_type`.
    OperationType,
    /// `ScopeRequest::quantity`.
    Quantity,
    /// `ScopeRequest::cylinder_size`.
    CylinderSize,
}

impl ScopeField {
    /// Returns true for fields holding numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ScopeField::OutletId | ScopeField::Quantity | ScopeField::CylinderSize
        )
    }
}

impl fmt::Display for ScopeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScopeField::OutletId => "outlet_id",
            ScopeField::CylinderType => "cylinder_type",
            ScopeField::CustomerTier => "customer_tier",
            ScopeField::OperationType => "operation_type",
            ScopeField::Quantity => "quantity",
            ScopeField::CylinderSize => "cylinder_size",
        };
        f.write_str(name)
    }
}

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Member of a list.
    In,
    /// Not a member of a list.
    NotIn,
}

impl ConditionOp {
    /// Returns true for the ordering operators (`gt`, `gte`, `lt`, `lte`).
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            ConditionOp::Gt | ConditionOp::Gte | ConditionOp::Lt | ConditionOp::Lte
        )
    }

    /// Returns true for the membership operators (`in`, `not_in`).
    pub fn is_membership(&self) -> bool {
        matches!(self, ConditionOp::In | ConditionOp::NotIn)
    }
}

/// The right-hand side of a condition.
///
/// Deserializes from a JSON/YAML number, string or list of those.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConditionValue {
    /// A number.
    Number(Decimal),
    /// A string.
    Text(String),
    /// A list, for `in` / `not_in`.
    List(Vec<ConditionValue>),
}

impl ConditionValue {
    /// Returns the value as a number, parsing numeric text.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            ConditionValue::Number(d) => Some(*d),
            ConditionValue::Text(s) => Decimal::from_str(s.trim()).ok(),
            ConditionValue::List(_) => None,
        }
    }

    fn from_json(value: serde_json::Value) -> Result<Self, String> {
        use serde_json::Value;

        match value {
            Value::Number(n) => Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .map(ConditionValue::Number)
                .map_err(|e| e.to_string()),
            Value::String(s) => Ok(ConditionValue::Text(s)),
            Value::Array(items) => items
                .into_iter()
                .map(ConditionValue::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(ConditionValue::List),
            other => Err(format!(
                "condition value must be a number, string or list, got {}",
                other
            )),
        }
    }
}

impl<'de> Deserialize<'de> for ConditionValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        ConditionValue::from_json(raw).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for ConditionValue {
    fn from(value: Decimal) -> Self {
        ConditionValue::Number(value)
    }
}

impl From<i64> for ConditionValue {
    fn from(value: i64) -> Self {
        ConditionValue::Number(Decimal::from(value))
    }
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        ConditionValue::Text(value.to_string())
    }
}

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionValue::Number(d) => write!(f, "{}", d.normalize()),
            ConditionValue::Text(s) => write!(f, "'{}'", s),
            ConditionValue::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

/// One predicate over a scope field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// The scope field to inspect.
    pub field: ScopeField,
    /// The comparison operator.
    pub operator: ConditionOp,
    /// The value to compare against.
    pub value: ConditionValue,
}

/// The kind of adjustment an action performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Adds an absolute amount.
    Add,
    /// Subtracts an absolute amount.
    Subtract,
    /// Multiplies by a factor.
    Multiply,
    /// Divides by a non-zero factor.
    Divide,
    /// Multiplies by `1 - value/100`.
    PercentageDiscount,
    /// Multiplies by `1 + value/100`.
    PercentageMarkup,
    /// Replaces the running price.
    SetFixed,
}

/// One adjustment step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// The adjustment kind.
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// The operand.
    pub value: Decimal,
}

/// A stored pricing rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingRule {
    /// Unique identifier.
    pub id: Uuid,
    /// Human-readable name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// The rule category.
    pub rule_type: RuleType,
    /// All must hold for the rule to apply.
    pub conditions: Vec<Condition>,
    /// Applied in order to the running price.
    pub actions: Vec<Action>,
    /// Operation types the rule is limited to; empty means all.
    pub operation_types: Vec<OperationType>,
    /// Outlets the rule is limited to; `None` means all.
    pub outlet_ids: Option<Vec<i64>>,
    /// Higher priority rules run first.
    pub priority: i32,
    /// Inactive rules are never loaded.
    pub active: bool,
    /// Start of the validity window.
    pub valid_from: Option<DateTime<Utc>>,
    /// End of the validity window (exclusive).
    pub valid_until: Option<DateTime<Utc>>,
    /// Incremented on every update, starting at 1.
    pub version: u32,
    /// Actor that created the rule.
    pub created_by: String,
    /// Actor that last updated the rule.
    pub updated_by: String,
    /// When the rule was created.
    pub created_at: DateTime<Utc>,
    /// When the rule was last updated.
    pub updated_at: DateTime<Utc>,
}

impl PricingRule {
    /// Builds a version 1 rule from a draft.
    pub fn from_draft(draft: RuleDraft, actor: &str, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            description: draft.description,
            rule_type: draft.rule_type,
            conditions: draft.conditions,
            actions: draft.actions,
            operation_types: draft.operation_types,
            outlet_ids: draft.outlet_ids,
            priority: draft.priority,
            active: draft.active,
            valid_from: draft.valid_from,
            valid_until: draft.valid_until,
            version: 1,
            created_by: actor.to_string(),
            updated_by: actor.to_string(),
            created_at: at,
            updated_at: at,
        }
    }

    /// Replaces the authoring fields with `draft`, bumping the version.
    pub fn revise(&mut self, draft: RuleDraft, actor: &str, at: DateTime<Utc>) {
        self.name = draft.name;
        self.description = draft.description;
        self.rule_type = draft.rule_type;
        self.conditions = draft.conditions;
        self.actions = draft.actions;
        self.operation_types = draft.operation_types;
        self.outlet_ids = draft.outlet_ids;
        self.priority = draft.priority;
        self.active = draft.active;
        self.valid_from = draft.valid_from;
        self.valid_until = draft.valid_until;
        self.version += 1;
        self.updated_by = actor.to_string();
        self.updated_at = at;
    }

    /// Returns true if the rule is active and inside its validity window at `at`.
    pub fn is_live_at(&self, at: DateTime<Utc>) -> bool {
        self.active
            && self.valid_from.is_none_or(|from| from <= at)
            && self.valid_until.is_none_or(|until| until > at)
    }

    /// Returns the authoring fields of this rule.
    pub fn to_draft(&self) -> RuleDraft {
        RuleDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            rule_type: self.rule_type,
            conditions: self.conditions.clone(),
            actions: self.actions.clone(),
            operation_types: self.operation_types.clone(),
            outlet_ids: self.outlet_ids.clone(),
            priority: self.priority,
            active: self.active,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
        }
    }
}

fn default_active() -> bool {
    true
}

/// The authoring form of a pricing rule, as written in `rules.yaml` or
/// passed to `create_rule` / `update_rule`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDraft {
    /// Human-readable name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// The rule category.
    pub rule_type: RuleType,
    /// All must hold for the rule to apply.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Applied in order to the running price.
    pub actions: Vec<Action>,
    /// Operation types the rule is limited to; empty means all.
    #[serde(default)]
    pub operation_types: Vec<OperationType>,
    /// Outlets the rule is limited to.
    #[serde(default)]
    pub outlet_ids: Option<Vec<i64>>,
    /// Higher priority rules run first.
    #[serde(default)]
    pub priority: i32,
    /// Whether the rule is active.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Start of the validity window.
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    /// End of the validity window.
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
}

impl RuleDraft {
    /// Creates an active, unrestricted draft with no conditions.
    pub fn new(name: impl Into<String>, rule_type: RuleType, actions: Vec<Action>) -> Self {
        Self {
            name: name.into(),
            description: None,
            rule_type,
            conditions: Vec::new(),
            actions,
            operation_types: Vec::new(),
            outlet_ids: None,
            priority: 0,
            active: true,
            valid_from: None,
            valid_until: None,
        }
    }

    /// Adds a condition.
    pub fn when(
        mut self,
        field: ScopeField,
        operator: ConditionOp,
        value: impl Into<ConditionValue>,
    ) -> Self {
        self.conditions.push(Condition {
            field,
            operator,
            value: value.into(),
        });
        self
    }

    /// Restricts the rule to the given operation types.
    pub fn for_operations(mut self, operations: Vec<OperationType>) -> Self {
        self.operation_types = operations;
        self
    }

    /// Restricts the rule to the given outlets.
    pub fn for_outlets(mut self, outlet_ids: Vec<i64>) -> Self {
        self.outlet_ids = Some(outlet_ids);
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}
