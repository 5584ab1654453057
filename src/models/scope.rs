//! Scope types used to select settings and pricing rules.
//!
//! A [`ScopeRequest`] describes the context of a pricing call; a
//! [`SettingScope`] describes which dimensions a stored setting constrains.
//! Every dimension is an explicit `Option`, so "not supplied" is never
//! confused with a zero or empty value.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// The kind of business operation being priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// A new cylinder lease.
    Lease,
    /// A refill of a customer-held cylinder.
    Refill,
    /// An exchange of an empty cylinder for a full one.
    Swap,
    /// A cylinder moving between outlets or customers.
    Transfer,
    /// Customer or cylinder registration.
    Registration,
}

impl OperationType {
    /// Returns the snake_case name used in setting keys (e.g. `lease.base_price`).
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Lease => "lease",
            OperationType::Refill => "refill",
            OperationType::Swap => "swap",
            OperationType::Transfer => "transfer",
            OperationType::Registration => "registration",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lease" => Ok(OperationType::Lease),
            "refill" => Ok(OperationType::Refill),
            "swap" => Ok(OperationType::Swap),
            "transfer" => Ok(OperationType::Transfer),
            "registration" => Ok(OperationType::Registration),
            other => Err(EngineError::validation(
                "operation_type",
                format!("unknown operation type '{}'", other),
            )),
        }
    }
}

/// The context of a resolution or pricing call.
///
/// # Example
///
/// ```
/// use pricing_engine::models::{OperationType, ScopeRequest};
///
/// let scope = ScopeRequest::new()
///     .with_outlet(5)
///     .with_operation(OperationType::Refill)
///     .with_quantity(3);
/// assert_eq!(scope.outlet_id, Some(5));
/// assert_eq!(scope.customer_tier, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeRequest {
    /// The outlet handling the request.
    #[serde(default)]
    pub outlet_id: Option<i64>,
    /// The cylinder type (e.g. "12kg", "50kg").
    #[serde(default)]
    pub cylinder_type: Option<String>,
    /// The customer's pricing tier (e.g. "retail", "wholesale").
    #[serde(default)]
    pub customer_tier: Option<String>,
    /// The operation being priced.
    #[serde(default)]
    pub operation_type: Option<OperationType>,
    /// Number of cylinders.
    #[serde(default)]
    pub quantity: Option<u32>,
    /// Cylinder capacity in kilograms.
    #[serde(default)]
    pub cylinder_size: Option<Decimal>,
}

impl ScopeRequest {
    /// Creates an empty scope that only matches global settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the outlet id.
    pub fn with_outlet(mut self, outlet_id: i64) -> Self {
        self.outlet_id = Some(outlet_id);
        self
    }

    /// Sets the cylinder type.
    pub fn with_cylinder_type(mut self, cylinder_type: impl Into<String>) -> Self {
        self.cylinder_type = Some(cylinder_type.into());
        self
    }

    /// Sets the customer tier.
    pub fn with_customer_tier(mut self, tier: impl Into<String>) -> Self {
        self.customer_tier = Some(tier.into());
        self
    }

    /// Sets the operation type.
    pub fn with_operation(mut self, operation: OperationType) -> Self {
        self.operation_type = Some(operation);
        self
    }

    /// Sets the quantity.
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Sets the cylinder size in kilograms.
    pub fn with_cylinder_size(mut self, size: Decimal) -> Self {
        self.cylinder_size = Some(size);
        self
    }

    /// Projects the request onto the four dimensions settings can constrain.
    pub fn dimensions(&self) -> SettingScope {
        SettingScope {
            outlet_id: self.outlet_id,
            cylinder_type: self.cylinder_type.clone(),
            customer_tier: self.customer_tier.clone(),
            operation_type: self.operation_type,
        }
    }
}

/// The scope constraints declared by a stored setting.
///
/// A `None` dimension is unconstrained and matches any request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SettingScope {
    /// Restricts the setting to one outlet.
    #[serde(default)]
    pub outlet_id: Option<i64>,
    /// Restricts the setting to one cylinder type.
    #[serde(default)]
    pub cylinder_type: Option<String>,
    /// Restricts the setting to one customer tier.
    #[serde(default)]
    pub customer_tier: Option<String>,
    /// Restricts the setting to one operation type.
    #[serde(default)]
    pub operation_type: Option<OperationType>,
}

impl SettingScope {
    /// The unconstrained scope.
    pub fn global() -> Self {
        Self::default()
    }

    /// Returns true when no dimension is constrained.
    pub fn is_global(&self) -> bool {
        self.outlet_id.is_none()
            && self.cylinder_type.is_none()
            && self.customer_tier.is_none()
            && self.operation_type.is_none()
    }

    /// Returns true if every constrained dimension equals the request's value.
    ///
    /// A constrained dimension never matches a request that omits it.
    pub fn matches(&self, request: &ScopeRequest) -> bool {
        fn dimension<T: PartialEq>(constraint: &Option<T>, requested: &Option<T>) -> bool {
            match constraint {
                None => true,
                Some(value) => requested.as_ref() == Some(value),
            }
        }

        dimension(&self.outlet_id, &request.outlet_id)
            && dimension(&self.cylinder_type, &request.cylinder_type)
            && dimension(&self.customer_tier, &request.customer_tier)
            && dimension(&self.operation_type, &request.operation_type)
    }

    /// Short label naming the constrained dimensions, used in statistics.
    pub fn level(&self) -> String {
        if self.is_global() {
            return "global".to_string();
        }
        let mut parts = Vec::new();
        if self.operation_type.is_some() {
            parts.push("operation_type");
        }
        if self.customer_tier.is_some() {
            parts.push("customer_tier");
        }
        if self.cylinder_type.is_some() {
            parts.push("cylinder_type");
        }
        if self.outlet_id.is_some() {
            parts.push("outlet");
        }
        parts.join("+")
    }
}
