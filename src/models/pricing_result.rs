//! Pricing result models.
//!
//! This module contains the outputs of rule evaluation, tax computation and
//! bulk pricing, including the per-step trace that records which rules
//! changed a price and why.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{OperationType, RuleType};

/// A single rule application in a price calculation.
///
/// Each step captures the price before and after the rule and a
/// human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingStep {
    /// The sequential step number, starting at 1.
    pub step_number: u32,
    /// The id of the rule that was applied.
    pub rule_id: Uuid,
    /// The name of the rule that was applied.
    pub rule_name: String,
    /// The rule category.
    pub rule_type: RuleType,
    /// Price entering this step.
    pub price_before: Decimal,
    /// Price leaving this step.
    pub price_after: Decimal,
    /// Human-readable explanation of the adjustment.
    pub reasoning: String,
}

/// A rule that matched nothing or could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRule {
    /// The id of the skipped rule.
    pub rule_id: Uuid,
    /// The name of the skipped rule.
    pub rule_name: String,
    /// Why the rule was skipped.
    pub reason: String,
}

/// The outcome of running the rule engine over a base price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEvaluation {
    /// The price before any rule ran.
    pub base_price: Decimal,
    /// The price after all applicable rules ran, clamped at zero.
    pub adjusted_price: Decimal,
    /// One step per applied rule, in application order.
    pub steps: Vec<PricingStep>,
    /// Rules that failed to evaluate and were isolated.
    pub failed: Vec<SkippedRule>,
    /// True if the running price went negative and was clamped.
    pub clamped: bool,
}

impl RuleEvaluation {
    /// Ids of the rules that changed the price, in order.
    pub fn applied_rule_ids(&self) -> Vec<Uuid> {
        self.steps.iter().map(|s| s.rule_id).collect()
    }
}

/// Subtotal, tax and total after tax computation, rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    /// The pre-tax amount.
    pub subtotal: Decimal,
    /// The tax amount.
    pub tax_amount: Decimal,
    /// The amount payable.
    pub total: Decimal,
}

/// A fully priced single operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// The operation priced.
    pub operation_type: OperationType,
    /// The setting key the unit price resolved from.
    pub price_key: String,
    /// Unit price before quantity.
    pub unit_price: Decimal,
    /// Unit price times quantity.
    pub base_price: Decimal,
    /// Price after pricing rules.
    pub adjusted_price: Decimal,
    /// The tax rate used, in percent.
    pub tax_rate: Decimal,
    /// The tax breakdown of `adjusted_price`.
    pub tax: TaxBreakdown,
    /// Rule trace.
    pub evaluation: RuleEvaluation,
}

/// One line of a bulk pricing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItem {
    /// The cylinder type of this line.
    pub cylinder_type: String,
    /// Number of cylinders.
    pub quantity: u32,
    /// Cylinder capacity in kilograms, when pricing is per kilogram.
    #[serde(default)]
    pub cylinder_size: Option<Decimal>,
}

impl BulkItem {
    /// Creates a line without an explicit cylinder size.
    pub fn new(cylinder_type: impl Into<String>, quantity: u32) -> Self {
        Self {
            cylinder_type: cylinder_type.into(),
            quantity,
            cylinder_size: None,
        }
    }
}

/// The priced form of one [`BulkItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPrice {
    /// The cylinder type of this line.
    pub cylinder_type: String,
    /// Number of cylinders.
    pub quantity: u32,
    /// Resolved unit price.
    pub unit_price: Decimal,
    /// Line price after per-item rules.
    pub total_price: Decimal,
    /// Ids of the rules applied to this line.
    pub applied_rules: Vec<Uuid>,
}

/// The outcome of a bulk pricing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkPriceResult {
    /// Per-line breakdown.
    pub item_prices: Vec<ItemPrice>,
    /// Sum of all cylinders across lines.
    pub total_quantity: u32,
    /// Sum of line prices before volume discounts.
    pub subtotal: Decimal,
    /// `subtotal - total_price`.
    pub discount: Decimal,
    /// Final price after volume discounts.
    pub total_price: Decimal,
    /// Trace of the aggregate volume-discount pass.
    pub volume_evaluation: RuleEvaluation,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_applied_rule_ids_preserve_order() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let step = |n: u32, id: Uuid| PricingStep {
            step_number: n,
            rule_id: id,
            rule_name: format!("rule {}", n),
            rule_type: RuleType::Surcharge,
            price_before: dec("100"),
            price_after: dec("110"),
            reasoning: String::new(),
        };
        let evaluation = RuleEvaluation {
            base_price: dec("100"),
            adjusted_price: dec("120"),
            steps: vec![step(1, first), step(2, second)],
            failed: vec![],
            clamped: false,
        };
        assert_eq!(evaluation.applied_rule_ids(), vec![first, second]);
    }

    #[test]
    fn test_bulk_item_deserializes_without_size() {
        let item: BulkItem =
            serde_json::from_str(r#"{ "cylinder_type": "12kg", "quantity": 4 }"#).unwrap();
        assert_eq!(item, BulkItem::new("12kg", 4));
    }

    #[test]
    fn test_tax_breakdown_serializes_decimals_as_strings() {
        let breakdown = TaxBreakdown {
            subtotal: dec("100.00"),
            tax_amount: dec("7.50"),
            total: dec("107.50"),
        };
        let json = serde_json::to_value(breakdown).unwrap();
        assert_eq!(json["tax_amount"], "7.50");
        assert_eq!(json["total"], "107.50");
    }
}
