//! Pricing: base prices, rule evaluation, tax and bulk orders.
//!
//! The pieces compose in a fixed order for a single operation:
//!
//! 1. [`get_base_price`] resolves the unit price and multiplies by quantity
//! 2. [`PricingRuleEngine`] applies live rules in priority order
//! 3. [`compute_tax`] produces the rounded tax breakdown
//!
//! [`calculate_bulk_price`] runs steps 1 and 2 per line and then applies
//! volume discounts to the aggregate.

mod action;
mod base_price;
mod bulk;
mod condition;
mod rule_engine;
mod tax;
mod validation;

#[cfg(test)]
pub(crate) mod fixtures;

pub use action::{apply_action, apply_actions, describe_action};
pub use base_price::{BasePriceLookup, base_price_key, fee_per_kg_key, get_base_price};
pub use bulk::calculate_bulk_price;
pub use condition::{conditions_hold, evaluate_condition, scope_value};
pub use rule_engine::{PricingRuleEngine, RuleFilter, evaluate_rules, rule_applies};
pub use tax::{TaxMode, compute_tax, round_money};
pub use validation::{validate_action, validate_condition, validate_rule};
