//! Bulk pricing.
//!
//! Each line is priced on its own (base price, then every non-volume rule)
//! with the line's cylinder type and quantity in scope. The line totals are
//! summed, and volume-discount rules then run once against that subtotal
//! with `quantity` set to the total number of cylinders across lines. Volume
//! tiers are ordinary pricing rules with a quantity condition, so a tier
//! never applies to a single line and again to the aggregate.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use super::base_price::get_base_price;
use super::rule_engine::{PricingRuleEngine, RuleFilter};
use crate::error::{EngineError, EngineResult};
use crate::models::{BulkItem, BulkPriceResult, ItemPrice, OperationType, RuleType, ScopeRequest};
use crate::resolution::ScopeResolver;

/// Prices a multi-line order and applies volume discounts to the total.
///
/// `scope` carries the dimensions shared by every line (outlet, customer
/// tier). A line's `cylinder_size` overrides the shared one when present.
///
/// # Errors
///
/// - `ValidationError` for an empty order or a zero-quantity line
/// - `ConfigurationMissing` when any line has no resolvable base price
pub fn calculate_bulk_price(
    operation: OperationType,
    items: &[BulkItem],
    scope: &ScopeRequest,
    resolver: &ScopeResolver,
    rules: &PricingRuleEngine,
) -> EngineResult<BulkPriceResult> {
    if items.is_empty() {
        return Err(EngineError::validation("items", "a bulk order needs at least one line"));
    }
    if let Some(empty) = items.iter().find(|item| item.quantity == 0) {
        return Err(EngineError::validation(
            "items",
            format!("line for '{}' has zero quantity", empty.cylinder_type),
        ));
    }

    let at = Utc::now();
    let mut item_prices = Vec::with_capacity(items.len());
    let mut subtotal = Decimal::ZERO;
    let mut total_quantity: u32 = 0;

    for item in items {
        let mut line_scope = scope
            .clone()
            .with_cylinder_type(item.cylinder_type.clone())
            .with_quantity(item.quantity);
        if let Some(size) = item.cylinder_size {
            line_scope = line_scope.with_cylinder_size(size);
        }

        let lookup = get_base_price(operation, &line_scope, resolver)?;
        let evaluation = rules.apply_rules_at(
            lookup.base_price,
            operation,
            &line_scope,
            at,
            RuleFilter::Except(RuleType::VolumeDiscount),
        )?;

        subtotal += evaluation.adjusted_price;
        total_quantity = total_quantity.checked_add(item.quantity).ok_or_else(|| {
            EngineError::validation("items", "total quantity exceeds the supported range")
        })?;
        item_prices.push(ItemPrice {
            cylinder_type: item.cylinder_type.clone(),
            quantity: item.quantity,
            unit_price: lookup.unit_price,
            total_price: evaluation.adjusted_price,
            applied_rules: evaluation.applied_rule_ids(),
        });
    }

    let bulk_scope = scope.clone().with_quantity(total_quantity);
    let volume_evaluation = rules.apply_rules_at(
        subtotal,
        operation,
        &bulk_scope,
        at,
        RuleFilter::Only(RuleType::VolumeDiscount),
    )?;
    let total_price = volume_evaluation.adjusted_price;

    info!(
        operation = %operation,
        lines = items.len(),
        total_quantity,
        subtotal = %subtotal,
        total = %total_price,
        "bulk price calculated"
    );

    Ok(BulkPriceResult {
        item_prices,
        total_quantity,
        subtotal,
        discount: subtotal - total_price,
        total_price,
        volume_evaluation,
    })
}
