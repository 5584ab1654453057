//! Base price lookup.
//!
//! This module determines the pre-rule price of an operation from resolved
//! settings, either from a flat `{operation}.base_price` or from a per-kilogram
//! `{operation}.fee_per_kg` multiplied by the cylinder size.

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::models::{OperationType, ScopeRequest, SettingValue};
use crate::resolution::ScopeResolver;

/// The setting key holding an operation's flat unit price.
pub fn base_price_key(operation: OperationType) -> String {
    format!("{}.base_price", operation)
}

/// The setting key holding an operation's per-kilogram fee.
pub fn fee_per_kg_key(operation: OperationType) -> String {
    format!("{}.fee_per_kg", operation)
}

/// The result of a base price lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePriceLookup {
    /// The key the unit price came from.
    pub price_key: String,
    /// Price of a single unit.
    pub unit_price: Decimal,
    /// Quantity priced; 1 when the request does not say.
    pub quantity: u32,
    /// `unit_price * quantity`.
    pub base_price: Decimal,
}

/// Determines the base price of `operation` for `scope`.
///
/// Lookup order:
/// 1. `{operation}.base_price` resolved for the scope
/// 2. `{operation}.fee_per_kg` times `scope.cylinder_size`, when the size is known
///
/// The unit price is multiplied by `scope.quantity` (default 1). Settings
/// are resolved with the scope's operation type set to `operation`, so
/// operation-specific overrides apply.
///
/// # Errors
///
/// - `ConfigurationMissing` when neither key resolves
/// - `ValidationError` when the resolved value is not a number or quantity is zero
pub fn get_base_price(
    operation: OperationType,
    scope: &ScopeRequest,
    resolver: &ScopeResolver,
) -> EngineResult<BasePriceLookup> {
    let quantity = scope.quantity.unwrap_or(1);
    if quantity == 0 {
        return Err(EngineError::validation("quantity", "quantity must be at least 1"));
    }

    let scope = scope.clone().with_operation(operation);
    let flat_key = base_price_key(operation);

    let (price_key, unit_price) = match resolver.resolve(&flat_key, &scope)? {
        Some(value) => {
            let price = numeric(&flat_key, &value)?;
            (flat_key, price)
        }
        None => {
            let per_kg_key = fee_per_kg_key(operation);
            let per_kg = match scope.cylinder_size {
                Some(size) => resolver
                    .resolve(&per_kg_key, &scope)?
                    .map(|value| numeric(&per_kg_key, &value).map(|fee| (fee, size)))
                    .transpose()?,
                None => None,
            };
            let Some((fee, size)) = per_kg else {
                return Err(EngineError::ConfigurationMissing { key: flat_key });
            };
            let price = fee.checked_mul(size).ok_or_else(|| EngineError::CalculationError {
                message: format!("{} x {}kg overflowed", fee, size),
            })?;
            (per_kg_key, price)
        }
    };

    let base_price = unit_price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| EngineError::CalculationError {
            message: format!("{} x {} overflowed", unit_price, quantity),
        })?;

    debug!(
        operation = %operation,
        price_key = %price_key,
        unit_price = %unit_price,
        quantity,
        "base price resolved"
    );

    Ok(BasePriceLookup {
        price_key,
        unit_price,
        quantity,
        base_price,
    })
}

fn numeric(key: &str, value: &SettingValue) -> EngineResult<Decimal> {
    value.as_decimal().ok_or_else(|| {
        EngineError::validation(
            key,
            format!("expected a number, found a {:?} value", value.data_type()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Setting, SettingScope};
    use crate::pricing::fixtures::{StaticStore, number, resolver};
    use std::str::FromStr;
    use std::sync::Arc;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn store(settings: Vec<Setting>) -> Arc<StaticStore> {
        Arc::new(StaticStore {
            settings,
            rules: vec![],
        })
    }

    #[test]
    fn test_keys() {
        assert_eq!(base_price_key(OperationType::Refill), "refill.base_price");
        assert_eq!(fee_per_kg_key(OperationType::Lease), "lease.fee_per_kg");
    }

    #[test]
    fn test_flat_base_price_times_quantity() {
        let store = store(vec![number("refill.base_price", "100", SettingScope::global())]);
        let lookup = get_base_price(
            OperationType::Refill,
            &ScopeRequest::new().with_quantity(3),
            &resolver(&store),
        )
        .unwrap();
        assert_eq!(lookup.price_key, "refill.base_price");
        assert_eq!(lookup.unit_price, dec("100"));
        assert_eq!(lookup.base_price, dec("300"));
    }

    #[test]
    fn test_fee_per_kg_times_cylinder_size() {
        let store = store(vec![number("lease.fee_per_kg", "1000", SettingScope::global())]);
        let lookup = get_base_price(
            OperationType::Lease,
            &ScopeRequest::new().with_cylinder_size(dec("12.5")),
            &resolver(&store),
        )
        .unwrap();
        assert_eq!(lookup.price_key, "lease.fee_per_kg");
        assert_eq!(lookup.base_price, dec("12500"));
        assert_eq!(lookup.quantity, 1);
    }

    #[test]
    fn test_operation_scoped_override_applies() {
        let store = store(vec![
            number("swap.base_price", "50", SettingScope::global()),
            number(
                "swap.base_price",
                "45",
                SettingScope {
                    operation_type: Some(OperationType::Swap),
                    ..SettingScope::default()
                },
            ),
        ]);
        let lookup = get_base_price(OperationType::Swap, &ScopeRequest::new(), &resolver(&store)).unwrap();
        assert_eq!(lookup.base_price, dec("45"));
    }

    #[test]
    fn test_missing_configuration() {
        let store = store(vec![]);
        let err = get_base_price(OperationType::Transfer, &ScopeRequest::new(), &resolver(&store))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::ConfigurationMissing { ref key } if key == "transfer.base_price"
        ));
    }

    #[test]
    fn test_fee_per_kg_without_size_is_missing() {
        let store = store(vec![number("lease.fee_per_kg", "1000", SettingScope::global())]);
        let err = get_base_price(OperationType::Lease, &ScopeRequest::new(), &resolver(&store)).unwrap_err();
        assert!(matches!(err, EngineError::ConfigurationMissing { .. }));
    }

    #[test]
    fn test_zero_quantity_is_rejected() {
        let store = store(vec![number("refill.base_price", "100", SettingScope::global())]);
        let err = get_base_price(
            OperationType::Refill,
            &ScopeRequest::new().with_quantity(0),
            &resolver(&store),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::ValidationError { .. }));
    }
}
