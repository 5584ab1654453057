//! Condition evaluation against a request scope.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{Condition, ConditionOp, ConditionValue, ScopeField, ScopeRequest};

/// Reads a scope field as a condition operand.
///
/// Returns `None` when the request does not carry the field.
pub fn scope_value(field: ScopeField, scope: &ScopeRequest) -> Option<ConditionValue> {
    match field {
        ScopeField::OutletId => scope
            .outlet_id
            .map(|id| ConditionValue::Number(Decimal::from(id))),
        ScopeField::CylinderType => scope.cylinder_type.clone().map(ConditionValue::Text),
        ScopeField::CustomerTier => scope.customer_tier.clone().map(ConditionValue::Text),
        ScopeField::OperationType => scope
            .operation_type
            .map(|op| ConditionValue::Text(op.as_str().to_string())),
        ScopeField::Quantity => scope
            .quantity
            .map(|q| ConditionValue::Number(Decimal::from(q))),
        ScopeField::CylinderSize => scope.cylinder_size.map(ConditionValue::Number),
    }
}

/// Evaluates one condition.
///
/// A condition on a field the request does not carry is false for every
/// operator, including `ne` and `not_in`. Operand shapes the operator cannot
/// use (an ordering comparison on text, `in` without a list) are errors.
///
/// # Example
///
/// ```
/// use pricing_engine::models::{Condition, ConditionOp, ConditionValue, ScopeField, ScopeRequest};
/// use pricing_engine::pricing::evaluate_condition;
///
/// let condition = Condition {
///     field: ScopeField::Quantity,
///     operator: ConditionOp::Gte,
///     value: ConditionValue::from(50),
/// };
/// assert!(evaluate_condition(&condition, &ScopeRequest::new().with_quantity(60)).unwrap());
/// assert!(!evaluate_condition(&condition, &ScopeRequest::new().with_quantity(49)).unwrap());
/// assert!(!evaluate_condition(&condition, &ScopeRequest::new()).unwrap());
/// ```
pub fn evaluate_condition(condition: &Condition, scope: &ScopeRequest) -> EngineResult<bool> {
    let Some(actual) = scope_value(condition.field, scope) else {
        return Ok(false);
    };

    match condition.operator {
        ConditionOp::Eq => Ok(loosely_equal(&actual, scalar(condition)?)),
        ConditionOp::Ne => Ok(!loosely_equal(&actual, scalar(condition)?)),
        ConditionOp::Gt | ConditionOp::Gte | ConditionOp::Lt | ConditionOp::Lte => {
            let left = actual.as_decimal().ok_or_else(|| {
                EngineError::validation(
                    condition.field.to_string(),
                    format!("value {} is not numeric", actual),
                )
            })?;
            let right = scalar(condition)?.as_decimal().ok_or_else(|| {
                EngineError::validation(
                    condition.field.to_string(),
                    format!(
                        "operator {:?} needs a numeric operand, got {}",
                        condition.operator, condition.value
                    ),
                )
            })?;
            Ok(match condition.operator {
                ConditionOp::Gt => left > right,
                ConditionOp::Gte => left >= right,
                ConditionOp::Lt => left < right,
                _ => left <= right,
            })
        }
        ConditionOp::In => Ok(list(condition)?.iter().any(|v| loosely_equal(&actual, v))),
        ConditionOp::NotIn => Ok(!list(condition)?.iter().any(|v| loosely_equal(&actual, v))),
    }
}

/// Evaluates every condition; all must hold. An empty list holds.
pub fn conditions_hold(conditions: &[Condition], scope: &ScopeRequest) -> EngineResult<bool> {
    for condition in conditions {
        if !evaluate_condition(condition, scope)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn scalar(condition: &Condition) -> EngineResult<&ConditionValue> {
    match &condition.value {
        ConditionValue::List(_) => Err(EngineError::validation(
            condition.field.to_string(),
            format!("operator {:?} needs a single value, got a list", condition.operator),
        )),
        value => Ok(value),
    }
}

fn list(condition: &Condition) -> EngineResult<&[ConditionValue]> {
    match &condition.value {
        ConditionValue::List(items) => Ok(items),
        other => Err(EngineError::validation(
            condition.field.to_string(),
            format!("operator {:?} needs a list, got {}", condition.operator, other),
        )),
    }
}

/// Numbers compare numerically; text compares exactly; numeric text
/// compares equal to the matching number.
fn loosely_equal(left: &ConditionValue, right: &ConditionValue) -> bool {
    match (left, right) {
        (ConditionValue::Number(a), ConditionValue::Number(b)) => a == b,
        (ConditionValue::Text(a), ConditionValue::Text(b)) => a == b,
        (ConditionValue::List(_), _) | (_, ConditionValue::List(_)) => false,
        (a, b) => match (a.as_decimal(), b.as_decimal()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OperationType;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn cond(field: ScopeField, operator: ConditionOp, value: ConditionValue) -> Condition {
        Condition {
            field,
            operator,
            value,
        }
    }

    fn tiers(names: &[&str]) -> ConditionValue {
        ConditionValue::List(names.iter().map(|n| ConditionValue::from(*n)).collect())
    }

    #[test]
    fn test_ordering_operators_on_quantity() {
        let scope = ScopeRequest::new().with_quantity(50);
        let at = |op| cond(ScopeField::Quantity, op, ConditionValue::from(50));
        assert!(!evaluate_condition(&at(ConditionOp::Gt), &scope).unwrap());
        assert!(evaluate_condition(&at(ConditionOp::Gte), &scope).unwrap());
        assert!(!evaluate_condition(&at(ConditionOp::Lt), &scope).unwrap());
        assert!(evaluate_condition(&at(ConditionOp::Lte), &scope).unwrap());
    }

    #[test]
    fn test_eq_and_ne_on_text() {
        let scope = ScopeRequest::new().with_customer_tier("gold");
        let eq = cond(ScopeField::CustomerTier, ConditionOp::Eq, ConditionValue::from("gold"));
        let ne = cond(ScopeField::CustomerTier, ConditionOp::Ne, ConditionValue::from("gold"));
        assert!(evaluate_condition(&eq, &scope).unwrap());
        assert!(!evaluate_condition(&ne, &scope).unwrap());
    }

    #[test]
    fn test_in_and_not_in() {
        let scope = ScopeRequest::new().with_customer_tier("silver");
        let is_in = cond(ScopeField::CustomerTier, ConditionOp::In, tiers(&["gold", "silver"]));
        let not_in = cond(ScopeField::CustomerTier, ConditionOp::NotIn, tiers(&["gold", "silver"]));
        assert!(evaluate_condition(&is_in, &scope).unwrap());
        assert!(!evaluate_condition(&not_in, &scope).unwrap());
    }

    #[test]
    fn test_missing_field_is_false_for_every_operator() {
        let scope = ScopeRequest::new();
        for op in [
            ConditionOp::Eq,
            ConditionOp::Ne,
            ConditionOp::Gt,
            ConditionOp::Gte,
            ConditionOp::Lt,
            ConditionOp::Lte,
        ] {
            let c = cond(ScopeField::Quantity, op, ConditionValue::from(1));
            assert!(!evaluate_condition(&c, &scope).unwrap(), "{:?}", op);
        }
        let not_in = cond(ScopeField::CustomerTier, ConditionOp::NotIn, tiers(&["gold"]));
        assert!(!evaluate_condition(&not_in, &scope).unwrap());
    }

    #[test]
    fn test_operation_type_is_compared_by_name() {
        let scope = ScopeRequest::new().with_operation(OperationType::Refill);
        let c = cond(ScopeField::OperationType, ConditionOp::Eq, ConditionValue::from("refill"));
        assert!(evaluate_condition(&c, &scope).unwrap());
    }

    #[test]
    fn test_cylinder_size_compares_decimals() {
        let scope = ScopeRequest::new().with_cylinder_size(dec("12.5"));
        let c = cond(
            ScopeField::CylinderSize,
            ConditionOp::Gt,
            ConditionValue::Number(dec("12.0")),
        );
        assert!(evaluate_condition(&c, &scope).unwrap());
    }

    #[test]
    fn test_numeric_text_equals_number() {
        let scope = ScopeRequest::new().with_outlet(5);
        let c = cond(ScopeField::OutletId, ConditionOp::Eq, ConditionValue::from("5"));
        assert!(evaluate_condition(&c, &scope).unwrap());
    }

    #[test]
    fn test_ordering_on_text_field_is_an_error() {
        let scope = ScopeRequest::new().with_customer_tier("gold");
        let c = cond(ScopeField::CustomerTier, ConditionOp::Gt, ConditionValue::from(3));
        assert!(matches!(
            evaluate_condition(&c, &scope),
            Err(EngineError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_in_without_list_is_an_error() {
        let scope = ScopeRequest::new().with_customer_tier("gold");
        let c = cond(ScopeField::CustomerTier, ConditionOp::In, ConditionValue::from("gold"));
        assert!(evaluate_condition(&c, &scope).is_err());
    }

    #[test]
    fn test_conditions_hold_requires_all() {
        let scope = ScopeRequest::new().with_quantity(60).with_customer_tier("retail");
        let conditions = vec![
            cond(ScopeField::Quantity, ConditionOp::Gte, ConditionValue::from(50)),
            cond(ScopeField::CustomerTier, ConditionOp::Eq, ConditionValue::from("gold")),
        ];
        assert!(!conditions_hold(&conditions, &scope).unwrap());
        assert!(conditions_hold(&conditions[..1], &scope).unwrap());
        assert!(conditions_hold(&[], &scope).unwrap());
    }
}
