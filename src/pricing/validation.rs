//! Authoring-time validation of pricing rules.

use crate::error::{EngineError, EngineResult};
use crate::models::{Action, ActionType, Condition, ConditionValue, RuleDraft};

/// Validates a rule before it is stored.
///
/// Rejects an empty name, an empty action list, a zero divisor, a negative
/// percentage, ordering operators on non-numeric operands, membership
/// operators without a list, and an empty validity window.
pub fn validate_rule(draft: &RuleDraft) -> EngineResult<()> {
    if draft.name.trim().is_empty() {
        return Err(EngineError::validation("name", "rule name must not be empty"));
    }
    if draft.actions.is_empty() {
        return Err(EngineError::validation(
            "actions",
            "a rule needs at least one action",
        ));
    }
    for condition in &draft.conditions {
        validate_condition(condition)?;
    }
    for action in &draft.actions {
        validate_action(action)?;
    }
    if let (Some(from), Some(until)) = (draft.valid_from, draft.valid_until) {
        if until <= from {
            return Err(EngineError::validation(
                "valid_until",
                format!("must be after valid_from ({})", from),
            ));
        }
    }
    Ok(())
}

/// Validates that a condition's operand suits its operator and field.
pub fn validate_condition(condition: &Condition) -> EngineResult<()> {
    let field = condition.field.to_string();

    if condition.operator.is_membership() {
        return match &condition.value {
            ConditionValue::List(items) => {
                if items.iter().any(|i| matches!(i, ConditionValue::List(_))) {
                    Err(EngineError::validation(field, "nested lists are not supported"))
                } else {
                    Ok(())
                }
            }
            other => Err(EngineError::validation(
                field,
                format!("{:?} needs a list, got {}", condition.operator, other),
            )),
        };
    }

    if let ConditionValue::List(_) = condition.value {
        return Err(EngineError::validation(
            field,
            format!("{:?} needs a single value, got a list", condition.operator),
        ));
    }

    if condition.operator.is_ordering() {
        if !condition.field.is_numeric() {
            return Err(EngineError::validation(
                field,
                format!("{:?} only applies to numeric fields", condition.operator),
            ));
        }
        if condition.value.as_decimal().is_none() {
            return Err(EngineError::validation(
                field,
                format!("{:?} needs a numeric operand, got {}", condition.operator, condition.value),
            ));
        }
    }
    Ok(())
}

/// Validates an action's operand.
pub fn validate_action(action: &Action) -> EngineResult<()> {
    match action.action_type {
        ActionType::Divide if action.value.is_zero() => {
            Err(EngineError::validation("actions", "divide action with a zero operand"))
        }
        ActionType::PercentageDiscount | ActionType::PercentageMarkup
            if action.value.is_sign_negative() =>
        {
            Err(EngineError::validation(
                "actions",
                format!("percentage must not be negative, got {}", action.value),
            ))
        }
        ActionType::SetFixed if action.value.is_sign_negative() => Err(EngineError::validation(
            "actions",
            format!("fixed price must not be negative, got {}", action.value),
        )),
        _ => Ok(()),
    }
}
