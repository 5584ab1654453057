//! Price adjustment actions.
//!
//! Every operation uses checked decimal arithmetic. Overflow and division by
//! zero surface as [`EngineError::CalculationError`] so the rule engine can
//! skip the offending rule instead of producing a bogus price.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{Action, ActionType};

/// Applies one action to the running price.
///
/// Percentages are relative to the running price: a 10% discount on 100 is
/// 90, a 10% markup on 90 is 99. The result may be negative; clamping happens
/// once all rules have run.
///
/// # Example
///
/// ```
/// use pricing_engine::models::{Action, ActionType};
/// use pricing_engine::pricing::apply_action;
/// use rust_decimal::Decimal;
///
/// let discount = Action { action_type: ActionType::PercentageDiscount, value: Decimal::from(10) };
/// assert_eq!(apply_action(&discount, Decimal::from(100)).unwrap(), Decimal::from(90));
/// ```
pub fn apply_action(action: &Action, price: Decimal) -> EngineResult<Decimal> {
    let value = action.value;
    let result = match action.action_type {
        ActionType::Add => price.checked_add(value),
        ActionType::Subtract => price.checked_sub(value),
        ActionType::Multiply => price.checked_mul(value),
        ActionType::Divide => {
            if value.is_zero() {
                return Err(EngineError::CalculationError {
                    message: "divide action with a zero operand".to_string(),
                });
            }
            price.checked_div(value)
        }
        ActionType::PercentageDiscount => percentage_factor(value, false)
            .and_then(|factor| price.checked_mul(factor)),
        ActionType::PercentageMarkup => percentage_factor(value, true)
            .and_then(|factor| price.checked_mul(factor)),
        ActionType::SetFixed => Some(value),
    };

    result.ok_or_else(|| EngineError::CalculationError {
        message: format!(
            "{} by {} overflowed on price {}",
            describe_type(action.action_type),
            value,
            price
        ),
    })
}

/// Applies actions in order, stopping at the first failure.
pub fn apply_actions(actions: &[Action], price: Decimal) -> EngineResult<Decimal> {
    actions
        .iter()
        .try_fold(price, |running, action| apply_action(action, running))
}

/// Renders an action for a pricing step's reasoning.
pub fn describe_action(action: &Action) -> String {
    let value = action.value.normalize();
    match action.action_type {
        ActionType::Add => format!("add {}", value),
        ActionType::Subtract => format!("subtract {}", value),
        ActionType::Multiply => format!("multiply by {}", value),
        ActionType::Divide => format!("divide by {}", value),
        ActionType::PercentageDiscount => format!("{}% discount", value),
        ActionType::PercentageMarkup => format!("{}% markup", value),
        ActionType::SetFixed => format!("set to {}", value),
    }
}

fn describe_type(action_type: ActionType) -> &'static str {
    match action_type {
        ActionType::Add => "add",
        ActionType::Subtract => "subtract",
        ActionType::Multiply => "multiply",
        ActionType::Divide => "divide",
        ActionType::PercentageDiscount => "percentage_discount",
        ActionType::PercentageMarkup => "percentage_markup",
        ActionType::SetFixed => "set_fixed",
    }
}

fn percentage_factor(percent: Decimal, markup: bool) -> Option<Decimal> {
    let fraction = percent.checked_div(Decimal::ONE_HUNDRED)?;
    if markup {
        Decimal::ONE.checked_add(fraction)
    } else {
        Decimal::ONE.checked_sub(fraction)
    }
}
