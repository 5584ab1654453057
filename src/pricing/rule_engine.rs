//! The pricing rule engine.
//!
//! Rules are applied to a running price in priority order (highest first,
//! then oldest first). A rule applies when it is live, its operation-type and
//! outlet restrictions admit the request, and all of its conditions hold.
//! Its actions then run in order against the running price.
//!
//! A rule whose conditions or actions fail to evaluate is logged, recorded in
//! [`RuleEvaluation::failed`] and skipped; the running price is left as it was
//! before that rule. Once every rule has run, a negative price is clamped to
//! zero.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::action::{apply_actions, describe_action};
use super::condition::conditions_hold;
use crate::error::EngineResult;
use crate::models::{
    OperationType, PricingRule, PricingStep, RuleEvaluation, RuleType, ScopeRequest, SkippedRule,
};
use crate::store::RuleStore;

/// Restricts which rule types take part in an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleFilter {
    /// Every rule type.
    #[default]
    All,
    /// Only rules of this type.
    Only(RuleType),
    /// Every rule type except this one.
    Except(RuleType),
}

impl RuleFilter {
    /// Returns true if rules of `rule_type` take part.
    pub fn admits(&self, rule_type: RuleType) -> bool {
        match self {
            RuleFilter::All => true,
            RuleFilter::Only(only) => *only == rule_type,
            RuleFilter::Except(except) => *except != rule_type,
        }
    }
}

/// Applies stored pricing rules to base prices.
pub struct PricingRuleEngine {
    store: Arc<dyn RuleStore>,
}

impl PricingRuleEngine {
    /// Creates an engine reading live rules from `store`.
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self { store }
    }

    /// Applies every live rule to `base_price` for `operation` now.
    pub fn apply_rules(
        &self,
        base_price: Decimal,
        operation: OperationType,
        scope: &ScopeRequest,
    ) -> EngineResult<RuleEvaluation> {
        self.apply_rules_at(base_price, operation, scope, Utc::now(), RuleFilter::All)
    }

    /// Applies the rules live at `at` and admitted by `filter`.
    ///
    /// Only a failure to load rules is an error; individual rule failures
    /// are isolated.
    pub fn apply_rules_at(
        &self,
        base_price: Decimal,
        operation: OperationType,
        scope: &ScopeRequest,
        at: DateTime<Utc>,
        filter: RuleFilter,
    ) -> EngineResult<RuleEvaluation> {
        let rules = self.store.live_rules(at)?;
        Ok(evaluate_rules(&rules, base_price, operation, scope, filter))
    }
}

/// Returns true if `rule`'s restrictions and conditions admit the request.
///
/// The outlet allowlist is only checked when the request names an outlet.
/// Conditions on `operation_type` see `operation`.
pub fn rule_applies(
    rule: &PricingRule,
    operation: OperationType,
    scope: &ScopeRequest,
) -> EngineResult<bool> {
    if !rule.operation_types.is_empty() && !rule.operation_types.contains(&operation) {
        return Ok(false);
    }
    if let (Some(allowed), Some(outlet)) = (&rule.outlet_ids, scope.outlet_id) {
        if !allowed.contains(&outlet) {
            return Ok(false);
        }
    }
    let scope = scope.clone().with_operation(operation);
    conditions_hold(&rule.conditions, &scope)
}

/// Applies `rules` to `base_price`.
///
/// The caller supplies rules already filtered for liveness; this function
/// orders them, so input order does not matter.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use pricing_engine::models::{
///     Action, ActionType, ConditionOp, OperationType, PricingRule, RuleDraft, RuleType,
///     ScopeField, ScopeRequest,
/// };
/// use pricing_engine::pricing::{RuleFilter, evaluate_rules};
/// use rust_decimal::Decimal;
///
/// let draft = RuleDraft::new(
///     "Bulk 50+",
///     RuleType::VolumeDiscount,
///     vec![Action { action_type: ActionType::PercentageDiscount, value: Decimal::from(10) }],
/// )
/// .when(ScopeField::Quantity, ConditionOp::Gte, 50);
/// let rule = PricingRule::from_draft(draft, "admin", Utc::now());
///
/// let scope = ScopeRequest::new().with_quantity(60);
/// let result = evaluate_rules(&[rule], Decimal::from(100), OperationType::Refill, &scope, RuleFilter::All);
/// assert_eq!(result.adjusted_price, Decimal::from(90));
/// assert_eq!(result.steps.len(), 1);
/// ```
pub fn evaluate_rules(
    rules: &[PricingRule],
    base_price: Decimal,
    operation: OperationType,
    scope: &ScopeRequest,
    filter: RuleFilter,
) -> RuleEvaluation {
    let mut ordered: Vec<&PricingRule> = rules
        .iter()
        .filter(|rule| filter.admits(rule.rule_type))
        .collect();
    ordered.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });

    let mut running = base_price;
    let mut steps = Vec::new();
    let mut failed = Vec::new();

    for rule in ordered {
        match rule_applies(rule, operation, scope) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                warn!(rule_id = %rule.id, rule = %rule.name, error = %e, "skipping rule: conditions failed to evaluate");
                failed.push(SkippedRule {
                    rule_id: rule.id,
                    rule_name: rule.name.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        }

        match apply_actions(&rule.actions, running) {
            Ok(next) => {
                let actions: Vec<String> = rule.actions.iter().map(describe_action).collect();
                steps.push(PricingStep {
                    step_number: steps.len() as u32 + 1,
                    rule_id: rule.id,
                    rule_name: rule.name.clone(),
                    rule_type: rule.rule_type,
                    price_before: running,
                    price_after: next,
                    reasoning: format!(
                        "{} ({}): {}, ${} -> ${}",
                        rule.name,
                        rule.rule_type,
                        actions.join(", then "),
                        running,
                        next
                    ),
                });
                debug!(rule_id = %rule.id, before = %running, after = %next, "rule applied");
                running = next;
            }
            Err(e) => {
                warn!(rule_id = %rule.id, rule = %rule.name, error = %e, "skipping rule: actions failed");
                failed.push(SkippedRule {
                    rule_id: rule.id,
                    rule_name: rule.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let clamped = running.is_sign_negative() && !running.is_zero();
    if clamped {
        debug!(price = %running, "clamping negative price to zero");
        running = Decimal::ZERO;
    }

    RuleEvaluation {
        base_price,
        adjusted_price: running,
        steps,
        failed,
        clamped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, ActionType, ConditionOp, ConditionValue, RuleDraft, ScopeField};
    use chrono::Duration;
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn action(action_type: ActionType, value: &str) -> Action {
        Action {
            action_type,
            value: dec(value),
        }
    }

    fn rule(draft: RuleDraft) -> PricingRule {
        PricingRule::from_draft(draft, "admin", Utc::now())
    }

    fn bulk_discount() -> PricingRule {
        rule(
            RuleDraft::new(
                "Bulk 50+",
                RuleType::VolumeDiscount,
                vec![action(ActionType::PercentageDiscount, "10")],
            )
            .when(ScopeField::Quantity, ConditionOp::Gte, 50),
        )
    }

    struct StaticRules(Vec<PricingRule>);

    impl RuleStore for StaticRules {
        fn live_rules(&self, at: DateTime<Utc>) -> EngineResult<Vec<PricingRule>> {
            Ok(self.0.iter().filter(|r| r.is_live_at(at)).cloned().collect())
        }

        fn find_rule(&self, id: Uuid) -> EngineResult<Option<PricingRule>> {
            Ok(self.0.iter().find(|r| r.id == id).cloned())
        }

        fn all_rules(&self) -> EngineResult<Vec<PricingRule>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_volume_discount_applies_at_threshold() {
        let rules = vec![bulk_discount()];
        let scope = ScopeRequest::new().with_quantity(60);
        let result = evaluate_rules(&rules, dec("100"), OperationType::Refill, &scope, RuleFilter::All);

        assert_eq!(result.adjusted_price, dec("90"));
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].price_before, dec("100"));
        assert_eq!(result.steps[0].price_after, dec("90"));
        assert!(result.steps[0].reasoning.contains("10% discount"));
    }

    #[test]
    fn test_volume_discount_skipped_below_threshold() {
        let rules = vec![bulk_discount()];
        let scope = ScopeRequest::new().with_quantity(49);
        let result = evaluate_rules(&rules, dec("100"), OperationType::Refill, &scope, RuleFilter::All);
        assert_eq!(result.adjusted_price, dec("100"));
        assert!(result.steps.is_empty());
    }

    #[test]
    fn test_rules_run_in_priority_order() {
        let markup = rule(
            RuleDraft::new(
                "markup",
                RuleType::Surcharge,
                vec![action(ActionType::PercentageMarkup, "10")],
            )
            .with_priority(1),
        );
        let fixed = rule(
            RuleDraft::new("fixed", RuleType::FixedPrice, vec![action(ActionType::SetFixed, "50")])
                .with_priority(10),
        );
        let result = evaluate_rules(
            &[markup, fixed],
            dec("100"),
            OperationType::Lease,
            &ScopeRequest::new(),
            RuleFilter::All,
        );
        assert_eq!(result.steps[0].rule_name, "fixed");
        assert_eq!(result.adjusted_price, dec("55"));
    }

    #[test]
    fn test_equal_priority_runs_oldest_first() {
        let now = Utc::now();
        let mut older = rule(RuleDraft::new(
            "older",
            RuleType::FixedPrice,
            vec![action(ActionType::SetFixed, "10")],
        ));
        older.created_at = now - Duration::hours(1);
        let mut newer = rule(RuleDraft::new(
            "newer",
            RuleType::FixedPrice,
            vec![action(ActionType::SetFixed, "20")],
        ));
        newer.created_at = now;

        let result = evaluate_rules(
            &[newer, older],
            dec("100"),
            OperationType::Lease,
            &ScopeRequest::new(),
            RuleFilter::All,
        );
        assert_eq!(result.steps[0].rule_name, "older");
        assert_eq!(result.adjusted_price, dec("20"));
    }

    #[test]
    fn test_operation_type_restriction() {
        let refill_only = rule(
            RuleDraft::new("refill", RuleType::Promotion, vec![action(ActionType::Subtract, "5")])
                .for_operations(vec![OperationType::Refill]),
        );
        let scope = ScopeRequest::new();
        let lease = evaluate_rules(
            std::slice::from_ref(&refill_only),
            dec("100"),
            OperationType::Lease,
            &scope,
            RuleFilter::All,
        );
        let refill = evaluate_rules(&[refill_only], dec("100"), OperationType::Refill, &scope, RuleFilter::All);
        assert_eq!(lease.adjusted_price, dec("100"));
        assert_eq!(refill.adjusted_price, dec("95"));
    }

    #[test]
    fn test_outlet_allowlist_checked_only_when_outlet_given() {
        let outlet_five = rule(
            RuleDraft::new("outlet 5", RuleType::Promotion, vec![action(ActionType::Subtract, "5")])
                .for_outlets(vec![5]),
        );
        let rules = std::slice::from_ref(&outlet_five);
        let at = |scope: ScopeRequest| {
            evaluate_rules(rules, dec("100"), OperationType::Swap, &scope, RuleFilter::All).adjusted_price
        };
        assert_eq!(at(ScopeRequest::new().with_outlet(5)), dec("95"));
        assert_eq!(at(ScopeRequest::new().with_outlet(9)), dec("100"));
        assert_eq!(at(ScopeRequest::new()), dec("95"));
    }

    #[test]
    fn test_operation_condition_sees_the_priced_operation() {
        let swap_fee = rule(
            RuleDraft::new("swap fee", RuleType::Surcharge, vec![action(ActionType::Add, "3")])
                .when(ScopeField::OperationType, ConditionOp::Eq, "swap"),
        );
        let result = evaluate_rules(
            &[swap_fee],
            dec("10"),
            OperationType::Swap,
            &ScopeRequest::new(),
            RuleFilter::All,
        );
        assert_eq!(result.adjusted_price, dec("13"));
    }

    #[test]
    fn test_failing_rule_is_isolated() {
        let broken = rule(
            RuleDraft::new("broken", RuleType::Surcharge, vec![action(ActionType::Divide, "0")])
                .with_priority(5),
        );
        let good = rule(RuleDraft::new(
            "good",
            RuleType::Surcharge,
            vec![action(ActionType::Add, "10")],
        ));
        let result = evaluate_rules(
            &[broken.clone(), good],
            dec("100"),
            OperationType::Lease,
            &ScopeRequest::new(),
            RuleFilter::All,
        );
        assert_eq!(result.adjusted_price, dec("110"));
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].rule_id, broken.id);
    }

    #[test]
    fn test_failing_action_leaves_running_price_untouched() {
        let partial = rule(RuleDraft::new(
            "partial",
            RuleType::Surcharge,
            vec![action(ActionType::Add, "10"), action(ActionType::Divide, "0")],
        ));
        let result = evaluate_rules(
            &[partial],
            dec("100"),
            OperationType::Lease,
            &ScopeRequest::new(),
            RuleFilter::All,
        );
        assert_eq!(result.adjusted_price, dec("100"));
        assert!(result.steps.is_empty());
    }

    #[test]
    fn test_malformed_condition_is_isolated() {
        let malformed = rule(
            RuleDraft::new("malformed", RuleType::Promotion, vec![action(ActionType::Subtract, "1")])
                .when(ScopeField::CustomerTier, ConditionOp::In, ConditionValue::from("gold")),
        );
        let scope = ScopeRequest::new().with_customer_tier("gold");
        let result = evaluate_rules(&[malformed], dec("10"), OperationType::Lease, &scope, RuleFilter::All);
        assert_eq!(result.adjusted_price, dec("10"));
        assert_eq!(result.failed.len(), 1);
    }

    #[test]
    fn test_negative_result_is_clamped() {
        let huge = rule(RuleDraft::new(
            "huge",
            RuleType::Promotion,
            vec![action(ActionType::Subtract, "500")],
        ));
        let result = evaluate_rules(
            &[huge],
            dec("100"),
            OperationType::Lease,
            &ScopeRequest::new(),
            RuleFilter::All,
        );
        assert_eq!(result.adjusted_price, Decimal::ZERO);
        assert!(result.clamped);
        assert_eq!(result.steps[0].price_after, dec("-400"));
    }

    #[test]
    fn test_filter_excludes_and_selects_types() {
        let volume = bulk_discount();
        let surcharge = rule(RuleDraft::new(
            "delivery",
            RuleType::Surcharge,
            vec![action(ActionType::Add, "10")],
        ));
        let rules = vec![volume, surcharge];
        let scope = ScopeRequest::new().with_quantity(60);

        let without_volume = evaluate_rules(
            &rules,
            dec("100"),
            OperationType::Refill,
            &scope,
            RuleFilter::Except(RuleType::VolumeDiscount),
        );
        assert_eq!(without_volume.adjusted_price, dec("110"));

        let only_volume = evaluate_rules(
            &rules,
            dec("100"),
            OperationType::Refill,
            &scope,
            RuleFilter::Only(RuleType::VolumeDiscount),
        );
        assert_eq!(only_volume.adjusted_price, dec("90"));
    }

    #[test]
    fn test_engine_reads_only_live_rules() {
        let mut expired = bulk_discount();
        expired.valid_until = Some(Utc::now() - Duration::days(1));
        let mut inactive = bulk_discount();
        inactive.active = false;

        let engine = PricingRuleEngine::new(Arc::new(StaticRules(vec![expired, inactive])));
        let result = engine
            .apply_rules(dec("100"), OperationType::Refill, &ScopeRequest::new().with_quantity(60))
            .unwrap();
        assert_eq!(result.adjusted_price, dec("100"));
    }

    #[test]
    fn test_engine_applies_stored_rules() {
        let engine = PricingRuleEngine::new(Arc::new(StaticRules(vec![bulk_discount()])));
        let result = engine
            .apply_rules(dec("100"), OperationType::Refill, &ScopeRequest::new().with_quantity(60))
            .unwrap();
        assert_eq!(result.adjusted_price, dec("90"));
    }
}
