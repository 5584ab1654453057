//! Core data models for the pricing engine.
//!
//! This module contains all the domain models used throughout the engine.

mod audit;
mod pricing_result;
mod pricing_rule;
mod scope;
mod setting;
mod statistics;

pub use audit::{AuditAction, AuditRecord, AuditSubject};
pub use pricing_result::{
    BulkItem, BulkPriceResult, ItemPrice, PriceQuote, PricingStep, RuleEvaluation, SkippedRule,
    TaxBreakdown,
};
pub use pricing_rule::{
    Action, ActionType, Condition, ConditionOp, ConditionValue, PricingRule, RuleDraft, RuleType,
    ScopeField,
};
pub use scope::{OperationType, ScopeRequest, SettingScope};
pub use setting::{Category, DataType, SetSettingOptions, Setting, SettingValue};
pub use statistics::{SettingStatistics, StatisticsFilter, compute_statistics};
