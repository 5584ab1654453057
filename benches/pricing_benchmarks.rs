//! Performance benchmarks for the pricing engine.
//!
//! This suite tracks the hot paths of a quoting request:
//! - Setting resolution across scope levels (cached and uncached)
//! - Rule evaluation over a growing rule set
//! - A full single-operation quote including tax
//! - Bulk pricing across several cylinder types
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rust_decimal::Decimal;

use pricing_engine::config::{ConfigLoader, EngineConfig};
use pricing_engine::engine::PricingEngine;
use pricing_engine::models::{
    Action, ActionType, BulkItem, ConditionOp, ConditionValue, OperationType, RuleDraft, RuleType,
    ScopeField, ScopeRequest,
};
use pricing_engine::pricing::{RuleFilter, evaluate_rules};

/// Creates an engine seeded from the default configuration.
fn create_seeded_engine() -> PricingEngine {
    PricingEngine::from_config_dir("./config/default").expect("Failed to load config")
}

/// Creates a seeded engine with response caching switched off.
fn create_uncached_engine() -> PricingEngine {
    let (mut engine_config, settings, rules) = ConfigLoader::load("./config/default")
        .expect("Failed to load config")
        .into_parts();
    engine_config.cache_ttl_seconds = 0;
    let engine = PricingEngine::in_memory(engine_config).expect("Failed to build engine");
    engine.seed(&settings, &rules).expect("Failed to seed");
    engine
}

/// A gold customer refilling ten 45kg cylinders at outlet 5.
fn create_scope() -> ScopeRequest {
    ScopeRequest::new()
        .with_outlet(5)
        .with_cylinder_type("45kg")
        .with_customer_tier("gold")
        .with_quantity(10)
}

/// Benchmark: Resolving a single setting with and without the cache.
fn bench_resolve_setting(c: &mut Criterion) {
    let cached = create_seeded_engine();
    let uncached = create_uncached_engine();
    let scope = create_scope();

    let mut group = c.benchmark_group("resolve_setting");
    group.bench_function("cached", |b| {
        b.iter(|| black_box(cached.get_setting("refill.base_price", black_box(&scope)).unwrap()))
    });
    group.bench_function("uncached", |b| {
        b.iter(|| black_box(uncached.get_setting("refill.base_price", black_box(&scope)).unwrap()))
    });
    group.finish();
}

/// Benchmark: Rule evaluation as the number of candidate rules grows.
fn bench_evaluate_rules(c: &mut Criterion) {
    let engine = PricingEngine::in_memory(EngineConfig::default()).expect("Failed to build engine");
    let scope = create_scope().with_operation(OperationType::Refill);

    let mut group = c.benchmark_group("evaluate_rules");
    let mut created = 0usize;

    for rule_count in [1usize, 10, 50, 100].iter() {
        // Rules accumulate across iterations; only the difference is added
        while created < *rule_count {
            let draft = RuleDraft::new(
                format!("Tier {} discount", created),
                RuleType::CustomerDiscount,
                vec![Action {
                    action_type: ActionType::PercentageDiscount,
                    value: Decimal::ONE,
                }],
            )
            .when(
                ScopeField::Quantity,
                ConditionOp::Gte,
                ConditionValue::Number(Decimal::from(created % 20)),
            )
            .with_priority(created as i32);
            engine
                .create_rule(draft, "bench", None)
                .expect("Failed to create rule");
            created += 1;
        }
        let rules = engine.list_rules().expect("Failed to list rules");

        group.throughput(Throughput::Elements(*rule_count as u64));
        group.bench_with_input(BenchmarkId::new("rules", rule_count), &rules, |b, rules| {
            b.iter(|| {
                black_box(evaluate_rules(
                    rules,
                    Decimal::from(300),
                    OperationType::Refill,
                    black_box(&scope),
                    RuleFilter::All,
                ))
            })
        });
    }

    group.finish();
}

/// Benchmark: A full quote (base price, rules and tax).
fn bench_quote(c: &mut Criterion) {
    let engine = create_seeded_engine();
    let scope = create_scope();

    c.bench_function("quote_refill", |b| {
        b.iter(|| black_box(engine.get_quote(OperationType::Refill, black_box(&scope)).unwrap()))
    });
}

/// Benchmark: Bulk pricing with a growing number of order lines.
fn bench_bulk(c: &mut Criterion) {
    let engine = create_seeded_engine();
    let scope = ScopeRequest::new().with_outlet(5).with_customer_tier("gold");
    let cylinder_types = ["12kg", "45kg", "9kg", "19kg"];

    let mut group = c.benchmark_group("bulk_price");

    for line_count in [1usize, 4, 16].iter() {
        let items: Vec<BulkItem> = cylinder_types
            .iter()
            .cycle()
            .take(*line_count)
            .enumerate()
            .map(|(i, cylinder)| BulkItem::new(*cylinder, (i as u32 % 5) * 10 + 5))
            .collect();

        group.throughput(Throughput::Elements(*line_count as u64));
        group.bench_with_input(BenchmarkId::new("lines", line_count), &items, |b, items| {
            b.iter(|| {
                black_box(
                    engine
                        .calculate_bulk_price(OperationType::Refill, black_box(items), &scope)
                        .unwrap(),
                )
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_resolve_setting,
    bench_evaluate_rules,
    bench_quote,
    bench_bulk,
);
criterion_main!(benches);
