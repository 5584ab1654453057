//! Hierarchical Configuration and Dynamic Pricing Rules Engine
//!
//! This crate resolves scoped, versioned settings (global, per operation,
//! customer tier, cylinder type and outlet) to the single most specific
//! value for a request, and prices gas cylinder operations by applying
//! ordered pricing rules, volume discounts and tax on top of resolved base
//! prices. Every configuration change is audited in the same transaction
//! that makes it.
//!
//! The usual entry point is [`engine::PricingEngine`].

#![warn(missing_docs)]

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod pricing;
pub mod resolution;
pub mod store;
