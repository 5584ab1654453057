//! Scope resolution for hierarchical settings.
//!
//! Given a key and a [`ScopeRequest`](crate::models::ScopeRequest), the
//! resolver collects the effective settings for the key, keeps those whose
//! scope matches the request, ranks them by specificity, priority and age,
//! and returns the winner's value.

mod cache;
mod resolver;
mod specificity;

pub use cache::{DEFAULT_MAX_ENTRIES, Generation, ResolutionCache};
pub use resolver::ScopeResolver;
pub use specificity::{RankedCandidate, SpecificityWeights, rank_candidates, select_best};
