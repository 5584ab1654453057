//! Specificity scoring and candidate ranking.
//!
//! A candidate setting scores the weight of every dimension it constrains
//! (and therefore matched). The ordering of the weights is what matters:
//! an operation-type override outranks any combination of tier, cylinder and
//! outlet overrides, and so on down the list.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{ScopeRequest, Setting, SettingScope};

/// Per-dimension weights used to score matching candidates.
///
/// # Example
///
/// ```
/// use pricing_engine::resolution::SpecificityWeights;
///
/// let weights = SpecificityWeights::default();
/// assert_eq!(weights.operation_type, 8);
/// assert!(weights.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificityWeights {
    /// Weight of a matched operation type constraint.
    pub operation_type: u32,
    /// Weight of a matched customer tier constraint.
    pub customer_tier: u32,
    /// Weight of a matched cylinder type constraint.
    pub cylinder_type: u32,
    /// Weight of a matched outlet constraint.
    pub outlet_id: u32,
}

impl Default for SpecificityWeights {
    fn default() -> Self {
        Self {
            operation_type: 8,
            customer_tier: 4,
            cylinder_type: 2,
            outlet_id: 1,
        }
    }
}

impl SpecificityWeights {
    /// Checks that each dimension strictly outranks every combination of the
    /// dimensions below it.
    ///
    /// A sum of lower weights that overflows `u32` can never be exceeded, so
    /// such weights are rejected rather than wrapped.
    pub fn validate(&self) -> EngineResult<()> {
        let below_tier = self.cylinder_type.checked_add(self.outlet_id);
        let below_operation = below_tier.and_then(|sum| sum.checked_add(self.customer_tier));
        let ok = self.outlet_id > 0
            && self.cylinder_type > self.outlet_id
            && below_tier.is_some_and(|sum| self.customer_tier > sum)
            && below_operation.is_some_and(|sum| self.operation_type > sum);

        if ok {
            Ok(())
        } else {
            Err(EngineError::validation(
                "specificity",
                format!(
                    "weights must satisfy operation_type > customer_tier > cylinder_type > outlet_id > 0 \
                     with each exceeding the sum of those below, got {}/{}/{}/{}",
                    self.operation_type, self.customer_tier, self.cylinder_type, self.outlet_id
                ),
            ))
        }
    }

    /// Scores a candidate scope against a request.
    ///
    /// Returns `None` if the candidate does not match the request. Scores
    /// are widened to `u64` so four `u32` weights always sum without overflow.
    pub fn score(&self, candidate: &SettingScope, request: &ScopeRequest) -> Option<u64> {
        if !candidate.matches(request) {
            return None;
        }

        let mut score = 0u64;
        if candidate.operation_type.is_some() {
            score += u64::from(self.operation_type);
        }
        if candidate.customer_tier.is_some() {
            score += u64::from(self.customer_tier);
        }
        if candidate.cylinder_type.is_some() {
            score += u64::from(self.cylinder_type);
        }
        if candidate.outlet_id.is_some() {
            score += u64::from(self.outlet_id);
        }
        Some(score)
    }
}

/// A matching candidate with its ranking inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    /// The candidate setting id.
    pub setting_id: Uuid,
    /// Its specificity score.
    pub score: u64,
    /// Its priority.
    pub priority: i32,
    /// Its creation time.
    pub created_at: DateTime<Utc>,
}

fn rank_order(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.score
        .cmp(&a.score)
        .then(b.priority.cmp(&a.priority))
        .then(a.created_at.cmp(&b.created_at))
        .then(a.setting_id.cmp(&b.setting_id))
}

/// Ranks the candidates that match `request`, best first.
///
/// Order: specificity descending, priority descending, creation time
/// ascending, then id for a total order.
pub fn rank_candidates<'a>(
    candidates: impl IntoIterator<Item = &'a Setting>,
    request: &ScopeRequest,
    weights: &SpecificityWeights,
) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .into_iter()
        .filter_map(|setting| {
            weights
                .score(&setting.scope, request)
                .map(|score| RankedCandidate {
                    setting_id: setting.id,
                    score,
                    priority: setting.priority,
                    created_at: setting.created_at,
                })
        })
        .collect();
    ranked.sort_by(rank_order);
    ranked
}

/// Picks the best matching setting for `request`, if any.
pub fn select_best<'a>(
    candidates: &'a [Setting],
    request: &ScopeRequest,
    weights: &SpecificityWeights,
) -> Option<&'a Setting> {
    rank_candidates(candidates, request, weights)
        .first()
        .and_then(|best| candidates.iter().find(|s| s.id == best.setting_id))
}
