//! # FEFO Batch Allocator
//!
//! First-Expired-First-Out allocation of a requested quantity across the
//! batches of a single product.
//!
//! ## Allocation walk
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Batches (after filter + sort):                                         │
//! │                                                                         │
//! │    ┌─────────────┐  ┌─────────────┐  ┌─────────────┐                   │
//! │    │ exp 03-01   │  │ exp 03-15   │  │ exp (none)  │                   │
//! │    │ qty 4       │  │ qty 10      │  │ qty 50      │                   │
//! │    └──────┬──────┘  └──────┬──────┘  └─────────────┘                   │
//! │           │ take 4         │ take 2                                     │
//! │           ▼                ▼                                            │
//! │    requested 6  →  [ (03-01, 4), (03-15, 2) ]                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This module is pure: the caller snapshots batch rows inside its own
//! transaction, and the allocation plan is deterministic given the snapshot
//! and `now`. Expired stock is excluded unless the caller passes the
//! operator's explicit confirmation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Snapshot & Allocation Types
// =============================================================================

/// The slice of a batch row the allocator needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSnapshot {
    pub batch_id: String,
    pub current_quantity: i64,
    /// `None` means the lot never expires; sorted after all dated lots.
    pub expiration_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BatchSnapshot {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expiration_date, Some(exp) if exp < now)
    }
}

/// One entry of an allocation plan: take `quantity` units from `batch_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAllocation {
    pub batch_id: String,
    pub quantity: i64,
    pub expiration_date: Option<DateTime<Utc>>,
    /// Whether this lot was already expired when allocated. Only possible
    /// when the caller opted in to expired stock.
    pub is_expired: bool,
}

// =============================================================================
// Allocation Error
// =============================================================================

/// Why an allocation could not be fulfilled.
///
/// The two shortfall cases are distinct variants so callers can branch
/// without inspecting messages: `InsufficientValidStock` means expired lots
/// hold enough units to matter, and the operator can be offered a
/// sell-expired confirmation instead of a flat rejection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// Total usable stock cannot cover the request.
    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    /// Non-expired stock cannot cover the request, but expired units exist.
    #[error(
        "insufficient valid stock: available {available}, requested {requested}, \
         expired on hand {expired}"
    )]
    InsufficientValidStock {
        available: i64,
        requested: i64,
        expired: i64,
    },
}

// =============================================================================
// Allocator
// =============================================================================

/// Builds a FEFO allocation plan for `requested` units.
///
/// 1. Batches with no remaining units are skipped.
/// 2. Expired batches are skipped unless `include_expired`.
/// 3. Eligible batches are walked earliest-expiration-first (undated lots
///    last, ties broken by creation time, oldest first), taking
///    `min(batch.current_quantity, remaining)` from each.
///
/// Returns the plan, or a structured shortfall error. `requested` must be
/// positive.
pub fn select_batches(
    batches: &[BatchSnapshot],
    requested: i64,
    include_expired: bool,
    now: DateTime<Utc>,
) -> Result<Vec<BatchAllocation>, AllocationError> {
    let mut eligible: Vec<&BatchSnapshot> = batches
        .iter()
        .filter(|b| b.current_quantity > 0)
        .filter(|b| include_expired || !b.is_expired(now))
        .collect();

    // FEFO order: earliest expiration first, undated lots last,
    // ties resolved by receiving order.
    eligible.sort_by(|a, b| {
        match (a.expiration_date, b.expiration_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
        .then_with(|| a.created_at.cmp(&b.created_at))
    });

    let available: i64 = eligible.iter().map(|b| b.current_quantity).sum();
    if available < requested {
        let expired: i64 = batches
            .iter()
            .filter(|b| b.current_quantity > 0 && b.is_expired(now))
            .map(|b| b.current_quantity)
            .sum();
        // Only meaningful when expired lots were excluded from the walk.
        if !include_expired && expired > 0 {
            return Err(AllocationError::InsufficientValidStock {
                available,
                requested,
                expired,
            });
        }
        return Err(AllocationError::InsufficientStock {
            available,
            requested,
        });
    }

    let mut remaining = requested;
    let mut plan = Vec::new();
    for batch in eligible {
        if remaining == 0 {
            break;
        }
        let take = batch.current_quantity.min(remaining);
        plan.push(BatchAllocation {
            batch_id: batch.batch_id.clone(),
            quantity: take,
            expiration_date: batch.expiration_date,
            is_expired: batch.is_expired(now),
        });
        remaining -= take;
    }
    Ok(plan)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn batch(id: &str, qty: i64, expires_in_days: Option<i64>, now: DateTime<Utc>) -> BatchSnapshot {
        BatchSnapshot {
            batch_id: id.to_string(),
            current_quantity: qty,
            expiration_date: expires_in_days.map(|d| now + Duration::days(d)),
            created_at: now - Duration::days(30),
        }
    }

    #[test]
    fn test_earliest_expiration_depleted_first() {
        let now = Utc::now();
        let batches = vec![
            batch("late", 10, Some(30), now),
            batch("early", 10, Some(5), now),
        ];
        let plan = select_batches(&batches, 6, false, now).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].batch_id, "early");
        assert_eq!(plan[0].quantity, 6);
    }

    #[test]
    fn test_split_across_batches() {
        let now = Utc::now();
        let batches = vec![
            batch("b1", 4, Some(5), now),
            batch("b2", 10, Some(30), now),
        ];
        let plan = select_batches(&batches, 6, false, now).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!((plan[0].batch_id.as_str(), plan[0].quantity), ("b1", 4));
        assert_eq!((plan[1].batch_id.as_str(), plan[1].quantity), ("b2", 2));
    }

    #[test]
    fn test_undated_batches_allocated_last() {
        let now = Utc::now();
        let batches = vec![
            batch("undated", 50, None, now),
            batch("dated", 3, Some(10), now),
        ];
        let plan = select_batches(&batches, 5, false, now).unwrap();
        assert_eq!(plan[0].batch_id, "dated");
        assert_eq!(plan[0].quantity, 3);
        assert_eq!(plan[1].batch_id, "undated");
        assert_eq!(plan[1].quantity, 2);
    }

    #[test]
    fn test_expiration_tie_broken_by_age() {
        let now = Utc::now();
        let mut older = batch("older", 5, Some(10), now);
        older.created_at = now - Duration::days(60);
        let newer = batch("newer", 5, Some(10), now);
        let plan = select_batches(&[newer, older], 4, false, now).unwrap();
        assert_eq!(plan[0].batch_id, "older");
    }

    #[test]
    fn test_empty_batches_skipped() {
        let now = Utc::now();
        let batches = vec![
            batch("empty", 0, Some(1), now),
            batch("stocked", 10, Some(5), now),
        ];
        let plan = select_batches(&batches, 3, false, now).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].batch_id, "stocked");
    }

    #[test]
    fn test_expired_excluded_by_default() {
        let now = Utc::now();
        let batches = vec![
            batch("expired", 10, Some(-1), now),
            batch("fresh", 10, Some(10), now),
        ];
        let plan = select_batches(&batches, 5, false, now).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].batch_id, "fresh");
        assert!(!plan[0].is_expired);
    }

    #[test]
    fn test_shortfall_with_expired_on_hand_is_valid_stock_error() {
        let now = Utc::now();
        let batches = vec![
            batch("expired", 10, Some(-1), now),
            batch("fresh", 2, Some(10), now),
        ];
        let err = select_batches(&batches, 6, false, now).unwrap_err();
        assert_eq!(
            err,
            AllocationError::InsufficientValidStock {
                available: 2,
                requested: 6,
                expired: 10,
            }
        );
    }

    #[test]
    fn test_shortfall_without_expired_is_plain_error() {
        let now = Utc::now();
        let batches = vec![batch("b1", 2, Some(10), now)];
        let err = select_batches(&batches, 6, false, now).unwrap_err();
        assert_eq!(
            err,
            AllocationError::InsufficientStock {
                available: 2,
                requested: 6,
            }
        );
    }

    #[test]
    fn test_include_expired_unlocks_expired_lots() {
        let now = Utc::now();
        let batches = vec![
            batch("expired", 10, Some(-1), now),
            batch("fresh", 2, Some(10), now),
        ];
        let plan = select_batches(&batches, 6, true, now).unwrap();
        // expired lot has the earliest expiration, so it leads the walk
        assert_eq!(plan[0].batch_id, "expired");
        assert_eq!(plan[0].quantity, 6);
        assert!(plan[0].is_expired);
    }

    #[test]
    fn test_shortfall_even_with_expired_included() {
        let now = Utc::now();
        let batches = vec![
            batch("expired", 3, Some(-1), now),
            batch("fresh", 2, Some(10), now),
        ];
        let err = select_batches(&batches, 10, true, now).unwrap_err();
        // With expired already included there is no confirmation left to
        // offer, so the plain variant is returned.
        assert_eq!(
            err,
            AllocationError::InsufficientStock {
                available: 5,
                requested: 10,
            }
        );
    }

    #[test]
    fn test_exact_fit_consumes_whole_batch() {
        let now = Utc::now();
        let batches = vec![batch("b1", 6, Some(10), now)];
        let plan = select_batches(&batches, 6, false, now).unwrap();
        assert_eq!(plan[0].quantity, 6);
    }
}
