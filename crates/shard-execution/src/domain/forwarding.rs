//! # Forwarding Resolver
//!
//! Allocates the fee budget left after a message's own execution among the
//! async calls it queued.
//!
//! ## Allocation order
//!
//! 1. `Value` and `None` calls reserve their fixed amount.
//! 2. `Percentage` calls take `floor(base * pct / 100)` of what step 1 left.
//!    Percentages across one message may sum to at most 100.
//! 3. `Remaining` calls split what is left evenly. The division remainder, or
//!    everything when there are no `Remaining` calls, is refunded.
//!
//! Either failure in step 1 or 2 fails the whole message.

use crate::domain::entities::ForwardKind;
use crate::domain::value_objects::{Value, U256};
use crate::errors::ForwardingError;

/// One call as seen by the resolver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForwardRequest {
    /// Funding policy.
    pub kind: ForwardKind,
    /// Fixed amount (`Value`/`None`) or percentage (`Percentage`).
    pub requested: Value,
}

impl ForwardRequest {
    /// Creates a request.
    #[must_use]
    pub const fn new(kind: ForwardKind, requested: Value) -> Self {
        Self { kind, requested }
    }
}

/// Outcome of a successful allocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwardingPlan {
    /// Concrete fee credit per call, in request order.
    pub credits: Vec<Value>,
    /// Sum of the credits.
    pub forwarded: Value,
    /// Budget not forwarded; returned to the refund address.
    pub leftover: Value,
}

/// Splits `budget` among `requests`.
///
/// # Errors
///
/// - [`ForwardingError::InsufficientBudget`] if the fixed reservations
///   exceed the budget
/// - [`ForwardingError::PercentageOverflow`] if the percentages sum above 100
pub fn resolve(budget: Value, requests: &[ForwardRequest]) -> Result<ForwardingPlan, ForwardingError> {
    let mut credits = vec![Value::zero(); requests.len()];

    // Step 1: fixed reservations.
    let mut remaining = budget;
    for (credit, request) in credits.iter_mut().zip(requests) {
        match request.kind {
            ForwardKind::Value | ForwardKind::None => {
                remaining = remaining.checked_sub(request.requested).ok_or(
                    ForwardingError::InsufficientBudget {
                        requested: request.requested,
                        available: remaining,
                    },
                )?;
                *credit = request.requested;
            }
            ForwardKind::Percentage | ForwardKind::Remaining => {}
        }
    }

    // Step 2: percentages of what step 1 left.
    let total_pct = requests
        .iter()
        .filter(|r| r.kind == ForwardKind::Percentage)
        .try_fold(U256::zero(), |acc, r| acc.checked_add(r.requested))
        .filter(|total| *total <= U256::from(100u8))
        .ok_or(ForwardingError::PercentageOverflow)?;

    let base = remaining;
    if !total_pct.is_zero() {
        for (credit, request) in credits.iter_mut().zip(requests) {
            if request.kind == ForwardKind::Percentage {
                let share = percentage_of(base, request.requested);
                *credit = share;
                remaining -= share;
            }
        }
    }

    // Step 3: even split of the rest.
    let remaining_calls = requests
        .iter()
        .filter(|r| r.kind == ForwardKind::Remaining)
        .count();
    let leftover = if remaining_calls == 0 {
        remaining
    } else {
        let share = remaining / U256::from(remaining_calls);
        for (credit, request) in credits.iter_mut().zip(requests) {
            if request.kind == ForwardKind::Remaining {
                *credit = share;
            }
        }
        remaining % U256::from(remaining_calls)
    };

    let forwarded = credits.iter().fold(Value::zero(), |acc, credit| acc + *credit);

    Ok(ForwardingPlan {
        credits,
        forwarded,
        leftover,
    })
}

/// `floor(base * pct / 100)` without intermediate overflow. `pct <= 100`.
fn percentage_of(base: Value, pct: Value) -> Value {
    let hundred = U256::from(100u8);
    let quotient = base / hundred;
    let rest = base % hundred;
    quotient * pct + rest * pct / hundred
}
