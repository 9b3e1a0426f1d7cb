//! Retry eligibility.
//!
//! # Design Decisions
//! - Only failures that reached (or raced) the backend are retryable:
//!   upstream errors and per-call timeouts
//! - Admission rejections (rate limit, open circuit) and routing misses
//!   are terminal for the request
//! - Retries always target the already-selected route; reselection is a
//!   separate, explicitly-configured policy

use crate::error::Error;

/// True for error kinds the controller may retry against the same route.
pub fn is_retryable(error: &Error) -> bool {
    matches!(error, Error::Timeout { .. } | Error::Upstream { .. })
}
