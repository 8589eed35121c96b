//! Invoice number generation.
//!
//! Generated numbers look like `INV-<unix millis>-<5 digits>`. When a candidate is
//! already taken, a random 3-digit suffix is appended to the base number.

use chrono::{DateTime, Utc};
use rand::Rng;

/// Attempts made before giving up on finding a free invoice number.
pub const MAX_NUMBER_ATTEMPTS: usize = 8;

/// Fresh base number for the given instant.
pub fn base_invoice_number(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    format!(
        "INV-{}-{:05}",
        now.timestamp_millis(),
        rng.gen_range(10_000..100_000)
    )
}

/// Candidate for the given attempt: the base itself first, then suffixed variants.
pub fn candidate_invoice_number(base: &str, attempt: usize) -> String {
    if attempt == 0 {
        return base.to_string();
    }
    let mut rng = rand::thread_rng();
    format!("{}-{:03}", base, rng.gen_range(100..1000))
}
