//! Time-ordered identifiers.
//!
//! Every row id is a ULID from one process-wide monotonic generator, and a
//! row's `created_at` is the millisecond timestamp embedded in its id. Sorting
//! by id therefore always agrees with sorting by creation time.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;
use ulid::{Generator, Ulid};

static GENERATOR: Lazy<Mutex<Generator>> = Lazy::new(|| Mutex::new(Generator::new()));

/// Generate the next identifier, strictly greater than any previous one
/// produced by this process.
#[must_use]
pub fn next_id() -> Ulid {
    let mut generator = GENERATOR.lock().unwrap_or_else(PoisonError::into_inner);
    // Overflow only happens after 2^80 ids in one millisecond.
    generator.generate().unwrap_or_else(|_| Ulid::new())
}

/// Identifier for a row created at `at`. Used for imports and tests that need
/// rows in the past; ordering against [`next_id`] holds across milliseconds.
#[must_use]
pub fn id_at(at: DateTime<Utc>) -> Ulid {
    Ulid::from_datetime(SystemTime::from(at))
}

/// Creation time embedded in an identifier.
#[must_use]
pub fn timestamp_of(id: Ulid) -> DateTime<Utc> {
    let millis = i64::try_from(id.timestamp_ms()).unwrap_or(i64::MAX);
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}
