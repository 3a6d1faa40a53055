//! Facility-local wall clock.
//!
//! Turno times are stored as naive local timestamps; audit stamps are UTC.

use chrono::{DateTime, Local, NaiveDateTime, Utc};

/// Current facility-local time
pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Convert an audit timestamp to the facility-local clock
pub fn to_local(at: DateTime<Utc>) -> NaiveDateTime {
    at.with_timezone(&Local).naive_local()
}
