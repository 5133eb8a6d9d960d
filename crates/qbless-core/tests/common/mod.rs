use chrono::{DateTime, TimeZone, Utc};
use qbless_core::condition::{AttributeCondition, BinOpCondition, FixedClock, TimeIntervalCondition};
use qbless_core::qualifier::{Qualifier, Selector};
use std::sync::Arc;

/// Midnight UTC on the given day
#[allow(dead_code)]
pub fn ts(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// Attribute condition allowing only the equality class on `key`
#[allow(dead_code)]
pub fn equals_only(key: &str) -> AttributeCondition {
    AttributeCondition::new(key, false, true, false, false)
}

/// `key = value`
#[allow(dead_code)]
pub fn eq(key: &str, value: impl Into<qbless_core::Value>) -> Qualifier {
    Qualifier::key_value(key, Selector::Equal, value)
}

/// `key >= at`
#[allow(dead_code)]
pub fn since(key: &str, at: DateTime<Utc>) -> Qualifier {
    Qualifier::key_value(key, Selector::GreaterThanOrEqual, at)
}

/// `key <= at`
#[allow(dead_code)]
pub fn until(key: &str, at: DateTime<Utc>) -> Qualifier {
    Qualifier::key_value(key, Selector::LessThanOrEqual, at)
}

/// Tenant scoping plus a 90 day `createdAt` window ending "now"
#[allow(dead_code)]
pub fn tenant_and_recent(now: DateTime<Utc>) -> BinOpCondition {
    BinOpCondition::and(
        equals_only("tenantId").with_error_message("TENANT_REQUIRED"),
        TimeIntervalCondition::new("createdAt", 0, 90, true)
            .with_clock(Arc::new(FixedClock(now)))
            .with_error_message("WINDOW_TOO_WIDE"),
    )
}
