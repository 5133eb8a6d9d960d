//! Bounded date window on a timestamp attribute

use super::{leaf_mismatch, Condition};
use crate::context::{BlessingContext, ErrorCause};
use crate::errors::PolicyError;
use crate::policy::ConditionSpec;
use crate::qualifier::{Selector, Value};
use crate::status::{BlessingStatus, TimeIntervalStatus};
use chrono::{DateTime, Days, Months, Utc};
use std::fmt;
use std::sync::Arc;

/// Source of "now" for conditions that default their upper boundary
pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Requires the filter to confine `condition_key` to a window of at most
/// `min_months` months plus `min_days` days
///
/// Lower bounds come from `>`/`>=` leaves and upper bounds from `<`/`<=`
/// leaves (swapped below a `Not`); the tightest of each is kept. An `=` leaf
/// pins the attribute and satisfies the condition outright. With
/// `default_upper`, "now" seeds the upper bound so an open-ended
/// `createdAt >= x` filter is measured against the present.
///
/// The window is calendar based: months are added first, clamped to the end
/// of the target month, then days.
#[derive(Debug, Clone)]
pub struct TimeIntervalCondition {
    error_message: Option<String>,
    condition_key: String,
    min_months: u32,
    min_days: u32,
    default_upper: bool,
    allow_null_qualifier: bool,
    clock: Arc<dyn Clock>,
}

impl TimeIntervalCondition {
    pub fn new(
        condition_key: impl Into<String>,
        min_months: u32,
        min_days: u32,
        default_upper: bool,
    ) -> Self {
        Self {
            error_message: None,
            condition_key: condition_key.into(),
            min_months,
            min_days,
            default_upper,
            allow_null_qualifier: false,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_error_message(mut self, error_message: impl Into<String>) -> Self {
        self.error_message = Some(error_message.into());
        self
    }

    pub fn allowing_null_qualifier(mut self) -> Self {
        self.allow_null_qualifier = true;
        self
    }

    /// Replace the clock used to seed the default upper boundary
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn condition_key(&self) -> &str {
        &self.condition_key
    }

    /// Latest upper boundary admissible for a filter starting at `lower`
    ///
    /// `None` when the window runs past the representable range, in which
    /// case any upper boundary fits.
    pub fn window_end(&self, lower: DateTime<Utc>) -> Option<DateTime<Utc>> {
        lower
            .checked_add_months(Months::new(self.min_months))?
            .checked_add_days(Days::new(u64::from(self.min_days)))
    }

    fn within_window(&self, interval: &TimeIntervalStatus) -> bool {
        match interval.bounds() {
            Some((lower, upper)) => self.window_end(lower).map_or(true, |end| end >= upper),
            None => false,
        }
    }
}

impl Condition for TimeIntervalCondition {
    fn new_status(&self) -> BlessingStatus {
        let interval = if self.default_upper {
            TimeIntervalStatus::with_upper_boundary(self.clock.now())
        } else {
            TimeIntervalStatus::new()
        };
        BlessingStatus::time_interval(interval)
    }

    fn evaluate(
        &self,
        key: &str,
        value: &Value,
        selector: Selector,
        ctx: &mut BlessingContext<'_>,
    ) -> bool {
        let timestamp = match value.as_timestamp() {
            Some(ts) if self.condition_key == key => ts,
            _ => return leaf_mismatch(self.error_message.as_deref(), key, value, selector, ctx),
        };

        let negate = ctx.status().negate();
        let (is_greater, is_less, is_equal) = if negate {
            (
                selector.is_less(),
                selector.is_greater(),
                selector.is_not_equal(),
            )
        } else {
            (
                selector.is_greater(),
                selector.is_less(),
                selector == Selector::Equal,
            )
        };

        if is_equal {
            return true;
        }

        let within = match ctx.status_mut().time_interval_status_mut() {
            Some(interval) => {
                if is_greater {
                    interval.tighten_lower(timestamp);
                } else if is_less {
                    interval.tighten_upper(timestamp);
                }
                self.within_window(interval)
            }
            None => {
                tracing::warn!(
                    condition_key = %self.condition_key,
                    status = %ctx.status(),
                    "time interval condition evaluated against a foreign status"
                );
                false
            }
        };

        if within {
            return true;
        }
        leaf_mismatch(self.error_message.as_deref(), key, value, selector, ctx)
    }

    fn evaluate_null_qualifier(&self, ctx: &mut BlessingContext<'_>) -> bool {
        if self.allow_null_qualifier {
            return true;
        }
        ctx.record_error_cause(ErrorCause::no_qualifier());
        false
    }

    fn error_message(&self, _status: &BlessingStatus) -> Option<String> {
        self.error_message.clone()
    }

    fn verdict(&self, status: &BlessingStatus) -> bool {
        status
            .time_interval_status()
            .is_some_and(|interval| self.within_window(interval))
    }

    fn to_spec(&self) -> Result<ConditionSpec, PolicyError> {
        Ok(ConditionSpec::TimeInterval {
            error_message: self.error_message.clone(),
            condition_key: self.condition_key.clone(),
            min_months: self.min_months,
            min_days: self.min_days,
            default_upper: self.default_upper,
            allow_null_qualifier: self.allow_null_qualifier,
        })
    }
}
