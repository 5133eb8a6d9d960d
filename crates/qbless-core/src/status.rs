//! Per-call evidence accumulated while a qualifier is blessed
//!
//! Every `Condition` hands out a fresh `BlessingStatus` through
//! `Condition::new_status()`. The status is owned by the blessing call and
//! threaded through the traversal by `&mut`; conditions themselves stay
//! immutable and can be shared between threads.

use chrono::{DateTime, Utc};
use std::fmt;

/// Mutable status of one condition node during one blessing call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlessingStatus {
    /// True while visiting a branch below an odd number of `Not` qualifiers
    negate: bool,
    state: StatusState,
}

/// Condition-specific part of a status
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StatusState {
    #[default]
    Plain,
    BinOp(Box<BinOpStatus>),
    TimeInterval(TimeIntervalStatus),
}

impl BlessingStatus {
    /// Status for conditions that carry no evidence beyond polarity
    pub fn plain() -> Self {
        Self::default()
    }

    /// Status for a two-child combinator
    pub fn new_bin_op(first_status: BlessingStatus, second_status: BlessingStatus) -> Self {
        Self {
            negate: false,
            state: StatusState::BinOp(Box::new(BinOpStatus {
                first_status,
                second_status,
                first_verified: false,
                second_verified: false,
            })),
        }
    }

    pub fn time_interval(interval: TimeIntervalStatus) -> Self {
        Self {
            negate: false,
            state: StatusState::TimeInterval(interval),
        }
    }

    pub fn negate(&self) -> bool {
        self.negate
    }

    /// Set the polarity of this status and of every nested sub-status
    pub fn set_negate(&mut self, negate: bool) {
        self.negate = negate;
        if let StatusState::BinOp(bin_op) = &mut self.state {
            bin_op.first_status.set_negate(negate);
            bin_op.second_status.set_negate(negate);
        }
    }

    /// Independent copy for blessing a separate qualifier branch
    ///
    /// The copy starts from the evidence gathered so far; evidence gathered in
    /// the branch never flows back into `self`.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    pub fn state(&self) -> &StatusState {
        &self.state
    }

    pub fn bin_op(&self) -> Option<&BinOpStatus> {
        match &self.state {
            StatusState::BinOp(bin_op) => Some(bin_op),
            _ => None,
        }
    }

    pub fn bin_op_mut(&mut self) -> Option<&mut BinOpStatus> {
        match &mut self.state {
            StatusState::BinOp(bin_op) => Some(bin_op),
            _ => None,
        }
    }

    pub fn time_interval_status(&self) -> Option<&TimeIntervalStatus> {
        match &self.state {
            StatusState::TimeInterval(interval) => Some(interval),
            _ => None,
        }
    }

    pub fn time_interval_status_mut(&mut self) -> Option<&mut TimeIntervalStatus> {
        match &mut self.state {
            StatusState::TimeInterval(interval) => Some(interval),
            _ => None,
        }
    }
}

impl fmt::Display for BlessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            StatusState::Plain => write!(f, "Status <negate={}>", self.negate),
            StatusState::BinOp(bin_op) => write!(
                f,
                "BinOpStatus <negate={}, firstStatus={}, firstVerified={}, secondStatus={}, secondVerified={}>",
                self.negate,
                bin_op.first_status,
                bin_op.first_verified,
                bin_op.second_status,
                bin_op.second_verified
            ),
            StatusState::TimeInterval(interval) => {
                write!(f, "TimeIntervalStatus <negate={}", self.negate)?;
                match interval.lower_boundary {
                    Some(lower) => write!(f, ", lowerBoundary={}", lower.to_rfc3339())?,
                    None => write!(f, ", lowerBoundary=none")?,
                }
                match interval.upper_boundary {
                    Some(upper) => write!(f, ", upperBoundary={}>", upper.to_rfc3339()),
                    None => write!(f, ", upperBoundary=none>"),
                }
            }
        }
    }
}

/// Evidence of a two-child combinator
///
/// `first_verified` / `second_verified` record whether any leaf visited so far
/// established the respective child condition. They are latched and never
/// reset within one call.
#[derive(Debug, Clone, PartialEq)]
pub struct BinOpStatus {
    first_status: BlessingStatus,
    second_status: BlessingStatus,
    first_verified: bool,
    second_verified: bool,
}

impl BinOpStatus {
    pub fn first_status(&self) -> &BlessingStatus {
        &self.first_status
    }

    pub fn first_status_mut(&mut self) -> &mut BlessingStatus {
        &mut self.first_status
    }

    pub fn second_status(&self) -> &BlessingStatus {
        &self.second_status
    }

    pub fn second_status_mut(&mut self) -> &mut BlessingStatus {
        &mut self.second_status
    }

    pub fn is_first_verified(&self) -> bool {
        self.first_verified
    }

    pub fn is_second_verified(&self) -> bool {
        self.second_verified
    }

    /// Record the outcome of evaluating the first child; `false` never clears
    pub fn latch_first(&mut self, verified: bool) {
        self.first_verified |= verified;
    }

    /// Record the outcome of evaluating the second child; `false` never clears
    pub fn latch_second(&mut self, verified: bool) {
        self.second_verified |= verified;
    }
}

/// Interval known so far for a timestamp attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeIntervalStatus {
    lower_boundary: Option<DateTime<Utc>>,
    upper_boundary: Option<DateTime<Utc>>,
}

impl TimeIntervalStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interval with a preset upper bound (typically "now")
    pub fn with_upper_boundary(upper: DateTime<Utc>) -> Self {
        Self {
            lower_boundary: None,
            upper_boundary: Some(upper),
        }
    }

    pub fn lower_boundary(&self) -> Option<DateTime<Utc>> {
        self.lower_boundary
    }

    pub fn upper_boundary(&self) -> Option<DateTime<Utc>> {
        self.upper_boundary
    }

    /// Raise the lower bound to `timestamp` if that narrows the interval
    pub fn tighten_lower(&mut self, timestamp: DateTime<Utc>) {
        self.lower_boundary = Some(match self.lower_boundary {
            Some(lower) if lower >= timestamp => lower,
            _ => timestamp,
        });
    }

    /// Lower the upper bound to `timestamp` if that narrows the interval
    pub fn tighten_upper(&mut self, timestamp: DateTime<Utc>) {
        self.upper_boundary = Some(match self.upper_boundary {
            Some(upper) if upper <= timestamp => upper,
            _ => timestamp,
        });
    }

    /// Both boundaries, once known
    pub fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.lower_boundary.zip(self.upper_boundary)
    }
}
