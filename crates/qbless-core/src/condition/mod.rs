//! Policy conditions a qualifier must satisfy before it may be executed
//!
//! Conditions are immutable and typically built once at startup, then shared
//! (`Arc<dyn Condition>`) by every blessing call. All per-call state lives in
//! the `BlessingStatus` each condition creates through `new_status()`.

pub mod attribute;
pub mod binop;
pub mod time_interval;

pub use attribute::AttributeCondition;
pub use binop::{BinOpCondition, Combinator};
pub use time_interval::{Clock, FixedClock, SystemClock, TimeIntervalCondition};

use crate::context::{BlessingContext, ErrorCause};
use crate::errors::PolicyError;
use crate::policy::ConditionSpec;
use crate::qualifier::{Selector, Value};
use crate::status::BlessingStatus;
use std::fmt;

/// A node of a policy tree
pub trait Condition: fmt::Debug + Send + Sync {
    /// Fresh status for one blessing call
    fn new_status(&self) -> BlessingStatus;

    /// Evaluate one qualifier leaf `key <selector> value`
    ///
    /// The condition's own status is `ctx.status()`. Returns true if the
    /// evidence gathered so far, including this leaf, verifies the condition.
    fn evaluate(
        &self,
        key: &str,
        value: &Value,
        selector: Selector,
        ctx: &mut BlessingContext<'_>,
    ) -> bool;

    /// Called when no qualifier was supplied at all
    ///
    /// Requiring a constraint is the default: the absent filter is rejected
    /// with `BLESS_NO_QUALIFIER`.
    fn evaluate_null_qualifier(&self, ctx: &mut BlessingContext<'_>) -> bool {
        ctx.record_error_cause(ErrorCause::no_qualifier());
        false
    }

    /// Message code to report when blessing is denied, if any
    fn error_message(&self, _status: &BlessingStatus) -> Option<String> {
        None
    }

    /// Verdict readable from accumulated evidence alone
    fn verdict(&self, _status: &BlessingStatus) -> bool {
        false
    }

    /// Configuration form of this condition
    fn to_spec(&self) -> Result<ConditionSpec, PolicyError> {
        Err(PolicyError::NotEncodable {
            condition: format!("{:?}", self),
        })
    }
}

/// Record a leaf mismatch against a keyed condition and report failure
pub(crate) fn leaf_mismatch(
    error_message: Option<&str>,
    key: &str,
    value: &Value,
    selector: Selector,
    ctx: &mut BlessingContext<'_>,
) -> bool {
    ctx.record_error_cause(ErrorCause::mismatch(
        error_message.map(str::to_string),
        key,
        value,
        selector,
    ));
    false
}
