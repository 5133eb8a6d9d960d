//! State threaded through one top-level blessing call

use crate::condition::Condition;
use crate::errors::{DenialKind, BLESS_NO_QUALIFIER, BLESS_NO_SUPPORT};
use crate::qualifier::{Qualifier, Selector, Value};
use crate::status::BlessingStatus;
use crate::support::SupportRegistry;
use std::collections::BTreeMap;

/// Named values attached to a blessing call and to its denial
pub type ContextValues = BTreeMap<String, Value>;

/// Denial context entry holding the failing leaf's message code
pub const ERROR_MESSAGE_KEY: &str = "errorMessage";
/// Denial context entry holding the failing leaf's key
pub const KEY_KEY: &str = "key";
/// Denial context entry holding the failing leaf's value
pub const VALUE_KEY: &str = "value";
/// Denial context entry holding the failing leaf's selector symbol
pub const SELECTOR_KEY: &str = "selector";

/// First failure observed during a blessing call
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorCause {
    kind: DenialKind,
    message: Option<String>,
    key: Option<String>,
    value: Option<Value>,
    selector: Option<Selector>,
}

impl ErrorCause {
    /// A leaf that did not satisfy the condition it was tested against
    pub fn mismatch(message: Option<String>, key: &str, value: &Value, selector: Selector) -> Self {
        Self {
            kind: DenialKind::StructuralMismatch,
            message,
            key: Some(key.to_string()),
            value: Some(value.clone()),
            selector: Some(selector),
        }
    }

    /// No traversal strategy for the qualifier's kind
    pub fn no_support() -> Self {
        Self {
            kind: DenialKind::NoSupportRegistered,
            message: Some(BLESS_NO_SUPPORT.to_string()),
            key: None,
            value: None,
            selector: None,
        }
    }

    /// No qualifier where the condition requires one
    pub fn no_qualifier() -> Self {
        Self {
            kind: DenialKind::NullQualifier,
            message: Some(BLESS_NO_QUALIFIER.to_string()),
            key: None,
            value: None,
            selector: None,
        }
    }

    pub fn kind(&self) -> DenialKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn selector(&self) -> Option<Selector> {
        self.selector
    }

    /// Entries merged into the denial context; absent parts are omitted
    pub fn to_values(&self) -> ContextValues {
        let mut values = ContextValues::new();
        if let Some(message) = &self.message {
            values.insert(ERROR_MESSAGE_KEY.to_string(), Value::Text(message.clone()));
        }
        if let Some(key) = &self.key {
            values.insert(KEY_KEY.to_string(), Value::Text(key.clone()));
        }
        if let Some(value) = &self.value {
            values.insert(VALUE_KEY.to_string(), value.clone());
        }
        if let Some(selector) = self.selector {
            values.insert(
                SELECTOR_KEY.to_string(),
                Value::Text(selector.symbol().to_string()),
            );
        }
        values
    }
}

/// Context of one top-level blessing call
///
/// Holds the status of the condition currently being evaluated. Combinators
/// swap their children's sub-statuses in with [`BlessingContext::with_status`]
/// while delegating, so a condition always finds its own status in
/// [`BlessingContext::status`].
pub struct BlessingContext<'r> {
    status: BlessingStatus,
    values: ContextValues,
    error_cause: Option<ErrorCause>,
    unsupported: bool,
    registry: &'r SupportRegistry,
}

impl<'r> BlessingContext<'r> {
    pub fn new(status: BlessingStatus, registry: &'r SupportRegistry) -> Self {
        Self {
            status,
            values: ContextValues::new(),
            error_cause: None,
            unsupported: false,
            registry,
        }
    }

    /// Seed the context with the caller's ambient values
    pub fn with_values(mut self, ambient: &ContextValues) -> Self {
        self.values
            .extend(ambient.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn status(&self) -> &BlessingStatus {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut BlessingStatus {
        &mut self.status
    }

    /// Move the active status out, leaving a plain placeholder
    pub fn take_status(&mut self) -> BlessingStatus {
        std::mem::take(&mut self.status)
    }

    pub fn set_status(&mut self, status: BlessingStatus) {
        self.status = status;
    }

    /// Run `f` with `status` as the active status, then swap it back out
    ///
    /// Whatever `f` does to the active status is visible in `status`
    /// afterwards.
    pub fn with_status<R>(
        &mut self,
        status: &mut BlessingStatus,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        std::mem::swap(&mut self.status, status);
        let result = f(self);
        std::mem::swap(&mut self.status, status);
        result
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set_value(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn values(&self) -> &ContextValues {
        &self.values
    }

    pub fn error_cause(&self) -> Option<&ErrorCause> {
        self.error_cause.as_ref()
    }

    /// Record `cause` unless an earlier failure was already recorded
    pub fn record_error_cause(&mut self, cause: ErrorCause) {
        if self.error_cause.is_none() {
            tracing::trace!(
                kind = ?cause.kind(),
                cause_message = cause.message().unwrap_or_default(),
                key = cause.key().unwrap_or_default(),
                "recorded blessing error cause"
            );
            self.error_cause = Some(cause);
        }
    }

    /// Mark the call as having met a qualifier no strategy can walk
    ///
    /// The mark is never cleared. A marked call is denied with
    /// `BLESS_NO_SUPPORT` whatever the traversal's verdict.
    pub fn mark_unsupported(&mut self) {
        self.unsupported = true;
        self.record_error_cause(ErrorCause::no_support());
    }

    pub fn is_unsupported(&self) -> bool {
        self.unsupported
    }

    /// Bless a (sub-)qualifier against `condition` using the registered strategies
    pub fn bless_child(&mut self, qualifier: Option<&Qualifier>, condition: &dyn Condition) -> bool {
        let registry = self.registry;
        registry.dispatch(qualifier, condition, self)
    }

    pub(crate) fn into_parts(self) -> CallOutcome {
        CallOutcome {
            status: self.status,
            values: self.values,
            error_cause: self.error_cause,
            unsupported: self.unsupported,
        }
    }
}

/// What a finished blessing call leaves behind for building a denial
pub(crate) struct CallOutcome {
    pub(crate) status: BlessingStatus,
    pub(crate) values: ContextValues,
    pub(crate) error_cause: Option<ErrorCause>,
    pub(crate) unsupported: bool,
}
