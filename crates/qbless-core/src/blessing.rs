//! Blessing entry points
//!
//! [`QualifierBlessing`] owns a support registry and runs one blessing call:
//! fresh status and context, traversal, then success or a [`BlessingDenied`].
//! The free functions at the bottom of this module do the same against a
//! process-wide registry that applications extend once at startup.

use crate::condition::Condition;
use crate::context::{BlessingContext, CallOutcome, ContextValues, ERROR_MESSAGE_KEY};
use crate::errors::{BlessingDenied, DenialKind, Result, BLESS_DENIED, BLESS_NO_SUPPORT};
use crate::qualifier::{Qualifier, QualifierKind, Value};
use crate::support::{BlessingSupport, SupportRegistry};
use crate::{log_op_end, log_op_error, log_op_start};
use qbless_core_types::schema::{FIELD_TRACE_ID, OP_BLESS};
use qbless_core_types::RequestContext;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Instant;

/// Validates qualifiers against conditions
///
/// Cloning is cheap; clones share the registry until one of them registers
/// another strategy.
///
/// # Example
///
/// ```
/// use qbless_core::condition::AttributeCondition;
/// use qbless_core::qualifier::{Qualifier, Selector};
/// use qbless_core::QualifierBlessing;
///
/// let tenant = AttributeCondition::new("tenantId", false, true, false, false)
///     .with_error_message("TENANT_REQUIRED");
/// let blessing = QualifierBlessing::new();
///
/// let scoped = Qualifier::key_value("tenantId", Selector::Equal, 42);
/// assert!(blessing.bless(Some(&scoped), &tenant).is_ok());
///
/// let unscoped = Qualifier::key_value("name", Selector::Like, "a*");
/// let denial = blessing.bless(Some(&unscoped), &tenant).unwrap_err();
/// assert_eq!(denial.message(), "TENANT_REQUIRED");
/// ```
#[derive(Debug, Clone)]
pub struct QualifierBlessing {
    registry: Arc<SupportRegistry>,
}

impl Default for QualifierBlessing {
    fn default() -> Self {
        Self::new()
    }
}

impl QualifierBlessing {
    /// Blessing with the built-in strategies
    pub fn new() -> Self {
        Self::with_registry(SupportRegistry::standard())
    }

    pub fn with_registry(registry: SupportRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    fn from_shared(registry: Arc<SupportRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SupportRegistry {
        &self.registry
    }

    /// Add or replace the strategy for `kind`
    pub fn register_support_for_kind(
        &mut self,
        support: impl BlessingSupport + 'static,
        kind: QualifierKind,
    ) {
        Arc::make_mut(&mut self.registry).register_support_for_kind(support, kind);
    }

    /// Bless `qualifier` against `condition`
    ///
    /// `None` stands for "no filter at all".
    ///
    /// # Errors
    ///
    /// Returns [`BlessingDenied`] if the qualifier does not satisfy the
    /// condition.
    pub fn bless(&self, qualifier: Option<&Qualifier>, condition: &dyn Condition) -> Result<()> {
        self.bless_with(qualifier, condition, &ContextValues::new())
    }

    /// Bless with ambient values that are copied into any denial's context
    ///
    /// # Errors
    ///
    /// Returns [`BlessingDenied`] if the qualifier does not satisfy the
    /// condition.
    pub fn bless_with(
        &self,
        qualifier: Option<&Qualifier>,
        condition: &dyn Condition,
        ambient: &ContextValues,
    ) -> Result<()> {
        self.bless_in(&RequestContext::new(), qualifier, condition, ambient)
    }

    /// Bless under the caller's correlation context
    ///
    /// The call runs in a `bless` span carrying the request id, and the id is
    /// attached to the denial.
    ///
    /// # Errors
    ///
    /// Returns [`BlessingDenied`] if the qualifier does not satisfy the
    /// condition.
    pub fn bless_in(
        &self,
        request: &RequestContext,
        qualifier: Option<&Qualifier>,
        condition: &dyn Condition,
        ambient: &ContextValues,
    ) -> Result<()> {
        let span = tracing::info_span!(
            "bless",
            request_id = %request.request_id,
            trace_id = tracing::field::Empty
        );
        if let Some(trace_id) = &request.trace_id {
            span.record(FIELD_TRACE_ID, tracing::field::display(trace_id));
        }
        let _entered = span.enter();

        let qualifier_kind = qualifier.map_or_else(|| "none".to_string(), |q| q.kind().to_string());
        log_op_start!(OP_BLESS, qualifier_kind = %qualifier_kind);
        let start = Instant::now();

        self.bless_impl(qualifier, condition, ambient)
            .map_err(|denial| denial.with_request_id(request.request_id.clone()))
            .map_err(|denial| {
                log_op_error!(
                    OP_BLESS,
                    denial.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    denial_message = denial.message()
                );
                denial
            })?;

        log_op_end!(OP_BLESS, duration_ms = start.elapsed().as_millis() as u64);
        Ok(())
    }

    fn bless_impl(
        &self,
        qualifier: Option<&Qualifier>,
        condition: &dyn Condition,
        ambient: &ContextValues,
    ) -> Result<()> {
        let mut ctx = BlessingContext::new(condition.new_status(), &self.registry).with_values(ambient);
        let blessed = ctx.bless_child(qualifier, condition);
        if blessed && !ctx.is_unsupported() {
            return Ok(());
        }

        let outcome = ctx.into_parts();
        tracing::debug!(status = %outcome.status, blessed, "qualifier not blessed");
        Err(denial(condition, outcome))
    }
}

/// Builds the denial for a failed call
///
/// An unsupported qualifier anywhere in the tree always yields
/// `BLESS_NO_SUPPORT`. Otherwise the message is the recorded cause's, then
/// the condition's, then `BLESS_DENIED`.
fn denial(condition: &dyn Condition, outcome: CallOutcome) -> BlessingDenied {
    let CallOutcome {
        status,
        mut values,
        error_cause: cause,
        unsupported,
    } = outcome;

    if unsupported {
        values.insert(
            ERROR_MESSAGE_KEY.to_string(),
            Value::Text(BLESS_NO_SUPPORT.to_string()),
        );
        return BlessingDenied::new(
            DenialKind::NoSupportRegistered,
            BLESS_NO_SUPPORT.to_string(),
            values,
        );
    }

    if let Some(cause) = &cause {
        values.extend(cause.to_values());
    }

    let (kind, message) = match cause.as_ref().and_then(|c| c.message().map(|m| (c.kind(), m))) {
        Some((kind, message)) => (kind, message.to_string()),
        None => (
            DenialKind::PolicyUnsatisfied,
            condition
                .error_message(&status)
                .unwrap_or_else(|| BLESS_DENIED.to_string()),
        ),
    };
    BlessingDenied::new(kind, message, values)
}

// ========== Process-wide registry ==========

static GLOBAL_REGISTRY: OnceLock<RwLock<Arc<SupportRegistry>>> = OnceLock::new();

/// Bumped after every process-wide registration, while the write lock is held
static REGISTRY_GENERATION: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static CACHED_REGISTRY: RefCell<Option<(u64, Arc<SupportRegistry>)>> = const { RefCell::new(None) };
}

fn global_registry() -> &'static RwLock<Arc<SupportRegistry>> {
    GLOBAL_REGISTRY.get_or_init(|| RwLock::new(Arc::new(SupportRegistry::standard())))
}

/// Add or replace the process-wide strategy for `kind`
///
/// Meant for application startup. Registrations are serialized; calls
/// already in flight keep the registry they started with.
pub fn register_support_for_kind(support: impl BlessingSupport + 'static, kind: QualifierKind) {
    let mut guard = global_registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    let mut next = SupportRegistry::clone(&guard);
    next.register_support_for_kind(support, kind);
    *guard = Arc::new(next);
    REGISTRY_GENERATION.fetch_add(1, Ordering::Release);
    tracing::debug!(qualifier_kind = %kind, "registered process-wide blessing support");
}

/// Snapshot of the process-wide registry
///
/// Each thread keeps the last snapshot it saw and only takes the read lock
/// again after a registration has happened.
pub fn current_registry() -> Arc<SupportRegistry> {
    let generation = REGISTRY_GENERATION.load(Ordering::Acquire);
    CACHED_REGISTRY.with(|cached| {
        let mut cached = cached.borrow_mut();
        if let Some((seen, registry)) = cached.as_ref() {
            if *seen == generation {
                return Arc::clone(registry);
            }
        }
        let registry = Arc::clone(
            &global_registry()
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        );
        *cached = Some((generation, Arc::clone(&registry)));
        registry
    })
}

/// Bless against the process-wide registry
///
/// # Errors
///
/// Returns [`BlessingDenied`] if the qualifier does not satisfy the condition.
pub fn bless(qualifier: Option<&Qualifier>, condition: &dyn Condition) -> Result<()> {
    QualifierBlessing::from_shared(current_registry()).bless(qualifier, condition)
}

/// Bless against the process-wide registry with ambient values
///
/// # Errors
///
/// Returns [`BlessingDenied`] if the qualifier does not satisfy the condition.
pub fn bless_with(
    qualifier: Option<&Qualifier>,
    condition: &dyn Condition,
    ambient: &ContextValues,
) -> Result<()> {
    QualifierBlessing::from_shared(current_registry()).bless_with(qualifier, condition, ambient)
}
