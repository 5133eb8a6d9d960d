use crate::context::ContextValues;
use crate::qualifier::Value;
use qbless_core_types::RequestId;
use thiserror::Error;

/// Result of a blessing call
pub type Result<T> = std::result::Result<T, BlessingDenied>;

/// Message code used when neither the failing leaf nor the condition supplies one
pub const BLESS_DENIED: &str = "BLESS_DENIED";
/// Message code for a qualifier kind with no registered traversal strategy
pub const BLESS_NO_SUPPORT: &str = "BLESS_NO_SUPPORT";
/// Message code for an absent qualifier where the policy requires one
pub const BLESS_NO_QUALIFIER: &str = "BLESS_NO_QUALIFIER";

// ========== Denial ==========

/// Why a qualifier was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenialKind {
    /// A leaf's key or selector does not match the policy leaf it was tested against
    StructuralMismatch,
    /// No traversal strategy is registered for the qualifier's kind
    NoSupportRegistered,
    /// No qualifier was supplied and the policy requires one
    NullQualifier,
    /// Traversal completed but the accumulated evidence does not satisfy the policy
    PolicyUnsatisfied,
}

/// The single error raised by a blessing call
///
/// `message` is a code for a localization collaborator (for example
/// `BLESS_DENIED` or a policy's configured message). `context` holds the
/// caller's ambient values merged with the failing leaf's `key`, `value`,
/// `selector` and `errorMessage` entries.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Qualifier blessing denied: {message}")]
pub struct BlessingDenied {
    kind: DenialKind,
    message: String,
    context: ContextValues,
    request_id: Option<RequestId>,
}

impl BlessingDenied {
    pub fn new(kind: DenialKind, message: impl Into<String>, context: ContextValues) -> Self {
        Self {
            kind,
            message: message.into(),
            context,
            request_id: None,
        }
    }

    /// Attach the id of the blessing call that raised the denial
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn kind(&self) -> DenialKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &ContextValues {
        &self.context
    }

    /// Single contextual value, e.g. `"key"` of the failing leaf
    pub fn context_value(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }
}

// ========== Policy configuration ==========

/// Failure to load or build a policy (condition tree)
///
/// These surface at startup, while a policy book is assembled; they are never
/// produced by a blessing call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    /// Policy document is not valid TOML/JSON or does not match the schema
    #[error("Failed to parse {format} policy document: {reason}")]
    Parse {
        format: &'static str,
        reason: String,
    },

    /// Condition is structurally invalid (e.g. empty condition key)
    #[error("Invalid condition: {reason}")]
    InvalidCondition { reason: String },

    /// Policy name not present in the book
    #[error("Unknown policy: {name}")]
    UnknownPolicy { name: String },

    /// Condition type has no configuration form
    #[error("Condition cannot be encoded as a policy spec: {condition}")]
    NotEncodable { condition: String },
}

impl From<toml::de::Error> for PolicyError {
    fn from(err: toml::de::Error) -> Self {
        PolicyError::Parse {
            format: "TOML",
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PolicyError {
    fn from(err: serde_json::Error) -> Self {
        PolicyError::Parse {
            format: "JSON",
            reason: err.to_string(),
        }
    }
}

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable code used by log events and external API
/// responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Denials
    StructuralMismatch,
    NoSupportRegistered,
    NullQualifier,
    PolicyUnsatisfied,

    // Policy configuration
    InvalidPolicyDocument,
    InvalidCondition,
    UnknownPolicy,
    NotEncodable,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::StructuralMismatch => "ERR_STRUCTURAL_MISMATCH",
            ExErrorKind::NoSupportRegistered => "ERR_NO_SUPPORT_REGISTERED",
            ExErrorKind::NullQualifier => "ERR_NULL_QUALIFIER",
            ExErrorKind::PolicyUnsatisfied => "ERR_POLICY_UNSATISFIED",
            ExErrorKind::InvalidPolicyDocument => "ERR_INVALID_POLICY_DOCUMENT",
            ExErrorKind::InvalidCondition => "ERR_INVALID_CONDITION",
            ExErrorKind::UnknownPolicy => "ERR_UNKNOWN_POLICY",
            ExErrorKind::NotEncodable => "ERR_NOT_ENCODABLE",
        }
    }
}

impl From<DenialKind> for ExErrorKind {
    fn from(kind: DenialKind) -> Self {
        match kind {
            DenialKind::StructuralMismatch => ExErrorKind::StructuralMismatch,
            DenialKind::NoSupportRegistered => ExErrorKind::NoSupportRegistered,
            DenialKind::NullQualifier => ExErrorKind::NullQualifier,
            DenialKind::PolicyUnsatisfied => ExErrorKind::PolicyUnsatisfied,
        }
    }
}

/// Canonical structured error type
///
/// Flattened, loggable view of any error raised by this crate.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    key: Option<String>,
    selector: Option<String>,
    request_id: Option<RequestId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            key: None,
            selector: None,
            request_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the attribute key involved
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Add the selector involved
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(key) = &self.key {
            write!(f, " (key: {})", key)?;
        }
        if let Some(selector) = &self.selector {
            write!(f, " (selector: {})", selector)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

impl From<BlessingDenied> for ExError {
    fn from(denial: BlessingDenied) -> Self {
        let mut err = ExError::new(denial.kind.into())
            .with_op(qbless_core_types::schema::OP_BLESS)
            .with_message(denial.message.clone());
        if let Some(key) = denial.context_value(crate::context::KEY_KEY).and_then(Value::as_text) {
            err = err.with_key(key);
        }
        if let Some(selector) = denial
            .context_value(crate::context::SELECTOR_KEY)
            .and_then(Value::as_text)
        {
            err = err.with_selector(selector);
        }
        if let Some(request_id) = denial.request_id {
            err = err.with_request_id(request_id);
        }
        err
    }
}

impl From<PolicyError> for ExError {
    fn from(err: PolicyError) -> Self {
        let message = err.to_string();
        let kind = match err {
            PolicyError::Parse { .. } => ExErrorKind::InvalidPolicyDocument,
            PolicyError::InvalidCondition { .. } => ExErrorKind::InvalidCondition,
            PolicyError::UnknownPolicy { .. } => ExErrorKind::UnknownPolicy,
            PolicyError::NotEncodable { .. } => ExErrorKind::NotEncodable,
        };
        ExError::new(kind)
            .with_op(qbless_core_types::schema::OP_LOAD_POLICIES)
            .with_message(message)
    }
}
