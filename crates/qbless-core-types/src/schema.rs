//! Canonical schema constants for structured logging
//!
//! Shared by the logging macros and by tests asserting on captured events.

// Canonical field keys
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";

// Blessing fields
pub const FIELD_QUALIFIER_KIND: &str = "qualifier_kind";
pub const FIELD_DENIAL_MESSAGE: &str = "denial_message";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Operation names
pub const OP_BLESS: &str = "bless";
pub const OP_LOAD_POLICIES: &str = "load_policies";
