//! qbless core - qualifier blessing engine
//!
//! Decides whether a dynamically assembled query filter (a [`Qualifier`]
//! tree) may be executed under a policy (a [`Condition`] tree):
//! - Qualifier model: compound, comparison, set membership and custom nodes
//! - Conditions: attribute operator whitelists, bounded date windows and
//!   AND/OR combinators over them
//! - Per-call statuses accumulating evidence across the whole filter
//! - Extensible per-kind traversal strategies ([`support`])
//! - Policy documents in TOML or JSON ([`policy`])
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use qbless_core::condition::{AttributeCondition, BinOpCondition, TimeIntervalCondition};
//! use qbless_core::qualifier::{Qualifier, Selector};
//! use qbless_core::QualifierBlessing;
//!
//! let policy = BinOpCondition::and(
//!     AttributeCondition::new("tenantId", false, true, false, false),
//!     TimeIntervalCondition::new("createdAt", 0, 90, false),
//! );
//! let filter = Qualifier::and([
//!     Qualifier::key_value("tenantId", Selector::Equal, 42),
//!     Qualifier::key_value(
//!         "createdAt",
//!         Selector::GreaterThanOrEqual,
//!         Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
//!     ),
//!     Qualifier::key_value(
//!         "createdAt",
//!         Selector::LessThan,
//!         Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
//!     ),
//! ]);
//!
//! assert!(QualifierBlessing::new().bless(Some(&filter), &policy).is_ok());
//! ```

pub mod blessing;
pub mod condition;
pub mod context;
pub mod errors;
pub mod logging_facility;
pub mod policy;
pub mod qualifier;
pub mod status;
pub mod support;

pub use qbless_core_types as core_types;

// Re-export commonly used types
pub use blessing::{bless, bless_with, current_registry, register_support_for_kind, QualifierBlessing};
pub use condition::Condition;
pub use context::{BlessingContext, ContextValues};
pub use errors::{BlessingDenied, DenialKind, ExError, ExErrorKind, PolicyError, Result};
pub use policy::{ConditionSpec, PolicyBook};
pub use qualifier::{Qualifier, QualifierKind, Selector, Value};
pub use status::BlessingStatus;
pub use support::{BlessingSupport, SupportRegistry};
