//! Subscriber installation
//!
//! [`init`] installs the process-wide subscriber once. Each [`Profile`] picks
//! an output format and a default filter for the `qbless` targets:
//!
//! | Profile       | Format         | Default filter  |
//! |---------------|----------------|-----------------|
//! | `Development` | human readable | `qbless=debug`  |
//! | `Production`  | JSON lines     | `qbless=info`   |
//! | `Test`        | none           | none            |
//!
//! `RUST_LOG` replaces the default filter. The `Test` profile installs a bare
//! registry so that nothing is printed; tests that assert on events use
//! [`init_test_capture`](super::test_capture::init_test_capture) instead.

use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Output profile of the logging facility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Development,
    Production,
    Test,
}

impl Profile {
    /// Filter directive used when `RUST_LOG` is unset
    pub fn default_directive(self) -> Option<&'static str> {
        match self {
            Profile::Development => Some("qbless=debug"),
            Profile::Production => Some("qbless=info"),
            Profile::Test => None,
        }
    }

    fn filter(self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_directive().unwrap_or("off")))
    }
}

static INIT_ONCE: Once = Once::new();

/// Install the subscriber for `profile`
///
/// Call before the first blessing; only the first call has an effect.
///
/// ```
/// use qbless_core::logging_facility::{init, Profile};
///
/// init(Profile::Development);
/// ```
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| match profile {
        Profile::Development => tracing_subscriber::fmt()
            .with_env_filter(profile.filter())
            .init(),
        Profile::Production => tracing_subscriber::fmt()
            .json()
            .with_env_filter(profile.filter())
            .init(),
        Profile::Test => tracing_subscriber::registry().init(),
    });
}
