//! Traversal strategies, one per qualifier kind
//!
//! A [`BlessingSupport`] knows how to walk one kind of qualifier node and
//! where to call into [`Condition`] evaluation. Strategies are looked up by
//! [`QualifierKind`] in a [`SupportRegistry`]; applications add strategies for
//! their own [`CustomQualifier`](crate::qualifier::CustomQualifier) kinds.

mod compound;
mod leaf;

pub use compound::{AndSupport, NotSupport, OrSupport};
pub use leaf::{InSetSupport, KeyComparisonSupport, KeyValueSupport};

use crate::condition::Condition;
use crate::context::BlessingContext;
use crate::qualifier::{Qualifier, QualifierKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Traversal strategy for one qualifier kind
pub trait BlessingSupport: Send + Sync {
    /// Bless `qualifier` against `condition`, whose status is `ctx.status()`
    fn bless(
        &self,
        qualifier: &Qualifier,
        condition: &dyn Condition,
        ctx: &mut BlessingContext<'_>,
    ) -> bool;
}

/// Mapping from qualifier kind to traversal strategy
#[derive(Clone, Default)]
pub struct SupportRegistry {
    supports: HashMap<QualifierKind, Arc<dyn BlessingSupport>>,
}

impl SupportRegistry {
    /// Registry without any strategy; every qualifier is denied
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with strategies for every built-in qualifier kind
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register_support_for_kind(AndSupport, QualifierKind::And);
        registry.register_support_for_kind(OrSupport, QualifierKind::Or);
        registry.register_support_for_kind(NotSupport, QualifierKind::Not);
        registry.register_support_for_kind(KeyValueSupport, QualifierKind::KeyValue);
        registry.register_support_for_kind(KeyComparisonSupport, QualifierKind::KeyComparison);
        registry.register_support_for_kind(InSetSupport, QualifierKind::InSet);
        registry
    }

    /// Register `support` for `kind`, replacing any previous strategy for it
    pub fn register_support_for_kind(
        &mut self,
        support: impl BlessingSupport + 'static,
        kind: QualifierKind,
    ) {
        self.supports.insert(kind, Arc::new(support));
    }

    pub fn support_for_kind(&self, kind: QualifierKind) -> Option<&Arc<dyn BlessingSupport>> {
        self.supports.get(&kind)
    }

    pub fn contains(&self, kind: QualifierKind) -> bool {
        self.supports.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.supports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.supports.is_empty()
    }

    /// Bless `qualifier` with the strategy registered for its kind
    ///
    /// An absent qualifier is handed to the condition's null-qualifier rule.
    /// A kind without strategy marks the whole call unsupported and fails.
    pub fn dispatch(
        &self,
        qualifier: Option<&Qualifier>,
        condition: &dyn Condition,
        ctx: &mut BlessingContext<'_>,
    ) -> bool {
        let Some(qualifier) = qualifier else {
            return condition.evaluate_null_qualifier(ctx);
        };

        let kind = qualifier.kind();
        let Some(support) = self.supports.get(&kind) else {
            tracing::debug!(qualifier_kind = %kind, "no blessing support registered");
            ctx.mark_unsupported();
            return false;
        };

        let verdict = support.bless(qualifier, condition, ctx);
        tracing::trace!(qualifier_kind = %kind, verdict, "blessed qualifier node");
        verdict
    }
}

impl fmt::Debug for SupportRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<String> = self.supports.keys().map(ToString::to_string).collect();
        kinds.sort();
        f.debug_struct("SupportRegistry").field("kinds", &kinds).finish()
    }
}

/// A strategy was handed a qualifier of a kind it does not walk
pub(crate) fn kind_mismatch(
    expected: QualifierKind,
    qualifier: &Qualifier,
    ctx: &mut BlessingContext<'_>,
) -> bool {
    tracing::warn!(
        expected = %expected,
        actual = %qualifier.kind(),
        "blessing support registered for the wrong qualifier kind"
    );
    ctx.mark_unsupported();
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::AttributeCondition;
    use crate::context::ErrorCause;
    use crate::errors::{DenialKind, BLESS_NO_SUPPORT};
    use crate::qualifier::Selector;

    #[test]
    fn test_standard_registry_covers_builtin_kinds() {
        let registry = SupportRegistry::standard();
        for kind in [
            QualifierKind::And,
            QualifierKind::Or,
            QualifierKind::Not,
            QualifierKind::KeyValue,
            QualifierKind::KeyComparison,
            QualifierKind::InSet,
        ] {
            assert!(registry.contains(kind), "missing {}", kind);
        }
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn test_unregistered_kind_records_no_support() {
        let registry = SupportRegistry::empty();
        let condition = AttributeCondition::new("a", false, true, false, false);
        let mut ctx = BlessingContext::new(condition.new_status(), &registry);
        let qualifier = Qualifier::key_value("a", Selector::Equal, 1);

        assert!(!registry.dispatch(Some(&qualifier), &condition, &mut ctx));
        assert!(ctx.is_unsupported());
        let cause = ctx.error_cause().unwrap();
        assert_eq!(cause.kind(), DenialKind::NoSupportRegistered);
        assert_eq!(cause.message(), Some(BLESS_NO_SUPPORT));
    }

    #[test]
    fn test_wrong_strategy_for_kind_fails_closed() {
        let mut registry = SupportRegistry::empty();
        registry.register_support_for_kind(AndSupport, QualifierKind::KeyValue);
        let condition = AttributeCondition::new("a", false, true, false, false);
        let mut ctx = BlessingContext::new(condition.new_status(), &registry);
        let qualifier = Qualifier::key_value("a", Selector::Equal, 1);

        assert!(!registry.dispatch(Some(&qualifier), &condition, &mut ctx));
        assert!(ctx.is_unsupported());
        assert_eq!(
            ctx.error_cause().map(ErrorCause::kind),
            Some(DenialKind::NoSupportRegistered)
        );
    }

    #[test]
    fn test_debug_lists_kinds() {
        let mut registry = SupportRegistry::empty();
        registry.register_support_for_kind(NotSupport, QualifierKind::Not);
        assert_eq!(
            format!("{:?}", registry),
            "SupportRegistry { kinds: [\"not\"] }"
        );
    }
}
