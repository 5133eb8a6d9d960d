//! Strategies for comparison leaves and set membership

use super::{kind_mismatch, BlessingSupport};
use crate::condition::Condition;
use crate::context::BlessingContext;
use crate::qualifier::{Qualifier, QualifierKind, Selector, Value};

/// `key <selector> value`
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyValueSupport;

impl BlessingSupport for KeyValueSupport {
    fn bless(
        &self,
        qualifier: &Qualifier,
        condition: &dyn Condition,
        ctx: &mut BlessingContext<'_>,
    ) -> bool {
        match qualifier {
            Qualifier::KeyValue {
                key,
                selector,
                value,
            } => condition.evaluate(key, value, *selector, ctx),
            _ => kind_mismatch(QualifierKind::KeyValue, qualifier, ctx),
        }
    }
}

/// `key <selector> other_key`; the other key is passed as a `KeyPath` value
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyComparisonSupport;

impl BlessingSupport for KeyComparisonSupport {
    fn bless(
        &self,
        qualifier: &Qualifier,
        condition: &dyn Condition,
        ctx: &mut BlessingContext<'_>,
    ) -> bool {
        match qualifier {
            Qualifier::KeyComparison {
                key,
                selector,
                other_key,
            } => condition.evaluate(key, &Value::KeyPath(other_key.clone()), *selector, ctx),
            _ => kind_mismatch(QualifierKind::KeyComparison, qualifier, ctx),
        }
    }
}

/// `key in (v1, v2, ...)`, blessed like `(key = v1) or (key = v2) or ...`
///
/// An empty set is evaluated as `key = nil`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InSetSupport;

impl BlessingSupport for InSetSupport {
    fn bless(
        &self,
        qualifier: &Qualifier,
        condition: &dyn Condition,
        ctx: &mut BlessingContext<'_>,
    ) -> bool {
        let Qualifier::InSet { key, values } = qualifier else {
            return kind_mismatch(QualifierKind::InSet, qualifier, ctx);
        };
        if values.is_empty() {
            return condition.evaluate(key, &Value::Null, Selector::Equal, ctx);
        }

        values.iter().all(|value| {
            let mut branch = ctx.status().fork();
            ctx.with_status(&mut branch, |ctx| {
                condition.evaluate(key, value, Selector::Equal, ctx)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::AttributeCondition;
    use crate::context::VALUE_KEY;
    use crate::support::SupportRegistry;

    #[test]
    fn test_key_comparison_passes_key_path() {
        let registry = SupportRegistry::standard();
        let condition = AttributeCondition::new("ownerId", false, false, false, true);
        let mut ctx = BlessingContext::new(condition.new_status(), &registry);
        let qualifier = Qualifier::key_comparison("ownerId", Selector::Equal, "creatorId");

        assert!(!ctx.bless_child(Some(&qualifier), &condition));
        let values = ctx.error_cause().unwrap().to_values();
        assert_eq!(
            values.get(VALUE_KEY),
            Some(&Value::KeyPath("creatorId".to_string()))
        );
    }

    #[test]
    fn test_in_set_checks_every_value_as_equality() {
        let registry = SupportRegistry::standard();
        let equals = AttributeCondition::new("status", false, true, false, false);
        let not_equals = AttributeCondition::new("status", false, false, true, false);
        let qualifier = Qualifier::in_set("status", ["open", "closed"]);

        let mut ctx = BlessingContext::new(equals.new_status(), &registry);
        assert!(ctx.bless_child(Some(&qualifier), &equals));

        let mut ctx = BlessingContext::new(not_equals.new_status(), &registry);
        assert!(!ctx.bless_child(Some(&qualifier), &not_equals));
    }

    #[test]
    fn test_empty_in_set_is_null_equality() {
        let registry = SupportRegistry::standard();
        let condition = AttributeCondition::new("deletedAt", false, true, false, false);
        let mut ctx = BlessingContext::new(condition.new_status(), &registry);
        let qualifier = Qualifier::in_set::<Value>("deletedAt", []);

        assert!(ctx.bless_child(Some(&qualifier), &condition));
    }
}
