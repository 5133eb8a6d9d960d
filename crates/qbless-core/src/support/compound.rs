//! Strategies for `And`, `Or` and `Not` qualifiers

use super::{kind_mismatch, BlessingSupport};
use crate::condition::Condition;
use crate::context::BlessingContext;
use crate::qualifier::{Qualifier, QualifierKind};

/// Conjunction: every child contributes evidence to the same status
///
/// All children are visited even after one of them succeeded, since
/// different children may establish different parts of a composite policy.
/// The pass is repeated while the status keeps gaining evidence, so that
/// `Or` branches forked early also see evidence supplied by later siblings.
/// Evidence only accumulates (latches, narrowing bounds), hence the loop ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct AndSupport;

impl BlessingSupport for AndSupport {
    fn bless(
        &self,
        qualifier: &Qualifier,
        condition: &dyn Condition,
        ctx: &mut BlessingContext<'_>,
    ) -> bool {
        let Qualifier::And(children) = qualifier else {
            return kind_mismatch(QualifierKind::And, qualifier, ctx);
        };
        if children.is_empty() {
            return condition.evaluate_null_qualifier(ctx);
        }

        let mut passes = 0_usize;
        loop {
            passes += 1;
            let before = ctx.status().clone();
            let mut blessed = false;
            for child in children {
                blessed |= ctx.bless_child(Some(child), condition);
            }
            if blessed || *ctx.status() == before {
                tracing::debug!(
                    children = children.len(),
                    passes,
                    blessed,
                    "and qualifier traversed"
                );
                return blessed || condition.verdict(ctx.status());
            }
        }
    }
}

/// Disjunction: every child must pass on its own fork of the status
///
/// A branch left unconstrained would let rows through, so one passing
/// branch is not enough. Evidence found in a branch stays in that branch.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrSupport;

impl BlessingSupport for OrSupport {
    fn bless(
        &self,
        qualifier: &Qualifier,
        condition: &dyn Condition,
        ctx: &mut BlessingContext<'_>,
    ) -> bool {
        let Qualifier::Or(children) = qualifier else {
            return kind_mismatch(QualifierKind::Or, qualifier, ctx);
        };
        if children.is_empty() {
            return condition.evaluate_null_qualifier(ctx);
        }

        children.iter().all(|child| {
            let mut branch = ctx.status().fork();
            ctx.with_status(&mut branch, |ctx| ctx.bless_child(Some(child), condition))
        })
    }
}

/// Negation: the child is visited with inverted polarity
#[derive(Debug, Clone, Copy, Default)]
pub struct NotSupport;

impl BlessingSupport for NotSupport {
    fn bless(
        &self,
        qualifier: &Qualifier,
        condition: &dyn Condition,
        ctx: &mut BlessingContext<'_>,
    ) -> bool {
        let Qualifier::Not(child) = qualifier else {
            return kind_mismatch(QualifierKind::Not, qualifier, ctx);
        };

        let previous = ctx.status().negate();
        ctx.status_mut().set_negate(!previous);
        let verdict = ctx.bless_child(Some(child), condition);
        ctx.status_mut().set_negate(previous);
        verdict
    }
}
