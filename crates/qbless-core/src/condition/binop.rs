//! Policy-level AND / OR over two sub-conditions

use super::Condition;
use crate::context::BlessingContext;
use crate::errors::PolicyError;
use crate::policy::ConditionSpec;
use crate::qualifier::{Selector, Value};
use crate::status::{BinOpStatus, BlessingStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How the two child verdicts combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    pub fn compute_result(self, first: bool, second: bool) -> bool {
        match self {
            Combinator::And => first && second,
            Combinator::Or => first || second,
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combinator::And => f.write_str("and"),
            Combinator::Or => f.write_str("or"),
        }
    }
}

/// Combines two sub-conditions
///
/// Every leaf visited is offered to each child that is not verified yet,
/// with the child's own sub-status active. A child verified once stays
/// verified for the rest of the call, so leaves spread over different
/// branches of an AND qualifier can establish different children.
///
/// Negation reaches the children's leaf evaluation only; `NOT (a AND b)`
/// still requires both children, each evaluated with inverted polarity.
#[derive(Debug, Clone)]
pub struct BinOpCondition {
    combinator: Combinator,
    error_message: Option<String>,
    first: Arc<dyn Condition>,
    second: Arc<dyn Condition>,
}

impl BinOpCondition {
    pub fn and(first: impl Condition + 'static, second: impl Condition + 'static) -> Self {
        Self::from_arcs(Combinator::And, Arc::new(first), Arc::new(second))
    }

    pub fn or(first: impl Condition + 'static, second: impl Condition + 'static) -> Self {
        Self::from_arcs(Combinator::Or, Arc::new(first), Arc::new(second))
    }

    /// Combine already shared sub-conditions
    pub fn from_arcs(
        combinator: Combinator,
        first: Arc<dyn Condition>,
        second: Arc<dyn Condition>,
    ) -> Self {
        Self {
            combinator,
            error_message: None,
            first,
            second,
        }
    }

    pub fn with_error_message(mut self, error_message: impl Into<String>) -> Self {
        self.error_message = Some(error_message.into());
        self
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    pub fn first(&self) -> &Arc<dyn Condition> {
        &self.first
    }

    pub fn second(&self) -> &Arc<dyn Condition> {
        &self.second
    }

    fn result(&self, status: &BinOpStatus) -> bool {
        self.combinator
            .compute_result(status.is_first_verified(), status.is_second_verified())
    }
}

impl Condition for BinOpCondition {
    fn new_status(&self) -> BlessingStatus {
        BlessingStatus::new_bin_op(self.first.new_status(), self.second.new_status())
    }

    fn evaluate(
        &self,
        key: &str,
        value: &Value,
        selector: Selector,
        ctx: &mut BlessingContext<'_>,
    ) -> bool {
        let mut active = ctx.take_status();
        let verified = match active.bin_op_mut() {
            Some(status) => {
                if !status.is_first_verified() {
                    let first = ctx.with_status(status.first_status_mut(), |ctx| {
                        self.first.evaluate(key, value, selector, ctx)
                    });
                    status.latch_first(first);
                }
                if !status.is_second_verified() {
                    let second = ctx.with_status(status.second_status_mut(), |ctx| {
                        self.second.evaluate(key, value, selector, ctx)
                    });
                    status.latch_second(second);
                }
                self.result(status)
            }
            None => {
                tracing::warn!(
                    combinator = %self.combinator,
                    status = %active,
                    "combinator evaluated against a foreign status"
                );
                false
            }
        };
        ctx.set_status(active);
        verified
    }

    fn evaluate_null_qualifier(&self, ctx: &mut BlessingContext<'_>) -> bool {
        let mut active = ctx.take_status();
        let verified = match active.bin_op_mut() {
            Some(status) => {
                let first = ctx.with_status(status.first_status_mut(), |ctx| {
                    self.first.evaluate_null_qualifier(ctx)
                });
                let second = ctx.with_status(status.second_status_mut(), |ctx| {
                    self.second.evaluate_null_qualifier(ctx)
                });
                self.combinator.compute_result(first, second)
            }
            None => false,
        };
        ctx.set_status(active);
        verified
    }

    fn error_message(&self, status: &BlessingStatus) -> Option<String> {
        if self.error_message.is_some() {
            return self.error_message.clone();
        }
        let bin_op = status.bin_op()?;
        if !bin_op.is_first_verified() {
            if let Some(message) = self.first.error_message(bin_op.first_status()) {
                return Some(message);
            }
        }
        if !bin_op.is_second_verified() {
            return self.second.error_message(bin_op.second_status());
        }
        None
    }

    fn verdict(&self, status: &BlessingStatus) -> bool {
        status.bin_op().is_some_and(|bin_op| self.result(bin_op))
    }

    fn to_spec(&self) -> Result<ConditionSpec, PolicyError> {
        let first_condition = Box::new(self.first.to_spec()?);
        let second_condition = Box::new(self.second.to_spec()?);
        let error_message = self.error_message.clone();
        Ok(match self.combinator {
            Combinator::And => ConditionSpec::And {
                error_message,
                first_condition,
                second_condition,
            },
            Combinator::Or => ConditionSpec::Or {
                error_message,
                first_condition,
                second_condition,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::AttributeCondition;
    use crate::support::SupportRegistry;

    fn equals(key: &str) -> AttributeCondition {
        AttributeCondition::new(key, false, true, false, false)
    }

    #[test]
    fn test_compute_result() {
        assert!(Combinator::And.compute_result(true, true));
        assert!(!Combinator::And.compute_result(true, false));
        assert!(Combinator::Or.compute_result(false, true));
        assert!(!Combinator::Or.compute_result(false, false));
    }

    #[test]
    fn test_and_latches_across_leaves() {
        let registry = SupportRegistry::standard();
        let condition = BinOpCondition::and(equals("a"), equals("b"));
        let mut ctx = BlessingContext::new(condition.new_status(), &registry);

        assert!(!condition.evaluate("a", &Value::Int(1), Selector::Equal, &mut ctx));
        // a later mismatch on `a` does not clear the first child
        assert!(condition.evaluate("b", &Value::Int(2), Selector::Equal, &mut ctx));

        let status = ctx.status().bin_op().unwrap();
        assert!(status.is_first_verified());
        assert!(status.is_second_verified());
    }

    // No concrete OR condition exists upstream; this one is inferred from
    // the symmetric combine step.
    #[test]
    fn test_or_condition_inferred_by_symmetry() {
        let registry = SupportRegistry::standard();
        let condition = BinOpCondition::or(equals("a"), equals("b"));
        let mut ctx = BlessingContext::new(condition.new_status(), &registry);

        assert!(condition.evaluate("b", &Value::Int(2), Selector::Equal, &mut ctx));
        assert!(condition.verdict(ctx.status()));
    }

    #[test]
    fn test_negated_and_still_needs_both_children() {
        let registry = SupportRegistry::standard();
        let condition = BinOpCondition::and(
            AttributeCondition::new("a", false, false, true, false),
            AttributeCondition::new("b", false, false, true, false),
        );
        let mut status = condition.new_status();
        status.set_negate(true);
        let mut ctx = BlessingContext::new(status, &registry);

        // not (a = 1) satisfies the `<>` whitelist on a, but b is untouched
        assert!(!condition.evaluate("a", &Value::Int(1), Selector::Equal, &mut ctx));
        assert!(!condition.verdict(ctx.status()));
    }

    #[test]
    fn test_error_message_precedence() {
        let first = equals("a").with_error_message("NEED_A");
        let second = equals("b").with_error_message("NEED_B");
        let plain = BinOpCondition::and(first.clone(), second.clone());
        let own = BinOpCondition::and(first, second).with_error_message("NEED_BOTH");

        let mut status = plain.new_status();
        assert_eq!(plain.error_message(&status), Some("NEED_A".to_string()));
        status.bin_op_mut().unwrap().latch_first(true);
        assert_eq!(plain.error_message(&status), Some("NEED_B".to_string()));
        assert_eq!(own.error_message(&status), Some("NEED_BOTH".to_string()));
    }

    #[test]
    fn test_null_qualifier_combines_children() {
        let registry = SupportRegistry::standard();
        let lenient = equals("a").allowing_null_qualifier();
        let strict = equals("b");

        let or = BinOpCondition::or(lenient.clone(), strict.clone());
        let mut ctx = BlessingContext::new(or.new_status(), &registry);
        assert!(or.evaluate_null_qualifier(&mut ctx));

        let and = BinOpCondition::and(lenient, strict);
        let mut ctx = BlessingContext::new(and.new_status(), &registry);
        assert!(!and.evaluate_null_qualifier(&mut ctx));
    }
}
