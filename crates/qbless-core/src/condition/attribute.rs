//! Operator whitelist for a single attribute

use super::{leaf_mismatch, Condition};
use crate::context::{BlessingContext, ErrorCause};
use crate::errors::PolicyError;
use crate::policy::ConditionSpec;
use crate::qualifier::{Selector, Value};
use crate::status::BlessingStatus;

/// Requires the qualifier to reference `condition_key` with an allowed operator
///
/// Operator classes: `<`/`<=` are allowed by `as_less_than`, `=`/`like`/
/// `caseInsensitiveLike` by `as_equals`, `<>` by `as_not_equals`, `>`/`>=`
/// by `as_greater_than`. Below a `Not` the classes swap: `as_less_than`
/// accepts `>`/`>=`, `as_greater_than` accepts `<`/`<=`, `as_equals` accepts
/// `<>` and `as_not_equals` accepts the equality class.
///
/// # Example
///
/// ```
/// use qbless_core::condition::AttributeCondition;
/// use qbless_core::qualifier::Selector;
///
/// let tenant = AttributeCondition::new("tenantId", false, true, false, false);
/// assert!(tenant.accepts(Selector::Equal, false));
/// assert!(!tenant.accepts(Selector::Equal, true));
/// assert!(tenant.accepts(Selector::NotEqual, true));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeCondition {
    error_message: Option<String>,
    condition_key: String,
    as_less_than: bool,
    as_equals: bool,
    as_not_equals: bool,
    as_greater_than: bool,
    allow_null_qualifier: bool,
}

impl AttributeCondition {
    pub fn new(
        condition_key: impl Into<String>,
        as_less_than: bool,
        as_equals: bool,
        as_not_equals: bool,
        as_greater_than: bool,
    ) -> Self {
        Self {
            error_message: None,
            condition_key: condition_key.into(),
            as_less_than,
            as_equals,
            as_not_equals,
            as_greater_than,
            allow_null_qualifier: false,
        }
    }

    /// Message code reported when a leaf fails this condition
    pub fn with_error_message(mut self, error_message: impl Into<String>) -> Self {
        self.error_message = Some(error_message.into());
        self
    }

    /// Accept an absent qualifier instead of rejecting it
    pub fn allowing_null_qualifier(mut self) -> Self {
        self.allow_null_qualifier = true;
        self
    }

    pub fn condition_key(&self) -> &str {
        &self.condition_key
    }

    /// Whether `selector` is an allowed operator under the given polarity
    pub fn accepts(&self, selector: Selector, negate: bool) -> bool {
        let (less, greater, equals, not_equals) = if negate {
            (
                self.as_greater_than,
                self.as_less_than,
                self.as_not_equals,
                self.as_equals,
            )
        } else {
            (
                self.as_less_than,
                self.as_greater_than,
                self.as_equals,
                self.as_not_equals,
            )
        };

        (less && selector.is_less())
            || (greater && selector.is_greater())
            || (equals && selector.is_equality_like())
            || (not_equals && selector.is_not_equal())
    }
}

impl Condition for AttributeCondition {
    fn new_status(&self) -> BlessingStatus {
        BlessingStatus::plain()
    }

    fn evaluate(
        &self,
        key: &str,
        value: &Value,
        selector: Selector,
        ctx: &mut BlessingContext<'_>,
    ) -> bool {
        if self.condition_key == key && self.accepts(selector, ctx.status().negate()) {
            return true;
        }
        leaf_mismatch(self.error_message.as_deref(), key, value, selector, ctx)
    }

    fn evaluate_null_qualifier(&self, ctx: &mut BlessingContext<'_>) -> bool {
        if self.allow_null_qualifier {
            return true;
        }
        ctx.record_error_cause(ErrorCause::no_qualifier());
        false
    }

    fn error_message(&self, _status: &BlessingStatus) -> Option<String> {
        self.error_message.clone()
    }

    fn to_spec(&self) -> Result<ConditionSpec, PolicyError> {
        Ok(ConditionSpec::Attribute {
            error_message: self.error_message.clone(),
            condition_key: self.condition_key.clone(),
            as_less_than: self.as_less_than,
            as_equals: self.as_equals,
            as_not_equals: self.as_not_equals,
            as_greater_than: self.as_greater_than,
            allow_null_qualifier: self.allow_null_qualifier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BlessingContext, KEY_KEY};
    use crate::support::SupportRegistry;

    const ALL: [Selector; 8] = [
        Selector::Equal,
        Selector::NotEqual,
        Selector::LessThan,
        Selector::LessThanOrEqual,
        Selector::GreaterThan,
        Selector::GreaterThanOrEqual,
        Selector::Like,
        Selector::CaseInsensitiveLike,
    ];

    #[test]
    fn test_operator_classes_without_negation() {
        let less = AttributeCondition::new("k", true, false, false, false);
        let equals = AttributeCondition::new("k", false, true, false, false);
        let not_equals = AttributeCondition::new("k", false, false, true, false);
        let greater = AttributeCondition::new("k", false, false, false, true);

        for selector in ALL {
            assert_eq!(less.accepts(selector, false), selector.is_less());
            assert_eq!(equals.accepts(selector, false), selector.is_equality_like());
            assert_eq!(not_equals.accepts(selector, false), selector.is_not_equal());
            assert_eq!(greater.accepts(selector, false), selector.is_greater());
        }
    }

    #[test]
    fn test_operator_classes_swap_under_negation() {
        let less = AttributeCondition::new("k", true, false, false, false);
        let equals = AttributeCondition::new("k", false, true, false, false);
        let not_equals = AttributeCondition::new("k", false, false, true, false);
        let greater = AttributeCondition::new("k", false, false, false, true);

        for selector in ALL {
            assert_eq!(less.accepts(selector, true), selector.is_greater());
            assert_eq!(equals.accepts(selector, true), selector.is_not_equal());
            assert_eq!(
                not_equals.accepts(selector, true),
                selector.is_equality_like()
            );
            assert_eq!(greater.accepts(selector, true), selector.is_less());
        }
    }

    #[test]
    fn test_like_requires_as_equals() {
        let less_only = AttributeCondition::new("name", true, false, false, false);
        assert!(!less_only.accepts(Selector::Like, false));
        assert!(!less_only.accepts(Selector::CaseInsensitiveLike, false));
    }

    #[test]
    fn test_other_key_records_mismatch() {
        let registry = SupportRegistry::standard();
        let condition =
            AttributeCondition::new("tenantId", false, true, false, false).with_error_message("NEED_TENANT");
        let mut ctx = BlessingContext::new(condition.new_status(), &registry);

        let verified = condition.evaluate("ownerId", &Value::Int(7), Selector::Equal, &mut ctx);

        assert!(!verified);
        let cause = ctx.error_cause().unwrap();
        assert_eq!(cause.message(), Some("NEED_TENANT"));
        assert_eq!(cause.to_values().get(KEY_KEY), Some(&Value::from("ownerId")));
    }

    #[test]
    fn test_null_qualifier_opt_out() {
        let registry = SupportRegistry::standard();
        let strict = AttributeCondition::new("deletedAt", false, true, false, false);
        let lenient = strict.clone().allowing_null_qualifier();

        let mut ctx = BlessingContext::new(strict.new_status(), &registry);
        assert!(!strict.evaluate_null_qualifier(&mut ctx));

        let mut ctx = BlessingContext::new(lenient.new_status(), &registry);
        assert!(lenient.evaluate_null_qualifier(&mut ctx));
        assert!(ctx.error_cause().is_none());
    }
}
