//! Policy configuration
//!
//! Conditions are usually assembled once at startup from a policy document.
//! [`ConditionSpec`] is the serializable form of a condition tree and
//! [`PolicyBook`] holds named, compiled policies:
//!
//! ```toml
//! [policies.orders]
//! type = "and"
//! errorMessage = "ORDERS_FILTER_TOO_BROAD"
//!
//! [policies.orders.firstCondition]
//! type = "attribute"
//! conditionKey = "tenantId"
//! asEquals = true
//!
//! [policies.orders.secondCondition]
//! type = "time_interval"
//! conditionKey = "createdAt"
//! minDays = 90
//! defaultUpper = true
//! ```

use crate::condition::{
    AttributeCondition, BinOpCondition, Clock, Combinator, Condition, SystemClock,
    TimeIntervalCondition,
};
use crate::errors::PolicyError;
use crate::{log_op_end, log_op_error, log_op_start};
use qbless_core_types::schema::OP_LOAD_POLICIES;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Serializable condition tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionSpec {
    #[serde(rename_all = "camelCase")]
    Attribute {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
        condition_key: String,
        #[serde(default)]
        as_less_than: bool,
        #[serde(default)]
        as_equals: bool,
        #[serde(default)]
        as_not_equals: bool,
        #[serde(default)]
        as_greater_than: bool,
        #[serde(default)]
        allow_null_qualifier: bool,
    },
    #[serde(rename_all = "camelCase")]
    TimeInterval {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
        condition_key: String,
        #[serde(default)]
        min_months: u32,
        #[serde(default)]
        min_days: u32,
        #[serde(default)]
        default_upper: bool,
        #[serde(default)]
        allow_null_qualifier: bool,
    },
    #[serde(rename_all = "camelCase")]
    And {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
        first_condition: Box<ConditionSpec>,
        second_condition: Box<ConditionSpec>,
    },
    #[serde(rename_all = "camelCase")]
    Or {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
        first_condition: Box<ConditionSpec>,
        second_condition: Box<ConditionSpec>,
    },
}

impl ConditionSpec {
    /// Compile into a shareable condition tree
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidCondition`] for an empty condition key.
    pub fn build(&self) -> Result<Arc<dyn Condition>, PolicyError> {
        self.build_with_clock(Arc::new(SystemClock))
    }

    /// Compile, giving time interval conditions the supplied clock
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidCondition`] for an empty condition key.
    pub fn build_with_clock(&self, clock: Arc<dyn Clock>) -> Result<Arc<dyn Condition>, PolicyError> {
        let condition: Arc<dyn Condition> = match self {
            ConditionSpec::Attribute {
                error_message,
                condition_key,
                as_less_than,
                as_equals,
                as_not_equals,
                as_greater_than,
                allow_null_qualifier,
            } => {
                validate_key(condition_key)?;
                let mut condition = AttributeCondition::new(
                    condition_key.clone(),
                    *as_less_than,
                    *as_equals,
                    *as_not_equals,
                    *as_greater_than,
                );
                if let Some(message) = error_message {
                    condition = condition.with_error_message(message.clone());
                }
                if *allow_null_qualifier {
                    condition = condition.allowing_null_qualifier();
                }
                Arc::new(condition)
            }
            ConditionSpec::TimeInterval {
                error_message,
                condition_key,
                min_months,
                min_days,
                default_upper,
                allow_null_qualifier,
            } => {
                validate_key(condition_key)?;
                let mut condition = TimeIntervalCondition::new(
                    condition_key.clone(),
                    *min_months,
                    *min_days,
                    *default_upper,
                )
                .with_clock(clock);
                if let Some(message) = error_message {
                    condition = condition.with_error_message(message.clone());
                }
                if *allow_null_qualifier {
                    condition = condition.allowing_null_qualifier();
                }
                Arc::new(condition)
            }
            ConditionSpec::And {
                error_message,
                first_condition,
                second_condition,
            } => build_bin_op(
                Combinator::And,
                error_message,
                first_condition,
                second_condition,
                clock,
            )?,
            ConditionSpec::Or {
                error_message,
                first_condition,
                second_condition,
            } => build_bin_op(
                Combinator::Or,
                error_message,
                first_condition,
                second_condition,
                clock,
            )?,
        };
        Ok(condition)
    }
}

fn validate_key(condition_key: &str) -> Result<(), PolicyError> {
    if condition_key.trim().is_empty() {
        return Err(PolicyError::InvalidCondition {
            reason: "conditionKey must not be empty".to_string(),
        });
    }
    Ok(())
}

fn build_bin_op(
    combinator: Combinator,
    error_message: &Option<String>,
    first: &ConditionSpec,
    second: &ConditionSpec,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn Condition>, PolicyError> {
    let first = first.build_with_clock(clock.clone())?;
    let second = second.build_with_clock(clock)?;
    let mut condition = BinOpCondition::from_arcs(combinator, first, second);
    if let Some(message) = error_message {
        condition = condition.with_error_message(message.clone());
    }
    Ok(Arc::new(condition))
}

#[derive(Debug, Deserialize)]
struct PolicyDocument {
    #[serde(default)]
    policies: BTreeMap<String, ConditionSpec>,
}

/// Named policies compiled once and shared by every blessing call
#[derive(Debug, Clone, Default)]
pub struct PolicyBook {
    policies: BTreeMap<String, Arc<dyn Condition>>,
}

impl PolicyBook {
    /// Load the `[policies.<name>]` tables of a TOML document
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Parse`] for malformed TOML and
    /// [`PolicyError::InvalidCondition`] for an invalid policy.
    pub fn from_toml_str(document: &str) -> Result<Self, PolicyError> {
        Self::load("toml", || {
            let parsed: PolicyDocument = toml::from_str(document)?;
            Self::from_specs(parsed.policies)
        })
    }

    /// Load the `"policies"` object of a JSON document
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Parse`] for malformed JSON and
    /// [`PolicyError::InvalidCondition`] for an invalid policy.
    pub fn from_json_str(document: &str) -> Result<Self, PolicyError> {
        Self::load("json", || {
            let parsed: PolicyDocument = serde_json::from_str(document)?;
            Self::from_specs(parsed.policies)
        })
    }

    fn load(
        format: &'static str,
        f: impl FnOnce() -> Result<Self, PolicyError>,
    ) -> Result<Self, PolicyError> {
        log_op_start!(OP_LOAD_POLICIES, format = format);
        let start = Instant::now();

        let book = f().map_err(|e| {
            log_op_error!(
                OP_LOAD_POLICIES,
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            OP_LOAD_POLICIES,
            duration_ms = start.elapsed().as_millis() as u64,
            policies = book.len()
        );
        Ok(book)
    }

    /// Compile already parsed specs
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidCondition`] naming the first invalid
    /// policy.
    pub fn from_specs(
        specs: impl IntoIterator<Item = (String, ConditionSpec)>,
    ) -> Result<Self, PolicyError> {
        Self::from_specs_with_clock(specs, Arc::new(SystemClock))
    }

    /// Compile already parsed specs with an explicit clock
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidCondition`] naming the first invalid
    /// policy.
    pub fn from_specs_with_clock(
        specs: impl IntoIterator<Item = (String, ConditionSpec)>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PolicyError> {
        let mut policies = BTreeMap::new();
        for (name, spec) in specs {
            let condition = spec
                .build_with_clock(clock.clone())
                .map_err(|e| match e {
                    PolicyError::InvalidCondition { reason } => PolicyError::InvalidCondition {
                        reason: format!("policy '{}': {}", name, reason),
                    },
                    other => other,
                })?;
            policies.insert(name, condition);
        }
        Ok(Self { policies })
    }

    /// Add or replace one policy
    pub fn insert(&mut self, name: impl Into<String>, condition: Arc<dyn Condition>) {
        self.policies.insert(name.into(), condition);
    }

    /// # Errors
    ///
    /// Returns [`PolicyError::UnknownPolicy`] if no policy has this name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Condition>, PolicyError> {
        self.policies
            .get(name)
            .cloned()
            .ok_or_else(|| PolicyError::UnknownPolicy {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute(key: &str) -> ConditionSpec {
        ConditionSpec::Attribute {
            error_message: None,
            condition_key: key.to_string(),
            as_less_than: false,
            as_equals: true,
            as_not_equals: false,
            as_greater_than: false,
            allow_null_qualifier: false,
        }
    }

    #[test]
    fn test_spec_uses_archived_key_names() {
        let json = serde_json::to_value(attribute("tenantId")).unwrap();
        assert_eq!(json["type"], "attribute");
        assert_eq!(json["conditionKey"], "tenantId");
        assert_eq!(json["asEquals"], true);
        assert!(json.get("errorMessage").is_none());
    }

    #[test]
    fn test_build_round_trips_through_to_spec() {
        let spec = ConditionSpec::Or {
            error_message: Some("EITHER".to_string()),
            first_condition: Box::new(attribute("a")),
            second_condition: Box::new(ConditionSpec::TimeInterval {
                error_message: None,
                condition_key: "createdAt".to_string(),
                min_months: 1,
                min_days: 2,
                default_upper: true,
                allow_null_qualifier: false,
            }),
        };

        let condition = spec.build().unwrap();
        assert_eq!(condition.to_spec().unwrap(), spec);
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = attribute(" ").build().unwrap_err();
        assert!(matches!(err, PolicyError::InvalidCondition { .. }));
    }

    #[test]
    fn test_unknown_policy() {
        let book = PolicyBook::default();
        assert_eq!(
            book.get("orders").unwrap_err(),
            PolicyError::UnknownPolicy {
                name: "orders".to_string()
            }
        );
    }
}
