#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{eq, equals_only, since, tenant_and_recent, ts, until};
use qbless_core::condition::{AttributeCondition, BinOpCondition};
use qbless_core::errors::{BLESS_DENIED, BLESS_NO_QUALIFIER};
use qbless_core::qualifier::{Qualifier, Selector};
use qbless_core::{DenialKind, QualifierBlessing};

#[test]
fn test_scenario_tenant_and_recent_window_blessed() {
    let condition = tenant_and_recent(ts(2024, 3, 1));
    let qualifier = Qualifier::and([eq("tenantId", 42), since("createdAt", ts(2024, 1, 1))]);

    assert!(QualifierBlessing::new()
        .bless(Some(&qualifier), &condition)
        .is_ok());
}

#[test]
fn test_scenario_missing_tenant_denied() {
    let condition = tenant_and_recent(ts(2024, 3, 1));
    let qualifier = since("createdAt", ts(2023, 1, 1));

    let denial = QualifierBlessing::new()
        .bless(Some(&qualifier), &condition)
        .unwrap_err();

    // the tenant leaf is the first to fail on `createdAt`
    assert_eq!(denial.message(), "TENANT_REQUIRED");
}

#[test]
fn test_cross_branch_accumulation() {
    let condition = BinOpCondition::and(equals_only("a"), equals_only("b"));
    let blessing = QualifierBlessing::new();

    assert!(blessing.bless(Some(&eq("a", 1)), &condition).is_err());
    assert!(blessing.bless(Some(&eq("b", 2)), &condition).is_err());
    assert!(blessing
        .bless(Some(&Qualifier::and([eq("a", 1), eq("b", 2)])), &condition)
        .is_ok());
}

#[test]
fn test_verdict_independent_of_sibling_order() {
    let condition = BinOpCondition::and(equals_only("tenantId"), equals_only("status"));
    let status_branch = Qualifier::or([eq("status", "open"), eq("status", "closed")]);
    let blessing = QualifierBlessing::new();

    let tenant_first = Qualifier::and([eq("tenantId", 1), status_branch.clone()]);
    let tenant_last = Qualifier::and([status_branch, eq("tenantId", 1)]);

    assert!(blessing.bless(Some(&tenant_first), &condition).is_ok());
    assert!(blessing.bless(Some(&tenant_last), &condition).is_ok());
}

#[test]
fn test_or_with_unconstrained_branch_denied() {
    let condition = equals_only("tenantId").with_error_message("TENANT_REQUIRED");
    let qualifier = Qualifier::or([eq("tenantId", 1), eq("name", "x")]);

    let denial = QualifierBlessing::new()
        .bless(Some(&qualifier), &condition)
        .unwrap_err();

    assert_eq!(denial.message(), "TENANT_REQUIRED");
    assert_eq!(denial.kind(), DenialKind::StructuralMismatch);
}

#[test]
fn test_not_inverts_operator_classes() {
    let not_equals_only = AttributeCondition::new("status", false, false, true, false);
    let blessing = QualifierBlessing::new();

    let negated_equality = Qualifier::not(eq("status", "closed"));
    assert!(blessing.bless(Some(&negated_equality), &not_equals_only).is_ok());
    assert!(blessing.bless(Some(&eq("status", "closed")), &not_equals_only).is_err());
}

#[test]
fn test_negated_and_policy_is_not_demorganized() {
    // not ((a <> 1) and (b <> 2)) against a policy requiring `=` on both a and b
    let condition = BinOpCondition::and(equals_only("a"), equals_only("b"));
    let qualifier = Qualifier::not(Qualifier::and([
        Qualifier::key_value("a", Selector::NotEqual, 1),
        Qualifier::key_value("b", Selector::NotEqual, 2),
    ]));
    assert!(QualifierBlessing::new()
        .bless(Some(&qualifier), &condition)
        .is_ok());

    // polarity reaches both children but one leaf never satisfies both
    let one_sided = Qualifier::not(Qualifier::key_value("a", Selector::NotEqual, 1));
    assert!(QualifierBlessing::new()
        .bless(Some(&one_sided), &condition)
        .is_err());
}

#[test]
fn test_in_set_every_value_checked() {
    let blessing = QualifierBlessing::new();
    let qualifier = Qualifier::in_set("tenantId", [1, 2, 3]);

    assert!(blessing.bless(Some(&qualifier), &equals_only("tenantId")).is_ok());
    assert!(blessing.bless(Some(&qualifier), &equals_only("ownerId")).is_err());
}

#[test]
fn test_key_comparison_leaf() {
    let condition = AttributeCondition::new("updatedAt", false, false, false, true);
    let qualifier = Qualifier::key_comparison("updatedAt", Selector::GreaterThan, "createdAt");

    assert!(QualifierBlessing::new()
        .bless(Some(&qualifier), &condition)
        .is_ok());
}

#[test]
fn test_null_qualifier() {
    let blessing = QualifierBlessing::new();

    let denial = blessing.bless(None, &equals_only("tenantId")).unwrap_err();
    assert_eq!(denial.message(), BLESS_NO_QUALIFIER);

    let forbid_pattern = AttributeCondition::new("password", false, false, false, false)
        .allowing_null_qualifier();
    assert!(blessing.bless(None, &forbid_pattern).is_ok());
}

#[test]
fn test_window_too_wide_uses_leaf_message() {
    let condition = tenant_and_recent(ts(2024, 3, 1));
    let qualifier = Qualifier::and([
        eq("tenantId", 42),
        since("createdAt", ts(2023, 1, 1)),
        until("createdAt", ts(2023, 12, 31)),
    ]);

    let denial = QualifierBlessing::new()
        .bless(Some(&qualifier), &condition)
        .unwrap_err();

    // `tenantId = 42` fails the window leaf first
    assert_eq!(denial.message(), "WINDOW_TOO_WIDE");
}

#[test]
fn test_fallback_message() {
    let qualifier = eq("name", "x");
    let denial = QualifierBlessing::new()
        .bless(Some(&qualifier), &equals_only("tenantId"))
        .unwrap_err();

    assert_eq!(denial.message(), BLESS_DENIED);
    assert_eq!(denial.kind(), DenialKind::PolicyUnsatisfied);
}
