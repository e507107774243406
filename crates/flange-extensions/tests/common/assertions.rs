//! Assertion helpers for registry lifecycle testing

#![allow(dead_code)]

use flange_extensions::ExtensionError;

use super::mocks::CallTracker;

/// Assert `first` ran `phase` before `second`
pub fn assert_ran_before(tracker: &CallTracker, phase: &str, first: &str, second: &str) {
    let order = tracker.phase_order(phase);
    let a = order.iter().position(|e| e == first);
    let b = order.iter().position(|e| e == second);
    match (a, b) {
        (Some(a), Some(b)) => assert!(
            a < b,
            "Expected '{}' to {} before '{}', got {:?}",
            first,
            phase,
            second,
            order
        ),
        _ => panic!(
            "Expected both '{}' and '{}' to {}, got {:?}",
            first, second, phase, order
        ),
    }
}

/// Assert no extension reached `register`
pub fn assert_nothing_registered(tracker: &CallTracker) {
    assert!(
        tracker.phase_order("register").is_empty(),
        "Expected no register calls, got {:?}",
        tracker.call_order()
    );
}

/// Assert a validation error for `alias` whose message mentions every fragment
pub fn assert_validation_error(err: &ExtensionError, alias: &str, fragments: &[&str]) {
    match err {
        ExtensionError::Validation { alias: a, source } => {
            assert_eq!(a, alias);
            let message = source.to_string();
            for fragment in fragments {
                assert!(
                    message.contains(fragment),
                    "Expected '{}' in validation message '{}'",
                    fragment,
                    message
                );
            }
        }
        other => panic!("Expected validation error for '{}', got {:?}", alias, other),
    }
}
