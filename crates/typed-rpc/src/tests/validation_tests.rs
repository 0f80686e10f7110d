//! Property-based tests for input validation

use crate::ErrorCode;
use crate::validation::{ValidationRules, validate_input_size, validate_path};
use proptest::prelude::*;
use serde_json::json;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Dotted identifier paths are accepted
    #[test]
    fn prop_valid_paths_accepted(
        segments in prop::collection::vec("[a-zA-Z][a-zA-Z0-9_-]{0,10}", 1..5)
    ) {
        let path = segments.join(".");
        prop_assert!(validate_path(&path).is_ok(), "'{}' should be accepted", path);
    }

    /// Paths with characters outside the allowed set are rejected
    #[test]
    fn prop_invalid_char_paths_rejected(
        prefix in "[a-z]{1,5}",
        invalid_char in "[^a-zA-Z0-9_.-]",
        suffix in "[a-z]{1,5}"
    ) {
        let path = format!("{}{}{}", prefix, invalid_char, suffix);
        let err = validate_path(&path).unwrap_err();
        prop_assert_eq!(err.code, ErrorCode::Config);
    }

    /// Leading, trailing and doubled dots are rejected
    #[test]
    fn prop_malformed_dots_rejected(name in "[a-z]{1,10}") {
        for path in [format!(".{}", name), format!("{}.", name), format!("{}..{}", name, name)] {
            prop_assert!(validate_path(&path).is_err(), "'{}' should be rejected", path);
        }
    }

    /// Inputs over the limit are rejected with 413
    #[test]
    fn prop_oversized_input_rejected(len in 20usize..200) {
        let input = json!({ "data": "x".repeat(len) });
        let err = validate_input_size(&input, 16).unwrap_err();
        prop_assert_eq!(err.status_code, 413);
        prop_assert!(validate_input_size(&input, len + 64).is_ok());
    }

    /// Length rules agree with character counts
    #[test]
    fn prop_length_rules(value in "\\PC{0,20}", min in 0usize..10, max in 10usize..20) {
        let result = ValidationRules::new()
            .min_length("v", &value, min)
            .max_length("v", &value, max)
            .build();
        let count = value.chars().count();
        prop_assert_eq!(result.is_valid(), count >= min && count <= max);
    }
}
