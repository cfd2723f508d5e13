//! Tests for the input safety gate

use super::*;
use pretty_assertions::assert_eq;
use serde_json::json;

mod connection_string_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_accepts_standard_and_srv_schemes() {
        assert!(InputGate::validate_connection_string("mongodb://localhost:27017").is_valid());
        assert!(
            InputGate::validate_connection_string("mongodb+srv://user:pw@cluster0.example.net/app")
                .is_valid()
        );
    }

    #[test]
    fn test_rejects_foreign_scheme() {
        let verdict = InputGate::validate_connection_string("postgres://x");
        assert_eq!(
            verdict,
            Verdict::reject("Connection string must start with mongodb:// or mongodb+srv://")
        );
    }

    #[test]
    fn test_rejects_empty_and_whitespace() {
        assert!(!InputGate::validate_connection_string("").is_valid());
        assert!(!InputGate::validate_connection_string("   \t").is_valid());
    }

    #[test]
    fn test_rejects_non_mongodb_strings() {
        for candidate in [
            "mysql://localhost",
            "http://localhost:27017",
            "localhost:27017",
            "MONGODB://localhost",
            "mongodb:/localhost",
        ] {
            assert!(
                !InputGate::validate_connection_string(candidate).is_valid(),
                "{} should be rejected",
                candidate
            );
        }
    }

    #[test]
    fn test_rejects_injection_patterns_case_insensitively() {
        for candidate in [
            "mongodb://localhost/?x=javascript:alert(1)",
            "mongodb://localhost/<SCRIPT>",
            "mongodb://localhost/?eval(1)",
            "mongodb://localhost/?appName=Function(x)",
        ] {
            let verdict = InputGate::validate_connection_string(candidate);
            assert_eq!(
                verdict.reason(),
                Some("Connection string contains potentially dangerous content"),
                "{}",
                candidate
            );
        }
    }
}

mod query_shape_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_query_is_valid() {
        let gate = InputGate::default();
        let query = json!({ "status": "active", "age": { "$gte": 21 } });
        assert!(gate.validate_query_shape(&query).is_valid());
    }

    #[test]
    fn test_rejects_where_at_top_level() {
        let gate = InputGate::default();
        let verdict = gate.validate_query_shape(&json!({ "$where": "this.a > 1" }));
        assert_eq!(verdict.reason(), Some("Operator '$where' is not allowed"));
    }

    #[test]
    fn test_rejects_where_nested_in_array() {
        let gate = InputGate::default();
        let query = json!({ "$or": [{ "a": 1 }, { "$where": "sleep(100)" }] });
        assert!(!gate.validate_query_shape(&query).is_valid());
    }

    #[test]
    fn test_rejects_each_denied_operator_key() {
        let gate = InputGate::default();
        for op in DENIED_OPERATORS {
            let query = json!({ "outer": { op: 1 } });
            assert!(!gate.validate_query_shape(&query).is_valid(), "{}", op);
        }
    }

    #[test]
    fn test_rejects_denied_name_inside_string_value() {
        let gate = InputGate::default();
        let query = json!({ "name": "x; $function(){}" });
        assert!(!gate.validate_query_shape(&query).is_valid());
    }

    #[test]
    fn test_depth_over_ceiling_is_rejected() {
        let gate = InputGate::default();
        let query = json!({ "a": { "b": { "c": { "d": { "e": { "f": 1 } } } } } });
        assert_eq!(query_depth(&query), 6);
        let verdict = gate.validate_query_shape(&query);
        assert_eq!(
            verdict.reason(),
            Some("Query nesting depth 6 exceeds the maximum of 5")
        );
    }

    #[test]
    fn test_depth_at_ceiling_is_accepted() {
        let gate = InputGate::default();
        let query = json!({ "a": { "b": { "c": { "d": { "e": 1 } } } } });
        assert_eq!(query_depth(&query), 5);
        assert!(gate.validate_query_shape(&query).is_valid());
    }

    #[test]
    fn test_arrays_count_toward_depth() {
        assert_eq!(query_depth(&json!(1)), 0);
        assert_eq!(query_depth(&json!({})), 1);
        assert_eq!(query_depth(&json!([[1]])), 2);
        assert_eq!(query_depth(&json!({ "a": [{ "b": 1 }] })), 3);
    }

    #[test]
    fn test_custom_depth_ceiling() {
        let gate = InputGate::new(2, DEFAULT_MAX_DOCUMENT_BYTES);
        assert!(gate.validate_query_shape(&json!({ "a": { "b": 1 } })).is_valid());
        assert!(!gate.validate_query_shape(&json!({ "a": { "b": { "c": 1 } } })).is_valid());
    }
}

mod sanitize_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strips_only_denied_keys() {
        let query = json!({
            "status": "active",
            "$where": { "nested": "gone" },
            "meta": { "$function": 1, "keep": [1, 2, 3] }
        });
        let expected = json!({
            "status": "active",
            "meta": { "keep": [1, 2, 3] }
        });
        assert_eq!(sanitize_query(&query), expected);
    }

    #[test]
    fn test_recurses_into_array_elements() {
        let query = json!({ "$and": [{ "a": 1, "$where": "x" }, { "b": 2 }] });
        let expected = json!({ "$and": [{ "a": 1 }, { "b": 2 }] });
        assert_eq!(sanitize_query(&query), expected);
    }

    #[test]
    fn test_clean_query_is_unchanged() {
        let query = json!({ "a": [1, { "b": null }], "c": "text" });
        assert_eq!(sanitize_query(&query), query);
    }

    #[test]
    fn test_sanitized_query_passes_operator_check() {
        let gate = InputGate::default();
        let query = json!({ "$where": "1", "a": { "mapReduce": 1, "b": 2 } });
        assert!(gate.validate_query_shape(&sanitize_query(&query)).is_valid());
    }
}

mod document_size_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_small_document_is_valid() {
        let gate = InputGate::default();
        assert!(gate.validate_document_size(&json!({ "a": 1 })).is_valid());
    }

    #[test]
    fn test_oversized_document_is_rejected() {
        let gate = InputGate::new(DEFAULT_MAX_QUERY_DEPTH, 16);
        let verdict = gate.validate_document_size(&json!({ "payload": "0123456789abcdef" }));
        assert!(!verdict.is_valid());
    }

    #[test]
    fn test_exact_limit_is_valid() {
        // {"a":1} serializes to 7 bytes
        let gate = InputGate::new(DEFAULT_MAX_QUERY_DEPTH, 7);
        assert!(gate.validate_document_size(&json!({ "a": 1 })).is_valid());
    }
}

mod name_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_valid_names() {
        for name in ["users", "app_db", "logs-2024", "A1"] {
            assert!(InputGate::validate_name(name, NameKind::Collection).is_valid());
        }
    }

    #[test]
    fn test_empty_name() {
        let verdict = InputGate::validate_name("", NameKind::Database);
        assert_eq!(verdict.reason(), Some("Database name is required"));
    }

    #[test]
    fn test_invalid_characters() {
        for name in ["my db", "a.b", "x$", "naïve", "a/b"] {
            assert!(
                !InputGate::validate_name(name, NameKind::Collection).is_valid(),
                "{}",
                name
            );
        }
    }

    #[test]
    fn test_length_limit() {
        let at_limit = "a".repeat(MAX_NAME_LENGTH);
        let over_limit = "a".repeat(MAX_NAME_LENGTH + 1);
        assert!(InputGate::validate_name(&at_limit, NameKind::Index).is_valid());
        assert!(!InputGate::validate_name(&over_limit, NameKind::Index).is_valid());
    }
}

mod pagination_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_when_missing() {
        let pagination = InputGate::validate_pagination(None, None).unwrap();
        assert_eq!(pagination, Pagination::default());
        assert_eq!(pagination.skip(), 0);
    }

    #[test]
    fn test_parses_values() {
        let pagination = InputGate::validate_pagination(Some("3"), Some("25")).unwrap();
        assert_eq!(pagination, Pagination { page: 3, limit: 25 });
        assert_eq!(pagination.skip(), 50);
    }

    #[test]
    fn test_rejects_non_positive() {
        assert!(InputGate::validate_pagination(Some("0"), None).is_err());
        assert!(InputGate::validate_pagination(Some("-2"), None).is_err());
        assert!(InputGate::validate_pagination(None, Some("0")).is_err());
    }

    #[test]
    fn test_rejects_non_numeric() {
        let verdict = InputGate::validate_pagination(Some("abc"), None).unwrap_err();
        assert_eq!(verdict.reason(), Some("Page must be a positive integer"));
    }

    #[test]
    fn test_limit_ceiling() {
        assert!(InputGate::validate_pagination(None, Some("100")).is_ok());
        let verdict = InputGate::validate_pagination(None, Some("101")).unwrap_err();
        assert_eq!(verdict.reason(), Some("Limit cannot exceed 100"));
    }
}
