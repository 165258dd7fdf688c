use octrace_engine::{TraceError, TracerConfig, DEFAULT_MEMORY_COPY_LIMIT};
use tracing::info;

#[test]
fn test_default_config() {
    octrace_common::logging::ensure_test_logging(None);
    info!("Running test");
    let config = TracerConfig::default();

    assert!(config.with_preimages);
    assert!(config.with_address_book);
    assert_eq!(config.memory_copy_limit, DEFAULT_MEMORY_COPY_LIMIT);
}

#[test]
fn test_config_builders() {
    octrace_common::logging::ensure_test_logging(None);
    info!("Running test");
    let config = TracerConfig::default()
        .with_preimages(false)
        .with_address_book(false)
        .with_memory_copy_limit(1024);

    assert!(!config.with_preimages);
    assert!(!config.with_address_book);
    assert_eq!(config.memory_copy_limit, 1024);
}

#[test]
fn test_config_from_empty_json() {
    octrace_common::logging::ensure_test_logging(None);
    assert_eq!(TracerConfig::from_json("{}").unwrap(), TracerConfig::default());
    assert_eq!(TracerConfig::from_json("").unwrap(), TracerConfig::default());
    assert_eq!(TracerConfig::from_json(" null ").unwrap(), TracerConfig::default());
}

#[test]
fn test_config_from_partial_json() {
    octrace_common::logging::ensure_test_logging(None);
    let config = TracerConfig::from_json(r#"{"withPreimages": false, "memoryCopyLimit": 64}"#)
        .unwrap();

    assert!(!config.with_preimages);
    assert!(config.with_address_book);
    assert_eq!(config.memory_copy_limit, 64);
}

#[test]
fn test_config_rejects_malformed_json() {
    octrace_common::logging::ensure_test_logging(None);
    let err = TracerConfig::from_json(r#"{"withPreimages": "yes"}"#).unwrap_err();
    assert!(matches!(err, TraceError::InvalidConfig(_)));
    assert!(!err.is_malformed());
}

#[test]
fn test_config_serializes_camel_case() {
    let value = serde_json::to_value(TracerConfig::default()).unwrap();
    assert_eq!(value["withPreimages"], serde_json::json!(true));
    assert_eq!(value["withAddressBook"], serde_json::json!(true));
    assert_eq!(value["memoryCopyLimit"], serde_json::json!(DEFAULT_MEMORY_COPY_LIMIT));
}
