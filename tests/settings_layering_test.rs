use clausewise::Settings;
use clausewise::config::{RetrievalMode, SearchBackend, ValidationMode};
use std::env;
use tempfile::TempDir;

// Environment variables are process-wide, so every layering case lives in
// this one test.
#[test]
fn test_file_then_env_layering() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    std::fs::write(
        &config_path,
        r#"
[pipeline]
retrieval = "embedding"
validation = "threshold"
threshold = 0.6
max_retries = 4

[rules]
chunk_size = 200
"#,
    )
    .unwrap();

    let settings = Settings::load_from(&config_path).unwrap();
    assert_eq!(settings.pipeline.retrieval, RetrievalMode::Embedding);
    assert_eq!(settings.pipeline.validation, ValidationMode::Threshold);
    assert_eq!(settings.pipeline.threshold, 0.6);
    assert_eq!(settings.rules.chunk_size, 200);
    assert!(settings.validate().is_ok());

    unsafe {
        env::set_var("CW_PIPELINE__THRESHOLD", "0.9");
        env::set_var("CW_RULES__CHUNK_SIZE", "50");
        env::set_var("AZURE_SEARCH_ENDPOINT", "https://search.example.net");
    }

    let settings = Settings::load_from(&config_path).unwrap();

    unsafe {
        env::remove_var("CW_PIPELINE__THRESHOLD");
        env::remove_var("CW_RULES__CHUNK_SIZE");
        env::remove_var("AZURE_SEARCH_ENDPOINT");
    }

    assert_eq!(settings.pipeline.threshold, 0.9);
    assert_eq!(settings.rules.chunk_size, 50);
    assert_eq!(settings.search.endpoint, "https://search.example.net");
    assert_eq!(settings.search.resolved_backend(), SearchBackend::Azure);
    // Untouched file values survive.
    assert_eq!(settings.pipeline.max_retries, 4);
    assert_eq!(settings.pipeline.retrieval, RetrievalMode::Embedding);
}
