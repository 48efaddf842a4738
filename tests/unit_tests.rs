use airtable_sync::{ConnectorOpts, RunOpts};
use std::path::PathBuf;

#[test]
fn test_connector_opts_creation() {
    let opts = ConnectorOpts {
        data_dir: PathBuf::from("/data"),
        config: None,
        api_token: Some("patXYZ".to_string()),
        api_url: "https://api.airtable.com".to_string(),
    };

    assert_eq!(opts.config_path(), PathBuf::from("/data/config.json"));
    assert_eq!(opts.api_token, Some("patXYZ".to_string()));
    assert_eq!(opts.api_url, "https://api.airtable.com");
}

#[test]
fn test_explicit_config_path() {
    let opts = ConnectorOpts {
        data_dir: PathBuf::from("/data"),
        config: Some(PathBuf::from("/etc/airtable/config.yaml")),
        api_token: None,
        api_url: "http://localhost:8080".to_string(),
    };

    assert_eq!(opts.config_path(), PathBuf::from("/etc/airtable/config.yaml"));
}

#[test]
fn test_run_opts_defaults() {
    let opts = RunOpts::default();

    assert!(opts.input.is_none());
    assert!(opts.log_output.is_none());
    assert_eq!(opts.delimiter, ',');
}
