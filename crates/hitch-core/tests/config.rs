use hitch_core::config::Config;

#[test]
fn config_default_matches_documented_defaults() {
    let config = Config::default();
    assert_eq!(config.libs_dir, "libs");
    assert!(!config.offline);
    assert_eq!(config.retries, 3);
    assert!(config.worker_count > 0);
}

#[test]
fn config_parse_from_toml() {
    let toml = r#"
libs_dir = "custom-libs"
offline = true
worker_count = 8
request_timeout_ms = 5000
retries = 1
"#;
    let config: Config = toml::from_str(toml).unwrap();
    assert_eq!(config.libs_dir, "custom-libs");
    assert!(config.offline);
    assert_eq!(config.worker_count, 8);
    assert_eq!(config.request_timeout_ms, 5000);
    assert_eq!(config.retries, 1);
}

#[test]
fn config_load_missing_file_falls_back_to_defaults() {
    let config = Config::load(std::path::Path::new("/no/such/hitch.toml")).unwrap();
    assert_eq!(config.libs_dir, Config::default().libs_dir);
}
