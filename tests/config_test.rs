use mid::config::{MidConfig, load, validate};

#[test]
fn default_config_has_sensible_values() {
    let config = MidConfig::default();
    assert_eq!(config.gateway.port, 7300);
    assert_eq!(config.gateway.bind, "127.0.0.1");
    assert_eq!(config.backend.mode, "memory");
    assert!(config.backend.base_url.is_none());
    assert!(config.backend.token.is_none());
    assert_eq!(config.diary.listing_limit, 50);
}

#[test]
fn valid_toml_parses_successfully() {
    let toml_str = r#"
[gateway]
port = 8080
bind = "0.0.0.0"

[backend]
mode = "rest"
base_url = "http://localhost:3000"
token = "jwt-abc"

[diary]
listing_limit = 10
"#;

    let config: MidConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(config.gateway.port, 8080);
    assert_eq!(config.gateway.bind, "0.0.0.0");
    assert_eq!(config.backend.mode, "rest");
    assert_eq!(
        config.backend.base_url.as_deref(),
        Some("http://localhost:3000")
    );
    assert_eq!(config.backend.token.as_deref(), Some("jwt-abc"));
    assert_eq!(config.diary.listing_limit, 10);
    validate(&config).unwrap();
}

#[test]
fn partial_config_uses_defaults_for_missing_fields() {
    let toml_str = r#"
[backend]
mode = "memory"
"#;

    let config: MidConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(config.gateway.port, 7300);
    assert_eq!(config.diary.listing_limit, 50);
}

#[test]
fn empty_toml_uses_all_defaults() {
    let config: MidConfig = toml::from_str("").unwrap();
    assert_eq!(config.gateway.port, 7300);
    assert_eq!(config.backend.mode, "memory");
}

#[test]
fn malformed_toml_returns_parse_error() {
    let result = toml::from_str::<MidConfig>("this is not valid toml {{{");
    assert!(result.is_err());
}

#[test]
fn invalid_backend_mode_is_rejected() {
    let config: MidConfig = toml::from_str(
        r#"
[backend]
mode = "carrier-pigeon"
"#,
    )
    .unwrap();
    let err = validate(&config).unwrap_err();
    assert!(err.to_string().contains("invalid backend mode"));
}

#[test]
fn rest_mode_requires_a_base_url() {
    let config: MidConfig = toml::from_str(
        r#"
[backend]
mode = "rest"
"#,
    )
    .unwrap();
    let err = validate(&config).unwrap_err();
    assert!(err.to_string().contains("base_url is required"));
}

#[test]
fn rest_mode_rejects_non_http_urls() {
    let config: MidConfig = toml::from_str(
        r#"
[backend]
mode = "rest"
base_url = "ftp://example.com"
"#,
    )
    .unwrap();
    let err = validate(&config).unwrap_err();
    assert!(err.to_string().contains("http(s)"));
}

#[test]
fn zero_listing_limit_is_rejected() {
    let config: MidConfig = toml::from_str(
        r#"
[diary]
listing_limit = 0
"#,
    )
    .unwrap();
    let err = validate(&config).unwrap_err();
    assert!(err.to_string().contains("listing_limit"));
}

#[test]
fn missing_config_file_uses_defaults() {
    // SAFETY: test runs single-threaded for env var access
    unsafe {
        std::env::set_var("MID_CONFIG", "/tmp/nonexistent-mid-config.toml");
    }
    let result = load();
    unsafe {
        std::env::remove_var("MID_CONFIG");
    }

    let config = result.unwrap();
    assert_eq!(config.gateway.port, 7300);
}

#[test]
fn config_file_env_var_override() {
    let tmp_config = "/tmp/mid-test-config.toml";
    std::fs::write(
        tmp_config,
        r#"
[gateway]
port = 9999
"#,
    )
    .unwrap();

    // SAFETY: test runs single-threaded for env var access
    unsafe {
        std::env::set_var("MID_CONFIG", tmp_config);
    }
    let result = load();
    unsafe {
        std::env::remove_var("MID_CONFIG");
    }
    std::fs::remove_file(tmp_config).ok();

    let config = result.unwrap();
    assert_eq!(config.gateway.port, 9999);
}
