//! Configuration module tests

use ozon_seller_api::config::settings::{DEFAULT_BASE_URL, DEFAULT_RETRIES, DEFAULT_TIMEOUT_MS};
use ozon_seller_api::{Credentials, HttpClient, OzonConfig, OzonError, OzonSellerClient};
use std::env;
use std::sync::Mutex;

const KEY: &str = "12345678-1234-5678-9abc-123456789012";

const ENV_VARS: [&str; 6] = [
    "OZON_API_KEY",
    "OZON_CLIENT_ID",
    "OZON_BASE_URL",
    "OZON_TIMEOUT_MS",
    "OZON_RETRIES",
    "OZON_USER_AGENT",
];

/// Environment is process-global; tests touching it take this lock
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn cleanup_test_env() {
    for var in ENV_VARS {
        env::remove_var(var);
    }
}

fn setup_test_env() {
    env::set_var("OZON_API_KEY", KEY);
    env::set_var("OZON_CLIENT_ID", "12345678");
}

#[test]
fn test_from_env_with_defaults() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_test_env();
    setup_test_env();

    let config = OzonConfig::from_env().unwrap();
    assert_eq!(config.api_key, KEY);
    assert_eq!(config.client_id, "12345678");

    let settings = config.resolve().unwrap();
    assert_eq!(settings.base_url.as_str(), format!("{}/", DEFAULT_BASE_URL));
    assert_eq!(settings.timeout_ms, DEFAULT_TIMEOUT_MS);
    assert_eq!(settings.retries, DEFAULT_RETRIES);

    cleanup_test_env();
}

#[test]
fn test_from_env_with_overrides() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_test_env();
    setup_test_env();
    env::set_var("OZON_BASE_URL", "https://sandbox.example.com");
    env::set_var("OZON_TIMEOUT_MS", "5000");
    env::set_var("OZON_RETRIES", "0");
    env::set_var("OZON_USER_AGENT", "my-shop/2.0");

    let settings = OzonConfig::from_env().unwrap().resolve().unwrap();
    assert_eq!(settings.base_url.host_str(), Some("sandbox.example.com"));
    assert_eq!(settings.timeout_ms, 5000);
    assert_eq!(settings.retries, 0);
    assert_eq!(settings.user_agent, "my-shop/2.0");

    cleanup_test_env();
}

#[test]
fn test_from_env_missing_or_invalid() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_test_env();

    assert!(matches!(
        OzonConfig::from_env(),
        Err(OzonError::ConfigurationInvalid { .. })
    ));

    setup_test_env();
    env::set_var("OZON_TIMEOUT_MS", "soon");
    assert!(OzonConfig::from_env().is_err());

    env::set_var("OZON_TIMEOUT_MS", "500");
    assert!(OzonConfig::from_env().is_err());

    cleanup_test_env();
}

#[test]
fn test_empty_api_key_fails_construction() {
    let config = OzonConfig::new("", "12345678");

    assert!(matches!(
        HttpClient::new(config.clone()),
        Err(OzonError::ConfigurationInvalid { .. })
    ));
    assert!(matches!(
        OzonSellerClient::new(config),
        Err(OzonError::ConfigurationInvalid { .. })
    ));
    assert!(OzonSellerClient::new(OzonConfig::new(KEY, "  ")).is_err());
}

#[test]
fn test_value_bounds() {
    let config = || OzonConfig::new(KEY, "12345678");

    assert!(config().with_timeout_ms(999).resolve().is_err());
    assert!(config().with_timeout_ms(300_001).resolve().is_err());
    assert!(config().with_retries(10).resolve().is_ok());
    assert!(config().with_retries(11).resolve().is_err());
    assert!(config().with_base_url("ftp://api-seller.ozon.ru").resolve().is_err());
    assert!(config().with_base_url("not a url").resolve().is_err());
}

#[test]
fn test_config_deserialization() {
    let config: OzonConfig = serde_json::from_str(&format!(
        r#"{{"api_key": "{}", "client_id": "12345678", "retries": 1}}"#,
        KEY
    ))
    .unwrap();

    let settings = config.resolve().unwrap();
    assert_eq!(settings.retries, 1);
    assert_eq!(settings.timeout_ms, DEFAULT_TIMEOUT_MS);
}

#[test]
fn test_credentials_never_printed() {
    let credentials = Credentials::new(KEY, "12345678");
    let debug = format!("{:?}", credentials);
    assert!(!debug.contains(KEY));
    assert!(!debug.contains("12345678\""));

    let config = OzonConfig::new(KEY, "12345678");
    assert!(!format!("{:?}", config).contains(KEY));
    assert!(!format!("{:?}", config.resolve().unwrap()).contains(KEY));
}
