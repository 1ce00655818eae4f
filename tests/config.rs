#![cfg(feature = "serde")]

use rstest::rstest;

use edns_base::config::{EdnsConfig, InvalidCookiePolicy};
use edns_base::error::ConfigError;
use edns_base::state::EdnsState;

#[test]
fn empty_config() {
    let config: EdnsConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, EdnsConfig::default());
}

#[test]
fn full_config() {
    let config: EdnsConfig = serde_json::from_str(r#"{
        "cookies": {
            "answer_cookies": true,
            "query_cookies": true,
            "secret": "00112233445566778899aabbccddeeff",
            "previous_secret": "ffeeddccbbaa99887766554433221100",
            "max_age": 7200,
            "max_future_skew": 60,
            "refresh_after": 900,
            "on_invalid": "client-only"
        },
        "tags": {
            "enabled": true,
            "opcode": 65001,
            "entries": [
                { "prefix": "198.51.100.0/24", "tag": 42 },
                { "prefix": "2001:db8::/32", "tag": 7 }
            ]
        },
        "padding": {
            "enabled": true,
            "query_block_size": 64,
            "encrypted_only": false
        },
        "keepalive": { "enabled": true, "timeout_ms": 30000 }
    }"#).unwrap();
    assert_eq!(config.cookies.on_invalid, InvalidCookiePolicy::ClientOnly);
    assert_eq!(config.padding.response_block_size, 468);

    let state = EdnsState::new(config).unwrap();
    let snapshot = state.load();
    assert_eq!(snapshot.window().max_age, 7200);
    assert!(snapshot.secrets().previous().is_some());
    assert_eq!(snapshot.tags().unwrap().len(), 2);
    assert_eq!(
        snapshot.tags().unwrap().lookup("2001:db8::53".parse().unwrap()),
        Some(7)
    );
}

#[test]
fn unknown_fields() {
    assert!(
        serde_json::from_str::<EdnsConfig>(r#"{"cookie": {}}"#).is_err()
    );
    assert!(
        serde_json::from_str::<EdnsConfig>(
            r#"{"cookies": {"on_invalid": "drop"}}"#
        ).is_err()
    );
}

#[rstest]
#[case(r#"{"cookies": {"secret": "0011"}}"#, ConfigError::BadSecret)]
#[case(
    r#"{"cookies": {"max_age": 0}}"#,
    ConfigError::BadValue { name: "max_age", value: 0 }
)]
#[case(
    r#"{"padding": {"response_block_size": 0}}"#,
    ConfigError::BadValue { name: "response_block_size", value: 0 }
)]
#[case(
    r#"{"tags": {"enabled": true, "entries": [{"prefix": "10.0.0.0/40", "tag": 1}]}}"#,
    ConfigError::BadPrefixLength(40)
)]
#[case(
    r#"{"tags": {"enabled": true, "entries": [
        {"prefix": "10.0.0.0/8", "tag": 1},
        {"prefix": "10.1.0.0/8", "tag": 2}
    ]}}"#,
    ConfigError::DuplicatePrefix("10.0.0.0/8".into())
)]
fn rejected_configs(#[case] json: &str, #[case] err: ConfigError) {
    let config: EdnsConfig = serde_json::from_str(json).unwrap();
    assert_eq!(EdnsState::new(config).unwrap_err(), err);
}
