//! Integration tests for switchyard-config crate.

use std::io::Write;
use switchyard_config::{Config, ConfigCache, ConfigError, ConfigLoader};

#[test]
fn test_default_config_validation() {
    let config = Config::default();

    assert!(config.validate_all().is_ok());
    assert!(!config.has_token());
    assert!(!config.discord.member_events);
    assert_eq!(config.permissions.cache_ttl_seconds, 3600);
    assert_eq!(config.dispatch.handler_opt_out_token, "collector:");
}

#[test]
fn test_partial_yaml_keeps_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "discord:\n  development_guild_id: 42\n  member_events: true\ndispatch:\n  reply_to_unknown: true\npermissions:\n  bot_owners: [7]\n"
    )
    .unwrap();

    let config = ConfigLoader::parse(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
    let config = ConfigLoader::finish(config, |_| None).unwrap();

    assert_eq!(config.discord.development_guild_id, Some(42));
    assert!(config.discord.member_events);
    assert_eq!(config.discord.request_timeout_seconds, 30);
    assert!(config.dispatch.reply_to_unknown);
    assert_eq!(config.permissions.bot_owners, vec![7]);
    assert_eq!(config.dispatch.component_data_delimiter, "#");
    assert_eq!(config.permissions.cache_ttl_seconds, 3600);
}

#[test]
fn test_invalid_yaml_is_a_parse_error() {
    let err = ConfigLoader::parse("dispatch: [not, a, map]").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_validation_failure_is_reported() {
    let config = ConfigLoader::parse("permissions:\n  cache_ttl_seconds: 0\n").unwrap();
    let err = ConfigLoader::finish(config, |_| None).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
}

#[test]
fn test_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigLoader::load_from_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_config_cache() {
    let config = Config::default();
    let cache = ConfigCache::new(config.clone());

    let cached_config = cache.get();
    assert_eq!(cached_config.dispatch.default_locale, config.dispatch.default_locale);

    let mut new_config = config;
    new_config.dispatch.default_locale = "fr".to_string();
    cache.update(new_config);

    let updated_config = cache.get();
    assert_eq!(updated_config.dispatch.default_locale, "fr");
}
