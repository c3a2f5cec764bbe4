use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use tempfile::TempDir;

use salesintel_core::config::{Config, Settings};
use salesintel_core::tokens::TokenEstimator;
use salesintel_core::Error;

#[test]
fn environment_file_overrides_base_file() {
    let tmp = TempDir::new().expect("tmp");
    let base = tmp.path().join("config.toml");
    let env = tmp.path().join("config.test.toml");
    fs::write(&base, "[vector]\ndimension = 768\ndefault_limit = 3\n[store]\nsqlite_path = \"base.db\"\n").expect("write");
    fs::write(&env, "[vector]\ndefault_limit = 7\n").expect("write");

    let figment = Figment::from(Serialized::defaults(Settings::default()))
        .merge(Toml::file(&base))
        .merge(Toml::file(&env));
    let settings = Config::from_figment(figment, "test").expect("config").settings().expect("settings");
    assert_eq!(settings.vector.dimension, 768);
    assert_eq!(settings.vector.default_limit, 7);
    assert_eq!(settings.store.sqlite_path, "base.db");
    assert_eq!(settings.oracle.base_url, "https://api.openai.com/v1");
}

#[test]
fn missing_files_fall_back_to_defaults() {
    let tmp = TempDir::new().expect("tmp");
    let figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(tmp.path().join("absent.toml")));
    let settings = Config::from_figment(figment, "dev").expect("config").settings().expect("settings");
    assert_eq!(settings.vector.dimension, 1536);
    assert!((settings.vector.default_threshold - 0.7).abs() < f32::EPSILON);
    assert_eq!(settings.vector.context_token_budget, 2000);
    assert_eq!(settings.agent.translator_turns, 4);
}

#[test]
fn empty_allow_list_is_invalid() {
    let figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string("[agent]\nallowed_entities = []\n"));
    let err = Config::from_figment(figment, "dev").err().expect("invalid");
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn token_estimate_follows_configured_ratio() {
    let settings = Settings::default();
    let est = TokenEstimator::new(settings.vector.chars_per_token);
    assert_eq!(est.estimate("abcdefgh"), 2);
    assert_eq!(est.estimate("abcdefghi"), 3);
    assert_eq!(TokenEstimator::new(1).estimate("héllo"), 5);
}
