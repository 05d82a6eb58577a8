//! Loading configuration from file and process environment.

mod support;

use buildtrack::config::{AppConfig, CONFIG_PATH_ENV};

const ENV_KEYS: [&str; 4] = ["PORT", "S3_BUCKET", "OPENAI_API_KEY", "REPOSITORY_TYPE"];

fn cleared<'a>(extra: &[(&'a str, Option<&'a str>)]) -> Vec<(&'a str, Option<&'a str>)> {
    let mut changes: Vec<(&str, Option<&str>)> = ENV_KEYS.iter().map(|k| (*k, None)).collect();
    changes.extend_from_slice(extra);
    changes
}

#[test]
fn test_load_reads_configured_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("site.toml");
    std::fs::write(&path, "[server]\nhost = \"127.0.0.1\"\nport = 9100\n").unwrap();
    let path = path.to_string_lossy().to_string();

    let config = support::with_scoped_env(&cleared(&[(CONFIG_PATH_ENV, Some(path.as_str()))]), || {
        AppConfig::load().unwrap()
    });
    assert_eq!(config.bind_address(), "127.0.0.1:9100");
}

#[test]
fn test_environment_wins_over_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("site.toml");
    std::fs::write(&path, "[server]\nport = 9100\n[storage]\nbucket = \"from-file\"\n").unwrap();
    let path = path.to_string_lossy().to_string();

    let config = support::with_scoped_env(
        &cleared(&[
            (CONFIG_PATH_ENV, Some(path.as_str())),
            ("PORT", Some("9200")),
            ("S3_BUCKET", Some("from-env")),
        ]),
        || AppConfig::load().unwrap(),
    );
    assert_eq!(config.server.port, 9200);
    assert_eq!(config.storage.s3().unwrap().bucket, "from-env");
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml").to_string_lossy().to_string();
    let config = support::with_scoped_env(&cleared(&[(CONFIG_PATH_ENV, Some(path.as_str()))]), || {
        AppConfig::load().unwrap()
    });
    assert_eq!(config, AppConfig::default());
}

#[tokio::test]
async fn test_default_services_are_in_memory() {
    let services = AppConfig::default().build_services().await.unwrap();
    assert!(services.repo.health_check().await.unwrap());
    assert!(services.extractor.is_none());
}
