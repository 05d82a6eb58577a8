//! Repository selection from environment and config settings.

mod support;

use std::str::FromStr;

use buildtrack::db::{PostgresSettings, RepositoryFactory, RepositorySettings, RepositoryType};

#[test]
fn test_repository_type_names() {
    for name in ["postgres", "POSTGRES", "pg"] {
        assert_eq!(RepositoryType::from_str(name).unwrap(), RepositoryType::Postgres);
    }
    for name in ["local", "LOCAL", "memory"] {
        assert_eq!(RepositoryType::from_str(name).unwrap(), RepositoryType::Local);
    }
    let err = RepositoryType::from_str("sqlite").unwrap_err();
    assert!(err.contains("Unknown repository type"));
}

#[test]
fn test_repository_type_from_env() {
    let cases: [(&[(&str, Option<&str>)], RepositoryType); 4] = [
        (
            &[("REPOSITORY_TYPE", None), ("DATABASE_URL", None), ("PG_DATABASE_URL", None)],
            RepositoryType::Local,
        ),
        (
            &[("REPOSITORY_TYPE", None), ("DATABASE_URL", Some("postgres://localhost/site"))],
            RepositoryType::Postgres,
        ),
        (&[("REPOSITORY_TYPE", Some("postgres"))], RepositoryType::Postgres),
        (
            &[("REPOSITORY_TYPE", Some("invalid")), ("DATABASE_URL", None)],
            RepositoryType::Local,
        ),
    ];
    for (env, expected) in cases {
        support::with_scoped_env(env, || assert_eq!(RepositoryType::from_env(), expected));
    }
}

#[tokio::test]
async fn test_local_from_settings() {
    let repo = RepositoryFactory::from_settings(&RepositorySettings::default(), &PostgresSettings::default())
        .await
        .unwrap();
    assert!(repo.health_check().await.unwrap());
}

#[tokio::test]
async fn test_unknown_type_in_settings_fails() {
    let settings = RepositorySettings {
        repo_type: "sqlite".to_string(),
    };
    let err = RepositoryFactory::from_settings(&settings, &PostgresSettings::default())
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("Invalid repository type"));
}

#[cfg(not(feature = "postgres-repo"))]
#[tokio::test]
async fn test_postgres_without_feature_fails() {
    let err = RepositoryFactory::create(RepositoryType::Postgres, None)
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("feature not enabled"));
}
