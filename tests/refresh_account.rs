use serde_json::json;
use server_account::account_scheme::AccountScheme;
use server_account::args::Arguments;
use server_account::file_state::{FileState, StoredUser};
use server_account::refresh_account;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::LocalTransport;

mod common;

const CONFIG: &str = r#"
[scheme.OAuth2]
client_id = "client"
client_secret = "secret"
token_host = "provider.test"
"#;

struct Setup {
    _tmp_dir: TempDir,
    state_file: PathBuf,
    config_file: PathBuf,
}

impl Setup {
    fn new() -> Setup {
        let tmp_dir = tempfile::tempdir().unwrap();
        let state_file = tmp_dir.path().join(".server-account.json");
        let config_file = tmp_dir.path().join("config.toml");
        std::fs::write(&config_file, CONFIG).unwrap();

        Setup {
            _tmp_dir: tmp_dir,
            state_file,
            config_file,
        }
    }

    fn args(&self, user_id: i64, headers: &[(&str, &str)]) -> Arguments {
        Arguments {
            scheme: Some(AccountScheme::OAuth2),
            user_id: Some(user_id),
            headers: headers
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            state_file: Some(self.state_file.to_owned()),
            config_file: Some(self.config_file.to_owned()),
            ..Default::default()
        }
    }

    fn file_state(&self) -> FileState {
        FileState::from(self.state_file.to_owned())
    }

    async fn store(&self, user_id: i64, account_type: AccountScheme, creds: &str) {
        self.file_state()
            .upsert_user(StoredUser {
                user_id,
                account_type,
                creds: creds.to_owned(),
                cloud_folder_name: Some("Backups".to_owned()),
            })
            .await
            .unwrap();
    }

    async fn creds(&self, user_id: i64) -> Option<String> {
        self.file_state()
            .read_user(user_id)
            .await
            .map(|user| user.creds)
    }
}

async fn run(server: &MockServer, args: Arguments) -> anyhow::Result<String> {
    refresh_account(args, Arc::new(LocalTransport::new(server))).await
}

#[tokio::test]
async fn it_creates_account_of_new_user_from_auth_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=one-time"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "minted",
            "refresh_token": "first-refresh",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let setup = Setup::new();
    let args = Arguments {
        cloud_folder_name: Some("Backups".to_owned()),
        ..setup.args(9, &[("X-Auth-Code", "one-time")])
    };

    let token = run(&server, args).await.unwrap();

    assert_eq!(token, "minted");
    let saved = setup.file_state().read_user(9).await.unwrap();
    assert_eq!(
        saved.creds,
        r#"{"accessToken":"minted","refreshToken":"first-refresh"}"#
    );
    assert_eq!(saved.cloud_folder_name.as_deref(), Some("Backups"));
}

#[tokio::test]
async fn it_saves_nothing_when_headers_carry_no_account_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let setup = Setup::new();

    let result = run(&server, setup.args(9, &[("X-Other", "x")])).await;

    assert!(result.is_err());
    assert_eq!(setup.creds(9).await, None);
}

#[tokio::test]
async fn it_merges_headers_into_stored_account_ignoring_header_case() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("code=again"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "exchanged",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let setup = Setup::new();
    setup
        .store(
            3,
            AccountScheme::OAuth2,
            r#"{"accessToken":"old","refreshToken":"kept-refresh"}"#,
        )
        .await;

    let token = run(&server, setup.args(3, &[("x-auth-code", "again")]))
        .await
        .unwrap();

    assert_eq!(token, "exchanged");
    assert_eq!(
        setup.creds(3).await.as_deref(),
        Some(r#"{"accessToken":"exchanged","refreshToken":"kept-refresh"}"#)
    );
    assert_eq!(
        setup
            .file_state()
            .read_user(3)
            .await
            .unwrap()
            .cloud_folder_name
            .as_deref(),
        Some("Backups")
    );
}

#[tokio::test]
async fn it_returns_stored_token_without_calling_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let setup = Setup::new();
    setup
        .store(4, AccountScheme::OAuth2, r#"{"accessToken":"live"}"#)
        .await;

    let token = run(&server, setup.args(4, &[])).await.unwrap();

    assert_eq!(token, "live");
}

#[tokio::test]
async fn it_refreshes_stored_account_when_forced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=stored-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "refreshed",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let setup = Setup::new();
    setup
        .store(
            5,
            AccountScheme::OAuth2,
            r#"{"accessToken":"stale","refreshToken":"stored-refresh"}"#,
        )
        .await;
    let args = Arguments {
        force: true,
        ..setup.args(5, &[])
    };

    let token = run(&server, args).await.unwrap();

    assert_eq!(token, "refreshed");
    assert_eq!(
        setup.creds(5).await.as_deref(),
        Some(r#"{"accessToken":"refreshed","refreshToken":"stored-refresh"}"#)
    );
}

#[tokio::test]
async fn it_keeps_stored_account_when_provider_rejects_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let setup = Setup::new();
    let creds = r#"{"accessToken":"stale","refreshToken":"revoked"}"#;
    setup.store(6, AccountScheme::OAuth2, creds).await;
    let args = Arguments {
        force: true,
        ..setup.args(6, &[])
    };

    assert!(run(&server, args).await.is_err());
    assert_eq!(setup.creds(6).await.as_deref(), Some(creds));
}

#[tokio::test]
async fn it_refuses_user_of_another_scheme() {
    let server = MockServer::start().await;
    let setup = Setup::new();
    setup
        .store(7, AccountScheme::Google, r#"{"accessToken":"google"}"#)
        .await;

    let error = run(&server, setup.args(7, &[])).await.unwrap_err();

    assert!(error.to_string().contains("has a Google account"), "{}", error);
}

#[tokio::test]
async fn it_refuses_unknown_user_without_headers() {
    let server = MockServer::start().await;
    let setup = Setup::new();

    let error = run(&server, setup.args(8, &[])).await.unwrap_err();

    assert!(error.to_string().contains("is unknown"), "{}", error);
    assert_eq!(setup.creds(8).await, None);
}
