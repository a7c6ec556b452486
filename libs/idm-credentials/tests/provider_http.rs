#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Providers built from configuration, talking to a mock token endpoint.

use httpmock::prelude::*;
use idm_credentials::{
    AuthExchangeError, CachingCredentialProvider, CredentialProvider, DirectoryCredentialsConfig,
    ServiceCredentialsConfig,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

fn service_config(server: &MockServer) -> ServiceCredentialsConfig {
    ServiceCredentialsConfig {
        hostname: server.base_url(),
        client_id: "svc-client".to_owned(),
        client_secret: SecretString::from("svc-secret".to_owned()),
        ..ServiceCredentialsConfig::default()
    }
}

#[tokio::test]
async fn service_provider_exchanges_once_and_reuses_token() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/multipass/api/oauth2/token")
                .body_includes("scope=api%3Aread-data");
            then.status(200).json_body(json!({
                "access_token": "ontology-token",
                "token_type": "bearer",
                "expires_in": 3600
            }));
        })
        .await;

    let provider = CachingCredentialProvider::service(&service_config(&server)).unwrap();

    for _ in 0..3 {
        let token = provider.bearer_token().await.unwrap();
        assert_eq!(token.expose_secret(), "ontology-token");
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn service_provider_propagates_rejection() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/multipass/api/oauth2/token");
            then.status(400)
                .json_body(json!({"error": "invalid_scope"}));
        })
        .await;

    let provider = CachingCredentialProvider::service(&service_config(&server)).unwrap();
    let err = provider.bearer_token().await.unwrap_err();

    assert!(matches!(
        err,
        AuthExchangeError::Rejected { status: 400, ref reason, .. } if reason == "invalid_scope"
    ));
}

#[tokio::test]
async fn directory_provider_posts_to_tenant_endpoint() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/contoso/oauth2/v2.0/token")
                .body_includes("client_id=dir-client")
                .body_includes("scope=https%3A%2F%2Fgraph.microsoft.com%2F.default")
                .body_includes("redirect_uri=");
            then.status(200).json_body(json!({
                "access_token": "graph-token",
                "token_type": "Bearer",
                "expires_in": 3599,
                "ext_expires_in": 3599
            }));
        })
        .await;

    let cfg = DirectoryCredentialsConfig {
        authority: server.base_url(),
        tenant_id: "contoso".to_owned(),
        client_id: "dir-client".to_owned(),
        client_secret: SecretString::from("dir-secret".to_owned()),
        redirect_uri: Some("https://portal.example.com/auth".to_owned()),
        ..DirectoryCredentialsConfig::default()
    };
    let provider = CachingCredentialProvider::directory(&cfg).unwrap();

    let token = provider.bearer_token().await.unwrap();

    assert_eq!(token.expose_secret(), "graph-token");
    assert_eq!(provider.name(), "directory");
    mock.assert_async().await;
}
