//! Dependency wiring and the HTTP server.

use std::sync::Arc;

use anyhow::Context;
use axum::{middleware, Extension, Router};
use customer_directory::CustomerDirectoryModule;
use identity_resolver::{identity_middleware, IdentityResolverModule};
use idm_credentials::{CachingCredentialProvider, CredentialProvider};
use ontology_client::{FoundryOntologyClient, OntologyClient};
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{AppConfig, CredentialsConfig};

/// Fetch a first token so misconfigured credentials show up at startup.
/// Failure is logged; the provider retries on first use.
async fn warm_up(provider: &dyn CredentialProvider) {
    match provider.bearer_token().await {
        Ok(_) => info!(provider = provider.name(), "credential ready"),
        Err(e) => warn!(provider = provider.name(), error = %e, "credential warm-up failed"),
    }
}

/// Handle to the directory platform's provider. Handlers reach it as an
/// `Extension<DirectoryCredentials>`.
#[derive(Clone)]
pub struct DirectoryCredentials(pub Arc<dyn CredentialProvider>);

/// Credential providers built once at startup and shared for the life of
/// the process.
#[derive(Clone)]
pub struct Credentials {
    pub service: Arc<dyn CredentialProvider>,
    pub directory: Option<DirectoryCredentials>,
}

impl Credentials {
    /// # Errors
    ///
    /// Returns an error when a credential setting is unusable.
    pub fn from_config(cfg: &CredentialsConfig) -> anyhow::Result<Self> {
        let service: Arc<dyn CredentialProvider> = Arc::new(
            CachingCredentialProvider::service(&cfg.service)
                .context("invalid service credentials")?,
        );
        let directory = cfg
            .directory
            .as_ref()
            .map(|directory| {
                CachingCredentialProvider::directory(directory)
                    .context("invalid directory credentials")
                    .map(|p| DirectoryCredentials(Arc::new(p)))
            })
            .transpose()?;
        Ok(Self { service, directory })
    }

    async fn warm_up(&self) {
        warm_up(self.service.as_ref()).await;
        if let Some(DirectoryCredentials(directory)) = &self.directory {
            warm_up(directory.as_ref()).await;
        }
    }

    /// Make the directory provider available to every route of `router`.
    #[must_use]
    pub fn attach(&self, router: Router) -> Router {
        match &self.directory {
            Some(directory) => router.layer(Extension(directory.clone())),
            None => router,
        }
    }
}

/// Build the application router from `cfg`.
///
/// # Errors
///
/// Returns an error when a credential, ontology or identity setting is
/// unusable.
pub async fn build_router(cfg: &AppConfig) -> anyhow::Result<Router> {
    let credentials = Credentials::from_config(&cfg.credentials)?;
    credentials.warm_up().await;

    let ontology: Arc<dyn OntologyClient> = Arc::new(
        FoundryOntologyClient::new(&cfg.ontology, Arc::clone(&credentials.service))
            .context("invalid ontology settings")?,
    );

    let identity = IdentityResolverModule::init(&cfg.identity, Arc::clone(&ontology))
        .context("invalid identity settings")?;
    let customers = CustomerDirectoryModule::init(cfg.customers.clone(), ontology);

    let router = credentials.attach(customers.register_rest(Router::new()));
    Ok(router
        .layer(middleware::from_fn_with_state(
            identity.middleware_state(),
            identity_middleware,
        ))
        .layer(TimeoutLayer::new(cfg.server.request_timeout()))
        .layer(TraceLayer::new_for_http()))
}

/// Serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error when wiring fails or the listener cannot be bound.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let router = build_router(&cfg).await?;

    let listener = TcpListener::bind(cfg.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.server.bind_addr))?;
    info!(addr = %cfg.server.bind_addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
