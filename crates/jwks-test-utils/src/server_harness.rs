//! Test server harness for E2E testing
//!
//! Provides TestJwksServer for spawning real JWKS server instances in tests.

use jwks_service::config::Config;
use jwks_service::models::{AuthResponse, Jwks};
use jwks_service::observability::init_metrics_recorder;
use jwks_service::repositories::{InMemoryKeyStore, KeyStore};
use jwks_service::routes::{self, AppState};
use jwks_service::tasks::{start_expiry_reaper, ExpiryReaperConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Test harness for spawning the JWKS server in E2E tests
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_jwks_flow_e2e() -> Result<()> {
///     let server = TestJwksServer::spawn().await?;
///     let client = reqwest::Client::new();
///
///     let response = client
///         .get(format!("{}/.well-known/jwks.json", server.url()))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestJwksServer {
    addr: SocketAddr,
    store: Arc<dyn KeyStore>,
    config: Config,
    client: reqwest::Client,
    cancel_token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl TestJwksServer {
    /// Spawn a server over a fresh in-memory store with default configuration.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_store(Arc::new(InMemoryKeyStore::new()), Config::default()).await
    }

    /// Spawn a server over `store`. No reaper runs; expired keys stay put.
    pub async fn spawn_with_store(
        store: Arc<dyn KeyStore>,
        config: Config,
    ) -> Result<Self, anyhow::Error> {
        Self::start(store, config, false).await
    }

    /// Spawn a server over `store` with the expiry reaper running at
    /// `config.reaper_interval_seconds`.
    pub async fn spawn_with_reaper(
        store: Arc<dyn KeyStore>,
        config: Config,
    ) -> Result<Self, anyhow::Error> {
        Self::start(store, config, true).await
    }

    async fn start(
        store: Arc<dyn KeyStore>,
        mut config: Config,
        with_reaper: bool,
    ) -> Result<Self, anyhow::Error> {
        config.bind_address = "127.0.0.1:0".to_string();

        // The global recorder can only be installed once per process; later
        // servers get a standalone recorder.
        let metrics_handle = match init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => PrometheusBuilder::new().build_recorder().handle(),
        };

        let state = Arc::new(AppState::new(store.clone(), config.clone()));
        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind(&config.bind_address)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let cancel_token = CancellationToken::new();
        let mut handles = Vec::new();

        if with_reaper {
            handles.push(tokio::spawn(start_expiry_reaper(
                store.clone(),
                ExpiryReaperConfig::from(&config),
                cancel_token.clone(),
            )));
        }

        let shutdown = cancel_token.clone();
        handles.push(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
            {
                eprintln!("Test server error: {}", e);
            }
        }));

        Ok(Self {
            addr,
            store,
            config,
            client: reqwest::Client::new(),
            cancel_token,
            handles,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the key store the server is running over
    pub fn store(&self) -> &Arc<dyn KeyStore> {
        &self.store
    }

    /// Get reference to the server configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `POST /auth`, with `?expired=true` when `expired` is set.
    pub async fn issue_token(&self, expired: bool) -> Result<String, anyhow::Error> {
        let mut url = format!("{}/auth", self.url());
        if expired {
            url.push_str("?expired=true");
        }

        let response = self.client.post(url).send().await?;
        anyhow::ensure!(
            response.status().is_success(),
            "POST /auth returned {}",
            response.status()
        );

        Ok(response.json::<AuthResponse>().await?.token)
    }

    /// `GET /.well-known/jwks.json`
    pub async fn fetch_jwks(&self) -> Result<Jwks, anyhow::Error> {
        let response = self
            .client
            .get(format!("{}/.well-known/jwks.json", self.url()))
            .send()
            .await?;
        anyhow::ensure!(
            response.status().is_success(),
            "GET /.well-known/jwks.json returned {}",
            response.status()
        );

        Ok(response.json::<Jwks>().await?)
    }

    /// Stop the server and any background task, waiting for them to exit.
    pub async fn shutdown(mut self) -> Result<(), anyhow::Error> {
        self.cancel_token.cancel();
        for handle in self.handles.drain(..) {
            handle.await?;
        }
        Ok(())
    }
}

impl Drop for TestJwksServer {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        for handle in &self.handles {
            handle.abort();
        }
    }
}
