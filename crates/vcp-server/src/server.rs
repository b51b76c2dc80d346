use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use vcp_auth::{CredentialStore, SqliteCredentialStore};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::Dispatcher;

/// VCP repository server.
///
/// Accepts one command per connection and serves at most
/// `max_connections` connections at a time.
pub struct VcpServer {
    config: Arc<ServerConfig>,
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    permits: Arc<Semaphore>,
}

impl VcpServer {
    /// Open the credential database named by the config and bind.
    pub async fn open(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        tokio::fs::create_dir_all(&config.data_root).await?;
        let db_path = config.database_path();
        let store = tokio::task::spawn_blocking(move || SqliteCredentialStore::open(&db_path))
            .await
            .map_err(|e| ServerError::Internal(format!("database open task failed: {e}")))??;
        Self::bind(config, Arc::new(store)).await
    }

    /// Bind the listener with an explicit credential store.
    pub async fn bind(
        config: ServerConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> ServerResult<Self> {
        config.validate()?;
        tokio::fs::create_dir_all(config.users_root()).await?;
        let listener = TcpListener::bind(config.bind_addr).await?;
        let config = Arc::new(config);
        let permits = Arc::new(Semaphore::new(config.max_connections));
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&config), credentials));
        Ok(Self {
            config,
            listener,
            dispatcher,
            permits,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Address actually bound, useful when the configured port was 0.
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until Ctrl-C or SIGTERM.
    pub async fn serve(self) -> ServerResult<()> {
        self.serve_until(shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves, then wait for in-flight connections.
    pub async fn serve_until<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        let max = self.config.max_connections;
        info!(
            addr = %self.local_addr()?,
            root = %self.config.data_root.display(),
            max_connections = max,
            "VCP server listening"
        );
        tokio::pin!(shutdown);

        loop {
            let permit = tokio::select! {
                _ = &mut shutdown => break,
                permit = Arc::clone(&self.permits).acquire_owned() => permit
                    .map_err(|e| ServerError::Internal(e.to_string()))?,
            };
            let (mut stream, peer) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!(error = %e, "accept failed");
                        drop(permit);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        continue;
                    }
                },
            };

            let dispatcher = Arc::clone(&self.dispatcher);
            let permits = Arc::clone(&self.permits);
            debug!(%peer, active = max - permits.available_permits(), "connection accepted");
            tokio::spawn(async move {
                if let Err(e) = dispatcher.handle(&mut stream).await {
                    warn!(%peer, error = %e, "connection ended with error");
                }
                drop(permit);
                debug!(%peer, active = max - permits.available_permits(), "connection closed");
            });
        }

        drop(self.listener);
        info!("shutting down, waiting for active connections");
        let max = u32::try_from(max).unwrap_or(u32::MAX);
        let _all = self
            .permits
            .acquire_many(max)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        info!("server stopped");
        Ok(())
    }
}

/// Resolves on Ctrl-C, or on SIGTERM where available.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl-C"),
        _ = terminate => info!("received SIGTERM"),
    }
}
