//! Emulator HTTP server.

use crate::server::router::route_request;
use crate::server::AppState;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// HTTP/1.1 server answering emulator and `/v1/*` requests
pub struct EmulatorServer {
    listener: TcpListener,
    state: Arc<AppState>,
}

impl EmulatorServer {
    /// Bind the listening socket. Port 0 picks an ephemeral port.
    pub async fn bind(addr: SocketAddr, state: AppState) -> Result<Self, anyhow::Error> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            state: Arc::new(state),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, anyhow::Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the process exits
    pub async fn run(self) -> Result<(), anyhow::Error> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves. Connections already accepted keep
    /// running on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), anyhow::Error>
    where
        F: Future<Output = ()>,
    {
        info!(
            "Mimic emulator listening on http://{} (debug={})",
            self.local_addr()?,
            self.state.debug
        );
        tokio::pin!(shutdown);

        loop {
            let (stream, peer) = tokio::select! {
                accepted = self.listener.accept() => accepted?,
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    return Ok(());
                }
            };
            let io = TokioIo::new(stream);
            let state = Arc::clone(&self.state);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let state = Arc::clone(&state);
                    async move { route_request(req, state).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Connection error from {}: {}", peer, e);
                }
            });
        }
    }
}
