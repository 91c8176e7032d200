//! TCP server for the bridge protocol
//!
//! Each connection is a sequence of request frames, answered in order with one
//! response frame each. Service calls block on filesystem I/O, so they run on
//! tokio's blocking pool.

use super::dispatch::dispatch;
use super::messages::{Request, Response};
use super::transport::{
    framed, recv_message, send_message, FrameLimits, Transport, DEFAULT_MAX_REQUEST_FRAME_LENGTH,
};
use crate::error::RpcError;
use crate::service::BridgeService;
use crate::stats::StatsSnapshot;
use crate::traits::FileSystem;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// How connections are scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ServerMode {
    /// Serve one connection at a time; others wait in the accept backlog
    #[default]
    Simple,
    /// Serve every connection on its own task
    Threaded,
}

impl std::fmt::Display for ServerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => f.write_str("simple"),
            Self::Threaded => f.write_str("threaded"),
        }
    }
}

/// Bridge server bound to a TCP listener
pub struct Server<F: FileSystem> {
    service: Arc<BridgeService<F>>,
    listener: TcpListener,
    mode: ServerMode,
    limits: FrameLimits,
}

impl<F: FileSystem> Server<F> {
    /// Bind a listener for `service`
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn bind<A: ToSocketAddrs>(
        addr: A,
        service: BridgeService<F>,
        mode: ServerMode,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            service: Arc::new(service),
            listener,
            mode,
            limits: FrameLimits::server(DEFAULT_MAX_REQUEST_FRAME_LENGTH),
        })
    }

    /// Refuse request frames larger than `bytes`
    ///
    /// A connection announcing a larger frame is dropped before any of it is
    /// buffered.
    #[must_use]
    pub fn with_max_request_frame(mut self, bytes: usize) -> Self {
        self.limits = FrameLimits::server(bytes);
        self
    }

    /// Address the listener is bound to
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be queried.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The service answering requests
    #[must_use]
    pub const fn service(&self) -> &Arc<BridgeService<F>> {
        &self.service
    }

    /// Accept and serve connections until `shutdown` completes
    ///
    /// Open connections are dropped once `shutdown` fires, then every handle
    /// still live in the service is released. Returns the final counters.
    pub async fn run_until<S>(self, shutdown: S) -> StatsSnapshot
    where
        S: Future<Output = ()>,
    {
        let Self {
            service,
            listener,
            mode,
            limits,
        } = self;
        tokio::pin!(shutdown);
        let mut connections = JoinSet::new();

        info!(
            "Serving {} ({} backend) in {} mode",
            service.filesystem().endpoint().uri(),
            service.filesystem().name(),
            mode
        );

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };
                    debug!("Accepted connection from {}", peer);

                    match mode {
                        ServerMode::Simple => {
                            tokio::select! {
                                () = &mut shutdown => {
                                    info!("Shutdown requested while serving {}", peer);
                                    break;
                                }
                                result = serve_connection(
                                    Arc::clone(&service),
                                    stream,
                                    peer,
                                    limits,
                                ) => {
                                    log_connection_end(peer, &result);
                                }
                            }
                        }
                        ServerMode::Threaded => {
                            let service = Arc::clone(&service);
                            connections.spawn(async move {
                                let result = serve_connection(service, stream, peer, limits).await;
                                log_connection_end(peer, &result);
                            });
                        }
                    }
                }
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished {
                        warn!("Connection task failed: {}", e);
                    }
                }
            }
        }

        connections.abort_all();
        while connections.join_next().await.is_some() {}

        service.release_all_handles();
        let stats = service.stats().snapshot();
        info!(
            "Server stopped: {} opened, {} created, {} released, {} bytes read, {} bytes written, {} errors",
            stats.streams_opened,
            stats.streams_created,
            stats.handles_released,
            stats.bytes_read,
            stats.bytes_written,
            stats.errors
        );
        stats
    }
}

fn log_connection_end(peer: SocketAddr, result: &Result<u64, RpcError>) {
    match result {
        Ok(served) => debug!("Connection from {} closed after {} requests", peer, served),
        Err(e) => warn!("Connection from {} failed: {}", peer, e),
    }
}

/// Answer requests on one connection until the peer hangs up
///
/// Returns the number of requests served.
///
/// # Errors
///
/// Returns an error if the transport fails or a frame cannot be decoded; the
/// connection is abandoned at that point.
pub async fn serve_connection<F, T>(
    service: Arc<BridgeService<F>>,
    transport: T,
    peer: SocketAddr,
    limits: FrameLimits,
) -> Result<u64, RpcError>
where
    F: FileSystem,
    T: Transport,
{
    let mut transport = framed(transport, limits);
    let mut served = 0;

    while let Some(request) = recv_message::<_, Request>(&mut transport).await? {
        let operation = request.operation();
        let worker = Arc::clone(&service);
        let response: Response = tokio::task::spawn_blocking(move || dispatch(&worker, request))
            .await
            .map_err(|e| io::Error::other(format!("{operation} task failed: {e}")))?;

        if let Err(e) = &response {
            warn!("{} from {} failed: {}", operation, peer, e);
        }
        send_message(&mut transport, &response).await?;
        served += 1;
    }
    Ok(served)
}
