use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Identity, Server, ServerTlsConfig};
use tonic::{Request, Response, Status};
use tracing::{debug, info};

use crate::error::{AppError, AppResult, ServerError, ValidationError};
use crate::shutdown::{ShutdownSender, request_shutdown, shutdown_channel, wait_for_shutdown};

use super::connection::now_nanos;
use super::destination::DEFAULT_GRPC_PORT;
use super::proto::PingMessage;
use super::proto::pinger_server::{Pinger, PingerServer};

#[derive(Debug, Clone)]
pub struct PingServerOptions {
    /// `0` picks an ephemeral port.
    pub port: u16,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
    /// Reported as SERVING next to the whole-server entry.
    pub health_service: String,
    /// HTTP/2 concurrent stream ceiling, `0` for the transport default.
    pub max_concurrent_streams: u32,
}

impl Default for PingServerOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_GRPC_PORT,
            cert: None,
            key: None,
            health_service: String::new(),
            max_concurrent_streams: 0,
        }
    }
}

/// Echo service that pauses for the requested delay before answering.
#[derive(Debug, Default)]
struct PingService;

#[async_trait]
impl Pinger for PingService {
    async fn ping(&self, request: Request<PingMessage>) -> Result<Response<PingMessage>, Status> {
        let mut message = request.into_inner();
        if let Ok(delay_nanos) = u64::try_from(message.delay_nanos)
            && delay_nanos > 0
        {
            tokio::time::sleep(Duration::from_nanos(delay_nanos)).await;
        }
        message.ts = now_nanos();
        Ok(Response::new(message))
    }
}

/// gRPC health plus ping server used as a load target.
pub struct PingServer;

impl PingServer {
    /// Binds and starts serving in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if only one of cert/key is set, the identity cannot
    /// be read, TLS settings are rejected, or the port cannot be bound.
    pub async fn start(options: PingServerOptions) -> AppResult<PingServerHandle> {
        let identity = match (options.cert.as_deref(), options.key.as_deref()) {
            (Some(cert), Some(key)) => Some(read_identity(cert, key).await?),
            (None, None) => None,
            (Some(_), None) | (None, Some(_)) => {
                return Err(AppError::validation(ValidationError::IncompleteServerIdentity));
            }
        };
        let tls = identity.is_some();

        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, options.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| AppError::server(ServerError::Bind { addr, source }))?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| AppError::server(ServerError::Bind { addr, source }))?;

        let (mut reporter, health_service) = tonic_health::server::health_reporter();
        if !options.health_service.is_empty() {
            reporter
                .set_service_status(&options.health_service, tonic_health::ServingStatus::Serving)
                .await;
        }

        let mut builder = Server::builder();
        if options.max_concurrent_streams > 0 {
            builder = builder.max_concurrent_streams(options.max_concurrent_streams);
        }
        if let Some(identity) = identity {
            builder = builder
                .tls_config(ServerTlsConfig::new().identity(identity))
                .map_err(|source| AppError::server(ServerError::Tls { source }))?;
        }
        let router = builder
            .add_service(health_service)
            .add_service(PingerServer::new(PingService));

        let (shutdown_tx, mut shutdown_rx) = shutdown_channel();
        let task = tokio::spawn(async move {
            router
                .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                    wait_for_shutdown(&mut shutdown_rx).await;
                })
                .await
        });

        info!(
            addr = %local_addr,
            tls,
            service = %options.health_service,
            max_concurrent_streams = options.max_concurrent_streams,
            "Ping server listening"
        );
        Ok(PingServerHandle {
            local_addr,
            shutdown_tx,
            task,
        })
    }
}

/// Running server; dropping it leaves the server running until the runtime
/// stops.
#[derive(Debug)]
pub struct PingServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: ShutdownSender,
    task: JoinHandle<Result<(), tonic::transport::Error>>,
}

impl PingServerHandle {
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Stops accepting calls and waits for in-flight ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the server task failed.
    pub async fn shutdown(self) -> AppResult<()> {
        request_shutdown(&self.shutdown_tx);
        self.task
            .await?
            .map_err(|source| AppError::server(ServerError::Serve { source }))?;
        debug!(addr = %self.local_addr, "Ping server stopped");
        Ok(())
    }
}

async fn read_identity(cert: &Path, key: &Path) -> AppResult<Identity> {
    let cert_pem = read_pem(cert).await?;
    let key_pem = read_pem(key).await?;
    Ok(Identity::from_pem(cert_pem, key_pem))
}

async fn read_pem(path: &Path) -> AppResult<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|source| {
        AppError::server(ServerError::ReadIdentity {
            path: path.to_path_buf(),
            source,
        })
    })
}
