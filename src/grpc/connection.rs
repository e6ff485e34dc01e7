use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tonic_health::pb::HealthCheckRequest;
use tonic_health::pb::health_client::HealthClient;

use crate::error::{CallError, ConnectionError};
use crate::metrics::RetCode;

use super::destination::Destination;
use super::outcome::SERVING;
use super::proto::PingMessage;
use super::proto::pinger_client::PingerClient;

/// Counting semaphore capping the in-flight calls of one connection.
#[derive(Debug, Clone)]
pub struct StreamPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl StreamPool {
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Waits for a free stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool was closed.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, CallError> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_closed| CallError::StreamPoolClosed)
    }

    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }
}

/// What one call does.
#[derive(Debug, Clone)]
pub enum CallKind {
    Health { service: String },
    Ping { delay: Duration, payload: String },
}

/// One HTTP/2 channel and the streams multiplexed over it.
#[derive(Debug, Clone)]
pub struct Connection {
    index: usize,
    channel: Channel,
    pool: StreamPool,
}

impl Connection {
    /// Prepares a lazily dialled channel to `destination`; the TCP and TLS
    /// handshakes happen on the first call.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URI or TLS settings are invalid.
    pub fn open(
        index: usize,
        destination: &Destination,
        tls: Option<ClientTlsConfig>,
        connect_timeout: Duration,
        streams: usize,
    ) -> Result<Self, ConnectionError> {
        let uri = destination.uri(tls.is_some());
        let mut endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|source| ConnectionError::InvalidEndpoint {
                uri: uri.clone(),
                source,
            })?
            .connect_timeout(connect_timeout)
            .tcp_nodelay(true);
        if let Some(tls) = tls {
            endpoint = endpoint
                .tls_config(tls)
                .map_err(|source| ConnectionError::TlsConfig { uri, source })?;
        }
        Ok(Self {
            index,
            channel: endpoint.connect_lazy(),
            pool: StreamPool::new(streams),
        })
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn pool(&self) -> &StreamPool {
        &self.pool
    }

    /// Performs one call on a free stream of this connection.
    ///
    /// # Errors
    ///
    /// Returns an error for any failed RPC or transport failure.
    pub async fn call(&self, kind: &CallKind, seq: i64) -> Result<RetCode, CallError> {
        let _stream = self.pool.acquire().await?;
        match kind {
            CallKind::Health { service } => {
                let response = HealthClient::new(self.channel.clone())
                    .check(HealthCheckRequest {
                        service: service.clone(),
                    })
                    .await?;
                Ok(response.into_inner().status)
            }
            CallKind::Ping { delay, payload } => {
                let message = PingMessage {
                    seq,
                    ts: now_nanos(),
                    payload: payload.clone(),
                    delay_nanos: i64::try_from(delay.as_nanos()).unwrap_or(i64::MAX),
                };
                PingerClient::new(self.channel.clone()).ping(message).await?;
                Ok(SERVING)
            }
        }
    }
}

pub(super) fn now_nanos() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
}
