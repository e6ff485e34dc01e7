use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read server identity '{path}': {source}")]
    ReadIdentity {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid server TLS settings: {source}")]
    Tls {
        #[source]
        source: tonic::transport::Error,
    },
    #[error("Server stopped with an error: {source}")]
    Serve {
        #[source]
        source: tonic::transport::Error,
    },
}
