use std::path::PathBuf;

use thiserror::Error;

use super::CallError;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to read certificate '{path}': {source}")]
    ReadCertificate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid endpoint '{uri}': {source}")]
    InvalidEndpoint {
        uri: String,
        #[source]
        source: tonic::transport::Error,
    },
    #[error("Invalid TLS settings for '{uri}': {source}")]
    TlsConfig {
        uri: String,
        #[source]
        source: tonic::transport::Error,
    },
    #[error("Initial call to {destination} (connection {connection}) failed: {source}")]
    ProbeFailed {
        destination: String,
        connection: usize,
        #[source]
        source: CallError,
    },
}
