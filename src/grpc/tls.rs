use std::path::{Path, PathBuf};

use tonic::transport::{Certificate, ClientTlsConfig};

use crate::error::ConnectionError;

/// How the client secures its connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSecurity {
    Plaintext,
    /// Verify the server chain against this CA bundle.
    CaVerified { ca_cert: PathBuf },
    /// Trust exactly this server certificate.
    DirectTrust { cert: PathBuf },
    /// `https://` destination without explicit certificates.
    WebPki,
}

impl TransportSecurity {
    /// Picks the mode for a run. A CA bundle wins over a direct certificate.
    #[must_use]
    pub fn resolve(ca_cert: Option<&Path>, cert: Option<&Path>, scheme_tls: bool) -> Self {
        match (ca_cert, cert) {
            (Some(ca_cert), _) => TransportSecurity::CaVerified {
                ca_cert: ca_cert.to_path_buf(),
            },
            (None, Some(cert)) => TransportSecurity::DirectTrust {
                cert: cert.to_path_buf(),
            },
            (None, None) if scheme_tls => TransportSecurity::WebPki,
            (None, None) => TransportSecurity::Plaintext,
        }
    }

    #[must_use]
    pub const fn is_tls(&self) -> bool {
        !matches!(self, TransportSecurity::Plaintext)
    }

    /// Builds the client TLS settings, `None` for plaintext.
    ///
    /// `server_name` is the name the server certificate must carry.
    ///
    /// # Errors
    ///
    /// Returns an error when a certificate file cannot be read.
    pub async fn client_config(
        &self,
        server_name: &str,
    ) -> Result<Option<ClientTlsConfig>, ConnectionError> {
        let config = match self {
            TransportSecurity::Plaintext => return Ok(None),
            TransportSecurity::CaVerified { ca_cert: path }
            | TransportSecurity::DirectTrust { cert: path } => {
                ClientTlsConfig::new().ca_certificate(read_certificate(path).await?)
            }
            TransportSecurity::WebPki => ClientTlsConfig::new().with_webpki_roots(),
        };
        Ok(Some(config.domain_name(server_name)))
    }
}

async fn read_certificate(path: &Path) -> Result<Certificate, ConnectionError> {
    let pem = tokio::fs::read(path)
        .await
        .map_err(|source| ConnectionError::ReadCertificate {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Certificate::from_pem(pem))
}
