//! reqwest-backed transport.

use std::error::Error as StdError;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{redirect, Certificate, Client, Identity};
use tracing::debug;

use super::{ClientIdentity, Transport, TransportRequest, TransportResponse};
use crate::error::{ConnectionKind, HubError, Result};

/// Time allowed to establish TCP + TLS.
/// No whole-request timeout is set: bodies may be gigabytes.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Idle keep-alive probe interval for long transfers.
const TCP_KEEPALIVE_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// PEM file of the CA that signed the hub certificate. When set, only
    /// this CA is trusted.
    pub ca_file: Option<PathBuf>,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            ca_file: None,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            user_agent: format!("hubfetch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP(S) transport. Clone is cheap - reqwest::Client is reference counted.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    options: TransportOptions,
    ca: Option<Certificate>,
}

impl HttpTransport {
    pub fn new(options: TransportOptions) -> Result<Self> {
        let ca = match options.ca_file {
            Some(ref path) => {
                let pem = std::fs::read(path).map_err(|source| HubError::CredentialResolution {
                    path: path.clone(),
                    source,
                })?;
                let cert = Certificate::from_pem(&pem).map_err(|e| {
                    HubError::InvalidCertificate(format!("{}: {}", path.display(), e))
                })?;
                Some(cert)
            }
            None => None,
        };
        let client = Self::build_client(&options, ca.as_ref(), None)?;
        Ok(Self {
            client,
            options,
            ca,
        })
    }

    fn build_client(
        options: &TransportOptions,
        ca: Option<&Certificate>,
        identity: Option<Identity>,
    ) -> Result<Client> {
        let mut builder = Client::builder()
            .use_rustls_tls()
            .user_agent(options.user_agent.clone())
            .connect_timeout(options.connect_timeout)
            .tcp_keepalive(Duration::from_secs(TCP_KEEPALIVE_SECS))
            .redirect(redirect::Policy::none());

        if let Some(ca) = ca {
            builder = builder
                .tls_built_in_root_certs(false)
                .add_root_certificate(ca.clone());
        }
        if let Some(identity) = identity {
            builder = builder.identity(identity);
        }

        builder
            .build()
            .map_err(|e| HubError::InvalidCertificate(error_chain(&e)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse> {
        debug!(method = %request.method, url = %request.url, "Sending request");

        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(connection_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        debug!(status = %status, "Response headers received");

        let body = response
            .bytes_stream()
            .map_err(|e| HubError::Stream(error_chain(&e)));

        Ok(TransportResponse {
            status,
            headers,
            body: Box::pin(body),
        })
    }

    fn set_client_identity(&mut self, identity: ClientIdentity) -> Result<()> {
        let mut pem = identity.cert_pem;
        if !pem.ends_with(b"\n") {
            pem.push(b'\n');
        }
        pem.extend_from_slice(&identity.key_pem);
        let identity =
            Identity::from_pem(&pem).map_err(|e| HubError::InvalidCertificate(error_chain(&e)))?;
        self.client = Self::build_client(&self.options, self.ca.as_ref(), Some(identity))?;
        Ok(())
    }
}

/// Render an error and all of its sources on one line.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

fn connection_error(err: reqwest::Error) -> HubError {
    let message = error_chain(&err);
    HubError::Connection {
        kind: classify(&err, &message),
        message,
    }
}

/// Sort a send failure into DNS / TLS / refused / timeout.
fn classify(err: &reqwest::Error, chain: &str) -> ConnectionKind {
    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::ConnectionRefused => return ConnectionKind::Refused,
                std::io::ErrorKind::TimedOut => return ConnectionKind::Timeout,
                // rustls reports every handshake failure (bad certificate,
                // non-TLS peer) as InvalidData on the connecting stream.
                std::io::ErrorKind::InvalidData if err.is_connect() => {
                    return ConnectionKind::Tls
                }
                _ => {}
            }
        }
        source = cause.source();
    }

    let chain = chain.to_ascii_lowercase();
    if err.is_timeout() {
        ConnectionKind::Timeout
    } else if chain.contains("dns error") || chain.contains("failed to lookup address") {
        ConnectionKind::Dns
    } else if chain.contains("certificate")
        || chain.contains("tls")
        || chain.contains("handshake")
        || chain.contains("invalid peer")
        || chain.contains("corrupt message")
    {
        ConnectionKind::Tls
    } else if chain.contains("refused") {
        ConnectionKind::Refused
    } else {
        ConnectionKind::Other
    }
}
