//! Transport connection: one HTTP(S) request/response exchange at a time.
//!
//! This module provides:
//! - `Transport`: the request seam the session is built on
//! - `HttpTransport`: the reqwest implementation with custom CA and client
//!   certificate support
//! - `ByteStream` and `copy_stream`: pull-based response bodies
//!
//! Responses come back as soon as headers arrive. The body is never read
//! ahead of the consumer, and dropping it closes the connection.

pub mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use http::{HttpTransport, TransportOptions};

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use url::Url;

use crate::error::{HubError, Result};

/// A response body delivered chunk by chunk.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// PEM-encoded client certificate and private key for mutual TLS.
#[derive(Clone)]
pub struct ClientIdentity {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("cert_pem", &format_args!("<{} bytes>", self.cert_pem.len()))
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl TransportRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn post(url: Url, body: Bytes) -> Self {
        Self {
            method: Method::POST,
            url,
            headers: HeaderMap::new(),
            body: Some(body),
        }
    }
}

pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

impl TransportResponse {
    /// Collect the whole body. Only for small payloads (listings, errors).
    pub async fn bytes(self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        let mut body = self.body;
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// The request seam under `HubSession`.
///
/// Non-2xx responses are `Ok`; only failures to get a response at all are
/// `Err(HubError::Connection)`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse>;

    /// Present this identity in every later TLS handshake.
    fn set_client_identity(&mut self, identity: ClientIdentity) -> Result<()>;
}

/// Drain `stream` into `writer` one chunk at a time. Returns bytes written.
pub async fn copy_stream<W>(mut stream: ByteStream, writer: &mut W) -> Result<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| HubError::Stream(format!("write failed: {}", e)))?;
        written += chunk.len() as u64;
    }
    writer
        .flush()
        .await
        .map_err(|e| HubError::Stream(format!("flush failed: {}", e)))?;
    Ok(written)
}
