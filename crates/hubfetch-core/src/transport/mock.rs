//! Recording transport for session and fetcher tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;

use super::{ClientIdentity, Transport, TransportRequest, TransportResponse};
use crate::error::{ConnectionKind, HubError, Result};

pub(crate) enum Reply {
    Response {
        status: StatusCode,
        headers: Vec<(&'static str, String)>,
        chunks: Vec<Bytes>,
    },
    Unreachable,
}

impl Reply {
    pub fn status(status: u16, body: &str) -> Self {
        Reply::Response {
            status: StatusCode::from_u16(status).unwrap(),
            headers: Vec::new(),
            chunks: vec![Bytes::copy_from_slice(body.as_bytes())],
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Reply::Response { ref mut headers, .. } = self {
            headers.push((name, value.to_string()));
        }
        self
    }

    pub fn chunked(status: u16, chunks: Vec<Bytes>) -> Self {
        Reply::Response {
            status: StatusCode::from_u16(status).unwrap(),
            headers: Vec::new(),
            chunks,
        }
    }
}

#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    requests: Arc<Mutex<Vec<TransportRequest>>>,
    identity: Arc<Mutex<Option<ClientIdentity>>>,
    chunks_pulled: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn identity(&self) -> Option<ClientIdentity> {
        self.identity.lock().unwrap().clone()
    }

    /// Body chunks handed to consumers so far, across all responses.
    pub fn chunks_pulled(&self) -> usize {
        self.chunks_pulled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("MockTransport: no reply queued");

        match reply {
            Reply::Unreachable => Err(HubError::Connection {
                kind: ConnectionKind::Refused,
                message: "connection refused".into(),
            }),
            Reply::Response {
                status,
                headers,
                chunks,
            } => {
                let mut map = HeaderMap::new();
                for (name, value) in headers {
                    map.append(
                        HeaderName::from_static(name),
                        HeaderValue::from_str(&value).unwrap(),
                    );
                }
                let counter = Arc::clone(&self.chunks_pulled);
                let body = stream::iter(chunks).map(move |chunk| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<Bytes, HubError>(chunk)
                });
                Ok(TransportResponse {
                    status,
                    headers: map,
                    body: Box::pin(body),
                })
            }
        }
    }

    fn set_client_identity(&mut self, identity: ClientIdentity) -> Result<()> {
        *self.identity.lock().unwrap() = Some(identity);
        Ok(())
    }
}
