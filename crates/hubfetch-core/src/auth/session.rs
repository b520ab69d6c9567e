use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::credentials::{ConnectionOptions, CredentialSpec, PasswordProvider, ResolvedCredential};
use crate::address::HubAddress;
use crate::error::{HubError, Result};
use crate::transport::{
    ByteStream, HttpTransport, Transport, TransportOptions, TransportRequest, TransportResponse,
};

/// Sign-in endpoint, relative to the hub root
const SIGN_IN_PATH: &str = "sign_in.html";

/// Reason recorded when a sign-in future is dropped before it finishes
const INTERRUPTED: &str = "sign-in interrupted";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Failed(String),
}

/// Result of a sign-in the hub answered.
///
/// A rejection is a normal outcome. Failures to resolve the credential or
/// to reach the hub are `Err` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    Authenticated,
    Rejected { reason: String },
}

impl SignInOutcome {
    /// Turn a rejection into `HubError::AuthRejected`.
    pub fn into_result(self) -> Result<()> {
        match self {
            SignInOutcome::Authenticated => Ok(()),
            SignInOutcome::Rejected { reason } => Err(HubError::AuthRejected(reason)),
        }
    }
}

/// Cookies the hub issued at sign-in, replayed verbatim.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Build a `Cookie` header value from `Set-Cookie` response headers.
    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let pairs: Vec<&str> = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|cookie| cookie.split(';').next())
            .map(str::trim)
            .filter(|pair| pair.contains('='))
            .collect();
        if pairs.is_empty() {
            None
        } else {
            Some(SessionToken(pairs.join("; ")))
        }
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

enum Attempt {
    Accepted(Option<SessionToken>),
    Rejected(String),
}

/// Marks the session failed if a sign-in is dropped mid-flight.
struct AttemptGuard<'a> {
    state: &'a mut AuthState,
    finished: bool,
}

impl<'a> AttemptGuard<'a> {
    fn start(state: &'a mut AuthState) -> Self {
        *state = AuthState::Authenticating;
        Self {
            state,
            finished: false,
        }
    }

    fn finish(mut self, state: AuthState) {
        *self.state = state;
        self.finished = true;
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *self.state = AuthState::Failed(INTERRUPTED.to_string());
        }
    }
}

/// An authenticated context on one hub.
///
/// `sign_in` and `sign_out` take `&mut self`; every fetch takes `&self`. A
/// fetch can therefore never overlap a sign-in, and concurrent fetches
/// cannot change the auth state.
pub struct HubSession<T = HttpTransport> {
    address: HubAddress,
    base_url: Url,
    transport: T,
    credential: Option<CredentialSpec>,
    state: AuthState,
    token: Option<SessionToken>,
    signed_in_at: Option<DateTime<Utc>>,
}

impl HubSession<HttpTransport> {
    /// Open a session over HTTPS (or HTTP if the address says so).
    /// Nothing is sent and no credential is resolved until `sign_in`.
    pub fn connect(address: HubAddress, options: &ConnectionOptions) -> Result<Self> {
        let credential = options.credential_spec()?;
        let transport = HttpTransport::new(TransportOptions {
            ca_file: options.ca_file.clone(),
            ..Default::default()
        })?;
        Self::with_transport(address, transport, credential)
    }
}

impl<T: Transport> HubSession<T> {
    pub fn with_transport(
        address: HubAddress,
        transport: T,
        credential: Option<CredentialSpec>,
    ) -> Result<Self> {
        let base_url = address.base_url()?;
        Ok(Self {
            address,
            base_url,
            transport,
            credential,
            state: AuthState::Unauthenticated,
            token: None,
            signed_in_at: None,
        })
    }

    pub fn address(&self) -> &HubAddress {
        &self.address
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    pub fn signed_in_at(&self) -> Option<DateTime<Utc>> {
        self.signed_in_at
    }

    /// Sign in with the configured credential.
    ///
    /// Already signed in: returns `Authenticated` without a request.
    /// Hub declines the credential: `Ok(Rejected)`, state `Failed`.
    /// Credential cannot be resolved or hub cannot be reached: `Err`, state
    /// `Failed`. Never retries and never times out on its own; an
    /// interactive prompt may keep this pending indefinitely.
    #[instrument(skip_all, fields(hub = %self.address))]
    pub async fn sign_in(&mut self) -> Result<SignInOutcome> {
        if self.state == AuthState::Authenticated {
            debug!("Already signed in");
            return Ok(SignInOutcome::Authenticated);
        }

        let user = match self.credential {
            Some(ref credential) => credential.username().unwrap_or("<certificate>").to_owned(),
            None => "<anonymous>".to_owned(),
        };
        let guard = AttemptGuard::start(&mut self.state);
        let attempt =
            attempt_sign_in(&mut self.transport, &self.base_url, self.credential.as_ref()).await;

        match attempt {
            Ok(Attempt::Accepted(token)) => {
                self.token = token;
                self.signed_in_at = Some(Utc::now());
                guard.finish(AuthState::Authenticated);
                info!(user = %user, "Signed in");
                Ok(SignInOutcome::Authenticated)
            }
            Ok(Attempt::Rejected(reason)) => {
                self.token = None;
                guard.finish(AuthState::Failed(reason.clone()));
                warn!(user = %user, reason = %reason, "Hub rejected credentials");
                Ok(SignInOutcome::Rejected { reason })
            }
            Err(e) => {
                self.token = None;
                guard.finish(AuthState::Failed(e.to_string()));
                warn!(error = %e, "Sign-in failed");
                Err(e)
            }
        }
    }

    /// Forget the session locally. The hub is not told.
    pub fn sign_out(&mut self) {
        self.state = AuthState::Unauthenticated;
        self.token = None;
        self.signed_in_at = None;
        info!(hub = %self.address, "Signed out");
    }

    /// Resolve a hub-relative path (with optional query) to a URL on this hub.
    pub fn url(&self, path: &str) -> Result<Url> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| HubError::parse("hub path", format!("{}: {}", path, e)))?;
        if url.origin() != self.base_url.origin() {
            return Err(HubError::parse(
                "hub path",
                format!("'{}' points outside the hub", path),
            ));
        }
        Ok(url)
    }

    /// Authenticated GET of a hub-relative path; the body is returned
    /// unread.
    pub async fn fetch(&self, path: &str) -> Result<ByteStream> {
        self.ensure_authenticated()?;
        let url = self.url(path)?;
        Ok(self.get(url).await?.body)
    }

    /// Authenticated GET. Non-2xx statuses become errors; on success the
    /// body has not been touched.
    pub(crate) async fn get(&self, url: Url) -> Result<TransportResponse> {
        self.ensure_authenticated()?;

        let mut request = TransportRequest::get(url);
        if let Some(ref token) = self.token {
            let value = HeaderValue::from_str(&token.0)
                .map_err(|e| HubError::InvalidResponse(format!("unusable session cookie: {}", e)))?;
            request.headers.insert(header::COOKIE, value);
        }

        let response = self.transport.request(request).await?;
        if response.status.is_success() {
            return Ok(response);
        }
        let status = response.status;
        let body = response.text().await.unwrap_or_default();
        Err(HubError::from_status(status, &body))
    }

    fn ensure_authenticated(&self) -> Result<()> {
        if self.state == AuthState::Authenticated {
            Ok(())
        } else {
            Err(HubError::AuthRequired)
        }
    }
}

async fn attempt_sign_in<T: Transport>(
    transport: &mut T,
    base_url: &Url,
    credential: Option<&CredentialSpec>,
) -> Result<Attempt> {
    let Some(credential) = credential else {
        debug!("No credential configured, using anonymous access");
        return Ok(Attempt::Accepted(None));
    };

    let resolved = credential.resolve().await?;

    let (body, password) = {
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        form.append_pair("sif_sign_in", "yes")
            .append_pair("response_try_plaintext", "1");
        let password = match resolved {
            ResolvedCredential::ClientCertificate(identity) => {
                transport.set_client_identity(identity)?;
                form.append_pair("sif_use_tls", "yes");
                None
            }
            ResolvedCredential::Password { username, password } => {
                form.append_pair("sif_username", &username)
                    .append_pair("sif_password", password.expose());
                Some(password)
            }
        };
        (Bytes::from(form.finish()), password)
    };

    let url = base_url
        .join(SIGN_IN_PATH)
        .map_err(|e| HubError::parse("hub path", e.to_string()))?;
    let mut request = TransportRequest::post(url, body);
    request.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );

    let response = transport.request(request).await?;
    let status = response.status;
    debug!(status = %status, "Sign-in response");

    let provider = interactive_provider(credential);
    if status.is_success() || status.is_redirection() {
        let token = SessionToken::from_headers(&response.headers);
        if let (Some((provider, username)), Some(password)) = (provider, password.as_ref()) {
            provider.accepted(username, password).await;
        }
        return Ok(Attempt::Accepted(token));
    }

    let body = response.text().await.unwrap_or_default();
    match status.as_u16() {
        401 | 403 => {
            if let Some((provider, username)) = provider {
                provider.rejected(username).await;
            }
            let reason = HubError::truncate_body(body.trim());
            Ok(Attempt::Rejected(if reason.is_empty() {
                status.to_string()
            } else {
                reason
            }))
        }
        _ => Err(HubError::Http {
            status,
            body: HubError::truncate_body(body.trim()),
        }),
    }
}

fn interactive_provider(credential: &CredentialSpec) -> Option<(&dyn PasswordProvider, &str)> {
    match credential {
        CredentialSpec::InteractivePassword { username, provider } => {
            Some((provider.as_ref(), username.as_str()))
        }
        _ => None,
    }
}
