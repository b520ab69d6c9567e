use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{HubError, Result};
use crate::transport::ClientIdentity;

/// Certificate file suffixes and the key suffix each one pairs with.
/// Longest first so `.cert.pem` wins over `.cert`.
const CERT_KEY_SUFFIXES: &[(&str, &str)] = &[(".cert.pem", ".key.pem"), (".cert", ".key")];

/// A password. `Debug` never shows the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

/// Supplies a password on demand, possibly after waiting on a human.
///
/// `password` may suspend indefinitely. Returning `HubError::AuthCancelled`
/// abandons the sign-in attempt; it is never retried.
#[async_trait]
pub trait PasswordProvider: Send + Sync {
    async fn password(&self, username: &str) -> Result<Password>;

    /// The hub accepted `password`.
    async fn accepted(&self, _username: &str, _password: &Password) {}

    /// The hub rejected the last password handed out.
    async fn rejected(&self, _username: &str) {}
}

/// Where the credential for one session comes from.
#[derive(Clone)]
pub enum CredentialSpec {
    ClientCertificate { cert_path: PathBuf, key_path: PathBuf },
    PasswordFile { username: String, path: PathBuf },
    InteractivePassword {
        username: String,
        provider: Arc<dyn PasswordProvider>,
    },
}

impl fmt::Debug for CredentialSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSpec::ClientCertificate {
                cert_path,
                key_path,
            } => f
                .debug_struct("ClientCertificate")
                .field("cert_path", cert_path)
                .field("key_path", key_path)
                .finish(),
            CredentialSpec::PasswordFile { username, path } => f
                .debug_struct("PasswordFile")
                .field("username", username)
                .field("path", path)
                .finish(),
            CredentialSpec::InteractivePassword { username, .. } => f
                .debug_struct("InteractivePassword")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

/// A credential ready for one sign-in attempt.
#[derive(Debug, Clone)]
pub enum ResolvedCredential {
    ClientCertificate(ClientIdentity),
    Password { username: String, password: Password },
}

/// Connection options as a collaborator supplies them. Several credential
/// sources may be set; `credential_spec` picks one.
///
/// Paths must already be absolute or relative to the process working
/// directory; nothing here resolves them.
#[derive(Clone, Default)]
pub struct ConnectionOptions {
    pub ca_file: Option<PathBuf>,
    pub username: Option<String>,
    pub password_file: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
    pub password_provider: Option<Arc<dyn PasswordProvider>>,
}

impl ConnectionOptions {
    /// Pick the credential source: client certificate, then password file,
    /// then interactive password. `Ok(None)` means anonymous access.
    pub fn credential_spec(&self) -> Result<Option<CredentialSpec>> {
        let cert_pair = match (&self.client_cert, &self.client_key) {
            (Some(cert), Some(key)) => Some((cert.clone(), key.clone())),
            (Some(cert), None) => Some((cert.clone(), derive_key_path(cert))),
            (None, Some(key)) => Some((derive_cert_path(key), key.clone())),
            (None, None) => None,
        };
        if let Some((cert_path, key_path)) = cert_pair {
            return Ok(Some(CredentialSpec::ClientCertificate {
                cert_path,
                key_path,
            }));
        }

        if let Some(ref path) = self.password_file {
            let username = self.require_username("a password file")?;
            return Ok(Some(CredentialSpec::PasswordFile {
                username,
                path: path.clone(),
            }));
        }

        if let Some(ref provider) = self.password_provider {
            let username = self.require_username("an interactive password")?;
            return Ok(Some(CredentialSpec::InteractivePassword {
                username,
                provider: Arc::clone(provider),
            }));
        }

        Ok(None)
    }

    fn require_username(&self, source: &str) -> Result<String> {
        match self.username.as_deref() {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => Err(HubError::Config(format!(
                "a username is required when signing in with {}",
                source
            ))),
        }
    }
}

impl CredentialSpec {
    /// Produce a concrete credential. Called once per sign-in attempt.
    pub async fn resolve(&self) -> Result<ResolvedCredential> {
        match self {
            CredentialSpec::ClientCertificate {
                cert_path,
                key_path,
            } => {
                let cert_pem = read_credential_file(cert_path).await?;
                let key_pem = read_credential_file(key_path).await?;
                Ok(ResolvedCredential::ClientCertificate(ClientIdentity {
                    cert_pem,
                    key_pem,
                }))
            }
            CredentialSpec::PasswordFile { username, path } => {
                let raw = read_credential_file(path).await?;
                let text = String::from_utf8(raw).map_err(|e| HubError::CredentialResolution {
                    path: path.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
                })?;
                Ok(ResolvedCredential::Password {
                    username: username.clone(),
                    password: password_from_file_contents(&text),
                })
            }
            CredentialSpec::InteractivePassword { username, provider } => {
                let password = provider.password(username).await?;
                Ok(ResolvedCredential::Password {
                    username: username.clone(),
                    password,
                })
            }
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            CredentialSpec::ClientCertificate { .. } => None,
            CredentialSpec::PasswordFile { username, .. }
            | CredentialSpec::InteractivePassword { username, .. } => Some(username),
        }
    }
}

async fn read_credential_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|source| HubError::CredentialResolution {
            path: path.to_path_buf(),
            source,
        })
}

/// Password file contents are used verbatim except for exactly one trailing
/// line terminator (`\n` or `\r\n`), which is removed. Other leading or
/// trailing whitespace is part of the password.
pub fn password_from_file_contents(contents: &str) -> Password {
    let trimmed = contents
        .strip_suffix("\r\n")
        .or_else(|| contents.strip_suffix('\n'))
        .unwrap_or(contents);
    Password::new(trimmed)
}

/// `foo.cert` -> `foo.key`, `foo.cert.pem` -> `foo.key.pem`, else `<path>.key`.
pub fn derive_key_path(cert_path: &Path) -> PathBuf {
    swap_suffix(cert_path, |(cert, key)| (cert, key), ".key")
}

/// `foo.key` -> `foo.cert`, `foo.key.pem` -> `foo.cert.pem`, else `<path>.cert`.
pub fn derive_cert_path(key_path: &Path) -> PathBuf {
    swap_suffix(key_path, |(cert, key)| (key, cert), ".cert")
}

fn swap_suffix(
    path: &Path,
    orient: impl Fn((&'static str, &'static str)) -> (&'static str, &'static str),
    fallback: &str,
) -> PathBuf {
    let text = path.to_string_lossy();
    for &pair in CERT_KEY_SUFFIXES {
        let (from, to) = orient(pair);
        if let Some(stem) = text.strip_suffix(from) {
            if !stem.is_empty() {
                return PathBuf::from(format!("{}{}", stem, to));
            }
        }
    }
    let mut derived = path.as_os_str().to_owned();
    derived.push(fallback);
    PathBuf::from(derived)
}
