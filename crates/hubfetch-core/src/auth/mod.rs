//! Authentication module for hub sessions and credentials.
//!
//! This module provides:
//! - `CredentialSpec` / `ConnectionOptions`: the three credential sources
//!   (client certificate, password file, interactive password) and their
//!   precedence
//! - `PasswordProvider`: asynchronous, cancellable password lookup
//! - `SecretStore` / `StoredPasswordProvider`: remembered passwords in the
//!   OS keychain
//! - `HubSession`: the sign-in state machine and authenticated requests

pub mod credentials;
pub mod secrets;
pub mod session;

pub use credentials::{
    derive_cert_path, derive_key_path, ConnectionOptions, CredentialSpec, Password,
    PasswordProvider, ResolvedCredential,
};
pub use secrets::{KeyringStore, SecretStore, StoredPasswordProvider};
pub use session::{AuthState, HubSession, SessionToken, SignInOutcome};
