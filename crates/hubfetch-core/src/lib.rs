//! # hubfetch core
//!
//! Client side of an analysis hub: sign in with a client certificate, a
//! password file or an interactive password, then pull project and
//! analysis listings and SARIF reports as streams.
//!
//! ## Modules
//!
//! - [`address`] - Hub address parsing
//! - [`auth`] - Credentials, secret storage and the session state machine
//! - [`transport`] - HTTP(S) exchanges with streaming bodies
//! - [`api`] - Artifact retrieval on top of a session
//! - [`models`] - Project and analysis identifiers and records
//! - [`error`] - Error taxonomy

pub mod address;
pub mod api;
pub mod auth;
pub mod error;
pub mod models;
pub mod transport;

pub use address::{HubAddress, Protocol};
pub use api::ArtifactFetcher;
pub use auth::{
    AuthState, ConnectionOptions, CredentialSpec, HubSession, Password, PasswordProvider,
    SignInOutcome,
};
pub use error::{ConnectionKind, HubError, Result};
pub use models::{AnalysisId, AnalysisInfo, ProjectId, ProjectInfo};
pub use transport::{copy_stream, ByteStream};
