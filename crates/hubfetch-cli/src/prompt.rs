//! Terminal password prompt.

use async_trait::async_trait;
use hubfetch_core::{HubError, Password, PasswordProvider, Result};
use tracing::debug;

/// Asks for the password on the controlling terminal. An empty answer or
/// end of input cancels the sign-in.
pub struct TerminalPrompt {
    hub: String,
}

impl TerminalPrompt {
    pub fn new(hub: impl Into<String>) -> Self {
        Self { hub: hub.into() }
    }
}

#[async_trait]
impl PasswordProvider for TerminalPrompt {
    async fn password(&self, username: &str) -> Result<Password> {
        let prompt = format!("Password for {}@{}: ", username, self.hub);
        let answer = tokio::task::spawn_blocking(move || rpassword::prompt_password(prompt))
            .await
            .map_err(|_| HubError::AuthCancelled)?;

        match answer {
            Ok(password) if !password.is_empty() => Ok(Password::new(password)),
            Ok(_) => Err(HubError::AuthCancelled),
            Err(e) => {
                debug!(error = %e, "Password prompt aborted");
                Err(HubError::AuthCancelled)
            }
        }
    }
}
