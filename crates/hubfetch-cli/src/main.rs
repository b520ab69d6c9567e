//! hubfetch - fetch a resource from an analysis hub.
//!
//! Signs in with a client certificate, a password file or a prompted
//! password, then streams the requested hub path to stdout or a file.

mod cli;
mod config;
mod prompt;

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use hubfetch_core::auth::{KeyringStore, StoredPasswordProvider};
use hubfetch_core::{
    copy_stream, ConnectionOptions, HubAddress, HubError, HubSession, PasswordProvider,
    SignInOutcome,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;
use config::Config;
use prompt::TerminalPrompt;

/// Exit status for sign-in and fetch failures
const EXIT_FAILURE: u8 = 1;

/// Initialize the tracing subscriber for logging
fn init_tracing(verbose: bool) {
    // RUST_LOG overrides the default level (e.g., RUST_LOG=hubfetch_core=trace)
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries the fetched artifact, so logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = match Cli::try_parse_from(cli::normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    init_tracing(cli.verbose);

    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring unreadable config file");
        Config::default()
    });

    let (hub, target) = match cli.endpoint(config.hub.as_deref()) {
        Ok(endpoint) => endpoint,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    match run(&cli, &config, &hub, &target).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run(cli: &Cli, config: &Config, hub: &str, target: &str) -> Result<()> {
    let address: HubAddress = hub
        .parse()
        .with_context(|| format!("Invalid hub address '{}'", hub))?;

    let options = connection_options(cli, config, &address)?;
    let mut session =
        HubSession::connect(address.clone(), &options).context("Failed to set up hub connection")?;

    match session.sign_in().await {
        Ok(SignInOutcome::Authenticated) => {}
        Ok(SignInOutcome::Rejected { reason }) => {
            bail!("Hub {} rejected the credentials: {}", address, reason)
        }
        Err(HubError::AuthCancelled) => bail!("Sign-in cancelled"),
        Err(e) if e.is_connection() => {
            return Err(e).with_context(|| format!("Could not reach hub {}", address))
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to sign in to {}", address)),
    }

    let path = cli::hub_path(target);
    let stream = session
        .fetch(&path)
        .await
        .with_context(|| format!("Failed to fetch {}", path))?;

    let written = match cli.output {
        Some(ref output) => {
            let output = cli::absolutize(output)?;
            let mut file = tokio::fs::File::create(&output)
                .await
                .with_context(|| format!("Failed to create {}", output.display()))?;
            copy_stream(stream, &mut file)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?
        }
        None => {
            let mut stdout = tokio::io::stdout();
            copy_stream(stream, &mut stdout)
                .await
                .context("Failed to write to stdout")?
        }
    };

    info!(bytes = written, path = %path, "Fetch complete");
    Ok(())
}

fn connection_options(cli: &Cli, config: &Config, address: &HubAddress) -> Result<ConnectionOptions> {
    let absolute = |path: &Option<std::path::PathBuf>| -> Result<Option<std::path::PathBuf>> {
        path.as_deref().map(cli::absolutize).transpose()
    };

    let username = cli.hubuser.clone().or_else(|| config.hubuser.clone());
    let password_provider: Option<Arc<dyn PasswordProvider>> = match username {
        Some(_) if config.remember_password => Some(Arc::new(StoredPasswordProvider::new(
            TerminalPrompt::new(address.to_string()),
            KeyringStore,
            address.to_string(),
        ))),
        Some(_) => Some(Arc::new(TerminalPrompt::new(address.to_string()))),
        None => None,
    };

    Ok(ConnectionOptions {
        ca_file: absolute(&cli.cacert.clone().or_else(|| config.cacert.clone()))?,
        username,
        password_file: absolute(&cli.hubpwfile)?,
        client_cert: absolute(&cli.hubcert)?,
        client_key: absolute(&cli.hubkey)?,
        password_provider,
    })
}
