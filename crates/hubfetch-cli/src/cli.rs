//! Command line surface.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

/// Long flags that are also accepted with a single dash, e.g. `-hubuser`.
const SINGLE_DASH_FLAGS: &[&str] = &["hub", "cacert", "hubuser", "hubpwfile", "hubcert", "hubkey"];

#[derive(Parser, Debug)]
#[command(
    name = "hubfetch",
    version,
    about = "Sign in to an analysis hub and stream a resource to stdout or a file"
)]
pub struct Cli {
    /// Hub address, or TARGET alone when `--hub`, `HUBFETCH_HUB` or the
    /// config file names the hub
    #[arg(value_name = "HUB", required = true)]
    pub first: String,

    /// Path to fetch, e.g. `/analysis/318-allwarnings.sarif`
    #[arg(value_name = "TARGET")]
    pub second: Option<String>,

    /// Hub address, e.g. `hub.example.com:7340` or `https://hub.example.com:7340`
    #[arg(long, value_name = "ADDRESS", env = "HUBFETCH_HUB")]
    pub hub: Option<String>,

    /// CA certificate (PEM) the hub certificate is signed by
    #[arg(long, value_name = "PATH", env = "HUBFETCH_CACERT")]
    pub cacert: Option<PathBuf>,

    /// Hub user name
    #[arg(long, value_name = "NAME", env = "HUBFETCH_HUBUSER")]
    pub hubuser: Option<String>,

    /// File containing the hub password
    #[arg(long, value_name = "PATH")]
    pub hubpwfile: Option<PathBuf>,

    /// Client certificate for TLS sign-in
    #[arg(long, value_name = "PATH")]
    pub hubcert: Option<PathBuf>,

    /// Private key for the client certificate
    #[arg(long, value_name = "PATH")]
    pub hubkey: Option<PathBuf>,

    /// Write the response body to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Log requests and state changes to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The hub address and the path to fetch.
    ///
    /// A positional address wins over `--hub`/`HUBFETCH_HUB`, which win over
    /// `default_hub` from the config file.
    pub fn endpoint(&self, default_hub: Option<&str>) -> Result<(String, String), clap::Error> {
        match self.second {
            Some(ref target) => Ok((self.first.clone(), target.clone())),
            None => {
                let hub = self.hub.as_deref().or(default_hub).ok_or_else(|| {
                    Cli::command().error(
                        ErrorKind::MissingRequiredArgument,
                        "no hub address given (pass it before TARGET, with --hub, \
                         HUBFETCH_HUB or in the config file)",
                    )
                })?;
                Ok((hub.to_string(), self.first.clone()))
            }
        }
    }
}

/// Rewrite `-hubuser` style flags (also `-hubuser=name`) to their `--` form.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            let Some(text) = arg.to_str() else {
                return arg;
            };
            let Some(flag) = text.strip_prefix('-').filter(|rest| !rest.starts_with('-')) else {
                return arg;
            };
            let name = flag.split('=').next().unwrap_or(flag);
            if SINGLE_DASH_FLAGS.contains(&name) {
                OsString::from(format!("-{}", text))
            } else {
                arg
            }
        })
        .collect()
}

/// The hub-relative path and query of `target`, which may be a full URL.
pub fn hub_path(target: &str) -> String {
    match target.split_once("://") {
        Some((scheme, rest))
            if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") =>
        {
            match rest.find('/') {
                Some(index) => rest[index..].to_string(),
                None => "/".to_string(),
            }
        }
        _ => target.to_string(),
    }
}

/// Make `path` absolute against the current directory.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Could not determine current directory")?;
    Ok(cwd.join(path))
}
