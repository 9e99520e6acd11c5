//! Loopback PKI
//!
//! Issues the server identity and then the client identity into a base
//! directory, reusing whatever is already there.
//!
//! ```bash
//! loopback-pki --base-dir target/vault/config/ssl
//! loopback-pki --config loopback-pki.toml --server-only
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use loopback_pki::configs::IssuanceConfig;
use loopback_pki::distinguished_name::DistinguishedName;
use loopback_pki::issuance::IssuanceCoordinator;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

#[derive(Parser, Debug)]
#[command(version, about = "Issue self-signed loopback TLS identities")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the issued artifacts (overrides the config file)
    #[arg(short, long)]
    base_dir: Option<PathBuf>,

    /// Server subject, e.g. "C=AU, O=Acme, OU=Test Server, CN=localhost"
    #[arg(long)]
    server_subject: Option<DistinguishedName>,

    /// Client subject, same format as --server-subject
    #[arg(long)]
    client_subject: Option<DistinguishedName>,

    /// Only issue the server identity
    #[arg(long)]
    server_only: bool,
}

fn main() -> Result<()> {
    setup_tracing()?;
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => IssuanceConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => IssuanceConfig::default(),
    };
    if let Some(base_dir) = args.base_dir {
        config.base_dir = base_dir;
    }
    if let Some(subject) = args.server_subject {
        config.server_subject = subject;
    }
    if let Some(subject) = args.client_subject {
        config.client_subject = subject;
    }

    let mut coordinator = IssuanceCoordinator::new(config);
    coordinator
        .issue_server_identity()
        .context("Failed to issue server identity")?;
    if !args.server_only {
        coordinator
            .issue_client_identity()
            .context("Failed to issue client identity")?;
    }

    let paths = coordinator.artifact_paths();
    info!(state = ?coordinator.state(), "issuance complete");
    println!("server certificate: {}", paths.server_cert.display());
    println!("server private key: {}", paths.server_key.display());
    if !args.server_only {
        println!("client certificate: {}", paths.client_cert.display());
        println!("client private key: {}", paths.client_key.display());
        println!("key store:          {}", paths.key_store.display());
        println!("trust store:        {}", paths.trust_store.display());
    }

    Ok(())
}

fn setup_tracing() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    Registry::default()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("Failed to set up tracing")
}
