//! `latchkey`: keypad door controller.
//!
//! Reads keys from the serial keypad, checks user id and PIN against LDAP
//! (falling back to a periodically refreshed cache) and pulses the door
//! strike. Exits with status 1 on any hardware or startup failure so a
//! supervisor can restart it.

#![forbid(unsafe_code)]

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use latchkey_credentials::{CacheRefresher, CredentialCache, Verifier};
use latchkey_directory::LdapDirectory;
use latchkey_engine::AccessEngine;
use latchkey_hardware::{ChannelConfig, HardwareChannel, SerialLink};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};

#[derive(Debug, Parser)]
#[command(name = "latchkey", version, about = "Keypad door controller with LDAP verification")]
struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Validate the configuration, print a summary and exit.
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load(&cli.config)?;

    if cli.check_config {
        println!("{}: ok\n{}", cli.config.display(), config.summary());
        return Ok(());
    }

    info!(
        version = latchkey_core::VERSION,
        port = %config.serial.port,
        directory = %config.directory.url,
        "Latchkey starting"
    );

    let link = SerialLink::open(&config.serial).context("opening keypad link")?;
    let channel = Arc::new(HardwareChannel::new(
        link,
        ChannelConfig::from(&config.serial),
    ));

    let directory = Arc::new(LdapDirectory::new(config.directory.clone())?);
    let cache = Arc::new(CredentialCache::new());

    let refresher = CacheRefresher::new(
        Arc::clone(&directory),
        Arc::clone(&cache),
        config.access.refresh_interval(),
    )
    .spawn();

    let verifier = Verifier::new(directory, cache)
        .with_backup_secret(config.access.backup_secret.clone())
        .with_lookup_timeout(config.access.verify_timeout());

    let mut engine = AccessEngine::new(
        channel,
        verifier,
        config.access.clone(),
        config.feedback.clone(),
    );

    let result = tokio::select! {
        err = engine.run() => Err(anyhow::Error::new(err).context("access engine stopped")),
        signal = tokio::signal::ctrl_c() => {
            signal.context("waiting for shutdown signal").map(|()| info!("Shutdown requested"))
        }
    };

    refresher.abort();
    result
}
