//! `mlauth` command line entry point
#![allow(clippy::print_stdout)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mlauth_app::{commands, AppContext};
use mlauth_domain::RedirectMode;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(name = "mlauth", version, about = "Sign in to MathWorks and resolve MATLAB entitlements")]
struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in through the browser
    Login {
        /// Seconds to wait for the redirect callback
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Print the authorize URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,
    },
    /// Show connection status, identity and licensing
    Status,
    /// List entitlements for the signed-in account
    Entitlements,
    /// Select the entitlement used for MATLAB
    SelectEntitlement {
        id: String,
    },
    /// Remove the stored session
    SignOut,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    mlauth_app::utils::logging::init_tracing();

    let cli = Cli::parse();
    let config = mlauth_infra::config::load(cli.config.as_deref())
        .context("failed to load configuration")?;
    let ctx = AppContext::new(config).context("failed to initialise")?;

    let restored = ctx.orchestrator.restore().await;
    debug!(status = %restored, "Session restored");

    match cli.command {
        Command::Login { timeout, no_browser } => login(&ctx, timeout, no_browser).await,
        Command::Status => {
            let report = commands::status(&ctx).await?;
            if cli.json {
                return print_json(&report);
            }
            println!("{}", report.label);
            if let Some(identity) = &report.identity {
                println!("Signed in as {}", identity.label());
            }
            if let Some(selected) =
                report.licensing.as_ref().and_then(|l| l.selected_entitlement())
            {
                println!("Entitlement: {} ({})", selected.name, selected.id);
            }
            Ok(())
        }
        Command::Entitlements => {
            let listing = commands::entitlements(&ctx).await?;
            if cli.json {
                return print_json(&listing.entitlements);
            }
            if listing.entitlements.is_empty() {
                println!("No entitlements available");
            }
            let selected_id = listing.selected.as_ref().map(|e| e.id.as_str());
            for entitlement in &listing.entitlements {
                let marker = if Some(entitlement.id.as_str()) == selected_id { '*' } else { ' ' };
                println!("{marker} {}  {}  {}", entitlement.id, entitlement.name, entitlement.license_use);
            }
            Ok(())
        }
        Command::SelectEntitlement { id } => {
            if !commands::select_entitlement(&ctx, &id).await? {
                bail!("entitlement {id} is not available");
            }
            Ok(())
        }
        Command::SignOut => {
            commands::sign_out(&ctx).await?;
            Ok(())
        }
    }
}

async fn login(ctx: &AppContext, timeout: Option<u64>, no_browser: bool) -> Result<()> {
    let timeout = timeout.map_or_else(|| ctx.callback_timeout(), Duration::from_secs);
    let url = commands::start_login(ctx, !no_browser).await?;

    if no_browser {
        println!("Open this URL to sign in:\n{url}");
    }

    if ctx.transport.mode() == RedirectMode::CustomUri {
        println!("Paste the redirect URI once sign-in completes:");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let reader = async {
            while let Some(line) = lines.next_line().await? {
                if !line.trim().is_empty() {
                    commands::deliver_callback(ctx, &line)?;
                    break;
                }
            }
            anyhow::Ok(())
        };
        let finish = commands::finish_login(ctx, timeout);
        tokio::pin!(finish);
        let session = tokio::select! {
            session = &mut finish => session?,
            read = reader => {
                read?;
                finish.await?
            }
        };
        info!(user_id = %session.identity.id, "Login complete");
        return Ok(());
    }

    let session = commands::finish_login(ctx, timeout).await?;
    info!(user_id = %session.identity.id, "Login complete");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
