#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for running the DM gateway and linking accounts to it

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use dm_gateway::oauth::NonceGenerator;
use dm_gateway::{AccountStore, FileAccountStore, Gateway, GatewayConfig, is_valid_username};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dm-gateway")]
#[command(about = "POP3 gateway serving social network direct messages")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Serve POP3 until the listener fails
    Serve {
        /// Listen address, overriding `POP_LISTEN`
        #[arg(long)]
        listen: Option<String>,
    },

    /// Link an account through the OAuth authorization flow
    Authorize {
        /// Callback URL sent with the temporary credential request
        #[arg(long, default_value = "oob")]
        callback: String,

        /// Account name (default: the screen name the service returns)
        #[arg(long)]
        user: Option<String>,

        /// Verification code (default: read from stdin)
        #[arg(long)]
        verifier: Option<String>,
    },

    /// Change the POP3 password of an account
    SetPassword {
        /// Account name
        user: String,

        /// Current password
        #[arg(long)]
        old: String,

        /// New password
        #[arg(long)]
        new: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = GatewayConfig::from_env()?;

    match &args.command {
        Command::Serve { listen } => {
            if let Some(listen) = listen {
                config.listen.clone_from(listen);
            }
            cmd_serve(&config).await?;
        }
        Command::Authorize {
            callback,
            user,
            verifier,
        } => {
            cmd_authorize(
                &config,
                &args,
                callback,
                user.as_deref(),
                verifier.as_deref(),
            )
            .await?;
        }
        Command::SetPassword { user, old, new } => {
            cmd_set_password(&config, &args, user, old, new).await?;
        }
    }

    Ok(())
}

async fn cmd_serve(config: &GatewayConfig) -> anyhow::Result<()> {
    let gateway = Gateway::from_config(config)?;
    let listener = TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("Failed to listen on {}", config.listen))?;
    gateway.serve(listener).await?;
    Ok(())
}

async fn cmd_authorize(
    config: &GatewayConfig,
    args: &Args,
    callback: &str,
    user: Option<&str>,
    verifier: Option<&str>,
) -> anyhow::Result<()> {
    let oauth = config.oauth_client(Arc::new(NonceGenerator::new()))?;
    let temporary = oauth.request_temporary_credentials(Some(callback)).await?;
    eprintln!(
        "Authorize the gateway by visiting:\n{}",
        oauth.authorization_url(&temporary)
    );

    let verifier = match verifier {
        Some(verifier) => verifier.to_string(),
        None => read_verifier().await?,
    };
    let (token, response) = oauth.request_token(&temporary, verifier.trim()).await?;

    let username = match user {
        Some(user) => user.to_string(),
        None => response
            .get("screen_name")
            .context("The service did not return a screen_name; pass --user")?
            .to_string(),
    };
    if !is_valid_username(&username) {
        bail!("Invalid account name {username:?}");
    }

    let store = FileAccountStore::new(&config.account_dir);
    let mut account = store.get_account_no_auth(&username).await;
    account.token = token.token;
    account.token_secret = token.secret;
    let new_password = account.password.is_empty();
    if new_password {
        account.password.clone_from(&account.token);
    }
    store.save(&account).await?;

    let password = new_password.then_some(account.password.as_str());
    if args.json {
        let out = serde_json::json!({ "user": username, "password": password });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Linked account {username}");
        if let Some(password) = password {
            println!("POP3 password: {password}");
        }
    }

    Ok(())
}

async fn cmd_set_password(
    config: &GatewayConfig,
    args: &Args,
    user: &str,
    old: &str,
    new: &str,
) -> anyhow::Result<()> {
    if new.is_empty() {
        bail!("The new password must not be empty");
    }
    let store = FileAccountStore::new(&config.account_dir);
    let mut account = store
        .get_account(user, old)
        .await
        .with_context(|| format!("Cannot change the password of {user}"))?;
    new.clone_into(&mut account.password);
    store.save(&account).await?;

    if args.json {
        let out = serde_json::json!({ "user": user, "updated": true });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Password changed for {user}");
    }

    Ok(())
}

async fn read_verifier() -> anyhow::Result<String> {
    eprint!("Verifier: ");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read the verifier")?;
    if line.trim().is_empty() {
        bail!("No verifier given");
    }
    Ok(line)
}
