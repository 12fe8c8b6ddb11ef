//! Standalone HTTP-01 token responder: a small service fronting the
//! well-known challenge path for hosts that run the renewal engine on
//! a machine other than the one terminating inbound HTTP-01 probes
//! (spec §11). Registrations arrive over the HMAC-signed admin route;
//! anyone without the shared secret cannot plant a token.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use acme_renewal_engine::collaborators::http01::spawn_admin_http01_responder;

#[derive(Debug, Parser)]
#[command(name = "acme-http01-responder", about = "Stand-alone ACME HTTP-01 token responder")]
struct Args {
    #[arg(long, default_value_t = 80)]
    port: u16,

    #[arg(long, env = "ACME_ENGINE_HTTP01_HMAC_SECRET")]
    hmac_secret: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if args.hmac_secret.trim().is_empty() {
        bail!("ACME_ENGINE_HTTP01_HMAC_SECRET must not be empty");
    }

    let store = Arc::new(Mutex::new(HashMap::new()));
    let handle = spawn_admin_http01_responder(store, args.hmac_secret, args.port);
    handle.await.context("HTTP-01 responder task panicked")?;
    Ok(())
}
