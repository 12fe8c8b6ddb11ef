//! Operator entry point: `acme-renew <cert-path>` triggers a single
//! renewal run against the ACME account bound to that certificate
//! (spec §6). Exit code zero means the run was started and completed
//! in-process; a dynamic error is reported when the certificate is
//! not found, no ACME section is bound, or key material could not be
//! produced.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use acme_renewal_engine::collaborators::crypto::RcgenCryptoProvider;
use acme_renewal_engine::collaborators::http01::LocalHttp01Publisher;
use acme_renewal_engine::collaborators::store::{FileCertStore, StoreEntry};
use acme_renewal_engine::collaborators::ReqwestHttpClient;
use acme_renewal_engine::config::{self, ChallengeKindConfig, KeyTypeConfig};
use acme_renewal_engine::jose::JwsAlgorithm;
use acme_renewal_engine::renewal::RenewalContext;
use acme_renewal_engine::{run_renewal, Collaborators};

#[derive(Debug, Parser)]
#[command(name = "acme-renew", about = "Run a single ACME certificate renewal")]
struct Args {
    /// Path of the certificate to renew, must already be bound to an
    /// entry in the certificate store.
    cert_path: PathBuf,

    /// Path to the engine's TOML configuration file.
    #[arg(long, env = "ACME_ENGINE_CONFIG")]
    config: Option<String>,
}

fn jws_algorithm(keytype: KeyTypeConfig, curves: &str) -> Result<JwsAlgorithm> {
    match keytype {
        KeyTypeConfig::Rsa => Ok(JwsAlgorithm::Rs256),
        KeyTypeConfig::Ecdsa => match curves {
            "P-256" => Ok(JwsAlgorithm::Es256),
            "P-384" => Ok(JwsAlgorithm::Es384),
            other => bail!("unsupported ECDSA curve {other}"),
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let account = config::load(args.config.as_deref()).context("loading configuration")?;

    let cert_path = args.cert_path.to_string_lossy().into_owned();
    let certificate = account
        .certificates
        .iter()
        .find(|entry| entry.path == cert_path)
        .with_context(|| format!("no certificate section bound to {cert_path}"))?
        .clone();

    let account_key_pem = tokio::fs::read_to_string(&account.account)
        .await
        .with_context(|| format!("reading account key {}", account.account.display()))?;
    let account_pkcs8_der = pem_to_der(&account_key_pem).context("decoding account key PEM")?;
    let algorithm = jws_algorithm(account.keytype, &account.curves)?;

    let crypto = Arc::new(RcgenCryptoProvider::new(account_pkcs8_der, algorithm));
    let (csr_der, new_key_pem) = crypto.build_csr(&certificate.san)?;

    let mut ctx = RenewalContext::new(account.clone(), algorithm, certificate.san.clone());
    ctx.csr_der = csr_der;
    ctx.new_key_pem = Some(new_key_pem);

    let store = Arc::new(FileCertStore::new());
    store
        .seed(&cert_path, StoreEntry::default(), Vec::new())
        .await;

    let challenge_store = Arc::new(tokio::sync::Mutex::new(std::collections::HashMap::new()));
    if certificate.challenge == ChallengeKindConfig::Http01 {
        acme_renewal_engine::collaborators::http01::spawn_http01_responder(
            Arc::clone(&challenge_store),
            80,
        );
    }

    let collaborators = Collaborators {
        http: Arc::new(ReqwestHttpClient::new(
            reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?,
        )),
        store,
        challenge_publisher: Arc::new(LocalHttp01Publisher::new(challenge_store)),
        crypto,
    };

    run_renewal(ctx, &cert_path, &collaborators)
        .await
        .context("renewal failed")?;

    Ok(())
}

fn pem_to_der(pem: &str) -> Result<Vec<u8>> {
    let (_, doc) = x509_parser::pem::parse_x509_pem(pem.as_bytes())
        .map_err(|e| anyhow::anyhow!("malformed PEM: {e}"))?;
    Ok(doc.contents)
}
