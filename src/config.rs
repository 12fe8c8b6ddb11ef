//! Account and per-certificate configuration (spec §6), layered the
//! way the rest of this engine's host would layer any other config:
//! built-in defaults, an optional TOML file, then environment
//! variables, validated with an imperative checklist before use.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use config::{Config, Environment, File};
use serde::Deserialize;

const ENV_PREFIX: &str = "ACME_ENGINE";
const DEFAULT_BITS: u32 = 4096;
const DEFAULT_CURVE: &str = "P-384";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChallengeKindConfig {
    Http01,
    Dns01,
}

impl Default for ChallengeKindConfig {
    fn default() -> Self {
        Self::Http01
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyTypeConfig {
    Rsa,
    Ecdsa,
}

impl Default for KeyTypeConfig {
    fn default() -> Self {
        Self::Ecdsa
    }
}

/// One certificate to keep renewed: the ACME directory section it
/// belongs to plus the subject alternative names it should cover.
#[derive(Debug, Clone, Deserialize)]
pub struct CertificateConfig {
    pub path: String,
    pub san: Vec<String>,
    #[serde(default)]
    pub challenge: ChallengeKindConfig,
}

/// The account-level knobs a host proxy exposes for one ACME
/// directory: CA endpoint, on-disk account material, and the subject
/// key policy used for every certificate renewed under it.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub uri: String,
    pub account: PathBuf,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub challenge: ChallengeKindConfig,
    #[serde(default)]
    pub keytype: KeyTypeConfig,
    #[serde(default = "default_bits")]
    pub bits: u32,
    #[serde(default = "default_curve")]
    pub curves: String,
    #[serde(default)]
    pub certificates: Vec<CertificateConfig>,
}

fn default_bits() -> u32 {
    DEFAULT_BITS
}

fn default_curve() -> String {
    DEFAULT_CURVE.to_string()
}

/// Loads `AccountConfig` from defaults, an optional TOML file at
/// `path`, then `ACME_ENGINE_*` environment overrides, validating the
/// result before returning it.
pub fn load(path: Option<&str>) -> Result<AccountConfig> {
    let mut builder = Config::builder()
        .set_default("challenge", "http-01")?
        .set_default("keytype", "ECDSA")?
        .set_default("bits", i64::from(DEFAULT_BITS))?
        .set_default("curves", DEFAULT_CURVE)?;

    if let Some(path) = path {
        builder = builder.add_source(File::with_name(path).required(false));
    }
    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let raw = builder.build().context("assembling configuration")?;
    let account: AccountConfig = raw.try_deserialize().context("deserializing AccountConfig")?;
    validate(&account)?;
    Ok(account)
}

/// Imperative, per-field validation so a misconfiguration fails with a
/// specific message instead of a generic deserialization error.
pub fn validate(account: &AccountConfig) -> Result<()> {
    if account.uri.trim().is_empty() {
        bail!("account uri must not be empty");
    }
    if !(account.uri.starts_with("https://") || account.uri.starts_with("http://")) {
        bail!("account uri must be an absolute http(s) URL, got {}", account.uri);
    }
    if account.account.as_os_str().is_empty() {
        bail!("account path must not be empty");
    }
    if matches!(account.keytype, KeyTypeConfig::Rsa) && !(2048..=8192).contains(&account.bits) {
        bail!("rsa key size must be between 2048 and 8192 bits, got {}", account.bits);
    }
    if matches!(account.keytype, KeyTypeConfig::Ecdsa)
        && account.curves != "P-256"
        && account.curves != "P-384"
    {
        bail!("ecdsa curve must be P-256 or P-384, got {}", account.curves);
    }
    for certificate in &account.certificates {
        if certificate.path.trim().is_empty() {
            bail!("certificate path must not be empty");
        }
        if certificate.san.is_empty() {
            bail!("certificate {} must list at least one SAN", certificate.path);
        }
    }
    Ok(())
}
