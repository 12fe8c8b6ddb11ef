//! Cryptographic material the core needs but never generates itself
//! for accounts: loading the account key from PEM, generating subject
//! keys, and building CSRs (spec §4.1/§9 — account keys are always
//! pre-provisioned, never auto-created, so operators control the
//! trust anchor that binds an account to a CA).

use ring::rand::SystemRandom;
use ring::signature::{
    EcdsaKeyPair, EcdsaSigningAlgorithm, ECDSA_P256_SHA256_FIXED_SIGNING,
    ECDSA_P384_SHA384_FIXED_SIGNING, KeyPair as RingKeyPair, RsaKeyPair,
};

use crate::error::{AcmeError, AcmeResult};
use crate::jose::{AccountSigner, Jwk, JwsAlgorithm};

/// Loads an account signer from the operator-supplied PEM key and
/// builds the subject key + CSR for one certificate request. A host
/// supplies the concrete implementation; the core only holds
/// `Arc<dyn CryptoProvider>`.
pub trait CryptoProvider: Send + Sync {
    fn account_signer(&self) -> AcmeResult<Box<dyn AccountSigner>>;

    /// Builds a fresh subject key pair and a PKCS#10 CSR covering
    /// `identifiers`, returning `(csr_der, key_pem)`.
    fn build_csr(&self, identifiers: &[String]) -> AcmeResult<(Vec<u8>, String)>;
}

/// ECDSA account signer backed by a PKCS#8-encoded private key loaded
/// once at startup. `ring` has no P-521 support, so ES512 is not among
/// the algorithms this engine can offer (see DESIGN.md).
pub struct EcdsaAccountSigner {
    key_pair: EcdsaKeyPair,
    algorithm: JwsAlgorithm,
    jwk: Jwk,
}

fn ring_algorithm(algorithm: JwsAlgorithm) -> AcmeResult<&'static EcdsaSigningAlgorithm> {
    match algorithm {
        JwsAlgorithm::Es256 => Ok(&ECDSA_P256_SHA256_FIXED_SIGNING),
        JwsAlgorithm::Es384 => Ok(&ECDSA_P384_SHA384_FIXED_SIGNING),
        JwsAlgorithm::Rs256 => {
            Err(AcmeError::Configuration("RS256 is not an ECDSA algorithm".to_string()))
        }
    }
}

impl EcdsaAccountSigner {
    /// `pkcs8_der` is the account key as loaded from the operator's
    /// PEM file (base64-decoded); this constructor never generates one.
    pub fn load(pkcs8_der: &[u8], algorithm: JwsAlgorithm) -> AcmeResult<Self> {
        let ring_alg = ring_algorithm(algorithm)?;
        let rng = SystemRandom::new();
        let key_pair = EcdsaKeyPair::from_pkcs8(ring_alg, pkcs8_der, &rng)
            .map_err(|e| AcmeError::Configuration(format!("invalid account key: {e}")))?;

        let public = key_pair.public_key().as_ref();
        let coordinate_len = (public.len() - 1) / 2;
        let x = &public[1..1 + coordinate_len];
        let y = &public[1 + coordinate_len..];
        let crv = match algorithm {
            JwsAlgorithm::Es256 => "P-256",
            JwsAlgorithm::Es384 => "P-384",
            JwsAlgorithm::Rs256 => unreachable!("filtered by ring_algorithm above"),
        };
        let jwk = Jwk::ec(crv, x, y);

        Ok(Self { key_pair, algorithm, jwk })
    }
}

impl AccountSigner for EcdsaAccountSigner {
    fn algorithm(&self) -> JwsAlgorithm {
        self.algorithm
    }

    fn jwk(&self) -> Jwk {
        self.jwk.clone()
    }

    fn sign(&self, signing_input: &[u8]) -> AcmeResult<Vec<u8>> {
        let rng = SystemRandom::new();
        self.key_pair
            .sign(&rng, signing_input)
            .map(|sig| sig.as_ref().to_vec())
            .map_err(|e| AcmeError::Transient(format!("signing failed: {e}")))
    }
}

/// RSA account signer, used when the operator's account key is RSA
/// rather than an EC curve.
pub struct RsaAccountSigner {
    key_pair: RsaKeyPair,
    jwk: Jwk,
}

impl RsaAccountSigner {
    pub fn load(pkcs8_der: &[u8]) -> AcmeResult<Self> {
        let key_pair = RsaKeyPair::from_pkcs8(pkcs8_der)
            .map_err(|e| AcmeError::Configuration(format!("invalid RSA account key: {e}")))?;
        let public_key = key_pair.public();
        let modulus = public_key.modulus().big_endian_without_leading_zero();
        let exponent = public_key.exponent().big_endian_without_leading_zero();
        let jwk = Jwk::rsa(modulus, exponent);
        Ok(Self { key_pair, jwk })
    }
}

impl AccountSigner for RsaAccountSigner {
    fn algorithm(&self) -> JwsAlgorithm {
        JwsAlgorithm::Rs256
    }

    fn jwk(&self) -> Jwk {
        self.jwk.clone()
    }

    fn sign(&self, signing_input: &[u8]) -> AcmeResult<Vec<u8>> {
        let rng = SystemRandom::new();
        let mut signature = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(&ring::signature::RSA_PKCS1_SHA256, &rng, signing_input, &mut signature)
            .map_err(|e| AcmeError::Transient(format!("signing failed: {e}")))?;
        Ok(signature)
    }
}

/// Builds subject keys and CSRs with `rcgen`, the way a host would
/// generate a fresh certificate request for each renewal — the
/// account key above is reused across renewals, but subject keys are
/// not.
pub struct RcgenCryptoProvider {
    account_pkcs8_der: Vec<u8>,
    account_algorithm: JwsAlgorithm,
}

impl RcgenCryptoProvider {
    #[must_use]
    pub fn new(account_pkcs8_der: Vec<u8>, account_algorithm: JwsAlgorithm) -> Self {
        Self { account_pkcs8_der, account_algorithm }
    }
}

impl CryptoProvider for RcgenCryptoProvider {
    fn account_signer(&self) -> AcmeResult<Box<dyn AccountSigner>> {
        match self.account_algorithm {
            JwsAlgorithm::Es256 | JwsAlgorithm::Es384 => Ok(Box::new(EcdsaAccountSigner::load(
                &self.account_pkcs8_der,
                self.account_algorithm,
            )?)),
            JwsAlgorithm::Rs256 => Ok(Box::new(RsaAccountSigner::load(&self.account_pkcs8_der)?)),
        }
    }

    fn build_csr(&self, identifiers: &[String]) -> AcmeResult<(Vec<u8>, String)> {
        if identifiers.is_empty() {
            return Err(AcmeError::Configuration("CSR requires at least one identifier".to_string()));
        }

        let mut params = rcgen::CertificateParams::new(identifiers.to_vec())
            .map_err(|e| AcmeError::Configuration(format!("invalid SAN list: {e}")))?;
        params
            .distinguished_name
            .push(rcgen::DnType::CommonName, identifiers[0].clone());

        let key_pair = rcgen::KeyPair::generate()
            .map_err(|e| AcmeError::Transient(format!("subject key generation failed: {e}")))?;
        let csr = params
            .serialize_request(&key_pair)
            .map_err(|e| AcmeError::Transient(format!("CSR construction failed: {e}")))?;

        Ok((csr.der().to_vec(), key_pair.serialize_pem()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring::signature::EcdsaKeyPair as RingEcdsaKeyPair;

    fn generate_p256_pkcs8() -> Vec<u8> {
        let rng = SystemRandom::new();
        RingEcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
            .unwrap()
            .as_ref()
            .to_vec()
    }

    #[test]
    fn ecdsa_signer_produces_non_empty_signature() {
        let pkcs8 = generate_p256_pkcs8();
        let signer = EcdsaAccountSigner::load(&pkcs8, JwsAlgorithm::Es256).unwrap();
        let signature = signer.sign(b"signing input").unwrap();
        assert!(!signature.is_empty());
        assert_eq!(signer.algorithm(), JwsAlgorithm::Es256);
    }

    #[test]
    fn rs256_rejected_by_ecdsa_loader() {
        let pkcs8 = generate_p256_pkcs8();
        let err = EcdsaAccountSigner::load(&pkcs8, JwsAlgorithm::Rs256).unwrap_err();
        assert!(matches!(err, AcmeError::Configuration(_)));
    }

    #[test]
    fn build_csr_requires_identifiers() {
        let provider = RcgenCryptoProvider::new(generate_p256_pkcs8(), JwsAlgorithm::Es256);
        assert!(provider.build_csr(&[]).is_err());
    }

    #[test]
    fn build_csr_returns_der_and_pem_key() {
        let provider = RcgenCryptoProvider::new(generate_p256_pkcs8(), JwsAlgorithm::Es256);
        let (der, pem) = provider.build_csr(&["example.org".to_string()]).unwrap();
        assert!(!der.is_empty());
        assert!(pem.contains("PRIVATE KEY"));
    }

    #[test]
    fn build_csr_sets_common_name_to_first_san() {
        use x509_parser::certification_request::X509CertificationRequest;

        let provider = RcgenCryptoProvider::new(generate_p256_pkcs8(), JwsAlgorithm::Es256);
        let (der, _) = provider
            .build_csr(&["example.org".to_string(), "www.example.org".to_string()])
            .unwrap();

        let (_, csr) = X509CertificationRequest::from_der(&der).unwrap();
        let cn = csr
            .certification_request_info
            .subject
            .iter_common_name()
            .next()
            .and_then(|attr| attr.as_str().ok())
            .expect("CSR subject must carry a CommonName");
        assert_eq!(cn, "example.org");
    }
}
