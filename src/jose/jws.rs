use serde::Serialize;
use serde_json::json;

use crate::error::{AcmeError, AcmeResult};
use crate::jose::base64url;
use crate::jose::jwk::Jwk;

/// JWS algorithm names, selected from the account key type per spec
/// §4.1. ES512 (EC P-521) is listed by the spec but `ring` has no
/// P-521 support; see DESIGN.md for why the concrete crypto provider
/// only offers ES256/ES384/RS256.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwsAlgorithm {
    Es256,
    Es384,
    Rs256,
}

impl JwsAlgorithm {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            JwsAlgorithm::Es256 => "ES256",
            JwsAlgorithm::Es384 => "ES384",
            JwsAlgorithm::Rs256 => "RS256",
        }
    }
}

/// Whatever the JWS builder needs from the account key: its algorithm,
/// its public part as a JWK, and a raw signing primitive. Implemented
/// by the crypto provider's concrete key types (§11); the builder
/// itself never touches key material directly.
pub trait AccountSigner {
    fn algorithm(&self) -> JwsAlgorithm;
    fn jwk(&self) -> Jwk;

    /// Signs `signing_input` (the ASCII bytes `"<b64prot>.<b64payload>"`)
    /// and returns the raw signature bytes. EC signatures must already
    /// be in fixed-width R‖S form, not DER, per spec §4.1 step 4.
    fn sign(&self, signing_input: &[u8]) -> AcmeResult<Vec<u8>>;
}

#[derive(Serialize)]
struct ProtectedHeader<'a> {
    alg: &'static str,
    nonce: &'a str,
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    jwk: Option<Jwk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<&'a str>,
}

/// Builds a flattened JWS per RFC 8555 §6.2 / spec §4.1.
///
/// `payload` is `None` for the empty-payload case (e.g. AUTH's
/// `JWS("")`); `kid` selects the `kid` header when `Some`, otherwise
/// the `jwk` header is embedded — the two are mutually exclusive
/// (spec invariant 3, property P2).
pub fn build_jws(
    signer: &dyn AccountSigner,
    payload: Option<&serde_json::Value>,
    nonce: &str,
    url: &str,
    kid: Option<&str>,
) -> AcmeResult<serde_json::Value> {
    if nonce.is_empty() {
        return Err(AcmeError::Transient(
            "refusing to sign a request with an empty nonce".to_string(),
        ));
    }

    let header = ProtectedHeader {
        alg: signer.algorithm().name(),
        nonce,
        url,
        jwk: if kid.is_none() { Some(signer.jwk()) } else { None },
        kid,
    };

    let protected_json = serde_json::to_string(&header)?;
    let protected_b64 = base64url::encode(protected_json.as_bytes());

    let payload_b64 = match payload {
        Some(value) => base64url::encode(serde_json::to_string(value)?.as_bytes()),
        None => String::new(),
    };

    let signing_input = format!("{protected_b64}.{payload_b64}");
    let signature = signer.sign(signing_input.as_bytes())?;
    if signature.is_empty() {
        return Err(AcmeError::Transient("JWS signing produced no output".to_string()));
    }
    let signature_b64 = base64url::encode(&signature);

    Ok(json!({
        "protected": protected_b64,
        "payload": payload_b64,
        "signature": signature_b64,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jose::jwk::Jwk;

    struct FixedSigner {
        jwk: Jwk,
    }

    impl AccountSigner for FixedSigner {
        fn algorithm(&self) -> JwsAlgorithm {
            JwsAlgorithm::Es256
        }

        fn jwk(&self) -> Jwk {
            self.jwk.clone()
        }

        fn sign(&self, signing_input: &[u8]) -> AcmeResult<Vec<u8>> {
            // deterministic stand-in signature for JWS-shape assertions
            Ok(signing_input.iter().rev().copied().collect())
        }
    }

    fn signer() -> FixedSigner {
        FixedSigner {
            jwk: Jwk::ec("P-256", &[1; 32], &[2; 32]),
        }
    }

    #[test]
    fn jwk_header_present_without_kid() {
        let jws = build_jws(&signer(), None, "nonce-1", "https://x/newAccount", None).unwrap();
        let protected: serde_json::Value = serde_json::from_slice(
            &base64url::decode(jws["protected"].as_str().unwrap()).unwrap(),
        )
        .unwrap();
        assert!(protected.get("jwk").is_some());
        assert!(protected.get("kid").is_none());
        assert_eq!(protected["nonce"], "nonce-1");
        assert_eq!(protected["url"], "https://x/newAccount");
        assert_eq!(jws["payload"], "");
    }

    #[test]
    fn kid_header_present_without_jwk() {
        let jws = build_jws(
            &signer(),
            None,
            "nonce-2",
            "https://x/order",
            Some("https://x/acct/1"),
        )
        .unwrap();
        let protected: serde_json::Value = serde_json::from_slice(
            &base64url::decode(jws["protected"].as_str().unwrap()).unwrap(),
        )
        .unwrap();
        assert_eq!(protected["kid"], "https://x/acct/1");
        assert!(protected.get("jwk").is_none());
    }

    #[test]
    fn payload_round_trips() {
        let payload = json!({"termsOfServiceAgreed": true});
        let jws = build_jws(&signer(), Some(&payload), "nonce-3", "https://x", None).unwrap();
        let decoded: serde_json::Value = serde_json::from_slice(
            &base64url::decode(jws["payload"].as_str().unwrap()).unwrap(),
        )
        .unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn empty_nonce_is_rejected() {
        let err = build_jws(&signer(), None, "", "https://x", None).unwrap_err();
        assert!(matches!(err, AcmeError::Transient(_)));
    }
}
