use std::collections::BTreeMap;

use ring::digest::{Context as DigestContext, SHA256};
use serde::Serialize;

use crate::jose::base64url;

/// JSON Web Key, restricted to the key types the account/subject key
/// algorithms in spec §4.1 can produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Jwk {
    Ec { crv: String, kty: String, x: String, y: String },
    Rsa { e: String, kty: String, n: String },
}

impl Jwk {
    #[must_use]
    pub fn ec(curve_name: &str, x: &[u8], y: &[u8]) -> Self {
        Jwk::Ec {
            crv: curve_name.to_string(),
            kty: "EC".to_string(),
            x: base64url::encode(x),
            y: base64url::encode(y),
        }
    }

    #[must_use]
    pub fn rsa(modulus: &[u8], exponent: &[u8]) -> Self {
        Jwk::Rsa {
            e: base64url::encode(exponent),
            kty: "RSA".to_string(),
            n: base64url::encode(modulus),
        }
    }

    /// Canonical JSON form used for thumbprinting: member names sorted
    /// lexicographically per RFC 7638 §3, no whitespace.
    fn canonical_json(&self) -> String {
        let mut map = BTreeMap::new();
        match self {
            Jwk::Ec { crv, kty, x, y } => {
                map.insert("crv", crv.as_str());
                map.insert("kty", kty.as_str());
                map.insert("x", x.as_str());
                map.insert("y", y.as_str());
            }
            Jwk::Rsa { e, kty, n } => {
                map.insert("e", e.as_str());
                map.insert("kty", kty.as_str());
                map.insert("n", n.as_str());
            }
        }
        serde_json::to_string(&map).unwrap_or_default()
    }

    /// base64url(SHA-256(canonical JWK)) — the thumbprint embedded in
    /// every HTTP-01/DNS-01 key authorization (spec §4.2, glossary).
    #[must_use]
    pub fn thumbprint(&self) -> String {
        let mut ctx = DigestContext::new(&SHA256);
        ctx.update(self.canonical_json().as_bytes());
        base64url::encode(ctx.finish().as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_json_orders_ec_members_alphabetically() {
        let jwk = Jwk::ec("P-256", &[1, 2, 3], &[4, 5, 6]);
        let json = jwk.canonical_json();
        let crv_pos = json.find("crv").unwrap();
        let kty_pos = json.find("kty").unwrap();
        let x_pos = json.find("\"x\"").unwrap();
        let y_pos = json.find("\"y\"").unwrap();
        assert!(crv_pos < kty_pos && kty_pos < x_pos && x_pos < y_pos);
    }

    #[test]
    fn thumbprint_is_stable_for_same_key() {
        let jwk = Jwk::ec("P-256", &[1, 2, 3], &[4, 5, 6]);
        assert_eq!(jwk.thumbprint(), jwk.thumbprint());
    }

    #[test]
    fn thumbprint_differs_for_different_keys() {
        let a = Jwk::ec("P-256", &[1, 2, 3], &[4, 5, 6]);
        let b = Jwk::ec("P-256", &[7, 8, 9], &[4, 5, 6]);
        assert_ne!(a.thumbprint(), b.thumbprint());
    }
}
