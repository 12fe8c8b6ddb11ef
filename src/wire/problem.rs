use serde::Deserialize;

/// Non-retryable ACME problem `type` suffixes per spec §4.3's error
/// classification. Anything else (including `badNonce`, 5xx, or a
/// problem body that fails to parse) is transient.
const NON_RETRYABLE: &[&str] = &[
    "badCSR",
    "rejectedIdentifier",
    "unsupportedIdentifier",
    "malformed",
    "unauthorized",
];

const BAD_NONCE_SUFFIX: &str = "badNonce";
const ACCOUNT_DOES_NOT_EXIST_SUFFIX: &str = "accountDoesNotExist";

/// RFC 7807 `application/problem+json` body as returned by an ACME
/// server on non-2xx responses.
#[derive(Debug, Clone, Deserialize, thiserror::Error)]
#[error("{type_} ({status}): {detail}")]
pub struct AcmeProblem {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub status: u16,
}

impl AcmeProblem {
    #[must_use]
    pub fn suffix(&self) -> &str {
        self.type_.rsplit(':').next().unwrap_or(&self.type_)
    }

    #[must_use]
    pub fn is_bad_nonce(&self) -> bool {
        self.suffix() == BAD_NONCE_SUFFIX
    }

    #[must_use]
    pub fn is_account_does_not_exist(&self) -> bool {
        self.suffix() == ACCOUNT_DOES_NOT_EXIST_SUFFIX
    }

    /// True unless the problem `type` names a non-retryable condition.
    /// `badNonce` is explicitly retryable (spec §4.3's nonce rule).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_bad_nonce() || !NON_RETRYABLE.contains(&self.suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_nonce_is_retryable() {
        let problem = AcmeProblem {
            type_: "urn:ietf:params:acme:error:badNonce".to_string(),
            detail: "nonce expired".to_string(),
            status: 400,
        };
        assert!(problem.is_bad_nonce());
        assert!(problem.is_retryable());
    }

    #[test]
    fn malformed_is_terminal() {
        let problem = AcmeProblem {
            type_: "urn:ietf:params:acme:error:malformed".to_string(),
            detail: "bad request".to_string(),
            status: 400,
        };
        assert!(!problem.is_retryable());
    }

    #[test]
    fn account_does_not_exist_is_detected() {
        let problem = AcmeProblem {
            type_: "urn:ietf:params:acme:error:accountDoesNotExist".to_string(),
            detail: String::new(),
            status: 400,
        };
        assert!(problem.is_account_does_not_exist());
    }

    #[test]
    fn unknown_type_defaults_retryable() {
        let problem = AcmeProblem {
            type_: "urn:ietf:params:acme:error:serverInternal".to_string(),
            detail: "oops".to_string(),
            status: 500,
        };
        assert!(problem.is_retryable());
    }
}
