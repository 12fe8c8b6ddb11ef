use serde::Deserialize;

/// ACME directory resource (RFC 8555 §7.1.1). Only the three URLs the
/// state machine needs are parsed; unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directory {
    pub new_nonce: String,
    pub new_account: String,
    pub new_order: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_directory() {
        let json = serde_json::json!({
            "newNonce": "https://example.com/acme/new-nonce",
            "newAccount": "https://example.com/acme/new-account",
            "newOrder": "https://example.com/acme/new-order",
            "meta": { "termsOfService": "https://example.com/tos" }
        });
        let directory: Directory = serde_json::from_value(json).unwrap();
        assert_eq!(directory.new_nonce, "https://example.com/acme/new-nonce");
        assert_eq!(
            directory.new_account,
            "https://example.com/acme/new-account"
        );
        assert_eq!(directory.new_order, "https://example.com/acme/new-order");
    }
}
