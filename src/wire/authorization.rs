use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationStatus {
    Pending,
    Valid,
    Invalid,
    Deactivated,
    Expired,
    Revoked,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    Pending,
    Processing,
    Valid,
    Invalid,
}

/// Challenge kind, matching the configuration values from spec §6
/// (`HTTP-01`/`DNS-01`) to the wire `type` string.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub enum ChallengeKind {
    #[serde(rename = "http-01")]
    Http01,
    #[serde(rename = "dns-01")]
    Dns01,
    #[serde(rename = "tls-alpn-01")]
    TlsAlpn01,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Challenge {
    #[serde(rename = "type")]
    pub kind: ChallengeKind,
    pub url: String,
    pub token: String,
    pub status: ChallengeStatus,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Authorization {
    pub status: AuthorizationStatus,
    pub challenges: Vec<Challenge>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_kind_matches_wire_names() {
        assert_eq!(
            serde_json::from_str::<ChallengeKind>("\"http-01\"").unwrap(),
            ChallengeKind::Http01
        );
        assert_eq!(
            serde_json::from_str::<ChallengeKind>("\"dns-01\"").unwrap(),
            ChallengeKind::Dns01
        );
    }

    #[test]
    fn authorization_parses_challenge_list() {
        let json = serde_json::json!({
            "status": "pending",
            "identifier": {"type": "dns", "value": "example.org"},
            "challenges": [
                {"type": "http-01", "url": "https://x/chall/1", "token": "tok-1", "status": "pending"},
                {"type": "dns-01", "url": "https://x/chall/2", "token": "tok-2", "status": "pending"}
            ]
        });
        let authz: Authorization = serde_json::from_value(json).unwrap();
        assert_eq!(authz.status, AuthorizationStatus::Pending);
        assert_eq!(authz.challenges.len(), 2);
        assert_eq!(authz.challenges[0].kind, ChallengeKind::Http01);
    }
}
