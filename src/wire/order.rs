use serde::{Deserialize, Serialize};

/// Order resource (RFC 8555 §7.1.3). `url` is not part of the wire
/// body; the driver fills it in from the `Location` header of the
/// newOrder response. `status` is kept as the raw server string and
/// compared with `eq_ignore_ascii_case` (spec §4.3's "lowercase-
/// insensitive equality with `valid`") rather than a serde enum, since
/// a case-sensitive mismatch would otherwise surface as a JSON decode
/// failure instead of the status it actually carries.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub status: String,
    pub finalize: String,
    pub authorizations: Vec<String>,
    #[serde(default)]
    pub certificate: Option<String>,
    #[serde(skip)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierType {
    Dns,
}

#[derive(Debug, Clone, Serialize)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub kind: IdentifierType,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewOrderPayload {
    pub identifiers: Vec<Identifier>,
}

impl NewOrderPayload {
    #[must_use]
    pub fn for_dns_names(names: &[String]) -> Self {
        Self {
            identifiers: names
                .iter()
                .map(|value| Identifier {
                    kind: IdentifierType::Dns,
                    value: value.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalizePayload {
    pub csr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_matches_case_insensitively() {
        for json in ["\"valid\"", "\"Valid\"", "\"VALID\""] {
            let order: Order = serde_json::from_str(&format!(
                "{{\"status\":{json},\"finalize\":\"https://x/finalize\",\"authorizations\":[]}}"
            ))
            .unwrap();
            assert!(order.status.eq_ignore_ascii_case("valid"));
        }
    }

    #[test]
    fn new_order_payload_serializes_dns_identifiers() {
        let payload = NewOrderPayload::for_dns_names(&["example.org".to_string()]);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["identifiers"][0]["type"], "dns");
        assert_eq!(value["identifiers"][0]["value"], "example.org");
    }
}
