use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccountPayload {
    pub terms_of_service_agreed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_return_existing: Option<bool>,
}

impl NewAccountPayload {
    #[must_use]
    pub fn check_existing() -> Self {
        Self {
            terms_of_service_agreed: true,
            contact: None,
            only_return_existing: Some(true),
        }
    }

    #[must_use]
    pub fn register(contact_email: &str) -> Self {
        Self {
            terms_of_service_agreed: true,
            contact: Some(vec![format!("mailto:{contact_email}")]),
            only_return_existing: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_existing_omits_contact() {
        let value = serde_json::to_value(NewAccountPayload::check_existing()).unwrap();
        assert_eq!(value["onlyReturnExisting"], true);
        assert!(value.get("contact").is_none());
    }

    #[test]
    fn register_includes_mailto_contact() {
        let value = serde_json::to_value(NewAccountPayload::register("ops@example.org")).unwrap();
        assert_eq!(value["contact"][0], "mailto:ops@example.org");
        assert!(value.get("onlyReturnExisting").is_none());
    }
}
