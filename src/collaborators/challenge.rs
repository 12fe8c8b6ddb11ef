use async_trait::async_trait;

use crate::config::ChallengeKindConfig;
use crate::error::AcmeResult;

/// Writes the challenge response material so the ACME server can
/// observe it before the core advances past `NEWORDER → AUTH` (spec
/// §4.2). HTTP-01 serves `keyAuthorization` at the well-known path;
/// DNS-01 installs a TXT record. Publication is a blocking dependency:
/// the core awaits it and does not advance until it returns.
#[async_trait]
pub trait ChallengePublisher: Send + Sync {
    async fn publish(
        &self,
        kind: ChallengeKindConfig,
        identifier: &str,
        token: &str,
        key_authorization: &str,
    ) -> AcmeResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingPublisher {
        calls: std::sync::Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ChallengePublisher for RecordingPublisher {
        async fn publish(
            &self,
            _kind: ChallengeKindConfig,
            _identifier: &str,
            token: &str,
            key_authorization: &str,
        ) -> AcmeResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push((token.to_string(), key_authorization.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn publisher_trait_is_object_safe() {
        let publisher: Box<dyn ChallengePublisher> =
            Box::new(RecordingPublisher { calls: std::sync::Mutex::new(Vec::new()) });
        publisher
            .publish(ChallengeKindConfig::Http01, "example.org", "tok", "tok.thumb")
            .await
            .unwrap();
    }
}
