use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

#[must_use]
pub fn encode(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

pub fn decode(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_without_padding() {
        let encoded = encode(b"hello acme");
        assert!(!encoded.contains('='));
        assert_eq!(decode(&encoded).unwrap(), b"hello acme");
    }
}
