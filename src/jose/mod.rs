//! The JWS envelope builder (spec §4.1): a pure function over an
//! account signer, with no knowledge of HTTP or protocol state.

pub mod base64url;
pub mod jwk;
pub mod jws;

pub use jwk::Jwk;
pub use jws::{AccountSigner, JwsAlgorithm, build_jws};
