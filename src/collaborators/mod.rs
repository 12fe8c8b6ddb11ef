//! Host-owned collaborators (spec §4.2/§6): HTTP transport, the
//! certificate store, the challenge publisher, and the crypto
//! provider. The core only ever holds these behind trait objects —
//! concrete adapters here are defaults a host may use as-is or
//! replace entirely.

pub mod challenge;
pub mod crypto;
pub mod http;
pub mod http01;
pub mod reqwest_client;
pub mod store;

pub use challenge::ChallengePublisher;
pub use crypto::CryptoProvider;
pub use http::HttpClient;
pub use reqwest_client::ReqwestHttpClient;
pub use store::CertStore;
