//! Embedded ACMEv2 (RFC 8555) renewal engine for a host proxy: a
//! per-renewal state machine driving directory discovery through
//! certificate installation, with JWS signing, nonce bookkeeping,
//! bounded retry, and safe certificate hand-off. HTTP transport, the
//! certificate store, challenge publication, and key/CSR material are
//! all external collaborators the host supplies.

pub mod collaborators;
pub mod config;
pub mod engine;
pub mod error;
pub mod jose;
pub mod renewal;
pub mod wire;

pub use engine::{run_renewal, Collaborators};
pub use error::{AcmeError, AcmeResult};
pub use renewal::RenewalContext;
