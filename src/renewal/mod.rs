//! The renewal lifecycle: typed context, the twelve-state protocol
//! machine, and the install/hand-off step that runs once on success.

pub mod context;
pub mod install;
pub mod machine;

pub use context::{Authorization, AuthorizationStatus, RenewalContext, ACME_RETRY};
pub use machine::State;
