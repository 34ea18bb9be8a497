//! Client-side end-to-end encryption core for the Onera personal AI-chat
//! app.
//!
//! This crate owns every operation that touches plaintext secrets: master
//! key reconstruction (`unlock`), the in-memory key holder (`session`),
//! chat and credential sealing (`chat_envelope`, `credential_vault`), and
//! the attested, Noise-encrypted channel to the inference backend
//! (`attestation`, `noise`, `inference_channel`). It never opens a socket
//! or touches platform storage directly — those are the host
//! application's job, reached only through the traits in `external`.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod attestation;
pub mod audit;
pub mod chat_envelope;
pub mod context;
pub mod credential_vault;
pub mod crypto;
pub mod device_identity;
pub mod error;
pub mod external;
pub mod inference_channel;
pub mod noise;
pub mod prelude;
pub mod secure_store;
pub mod session;
pub mod share_splitter;
pub mod time;
pub mod unlock;

pub use context::{CoreContext, CoreContextConfig};
pub use error::{CoreError, CoreResult};

/// The crate's own version, exposed for diagnostics and audit logging.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
