//! Convenient re-exports for common usage.

pub use crate::attestation::{AttestationFetcher, AttestationReport, AttestationVerifier, TrustRoot};
pub use crate::chat_envelope::{ChatBody, ChatEnvelope, ChatKey, ChatKeyCache, ChatMessage};
pub use crate::context::{CoreContext, CoreContextConfig};
pub use crate::credential_vault::{CredentialRow, CredentialVault, DecryptedCredential};
pub use crate::device_identity::{DeviceIdentity, PlatformInfo};
pub use crate::error::{CoreError, CoreResult};
pub use crate::external::{BlobStore, Clock, DeviceRegistry, KeyShareStore, PasskeyProvider, SystemClock, Token};
pub use crate::inference_channel::{InferenceChannel, Transport};
pub use crate::noise::{NoiseNkInitiator, NoiseNkResponder, TransportKeys};
pub use crate::secure_store::{MemorySecureStore, SecureStore, StorePolicy};
pub use crate::session::{SecureSession, SessionConfig};
pub use crate::share_splitter::{self, SplitShares};
pub use crate::unlock::{PasswordEnvelope, SetupResult, UnlockPaths};

pub use crate::VERSION;
