//! `AttestationVerifier` (spec §4.9). Grounded on
//! `other_examples/.../tangle-network-blueprint/.../exchange-protocol.rs`'s
//! `AttestationReport`/TTL-and-freshness shape.

use crate::error::CoreError;
use crate::time::current_time_millis;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_CLOCK_SKEW_TOLERANCE_MS: u64 = 5 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationReport {
    pub attestation_type: String,
    pub server_static_pub_key: [u8; 32],
    pub claims: std::collections::HashMap<String, String>,
    pub valid_until_ms: u64,
}

/// Raw bytes fetched from the attestation endpoint, plus the discriminator
/// that identifies which vendor family parsed it.
pub struct RawAttestationDocument {
    pub attestation_type: String,
    pub body: Vec<u8>,
    pub signature: Vec<u8>,
}

/// A trust root for one attestation family, embedded in the binary at
/// build/deploy time.
#[derive(Debug, Clone)]
pub struct TrustRoot {
    pub attestation_type: String,
    pub root_public_key: [u8; 32],
    pub version: u32,
}

/// Fetches the attestation document from an HTTPS endpoint. Implemented by
/// the host application (the core doesn't open sockets, per §6).
#[async_trait]
pub trait AttestationFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<RawAttestationDocument, CoreError>;
}

pub struct AttestationVerifier<'a> {
    fetcher: &'a dyn AttestationFetcher,
    trust_roots: Vec<TrustRoot>,
    fetch_timeout_ms: u64,
    clock_skew_tolerance_ms: u64,
}

impl<'a> AttestationVerifier<'a> {
    pub fn new(fetcher: &'a dyn AttestationFetcher, trust_roots: Vec<TrustRoot>) -> Self {
        Self {
            fetcher,
            trust_roots,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            clock_skew_tolerance_ms: DEFAULT_CLOCK_SKEW_TOLERANCE_MS,
        }
    }

    pub async fn verify(&self, attestation_url: &str) -> Result<AttestationReport, CoreError> {
        let doc = self
            .fetcher
            .fetch(attestation_url, Duration::from_millis(self.fetch_timeout_ms))
            .await?;

        let root = self
            .trust_roots
            .iter()
            .find(|r| r.attestation_type == doc.attestation_type)
            .ok_or_else(|| CoreError::AttestationInvalid {
                reason: format!("unrecognized attestation family: {}", doc.attestation_type),
            })?;

        self.verify_signature(&doc, root)?;

        let report: AttestationReport = serde_json::from_slice(&doc.body).map_err(|e| CoreError::AttestationInvalid {
            reason: format!("malformed claims: {}", e),
        })?;

        self.check_freshness(&report)?;

        if report.server_static_pub_key.len() != 32 {
            return Err(CoreError::AttestationInvalid {
                reason: "static key must be 32 bytes".to_string(),
            });
        }

        Ok(report)
    }

    fn verify_signature(&self, doc: &RawAttestationDocument, root: &TrustRoot) -> Result<(), CoreError> {
        use ed25519_dalek::Verifier;

        if doc.signature.is_empty() {
            return Err(CoreError::AttestationInvalid {
                reason: "missing signature".to_string(),
            });
        }
        let signature_bytes: [u8; 64] = doc.signature.as_slice().try_into().map_err(|_| CoreError::AttestationInvalid {
            reason: "signature must be 64 bytes".to_string(),
        })?;
        let signature = ed25519_dalek::Signature::from_bytes(&signature_bytes);
        let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(&root.root_public_key).map_err(|_| CoreError::AttestationInvalid {
            reason: "malformed trust root key".to_string(),
        })?;
        verifying_key.verify(&doc.body, &signature).map_err(|_| CoreError::AttestationInvalid {
            reason: "signature verification failed".to_string(),
        })
    }

    fn check_freshness(&self, report: &AttestationReport) -> Result<(), CoreError> {
        let now = current_time_millis();
        if now > report.valid_until_ms.saturating_add(self.clock_skew_tolerance_ms) {
            return Err(CoreError::AttestationInvalid {
                reason: "attestation expired".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    struct FakeFetcher {
        doc: RawAttestationDocument,
    }

    #[async_trait]
    impl AttestationFetcher for FakeFetcher {
        async fn fetch(&self, _url: &str, _timeout: Duration) -> Result<RawAttestationDocument, CoreError> {
            Ok(RawAttestationDocument {
                attestation_type: self.doc.attestation_type.clone(),
                body: self.doc.body.clone(),
                signature: self.doc.signature.clone(),
            })
        }
    }

    fn sample_report(valid_until_ms: u64) -> Vec<u8> {
        let report = AttestationReport {
            attestation_type: "sample-tee".to_string(),
            server_static_pub_key: [0x11u8; 32],
            claims: std::collections::HashMap::new(),
            valid_until_ms,
        };
        serde_json::to_vec(&report).unwrap()
    }

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[0x42u8; 32])
    }

    fn trust_root(signing_key: &SigningKey) -> TrustRoot {
        TrustRoot {
            attestation_type: "sample-tee".to_string(),
            root_public_key: signing_key.verifying_key().to_bytes(),
            version: 1,
        }
    }

    #[tokio::test]
    async fn test_verify_success() {
        let signing_key = signing_key();
        let body = sample_report(current_time_millis() + 60_000);
        let signature = signing_key.sign(&body);
        let fetcher = FakeFetcher {
            doc: RawAttestationDocument {
                attestation_type: "sample-tee".to_string(),
                body,
                signature: signature.to_bytes().to_vec(),
            },
        };
        let roots = vec![trust_root(&signing_key)];
        let verifier = AttestationVerifier::new(&fetcher, roots);
        let report = verifier.verify("https://tee.example/attest").await.unwrap();
        assert_eq!(report.server_static_pub_key, [0x11u8; 32]);
    }

    #[tokio::test]
    async fn test_unrecognized_family_rejected() {
        let signing_key = signing_key();
        let body = sample_report(current_time_millis() + 60_000);
        let signature = signing_key.sign(&body);
        let fetcher = FakeFetcher {
            doc: RawAttestationDocument {
                attestation_type: "unknown-tee".to_string(),
                body,
                signature: signature.to_bytes().to_vec(),
            },
        };
        let verifier = AttestationVerifier::new(&fetcher, vec![]);
        assert!(verifier.verify("https://tee.example/attest").await.is_err());
    }

    #[tokio::test]
    async fn test_stale_report_rejected() {
        let signing_key = signing_key();
        let body = sample_report(0); // expired long ago
        let signature = signing_key.sign(&body);
        let fetcher = FakeFetcher {
            doc: RawAttestationDocument {
                attestation_type: "sample-tee".to_string(),
                body,
                signature: signature.to_bytes().to_vec(),
            },
        };
        let roots = vec![trust_root(&signing_key)];
        let verifier = AttestationVerifier::new(&fetcher, roots);
        assert!(verifier.verify("https://tee.example/attest").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_signature_rejected() {
        let signing_key = signing_key();
        let body = sample_report(current_time_millis() + 60_000);
        let fetcher = FakeFetcher {
            doc: RawAttestationDocument {
                attestation_type: "sample-tee".to_string(),
                body,
                signature: vec![],
            },
        };
        let roots = vec![trust_root(&signing_key)];
        let verifier = AttestationVerifier::new(&fetcher, roots);
        assert!(verifier.verify("https://tee.example/attest").await.is_err());
    }

    #[tokio::test]
    async fn test_forged_signature_rejected() {
        let signing_key = signing_key();
        let wrong_signing_key = SigningKey::from_bytes(&[0x43u8; 32]);
        let body = sample_report(current_time_millis() + 60_000);
        let forged_signature = wrong_signing_key.sign(&body);
        let fetcher = FakeFetcher {
            doc: RawAttestationDocument {
                attestation_type: "sample-tee".to_string(),
                body,
                signature: forged_signature.to_bytes().to_vec(),
            },
        };
        let roots = vec![trust_root(&signing_key)];
        let verifier = AttestationVerifier::new(&fetcher, roots);
        assert!(verifier.verify("https://tee.example/attest").await.is_err());
    }
}
