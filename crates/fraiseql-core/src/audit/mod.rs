//! Tamper-evident audit log.
//!
//! Append-only events, each carrying a sha256 event hash over its canonical
//! form plus the previous event's hash, and an HMAC over that hash. Altering
//! any stored event breaks the chain exactly at that event, so integrity is
//! verifiable end-to-end per tenant. Storage is `tb_audit_event`.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Hash of the chain origin (no previous event).
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// One audit event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Monotonic per-tenant sequence.
    pub sequence: i64,

    /// Tenant the event belongs to.
    pub tenant_id: String,

    /// Action name (e.g. `mutation.createUser`).
    pub action: String,

    /// Actor identifier.
    pub actor: String,

    /// Event payload (arguments, affected ids).
    pub payload: serde_json::Value,

    /// Epoch milliseconds.
    pub ts_ms: i64,

    /// sha256 over (canonical event fields + previous event hash).
    pub event_hash: String,

    /// HMAC-SHA256 of `event_hash` under the audit key.
    pub hmac: String,
}

/// Where a verification walk failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainFailure {
    /// Recomputed event hash differs at this sequence.
    HashMismatch(i64),
    /// HMAC does not verify at this sequence.
    HmacMismatch(i64),
    /// Sequence numbers are not strictly increasing at this sequence.
    SequenceGap(i64),
}

/// Audit chain builder and verifier.
pub struct AuditChain {
    key: Vec<u8>,
}

impl AuditChain {
    /// Create a chain with the HMAC key.
    #[must_use]
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    /// Canonical byte form of the hashed portion of an event.
    fn canonical(event_core: &EventCore<'_>, previous_hash: &str) -> Vec<u8> {
        // Stable field order; the previous hash chains events together.
        let canonical = serde_json::json!({
            "sequence": event_core.sequence,
            "tenant_id": event_core.tenant_id,
            "action": event_core.action,
            "actor": event_core.actor,
            "payload": event_core.payload,
            "ts_ms": event_core.ts_ms,
            "previous": previous_hash,
        });
        serde_json::to_vec(&canonical).expect("canonical audit form serializes infallibly")
    }

    fn hash(&self, event_core: &EventCore<'_>, previous_hash: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(Self::canonical(event_core, previous_hash));
        hex::encode(hasher.finalize())
    }

    fn hmac(&self, event_hash: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(event_hash.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Seal a new event onto the chain.
    ///
    /// `previous_hash` is the last stored event's hash, or
    /// [`GENESIS_HASH`] for the first event of a tenant.
    #[must_use]
    pub fn seal(
        &self,
        sequence: i64,
        tenant_id: &str,
        action: &str,
        actor: &str,
        payload: serde_json::Value,
        ts_ms: i64,
        previous_hash: &str,
    ) -> AuditEvent {
        let core = EventCore {
            sequence,
            tenant_id,
            action,
            actor,
            payload: &payload,
            ts_ms,
        };
        let event_hash = self.hash(&core, previous_hash);
        let hmac = self.hmac(&event_hash);
        AuditEvent {
            sequence,
            tenant_id: tenant_id.to_string(),
            action: action.to_string(),
            actor: actor.to_string(),
            payload,
            ts_ms,
            event_hash,
            hmac,
        }
    }

    /// Verify a tenant's chain in sequence order.
    ///
    /// Recomputes every hash and HMAC; returns the first broken link.
    pub fn verify(&self, events: &[AuditEvent]) -> std::result::Result<(), ChainFailure> {
        let mut previous_hash = GENESIS_HASH.to_string();
        let mut previous_sequence = None;

        for event in events {
            if let Some(previous) = previous_sequence {
                if event.sequence <= previous {
                    return Err(ChainFailure::SequenceGap(event.sequence));
                }
            }
            let core = EventCore {
                sequence:  event.sequence,
                tenant_id: &event.tenant_id,
                action:    &event.action,
                actor:     &event.actor,
                payload:   &event.payload,
                ts_ms:     event.ts_ms,
            };
            let expected_hash = self.hash(&core, &previous_hash);
            if expected_hash != event.event_hash {
                return Err(ChainFailure::HashMismatch(event.sequence));
            }
            if self.hmac(&event.event_hash) != event.hmac {
                return Err(ChainFailure::HmacMismatch(event.sequence));
            }
            previous_hash = event.event_hash.clone();
            previous_sequence = Some(event.sequence);
        }
        Ok(())
    }
}

struct EventCore<'a> {
    sequence:  i64,
    tenant_id: &'a str,
    action:    &'a str,
    actor:     &'a str,
    payload:   &'a serde_json::Value,
    ts_ms:     i64,
}

/// INSERT statement for `tb_audit_event` (parameter order matches
/// [`AuditEvent`] field order).
pub const INSERT_AUDIT_EVENT_SQL: &str = "INSERT INTO \"tb_audit_event\" \
    (\"sequence\", \"tenant_id\", \"action\", \"actor\", \"payload\", \"ts_ms\", \"event_hash\", \"hmac\") \
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chain() -> AuditChain {
        AuditChain::new(b"test-audit-key".to_vec())
    }

    fn sample_chain(n: i64) -> Vec<AuditEvent> {
        let chain = chain();
        let mut events = Vec::new();
        let mut previous = GENESIS_HASH.to_string();
        for i in 1..=n {
            let event = chain.seal(
                i,
                "acme",
                "mutation.createUser",
                "admin@acme",
                json!({"id": format!("u{i}")}),
                1_722_500_000_000 + i,
                &previous,
            );
            previous = event.event_hash.clone();
            events.push(event);
        }
        events
    }

    #[test]
    fn test_valid_chain_verifies() {
        let events = sample_chain(5);
        assert_eq!(chain().verify(&events), Ok(()));
    }

    #[test]
    fn test_tampered_payload_breaks_at_event() {
        let mut events = sample_chain(5);
        events[2].payload = json!({"id": "evil"});
        assert_eq!(chain().verify(&events), Err(ChainFailure::HashMismatch(3)));
    }

    #[test]
    fn test_tampering_rehash_without_key_fails_hmac() {
        let chain = chain();
        let mut events = sample_chain(3);

        // An attacker who can recompute hashes but lacks the HMAC key.
        events[1].payload = json!({"id": "evil"});
        let core = EventCore {
            sequence:  events[1].sequence,
            tenant_id: &events[1].tenant_id,
            action:    &events[1].action,
            actor:     &events[1].actor,
            payload:   &events[1].payload,
            ts_ms:     events[1].ts_ms,
        };
        events[1].event_hash = chain.hash(&core, &events[0].event_hash);

        let result = chain.verify(&events);
        assert!(
            matches!(result, Err(ChainFailure::HmacMismatch(2) | ChainFailure::HashMismatch(3))),
            "either the forged HMAC or the broken link to event 3 must surface: {result:?}"
        );
    }

    #[test]
    fn test_wrong_key_fails() {
        let events = sample_chain(2);
        let other = AuditChain::new(b"different-key".to_vec());
        assert!(matches!(other.verify(&events), Err(ChainFailure::HmacMismatch(1))));
    }

    #[test]
    fn test_sequence_regression_detected() {
        let mut events = sample_chain(3);
        events[2].sequence = 2;
        assert_eq!(chain().verify(&events), Err(ChainFailure::SequenceGap(2)));
    }

    #[test]
    fn test_empty_chain_is_valid() {
        assert_eq!(chain().verify(&[]), Ok(()));
    }
}
