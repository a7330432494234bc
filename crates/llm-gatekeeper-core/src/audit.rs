//! Decision audit events.
//!
//! One structured event per decision. Content is identified by its SHA-256
//! digest; neither the text nor any vault mapping is ever logged.

use crate::decision::Decision;
use crate::scanner::Direction;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

/// Log target for audit events, so operators can route them separately.
pub const AUDIT_TARGET: &str = "gatekeeper::audit";

/// Hex SHA-256 digest of `content`.
pub fn content_digest(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Emit the audit event for one direction's decision.
pub fn record_decision(
    request_id: &str,
    direction: Direction,
    policy: &str,
    decision: &Decision,
    content: &str,
) {
    let digest = content_digest(content);
    let scores = decision.summary();

    if decision.accepted {
        info!(
            target: AUDIT_TARGET,
            request_id,
            %direction,
            policy,
            accepted = true,
            %scores,
            content_sha256 = %digest,
            "content accepted"
        );
    } else {
        warn!(
            target: AUDIT_TARGET,
            request_id,
            %direction,
            policy,
            accepted = false,
            failing = ?decision.failing_scanners(),
            %scores,
            content_sha256 = %digest,
            "content rejected"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_stable_and_opaque() {
        let digest = content_digest("My SSN is 123-45-6789");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, content_digest("My SSN is 123-45-6789"));
        assert_ne!(digest, content_digest("My SSN is [REDACTED_SSN_1]"));
        assert!(!digest.contains("6789"));
    }

    #[test]
    fn test_empty_digest() {
        assert_eq!(
            content_digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
