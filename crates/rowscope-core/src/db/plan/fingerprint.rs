//! Deterministic plan fingerprinting derived from the explain text.

use crate::db::plan::QueryPlan;
use sha2::{Digest, Sha256};
use std::fmt::{self, Write as _};

///
/// PlanFingerprint
///
/// Stable SHA-256 fingerprint of a plan; carried in log fields so equal
/// plans can be correlated across requests.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PlanFingerprint([u8; 32]);

impl PlanFingerprint {
    #[must_use]
    pub fn as_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in self.0 {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

impl fmt::Display for PlanFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_hex())
    }
}

impl QueryPlan {
    /// Compute a stable fingerprint for this plan.
    #[must_use]
    pub fn fingerprint(&self) -> PlanFingerprint {
        let mut hasher = Sha256::new();
        hasher.update(b"planfp:v1");
        write_str(&mut hasher, self.entity());
        write_str(&mut hasher, &self.mode().to_string());
        write_str(&mut hasher, &self.explain());

        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);

        PlanFingerprint(out)
    }
}

// Length-prefixed so adjacent fields cannot collide.
fn write_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}
