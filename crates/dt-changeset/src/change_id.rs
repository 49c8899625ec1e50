// change_id.rs — Content fingerprint for change requests.

use sha2::{Digest, Sha256};

/// Number of hex characters kept from the SHA-256 digest.
pub const CHANGE_ID_LEN: usize = 12;

/// Compute the fingerprint of a change: SHA-256 over
/// `summary || 0x00 || normalized_diff`, truncated to 12 hex characters.
///
/// Pure function of its inputs. Collisions are treated as duplicate requests.
pub fn compute_change_id(summary: &str, normalized_diff: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(summary.as_bytes());
    hasher.update([0u8]);
    hasher.update(normalized_diff.as_bytes());
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(CHANGE_ID_LEN);
    hex
}
