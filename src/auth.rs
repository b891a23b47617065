use crate::config::DashboardConfig;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Shared-secret access gate. Configuration carries only SHA-256 digests of
/// the accepted passwords; a candidate is hashed and checked for membership,
/// so plaintext secrets never live in config or memory beyond the attempt.
#[derive(Debug, Clone)]
pub struct PasswordGate {
    digests: HashSet<String>,
}

impl PasswordGate {
    /// Builds a gate from lowercase hex SHA-256 digests. Digests are
    /// normalized to lowercase on the way in.
    pub fn new<I, S>(digests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            digests: digests
                .into_iter()
                .map(|digest| digest.into().to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(config.keys.iter().cloned())
    }

    /// Whether the candidate password unlocks the dashboard.
    pub fn verify(&self, password: &str) -> bool {
        self.digests.contains(&hash_password(password))
    }

    /// An empty gate admits nobody.
    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    // SHA-256 of "letmein".
    const LETMEIN_DIGEST: &str = "1c8bfe8f801d79745c4631d09fff36c82aa37fc4cce4fc946683d7b336b63032";

    #[test]
    fn test_accepts_known_password() {
        let gate = PasswordGate::new([LETMEIN_DIGEST]);
        assert!(gate.verify("letmein"));
        assert!(!gate.verify("LETMEIN"));
        assert!(!gate.verify(""));
    }

    #[test]
    fn test_digest_case_is_normalized() {
        let gate = PasswordGate::new([LETMEIN_DIGEST.to_uppercase()]);
        assert!(gate.verify("letmein"));
    }

    #[test]
    fn test_empty_gate_rejects_everything() {
        let gate = PasswordGate::new(Vec::<String>::new());
        assert!(gate.is_empty());
        assert!(!gate.verify("anything"));
    }
}
