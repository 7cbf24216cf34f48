//! Process-wide current policy with copy-on-write updates.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use super::{PolicyError, PolicySummary, TestPolicy};

/// Holds the current [`TestPolicy`].
///
/// Readers take an `Arc` snapshot and keep using it for a whole generation
/// run; writers swap in a new value, so in-flight runs never observe a
/// half-applied profile switch.
#[derive(Debug)]
pub struct PolicyStore {
    current: RwLock<Arc<TestPolicy>>,
}

impl PolicyStore {
    pub fn new(policy: TestPolicy) -> Self {
        Self {
            current: RwLock::new(Arc::new(policy)),
        }
    }

    /// Store seeded from a policy file.
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        Ok(Self::new(TestPolicy::load(path)?))
    }

    /// The policy as of now. Later switches do not affect the returned value.
    pub async fn snapshot(&self) -> Arc<TestPolicy> {
        Arc::clone(&*self.current.read().await)
    }

    /// Replace the current policy with `name` applied. On error the current
    /// policy is left as it was.
    pub async fn switch_profile(&self, name: &str) -> Result<PolicySummary, PolicyError> {
        let mut guard = self.current.write().await;
        let next = guard.apply_profile(name)?;
        let summary = next.summary();
        *guard = Arc::new(next);

        info!(
            profile = name,
            tests_per_endpoint = summary.tests_per_endpoint,
            "Switched test profile"
        );
        Ok(summary)
    }

    /// Re-read the policy file and replace the current policy.
    pub async fn reload(&self, path: &Path) -> Result<(), PolicyError> {
        let policy = TestPolicy::load(path)?;
        *self.current.write().await = Arc::new(policy);
        info!(path = %path.display(), "Reloaded test policy");
        Ok(())
    }

    /// Replace the current policy with an already-built value.
    pub async fn replace(&self, policy: TestPolicy) {
        *self.current.write().await = Arc::new(policy);
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new(TestPolicy::builtin())
    }
}
