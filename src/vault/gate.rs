//! Vault access gate.
//!
//! A two-state gate in front of the document vault: it starts locked on
//! every (re)entry and unlocks only after a verifier succeeds. The verifier
//! is pluggable so a real platform biometric/WebAuthn check can replace the
//! shipped fixed-delay simulation without touching the gating contract.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::VaultConfig;
use crate::error::VaultError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Locked,
    Unlocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Unlocked,
    Denied,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessGate: Send + Sync {
    async fn verify(&self) -> GateOutcome;
}

/// Stand-in for a platform biometric check: waits a fixed delay, then
/// reports success.
pub struct SimulatedBiometric {
    delay: Duration,
}

impl SimulatedBiometric {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_config(config: &VaultConfig) -> Self {
        Self::new(Duration::from_millis(config.unlock_delay_ms))
    }
}

#[async_trait]
impl AccessGate for SimulatedBiometric {
    async fn verify(&self) -> GateOutcome {
        tokio::time::sleep(self.delay).await;
        GateOutcome::Unlocked
    }
}

/// Gate state held per vault visit. Not sticky: construct a new one on every
/// navigation into the vault.
#[derive(Debug)]
pub struct VaultGate {
    state: GateState,
}

impl VaultGate {
    /// Entering the vault always starts locked.
    pub fn enter() -> Self {
        Self {
            state: GateState::Locked,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == GateState::Unlocked
    }

    pub async fn unlock(&mut self, verifier: &dyn AccessGate) -> Result<(), VaultError> {
        match verifier.verify().await {
            GateOutcome::Unlocked => {
                self.state = GateState::Unlocked;
                Ok(())
            }
            GateOutcome::Denied => Err(VaultError::VerificationDenied),
        }
    }

    /// Guard used by every vault read and intake entry point.
    pub fn require_unlocked(&self) -> Result<(), VaultError> {
        if self.is_unlocked() {
            Ok(())
        } else {
            Err(VaultError::Locked)
        }
    }
}
