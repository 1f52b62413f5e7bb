//! Diagnostic endpoint gating

use serde::Deserialize;

use super::error::ValidationError;

/// Secrets and flags for the `/ops` surface
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpsConfig {
    /// Shared secret for `/ops/order-status`, `/ops/reconcile` and `/ops/metrics`
    pub diag_secret: Option<String>,

    /// Token for the webhook self-probe
    pub admin_probe_token: Option<String>,

    /// Mounts `/ops/health/mp-webhook` when set together with a probe token
    #[serde(default)]
    pub enable_webhook_health: bool,
}

impl OpsConfig {
    pub fn diagnostics_enabled(&self) -> bool {
        self.diag_secret.is_some()
    }

    pub fn webhook_health_enabled(&self) -> bool {
        self.enable_webhook_health && self.admin_probe_token.is_some()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enable_webhook_health && self.admin_probe_token.is_none() {
            return Err(ValidationError::HealthProbeWithoutToken);
        }
        Ok(())
    }
}
