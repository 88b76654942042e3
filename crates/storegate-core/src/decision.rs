use log::{debug, info, warn};
use thiserror::Error;

use crate::catalog::{AppId, CatalogError, CatalogSource};
use crate::prompt::{BlockingPrompt, PresentationGateway};
use crate::version::{has_dropped_segments, is_older};

/// Caller-supplied tweaks scoped to a single check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresentationOverrides {
    /// May contain `{version}`, replaced with the latest catalog version.
    pub message: Option<String>,
    pub button_text: Option<String>,
    /// Replaces the installed version in the comparison. Test-only.
    pub fake_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionConfig {
    /// When set, a missing app identifier is an error instead of `NO_UPDATE`.
    pub require_app_id: bool,
    /// Version of the running application, read from its own metadata.
    pub installed_version: String,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            require_app_id: true,
            installed_version: "0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeCode {
    NoUpdate,
    UpdateRequired,
    CheckFailed,
    Misconfigured,
}

impl OutcomeCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoUpdate => "NO_UPDATE",
            Self::UpdateRequired => "UPDATE_REQUIRED",
            Self::CheckFailed => "CHECK_FAILED",
            Self::Misconfigured => "MISCONFIGURED",
        }
    }
}

impl std::fmt::Display for OutcomeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateDecision {
    NoUpdate,
    UpdateRequired {
        current_version: String,
        latest_version: String,
    },
}

impl UpdateDecision {
    #[must_use]
    pub fn code(&self) -> OutcomeCode {
        match self {
            Self::NoUpdate => OutcomeCode::NoUpdate,
            Self::UpdateRequired { .. } => OutcomeCode::UpdateRequired,
        }
    }
}

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("no app store identifier configured")]
    Misconfigured,
    #[error("{details}")]
    InvalidRequest { details: String },
    #[error(transparent)]
    CheckFailed(CatalogError),
}

impl CheckError {
    #[must_use]
    pub fn code(&self) -> OutcomeCode {
        match self {
            Self::Misconfigured => OutcomeCode::Misconfigured,
            Self::InvalidRequest { .. } | Self::CheckFailed(_) => OutcomeCode::CheckFailed,
        }
    }
}

impl From<CatalogError> for CheckError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::InvalidUrl { details } => Self::InvalidRequest { details },
            other => Self::CheckFailed(other),
        }
    }
}

/// Decides whether the running app must be blocked behind an update prompt.
pub struct UpdateDecisionService<C, G> {
    catalog: C,
    gateway: G,
    config: DecisionConfig,
}

impl<C: CatalogSource, G: PresentationGateway> UpdateDecisionService<C, G> {
    #[must_use]
    pub fn new(catalog: C, gateway: G, config: DecisionConfig) -> Self {
        Self {
            catalog,
            gateway,
            config,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Run one update check.
    ///
    /// On [`UpdateDecision::UpdateRequired`] the prompt has already been
    /// handed to the gateway when this returns.
    ///
    /// # Errors
    /// Returns [`CheckError::Misconfigured`] when no identifier is given and
    /// one is required, and a catalog-derived error when the lookup fails.
    pub async fn check(
        &self,
        app_id: Option<&str>,
        overrides: &PresentationOverrides,
    ) -> Result<UpdateDecision, CheckError> {
        let Some(app_id) = AppId::parse(app_id) else {
            if self.config.require_app_id {
                warn!("Update check skipped: no app store identifier configured");
                return Err(CheckError::Misconfigured);
            }
            info!("No app store identifier configured; treating as no update");
            return Ok(UpdateDecision::NoUpdate);
        };

        let latest = self
            .catalog
            .fetch_latest_version(&app_id)
            .await
            .map_err(|error| {
                warn!("Update check for app {app_id} failed: {error}");
                CheckError::from(error)
            })?;

        let current =
            non_blank(overrides.fake_version.as_deref()).unwrap_or(&self.config.installed_version);

        for version in [current, latest.as_str()] {
            if has_dropped_segments(version) {
                warn!("Version '{version}' has non-numeric segments; they are ignored");
            }
        }

        debug!("Comparing installed version {current} with catalog version {latest}");

        if !is_older(current, &latest) {
            info!("App is up to date ({current})");
            return Ok(UpdateDecision::NoUpdate);
        }

        info!("Update required: {current} -> {latest}");
        let prompt = BlockingPrompt::new(
            &app_id,
            &latest,
            non_blank(overrides.message.as_deref()),
            non_blank(overrides.button_text.as_deref()),
        );
        self.gateway.show_blocking_prompt(prompt).await;

        Ok(UpdateDecision::UpdateRequired {
            current_version: current.to_string(),
            latest_version: latest,
        })
    }
}

/// Blank overrides count as absent.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}
