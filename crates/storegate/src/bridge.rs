//! Callback-style surface exposed to the embedding application.
//!
//! The app identifier is resolved per call in this order: the `appStoreId`
//! option, the static `app_store_id` setting, then the last identifier this
//! bridge resolved. Whatever resolves is remembered for later calls.
//!
//! When a [`ManagedUpdater`] is configured the store drives the update itself
//! and the catalog lookup is skipped.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use storegate_core::{
    CheckError, CatalogSource, PresentationGateway, PresentationOverrides, UpdateDecision,
    UpdateDecisionService,
};

pub const MISCONFIGURED_ERROR: &str = "APP_STORE_ID not configured";
pub const INVALID_URL_ERROR: &str = "Invalid URL";
pub const CHECK_FAILED_PREFIX: &str = "CHECK_FAILED: ";
pub const START_FAILED_PREFIX: &str = "START_FAILED: ";
pub const UNKNOWN_RESULT_ERROR: &str = "UNKNOWN_RESULT";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOptions {
    #[serde(default)]
    pub app_store_id: Option<String>,
    #[serde(default)]
    pub fake_version: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub button_text: Option<String>,
}

impl CheckOptions {
    /// Parse options passed across the bridge as JSON. `null` means no options.
    ///
    /// # Errors
    /// Returns an error when the JSON does not describe an options object.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let options: Option<Self> = serde_json::from_str(raw)?;
        Ok(options.unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeStatus {
    NoUpdate,
    UpdateShown,
    UpdateStarted,
    UpdateCancelled,
}

impl BridgeStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoUpdate => "NO_UPDATE",
            Self::UpdateShown => "UPDATE_SHOWN",
            Self::UpdateStarted => "UPDATE_STARTED",
            Self::UpdateCancelled => "UPDATE_CANCELLED",
        }
    }
}

/// Result reported by a store-managed update flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagedUpdateResult {
    Accepted,
    Cancelled,
    Other(i32),
}

/// Map a managed update flow result onto the bridge's callback strings.
///
/// # Errors
/// Returns `UNKNOWN_RESULT` for any result other than accepted or cancelled.
pub fn managed_update_status(result: ManagedUpdateResult) -> Result<BridgeStatus, String> {
    match result {
        ManagedUpdateResult::Accepted => Ok(BridgeStatus::UpdateStarted),
        ManagedUpdateResult::Cancelled => Ok(BridgeStatus::UpdateCancelled),
        ManagedUpdateResult::Other(code) => {
            log::warn!("Unknown managed update result: {code}");
            Err(UNKNOWN_RESULT_ERROR.to_string())
        }
    }
}

/// Store-managed immediate update flow.
#[async_trait]
pub trait ManagedUpdater: Send + Sync {
    /// Whether the store offers an update that may be installed immediately.
    async fn immediate_update_available(&self) -> Result<bool, String>;

    /// Start the immediate update flow and wait for the user's response.
    async fn start_immediate_update(&self) -> Result<ManagedUpdateResult, String>;
}

#[must_use]
pub fn start_failed(details: &str) -> String {
    format!("{START_FAILED_PREFIX}{details}")
}

#[must_use]
pub fn error_message(error: &CheckError) -> String {
    match error {
        CheckError::Misconfigured => MISCONFIGURED_ERROR.to_string(),
        CheckError::InvalidRequest { .. } => INVALID_URL_ERROR.to_string(),
        CheckError::CheckFailed(error) => format!("{CHECK_FAILED_PREFIX}{error}"),
    }
}

pub struct Bridge<C, G> {
    service: UpdateDecisionService<C, G>,
    configured_app_id: Option<String>,
    default_message: Option<String>,
    default_button_text: Option<String>,
    last_app_id: Mutex<Option<String>>,
    managed_updater: Option<Box<dyn ManagedUpdater>>,
}

impl<C: CatalogSource, G: PresentationGateway> Bridge<C, G> {
    #[must_use]
    pub fn new(service: UpdateDecisionService<C, G>, configured_app_id: Option<String>) -> Self {
        Self {
            service,
            configured_app_id: non_empty(configured_app_id.as_deref()),
            default_message: None,
            default_button_text: None,
            last_app_id: Mutex::new(None),
            managed_updater: None,
        }
    }

    #[must_use]
    pub fn with_managed_updater(mut self, updater: impl ManagedUpdater + 'static) -> Self {
        self.managed_updater = Some(Box::new(updater));
        self
    }

    /// Prompt text used when a call does not override it.
    #[must_use]
    pub fn with_default_text(
        mut self,
        message: Option<String>,
        button_text: Option<String>,
    ) -> Self {
        self.default_message = message;
        self.default_button_text = button_text;
        self
    }

    #[must_use]
    pub fn service(&self) -> &UpdateDecisionService<C, G> {
        &self.service
    }

    pub fn resolve_app_id(&self, per_call: Option<&str>) -> Option<String> {
        let mut last = self
            .last_app_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let resolved = non_empty(per_call)
            .or_else(|| self.configured_app_id.clone())
            .or_else(|| last.clone());

        if resolved.is_some() {
            last.clone_from(&resolved);
        }
        resolved
    }

    /// Run a check and map it onto the bridge's callback strings.
    ///
    /// # Errors
    /// Returns the error string handed to the caller's error callback.
    pub async fn check(&self, options: &CheckOptions) -> Result<BridgeStatus, String> {
        if let Some(updater) = &self.managed_updater {
            return run_managed_update(updater.as_ref()).await;
        }

        let app_id = self.resolve_app_id(options.app_store_id.as_deref());
        debug!("Running update check for app {app_id:?}");

        let overrides = PresentationOverrides {
            message: non_blank(options.message.as_deref())
                .or_else(|| self.default_message.clone()),
            button_text: non_blank(options.button_text.as_deref())
                .or_else(|| self.default_button_text.clone()),
            fake_version: options.fake_version.clone(),
        };

        match self.service.check(app_id.as_deref(), &overrides).await {
            Ok(UpdateDecision::NoUpdate) => Ok(BridgeStatus::NoUpdate),
            Ok(UpdateDecision::UpdateRequired { .. }) => Ok(BridgeStatus::UpdateShown),
            Err(error) => Err(error_message(&error)),
        }
    }

    /// Run a check and report through exactly one of the two callbacks.
    pub async fn check_and_update<S, E>(&self, success: S, error: E, options: &CheckOptions)
    where
        S: FnOnce(&str),
        E: FnOnce(&str),
    {
        match self.check(options).await {
            Ok(status) => success(status.as_str()),
            Err(message) => error(&message),
        }
    }
}

async fn run_managed_update(updater: &dyn ManagedUpdater) -> Result<BridgeStatus, String> {
    match updater.immediate_update_available().await {
        Err(details) => {
            log::warn!("Managed update check failed: {details}");
            Err(format!("{CHECK_FAILED_PREFIX}{details}"))
        }
        Ok(false) => {
            info!("No managed update available");
            Ok(BridgeStatus::NoUpdate)
        }
        Ok(true) => {
            info!("Managed update available; starting immediate flow");
            match updater.start_immediate_update().await {
                Ok(result) => managed_update_status(result),
                Err(details) => Err(start_failed(&details)),
            }
        }
    }
}

/// Keeps the text as given; only decides whether there is any.
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use storegate_core::{AppId, BlockingPrompt, CatalogError, DecisionConfig};

    use super::*;

    #[derive(Default)]
    struct RecordingCatalog {
        latest: &'static str,
        requested: Mutex<Vec<String>>,
    }

    impl RecordingCatalog {
        fn requested(&self) -> Vec<String> {
            self.requested.lock().expect("catalog lock").clone()
        }
    }

    #[async_trait]
    impl CatalogSource for RecordingCatalog {
        async fn fetch_latest_version(&self, app_id: &AppId) -> Result<String, CatalogError> {
            self.requested
                .lock()
                .expect("catalog lock")
                .push(app_id.to_string());
            Ok(self.latest.to_string())
        }
    }

    #[derive(Default)]
    struct RecordingGateway {
        shown: Mutex<Vec<BlockingPrompt>>,
    }

    #[async_trait]
    impl PresentationGateway for RecordingGateway {
        async fn show_blocking_prompt(&self, prompt: BlockingPrompt) {
            self.shown.lock().expect("gateway lock").push(prompt);
        }
    }

    fn bridge(
        latest: &'static str,
        configured: Option<&str>,
        require_app_id: bool,
    ) -> Bridge<RecordingCatalog, RecordingGateway> {
        let service = UpdateDecisionService::new(
            RecordingCatalog {
                latest,
                ..RecordingCatalog::default()
            },
            RecordingGateway::default(),
            DecisionConfig {
                require_app_id,
                installed_version: "1.0.0".to_string(),
            },
        );
        Bridge::new(service, configured.map(str::to_string))
    }

    fn options(app_store_id: Option<&str>) -> CheckOptions {
        CheckOptions {
            app_store_id: app_store_id.map(str::to_string),
            ..CheckOptions::default()
        }
    }

    #[test]
    fn options_parse_from_camel_case_json() {
        let parsed = CheckOptions::from_json(
            r#"{"appStoreId":"42","fakeVersion":"0.1","message":"Get {version}","buttonText":"Go"}"#,
        )
        .expect("options should parse");

        assert_eq!(parsed.app_store_id.as_deref(), Some("42"));
        assert_eq!(parsed.fake_version.as_deref(), Some("0.1"));
        assert_eq!(parsed.message.as_deref(), Some("Get {version}"));
        assert_eq!(parsed.button_text.as_deref(), Some("Go"));

        assert_eq!(
            CheckOptions::from_json("null").expect("null should parse"),
            CheckOptions::default()
        );
        assert_eq!(
            CheckOptions::from_json("{}").expect("empty object should parse"),
            CheckOptions::default()
        );
    }

    #[tokio::test]
    async fn per_call_id_beats_configured_id() {
        let bridge = bridge("1.0.0", Some("111"), true);

        bridge.check(&options(Some("222"))).await.expect("check succeeds");

        assert_eq!(bridge.service().catalog().requested(), vec!["222"]);
    }

    #[tokio::test]
    async fn configured_id_beats_remembered_id() {
        let bridge = bridge("1.0.0", Some("111"), true);

        bridge.check(&options(Some("222"))).await.expect("check succeeds");
        bridge.check(&options(None)).await.expect("check succeeds");

        assert_eq!(bridge.service().catalog().requested(), vec!["222", "111"]);
    }

    #[tokio::test]
    async fn remembered_id_is_used_when_nothing_else_is_supplied() {
        let bridge = bridge("1.0.0", None, true);

        bridge.check(&options(Some("333"))).await.expect("check succeeds");
        bridge.check(&options(Some("  "))).await.expect("check succeeds");

        assert_eq!(bridge.service().catalog().requested(), vec!["333", "333"]);
    }

    #[tokio::test]
    async fn missing_id_reports_configuration_error() {
        let bridge = bridge("1.0.0", None, true);

        let result = bridge.check(&options(None)).await;

        assert_eq!(result, Err(MISCONFIGURED_ERROR.to_string()));
    }

    #[tokio::test]
    async fn missing_id_reports_no_update_when_optional() {
        let bridge = bridge("9.0.0", None, false);

        let result = bridge.check(&options(None)).await;

        assert_eq!(result, Ok(BridgeStatus::NoUpdate));
        assert!(bridge.service().catalog().requested().is_empty());
    }

    #[tokio::test]
    async fn default_text_applies_unless_overridden() {
        let bridge = bridge("2.0.0", Some("1"), true)
            .with_default_text(Some("Need {version}".to_string()), Some("Store".to_string()));

        bridge.check(&options(None)).await.expect("check succeeds");
        let overridden = CheckOptions {
            message: Some("Now {version}".to_string()),
            ..CheckOptions::default()
        };
        bridge.check(&overridden).await.expect("check succeeds");

        let shown = bridge.service().gateway().shown.lock().expect("gateway lock").clone();
        assert_eq!(shown[0].message, "Need 2.0.0");
        assert_eq!(shown[0].button_text, "Store");
        assert_eq!(shown[1].message, "Now 2.0.0");
    }

    #[tokio::test]
    async fn callbacks_receive_literal_outcome_strings() {
        let bridge = bridge("2.0.0", Some("1"), true);
        let mut received = None;

        bridge
            .check_and_update(
                |status| received = Some(status.to_string()),
                |error| panic!("unexpected error callback: {error}"),
                &CheckOptions::default(),
            )
            .await;

        assert_eq!(received.as_deref(), Some("UPDATE_SHOWN"));
    }

    #[tokio::test]
    async fn blank_text_options_use_bridge_defaults() {
        let bridge = bridge("2.0.0", Some("1"), true)
            .with_default_text(Some("Need {version}".to_string()), Some("Store".to_string()));
        let blank = CheckOptions {
            message: Some("   ".to_string()),
            button_text: Some(String::new()),
            ..CheckOptions::default()
        };

        bridge.check(&blank).await.expect("check succeeds");

        let shown = bridge.service().gateway().shown.lock().expect("gateway lock").clone();
        assert_eq!(shown[0].message, "Need 2.0.0");
        assert_eq!(shown[0].button_text, "Store");
    }

    struct FakeUpdater {
        available: Result<bool, String>,
        start: Result<ManagedUpdateResult, String>,
        starts: AtomicUsize,
    }

    impl FakeUpdater {
        fn new(available: Result<bool, String>, start: Result<ManagedUpdateResult, String>) -> Self {
            Self {
                available,
                start,
                starts: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ManagedUpdater for FakeUpdater {
        async fn immediate_update_available(&self) -> Result<bool, String> {
            self.available.clone()
        }

        async fn start_immediate_update(&self) -> Result<ManagedUpdateResult, String> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            self.start.clone()
        }
    }

    async fn managed_outcome(updater: FakeUpdater) -> Result<BridgeStatus, String> {
        let bridge = bridge("9.0.0", Some("1"), true).with_managed_updater(updater);
        let result = bridge.check(&CheckOptions::default()).await;
        assert!(
            bridge.service().catalog().requested().is_empty(),
            "managed updates must not consult the catalog"
        );
        result
    }

    #[tokio::test]
    async fn managed_update_accepted_reports_started() {
        let outcome =
            managed_outcome(FakeUpdater::new(Ok(true), Ok(ManagedUpdateResult::Accepted))).await;
        assert_eq!(outcome, Ok(BridgeStatus::UpdateStarted));
    }

    #[tokio::test]
    async fn managed_update_cancelled_reports_cancelled() {
        let outcome =
            managed_outcome(FakeUpdater::new(Ok(true), Ok(ManagedUpdateResult::Cancelled))).await;
        assert_eq!(outcome, Ok(BridgeStatus::UpdateCancelled));
    }

    #[tokio::test]
    async fn managed_update_unknown_result_is_an_error() {
        let outcome =
            managed_outcome(FakeUpdater::new(Ok(true), Ok(ManagedUpdateResult::Other(2)))).await;
        assert_eq!(outcome, Err(UNKNOWN_RESULT_ERROR.to_string()));
    }

    #[tokio::test]
    async fn managed_update_start_failure_is_reported() {
        let outcome =
            managed_outcome(FakeUpdater::new(Ok(true), Err("no activity".to_string()))).await;
        assert_eq!(outcome, Err("START_FAILED: no activity".to_string()));
    }

    #[tokio::test]
    async fn managed_update_not_available_skips_the_flow() {
        let updater = FakeUpdater::new(Ok(false), Ok(ManagedUpdateResult::Accepted));
        let bridge = bridge("9.0.0", Some("1"), true).with_managed_updater(updater);

        let outcome = bridge.check(&CheckOptions::default()).await;

        assert_eq!(outcome, Ok(BridgeStatus::NoUpdate));
    }

    #[tokio::test]
    async fn managed_update_check_failure_is_check_failed() {
        let outcome = managed_outcome(FakeUpdater::new(
            Err("store unavailable".to_string()),
            Ok(ManagedUpdateResult::Accepted),
        ))
        .await;
        assert_eq!(outcome, Err("CHECK_FAILED: store unavailable".to_string()));
    }

    #[tokio::test]
    async fn managed_flow_starts_once_per_check() {
        let updater = FakeUpdater::new(Ok(true), Ok(ManagedUpdateResult::Accepted));
        let starts = run_managed_update(&updater).await.map(|_| updater.starts.load(Ordering::SeqCst));
        assert_eq!(starts, Ok(1));
    }

    #[test]
    fn error_messages_use_fixed_prefixes() {
        assert_eq!(error_message(&CheckError::Misconfigured), MISCONFIGURED_ERROR);
        assert_eq!(
            error_message(&CheckError::InvalidRequest {
                details: "bad base".to_string()
            }),
            INVALID_URL_ERROR
        );
        assert_eq!(
            error_message(&CheckError::CheckFailed(CatalogError::MalformedResponse {
                details: "eof".to_string()
            })),
            "CHECK_FAILED: Invalid response"
        );
    }

    #[test]
    fn managed_update_results_map_to_statuses() {
        assert_eq!(
            managed_update_status(ManagedUpdateResult::Accepted),
            Ok(BridgeStatus::UpdateStarted)
        );
        assert_eq!(
            managed_update_status(ManagedUpdateResult::Cancelled),
            Ok(BridgeStatus::UpdateCancelled)
        );
        assert_eq!(
            managed_update_status(ManagedUpdateResult::Other(7)),
            Err(UNKNOWN_RESULT_ERROR.to_string())
        );
        assert_eq!(start_failed("no activity"), "START_FAILED: no activity");
    }
}
