//! Blocking prompt content and the UI thread that presents it.
//!
//! Every prompt is presented on one dedicated thread that owns the host's
//! [`PromptSurface`]. The thread removes any element carrying [`PROMPT_TAG`]
//! before presenting, so at most one blocking prompt is ever visible.

use std::thread::JoinHandle;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::oneshot;

use crate::catalog::AppId;

/// Well-known tag identifying the blocking prompt on a surface.
pub const PROMPT_TAG: u32 = 999_999;

pub const DEFAULT_MESSAGE: &str = "A new version ({version}) is required to keep using this app.";
pub const DEFAULT_BUTTON_TEXT: &str = "Update now";

const VERSION_PLACEHOLDER: &str = "{version}";
const STORE_LISTING_PREFIX: &str = "itms-apps://itunes.apple.com/app/id";
const UI_THREAD_NAME: &str = "storegate-ui";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingPrompt {
    pub latest_version: String,
    pub message: String,
    pub button_text: String,
    pub store_url: String,
}

impl BlockingPrompt {
    #[must_use]
    pub fn new(
        app_id: &AppId,
        latest_version: &str,
        message_template: Option<&str>,
        button_text: Option<&str>,
    ) -> Self {
        Self {
            latest_version: latest_version.to_string(),
            message: render_message(message_template.unwrap_or(DEFAULT_MESSAGE), latest_version),
            button_text: button_text.unwrap_or(DEFAULT_BUTTON_TEXT).to_string(),
            store_url: store_listing_url(app_id),
        }
    }
}

/// Substitute every `{version}` token in `template`.
#[must_use]
pub fn render_message(template: &str, latest_version: &str) -> String {
    template.replace(VERSION_PLACEHOLDER, latest_version)
}

#[must_use]
pub fn store_listing_url(app_id: &AppId) -> String {
    format!("{STORE_LISTING_PREFIX}{app_id}")
}

/// Receives the decision to block and shows the prompt.
///
/// Implementations must not return before the prompt has been handed to the
/// UI-owning context.
#[async_trait]
pub trait PresentationGateway: Send + Sync {
    async fn show_blocking_prompt(&self, prompt: BlockingPrompt);
}

/// Host-owned view hierarchy the prompt is drawn into.
///
/// Only ever called from the UI thread.
pub trait PromptSurface: Send + 'static {
    /// Remove the element tagged `tag`; returns whether one was present.
    fn remove_tagged(&mut self, tag: u32) -> bool;

    fn present(&mut self, tag: u32, prompt: &BlockingPrompt);
}

enum UiCommand {
    Show {
        prompt: BlockingPrompt,
        ack: oneshot::Sender<()>,
    },
    Dismiss {
        ack: oneshot::Sender<bool>,
    },
    Shutdown,
}

/// Handle to the UI-owning thread.
pub struct UiThread {
    sender: crossbeam_channel::Sender<UiCommand>,
    join_handle: Option<JoinHandle<()>>,
}

impl UiThread {
    /// Start the UI thread, moving `surface` onto it.
    ///
    /// # Errors
    /// Returns an error when the OS refuses to spawn the thread.
    pub fn spawn<S: PromptSurface>(mut surface: S) -> std::io::Result<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded::<UiCommand>();

        let join_handle = std::thread::Builder::new()
            .name(UI_THREAD_NAME.to_string())
            .spawn(move || {
                while let Ok(command) = receiver.recv() {
                    match command {
                        UiCommand::Show { prompt, ack } => {
                            if surface.remove_tagged(PROMPT_TAG) {
                                debug!("Replacing visible update prompt");
                            }
                            surface.present(PROMPT_TAG, &prompt);
                            debug!("Update prompt shown for version {}", prompt.latest_version);
                            let _ = ack.send(());
                        }
                        UiCommand::Dismiss { ack } => {
                            let _ = ack.send(surface.remove_tagged(PROMPT_TAG));
                        }
                        UiCommand::Shutdown => break,
                    }
                }
            })?;

        Ok(Self {
            sender,
            join_handle: Some(join_handle),
        })
    }

    /// Remove the prompt if one is visible; returns whether one was.
    pub async fn dismiss(&self) -> bool {
        let (ack, done) = oneshot::channel();
        if self.sender.send(UiCommand::Dismiss { ack }).is_err() {
            return false;
        }
        done.await.unwrap_or(false)
    }
}

#[async_trait]
impl PresentationGateway for UiThread {
    async fn show_blocking_prompt(&self, prompt: BlockingPrompt) {
        let (ack, done) = oneshot::channel();
        if self.sender.send(UiCommand::Show { prompt, ack }).is_err() {
            warn!("UI thread is gone; update prompt not shown");
            return;
        }
        if done.await.is_err() {
            warn!("UI thread stopped before presenting the update prompt");
        }
    }
}

impl Drop for UiThread {
    fn drop(&mut self) {
        let _ = self.sender.send(UiCommand::Shutdown);
        if let Some(join_handle) = self.join_handle.take() {
            let _ = join_handle.join();
        }
    }
}
