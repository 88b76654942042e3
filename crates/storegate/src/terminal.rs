use std::io::Write;

use storegate_core::{BlockingPrompt, PromptSurface};
use storegate_platform::StoreOpener;

const BANNER_WIDTH: usize = 60;

/// Draws the blocking prompt as a boxed banner on a terminal stream.
///
/// When `open_store` is set, the button is considered pressed as soon as the
/// prompt is drawn and the store listing is opened.
pub struct TerminalSurface<W, O> {
    out: W,
    opener: O,
    open_store: bool,
    visible: Option<u32>,
}

impl<W: Write + Send + 'static, O: StoreOpener + 'static> TerminalSurface<W, O> {
    pub fn new(out: W, opener: O, open_store: bool) -> Self {
        Self {
            out,
            opener,
            open_store,
            visible: None,
        }
    }

    fn draw(&mut self, prompt: &BlockingPrompt) -> std::io::Result<()> {
        let border = "─".repeat(BANNER_WIDTH);
        writeln!(self.out, "┌{border}┐")?;
        for line in wrap(&prompt.message, BANNER_WIDTH - 2) {
            writeln!(self.out, "│ {line:<width$} │", width = BANNER_WIDTH - 2)?;
        }
        writeln!(self.out, "│{:width$}│", "", width = BANNER_WIDTH)?;
        let button = format!("[ {} ]", prompt.button_text);
        writeln!(self.out, "│{button:^width$}│", width = BANNER_WIDTH)?;
        writeln!(self.out, "└{border}┘")?;
        writeln!(self.out, "{}", prompt.store_url)?;
        self.out.flush()
    }
}

impl<W: Write + Send + 'static, O: StoreOpener + 'static> PromptSurface for TerminalSurface<W, O> {
    fn remove_tagged(&mut self, tag: u32) -> bool {
        if self.visible == Some(tag) {
            self.visible = None;
            true
        } else {
            false
        }
    }

    fn present(&mut self, tag: u32, prompt: &BlockingPrompt) {
        if let Err(error) = self.draw(prompt) {
            log::debug!("Could not draw update prompt: {error}");
        }
        self.visible = Some(tag);
        if self.open_store {
            self.opener.open_listing(&prompt.store_url);
        }
    }
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
