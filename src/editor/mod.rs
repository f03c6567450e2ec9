//! Editor widget contract and the rope-backed reference widget.
//!
//! A widget reports every content change as a [`TextChange`] tagged with
//! where it came from, so a sync client can forward only what the user typed.

mod buffer;

pub use buffer::EditorBuffer;

use crate::delta::{Delta, DeltaError};
use crate::sync::SourceTag;

/// Visual theme of the editor widget.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    /// Toolbar-style chrome around the text area.
    #[default]
    Snow,
    /// Floating tooltip chrome.
    Bubble,
}

/// Construction options for an editor widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorOptions {
    pub theme: Theme,
    /// Whether a text-formatting toolbar is shown.
    pub toolbar: bool,
    /// Formats the widget accepts. Empty means plain text only.
    pub formats: Vec<String>,
}

impl EditorOptions {
    /// Fixed theme, no toolbar, no formats.
    pub const fn plain() -> Self {
        Self {
            theme: Theme::Snow,
            toolbar: false,
            formats: Vec::new(),
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self::plain()
    }
}

/// Origin of a content change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    /// Typed or pasted by the user.
    User,
    /// Applied programmatically.
    Api,
    /// Applied programmatically without notifying anyone.
    Silent,
}

/// A content change reported by an editor widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    pub delta: Delta,
    pub source: ChangeSource,
}

/// A rich-text editing surface.
pub trait EditorWidget {
    /// Tag this widget submits its operations under.
    fn source_tag(&self) -> SourceTag;

    /// Replace the whole content with a document delta.
    ///
    /// # Errors
    /// Fails when `contents` is not an insert-only document.
    fn set_contents(&mut self, contents: &Delta) -> Result<(), DeltaError>;

    /// Apply a change delta programmatically.
    ///
    /// # Errors
    /// Fails when the delta reads past the end of the content.
    fn update_contents(&mut self, delta: &Delta) -> Result<(), DeltaError>;

    /// Plain-text content.
    fn text(&self) -> String;

    /// Take the oldest change not yet taken.
    fn next_change(&mut self) -> Option<TextChange>;

    /// Take all pending changes, oldest first.
    fn drain_changes(&mut self) -> Vec<TextChange> {
        std::iter::from_fn(|| self.next_change()).collect()
    }
}
