use std::collections::VecDeque;

use ropey::Rope;

use super::{ChangeSource, EditorOptions, EditorWidget, TextChange};
use crate::delta::{self, Delta, DeltaError};
use crate::sync::SourceTag;

/// A plain-text editor widget backed by a rope.
///
/// Every mutation is recorded as a [`TextChange`] until taken. The cursor
/// is a character index and follows edits made before it.
pub struct EditorBuffer {
    rope: Rope,
    cursor: usize,
    options: EditorOptions,
    tag: SourceTag,
    changes: VecDeque<TextChange>,
}

impl EditorBuffer {
    /// Create an empty widget.
    pub fn new(options: EditorOptions) -> Self {
        Self {
            rope: Rope::new(),
            cursor: 0,
            options,
            tag: SourceTag::unique(),
            changes: VecDeque::new(),
        }
    }

    pub const fn options(&self) -> &EditorOptions {
        &self.options
    }

    /// The cursor as a character index.
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Content length in characters.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Changes recorded but not yet taken.
    pub fn pending_changes(&self) -> usize {
        self.changes.len()
    }

    /// Insert `text` at character `index`.
    ///
    /// # Errors
    /// Fails when `index` is past the end of the content.
    pub fn insert_text(
        &mut self,
        index: usize,
        text: &str,
        source: ChangeSource,
    ) -> Result<(), DeltaError> {
        let mut change = Delta::new();
        change.retain(index).insert(text);
        self.apply(change, source)
    }

    /// Delete `len` characters starting at `index`.
    ///
    /// # Errors
    /// Fails when the range runs past the end of the content.
    pub fn delete_text(
        &mut self,
        index: usize,
        len: usize,
        source: ChangeSource,
    ) -> Result<(), DeltaError> {
        let mut change = Delta::new();
        change.retain(index).delete(len);
        self.apply(change, source)
    }

    /// Replace the whole content with `text`, recording only the difference.
    ///
    /// # Errors
    /// Never fails in practice; the diff is computed against the current text.
    pub fn replace_all(&mut self, text: &str, source: ChangeSource) -> Result<(), DeltaError> {
        let change = delta::diff(&self.rope.to_string(), text);
        self.apply(change, source)
    }

    /// Type `text` at the cursor as the user.
    pub fn type_str(&mut self, text: &str) {
        // The cursor is always within bounds.
        let typed = self.insert_text(self.cursor, text, ChangeSource::User);
        debug_assert!(typed.is_ok(), "cursor out of bounds: {typed:?}");
    }

    /// Move the cursor to a character index, clamped to the content.
    pub fn move_to(&mut self, index: usize) {
        self.cursor = index.min(self.rope.len_chars());
    }

    fn apply(&mut self, change: Delta, source: ChangeSource) -> Result<(), DeltaError> {
        if change.is_empty() {
            return Ok(());
        }
        change.apply_to(&mut self.rope)?;
        self.cursor = change
            .transform_position(self.cursor)
            .min(self.rope.len_chars());
        self.changes.push_back(TextChange {
            delta: change,
            source,
        });
        Ok(())
    }
}

impl EditorWidget for EditorBuffer {
    fn source_tag(&self) -> SourceTag {
        self.tag
    }

    fn set_contents(&mut self, contents: &Delta) -> Result<(), DeltaError> {
        if !contents.is_document() {
            return Err(DeltaError::NotDocument);
        }
        let mut change = Delta::new();
        change
            .insert(&contents.text())
            .delete(self.rope.len_chars());
        self.apply(change, ChangeSource::Api)?;
        self.cursor = 0;
        Ok(())
    }

    fn update_contents(&mut self, delta: &Delta) -> Result<(), DeltaError> {
        self.apply(delta.clone(), ChangeSource::Api)
    }

    fn text(&self) -> String {
        self.rope.to_string()
    }

    fn next_change(&mut self) -> Option<TextChange> {
        self.changes.pop_front()
    }
}

impl std::fmt::Debug for EditorBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorBuffer")
            .field(
                "rope",
                &format_args!("Rope({} chars)", self.rope.len_chars()),
            )
            .field("cursor", &self.cursor)
            .field("tag", &self.tag)
            .field("pending_changes", &self.changes.len())
            .finish()
    }
}
