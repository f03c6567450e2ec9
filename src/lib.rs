// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. editor::EditorBuffer)
    clippy::module_name_repetitions
)]

//! # sharedit
//!
//! Collaborative markdown editing with a live HTML preview.
//!
//! An [`EditorClient`](client::EditorClient) binds an editor widget to a
//! shared document on a sync service:
//! - user edits go out as operations tagged with the widget's source tag
//! - remote operations come in and are applied to the widget
//! - a markdown preview is re-rendered after every change
//! - broadcasts on the transport show up as short-lived notifications
//!
//! ## Architecture
//!
//! The sync engine, the editor widget and the output surfaces are traits;
//! the client only routes events between them. All events are drained
//! by [`EditorClient::pump`](client::EditorClient::pump) on the caller's
//! thread.
//!
//! ## Modules
//!
//! - [`client`]: The editing session adapter
//! - [`delta`]: Rich-text deltas
//! - [`editor`]: Editor widget contract and rope-backed widget
//! - [`sync`]: Sync connection contract and in-process service
//! - [`transport`]: Diff and broadcast streams
//! - [`preview`]: Markdown rendering
//! - [`toast`]: Notifications
//! - [`app`]: Local live-preview session used by the binary
//! - [`config`]: Saved command-line defaults
//! - [`watcher`]: File watching

pub mod app;
pub mod client;
pub mod config;
pub mod delta;
pub mod editor;
pub mod preview;
pub mod sync;
pub mod toast;
pub mod transport;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::{ClientError, EditorClient, PumpReport};
    pub use crate::delta::Delta;
    pub use crate::editor::{ChangeSource, EditorBuffer, EditorOptions, EditorWidget};
    pub use crate::preview::{HtmlSurface, PreviewSurface};
    pub use crate::sync::{SharedDoc, SyncConnection};
    pub use crate::toast::{NotificationSink, ToastStack};
    pub use crate::transport::Transport;
}
