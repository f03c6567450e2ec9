//! The editing session adapter.
//!
//! [`EditorClient`] binds an editor widget to a shared document:
//! - user edits are submitted as operations tagged with the widget's source tag
//! - remote operations are applied to the widget, skipping echoes of our own
//! - the markdown preview is regenerated after every change
//! - broadcast payloads become notifications
//!
//! Events are handled by [`EditorClient::pump`], which drains editor
//! changes, document operations and broadcasts in that order. Subscription
//! completes inside [`EditorClient::connect`], so it always happens before
//! the first change or operation is handled.

use std::sync::mpsc::Receiver;
use std::time::Instant;

use tracing::{debug, warn};

use crate::delta::DeltaError;
use crate::editor::{ChangeSource, EditorWidget};
use crate::preview::{MarkdownPreview, PreviewSurface};
use crate::sync::{DOCUMENTS_COLLECTION, SharedDoc, SubmitOptions, SyncConnection, SyncError};
use crate::toast::{NotificationSink, ToastLevel};
use crate::transport::{BroadcastPayload, Transport, payload_message};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to open sync connection")]
    Connect(#[source] SyncError),
    #[error("subscription to document {document:?} failed")]
    Subscribe {
        document: String,
        #[source]
        source: SyncError,
    },
    #[error("failed to submit operation")]
    Submit(#[source] SyncError),
    #[error("failed to apply document change")]
    Apply(#[from] DeltaError),
}

/// Counts of what a single [`EditorClient::pump`] handled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PumpReport {
    /// User changes submitted to the shared document.
    pub submitted: usize,
    /// Changes that were not forwarded: programmatic ones, and any made
    /// while no document is bound.
    pub ignored_changes: usize,
    /// Remote operations applied to the editor.
    pub applied: usize,
    /// Echoes of our own submissions that were skipped.
    pub echoes_skipped: usize,
    /// Broadcasts shown as notifications.
    pub notifications: usize,
    /// Broadcasts without a usable message.
    pub malformed_broadcasts: usize,
}

impl PumpReport {
    /// Whether the content changed during the pump.
    pub const fn changed(&self) -> bool {
        self.submitted > 0 || self.applied > 0
    }
}

struct Session<C: SyncConnection> {
    _connection: C,
    doc: Option<C::Doc>,
    broadcasts: Receiver<BroadcastPayload>,
}

/// Adapter between an editor widget and a shared document.
pub struct EditorClient<C, E, P, N>
where
    C: SyncConnection,
{
    document_name: String,
    access_token: String,
    editor: E,
    converter: MarkdownPreview,
    preview: P,
    notifications: N,
    connected: bool,
    session: Option<Session<C>>,
}

impl<C, E, P, N> EditorClient<C, E, P, N>
where
    C: SyncConnection,
    E: EditorWidget,
    P: PreviewSurface,
    N: NotificationSink,
{
    /// Create a disconnected client for `document_name`.
    pub fn new(
        document_name: impl Into<String>,
        access_token: impl Into<String>,
        editor: E,
        preview: P,
        notifications: N,
    ) -> Self {
        Self {
            document_name: document_name.into(),
            access_token: access_token.into(),
            editor,
            converter: MarkdownPreview::new(),
            preview,
            notifications,
            connected: false,
            session: None,
        }
    }

    /// Connect to the sync service through `transport` and start editing.
    ///
    /// Returns `Ok(false)` without touching anything when the client is
    /// already connected; the given transport is dropped. The client counts
    /// as connected even when this returns an error, and there is no retry.
    /// Broadcasts stay bound when only the subscription failed.
    ///
    /// # Errors
    /// Returns [`ClientError::Connect`] when the connection cannot be opened,
    /// [`ClientError::Subscribe`] when the document subscription fails, and
    /// [`ClientError::Apply`] when the snapshot cannot be loaded.
    pub fn connect(&mut self, transport: Transport<C::Stream>) -> Result<bool, ClientError> {
        if self.connected {
            debug!(document = %self.document_name, "already connected, ignoring transport");
            return Ok(false);
        }
        self.connected = true;

        let Transport {
            diff_stream,
            broadcast_stream,
        } = transport;
        let mut connection = C::open(diff_stream).map_err(ClientError::Connect)?;
        let doc = connection.get(DOCUMENTS_COLLECTION, &self.document_name);
        self.session = Some(Session {
            _connection: connection,
            doc: None,
            broadcasts: broadcast_stream,
        });
        self.bind_events(doc)?;
        Ok(true)
    }

    fn bind_events(&mut self, mut doc: C::Doc) -> Result<(), ClientError> {
        doc.subscribe().map_err(|source| ClientError::Subscribe {
            document: self.document_name.clone(),
            source,
        })?;

        let snapshot = doc.data().unwrap_or_default();
        self.editor.set_contents(&snapshot)?;
        render_preview(&self.editor, self.converter, &mut self.preview);

        let stale = self.editor.drain_changes().len();
        debug!(document = %self.document_name, stale, "subscribed");

        if let Some(session) = self.session.as_mut() {
            session.doc = Some(doc);
        }
        Ok(())
    }

    /// Handle every pending event.
    ///
    /// `now` drives notification timing.
    ///
    /// # Errors
    /// Stops at the first submit or apply failure. Editor changes after a
    /// failed submit stay queued for the next pump.
    pub fn pump(&mut self, now: Instant) -> Result<PumpReport, ClientError> {
        let mut report = PumpReport::default();

        let doc_bound = self
            .session
            .as_ref()
            .is_some_and(|session| session.doc.is_some());
        if !doc_bound {
            let discarded = self.editor.drain_changes().len();
            if discarded > 0 {
                debug!(document = %self.document_name, discarded, "no document bound, dropping changes");
            }
            report.ignored_changes += discarded;
        }

        if let Some(session) = self.session.as_mut() {
            if let Some(doc) = session.doc.as_mut() {
                let tag = self.editor.source_tag();

                // One at a time, so a failed submit leaves the rest queued.
                while let Some(change) = self.editor.next_change() {
                    if change.source != ChangeSource::User {
                        report.ignored_changes += 1;
                        continue;
                    }
                    doc.submit_op(change.delta, SubmitOptions { source: tag })
                        .map_err(ClientError::Submit)?;
                    report.submitted += 1;
                    render_preview(&self.editor, self.converter, &mut self.preview);
                }

                while let Some(event) = doc.try_next_op() {
                    if event.source == Some(tag) {
                        report.echoes_skipped += 1;
                        continue;
                    }
                    self.editor.update_contents(&event.op)?;
                    report.applied += 1;
                    render_preview(&self.editor, self.converter, &mut self.preview);
                }
            }

            while let Ok(payload) = session.broadcasts.try_recv() {
                if let Some(message) = payload_message(&payload) {
                    self.notifications.show(message, ToastLevel::Info, now);
                    report.notifications += 1;
                } else {
                    warn!(?payload, "broadcast without a message field");
                    report.malformed_broadcasts += 1;
                }
            }
        }

        self.notifications.tick(now);
        if report != PumpReport::default() {
            debug!(document = %self.document_name, ?report, "pumped");
        }
        Ok(report)
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    /// Whether the shared document subscription is live.
    pub fn is_subscribed(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.doc.is_some())
    }

    /// The shared document handle, once subscribed.
    pub fn shared_doc(&self) -> Option<&C::Doc> {
        self.session.as_ref()?.doc.as_ref()
    }

    pub const fn editor(&self) -> &E {
        &self.editor
    }

    /// Mutable access to the editor, for feeding user input.
    pub const fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    pub const fn preview(&self) -> &P {
        &self.preview
    }

    pub const fn notifications(&self) -> &N {
        &self.notifications
    }
}

impl<C, E, P, N> std::fmt::Debug for EditorClient<C, E, P, N>
where
    C: SyncConnection,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorClient")
            .field("document_name", &self.document_name)
            .field("connected", &self.connected)
            .field(
                "subscribed",
                &self.session.as_ref().is_some_and(|s| s.doc.is_some()),
            )
            .finish_non_exhaustive()
    }
}

fn render_preview<E: EditorWidget, P: PreviewSurface>(
    editor: &E,
    converter: MarkdownPreview,
    surface: &mut P,
) {
    surface.set_html(converter.render(&editor.text()));
}
