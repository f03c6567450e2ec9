//! In-process sync service.
//!
//! Stands in for a networked sync server: every transport handed out by a
//! [`MemoryServer`] shares its document store. Operations are applied in
//! arrival order with no transformation, so concurrent edits against stale
//! versions are not reconciled.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ropey::Rope;

use super::{OpEvent, SharedDoc, SubmitOptions, SyncConnection, SyncError};
use crate::delta::Delta;
use crate::transport::{BroadcastPayload, Transport, message_payload};

type DocKey = (String, String);

#[derive(Default)]
struct StoredDoc {
    text: Rope,
    version: u64,
    rejection: Option<String>,
    subscribers: Vec<(u64, Sender<OpEvent>)>,
}

#[derive(Default)]
struct ServerState {
    docs: HashMap<DocKey, StoredDoc>,
    broadcasts: Vec<Sender<BroadcastPayload>>,
    next_client: u64,
    shut_down: bool,
}

/// Shared handle to an in-process sync service.
#[derive(Clone, Default)]
pub struct MemoryServer {
    state: Arc<Mutex<ServerState>>,
}

impl std::fmt::Debug for MemoryServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("MemoryServer")
            .field("docs", &state.docs.len())
            .field("shut_down", &state.shut_down)
            .finish_non_exhaustive()
    }
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a transport with a fresh client identity.
    pub fn transport(&self) -> Transport<MemoryStream> {
        let (tx, rx) = mpsc::channel();
        let mut state = self.state();
        state.broadcasts.push(tx);
        let client_id = state.next_client;
        state.next_client += 1;
        Transport::new(
            MemoryStream {
                server: self.clone(),
                client_id,
            },
            rx,
        )
    }

    /// Replace the content of a document.
    pub fn seed(&self, collection: &str, id: &str, text: &str) {
        let mut state = self.state();
        let doc = state.docs.entry(key(collection, id)).or_default();
        doc.text = Rope::from_str(text);
        doc.version += 1;
    }

    /// Refuse every future subscription to a document.
    pub fn reject_subscriptions(&self, collection: &str, id: &str, reason: &str) {
        self.state()
            .docs
            .entry(key(collection, id))
            .or_default()
            .rejection = Some(reason.to_string());
    }

    /// Current text of a document, if it exists.
    pub fn text(&self, collection: &str, id: &str) -> Option<String> {
        self.state()
            .docs
            .get(&key(collection, id))
            .map(|doc| doc.text.to_string())
    }

    /// Number of operations applied to a document since it was created.
    pub fn version(&self, collection: &str, id: &str) -> u64 {
        self.state()
            .docs
            .get(&key(collection, id))
            .map_or(0, |doc| doc.version)
    }

    /// Send `message` to every open transport.
    pub fn broadcast(&self, message: &str) {
        self.broadcast_payload(&message_payload(message));
    }

    /// Send a raw payload to every open transport.
    pub fn broadcast_payload(&self, payload: &BroadcastPayload) {
        self.state()
            .broadcasts
            .retain(|tx| tx.send(payload.clone()).is_ok());
    }

    /// Close all streams. Later opens, subscribes and submits fail.
    pub fn shut_down(&self) {
        let mut state = self.state();
        state.shut_down = true;
        state.broadcasts.clear();
        for doc in state.docs.values_mut() {
            doc.subscribers.clear();
        }
    }
}

fn key(collection: &str, id: &str) -> DocKey {
    (collection.to_string(), id.to_string())
}

/// Diff stream of one [`MemoryServer`] transport.
#[derive(Debug, Clone)]
pub struct MemoryStream {
    server: MemoryServer,
    client_id: u64,
}

/// Connection to a [`MemoryServer`].
#[derive(Debug)]
pub struct MemoryConnection {
    stream: MemoryStream,
}

impl SyncConnection for MemoryConnection {
    type Stream = MemoryStream;
    type Doc = MemoryDoc;

    fn open(stream: MemoryStream) -> Result<Self, SyncError> {
        if stream.server.state().shut_down {
            return Err(SyncError::StreamClosed);
        }
        Ok(Self { stream })
    }

    fn get(&mut self, collection: &str, id: &str) -> MemoryDoc {
        MemoryDoc {
            stream: self.stream.clone(),
            key: key(collection, id),
            snapshot: None,
            ops: None,
        }
    }
}

/// Shared document handle on a [`MemoryServer`].
#[derive(Debug)]
pub struct MemoryDoc {
    stream: MemoryStream,
    key: DocKey,
    snapshot: Option<Rope>,
    ops: Option<Receiver<OpEvent>>,
}

impl SharedDoc for MemoryDoc {
    fn subscribe(&mut self) -> Result<(), SyncError> {
        let mut state = self.stream.server.state();
        if state.shut_down {
            return Err(SyncError::StreamClosed);
        }
        let doc = state.docs.entry(self.key.clone()).or_default();
        if let Some(reason) = &doc.rejection {
            return Err(SyncError::Rejected {
                reason: reason.clone(),
            });
        }
        let (tx, rx) = mpsc::channel();
        doc.subscribers.push((self.stream.client_id, tx));
        self.snapshot = Some(doc.text.clone());
        self.ops = Some(rx);
        Ok(())
    }

    fn data(&self) -> Option<Delta> {
        self.snapshot
            .as_ref()
            .map(|text| Delta::from_text(&text.to_string()))
    }

    fn submit_op(&mut self, op: Delta, options: SubmitOptions) -> Result<(), SyncError> {
        let Some(snapshot) = self.snapshot.as_mut() else {
            return Err(SyncError::NotSubscribed);
        };
        let mut state = self.stream.server.state();
        if state.shut_down {
            return Err(SyncError::StreamClosed);
        }
        let doc = state.docs.entry(self.key.clone()).or_default();
        op.apply_to(&mut doc.text)?;
        doc.version += 1;
        // Local snapshot moves with the submit; the echo is only an event.
        op.apply_to(snapshot)?;

        let own_id = self.stream.client_id;
        doc.subscribers.retain(|(client, tx)| {
            let source = (*client == own_id).then_some(options.source);
            tx.send(OpEvent {
                op: op.clone(),
                source,
            })
            .is_ok()
        });
        Ok(())
    }

    fn try_next_op(&mut self) -> Option<OpEvent> {
        let event = self.ops.as_ref()?.try_recv().ok()?;
        if event.source.is_none()
            && let Some(snapshot) = self.snapshot.as_mut()
            && let Err(err) = event.op.apply_to(snapshot)
        {
            tracing::warn!(error = %err, "remote operation does not fit local snapshot");
        }
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{DOCUMENTS_COLLECTION, SourceTag};

    fn open_doc(server: &MemoryServer, id: &str) -> MemoryDoc {
        let transport = server.transport();
        let mut connection = MemoryConnection::open(transport.diff_stream).unwrap();
        connection.get(DOCUMENTS_COLLECTION, id)
    }

    #[test]
    fn test_subscribe_loads_seeded_snapshot() {
        let server = MemoryServer::new();
        server.seed(DOCUMENTS_COLLECTION, "notes", "# Notes\n");
        let mut doc = open_doc(&server, "notes");
        assert_eq!(doc.data(), None);
        doc.subscribe().unwrap();
        assert_eq!(doc.data(), Some(Delta::from_text("# Notes\n")));
    }

    #[test]
    fn test_subscribe_to_missing_doc_yields_empty_snapshot() {
        let server = MemoryServer::new();
        let mut doc = open_doc(&server, "fresh");
        doc.subscribe().unwrap();
        assert_eq!(doc.data(), Some(Delta::new()));
    }

    #[test]
    fn test_rejected_subscription_reports_reason() {
        let server = MemoryServer::new();
        server.reject_subscriptions(DOCUMENTS_COLLECTION, "secret", "forbidden");
        let mut doc = open_doc(&server, "secret");
        assert_eq!(
            doc.subscribe(),
            Err(SyncError::Rejected {
                reason: "forbidden".to_string()
            })
        );
    }

    #[test]
    fn test_submit_before_subscribe_fails() {
        let server = MemoryServer::new();
        let mut doc = open_doc(&server, "notes");
        let result = doc.submit_op(
            Delta::from_text("x"),
            SubmitOptions {
                source: SourceTag::unique(),
            },
        );
        assert_eq!(result, Err(SyncError::NotSubscribed));
    }

    #[test]
    fn test_submit_echoes_tag_locally_and_none_remotely() {
        let server = MemoryServer::new();
        let mut local = open_doc(&server, "notes");
        let mut remote = open_doc(&server, "notes");
        local.subscribe().unwrap();
        remote.subscribe().unwrap();

        let tag = SourceTag::unique();
        local
            .submit_op(Delta::from_text("hi"), SubmitOptions { source: tag })
            .unwrap();

        let echo = local.try_next_op().unwrap();
        assert_eq!(echo.source, Some(tag));
        let incoming = remote.try_next_op().unwrap();
        assert_eq!(incoming.source, None);
        assert_eq!(incoming.op, Delta::from_text("hi"));

        assert_eq!(local.data(), Some(Delta::from_text("hi")));
        assert_eq!(remote.data(), Some(Delta::from_text("hi")));
        assert_eq!(server.text(DOCUMENTS_COLLECTION, "notes").as_deref(), Some("hi"));
        assert_eq!(server.version(DOCUMENTS_COLLECTION, "notes"), 1);
    }

    #[test]
    fn test_out_of_range_submit_is_invalid() {
        let server = MemoryServer::new();
        let mut doc = open_doc(&server, "notes");
        doc.subscribe().unwrap();
        let mut op = Delta::new();
        op.retain(3).insert("x");
        let err = doc
            .submit_op(
                op,
                SubmitOptions {
                    source: SourceTag::unique(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidOp(_)));
    }

    #[test]
    fn test_shut_down_closes_streams() {
        let server = MemoryServer::new();
        let transport = server.transport();
        server.shut_down();
        assert!(matches!(
            MemoryConnection::open(transport.diff_stream),
            Err(SyncError::StreamClosed)
        ));
        assert!(transport.broadcast_stream.recv().is_err());
    }

    #[test]
    fn test_broadcast_reaches_every_transport() {
        let server = MemoryServer::new();
        let a = server.transport();
        let b = server.transport();
        server.broadcast("deploying");
        for transport in [a, b] {
            let payload = transport.broadcast_stream.try_recv().unwrap();
            assert_eq!(crate::transport::payload_message(&payload), Some("deploying"));
        }
    }
}
