//! Document-sync client contract.
//!
//! The operational-transform engine lives behind two traits:
//! [`SyncConnection`] is opened over a transport's diff stream and hands out
//! [`SharedDoc`] handles addressed by `(collection, id)`. An in-process
//! implementation lives in [`memory`].

pub mod memory;

use std::sync::atomic::{AtomicU64, Ordering};

use crate::delta::{Delta, DeltaError};

/// Collection holding editable documents.
pub const DOCUMENTS_COLLECTION: &str = "documents";

static NEXT_TAG: AtomicU64 = AtomicU64::new(1);

/// Opaque marker naming the origin of a submitted operation.
///
/// A connection echoes locally submitted operations back with exactly the
/// tag they were submitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceTag(u64);

impl SourceTag {
    /// A tag distinct from every other tag minted in this process.
    pub fn unique() -> Self {
        Self(NEXT_TAG.fetch_add(1, Ordering::Relaxed))
    }
}

/// Options passed alongside a submitted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    pub source: SourceTag,
}

/// An operation received on a shared document.
///
/// `source` is the tag given at submit time when the operation came from
/// this handle, `None` when it came from another client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpEvent {
    pub op: Delta,
    pub source: Option<SourceTag>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("diff stream is closed")]
    StreamClosed,
    #[error("subscription rejected: {reason}")]
    Rejected { reason: String },
    #[error("document is not subscribed")]
    NotSubscribed,
    #[error("invalid operation")]
    InvalidOp(#[from] DeltaError),
}

/// Client-side proxy for a remotely synchronized document.
pub trait SharedDoc {
    /// Subscribe and fetch the current snapshot.
    ///
    /// # Errors
    /// Returns the service's failure when the subscription is refused or the
    /// stream is gone.
    fn subscribe(&mut self) -> Result<(), SyncError>;

    /// The document snapshot, once subscribed.
    fn data(&self) -> Option<Delta>;

    /// Submit a local operation.
    ///
    /// # Errors
    /// Fails when the handle is not subscribed, the stream is closed, or the
    /// operation does not fit the document.
    fn submit_op(&mut self, op: Delta, options: SubmitOptions) -> Result<(), SyncError>;

    /// Next pending operation event, if any.
    fn try_next_op(&mut self) -> Option<OpEvent>;
}

/// A connection to the sync service bound to one diff stream.
pub trait SyncConnection: Sized {
    type Stream;
    type Doc: SharedDoc;

    /// Bind a connection to `stream`.
    ///
    /// # Errors
    /// Returns [`SyncError::StreamClosed`] when the stream cannot be used.
    fn open(stream: Self::Stream) -> Result<Self, SyncError>;

    /// Handle for the document `id` in `collection`. Does not subscribe.
    fn get(&mut self, collection: &str, id: &str) -> Self::Doc;
}
