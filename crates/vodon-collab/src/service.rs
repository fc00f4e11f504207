//! Replication service boundary.
//!
//! A service hands out clients; a client attaches documents by room key and
//! carries this peer's presence. Documents are JSON trees whose root holds one
//! object per `Container`, each mapping entry ids to records. The service
//! merges concurrent writes; callers never resolve conflicts themselves.

use crossbeam_channel::Receiver;
use serde_json::Value;
use std::time::Duration;
use vodon_core::Container;

use crate::error::CollabResult;

/// Connection options.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    /// Published as the `userName` presence key on attach.
    pub user_name: String,
    pub reconnect_stream_delay: Duration,
}

/// One write inside a document update. An update applies all its ops as a
/// single transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOp {
    /// Create the container if the root does not have it yet.
    EnsureContainer(Container),
    Set {
        container: Container,
        id: String,
        value: Value,
    },
    /// Tombstone an entry.
    Remove { container: Container, id: String },
}

/// A peer attached to a room and its latest presence.
#[derive(Debug, Clone, PartialEq)]
pub struct Peer {
    pub client_id: String,
    pub presence: Value,
}

/// Presence roster of a room after any peer joined, left or updated.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerEvent {
    pub room: String,
    pub peers: Vec<Peer>,
}

/// Another client changed the document.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteChange {
    pub actor: String,
    pub message: String,
}

/// Entry point: connects clients to an endpoint.
#[allow(async_fn_in_trait)]
pub trait ReplicationService {
    type Client: ReplicationClient;

    async fn connect(&self, endpoint: &str, options: ClientOptions)
        -> CollabResult<Self::Client>;
}

/// A client session with the service.
#[allow(async_fn_in_trait)]
pub trait ReplicationClient {
    type Document: ReplicatedDocument;

    fn client_id(&self) -> &str;
    fn is_active(&self) -> bool;

    async fn activate(&self) -> CollabResult<()>;
    async fn deactivate(&self) -> CollabResult<()>;

    /// Attach to the document for `key`, creating an empty one if needed.
    async fn attach(&self, key: &str) -> CollabResult<Self::Document>;
    async fn detach(&self, document: &Self::Document) -> CollabResult<()>;

    /// Push local changes and pull remote ones.
    async fn sync(&self) -> CollabResult<()>;

    /// Roster events for every room this client is attached to.
    fn subscribe(&self) -> Receiver<PeerEvent>;

    async fn update_presence(&self, key: &str, value: Value) -> CollabResult<()>;

    /// Best-effort synchronous teardown for drop paths: detach everything and
    /// deactivate. Errors are swallowed.
    fn release(&self);
}

/// An attached replicated document.
#[allow(async_fn_in_trait)]
pub trait ReplicatedDocument {
    fn key(&self) -> &str;

    /// Deep copy of the current root.
    fn root(&self) -> Value;

    async fn update(&self, ops: Vec<DocumentOp>, message: &str) -> CollabResult<()>;

    /// Changes made by other clients.
    fn subscribe(&self) -> Receiver<RemoteChange>;
}
