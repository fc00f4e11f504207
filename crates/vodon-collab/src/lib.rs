//! Vodon Collab - Shared annotation documents
//!
//! One replicated document per video room holds the shapes, bindings and
//! assets drawn over that video. Conflict resolution belongs to the
//! replication service; this crate only bridges a local drawing surface to
//! it.
//!
//! Architecture:
//! - `service`: the replication service boundary (client, document, events)
//! - `memory`: in-process replication server for offline review and tests
//! - `throttle`: trailing-window coalescing of outgoing updates
//! - `presence`: peer roster tracking and throttled local presence
//! - `reconnect`: exponential backoff for attach retries
//! - `session`: `AnnotationSession`, the attach/edit/pull/detach lifecycle
//! - `bookmark`: moving drawings between the session and timeline bookmarks

pub mod bookmark;
pub mod config;
pub mod error;
pub mod memory;
pub mod presence;
pub mod reconnect;
pub mod service;
pub mod session;
pub mod throttle;

pub use bookmark::{clear_on_play, create_bookmark, load_active_bookmark, persist_active_bookmark};
pub use config::CollabConfig;
pub use error::{CollabError, CollabResult};
pub use memory::{MemoryClient, MemoryDocument, MemoryReplicationServer};
pub use presence::{PresenceChannel, RosterChange};
pub use reconnect::BackoffPolicy;
pub use service::{
    ClientOptions, DocumentOp, Peer, PeerEvent, RemoteChange, ReplicatedDocument,
    ReplicationClient, ReplicationService,
};
pub use session::{AnnotationSession, PollOutcome, ReplicationStatus};
pub use throttle::{Coalesce, Throttle};
