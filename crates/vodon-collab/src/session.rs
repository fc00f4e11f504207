//! Annotation session: one video room bridged to a local drawing surface.
//!
//! Lifecycle: attach (connect, activate, subscribe, attach room, ensure
//! containers, sync, pull), then any number of local edits and polls, then
//! detach. Local edits are diffed into deltas and pushed at most once per
//! throttle window. A remote change replaces the surface with the room's
//! state wholesale; merging already happened inside the service.
//!
//! Without a link the session keeps working locally. Edits made meanwhile
//! stay buffered and go out once an attach succeeds.

use crossbeam_channel::Receiver;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};
use vodon_core::{Container, DocumentDelta, DrawingSnapshot};

use crate::config::CollabConfig;
use crate::error::{CollabError, CollabResult};
use crate::presence::{PresenceChannel, RosterChange};
use crate::service::{
    DocumentOp, PeerEvent, RemoteChange, ReplicatedDocument, ReplicationClient,
    ReplicationService,
};
use crate::throttle::Throttle;

type DocumentOf<S> = <<S as ReplicationService>::Client as ReplicationClient>::Document;

/// Replication state shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationStatus {
    Detached,
    Connecting,
    Replicated,
    /// Editing continues locally; changes are not reaching peers.
    Unreplicated,
}

/// What one `poll` did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollOutcome {
    /// Local edits were written to the document.
    pub flushed: bool,
    /// The surface was replaced from the document.
    pub pulled: bool,
    pub roster: RosterChange,
}

struct Link<C: ReplicationClient> {
    client: C,
    document: C::Document,
    changes: Receiver<RemoteChange>,
    peers: Receiver<PeerEvent>,
}

pub struct AnnotationSession<S: ReplicationService> {
    service: S,
    config: CollabConfig,
    room: String,
    status: ReplicationStatus,
    link: Option<Link<S::Client>>,
    surface: DrawingSnapshot,
    edits: Throttle<DocumentDelta>,
    presence: PresenceChannel,
}

impl<S: ReplicationService> AnnotationSession<S> {
    /// Create a detached session for `room` (the video's name).
    pub fn new(service: S, config: CollabConfig, room: impl Into<String>) -> Self {
        let window = config.throttle_window();
        Self {
            service,
            config,
            room: room.into(),
            status: ReplicationStatus::Detached,
            link: None,
            surface: DrawingSnapshot::new(),
            edits: Throttle::new(window),
            presence: PresenceChannel::new(window),
        }
    }

    pub fn status(&self) -> ReplicationStatus {
        self.status
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    /// The local drawing surface.
    pub fn surface(&self) -> &DrawingSnapshot {
        &self.surface
    }

    /// Remote peers in the room and their presence.
    pub fn peers(&self) -> &BTreeMap<String, Value> {
        self.presence.peers()
    }

    pub fn is_attached(&self) -> bool {
        self.link.is_some()
    }

    pub fn has_pending_edits(&self) -> bool {
        self.edits.is_pending()
    }

    /// Earliest instant at which `poll` has buffered work to send.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.edits.deadline(), self.presence.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ── Attach / detach ───────────────────────────────────────────

    /// Attach to the room. On failure the session stays usable locally and
    /// reports `Unreplicated`.
    pub async fn attach(&mut self) -> CollabResult<()> {
        if self.link.is_some() {
            return Ok(());
        }
        self.status = ReplicationStatus::Connecting;

        let link = match self.open().await {
            Ok(link) => link,
            Err(err) => {
                warn!(room = %self.room, error = %err, "Annotation replication unavailable");
                self.status = ReplicationStatus::Unreplicated;
                return Err(err);
            }
        };
        self.presence.set_own_id(Some(link.client.client_id().to_string()));
        self.link = Some(link);
        self.status = ReplicationStatus::Replicated;
        info!(room = %self.room, "Annotation document attached");

        if let Some(delta) = self.edits.flush_now() {
            if !self.push(delta, Instant::now()).await {
                // Show the room anyway, with the requeued edits on top.
                self.pull();
                if let Some(pending) = self.edits.pending() {
                    self.surface.apply(pending);
                }
                return Ok(());
            }
        }
        self.pull();
        Ok(())
    }

    /// Attach, retrying with the configured backoff.
    pub async fn attach_with_retry(&mut self) -> CollabResult<()> {
        let policy = self.config.backoff.clone();
        let mut attempt = 0;
        loop {
            let err = match self.attach().await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };
            match policy.delay_after(attempt) {
                Some(delay) => {
                    debug!(room = %self.room, attempt, ?delay, error = %err, "Retrying attach");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    warn!(room = %self.room, attempts = attempt + 1, "Giving up on attach");
                    return Err(CollabError::RetriesExhausted {
                        room: self.room.clone(),
                        attempts: attempt + 1,
                    });
                }
            }
        }
    }

    async fn open(&self) -> CollabResult<Link<S::Client>> {
        let client = self
            .service
            .connect(&self.config.endpoint, self.config.client_options())
            .await?;
        match Self::join(&client, &self.room).await {
            Ok((document, changes, peers)) => Ok(Link {
                client,
                document,
                changes,
                peers,
            }),
            Err(err) => {
                client.release();
                Err(err)
            }
        }
    }

    async fn join(
        client: &S::Client,
        room: &str,
    ) -> CollabResult<(DocumentOf<S>, Receiver<RemoteChange>, Receiver<PeerEvent>)> {
        client.activate().await?;
        let peers = client.subscribe();
        let document = client.attach(room).await?;

        let root = document.root();
        let missing: Vec<DocumentOp> = Container::ALL
            .into_iter()
            .filter(|c| !root.get(c.key()).is_some_and(Value::is_object))
            .map(DocumentOp::EnsureContainer)
            .collect();
        if !missing.is_empty() {
            document.update(missing, "initialize containers").await?;
        }

        let changes = document.subscribe();
        client.sync().await?;
        Ok((document, changes, peers))
    }

    /// Flush buffered edits, detach the room and deactivate the client.
    /// Without a link, buffered edits are kept for the next attach.
    pub async fn detach(&mut self) -> CollabResult<()> {
        if self.link.is_some() {
            if let Some(delta) = self.edits.flush_now() {
                self.push(delta, Instant::now()).await;
            }
            self.edits.cancel();
        }
        self.presence.reset();
        self.presence.set_own_id(None);
        self.status = ReplicationStatus::Detached;

        let Some(link) = self.link.take() else {
            return Ok(());
        };
        let result = match link.client.detach(&link.document).await {
            Ok(()) => link.client.deactivate().await,
            Err(err) => Err(err),
        };
        match &result {
            Ok(()) => info!(room = %self.room, "Annotation document detached"),
            Err(err) => {
                warn!(room = %self.room, error = %err, "Detach failed, releasing client");
                link.client.release();
            }
        }
        result
    }

    /// Detach from the current room and attach to `room` with an empty
    /// surface.
    pub async fn switch_room(&mut self, room: impl Into<String>) -> CollabResult<()> {
        if let Err(err) = self.detach().await {
            debug!(error = %err, "Detach before room switch failed");
        }
        self.edits.cancel();
        self.room = room.into();
        self.surface = DrawingSnapshot::new();
        self.attach().await
    }

    // ── Local edits ───────────────────────────────────────────────

    /// Apply a local change and queue it for replication.
    pub fn apply_local(&mut self, delta: DocumentDelta, now: Instant) {
        if delta.is_empty() {
            return;
        }
        self.surface.apply(&delta);
        self.edits.offer(delta, now);
    }

    /// Replace the surface, queueing only the entries that differ.
    pub fn replace_local(&mut self, snapshot: DrawingSnapshot, now: Instant) -> bool {
        let delta = self.surface.diff(&snapshot);
        if delta.is_empty() {
            return false;
        }
        self.surface = snapshot;
        self.edits.offer(delta, now);
        true
    }

    /// Remove every record from the surface.
    pub fn clear_local(&mut self, now: Instant) -> bool {
        self.replace_local(DrawingSnapshot::new(), now)
    }

    /// Queue a presence field (cursor, selection) for peers.
    pub fn set_presence(&mut self, key: impl Into<String>, value: Value, now: Instant) {
        self.presence.set_local(key, value, now);
    }

    // ── Driving ───────────────────────────────────────────────────

    /// Send due edits and presence, then apply remote document and roster
    /// events. Call whenever `next_deadline` passes or events may be waiting.
    pub async fn poll(&mut self, now: Instant) -> PollOutcome {
        let mut outcome = PollOutcome::default();
        let Some(link) = self.link.as_ref() else {
            return outcome;
        };
        let remote: Vec<RemoteChange> = link.changes.try_iter().collect();
        let rosters: Vec<PeerEvent> = link
            .peers
            .try_iter()
            .filter(|event| event.room == self.room)
            .collect();

        if remote.is_empty() {
            if let Some(delta) = self.edits.take_due(now) {
                outcome.flushed = self.push(delta, now).await;
            }
        } else {
            // Buffered edits go out before the pull so it cannot drop them.
            let mut clean = true;
            if let Some(delta) = self.edits.flush_now() {
                clean = self.push(delta, now).await;
                outcome.flushed = clean;
            }
            if clean {
                outcome.pulled = self.pull();
                debug!(
                    room = %self.room,
                    changes = remote.len(),
                    actor = ?remote.last().map(|change| &change.actor),
                    "Pulled remote annotation changes"
                );
            }
        }

        if let Some(fields) = self.presence.take_due(now) {
            self.push_presence(fields).await;
        }

        outcome.roster = self
            .presence
            .apply_rosters(rosters.iter().map(|event| event.peers.as_slice()));
        outcome
    }

    async fn push(&mut self, delta: DocumentDelta, now: Instant) -> bool {
        let Some(link) = self.link.as_ref() else {
            self.edits.requeue(delta, now);
            return false;
        };
        let ops = match encode_delta(&delta) {
            Ok(ops) => ops,
            Err(err) => {
                warn!(room = %self.room, error = %err, "Dropping unencodable edit");
                return false;
            }
        };
        let entries = ops.len();
        match link.document.update(ops, "local edit").await {
            Ok(()) => {
                self.status = ReplicationStatus::Replicated;
                debug!(room = %self.room, entries, "Pushed local annotation edits");
                true
            }
            Err(err) => {
                warn!(room = %self.room, error = %err, "Annotation update failed, keeping edits");
                self.status = ReplicationStatus::Unreplicated;
                self.edits.requeue(delta, now);
                false
            }
        }
    }

    async fn push_presence(&mut self, fields: BTreeMap<String, Value>) {
        let Some(link) = self.link.as_ref() else {
            return;
        };
        for (key, value) in fields {
            if let Err(err) = link.client.update_presence(&key, value).await {
                warn!(room = %self.room, key, error = %err, "Presence update dropped");
                self.status = ReplicationStatus::Unreplicated;
                return;
            }
        }
    }

    /// Replace the surface with the document's content. Returns whether the
    /// surface changed.
    fn pull(&mut self) -> bool {
        let Some(link) = self.link.as_ref() else {
            return false;
        };
        let next = decode_root(&link.document.root());
        if next == self.surface {
            return false;
        }
        self.surface = next;
        true
    }
}

impl<S: ReplicationService> Drop for AnnotationSession<S> {
    fn drop(&mut self) {
        if let Some(link) = self.link.take() {
            link.client.release();
        }
    }
}

fn encode_delta(delta: &DocumentDelta) -> CollabResult<Vec<DocumentOp>> {
    let mut ops = Vec::with_capacity(delta.len());
    encode_container(Container::Shapes, &delta.shapes, &mut ops)?;
    encode_container(Container::Bindings, &delta.bindings, &mut ops)?;
    encode_container(Container::Assets, &delta.assets, &mut ops)?;
    Ok(ops)
}

fn encode_container<T: Serialize>(
    container: Container,
    changes: &BTreeMap<String, Option<T>>,
    ops: &mut Vec<DocumentOp>,
) -> CollabResult<()> {
    for (id, change) in changes {
        let op = match change {
            Some(record) => DocumentOp::Set {
                container,
                id: id.clone(),
                value: serde_json::to_value(record)
                    .map_err(|e| CollabError::Serialization(e.to_string()))?,
            },
            None => DocumentOp::Remove {
                container,
                id: id.clone(),
            },
        };
        ops.push(op);
    }
    Ok(())
}

/// Read a document root into a snapshot, dropping entries that do not parse.
pub(crate) fn decode_root(root: &Value) -> DrawingSnapshot {
    let mut snapshot = DrawingSnapshot::new();
    decode_container(root, Container::Shapes, &mut snapshot.shapes);
    decode_container(root, Container::Bindings, &mut snapshot.bindings);
    decode_container(root, Container::Assets, &mut snapshot.assets);
    snapshot
}

fn decode_container<T: DeserializeOwned>(
    root: &Value,
    container: Container,
    into: &mut BTreeMap<String, T>,
) {
    let Some(entries) = root.get(container.key()).and_then(Value::as_object) else {
        return;
    };
    for (id, value) in entries {
        match decode_entry(container, id, value) {
            Ok(record) => {
                into.insert(id.clone(), record);
            }
            Err(err) => warn!(error = %err, "Dropping malformed remote entry"),
        }
    }
}

fn decode_entry<T: DeserializeOwned>(
    container: Container,
    id: &str,
    value: &Value,
) -> CollabResult<T> {
    T::deserialize(value).map_err(|e| CollabError::MalformedPayload {
        container: container.key(),
        id: id.to_string(),
        reason: e.to_string(),
    })
}
