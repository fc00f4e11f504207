//! In-process replication server.
//!
//! Serves offline review sessions and tests. Updates are applied in arrival
//! order under one lock, so the last write to an entry wins. Availability can
//! be toggled to exercise failure paths.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};
use vodon_core::Container;

use crate::error::{CollabError, CollabResult};
use crate::service::{
    ClientOptions, DocumentOp, Peer, PeerEvent, RemoteChange, ReplicatedDocument,
    ReplicationClient, ReplicationService,
};

#[derive(Default)]
struct ClientState {
    active: bool,
    user_name: String,
    peer_subscribers: Vec<Sender<PeerEvent>>,
}

#[derive(Default)]
struct Room {
    root: Map<String, Value>,
    /// Attached clients and their presence objects
    members: BTreeMap<String, Value>,
    watchers: Vec<(String, Sender<RemoteChange>)>,
    updates: usize,
}

#[derive(Default)]
struct ServerState {
    unavailable: bool,
    failing_connects: u32,
    failing_updates: u32,
    next_client: u64,
    clients: HashMap<String, ClientState>,
    rooms: HashMap<String, Room>,
}

impl ServerState {
    fn check_available(&self) -> CollabResult<()> {
        if self.unavailable {
            Err(CollabError::Unavailable("in-process server is offline".into()))
        } else {
            Ok(())
        }
    }

    fn broadcast_roster(&mut self, key: &str) {
        let Some(room) = self.rooms.get(key) else {
            return;
        };
        let peers: Vec<Peer> = room
            .members
            .iter()
            .map(|(id, presence)| Peer {
                client_id: id.clone(),
                presence: presence.clone(),
            })
            .collect();
        let event = PeerEvent {
            room: key.to_string(),
            peers,
        };
        let members: Vec<String> = room.members.keys().cloned().collect();
        for member in members {
            if let Some(client) = self.clients.get_mut(&member) {
                client
                    .peer_subscribers
                    .retain(|tx| tx.send(event.clone()).is_ok());
            }
        }
    }

    fn leave(&mut self, client_id: &str, key: &str) -> bool {
        let Some(room) = self.rooms.get_mut(key) else {
            return false;
        };
        let was_member = room.members.remove(client_id).is_some();
        room.watchers.retain(|(id, _)| id != client_id);
        if was_member {
            self.broadcast_roster(key);
        }
        was_member
    }

    fn release_client(&mut self, client_id: &str) {
        let rooms: Vec<String> = self
            .rooms
            .iter()
            .filter(|(_, room)| room.members.contains_key(client_id))
            .map(|(key, _)| key.clone())
            .collect();
        for key in rooms {
            self.leave(client_id, &key);
        }
        if let Some(client) = self.clients.get_mut(client_id) {
            client.active = false;
        }
    }
}

fn container_mut(
    root: &mut Map<String, Value>,
    container: Container,
) -> Option<&mut Map<String, Value>> {
    let slot = root
        .entry(container.key())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut()
}

/// Shared handle to the in-process server. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryReplicationServer {
    state: Arc<Mutex<ServerState>>,
}

impl MemoryReplicationServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the server offline or bring it back.
    pub fn set_available(&self, available: bool) {
        self.state.lock().unavailable = !available;
    }

    /// Make the next `count` connects fail.
    pub fn fail_next_connects(&self, count: u32) {
        self.state.lock().failing_connects = count;
    }

    /// Make the next `count` document updates fail.
    pub fn fail_next_updates(&self, count: u32) {
        self.state.lock().failing_updates = count;
    }

    /// Number of updates applied to a room.
    pub fn update_count(&self, room: &str) -> usize {
        self.state.lock().rooms.get(room).map_or(0, |r| r.updates)
    }

    /// Copy of a room's document root.
    pub fn document(&self, room: &str) -> Option<Value> {
        self.state
            .lock()
            .rooms
            .get(room)
            .map(|r| Value::Object(r.root.clone()))
    }

    /// Client ids attached to a room.
    pub fn members(&self, room: &str) -> Vec<String> {
        self.state
            .lock()
            .rooms
            .get(room)
            .map(|r| r.members.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl ReplicationService for MemoryReplicationServer {
    type Client = MemoryClient;

    async fn connect(&self, endpoint: &str, options: ClientOptions) -> CollabResult<MemoryClient> {
        let mut state = self.state.lock();
        state.check_available()?;
        if state.failing_connects > 0 {
            state.failing_connects -= 1;
            return Err(CollabError::Unavailable(format!("connect to {endpoint} refused")));
        }
        state.next_client += 1;
        let id = format!("client-{}", state.next_client);
        state.clients.insert(
            id.clone(),
            ClientState {
                user_name: options.user_name,
                ..Default::default()
            },
        );
        debug!(client = %id, endpoint, "Client connected");
        Ok(MemoryClient {
            id,
            state: Arc::clone(&self.state),
        })
    }
}

/// Client of the in-process server.
pub struct MemoryClient {
    id: String,
    state: Arc<Mutex<ServerState>>,
}

impl ReplicationClient for MemoryClient {
    type Document = MemoryDocument;

    fn client_id(&self) -> &str {
        &self.id
    }

    fn is_active(&self) -> bool {
        self.state
            .lock()
            .clients
            .get(&self.id)
            .is_some_and(|c| c.active)
    }

    async fn activate(&self) -> CollabResult<()> {
        let mut state = self.state.lock();
        state.check_available()?;
        state.clients.entry(self.id.clone()).or_default().active = true;
        Ok(())
    }

    async fn deactivate(&self) -> CollabResult<()> {
        let mut state = self.state.lock();
        state.check_available()?;
        state.release_client(&self.id);
        Ok(())
    }

    async fn attach(&self, key: &str) -> CollabResult<MemoryDocument> {
        let mut state = self.state.lock();
        state.check_available()?;
        let user_name = match state.clients.get(&self.id) {
            Some(client) if client.active => client.user_name.clone(),
            _ => {
                return Err(CollabError::Inactive {
                    client_id: self.id.clone(),
                })
            }
        };

        let room = state.rooms.entry(key.to_string()).or_default();
        room.members
            .entry(self.id.clone())
            .or_insert_with(|| json!({ "userName": user_name }));
        state.broadcast_roster(key);
        info!(client = %self.id, room = %key, "Document attached");

        Ok(MemoryDocument {
            key: key.to_string(),
            client_id: self.id.clone(),
            state: Arc::clone(&self.state),
        })
    }

    async fn detach(&self, document: &MemoryDocument) -> CollabResult<()> {
        let mut state = self.state.lock();
        state.check_available()?;
        if state.leave(&self.id, &document.key) {
            Ok(())
        } else {
            Err(CollabError::NotAttached {
                key: document.key.clone(),
            })
        }
    }

    async fn sync(&self) -> CollabResult<()> {
        self.state.lock().check_available()
    }

    fn subscribe(&self) -> Receiver<PeerEvent> {
        let (tx, rx) = unbounded();
        self.state
            .lock()
            .clients
            .entry(self.id.clone())
            .or_default()
            .peer_subscribers
            .push(tx);
        rx
    }

    async fn update_presence(&self, key: &str, value: Value) -> CollabResult<()> {
        let mut state = self.state.lock();
        state.check_available()?;
        let mut touched = Vec::new();
        for (room_key, room) in state.rooms.iter_mut() {
            if let Some(presence) = room.members.get_mut(&self.id) {
                if !presence.is_object() {
                    *presence = Value::Object(Map::new());
                }
                if let Some(fields) = presence.as_object_mut() {
                    fields.insert(key.to_string(), value.clone());
                }
                touched.push(room_key.clone());
            }
        }
        for room_key in touched {
            state.broadcast_roster(&room_key);
        }
        Ok(())
    }

    fn release(&self) {
        self.state.lock().release_client(&self.id);
    }
}

/// Document handle held by one client.
pub struct MemoryDocument {
    key: String,
    client_id: String,
    state: Arc<Mutex<ServerState>>,
}

impl ReplicatedDocument for MemoryDocument {
    fn key(&self) -> &str {
        &self.key
    }

    fn root(&self) -> Value {
        let state = self.state.lock();
        let root = state
            .rooms
            .get(&self.key)
            .map(|r| r.root.clone())
            .unwrap_or_default();
        Value::Object(root)
    }

    async fn update(&self, ops: Vec<DocumentOp>, message: &str) -> CollabResult<()> {
        let mut state = self.state.lock();
        state.check_available()?;
        if state.failing_updates > 0 {
            state.failing_updates -= 1;
            return Err(CollabError::Unavailable("update rejected".into()));
        }
        let room = state
            .rooms
            .get_mut(&self.key)
            .filter(|room| room.members.contains_key(&self.client_id))
            .ok_or_else(|| CollabError::NotAttached {
                key: self.key.clone(),
            })?;

        for op in ops {
            match op {
                DocumentOp::EnsureContainer(container) => {
                    container_mut(&mut room.root, container);
                }
                DocumentOp::Set {
                    container,
                    id,
                    value,
                } => {
                    if let Some(entries) = container_mut(&mut room.root, container) {
                        entries.insert(id, value);
                    }
                }
                DocumentOp::Remove { container, id } => {
                    if let Some(entries) = container_mut(&mut room.root, container) {
                        entries.remove(&id);
                    }
                }
            }
        }
        room.updates += 1;

        let change = RemoteChange {
            actor: self.client_id.clone(),
            message: message.to_string(),
        };
        let author = &self.client_id;
        room.watchers
            .retain(|(id, tx)| id == author || tx.send(change.clone()).is_ok());
        Ok(())
    }

    fn subscribe(&self) -> Receiver<RemoteChange> {
        let (tx, rx) = unbounded();
        if let Some(room) = self.state.lock().rooms.get_mut(&self.key) {
            room.watchers.push((self.client_id.clone(), tx));
        }
        rx
    }
}
