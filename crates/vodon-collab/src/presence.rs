//! Peer presence: throttled local updates and a diffed remote roster.

use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::service::Peer;
use crate::throttle::Throttle;

/// Effect of one roster event on the known peers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterChange {
    pub joined: Vec<String>,
    pub left: Vec<String>,
    pub updated: Vec<String>,
}

impl RosterChange {
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty() && self.updated.is_empty()
    }

    /// Fold a later change in, keeping the net effect: a peer that joined
    /// and then left is not reported at all.
    fn merge(&mut self, later: RosterChange) {
        for id in later.joined {
            if let Some(pos) = self.left.iter().position(|l| l == &id) {
                self.left.remove(pos);
                push_unique(&mut self.updated, id);
            } else {
                push_unique(&mut self.joined, id);
            }
        }
        for id in later.left {
            self.updated.retain(|u| u != &id);
            if let Some(pos) = self.joined.iter().position(|j| j == &id) {
                self.joined.remove(pos);
            } else {
                push_unique(&mut self.left, id);
            }
        }
        for id in later.updated {
            if !self.joined.contains(&id) {
                push_unique(&mut self.updated, id);
            }
        }
    }
}

fn push_unique(ids: &mut Vec<String>, id: String) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

pub struct PresenceChannel {
    own_id: Option<String>,
    outgoing: Throttle<BTreeMap<String, Value>>,
    roster: BTreeMap<String, Value>,
}

impl PresenceChannel {
    pub fn new(window: Duration) -> Self {
        Self {
            own_id: None,
            outgoing: Throttle::new(window),
            roster: BTreeMap::new(),
        }
    }

    /// Set the local client id; our own entry is left out of the roster.
    pub fn set_own_id(&mut self, id: Option<String>) {
        self.own_id = id;
    }

    /// Queue a local presence field.
    pub fn set_local(&mut self, key: impl Into<String>, value: Value, now: Instant) {
        self.outgoing.offer(BTreeMap::from([(key.into(), value)]), now);
    }

    /// Local fields whose window has closed.
    pub fn take_due(&mut self, now: Instant) -> Option<BTreeMap<String, Value>> {
        self.outgoing.take_due(now)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.outgoing.deadline()
    }

    /// Remote peers and their presence.
    pub fn peers(&self) -> &BTreeMap<String, Value> {
        &self.roster
    }

    /// Forget every peer and any queued local fields.
    pub fn reset(&mut self) -> RosterChange {
        self.outgoing.cancel();
        let left = std::mem::take(&mut self.roster).into_keys().collect();
        RosterChange {
            left,
            ..Default::default()
        }
    }

    /// Diff a roster against the known peers. Entries whose presence is not
    /// an object are skipped.
    pub fn apply_roster(&mut self, peers: &[Peer]) -> RosterChange {
        let mut next = BTreeMap::new();
        for peer in peers {
            if self.own_id.as_deref() == Some(peer.client_id.as_str()) {
                continue;
            }
            if !peer.presence.is_object() {
                warn!(peer = %peer.client_id, "Skipping malformed presence");
                continue;
            }
            next.insert(peer.client_id.clone(), peer.presence.clone());
        }

        let mut change = RosterChange::default();
        for (id, presence) in &next {
            match self.roster.get(id) {
                None => change.joined.push(id.clone()),
                Some(old) if old != presence => change.updated.push(id.clone()),
                Some(_) => {}
            }
        }
        change.left = self
            .roster
            .keys()
            .filter(|id| !next.contains_key(*id))
            .cloned()
            .collect();

        self.roster = next;
        change
    }

    /// Apply several rosters in order and report the net change.
    pub fn apply_rosters<'a>(
        &mut self,
        rosters: impl IntoIterator<Item = &'a [Peer]>,
    ) -> RosterChange {
        let mut total = RosterChange::default();
        for peers in rosters {
            total.merge(self.apply_roster(peers));
        }
        total
    }
}
