//! The election data model: `Vote`, `Proposal`, peer/learner states, and the
//! vote comparator (`total_order_predicate`) that decides which of two
//! candidate ballots wins.

use std::hash::{Hash, Hasher};

/// Server identifier. Small positive integer, unique per peer.
pub type Sid = u64;

/// Sentinel zxid/epoch value used by observers, who never propose
/// themselves (see `Proposal::for_self`).
pub const NON_PARTICIPANT_SENTINEL: i64 = i64::MIN;

/// The state a peer reports itself as being in, carried on the wire as a
/// `u32` (0=Looking, 1=Following, 2=Leading, 3=Observing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Looking,
    Following,
    Leading,
    Observing,
}

impl PeerState {
    pub fn from_wire(value: u32) -> Option<PeerState> {
        match value {
            0 => Some(PeerState::Looking),
            1 => Some(PeerState::Following),
            2 => Some(PeerState::Leading),
            3 => Some(PeerState::Observing),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u32 {
        match self {
            PeerState::Looking => 0,
            PeerState::Following => 1,
            PeerState::Leading => 2,
            PeerState::Observing => 3,
        }
    }
}

/// Whether a peer is eligible to ever hold a Proposal naming itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnerType {
    Participant,
    Observer,
}

/// An immutable ballot. Equality for election purposes only considers
/// `(leader_id, zxid, peer_epoch)` — `state` and `config_version` ride
/// along on inbound notifications but never affect comparison.
#[derive(Debug, Clone, Copy)]
pub struct Vote {
    pub leader_id: Sid,
    pub zxid: i64,
    pub election_epoch: u64,
    pub peer_epoch: i64,
    pub state: Option<PeerState>,
    pub config_version: Option<u64>,
}

impl Vote {
    pub fn new(leader_id: Sid, zxid: i64, election_epoch: u64, peer_epoch: i64) -> Vote {
        Vote {
            leader_id,
            zxid,
            election_epoch,
            peer_epoch,
            state: None,
            config_version: None,
        }
    }

    pub fn with_state(mut self, state: PeerState) -> Vote {
        self.state = Some(state);
        self
    }
}

impl PartialEq for Vote {
    fn eq(&self, other: &Vote) -> bool {
        self.leader_id == other.leader_id && self.zxid == other.zxid && self.peer_epoch == other.peer_epoch
    }
}

impl Eq for Vote {}

impl Hash for Vote {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.leader_id.hash(state);
        self.zxid.hash(state);
        self.peer_epoch.hash(state);
    }
}

/// The mutable triple the Election Core proposes and revises over the
/// course of one `look_for_leader` call. Lives behind the core's monitor;
/// nothing outside the core mutates it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proposal {
    pub leader: Sid,
    pub zxid: i64,
    pub peer_epoch: i64,
}

impl Proposal {
    /// Seeds a fresh Proposal at the start of a `look_for_leader` call.
    /// Observers propose the sentinel triple so they never win their own
    /// election.
    pub fn for_self(self_id: Sid, last_logged_zxid: i64, current_epoch: i64, learner_type: LearnerType) -> Proposal {
        match learner_type {
            LearnerType::Participant => Proposal {
                leader: self_id,
                zxid: last_logged_zxid,
                peer_epoch: current_epoch,
            },
            LearnerType::Observer => Proposal {
                leader: NON_PARTICIPANT_SENTINEL as u64,
                zxid: NON_PARTICIPANT_SENTINEL,
                peer_epoch: NON_PARTICIPANT_SENTINEL,
            },
        }
    }

    pub fn as_vote(&self, election_epoch: u64) -> Vote {
        Vote::new(self.leader, self.zxid, election_epoch, self.peer_epoch)
    }
}

/// A candidate ballot plus the only extra fact the comparator needs: the
/// candidate leader's voting weight (0 if it holds no vote in the current
/// `QuorumVerifier`).
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub leader_id: Sid,
    pub zxid: i64,
    pub peer_epoch: i64,
}

impl Candidate {
    pub fn new(leader_id: Sid, zxid: i64, peer_epoch: i64) -> Candidate {
        Candidate { leader_id, zxid, peer_epoch }
    }

    fn key(&self) -> (i64, i64, Sid) {
        (self.peer_epoch, self.zxid, self.leader_id)
    }
}

impl From<Proposal> for Candidate {
    fn from(p: Proposal) -> Candidate {
        Candidate::new(p.leader, p.zxid, p.peer_epoch)
    }
}

impl From<Vote> for Candidate {
    fn from(v: Vote) -> Candidate {
        Candidate::new(v.leader_id, v.zxid, v.peer_epoch)
    }
}

/// `totalOrderPredicate`. Returns true iff `new` beats `cur`: the
/// candidate must carry positive voting weight, and then the triple
/// `(peer_epoch, zxid, leader_id)` of `new` must lexicographically exceed
/// that of `cur`. This is the sole tie-break rule in the system and must
/// be evaluated identically by every peer.
pub fn total_order_predicate(new: Candidate, new_weight: i64, cur: Candidate) -> bool {
    if new_weight <= 0 {
        return false;
    }
    new.key() > cur.key()
}
