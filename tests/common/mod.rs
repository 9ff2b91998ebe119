//! Shared test doubles for the integration tests: an in-process
//! `Transport` wiring peers together over `mpsc` channels, and a
//! `PeerContext` backed by plain `Mutex`-guarded fields.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fast_leader_election::quorum::{MajorityQuorumVerifier, QuorumVerifier};
use fast_leader_election::vote::{LearnerType, PeerState, Sid, Vote};
use fast_leader_election::{PeerContext, Transport};

/// An in-memory message bus for a fixed set of peer ids. Every peer in
/// the cluster gets its own inbox; `send_to` looks up the recipient's
/// sender half and hands the frame over directly.
pub struct ChannelTransport {
    my_id: Sid,
    peers: HashMap<Sid, Sender<(Sid, Vec<u8>)>>,
    inbox: Mutex<Receiver<(Sid, Vec<u8>)>>,
    halted: AtomicBool,
}

impl ChannelTransport {
    /// Builds one `ChannelTransport` per id in `ids`, all wired to each
    /// other, keyed by id.
    pub fn cluster(ids: &[Sid]) -> HashMap<Sid, Arc<ChannelTransport>> {
        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for &id in ids {
            let (tx, rx) = channel();
            senders.insert(id, tx);
            receivers.insert(id, rx);
        }
        ids.iter()
            .map(|&id| {
                let transport = Arc::new(ChannelTransport {
                    my_id: id,
                    peers: senders.clone(),
                    inbox: Mutex::new(receivers.remove(&id).unwrap()),
                    halted: AtomicBool::new(false),
                });
                (id, transport)
            })
            .collect()
    }
}

impl Transport for ChannelTransport {
    fn send_to(&self, sid: Sid, frame: Vec<u8>) {
        if sid == self.my_id {
            return;
        }
        if let Some(tx) = self.peers.get(&sid) {
            let _ = tx.send((self.my_id, frame));
        }
    }

    fn poll_recv(&self, timeout: Duration) -> Option<(Sid, Vec<u8>)> {
        if self.halted.load(Ordering::Acquire) {
            return None;
        }
        self.inbox.lock().unwrap().recv_timeout(timeout).ok()
    }

    fn have_delivered(&self) -> bool {
        true
    }

    fn connect_all(&self) {}

    fn halt(&self) {
        self.halted.store(true, Ordering::Release);
    }
}

/// A `PeerContext` double holding everything the Election Core reads and
/// writes, with no persistence or leader subsystem behind it.
pub struct TestPeerContext {
    my_id: Sid,
    last_logged_zxid: i64,
    current_epoch: i64,
    learner_type: LearnerType,
    voters: HashSet<Sid>,
    verifier: Arc<dyn QuorumVerifier>,
    peer_state: Mutex<PeerState>,
    current_vote: Mutex<Vote>,
}

impl TestPeerContext {
    pub fn new(my_id: Sid, last_logged_zxid: i64, members: &[Sid]) -> TestPeerContext {
        let verifier = Arc::new(MajorityQuorumVerifier::new(members.iter().copied().collect(), 0));
        TestPeerContext {
            my_id,
            last_logged_zxid,
            current_epoch: 0,
            learner_type: LearnerType::Participant,
            voters: members.iter().copied().collect(),
            verifier,
            peer_state: Mutex::new(PeerState::Looking),
            current_vote: Mutex::new(Vote::new(my_id, last_logged_zxid, 0, 0)),
        }
    }
}

impl PeerContext for TestPeerContext {
    fn my_id(&self) -> Sid {
        self.my_id
    }

    fn learner_type(&self) -> LearnerType {
        self.learner_type
    }

    fn last_logged_zxid(&self) -> i64 {
        self.last_logged_zxid
    }

    fn current_epoch(&self) -> i64 {
        self.current_epoch
    }

    fn peer_state(&self) -> PeerState {
        *self.peer_state.lock().unwrap()
    }

    fn set_peer_state(&self, state: PeerState) {
        *self.peer_state.lock().unwrap() = state;
    }

    fn current_vote(&self) -> Vote {
        *self.current_vote.lock().unwrap()
    }

    fn set_current_vote(&self, vote: Vote) {
        *self.current_vote.lock().unwrap() = vote;
    }

    fn current_and_next_config_voters(&self) -> HashSet<Sid> {
        self.voters.clone()
    }

    fn quorum_verifier(&self) -> Arc<dyn QuorumVerifier> {
        self.verifier.clone()
    }

    fn last_seen_quorum_verifier(&self) -> Option<Arc<dyn QuorumVerifier>> {
        None
    }

    fn config_from_string(&self, _s: &str) -> Option<Arc<dyn QuorumVerifier>> {
        None
    }

    fn process_reconfig(&self, _verifier: Arc<dyn QuorumVerifier>) {}
}
