//! Trait boundaries for the collaborators this crate consumes but does
//! not implement: the Transport (framed message delivery between peer
//! ids) and the parent `QuorumPeer` (persistent state, peer state,
//! membership). Kept here exactly as external interfaces per the design
//! notes — production code wires real implementations in; tests wire in
//! the doubles under `tests/common`.

use std::sync::Arc;
use std::time::Duration;

use crate::quorum::QuorumVerifier;
use crate::vote::{LearnerType, PeerState, Sid, Vote};

/// Delivers framed messages between peer ids. Queueing per destination,
/// connection establishment, and drop-on-self-to-self are the Transport's
/// responsibility, not the Election Core's.
pub trait Transport: Send + Sync {
    /// Best-effort delivery; must never block the caller.
    fn send_to(&self, sid: Sid, frame: Vec<u8>);

    /// Blocking poll for the next inbound `(sender_sid, frame)`, up to
    /// `timeout`. `None` on timeout.
    fn poll_recv(&self, timeout: Duration) -> Option<(Sid, Vec<u8>)>;

    /// True iff every per-peer outbound queue is currently empty.
    fn have_delivered(&self) -> bool;

    /// (Re)initiate connections to every known peer.
    fn connect_all(&self);

    /// Graceful teardown.
    fn halt(&self);
}

/// The subset of `QuorumPeer` that the election subsystem reads and
/// writes. Reconfiguration mutations and peer-state transitions go
/// through here rather than through ambient process state.
pub trait PeerContext: Send + Sync {
    fn my_id(&self) -> Sid;
    fn learner_type(&self) -> LearnerType;
    fn last_logged_zxid(&self) -> i64;
    fn current_epoch(&self) -> i64;
    fn peer_state(&self) -> PeerState;
    fn set_peer_state(&self, state: PeerState);
    fn current_vote(&self) -> Vote;
    fn set_current_vote(&self, vote: Vote);

    /// Union of voter sids across the current and any pending
    /// reconfiguration.
    fn current_and_next_config_voters(&self) -> std::collections::HashSet<Sid>;

    fn quorum_verifier(&self) -> Arc<dyn QuorumVerifier>;
    fn last_seen_quorum_verifier(&self) -> Option<Arc<dyn QuorumVerifier>>;

    /// Parse a wire-serialized QuorumVerifier, as carried in a
    /// notification's config trailer.
    fn config_from_string(&self, s: &str) -> Option<Arc<dyn QuorumVerifier>>;

    /// Apply a newly-seen configuration. Implementations decide whether
    /// this also becomes the active `quorum_verifier`.
    fn process_reconfig(&self, verifier: Arc<dyn QuorumVerifier>);

    /// Record that `sid` is still LOOKING while this peer is LEADING, for
    /// the leader subsystem to act on (e.g. re-offer sync). A no-op
    /// default keeps the trait usable without a full leader subsystem.
    fn note_still_looking(&self, _sid: Sid) {}
}
