//! The `QuorumVerifier` contract and the `VoteTracker` that evaluates
//! whether a candidate vote has reached quorum, possibly under two
//! overlapping verifiers during a reconfiguration.

use std::collections::{HashMap, HashSet};

use crate::vote::{Sid, Vote};

/// How an Oracle-majority verifier answers a 2-node tie-break consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleVerdict {
    Follow(Sid),
    DoNotFollow,
}

/// Pluggable majority predicate. Concrete membership/weights and any
/// Oracle collaborator live outside this crate; this is the trait
/// boundary the Election Core and Vote Tracker program against.
pub trait QuorumVerifier: Send + Sync {
    /// Voting weight of `sid`. Zero means `sid` is not a voter at all.
    fn get_weight(&self, sid: Sid) -> i64;

    /// True iff `sids` (by set membership, ignoring weight) forms a
    /// quorum under this verifier's weights.
    fn contains_quorum(&self, sids: &HashSet<Sid>) -> bool;

    /// The full set of sids this verifier currently grants voting weight.
    fn voting_members(&self) -> HashSet<Sid>;

    /// Monotonically increasing configuration version.
    fn version(&self) -> u64;

    /// UTF-8 serialization carried on the wire in the notification's
    /// config trailer.
    fn to_config_string(&self) -> String;

    /// Whether this verifier is an Oracle-majority variant that should be
    /// consulted to break 2-node ties. Default: no.
    fn needs_oracle(&self) -> bool {
        false
    }

    /// Consult the Oracle. Only meaningful when `needs_oracle()` is true;
    /// default implementation never endorses following.
    fn ask_oracle(&self, _votes: &HashMap<Sid, Vote>) -> OracleVerdict {
        OracleVerdict::DoNotFollow
    }
}

/// Evaluates whether a specific candidate vote has an ack-quorum under
/// one or two overlapping verifiers (current config, and — during a
/// reconfiguration — the pending config too). A vote only wins once it
/// holds a majority under every verifier it's checked against, which is
/// what keeps an in-flight membership change safe.
pub struct VoteTracker<'v> {
    verifiers: Vec<&'v dyn QuorumVerifier>,
    acked: Vec<HashSet<Sid>>,
}

impl<'v> VoteTracker<'v> {
    pub fn new(current: &'v dyn QuorumVerifier, pending: Option<&'v dyn QuorumVerifier>) -> VoteTracker<'v> {
        let mut verifiers = vec![current];
        if let Some(pending) = pending {
            if pending.version() > current.version() {
                verifiers.push(pending);
            }
        }
        let acked = verifiers.iter().map(|_| HashSet::new()).collect();
        VoteTracker { verifiers, acked }
    }

    /// Record an ack from `sid` against every contained verifier. Callers
    /// are expected to only call this for senders whose vote matches the
    /// candidate under evaluation.
    pub fn record_ack(&mut self, sid: Sid) {
        for acked in self.acked.iter_mut() {
            acked.insert(sid);
        }
    }

    /// Feed every `(sid, vote)` pair in `votes` whose vote equals
    /// `candidate` into the tracker.
    pub fn record_matching(&mut self, votes: &HashMap<Sid, Vote>, candidate: Vote) {
        for (&sid, vote) in votes {
            if *vote == candidate {
                self.record_ack(sid);
            }
        }
    }

    /// True iff every contained verifier reports a quorum of acks under
    /// its own weights.
    pub fn has_all_quorums(&self) -> bool {
        self.verifiers
            .iter()
            .zip(self.acked.iter())
            .all(|(verifier, acked)| verifier.contains_quorum(acked))
    }
}

/// Simple majority-of-voters verifier: every listed sid carries weight 1,
/// quorum is any strict majority of the member set. Useful as the default
/// `QuorumVerifier` for deployments that don't need weighted or
/// hierarchical quorums, and as the workhorse for this crate's own tests.
#[derive(Debug, Clone)]
pub struct MajorityQuorumVerifier {
    members: HashSet<Sid>,
    version: u64,
}

impl MajorityQuorumVerifier {
    pub fn new(members: HashSet<Sid>, version: u64) -> MajorityQuorumVerifier {
        MajorityQuorumVerifier { members, version }
    }
}

impl QuorumVerifier for MajorityQuorumVerifier {
    fn get_weight(&self, sid: Sid) -> i64 {
        if self.members.contains(&sid) {
            1
        } else {
            0
        }
    }

    fn contains_quorum(&self, sids: &HashSet<Sid>) -> bool {
        let present = sids.iter().filter(|s| self.members.contains(s)).count();
        present * 2 > self.members.len()
    }

    fn voting_members(&self) -> HashSet<Sid> {
        self.members.clone()
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn to_config_string(&self) -> String {
        let mut ids: Vec<String> = self.members.iter().map(|s| s.to_string()).collect();
        ids.sort();
        format!("version={};members={}", self.version, ids.join(":"))
    }
}
