//! The Election Core: `lookForLeader`, generalized as
//! `ElectionCore::look_for_leader`. Owns the Proposal, the logical clock,
//! the per-sender vote bookkeeping, and the quorum-detection-with-
//! finalization-window described in §4.5.

use std::cmp;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, trace};

use crate::config::Config;
use crate::iface::{PeerContext, Transport};
use crate::message::{Notification, ToSend};
use crate::queue::InboundQueue;
use crate::quorum::{OracleVerdict, VoteTracker};
use crate::vote::{total_order_predicate, Candidate, LearnerType, PeerState, Proposal, Sid, Vote};

/// What a single dispatch step (a LOOKING/FOLLOWING/LEADING branch, or a
/// timed-out poll) tells the main loop to do next.
enum StepOutcome {
    Continue,
    Commit(Vote),
    Stop,
}

pub struct ElectionCore {
    config: Config,
    ctx: Arc<dyn PeerContext>,
    transport: Arc<dyn Transport>,
    outbound: Sender<ToSend>,
    inbound: Arc<InboundQueue<Notification>>,
    logical_clock: Arc<AtomicU64>,
    abort_flag: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    proposal: Mutex<Proposal>,
    recvset: Mutex<HashMap<Sid, Vote>>,
    outofelection: Mutex<HashMap<Sid, Vote>>,
}

impl ElectionCore {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        ctx: Arc<dyn PeerContext>,
        transport: Arc<dyn Transport>,
        outbound: Sender<ToSend>,
        inbound: Arc<InboundQueue<Notification>>,
        logical_clock: Arc<AtomicU64>,
        abort_flag: Arc<AtomicBool>,
        stop: Arc<AtomicBool>,
    ) -> ElectionCore {
        let initial = Proposal::for_self(ctx.my_id(), ctx.last_logged_zxid(), ctx.current_epoch(), ctx.learner_type());
        ElectionCore {
            config,
            ctx,
            transport,
            outbound,
            inbound,
            logical_clock,
            abort_flag,
            stop,
            proposal: Mutex::new(initial),
            recvset: Mutex::new(HashMap::new()),
            outofelection: Mutex::new(HashMap::new()),
        }
    }

    /// The current Proposal as a Vote, under the monitor. Exposed so
    /// Send/Receive Workers (by way of `PeerContext::current_vote`, which
    /// this core keeps mirrored) can answer peers mid-election.
    pub fn get_vote(&self) -> Vote {
        let proposal = *self.proposal.lock().unwrap();
        proposal.as_vote(self.logical_clock.load(Ordering::Acquire))
    }

    pub fn get_logical_clock(&self) -> u64 {
        self.logical_clock.load(Ordering::Acquire)
    }

    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Release);
    }

    fn set_proposal(&self, new_proposal: Proposal) {
        *self.proposal.lock().unwrap() = new_proposal;
        self.ctx
            .set_current_vote(new_proposal.as_vote(self.logical_clock.load(Ordering::Acquire)));
    }

    /// Runs one election attempt to completion. Returns `None` if
    /// `shutdown()` was called or the Receive Worker signalled a
    /// membership change while this peer was LOOKING.
    pub fn look_for_leader(&self) -> Option<Vote> {
        self.abort_flag.store(false, Ordering::Release);
        self.logical_clock.fetch_add(1, Ordering::AcqRel);
        let initial = Proposal::for_self(
            self.ctx.my_id(),
            self.ctx.last_logged_zxid(),
            self.ctx.current_epoch(),
            self.ctx.learner_type(),
        );
        self.set_proposal(initial);
        self.ctx.set_peer_state(PeerState::Looking);
        self.recvset.lock().unwrap().clear();
        self.outofelection.lock().unwrap().clear();

        let mut not_timeout = self.config.min_notification_interval;
        self.broadcast_proposal();

        loop {
            if self.stop.load(Ordering::Acquire) {
                return None;
            }
            if self.abort_flag.load(Ordering::Acquire) {
                return None;
            }

            let outcome = match self.inbound.poll(not_timeout) {
                None => self.handle_timeout(&mut not_timeout),
                Some(n) => {
                    if !self.is_valid(&n) {
                        debug!("discarding notification from invalid voter/leader {}", n.sender_sid);
                        StepOutcome::Continue
                    } else {
                        match n.sender_state {
                            PeerState::Looking => self.handle_looking(n),
                            PeerState::Following | PeerState::Leading => self.handle_following_or_leading(n),
                            PeerState::Observing => {
                                trace!("discarding notification from observer {}", n.sender_sid);
                                StepOutcome::Continue
                            }
                        }
                    }
                }
            };

            match outcome {
                StepOutcome::Continue => continue,
                StepOutcome::Commit(vote) => return Some(vote),
                StepOutcome::Stop => return None,
            }
        }
    }

    fn handle_timeout(&self, not_timeout: &mut Duration) -> StepOutcome {
        if self.transport.have_delivered() {
            self.broadcast_proposal();
        } else {
            self.transport.connect_all();
        }
        *not_timeout = cmp::min(*not_timeout * 2, self.config.max_notification_interval);

        let verifier = self.ctx.quorum_verifier();
        if verifier.needs_oracle() {
            let candidate_vote = self.get_vote();
            let pending = self.ctx.last_seen_quorum_verifier();
            let mut tracker = VoteTracker::new(&*verifier, pending.as_deref());
            let recvset = self.recvset.lock().unwrap().clone();
            tracker.record_matching(&recvset, candidate_vote);
            if tracker.has_all_quorums() {
                if let OracleVerdict::Follow(_) = verifier.ask_oracle(&recvset) {
                    return StepOutcome::Commit(self.commit(candidate_vote));
                }
            }
        }
        StepOutcome::Continue
    }

    fn is_valid(&self, n: &Notification) -> bool {
        let voters = self.ctx.current_and_next_config_voters();
        if !voters.contains(&n.sender_sid) {
            return false;
        }
        self.ctx.quorum_verifier().get_weight(n.leader_sid) > 0
    }

    /// The LOOKING branch: adopt a better vote if one arrives, track
    /// acks, and enter the finalization window once a quorum emerges.
    fn handle_looking(&self, n: Notification) -> StepOutcome {
        let last_logged_zxid = self.ctx.last_logged_zxid();
        if last_logged_zxid == -1 || n.zxid == -1 {
            debug!("skipping notification carrying sentinel zxid");
            return StepOutcome::Continue;
        }

        let current_clock = self.logical_clock.load(Ordering::Acquire);
        let new_candidate = Candidate::new(n.leader_sid, n.zxid, n.peer_epoch);
        let weight = self.ctx.quorum_verifier().get_weight(n.leader_sid);

        if n.election_epoch > current_clock {
            self.logical_clock.store(n.election_epoch, Ordering::Release);
            self.recvset.lock().unwrap().clear();
            // Entering a newer round resets this peer back to proposing
            // its own identity before re-deciding; a candidate merely
            // carried over from the old round must not survive the jump.
            let self_proposal = Proposal::for_self(
                self.ctx.my_id(),
                self.ctx.last_logged_zxid(),
                self.ctx.current_epoch(),
                self.ctx.learner_type(),
            );
            let self_candidate = Candidate::from(self_proposal);
            let winning_proposal = if total_order_predicate(new_candidate, weight, self_candidate) {
                Proposal {
                    leader: n.leader_sid,
                    zxid: n.zxid,
                    peer_epoch: n.peer_epoch,
                }
            } else {
                self_proposal
            };
            self.set_proposal(winning_proposal);
            self.broadcast_proposal();
        } else if n.election_epoch < current_clock {
            trace!("discarding stale-round notification from {}", n.sender_sid);
            return StepOutcome::Continue;
        } else {
            let cur_candidate = Candidate::from(*self.proposal.lock().unwrap());
            if total_order_predicate(new_candidate, weight, cur_candidate) {
                self.set_proposal(Proposal {
                    leader: n.leader_sid,
                    zxid: n.zxid,
                    peer_epoch: n.peer_epoch,
                });
                self.broadcast_proposal();
            }
        }

        let recorded = Vote::new(n.leader_sid, n.zxid, n.election_epoch, n.peer_epoch);
        self.recvset.lock().unwrap().insert(n.sender_sid, recorded);

        let candidate_vote = self.get_vote();
        // The peer's own broadcast is dropped by the Transport on
        // self-to-self delivery, so its ballot never otherwise reaches
        // recvset. Record it directly or a live peer can never see its
        // own ack and quorum becomes unreachable under a bare majority.
        self.recvset.lock().unwrap().insert(self.ctx.my_id(), candidate_vote);

        let verifier = self.ctx.quorum_verifier();
        let pending = self.ctx.last_seen_quorum_verifier();
        let mut tracker = VoteTracker::new(&*verifier, pending.as_deref());
        tracker.record_matching(&self.recvset.lock().unwrap(), candidate_vote);

        if tracker.has_all_quorums() {
            self.finalize(candidate_vote)
        } else {
            StepOutcome::Continue
        }
    }

    /// The 200ms grace period after reaching quorum: a strictly better
    /// vote preempts the commit by being pushed back onto the inbound
    /// queue for the outer loop to re-evaluate.
    fn finalize(&self, committed_candidate: Vote) -> StepOutcome {
        loop {
            if self.stop.load(Ordering::Acquire) {
                return StepOutcome::Stop;
            }
            if self.abort_flag.load(Ordering::Acquire) {
                return StepOutcome::Stop;
            }
            match self.inbound.poll(self.config.finalize_wait) {
                None => return StepOutcome::Commit(self.commit(committed_candidate)),
                Some(n) => {
                    if !self.is_valid(&n) {
                        continue;
                    }
                    // A strictly better candidate preempts the commit
                    // whether it arrives from a peer still LOOKING or
                    // from one already FOLLOWING/LEADING a
                    // better-looking leader.
                    let weight = self.ctx.quorum_verifier().get_weight(n.leader_sid);
                    let new_candidate = Candidate::new(n.leader_sid, n.zxid, n.peer_epoch);
                    let cur_candidate = Candidate::from(committed_candidate);
                    if total_order_predicate(new_candidate, weight, cur_candidate) {
                        self.inbound.unget(n);
                        return StepOutcome::Continue;
                    }
                    // Not better: stays out of the recvset/outofelection
                    // bookkeeping and is simply dropped while we keep
                    // waiting out the window.
                }
            }
        }
    }

    /// The FOLLOWING/LEADING branch: try to join a pre-existing,
    /// already-concluded election.
    fn handle_following_or_leading(&self, n: Notification) -> StepOutcome {
        let vote_with_state = n.as_vote();

        if n.election_epoch == self.logical_clock.load(Ordering::Acquire) {
            self.recvset.lock().unwrap().insert(n.sender_sid, vote_with_state);
            let candidate_vote = vote_with_state;
            let verifier = self.ctx.quorum_verifier();
            let pending = self.ctx.last_seen_quorum_verifier();
            let mut tracker = VoteTracker::new(&*verifier, pending.as_deref());
            {
                let recvset = self.recvset.lock().unwrap();
                tracker.record_matching(&recvset, candidate_vote);
            }
            let recvset_snapshot = self.recvset.lock().unwrap().clone();
            if tracker.has_all_quorums() && self.check_leader(&recvset_snapshot, n.leader_sid, n.election_epoch) {
                let vote = Vote::new(n.leader_sid, n.zxid, n.election_epoch, n.peer_epoch);
                return StepOutcome::Commit(self.commit(vote));
            }
        }

        self.outofelection.lock().unwrap().insert(n.sender_sid, vote_with_state);
        let verifier = self.ctx.quorum_verifier();
        let pending = self.ctx.last_seen_quorum_verifier();
        let mut tracker = VoteTracker::new(&*verifier, pending.as_deref());
        {
            let ooe = self.outofelection.lock().unwrap();
            tracker.record_matching(&ooe, vote_with_state);
        }
        let ooe_snapshot = self.outofelection.lock().unwrap().clone();
        if tracker.has_all_quorums() && self.check_leader(&ooe_snapshot, n.leader_sid, n.election_epoch) {
            self.logical_clock.store(n.election_epoch, Ordering::Release);
            let vote = Vote::new(n.leader_sid, n.zxid, n.election_epoch, n.peer_epoch);
            return StepOutcome::Commit(self.commit(vote));
        }

        if n.sender_state == PeerState::Leading && verifier.needs_oracle() {
            if let OracleVerdict::DoNotFollow = verifier.ask_oracle(&ooe_snapshot) {
                let vote = Vote::new(n.leader_sid, n.zxid, n.election_epoch, n.peer_epoch);
                return StepOutcome::Commit(self.commit(vote));
            }
        }

        StepOutcome::Continue
    }

    /// `CheckLeader`: guards against re-electing a crashed, unresponsive
    /// leader purely because old ballots naming it still sit in the map.
    fn check_leader(&self, votes: &HashMap<Sid, Vote>, leader_id: Sid, election_epoch: u64) -> bool {
        if leader_id == self.ctx.my_id() {
            election_epoch == self.logical_clock.load(Ordering::Acquire)
        } else {
            votes
                .get(&leader_id)
                .map(|v| v.state == Some(PeerState::Leading))
                .unwrap_or(false)
        }
    }

    fn commit(&self, candidate: Vote) -> Vote {
        let final_vote = Vote::new(
            candidate.leader_id,
            candidate.zxid,
            self.logical_clock.load(Ordering::Acquire),
            candidate.peer_epoch,
        );
        let new_state = if final_vote.leader_id == self.ctx.my_id() {
            PeerState::Leading
        } else if self.ctx.learner_type() == LearnerType::Observer {
            PeerState::Observing
        } else {
            PeerState::Following
        };
        self.ctx.set_peer_state(new_state);
        self.ctx.set_current_vote(final_vote);
        self.inbound.clear();
        final_vote
    }

    /// Broadcasts the current Proposal to every voter in the current and
    /// pending configuration. Sent to self too; the Transport is
    /// responsible for dropping self-addressed frames.
    fn broadcast_proposal(&self) {
        let proposal = *self.proposal.lock().unwrap();
        let election_epoch = self.logical_clock.load(Ordering::Acquire);
        let verifier = self.ctx.quorum_verifier();
        let config_bytes = verifier.to_config_string().into_bytes();
        for sid in self.ctx.current_and_next_config_voters() {
            let msg = ToSend {
                recipient_sid: sid,
                leader_sid: proposal.leader,
                zxid: proposal.zxid,
                election_epoch,
                peer_epoch: proposal.peer_epoch,
                sender_state: PeerState::Looking,
                config_bytes: config_bytes.clone(),
            };
            let _ = self.outbound.send(msg);
        }
    }
}
