//! Receive Worker: pulls raw frames from the Transport, decodes them,
//! handles reconfiguration side-effects, rejects non-voters with a
//! courtesy reply, and otherwise posts decoded notifications onto the
//! Election Core's inbound queue. Also answers peers that are already
//! LOOKING-with-a-stale-round or already FOLLOWING/LEADING, per §4.3.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace, warn};

use crate::iface::{PeerContext, Transport};
use crate::message::{Notification, ToSend};
use crate::queue::InboundQueue;
use crate::quorum::QuorumVerifier;
use crate::vote::{PeerState, Sid};

const POLL_TIMEOUT: Duration = Duration::from_secs(3);

pub struct ReceiveWorker {
    transport: Arc<dyn Transport>,
    ctx: Arc<dyn PeerContext>,
    inbound: Arc<InboundQueue<Notification>>,
    outbound: Sender<ToSend>,
    abort_flag: Arc<AtomicBool>,
    logical_clock: Arc<AtomicU64>,
}

impl ReceiveWorker {
    pub fn new(
        transport: Arc<dyn Transport>,
        ctx: Arc<dyn PeerContext>,
        inbound: Arc<InboundQueue<Notification>>,
        outbound: Sender<ToSend>,
        abort_flag: Arc<AtomicBool>,
        logical_clock: Arc<AtomicU64>,
    ) -> ReceiveWorker {
        ReceiveWorker {
            transport,
            ctx,
            inbound,
            outbound,
            abort_flag,
            logical_clock,
        }
    }

    pub fn run(&self, stop: Arc<AtomicBool>) {
        loop {
            if stop.load(Ordering::Acquire) {
                return;
            }
            match self.transport.poll_recv(POLL_TIMEOUT) {
                None => continue,
                Some((sender_sid, frame)) => self.process_frame(sender_sid, &frame),
            }
        }
    }

    fn process_frame(&self, sender_sid: Sid, frame: &[u8]) {
        let mut notification = match Notification::decode(sender_sid, frame) {
            Err(e) => {
                warn!("dropping malformed frame from {}: {}", sender_sid, e);
                return;
            }
            Ok(Err(raw_state)) => {
                debug!("dropping frame from {} with unknown senderState {}", sender_sid, raw_state);
                return;
            }
            Ok(Ok(n)) => n,
        };

        self.handle_reconfig(&mut notification);

        let voters = self.ctx.current_and_next_config_voters();
        if !voters.contains(&sender_sid) {
            debug!("{} is not a valid voter, sending courtesy reply", sender_sid);
            let reply = self.reply_with_current_vote(sender_sid, self.logical_clock.load(Ordering::Acquire));
            let _ = self.outbound.send(reply);
            return;
        }

        trace!("posting notification from {} to election core", sender_sid);
        self.inbound.push(notification.clone());

        match self.ctx.peer_state() {
            PeerState::Looking => {
                let local_clock = self.logical_clock.load(Ordering::Acquire);
                if notification.sender_state == PeerState::Looking && notification.election_epoch < local_clock {
                    let vote = self.ctx.current_vote();
                    let reply = self.reply_with_current_vote(sender_sid, vote.election_epoch);
                    let _ = self.outbound.send(reply);
                }
            }
            state @ (PeerState::Following | PeerState::Leading) => {
                if notification.sender_state == PeerState::Looking {
                    let vote = self.ctx.current_vote();
                    let reply = self.reply_with_current_vote(sender_sid, vote.election_epoch);
                    let _ = self.outbound.send(reply);
                    if state == PeerState::Leading {
                        self.ctx.note_still_looking(sender_sid);
                    }
                }
            }
            PeerState::Observing => {}
        }
    }

    /// Applies a reconfiguration carried on the notification's config
    /// trailer, if any and if newer than what's currently active. Sets
    /// `abort_flag` when this peer is LOOKING and the configuration
    /// actually changed, so the Election Core abandons the current round.
    fn handle_reconfig(&self, notification: &mut Notification) {
        let Some(config_str) = notification.quorum_config.clone() else {
            return;
        };
        let Some(new_verifier) = self.ctx.config_from_string(&config_str) else {
            warn!("could not parse quorum config from {}", notification.sender_sid);
            return;
        };
        notification.config_version = Some(new_verifier.version());

        let local_version = self.ctx.quorum_verifier().version();
        if new_verifier.version() <= local_version {
            return;
        }

        let old_verifier = self.ctx.quorum_verifier();
        let changed = config_differs(&*old_verifier, &*new_verifier);
        self.ctx.process_reconfig(new_verifier);
        if self.ctx.peer_state() == PeerState::Looking && changed {
            self.abort_flag.store(true, Ordering::Release);
        }
    }

    /// Builds a reply carrying this peer's current best-known vote and
    /// state. `election_epoch` is caller-supplied because the courtesy
    /// reply to a non-voter uses `logicalClock.get()` while every other
    /// reply uses the current Vote's own `electionEpoch` — an asymmetry
    /// preserved intentionally (see design notes).
    fn reply_with_current_vote(&self, recipient: Sid, election_epoch: u64) -> ToSend {
        let vote = self.ctx.current_vote();
        ToSend {
            recipient_sid: recipient,
            leader_sid: vote.leader_id,
            zxid: vote.zxid,
            election_epoch,
            peer_epoch: vote.peer_epoch,
            sender_state: self.ctx.peer_state(),
            config_bytes: self.ctx.quorum_verifier().to_config_string().into_bytes(),
        }
    }
}

fn config_differs(old: &dyn QuorumVerifier, new: &dyn QuorumVerifier) -> bool {
    old.version() != new.version() || old.voting_members() != new.voting_members()
}
