//! Domain-level notification types that sit between the wire codec and
//! the election core. `Notification` is what the Receive Worker posts to
//! the core's inbound queue; `ToSend` is what the core posts to the
//! outbound queue for the Send Worker to encode and hand to the Transport.

use crate::codec::{self, DecodedFrame, FrameFields};
use crate::error::CodecError;
use crate::vote::{PeerState, Sid, Vote};

/// A notification decoded from a peer, plus the sender's sid (supplied by
/// the Transport, not part of the frame itself).
#[derive(Debug, Clone)]
pub struct Notification {
    pub sender_sid: Sid,
    pub leader_sid: Sid,
    pub zxid: i64,
    pub election_epoch: u64,
    pub peer_epoch: i64,
    pub sender_state: PeerState,
    pub msg_version: u32,
    pub quorum_config: Option<String>,
    /// Version of the `QuorumVerifier` parsed out of `quorum_config`, if
    /// any. Resolved by the Receive Worker after decode (parsing the
    /// config string requires the parent peer's `config_from_string`),
    /// then carried on the notification per the data model (§3).
    pub config_version: Option<u64>,
}

impl Notification {
    /// Decode a raw frame received from `sender_sid`. Returns
    /// `Err(CodecError)` for malformed frames; returns
    /// `Ok(Err(raw_state))` when the frame is otherwise well-formed but
    /// names a `senderState` this build doesn't recognize, so the caller
    /// can discard it without losing the parsed sid/zxid for logging.
    pub fn decode(sender_sid: Sid, frame: &[u8]) -> Result<Result<Notification, u32>, CodecError> {
        let decoded: DecodedFrame = codec::decode(frame)?;
        Ok(match PeerState::from_wire(decoded.sender_state_raw) {
            Some(state) => Ok(Notification {
                sender_sid,
                leader_sid: decoded.leader_sid,
                zxid: decoded.zxid,
                election_epoch: decoded.election_epoch,
                peer_epoch: decoded.peer_epoch,
                sender_state: state,
                msg_version: decoded.msg_version,
                quorum_config: decoded.quorum_config,
                config_version: None,
            }),
            None => Err(decoded.sender_state_raw),
        })
    }

    pub fn as_vote(&self) -> Vote {
        let mut vote = Vote::new(self.leader_sid, self.zxid, self.election_epoch, self.peer_epoch)
            .with_state(self.sender_state);
        vote.config_version = self.config_version;
        vote
    }
}

/// An outbound notification queued for a specific recipient.
#[derive(Debug, Clone)]
pub struct ToSend {
    pub recipient_sid: Sid,
    pub leader_sid: Sid,
    pub zxid: i64,
    pub election_epoch: u64,
    pub peer_epoch: i64,
    pub sender_state: PeerState,
    pub config_bytes: Vec<u8>,
}

impl ToSend {
    /// Encode using the current (msgVersion = 2) wire format.
    pub fn encode(&self) -> Vec<u8> {
        let fields = FrameFields {
            sender_state: self.sender_state.to_wire(),
            leader_sid: self.leader_sid,
            zxid: self.zxid,
            election_epoch: self.election_epoch,
            peer_epoch: self.peer_epoch,
        };
        codec::encode_current(fields, &self.config_bytes)
    }
}
