//! Fast Leader Election: the election state machine and messaging
//! discipline that lets a replicated coordination service's peers agree
//! on a single leader before normal operation (log sync, request
//! ordering) begins under that leader.
//!
//! The Transport (framed message delivery), persistent storage, and the
//! `QuorumVerifier`'s concrete membership/weights are external
//! collaborators, consumed here only at the trait boundaries in
//! [`iface`] and [`quorum`].

pub mod codec;
pub mod config;
pub mod core;
pub mod election;
pub mod error;
pub mod iface;
pub mod message;
pub mod queue;
pub mod quorum;
pub mod recv_worker;
pub mod send_worker;
pub mod vote;

pub use config::Config;
pub use election::Election;
pub use error::{CodecError, ElectionError};
pub use iface::{PeerContext, Transport};
pub use message::{Notification, ToSend};
pub use quorum::{MajorityQuorumVerifier, OracleVerdict, QuorumVerifier};
pub use vote::{Candidate, LearnerType, PeerState, Proposal, Sid, Vote};
