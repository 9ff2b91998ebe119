//! Error types shared across the codec, worker, and election-core modules.

use thiserror::Error;

/// Failures that can occur while decoding a raw frame off the wire.
///
/// These are never propagated out of the receive loop as a hard failure;
/// callers log and drop the offending frame per the error handling design.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("frame too short: got {0} bytes, need at least 28")]
    ShortFrame(usize),
    #[error("config length {0} is negative")]
    NegativeConfigLength(i32),
    #[error("config length {config_len} exceeds remaining frame bytes {frame_len}")]
    ConfigLengthOverflow { config_len: i32, frame_len: usize },
    #[error("config bytes are not valid utf-8")]
    InvalidConfigUtf8,
    #[error("unrecognized sender state {0}")]
    UnknownSenderState(u32),
}

/// Terminal conditions under which `ElectionCore::look_for_leader` returns
/// `None` instead of a `Vote`.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum ElectionError {
    #[error("election core was shut down")]
    Shutdown,
    #[error("quorum configuration changed mid-election")]
    ConfigChanged,
}
