//! Wire codec for election notifications.
//!
//! Frame layout (big-endian, fixed prefix + optional trailer):
//!
//! ```text
//! offset  size  field
//! 0       4     senderState   (0=Looking 1=Following 2=Leading 3=Observing)
//! 4       8     leaderId
//! 12      8     zxid
//! 20      8     electionEpoch
//! 28      8     peerEpoch      (absent in 28-byte legacy frames)
//! 36      4     msgVersion     (absent in 28- and 40-byte frames, treated as 0)
//! 40      4     configLength   (only if msgVersion > 1)
//! 44      N     configBytes    (UTF-8 serialized QuorumVerifier)
//! ```

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use crate::error::CodecError;
use crate::vote::Sid;

/// The frame's current (non-legacy) msgVersion. Carries a config trailer.
pub const MSG_VERSION_CURRENT: u32 = 2;
/// The legacy msgVersion used by the fixed 40-byte encoding; never carries
/// a trailer.
pub const MSG_VERSION_LEGACY: u32 = 1;

const PREFIX_NO_PEER_EPOCH_LEN: usize = 28;
const PREFIX_WITH_VERSION_LEN: usize = 40;
const PREFIX_WITH_CONFIG_LEN_LEN: usize = 44;

/// A frame decoded off the wire. `sender_sid` is not part of the frame
/// itself — the Transport supplies it alongside the raw bytes — so it is
/// filled in by the caller after decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub leader_sid: Sid,
    pub zxid: i64,
    pub election_epoch: u64,
    pub peer_epoch: i64,
    pub sender_state_raw: u32,
    pub msg_version: u32,
    pub quorum_config: Option<String>,
}

/// Decode a raw frame. Accepts 28-, 40-, and `>=44`-byte frames; anything
/// shorter is rejected. A `msgVersion > 1` claim with an out-of-range
/// `configLength` is rejected too. Callers are expected to log and drop
/// the frame on `Err` and keep servicing the receive loop.
pub fn decode(frame: &[u8]) -> Result<DecodedFrame, CodecError> {
    if frame.len() < PREFIX_NO_PEER_EPOCH_LEN {
        return Err(CodecError::ShortFrame(frame.len()));
    }
    let mut cursor = Cursor::new(frame);
    let sender_state_raw = cursor.read_u32::<BigEndian>().unwrap();
    let leader_sid = cursor.read_i64::<BigEndian>().unwrap() as u64;
    let zxid = cursor.read_i64::<BigEndian>().unwrap();
    let election_epoch = cursor.read_u64::<BigEndian>().unwrap();

    let peer_epoch = if frame.len() >= PREFIX_WITH_VERSION_LEN {
        cursor.read_i64::<BigEndian>().unwrap()
    } else {
        zxid >> 32
    };

    let msg_version = if frame.len() >= PREFIX_WITH_VERSION_LEN {
        cursor.read_u32::<BigEndian>().unwrap()
    } else {
        0
    };

    let quorum_config = if msg_version > MSG_VERSION_LEGACY {
        if frame.len() < PREFIX_WITH_CONFIG_LEN_LEN {
            return Err(CodecError::ShortFrame(frame.len()));
        }
        let config_len = cursor.read_i32::<BigEndian>().unwrap();
        if config_len < 0 {
            return Err(CodecError::NegativeConfigLength(config_len));
        }
        let config_len = config_len as usize;
        let remaining = frame.len() - PREFIX_WITH_CONFIG_LEN_LEN;
        if config_len > remaining {
            return Err(CodecError::ConfigLengthOverflow {
                config_len: config_len as i32,
                frame_len: frame.len(),
            });
        }
        let start = PREFIX_WITH_CONFIG_LEN_LEN;
        let bytes = &frame[start..start + config_len];
        Some(String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidConfigUtf8)?)
    } else {
        None
    };

    Ok(DecodedFrame {
        leader_sid,
        zxid,
        election_epoch,
        peer_epoch,
        sender_state_raw,
        msg_version,
        quorum_config,
    })
}

/// Parameters shared by both encodings.
#[derive(Debug, Clone, Copy)]
pub struct FrameFields {
    pub sender_state: u32,
    pub leader_sid: Sid,
    pub zxid: i64,
    pub election_epoch: u64,
    pub peer_epoch: i64,
}

/// Encode the fixed 40-byte legacy frame (msgVersion = 1, no trailer).
/// Kept for wire round-trip tests and for interoperating with peers still
/// speaking the old protocol; the Send Worker never emits this in normal
/// operation.
pub fn encode_legacy(fields: FrameFields) -> Vec<u8> {
    let mut buf = Vec::with_capacity(PREFIX_WITH_VERSION_LEN);
    write_prefix(&mut buf, fields);
    buf.write_u32::<BigEndian>(MSG_VERSION_LEGACY).unwrap();
    buf
}

/// Encode the current frame (msgVersion = 2) with a length-prefixed
/// UTF-8 config trailer.
pub fn encode_current(fields: FrameFields, config_bytes: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(PREFIX_WITH_CONFIG_LEN_LEN + config_bytes.len());
    write_prefix(&mut buf, fields);
    buf.write_u32::<BigEndian>(MSG_VERSION_CURRENT).unwrap();
    buf.write_i32::<BigEndian>(config_bytes.len() as i32).unwrap();
    buf.extend_from_slice(config_bytes);
    buf
}

fn write_prefix(buf: &mut Vec<u8>, fields: FrameFields) {
    buf.write_u32::<BigEndian>(fields.sender_state).unwrap();
    buf.write_i64::<BigEndian>(fields.leader_sid as i64).unwrap();
    buf.write_i64::<BigEndian>(fields.zxid).unwrap();
    buf.write_u64::<BigEndian>(fields.election_epoch).unwrap();
    buf.write_i64::<BigEndian>(fields.peer_epoch).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fields() -> FrameFields {
        FrameFields {
            sender_state: 0,
            leader_sid: 3,
            zxid: 0x0000_0002_0000_0007,
            election_epoch: 9,
            peer_epoch: 2,
        }
    }

    #[test]
    fn round_trips_legacy_40_byte_frame() {
        let fields = sample_fields();
        let frame = encode_legacy(fields);
        assert_eq!(frame.len(), 40);
        let decoded = decode(&frame).unwrap();
        assert_eq!(decoded.leader_sid, fields.leader_sid);
        assert_eq!(decoded.zxid, fields.zxid);
        assert_eq!(decoded.election_epoch, fields.election_epoch);
        assert_eq!(decoded.peer_epoch, fields.peer_epoch);
        assert_eq!(decoded.msg_version, MSG_VERSION_LEGACY);
        assert!(decoded.quorum_config.is_none());
    }

    #[test]
    fn round_trips_current_frame_with_config_trailer() {
        let fields = sample_fields();
        let config = b"group.1=1:2:3;version=4".to_vec();
        let frame = encode_current(fields, &config);
        let decoded = decode(&frame).unwrap();
        assert_eq!(decoded.msg_version, MSG_VERSION_CURRENT);
        assert_eq!(decoded.quorum_config.as_deref(), Some("group.1=1:2:3;version=4"));
    }

    #[test]
    fn derives_peer_epoch_from_zxid_on_28_byte_frame() {
        let fields = sample_fields();
        let frame = encode_legacy(fields);
        let truncated = &frame[..28];
        let decoded = decode(truncated).unwrap();
        assert_eq!(decoded.msg_version, 0);
        assert_eq!(decoded.peer_epoch, fields.zxid >> 32);
    }

    #[test]
    fn rejects_frames_shorter_than_28_bytes() {
        let err = decode(&[0u8; 10]).unwrap_err();
        assert_eq!(err, CodecError::ShortFrame(10));
    }

    #[test]
    fn rejects_negative_config_length() {
        let fields = sample_fields();
        let mut frame = encode_current(fields, b"x");
        // Overwrite configLength (bytes 40..44) with -1.
        frame[40..44].copy_from_slice(&(-1i32).to_be_bytes());
        let err = decode(&frame).unwrap_err();
        assert_eq!(err, CodecError::NegativeConfigLength(-1));
    }

    #[test]
    fn rejects_config_length_overflowing_frame() {
        let fields = sample_fields();
        let mut frame = encode_current(fields, b"x");
        frame[40..44].copy_from_slice(&(1000i32).to_be_bytes());
        let err = decode(&frame).unwrap_err();
        assert!(matches!(err, CodecError::ConfigLengthOverflow { .. }));
    }
}
