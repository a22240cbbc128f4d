//! Length-prefixed postcard framing.
//!
//! A frame is a 4-byte big-endian payload length followed by the
//! postcard-encoded message.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::NetError;

/// Maximum payload size: 64 MB. Scan responses are bounded by the scan
/// limit, so anything larger indicates a corrupt stream.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Encode `message` into a single frame.
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>, NetError> {
    let payload =
        postcard::to_allocvec(message).map_err(|e| NetError::Serialization(e.to_string()))?;

    if payload.len() > MAX_FRAME_SIZE {
        return Err(NetError::FrameTooLarge {
            len: payload.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode one frame produced by [`encode_frame`].
///
/// Trailing bytes after the announced payload are ignored.
pub fn decode_frame<T: DeserializeOwned>(frame: &[u8]) -> Result<T, NetError> {
    let Some(prefix) = frame.get(..4) else {
        return Err(NetError::Serialization("truncated length prefix".into()));
    };

    let mut len_buf = [0u8; 4];
    len_buf.copy_from_slice(prefix);
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > MAX_FRAME_SIZE {
        return Err(NetError::FrameTooLarge {
            len,
            max: MAX_FRAME_SIZE,
        });
    }

    let payload = frame.get(4..4 + len).ok_or_else(|| {
        NetError::Serialization(format!("truncated payload: expected {len} bytes"))
    })?;

    postcard::from_bytes(payload).map_err(|e| NetError::Serialization(e.to_string()))
}
