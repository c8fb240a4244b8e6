use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Reserved byte that ends every frame.
pub const TERMINATOR: u8 = 0x00;

/// Default maximum frame body size: 16 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Encode a frame body into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────────────────────┬────────────┐
/// │ Body (JSON envelope text)    │ Terminator │
/// │ (any length, no 0x00 bytes)  │ 0x00       │
/// └──────────────────────────────┴────────────┘
/// ```
pub fn encode_frame(body: &[u8], dst: &mut BytesMut) -> Result<()> {
    if let Some(offset) = body.iter().position(|&b| b == TERMINATOR) {
        return Err(FrameError::TerminatorInBody { offset });
    }
    dst.reserve(body.len() + 1);
    dst.put_slice(body);
    dst.put_u8(TERMINATOR);
    Ok(())
}

/// Decode one frame body from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a terminator yet.
/// On success, consumes the body and its terminator from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_frame_size: usize) -> Result<Option<Bytes>> {
    let mut scanned = 0;
    decode_frame_resume(src, max_frame_size, &mut scanned)
}

/// Like [`decode_frame`], but skips the first `scanned` bytes when searching
/// for the terminator. `scanned` is updated so that repeated calls on a
/// growing buffer stay linear.
pub(crate) fn decode_frame_resume(
    src: &mut BytesMut,
    max_frame_size: usize,
    scanned: &mut usize,
) -> Result<Option<Bytes>> {
    let start = (*scanned).min(src.len());
    let Some(pos) = src[start..]
        .iter()
        .position(|&b| b == TERMINATOR)
        .map(|offset| start + offset)
    else {
        *scanned = src.len();
        if src.len() > max_frame_size {
            return Err(FrameError::PayloadTooLarge {
                size: src.len(),
                max: max_frame_size,
            });
        }
        return Ok(None); // Need more data
    };

    *scanned = 0;
    if pos > max_frame_size {
        return Err(FrameError::PayloadTooLarge {
            size: pos,
            max: max_frame_size,
        });
    }

    let body = src.split_to(pos).freeze();
    src.advance(1);

    if body.is_empty() {
        return Err(FrameError::EmptyFrame);
    }
    Ok(Some(body))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum frame body size in bytes. Default: 16 MiB.
    pub max_frame_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
