//! `tokio_util` codec speaking the same terminator-delimited framing as
//! [`crate::FrameReader`] / [`crate::FrameWriter`].

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame_resume, encode_frame, DEFAULT_MAX_FRAME_SIZE};
use crate::error::FrameError;

/// Frame codec for use with `tokio_util::codec::Framed`.
#[derive(Debug, Clone)]
pub struct DelimitedCodec {
    max_frame_size: usize,
    scanned: usize,
}

impl DelimitedCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            scanned: 0,
        }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for DelimitedCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl Decoder for DelimitedCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, FrameError> {
        decode_frame_resume(src, self.max_frame_size, &mut self.scanned)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, FrameError> {
        match self.decode(src)? {
            Some(body) => Ok(Some(body)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::TruncatedFrame {
                buffered: src.len(),
            }),
        }
    }
}

impl Encoder<Bytes> for DelimitedCodec {
    type Error = FrameError;

    fn encode(&mut self, body: Bytes, dst: &mut BytesMut) -> Result<(), FrameError> {
        if body.len() > self.max_frame_size {
            return Err(FrameError::PayloadTooLarge {
                size: body.len(),
                max: self.max_frame_size,
            });
        }
        encode_frame(&body, dst)
    }
}
