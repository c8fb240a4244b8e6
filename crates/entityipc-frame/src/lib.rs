//! Terminator-delimited message framing for entityipc.
//!
//! Every frame on the wire is a body followed by a single reserved
//! terminator byte (`0x00`). Bodies are JSON text, which never contains a raw
//! `0x00`, so no length prefix or escaping is needed. The encoder refuses any
//! body that would break this invariant.
//!
//! No partial reads, no buffer management in user code.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::DelimitedCodec;
pub use codec::{decode_frame, encode_frame, FrameConfig, DEFAULT_MAX_FRAME_SIZE, TERMINATOR};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
