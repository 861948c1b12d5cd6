//! NDJSON codec for the assistant CLI output stream.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] with a maximum line length to
//! prevent memory exhaustion caused by unterminated or pathologically
//! large lines from a misbehaving subprocess.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

use crate::{AppError, Result};

/// Maximum line length accepted by the stream codec: 1 MiB.
///
/// Lines exceeding this limit are framed as [`StreamFrame::Oversized`]
/// and their bytes discarded up to the next terminator; the stream
/// itself keeps going — one oversized line never poisons the rest of the
/// session.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// One framed item from the protocol stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// A complete `\n`-terminated UTF-8 protocol line.
    Line(String),
    /// A line that exceeded [`MAX_LINE_BYTES`]. Its content is discarded
    /// and framing resumes after the line's terminator.
    Oversized,
}

/// Line-framing decoder for the assistant's JSONL stdout.
///
/// Delegates framing to [`LinesCodec`] with a fixed [`MAX_LINE_BYTES`]
/// limit. Length overruns are reported in-band as
/// [`StreamFrame::Oversized`] rather than as decoder errors: the
/// surrounding `FramedRead` treats any decoder error as terminal for the
/// whole stream, and an oversized line must not take the session down
/// with it.
#[derive(Debug)]
pub struct StreamCodec(LinesCodec);

impl StreamCodec {
    /// Create a new codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self(LinesCodec::new_with_max_length(MAX_LINE_BYTES))
    }
}

impl Default for StreamCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for StreamCodec {
    type Item = StreamFrame;
    type Error = AppError;

    /// Decode the next newline-terminated line from `src`.
    ///
    /// Returns `Ok(None)` when `src` holds no complete line yet.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<StreamFrame>> {
        map_frame(self.0.decode(src))
    }

    /// Decode the final unterminated line when the stream reaches EOF.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<StreamFrame>> {
        map_frame(self.0.decode_eof(src))
    }
}

/// Length overruns become an in-band frame; [`LinesCodec`] discards the
/// rest of the oversized line internally and picks framing back up at
/// the next terminator.
fn map_frame(
    decoded: std::result::Result<Option<String>, LinesCodecError>,
) -> Result<Option<StreamFrame>> {
    match decoded {
        Ok(line) => Ok(line.map(StreamFrame::Line)),
        Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(StreamFrame::Oversized)),
        Err(LinesCodecError::Io(io_err)) => Err(AppError::Io(io_err.to_string())),
    }
}
