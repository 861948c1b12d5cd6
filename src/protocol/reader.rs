//! Stream reader tasks for a supervised subprocess.
//!
//! [`run_reader`] pumps the subprocess stdout through the NDJSON codec and
//! the [`StreamParser`], forwarding every resulting [`StreamEvent`] into a
//! tokio [`mpsc`] channel. [`run_stderr_reader`] does the same for stderr,
//! as raw diagnostic lines that are never parsed as protocol.
//!
//! The reader holds a small state machine — `Idle` until the first byte,
//! `Streaming` while lines arrive, `Closed` after EOF or cancellation —
//! and no event is delivered outside `Streaming`. On EOF it emits exactly
//! one [`StreamEvent::ProcessExited`], with `saw_result` recording whether
//! the terminal result envelope arrived first.

use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::protocol::codec::{StreamCodec, StreamFrame, MAX_LINE_BYTES};
use crate::protocol::event::StreamEvent;
use crate::protocol::parser::StreamParser;
use crate::{AppError, Result};

/// Reader lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    /// No bytes received yet.
    Idle,
    /// At least one line framed; events are flowing.
    Streaming,
    /// Stream ended; no further events are delivered.
    Closed,
}

/// Pump the subprocess stdout into typed events.
///
/// Malformed lines become [`StreamEvent::ParseFailure`], and an
/// oversized line one parse failure with its content discarded — neither
/// stops the stream. Only an I/O error on the underlying pipe or cancellation ends
/// the pump early; both transition to `Closed` so nothing is delivered
/// afterwards.
///
/// # Errors
///
/// Returns `Ok(())` on clean EOF or cancellation; I/O errors are reported
/// through the event channel and also return `Ok(())`. An `Err` is only
/// possible if the event channel closes mid-delivery, which is reported
/// as [`AppError::Stream`].
pub async fn run_reader<R>(
    session_id: String,
    stdout: R,
    event_tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
{
    let mut framed = FramedRead::new(stdout, StreamCodec::new());
    let mut parser = StreamParser::new();
    let mut state = ReaderState::Idle;
    let mut saw_result = false;

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!(session_id, ?state, "stream reader: cancellation received, stopping");
                state = ReaderState::Closed;
                break;
            }

            item = framed.next() => {
                match item {
                    None => {
                        debug!(session_id, ?state, saw_result, "stream reader: EOF");
                        state = ReaderState::Closed;
                        send_event(
                            &event_tx,
                            &session_id,
                            StreamEvent::ProcessExited { exit_code: None, saw_result },
                        )
                        .await?;
                        break;
                    }

                    Some(Ok(StreamFrame::Oversized)) => {
                        // Length overrun — soft, framing resumes at the
                        // next terminator.
                        state = ReaderState::Streaming;
                        let error = format!("line too long: exceeded {MAX_LINE_BYTES} bytes");
                        warn!(session_id, error = error.as_str(), "stream reader: oversized line discarded");
                        send_event(
                            &event_tx,
                            &session_id,
                            StreamEvent::ParseFailure { line: String::new(), error },
                        )
                        .await?;
                    }

                    Some(Err(e)) => {
                        warn!(session_id, error = %e, "stream reader: IO error, stopping");
                        state = ReaderState::Closed;
                        send_event(
                            &event_tx,
                            &session_id,
                            StreamEvent::ProcessExited { exit_code: None, saw_result },
                        )
                        .await?;
                        break;
                    }

                    Some(Ok(StreamFrame::Line(line))) => {
                        state = ReaderState::Streaming;
                        for event in parser.parse_line(&line) {
                            if matches!(event, StreamEvent::TurnCompleted { .. }) {
                                saw_result = true;
                            }
                            send_event(&event_tx, &session_id, event).await?;
                        }
                    }
                }
            }
        }
    }

    debug!(session_id, ?state, "stream reader: finished");
    Ok(())
}

/// Pump subprocess stderr lines as [`StreamEvent::StderrLine`] events.
///
/// Stderr is diagnostic text only; it is surfaced distinctly and never
/// parsed as protocol.
///
/// # Errors
///
/// Returns [`AppError::Stream`] if the event channel closes mid-delivery.
pub async fn run_stderr_reader<R>(
    session_id: String,
    stderr: R,
    event_tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
{
    let mut lines = BufReader::new(stderr).lines();

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!(session_id, "stderr reader: cancellation received, stopping");
                break;
            }

            line = lines.next_line() => {
                match line {
                    Ok(Some(text)) => {
                        if text.trim().is_empty() {
                            continue;
                        }
                        send_event(&event_tx, &session_id, StreamEvent::StderrLine { text })
                            .await?;
                    }
                    Ok(None) => {
                        debug!(session_id, "stderr reader: EOF");
                        break;
                    }
                    Err(err) => {
                        warn!(session_id, %err, "stderr reader: IO error, stopping");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Forward one event, mapping a closed channel to [`AppError::Stream`].
async fn send_event(
    event_tx: &mpsc::Sender<StreamEvent>,
    session_id: &str,
    event: StreamEvent,
) -> Result<()> {
    event_tx.send(event).await.map_err(|_| {
        debug!(session_id, "event channel closed before delivery");
        AppError::Stream("event channel closed".into())
    })
}
