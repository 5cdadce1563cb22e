//! Framed-message codec over a bidirectional byte stream.
//!
//! Messages on the wire are a payload followed by the two-byte terminator
//! `\a\b`. Either terminator byte may appear alone inside a payload, so the
//! reader runs a two-state recognizer instead of a plain substring scan:
//! a lone `\a` is only committed to the payload once the following byte shows
//! it did not open a terminator.
//!
//! Reads are buffered; the recognizer consumes one byte at a time from the
//! buffer and any over-read bytes stay queued for the next frame. Every byte
//! is subject to the session's currently configured receive timeout, and the
//! reader gives up as soon as the byte count proves no valid frame can fit
//! the caller's payload cap.

use std::time::Duration;

use tokio::io::{
    AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};
use tokio::time::timeout;

use shared::{RECV_TIMEOUT, SERVER_SYNTAX_ERROR, TERM_FIRST, TERM_SECOND};

use crate::error::{Result, SessionError};

/// Terminator recognizer state: whether the previous byte opened a
/// terminator sequence.
enum ReadState {
    Open,
    Close,
}

/// Framed view of one robot connection.
///
/// Owns both halves of the stream so that protocol-level failures detected
/// while reading (an oversized frame) can still be reported on the outbound
/// side before the error propagates.
pub struct Wire<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    recv_timeout: Duration,
}

impl<S: AsyncRead + AsyncWrite> Wire<S> {
    pub fn new(stream: S) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(reader),
            writer,
            recv_timeout: RECV_TIMEOUT,
        }
    }

    /// Replaces the timeout applied to every subsequent byte read.
    pub fn set_recv_timeout(&mut self, recv_timeout: Duration) {
        self.recv_timeout = recv_timeout;
    }

    /// Writes `text` followed by the terminator.
    ///
    /// `text` must not contain the full terminator pair; callers only pass
    /// protocol literals and short decimal numbers.
    pub async fn send(&mut self, text: &str) -> Result<()> {
        let mut frame = Vec::with_capacity(text.len() + 2);
        frame.extend_from_slice(text.as_bytes());
        frame.push(TERM_FIRST);
        frame.push(TERM_SECOND);
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Reads one frame and returns its payload, terminator excluded.
    ///
    /// Fails with `Timeout` when no byte arrives in time and with `Syntax`
    /// (after sending `301 SYNTAX ERROR`) as soon as the consumed byte count
    /// makes a frame within `max_payload` impossible: `max_payload + 1`
    /// bytes with no terminator opened, or `max_payload + 2` bytes without
    /// completion.
    pub async fn read_frame(&mut self, max_payload: usize) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        let mut state = ReadState::Open;
        let mut consumed = 0usize;

        loop {
            let byte = self.next_byte().await?;
            consumed += 1;

            match state {
                ReadState::Open => match byte {
                    TERM_FIRST => state = ReadState::Close,
                    other => payload.push(other),
                },
                ReadState::Close => match byte {
                    TERM_SECOND => return Ok(payload),
                    // a repeated opener: the previous one was payload
                    TERM_FIRST => payload.push(TERM_FIRST),
                    other => {
                        payload.push(TERM_FIRST);
                        payload.push(other);
                        state = ReadState::Open;
                    }
                },
            }

            let open = matches!(state, ReadState::Open);
            if (consumed == max_payload + 1 && open) || consumed == max_payload + 2 {
                self.send(SERVER_SYNTAX_ERROR).await?;
                return Err(SessionError::Syntax);
            }
        }
    }

    async fn next_byte(&mut self) -> Result<u8> {
        match timeout(self.recv_timeout, self.reader.read_u8()).await {
            Ok(Ok(byte)) => Ok(byte),
            Ok(Err(err)) => Err(SessionError::Io(err)),
            Err(_elapsed) => Err(SessionError::Timeout),
        }
    }
}
