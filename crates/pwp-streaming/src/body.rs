//! Streamed response bodies with explicit close.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::channel::mpsc;
use futures::{SinkExt, Stream, StreamExt};

use crate::error::ComposeError;

/// Chunks buffered between writer and reader before `write` waits.
pub const DEFAULT_BODY_BUFFER: usize = 16;

enum Frame {
    Data(Bytes),
    End,
    Error(ComposeError),
}

/// State of the writing side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    /// Chunks may be written.
    Open,
    /// Closed normally; the reader sees end of stream.
    Closed,
    /// Aborted; the reader sees an error after the chunks already written.
    Failed,
}

/// Create a connected writer/reader pair.
pub fn body_channel(buffer: usize) -> (BodyWriter, BodyStream) {
    let (tx, rx) = mpsc::channel(buffer);
    (
        BodyWriter {
            tx,
            state: WriterState::Open,
            chunks: 0,
            bytes: 0,
        },
        BodyStream { rx, done: false },
    )
}

/// Writing half of a streamed body.
///
/// The body only ends cleanly through `close`. Dropping an open writer
/// makes the reader fail with `ComposeError::Truncated`.
pub struct BodyWriter {
    tx: mpsc::Sender<Frame>,
    state: WriterState,
    chunks: usize,
    bytes: usize,
}

impl BodyWriter {
    /// Append a chunk.
    pub async fn write(&mut self, chunk: impl Into<Bytes>) -> Result<(), ComposeError> {
        if self.state != WriterState::Open {
            return Err(ComposeError::Finished);
        }
        let chunk = chunk.into();
        let len = chunk.len();
        self.tx
            .send(Frame::Data(chunk))
            .await
            .map_err(|_| ComposeError::ReceiverDropped)?;
        self.chunks += 1;
        self.bytes += len;
        Ok(())
    }

    /// End the body normally.
    pub async fn close(&mut self) -> Result<(), ComposeError> {
        self.finish(Frame::End, WriterState::Closed).await
    }

    /// End the body with an error, after the chunks already written.
    pub async fn abort(&mut self, err: ComposeError) -> Result<(), ComposeError> {
        self.finish(Frame::Error(err), WriterState::Failed).await
    }

    async fn finish(&mut self, frame: Frame, state: WriterState) -> Result<(), ComposeError> {
        if self.state != WriterState::Open {
            return Err(ComposeError::Finished);
        }
        self.state = state;
        self.tx
            .send(frame)
            .await
            .map_err(|_| ComposeError::ReceiverDropped)?;
        self.tx.close_channel();
        Ok(())
    }

    /// Whether `close` or `abort` was called.
    pub fn is_finished(&self) -> bool {
        self.state != WriterState::Open
    }

    /// Number of chunks written.
    pub fn chunks_written(&self) -> usize {
        self.chunks
    }

    /// Number of body bytes written.
    pub fn bytes_written(&self) -> usize {
        self.bytes
    }
}

/// Reading half of a streamed body.
pub struct BodyStream {
    rx: mpsc::Receiver<Frame>,
    done: bool,
}

impl BodyStream {
    /// Read the whole body.
    pub async fn collect_bytes(mut self) -> Result<Bytes, ComposeError> {
        let mut body = Vec::new();
        while let Some(chunk) = self.next().await {
            body.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(body))
    }
}

impl Stream for BodyStream {
    type Item = Result<Bytes, ComposeError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        match self.rx.poll_next_unpin(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Frame::Data(chunk))) => Poll::Ready(Some(Ok(chunk))),
            Poll::Ready(Some(Frame::End)) => {
                self.done = true;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Frame::Error(err))) => {
                self.done = true;
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                self.done = true;
                Poll::Ready(Some(Err(ComposeError::Truncated)))
            }
        }
    }
}

impl std::fmt::Debug for BodyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyStream").field("done", &self.done).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_close_ends_stream() {
        let (mut writer, reader) = body_channel(DEFAULT_BODY_BUFFER);
        writer.write("<header>").await.unwrap();
        writer.write("<main>").await.unwrap();
        writer.close().await.unwrap();

        assert_eq!(writer.chunks_written(), 2);
        assert_eq!(writer.bytes_written(), 14);
        assert_eq!(reader.collect_bytes().await.unwrap(), "<header><main>");
    }

    #[tokio::test]
    async fn test_write_after_close_is_rejected() {
        let (mut writer, _reader) = body_channel(DEFAULT_BODY_BUFFER);
        writer.close().await.unwrap();
        assert!(writer.is_finished());
        assert!(matches!(writer.write("late").await, Err(ComposeError::Finished)));
        assert!(matches!(writer.close().await, Err(ComposeError::Finished)));
    }

    #[tokio::test]
    async fn test_abort_keeps_written_chunks() {
        let (mut writer, mut reader) = body_channel(DEFAULT_BODY_BUFFER);
        writer.write("<header>").await.unwrap();
        writer.abort(ComposeError::Aborted("boom".into())).await.unwrap();

        assert_eq!(reader.next().await.unwrap().unwrap(), "<header>");
        assert!(matches!(reader.next().await, Some(Err(ComposeError::Aborted(_)))));
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_writer_truncates() {
        let (mut writer, reader) = body_channel(DEFAULT_BODY_BUFFER);
        writer.write("partial").await.unwrap();
        drop(writer);
        assert!(matches!(reader.collect_bytes().await, Err(ComposeError::Truncated)));
    }

    #[tokio::test]
    async fn test_dropped_reader_fails_write() {
        let (mut writer, reader) = body_channel(DEFAULT_BODY_BUFFER);
        drop(reader);
        assert!(matches!(writer.write("x").await, Err(ComposeError::ReceiverDropped)));
    }
}
