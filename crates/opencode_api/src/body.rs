use std::fmt;
use std::io::{self, Read};

use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use reqwest::Response;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

/// Blocking [`Read`] view of a streaming response body.
///
/// Each `read` drives the async body on `handle`. Once `cancel` fires, the
/// blocked read and every later one fail with `ConnectionAborted`.
/// Must not be read from inside the runtime's own worker threads.
pub struct EventStreamBody {
    stream: BoxStream<'static, io::Result<Vec<u8>>>,
    pending: Vec<u8>,
    offset: usize,
    handle: Handle,
    cancel: CancellationToken,
    finished: bool,
}

impl EventStreamBody {
    pub fn new(response: Response, handle: Handle, cancel: CancellationToken) -> Self {
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(io::Error::other));
        Self::from_stream(stream, handle, cancel)
    }

    pub fn from_stream<S>(stream: S, handle: Handle, cancel: CancellationToken) -> Self
    where
        S: Stream<Item = io::Result<Vec<u8>>> + Send + 'static,
    {
        Self {
            stream: stream.boxed(),
            pending: Vec::new(),
            offset: 0,
            handle,
            cancel,
            finished: false,
        }
    }

    fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        if self.cancel.is_cancelled() {
            return Err(cancelled_error());
        }

        let stream = &mut self.stream;
        let cancel = &self.cancel;
        let next = self.handle.block_on(async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                chunk = stream.next() => Some(chunk),
            }
        });

        match next {
            None => Err(cancelled_error()),
            Some(None) => Ok(None),
            Some(Some(chunk)) => chunk.map(Some),
        }
    }
}

impl Read for EventStreamBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            if self.offset < self.pending.len() {
                let available = &self.pending[self.offset..];
                let count = available.len().min(buf.len());
                buf[..count].copy_from_slice(&available[..count]);
                self.offset += count;
                return Ok(count);
            }
            if self.finished {
                return Ok(0);
            }

            match self.next_chunk()? {
                Some(chunk) => {
                    self.pending = chunk;
                    self.offset = 0;
                }
                None => self.finished = true,
            }
        }
    }
}

impl fmt::Debug for EventStreamBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStreamBody")
            .field("buffered", &(self.pending.len() - self.offset))
            .field("finished", &self.finished)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

fn cancelled_error() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionAborted, "event stream cancelled")
}
