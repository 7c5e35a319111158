use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::Sender;

const CHUNK_SIZE: usize = 8192;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Byte buffer that keeps at most `cap` bytes and appends `marker` once when
/// more was offered. The cut never splits a UTF-8 sequence, so the kept part
/// may be up to three bytes shorter than `cap`.
#[derive(Debug)]
pub struct StreamCapture {
    buf: Vec<u8>,
    cap: usize,
    marker: &'static str,
    truncated: bool,
}

impl StreamCapture {
    pub fn new(cap: usize, marker: &'static str) -> Self {
        Self {
            buf: Vec::new(),
            cap,
            marker,
            truncated: false,
        }
    }

    /// Returns `true` only for the chunk that crossed the cap.
    pub fn push(&mut self, chunk: &[u8]) -> bool {
        if self.truncated {
            return false;
        }

        let room = self.cap.saturating_sub(self.buf.len());
        if chunk.len() <= room {
            self.buf.extend_from_slice(chunk);
            return false;
        }

        self.buf.extend_from_slice(&chunk[..room]);
        if is_continuation(chunk[room]) {
            drop_partial_char(&mut self.buf);
        }
        self.buf.extend_from_slice(self.marker.as_bytes());
        self.truncated = true;
        true
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

/// Removes a trailing multi-byte sequence whose remainder was cut off.
fn drop_partial_char(buf: &mut Vec<u8>) {
    let tail = buf.iter().rev().take(4).take_while(|b| is_continuation(**b)).count();
    let lead = buf.len().checked_sub(tail + 1);
    if let Some(lead) = lead.filter(|&at| buf[at] >= 0xC0) {
        buf.truncate(lead);
    }
}

pub fn lock(capture: &Mutex<StreamCapture>) -> MutexGuard<'_, StreamCapture> {
    capture.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reads `reader` into `capture` until EOF. Crossing the cap notifies
/// `overflow` once; the rest is read and discarded so the writer never sees a
/// closed pipe before it is killed.
pub async fn drain<R>(
    mut reader: R,
    stream: OutputStream,
    capture: Arc<Mutex<StreamCapture>>,
    overflow: Sender<OutputStream>,
) where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                if lock(&capture).push(&chunk[..n]) {
                    tracing::debug!(?stream, "Output limit exceeded");
                    let _ = overflow.send(stream).await;
                }
            }
            Err(e) => {
                tracing::debug!(?stream, "Stopped reading output: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = "\n...[cut]";

    #[test]
    fn test_push_within_cap() {
        let mut capture = StreamCapture::new(10, MARKER);
        assert!(!capture.push(b"hello"));
        assert!(!capture.push(b"world"));
        assert!(!capture.is_truncated());
        assert_eq!(capture.take(), b"helloworld");
    }

    #[test]
    fn test_push_over_cap_appends_marker_once() {
        let mut capture = StreamCapture::new(4, MARKER);
        assert!(capture.push(b"abcdef"));
        assert!(!capture.push(b"ghij"));
        assert!(capture.is_truncated());
        assert_eq!(capture.take(), b"abcd\n...[cut]");
    }

    #[test]
    fn test_zero_cap_keeps_only_marker() {
        let mut capture = StreamCapture::new(0, MARKER);
        assert!(!capture.push(b""));
        assert!(capture.push(b"x"));
        assert_eq!(capture.take(), MARKER.as_bytes());
    }

    #[test]
    fn test_cut_never_splits_a_character() {
        let mut capture = StreamCapture::new(4, MARKER);
        assert!(capture.push("ab€".as_bytes()));
        assert_eq!(capture.take(), "ab\n...[cut]".as_bytes());
    }

    #[test]
    fn test_cut_across_chunks_drops_dangling_lead_byte() {
        let mut capture = StreamCapture::new(4, MARKER);
        assert!(!capture.push(b"abc\xC3"));
        assert!(capture.push(b"\xA9d"));

        let kept = capture.take();
        assert_eq!(kept, "abc\n...[cut]".as_bytes());
        assert_eq!(String::from_utf8_lossy(&kept).len(), 3 + MARKER.len());
    }

    #[test]
    fn test_cut_on_boundary_keeps_full_cap() {
        let mut capture = StreamCapture::new(3, MARKER);
        assert!(capture.push("aé€".as_bytes()));
        assert_eq!(capture.take(), "aé\n...[cut]".as_bytes());
    }

    #[tokio::test]
    async fn test_drain_notifies_once_and_reads_to_eof() {
        let data = vec![b'a'; 100_000];
        let mut reader = &data[..];
        let capture = Arc::new(Mutex::new(StreamCapture::new(1000, MARKER)));
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);

        drain(&mut reader, OutputStream::Stdout, capture.clone(), tx).await;

        assert_eq!(rx.recv().await, Some(OutputStream::Stdout));
        assert_eq!(rx.recv().await, None);
        assert!(reader.is_empty());
        assert_eq!(lock(&capture).take().len(), 1000 + MARKER.len());
    }
}
