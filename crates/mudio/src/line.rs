use bytes::BytesMut;
use memchr::memchr2;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;

use crate::telnet::TelnetFilter;

const DEFAULT_MAX_LINE: usize = 4 * 1024;

/// Reads text lines from a telnet peer.
///
/// Bytes go through a [`TelnetFilter`] before framing, so negotiation never shows up as
/// input. Any of `\n`, `\r\n`, `\r\0` or a lone `\r` ends a line.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    telnet: TelnetFilter,
    raw: Vec<u8>,
    buf: BytesMut,
    max_line_len: usize,
    // A line ended in `\r`; swallow a following `\n` or `\0`.
    after_cr: bool,
}

impl<R> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            telnet: TelnetFilter::new(),
            raw: Vec::with_capacity(1024),
            buf: BytesMut::with_capacity(1024),
            max_line_len: DEFAULT_MAX_LINE,
            after_cr: false,
        }
    }

    pub fn max_line_len(mut self, max: usize) -> Self {
        self.max_line_len = max.max(1);
        self
    }

    /// Telnet negotiation replies owed to the peer.
    pub fn take_replies(&mut self) -> Vec<u8> {
        self.telnet.take_replies()
    }

    fn pop_line(&mut self) -> Option<String> {
        if self.after_cr {
            if let Some(&b) = self.buf.first() {
                if b == b'\n' || b == 0 {
                    let _ = self.buf.split_to(1);
                }
                self.after_cr = false;
            }
        }

        let i = memchr2(b'\n', b'\r', &self.buf)?;
        let eol = self.buf[i];
        let line = self.buf.split_to(i);
        let _ = self.buf.split_to(1);
        self.after_cr = eol == b'\r';
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Read one line without its terminator.
    ///
    /// Returns:
    /// - `Ok(Some(line))` for a line (may be empty),
    /// - `Ok(None)` on EOF. A partial unterminated line at EOF is discarded.
    pub async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            if let Some(line) = self.pop_line() {
                return Ok(Some(line));
            }

            if self.buf.len() > self.max_line_len {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "line too long",
                ));
            }

            let mut chunk = [0u8; 1024];
            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                return Ok(None);
            }

            self.raw.clear();
            self.telnet.filter_into(&chunk[..n], &mut self.raw);
            self.buf.extend_from_slice(&self.raw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn splits_on_every_line_ending() {
        let (a, mut b) = tokio::io::duplex(256);
        tokio::spawn(async move {
            b.write_all(b"look\r\nsay hi\nnorth\r\0\r\nwhoami\r")
                .await
                .unwrap();
        });

        let mut lr = LineReader::new(a);
        assert_eq!(lr.read_line().await.unwrap().as_deref(), Some("look"));
        assert_eq!(lr.read_line().await.unwrap().as_deref(), Some("say hi"));
        assert_eq!(lr.read_line().await.unwrap().as_deref(), Some("north"));
        assert_eq!(lr.read_line().await.unwrap().as_deref(), Some(""));
        assert_eq!(lr.read_line().await.unwrap().as_deref(), Some("whoami"));
        assert_eq!(lr.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn strips_negotiation_and_keeps_replies() {
        let (a, mut b) = tokio::io::duplex(256);
        tokio::spawn(async move {
            b.write_all(&[255, 253, 1, b'h', b'i', b'\n']).await.unwrap();
        });

        let mut lr = LineReader::new(a);
        assert_eq!(lr.read_line().await.unwrap().as_deref(), Some("hi"));
        assert_eq!(lr.take_replies(), vec![255, 252, 1]);
    }

    #[tokio::test]
    async fn rejects_overlong_lines() {
        let (a, mut b) = tokio::io::duplex(256);
        tokio::spawn(async move {
            b.write_all(&[b'x'; 64]).await.unwrap();
        });

        let mut lr = LineReader::new(a).max_line_len(16);
        let err = lr.read_line().await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
