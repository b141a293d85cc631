//! Wire frames for the store's text protocol.
//!
//! A [`Frame`] is a single parsed reply value. The parser is incremental:
//! it operates on whatever bytes the connection has buffered so far and
//! reports `None` until a complete frame is available, letting the caller
//! retry after the next read. Commands travel as arrays of bulk strings.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ClusterError, Result};

/// Nesting cap for arrays; malformed input must not overflow the stack.
const MAX_NESTING_DEPTH: usize = 32;

/// A single protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Simple string reply, e.g. `+OK\r\n`
    Simple(String),
    /// Error reply, e.g. `-MOVED 3999 127.0.0.1:6381\r\n`
    Error(String),
    /// Signed 64-bit integer, e.g. `:42\r\n`
    Integer(i64),
    /// Binary-safe bulk string, e.g. `$5\r\nhello\r\n`
    Bulk(Bytes),
    /// Array of frames, e.g. `*1\r\n+PONG\r\n`
    Array(Vec<Frame>),
    /// Null reply (`$-1\r\n` or `*-1\r\n`)
    Null,
}

impl Frame {
    /// Returns `true` for a null reply.
    pub fn is_null(&self) -> bool {
        matches!(self, Frame::Null)
    }

    /// Consumes an `+OK`-style status reply.
    pub fn expect_ok(self) -> Result<()> {
        match self {
            Frame::Simple(s) if s == "OK" => Ok(()),
            Frame::Error(e) => Err(ClusterError::Server(e)),
            other => Err(ClusterError::UnexpectedReply(format!("{other:?}"))),
        }
    }

    /// Consumes an integer reply.
    pub fn into_integer(self) -> Result<i64> {
        match self {
            Frame::Integer(n) => Ok(n),
            Frame::Error(e) => Err(ClusterError::Server(e)),
            other => Err(ClusterError::UnexpectedReply(format!("{other:?}"))),
        }
    }

    /// Consumes a bulk reply, mapping null to `None`.
    pub fn into_optional_bytes(self) -> Result<Option<Bytes>> {
        match self {
            Frame::Bulk(b) => Ok(Some(b)),
            Frame::Null => Ok(None),
            Frame::Error(e) => Err(ClusterError::Server(e)),
            other => Err(ClusterError::UnexpectedReply(format!("{other:?}"))),
        }
    }

    /// Consumes a simple-or-bulk reply as UTF-8 text.
    pub fn into_string(self) -> Result<String> {
        match self {
            Frame::Simple(s) => Ok(s),
            Frame::Bulk(b) => String::from_utf8(b.to_vec())
                .map_err(|_| ClusterError::Protocol("invalid utf-8 in bulk reply".into())),
            Frame::Error(e) => Err(ClusterError::Server(e)),
            other => Err(ClusterError::UnexpectedReply(format!("{other:?}"))),
        }
    }

    /// Consumes an array reply.
    pub fn into_array(self) -> Result<Vec<Frame>> {
        match self {
            Frame::Array(items) => Ok(items),
            Frame::Error(e) => Err(ClusterError::Server(e)),
            other => Err(ClusterError::UnexpectedReply(format!("{other:?}"))),
        }
    }
}

/// Serializes a command as an array of bulk strings into `dst`.
pub fn encode_command(args: &[Bytes], dst: &mut BytesMut) {
    dst.reserve(16 + args.iter().map(|a| a.len() + 16).sum::<usize>());
    dst.put_u8(b'*');
    dst.extend_from_slice(args.len().to_string().as_bytes());
    dst.extend_from_slice(b"\r\n");
    for arg in args {
        dst.put_u8(b'$');
        dst.extend_from_slice(arg.len().to_string().as_bytes());
        dst.extend_from_slice(b"\r\n");
        dst.extend_from_slice(arg);
        dst.extend_from_slice(b"\r\n");
    }
}

/// Tries to parse one complete frame from the front of `buf`.
///
/// Returns `Ok(Some((frame, consumed)))` on success, `Ok(None)` when the
/// buffer does not yet hold a complete frame, and an error on malformed
/// data.
pub fn parse(buf: &[u8]) -> Result<Option<(Frame, usize)>> {
    if buf.is_empty() {
        return Ok(None);
    }
    let mut pos = 0usize;
    match parse_at(buf, &mut pos, 0) {
        Ok(frame) => Ok(Some((frame, pos))),
        Err(Incomplete::NeedMore) => Ok(None),
        Err(Incomplete::Malformed(msg)) => Err(ClusterError::Protocol(msg)),
    }
}

enum Incomplete {
    NeedMore,
    Malformed(String),
}

fn parse_at(buf: &[u8], pos: &mut usize, depth: usize) -> std::result::Result<Frame, Incomplete> {
    if *pos >= buf.len() {
        return Err(Incomplete::NeedMore);
    }
    let prefix = buf[*pos];
    *pos += 1;
    match prefix {
        b'+' => Ok(Frame::Simple(read_text_line(buf, pos)?)),
        b'-' => Ok(Frame::Error(read_text_line(buf, pos)?)),
        b':' => {
            let line = read_line(buf, pos)?;
            Ok(Frame::Integer(parse_i64(line)?))
        }
        b'$' => {
            let len = parse_i64(read_line(buf, pos)?)?;
            if len == -1 {
                return Ok(Frame::Null);
            }
            if len < 0 {
                return Err(Incomplete::Malformed(format!("invalid bulk length {len}")));
            }
            let len = len as usize;
            if buf.len() - *pos < len + 2 {
                return Err(Incomplete::NeedMore);
            }
            let data = &buf[*pos..*pos + len];
            if &buf[*pos + len..*pos + len + 2] != b"\r\n" {
                return Err(Incomplete::Malformed("bulk string missing terminator".into()));
            }
            *pos += len + 2;
            Ok(Frame::Bulk(Bytes::copy_from_slice(data)))
        }
        b'*' => {
            if depth + 1 > MAX_NESTING_DEPTH {
                return Err(Incomplete::Malformed("reply nested too deeply".into()));
            }
            let count = parse_i64(read_line(buf, pos)?)?;
            if count == -1 {
                return Ok(Frame::Null);
            }
            if count < 0 {
                return Err(Incomplete::Malformed(format!("invalid array length {count}")));
            }
            let mut items = Vec::with_capacity((count as usize).min(1024));
            for _ in 0..count {
                items.push(parse_at(buf, pos, depth + 1)?);
            }
            Ok(Frame::Array(items))
        }
        other => Err(Incomplete::Malformed(format!(
            "unknown reply prefix 0x{other:02x}"
        ))),
    }
}

/// Returns the bytes up to the next CRLF and advances past it.
fn read_line<'a>(buf: &'a [u8], pos: &mut usize) -> std::result::Result<&'a [u8], Incomplete> {
    let start = *pos;
    let mut search = start;
    while let Some(offset) = memchr::memchr(b'\r', &buf[search..]) {
        let cr = search + offset;
        if cr + 1 >= buf.len() {
            return Err(Incomplete::NeedMore);
        }
        if buf[cr + 1] == b'\n' {
            *pos = cr + 2;
            return Ok(&buf[start..cr]);
        }
        search = cr + 1;
    }
    Err(Incomplete::NeedMore)
}

fn read_text_line(buf: &[u8], pos: &mut usize) -> std::result::Result<String, Incomplete> {
    let line = read_line(buf, pos)?;
    std::str::from_utf8(line)
        .map(str::to_owned)
        .map_err(|_| Incomplete::Malformed("invalid utf-8 in reply line".into()))
}

fn parse_i64(line: &[u8]) -> std::result::Result<i64, Incomplete> {
    let text = std::str::from_utf8(line)
        .map_err(|_| Incomplete::Malformed("invalid integer line".into()))?;
    text.parse()
        .map_err(|_| Incomplete::Malformed(format!("invalid integer {text:?}")))
}
