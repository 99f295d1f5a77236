//! Incremental decoding of backend frames.

use super::messages::{BackendMessage, ServerError, TransactionStatus};
use std::fmt;
use std::string::FromUtf8Error;

const DEFAULT_MAX_FRAME: usize = 8 * 1024 * 1024;

/// Bytes from the server that do not form a valid message.
#[derive(Debug)]
pub enum ProtocolError {
    /// A frame ended before one of its fields did.
    Truncated,
    /// Length prefix below the minimum of 4.
    BadLength(i32),
    /// Frame larger than the reader accepts.
    TooLarge { length: usize, max: usize },
    UnknownTag(u8),
    BadTransactionStatus(u8),
    Utf8(FromUtf8Error),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => f.write_str("truncated message"),
            Self::BadLength(len) => write!(f, "invalid length prefix {len}"),
            Self::TooLarge { length, max } => {
                write!(f, "message of {length} bytes exceeds limit of {max}")
            }
            Self::UnknownTag(tag) => write!(f, "unknown message type {:?}", char::from(*tag)),
            Self::BadTransactionStatus(b) => {
                write!(f, "invalid transaction status {:?}", char::from(*b))
            }
            Self::Utf8(e) => write!(f, "invalid UTF-8 in message: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Utf8(e) => Some(e),
            _ => None,
        }
    }
}

/// Buffers socket reads and splits them into backend messages.
#[derive(Debug, Clone)]
pub struct MessageReader {
    buf: Vec<u8>,
    max_frame: usize,
}

impl Default for MessageReader {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageReader {
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_FRAME)
    }

    pub fn with_max_size(max_frame: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_frame,
        }
    }

    /// Bytes received but not yet decoded.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Decode the next complete message, or `None` until more bytes arrive.
    pub fn next_message(&mut self) -> Result<Option<BackendMessage>, ProtocolError> {
        let Some(header) = self.buf.get(..5) else {
            return Ok(None);
        };
        let tag = header[0];
        let length = i32::from_be_bytes([header[1], header[2], header[3], header[4]]);
        if length < 4 {
            return Err(ProtocolError::BadLength(length));
        }
        let frame_len = length as usize + 1;
        if frame_len > self.max_frame {
            return Err(ProtocolError::TooLarge {
                length: frame_len,
                max: self.max_frame,
            });
        }
        if self.buf.len() < frame_len {
            return Ok(None);
        }

        let frame: Vec<u8> = self.buf.drain(..frame_len).collect();
        decode(tag, &frame[5..]).map(Some)
    }
}

fn decode(tag: u8, body: &[u8]) -> Result<BackendMessage, ProtocolError> {
    let mut body = Fields(body);
    let msg = match tag {
        b'Z' => {
            let b = body.byte()?;
            let status =
                TransactionStatus::from_byte(b).ok_or(ProtocolError::BadTransactionStatus(b))?;
            BackendMessage::ReadyForQuery(status)
        }
        b'C' => BackendMessage::CommandComplete(body.cstr()?),
        b'G' => {
            let format = body.byte()? as i8;
            let columns = body.int16()?;
            BackendMessage::CopyInResponse {
                format,
                columns: usize::try_from(columns).unwrap_or(0),
            }
        }
        b'E' => BackendMessage::ErrorResponse(server_error(&mut body)?),
        b'N' => BackendMessage::NoticeResponse(server_error(&mut body)?),
        b'S' => BackendMessage::ParameterStatus {
            name: body.cstr()?,
            value: body.cstr()?,
        },
        // row description, data row, empty query, notification
        b'T' | b'D' | b'I' | b'A' => BackendMessage::Skipped(tag),
        other => return Err(ProtocolError::UnknownTag(other)),
    };
    Ok(msg)
}

fn server_error(body: &mut Fields<'_>) -> Result<ServerError, ProtocolError> {
    let mut err = ServerError::default();
    loop {
        let field = body.byte()?;
        if field == 0 {
            return Ok(err);
        }
        let value = body.cstr()?;
        match field {
            b'S' => err.severity = value,
            b'C' => err.code = value,
            b'M' => err.message = value,
            b'D' => err.detail = Some(value),
            b'H' => err.hint = Some(value),
            b'W' => err.context = Some(value),
            b't' => err.table = Some(value),
            b'c' => err.column = Some(value),
            b'n' => err.constraint = Some(value),
            _ => {}
        }
    }
}

/// Forward-only view over a message body.
struct Fields<'a>(&'a [u8]);

impl<'a> Fields<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.0.len() < n {
            return Err(ProtocolError::Truncated);
        }
        let (head, rest) = self.0.split_at(n);
        self.0 = rest;
        Ok(head)
    }

    fn byte(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    fn int16(&mut self) -> Result<i16, ProtocolError> {
        let b = self.take(2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    fn cstr(&mut self) -> Result<String, ProtocolError> {
        let end = self
            .0
            .iter()
            .position(|&b| b == 0)
            .ok_or(ProtocolError::Truncated)?;
        let text = self.take(end)?.to_vec();
        self.take(1)?;
        String::from_utf8(text).map_err(ProtocolError::Utf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: u8, body: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        out.extend_from_slice(&((body.len() + 4) as i32).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    fn decode_one(bytes: &[u8]) -> BackendMessage {
        let mut reader = MessageReader::new();
        reader.push(bytes);
        let msg = reader.next_message().unwrap().unwrap();
        assert_eq!(reader.buffered_len(), 0);
        msg
    }

    #[test]
    fn ready_for_query() {
        assert_eq!(
            decode_one(&frame(b'Z', b"E")),
            BackendMessage::ReadyForQuery(TransactionStatus::Failed)
        );
    }

    #[test]
    fn copy_in_response() {
        let body = [0, 0, 2, 0, 0, 0, 0];
        assert_eq!(
            decode_one(&frame(b'G', &body)),
            BackendMessage::CopyInResponse {
                format: 0,
                columns: 2
            }
        );
    }

    #[test]
    fn error_response_keeps_known_fields() {
        let body = b"SERROR\0C23503\0Minsert violates foreign key\0tline_items\0\
                     norders_fk\0Fri_triggers.c\0L2600\0\0";
        match decode_one(&frame(b'E', body)) {
            BackendMessage::ErrorResponse(err) => {
                assert_eq!(err.code, "23503");
                assert_eq!(err.table.as_deref(), Some("line_items"));
                assert_eq!(err.constraint.as_deref(), Some("orders_fk"));
                assert_eq!(err.class(), "23");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn row_traffic_is_skipped() {
        assert_eq!(
            decode_one(&frame(b'D', &[0, 1, 0, 0, 0, 1, b'x'])),
            BackendMessage::Skipped(b'D')
        );
    }

    #[test]
    fn split_reads_are_reassembled() {
        let mut bytes = frame(b'C', b"COPY 12\0");
        bytes.extend(frame(b'Z', b"T"));

        let mut reader = MessageReader::new();
        reader.push(&bytes[..6]);
        assert!(reader.next_message().unwrap().is_none());
        reader.push(&bytes[6..]);
        assert_eq!(
            reader.next_message().unwrap(),
            Some(BackendMessage::CommandComplete("COPY 12".to_string()))
        );
        assert_eq!(
            reader.next_message().unwrap(),
            Some(BackendMessage::ReadyForQuery(TransactionStatus::InTransaction))
        );
        assert!(reader.next_message().unwrap().is_none());
    }

    #[test]
    fn malformed_frames_are_errors() {
        let mut reader = MessageReader::new();
        reader.push(&[b'Z', 0, 0, 0, 2]);
        assert!(matches!(
            reader.next_message(),
            Err(ProtocolError::BadLength(2))
        ));

        let mut reader = MessageReader::with_max_size(16);
        reader.push(&frame(b'C', &[b'x'; 32]));
        assert!(matches!(
            reader.next_message(),
            Err(ProtocolError::TooLarge { .. })
        ));

        let mut reader = MessageReader::new();
        reader.push(&frame(b'?', &[]));
        assert!(matches!(
            reader.next_message(),
            Err(ProtocolError::UnknownTag(b'?'))
        ));

        let mut reader = MessageReader::new();
        reader.push(&frame(b'C', b"no terminator"));
        assert!(matches!(reader.next_message(), Err(ProtocolError::Truncated)));
    }
}
