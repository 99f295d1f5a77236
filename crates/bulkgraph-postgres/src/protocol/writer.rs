//! Framing of frontend messages.

use super::messages::FrontendMessage;

/// Encodes frontend messages into a reusable buffer.
#[derive(Debug, Default)]
pub struct MessageWriter {
    buf: Vec<u8>,
}

impl MessageWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame `msg`. The slice is overwritten by the next call.
    pub fn write(&mut self, msg: &FrontendMessage) -> &[u8] {
        self.buf.clear();
        self.buf.push(msg.tag());
        self.buf.extend_from_slice(&[0; 4]);
        match msg {
            FrontendMessage::Query(text) | FrontendMessage::CopyFail(text) => {
                self.buf.extend_from_slice(text.as_bytes());
                self.buf.push(0);
            }
            FrontendMessage::CopyData(data) => self.buf.extend_from_slice(data),
            FrontendMessage::CopyDone => {}
        }
        let len = (self.buf.len() - 1) as i32;
        self.buf[1..5].copy_from_slice(&len.to_be_bytes());
        &self.buf
    }
}
