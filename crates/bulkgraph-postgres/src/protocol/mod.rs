//! PostgreSQL wire protocol subset used for bulk loading.
//!
//! Only what a `COPY ... FROM STDIN` session needs after startup is modeled:
//! simple queries for transaction control and `SET LOCAL`, the copy-in
//! sub-protocol, and the asynchronous messages a server may interleave.
//!
//! # Message Format
//!
//! ```text
//! +------+--------+------------------+
//! | Type | Length | Payload          |
//! | 1B   | 4B     | (Length-4) bytes |
//! +------+--------+------------------+
//! ```
//!
//! Length includes itself (4 bytes) but not the type byte.

mod messages;
mod reader;
mod writer;

pub use messages::{BackendMessage, FrontendMessage, ServerError, TransactionStatus};
pub use reader::{MessageReader, ProtocolError};
pub use writer::MessageWriter;
