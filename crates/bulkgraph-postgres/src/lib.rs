//! PostgreSQL backend for bulkgraph.
//!
//! Rows reach the server through `COPY ... FROM STDIN` in text format:
//!
//! - [`PgSession`] wraps an authenticated stream and acts as the
//!   [`UnitOfWork`](bulkgraph_core::UnitOfWork) and
//!   [`ConnectionProvider`](bulkgraph_core::ConnectionProvider) for a load.
//! - [`PgCopyTransfer`] is the [`BulkTransfer`](bulkgraph_core::BulkTransfer)
//!   that turns each batch into one COPY.
//!
//! Startup and authentication are out of scope: hand [`PgSession::new`] a
//! stream that has already reached ReadyForQuery.
//!
//! ```ignore
//! let stream: TcpStream = connect_and_authenticate().await?;
//! let mut session = PgSession::new(stream);
//! let loader = BulkLoader::new(PgCopyTransfer::new());
//! let rows = loader.bulk_insert(&cx, &mut session, &orders).await;
//! ```

pub mod copy;
pub mod protocol;
pub mod session;
pub mod stream;
pub mod transfer;
pub mod wire;

pub use copy::{CopyFrames, copy_frames, copy_statement, encode_row};
pub use session::PgSession;
pub use stream::WireStream;
pub use transfer::PgCopyTransfer;
pub use wire::{PgWire, WireError};
