//! Message exchange over an established connection.

use crate::copy::CopyFrames;
use crate::protocol::{
    BackendMessage, FrontendMessage, MessageReader, MessageWriter, ProtocolError, ServerError,
    TransactionStatus,
};
use crate::stream::WireStream;
use asupersync::{Cx, Outcome};
use bulkgraph_core::{TableName, TransferError, TransferErrorKind, UnitOfWorkError};
use std::fmt;
use std::io;

/// Failure of a single exchange with the server.
#[derive(Debug)]
pub enum WireError {
    /// The server answered with an ErrorResponse.
    Server(ServerError),
    /// Reading or writing the stream failed.
    Io(io::Error),
    /// The server sent bytes that do not decode.
    Protocol(ProtocolError),
    /// A well-formed message arrived where it makes no sense.
    Unexpected(String),
}

impl WireError {
    /// The SQLSTATE reported by the server, if any.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            WireError::Server(fields) => Some(&fields.code),
            _ => None,
        }
    }

    /// Classify this failure as a transfer error against `table`.
    pub fn into_transfer_error(self, table: &TableName) -> TransferError {
        let (kind, message, sqlstate) = match &self {
            WireError::Server(fields) => {
                let kind = match fields.class() {
                    "23" => TransferErrorKind::Constraint,
                    // 57014 is query_canceled, raised by statement_timeout
                    "57" => TransferErrorKind::Timeout,
                    "08" => TransferErrorKind::Transport,
                    _ => TransferErrorKind::Rejected,
                };
                let mut message = fields.message.clone();
                if let Some(detail) = &fields.detail {
                    message.push_str(": ");
                    message.push_str(detail);
                }
                (kind, message, Some(fields.code.clone()))
            }
            WireError::Io(e) if e.kind() == io::ErrorKind::TimedOut => {
                (TransferErrorKind::Timeout, e.to_string(), None)
            }
            WireError::Io(e) => (TransferErrorKind::Transport, e.to_string(), None),
            WireError::Protocol(e) => (TransferErrorKind::Protocol, e.to_string(), None),
            WireError::Unexpected(msg) => (TransferErrorKind::Protocol, msg.clone(), None),
        };

        let mut err = TransferError::new(kind, message).table(table.to_string());
        if let Some(code) = sqlstate {
            err = err.sqlstate(code);
        }
        err.source(self)
    }

    /// Wrap this failure as a failed transaction-control operation.
    pub fn into_unit_of_work_error(self, operation: &'static str) -> UnitOfWorkError {
        UnitOfWorkError::new(operation, self.to_string()).source(self)
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Server(fields) => write!(f, "{fields}"),
            WireError::Io(e) => write!(f, "I/O error: {e}"),
            WireError::Protocol(e) => write!(f, "protocol error: {e}"),
            WireError::Unexpected(msg) => write!(f, "unexpected message: {msg}"),
        }
    }
}

impl std::error::Error for WireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WireError::Io(e) => Some(e),
            WireError::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WireError {
    fn from(err: io::Error) -> Self {
        WireError::Io(err)
    }
}

impl From<ProtocolError> for WireError {
    fn from(err: ProtocolError) -> Self {
        WireError::Protocol(err)
    }
}

/// Extract the row count from a command tag such as `COPY 42`.
fn parse_rows_affected(tag: &str) -> Option<u64> {
    tag.split_whitespace().last()?.parse().ok()
}

/// A PostgreSQL connection past startup, speaking simple query and copy-in.
pub struct PgWire<S> {
    stream: S,
    reader: MessageReader,
    writer: MessageWriter,
    read_buf: Vec<u8>,
    status: TransactionStatus,
}

impl<S: WireStream> PgWire<S> {
    /// Wrap a stream whose session is idle and ready for queries.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            reader: MessageReader::new(),
            writer: MessageWriter::new(),
            read_buf: vec![0; 8192],
            status: TransactionStatus::Idle,
        }
    }

    /// Transaction status from the most recent ReadyForQuery.
    pub fn transaction_status(&self) -> TransactionStatus {
        self.status
    }

    /// Give back the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Run one simple-query statement and return its last command tag.
    ///
    /// Result rows are discarded.
    pub async fn simple_query(
        &mut self,
        cx: &Cx,
        sql: &str,
    ) -> Outcome<Option<String>, WireError> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }
        match self.execute(sql).await {
            Ok(tag) => Outcome::Ok(tag),
            Err(e) => Outcome::Err(e),
        }
    }

    /// Like [`simple_query`](Self::simple_query) but runs even when the
    /// context is already cancelled.
    pub async fn execute(&mut self, sql: &str) -> Result<Option<String>, WireError> {
        tracing::trace!(sql, "simple query");
        self.send(&FrontendMessage::Query(sql.to_string())).await?;
        self.finish_query().await
    }

    /// Run a `COPY ... FROM STDIN` statement, sending one CopyData message per
    /// frame, and return the row count the server reports.
    ///
    /// Cancellation between frames aborts the copy with CopyFail, so the server
    /// discards everything sent so far.
    pub async fn copy_in(
        &mut self,
        cx: &Cx,
        statement: &str,
        frames: CopyFrames<'_>,
    ) -> Outcome<u64, WireError> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }

        tracing::trace!(statement, "copy in");
        if let Err(e) = self.send(&FrontendMessage::Query(statement.to_string())).await {
            return Outcome::Err(e);
        }
        if let Err(e) = self.await_copy_in().await {
            return Outcome::Err(e);
        }

        for frame in frames {
            if let Some(reason) = cx.cancel_reason() {
                if let Err(e) = self.abort_copy("bulk load cancelled").await {
                    tracing::warn!(error = %e, "failed to abort COPY after cancellation");
                }
                return Outcome::Cancelled(reason);
            }
            if let Err(e) = self.send(&FrontendMessage::CopyData(frame)).await {
                return Outcome::Err(e);
            }
        }

        if let Err(e) = self.send(&FrontendMessage::CopyDone).await {
            return Outcome::Err(e);
        }
        match self.finish_query().await {
            Ok(Some(tag)) => match parse_rows_affected(&tag) {
                Some(rows) => Outcome::Ok(rows),
                None => Outcome::Err(WireError::Unexpected(format!(
                    "COPY completed with tag {tag:?}"
                ))),
            },
            Ok(None) => Outcome::Err(WireError::Unexpected(
                "COPY completed without a command tag".to_string(),
            )),
            Err(e) => Outcome::Err(e),
        }
    }

    async fn send(&mut self, msg: &FrontendMessage) -> Result<(), WireError> {
        let data = self.writer.write(msg);
        self.stream.write_all(data).await?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<BackendMessage, WireError> {
        loop {
            if let Some(msg) = self.reader.next_message()? {
                return Ok(msg);
            }
            let n = self.stream.read_into(&mut self.read_buf).await?;
            if n == 0 {
                return Err(WireError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by server",
                )));
            }
            self.reader.push(&self.read_buf[..n]);
        }
    }

    /// Next message that belongs to the current exchange.
    async fn receive_reply(&mut self) -> Result<BackendMessage, WireError> {
        loop {
            match self.receive().await? {
                BackendMessage::NoticeResponse(notice) => {
                    tracing::debug!(code = %notice.code, message = %notice.message, "server notice");
                }
                msg if msg.is_asynchronous() => {
                    tracing::trace!(?msg, "skipping asynchronous message");
                }
                msg => return Ok(msg),
            }
        }
    }

    /// Collect replies up to ReadyForQuery: the last command tag, or the first
    /// error.
    async fn finish_query(&mut self) -> Result<Option<String>, WireError> {
        let mut tag = None;
        let mut error = None;
        loop {
            match self.receive_reply().await? {
                BackendMessage::ReadyForQuery(status) => {
                    self.status = status;
                    break;
                }
                BackendMessage::CommandComplete(t) => tag = Some(t),
                BackendMessage::ErrorResponse(fields) => {
                    if error.is_none() {
                        error = Some(fields);
                    }
                }
                BackendMessage::CopyInResponse { .. } => {
                    self.send(&FrontendMessage::CopyFail(
                        "unexpected COPY FROM STDIN".to_string(),
                    ))
                    .await?;
                }
                _ => {}
            }
        }
        match error {
            Some(fields) => Err(WireError::Server(fields)),
            None => Ok(tag),
        }
    }

    async fn await_copy_in(&mut self) -> Result<(), WireError> {
        match self.receive_reply().await? {
            BackendMessage::CopyInResponse { format: 0, .. } => Ok(()),
            BackendMessage::CopyInResponse { format, .. } => {
                self.abort_copy("binary COPY is not supported").await?;
                Err(WireError::Unexpected(format!(
                    "server requested COPY format {format}"
                )))
            }
            BackendMessage::ErrorResponse(fields) => {
                self.finish_query().await?;
                Err(WireError::Server(fields))
            }
            BackendMessage::ReadyForQuery(status) => {
                self.status = status;
                Err(WireError::Unexpected(
                    "statement finished without entering COPY".to_string(),
                ))
            }
            other => {
                self.finish_query().await?;
                Err(WireError::Unexpected(format!(
                    "expected CopyInResponse, got {other:?}"
                )))
            }
        }
    }

    /// Send CopyFail and drain the server's error up to ReadyForQuery.
    async fn abort_copy(&mut self, reason: &str) -> Result<(), WireError> {
        self.send(&FrontendMessage::CopyFail(reason.to_string()))
            .await?;
        match self.finish_query().await {
            Ok(_) | Err(WireError::Server(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_error(code: &str) -> WireError {
        WireError::Server(ServerError {
            severity: "ERROR".to_string(),
            code: code.to_string(),
            message: "boom".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn sqlstate_classes_map_to_transfer_kinds() {
        let table = TableName::new("orders");
        let cases = [
            ("23505", TransferErrorKind::Constraint),
            ("23503", TransferErrorKind::Constraint),
            ("57014", TransferErrorKind::Timeout),
            ("57P01", TransferErrorKind::Timeout),
            ("08006", TransferErrorKind::Transport),
            ("42P01", TransferErrorKind::Rejected),
            ("22P02", TransferErrorKind::Rejected),
        ];
        for (code, kind) in cases {
            let err = server_error(code).into_transfer_error(&table);
            assert_eq!(err.kind, kind, "SQLSTATE {code}");
            assert_eq!(err.sqlstate.as_deref(), Some(code));
            assert_eq!(err.table.as_deref(), Some("orders"));
        }
    }

    #[test]
    fn io_errors_map_to_transport_or_timeout() {
        let table = TableName::new("orders");
        let reset = WireError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert_eq!(
            reset.into_transfer_error(&table).kind,
            TransferErrorKind::Transport
        );
        let slow = WireError::Io(io::Error::new(io::ErrorKind::TimedOut, "slow"));
        assert_eq!(
            slow.into_transfer_error(&table).kind,
            TransferErrorKind::Timeout
        );
        let garbled = WireError::Protocol(ProtocolError::UnknownTag(b'?'));
        let err = garbled.into_transfer_error(&table);
        assert_eq!(err.kind, TransferErrorKind::Protocol);
        assert!(err.sqlstate.is_none());
    }

    #[test]
    fn detail_is_kept_in_message() {
        let err = WireError::Server(ServerError {
            code: "23505".to_string(),
            message: "duplicate key value violates unique constraint \"orders_pkey\"".to_string(),
            detail: Some("Key (id)=(1) already exists.".to_string()),
            ..Default::default()
        })
        .into_transfer_error(&TableName::qualified("sales", "orders"));
        assert!(err.message.ends_with("Key (id)=(1) already exists."));
        assert_eq!(err.table.as_deref(), Some("sales.orders"));
    }

    #[test]
    fn unit_of_work_error_names_operation() {
        let err = server_error("25P02").into_unit_of_work_error("commit");
        assert_eq!(err.operation, "commit");
        assert!(err.message.contains("boom"));
    }

    #[test]
    fn rows_affected_from_tag() {
        assert_eq!(parse_rows_affected("COPY 42"), Some(42));
        assert_eq!(parse_rows_affected("COPY"), None);
        assert_eq!(parse_rows_affected(""), None);
    }
}
