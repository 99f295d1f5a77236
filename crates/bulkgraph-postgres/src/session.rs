//! Transaction control over a [`PgWire`].

#![allow(clippy::manual_async_fn)]

use crate::protocol::TransactionStatus;
use crate::stream::WireStream;
use crate::wire::PgWire;
use asupersync::{Cx, Outcome};
use bulkgraph_core::{ConnectionProvider, Error, UnitOfWork, UnitOfWorkError};
use std::future::Future;

/// A PostgreSQL session that serves as its own unit of work.
///
/// The transaction state is whatever the server last reported, so a
/// transaction opened directly on [`wire_mut`](Self::wire_mut) is joined by
/// the loader just like one opened through [`UnitOfWork::begin`].
pub struct PgSession<S> {
    wire: PgWire<S>,
}

impl<S: WireStream> PgSession<S> {
    /// Start a session on an authenticated, idle stream.
    pub fn new(stream: S) -> Self {
        Self {
            wire: PgWire::new(stream),
        }
    }

    pub fn wire(&self) -> &PgWire<S> {
        &self.wire
    }

    pub fn wire_mut(&mut self) -> &mut PgWire<S> {
        &mut self.wire
    }

    /// Close the session and give back the stream.
    pub fn into_stream(self) -> S {
        self.wire.into_inner()
    }

    async fn control(
        &mut self,
        cx: &Cx,
        operation: &'static str,
        sql: &str,
    ) -> Outcome<(), Error> {
        // ROLLBACK is how a cancelled load cleans up, so it ignores the
        // cancellation state.
        let outcome = if operation == "rollback" {
            match self.wire.execute(sql).await {
                Ok(tag) => Outcome::Ok(tag),
                Err(e) => Outcome::Err(e),
            }
        } else {
            self.wire.simple_query(cx, sql).await
        };
        let tag = match outcome {
            Outcome::Ok(tag) => tag,
            Outcome::Err(e) => return Outcome::Err(e.into_unit_of_work_error(operation).into()),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        // COMMIT of a failed transaction succeeds at the protocol level but
        // reports ROLLBACK.
        if operation == "commit" && tag.as_deref() == Some("ROLLBACK") {
            return Outcome::Err(
                UnitOfWorkError::new(operation, "transaction was rolled back by the server")
                    .into(),
            );
        }

        tracing::debug!(operation, "transaction control complete");
        Outcome::Ok(())
    }
}

impl<S: WireStream> UnitOfWork for PgSession<S> {
    type Channel = PgWire<S>;

    fn is_active(&self) -> bool {
        self.wire.transaction_status() != TransactionStatus::Idle
    }

    fn begin(&mut self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
        self.control(cx, "begin", "BEGIN")
    }

    fn commit(&mut self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
        self.control(cx, "commit", "COMMIT")
    }

    fn rollback(&mut self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
        self.control(cx, "rollback", "ROLLBACK")
    }

    fn channel(&mut self) -> &mut Self::Channel {
        &mut self.wire
    }
}

impl<S: WireStream> ConnectionProvider for PgSession<S> {
    type Work = Self;

    fn unit_of_work(&mut self) -> &mut Self::Work {
        self
    }
}
