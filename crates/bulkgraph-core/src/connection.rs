//! Collaborator contracts implemented by database backends.
//!
//! The loader never talks to a database directly. It borrows a
//! [`UnitOfWork`] from a [`ConnectionProvider`], and pushes every batch
//! through a [`BulkTransfer`] over the unit of work's channel.

use crate::batch::BulkRequest;
use crate::error::Error;
use asupersync::{Cx, Outcome};
use std::future::Future;

/// A transactional boundary with an open data channel.
///
/// All operations take `&mut self`: a unit of work is driven by exactly one
/// load at a time.
pub trait UnitOfWork: Send {
    /// The channel bulk transfers run over (typically the connection).
    type Channel: Send;

    /// Whether a transaction is already open.
    fn is_active(&self) -> bool;

    /// Open a transaction.
    fn begin(&mut self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send;

    /// Make every transfer since `begin` durable.
    fn commit(&mut self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send;

    /// Discard every transfer since `begin`.
    fn rollback(&mut self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send;

    /// The channel transfers should use while this unit of work is open.
    fn channel(&mut self) -> &mut Self::Channel;
}

/// Source of the unit of work a load runs in.
pub trait ConnectionProvider: Send {
    type Work: UnitOfWork;

    /// The provider's unit of work, open or not.
    fn unit_of_work(&mut self) -> &mut Self::Work;
}

/// The native high-throughput bulk-load channel for a backend.
///
/// `send` moves every row of `request.batch` into `request.table` and returns
/// the number of rows the destination reports as written.
pub trait BulkTransfer<C>: Send + Sync {
    fn send(
        &self,
        cx: &Cx,
        channel: &mut C,
        request: &BulkRequest<'_>,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send;
}
