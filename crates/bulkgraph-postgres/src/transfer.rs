//! [`BulkTransfer`] over `COPY ... FROM STDIN`.

#![allow(clippy::manual_async_fn)]

use crate::copy::{copy_frames, copy_statement};
use crate::stream::WireStream;
use crate::wire::PgWire;
use asupersync::{Cx, Outcome};
use bulkgraph_core::{BulkRequest, BulkTransfer, Error};
use std::future::Future;

/// Sends each batch as one text-format COPY.
///
/// A non-zero request timeout becomes `SET LOCAL statement_timeout` ahead of
/// the COPY, so it lasts until the surrounding transaction ends.
///
/// When the load joins a transaction the caller opened, that setting stays in
/// force for the caller's own statements until the caller commits or rolls
/// back; the previous value is not restored. Configure the loader with
/// [`LoadConfig::no_timeout`](bulkgraph_core::LoadConfig::no_timeout) to
/// leave the caller's `statement_timeout` untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgCopyTransfer;

impl PgCopyTransfer {
    pub fn new() -> Self {
        Self
    }
}

impl<S: WireStream> BulkTransfer<PgWire<S>> for PgCopyTransfer {
    fn send(
        &self,
        cx: &Cx,
        channel: &mut PgWire<S>,
        request: &BulkRequest<'_>,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        let request = *request;
        async move {
            let table = request.table;

            if !request.timeout.is_zero() {
                let sql = format!(
                    "SET LOCAL statement_timeout = {}",
                    request.timeout.as_millis()
                );
                match channel.simple_query(cx, &sql).await {
                    Outcome::Ok(_) => {}
                    Outcome::Err(e) => {
                        return Outcome::Err(Error::from(e.into_transfer_error(table)));
                    }
                    Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                    Outcome::Panicked(p) => return Outcome::Panicked(p),
                }
            }

            let statement = copy_statement(table, request.batch.columns());
            tracing::debug!(
                table = %table,
                rows = request.batch.len(),
                streaming = request.streaming,
                "COPY FROM STDIN"
            );

            let frames = copy_frames(request.batch, request.streaming);
            match channel.copy_in(cx, &statement, frames).await {
                Outcome::Ok(rows) => Outcome::Ok(rows),
                Outcome::Err(e) => Outcome::Err(Error::from(e.into_transfer_error(table))),
                Outcome::Cancelled(r) => Outcome::Cancelled(r),
                Outcome::Panicked(p) => Outcome::Panicked(p),
            }
        }
    }
}
