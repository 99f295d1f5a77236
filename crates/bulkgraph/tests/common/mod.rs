//! In-memory database and sink shared by the integration tests.

#![allow(dead_code, clippy::manual_async_fn)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use asupersync::runtime::RuntimeBuilder;
use bulkgraph::{
    BulkRequest, BulkTransfer, ConnectionProvider, Cx, Error, Outcome, TransferError,
    TransferErrorKind, UnitOfWork, UnitOfWorkError, Value,
};

/// Rows written to one table by one transfer call.
#[derive(Debug, Clone, PartialEq)]
pub struct Written {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Transfers staged inside the open transaction.
#[derive(Debug, Default)]
pub struct Staging {
    pub writes: Vec<Written>,
}

/// A transactional store: staged writes become visible on commit.
#[derive(Debug, Default)]
pub struct MemoryDb {
    in_transaction: bool,
    staging: Staging,
    pub committed: Vec<Written>,
    pub log: Vec<&'static str>,
    pub fail_commit: bool,
}

impl MemoryDb {
    pub fn failing_commit() -> Self {
        Self {
            fail_commit: true,
            ..Self::default()
        }
    }

    /// Tables in the order they received transfers, committed rows only.
    pub fn committed_tables(&self) -> Vec<&str> {
        self.committed.iter().map(|w| w.table.as_str()).collect()
    }

    pub fn committed_rows(&self, table: &str) -> Vec<&Vec<Value>> {
        self.committed
            .iter()
            .filter(|w| w.table == table)
            .flat_map(|w| w.rows.iter())
            .collect()
    }

    pub fn committed_row_count(&self) -> usize {
        self.committed.iter().map(|w| w.rows.len()).sum()
    }

    pub fn staged(&self) -> &[Written] {
        &self.staging.writes
    }
}

impl UnitOfWork for MemoryDb {
    type Channel = Staging;

    fn is_active(&self) -> bool {
        self.in_transaction
    }

    fn begin(&mut self, _cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
        self.log.push("begin");
        self.in_transaction = true;
        async { Outcome::Ok(()) }
    }

    fn commit(&mut self, _cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
        self.log.push("commit");
        let failed = self.fail_commit;
        if !failed {
            self.committed.append(&mut self.staging.writes);
            self.in_transaction = false;
        }
        async move {
            if failed {
                Outcome::Err(Error::from(UnitOfWorkError::new(
                    "commit",
                    "serialization failure",
                )))
            } else {
                Outcome::Ok(())
            }
        }
    }

    fn rollback(&mut self, _cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
        self.log.push("rollback");
        self.staging.writes.clear();
        self.in_transaction = false;
        async { Outcome::Ok(()) }
    }

    fn channel(&mut self) -> &mut Staging {
        &mut self.staging
    }
}

impl ConnectionProvider for MemoryDb {
    type Work = Self;

    fn unit_of_work(&mut self) -> &mut Self {
        self
    }
}

/// Sink that stages every batch and can fail its Nth call (1-based).
#[derive(Debug, Default)]
pub struct MemorySink {
    calls: AtomicUsize,
    fail_on_call: Option<usize>,
}

impl MemorySink {
    pub fn failing_on_call(n: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on_call: Some(n),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl BulkTransfer<Staging> for MemorySink {
    fn send(
        &self,
        _cx: &Cx,
        channel: &mut Staging,
        request: &BulkRequest<'_>,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let failed = self.fail_on_call == Some(call);
        let rows = request.batch.len() as u64;
        if !failed {
            channel.writes.push(Written {
                table: request.table.to_string(),
                columns: request.batch.column_names().map(str::to_string).collect(),
                rows: request.batch.rows().to_vec(),
            });
        }
        async move {
            if failed {
                Outcome::Err(Error::from(TransferError::new(
                    TransferErrorKind::Constraint,
                    "injected failure",
                )))
            } else {
                Outcome::Ok(rows)
            }
        }
    }
}

/// Run an async test body on a fresh current-thread runtime.
pub fn run<F: Future>(f: impl FnOnce(Cx) -> F) -> F::Output {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    rt.block_on(f(Cx::for_testing()))
}

pub fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

pub fn expect_err<T: std::fmt::Debug>(outcome: Outcome<T, Error>) -> Error {
    match outcome {
        Outcome::Err(e) => e,
        other => panic!("expected an error, got {other:?}"),
    }
}
