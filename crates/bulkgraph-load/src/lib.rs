//! Entity graph traversal and bulk loading.
//!
//! `bulkgraph-load` is the engine of the workspace:
//!
//! - [`RowMaterializer`] turns an instance into a row of column values.
//! - [`GraphWalker`] orders an object graph into per-type, per-level
//!   [`LoadUnit`]s, parents first, each instance once.
//! - [`BatchLoader`] chunks a unit and pushes it through a
//!   [`BulkTransfer`](bulkgraph_core::BulkTransfer).
//! - [`BulkLoader`] ties them together under one unit of work and returns the
//!   row count (or a [`LoadReport`]).

pub mod batch;
pub mod loader;
pub mod materialize;
pub mod report;
pub mod walker;

pub use batch::BatchLoader;
pub use loader::{BulkLoader, ChannelOf};
pub use materialize::RowMaterializer;
pub use report::{LoadReport, UnitReport};
pub use walker::{GraphWalker, LoadUnit};

#[cfg(test)]
#[allow(clippy::manual_async_fn)]
pub(crate) mod testing {
    use std::future::Future;

    use asupersync::{Cx, Outcome, PanicPayload};
    use bulkgraph_core::{
        BulkRequest, BulkTransfer, ConnectionProvider, Error, TransferError, TransferErrorKind,
        UnitOfWork, UnitOfWorkError,
    };

    /// Unit of work that records control calls and transfers.
    #[derive(Default)]
    pub struct MockWork {
        active: bool,
        pub fail_rollback: bool,
        pub panic_commit: bool,
        pub events: Vec<String>,
        pub sent: Vec<String>,
    }

    impl MockWork {
        pub fn active() -> Self {
            Self {
                active: true,
                ..Self::default()
            }
        }
    }

    impl UnitOfWork for MockWork {
        type Channel = Vec<String>;

        fn is_active(&self) -> bool {
            self.active
        }

        fn begin(&mut self, _cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
            self.active = true;
            self.events.push("begin".to_string());
            async { Outcome::Ok(()) }
        }

        fn commit(&mut self, _cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
            self.events.push("commit".to_string());
            let panicked = self.panic_commit;
            if !panicked {
                self.active = false;
            }
            async move {
                if panicked {
                    Outcome::Panicked(PanicPayload::new("commit hook panicked"))
                } else {
                    Outcome::Ok(())
                }
            }
        }

        fn rollback(&mut self, _cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
            self.active = false;
            self.events.push("rollback".to_string());
            let fail = self.fail_rollback;
            async move {
                if fail {
                    Outcome::Err(Error::from(UnitOfWorkError::new(
                        "rollback",
                        "connection lost",
                    )))
                } else {
                    Outcome::Ok(())
                }
            }
        }

        fn channel(&mut self) -> &mut Self::Channel {
            &mut self.sent
        }
    }

    impl ConnectionProvider for MockWork {
        type Work = Self;

        fn unit_of_work(&mut self) -> &mut Self::Work {
            self
        }
    }

    /// Sink that records `"<table> <rows>"` per call and can reject a table.
    #[derive(Default)]
    pub struct RecordingTransfer {
        fail_table: Option<String>,
    }

    impl RecordingTransfer {
        pub fn failing_on(table: &str) -> Self {
            Self {
                fail_table: Some(table.to_string()),
            }
        }
    }

    impl BulkTransfer<Vec<String>> for RecordingTransfer {
        fn send(
            &self,
            _cx: &Cx,
            channel: &mut Vec<String>,
            request: &BulkRequest<'_>,
        ) -> impl Future<Output = Outcome<u64, Error>> + Send {
            let rejected = self.fail_table.as_deref() == Some(request.table.name.as_str());
            let rows = request.batch.len();
            if !rejected {
                channel.push(format!("{} {}", request.table, rows));
            }
            async move {
                if rejected {
                    Outcome::Err(Error::from(TransferError::new(
                        TransferErrorKind::Constraint,
                        "rejected by test",
                    )))
                } else {
                    Outcome::Ok(rows as u64)
                }
            }
        }
    }
}
