//! All-or-nothing behaviour of a load and its unit-of-work handling.

mod common;

use bulkgraph::prelude::*;
use bulkgraph::{ErrorKind, TransferErrorKind};
use common::{MemoryDb, MemorySink, expect_err, run, unwrap_outcome};

struct Invoice {
    id: i64,
    lines: Vec<Arc<Line>>,
    payments: Vec<Arc<Payment>>,
}

struct Line {
    id: i64,
    sku: Option<String>,
}

struct Payment {
    id: i64,
}

impl Entity for Invoice {
    const TABLE_NAME: &'static str = "invoices";

    fn fields() -> Vec<Field<Self>> {
        vec![Field::new("id", SemanticType::Long, |i: &Invoice| i.id.to_field_value())]
    }

    fn navigations() -> Vec<Navigation<Self>> {
        vec![
            Navigation::to_many("lines", |i: &Invoice| Ok(i.lines.clone())),
            Navigation::to_many("payments", |i: &Invoice| Ok(i.payments.clone())),
        ]
    }
}

impl Entity for Line {
    const TABLE_NAME: &'static str = "invoice_lines";

    fn fields() -> Vec<Field<Self>> {
        vec![
            Field::new("id", SemanticType::Long, |l: &Line| l.id.to_field_value()),
            Field::new("sku", SemanticType::String, |l: &Line| l.sku.to_field_value()),
        ]
    }
}

impl Entity for Payment {
    const TABLE_NAME: &'static str = "payments";

    fn fields() -> Vec<Field<Self>> {
        vec![Field::new("id", SemanticType::Long, |p: &Payment| p.id.to_field_value())]
    }
}

fn invoices(lines_each: i64) -> Vec<Arc<Invoice>> {
    (0..2)
        .map(|i| {
            Arc::new(Invoice {
                id: i,
                lines: (0..lines_each)
                    .map(|l| {
                        Arc::new(Line {
                            id: i * 100 + l,
                            sku: Some(format!("SKU-{l}")),
                        })
                    })
                    .collect(),
                payments: vec![Arc::new(Payment { id: i })],
            })
        })
        .collect()
}

#[test]
fn failure_on_last_unit_leaves_nothing_behind() {
    run(|cx| async move {
        let loader = BulkLoader::new(MemorySink::failing_on_call(3));
        let mut db = MemoryDb::default();

        let err = expect_err(loader.bulk_insert(&cx, &mut db, &invoices(2)).await);

        assert_eq!(err.kind(), ErrorKind::Transfer);
        assert_eq!(err.table(), Some("payments"));
        match &err {
            Error::Transfer(e) => assert_eq!(e.kind, TransferErrorKind::Constraint),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(loader.transfer().calls(), 3);
        assert_eq!(db.log, vec!["begin", "rollback"]);
        assert_eq!(db.committed_row_count(), 0);
        assert!(db.staged().is_empty());
        assert!(!db.is_active());
    });
}

#[test]
fn materialization_failure_rolls_back_earlier_units() {
    run(|cx| async move {
        let mut roots = invoices(2);
        Arc::get_mut(&mut roots[1]).unwrap().lines.push(Arc::new(Line {
            id: 999,
            sku: None,
        }));

        let loader = BulkLoader::new(MemorySink::default());
        let mut db = MemoryDb::default();
        let err = expect_err(loader.bulk_insert(&cx, &mut db, &roots).await);

        assert_eq!(err.kind(), ErrorKind::Materialization);
        assert_eq!(err.table(), Some("invoice_lines"));
        assert_eq!(loader.transfer().calls(), 1);
        assert_eq!(db.log, vec!["begin", "rollback"]);
        assert_eq!(db.committed_row_count(), 0);
    });
}

#[test]
fn invalid_config_fails_before_begin() {
    run(|cx| async move {
        let loader =
            BulkLoader::new(MemorySink::default()).with_config(LoadConfig::new().batch_size(0));
        let mut db = MemoryDb::default();

        let err = expect_err(loader.bulk_insert(&cx, &mut db, &invoices(1)).await);

        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(db.log.is_empty());
        assert_eq!(loader.transfer().calls(), 0);
    });
}

struct Shipment {
    id: i64,
    labels: Vec<Arc<Label>>,
}

struct Label;

impl Entity for Shipment {
    const TABLE_NAME: &'static str = "shipments";

    fn fields() -> Vec<Field<Self>> {
        vec![Field::new("id", SemanticType::Long, |s: &Shipment| {
            s.id.to_field_value()
        })]
    }

    fn navigations() -> Vec<Navigation<Self>> {
        vec![Navigation::to_many("labels", |s: &Shipment| {
            Ok(s.labels.clone())
        })]
    }
}

impl Entity for Label {
    const TABLE_NAME: &'static str = "labels";

    fn fields() -> Vec<Field<Self>> {
        Vec::new()
    }
}

#[test]
fn unmapped_reachable_type_fails_before_any_transfer() {
    run(|cx| async move {
        let shipments = vec![Arc::new(Shipment {
            id: 1,
            labels: Vec::new(),
        })];

        let loader = BulkLoader::new(MemorySink::default());
        let mut db = MemoryDb::default();
        let err = expect_err(loader.bulk_insert(&cx, &mut db, &shipments).await);

        assert_eq!(err.kind(), ErrorKind::Schema);
        assert!(db.log.is_empty());
        assert_eq!(loader.transfer().calls(), 0);
    });
}

#[test]
fn joined_unit_of_work_is_left_open() {
    run(|cx| async move {
        let loader = BulkLoader::new(MemorySink::default());
        let mut db = MemoryDb::default();
        unwrap_outcome(db.begin(&cx).await);

        let report = unwrap_outcome(
            loader
                .bulk_insert_with_report(&cx, &mut db, &invoices(2))
                .await,
        );

        assert!(!report.committed);
        assert_eq!(report.total_rows(), 8);
        assert_eq!(db.log, vec!["begin"]);
        assert!(db.is_active());
        assert_eq!(db.staged().len(), 3);
        assert_eq!(db.committed_row_count(), 0);

        unwrap_outcome(db.commit(&cx).await);
        assert_eq!(db.committed_row_count(), 8);
    });
}

#[test]
fn joined_unit_of_work_is_rolled_back_on_failure() {
    run(|cx| async move {
        let loader = BulkLoader::new(MemorySink::failing_on_call(2));
        let mut db = MemoryDb::default();
        unwrap_outcome(db.begin(&cx).await);

        let err = expect_err(loader.bulk_insert(&cx, &mut db, &invoices(1)).await);

        assert_eq!(err.kind(), ErrorKind::Transfer);
        assert_eq!(db.log, vec!["begin", "rollback"]);
        assert!(db.staged().is_empty());
    });
}

#[test]
fn commit_failure_rolls_back() {
    run(|cx| async move {
        let loader = BulkLoader::new(MemorySink::default());
        let mut db = MemoryDb::failing_commit();

        let err = expect_err(loader.bulk_insert(&cx, &mut db, &invoices(1)).await);

        assert_eq!(err.kind(), ErrorKind::UnitOfWork);
        assert_eq!(db.log, vec!["begin", "commit", "rollback"]);
        assert_eq!(db.committed_row_count(), 0);
    });
}

#[test]
fn units_are_chunked_at_batch_size() {
    run(|cx| async move {
        let loader =
            BulkLoader::new(MemorySink::default()).with_config(LoadConfig::new().batch_size(3));
        let mut db = MemoryDb::default();

        let report = unwrap_outcome(
            loader
                .bulk_insert_with_report(&cx, &mut db, &invoices(4))
                .await,
        );

        let chunks: Vec<_> = report
            .units
            .iter()
            .map(|u| (u.table.as_str(), u.rows, u.chunks))
            .collect();
        assert_eq!(
            chunks,
            vec![("invoices", 2, 1), ("invoice_lines", 8, 3), ("payments", 2, 1)]
        );
        let line_batches: Vec<_> = db
            .committed
            .iter()
            .filter(|w| w.table == "invoice_lines")
            .map(|w| w.rows.len())
            .collect();
        assert_eq!(line_batches, vec![3, 3, 2]);
    });
}

#[test]
fn empty_roots_do_not_touch_the_unit_of_work() {
    run(|cx| async move {
        let loader = BulkLoader::new(MemorySink::default());
        let mut db = MemoryDb::default();
        let none: Vec<Arc<Invoice>> = Vec::new();

        let rows = unwrap_outcome(loader.bulk_insert(&cx, &mut db, &none).await);

        assert_eq!(rows, 0);
        assert!(db.log.is_empty());
    });
}
