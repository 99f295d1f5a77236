//! Chunked transfer of one load unit.

use asupersync::{Cx, Outcome};
use bulkgraph_core::{BulkRequest, BulkTransfer, ColumnBatch, Error, LoadConfig, SchemaError};

use crate::materialize::RowMaterializer;
use crate::report::UnitReport;
use crate::walker::LoadUnit;

/// Materializes a load unit and pushes it through a [`BulkTransfer`].
pub struct BatchLoader<'a, T> {
    transfer: &'a T,
    config: &'a LoadConfig,
}

impl<'a, T> BatchLoader<'a, T> {
    pub fn new(transfer: &'a T, config: &'a LoadConfig) -> Self {
        Self { transfer, config }
    }

    /// Transfer every instance of `unit`, `batch_size` rows per call.
    ///
    /// The row count is the sum of what the sink reports. Sink failures are
    /// returned as transfer errors naming the unit's table.
    #[tracing::instrument(
        level = "debug",
        skip(self, cx, channel, unit),
        fields(entity = %unit.entity, table = %unit.mapping.table, level = unit.level)
    )]
    pub async fn load<C>(
        &self,
        cx: &Cx,
        channel: &mut C,
        unit: &LoadUnit,
    ) -> Outcome<UnitReport, Error>
    where
        T: BulkTransfer<C>,
    {
        let table = unit.mapping.table.to_string();
        let materializer =
            RowMaterializer::new(&unit.mapping, self.config.include_generated_columns);
        let columns = materializer.batch_columns();
        if columns.is_empty() {
            return Outcome::Err(
                SchemaError::new(unit.entity.name(), "no insertable columns")
                    .table(table)
                    .into(),
            );
        }

        let mut rows = 0u64;
        let mut chunks = 0usize;

        for chunk in unit.instances.chunks(self.config.batch_size) {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }

            let mut batch = ColumnBatch::with_capacity(columns.clone(), chunk.len());
            for instance in chunk {
                match materializer.materialize(instance) {
                    Ok(row) => batch.push_row(row),
                    Err(e) => return Outcome::Err(e),
                }
            }

            let request = BulkRequest {
                table: &unit.mapping.table,
                batch: &batch,
                batch_size: self.config.batch_size,
                timeout: self.config.timeout,
                streaming: self.config.streaming,
            };

            match self.transfer.send(cx, channel, &request).await {
                Outcome::Ok(written) => {
                    rows += written;
                    chunks += 1;
                    tracing::debug!(chunk = chunks, rows = written, "Chunk transferred");
                }
                Outcome::Err(e) => return Outcome::Err(e.into_transfer(&table)),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        }

        Outcome::Ok(UnitReport {
            entity: unit.entity.name().to_string(),
            table,
            level: unit.level,
            instances: unit.instances.len(),
            rows,
            chunks,
        })
    }
}
