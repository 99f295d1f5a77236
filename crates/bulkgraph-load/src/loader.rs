//! The load orchestrator.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use asupersync::{Cx, Outcome};
use bulkgraph_core::{
    BulkTransfer, ConnectionProvider, Entity, EntityRef, Error, LoadConfig, UnitOfWork,
};
use bulkgraph_schema::{ModelCatalog, SchemaCatalog, SchemaResolver};

use crate::batch::BatchLoader;
use crate::report::LoadReport;
use crate::walker::GraphWalker;

/// The channel type of a provider's unit of work.
pub type ChannelOf<P> = <<P as ConnectionProvider>::Work as UnitOfWork>::Channel;

/// Loads entity graphs through a bulk-transfer sink under one unit of work.
///
/// If the provider's unit of work is not active, the loader begins it and
/// commits it on success (an *owned* unit of work). If it is already active
/// the load joins it and leaves the commit to the caller. Either way, any
/// failure rolls the unit of work back before the error is returned.
///
/// # Example
///
/// ```ignore
/// let loader = BulkLoader::new(PgCopyTransfer::new())
///     .with_config(LoadConfig::new().batch_size(5_000));
/// let rows = loader.bulk_insert(&cx, &mut session, &customers).await;
/// ```
pub struct BulkLoader<T, C = ModelCatalog> {
    resolver: SchemaResolver<C>,
    transfer: T,
    config: LoadConfig,
}

impl<T> BulkLoader<T, ModelCatalog> {
    /// A loader that maps entities from their own declarations.
    pub fn new(transfer: T) -> Self {
        Self::with_resolver(SchemaResolver::default(), transfer)
    }
}

impl<T, C: SchemaCatalog> BulkLoader<T, C> {
    /// A loader over an explicit resolver (and therefore catalog).
    pub fn with_resolver(resolver: SchemaResolver<C>, transfer: T) -> Self {
        Self {
            resolver,
            transfer,
            config: LoadConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: LoadConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    pub fn resolver(&self) -> &SchemaResolver<C> {
        &self.resolver
    }

    pub fn transfer(&self) -> &T {
        &self.transfer
    }

    /// Load `roots` and everything reachable from them; returns the total
    /// number of rows written.
    pub async fn bulk_insert<P, E>(
        &self,
        cx: &Cx,
        provider: &mut P,
        roots: &[Arc<E>],
    ) -> Outcome<u64, Error>
    where
        P: ConnectionProvider,
        T: BulkTransfer<ChannelOf<P>>,
        E: Entity,
    {
        match self.bulk_insert_with_report(cx, provider, roots).await {
            Outcome::Ok(report) => Outcome::Ok(report.total_rows()),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Like [`bulk_insert`](Self::bulk_insert), returning per-unit detail.
    pub async fn bulk_insert_with_report<P, E>(
        &self,
        cx: &Cx,
        provider: &mut P,
        roots: &[Arc<E>],
    ) -> Outcome<LoadReport, Error>
    where
        P: ConnectionProvider,
        T: BulkTransfer<ChannelOf<P>>,
        E: Entity,
    {
        let roots = roots.iter().cloned().map(EntityRef::new).collect();
        self.load_graph(cx, provider, roots).await
    }

    /// Load roots of possibly different entity types.
    #[tracing::instrument(
        level = "debug",
        skip(self, cx, provider, roots),
        fields(roots = roots.len())
    )]
    pub async fn load_graph<P>(
        &self,
        cx: &Cx,
        provider: &mut P,
        roots: Vec<EntityRef>,
    ) -> Outcome<LoadReport, Error>
    where
        P: ConnectionProvider,
        T: BulkTransfer<ChannelOf<P>>,
    {
        if let Err(e) = self.config.validate() {
            return Outcome::Err(e.into());
        }
        if roots.is_empty() {
            tracing::debug!("No roots to load");
            return Outcome::Ok(LoadReport::default());
        }

        // Surface mapping problems before the unit of work is touched.
        let mut root_types = HashSet::new();
        for root in &roots {
            if root_types.insert(root.entity_type()) {
                if let Err(e) = self.resolver.resolve_closure(&root.model()) {
                    return Outcome::Err(e);
                }
            }
        }

        let work = provider.unit_of_work();
        let owned = !work.is_active();
        if owned {
            match work.begin(cx).await {
                Outcome::Ok(()) => {}
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        }

        tracing::info!(roots = roots.len(), owned, "Starting bulk insert");
        let start = Instant::now();

        let outcome = self.transfer_graph(cx, work.channel(), roots).await;
        let mut report = match outcome {
            Outcome::Ok(report) => report,
            Outcome::Err(e) => {
                tracing::warn!(error = %e, "Bulk insert failed, rolling back");
                roll_back(cx, work).await;
                return Outcome::Err(e);
            }
            Outcome::Cancelled(r) => {
                tracing::warn!("Bulk insert cancelled, rolling back");
                roll_back(cx, work).await;
                return Outcome::Cancelled(r);
            }
            Outcome::Panicked(p) => {
                roll_back(cx, work).await;
                return Outcome::Panicked(p);
            }
        };

        if owned {
            tracing::info!("Committing bulk insert");
            match work.commit(cx).await {
                Outcome::Ok(()) => {}
                Outcome::Err(e) => {
                    roll_back(cx, work).await;
                    return Outcome::Err(e);
                }
                Outcome::Cancelled(r) => {
                    roll_back(cx, work).await;
                    return Outcome::Cancelled(r);
                }
                Outcome::Panicked(p) => {
                    roll_back(cx, work).await;
                    return Outcome::Panicked(p);
                }
            }
        }

        report.elapsed = start.elapsed();
        report.committed = owned;

        tracing::info!(
            rows = report.total_rows(),
            units = report.units.len(),
            elapsed_ms = report.elapsed.as_millis(),
            "Bulk insert completed"
        );

        Outcome::Ok(report)
    }

    async fn transfer_graph<Ch>(
        &self,
        cx: &Cx,
        channel: &mut Ch,
        roots: Vec<EntityRef>,
    ) -> Outcome<LoadReport, Error>
    where
        T: BulkTransfer<Ch>,
    {
        let loader = BatchLoader::new(&self.transfer, &self.config);
        let mut report = LoadReport::default();

        for unit in GraphWalker::new(&self.resolver, roots) {
            let unit = match unit {
                Ok(unit) => unit,
                Err(e) => return Outcome::Err(e),
            };

            tracing::info!(
                entity = %unit.entity,
                table = %unit.mapping.table,
                level = unit.level,
                instances = unit.len(),
                "Loading unit"
            );

            match loader.load(cx, channel, &unit).await {
                Outcome::Ok(unit_report) => report.units.push(unit_report),
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        }

        Outcome::Ok(report)
    }
}

/// Roll back after a failure; a failed rollback is logged, never returned.
async fn roll_back<W: UnitOfWork>(cx: &Cx, work: &mut W) {
    match work.rollback(cx).await {
        Outcome::Ok(()) => tracing::info!("Rolled back bulk insert"),
        Outcome::Err(e) => tracing::warn!(error = %e, "Rollback failed"),
        Outcome::Cancelled(r) => tracing::warn!(reason = ?r, "Rollback cancelled"),
        Outcome::Panicked(p) => tracing::warn!(payload = ?p, "Rollback panicked"),
    }
}
