//! Ingestion Orchestrator.
//!
//! Sequences one ingestion event: validate → bootstrap → provision → write.
//! Bootstrap runs once per `Ingestor`; provisioning and the write run fresh
//! for every event, against the live schema. If the table disappears under a
//! bootstrapped session, the session forgets its bootstrap and the next event
//! recreates the table.

use crate::bootstrap::ensure_table;
use crate::provisioner::provision_columns;
use crate::writer::insert;
use crate::SchemaStore;
use chrono::Utc;
use statledger_core::{
    IngestError, IngestResult, IngestionPhase, IngestionReceipt, IngestionStep, LedgerConfig,
    RowId, StoreError, StoredRow, SummaryRecord, TableName,
};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::Instrument;

/// Drives ingestion events against one table of one store.
///
/// Cheap to share behind an `Arc`; concurrent events on the same `Ingestor`
/// share a single bootstrap.
pub struct Ingestor {
    store: Arc<dyn SchemaStore>,
    table: TableName,
    /// Swapped for a fresh cell when the table is found missing.
    bootstrapped: Mutex<Arc<OnceCell<()>>>,
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("table", &self.table)
            .field("bootstrapped", &self.is_bootstrapped())
            .finish()
    }
}

impl Ingestor {
    pub fn new(store: Arc<dyn SchemaStore>, config: &LedgerConfig) -> Self {
        Self {
            store,
            table: config.table.clone(),
            bootstrapped: Mutex::new(Arc::new(OnceCell::new())),
        }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    fn session(&self) -> Arc<OnceCell<()>> {
        let cell = self
            .bootstrapped
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&cell)
    }

    /// Whether the bootstrap has completed for this session.
    pub fn is_bootstrapped(&self) -> bool {
        self.session().initialized()
    }

    fn forget_bootstrap(&self) {
        let mut cell = self
            .bootstrapped
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if cell.initialized() {
            tracing::warn!(table = %self.table, "Table missing, bootstrap will run again");
            *cell = Arc::new(OnceCell::new());
        }
    }

    /// After a provision or write failure, check whether the table is gone.
    async fn recheck_table(&self) {
        if let Ok(None) = self.store.list_columns(&self.table).await {
            self.forget_bootstrap();
        }
    }

    /// Run the table bootstrap unless it already succeeded.
    ///
    /// A failure leaves the session un-bootstrapped, so the next call tries again.
    pub async fn bootstrap(&self) -> IngestResult<()> {
        let session = self.session();
        session
            .get_or_try_init(|| ensure_table(self.store.as_ref(), &self.table))
            .await
            .map(|_| ())
    }

    /// Persist one summary record as one new row.
    ///
    /// Either the row is written and a receipt returned, or the event fails
    /// with an error naming the failed step. Nothing is retried here.
    pub async fn ingest(&self, record: &SummaryRecord) -> IngestResult<IngestionReceipt> {
        let span = tracing::info_span!(
            "ingest",
            table = %self.table,
            filename = %record.filename(),
            stats = record.stats().len(),
        );
        self.run(record).instrument(span).await
    }

    async fn run(&self, record: &SummaryRecord) -> IngestResult<IngestionReceipt> {
        let mut phase = IngestionPhase::Start;
        let result = self.steps(record, &mut phase).await;

        match &result {
            Ok(receipt) => {
                tracing::info!(
                    id = receipt.id,
                    columns_added = receipt.columns_added.len(),
                    "Ingestion written"
                );
            }
            Err(e) => {
                let failed_at = phase;
                transition(&mut phase, IngestionPhase::Failed);
                tracing::warn!(
                    phase = %failed_at,
                    step = %e.phase(),
                    error = %e,
                    "Ingestion failed"
                );
                if matches!(e.phase(), IngestionStep::Provision | IngestionStep::Write) {
                    self.recheck_table().await;
                }
            }
        }
        result
    }

    async fn steps(
        &self,
        record: &SummaryRecord,
        phase: &mut IngestionPhase,
    ) -> IngestResult<IngestionReceipt> {
        // Bad keys fail the event before any DDL.
        let columns = record.stat_columns()?;

        self.bootstrap().await?;
        transition(phase, IngestionPhase::Bootstrapped);

        let provisioned = provision_columns(self.store.as_ref(), &self.table, &columns).await?;
        transition(phase, IngestionPhase::Provisioned);

        let written = insert(self.store.as_ref(), &self.table, record, Utc::now()).await?;
        transition(phase, IngestionPhase::Written);

        Ok(IngestionReceipt {
            id: written.id,
            filename: record.filename().to_string(),
            ingested_at: written.timestamp,
            columns_added: provisioned.added.into_iter().map(String::from).collect(),
            columns_written: written.columns.into_iter().map(String::from).collect(),
        })
    }

    /// Live columns of the table in table order, bootstrapping first.
    pub async fn columns(&self) -> IngestResult<Vec<String>> {
        self.bootstrap().await?;
        let columns = self
            .store
            .list_columns(&self.table)
            .await
            .map_err(|e| IngestError::SchemaUnavailable {
                table: self.table.to_string(),
                reason: e.to_string(),
            })?;

        columns.ok_or_else(|| {
            self.forget_bootstrap();
            IngestError::SchemaUnavailable {
                table: self.table.to_string(),
                reason: "table does not exist".to_string(),
            }
        })
    }

    /// Read one previously ingested row back.
    pub async fn fetch(&self, id: RowId) -> IngestResult<Option<StoredRow>> {
        match self.store.fetch_row(&self.table, id).await {
            Ok(row) => Ok(row),
            Err(StoreError::UndefinedTable { .. }) => Ok(None),
            Err(e) => {
                tracing::error!(table = %self.table, id, error = %e, "Row fetch failed");
                Err(IngestError::SchemaUnavailable {
                    table: self.table.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

fn transition(phase: &mut IngestionPhase, next: IngestionPhase) {
    match phase.advance(next) {
        Ok(advanced) => *phase = advanced,
        Err(e) => tracing::error!(error = %e, "Ingestion state machine violated"),
    }
}
