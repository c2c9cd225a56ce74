//! Dispatch of ingestion batches as independent units of work.
//!
//! Batches run on the tokio runtime with no ordering guarantee between them.
//! A conflict is terminal; anything else that fails is assumed transient and
//! the whole batch is resubmitted, up to a bounded number of attempts.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::store::{StationStore, StoreError};
use crate::submission::report::{CellEntry, ReportHeader, WifiEntry};
use crate::submission::{cell, wifi, IngestOutcome};

const MAX_ATTEMPTS: u32 = 3;

pub fn submit_wifi(
    store: Arc<dyn StationStore>,
    header: ReportHeader,
    entries: Vec<WifiEntry>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        drive("wifi", || wifi::insert_measures(store.as_ref(), &header, &entries)).await;
    })
}

pub fn submit_cell(
    store: Arc<dyn StationStore>,
    header: ReportHeader,
    entries: Vec<CellEntry>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        drive("cell", || cell::insert_measures(store.as_ref(), &header, &entries)).await;
    })
}

async fn drive<F, Fut>(label: &str, mut batch: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<IngestOutcome, StoreError>>,
{
    for attempt in 1..=MAX_ATTEMPTS {
        match batch().await {
            Ok(IngestOutcome::Persisted(count)) => {
                log::debug!("{label}: persisted {count} measures");
                return;
            }
            Ok(IngestOutcome::Conflict) => {
                log::warn!("{label}: station created concurrently, batch dropped");
                return;
            }
            Err(e) if attempt < MAX_ATTEMPTS => {
                log::warn!("{label}: attempt {attempt} failed, resubmitting: {e}");
            }
            Err(e) => {
                log::error!("{label}: giving up after {MAX_ATTEMPTS} attempts: {e}");
            }
        }
    }
}
