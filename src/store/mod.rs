//! Storage interface consumed by the locate and submission paths.
//!
//! Estimation reads station records directly from the pool; ingestion runs
//! inside a [`StationTx`] that is committed explicitly and rolled back when
//! dropped, so every exit path releases the transaction.

use std::collections::HashSet;

use async_trait::async_trait;
use mac_address::MacAddress;
use thiserror::Error;

use crate::model::{CellKey, CellMeasure, WifiMeasure, WifiStation};

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique key violation: another batch created the same station first.
    #[error("station key already exists")]
    Conflict,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait StationStore: Send + Sync {
    /// Stores a raw report and returns its id.
    async fn insert_report(&self, raw: &str) -> Result<i64, StoreError>;

    /// Stations with a known position matching any of `keys`.
    async fn wifi_by_keys(&self, keys: &[MacAddress]) -> Result<Vec<WifiStation>, StoreError>;

    async fn begin<'a>(&'a self) -> Result<Box<dyn StationTx + 'a>, StoreError>;
}

#[async_trait]
pub trait StationTx: Send {
    /// Which of `keys` are blacklisted.
    async fn blacklisted(&mut self, keys: &[MacAddress]) -> Result<HashSet<MacAddress>, StoreError>;

    async fn insert_wifi_measure(&mut self, measure: &WifiMeasure) -> Result<(), StoreError>;

    /// Bumps both measure counters by one, as a relative update on the
    /// stored value. Returns false when no station row exists yet.
    async fn increment_wifi_counters(&mut self, key: MacAddress) -> Result<bool, StoreError>;

    /// Creates a station record with both counters at one.
    async fn insert_wifi_station(&mut self, key: MacAddress) -> Result<(), StoreError>;

    async fn insert_cell_measure(&mut self, measure: &CellMeasure) -> Result<(), StoreError>;

    async fn increment_cell_counters(&mut self, key: &CellKey) -> Result<bool, StoreError>;

    async fn insert_cell_station(&mut self, key: &CellKey) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
