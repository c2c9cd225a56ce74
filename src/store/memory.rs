//! In-memory station store. Backs the test suite and small local setups;
//! writes are staged per transaction and only become visible on commit.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use mac_address::MacAddress;

use crate::model::{CellKey, CellMeasure, WifiMeasure, WifiStation};
use crate::store::{StationStore, StationTx, StoreError};

#[derive(Debug, Clone, Default)]
pub struct WifiRecord {
    pub position: Option<(f64, f64, f64)>,
    pub new_measures: i32,
    pub total_measures: i32,
}

#[derive(Debug, Clone, Default)]
pub struct CellRecord {
    pub new_measures: i32,
    pub total_measures: i32,
}

#[derive(Default)]
struct Inner {
    reports: Vec<String>,
    wifi: HashMap<MacAddress, WifiRecord>,
    cell: HashMap<CellKey, CellRecord>,
    blacklist: HashSet<MacAddress>,
    wifi_measures: Vec<WifiMeasure>,
    cell_measures: Vec<CellMeasure>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    wifi_queries: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a station that already has a derived position.
    pub fn put_wifi_station(&self, key: MacAddress, lat: f64, lon: f64, radius: f64) {
        self.inner.lock().unwrap().wifi.insert(
            key,
            WifiRecord {
                position: Some((lat, lon, radius)),
                ..Default::default()
            },
        );
    }

    pub fn blacklist(&self, key: MacAddress) {
        self.inner.lock().unwrap().blacklist.insert(key);
    }

    pub fn wifi_record(&self, key: MacAddress) -> Option<WifiRecord> {
        self.inner.lock().unwrap().wifi.get(&key).cloned()
    }

    pub fn cell_record(&self, key: &CellKey) -> Option<CellRecord> {
        self.inner.lock().unwrap().cell.get(key).cloned()
    }

    pub fn wifi_measures(&self) -> Vec<WifiMeasure> {
        self.inner.lock().unwrap().wifi_measures.clone()
    }

    pub fn cell_measures(&self) -> Vec<CellMeasure> {
        self.inner.lock().unwrap().cell_measures.clone()
    }

    pub fn report_count(&self) -> usize {
        self.inner.lock().unwrap().reports.len()
    }

    /// Number of station queries served, for asserting that the locate path
    /// skips the store entirely when it has nothing to look up.
    pub fn wifi_queries(&self) -> usize {
        self.wifi_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StationStore for MemoryStore {
    async fn insert_report(&self, raw: &str) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.reports.push(raw.to_owned());
        Ok(inner.reports.len() as i64)
    }

    async fn wifi_by_keys(&self, keys: &[MacAddress]) -> Result<Vec<WifiStation>, StoreError> {
        self.wifi_queries.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.lock().unwrap();
        let mut stations = Vec::new();
        for key in keys {
            if let Some(record) = inner.wifi.get(key) {
                if let Some((lat, lon, radius)) = record.position {
                    stations.push(WifiStation {
                        key: *key,
                        lat,
                        lon,
                        radius,
                    });
                }
            }
        }
        Ok(stations)
    }

    async fn begin<'a>(&'a self) -> Result<Box<dyn StationTx + 'a>, StoreError> {
        Ok(Box::new(MemoryTx {
            store: self,
            wifi_measures: Vec::new(),
            cell_measures: Vec::new(),
            new_wifi: Vec::new(),
            new_cell: Vec::new(),
            wifi_increments: HashMap::new(),
            cell_increments: HashMap::new(),
        }))
    }
}

pub struct MemoryTx<'a> {
    store: &'a MemoryStore,
    wifi_measures: Vec<WifiMeasure>,
    cell_measures: Vec<CellMeasure>,
    new_wifi: Vec<MacAddress>,
    new_cell: Vec<CellKey>,
    wifi_increments: HashMap<MacAddress, i32>,
    cell_increments: HashMap<CellKey, i32>,
}

#[async_trait]
impl<'a> StationTx for MemoryTx<'a> {
    async fn blacklisted(&mut self, keys: &[MacAddress]) -> Result<HashSet<MacAddress>, StoreError> {
        let inner = self.store.inner.lock().unwrap();
        Ok(keys
            .iter()
            .filter(|key| inner.blacklist.contains(*key))
            .copied()
            .collect())
    }

    async fn insert_wifi_measure(&mut self, measure: &WifiMeasure) -> Result<(), StoreError> {
        self.wifi_measures.push(measure.clone());
        Ok(())
    }

    async fn increment_wifi_counters(&mut self, key: MacAddress) -> Result<bool, StoreError> {
        let known = self.new_wifi.contains(&key)
            || self.store.inner.lock().unwrap().wifi.contains_key(&key);
        if known {
            *self.wifi_increments.entry(key).or_insert(0) += 1;
        }
        Ok(known)
    }

    async fn insert_wifi_station(&mut self, key: MacAddress) -> Result<(), StoreError> {
        if self.store.inner.lock().unwrap().wifi.contains_key(&key) {
            return Err(StoreError::Conflict);
        }
        self.new_wifi.push(key);
        Ok(())
    }

    async fn insert_cell_measure(&mut self, measure: &CellMeasure) -> Result<(), StoreError> {
        self.cell_measures.push(measure.clone());
        Ok(())
    }

    async fn increment_cell_counters(&mut self, key: &CellKey) -> Result<bool, StoreError> {
        let known = self.new_cell.contains(key)
            || self.store.inner.lock().unwrap().cell.contains_key(key);
        if known {
            *self.cell_increments.entry(*key).or_insert(0) += 1;
        }
        Ok(known)
    }

    async fn insert_cell_station(&mut self, key: &CellKey) -> Result<(), StoreError> {
        if self.store.inner.lock().unwrap().cell.contains_key(key) {
            return Err(StoreError::Conflict);
        }
        self.new_cell.push(*key);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        let mut inner = this.store.inner.lock().unwrap();

        // another batch may have created the same station since this one
        // staged its insert
        for key in &this.new_wifi {
            if inner.wifi.contains_key(key) {
                return Err(StoreError::Conflict);
            }
        }
        for key in &this.new_cell {
            if inner.cell.contains_key(key) {
                return Err(StoreError::Conflict);
            }
        }

        for key in this.new_wifi {
            inner.wifi.insert(
                key,
                WifiRecord {
                    position: None,
                    new_measures: 1,
                    total_measures: 1,
                },
            );
        }
        for key in this.new_cell {
            inner.cell.insert(
                key,
                CellRecord {
                    new_measures: 1,
                    total_measures: 1,
                },
            );
        }
        for (key, n) in this.wifi_increments {
            if let Some(record) = inner.wifi.get_mut(&key) {
                record.new_measures += n;
                record.total_measures += n;
            }
        }
        for (key, n) in this.cell_increments {
            if let Some(record) = inner.cell.get_mut(&key) {
                record.new_measures += n;
                record.total_measures += n;
            }
        }
        inner.wifi_measures.extend(this.wifi_measures);
        inner.cell_measures.extend(this.cell_measures);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(last: u8) -> MacAddress {
        MacAddress::new([0, 0, 0, 0, 0, last])
    }

    #[tokio::test]
    async fn staged_writes_apply_on_commit() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_wifi_station(mac(1)).await.unwrap();
        assert!(store.wifi_record(mac(1)).is_none());
        tx.commit().await.unwrap();

        let record = store.wifi_record(mac(1)).unwrap();
        assert_eq!(record.new_measures, 1);
        assert_eq!(record.total_measures, 1);
    }

    #[tokio::test]
    async fn dropped_transactions_discard_writes() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_wifi_station(mac(1)).await.unwrap();
        drop(tx);
        assert!(store.wifi_record(mac(1)).is_none());
    }

    #[tokio::test]
    async fn increments_see_inserts_staged_in_the_same_tx() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        assert!(!tx.increment_wifi_counters(mac(1)).await.unwrap());
        tx.insert_wifi_station(mac(1)).await.unwrap();
        assert!(tx.increment_wifi_counters(mac(1)).await.unwrap());
        tx.commit().await.unwrap();

        let record = store.wifi_record(mac(1)).unwrap();
        assert_eq!(record.new_measures, 2);
        assert_eq!(record.total_measures, 2);
    }

    #[tokio::test]
    async fn commit_detects_station_races() {
        let store = MemoryStore::new();
        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.insert_wifi_station(mac(1)).await.unwrap();
        second.insert_wifi_station(mac(1)).await.unwrap();
        first.commit().await.unwrap();
        assert!(matches!(second.commit().await, Err(StoreError::Conflict)));
    }
}
