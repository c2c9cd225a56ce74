//! Position estimation from a query's observed networks. Read-only; any
//! number of estimations may run concurrently with ingestion and see an
//! in-flight view of the station data.

use std::sync::Arc;

use async_trait::async_trait;
use mac_address::MacAddress;

use crate::model::Position;
use crate::store::{StationStore, StoreError};

pub mod wifi;

/// One observed wifi network within an estimation request.
#[derive(Debug, Clone, Copy)]
pub struct WifiLookup {
    pub key: MacAddress,
    pub signal: Option<i16>,
}

/// All observations carried by one estimation request.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub wifi: Vec<WifiLookup>,
}

/// A position source estimates from one kind of station data. `None` means
/// no estimate, which is a normal outcome rather than an error.
#[async_trait]
pub trait PositionSource: Send + Sync {
    fn should_estimate(&self, query: &Query) -> bool;

    async fn estimate(&self, query: &Query) -> Result<Option<Position>, StoreError>;
}

/// Tries each configured source in order and returns the first estimate.
pub struct Locator {
    sources: Vec<Box<dyn PositionSource>>,
}

impl Locator {
    pub fn new(store: Arc<dyn StationStore>) -> Self {
        Self {
            sources: vec![Box::new(wifi::WifiSource::new(store))],
        }
    }

    pub async fn estimate(&self, query: &Query) -> Result<Option<Position>, StoreError> {
        for source in &self.sources {
            if !source.should_estimate(query) {
                continue;
            }
            if let Some(position) = source.estimate(query).await? {
                return Ok(Some(position));
            }
        }
        Ok(None)
    }
}
