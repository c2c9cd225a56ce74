//! Wifi position estimation: similarity filtering, geographic clustering
//! and centroid aggregation over the matched stations.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use mac_address::MacAddress;

use crate::cluster::{cluster_elements, filter_similar_keys};
use crate::geocalc;
use crate::locate::{PositionSource, Query, WifiLookup};
use crate::model::{Network, Position, WifiStation};
use crate::store::{StationStore, StoreError};

/// A device cannot hear networks further apart than this.
const MAX_CLUSTER_KM: f64 = 0.5;
/// Clusters below this size are discarded as insufficient evidence.
const MIN_IN_CLUSTER: usize = 2;
/// At most this many networks contribute to the centroid.
const MAX_IN_CLUSTER: usize = 5;
/// Assumed signal when the query does not report one; worse than the 99th
/// percentile of readings seen in practice (-98 dBm).
const DEFAULT_SIGNAL: i16 = -100;
/// Accuracy is never reported below this, in meters.
const MIN_ACCURACY: f64 = 100.0;

/// Groups the matched stations into geographic clusters of nearby networks.
fn get_clusters(stations: Vec<WifiStation>, lookups: &[WifiLookup]) -> Vec<Vec<Network>> {
    // collapse keys that likely belong to one physical station
    let keys: Vec<MacAddress> = stations.iter().map(|s| s.key).collect();
    let dissimilar: HashSet<MacAddress> = filter_similar_keys(keys).into_iter().collect();

    let mut signals: HashMap<MacAddress, i16> = HashMap::new();
    for lookup in lookups {
        if dissimilar.contains(&lookup.key) {
            signals.insert(lookup.key, lookup.signal.unwrap_or(DEFAULT_SIGNAL));
        }
    }

    let mut networks: Vec<Network> = stations
        .into_iter()
        .filter(|s| dissimilar.contains(&s.key))
        .map(|s| Network {
            key: s.key,
            lat: s.lat,
            lon: s.lon,
            radius: s.radius,
            signal: signals.get(&s.key).copied().unwrap_or(DEFAULT_SIGNAL),
        })
        .collect();

    // strongest signal first; clusters inherit this order
    networks.sort_by(|a, b| b.signal.cmp(&a.signal));

    let clusters = cluster_elements(
        networks,
        |a, b| geocalc::distance_km(a.lat, a.lon, b.lat, b.lon),
        MAX_CLUSTER_KM,
    );

    // a lone matched network is not enough: combined with one fake network
    // it could be used to reveal the real network's position
    clusters
        .into_iter()
        .filter(|c| c.len() >= MIN_IN_CLUSTER)
        .collect()
}

/// The cluster with the most matched networks wins. More than one cluster
/// means some station data is stale; assume the majority is correct. Ties go
/// to the cluster seen first, which holds the stronger signals.
fn pick_best_cluster(mut clusters: Vec<Vec<Network>>) -> Vec<Network> {
    clusters.sort_by(|a, b| b.len().cmp(&a.len()));
    clusters.remove(0)
}

/// Unweighted centroid over at most [`MAX_IN_CLUSTER`] of the strongest
/// members. A centroid is skewed by distant members, and signal strength is
/// too unreliable a distance proxy to weight by, so the sample is capped
/// instead.
fn aggregate_position(cluster: &[Network]) -> Position {
    let sample = &cluster[..cluster.len().min(MAX_IN_CLUSTER)];
    let n = sample.len() as f64;
    let lat = sample.iter().map(|x| x.lat).sum::<f64>() / n;
    let lon = sample.iter().map(|x| x.lon).sum::<f64>() / n;
    let accuracy = geocalc::estimate_accuracy(lat, lon, sample, MIN_ACCURACY);
    Position { lat, lon, accuracy }
}

pub struct WifiSource {
    store: Arc<dyn StationStore>,
}

impl WifiSource {
    pub fn new(store: Arc<dyn StationStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PositionSource for WifiSource {
    fn should_estimate(&self, query: &Query) -> bool {
        !query.wifi.is_empty()
    }

    async fn estimate(&self, query: &Query) -> Result<Option<Position>, StoreError> {
        if query.wifi.is_empty() {
            return Ok(None);
        }

        let keys: Vec<MacAddress> = query.wifi.iter().map(|x| x.key).collect();
        let stations = self.store.wifi_by_keys(&keys).await?;

        let clusters = get_clusters(stations, &query.wifi);
        if clusters.is_empty() {
            return Ok(None);
        }

        let cluster = pick_best_cluster(clusters);
        Ok(Some(aggregate_position(&cluster)))
    }
}
