//! Geodesic helpers for the locate path.

use geo::{HaversineDistance, Point};

use crate::model::Network;

pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let a = Point::new(lon1, lat1);
    let b = Point::new(lon2, lat2);
    a.haversine_distance(&b) / 1000.0
}

/// Accuracy of a position derived from `sample`, in meters. For a single
/// station the station's own coverage radius is the best guess; otherwise
/// the maximum distance from the derived position to any sampled station.
/// Never reports better than `minimum`.
pub fn estimate_accuracy(lat: f64, lon: f64, sample: &[Network], minimum: f64) -> f64 {
    let accuracy = if sample.len() == 1 {
        sample[0].radius
    } else {
        sample
            .iter()
            .map(|n| distance_km(lat, lon, n.lat, n.lon) * 1000.0)
            .fold(0.0, f64::max)
    };
    accuracy.max(minimum)
}
