//! Wifi measurement ingestion.

use mac_address::MacAddress;

use crate::model::WifiMeasure;
use crate::store::{StationStore, StationTx, StoreError};
use crate::submission::report::{ReportHeader, WifiEntry};
use crate::submission::IngestOutcome;
use crate::time::decode_timestamp;

/// Persists one batch of wifi measures in a single transaction, skipping
/// blacklisted keys and bumping the per-station counters. The transaction is
/// rolled back in full on any failure.
pub async fn insert_measures(
    store: &dyn StationStore,
    header: &ReportHeader,
    entries: &[WifiEntry],
) -> Result<IngestOutcome, StoreError> {
    let mut tx = store.begin().await?;
    match write_batch(tx.as_mut(), header, entries).await {
        Ok(count) => match tx.commit().await {
            Ok(()) => Ok(IngestOutcome::Persisted(count)),
            Err(StoreError::Conflict) => Ok(IngestOutcome::Conflict),
            Err(e) => Err(e),
        },
        Err(StoreError::Conflict) => Ok(IngestOutcome::Conflict),
        Err(e) => Err(e),
    }
}

async fn write_batch(
    tx: &mut dyn StationTx,
    header: &ReportHeader,
    entries: &[WifiEntry],
) -> Result<usize, StoreError> {
    let keys: Vec<MacAddress> = entries.iter().map(|e| e.key).collect();
    let blacked = tx.blacklisted(&keys).await?;

    let mut persisted = 0;
    for entry in entries {
        // blacklisted stations contribute neither measures nor counters
        if blacked.contains(&entry.key) {
            continue;
        }

        tx.insert_wifi_measure(&build_measure(header, entry)).await?;
        if !tx.increment_wifi_counters(entry.key).await? {
            tx.insert_wifi_station(entry.key).await?;
        }
        persisted += 1;
    }
    Ok(persisted)
}

fn build_measure(header: &ReportHeader, entry: &WifiEntry) -> WifiMeasure {
    let channel = entry
        .channel
        .filter(|&c| c != 0)
        .or_else(|| entry.frequency.and_then(channel_from_frequency));

    WifiMeasure {
        report_id: header.report_id,
        created: decode_timestamp(header.created.as_deref()),
        lat: header.lat,
        lon: header.lon,
        time: decode_timestamp(header.time.as_deref()),
        accuracy: header.accuracy.unwrap_or(0.0),
        altitude: header.altitude.unwrap_or(0.0),
        altitude_accuracy: header.altitude_accuracy.unwrap_or(0.0),
        key: entry.key,
        channel: channel.unwrap_or(0),
        signal: entry.signal.unwrap_or(0),
    }
}

/// Derives a channel number when the client only reported a frequency.
/// Frequencies outside both the 2.4 GHz and the 5 GHz band leave the
/// channel unset.
fn channel_from_frequency(freq: i16) -> Option<i16> {
    if freq > 2411 && freq < 2473 {
        Some((freq - 2407) / 5)
    } else if freq > 5169 && freq < 5826 {
        Some((freq - 5000) / 5)
    } else {
        None
    }
}
