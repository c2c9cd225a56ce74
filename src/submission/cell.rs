//! Cell measurement ingestion.

use crate::model::{CellMeasure, RadioType};
use crate::store::{StationStore, StationTx, StoreError};
use crate::submission::report::{CellEntry, ReportHeader};
use crate::submission::IngestOutcome;
use crate::time::decode_timestamp;

/// Persists one batch of cell measures in a single transaction. Incomplete
/// measures (unresolved radio, zero area or cell id) are kept as raw data
/// but do not touch the aggregate counters.
pub async fn insert_measures(
    store: &dyn StationStore,
    header: &ReportHeader,
    entries: &[CellEntry],
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
    entries: &[CellEntry],
) -> Result<usize, StoreError> {
    let mut persisted = 0;
    for entry in entries {
        let measure = build_measure(header, entry);
        tx.insert_cell_measure(&measure).await?;

        if let Some(key) = measure.station_key() {
            if !tx.increment_cell_counters(&key).await? {
                tx.insert_cell_station(&key).await?;
            }
        }
        persisted += 1;
    }
    Ok(persisted)
}

fn build_measure(header: &ReportHeader, entry: &CellEntry) -> CellMeasure {
    // an entry's own radio type wins over the report wide default; names
    // that resolve to nothing are kept unresolved
    let radio = match &entry.radio {
        Some(name) => RadioType::from_name(name),
        None => header.radio.as_deref().and_then(RadioType::from_name),
    };

    CellMeasure {
        report_id: header.report_id,
        created: decode_timestamp(header.created.as_deref()),
        lat: header.lat,
        lon: header.lon,
        time: decode_timestamp(header.time.as_deref()),
        accuracy: header.accuracy.unwrap_or(0.0),
        altitude: header.altitude.unwrap_or(0.0),
        altitude_accuracy: header.altitude_accuracy.unwrap_or(0.0),
        radio,
        country: entry.country,
        network: entry.network,
        area: entry.area.unwrap_or(0),
        cell: entry.cell.unwrap_or(0),
        unit: entry.unit.unwrap_or(0),
        asu: entry.asu.unwrap_or(0),
        signal: entry.signal.unwrap_or(0),
        ta: entry.ta.unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use crate::model::CellKey;
    use crate::store::memory::MemoryStore;

    use super::*;

    fn header(radio: Option<&str>) -> ReportHeader {
        ReportHeader {
            report_id: 1,
            created: Some("2014-03-01T12:00:00Z".to_owned()),
            time: Some("2014-03-01T11:59:00Z".to_owned()),
            lat: 51.5,
            lon: -0.1,
            accuracy: Some(10.0),
            altitude: None,
            altitude_accuracy: None,
            radio: radio.map(str::to_owned),
        }
    }

    fn entry() -> CellEntry {
        CellEntry {
            radio: Some("gsm".to_owned()),
            country: 234,
            network: 30,
            area: Some(1234),
            cell: Some(56789),
            unit: None,
            asu: None,
            signal: Some(-80),
            ta: None,
        }
    }

    fn key() -> CellKey {
        CellKey {
            radio: RadioType::Gsm,
            country: 234,
            network: 30,
            area: 1234,
            cell: 56789,
        }
    }

    #[test]
    fn entry_radio_wins_over_the_header_default() {
        let mut e = entry();
        e.radio = Some("lte".to_owned());
        assert_eq!(build_measure(&header(Some("gsm")), &e).radio, Some(RadioType::Lte));

        e.radio = None;
        assert_eq!(build_measure(&header(Some("gsm")), &e).radio, Some(RadioType::Gsm));

        // unknown names stay unresolved rather than falling back
        e.radio = Some("tetra".to_owned());
        assert_eq!(build_measure(&header(Some("gsm")), &e).radio, None);
        assert_eq!(RadioType::code(build_measure(&header(Some("gsm")), &e).radio), -1);
    }

    #[test]
    fn missing_entry_fields_default_to_zero() {
        let e = CellEntry {
            radio: None,
            country: 234,
            network: 30,
            area: None,
            cell: None,
            unit: None,
            asu: None,
            signal: None,
            ta: None,
        };
        let measure = build_measure(&header(None), &e);
        assert_eq!(measure.area, 0);
        assert_eq!(measure.cell, 0);
        assert_eq!(measure.unit, 0);
        assert_eq!(measure.signal, 0);
        assert!(!measure.is_complete());
    }

    #[tokio::test]
    async fn complete_measures_maintain_the_station() {
        let store = MemoryStore::new();
        let outcome = insert_measures(&store, &header(None), &[entry()]).await.unwrap();
        assert_eq!(outcome, IngestOutcome::Persisted(1));

        let record = store.cell_record(&key()).unwrap();
        assert_eq!(record.new_measures, 1);
        assert_eq!(record.total_measures, 1);

        insert_measures(&store, &header(None), &[entry()]).await.unwrap();
        let record = store.cell_record(&key()).unwrap();
        assert_eq!(record.total_measures, 2);
    }

    #[tokio::test]
    async fn incomplete_measures_are_persisted_without_counters() {
        let store = MemoryStore::new();
        let mut e = entry();
        e.cell = Some(0);
        let outcome = insert_measures(&store, &header(None), &[e]).await.unwrap();

        // the raw measure is kept, the aggregate stays untouched
        assert_eq!(outcome, IngestOutcome::Persisted(1));
        assert_eq!(store.cell_measures().len(), 1);
        assert!(store.cell_record(&key()).is_none());
    }

    #[tokio::test]
    async fn unresolved_radio_skips_counters_but_keeps_the_measure() {
        let store = MemoryStore::new();
        let mut e = entry();
        e.radio = Some("tetra".to_owned());
        insert_measures(&store, &header(None), &[e]).await.unwrap();

        let measures = store.cell_measures();
        assert_eq!(measures.len(), 1);
        assert_eq!(measures[0].radio, None);
        assert!(store.cell_record(&key()).is_none());
    }

    #[tokio::test]
    async fn the_count_includes_incomplete_measures() {
        let store = MemoryStore::new();
        let mut incomplete = entry();
        incomplete.area = None;
        let outcome = insert_measures(&store, &header(None), &[entry(), incomplete])
            .await
            .unwrap();
        assert_eq!(outcome, IngestOutcome::Persisted(2));
        assert_eq!(store.cell_measures().len(), 2);
    }
}
