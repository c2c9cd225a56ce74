//! Report input model: one shared header plus per-network entries.
//!
//! Only the bare minimum is validated here: device manufacturer software
//! produces odd data that is difficult to handle per device, so optional
//! fields stay optional and default at persistence time.

use chrono::{DateTime, Utc};
use mac_address::MacAddress;
use serde::{Deserialize, Serialize};

/// Shared metadata of one measurement report, attached to every measure
/// built from it.
#[derive(Debug, Clone)]
pub struct ReportHeader {
    pub report_id: i64,
    /// When the report reached the server, RFC 3339.
    pub created: Option<String>,
    /// When the device took the readings, RFC 3339.
    pub time: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub accuracy: Option<f64>,
    pub altitude: Option<f64>,
    pub altitude_accuracy: Option<f64>,
    /// Default radio for cell entries that do not carry their own.
    pub radio: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WifiEntry {
    pub key: MacAddress,
    pub channel: Option<i16>,
    pub frequency: Option<i16>,
    pub signal: Option<i16>,
}

#[derive(Debug, Clone)]
pub struct CellEntry {
    pub radio: Option<String>,
    pub country: i16,
    pub network: i16,
    pub area: Option<i32>,
    pub cell: Option<i64>,
    pub unit: Option<i16>,
    pub asu: Option<i16>,
    pub signal: Option<i16>,
    pub ta: Option<i16>,
}

/// Serde representation of one submitted report.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub position: ReportPosition,
    #[serde(default)]
    pub radio: Option<String>,
    #[serde(default)]
    pub wifi_access_points: Vec<ReportWifi>,
    #[serde(default)]
    pub cell_towers: Vec<ReportCell>,
}

/// Serde representation of the position block of a report.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPosition {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub altitude_accuracy: Option<f64>,
}

/// Serde representation of a wifi network in a report.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportWifi {
    pub mac_address: MacAddress,
    #[serde(default)]
    pub channel: Option<i16>,
    #[serde(default)]
    pub frequency: Option<i16>,
    #[serde(default)]
    pub signal_strength: Option<i16>,
}

/// Serde representation of a cell tower in a report. The radio type stays a
/// plain string so that unknown radios are ingested rather than rejected.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCell {
    #[serde(default)]
    pub radio_type: Option<String>,
    pub mobile_country_code: i16,
    pub mobile_network_code: i16,
    #[serde(default)]
    pub location_area_code: Option<i32>,
    #[serde(default)]
    pub cell_id: Option<i64>,
    #[serde(default)]
    pub primary_scrambling_code: Option<i16>,
    #[serde(default)]
    pub asu: Option<i16>,
    #[serde(default)]
    pub signal_strength: Option<i16>,
    #[serde(default)]
    pub timing_advance: Option<i16>,
}

impl Report {
    pub fn header(&self, report_id: i64, received: DateTime<Utc>) -> ReportHeader {
        ReportHeader {
            report_id,
            created: Some(received.to_rfc3339()),
            time: Some(self.timestamp.to_rfc3339()),
            lat: self.position.latitude,
            lon: self.position.longitude,
            accuracy: self.position.accuracy,
            altitude: self.position.altitude,
            altitude_accuracy: self.position.altitude_accuracy,
            radio: self.radio.clone(),
        }
    }

    pub fn wifi_entries(&self) -> Vec<WifiEntry> {
        self.wifi_access_points
            .iter()
            .map(|x| WifiEntry {
                key: x.mac_address,
                channel: x.channel,
                frequency: x.frequency,
                signal: x.signal_strength,
            })
            .collect()
    }

    pub fn cell_entries(&self) -> Vec<CellEntry> {
        self.cell_towers
            .iter()
            .map(|x| CellEntry {
                radio: x.radio_type.clone(),
                country: x.mobile_country_code,
                network: x.mobile_network_code,
                area: x.location_area_code,
                cell: x.cell_id,
                unit: x.primary_scrambling_code,
                asu: x.asu,
                signal: x.signal_strength,
                ta: x.timing_advance,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_report() {
        let raw = r#"{
            "timestamp": 1393675980000,
            "position": {"latitude": 51.5, "longitude": -0.1},
            "wifiAccessPoints": [{"macAddress": "01:23:45:67:89:ab", "signalStrength": -60}]
        }"#;
        let report: Report = serde_json::from_str(raw).unwrap();
        let header = report.header(7, Utc::now());
        assert_eq!(header.report_id, 7);
        assert_eq!(header.lat, 51.5);
        assert!(header.radio.is_none());

        let entries = report.wifi_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].signal, Some(-60));
        assert!(entries[0].frequency.is_none());
        assert!(report.cell_entries().is_empty());
    }

    #[test]
    fn rejects_a_report_without_a_position() {
        let raw = r#"{"timestamp": 1393675980000, "wifiAccessPoints": []}"#;
        assert!(serde_json::from_str::<Report>(raw).is_err());
    }
}
