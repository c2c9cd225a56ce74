use chrono::{DateTime, Utc};
use mac_address::MacAddress;
use sqlx::FromRow;
use strum::EnumString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum RadioType {
    Gsm,
    // older clients report wcdma as umts
    #[strum(serialize = "wcdma", serialize = "umts")]
    Wcdma,
    Lte,
    Nr,
}

impl RadioType {
    pub fn from_name(name: &str) -> Option<RadioType> {
        name.parse().ok()
    }

    /// Storage encoding; unresolved radios are stored as -1.
    pub fn code(radio: Option<RadioType>) -> i16 {
        match radio {
            Some(x) => x as i16,
            None => -1,
        }
    }
}

/// Composite key of a cell station. The scrambling code unit is kept on the
/// raw measure only and is not part of the aggregate key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub radio: RadioType,
    pub country: i16,
    pub network: i16,
    pub area: i32,
    pub cell: i64,
}

/// Aggregate wifi station record as read by the locate path. Only stations
/// that already have a derived position are projected into this type.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct WifiStation {
    pub key: MacAddress,
    pub lat: f64,
    pub lon: f64,
    pub radius: f64,
}

/// A station joined with the signal strength it was observed at, for one
/// estimation request. Built once per query and never mutated.
#[derive(Debug, Clone, Copy)]
pub struct Network {
    pub key: MacAddress,
    pub lat: f64,
    pub lon: f64,
    pub radius: f64,
    pub signal: i16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    pub accuracy: f64,
}

/// Raw wifi observation, immutable once written.
#[derive(Debug, Clone)]
pub struct WifiMeasure {
    pub report_id: i64,
    pub created: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub time: DateTime<Utc>,
    pub accuracy: f64,
    pub altitude: f64,
    pub altitude_accuracy: f64,
    pub key: MacAddress,
    // 0 when the client reported neither a channel nor a usable frequency
    pub channel: i16,
    pub signal: i16,
}

/// Raw cell observation, immutable once written.
#[derive(Debug, Clone)]
pub struct CellMeasure {
    pub report_id: i64,
    pub created: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub time: DateTime<Utc>,
    pub accuracy: f64,
    pub altitude: f64,
    pub altitude_accuracy: f64,
    pub radio: Option<RadioType>,
    pub country: i16,
    pub network: i16,
    pub area: i32,
    pub cell: i64,
    pub unit: i16,
    pub asu: i16,
    pub signal: i16,
    pub ta: i16,
}

impl CellMeasure {
    /// A measure is complete when the radio resolved and both area and cell
    /// id are non-zero. Only complete measures may touch aggregate counters.
    pub fn is_complete(&self) -> bool {
        self.radio.is_some() && self.area != 0 && self.cell != 0
    }

    pub fn station_key(&self) -> Option<CellKey> {
        if !self.is_complete() {
            return None;
        }
        Some(CellKey {
            radio: self.radio?,
            country: self.country,
            network: self.network,
            area: self.area,
            cell: self.cell,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radio_names() {
        assert_eq!(RadioType::from_name("gsm"), Some(RadioType::Gsm));
        assert_eq!(RadioType::from_name("wcdma"), Some(RadioType::Wcdma));
        assert_eq!(RadioType::from_name("umts"), Some(RadioType::Wcdma));
        assert_eq!(RadioType::from_name("lte"), Some(RadioType::Lte));
        assert_eq!(RadioType::from_name("nr"), Some(RadioType::Nr));
        assert_eq!(RadioType::from_name("tetra"), None);
    }

    #[test]
    fn radio_codes() {
        assert_eq!(RadioType::code(Some(RadioType::Gsm)), 0);
        assert_eq!(RadioType::code(Some(RadioType::Nr)), 3);
        assert_eq!(RadioType::code(None), -1);
    }
}
