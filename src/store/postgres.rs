use std::collections::HashSet;

use async_trait::async_trait;
use mac_address::MacAddress;
use sqlx::{PgPool, Postgres, Transaction};

use crate::model::{CellKey, CellMeasure, RadioType, WifiMeasure, WifiStation};
use crate::store::{StationStore, StationTx, StoreError};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_unique(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl StationStore for PgStore {
    async fn insert_report(&self, raw: &str) -> Result<i64, StoreError> {
        let (id,): (i64,) = sqlx::query_as("insert into report (raw) values ($1) returning id")
            .bind(raw)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    async fn wifi_by_keys(&self, keys: &[MacAddress]) -> Result<Vec<WifiStation>, StoreError> {
        let mut stations = Vec::new();
        for key in keys {
            let row: Option<WifiStation> = sqlx::query_as(
                "select key, lat, lon, radius from wifi where key = $1 and lat is not null",
            )
            .bind(*key)
            .fetch_optional(&self.pool)
            .await?;
            if let Some(station) = row {
                stations.push(station);
            }
        }
        Ok(stations)
    }

    async fn begin<'a>(&'a self) -> Result<Box<dyn StationTx + 'a>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StationTx for PgTx {
    async fn blacklisted(&mut self, keys: &[MacAddress]) -> Result<HashSet<MacAddress>, StoreError> {
        let mut blacked = HashSet::new();
        for key in keys {
            let row: Option<(MacAddress,)> =
                sqlx::query_as("select key from wifi_blacklist where key = $1")
                    .bind(*key)
                    .fetch_optional(&mut *self.tx)
                    .await?;
            if let Some((key,)) = row {
                blacked.insert(key);
            }
        }
        Ok(blacked)
    }

    async fn insert_wifi_measure(&mut self, measure: &WifiMeasure) -> Result<(), StoreError> {
        sqlx::query(
            "insert into wifi_measure \
             (report_id, created, lat, lon, time, accuracy, altitude, altitude_accuracy, key, channel, signal) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(measure.report_id)
        .bind(measure.created)
        .bind(measure.lat)
        .bind(measure.lon)
        .bind(measure.time)
        .bind(measure.accuracy)
        .bind(measure.altitude)
        .bind(measure.altitude_accuracy)
        .bind(measure.key)
        .bind(measure.channel)
        .bind(measure.signal)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn increment_wifi_counters(&mut self, key: MacAddress) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "update wifi set new_measures = new_measures + 1, total_measures = total_measures + 1 \
             where key = $1",
        )
        .bind(key)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_wifi_station(&mut self, key: MacAddress) -> Result<(), StoreError> {
        sqlx::query("insert into wifi (key, new_measures, total_measures) values ($1, 1, 1)")
            .bind(key)
            .execute(&mut *self.tx)
            .await
            .map_err(map_unique)?;
        Ok(())
    }

    async fn insert_cell_measure(&mut self, measure: &CellMeasure) -> Result<(), StoreError> {
        sqlx::query(
            "insert into cell_measure \
             (report_id, created, lat, lon, time, accuracy, altitude, altitude_accuracy, \
              radio, country, network, area, cell, unit, asu, signal, ta) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(measure.report_id)
        .bind(measure.created)
        .bind(measure.lat)
        .bind(measure.lon)
        .bind(measure.time)
        .bind(measure.accuracy)
        .bind(measure.altitude)
        .bind(measure.altitude_accuracy)
        .bind(RadioType::code(measure.radio))
        .bind(measure.country)
        .bind(measure.network)
        .bind(measure.area)
        .bind(measure.cell)
        .bind(measure.unit)
        .bind(measure.asu)
        .bind(measure.signal)
        .bind(measure.ta)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn increment_cell_counters(&mut self, key: &CellKey) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "update cell set new_measures = new_measures + 1, total_measures = total_measures + 1 \
             where radio = $1 and country = $2 and network = $3 and area = $4 and cell = $5",
        )
        .bind(key.radio as i16)
        .bind(key.country)
        .bind(key.network)
        .bind(key.area)
        .bind(key.cell)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_cell_station(&mut self, key: &CellKey) -> Result<(), StoreError> {
        sqlx::query(
            "insert into cell (radio, country, network, area, cell, new_measures, total_measures) \
             values ($1, $2, $3, $4, $5, 1, 1)",
        )
        .bind(key.radio as i16)
        .bind(key.country)
        .bind(key.network)
        .bind(key.area)
        .bind(key.cell)
        .execute(&mut *self.tx)
        .await
        .map_err(map_unique)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(map_unique)
    }
}
