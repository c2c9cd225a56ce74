use actix_web::{error::ErrorInternalServerError, http::StatusCode, post, web, HttpResponse, Responder};
use anyhow::Context;
use chrono::Utc;
use serde::Deserialize;

use crate::queue;
use crate::store::StationStore;
use crate::submission::report::Report;

#[derive(Deserialize)]
struct Submission {
    items: Vec<Report>,
}

#[post("/v2/geosubmit")]
pub async fn service(
    data: web::Json<Submission>,
    store: web::Data<dyn StationStore>,
) -> actix_web::Result<impl Responder> {
    let data = data.into_inner();
    let store = store.into_inner();

    for report in data.items {
        let raw = serde_json::to_string(&report).map_err(ErrorInternalServerError)?;
        let report_id = store
            .insert_report(&raw)
            .await
            .context("storing report failed")
            .map_err(ErrorInternalServerError)?;

        let header = report.header(report_id, Utc::now());
        let wifi_entries = report.wifi_entries();
        if !wifi_entries.is_empty() {
            queue::submit_wifi(store.clone(), header.clone(), wifi_entries);
        }
        let cell_entries = report.cell_entries();
        if !cell_entries.is_empty() {
            queue::submit_cell(store.clone(), header, cell_entries);
        }
    }

    // the geosubmit API documentation specifies OK rather than ACCEPTED
    Ok(HttpResponse::new(StatusCode::OK))
}
