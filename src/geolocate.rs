use actix_web::{error::ErrorInternalServerError, post, web, HttpResponse};
use mac_address::MacAddress;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::locate::{Locator, Query, WifiLookup};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationRequest {
    #[serde(default)]
    wifi_access_points: Vec<AccessPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessPoint {
    mac_address: MacAddress,
    #[serde(default)]
    signal_strength: Option<i16>,
}

#[derive(Debug, Serialize)]
struct LocationResponse {
    location: Location,
    accuracy: f64,
}

#[derive(Debug, Serialize)]
struct Location {
    lat: f64,
    lng: f64,
}

#[post("/v1/geolocate")]
pub async fn service(
    data: web::Json<LocationRequest>,
    locator: web::Data<Locator>,
) -> actix_web::Result<HttpResponse> {
    let data = data.into_inner();

    let query = Query {
        wifi: data
            .wifi_access_points
            .iter()
            .map(|x| WifiLookup {
                key: x.mac_address,
                signal: x.signal_strength,
            })
            .collect(),
    };

    let position = locator
        .estimate(&query)
        .await
        .map_err(ErrorInternalServerError)?;

    match position {
        Some(position) => Ok(HttpResponse::Ok().json(LocationResponse {
            location: Location {
                lat: position.lat,
                lng: position.lon,
            },
            accuracy: position.accuracy,
        })),
        None => Ok(HttpResponse::NotFound().json(json!(
            {
                "error": {
                    "errors": [{
                        "domain": "geolocation",
                        "reason": "notFound",
                        "message": "No location could be estimated based on the data provided",
                    }],
                    "code": 404,
                    "message": "Not found",
                }
            }
        ))),
    }
}
