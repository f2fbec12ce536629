// SPDX-License-Identifier: MIT

//! Reporting queries over the sales/location dataset
//!
//! Flat group-and-sum reductions over the `maps_data` collection. No
//! reference resolution happens here; rows are plain records.

use serde_json::{json, Value as JsonValue};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::docstore::{Document, DocumentStore, FieldFilter, Value};
use crate::lattice::error::LatticeError;

pub const MAPS_DATA: &str = "maps_data";

pub struct Reports {
    store: Arc<dyn DocumentStore>,
}

/// Accumulator for one city/route zone.
#[derive(Debug, Default)]
struct Zone {
    city: String,
    route: String,
    isocrona: String,
    total_units: i64,
    total_liters: f64,
    total_usd: f64,
    points: Vec<JsonValue>,
}

impl Zone {
    fn to_json(&self) -> JsonValue {
        json!({
            "city": self.city,
            "route": self.route,
            "isocrona": self.isocrona,
            "sales_summary": {
                "total_units": self.total_units,
                "total_liters": self.total_liters,
                "total_usd": self.total_usd,
            },
            "points": self.points,
        })
    }
}

fn str_field(doc: &Document, field: &str) -> Option<String> {
    doc.fields
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn num_field(doc: &Document, field: &str) -> f64 {
    doc.fields
        .get(field)
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

impl Reports {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// All rows for a country, id folded in.
    pub async fn maps_data(&self, country: &str) -> Result<Vec<JsonValue>, LatticeError> {
        let rows = self
            .store
            .query(MAPS_DATA, &[FieldFilter::eq("country", country)])
            .await?;
        if rows.is_empty() {
            return Err(LatticeError::not_found(format!(
                "{}?country={}",
                MAPS_DATA, country
            )));
        }
        Ok(rows.iter().map(Document::to_json).collect())
    }

    /// Rows filtered by country and distributor type (ANDed).
    pub async fn distributor_data(
        &self,
        country: &str,
        distributor_type: &str,
    ) -> Result<Vec<JsonValue>, LatticeError> {
        let rows = self
            .store
            .query(
                MAPS_DATA,
                &[
                    FieldFilter::eq("country", country),
                    FieldFilter::eq("distributor_type", distributor_type),
                ],
            )
            .await?;
        if rows.is_empty() {
            return Err(LatticeError::not_found(format!(
                "{}?country={}&distributor_type={}",
                MAPS_DATA, country, distributor_type
            )));
        }
        Ok(rows.iter().map(Document::to_json).collect())
    }

    /// Distinct country values across the dataset.
    pub async fn countries(&self) -> Result<Vec<String>, LatticeError> {
        let rows = self.store.query(MAPS_DATA, &[]).await?;
        let countries: BTreeSet<String> = rows
            .iter()
            .filter_map(|doc| str_field(doc, "country"))
            .collect();
        if countries.is_empty() {
            return Err(LatticeError::not_found(MAPS_DATA));
        }
        Ok(countries.into_iter().collect())
    }

    /// Distinct route values for a country.
    pub async fn routes_by_country(&self, country: &str) -> Result<Vec<String>, LatticeError> {
        let rows = self
            .store
            .query(MAPS_DATA, &[FieldFilter::eq("country", country)])
            .await?;
        let routes: BTreeSet<String> = rows
            .iter()
            .filter_map(|doc| str_field(doc, "route"))
            .collect();
        if routes.is_empty() {
            return Err(LatticeError::not_found(format!(
                "{}?country={}",
                MAPS_DATA, country
            )));
        }
        Ok(routes.into_iter().collect())
    }

    /// Group a country's rows by city and route, summing sales figures and
    /// collecting GPS points per zone.
    pub async fn distribution_zones(&self, country: &str) -> Result<Vec<JsonValue>, LatticeError> {
        let rows = self
            .store
            .query(MAPS_DATA, &[FieldFilter::eq("country", country)])
            .await?;

        let mut zones: BTreeMap<String, Zone> = BTreeMap::new();
        for doc in &rows {
            let (Some(city), Some(route)) = (str_field(doc, "city"), str_field(doc, "route"))
            else {
                log::warn!("maps_data/{} lacks city/route, skipping", doc.id);
                continue;
            };
            let key = format!("{}-{}", city, route);
            let zone = zones.entry(key).or_insert_with(|| Zone {
                isocrona: str_field(doc, "isocrona").unwrap_or_else(|| "Unknown".to_string()),
                city,
                route,
                ..Default::default()
            });

            zone.total_units += num_field(doc, "sales_units") as i64;
            zone.total_liters += num_field(doc, "sales_liters");
            zone.total_usd += num_field(doc, "sales_usd");
            if let Some(point) = doc.fields.get("gps_coordinates") {
                zone.points.push(point.to_json());
            }
        }

        if zones.is_empty() {
            return Err(LatticeError::not_found(format!(
                "{}?country={}",
                MAPS_DATA, country
            )));
        }
        Ok(zones.values().map(Zone::to_json).collect())
    }
}
