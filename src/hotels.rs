// Hotel offer provider
// Static per-city catalog, filtered by the ceiling parsed out of a free-form budget string

use crate::airports::{normalize_place_name, Coordinates};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tracing::{info, warn};

const EMBEDDED_CATALOG: &str = include_str!("../data/hotel_catalog.json");

// Digit groups with optional thousands separators ("25,000", "1,00,000")
static AMOUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:,\d+)*").expect("amount pattern is valid"));

// Budget amounts must carry a currency marker: "₹25,000", "$1,500", "INR 40,000", "Rs. 30,000".
// Decimals after the digit groups are left unmatched.
static BUDGET_AMOUNT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\p{Sc}|\b(?i:INR|Rs)\.?)\s*(\d+(?:,\d+)*)")
        .expect("budget amount pattern is valid")
});

#[derive(Error, Debug)]
pub enum HotelError {
    #[error("No hotels found for this location: {0}")]
    LocationNotFound(String),

    #[error("Missing required parameter: location")]
    MissingLocation,

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelOffer {
    pub name: String,
    // Currency-prefixed and thousands-separated, e.g. "₹18,500/night"
    pub price: String,
    pub rating: f64,
    pub location: String,
    pub amenities: Vec<String>,
    pub image: String,
    pub description: String,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityCatalogEntry {
    pub catalog_id: String,
    pub hotels: Vec<HotelOffer>,
}

// Read-only after load
#[derive(Debug, Default)]
pub struct HotelCatalog {
    cities: HashMap<String, CityCatalogEntry>,
}

impl HotelCatalog {
    // Dataset compiled into the binary
    pub fn embedded() -> Result<Self, HotelError> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, HotelError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, HotelError> {
        let raw: HashMap<String, CityCatalogEntry> =
            serde_json::from_str(json).map_err(|e| HotelError::Catalog(e.to_string()))?;

        // Keys are matched against normalized place names
        let cities = raw
            .into_iter()
            .map(|(city, entry)| (normalize_place_name(&city), entry))
            .collect();
        Ok(Self { cities })
    }

    pub fn lookup(&self, location: &str) -> Result<&CityCatalogEntry, HotelError> {
        let key = normalize_place_name(location);
        self.cities
            .get(&key)
            .ok_or_else(|| HotelError::LocationNotFound(location.trim().to_string()))
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

// Last currency amount in the budget ("₹25,000 - ₹50,000" -> 50000).
// None is unbounded: no budget, or no currency amount in it. Bare counts ("2 adults") are ignored.
pub fn parse_budget_ceiling(budget: Option<&str>) -> Option<u64> {
    BUDGET_AMOUNT_PATTERN
        .captures_iter(budget?)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_amount(m.as_str()))
}

// First amount in a catalog price string ("₹18,500/night" -> 18500)
pub fn parse_price(price: &str) -> Option<u64> {
    AMOUNT_PATTERN
        .find(price)
        .and_then(|m| parse_amount(m.as_str()))
}

fn parse_amount(token: &str) -> Option<u64> {
    token.replace(',', "").parse().ok()
}

// Keeps catalog order; unpriced hotels only survive when there is no ceiling
pub fn filter_by_ceiling(hotels: &[HotelOffer], ceiling: Option<u64>) -> Vec<HotelOffer> {
    match ceiling {
        None => hotels.to_vec(),
        Some(max) => hotels
            .iter()
            .filter(|hotel| parse_price(&hotel.price).map_or(false, |price| price <= max))
            .cloned()
            .collect(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelParams {
    #[serde(default)]
    pub location: Option<String>,
    // Dates are carried for the model's benefit; availability is not date-filtered
    #[serde(default)]
    pub check_in: Option<String>,
    #[serde(default)]
    pub check_out: Option<String>,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub preferences: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HotelResult {
    pub offers: Vec<HotelOffer>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HotelResult {
    fn empty(error: &HotelError) -> Self {
        Self {
            offers: Vec::new(),
            total: 0,
            catalog_id: None,
            message: error.to_string(),
            error: Some(error.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct HotelProvider {
    catalog: Arc<HotelCatalog>,
}

impl HotelProvider {
    pub fn new(catalog: Arc<HotelCatalog>) -> Self {
        Self { catalog }
    }

    // Never fails: catalog misses become an empty, reportable result
    pub fn fetch_hotels(&self, params: &HotelParams) -> HotelResult {
        match self.search(params) {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "hotel lookup returned no catalog entry");
                HotelResult::empty(&e)
            }
        }
    }

    fn search(&self, params: &HotelParams) -> Result<HotelResult, HotelError> {
        let location = params
            .location
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .ok_or(HotelError::MissingLocation)?;
        let entry = self.catalog.lookup(location)?;
        let ceiling = parse_budget_ceiling(params.budget.as_deref());

        let offers = filter_by_ceiling(&entry.hotels, ceiling);
        info!(
            location = %normalize_place_name(location),
            catalog_id = %entry.catalog_id,
            ceiling = ?ceiling,
            matched = offers.len(),
            available = entry.hotels.len(),
            "hotel catalog filtered"
        );

        let message = if offers.is_empty() {
            "No hotels found within budget"
        } else {
            "Hotels found successfully"
        };

        Ok(HotelResult {
            total: offers.len(),
            offers,
            catalog_id: Some(entry.catalog_id.clone()),
            message: message.to_string(),
            error: None,
        })
    }
}
