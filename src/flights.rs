// Flight offer provider
// Queries the flight-search supplier and degrades to synthetic offers when live data is unavailable

use crate::airports::{resolve_airport_code, Place};
use crate::config::FlightApiConfig;
use crate::supplier::SupplierResponse;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const PLACEHOLDER: &str = "N/A";
pub const UNKNOWN_AIRLINE: &str = "Unknown Airline";
pub const DEFAULT_CABIN_CLASS: &str = "Economy";

// Fallback generation bounds
pub const FALLBACK_AIRLINES: &[&str] = &[
    "IndiGo",
    "Air India",
    "Vistara",
    "SpiceJet",
    "Akasa Air",
    "Air India Express",
];
pub const MAX_FALLBACK_OFFERS: usize = 4;
pub const FALLBACK_PRICE_RANGE: RangeInclusive<u32> = 3_500..=14_000;
pub const FALLBACK_DURATION_MINUTES: RangeInclusive<u32> = 65..=240;
// Five-minute departure slots between 05:00 and 22:55
const FALLBACK_DEPARTURE_SLOTS: RangeInclusive<u32> = 60..=275;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Error, Debug)]
pub enum FlightError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Flight provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Could not decode flight provider response: {0}")]
    Decode(String),
}

// Parameters as the model (merged with trip defaults) supplies them
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightParams {
    #[serde(default)]
    pub origin: Option<Place>,
    #[serde(default)]
    pub destination: Option<Place>,
    #[serde(default)]
    pub departure_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub adults: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub children: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub infants: Option<u32>,
    #[serde(default)]
    pub cabin_class: Option<String>,
}

// Passenger counts arrive as numbers or numeric strings
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u32),
        Text(String),
    }

    match Option::<Count>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Count::Number(n)) => Ok(Some(n)),
        Some(Count::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Count::Text(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

// Fully resolved query sent to the supplier
#[derive(Debug, Clone, PartialEq)]
pub struct FlightQuery {
    pub origin_code: String,
    pub destination_code: String,
    pub date: NaiveDate,
    pub adults: u32,
    pub children: u32,
    pub infants: u32,
    pub cabin_class: String,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightPrice {
    #[serde(serialize_with = "or_placeholder")]
    pub amount: Option<f64>,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightEndpoint {
    pub time: String,
    pub airport: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightOffer {
    pub airline: String,
    pub flight_number: String,
    pub price: FlightPrice,
    pub departure: FlightEndpoint,
    pub arrival: FlightEndpoint,
    // Minutes
    #[serde(serialize_with = "or_placeholder")]
    pub duration: Option<u32>,
    pub stops: u32,
}

fn or_placeholder<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    match value {
        Some(v) => v.serialize(serializer),
        None => serializer.serialize_str(PLACEHOLDER),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightSource {
    Live,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlightResult {
    pub offers: Vec<FlightOffer>,
    pub source: FlightSource,
    pub total: usize,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// Supplier trait so tests can stand in for the remote endpoint
#[async_trait]
pub trait FlightSearchApi: Send + Sync + 'static {
    async fn search(&self, query: &FlightQuery) -> Result<SupplierResponse, FlightError>;
}

// reqwest-backed client for the one-way trip endpoint
pub struct FlightApiClient {
    http: reqwest::Client,
    config: FlightApiConfig,
}

impl FlightApiClient {
    pub fn new(config: FlightApiConfig) -> Result<Self, FlightError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| FlightError::ProviderUnavailable(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn url(&self, query: &FlightQuery) -> String {
        format!(
            "{}/onewaytrip/{}/{}/{}/{}/{}/{}/{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_key,
            query.origin_code,
            query.destination_code,
            query.date.format("%Y-%m-%d"),
            query.adults,
            query.children,
            query.infants,
            query.cabin_class,
            query.currency,
        )
    }
}

#[async_trait]
impl FlightSearchApi for FlightApiClient {
    async fn search(&self, query: &FlightQuery) -> Result<SupplierResponse, FlightError> {
        if self.config.api_key.is_empty() {
            return Err(FlightError::ProviderUnavailable(
                "no flight API key configured".to_string(),
            ));
        }

        let response = self
            .http
            .get(self.url(query))
            .send()
            .await
            .map_err(|e| FlightError::ProviderUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| FlightError::ProviderUnavailable(e.to_string()))?;

        response
            .json::<SupplierResponse>()
            .await
            .map_err(|e| FlightError::Decode(e.to_string()))
    }
}

// Flatten the itinerary -> leg -> segment graph, degrading missing fields to placeholders
pub fn transform_itineraries(
    response: &SupplierResponse,
    origin_code: &str,
    destination_code: &str,
    currency: &str,
) -> Vec<FlightOffer> {
    response
        .itineraries
        .iter()
        .map(|itinerary| {
            let leg = itinerary
                .leg_ids
                .first()
                .and_then(|id| response.leg(id));
            let segment = leg
                .and_then(|leg| leg.segment_ids.first())
                .and_then(|id| response.segment(id));
            let amount = itinerary
                .pricing_options
                .first()
                .and_then(|option| option.price.as_ref())
                .and_then(|price| price.amount);

            let airline = segment
                .and_then(|s| s.marketing_carrier_id)
                .map(|id| {
                    response
                        .carrier_name(id)
                        .map(str::to_string)
                        .unwrap_or_else(|| id.to_string())
                })
                .unwrap_or_else(|| UNKNOWN_AIRLINE.to_string());

            FlightOffer {
                airline,
                flight_number: segment
                    .and_then(|s| s.marketing_flight_number.clone())
                    .unwrap_or_else(|| PLACEHOLDER.to_string()),
                price: FlightPrice {
                    amount,
                    currency: currency.to_string(),
                },
                departure: FlightEndpoint {
                    time: leg
                        .and_then(|l| l.departure.clone())
                        .unwrap_or_else(|| PLACEHOLDER.to_string()),
                    airport: origin_code.to_string(),
                },
                arrival: FlightEndpoint {
                    time: leg
                        .and_then(|l| l.arrival.clone())
                        .unwrap_or_else(|| PLACEHOLDER.to_string()),
                    airport: destination_code.to_string(),
                },
                duration: leg.and_then(|l| l.duration),
                stops: leg.and_then(|l| l.stop_count).unwrap_or(0),
            }
        })
        .collect()
}

// Synthesizes plausible offers; seedable so tests can pin the output
pub struct FallbackGenerator {
    rng: Mutex<StdRng>,
}

impl Default for FallbackGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackGenerator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn generate(&self, query: &FlightQuery) -> Vec<FlightOffer> {
        let mut rng = self.rng.lock();
        let count = rng.gen_range(1..=MAX_FALLBACK_OFFERS);
        let midnight = NaiveDateTime::new(query.date, NaiveTime::MIN);

        (0..count)
            .map(|_| {
                let airline = FALLBACK_AIRLINES
                    .choose(&mut *rng)
                    .copied()
                    .unwrap_or(UNKNOWN_AIRLINE);
                let price = rng.gen_range(FALLBACK_PRICE_RANGE);
                let duration = rng.gen_range(FALLBACK_DURATION_MINUTES);
                let slot = rng.gen_range(FALLBACK_DEPARTURE_SLOTS);
                let departure = midnight + Duration::minutes(i64::from(slot) * 5);
                let arrival = departure + Duration::minutes(i64::from(duration));
                let number = rng.gen_range(100..=999);

                FlightOffer {
                    airline: airline.to_string(),
                    flight_number: format!("{}{}", airline_initials(airline), number),
                    price: FlightPrice {
                        amount: Some(f64::from(price)),
                        currency: query.currency.clone(),
                    },
                    departure: FlightEndpoint {
                        time: departure.format(TIME_FORMAT).to_string(),
                        airport: query.origin_code.clone(),
                    },
                    arrival: FlightEndpoint {
                        time: arrival.format(TIME_FORMAT).to_string(),
                        airport: query.destination_code.clone(),
                    },
                    duration: Some(duration),
                    stops: 0,
                }
            })
            .collect()
    }
}

// "Air India" -> "AI"; single-word names use their first two letters
pub fn airline_initials(airline: &str) -> String {
    let words: Vec<&str> = airline.split_whitespace().collect();
    let initials: String = if words.len() > 1 {
        words.iter().filter_map(|w| w.chars().next()).collect()
    } else {
        airline.chars().filter(|c| c.is_alphabetic()).take(2).collect()
    };
    initials.to_uppercase()
}

// "premium_ECONOMY" -> "Premium_economy"
pub fn canonical_cabin_class(cabin_class: Option<&str>) -> String {
    let raw = cabin_class
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CABIN_CLASS);
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => DEFAULT_CABIN_CLASS.to_string(),
    }
}

// Accepts plain dates and full timestamps, keeps only the calendar date
pub fn normalize_date(raw: &str) -> Result<NaiveDate, FlightError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc).date_naive());
    }
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(raw, TIME_FORMAT) {
        return Ok(timestamp.date());
    }
    Err(FlightError::InvalidParameters(format!(
        "departureDate '{}' is not a calendar date",
        raw
    )))
}

#[derive(Debug, Default)]
pub struct FlightProviderStats {
    pub live_results: AtomicUsize,
    pub fallback_results: AtomicUsize,
    pub rejected_requests: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FlightProviderStatsReport {
    pub live_results: usize,
    pub fallback_results: usize,
    pub rejected_requests: usize,
}

pub struct FlightProvider {
    api: Arc<dyn FlightSearchApi>,
    fallback: FallbackGenerator,
    currency: String,
    stats: FlightProviderStats,
}

impl FlightProvider {
    pub fn new(api: Arc<dyn FlightSearchApi>, currency: impl Into<String>) -> Self {
        Self {
            api,
            fallback: FallbackGenerator::new(),
            currency: currency.into(),
            stats: FlightProviderStats::default(),
        }
    }

    pub fn with_fallback(mut self, fallback: FallbackGenerator) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn stats(&self) -> FlightProviderStatsReport {
        FlightProviderStatsReport {
            live_results: self.stats.live_results.load(Ordering::SeqCst),
            fallback_results: self.stats.fallback_results.load(Ordering::SeqCst),
            rejected_requests: self.stats.rejected_requests.load(Ordering::SeqCst),
        }
    }

    pub fn build_query(&self, params: &FlightParams) -> Result<FlightQuery, FlightError> {
        let missing: Vec<&str> = [
            ("origin", is_missing_place(params.origin.as_ref())),
            ("destination", is_missing_place(params.destination.as_ref())),
            (
                "departureDate",
                params
                    .departure_date
                    .as_deref()
                    .map_or(true, |d| d.trim().is_empty()),
            ),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect();

        if !missing.is_empty() {
            return Err(FlightError::InvalidParameters(format!(
                "missing required parameters: {}",
                missing.join(", ")
            )));
        }

        Ok(FlightQuery {
            origin_code: resolve_airport_code(params.origin.as_ref()),
            destination_code: resolve_airport_code(params.destination.as_ref()),
            date: normalize_date(params.departure_date.as_deref().unwrap_or_default())?,
            adults: params.adults.unwrap_or(1),
            children: params.children.unwrap_or(0),
            infants: params.infants.unwrap_or(0),
            cabin_class: canonical_cabin_class(params.cabin_class.as_deref()),
            currency: self.currency.clone(),
        })
    }

    // Only InvalidParameters reaches the caller; supplier trouble becomes fallback offers
    pub async fn fetch_flights(&self, params: &FlightParams) -> Result<FlightResult, FlightError> {
        let query = match self.build_query(params) {
            Ok(query) => query,
            Err(e) => {
                self.stats.rejected_requests.fetch_add(1, Ordering::SeqCst);
                return Err(e);
            }
        };

        info!(
            origin = %query.origin_code,
            destination = %query.destination_code,
            date = %query.date,
            cabin_class = %query.cabin_class,
            "fetching flights"
        );
        let started = Instant::now();

        let (reason, error) = match self.api.search(&query).await {
            Ok(response) => {
                let offers = transform_itineraries(
                    &response,
                    &query.origin_code,
                    &query.destination_code,
                    &query.currency,
                );
                debug!(
                    offers = offers.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "flight search completed"
                );
                if !offers.is_empty() {
                    self.stats.live_results.fetch_add(1, Ordering::SeqCst);
                    return Ok(FlightResult {
                        total: offers.len(),
                        offers,
                        source: FlightSource::Live,
                        message: "Flights found successfully".to_string(),
                        error: None,
                    });
                }
                ("No live flights found for this route", None)
            }
            Err(e) => {
                warn!(error = %e, "flight search failed");
                ("Live flight data unavailable", Some(e.to_string()))
            }
        };

        let offers = self.fallback.generate(&query);
        self.stats.fallback_results.fetch_add(1, Ordering::SeqCst);
        warn!(
            origin = %query.origin_code,
            destination = %query.destination_code,
            offers = offers.len(),
            "using fallback flight offers"
        );

        Ok(FlightResult {
            total: offers.len(),
            offers,
            source: FlightSource::Fallback,
            message: format!("{}; showing estimated options", reason),
            error,
        })
    }
}

fn is_missing_place(place: Option<&Place>) -> bool {
    match place {
        None => true,
        // Odd shapes still count as given and resolve to the default code
        Some(Place::Other(_)) => false,
        Some(place) => place.name().is_none(),
    }
}

// Stand-in supplier for tests
#[cfg(test)]
pub mod mock_flight_api {
    use super::*;
    use crate::supplier::{
        SupplierCarrier, SupplierItinerary, SupplierLeg, SupplierPrice, SupplierPricingOption,
        SupplierSegment,
    };

    #[derive(Debug, Clone, Copy)]
    pub enum MockMode {
        Outage,
        Empty,
        Normal,
    }

    pub struct MockFlightApi {
        mode: MockMode,
        pub calls: AtomicUsize,
        pub last_query: Mutex<Option<FlightQuery>>,
    }

    impl MockFlightApi {
        pub fn new(mode: MockMode) -> Self {
            Self {
                mode,
                calls: AtomicUsize::new(0),
                last_query: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl FlightSearchApi for MockFlightApi {
        async fn search(&self, query: &FlightQuery) -> Result<SupplierResponse, FlightError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_query.lock() = Some(query.clone());
            match self.mode {
                MockMode::Outage => Err(FlightError::ProviderUnavailable(
                    "503 Service Unavailable".to_string(),
                )),
                MockMode::Empty => Ok(SupplierResponse::default()),
                MockMode::Normal => Ok(sample_response()),
            }
        }
    }

    pub fn sample_response() -> SupplierResponse {
        SupplierResponse {
            itineraries: vec![
                SupplierItinerary {
                    id: "it-1".to_string(),
                    leg_ids: vec!["leg-1".to_string()],
                    pricing_options: vec![SupplierPricingOption {
                        price: Some(SupplierPrice {
                            amount: Some(5234.0),
                        }),
                    }],
                },
                // Dangling leg reference and no pricing
                SupplierItinerary {
                    id: "it-2".to_string(),
                    leg_ids: vec!["leg-missing".to_string()],
                    pricing_options: vec![],
                },
            ],
            legs: vec![SupplierLeg {
                id: "leg-1".to_string(),
                segment_ids: vec!["seg-1".to_string()],
                departure: Some("2025-06-01T06:10:00".to_string()),
                arrival: Some("2025-06-01T08:25:00".to_string()),
                duration: Some(135),
                stop_count: Some(0),
            }],
            segments: vec![SupplierSegment {
                id: "seg-1".to_string(),
                marketing_carrier_id: Some(-31722),
                marketing_flight_number: Some("6E2134".to_string()),
            }],
            carriers: vec![SupplierCarrier {
                id: -31722,
                name: Some("IndiGo".to_string()),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock_flight_api::{sample_response, MockFlightApi, MockMode};
    use super::*;
    use serde_json::json;

    fn provider(mode: MockMode) -> (Arc<MockFlightApi>, FlightProvider) {
        let api = Arc::new(MockFlightApi::new(mode));
        let provider = FlightProvider::new(api.clone(), "INR").with_fallback(FallbackGenerator::seeded(7));
        (api, provider)
    }

    fn params(value: serde_json::Value) -> FlightParams {
        serde_json::from_value(value).unwrap()
    }

    fn parse_time(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, TIME_FORMAT).unwrap()
    }

    #[tokio::test]
    async fn test_missing_destination_is_invalid() {
        let (api, provider) = provider(MockMode::Normal);
        let result = provider
            .fetch_flights(&params(json!({ "origin": "Delhi", "departureDate": "2025-06-01" })))
            .await;

        match result {
            Err(FlightError::InvalidParameters(msg)) => assert!(msg.contains("destination")),
            other => panic!("expected InvalidParameters, got {:?}", other),
        }
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
        assert_eq!(provider.stats().rejected_requests, 1);
    }

    #[tokio::test]
    async fn test_missing_origin_and_date_are_listed() {
        let (_, provider) = provider(MockMode::Normal);
        let err = provider
            .fetch_flights(&params(json!({ "origin": "  ", "destination": "Goa" })))
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("origin"));
        assert!(msg.contains("departureDate"));
    }

    #[tokio::test]
    async fn test_unparseable_date_is_invalid() {
        let (_, provider) = provider(MockMode::Normal);
        let err = provider
            .fetch_flights(&params(json!({
                "origin": "Delhi", "destination": "Goa", "departureDate": "next friday"
            })))
            .await
            .unwrap_err();
        assert!(matches!(err, FlightError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn test_live_results_are_transformed() {
        let (_, provider) = provider(MockMode::Normal);
        let result = provider
            .fetch_flights(&params(json!({
                "origin": "Delhi", "destination": "Goa, India", "departureDate": "2025-06-01"
            })))
            .await
            .unwrap();

        assert_eq!(result.source, FlightSource::Live);
        assert_eq!(result.total, 2);
        assert!(result.error.is_none());

        let first = &result.offers[0];
        assert_eq!(first.airline, "IndiGo");
        assert_eq!(first.flight_number, "6E2134");
        assert_eq!(first.price.amount, Some(5234.0));
        assert_eq!(first.price.currency, "INR");
        assert_eq!(first.departure.airport, "DEL");
        assert_eq!(first.arrival.airport, "GOI");
        assert_eq!(first.duration, Some(135));

        let degraded = &result.offers[1];
        assert_eq!(degraded.airline, UNKNOWN_AIRLINE);
        assert_eq!(degraded.flight_number, PLACEHOLDER);
        assert_eq!(degraded.departure.time, PLACEHOLDER);
        assert_eq!(degraded.stops, 0);
        assert_eq!(provider.stats().live_results, 1);
    }

    #[test]
    fn test_carrier_id_used_when_name_is_unknown() {
        let mut response = sample_response();
        response.carriers.clear();
        let offers = transform_itineraries(&response, "DEL", "GOI", "INR");
        assert_eq!(offers[0].airline, "-31722");
    }

    #[test]
    fn test_placeholders_serialize_as_na() {
        let mut response = sample_response();
        response.itineraries.remove(0);
        let offers = transform_itineraries(&response, "DEL", "GOI", "INR");
        let value = serde_json::to_value(&offers[0]).unwrap();
        assert_eq!(value["price"]["amount"], json!("N/A"));
        assert_eq!(value["duration"], json!("N/A"));
        assert_eq!(value["arrival"]["time"], json!("N/A"));
    }

    #[tokio::test]
    async fn test_outage_falls_back_to_synthetic_offers() {
        let (api, provider) = provider(MockMode::Outage);
        let result = provider
            .fetch_flights(&params(json!({
                "origin": "Mumbai", "destination": "Jaipur", "departureDate": "2025-06-01"
            })))
            .await
            .unwrap();

        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.source, FlightSource::Fallback);
        assert!(!result.offers.is_empty());
        assert!(result.offers.len() <= MAX_FALLBACK_OFFERS);
        assert_eq!(result.total, result.offers.len());
        assert!(result.error.as_deref().unwrap().contains("503"));

        for offer in &result.offers {
            let departure = parse_time(&offer.departure.time);
            let arrival = parse_time(&offer.arrival.time);
            let duration = offer.duration.unwrap();
            assert_eq!(arrival - departure, Duration::minutes(i64::from(duration)));
            assert_eq!(departure.date(), NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
            assert!(FALLBACK_DURATION_MINUTES.contains(&duration));
            assert!(FALLBACK_AIRLINES.contains(&offer.airline.as_str()));
            assert!(offer.flight_number.starts_with(&airline_initials(&offer.airline)));
            assert_eq!(offer.stops, 0);
            assert_eq!(offer.departure.airport, "BOM");
            assert_eq!(offer.arrival.airport, "JAI");
        }
        assert_eq!(provider.stats().fallback_results, 1);
    }

    #[tokio::test]
    async fn test_empty_results_fall_back_without_error() {
        let (_, provider) = provider(MockMode::Empty);
        let result = provider
            .fetch_flights(&params(json!({
                "origin": "Pune", "destination": "Kochi", "departureDate": "2025-06-01"
            })))
            .await
            .unwrap();

        assert_eq!(result.source, FlightSource::Fallback);
        assert!(!result.offers.is_empty());
        assert!(result.error.is_none());
        assert!(result.message.contains("No live flights"));
    }

    #[test]
    fn test_defaults_and_cabin_casing_reach_the_supplier() {
        let (api, provider) = provider(MockMode::Normal);
        let request = params(json!({
            "origin": { "name": "Chennai, Tamil Nadu, India" },
            "destination": "Kolkata",
            "departureDate": "2025-06-01T18:30:00Z",
            "adults": "2",
            "cabinClass": "BUSINESS"
        }));

        tokio_test::block_on(provider.fetch_flights(&request)).unwrap();

        let query = api.last_query.lock().clone().unwrap();
        assert_eq!(query.origin_code, "MAA");
        assert_eq!(query.destination_code, "CCU");
        assert_eq!(query.date, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(query.adults, 2);
        assert_eq!(query.children, 0);
        assert_eq!(query.infants, 0);
        assert_eq!(query.cabin_class, "Business");
        assert_eq!(query.currency, "INR");
    }

    #[test]
    fn test_client_url_layout() {
        let client = FlightApiClient::new(FlightApiConfig {
            base_url: "https://flights.example.com/".to_string(),
            api_key: "k3y".to_string(),
            ..FlightApiConfig::default()
        })
        .unwrap();
        let query = FlightQuery {
            origin_code: "DEL".to_string(),
            destination_code: "GOI".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            adults: 1,
            children: 0,
            infants: 0,
            cabin_class: "Economy".to_string(),
            currency: "INR".to_string(),
        };
        assert_eq!(
            client.url(&query),
            "https://flights.example.com/onewaytrip/k3y/DEL/GOI/2025-06-01/1/0/0/Economy/INR"
        );
    }

    #[tokio::test]
    async fn test_client_without_key_reports_unavailable() {
        let client = FlightApiClient::new(FlightApiConfig::default()).unwrap();
        let query = FlightQuery {
            origin_code: "DEL".to_string(),
            destination_code: "GOI".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            adults: 1,
            children: 0,
            infants: 0,
            cabin_class: "Economy".to_string(),
            currency: "INR".to_string(),
        };
        let err = client.search(&query).await.unwrap_err();
        assert!(matches!(err, FlightError::ProviderUnavailable(_)));
    }

    #[test]
    fn test_seeded_generator_is_deterministic() {
        let query = FlightQuery {
            origin_code: "BLR".to_string(),
            destination_code: "HYD".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            adults: 1,
            children: 0,
            infants: 0,
            cabin_class: "Economy".to_string(),
            currency: "INR".to_string(),
        };
        let first = FallbackGenerator::seeded(42).generate(&query);
        let second = FallbackGenerator::seeded(42).generate(&query);
        assert_eq!(first, second);

        for offer in &first {
            let amount = offer.price.amount.unwrap() as u32;
            assert!(FALLBACK_PRICE_RANGE.contains(&amount));
        }
    }

    #[test]
    fn test_airline_initials() {
        assert_eq!(airline_initials("Air India"), "AI");
        assert_eq!(airline_initials("Air India Express"), "AIE");
        assert_eq!(airline_initials("IndiGo"), "IN");
        assert_eq!(airline_initials("SpiceJet"), "SP");
    }

    #[test]
    fn test_cabin_class_canonicalization() {
        assert_eq!(canonical_cabin_class(None), "Economy");
        assert_eq!(canonical_cabin_class(Some("")), "Economy");
        assert_eq!(canonical_cabin_class(Some("first")), "First");
        assert_eq!(canonical_cabin_class(Some("PREMIUM_ECONOMY")), "Premium_economy");
    }

    #[test]
    fn test_passenger_counts_accept_strings_and_numbers() {
        let parsed = params(json!({ "adults": 3, "children": "1", "infants": "" }));
        assert_eq!(parsed.adults, Some(3));
        assert_eq!(parsed.children, Some(1));
        assert_eq!(parsed.infants, None);
        assert!(serde_json::from_value::<FlightParams>(json!({ "adults": "two" })).is_err());
    }
}
