// Trip planning orchestrator
// Drives the tool-calling conversation with the inference service

use crate::airports::{Coordinates, Place};
use crate::config::PlannerConfig;
use crate::flights::{FlightOffer, FlightProvider, FlightProviderStatsReport};
use crate::hotels::{HotelOffer, HotelProvider};
use crate::llm::{
    AssistantReply, InferenceError, InferenceRequest, InferenceService, ToolCallRequest, Transcript,
};
use crate::tools::{ToolCall, ToolDefaults, TOOL_DECLARATIONS};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const PLAN_FAILURE_MESSAGE: &str = "Failed to generate trip plan";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetLimit {
    MaxTurns(usize),
    InferenceTimeout(Duration),
}

impl fmt::Display for BudgetLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetLimit::MaxTurns(turns) => write!(f, "no final answer after {} inference calls", turns),
            BudgetLimit::InferenceTimeout(timeout) => {
                write!(f, "inference call exceeded {}ms", timeout.as_millis())
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Inference service failure: {0}")]
    InferenceServiceFailure(#[from] InferenceError),

    #[error("Conversation budget exceeded: {0}")]
    ConversationBudgetExceeded(BudgetLimit),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRequest {
    #[serde(default)]
    pub origin: Option<Place>,
    // Older clients send the departure city here
    #[serde(default)]
    pub source: Option<String>,
    pub destination: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub number_of_days: Option<u32>,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub vacation_type: Option<String>,
    #[serde(default)]
    pub transport_mode: Option<String>,
    #[serde(default)]
    pub preferences: Option<String>,
    #[serde(default)]
    pub requirements: Option<String>,
}

impl TripRequest {
    // The picker's origin wins over the legacy field; nameless places count as absent
    pub fn origin_place(&self) -> Option<Place> {
        self.origin
            .clone()
            .filter(|place| place.name().is_some())
            .or_else(|| {
                self.source
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(Place::from)
            })
    }

    pub fn destination_name(&self) -> Option<&str> {
        Some(self.destination.trim()).filter(|d| !d.is_empty())
    }

    pub fn wants_flights(&self) -> bool {
        self.origin_place().is_some() && self.destination_name().is_some()
    }
}

fn or_unspecified(value: Option<&str>, fallback: &'static str) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

// Seed user turn describing the trip.
// Flights are only asked for when both ends of the journey are known; otherwise local transport.
pub fn render_trip_prompt(request: &TripRequest) -> String {
    let destination = request.destination_name().unwrap_or("the destination");
    let origin = request.origin_place();
    let origin_name = origin.as_ref().and_then(Place::name);

    let length = match request.number_of_days {
        Some(days) if days > 0 => format!("a {}-day trip", days),
        _ => "a trip".to_string(),
    };
    let route = match origin_name {
        Some(origin) => format!("from {} to {}", origin, destination),
        None => format!("to {}", destination),
    };

    let mut prompt = format!("Please create a travel plan for {} {}.\n\n", length, route);
    prompt.push_str("Trip Details:\n");
    prompt.push_str(&format!(
        "- Budget: {}\n",
        or_unspecified(request.budget.as_deref(), "Not specified")
    ));
    prompt.push_str(&format!(
        "- Vacation Type: {}\n",
        or_unspecified(request.vacation_type.as_deref(), "Not specified")
    ));
    prompt.push_str(&format!(
        "- Transport Mode: {}\n",
        or_unspecified(request.transport_mode.as_deref(), "Not specified")
    ));
    prompt.push_str(&format!(
        "- Dates: {} to {}\n\n",
        or_unspecified(request.start_date.as_deref(), "flexible"),
        or_unspecified(request.end_date.as_deref(), "flexible")
    ));

    match (origin_name, request.wants_flights()) {
        (Some(origin), true) => prompt.push_str(&format!(
            "Use the fetch_flights tool to find flights from {} to {} and the fetch_hotels tool \
             for accommodation in {}. Recommend specific options from the results.\n\n",
            origin, destination, destination
        )),
        _ => prompt.push_str(&format!(
            "No departure city was given, so do not search for flights. Use the fetch_hotels tool \
             for accommodation in {} and describe local transport options (trains, buses, taxis, \
             car rental) for getting there and around.\n\n",
            destination
        )),
    }

    prompt.push_str("Additional Preferences:\n");
    prompt.push_str(&format!(
        "- Preferred activities: {}\n",
        or_unspecified(request.preferences.as_deref(), "Not specified")
    ));
    prompt.push_str(&format!(
        "- Special requirements: {}",
        or_unspecified(request.requirements.as_deref(), "None")
    ));
    prompt
}

// What the caller already knows, laid beneath the model's tool arguments
pub fn tool_defaults(request: &TripRequest) -> ToolDefaults {
    fn set(map: &mut Map<String, Value>, key: &str, value: Option<&str>) {
        if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
            map.insert(key.to_string(), json!(v));
        }
    }

    let mut defaults = ToolDefaults::default();

    set(&mut defaults.flights, "destination", request.destination_name());
    set(&mut defaults.flights, "departureDate", request.start_date.as_deref());
    if let Some(origin) = request.origin_place() {
        defaults.flights.insert("origin".to_string(), json!(origin));
    }

    set(&mut defaults.hotels, "location", request.destination_name());
    set(&mut defaults.hotels, "checkIn", request.start_date.as_deref());
    set(&mut defaults.hotels, "checkOut", request.end_date.as_deref());
    set(&mut defaults.hotels, "budget", request.budget.as_deref());
    set(&mut defaults.hotels, "preferences", request.preferences.as_deref());

    defaults
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlanStats {
    pub inference_calls: usize,
    pub tool_dispatches: usize,
    pub rejected_tool_calls: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct TripPlan {
    pub plan: String,
    // Offers from the last call of each tool, not accumulated
    pub flights: Vec<FlightOffer>,
    pub hotels: Vec<HotelOffer>,
    pub stats: PlanStats,
}

// Caller-facing response body; the `success` flag follows the variant
#[derive(Debug, Clone)]
pub enum PlanResponse {
    Success(TripPlan),
    Failure { error: String },
}

impl PlanResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, PlanResponse::Success(_))
    }
}

impl Serialize for PlanResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PlanResponse::Success(trip) => {
                let mut body = serializer.serialize_struct("PlanResponse", 4)?;
                body.serialize_field("success", &true)?;
                body.serialize_field("plan", &trip.plan)?;
                body.serialize_field("flights", &trip.flights)?;
                body.serialize_field("hotels", &trip.hotels)?;
                body.end()
            }
            PlanResponse::Failure { error } => {
                let mut body = serializer.serialize_struct("PlanResponse", 2)?;
                body.serialize_field("success", &false)?;
                body.serialize_field("error", error)?;
                body.end()
            }
        }
    }
}

impl PlanResponse {
    // Failures are logged here and reduced to a generic message, with no partial itinerary
    pub fn from_outcome(outcome: Result<TripPlan, PlanError>) -> Self {
        match outcome {
            Ok(plan) => PlanResponse::Success(plan),
            Err(e) => {
                error!(error = %e, "trip plan generation failed");
                PlanResponse::Failure {
                    error: PLAN_FAILURE_MESSAGE.to_string(),
                }
            }
        }
    }
}

// Per-run state; dropped when the run returns
#[derive(Default)]
struct RunState {
    flights: Vec<FlightOffer>,
    hotels: Vec<HotelOffer>,
    stats: PlanStats,
}

pub struct TripPlanner {
    inference: Arc<dyn InferenceService>,
    flights: FlightProvider,
    hotels: HotelProvider,
    config: PlannerConfig,
}

impl TripPlanner {
    pub fn new(
        inference: Arc<dyn InferenceService>,
        flights: FlightProvider,
        hotels: HotelProvider,
        config: PlannerConfig,
    ) -> Self {
        Self {
            inference,
            flights,
            hotels,
            config,
        }
    }

    pub fn flight_stats(&self) -> FlightProviderStatsReport {
        self.flights.stats()
    }

    pub async fn generate_plan(&self, request: &TripRequest) -> Result<TripPlan, PlanError> {
        let started = Instant::now();
        let mut transcript = Transcript::seeded(&self.config.system_prompt, render_trip_prompt(request));
        let defaults = tool_defaults(request);
        let timeout = self.config.inference_timeout();
        let mut state = RunState::default();

        info!(
            destination = %request.destination,
            wants_flights = request.wants_flights(),
            max_turns = self.config.max_turns,
            "starting trip plan"
        );

        for turn in 0..self.config.max_turns {
            let inference_request = InferenceRequest {
                model: &self.config.model,
                temperature: self.config.temperature,
                transcript: &transcript,
                tools: TOOL_DECLARATIONS.as_slice(),
            };
            state.stats.inference_calls += 1;

            let reply = match tokio::time::timeout(timeout, self.inference.submit(inference_request)).await {
                Ok(reply) => reply?,
                Err(_) => {
                    warn!(turn, timeout_ms = timeout.as_millis() as u64, "inference call timed out");
                    return Err(PlanError::ConversationBudgetExceeded(
                        BudgetLimit::InferenceTimeout(timeout),
                    ));
                }
            };

            match reply {
                AssistantReply::Content(plan) => {
                    state.stats.elapsed_ms = started.elapsed().as_millis() as u64;
                    info!(
                        inference_calls = state.stats.inference_calls,
                        tool_dispatches = state.stats.tool_dispatches,
                        tool_results = transcript.tool_results(),
                        flights = state.flights.len(),
                        hotels = state.hotels.len(),
                        elapsed_ms = state.stats.elapsed_ms,
                        "trip plan generated"
                    );
                    return Ok(TripPlan {
                        plan,
                        flights: state.flights,
                        hotels: state.hotels,
                        stats: state.stats,
                    });
                }
                AssistantReply::ToolCall { content, call } => {
                    debug!(turn, tool = %call.name, "model requested a tool");
                    let payload = self.dispatch(&call, &defaults, &mut state).await;
                    debug!(tool = %call.name, payload_bytes = payload.len(), "tool result recorded");
                    transcript.record_tool_exchange(content, call, payload);
                }
            }
        }

        warn!(max_turns = self.config.max_turns, "conversation ended without a final plan");
        Err(PlanError::ConversationBudgetExceeded(BudgetLimit::MaxTurns(
            self.config.max_turns,
        )))
    }

    // Always yields a payload; provider trouble is reported to the model, never raised
    async fn dispatch(
        &self,
        call: &ToolCallRequest,
        defaults: &ToolDefaults,
        state: &mut RunState,
    ) -> String {
        match ToolCall::parse(call, defaults) {
            ToolCall::FetchFlights(params) => {
                state.stats.tool_dispatches += 1;
                match self.flights.fetch_flights(&params).await {
                    Ok(result) => {
                        state.flights = result.offers.clone();
                        to_payload(&result)
                    }
                    Err(e) => {
                        warn!(error = %e, "flight tool call rejected");
                        state.stats.rejected_tool_calls += 1;
                        error_payload(&e.to_string())
                    }
                }
            }
            ToolCall::FetchHotels(params) => {
                state.stats.tool_dispatches += 1;
                let result = self.hotels.fetch_hotels(&params);
                state.hotels = result.offers.clone();
                to_payload(&result)
            }
            ToolCall::Invalid { name, reason } => {
                warn!(tool = %name, reason = %reason, "tool arguments did not fit the tool");
                state.stats.rejected_tool_calls += 1;
                error_payload(&format!("Invalid arguments for {}: {}", name, reason))
            }
            ToolCall::Unrecognized { name } => {
                warn!(tool = %name, "model requested an unknown tool");
                state.stats.rejected_tool_calls += 1;
                error_payload(&format!("Unknown tool: {}", name))
            }
        }
    }
}

fn to_payload<T: Serialize>(result: &T) -> String {
    serde_json::to_string(result).unwrap_or_else(|e| error_payload(&e.to_string()))
}

fn error_payload(message: &str) -> String {
    json!({ "success": false, "error": message }).to_string()
}
