// Tools exposed to the model and the typed dispatch of its requests

use crate::flights::FlightParams;
use crate::hotels::HotelParams;
use crate::llm::{ToolCallRequest, ToolDeclaration};
use serde_json::{json, Map, Value};
use std::sync::LazyLock;
use tracing::warn;

pub const FETCH_FLIGHTS: &str = "fetch_flights";
pub const FETCH_HOTELS: &str = "fetch_hotels";

pub static TOOL_DECLARATIONS: LazyLock<Vec<ToolDeclaration>> = LazyLock::new(|| {
    vec![
        ToolDeclaration {
            name: FETCH_FLIGHTS,
            description: "Fetch available flights between two cities on a given date.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "origin": { "type": "string", "description": "Departure city name or airport code" },
                    "destination": { "type": "string", "description": "Arrival city name or airport code" },
                    "departureDate": { "type": "string", "description": "Departure date (YYYY-MM-DD)" },
                    "adults": { "type": "integer", "description": "Number of adult passengers" },
                    "children": { "type": "integer", "description": "Number of child passengers" },
                    "infants": { "type": "integer", "description": "Number of infant passengers" },
                    "cabinClass": {
                        "type": "string",
                        "enum": ["Economy", "Premium_Economy", "Business", "First"],
                        "description": "Cabin class"
                    }
                },
                "required": ["origin", "destination", "departureDate"]
            }),
        },
        ToolDeclaration {
            name: FETCH_HOTELS,
            description: "Fetch hotels in a city, filtered by the traveller's budget.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "location": { "type": "string", "description": "City to stay in" },
                    "checkIn": { "type": "string", "description": "Check-in date (YYYY-MM-DD)" },
                    "checkOut": { "type": "string", "description": "Check-out date (YYYY-MM-DD)" },
                    "budget": { "type": "string", "description": "Budget range, e.g. \"₹25,000 - ₹50,000\"" },
                    "preferences": { "type": "string", "description": "Free-text accommodation preferences" }
                },
                "required": ["location", "checkIn", "checkOut"]
            }),
        },
    ]
});

// Arguments the caller already knows, per tool, merged beneath whatever the model supplies
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolDefaults {
    pub flights: Map<String, Value>,
    pub hotels: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    FetchFlights(FlightParams),
    FetchHotels(HotelParams),
    // Known tool whose arguments don't fit its parameter shape
    Invalid { name: String, reason: String },
    Unrecognized { name: String },
}

impl ToolCall {
    pub fn parse(request: &ToolCallRequest, defaults: &ToolDefaults) -> Self {
        match request.name.as_str() {
            FETCH_FLIGHTS => {
                let args = merge_arguments(&defaults.flights, parse_arguments(&request.arguments));
                match serde_json::from_value(args) {
                    Ok(params) => ToolCall::FetchFlights(params),
                    Err(e) => ToolCall::Invalid {
                        name: request.name.clone(),
                        reason: e.to_string(),
                    },
                }
            }
            FETCH_HOTELS => {
                let args = merge_arguments(&defaults.hotels, parse_arguments(&request.arguments));
                match serde_json::from_value(args) {
                    Ok(params) => ToolCall::FetchHotels(params),
                    Err(e) => ToolCall::Invalid {
                        name: request.name.clone(),
                        reason: e.to_string(),
                    },
                }
            }
            other => ToolCall::Unrecognized {
                name: other.to_string(),
            },
        }
    }
}

// Malformed or non-object argument text counts as no arguments at all
pub fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => value,
        Ok(other) => {
            warn!(arguments = %other, "tool arguments are not an object, ignoring them");
            Value::Object(Map::new())
        }
        Err(e) => {
            warn!(error = %e, "malformed tool arguments, ignoring them");
            Value::Object(Map::new())
        }
    }
}

// Lays the model's arguments over the caller's defaults.
// A null or blank model value counts as omitted, so a known default is never erased.
pub fn merge_arguments(defaults: &Map<String, Value>, model_args: Value) -> Value {
    let mut merged = defaults.clone();
    if let Value::Object(args) = model_args {
        for (key, value) in args {
            if is_omitted(&value) {
                continue;
            }
            merged.insert(key, value);
        }
    }
    Value::Object(merged)
}

fn is_omitted(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
