// Trip planner library: location resolution, flight and hotel offers,
// and the tool-calling conversation that turns them into an itinerary

pub mod airports;
pub mod config;
pub mod flights;
pub mod hotels;
pub mod llm;
pub mod planner;
pub mod supplier;
pub mod tools;

// Re-export key types for convenience
pub use airports::{resolve_airport_code, Coordinates, Place};
pub use config::{AppConfig, ConfigError, FlightApiConfig, InferenceConfig, PlannerConfig, RetryConfig};
pub use flights::{
    FallbackGenerator, FlightApiClient, FlightError, FlightOffer, FlightParams, FlightProvider,
    FlightResult, FlightSearchApi, FlightSource,
};
pub use hotels::{
    parse_budget_ceiling, HotelCatalog, HotelError, HotelOffer, HotelParams, HotelProvider,
    HotelResult,
};
pub use llm::{InferenceError, InferenceService, OpenAiChatService, Transcript};
pub use planner::{BudgetLimit, PlanError, PlanResponse, TripPlan, TripPlanner, TripRequest};
pub use tools::{ToolCall, TOOL_DECLARATIONS};
