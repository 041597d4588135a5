use serde::{Deserialize, Serialize};

// Data structures for the flight-search supplier response.
// Itineraries reference legs, legs reference segments, segments reference carriers.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SupplierResponse {
    pub itineraries: Vec<SupplierItinerary>,
    pub legs: Vec<SupplierLeg>,
    pub segments: Vec<SupplierSegment>,
    pub carriers: Vec<SupplierCarrier>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SupplierItinerary {
    pub id: String,
    pub leg_ids: Vec<String>,
    pub pricing_options: Vec<SupplierPricingOption>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SupplierPricingOption {
    pub price: Option<SupplierPrice>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SupplierPrice {
    pub amount: Option<f64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SupplierLeg {
    pub id: String,
    pub segment_ids: Vec<String>,
    pub departure: Option<String>,
    pub arrival: Option<String>,
    // Minutes
    pub duration: Option<u32>,
    pub stop_count: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SupplierSegment {
    pub id: String,
    pub marketing_carrier_id: Option<i64>,
    pub marketing_flight_number: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SupplierCarrier {
    pub id: i64,
    pub name: Option<String>,
}

impl SupplierResponse {
    pub fn leg(&self, id: &str) -> Option<&SupplierLeg> {
        self.legs.iter().find(|leg| leg.id == id)
    }

    pub fn segment(&self, id: &str) -> Option<&SupplierSegment> {
        self.segments.iter().find(|segment| segment.id == id)
    }

    pub fn carrier_name(&self, id: i64) -> Option<&str> {
        self.carriers
            .iter()
            .find(|carrier| carrier.id == id)
            .and_then(|carrier| carrier.name.as_deref())
    }
}
