// Location resolver: turns free-form place names into 3-letter airport codes

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

// Code used when no usable place name is given
pub const DEFAULT_AIRPORT_CODE: &str = "DEL";

// Lowercase city name (including common alternate spellings) -> IATA code
pub const AIRPORT_ALIASES: &[(&str, &str)] = &[
    // Metro airports
    ("delhi", "DEL"),
    ("new delhi", "DEL"),
    ("mumbai", "BOM"),
    ("bangalore", "BLR"),
    ("chennai", "MAA"),
    ("kolkata", "CCU"),
    ("hyderabad", "HYD"),
    ("ahmedabad", "AMD"),
    ("pune", "PNQ"),
    // Tourist destinations
    ("goa", "GOI"),
    ("jaipur", "JAI"),
    ("kochi", "COK"),
    ("thiruvananthapuram", "TRV"),
    ("udaipur", "UDR"),
    ("varanasi", "VNS"),
    ("amritsar", "ATQ"),
    ("srinagar", "SXR"),
    ("port blair", "IXZ"),
    ("leh", "IXL"),
    ("shimla", "SLV"),
    // Regional capitals
    ("lucknow", "LKO"),
    ("patna", "PAT"),
    ("bhubaneswar", "BBI"),
    ("guwahati", "GAU"),
    ("imphal", "IMF"),
    ("raipur", "RPR"),
    ("nagpur", "NAG"),
    ("indore", "IDR"),
    ("bhopal", "BHO"),
    ("chandigarh", "IXC"),
    // Other cities
    ("coimbatore", "CJB"),
    ("mangalore", "IXE"),
    ("madurai", "IXM"),
    ("visakhapatnam", "VTZ"),
    ("agartala", "IXA"),
    ("dehradun", "DED"),
    ("surat", "STV"),
    ("vadodara", "BDQ"),
    ("ranchi", "IXR"),
    ("bagdogra", "IXB"),
    ("tirupati", "TIR"),
    ("shirdi", "SAG"),
    ("khajuraho", "HJR"),
    ("aurangabad", "IXU"),
    ("jodhpur", "JDH"),
    ("jammu", "IXJ"),
    ("dharamshala", "DHM"),
    ("rishikesh", "DED"),
    ("prayagraj", "IXD"),
    ("gaya", "GAY"),
    ("kannur", "CNN"),
    ("vijayawada", "VGA"),
    ("trichy", "TRZ"),
    ("dibrugarh", "DIB"),
    ("silchar", "IXS"),
    ("jorhat", "JRH"),
    ("jabalpur", "JLR"),
    ("rajkot", "RAJ"),
    ("dimapur", "DMU"),
    ("hubli", "HBX"),
    // Alternate names
    ("bengaluru", "BLR"),
    ("bombay", "BOM"),
    ("calcutta", "CCU"),
    ("madras", "MAA"),
    ("trivandrum", "TRV"),
    ("cochin", "COK"),
    ("benares", "VNS"),
    ("allahabad", "IXD"),
    ("panaji", "GOI"),
    ("dabolim", "GOI"),
];

static ALIAS_TABLE: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| AIRPORT_ALIASES.iter().copied().collect());

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(deserialize_with = "lenient_f64")]
    pub lat: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub lon: f64,
}

// Location pickers send coordinates as strings, the catalog stores numbers
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// A place as callers and the model hand it over: a bare name, a picker object
// carrying a `name`, or anything else (which resolves to the default)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Place {
    Name(String),
    Named {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        coordinates: Option<Coordinates>,
    },
    Other(serde_json::Value),
}

impl Place {
    pub fn name(&self) -> Option<&str> {
        match self {
            Place::Name(name) | Place::Named { name, .. } => {
                Some(name.as_str()).filter(|n| !n.trim().is_empty())
            }
            Place::Other(_) => None,
        }
    }
}

impl From<&str> for Place {
    fn from(name: &str) -> Self {
        Place::Name(name.to_string())
    }
}

// Cuts the country qualifier and anything else after the first comma
pub fn clean_place_name(name: &str) -> &str {
    name.split(',').next().unwrap_or_default().trim()
}

// Catalog/alias lookup key: cleaned and lowercased
pub fn normalize_place_name(name: &str) -> String {
    clean_place_name(name).to_lowercase()
}

pub fn resolve_airport_code(place: Option<&Place>) -> String {
    let Some(name) = place.and_then(Place::name) else {
        return DEFAULT_AIRPORT_CODE.to_string();
    };

    let cleaned = clean_place_name(name);
    if cleaned.is_empty() {
        return DEFAULT_AIRPORT_CODE.to_string();
    }

    match ALIAS_TABLE.get(cleaned.to_lowercase().as_str()) {
        Some(code) => (*code).to_string(),
        // Unknown cities echo a best-effort code
        None => cleaned.to_uppercase(),
    }
}
