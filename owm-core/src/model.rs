use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sunrise and sunset instants for a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sun {
    pub rise: DateTime<Utc>,
    pub set: DateTime<Utc>,
}

/// A bundle of weather metrics at a point in time.
///
/// The metric fields are an open mapping so downstream consumers receive
/// whatever the upstream API reported, untouched. `sun` and `last_update`
/// are modeled separately because normalization expands them; a snapshot
/// reaching the transform without them is a provider contract violation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Provider-defined metric fields (temperature, humidity, wind, ...).
    pub fields: Map<String, Value>,
    pub sun: Option<Sun>,
    pub last_update: Option<DateTime<Utc>>,
}

/// The time window covered by a single forecast interval.
///
/// `day` is the calendar day containing `from`/`to`, truncated to midnight
/// by the provider. The transform localizes it but never recomputes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub day: DateTime<Utc>,
}

/// A single 3-hour forecast data point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastInterval {
    pub time: TimeWindow,
    pub snapshot: WeatherSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

/// A full forecast response: location summary plus the ordered interval
/// sequence (ascending by time, no duplicate windows).
///
/// Everything is public so the transform can split metadata from intervals
/// without poking at opaque provider types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResult {
    /// Summary fields (city, sun times, last update) — everything except
    /// the intervals and the position.
    pub meta: WeatherSnapshot,
    pub position: Option<Coord>,
    pub intervals: Vec<ForecastInterval>,
}

/// Location requested by the caller, either a city name or raw
/// `"lat,lon"` coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationQuery {
    City(String),
    Coordinates(String),
}

impl LocationQuery {
    /// Build a query from the optional `city`/`coord` request parameters.
    /// City wins when both are present; `None` means neither was supplied.
    pub fn from_params(city: Option<&str>, coord: Option<&str>) -> Option<Self> {
        match (city, coord) {
            (Some(c), _) if !c.is_empty() => Some(Self::City(c.to_owned())),
            (_, Some(c)) if !c.is_empty() => Some(Self::Coordinates(c.to_owned())),
            _ => None,
        }
    }
}

impl std::fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::City(c) | Self::Coordinates(c) => f.write_str(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_takes_precedence_over_coordinates() {
        let q = LocationQuery::from_params(Some("Valencia"), Some("39.47,-0.38"));
        assert_eq!(q, Some(LocationQuery::City("Valencia".into())));
    }

    #[test]
    fn coordinates_used_when_city_absent() {
        let q = LocationQuery::from_params(None, Some("39.47,-0.38"));
        assert_eq!(q, Some(LocationQuery::Coordinates("39.47,-0.38".into())));
    }

    #[test]
    fn empty_params_yield_no_query() {
        assert_eq!(LocationQuery::from_params(None, None), None);
        assert_eq!(LocationQuery::from_params(Some(""), Some("")), None);
    }
}
