use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::model::{Coord, ForecastInterval, ForecastResult, LocationQuery, Sun, TimeWindow, WeatherSnapshot};

use super::{ProviderError, WeatherProvider};

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Hours covered by one forecast entry of the free 3-hourly feed.
const INTERVAL_HOURS: i64 = 3;

/// Entries per forecast day (24h / 3h slices).
const ENTRIES_PER_DAY: u32 = 8;

/// The free feed covers at most five days.
const MAX_FORECAST_DAYS: u32 = 5;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_owned())
    }

    /// Point the client at a different endpoint, e.g. a mock server in tests.
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            http: Client::new(),
        }
    }

    /// Location selector params for the upstream API: `q=<city>` or
    /// `lat`/`lon` split out of a `"lat,lon"` string.
    fn location_params(location: &LocationQuery) -> Result<Vec<(String, String)>, ProviderError> {
        match location {
            LocationQuery::City(city) => Ok(vec![("q".to_owned(), city.clone())]),
            LocationQuery::Coordinates(raw) => {
                let (lat, lon) = parse_coordinates(raw)?;
                Ok(vec![
                    ("lat".to_owned(), lat.to_string()),
                    ("lon".to_owned(), lon.to_string()),
                ])
            }
        }
    }

    async fn get(
        &self,
        endpoint: &str,
        location: &LocationQuery,
        lang: &str,
        units: &str,
        extra: &[(String, String)],
    ) -> Result<String, ProviderError> {
        let url = format!("{}/{endpoint}", self.base_url);

        let mut params = Self::location_params(location)?;
        params.push(("lang".to_owned(), lang.to_owned()));
        params.push(("units".to_owned(), units.to_owned()));
        params.push(("appid".to_owned(), self.api_key.clone()));
        params.extend_from_slice(extra);

        debug!(endpoint, location = %location, lang, units, "requesting OpenWeatherMap");

        let res = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }

        Ok(body)
    }

    async fn fetch_current(
        &self,
        location: &LocationQuery,
        lang: &str,
        units: &str,
    ) -> Result<WeatherSnapshot, ProviderError> {
        let body = self.get("weather", location, lang, units, &[]).await?;

        let parsed: OwCurrentResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))?;

        let mut fields = metric_fields(&parsed.main, &parsed.weather, &parsed.wind, &parsed.clouds);
        fields.insert(
            "city".to_owned(),
            json!({"name": parsed.name, "country": parsed.sys.country}),
        );

        Ok(WeatherSnapshot {
            fields,
            sun: Some(Sun {
                rise: unix_to_utc(parsed.sys.sunrise)?,
                set: unix_to_utc(parsed.sys.sunset)?,
            }),
            last_update: Some(unix_to_utc(parsed.dt)?),
        })
    }

    async fn fetch_forecast(
        &self,
        location: &LocationQuery,
        lang: &str,
        units: &str,
        days: u32,
    ) -> Result<ForecastResult, ProviderError> {
        let days = days.clamp(1, MAX_FORECAST_DAYS);
        let cnt = [("cnt".to_owned(), (days * ENTRIES_PER_DAY).to_string())];

        let body = self.get("forecast", location, lang, units, &cnt).await?;

        let parsed: OwForecastResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))?;

        let first = parsed.list.first().ok_or_else(|| {
            ProviderError::Decode("forecast response contained no data".to_owned())
        })?;

        let sun = Sun {
            rise: unix_to_utc(parsed.city.sunrise)?,
            set: unix_to_utc(parsed.city.sunset)?,
        };

        let mut meta_fields = Map::new();
        meta_fields.insert(
            "city".to_owned(),
            json!({"name": parsed.city.name, "country": parsed.city.country}),
        );

        let meta = WeatherSnapshot {
            fields: meta_fields,
            sun: Some(sun),
            // The feed carries no document timestamp; its freshest data
            // point is the first interval.
            last_update: Some(unix_to_utc(first.dt)?),
        };

        let mut intervals = Vec::with_capacity(parsed.list.len());
        for entry in &parsed.list {
            let from = unix_to_utc(entry.dt)?;
            let day = from
                .date_naive()
                .and_time(NaiveTime::MIN)
                .and_utc();

            intervals.push(ForecastInterval {
                time: TimeWindow {
                    from,
                    to: from + chrono::Duration::hours(INTERVAL_HOURS),
                    day,
                },
                snapshot: WeatherSnapshot {
                    fields: metric_fields(&entry.main, &entry.weather, &entry.wind, &entry.clouds),
                    sun: Some(sun),
                    last_update: Some(from),
                },
            });
        }

        Ok(ForecastResult {
            meta,
            position: Some(Coord {
                lat: parsed.city.coord.lat,
                lon: parsed.city.coord.lon,
            }),
            intervals,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current_weather(
        &self,
        location: &LocationQuery,
        lang: &str,
        units: &str,
    ) -> Result<WeatherSnapshot, ProviderError> {
        self.fetch_current(location, lang, units).await
    }

    async fn forecast(
        &self,
        location: &LocationQuery,
        lang: &str,
        units: &str,
        days: u32,
    ) -> Result<ForecastResult, ProviderError> {
        self.fetch_forecast(location, lang, units, days).await
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
    pressure: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: f64,
}

#[derive(Debug, Deserialize, Default)]
struct OwClouds {
    #[serde(default)]
    all: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    sunrise: i64,
    sunset: i64,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    #[serde(default)]
    clouds: OwClouds,
    sys: OwSys,
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    country: String,
    coord: OwCoord,
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    #[serde(default)]
    clouds: OwClouds,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

/// Error body shape of the upstream API; `cod` arrives as a string on
/// some endpoints and a number on others.
#[derive(Debug, Deserialize)]
struct OwErrorBody {
    cod: Value,
    message: Option<String>,
}

fn metric_fields(
    main: &OwMain,
    weather: &[OwWeather],
    wind: &OwWind,
    clouds: &OwClouds,
) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(
        "temperature".to_owned(),
        json!({"value": main.temp, "min": main.temp_min, "max": main.temp_max}),
    );
    fields.insert("humidity".to_owned(), json!(main.humidity));
    fields.insert("pressure".to_owned(), json!(main.pressure));
    if let Some(w) = weather.first() {
        fields.insert(
            "weather".to_owned(),
            json!({"description": w.description, "icon": w.icon}),
        );
    }
    fields.insert(
        "wind".to_owned(),
        json!({"speed": wind.speed, "direction": wind.deg}),
    );
    fields.insert("clouds".to_owned(), json!(clouds.all));
    fields
}

fn api_error(http_status: u16, body: &str) -> ProviderError {
    let fallback_message = || format!("OpenWeatherMap request failed: {}", truncate_body(body));

    match serde_json::from_str::<OwErrorBody>(body) {
        Ok(err) => ProviderError::Api {
            code: error_code(&err.cod).unwrap_or(http_status),
            message: err.message.unwrap_or_else(fallback_message),
        },
        Err(_) => ProviderError::Api {
            code: http_status,
            message: fallback_message(),
        },
    }
}

fn error_code(cod: &Value) -> Option<u16> {
    match cod {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        _ => None,
    }
}

fn parse_coordinates(raw: &str) -> Result<(f64, f64), ProviderError> {
    let invalid = || ProviderError::InvalidCoordinates(raw.to_owned());

    let (lat, lon) = raw.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lon: f64 = lon.trim().parse().map_err(|_| invalid())?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(invalid());
    }

    Ok((lat, lon))
}

fn unix_to_utc(ts: i64) -> Result<DateTime<Utc>, ProviderError> {
    DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| ProviderError::Decode(format!("timestamp {ts} out of range")))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        format!("{}...", &body[..MAX])
    } else {
        body.to_string()
    }
}
