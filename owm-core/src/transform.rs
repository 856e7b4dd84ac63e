//! Reshapes provider records into the timezone-adjusted JSON structures
//! served by the API.
//!
//! The grouping keeps the original service's behavior bit for bit: the
//! first interval of every calendar day never appears in the `days`
//! output, because an interval is only bucketed when it shares its
//! localized day with the interval immediately before it.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::model::{ForecastResult, WeatherSnapshot};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("unknown timezone identifier `{0}`")]
    UnknownTimezone(String),

    /// The provider delivered a snapshot without a field the contract
    /// guarantees. Not recoverable at this layer.
    #[error("snapshot is missing required field `{0}`")]
    MissingField(&'static str),
}

/// An instant rendered for the configured zone: wall-clock string plus
/// the zone-invariant epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalizedTime {
    pub date: String,
    pub timestamp: i64,
}

/// Timezone-aware timestamp formatter.
///
/// Construction validates the zone identifier once; `localize` itself is a
/// pure function called for every snapshot and interval in a forecast.
#[derive(Debug, Clone, Copy)]
pub struct Localizer {
    tz: Tz,
}

impl Localizer {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn from_name(name: &str) -> Result<Self, TransformError> {
        let tz = name
            .parse::<Tz>()
            .map_err(|_| TransformError::UnknownTimezone(name.to_owned()))?;
        Ok(Self { tz })
    }

    pub fn localize(&self, instant: DateTime<Utc>) -> LocalizedTime {
        let local = instant.with_timezone(&self.tz);
        LocalizedTime {
            date: local.format("%Y-%m-%d %H:%M:%S").to_string(),
            timestamp: instant.timestamp(),
        }
    }

    /// Hour of the instant on the local wall clock (0-23).
    fn local_hour(&self, instant: DateTime<Utc>) -> u32 {
        instant.with_timezone(&self.tz).hour()
    }

    /// ISO-8601 weekday number of the instant's local date,
    /// 1 (Monday) through 7 (Sunday).
    fn local_weekday(&self, instant: DateTime<Utc>) -> u32 {
        instant.with_timezone(&self.tz).weekday().number_from_monday()
    }
}

/// Snapshot metric fields merged with the expanded `sun`/`lastUpdate`
/// sub-objects.
pub type NormalizedSnapshot = Map<String, Value>;

/// Forecast summary fields plus the day/slot index:
/// ISO weekday (1-7) -> `"HH-HH"` slot -> interval snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedForecast {
    #[serde(flatten)]
    pub summary: NormalizedSnapshot,
    pub days: BTreeMap<u32, BTreeMap<String, Value>>,
}

/// Converts raw provider records into normalized, day/slot-indexed output.
#[derive(Debug, Clone, Copy)]
pub struct ForecastTransformer {
    localizer: Localizer,
}

impl ForecastTransformer {
    pub fn new(localizer: Localizer) -> Self {
        Self { localizer }
    }

    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }

    /// Normalize a snapshot: copy every metric field unchanged, then
    /// overwrite/add `sun` and `lastUpdate` with their localized
    /// `{date, timestamp}` expansions.
    pub fn normalize_snapshot(
        &self,
        snapshot: &WeatherSnapshot,
    ) -> Result<NormalizedSnapshot, TransformError> {
        let sun = snapshot
            .sun
            .as_ref()
            .ok_or(TransformError::MissingField("sun"))?;
        let last_update = snapshot
            .last_update
            .ok_or(TransformError::MissingField("lastUpdate"))?;

        let mut out = snapshot.fields.clone();
        out.insert(
            "sun".to_owned(),
            json!({
                "rise": self.localizer.localize(sun.rise),
                "set": self.localizer.localize(sun.set),
            }),
        );
        out.insert(
            "lastUpdate".to_owned(),
            json!(self.localizer.localize(last_update)),
        );

        Ok(out)
    }

    /// Normalize a forecast: summary fields via [`Self::normalize_snapshot`],
    /// intervals grouped into `days[weekday]["HH-HH"]`.
    ///
    /// An interval is bucketed only when its localized day equals the
    /// previous interval's, so the first interval of each day is skipped.
    /// Skipped intervals are never normalized, so a malformed snapshot
    /// there goes unnoticed.
    pub fn normalize_forecast(
        &self,
        forecast: &ForecastResult,
    ) -> Result<NormalizedForecast, TransformError> {
        let summary = self.normalize_snapshot(&forecast.meta)?;

        let mut days: BTreeMap<u32, BTreeMap<String, Value>> = BTreeMap::new();
        let mut last_day: Option<String> = None;

        for interval in &forecast.intervals {
            let day = self.localizer.localize(interval.time.day);

            if last_day.as_deref() == Some(day.date.as_str()) {
                let day_key = self.localizer.local_weekday(interval.time.day);

                // The upstream API reports 3-hour slices, keyed here by
                // their local hour range, e.g. "06-09".
                let time_key = format!(
                    "{:02}-{:02}",
                    self.localizer.local_hour(interval.time.from),
                    self.localizer.local_hour(interval.time.to),
                );

                let mut entry = self.normalize_snapshot(&interval.snapshot)?;
                entry.insert(
                    "time".to_owned(),
                    json!({
                        "from": self.localizer.localize(interval.time.from),
                        "to": self.localizer.localize(interval.time.to),
                        "day": day,
                    }),
                );

                days.entry(day_key)
                    .or_default()
                    .insert(time_key, Value::Object(entry));
            }

            last_day = Some(day.date);
        }

        Ok(NormalizedForecast { summary, days })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coord, ForecastInterval, Sun, TimeWindow};
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn snapshot() -> WeatherSnapshot {
        let mut fields = Map::new();
        fields.insert("temperature".into(), json!({"value": 21.4}));
        fields.insert("humidity".into(), json!(40));
        WeatherSnapshot {
            fields,
            sun: Some(Sun {
                rise: utc(2023, 6, 5, 4, 32, 11),
                set: utc(2023, 6, 5, 19, 28, 40),
            }),
            last_update: Some(utc(2023, 6, 5, 9, 0, 0)),
        }
    }

    fn interval(from: DateTime<Utc>, day: DateTime<Utc>) -> ForecastInterval {
        ForecastInterval {
            time: TimeWindow {
                from,
                to: from + chrono::Duration::hours(3),
                day,
            },
            snapshot: snapshot(),
        }
    }

    #[test]
    fn unknown_timezone_is_rejected_at_construction() {
        let err = Localizer::from_name("Mars/Olympus_Mons").unwrap_err();
        assert_eq!(
            err,
            TransformError::UnknownTimezone("Mars/Olympus_Mons".into())
        );
    }

    #[test]
    fn timestamp_is_invariant_across_zones_but_date_is_not() {
        let instant = utc(2023, 6, 1, 12, 0, 0);

        let in_utc = Localizer::from_name("UTC").unwrap().localize(instant);
        let in_madrid = Localizer::from_name("Europe/Madrid").unwrap().localize(instant);

        assert_eq!(in_utc.timestamp, in_madrid.timestamp);
        assert_eq!(in_utc.date, "2023-06-01 12:00:00");
        // CEST, UTC+2
        assert_eq!(in_madrid.date, "2023-06-01 14:00:00");
    }

    #[test]
    fn normalize_preserves_metric_fields_unchanged() {
        let transformer = ForecastTransformer::new(Localizer::from_name("UTC").unwrap());
        let out = transformer.normalize_snapshot(&snapshot()).unwrap();

        assert_eq!(out["temperature"], json!({"value": 21.4}));
        assert_eq!(out["humidity"], json!(40));
        assert_eq!(out["sun"]["rise"]["date"], "2023-06-05 04:32:11");
        assert_eq!(
            out["sun"]["set"]["timestamp"],
            json!(utc(2023, 6, 5, 19, 28, 40).timestamp())
        );
        assert_eq!(out["lastUpdate"]["date"], "2023-06-05 09:00:00");
    }

    #[test]
    fn missing_sun_is_a_contract_violation() {
        let transformer = ForecastTransformer::new(Localizer::from_name("UTC").unwrap());

        let mut snap = snapshot();
        snap.sun = None;
        assert_eq!(
            transformer.normalize_snapshot(&snap).unwrap_err(),
            TransformError::MissingField("sun")
        );

        let mut snap = snapshot();
        snap.last_update = None;
        assert_eq!(
            transformer.normalize_snapshot(&snap).unwrap_err(),
            TransformError::MissingField("lastUpdate")
        );
    }

    #[test]
    fn first_interval_of_each_day_is_dropped() {
        let transformer = ForecastTransformer::new(Localizer::from_name("UTC").unwrap());

        // Monday 2023-06-05 and Tuesday 2023-06-06.
        let d1 = utc(2023, 6, 5, 0, 0, 0);
        let d2 = utc(2023, 6, 6, 0, 0, 0);
        let forecast = ForecastResult {
            meta: snapshot(),
            position: Some(Coord { lat: 39.47, lon: -0.38 }),
            intervals: vec![
                interval(utc(2023, 6, 5, 9, 0, 0), d1),
                interval(utc(2023, 6, 5, 12, 0, 0), d1),
                interval(utc(2023, 6, 6, 0, 0, 0), d2),
            ],
        };

        let out = transformer.normalize_forecast(&forecast).unwrap();

        // Only the second interval of Monday survives: the 09-12 slice is
        // the first of its day and the 00-03 slice is the first of Tuesday.
        assert_eq!(out.days.len(), 1);
        let monday = out.days.get(&1).expect("Monday bucket");
        assert_eq!(monday.len(), 1);
        assert!(monday.contains_key("12-15"));
        assert!(!monday.contains_key("09-12"));

        let entry = &monday["12-15"];
        assert_eq!(entry["time"]["from"]["date"], "2023-06-05 12:00:00");
        assert_eq!(entry["time"]["day"]["date"], "2023-06-05 00:00:00");
        assert_eq!(entry["humidity"], json!(40));

        // Day keys serialize as strings, like the JSON the service always produced.
        let rendered = serde_json::to_value(&out).unwrap();
        assert!(rendered["days"]["1"]["12-15"].is_object());
        assert_eq!(rendered["humidity"], json!(40));
    }

    #[test]
    fn time_keys_are_zero_padded_local_hours() {
        // UTC-4 in June; 09:00Z becomes 05:00 local.
        let transformer =
            ForecastTransformer::new(Localizer::from_name("America/New_York").unwrap());

        let d1 = utc(2023, 6, 5, 0, 0, 0);
        let forecast = ForecastResult {
            meta: snapshot(),
            position: None,
            intervals: vec![
                interval(utc(2023, 6, 5, 9, 0, 0), d1),
                interval(utc(2023, 6, 5, 12, 0, 0), d1),
            ],
        };

        let out = transformer.normalize_forecast(&forecast).unwrap();

        // Monday 00:00Z is Sunday 20:00 local, so the bucket lands on 7.
        let sunday = out.days.get(&7).expect("Sunday bucket");
        assert!(sunday.contains_key("08-11"));
    }

    #[test]
    fn consecutive_slices_of_one_day_all_land_after_the_first() {
        let transformer = ForecastTransformer::new(Localizer::from_name("UTC").unwrap());

        let d1 = utc(2023, 6, 5, 0, 0, 0);
        let forecast = ForecastResult {
            meta: snapshot(),
            position: None,
            intervals: vec![
                interval(utc(2023, 6, 5, 0, 0, 0), d1),
                interval(utc(2023, 6, 5, 3, 0, 0), d1),
                interval(utc(2023, 6, 5, 6, 0, 0), d1),
            ],
        };

        let out = transformer.normalize_forecast(&forecast).unwrap();
        let monday = out.days.get(&1).expect("Monday bucket");
        assert_eq!(
            monday.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["03-06", "06-09"]
        );
    }

    #[test]
    fn malformed_snapshot_in_a_dropped_interval_goes_unnoticed() {
        let transformer = ForecastTransformer::new(Localizer::from_name("UTC").unwrap());

        let d1 = utc(2023, 6, 5, 0, 0, 0);
        let mut broken = interval(utc(2023, 6, 6, 0, 0, 0), utc(2023, 6, 6, 0, 0, 0));
        broken.snapshot.sun = None;

        let forecast = ForecastResult {
            meta: snapshot(),
            position: None,
            intervals: vec![
                interval(utc(2023, 6, 5, 9, 0, 0), d1),
                interval(utc(2023, 6, 5, 12, 0, 0), d1),
                // First slice of the next day: skipped before normalization.
                broken,
            ],
        };

        assert!(transformer.normalize_forecast(&forecast).is_ok());
    }

    #[test]
    fn empty_interval_list_yields_empty_days() {
        let transformer = ForecastTransformer::new(Localizer::from_name("UTC").unwrap());
        let forecast = ForecastResult {
            meta: snapshot(),
            position: None,
            intervals: Vec::new(),
        };

        let out = transformer.normalize_forecast(&forecast).unwrap();
        assert!(out.days.is_empty());
        assert_eq!(out.summary["humidity"], json!(40));
    }
}
