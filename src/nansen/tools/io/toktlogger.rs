//! Client for the ship's toktlogger (cruise logging service).
//!
//! The toktlogger exposes the activity log and the current cruise as JSON.
//! Both are flattened into [`DataTable`]s whose columns are catalog keys, so
//! they can be handed straight to the workbook assembler.

use chrono::{DateTime, NaiveDateTime};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::nansen::tools::error::{Result, ToolError};
use crate::nansen::tools::model::{CellValue, DataTable};

pub const DEFAULT_HOST: &str = "toktlogger-bonnevie.hi.no";

const ACTIVITIES_PATH: &str = "/api/activities/inCurrentCruise?format=json";
const CRUISE_PATH: &str = "/api/cruises/current?format=json";

/// Columns of the flattened activity log, in output order.
pub const ACTIVITY_COLUMNS: [&str; 9] = [
    "eventDate",
    "eventTime",
    "end_date",
    "end_time",
    "decimalLatitude",
    "decimalLongitude",
    "stationName",
    "gearType",
    "eventRemarks",
];

/// Columns of the flattened cruise record.
pub const CRUISE_COLUMNS: [&str; 4] = ["cruiseNumber", "vesselName", "projectID", "title"];

/// One logged activity as returned by the toktlogger.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Activity {
    pub name: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub start_position: Option<Position>,
    pub activity_type_name: Option<String>,
    pub comment: Option<String>,
}

/// GeoJSON point; coordinates are `[longitude, latitude]`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Position {
    pub coordinates: Vec<f64>,
}

impl Position {
    fn longitude(&self) -> Option<f64> {
        self.coordinates.first().copied()
    }

    fn latitude(&self) -> Option<f64> {
        self.coordinates.get(1).copied()
    }
}

/// The cruise currently registered on the toktlogger.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cruise {
    pub cruise_number: Option<Value>,
    pub cruise_name: Option<String>,
    pub vessel_name: Option<String>,
    pub project_name: Option<String>,
}

/// Blocking HTTP client bound to one toktlogger host.
#[derive(Debug, Clone)]
pub struct ToktloggerClient {
    base_url: String,
    client: Client,
}

impl ToktloggerClient {
    /// `host` may be a bare host name (served over plain HTTP on the ship's
    /// network) or a full base URL.
    pub fn new(host: &str) -> Result<Self> {
        let host = host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(ToolError::InvalidResponse("empty toktlogger host".to_string()));
        }
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{host}")
        };
        Ok(Self {
            base_url,
            client: Client::builder().build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "requesting");
        let response = self.client.get(&url).send()?.error_for_status()?;
        Ok(response.json::<T>()?)
    }

    /// Fetches every activity of the current cruise as table rows.
    #[instrument(level = "info", skip_all, fields(host = %self.base_url))]
    pub fn fetch_activities(&self) -> Result<DataTable> {
        let activities: Vec<Activity> = self.get_json(ACTIVITIES_PATH)?;
        let table = activities_to_table(activities);
        info!(rows = table.rows.len(), "activities fetched");
        Ok(table)
    }

    /// Fetches the current cruise as a single-row metadata table.
    #[instrument(level = "info", skip_all, fields(host = %self.base_url))]
    pub fn fetch_cruise_metadata(&self) -> Result<DataTable> {
        let cruise: Cruise = self.get_json(CRUISE_PATH)?;
        Ok(cruise_to_table(&cruise))
    }
}

/// Flattens activities into one row each, ordered by start time.
pub fn activities_to_table(mut activities: Vec<Activity>) -> DataTable {
    activities.sort_by(|lhs, rhs| lhs.start_time.cmp(&rhs.start_time));

    let mut table = DataTable::new(ACTIVITY_COLUMNS);
    for activity in &activities {
        let (start_date, start_time) = split_timestamp(activity.start_time.as_deref());
        let (end_date, end_time) = split_timestamp(activity.end_time.as_deref());
        let position = activity.start_position.as_ref();

        table.push_row(vec![
            start_date.into(),
            start_time.into(),
            end_date.into(),
            end_time.into(),
            position.and_then(Position::latitude).into(),
            position.and_then(Position::longitude).into(),
            activity.name.clone().into(),
            activity.activity_type_name.clone().into(),
            activity.comment.clone().into(),
        ]);
    }
    table
}

/// Flattens the cruise record into a single-row table.
pub fn cruise_to_table(cruise: &Cruise) -> DataTable {
    let mut table = DataTable::new(CRUISE_COLUMNS);
    table.push_row(vec![
        cruise
            .cruise_number
            .as_ref()
            .map(CellValue::from_json)
            .unwrap_or(CellValue::Empty),
        cruise.vessel_name.clone().into(),
        cruise.project_name.clone().into(),
        cruise.cruise_name.clone().into(),
    ]);
    table
}

/// Splits an ISO-8601 timestamp into its date and `hh:mm:ss` time parts.
/// Fractional seconds and the zone suffix are dropped; the wall-clock time as
/// logged is kept. Text that does not parse is kept whole in the date part.
fn split_timestamp(timestamp: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(timestamp) = timestamp.map(str::trim).filter(|text| !text.is_empty()) else {
        return (None, None);
    };
    match parse_timestamp(timestamp) {
        Some(parsed) => (
            Some(parsed.format("%Y-%m-%d").to_string()),
            Some(parsed.format("%H:%M:%S").to_string()),
        ),
        None => (Some(timestamp.to_string()), None),
    }
}

const TIMESTAMP_LAYOUTS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn parse_timestamp(timestamp: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(parsed.naive_local());
    }
    let naive = timestamp.trim_end_matches(['Z', 'z']);
    TIMESTAMP_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(naive, layout).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn activities_flatten_in_start_order() {
        let payload = json!([
            {
                "name": "P2 (NLEG02)",
                "startTime": "2022-07-23T08:00:00.000Z",
                "endTime": "2022-07-23T09:30:12.000Z",
                "startPosition": {"type": "Point", "coordinates": [30.5, 78.25]},
                "activityTypeName": "CTD w/bottles",
                "comment": null
            },
            {
                "name": "P1 (NLEG01)",
                "startTime": "2022-07-22T10:15:30Z",
                "activityTypeName": "Box corer",
                "comment": "Mud"
            }
        ]);
        let activities: Vec<Activity> = serde_json::from_value(payload).unwrap();
        let table = activities_to_table(activities);

        assert_eq!(table.columns, ACTIVITY_COLUMNS);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.value("eventDate", 0), Some(&CellValue::from("2022-07-22")));
        assert_eq!(table.value("eventTime", 0), Some(&CellValue::from("10:15:30")));
        assert_eq!(table.value("end_date", 0), Some(&CellValue::Empty));
        assert_eq!(table.value("eventRemarks", 0), Some(&CellValue::from("Mud")));
        assert_eq!(table.value("decimalLatitude", 1), Some(&CellValue::Number(78.25)));
        assert_eq!(table.value("decimalLongitude", 1), Some(&CellValue::Number(30.5)));
        assert_eq!(table.value("end_time", 1), Some(&CellValue::from("09:30:12")));
        assert_eq!(table.value("gearType", 1), Some(&CellValue::from("CTD w/bottles")));
    }

    #[test]
    fn cruise_becomes_single_row() {
        let cruise: Cruise = serde_json::from_value(json!({
            "cruiseNumber": 2022700,
            "cruiseName": "Nansen Legacy JC2-2",
            "vesselName": "Kristine Bonnevie",
            "unrelated": true
        }))
        .unwrap();
        let table = cruise_to_table(&cruise);

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.value("cruiseNumber", 0), Some(&CellValue::Number(2022700.0)));
        assert_eq!(table.value("vesselName", 0), Some(&CellValue::from("Kristine Bonnevie")));
        assert_eq!(table.value("projectID", 0), Some(&CellValue::Empty));
        assert_eq!(table.value("title", 0), Some(&CellValue::from("Nansen Legacy JC2-2")));
    }

    #[test]
    fn odd_timestamps_are_kept_whole() {
        assert_eq!(split_timestamp(None), (None, None));
        assert_eq!(split_timestamp(Some("  ")), (None, None));
        assert_eq!(
            split_timestamp(Some("22/07/2022")),
            (Some("22/07/2022".to_string()), None)
        );
        assert_eq!(
            split_timestamp(Some("2022-07-22 06:01:02")),
            (Some("2022-07-22".to_string()), Some("06:01:02".to_string()))
        );
    }

    #[test]
    fn timestamps_without_seconds_or_with_offsets_split() {
        let split = |text| split_timestamp(Some(text));
        assert_eq!(
            split("2022-07-22T10:15Z"),
            (Some("2022-07-22".to_string()), Some("10:15:00".to_string()))
        );
        assert_eq!(
            split("2022-07-22T10:15:30.250+02:00"),
            (Some("2022-07-22".to_string()), Some("10:15:30".to_string()))
        );
        assert_eq!(
            split("2022-07-22 23:59"),
            (Some("2022-07-22".to_string()), Some("23:59:00".to_string()))
        );
    }

    #[test]
    fn bare_hosts_get_http_scheme() {
        let client = ToktloggerClient::new("toktlogger-khaakon.hi.no/").unwrap();
        assert_eq!(client.base_url(), "http://toktlogger-khaakon.hi.no");
        let client = ToktloggerClient::new("https://logger.example.org").unwrap();
        assert_eq!(client.base_url(), "https://logger.example.org");
        assert!(ToktloggerClient::new(" ").is_err());
    }
}
