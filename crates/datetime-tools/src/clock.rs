//! Clock tools
//!
//! Every tool reads the clock at call time. Formatting is split out from the
//! clock read so it can be checked against a fixed instant.

use agent_core::{ParameterSchema, Result, Tool, ToolCall, ToolDescriptor, ToolResult};
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt::Display;

/// The argument-free clock readings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    Date,
    Time,
    DateTime,
    Timestamp,
    DayOfWeek,
    IsoDateTime,
}

impl Clock {
    pub const ALL: [Self; 6] = [
        Self::Date,
        Self::Time,
        Self::DateTime,
        Self::Timestamp,
        Self::DayOfWeek,
        Self::IsoDateTime,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Date => "get_current_date",
            Self::Time => "get_current_time",
            Self::DateTime => "get_current_datetime",
            Self::Timestamp => "get_timestamp",
            Self::DayOfWeek => "get_day_of_week",
            Self::IsoDateTime => "get_iso_datetime",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Date => "Get the current date in YYYY-MM-DD format.",
            Self::Time => "Get the current time in HH:MM:SS format.",
            Self::DateTime => {
                "Get the current date and time in a human-readable format \
                 (e.g. 'Tuesday, February 04, 2026 at 14:30:45')."
            }
            Self::Timestamp => "Get the current Unix timestamp (seconds since epoch).",
            Self::DayOfWeek => "Get the current day of the week (e.g. 'Monday').",
            Self::IsoDateTime => "Get the current datetime in ISO 8601 format.",
        }
    }

    /// Render a reading of `now` in its own zone
    pub fn render<Z>(self, now: &DateTime<Z>) -> String
    where
        Z: TimeZone,
        Z::Offset: Display,
    {
        match self {
            Self::Date => now.format("%Y-%m-%d").to_string(),
            Self::Time => now.format("%H:%M:%S").to_string(),
            Self::DateTime => now.format("%A, %B %d, %Y at %H:%M:%S").to_string(),
            Self::Timestamp => now.timestamp().to_string(),
            Self::DayOfWeek => now.format("%A").to_string(),
            Self::IsoDateTime => now.naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        }
    }
}

#[async_trait]
impl Tool for Clock {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(self.name(), self.description(), vec![])
    }

    async fn execute(&self, _call: &ToolCall) -> Result<ToolResult> {
        Ok(ToolResult::success(self.name(), self.render(&Local::now())))
    }
}

/// Current date and time in a named IANA zone
#[derive(Debug, Clone, Copy, Default)]
pub struct TimezoneTool;

impl TimezoneTool {
    pub const NAME: &'static str = "get_datetime_in_timezone";

    /// Format `now` in `zone`, matching the zone name without regard to case.
    ///
    /// An unknown zone yields a descriptive message rather than an error so
    /// the model can correct itself.
    pub fn render(now: DateTime<Utc>, zone: &str) -> String {
        Tz::from_str_insensitive(zone).map_or_else(
            |_| {
                tracing::debug!(zone, "Unknown timezone requested");
                format!("Error: Invalid timezone '{zone}'. Use format like 'America/New_York'")
            },
            |tz| now.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S %Z").to_string(),
        )
    }
}

#[async_trait]
impl Tool for TimezoneTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            Self::NAME,
            "Get the current date and time in a specific timezone.",
            vec![ParameterSchema::required(
                "timezone",
                "string",
                "Timezone name (e.g., 'America/New_York', 'Europe/London', 'Asia/Tokyo')",
            )],
        )
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let zone = call.str_arg("timezone").unwrap_or_default();
        Ok(ToolResult::success(Self::NAME, Self::render(Utc::now(), zone)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::{Map, json};

    fn fixed() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2026, 2, 4)
            .unwrap()
            .and_hms_micro_opt(14, 30, 45, 123_456)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_render_formats() {
        let now = fixed();
        assert_eq!(Clock::Date.render(&now), "2026-02-04");
        assert_eq!(Clock::Time.render(&now), "14:30:45");
        assert_eq!(Clock::DateTime.render(&now), "Wednesday, February 04, 2026 at 14:30:45");
        assert_eq!(Clock::Timestamp.render(&now), "1770215445");
        assert_eq!(Clock::DayOfWeek.render(&now), "Wednesday");
        assert_eq!(Clock::IsoDateTime.render(&now), "2026-02-04T14:30:45.123456");
    }

    #[test]
    fn test_timezone_render() {
        assert_eq!(TimezoneTool::render(fixed(), "America/New_York"), "2026-02-04 09:30:45 EST");
        assert_eq!(TimezoneTool::render(fixed(), "Asia/Tokyo"), "2026-02-04 23:30:45 JST");
        assert_eq!(TimezoneTool::render(fixed(), "america/new_york"), "2026-02-04 09:30:45 EST");
        assert_eq!(TimezoneTool::render(fixed(), "EUROPE/LONDON"), "2026-02-04 14:30:45 GMT");
        assert_eq!(
            TimezoneTool::render(fixed(), "Not/AZone"),
            "Error: Invalid timezone 'Not/AZone'. Use format like 'America/New_York'"
        );
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = Clock::ALL.iter().map(|c| c.name()).collect();
        names.push(TimezoneTool::NAME);
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 7);
    }

    #[tokio::test]
    async fn test_invalid_zone_is_successful_result() {
        let mut args = Map::new();
        args.insert("timezone".into(), json!("Mars/Olympus"));
        let result = TimezoneTool
            .execute(&ToolCall::new("c1", TimezoneTool::NAME, args))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.output.starts_with("Error: Invalid timezone 'Mars/Olympus'"));
    }

    #[tokio::test]
    async fn test_clock_tools_take_no_arguments() {
        let tool = Clock::Date;
        assert!(tool.descriptor().required_parameters().is_empty());

        let mut extra = Map::new();
        extra.insert("format".into(), json!("iso"));
        assert!(tool.validate(&ToolCall::new("c2", tool.name(), extra)).is_err());
    }
}
