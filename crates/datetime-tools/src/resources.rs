//! Timezone list resource

use async_trait::async_trait;
use tool_protocol::{Resource, ResourceDescriptor};

pub const TIMEZONES_URI: &str = "timezones://list";

/// Zones offered to consumers as examples for `get_datetime_in_timezone`
pub const COMMON_TIMEZONES: [&str; 9] = [
    "America/New_York",
    "America/Los_Angeles",
    "America/Chicago",
    "Europe/London",
    "Europe/Paris",
    "Asia/Tokyo",
    "Asia/Shanghai",
    "Australia/Sydney",
    "UTC",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct TimezoneList;

#[async_trait]
impl Resource for TimezoneList {
    fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor {
            uri: TIMEZONES_URI.into(),
            name: "get_timezone_list".into(),
            description: Some("A list of common timezone names.".into()),
            mime_type: Some("application/json".into()),
        }
    }

    async fn read(&self) -> tool_protocol::Result<String> {
        Ok(serde_json::to_string_pretty(&COMMON_TIMEZONES)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;

    #[tokio::test]
    async fn test_list_is_pretty_json_of_valid_zones() {
        let text = TimezoneList.read().await.unwrap();
        assert!(text.starts_with("[\n  \"America/New_York\""));

        let zones: Vec<String> = serde_json::from_str(&text).unwrap();
        assert_eq!(zones.len(), 9);
        assert!(zones.iter().all(|z| z.parse::<Tz>().is_ok()));
    }
}
