//! # datetime-tools
//!
//! Date and time tools plus a `timezones://list` resource, packaged as a
//! [`ToolProvider`] named `datetime-server`.
//!
//! | Tool | Output |
//! |------|--------|
//! | `get_current_date` | `2026-02-04` |
//! | `get_current_time` | `14:30:45` |
//! | `get_current_datetime` | `Wednesday, February 04, 2026 at 14:30:45` |
//! | `get_timestamp` | `1770215445` |
//! | `get_datetime_in_timezone` | `2026-02-04 09:30:45 EST` |
//! | `get_day_of_week` | `Wednesday` |
//! | `get_iso_datetime` | `2026-02-04T14:30:45.123456` |

pub mod clock;
pub mod resources;

use agent_core::ToolRegistry;
use tool_protocol::ToolProvider;

pub use clock::{Clock, TimezoneTool};
pub use resources::{COMMON_TIMEZONES, TIMEZONES_URI, TimezoneList};

pub const SERVER_NAME: &str = "datetime-server";

/// Registry holding all seven date/time tools
pub fn registry() -> agent_core::Result<ToolRegistry> {
    let mut tools = ToolRegistry::new();
    for clock in Clock::ALL {
        tools.register(clock)?;
    }
    tools.register(TimezoneTool)?;
    Ok(tools)
}

/// The provider served by the `datetime-server` binary
pub fn provider() -> agent_core::Result<ToolProvider> {
    Ok(ToolProvider::new(SERVER_NAME, env!("CARGO_PKG_VERSION"), registry()?).with_resource(TimezoneList))
}
