use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LoggingConfig {
    /// Base severity: error/warn/info/debug/trace. `WAVY_LOG` overrides.
    pub level: Option<String>,
    /// Extra `target=level` directives appended to the filter.
    pub filters: Option<String>,
    /// Directory for the rotating log file; empty means the user cache dir.
    pub dir: Option<String>,
}
