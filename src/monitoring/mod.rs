pub mod health;
pub mod metrics;

pub use health::{HealthStatus, check_system_health};
pub use metrics::{Metrics, RequestTimer};
