pub mod config;
pub mod error;
pub mod scopes;
pub mod types;

pub use config::Config;
pub use error::MoodwireError;
pub use scopes::MonitoredScopes;
pub use types::{MediaFlags, Platform};
