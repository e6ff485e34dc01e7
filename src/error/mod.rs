mod app;
mod call;
mod config;
mod connection;
mod metrics;
mod run;
mod server;
mod validation;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use call::CallError;
pub use config::ConfigError;
pub use connection::ConnectionError;
pub use metrics::MetricsError;
pub use run::RunError;
pub use server::ServerError;
pub use validation::ValidationError;
