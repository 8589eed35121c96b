pub mod http_metrics;
pub mod preflight;
pub mod principal;

pub use http_metrics::http_metrics_middleware;
pub use preflight::preflight_middleware;
