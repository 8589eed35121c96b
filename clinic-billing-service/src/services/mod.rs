//! Services module for clinic-billing-service.

pub mod database;
pub mod metrics;
pub mod money;
pub mod numbering;
pub mod policy;

pub use database::Database;
pub use metrics::{get_metrics, init_metrics};
