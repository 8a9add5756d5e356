//! HTTP API handlers

pub mod export;
pub mod health;
pub mod samples;
pub mod statuses;
pub mod ui;
pub mod units;
pub mod upload;

pub use export::export_routes;
pub use health::health_routes;
pub use samples::sample_routes;
pub use statuses::{status_info_json, status_routes};
pub use ui::ui_routes;
pub use units::unit_routes;
pub use upload::upload_routes;
