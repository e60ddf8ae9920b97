pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;
pub mod presentation;
pub mod services;

pub use config::DashboardConfig;
pub use presentation::Dashboard;
pub use services::{AccountDataClient, DashboardSession};
