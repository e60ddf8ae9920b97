pub mod account_client;
pub mod normalizer;
pub mod pnl_calculator;
pub mod refresh_scheduler;
pub mod trade_filter;

pub use account_client::*;
pub use pnl_calculator::*;
pub use refresh_scheduler::*;
pub use trade_filter::*;
