pub mod balance;
pub mod metrics;
pub mod position;
pub mod trade;

pub use balance::*;
pub use metrics::*;
pub use position::*;
pub use trade::*;
