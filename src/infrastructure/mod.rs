pub mod gateway;
pub mod hyperliquid;

pub use gateway::*;
pub use hyperliquid::*;
