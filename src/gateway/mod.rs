pub mod channel;
pub mod commands;
pub mod rest;
pub mod session;

pub use channel::PushChannel;
pub use commands::{TradeCommander, TradePlan};
pub use rest::RestClient;
pub use session::{BackoffLadder, ConnectionState, Credentials, Session};
