//! Wraith - real-time trading monitor and command client

pub mod config;
pub mod error;
pub mod gateway;
pub mod protocol;
pub mod services;
pub mod types;

pub use config::Config;
pub use error::{ClientError, Result};
pub use gateway::{PushChannel, RestClient, TradeCommander};
pub use protocol::Router;
pub use services::Store;
