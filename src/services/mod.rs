pub mod metrics;
pub mod store;

pub use store::Store;
