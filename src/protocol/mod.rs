//! Push-message protocol: envelope decoding and frame routing.

pub mod decoder;
pub mod router;

pub use decoder::{decode, Decoded};
pub use router::Router;
