//! Serialization of protocol values back onto the wire.

mod response_encoder;
pub use response_encoder::ResponseEncoder;
