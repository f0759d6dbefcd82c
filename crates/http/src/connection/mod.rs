//! The seam between the dispatcher and whatever carries bytes downstream.

mod output_channel;
pub use output_channel::OutputChannel;
pub use output_channel::WriteChannel;
