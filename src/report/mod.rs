//! Report rendering: the JSON summary and the Slack payload.

pub mod generator;
pub mod slack;

pub use generator::*;
pub use slack::*;
