//! Domain models for the prescription assistant.

mod patient;
mod prescription;
mod recommendation;

pub use patient::*;
pub use prescription::*;
pub use recommendation::*;
