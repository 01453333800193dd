//! Core data models for the PDF catalog.

mod category;
mod ids;
mod listing;
mod pdf;

pub use category::*;
pub use ids::*;
pub use listing::*;
pub use pdf::*;
