//! Request and response data transfer objects

pub mod quotation;

pub use quotation::*;
