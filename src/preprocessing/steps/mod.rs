//! Individual preprocessing steps

pub mod blur;
pub mod threshold;
