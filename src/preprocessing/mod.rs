//! Image preprocessing module for OCR enhancement
//!
//! Provides a configurable list of pixel filters run ahead of recognition.

pub mod kernel;
pub mod pipeline;
pub mod steps;

pub use kernel::{BlurKernel, KernelCache};
pub use pipeline::{Pipeline, PreprocessingResult, Preset, Stage, StageList, StepTiming};
