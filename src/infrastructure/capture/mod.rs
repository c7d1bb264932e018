//! Capture device adapters

mod cpal_device;
mod resample;

pub use cpal_device::{CpalCaptureDevice, TARGET_SAMPLE_RATE};
