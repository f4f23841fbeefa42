//! Flowstation - client and dashboard for the pressure/flow measurement station
//!
//! This library exposes the core modules for testing and reuse.

pub mod calibration;
pub mod common;
pub mod config;
pub mod device;
pub mod error;
pub mod export;
pub mod poll;
pub mod render;
pub mod series;
