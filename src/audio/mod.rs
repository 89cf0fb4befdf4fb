//! Audio capture via cpal.

pub mod capture;
