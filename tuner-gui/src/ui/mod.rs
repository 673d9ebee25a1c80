//! # UI Module
//!
//! Layout and widgets for the tuner window.

pub mod cent_meter;
pub mod main_display;
