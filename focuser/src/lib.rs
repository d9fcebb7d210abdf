//! Focuser drivers for telescope focus control.
//!
//! This crate provides drivers for motorized focusers and the
//! [`FocuserInterface`](focuser_interface::FocuserInterface) trait host
//! frameworks call into. Each driver is feature-gated for optional
//! compilation.
//!
//! # Features
//!
//! - `starpoint` - Starpoint serial focuser (enabled by default)

pub mod focuser_interface;

#[cfg(feature = "starpoint")]
pub mod starpoint;
