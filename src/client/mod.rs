//! Viewer-side countdown: the deadline predictor, its rendered frames, and
//! the 1 Hz loop that drives them.
//!
//! Everything here runs on whatever machine renders the countdown. The server
//! never imports it; it exists so native viewer surfaces and tests share the
//! exact arithmetic the protocol was designed around.

/// Frame rendering: countdown text, urgency bands, and the progress ring.
pub mod display;
/// The pure push-and-tick reducer for one viewer.
pub mod predictor;
/// The async loop wiring pushes, cadence, frames, and uplink together.
pub mod ticker;
