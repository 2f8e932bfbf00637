//! Presentation layer for devpulse.
//!
//! Pure functions of a [`ProfileReport`](pulse_core::models::ProfileReport):
//! the templated profile README and the hero dashboard SVG.

pub mod readme;
pub mod svg;

pub use readme::render_readme;
pub use svg::render_svg;
