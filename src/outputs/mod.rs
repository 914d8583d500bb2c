//! Output formats for a [`NewsPage`](crate::models::NewsPage).
//!
//! - [`html`]: the page served at `/`
//! - [`json`]: snapshot files written by the one-shot mode
//!
//! The `/api/news` endpoint serializes the page directly and needs no
//! module of its own.

pub mod html;
pub mod json;
