//! Feedboard Render Library
//!
//! Frame composition for the Feedboard canvas: a raster pass for strokes and
//! shapes through the [`Painter`] abstraction plus positioned overlay
//! elements for interactive items. The default painter uses Vello.

mod engine;
mod renderer;

#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use engine::{Frame, OverlayElement, RenderEngine, overlays, paint_item};
pub use renderer::{Painter, RenderContext, RenderResult, RendererError};

#[cfg(feature = "vello-renderer")]
pub use vello_impl::VelloPainter;
