//! Image tooling: EXIF reading, thumbnail sizing and creation.
//!
//! | Operation | Tool |
//! |---|---|
//! | **Read EXIF** | `exiftool -json` |
//! | **Resize** | `magick -resize` |
//! | **Strip metadata** | `exiftool -all=` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for thumbnail dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`ExternalToolsBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod external_backend;
pub mod operations;
mod params;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{MAX_DIVISOR_STEPS, thumbnail_dimensions, thumbnail_divisor};
pub use external_backend::ExternalToolsBackend;
pub use operations::{ThumbnailConfig, create_thumbnail, plan_thumbnail};
pub use params::{Quality, ResizeParams};
