//! waiver-pdf: render passenger waivers and stamp scanned paper waivers.
//!
//! Three pieces:
//! - [`interpolate`](mod@interpolate) fills `{{placeholder}}` template text.
//! - [`compose`](mod@compose) lays out and renders a complete signed waiver.
//! - [`annotate`](mod@annotate) stamps a metadata box onto an existing PDF.

pub mod annotate;
pub mod assets;
pub mod compose;
pub mod config;
pub mod content;
pub mod error;
pub mod format;
pub mod interpolate;
pub mod layout;
pub mod metrics;
pub mod model;
pub mod render;
pub mod waiver_id;

pub use annotate::{annotate, layout_overlay};
pub use compose::{compose, Compositor};
pub use config::{PageSize, RenderSettings};
pub use error::{Result, WaiverError};
pub use format::{format_date, one_year_after, DisplayZone};
pub use interpolate::{extract_placeholders, interpolate, InterpolationParams};
pub use model::{OverlayMetadata, WaiverSubmission, WaiverTemplate, WaiverType};
pub use waiver_id::{allocate_waiver_id, generate_waiver_id};
