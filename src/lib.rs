//! SliceView — 2D slice rendering and interactive annotation of volumetric
//! scan data.
//!
//! The crate composites one slice of a scalar volume into an RGBA buffer
//! (grayscale sigmoid curve, signed heat scale, or a per-value color table),
//! and routes pointer gestures through editing tools: per-voxel value edits,
//! brush and flood selection with undoable per-point edits, free lines, and
//! edge-snapped lines computed by a per-drag shortest-path search.
//!
//! Everything is single-threaded and frame-synchronous. The volume, the
//! pixel↔world translator, color tables, and the undo log are collaborators
//! passed into each call; [`layer::SliceLayer`] owns only the rendering
//! configuration, its derived grayscale table, and the annotation store.

pub mod annotations;
pub mod cli;
pub mod colormap;
pub mod compositor;
pub mod error;
pub mod geom;
pub mod history;
pub mod layer;
pub mod logger;
pub mod lut;
pub mod pathfind;
pub mod region;
pub mod tools;
pub mod view;
pub mod volume;

pub use error::{LayerError, Result};
pub use layer::{LayerConfig, ProbeInfo, SliceLayer};
pub use volume::{GridVolume, SampleMethod, VolumeSource};
