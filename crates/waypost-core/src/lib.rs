//! Core types for the Waypost marker tracking engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the Waypost workspace:
//! actor and marker identifiers, positions and the projection transform,
//! marker colors, and the per-entity visibility record.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod color;
pub mod geom;
pub mod id;
pub mod record;

pub use color::{ColorParseError, MarkerColor};
pub use geom::{project_within, BlockPos, Vec3};
pub use id::{ActorId, Dimension, MarkerId, MarkerPurpose};
pub use record::{Anchor, TrackedRecord, VisibilityPolicy};
