//! Waypost: per-viewer marker tracking and reconciliation for game servers.
//!
//! Waypost maintains, for a set of tracked moving entities, a per-viewer
//! visibility decision and emits minimal update commands — create, move, or
//! remove a remote marker — so that every connected viewer renders an
//! up-to-date, distance-projected marker for each entity it is currently
//! allowed to see.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Waypost sub-crates. For most users, adding `waypost` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! The host supplies three collaborators — a [`engine::WorldView`] of
//! connected viewers and entity positions, a [`engine::MarkerTransport`]
//! that delivers marker commands, and a [`engine::NativeMarkerControl`] for
//! its built-in proximity marker — then starts the engine:
//!
//! ```no_run
//! use std::sync::Arc;
//! use waypost::prelude::*;
//!
//! # fn collaborators() -> (Arc<dyn WorldView>, Arc<dyn MarkerTransport>, Arc<dyn NativeMarkerControl>) { unimplemented!() }
//! let (world, transport, native) = collaborators();
//! let store = RecordStore::new("data/records.json");
//! let tracker = Tracker::start(EngineConfig::default(), store, world, transport, native)
//!     .expect("engine start");
//!
//! // Mutations may come from any thread, concurrently with the tick.
//! let entity = ActorId(uuid::Uuid::from_u128(0x42));
//! tracker.register(entity);
//! tracker.hide_from_all(entity);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the
//! prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `waypost-core` | Ids, positions, projection, colors, the visibility record |
//! | [`store`] | `waypost-store` | Durable record storage |
//! | [`engine`] | `waypost-engine` | The tracker, its configuration, and collaborator traits |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and ids (`waypost-core`).
///
/// Contains [`types::ActorId`], [`types::MarkerId`] derivation, the
/// [`types::TrackedRecord`] visibility model, and the
/// [`types::project_within`] transform.
pub use waypost_core as types;

/// Durable record storage (`waypost-store`).
///
/// [`store::RecordStore`] persists the durable subset of each record to a
/// human-editable JSON file.
pub use waypost_store as store;

/// The reconciliation engine (`waypost-engine`).
///
/// [`engine::Tracker`] owns the registry and the periodic tick;
/// [`engine::WorldView`], [`engine::MarkerTransport`], and
/// [`engine::NativeMarkerControl`] are the host-implemented seams.
pub use waypost_engine as engine;

/// Re-export of the `uuid` crate used for actor ids.
pub use uuid;

/// Common imports for typical Waypost usage.
///
/// ```rust
/// use waypost::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use waypost_core::{
        ActorId, Anchor, BlockPos, Dimension, MarkerColor, MarkerId, MarkerPurpose,
        TrackedRecord, Vec3, VisibilityPolicy,
    };

    // Storage
    pub use waypost_store::{LoadedRecord, RecordStore, StoreError};

    // Engine
    pub use waypost_engine::{
        ConfigError, EngineConfig, EntityState, MarkerTransport, NativeMarkerControl,
        StartError, Tracker, TransportError, ViewerState, WorldView,
    };
}
