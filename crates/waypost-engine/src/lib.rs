//! Reconciliation engine keeping per-viewer marker state in sync.
//!
//! The engine owns the registry of tracked entities and runs the periodic
//! reconciliation tick: for every (entity, viewer) pair it decides whether a
//! marker should exist and sends the minimal diff — create, move, or remove
//! — through the host-supplied transport. Event-triggered re-evaluation
//! (viewer joined, policy changed, dimension changed) shares the same diff
//! logic; the unconditional tick remains the mechanism of record.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod traits;

mod tick_loop;

pub use config::{ConfigError, EngineConfig};
pub use engine::{StartError, Tracker};
pub use traits::{
    EntityState, MarkerTransport, NativeMarkerControl, TransportError, ViewerState, WorldView,
};
