//! Test utilities and mock collaborators for Waypost development.
//!
//! Provides in-memory implementations of the engine's collaborator traits:
//! [`StaticWorld`] (a mutable [`WorldView`]), [`RecordingTransport`] (logs
//! every marker command and can be told to fail deliveries), and
//! [`RecordingNativeControl`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use waypost_core::{ActorId, BlockPos, Dimension, MarkerColor, MarkerId, Vec3};
use waypost_engine::{
    EntityState, MarkerTransport, NativeMarkerControl, TransportError, ViewerState, WorldView,
};

// ── StaticWorld ────────────────────────────────────────────────────

#[derive(Clone)]
struct Actor {
    dimension: Dimension,
    position: Vec3,
    stealthed: bool,
}

/// Mutable in-memory [`WorldView`].
///
/// Actors placed with [`place_actor`](StaticWorld::place_actor) are both
/// connected viewers and reachable entities, which mirrors the usual host:
/// viewers are themselves trackable. `viewers()` returns actors in id order
/// so tests see a deterministic sequence.
#[derive(Default)]
pub struct StaticWorld {
    inner: Mutex<WorldInner>,
}

#[derive(Default)]
struct WorldInner {
    actors: BTreeMap<ActorId, Actor>,
    dimensions: HashSet<Dimension>,
}

impl StaticWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect an actor at a position. Its dimension is registered as a
    /// side effect.
    pub fn place_actor(&self, id: ActorId, dimension: Dimension, position: Vec3) {
        let mut inner = self.inner.lock().unwrap();
        inner.dimensions.insert(dimension.clone());
        inner.actors.insert(
            id,
            Actor {
                dimension,
                position,
                stealthed: false,
            },
        );
    }

    /// Move a connected actor, possibly across dimensions.
    pub fn move_actor(&self, id: ActorId, dimension: Dimension, position: Vec3) {
        let mut inner = self.inner.lock().unwrap();
        inner.dimensions.insert(dimension.clone());
        if let Some(actor) = inner.actors.get_mut(&id) {
            actor.dimension = dimension;
            actor.position = position;
        }
    }

    /// Disconnect an actor entirely (no longer a viewer, no longer
    /// reachable).
    pub fn disconnect(&self, id: ActorId) {
        self.inner.lock().unwrap().actors.remove(&id);
    }

    pub fn set_stealthed(&self, id: ActorId, stealthed: bool) {
        if let Some(actor) = self.inner.lock().unwrap().actors.get_mut(&id) {
            actor.stealthed = stealthed;
        }
    }

    /// Register a dimension name without placing anyone in it.
    pub fn register_dimension(&self, dimension: Dimension) {
        self.inner.lock().unwrap().dimensions.insert(dimension);
    }
}

impl WorldView for StaticWorld {
    fn viewers(&self) -> Vec<ViewerState> {
        self.inner
            .lock()
            .unwrap()
            .actors
            .iter()
            .map(|(id, actor)| ViewerState {
                id: *id,
                dimension: actor.dimension.clone(),
                position: actor.position,
            })
            .collect()
    }

    fn entity(&self, id: ActorId) -> Option<EntityState> {
        self.inner.lock().unwrap().actors.get(&id).map(|actor| EntityState {
            dimension: actor.dimension.clone(),
            position: actor.position,
            stealthed: actor.stealthed,
        })
    }

    fn dimension_exists(&self, dimension: &Dimension) -> bool {
        self.inner.lock().unwrap().dimensions.contains(dimension)
    }
}

// ── RecordingTransport ─────────────────────────────────────────────

/// What a sent command did.
#[derive(Clone, Debug, PartialEq)]
pub enum SentKind {
    Create {
        position: BlockPos,
        color: Option<MarkerColor>,
    },
    Update {
        position: BlockPos,
    },
    Remove,
}

/// One recorded marker command.
#[derive(Clone, Debug, PartialEq)]
pub struct Sent {
    pub viewer: ActorId,
    pub marker: MarkerId,
    pub kind: SentKind,
}

/// [`MarkerTransport`] that logs every command.
///
/// Deliveries to viewers listed via [`fail_viewer`](Self::fail_viewer)
/// return an error without being recorded, for exercising the engine's
/// non-fatal transport failure path.
#[derive(Default)]
pub struct RecordingTransport {
    log: Mutex<Vec<Sent>>,
    failing: Mutex<HashSet<ActorId>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery to `viewer` fail until cleared.
    pub fn fail_viewer(&self, viewer: ActorId) {
        self.failing.lock().unwrap().insert(viewer);
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// Take every recorded command, clearing the log.
    pub fn drain(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }

    /// Recorded commands addressed to one viewer, in send order.
    pub fn sent_to(&self, viewer: ActorId) -> Vec<Sent> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|sent| sent.viewer == viewer)
            .cloned()
            .collect()
    }

    fn record(&self, viewer: ActorId, marker: MarkerId, kind: SentKind) -> Result<(), TransportError> {
        if self.failing.lock().unwrap().contains(&viewer) {
            return Err(TransportError {
                reason: format!("connection to {viewer} refused by test"),
            });
        }
        self.log.lock().unwrap().push(Sent {
            viewer,
            marker,
            kind,
        });
        Ok(())
    }
}

impl MarkerTransport for RecordingTransport {
    fn send_create(
        &self,
        viewer: ActorId,
        marker: MarkerId,
        position: BlockPos,
        color: Option<MarkerColor>,
    ) -> Result<(), TransportError> {
        self.record(viewer, marker, SentKind::Create { position, color })
    }

    fn send_update(
        &self,
        viewer: ActorId,
        marker: MarkerId,
        position: BlockPos,
    ) -> Result<(), TransportError> {
        self.record(viewer, marker, SentKind::Update { position })
    }

    fn send_remove(&self, viewer: ActorId, marker: MarkerId) -> Result<(), TransportError> {
        self.record(viewer, marker, SentKind::Remove)
    }
}

// ── RecordingNativeControl ─────────────────────────────────────────

/// [`NativeMarkerControl`] that records each call.
#[derive(Default)]
pub struct RecordingNativeControl {
    pub suppressed: Mutex<Vec<ActorId>>,
    pub restored: Mutex<Vec<(ActorId, f64)>>,
}

impl RecordingNativeControl {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NativeMarkerControl for RecordingNativeControl {
    fn suppress(&self, entity: ActorId) {
        self.suppressed.lock().unwrap().push(entity);
    }

    fn restore(&self, entity: ActorId, range: f64) {
        self.restored.lock().unwrap().push((entity, range));
    }
}
