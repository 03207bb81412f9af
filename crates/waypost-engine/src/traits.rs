//! Collaborator seams between the engine and its host.
//!
//! The engine never inspects transport or world internals: it reads the
//! world through [`WorldView`], emits marker commands through
//! [`MarkerTransport`], and toggles the host's own proximity marker through
//! [`NativeMarkerControl`]. Hosts implement these three traits; tests use
//! the mocks in `waypost-test-utils`.

use std::error::Error;
use std::fmt;

use waypost_core::{ActorId, BlockPos, Dimension, MarkerColor, MarkerId, Vec3};

// ── World view ─────────────────────────────────────────────────────

/// A connected viewer as seen at one instant.
#[derive(Clone, Debug)]
pub struct ViewerState {
    /// The viewer's id.
    pub id: ActorId,
    /// Dimension the viewer currently occupies.
    pub dimension: Dimension,
    /// The viewer's current position, used to project marker coordinates.
    pub position: Vec3,
}

/// A reachable tracked entity as seen at one instant.
#[derive(Clone, Debug)]
pub struct EntityState {
    /// Dimension the entity currently occupies.
    pub dimension: Dimension,
    /// The entity's current position.
    pub position: Vec3,
    /// Whether the entity currently counts as stealthed. The detection
    /// heuristics live host-side; only this boolean crosses the boundary.
    pub stealthed: bool,
}

/// Read-only view of the host world.
///
/// Supplied by the host and queried fresh each evaluation; the engine never
/// caches what it returns beyond a single reconciliation pass.
pub trait WorldView: Send + Sync {
    /// Snapshot of the currently connected viewers.
    fn viewers(&self) -> Vec<ViewerState>;

    /// Current state of a tracked entity, or `None` while unreachable.
    fn entity(&self, id: ActorId) -> Option<EntityState>;

    /// Whether a persisted dimension name currently resolves.
    fn dimension_exists(&self, dimension: &Dimension) -> bool;
}

// ── Transport ──────────────────────────────────────────────────────

/// A marker command could not be delivered to one viewer.
///
/// Always non-fatal: the engine logs it and carries on with the remaining
/// viewers; the worst outcome is a stale marker until the next tick.
#[derive(Debug)]
pub struct TransportError {
    /// Human-readable description of the delivery failure.
    pub reason: String,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker delivery failed: {}", self.reason)
    }
}

impl Error for TransportError {}

/// Delivers marker commands to a viewer's connection.
///
/// Color is fixed at creation time — there is no recolor command, which is
/// why a color change cycles the marker through remove and re-create.
pub trait MarkerTransport: Send + Sync {
    /// Create a marker for `viewer` at `position`.
    fn send_create(
        &self,
        viewer: ActorId,
        marker: MarkerId,
        position: BlockPos,
        color: Option<MarkerColor>,
    ) -> Result<(), TransportError>;

    /// Move an existing marker.
    fn send_update(
        &self,
        viewer: ActorId,
        marker: MarkerId,
        position: BlockPos,
    ) -> Result<(), TransportError>;

    /// Remove a marker.
    fn send_remove(&self, viewer: ActorId, marker: MarkerId) -> Result<(), TransportError>;
}

// ── Native marker control ──────────────────────────────────────────

/// Switch for the host's built-in proximity marker.
///
/// The engine's markers replace the native one, so it is suppressed once at
/// registration and restored once at unregistration.
pub trait NativeMarkerControl: Send + Sync {
    /// Stop the host from broadcasting its own marker for `entity`.
    fn suppress(&self, entity: ActorId);

    /// Restore the host's marker for `entity` at the given transmit range.
    fn restore(&self, entity: ActorId, range: f64);
}
