//! The tracker: registry, mutation API, and the reconciliation diff.
//!
//! [`Tracker`] is the host-facing owner: it validates configuration, loads
//! persisted records, runs the tick thread, and tears everything down once
//! on shutdown. `EngineState` is the shared core the tick thread and
//! mutation callers both operate on.
//!
//! # Concurrency
//!
//! The registry is a sharded concurrent map. A tick collects the key set
//! first and then locks one record at a time, so a mutation arriving
//! mid-tick is observed either before or after that entity's diff — never
//! torn. No operation suspends; every call is bounded by the number of
//! tracked entities and connected viewers.

use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use dashmap::DashMap;

use waypost_core::{
    project_within, ActorId, BlockPos, Dimension, MarkerColor, MarkerId, MarkerPurpose,
    TrackedRecord,
};
use waypost_store::{RecordStore, StoreError};

use crate::config::{
    validate_projection_distance, validate_tick_interval, ConfigError, EngineConfig, SharedConfig,
};
use crate::tick_loop::{ControlMsg, TickLoop};
use crate::traits::{MarkerTransport, NativeMarkerControl, ViewerState, WorldView};

// ── StartError ─────────────────────────────────────────────────────

/// Errors constructing a [`Tracker`].
#[derive(Debug)]
pub enum StartError {
    /// The supplied configuration failed validation.
    Config(ConfigError),
    /// The persisted record file could not be read.
    Store(StoreError),
}

impl fmt::Display for StartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::Store(e) => write!(f, "loading persisted records failed: {e}"),
        }
    }
}

impl Error for StartError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Store(e) => Some(e),
        }
    }
}

impl From<ConfigError> for StartError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StoreError> for StartError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ── Tracker ────────────────────────────────────────────────────────

/// The tracking engine: owns the registry and the periodic tick thread.
///
/// All mutation operations are synchronous and may be called from any
/// thread concurrently with the tick. "Not found" conditions (unknown
/// entity, disconnected viewer) surface as `false`/`None` returns, never a
/// panic or error.
pub struct Tracker {
    state: Arc<EngineState>,
    control_tx: Sender<ControlMsg>,
    tick_thread: Option<JoinHandle<()>>,
    stopped: bool,
}

impl Tracker {
    /// Validate `config`, load persisted records, and spawn the tick
    /// thread.
    ///
    /// Anchors persisted in dimensions that no longer resolve load without
    /// a position; a missing record file is "no tracked entities", not an
    /// error. The first tick runs immediately, then at `tick_interval`.
    pub fn start(
        config: EngineConfig,
        store: RecordStore,
        world: Arc<dyn WorldView>,
        transport: Arc<dyn MarkerTransport>,
        native: Arc<dyn NativeMarkerControl>,
    ) -> Result<Self, StartError> {
        config.validate()?;

        let state = Arc::new(EngineState {
            registry: DashMap::new(),
            config: SharedConfig::new(&config),
            world,
            transport,
            native,
            store,
        });
        state.load_persisted()?;

        let (control_tx, control_rx) = crossbeam_channel::unbounded();
        let loop_state = TickLoop::new(Arc::clone(&state), control_rx, config.tick_interval);
        let tick_thread = thread::Builder::new()
            .name("waypost-tick".into())
            .spawn(move || loop_state.run())
            .expect("failed to spawn tick thread");

        log::info!("tracking engine started");
        Ok(Self {
            state,
            control_tx,
            tick_thread: Some(tick_thread),
            stopped: false,
        })
    }

    // ── Registration ───────────────────────────────────────────────

    /// Begin tracking `entity`. Returns `false` if it is already tracked.
    ///
    /// Suppresses the host's native marker and immediately issues `Create`
    /// toward every connected viewer the live predicate admits.
    pub fn register(&self, entity: ActorId) -> bool {
        self.state.register(entity)
    }

    /// Stop tracking `entity`. Returns `false` if it is not tracked.
    ///
    /// Removes every marker it placed and restores the native marker at
    /// the configured fallback range.
    pub fn unregister(&self, entity: ActorId) -> bool {
        self.state.unregister(entity)
    }

    /// Whether `entity` is currently tracked.
    pub fn is_tracked(&self, entity: ActorId) -> bool {
        self.state.registry.contains_key(&entity)
    }

    /// Ids of every tracked entity.
    pub fn tracked_ids(&self) -> Vec<ActorId> {
        self.state.registry.iter().map(|r| *r.key()).collect()
    }

    // ── Visibility ─────────────────────────────────────────────────

    /// Admit `viewer` to `entity`'s allow list, forcing the list policy.
    pub fn expose_to(&self, entity: ActorId, viewer: ActorId) -> bool {
        self.state
            .mutate_and_refresh(entity, |record| record.expose_to(viewer))
    }

    /// Drop `viewer` from `entity`'s allow list. Under `ExposeToAll` this
    /// is a documented no-op: the policy is unchanged and still admits the
    /// viewer.
    pub fn hide_from(&self, entity: ActorId, viewer: ActorId) -> bool {
        self.state
            .mutate_and_refresh(entity, |record| record.hide_from(viewer))
    }

    /// Expose `entity` to every viewer.
    pub fn expose_to_all(&self, entity: ActorId) -> bool {
        self.state
            .mutate_and_refresh(entity, TrackedRecord::expose_to_all)
    }

    /// Hide `entity` from every viewer.
    pub fn hide_from_all(&self, entity: ActorId) -> bool {
        self.state
            .mutate_and_refresh(entity, TrackedRecord::hide_from_all)
    }

    // ── Color ──────────────────────────────────────────────────────

    /// `entity`'s display color, if it is tracked and has one set.
    pub fn color(&self, entity: ActorId) -> Option<MarkerColor> {
        self.state.registry.get(&entity).and_then(|r| r.color)
    }

    /// Set (or clear) `entity`'s display color.
    ///
    /// Color is fixed at marker creation in the protocol, so both markers
    /// are removed for every current viewer; the next tick re-creates them
    /// with the new color. Intentional churn — color changes are rare.
    pub fn set_color(&self, entity: ActorId, color: Option<MarkerColor>) -> bool {
        self.state.set_color(entity, color)
    }

    // ── Global configuration ───────────────────────────────────────

    /// Snapshot of the current global configuration.
    pub fn config(&self) -> EngineConfig {
        self.state.config.snapshot()
    }

    /// Enable or disable stealth suppression of live markers. Takes effect
    /// at the next evaluation.
    pub fn set_stealth_suppression(&self, enabled: bool) {
        self.state.config.set_stealth_suppression(enabled);
    }

    /// Enable or disable the anchor feature.
    ///
    /// Disabling clears every entity's anchor and removes the markers from
    /// all anchor viewers.
    pub fn set_anchor_feature(&self, enabled: bool) {
        self.state.set_anchor_feature(enabled);
    }

    /// Change the projection distance for subsequent evaluations.
    pub fn set_projection_distance(&self, value: f64) -> Result<(), ConfigError> {
        validate_projection_distance(value)?;
        self.state.config.set_projection_distance(value);
        Ok(())
    }

    /// Replace the tick schedule.
    ///
    /// Takes effect from the next scheduled tick; no partial-interval tick
    /// is issued.
    pub fn set_tick_interval(&self, interval: Duration) -> Result<(), ConfigError> {
        validate_tick_interval(interval)?;
        self.state.config.set_tick_interval(interval);
        let _ = self.control_tx.send(ControlMsg::SetInterval(interval));
        Ok(())
    }

    // ── Host events ────────────────────────────────────────────────

    /// A viewer connected: re-evaluate every tracked entity against it and
    /// create whatever markers it is admitted to. If the viewer is itself
    /// tracked, its native marker is re-suppressed and its last known
    /// location refreshed.
    pub fn on_viewer_connected(&self, viewer: ActorId) {
        self.state.on_viewer_connected(viewer);
    }

    /// A viewer disconnected: drop it from every membership set. No remove
    /// commands are sent — the connection is already gone.
    pub fn on_viewer_disconnected(&self, viewer: ActorId) {
        self.state.on_viewer_disconnected(viewer);
    }

    /// A tracked entity moved to another dimension.
    ///
    /// Clears the anchor if the entity returned to the anchor's dimension;
    /// with the anchor feature enabled, places a fresh anchor at the last
    /// known position, tagged with `previous`. Returns `false` if the
    /// entity is not tracked.
    pub fn on_entity_dimension_changed(&self, entity: ActorId, previous: Dimension) -> bool {
        self.state.on_entity_dimension_changed(entity, previous)
    }

    // ── Persistence and shutdown ───────────────────────────────────

    /// Persist every tracked record now. Returns the number written.
    pub fn save(&self) -> Result<usize, StoreError> {
        self.state.save()
    }

    /// Stop the tick schedule (the in-flight tick finishes), remove every
    /// marker, persist all records, and clear the registry.
    ///
    /// Runs at most once; later calls are no-ops. `Drop` invokes it as a
    /// fallback, logging any persistence failure.
    pub fn shutdown(&mut self) -> Result<(), StoreError> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;

        let _ = self.control_tx.send(ControlMsg::Shutdown);
        if let Some(handle) = self.tick_thread.take() {
            let _ = handle.join();
        }

        let result = self.state.teardown();
        log::info!("tracking engine stopped");
        result
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::warn!("persisting records during shutdown failed: {e}");
        }
    }
}

// ── EngineState ────────────────────────────────────────────────────

/// Core shared between the [`Tracker`] facade and the tick thread.
pub(crate) struct EngineState {
    pub(crate) registry: DashMap<ActorId, TrackedRecord>,
    pub(crate) config: SharedConfig,
    world: Arc<dyn WorldView>,
    transport: Arc<dyn MarkerTransport>,
    native: Arc<dyn NativeMarkerControl>,
    store: RecordStore,
}

impl EngineState {
    #[cfg(test)]
    pub(crate) fn for_tests(
        config: EngineConfig,
        store: RecordStore,
        world: Arc<dyn WorldView>,
        transport: Arc<dyn MarkerTransport>,
        native: Arc<dyn NativeMarkerControl>,
    ) -> Self {
        Self {
            registry: DashMap::new(),
            config: SharedConfig::new(&config),
            world,
            transport,
            native,
            store,
        }
    }

    fn load_persisted(&self) -> Result<(), StoreError> {
        let world = &self.world;
        let report = self.store.load(|dimension| world.dimension_exists(dimension))?;
        for loaded in report.records {
            let mut record = loaded.into_record();
            if let Some(state) = self.world.entity(record.id) {
                record.last_known_dimension = Some(state.dimension);
                record.last_known_position = Some(state.position);
            }
            self.registry.insert(record.id, record);
        }
        Ok(())
    }

    pub(crate) fn save(&self) -> Result<usize, StoreError> {
        let records: Vec<TrackedRecord> =
            self.registry.iter().map(|r| r.value().clone()).collect();
        self.store.save(records.iter())
    }

    fn teardown(&self) -> Result<(), StoreError> {
        let viewers = self.world.viewers();
        for key in self.keys() {
            if let Some(mut record) = self.registry.get_mut(&key) {
                self.remove_all_markers(&mut record, &viewers);
            }
        }
        let result = self.save().map(|_| ());
        self.registry.clear();
        result
    }

    // ── Registration ───────────────────────────────────────────────

    pub(crate) fn register(&self, entity: ActorId) -> bool {
        let entry = match self.registry.entry(entity) {
            dashmap::mapref::entry::Entry::Occupied(_) => return false,
            dashmap::mapref::entry::Entry::Vacant(entry) => entry,
        };

        self.native.suppress(entity);

        let mut record = TrackedRecord::new(entity);
        if let Some(state) = self.world.entity(entity) {
            record.last_known_dimension = Some(state.dimension);
            record.last_known_position = Some(state.position);
        }

        let viewers = self.world.viewers();
        self.reconcile_live(&mut record, &viewers);
        entry.insert(record);

        log::info!("registered tracking for {entity}");
        true
    }

    pub(crate) fn unregister(&self, entity: ActorId) -> bool {
        let Some((_, mut record)) = self.registry.remove(&entity) else {
            return false;
        };
        let viewers = self.world.viewers();
        self.remove_all_markers(&mut record, &viewers);
        self.native
            .restore(entity, self.config.fallback_suppression_range());
        log::info!("unregistered tracking for {entity}");
        true
    }

    // ── Mutation helpers ───────────────────────────────────────────

    /// Apply `mutate` to the record, then re-reconcile that one entity
    /// against every connected viewer. Bounded by viewer count, not
    /// entity count.
    pub(crate) fn mutate_and_refresh(
        &self,
        entity: ActorId,
        mutate: impl FnOnce(&mut TrackedRecord),
    ) -> bool {
        let Some(mut record) = self.registry.get_mut(&entity) else {
            return false;
        };
        mutate(&mut record);
        let viewers = self.world.viewers();
        self.reconcile_live(&mut record, &viewers);
        self.reconcile_anchor(&mut record, &viewers);
        true
    }

    pub(crate) fn set_color(&self, entity: ActorId, color: Option<MarkerColor>) -> bool {
        let Some(mut record) = self.registry.get_mut(&entity) else {
            return false;
        };
        record.color = color;
        let viewers = self.world.viewers();
        self.remove_all_markers(&mut record, &viewers);
        true
    }

    pub(crate) fn set_anchor_feature(&self, enabled: bool) {
        self.config.set_anchor_feature(enabled);
        if enabled {
            return;
        }
        let viewers = self.world.viewers();
        for key in self.keys() {
            if let Some(mut record) = self.registry.get_mut(&key) {
                self.clear_anchor(&mut record, &viewers);
            }
        }
    }

    // ── Host events ────────────────────────────────────────────────

    pub(crate) fn on_viewer_connected(&self, viewer: ActorId) {
        if let Some(mut record) = self.registry.get_mut(&viewer) {
            // A tracked entity coming back online: re-apply suppression and
            // refresh its last known location.
            self.native.suppress(viewer);
            if let Some(state) = self.world.entity(viewer) {
                record.last_known_dimension = Some(state.dimension);
                record.last_known_position = Some(state.position);
            }
        }

        let Some(viewer_state) = self
            .world
            .viewers()
            .into_iter()
            .find(|v| v.id == viewer)
        else {
            return;
        };
        let single = [viewer_state];
        for key in self.keys() {
            if let Some(mut record) = self.registry.get_mut(&key) {
                self.reconcile_live(&mut record, &single);
                self.reconcile_anchor(&mut record, &single);
            }
        }
    }

    pub(crate) fn on_viewer_disconnected(&self, viewer: ActorId) {
        for key in self.keys() {
            if let Some(mut record) = self.registry.get_mut(&key) {
                record.live_viewers.remove(&viewer);
                record.anchor_viewers.remove(&viewer);
            }
        }
    }

    pub(crate) fn on_entity_dimension_changed(&self, entity: ActorId, previous: Dimension) -> bool {
        let Some(mut record) = self.registry.get_mut(&entity) else {
            return false;
        };
        let viewers = self.world.viewers();
        let current = self.world.entity(entity).map(|state| state.dimension);

        // Returned to the anchor's dimension: the anchor has served its
        // purpose.
        let returned_home = matches!(
            (&record.anchor, &current),
            (Some(anchor), Some(current)) if anchor.dimension == *current
        );
        if returned_home {
            self.clear_anchor(&mut record, &viewers);
        }

        if self.config.anchor_feature() {
            self.clear_anchor(&mut record, &viewers);
            if let Some(position) = record.last_known_position {
                record.set_anchor(BlockPos::containing(position), previous);
            }
        }

        // The position is left to the next tick; only the dimension is
        // known to have changed here.
        if let Some(current) = current {
            record.last_known_dimension = Some(current);
        }
        true
    }

    // ── The tick ───────────────────────────────────────────────────

    /// One full reconciliation pass: the mechanism of record.
    ///
    /// For each entity, the live diff runs before the anchor diff; entities
    /// are otherwise processed in no guaranteed order. Membership entries
    /// for viewers that are no longer connected are pruned without sends,
    /// so the sets stay clean even if a disconnect event was lost.
    pub(crate) fn tick(&self) {
        let viewers = self.world.viewers();
        let connected: HashSet<ActorId> = viewers.iter().map(|v| v.id).collect();

        for key in self.keys() {
            let Some(mut record) = self.registry.get_mut(&key) else {
                continue;
            };
            if let Some(state) = self.world.entity(key) {
                record.last_known_dimension = Some(state.dimension);
                record.last_known_position = Some(state.position);
            }
            self.reconcile_live(&mut record, &viewers);
            self.reconcile_anchor(&mut record, &viewers);
            record.live_viewers.retain(|v| connected.contains(v));
            record.anchor_viewers.retain(|v| connected.contains(v));
        }
    }

    /// Three-way diff of the live marker against `viewers`.
    ///
    /// Only the given viewers are diffed — membership of viewers outside
    /// the slice is left untouched, which is what makes this safe for
    /// targeted single-viewer re-evaluation as well as the full tick.
    fn reconcile_live(&self, record: &mut TrackedRecord, viewers: &[ViewerState]) {
        let marker = MarkerId::derive(record.id, MarkerPurpose::Live);

        let Some(entity) = self.world.entity(record.id) else {
            // Unreachable: tear down the live marker everywhere.
            for viewer in viewers {
                if record.live_viewers.remove(&viewer.id) {
                    self.deliver_remove(viewer.id, marker);
                }
            }
            return;
        };

        let suppression = self.config.stealth_suppression();
        let projection = self.config.projection_distance();

        for viewer in viewers {
            let admitted = viewer.dimension == entity.dimension
                && record.is_live_visible_to(viewer.id, entity.stealthed, suppression);
            let held = record.live_viewers.contains(&viewer.id);

            if admitted {
                let position = project_within(viewer.position, entity.position, projection);
                if held {
                    self.deliver_update(viewer.id, marker, position);
                } else if self.deliver_create(viewer.id, marker, position, record.color) {
                    record.live_viewers.insert(viewer.id);
                }
            } else if held {
                record.live_viewers.remove(&viewer.id);
                self.deliver_remove(viewer.id, marker);
            }
        }
    }

    /// Three-way diff of the anchor marker against `viewers`.
    ///
    /// Anchors are static, so there is no update case, projection is
    /// bypassed (the absolute position is the point), and stealth
    /// suppression does not apply.
    fn reconcile_anchor(&self, record: &mut TrackedRecord, viewers: &[ViewerState]) {
        let marker = MarkerId::derive(record.id, MarkerPurpose::Anchor);

        let Some(anchor) = record.anchor.clone() else {
            for viewer in viewers {
                if record.anchor_viewers.remove(&viewer.id) {
                    self.deliver_remove(viewer.id, marker);
                }
            }
            return;
        };

        for viewer in viewers {
            let admitted = viewer.dimension == anchor.dimension
                && viewer.id != record.id
                && record.is_visible_to(viewer.id);
            let held = record.anchor_viewers.contains(&viewer.id);

            if admitted && !held {
                if self.deliver_create(viewer.id, marker, anchor.position, record.color) {
                    record.anchor_viewers.insert(viewer.id);
                }
            } else if !admitted && held {
                record.anchor_viewers.remove(&viewer.id);
                self.deliver_remove(viewer.id, marker);
            }
        }
    }

    /// Remove both markers from every connected member of either set.
    fn remove_all_markers(&self, record: &mut TrackedRecord, viewers: &[ViewerState]) {
        let connected: HashSet<ActorId> = viewers.iter().map(|v| v.id).collect();

        let live = MarkerId::derive(record.id, MarkerPurpose::Live);
        for viewer in record.live_viewers.drain() {
            if connected.contains(&viewer) {
                self.deliver_remove(viewer, live);
            }
        }

        let anchor = MarkerId::derive(record.id, MarkerPurpose::Anchor);
        for viewer in record.anchor_viewers.drain() {
            if connected.contains(&viewer) {
                self.deliver_remove(viewer, anchor);
            }
        }
    }

    /// Drop the anchor and remove its marker from every connected holder.
    fn clear_anchor(&self, record: &mut TrackedRecord, viewers: &[ViewerState]) {
        let connected: HashSet<ActorId> = viewers.iter().map(|v| v.id).collect();
        let marker = MarkerId::derive(record.id, MarkerPurpose::Anchor);
        for viewer in record.anchor_viewers.drain() {
            if connected.contains(&viewer) {
                self.deliver_remove(viewer, marker);
            }
        }
        record.clear_anchor();
    }

    // ── Delivery ───────────────────────────────────────────────────
    //
    // Per-viewer transport failures never abort the pass. A failed create
    // leaves the viewer out of the membership set so the next tick retries
    // it; a failed remove still drops membership (nothing further can be
    // done for a dead marker); a failed update waits for the next tick.

    fn deliver_create(
        &self,
        viewer: ActorId,
        marker: MarkerId,
        position: BlockPos,
        color: Option<MarkerColor>,
    ) -> bool {
        match self.transport.send_create(viewer, marker, position, color) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("create of {marker} for {viewer} failed: {e}");
                false
            }
        }
    }

    fn deliver_update(&self, viewer: ActorId, marker: MarkerId, position: BlockPos) {
        if let Err(e) = self.transport.send_update(viewer, marker, position) {
            log::warn!("update of {marker} for {viewer} failed: {e}");
        }
    }

    fn deliver_remove(&self, viewer: ActorId, marker: MarkerId) {
        if let Err(e) = self.transport.send_remove(viewer, marker) {
            log::warn!("remove of {marker} for {viewer} failed: {e}");
        }
    }

    fn keys(&self) -> Vec<ActorId> {
        self.registry.iter().map(|r| *r.key()).collect()
    }
}
