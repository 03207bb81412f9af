//! The per-entity visibility record and its predicates.
//!
//! Pure data plus predicate logic — no I/O happens here. The engine owns
//! re-evaluating marker membership after any mutation; these operations only
//! update the record itself.

use std::collections::HashSet;

use crate::color::MarkerColor;
use crate::geom::{BlockPos, Vec3};
use crate::id::{ActorId, Dimension};

/// Per-entity rule controlling which viewers may see its markers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VisibilityPolicy {
    /// Every viewer is admitted.
    #[default]
    ExposeToAll,
    /// No viewer is admitted.
    HideFromAll,
    /// Only viewers on the allow list are admitted.
    ExposeToList,
}

impl VisibilityPolicy {
    /// The stable name used in the persisted file.
    pub fn name(self) -> &'static str {
        match self {
            Self::ExposeToAll => "expose_to_all",
            Self::HideFromAll => "hide_from_all",
            Self::ExposeToList => "expose_to_list",
        }
    }

    /// Parse a stable name back into a policy.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "expose_to_all" => Some(Self::ExposeToAll),
            "hide_from_all" => Some(Self::HideFromAll),
            "expose_to_list" => Some(Self::ExposeToList),
            _ => None,
        }
    }
}

/// A static marker left at an entity's last position in a dimension it has
/// left. At most one per entity at any time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Anchor {
    /// Where the marker sits, in absolute integer coordinates.
    pub position: BlockPos,
    /// The dimension the marker sits in.
    pub dimension: Dimension,
}

/// State tracked for one registered entity.
///
/// The two membership sets (`live_viewers`, `anchor_viewers`) are ephemeral
/// engine bookkeeping: they mirror which viewers currently hold an active
/// remote marker, are rebuilt from connected-viewer state at runtime, and
/// are never persisted.
#[derive(Clone, Debug)]
pub struct TrackedRecord {
    /// The tracked entity.
    pub id: ActorId,
    /// Current visibility policy.
    pub policy: VisibilityPolicy,
    /// Viewers admitted under [`VisibilityPolicy::ExposeToList`]. Cleared
    /// whenever the policy switches to one of the blanket modes.
    pub allow_list: HashSet<ActorId>,
    /// Display color; `None` means the remote default.
    pub color: Option<MarkerColor>,
    /// Most recently observed dimension, refreshed while reachable.
    pub last_known_dimension: Option<Dimension>,
    /// Most recently observed position, refreshed while reachable. Seeds a
    /// new anchor when the entity changes dimension.
    pub last_known_position: Option<Vec3>,
    /// The entity's anchor marker, if one exists.
    pub anchor: Option<Anchor>,
    /// Viewers currently holding the live marker.
    pub live_viewers: HashSet<ActorId>,
    /// Viewers currently holding the anchor marker. Empty whenever
    /// `anchor` is `None`.
    pub anchor_viewers: HashSet<ActorId>,
}

impl TrackedRecord {
    /// A fresh record with the default policy and no markers placed.
    pub fn new(id: ActorId) -> Self {
        Self {
            id,
            policy: VisibilityPolicy::default(),
            allow_list: HashSet::new(),
            color: None,
            last_known_dimension: None,
            last_known_position: None,
            anchor: None,
            live_viewers: HashSet::new(),
            anchor_viewers: HashSet::new(),
        }
    }

    /// Admit `viewer`, forcing the policy to [`VisibilityPolicy::ExposeToList`]
    /// if it is not already.
    pub fn expose_to(&mut self, viewer: ActorId) {
        self.allow_list.insert(viewer);
        if self.policy != VisibilityPolicy::ExposeToList {
            self.policy = VisibilityPolicy::ExposeToList;
        }
    }

    /// Remove `viewer` from the allow list.
    ///
    /// The policy is left unchanged, so hiding one viewer while under
    /// [`VisibilityPolicy::ExposeToAll`] has no observable effect — a
    /// documented edge case, not silently corrected here.
    pub fn hide_from(&mut self, viewer: ActorId) {
        self.allow_list.remove(&viewer);
    }

    /// Switch to [`VisibilityPolicy::ExposeToAll`], clearing the allow list.
    pub fn expose_to_all(&mut self) {
        self.policy = VisibilityPolicy::ExposeToAll;
        self.allow_list.clear();
    }

    /// Switch to [`VisibilityPolicy::HideFromAll`], clearing the allow list.
    pub fn hide_from_all(&mut self) {
        self.policy = VisibilityPolicy::HideFromAll;
        self.allow_list.clear();
    }

    /// Place the anchor, replacing any existing one.
    pub fn set_anchor(&mut self, position: BlockPos, dimension: Dimension) {
        self.anchor = Some(Anchor {
            position,
            dimension,
        });
    }

    /// Remove the anchor, if any.
    pub fn clear_anchor(&mut self) {
        self.anchor = None;
    }

    /// Whether the base visibility policy admits `viewer`.
    ///
    /// Always false for the entity itself.
    pub fn is_visible_to(&self, viewer: ActorId) -> bool {
        if viewer == self.id {
            return false;
        }
        match self.policy {
            VisibilityPolicy::ExposeToAll => true,
            VisibilityPolicy::HideFromAll => false,
            VisibilityPolicy::ExposeToList => self.allow_list.contains(&viewer),
        }
    }

    /// Whether the live marker is admitted for `viewer`, given the entity's
    /// current stealth state and the global suppression switch.
    ///
    /// Stealth suppression applies only here: the anchor marker is a static
    /// record of a past position, not a live position leak, so its predicate
    /// uses [`is_visible_to`](Self::is_visible_to) directly.
    pub fn is_live_visible_to(
        &self,
        viewer: ActorId,
        stealthed: bool,
        stealth_suppression_enabled: bool,
    ) -> bool {
        if stealth_suppression_enabled && stealthed {
            return false;
        }
        self.is_visible_to(viewer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn actor(n: u128) -> ActorId {
        ActorId(Uuid::from_u128(n))
    }

    #[test]
    fn default_policy_exposes_to_all() {
        let record = TrackedRecord::new(actor(1));
        assert!(record.is_visible_to(actor(2)));
    }

    #[test]
    fn never_visible_to_self() {
        let mut record = TrackedRecord::new(actor(1));
        assert!(!record.is_visible_to(actor(1)));
        record.expose_to(actor(1));
        assert!(!record.is_visible_to(actor(1)));
    }

    #[test]
    fn expose_to_forces_list_policy() {
        let mut record = TrackedRecord::new(actor(1));
        record.expose_to(actor(2));
        assert_eq!(record.policy, VisibilityPolicy::ExposeToList);
        assert!(record.is_visible_to(actor(2)));
        assert!(!record.is_visible_to(actor(3)));
    }

    #[test]
    fn hide_from_keeps_policy() {
        let mut record = TrackedRecord::new(actor(1));
        record.expose_to(actor(2));
        record.hide_from(actor(2));
        assert_eq!(record.policy, VisibilityPolicy::ExposeToList);
        assert!(!record.allow_list.contains(&actor(2)));
        assert!(!record.is_visible_to(actor(2)));
    }

    #[test]
    fn hide_from_under_expose_to_all_is_a_no_op() {
        let mut record = TrackedRecord::new(actor(1));
        record.hide_from(actor(2));
        assert_eq!(record.policy, VisibilityPolicy::ExposeToAll);
        assert!(record.is_visible_to(actor(2)));
    }

    #[test]
    fn blanket_modes_clear_the_allow_list_idempotently() {
        let mut record = TrackedRecord::new(actor(1));
        record.expose_to(actor(2));
        record.expose_to_all();
        assert_eq!(record.policy, VisibilityPolicy::ExposeToAll);
        assert!(record.allow_list.is_empty());
        record.expose_to_all();
        assert_eq!(record.policy, VisibilityPolicy::ExposeToAll);
        assert!(record.allow_list.is_empty());

        record.hide_from_all();
        assert_eq!(record.policy, VisibilityPolicy::HideFromAll);
        assert!(!record.is_visible_to(actor(2)));
    }

    #[test]
    fn stealth_suppression_gates_live_only() {
        let record = TrackedRecord::new(actor(1));
        assert!(!record.is_live_visible_to(actor(2), true, true));
        assert!(record.is_live_visible_to(actor(2), true, false));
        assert!(record.is_live_visible_to(actor(2), false, true));
        // The base predicate is untouched by stealth.
        assert!(record.is_visible_to(actor(2)));
    }

    #[test]
    fn policy_names_round_trip() {
        for policy in [
            VisibilityPolicy::ExposeToAll,
            VisibilityPolicy::HideFromAll,
            VisibilityPolicy::ExposeToList,
        ] {
            assert_eq!(VisibilityPolicy::parse(policy.name()), Some(policy));
        }
        assert_eq!(VisibilityPolicy::parse("EXPOSE_TO_ALL"), None);
    }
}
