//! Actor, dimension, and marker identifiers.
//!
//! Marker identifiers are derived, not allocated: [`MarkerId::derive`] is a
//! pure function of the actor id and the marker purpose, so repeated ticks
//! and process restarts address the same remote marker object.

use std::fmt;

use uuid::Uuid;

/// Identifies a party in the tracking system.
///
/// The same id space covers both roles: a tracked entity whose position is
/// shown to others, and a viewer that may be shown markers. A single actor
/// commonly plays both roles, and the self-visibility rule ("an entity is
/// never visible to itself") compares the two directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(pub Uuid);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ActorId {
    fn from(v: Uuid) -> Self {
        Self(v)
    }
}

/// Name of a dimension (world) an actor can occupy.
///
/// Dimensions are opaque to the engine: it only compares names for equality
/// and asks the host whether a persisted name still resolves.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dimension(pub String);

impl Dimension {
    /// The dimension name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Dimension {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

impl From<String> for Dimension {
    fn from(v: String) -> Self {
        Self(v)
    }
}

/// Which of an actor's two markers an identifier addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MarkerPurpose {
    /// The live marker following the actor's current position.
    Live,
    /// The static anchor marker left at a departed dimension.
    Anchor,
}

impl MarkerPurpose {
    /// Stable tag mixed into the identifier derivation.
    fn tag(self) -> &'static str {
        match self {
            Self::Live => "waypost_live",
            Self::Anchor => "waypost_anchor",
        }
    }
}

/// Namespace for name-based marker id derivation. Fixed forever: changing it
/// would orphan every marker created by an earlier build.
const MARKER_NAMESPACE: Uuid = Uuid::from_bytes([
    0x9c, 0x1f, 0x4b, 0x2e, 0x7a, 0x5d, 0x4e, 0x06, 0x8b, 0x3a, 0x61, 0x2c, 0xd0, 0x94, 0x5f, 0x18,
]);

/// Identifier of a remote marker object.
///
/// Derived deterministically from `(actor, purpose)` — never regenerated,
/// never reused across purposes. A marker removed and later re-created
/// therefore addresses the same remote object.
///
/// # Examples
///
/// ```
/// use waypost_core::id::{ActorId, MarkerId, MarkerPurpose};
/// use uuid::Uuid;
///
/// let actor = ActorId(Uuid::from_u128(7));
/// let live = MarkerId::derive(actor, MarkerPurpose::Live);
///
/// // Stable across calls, distinct across purposes.
/// assert_eq!(live, MarkerId::derive(actor, MarkerPurpose::Live));
/// assert_ne!(live, MarkerId::derive(actor, MarkerPurpose::Anchor));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub Uuid);

impl MarkerId {
    /// Derive the marker id for `actor`'s marker with the given purpose.
    ///
    /// A v5 (name-based) UUID over a fixed namespace and the string
    /// `"<tag>:<actor>"`, giving a 128-bit content hash.
    pub fn derive(actor: ActorId, purpose: MarkerPurpose) -> Self {
        let name = format!("{}:{}", purpose.tag(), actor.0);
        Self(Uuid::new_v5(&MARKER_NAMESPACE, name.as_bytes()))
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn derivation_is_stable() {
        let actor = ActorId(Uuid::from_u128(0xDEADBEEF));
        let a = MarkerId::derive(actor, MarkerPurpose::Live);
        let b = MarkerId::derive(actor, MarkerPurpose::Live);
        assert_eq!(a, b);
    }

    #[test]
    fn purposes_never_collide() {
        let actor = ActorId(Uuid::from_u128(1));
        assert_ne!(
            MarkerId::derive(actor, MarkerPurpose::Live),
            MarkerId::derive(actor, MarkerPurpose::Anchor),
        );
    }

    #[test]
    fn distinct_actors_get_distinct_markers() {
        let a = MarkerId::derive(ActorId(Uuid::from_u128(1)), MarkerPurpose::Live);
        let b = MarkerId::derive(ActorId(Uuid::from_u128(2)), MarkerPurpose::Live);
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn derive_is_pure(hi in any::<u64>(), lo in any::<u64>()) {
            let actor = ActorId(Uuid::from_u64_pair(hi, lo));
            for purpose in [MarkerPurpose::Live, MarkerPurpose::Anchor] {
                prop_assert_eq!(
                    MarkerId::derive(actor, purpose),
                    MarkerId::derive(actor, purpose)
                );
            }
            prop_assert_ne!(
                MarkerId::derive(actor, MarkerPurpose::Live),
                MarkerId::derive(actor, MarkerPurpose::Anchor)
            );
        }
    }
}
