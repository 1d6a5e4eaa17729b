//! Mirror layout: copy positions another visualization already committed.

use std::fmt;
use std::sync::Arc;

use crate::element::{ElementId, ElementView};
use crate::vector::Vector2;
use crate::PositionMap;

/// Read access to positions some other visualization has committed.
pub trait PositionSource: Send + Sync {
    /// World position of `id` in the source, if it knows the element.
    fn position_of(&self, id: ElementId) -> Option<Vector2>;
}

impl PositionSource for PositionMap {
    fn position_of(&self, id: ElementId) -> Option<Vector2> {
        self.get(&id).copied()
    }
}

/// Layout that runs no physics and keeps no state: every element the source
/// knows is placed exactly where the source has it.
#[derive(Clone)]
pub struct MirrorLayout {
    source: Arc<dyn PositionSource>,
}

impl MirrorLayout {
    pub fn new(source: Arc<dyn PositionSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn PositionSource> {
        &self.source
    }

    /// Positions for the subject-to-layout elements of `placeable` that the
    /// source knows. Pinned and unknown elements are left out.
    pub fn mirror<'a>(
        &self,
        placeable: impl Iterator<Item = (ElementId, &'a ElementView)>,
    ) -> PositionMap {
        placeable
            .filter(|(_, view)| view.subject_to_layout)
            .filter_map(|(id, _)| self.source.position_of(id).map(|position| (id, position)))
            .collect()
    }
}

impl fmt::Debug for MirrorLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MirrorLayout").finish_non_exhaustive()
    }
}
