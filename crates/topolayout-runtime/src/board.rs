//! Committed positions shared between visualizations.

use std::sync::{Arc, PoisonError, RwLock};

use topolayout_core::{ElementId, PositionMap, PositionSource, Vector2};

/// Thread-safe store of the positions one visualization has committed.
///
/// Clones share the same store. A board is the [`PositionSource`] behind a
/// mirror layout: the leading visualization publishes into it after each
/// applied pass and the mirrored one copies from it.
#[derive(Debug, Clone, Default)]
pub struct PositionBoard {
    positions: Arc<RwLock<PositionMap>>,
}

impl PositionBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the board's contents.
    pub fn publish(&self, positions: PositionMap) {
        *self.positions.write().unwrap_or_else(PoisonError::into_inner) = positions;
    }

    /// Record a single position, keeping the rest.
    pub fn record(&self, id: ElementId, position: Vector2) {
        self.positions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, position);
    }

    pub fn len(&self) -> usize {
        self.positions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PositionSource for PositionBoard {
    fn position_of(&self, id: ElementId) -> Option<Vector2> {
        self.positions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_contents() {
        let board = PositionBoard::new();
        let reader = board.clone();
        board.record(ElementId(1), Vector2::new(3.0, 4.0));
        assert_eq!(reader.position_of(ElementId(1)), Some(Vector2::new(3.0, 4.0)));

        board.publish(PositionMap::new());
        assert!(reader.is_empty());
    }
}
