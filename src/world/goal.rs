//! Navigation goals.

use crate::types::{BlockPos, EntityId};

/// Where the navigator should take the bot
#[derive(Debug, Clone, PartialEq)]
pub enum Goal {
    /// Stand on this exact block
    Block(BlockPos),
    /// Within `range` of `pos`
    Near { pos: BlockPos, range: f64 },
    /// Close enough to reach and look at the block at `pos`
    LookAtBlock { pos: BlockPos, range: f64 },
    /// At this height
    Y(i32),
    All(Vec<Goal>),
    Any(Vec<Goal>),
    /// Keep within `range` of a moving entity
    Follow { entity: EntityId, range: f64 },
}

impl Goal {
    /// Whether standing at `at` satisfies the goal.
    ///
    /// `locate` resolves entity positions; a vanished entity never satisfies.
    pub fn is_satisfied<L>(&self, at: BlockPos, locate: &L) -> bool
    where
        L: Fn(EntityId) -> Option<BlockPos>,
    {
        match self {
            Goal::Block(pos) => at == *pos,
            Goal::Near { pos, range } => at.distance(pos) <= *range,
            Goal::LookAtBlock { pos, range } => at != *pos && at.distance(pos) <= *range,
            Goal::Y(y) => at.y == *y,
            Goal::All(goals) => goals.iter().all(|g| g.is_satisfied(at, locate)),
            Goal::Any(goals) => goals.iter().any(|g| g.is_satisfied(at, locate)),
            Goal::Follow { entity, range } => locate(*entity)
                .map(|pos| at.distance(&pos) <= *range)
                .unwrap_or(false),
        }
    }

    /// Position to head for from `at`, or `None` if the goal cannot be located
    pub fn heading<L>(&self, at: BlockPos, locate: &L) -> Option<BlockPos>
    where
        L: Fn(EntityId) -> Option<BlockPos>,
    {
        match self {
            Goal::Block(pos) | Goal::Near { pos, .. } | Goal::LookAtBlock { pos, .. } => {
                Some(*pos)
            }
            Goal::Y(y) => Some(BlockPos::new(at.x, *y, at.z)),
            // Work on the first unsatisfied constraint.
            Goal::All(goals) => goals
                .iter()
                .find(|g| !g.is_satisfied(at, locate))
                .or_else(|| goals.first())
                .and_then(|g| g.heading(at, locate)),
            Goal::Any(goals) => goals
                .iter()
                .filter_map(|g| g.heading(at, locate))
                .min_by(|a, b| at.distance(a).total_cmp(&at.distance(b))),
            Goal::Follow { entity, .. } => locate(*entity),
        }
    }

    /// Goal used to mine the block at `pos` without jumping
    pub fn mine_block(pos: BlockPos) -> Goal {
        Goal::All(vec![
            Goal::LookAtBlock { pos, range: 4.0 },
            Goal::Any(vec![Goal::Y(pos.y), Goal::Y(pos.y + 1)]),
        ])
    }
}
