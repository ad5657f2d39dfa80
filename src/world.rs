//! World collaborator
//!
//! Narrow capability traits the agent drives (game connection, navigation
//! engine) plus a deterministic in-memory world that implements them.

pub mod contract;
pub mod goal;
pub mod movements;
pub mod sim;

pub use contract::{
    AutoEatOptions, BlockFilter, BlockQuery, GameConnection, HarvestTool, Navigator, WorldEvent,
};
pub use goal::Goal;
pub use movements::{Movements, MovementsSettings};
pub use sim::SimulatedWorld;
