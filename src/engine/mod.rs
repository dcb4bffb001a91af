// Engine module - the agent locomotion core

pub mod agent;
pub mod animation;
pub mod assets;
pub mod components;
pub mod group;
pub mod manager;
pub mod path;
pub mod steering;

// Re-export commonly used items
pub use agent::AgentParams;
pub use components::*;
pub use group::{target_feed, Group, GroupConfig};
pub use manager::EntityManager;
pub use path::Path;
pub use steering::{Steering, SteeringBehavior, TargetRef};
