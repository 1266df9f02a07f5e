//! Test doubles and scenario worlds shared by the daemon's test suites.

mod config_loader;
mod helpers;
mod provider;
mod reporter;
mod sink;
mod world;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use helpers::{FixedDirectory, ScriptedHelper};
pub use provider::ScriptedProvider;
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use sink::RecordingSink;
pub use world::{TestWorld, world};
