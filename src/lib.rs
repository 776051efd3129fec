mod config;
mod entity;
pub mod format;
pub mod handler;
mod record;
mod runtime;
pub mod schedule;
pub mod sink;
pub mod upstream;

pub use config::{Config, ConfigError, Provider};
pub use entity::{EntityError, EntityId, IdKind};
pub use record::{FlightSummary, Record, StateVector};
pub use runtime::{BotRuntime, DedupStore};
