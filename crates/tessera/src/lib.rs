//! # Tessera
//!
//! Fixed-timestep world simulation runtime built on [`tessera_core`].
//!
//! - [`World`]: entities, a spatial index, a deferred command queue and an
//!   event bus, advanced one step at a time
//! - [`TickLoop`]: paces callbacks and converts elapsed time into steps,
//!   capped so an overloaded host never spirals
//! - [`LoopDriver`]: runs a tick loop and its handler on a dedicated thread
//! - [`EngineConfig`]: TOML configuration for all of the above
//!
//! ## Example
//!
//! ```rust
//! use tessera::{ManualClock, TickLoop, TickLoopConfig, World};
//! use tessera_core::{Entity, SpatialConfig};
//!
//! let mut world = World::new(&SpatialConfig::default());
//! let id = world.spawn(Entity::tile(0, [10.0, 10.0]));
//!
//! let clock = ManualClock::starting_at(0.0);
//! let mut tick_loop = TickLoop::new(TickLoopConfig::default());
//! tick_loop.start(&clock);
//! tick_loop.fire(&mut world, &clock); // warm-up
//!
//! clock.advance(100.0);
//! tick_loop.fire_at(150.0, &mut world, &clock);
//! assert_eq!(world.steps(), 2);
//! assert_eq!(world.at([10.0, 10.0], 0.0), vec![id]);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod tick_loop;
pub mod world;

pub use config::EngineConfig;
pub use driver::{LoopDriver, LoopHandle};
pub use error::{ConfigError, ConfigResult, DriverError, DriverResult};
pub use events::{
    EmitOutcome, EmitReceipt, Emission, EventBus, EventEmitter, EventPayload, ListenerId,
    Responder, UnresolvedQueue,
};
pub use tick_loop::{
    CallbackKind, Clock, ClockOutcome, Hooks, LoopState, ManualClock, PendingCallback,
    Performance, SystemClock, TickHandler, TickLoop, TickLoopConfig,
};
pub use world::{Command, World};

pub use tessera_core;
