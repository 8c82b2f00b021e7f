//! Sleeping TA simulation.
//!
//! One TA helps students one at a time. Students wait in a room with a fixed
//! number of chairs, come back later when it is full, and leave once helped.

pub mod config;
pub mod error;
pub mod logging;
pub mod sim;

pub use config::Config;
pub use error::{Result, SimError};
pub use sim::{Simulation, SimulationReport};
