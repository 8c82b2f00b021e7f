mod driver;
pub mod events;
pub mod room;
pub mod signal;
pub mod student;
pub mod ta;
pub mod timing;
pub use driver::{Simulation, SimulationReport};
pub use events::SimEvent;
pub use room::{RoomSnapshot, SeatOutcome, WaitingRoom};
pub use student::Student;
pub use timing::{DelayRange, Timing};
