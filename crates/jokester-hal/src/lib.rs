//! `jokester-hal` – the robot command seam.
//!
//! # Modules
//!
//! - [`sink`] – [`RobotCommandSink`][sink::RobotCommandSink]: the trait every
//!   robot connection implements.  The skill only ever talks to this trait, so
//!   a physical robot, a host-provided messenger, or the simulator can be
//!   swapped without touching behavior logic.
//! - [`sim`] – [`SimRobot`][sim::SimRobot]: an in-process robot that records
//!   every command it receives, for headless tests and the CLI.

pub mod sim;
pub mod sink;

pub use sim::{SimRobot, SimRobotBuilder};
pub use sink::RobotCommandSink;
