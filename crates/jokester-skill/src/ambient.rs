//! Ambient "fidgeting": random head, arm and LED commands.
//!
//! Each generator draws every parameter uniformly from a half-open range.

use std::ops::Range;

use jokester_types::{AngularUnit, RobotCommand, Rgb};
use rand::Rng;

pub const HEAD_PITCH: Range<i16> = -20..15;
pub const HEAD_ROLL: Range<i16> = -30..30;
pub const HEAD_YAW: Range<i16> = -60..60;
pub const HEAD_VELOCITY: Range<u8> = 10..75;
pub const ARM_POSITION: Range<i16> = -90..90;
pub const ARM_VELOCITY: Range<u8> = 10..90;

/// A random head pose, in degrees.
pub fn random_head_motion<R: Rng + ?Sized>(rng: &mut R) -> RobotCommand {
    RobotCommand::MoveHead {
        pitch: rng.gen_range(HEAD_PITCH),
        roll: rng.gen_range(HEAD_ROLL),
        yaw: rng.gen_range(HEAD_YAW),
        velocity: rng.gen_range(HEAD_VELOCITY),
        unit: AngularUnit::Degrees,
    }
}

/// Random positions and speeds for both arms, in degrees.
pub fn random_arm_motion<R: Rng + ?Sized>(rng: &mut R) -> RobotCommand {
    RobotCommand::MoveArms {
        left_position: rng.gen_range(ARM_POSITION),
        right_position: rng.gen_range(ARM_POSITION),
        left_velocity: rng.gen_range(ARM_VELOCITY),
        right_velocity: rng.gen_range(ARM_VELOCITY),
        unit: AngularUnit::Degrees,
    }
}

/// A random LED color; every channel covers the full 0..=255 range.
pub fn random_led<R: Rng + ?Sized>(rng: &mut R) -> RobotCommand {
    RobotCommand::ChangeLed(Rgb::new(rng.r#gen(), rng.r#gen(), rng.r#gen()))
}
