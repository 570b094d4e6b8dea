// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! # BNO08x IMU Driver (I2C)
//!
//! A Rust userspace driver for the BNO08x family of 9-axis IMU sensors
//! from Bosch/Hillcrest Labs, attached over I2C.
//!
//! ## Overview
//!
//! The BNO08x is a System-in-Package (SiP) that integrates:
//! - Triaxial 14-bit accelerometer
//! - Triaxial 16-bit gyroscope
//! - Triaxial geomagnetic sensor
//! - 32-bit microcontroller running sensor fusion firmware
//!
//! This crate speaks the SHTP (Sensor Hub Transport Protocol) framing over
//! the I2C bus, drives the sensor hub control dialogue, and decodes input
//! reports into typed [`SensorEvent`]s delivered through a driver-owned
//! queue.
//!
//! ## Features
//!
//! - **Sensor Fusion**: Rotation vectors (absolute, game, geomagnetic),
//!   gyro-integrated rotation
//! - **Motion Sensors**: Accelerometer, gyroscope, magnetometer, raw and
//!   uncalibrated variants, linear acceleration, gravity
//! - **Environment**: Pressure, ambient light, humidity, proximity,
//!   temperature
//! - **Activity**: Tap, step, shake, stability, personal activity
//!   classifier and the other hub detectors
//! - **Polling Model**: No threads, no interrupts; the caller's loop drives
//!   [`Bno08x::get_sensor_event`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use bno08x_i2c::{Bno08x, Config, I2cBus, SENSOR_REPORTID_ACCELEROMETER};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = I2cBus::open("/dev/i2c-1", 0x4A)?;
//!     let mut imu = Bno08x::new(bus);
//!
//!     imu.configure(Config::default()).expect("configure failed");
//!     imu.enable_report(SENSOR_REPORTID_ACCELEROMETER, 10_000)
//!         .expect("enable failed"); // 100 Hz
//!
//!     loop {
//!         if let Some(event) = imu.get_sensor_event() {
//!             if let Some(v) = event.vector() {
//!                 println!("accel: {} {} {} m/s^2", v.x, v.y, v.z);
//!             }
//!         }
//!         std::thread::sleep(std::time::Duration::from_millis(10));
//!     }
//! }
//! ```
//!
//! ## Sensor Reports
//!
//! Enable specific sensor reports using their report ID constants:
//!
//! | Report | Constant | Event value | Units |
//! |--------|----------|-------------|-------|
//! | Accelerometer | [`SENSOR_REPORTID_ACCELEROMETER`] | [`Vector3`] | m/s² |
//! | Gyroscope | [`SENSOR_REPORTID_GYROSCOPE`] | [`Vector3`] | rad/s |
//! | Magnetometer | [`SENSOR_REPORTID_MAGNETIC_FIELD`] | [`Vector3`] | µT |
//! | Rotation Vector | [`SENSOR_REPORTID_ROTATION_VECTOR`] | [`RotationVector`] | quaternion |
//! | Game Rotation | [`SENSOR_REPORTID_ROTATION_VECTOR_GAME`] | [`RotationVector`] | quaternion |
//! | Linear Acceleration | [`SENSOR_REPORTID_LINEAR_ACCEL`] | [`Vector3`] | m/s² |
//! | Gravity | [`SENSOR_REPORTID_GRAVITY`] | [`Vector3`] | m/s² |
//! | Step Counter | [`SENSOR_REPORTID_STEP_COUNTER`] | count + latency | steps |
//!
//! The full set, including the environmental sensors and activity
//! detectors, is listed in [`constants`].
//!
//! ## Hardware Requirements
//!
//! - Linux with I2C (`/dev/i2c-*`) support
//! - BNO08x sensor wired for I2C (address 0x4A, or 0x4B with SA0 high)
//! - Optionally a GPIO wired to RSTN for hardware reset

pub mod constants;
pub mod decoder;
pub mod driver;
pub mod events;
pub mod interface;

// Re-export main driver types at crate root for convenience
pub use constants::{
    ALTERNATE_I2C_ADDRESS, DEFAULT_I2C_ADDRESS, SENSOR_REPORTID_ACCELEROMETER,
    SENSOR_REPORTID_GRAVITY, SENSOR_REPORTID_GYROSCOPE, SENSOR_REPORTID_GYROSCOPE_UNCALIB,
    SENSOR_REPORTID_LINEAR_ACCEL, SENSOR_REPORTID_MAGNETIC_FIELD,
    SENSOR_REPORTID_MAGNETIC_FIELD_UNCALIB, SENSOR_REPORTID_ROTATION_VECTOR,
    SENSOR_REPORTID_ROTATION_VECTOR_GAME, SENSOR_REPORTID_ROTATION_VECTOR_GEOMAGNETIC,
    SENSOR_REPORTID_STEP_COUNTER, SENSOR_REPORTID_TAP_DETECTOR,
};
pub use driver::{Bno08x, Config, DriverError, ProductIdEntry, ProductIds};
pub use events::{
    ActivityClassification, GyroIntegratedRotation, RawVector3, RotationVector, SensorEvent,
    SensorValue, UncalibratedVector3, Vector3,
};
pub use interface::{GpiodOut, I2cBus, NoResetPin, OutputPin, SensorBus};

/// Driver-level errors
#[derive(Debug)]
pub enum Error<CommE, PinE> {
    /// Bus I/O failure (NACK, timeout, arbitration loss)
    Transport(CommE),
    /// Reset line could not be driven
    Pin(PinE),
    /// The startup sequence gave up; the driver is unusable until a later
    /// `configure` succeeds
    Configuration(ConfigFailure),
}

/// Why configuration gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFailure {
    /// Soft reset kept failing on the bus after the retry budget
    SoftResetFailed,
    /// The hub never answered the product ID request
    NoProductId,
}
