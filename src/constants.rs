// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Constants for the BNO08x sensor driver.
//!
//! This module contains the protocol constants, report IDs, channel
//! definitions and fixed-point helpers used for communication with the
//! BNO08x sensor hub over I2C.

/// Buffer sizes
pub const PACKET_SEND_BUF_LEN: usize = 256;
pub const PACKET_RECV_BUF_LEN: usize = 1024;
pub const NUM_CHANNELS: usize = 6;

/// Default 7-bit I2C address (SA0 low)
pub const DEFAULT_I2C_ADDRESS: u8 = 0x4A;
/// Alternate 7-bit I2C address (SA0 high)
pub const ALTERNATE_I2C_ADDRESS: u8 = 0x4B;

// =============================================================================
// SHTP Communication Channels
// =============================================================================

/// The BNO08x supports six communication channels
pub const CHANNEL_COMMAND: u8 = 0;
/// Executable channel (reset / on / sleep)
pub const CHANNEL_EXECUTABLE: u8 = 1;
/// Sensor hub control channel
pub const CHANNEL_HUB_CONTROL: u8 = 2;
/// Input sensor reports (non-wake)
pub const CHANNEL_SENSOR_REPORTS: u8 = 3;
/// Wake input sensor reports
pub const CHANNEL_WAKE_REPORTS: u8 = 4;
/// Gyro-integrated rotation vector
pub const CHANNEL_GYRO_ROTATION: u8 = 5;

// =============================================================================
// Command Channel Responses
// =============================================================================

/// Advertisement response
pub const CMD_RESP_ADVERTISEMENT: u8 = 0;
/// Error list response
pub const CMD_RESP_ERROR_LIST: u8 = 1;

/// Advertisement TLV tag: channel assignment (channel byte + ASCII name)
pub const ADVERT_TAG_NORMAL_CHANNEL: u8 = 6;
/// Advertisement TLV tag: wake channel assignment
pub const ADVERT_TAG_WAKE_CHANNEL: u8 = 7;
/// Advertisement TLV tag: SHTP version string
pub const ADVERT_TAG_SHTP_VERSION: u8 = 0x80;

// =============================================================================
// Sensor Hub (SHUB) Protocol Constants
// =============================================================================

/// Command response
pub const SHUB_COMMAND_RESP: u8 = 0xF1;
/// Command request
pub const SHUB_COMMAND_REQ: u8 = 0xF2;
/// Report ID for Product ID response
pub const SHUB_PROD_ID_RESP: u8 = 0xF8;
/// Report ID for Product ID request
pub const SHUB_PROD_ID_REQ: u8 = 0xF9;
/// Timestamp rebase record (interleaved with input reports)
pub const SHUB_TIMESTAMP_REBASE: u8 = 0xFA;
/// Base timebase record at the front of an input report packet
pub const SHUB_BASE_TIMESTAMP: u8 = 0xFB;
/// Get feature response
pub const SHUB_GET_FEATURE_RESP: u8 = 0xFC;
/// Set feature command
pub const SHUB_REPORT_SET_FEATURE_CMD: u8 = 0xFD;
/// Get feature request
pub const SHUB_GET_FEATURE_REQ: u8 = 0xFE;

/// Byte length of a product ID response body
pub const PROD_ID_RESP_LEN: usize = 16;

// =============================================================================
// Sensor Report IDs (from SH2 Reference Manual)
// =============================================================================

/// Accelerometer (m/s^2 including gravity): Q point 8
pub const SENSOR_REPORTID_ACCELEROMETER: u8 = 0x01;
/// Gyroscope calibrated (rad/s): Q point 9
pub const SENSOR_REPORTID_GYROSCOPE: u8 = 0x02;
/// Magnetic field calibrated (uTesla): Q point 4
pub const SENSOR_REPORTID_MAGNETIC_FIELD: u8 = 0x03;
/// Linear acceleration (m/s^2 minus gravity): Q point 8
pub const SENSOR_REPORTID_LINEAR_ACCEL: u8 = 0x04;
/// Unit quaternion rotation vector, Q point 14, with heading accuracy (radians)
/// Q point 12
pub const SENSOR_REPORTID_ROTATION_VECTOR: u8 = 0x05;
/// Gravity vector: Q point 8
pub const SENSOR_REPORTID_GRAVITY: u8 = 0x06;
/// Gyroscope uncalibrated (rad/s) with bias estimates: Q point 9
pub const SENSOR_REPORTID_GYROSCOPE_UNCALIB: u8 = 0x07;
/// Game rotation vector (no magnetometer): Q point 12
pub const SENSOR_REPORTID_ROTATION_VECTOR_GAME: u8 = 0x08;
/// Geomagnetic rotation vector: Q point 14 for quaternion, Q point 12 for
/// heading accuracy
pub const SENSOR_REPORTID_ROTATION_VECTOR_GEOMAGNETIC: u8 = 0x09;
/// Pressure (hectopascals): Q point 20
pub const SENSOR_REPORTID_PRESSURE: u8 = 0x0A;
/// Ambient light (lux): Q point 8
pub const SENSOR_REPORTID_AMBIENT_LIGHT: u8 = 0x0B;
/// Relative humidity (percent): Q point 8
pub const SENSOR_REPORTID_HUMIDITY: u8 = 0x0C;
/// Proximity (centimeters): Q point 4
pub const SENSOR_REPORTID_PROXIMITY: u8 = 0x0D;
/// Temperature (degrees C): Q point 7
pub const SENSOR_REPORTID_TEMPERATURE: u8 = 0x0E;
/// Magnetic field uncalibrated (uTesla) with hard-iron bias: Q point 4
pub const SENSOR_REPORTID_MAGNETIC_FIELD_UNCALIB: u8 = 0x0F;
/// Tap detector flag byte
pub const SENSOR_REPORTID_TAP_DETECTOR: u8 = 0x10;
/// Step counter
pub const SENSOR_REPORTID_STEP_COUNTER: u8 = 0x11;
/// Significant motion detector
pub const SENSOR_REPORTID_SIGNIFICANT_MOTION: u8 = 0x12;
/// Stability classifier (on table / stationary / stable / motion)
pub const SENSOR_REPORTID_STABILITY_CLASSIFIER: u8 = 0x13;
/// Raw (unscaled) accelerometer ADC values
pub const SENSOR_REPORTID_RAW_ACCELEROMETER: u8 = 0x14;
/// Raw gyroscope ADC values with die temperature
pub const SENSOR_REPORTID_RAW_GYROSCOPE: u8 = 0x15;
/// Raw magnetometer ADC values
pub const SENSOR_REPORTID_RAW_MAGNETOMETER: u8 = 0x16;
/// Step detector
pub const SENSOR_REPORTID_STEP_DETECTOR: u8 = 0x18;
/// Shake detector
pub const SENSOR_REPORTID_SHAKE_DETECTOR: u8 = 0x19;
/// Flip detector
pub const SENSOR_REPORTID_FLIP_DETECTOR: u8 = 0x1A;
/// Pickup detector
pub const SENSOR_REPORTID_PICKUP_DETECTOR: u8 = 0x1B;
/// Stability detector
pub const SENSOR_REPORTID_STABILITY_DETECTOR: u8 = 0x1C;
/// Personal activity classifier
pub const SENSOR_REPORTID_PERSONAL_ACTIVITY: u8 = 0x1E;
/// Sleep detector
pub const SENSOR_REPORTID_SLEEP_DETECTOR: u8 = 0x1F;
/// Tilt detector
pub const SENSOR_REPORTID_TILT_DETECTOR: u8 = 0x20;
/// Pocket detector
pub const SENSOR_REPORTID_POCKET_DETECTOR: u8 = 0x21;
/// Circle detector
pub const SENSOR_REPORTID_CIRCLE_DETECTOR: u8 = 0x22;
/// Gyro-integrated rotation vector (delivered on its own channel)
pub const SENSOR_REPORTID_GYRO_INTEGRATED_RV: u8 = 0x2A;

// =============================================================================
// Executable/Device Channel Commands
// =============================================================================

/// Reset command
pub const EXECUTABLE_DEVICE_CMD_RESET: u8 = 1;
/// Reset complete response
pub const EXECUTABLE_DEVICE_RESP_RESET_COMPLETE: u8 = 1;

// =============================================================================
// Initialization Commands
// =============================================================================

/// Unsolicited flag
pub const SH2_INIT_UNSOLICITED: u8 = 0x80;
/// Initialize command
pub const SH2_CMD_INITIALIZE: u8 = 4;
/// System initialization subcommand
pub const SH2_INIT_SYSTEM: u8 = 1;
/// Startup initialization (unsolicited)
pub const SH2_STARTUP_INIT_UNSOLICITED: u8 = SH2_CMD_INITIALIZE | SH2_INIT_UNSOLICITED;

/// System initialize command body, sent on the hub control channel during
/// startup before any feature can be configured
pub const INITIALIZE_CMD_BODY: [u8; 13] = [
    SHUB_COMMAND_REQ,
    0, // command sequence
    SH2_CMD_INITIALIZE,
    SH2_INIT_SYSTEM,
    0,
    0,
    0,
    0,
    0,
    0,
    0,
    0,
    0,
];

// =============================================================================
// Helper Functions
// =============================================================================

/// Convert a signed Q-point fixed-point value to f32
#[inline]
pub fn q_to_f32(q_val: i16, q_point: u8) -> f32 {
    (q_val as f32) / ((1u32 << q_point) as f32)
}

/// Convert an unsigned 32-bit Q-point fixed-point value to f32
#[inline]
pub fn q_u32_to_f32(q_val: u32, q_point: u8) -> f32 {
    (q_val as f32) / ((1u32 << q_point) as f32)
}

/// Describe an SHTP error-list code reported on the command channel
pub fn shtp_error_str(code: u8) -> &'static str {
    match code {
        0 => "no error",
        1 => "hub exceeded maximum read cargo length",
        2 => "host write shorter than the 4-byte header",
        3 => "host wrote a length above the maximum write cargo length",
        4 => "host wrote a length not greater than the header length",
        5 => "host began a fragmented cargo, fragmentation not supported",
        6 => "host continued a fragmented cargo, fragmentation not supported",
        7 => "unrecognized command on the control channel",
        8 => "unrecognized parameter to get-advertisement",
        9 => "host wrote to an unrecognized channel",
        10 => "advertisement request while a response was pending",
        11 => "host write before the advertisement finished",
        12 => "error list truncated",
        _ => "unknown error code",
    }
}
