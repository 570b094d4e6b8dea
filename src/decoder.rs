// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Input report decoding.
//!
//! A sensor-report packet carries one or more fixed-length records, each
//! starting with a sensor ID byte. A compile-time table maps the ID to the
//! record length, the Q point of its fixed-point fields and the decoding
//! variant. The walker emits one [`SensorEvent`] per record until the
//! payload is exhausted.

use log::trace;

use crate::constants::{
    q_to_f32, q_u32_to_f32, SENSOR_REPORTID_ACCELEROMETER, SENSOR_REPORTID_AMBIENT_LIGHT,
    SENSOR_REPORTID_CIRCLE_DETECTOR, SENSOR_REPORTID_FLIP_DETECTOR, SENSOR_REPORTID_GRAVITY,
    SENSOR_REPORTID_GYROSCOPE, SENSOR_REPORTID_GYROSCOPE_UNCALIB,
    SENSOR_REPORTID_GYRO_INTEGRATED_RV, SENSOR_REPORTID_HUMIDITY, SENSOR_REPORTID_LINEAR_ACCEL,
    SENSOR_REPORTID_MAGNETIC_FIELD, SENSOR_REPORTID_MAGNETIC_FIELD_UNCALIB,
    SENSOR_REPORTID_PERSONAL_ACTIVITY, SENSOR_REPORTID_PICKUP_DETECTOR,
    SENSOR_REPORTID_POCKET_DETECTOR, SENSOR_REPORTID_PRESSURE, SENSOR_REPORTID_PROXIMITY,
    SENSOR_REPORTID_RAW_ACCELEROMETER, SENSOR_REPORTID_RAW_GYROSCOPE,
    SENSOR_REPORTID_RAW_MAGNETOMETER, SENSOR_REPORTID_ROTATION_VECTOR,
    SENSOR_REPORTID_ROTATION_VECTOR_GAME, SENSOR_REPORTID_ROTATION_VECTOR_GEOMAGNETIC,
    SENSOR_REPORTID_SHAKE_DETECTOR, SENSOR_REPORTID_SIGNIFICANT_MOTION,
    SENSOR_REPORTID_SLEEP_DETECTOR, SENSOR_REPORTID_STABILITY_CLASSIFIER,
    SENSOR_REPORTID_STABILITY_DETECTOR, SENSOR_REPORTID_STEP_COUNTER,
    SENSOR_REPORTID_STEP_DETECTOR, SENSOR_REPORTID_TAP_DETECTOR, SENSOR_REPORTID_TEMPERATURE,
    SENSOR_REPORTID_TILT_DETECTOR, SHUB_BASE_TIMESTAMP, SHUB_TIMESTAMP_REBASE,
};
use crate::events::{
    ActivityClassification, EventQueue, GyroIntegratedRotation, RawVector3, RotationVector,
    SensorEvent, SensorValue, UncalibratedVector3, Vector3,
};

/// Byte offset of the first data field in a standard report record
/// (sensor ID, sequence, status, delay)
const RECORD_DATA_OFFSET: usize = 4;

/// Length of a timebase record (0xFB base delta or 0xFA rebase)
const TIMEBASE_RECORD_LEN: usize = 5;

/// Angular velocity Q point in the gyro-integrated rotation record
const ANGULAR_VELOCITY_Q: u8 = 10;

#[inline]
pub(crate) fn i16_at(bytes: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

#[inline]
pub(crate) fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

#[inline]
pub(crate) fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// How a record's data fields are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportKind {
    Unsupported,
    /// Three signed 16-bit components scaled by 2^-q
    Vector3,
    /// Three components plus three bias estimates, all scaled by 2^-q
    Uncalibrated,
    /// Three unscaled i16 components and a 32-bit timestamp
    Raw { has_temperature: bool },
    /// Four quaternion components scaled by 2^-q, optional accuracy at 2^-q2
    Rotation { has_accuracy: bool },
    /// Unsigned 32-bit value scaled by 2^-q
    ScalarU32,
    /// Unsigned 16-bit value scaled by 2^-q
    ScalarU16,
    /// Signed 16-bit value scaled by 2^-q
    ScalarI16,
    /// Tap flag byte
    Tap,
    StepCounter,
    StepDetector,
    /// Unsigned 16-bit detector state
    DetectorU16,
    /// Single-byte detector state
    DetectorU8,
    /// Personal activity classifier page
    Activity,
}

/// Per-sensor decoding parameters
#[derive(Debug, Clone, Copy)]
struct ReportInfo {
    /// Total record length including the 4-byte common prefix
    length: usize,
    /// Q point for the primary data fields
    q: u8,
    /// Q point for the accuracy field, when present
    q2: u8,
    kind: ReportKind,
}

const REPORT_TABLE_LEN: usize = 0x40;

const fn entry(length: usize, q: u8, q2: u8, kind: ReportKind) -> ReportInfo {
    ReportInfo {
        length,
        q,
        q2,
        kind,
    }
}

const fn build_report_table() -> [ReportInfo; REPORT_TABLE_LEN] {
    let mut t = [entry(0, 0, 0, ReportKind::Unsupported); REPORT_TABLE_LEN];
    t[SENSOR_REPORTID_ACCELEROMETER as usize] = entry(10, 8, 0, ReportKind::Vector3);
    t[SENSOR_REPORTID_GYROSCOPE as usize] = entry(10, 9, 0, ReportKind::Vector3);
    t[SENSOR_REPORTID_MAGNETIC_FIELD as usize] = entry(10, 4, 0, ReportKind::Vector3);
    t[SENSOR_REPORTID_LINEAR_ACCEL as usize] = entry(10, 8, 0, ReportKind::Vector3);
    t[SENSOR_REPORTID_ROTATION_VECTOR as usize] =
        entry(14, 14, 12, ReportKind::Rotation { has_accuracy: true });
    t[SENSOR_REPORTID_GRAVITY as usize] = entry(10, 8, 0, ReportKind::Vector3);
    t[SENSOR_REPORTID_GYROSCOPE_UNCALIB as usize] = entry(16, 9, 0, ReportKind::Uncalibrated);
    t[SENSOR_REPORTID_ROTATION_VECTOR_GAME as usize] = entry(
        12,
        12,
        0,
        ReportKind::Rotation {
            has_accuracy: false,
        },
    );
    t[SENSOR_REPORTID_ROTATION_VECTOR_GEOMAGNETIC as usize] =
        entry(14, 14, 12, ReportKind::Rotation { has_accuracy: true });
    t[SENSOR_REPORTID_PRESSURE as usize] = entry(8, 20, 0, ReportKind::ScalarU32);
    t[SENSOR_REPORTID_AMBIENT_LIGHT as usize] = entry(8, 8, 0, ReportKind::ScalarU32);
    t[SENSOR_REPORTID_HUMIDITY as usize] = entry(6, 8, 0, ReportKind::ScalarU16);
    t[SENSOR_REPORTID_PROXIMITY as usize] = entry(6, 4, 0, ReportKind::ScalarU16);
    t[SENSOR_REPORTID_TEMPERATURE as usize] = entry(6, 7, 0, ReportKind::ScalarI16);
    t[SENSOR_REPORTID_MAGNETIC_FIELD_UNCALIB as usize] = entry(16, 4, 0, ReportKind::Uncalibrated);
    t[SENSOR_REPORTID_TAP_DETECTOR as usize] = entry(5, 0, 0, ReportKind::Tap);
    t[SENSOR_REPORTID_STEP_COUNTER as usize] = entry(12, 0, 0, ReportKind::StepCounter);
    t[SENSOR_REPORTID_SIGNIFICANT_MOTION as usize] = entry(6, 0, 0, ReportKind::DetectorU16);
    t[SENSOR_REPORTID_STABILITY_CLASSIFIER as usize] = entry(6, 0, 0, ReportKind::DetectorU8);
    t[SENSOR_REPORTID_RAW_ACCELEROMETER as usize] = entry(
        16,
        0,
        0,
        ReportKind::Raw {
            has_temperature: false,
        },
    );
    t[SENSOR_REPORTID_RAW_GYROSCOPE as usize] = entry(
        16,
        0,
        0,
        ReportKind::Raw {
            has_temperature: true,
        },
    );
    t[SENSOR_REPORTID_RAW_MAGNETOMETER as usize] = entry(
        16,
        0,
        0,
        ReportKind::Raw {
            has_temperature: false,
        },
    );
    t[SENSOR_REPORTID_STEP_DETECTOR as usize] = entry(8, 0, 0, ReportKind::StepDetector);
    t[SENSOR_REPORTID_SHAKE_DETECTOR as usize] = entry(6, 0, 0, ReportKind::DetectorU16);
    t[SENSOR_REPORTID_FLIP_DETECTOR as usize] = entry(6, 0, 0, ReportKind::DetectorU16);
    t[SENSOR_REPORTID_PICKUP_DETECTOR as usize] = entry(8, 0, 0, ReportKind::DetectorU16);
    t[SENSOR_REPORTID_STABILITY_DETECTOR as usize] = entry(6, 0, 0, ReportKind::DetectorU16);
    t[SENSOR_REPORTID_PERSONAL_ACTIVITY as usize] = entry(16, 0, 0, ReportKind::Activity);
    t[SENSOR_REPORTID_SLEEP_DETECTOR as usize] = entry(6, 0, 0, ReportKind::DetectorU8);
    t[SENSOR_REPORTID_TILT_DETECTOR as usize] = entry(6, 0, 0, ReportKind::DetectorU16);
    t[SENSOR_REPORTID_POCKET_DETECTOR as usize] = entry(6, 0, 0, ReportKind::DetectorU16);
    t[SENSOR_REPORTID_CIRCLE_DETECTOR as usize] = entry(6, 0, 0, ReportKind::DetectorU16);
    t
}

/// Sensor ID to decoding parameters, dense so lookup is a bounds check away
static REPORT_TABLE: [ReportInfo; REPORT_TABLE_LEN] = build_report_table();

fn report_info(sensor_id: u8) -> &'static ReportInfo {
    static UNSUPPORTED: ReportInfo = entry(0, 0, 0, ReportKind::Unsupported);
    REPORT_TABLE.get(sensor_id as usize).unwrap_or(&UNSUPPORTED)
}

/// Total record length for a sensor ID, zero when the sensor is unknown
pub fn report_length(sensor_id: u8) -> usize {
    report_info(sensor_id).length
}

/// Walk a sensor-report payload (SHTP header already stripped) and enqueue
/// one event per record.
///
/// Timebase records are skipped. An unknown sensor ID skips a single byte
/// to attempt re-synchronization; a record truncated by the packet boundary
/// ends the walk.
pub(crate) fn decode_sensor_reports(payload: &[u8], queue: &mut EventQueue) {
    let mut cursor = 0;
    while cursor < payload.len() {
        let sensor_id = payload[cursor];
        if sensor_id == SHUB_BASE_TIMESTAMP || sensor_id == SHUB_TIMESTAMP_REBASE {
            if payload.len() - cursor < TIMEBASE_RECORD_LEN {
                return;
            }
            cursor += TIMEBASE_RECORD_LEN;
            continue;
        }
        let info = report_info(sensor_id);
        if info.kind == ReportKind::Unsupported {
            trace!("unsupported sensor id 0x{:02X}, resyncing", sensor_id);
            cursor += 1;
            continue;
        }
        if payload.len() - cursor < info.length {
            trace!(
                "truncated record for sensor 0x{:02X}: {} of {} bytes",
                sensor_id,
                payload.len() - cursor,
                info.length
            );
            return;
        }
        let record = &payload[cursor..cursor + info.length];
        queue.push(decode_record(info, record));
        cursor += info.length;
    }
}

/// Decode one length-checked record into an event
fn decode_record(info: &ReportInfo, record: &[u8]) -> SensorEvent {
    let d = RECORD_DATA_OFFSET;
    let value = match info.kind {
        ReportKind::Vector3 => SensorValue::Vector(Vector3 {
            x: q_to_f32(i16_at(record, d), info.q),
            y: q_to_f32(i16_at(record, d + 2), info.q),
            z: q_to_f32(i16_at(record, d + 4), info.q),
        }),
        ReportKind::Uncalibrated => SensorValue::Uncalibrated(UncalibratedVector3 {
            x: q_to_f32(i16_at(record, d), info.q),
            y: q_to_f32(i16_at(record, d + 2), info.q),
            z: q_to_f32(i16_at(record, d + 4), info.q),
            bias_x: q_to_f32(i16_at(record, d + 6), info.q),
            bias_y: q_to_f32(i16_at(record, d + 8), info.q),
            bias_z: q_to_f32(i16_at(record, d + 10), info.q),
        }),
        ReportKind::Raw { has_temperature } => SensorValue::Raw(RawVector3 {
            x: i16_at(record, d),
            y: i16_at(record, d + 2),
            z: i16_at(record, d + 4),
            temperature: has_temperature.then(|| i16_at(record, d + 6)),
            timestamp: u32_at(record, d + 8),
        }),
        ReportKind::Rotation { has_accuracy } => SensorValue::Rotation(RotationVector {
            i: q_to_f32(i16_at(record, d), info.q),
            j: q_to_f32(i16_at(record, d + 2), info.q),
            k: q_to_f32(i16_at(record, d + 4), info.q),
            real: q_to_f32(i16_at(record, d + 6), info.q),
            accuracy: has_accuracy.then(|| q_to_f32(i16_at(record, d + 8), info.q2)),
        }),
        ReportKind::ScalarU32 => SensorValue::Scalar(q_u32_to_f32(u32_at(record, d), info.q)),
        ReportKind::ScalarU16 => {
            SensorValue::Scalar(q_u32_to_f32(u16_at(record, d) as u32, info.q))
        }
        ReportKind::ScalarI16 => SensorValue::Scalar(q_to_f32(i16_at(record, d), info.q)),
        ReportKind::Tap => SensorValue::Tap { flags: record[d] },
        ReportKind::StepCounter => SensorValue::StepCounter {
            count: u16_at(record, d + 4) as u32,
            latency: latency_ms(u32_at(record, d)),
        },
        ReportKind::StepDetector => SensorValue::StepDetector {
            latency: latency_ms(u32_at(record, d)),
        },
        ReportKind::DetectorU16 => SensorValue::Detector(u16_at(record, d)),
        ReportKind::DetectorU8 => SensorValue::Detector(record[d] as u16),
        ReportKind::Activity => SensorValue::Activity(ActivityClassification {
            page: record[d],
            most_likely_state: record[d + 1],
            confidence: record[d + 2..d + 12].try_into().unwrap_or([0; 10]),
        }),
        // Filtered out before dispatch
        ReportKind::Unsupported => unreachable!(),
    };
    SensorEvent {
        sensor_id: record[0],
        sequence: record[1],
        status: record[2],
        value,
    }
}

/// Hub latency fields are microseconds; events report milliseconds
fn latency_ms(latency_us: u32) -> u16 {
    (latency_us / 1000).min(u16::MAX as u32) as u16
}

/// Decode a gyro-integrated rotation record.
///
/// These arrive on their own channel without the common report prefix:
/// four Q14 quaternion components followed by three Q10 angular rates.
pub(crate) fn decode_gyro_integrated_rotation(payload: &[u8]) -> Option<SensorEvent> {
    if payload.len() < 14 {
        trace!("short gyro-integrated record: {} bytes", payload.len());
        return None;
    }
    Some(SensorEvent {
        sensor_id: SENSOR_REPORTID_GYRO_INTEGRATED_RV,
        sequence: 0,
        status: 0,
        value: SensorValue::GyroRotation(GyroIntegratedRotation {
            i: q_to_f32(i16_at(payload, 0), 14),
            j: q_to_f32(i16_at(payload, 2), 14),
            k: q_to_f32(i16_at(payload, 4), 14),
            real: q_to_f32(i16_at(payload, 6), 14),
            x_rate: q_to_f32(i16_at(payload, 8), ANGULAR_VELOCITY_Q),
            y_rate: q_to_f32(i16_at(payload, 10), ANGULAR_VELOCITY_Q),
            z_rate: q_to_f32(i16_at(payload, 12), ANGULAR_VELOCITY_Q),
        }),
    })
}
