// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{io, thread, time::Duration};

use bno08x_i2c::{
    Bno08x, Config, I2cBus, SensorValue, SENSOR_REPORTID_ACCELEROMETER,
    SENSOR_REPORTID_ROTATION_VECTOR,
};

fn main() -> io::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/i2c-1".to_string());

    let bus = I2cBus::open(&path, bno08x_i2c::DEFAULT_I2C_ADDRESS)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("{:?}", e)))?;
    let mut imu = Bno08x::new(bus);

    imu.configure(Config::default())
        .unwrap_or_else(|e| panic!("configure failed: {:?}", e));

    let prod = imu.product_ids();
    for entry in &prod.entries[..prod.num_entries as usize] {
        println!(
            "part {}: {}.{}.{} build {}",
            entry.part_number,
            entry.version_major,
            entry.version_minor,
            entry.version_patch,
            entry.build_number
        );
    }

    // 100 Hz for both reports
    imu.enable_report(SENSOR_REPORTID_ROTATION_VECTOR, 10_000)
        .unwrap_or_else(|e| panic!("enable rotation failed: {:?}", e));
    imu.enable_report(SENSOR_REPORTID_ACCELEROMETER, 10_000)
        .unwrap_or_else(|e| panic!("enable accel failed: {:?}", e));

    loop {
        while let Some(event) = imu.get_sensor_event() {
            match event.value {
                SensorValue::Rotation(q) => {
                    println!("rotation: i={} j={} k={} real={}", q.i, q.j, q.k, q.real)
                }
                SensorValue::Vector(v) => {
                    println!("accel (m/s^2): {} {} {}", v.x, v.y, v.z)
                }
                _ => {}
            }
        }
        thread::sleep(Duration::from_millis(10));
    }
}
