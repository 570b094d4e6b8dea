// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Linux I2C character device transport.

use std::path::Path;

use i2cdev::core::I2CDevice;
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};

use super::SensorBus;

/// [`SensorBus`] implementation over `/dev/i2c-*`.
///
/// The kernel device is opened against one slave address; when the driver
/// targets a different address the slave selection is updated before the
/// transaction.
pub struct I2cBus {
    dev: LinuxI2CDevice,
    active_address: u8,
}

impl I2cBus {
    /// Open an I2C adapter, e.g. `I2cBus::open("/dev/i2c-1", 0x4A)`
    pub fn open<P: AsRef<Path>>(path: P, address: u8) -> Result<Self, LinuxI2CError> {
        let dev = LinuxI2CDevice::new(path, address as u16)?;
        Ok(Self {
            dev,
            active_address: address,
        })
    }

    fn select(&mut self, address: u8) -> Result<(), LinuxI2CError> {
        if address != self.active_address {
            self.dev.set_slave_address(address as u16)?;
            self.active_address = address;
        }
        Ok(())
    }
}

impl SensorBus for I2cBus {
    type BusError = LinuxI2CError;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::BusError> {
        self.select(address)?;
        self.dev.write(bytes)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::BusError> {
        self.select(address)?;
        self.dev.read(buf)
    }
}
