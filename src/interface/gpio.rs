// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Reset line support.
//!
//! The BNO08x resets over the bus by default; installations with the RSTN
//! line wired to a host GPIO can drive it through [`GpiodOut`] instead.

use std::io;

use gpiod::{Chip, Lines, Options, Output};

/// A push-pull output the driver can pulse low to reset the sensor
pub trait OutputPin {
    /// Error type
    type Error: core::fmt::Debug;

    /// Drive the pin low
    fn set_low(&mut self) -> Result<(), Self::Error>;

    /// Drive the pin high
    fn set_high(&mut self) -> Result<(), Self::Error>;
}

/// Placeholder pin for drivers constructed without a reset line
pub struct NoResetPin;

impl OutputPin for NoResetPin {
    type Error = core::convert::Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Output pin backed by the Linux GPIO character device
pub struct GpiodOut {
    output: Lines<Output>,
}

impl GpiodOut {
    /// Request a line from a GPIO chip, e.g. `GpiodOut::new("/dev/gpiochip0", 17)`
    pub fn new(chip_path: &str, line: u32) -> io::Result<GpiodOut> {
        let chip = Chip::new(chip_path)?;
        let opts = Options::output([line])
            .values([true])
            .consumer("bno08x-reset");
        Ok(GpiodOut {
            output: chip.request_lines(opts)?,
        })
    }

    /// Request a line by its symbolic name, searching every GPIO chip on the
    /// system (device tree naming, e.g. "IMU_RST")
    pub fn from_symbol(name: &str) -> io::Result<GpiodOut> {
        for entry in Chip::list_devices()? {
            let chip = Chip::new(&entry)?;
            for line in 0..chip.num_lines() {
                if chip.line_info(line)?.name == name {
                    return GpiodOut::new(&entry.display().to_string(), line);
                }
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("no GPIO line named \"{}\"", name),
        ))
    }
}

impl OutputPin for GpiodOut {
    type Error = io::Error;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.output.set_values([false])?;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.output.set_values([true])?;
        Ok(())
    }
}
