// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Blocking delays.
//!
//! The driver only sleeps during the startup sequence (reset settling and
//! inter-command gaps). Runtime servicing never blocks here.

use std::{thread, time::Duration};

pub fn delay_ms(ms: u64) {
    thread::sleep(Duration::from_millis(ms));
}
