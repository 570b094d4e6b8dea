// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! BNO08x IMU driver implementation.
//!
//! This module contains the main driver for the BNO08x family of IMU
//! sensors. It owns the SHTP framing (per-channel sequence numbers, header
//! handling, packet buffers), the sensor hub control dialogue and the event
//! queue that decoded sensor reports land in.

use std::time::Duration;

use log::{debug, trace, warn};

use crate::constants::{
    shtp_error_str, ADVERT_TAG_NORMAL_CHANNEL, ADVERT_TAG_SHTP_VERSION, ADVERT_TAG_WAKE_CHANNEL,
    CHANNEL_COMMAND, CHANNEL_EXECUTABLE, CHANNEL_GYRO_ROTATION, CHANNEL_HUB_CONTROL,
    CHANNEL_SENSOR_REPORTS, CHANNEL_WAKE_REPORTS, CMD_RESP_ADVERTISEMENT, CMD_RESP_ERROR_LIST,
    DEFAULT_I2C_ADDRESS, EXECUTABLE_DEVICE_CMD_RESET, EXECUTABLE_DEVICE_RESP_RESET_COMPLETE,
    INITIALIZE_CMD_BODY, NUM_CHANNELS, PACKET_RECV_BUF_LEN, PACKET_SEND_BUF_LEN, PROD_ID_RESP_LEN,
    SH2_CMD_INITIALIZE, SH2_STARTUP_INIT_UNSOLICITED, SHUB_COMMAND_RESP, SHUB_GET_FEATURE_RESP,
    SHUB_PROD_ID_REQ, SHUB_PROD_ID_RESP, SHUB_REPORT_SET_FEATURE_CMD,
};
use crate::decoder::{self, u16_at, u32_at};
use crate::events::{EventQueue, SensorEvent};
use crate::interface::{
    delay::delay_ms, NoResetPin, OutputPin, PacketHeader, SensorBus, PACKET_HEADER_LENGTH,
};
use crate::{ConfigFailure, Error};

/// Soft-reset attempts before configuration gives up
const SOFT_RESET_ATTEMPTS: u32 = 5;
/// Backoff between soft-reset attempts, milliseconds
const SOFT_RESET_BACKOFF_MS: u64 = 30;
/// Gap after a control command before the next exchange, milliseconds
const INTER_COMMAND_DELAY_MS: u64 = 20;
/// Width of the hardware reset pulse, milliseconds
const HARD_RESET_PULSE_MS: u64 = 10;
/// Most packets drained in one startup pass (advertisement, reset complete,
/// unsolicited initialize)
const STARTUP_DRAIN_LIMIT: u32 = 8;
/// Polls awaiting the product ID responses before configuration fails
const PRODUCT_ID_POLL_LIMIT: u32 = 10;

/// Sensor IDs the enable-tracking table covers
const MAX_SENSOR_ID: usize = 0x40;

/// Shorthand for the error type of a driver over bus `B` and reset pin `RST`
pub type DriverError<B, RST> =
    Error<<B as SensorBus>::BusError, <RST as OutputPin>::Error>;

/// Driver configuration.
///
/// `Default` matches the common breakout wiring: address 0x4A and a 100 ms
/// settle after reset. Marginal installations may need a longer delay, up
/// to around one second.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// 7-bit bus address
    pub address: u8,
    /// Wait after soft reset before reading the advertisement
    pub startup_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: DEFAULT_I2C_ADDRESS,
            startup_delay: Duration::from_millis(100),
        }
    }
}

/// Maximum product ID entries retained from configuration
pub const MAX_PRODUCT_ID_ENTRIES: usize = 5;

/// One entry of the product ID response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductIdEntry {
    pub reset_cause: u8,
    pub version_major: u8,
    pub version_minor: u8,
    pub version_patch: u16,
    pub part_number: u32,
    pub build_number: u32,
}

impl ProductIdEntry {
    /// Parse a 16-byte product ID response body
    fn parse(body: &[u8]) -> Option<Self> {
        if body.len() < PROD_ID_RESP_LEN {
            return None;
        }
        Some(Self {
            reset_cause: body[1],
            version_major: body[2],
            version_minor: body[3],
            part_number: u32_at(body, 4),
            build_number: u32_at(body, 8),
            version_patch: u16_at(body, 12),
        })
    }
}

/// Product ID entries collected during configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductIds {
    pub entries: [ProductIdEntry; MAX_PRODUCT_ID_ENTRIES],
    pub num_entries: u8,
}

/// BNO08x IMU driver
///
/// Generic over the bus transport `B` and an optional hardware reset line
/// `RST`. All state lives inline; nothing is allocated after construction.
/// The driver is not reentrant: callers serialize access to one instance.
pub struct Bno08x<B, RST = NoResetPin> {
    bus: B,
    reset_pin: Option<RST>,
    address: u8,
    startup_delay: Duration,
    /// Each communication channel with the device has its own sequence number
    sequence_numbers: [u8; NUM_CHANNELS],
    /// Buffer for building and sending packets to the sensor hub
    packet_send_buf: [u8; PACKET_SEND_BUF_LEN],
    /// Buffer for packets received from the sensor hub
    packet_recv_buf: [u8; PACKET_RECV_BUF_LEN],
    /// Decoded sensor events awaiting the caller
    events: EventQueue,
    product_ids: ProductIds,
    /// Version string from the startup advertisement, when one was parsed
    shtp_version: Option<String>,
    /// Have we received the full advertisement
    advert_received: bool,
    /// Initialize response (solicited or unsolicited) observed
    init_received: bool,
    /// Reset-complete seen on the executable channel since the last check
    reset_occurred: bool,
    /// Which reports this driver has asked the hub to enable
    report_enabled: [bool; MAX_SENSOR_ID],
}

impl<B> Bno08x<B>
where
    B: SensorBus,
{
    /// Create a driver without a hardware reset line. No I/O happens until
    /// [`configure`](Self::configure).
    pub fn new(bus: B) -> Self {
        Self::from_parts(bus, None)
    }
}

impl<B, RST> Bno08x<B, RST>
where
    B: SensorBus,
    RST: OutputPin,
{
    /// Create a driver that pulses `reset_pin` during configuration
    pub fn new_with_reset_pin(bus: B, reset_pin: RST) -> Self {
        Self::from_parts(bus, Some(reset_pin))
    }

    fn from_parts(bus: B, reset_pin: Option<RST>) -> Self {
        Self {
            bus,
            reset_pin,
            address: DEFAULT_I2C_ADDRESS,
            startup_delay: Config::default().startup_delay,
            sequence_numbers: [0; NUM_CHANNELS],
            packet_send_buf: [0; PACKET_SEND_BUF_LEN],
            packet_recv_buf: [0; PACKET_RECV_BUF_LEN],
            events: EventQueue::new(),
            product_ids: ProductIds::default(),
            shtp_version: None,
            advert_received: false,
            init_received: false,
            reset_occurred: false,
            report_enabled: [false; MAX_SENSOR_ID],
        }
    }

    /// Returns the previously consumed bus instance.
    pub fn free(self) -> B {
        self.bus
    }

    /// Borrow the underlying bus, e.g. to adjust transport settings
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Run the startup sequence: reset, drain the advertisement, initialize
    /// the hub and read the product IDs.
    ///
    /// On failure the driver is unusable until `configure` succeeds on a
    /// later call.
    pub fn configure(&mut self, config: Config) -> Result<(), DriverError<B, RST>> {
        trace!("driver configure, address 0x{:02X}", config.address);
        self.address = config.address;
        self.startup_delay = config.startup_delay;
        self.advert_received = false;
        self.init_received = false;
        self.product_ids = ProductIds::default();

        if self.reset_pin.is_some() {
            self.hard_reset()?;
        }
        self.soft_reset()?;
        delay_ms(self.startup_delay.as_millis() as u64);

        // The hub announces itself unsolicited after reset: advertisement on
        // the command channel, reset complete on the executable channel.
        self.drain_pending_packets()?;
        if !self.advert_received {
            debug!("no advertisement after reset");
        }

        self.send_packet(CHANNEL_HUB_CONTROL, &INITIALIZE_CMD_BODY)?;
        delay_ms(INTER_COMMAND_DELAY_MS);
        self.drain_pending_packets()?;

        self.request_product_ids()?;
        debug!(
            "configured, {} product id entries",
            self.product_ids.num_entries
        );
        Ok(())
    }

    /// Enable a sensor report at the given interval, or disable it with an
    /// interval of zero.
    ///
    /// The hub does not acknowledge the set-feature command; delivery is
    /// confirmed by reports arriving.
    pub fn enable_report(
        &mut self,
        sensor_id: u8,
        interval_us: u32,
    ) -> Result<(), DriverError<B, RST>> {
        trace!(
            "set feature 0x{:02X}, interval {} us",
            sensor_id,
            interval_us
        );
        let interval = interval_us.to_le_bytes();
        let cmd_body: [u8; 17] = [
            SHUB_REPORT_SET_FEATURE_CMD,
            sensor_id,
            0, // feature flags
            0, // LSB change sensitivity
            0, // MSB change sensitivity
            interval[0],
            interval[1],
            interval[2],
            interval[3],
            0, // LSB batch interval
            0,
            0,
            0, // MSB batch interval
            0, // LSB sensor-specific config
            0,
            0,
            0, // MSB sensor-specific config
        ];
        self.send_packet(CHANNEL_HUB_CONTROL, &cmd_body)?;
        if (sensor_id as usize) < MAX_SENSOR_ID {
            self.report_enabled[sensor_id as usize] = interval_us != 0;
        }
        Ok(())
    }

    /// Disable a sensor report
    pub fn disable_report(&mut self, sensor_id: u8) -> Result<(), DriverError<B, RST>> {
        self.enable_report(sensor_id, 0)
    }

    /// Poll the bus once without blocking. A complete packet, when one is
    /// available, is dispatched: sensor reports become queued events,
    /// control traffic updates driver state.
    pub fn service(&mut self) -> Result<(), DriverError<B, RST>> {
        let received_len = self.receive_packet()?;
        if received_len > 0 {
            self.handle_packet(received_len);
        }
        Ok(())
    }

    /// Pop the oldest pending sensor event, servicing the bus once when the
    /// queue is empty. Returns `None` when no event is available; the caller
    /// drives repeated polling.
    pub fn get_sensor_event(&mut self) -> Option<SensorEvent> {
        if let Some(event) = self.events.pop() {
            return Some(event);
        }
        if let Err(e) = self.service() {
            debug!("service failed: {:?}", e);
            return None;
        }
        self.events.pop()
    }

    /// Product ID table populated during configuration
    pub fn product_ids(&self) -> &ProductIds {
        &self.product_ids
    }

    /// Has this driver asked the hub to enable the given report
    pub fn is_report_enabled(&self, sensor_id: u8) -> bool {
        (sensor_id as usize) < MAX_SENSOR_ID && self.report_enabled[sensor_id as usize]
    }

    /// True once a reset-complete notification has arrived on the executable
    /// channel since the last call. Enabled reports must be re-established
    /// by the caller after a device-initiated reset.
    pub fn reset_occurred(&mut self) -> bool {
        let seen = self.reset_occurred;
        self.reset_occurred = false;
        seen
    }

    /// Initialize response observed from the hub, solicited or unsolicited
    pub fn is_initialized(&self) -> bool {
        self.init_received
    }

    /// Events discarded because the queue was full
    pub fn dropped_events(&self) -> u32 {
        self.events.dropped()
    }

    /// Decoded events waiting to be collected
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// SHTP version string from the startup advertisement
    pub fn shtp_version(&self) -> Option<&str> {
        self.shtp_version.as_deref()
    }

    /// Pulse the hardware reset line low
    fn hard_reset(&mut self) -> Result<(), DriverError<B, RST>> {
        if let Some(pin) = self.reset_pin.as_mut() {
            debug!("hardware reset cycle");
            pin.set_low().map_err(Error::Pin)?;
            delay_ms(HARD_RESET_PULSE_MS);
            pin.set_high().map_err(Error::Pin)?;
        }
        Ok(())
    }

    /// Restart the hub firmware in-band, retrying on bus failure.
    ///
    /// The reset command is the one write the driver retries itself: the
    /// device NAKs while still waking up.
    fn soft_reset(&mut self) -> Result<(), DriverError<B, RST>> {
        trace!("soft reset");
        let mut attempt = 0;
        loop {
            match self.send_packet(CHANNEL_EXECUTABLE, &[EXECUTABLE_DEVICE_CMD_RESET]) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    attempt += 1;
                    if attempt >= SOFT_RESET_ATTEMPTS {
                        warn!("soft reset failed after {} attempts: {:?}", attempt, e);
                        return Err(Error::Configuration(ConfigFailure::SoftResetFailed));
                    }
                    trace!("soft reset attempt {} failed: {:?}", attempt, e);
                    delay_ms(SOFT_RESET_BACKOFF_MS);
                }
            }
        }
    }

    /// Read and dispatch packets until the hub has nothing queued
    fn drain_pending_packets(&mut self) -> Result<(), DriverError<B, RST>> {
        for _ in 0..STARTUP_DRAIN_LIMIT {
            let received_len = self.receive_packet()?;
            if received_len == 0 {
                break;
            }
            self.handle_packet(received_len);
            delay_ms(2);
        }
        Ok(())
    }

    /// Request the product ID table and poll until at least one response
    /// lands
    fn request_product_ids(&mut self) -> Result<(), DriverError<B, RST>> {
        self.send_packet(CHANNEL_HUB_CONTROL, &[SHUB_PROD_ID_REQ, 0])?;
        for _ in 0..PRODUCT_ID_POLL_LIMIT {
            let received_len = self.receive_packet()?;
            if received_len > 0 {
                self.handle_packet(received_len);
            } else if self.product_ids.num_entries > 0 {
                break;
            } else {
                delay_ms(INTER_COMMAND_DELAY_MS);
            }
        }
        if self.product_ids.num_entries == 0 {
            warn!("no product id response");
            return Err(Error::Configuration(ConfigFailure::NoProductId));
        }
        Ok(())
    }

    /// Frame `body` for `channel` and write it in one bus transaction.
    ///
    /// The channel's sequence counter advances only when the write succeeds,
    /// so the wire always carries consecutive numbers.
    fn send_packet(&mut self, channel: u8, body: &[u8]) -> Result<(), DriverError<B, RST>> {
        let packet_length = body.len() + PACKET_HEADER_LENGTH;
        let sequence = self.sequence_numbers[channel as usize];
        let header = PacketHeader::encode(packet_length, channel, sequence);
        self.packet_send_buf[..PACKET_HEADER_LENGTH].copy_from_slice(&header);
        self.packet_send_buf[PACKET_HEADER_LENGTH..packet_length].copy_from_slice(body);
        self.bus
            .write(self.address, &self.packet_send_buf[..packet_length])
            .map_err(Error::Transport)?;
        self.sequence_numbers[channel as usize] = sequence.wrapping_add(1);
        Ok(())
    }

    /// Read one packet into the receive buffer, two-step: header first, then
    /// the full packet (the hub resends the header because its FIFO pointer
    /// does not advance across transactions).
    ///
    /// Returns zero when no packet is available or the header is not
    /// plausible. Continuation reads (bit 15 of the length) are discarded.
    fn receive_packet(&mut self) -> Result<usize, DriverError<B, RST>> {
        let mut header_buf = [0u8; PACKET_HEADER_LENGTH];
        self.bus
            .read(self.address, &mut header_buf)
            .map_err(Error::Transport)?;
        let header = PacketHeader::parse(&header_buf);
        if header.continuation {
            trace!("continuation read on channel {}, discarding", header.channel);
            return Ok(0);
        }
        if header.length == 0 {
            return Ok(0);
        }
        if header.length < PACKET_HEADER_LENGTH || header.length > PACKET_RECV_BUF_LEN {
            trace!("implausible packet length {}", header.length);
            return Ok(0);
        }

        self.bus
            .read(self.address, &mut self.packet_recv_buf[..header.length])
            .map_err(Error::Transport)?;
        let confirm = PacketHeader::parse(&self.packet_recv_buf[..PACKET_HEADER_LENGTH]);
        if confirm.length != header.length || confirm.channel != header.channel {
            warn!(
                "header changed between reads ({}/{} -> {}/{}), dropping",
                header.length, header.channel, confirm.length, confirm.channel
            );
            return Ok(0);
        }
        Ok(header.length)
    }

    /// Dispatch a received packet by channel
    fn handle_packet(&mut self, received_len: usize) {
        let channel = self.packet_recv_buf[2];
        match channel {
            CHANNEL_COMMAND => self.handle_command_packet(received_len),
            CHANNEL_EXECUTABLE => self.handle_executable_packet(received_len),
            CHANNEL_HUB_CONTROL => self.handle_control_packet(received_len),
            CHANNEL_SENSOR_REPORTS | CHANNEL_WAKE_REPORTS => {
                decoder::decode_sensor_reports(
                    &self.packet_recv_buf[PACKET_HEADER_LENGTH..received_len],
                    &mut self.events,
                );
            }
            CHANNEL_GYRO_ROTATION => {
                if let Some(event) = decoder::decode_gyro_integrated_rotation(
                    &self.packet_recv_buf[PACKET_HEADER_LENGTH..received_len],
                ) {
                    self.events.push(event);
                }
            }
            _ => trace!("packet on unknown channel 0x{:02X}", channel),
        }
    }

    /// Advertisement and error-list traffic on channel 0
    fn handle_command_packet(&mut self, received_len: usize) {
        let payload = &self.packet_recv_buf[PACKET_HEADER_LENGTH..received_len];
        if payload.is_empty() {
            return;
        }
        match payload[0] {
            CMD_RESP_ADVERTISEMENT => {
                // TLV sequence after the response byte
                let mut version = None;
                let mut cursor = 1;
                while cursor + 2 <= payload.len() {
                    let tag = payload[cursor];
                    let len = payload[cursor + 1] as usize;
                    cursor += 2;
                    if cursor + len > payload.len() {
                        break;
                    }
                    let value = &payload[cursor..cursor + len];
                    cursor += len;
                    match tag {
                        ADVERT_TAG_NORMAL_CHANNEL | ADVERT_TAG_WAKE_CHANNEL
                            if !value.is_empty() =>
                        {
                            debug!(
                                "advertised {} channel {}: {}",
                                if tag == ADVERT_TAG_NORMAL_CHANNEL {
                                    "normal"
                                } else {
                                    "wake"
                                },
                                value[0],
                                String::from_utf8_lossy(&value[1..])
                            );
                        }
                        ADVERT_TAG_SHTP_VERSION => {
                            version = Some(
                                String::from_utf8_lossy(value)
                                    .trim_end_matches('\0')
                                    .to_string(),
                            );
                        }
                        _ => {}
                    }
                }
                if let Some(v) = version {
                    debug!("shtp version {}", v);
                    self.shtp_version = Some(v);
                }
                self.advert_received = true;
            }
            CMD_RESP_ERROR_LIST => {
                for &code in payload.iter().skip(1) {
                    warn!("hub error {}: {}", code, shtp_error_str(code));
                }
            }
            other => trace!("unhandled command response 0x{:02X}", other),
        }
    }

    /// Executable channel: the hub announces firmware restarts here
    fn handle_executable_packet(&mut self, received_len: usize) {
        let payload = &self.packet_recv_buf[PACKET_HEADER_LENGTH..received_len];
        if payload.first() == Some(&EXECUTABLE_DEVICE_RESP_RESET_COMPLETE) {
            debug!("reset complete");
            self.reset_occurred = true;
            // The hub forgot its feature configuration; the caller must
            // re-enable reports before they flow again.
            self.report_enabled = [false; MAX_SENSOR_ID];
        } else {
            trace!("unhandled executable response {:?}", payload.first());
        }
    }

    /// Control responses on channel 2
    fn handle_control_packet(&mut self, received_len: usize) {
        let payload = &self.packet_recv_buf[PACKET_HEADER_LENGTH..received_len];
        if payload.is_empty() {
            return;
        }
        match payload[0] {
            SHUB_PROD_ID_RESP => {
                if let Some(entry) = ProductIdEntry::parse(payload) {
                    let n = self.product_ids.num_entries as usize;
                    if n < MAX_PRODUCT_ID_ENTRIES {
                        trace!(
                            "product id entry {}: part {} version {}.{}.{}",
                            n,
                            entry.part_number,
                            entry.version_major,
                            entry.version_minor,
                            entry.version_patch
                        );
                        self.product_ids.entries[n] = entry;
                        self.product_ids.num_entries += 1;
                    }
                } else {
                    trace!("short product id response, {} bytes", payload.len());
                }
            }
            SHUB_COMMAND_RESP => {
                if payload.len() > 2 {
                    let command = payload[2];
                    if command == SH2_CMD_INITIALIZE || command == SH2_STARTUP_INIT_UNSOLICITED {
                        self.init_received = true;
                    }
                    trace!("command response 0x{:02X}", command);
                }
            }
            SHUB_GET_FEATURE_RESP => {
                // The hub does not normally confirm set-feature; when a
                // get-feature response does show up, record the report as
                // live.
                if payload.len() > 1 && (payload[1] as usize) < MAX_SENSOR_ID {
                    trace!("feature response for 0x{:02X}", payload[1]);
                    self.report_enabled[payload[1] as usize] = true;
                }
            }
            other => trace!("unhandled control report 0x{:02X}", other),
        }
    }
}
