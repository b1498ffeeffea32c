//! [`BusDriver`] for an SLCAN adapter on a serial port.
//!
//! Generic over any `embedded-io` port with a non-blocking readiness check,
//! and over a millisecond clock, so the same driver runs against the RP2350
//! UART and against a scripted port in host tests.

use ecu_dash_common::bus::{BusDriver, BusError};
use ecu_dash_common::config::CanSpeed;
use ecu_dash_common::frame::RawFrame;
use embedded_io::{Read, ReadReady, Write};

use crate::slcan::{CMD_CLOSE, CMD_OPEN, Event, LineAssembler, speed_command};

/// Milliseconds since boot.
pub type Clock = fn() -> u64;

/// How long the adapter gets to acknowledge a command.
pub const ACK_TIMEOUT_MS: u64 = 50;

pub struct SlcanBus<P> {
    port: P,
    clock: Clock,
    assembler: LineAssembler,
    open: bool,
}

impl<P: Read + Write + ReadReady> SlcanBus<P> {
    pub fn new(
        port: P,
        clock: Clock,
    ) -> Self {
        Self {
            port,
            clock,
            assembler: LineAssembler::new(),
            open: false,
        }
    }

    #[inline]
    pub const fn is_open(&self) -> bool { self.open }

    pub fn port(&self) -> &P { &self.port }

    pub fn port_mut(&mut self) -> &mut P { &mut self.port }

    /// Read one byte if one is waiting.
    fn read_byte(&mut self) -> Result<Option<u8>, BusError> {
        if !self.port.read_ready().map_err(|_| BusError::NotPresent)? {
            return Ok(None);
        }
        let mut byte = [0u8; 1];
        match self.port.read(&mut byte) {
            Ok(1) => Ok(Some(byte[0])),
            Ok(_) => Ok(None),
            Err(_) => Err(BusError::NotPresent),
        }
    }

    /// Send a command and wait for its acknowledgement. Frames that arrive
    /// in the meantime are dropped.
    fn command(
        &mut self,
        command: &[u8],
    ) -> Result<(), BusError> {
        self.port.write_all(command).map_err(|_| BusError::NotPresent)?;
        self.port.flush().map_err(|_| BusError::NotPresent)?;

        let deadline = (self.clock)().saturating_add(ACK_TIMEOUT_MS);
        loop {
            while let Some(byte) = self.read_byte()? {
                match self.assembler.push(byte) {
                    Some(Event::Ack) => return Ok(()),
                    Some(Event::Nack) => return Err(BusError::Rejected),
                    Some(Event::Frame(_) | Event::Other) | None => {}
                }
            }
            if (self.clock)() >= deadline {
                return Err(BusError::NotPresent);
            }
        }
    }
}

impl<P: Read + Write + ReadReady> BusDriver for SlcanBus<P> {
    fn initialize(
        &mut self,
        speed: CanSpeed,
    ) -> Result<(), BusError> {
        self.open = false;
        self.assembler.reset();

        // Closing an already closed channel is refused by some adapters;
        // only silence matters here.
        if let Err(BusError::NotPresent) = self.command(CMD_CLOSE) {
            return Err(BusError::NotPresent);
        }
        self.command(speed_command(speed)).map_err(|err| match err {
            BusError::Rejected => BusError::UnsupportedSpeed,
            other => other,
        })?;
        self.command(CMD_OPEN)?;
        self.open = true;
        Ok(())
    }

    fn poll_frame(
        &mut self,
        timeout_ms: u32,
    ) -> Option<RawFrame> {
        if !self.open {
            return None;
        }
        let deadline = (self.clock)().saturating_add(u64::from(timeout_ms));
        loop {
            while let Ok(Some(byte)) = self.read_byte() {
                if let Some(Event::Frame(frame)) = self.assembler.push(byte) {
                    return Some(frame);
                }
            }
            if (self.clock)() >= deadline {
                return None;
            }
        }
    }

    fn shutdown(&mut self) {
        let _ = self.command(CMD_CLOSE);
        self.open = false;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
