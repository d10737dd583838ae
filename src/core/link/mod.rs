// ti83-rs/src/core/link/mod.rs

//! Link port (port 0): two open-collector lines plus the host-side peer that
//! feeds variable files into the calculator.

pub mod bit_transfer;
pub mod container;
pub mod transfer;

use std::io::Read;

use log::info;

pub use bit_transfer::{BitTransfer, LinkLines, LinkStatus};
pub use container::{TransferError, TransferResult};
pub use transfer::{Continuation, FileTransfer};

#[derive(Debug, Default)]
pub struct LinkPort {
    lines: LinkLines,
    /// Set while the peer drives a transfer; port 0 writes then tick the
    /// handshake.
    active: bool,
    fsm: BitTransfer,
    session: FileTransfer,
}

impl LinkPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Releases both lines and abandons any transfer in flight.
    pub fn reset(&mut self) {
        self.lines = LinkLines::default();
        self.active = false;
        self.fsm.reset();
        self.session.reset();
    }

    /// Combined line state, 2 bits.
    pub fn state(&self) -> u8 {
        self.lines.state()
    }

    pub fn output(&self) -> u8 {
        self.lines.output
    }

    pub fn set_output(&mut self, value: u8) {
        self.lines.output = value & 3;
    }

    pub fn input(&self) -> u8 {
        self.lines.input
    }

    pub fn set_input(&mut self, value: u8) {
        self.lines.input = value & 3;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn status(&self) -> LinkStatus {
        self.fsm.status()
    }

    pub fn pending(&self) -> Continuation {
        self.session.next()
    }

    pub fn is_file_open(&self) -> bool {
        self.session.is_file_open()
    }

    pub fn completed_transfers(&self) -> u32 {
        self.session.completed()
    }

    pub fn rejected_transfers(&self) -> u32 {
        self.session.rejected()
    }

    /// One handshake step, run on every qualifying port 0 access.
    pub fn update(&mut self) {
        if self.fsm.step(&mut self.lines) {
            self.session.resume(&mut self.fsm, &mut self.active);
        }
    }

    /// Starts sending a variable container to the calculator.
    ///
    /// With `verify` the signature, length and checksum are checked first;
    /// a rejected file leaves the port untouched.
    pub fn send_file(&mut self, bytes: Vec<u8>, verify: bool) -> TransferResult<()> {
        if verify {
            container::verify(&bytes)?;
        }
        info!("link: starting transfer of {} byte file", bytes.len());
        self.session.open(bytes);
        self.session.send_next_file(&mut self.fsm, &mut self.active);
        Ok(())
    }

    pub fn send_file_from_reader<R: Read>(&mut self, mut reader: R, verify: bool) -> TransferResult<()> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.send_file(bytes, verify)
    }
}
