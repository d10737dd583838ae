// ti83-rs/src/core/link/bit_transfer.rs

//! Bit-level handshake of the link port.
//!
//! The calculator and the emulated peer each pull one of two lines low to
//! signal a bit, then wait for the other side to answer on the other line.
//! Every bit takes five steps; a step only advances when the port is
//! accessed and the wait condition of the step holds.

use std::collections::VecDeque;

use log::trace;

/// Combined line state reported when nobody pulls a line.
pub const LINES_IDLE: u8 = 3;

/// Raw line drivers: what the calculator outputs and what the peer outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkLines {
    pub output: u8,
    pub input: u8,
}

impl LinkLines {
    /// Lines as seen on port 0 (1 = high).
    pub fn state(&self) -> u8 {
        (self.output | self.input) ^ 3
    }
}

/// Transfer status of the handshake machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkStatus {
    #[default]
    Inactive,
    /// Bytes are queued for the calculator to receive.
    PrepareReceive,
    /// Waiting for the calculator to start sending.
    PrepareSend,
    Receive,
    Send,
}

/// Handshake state machine plus the byte queue it shifts in or out.
#[derive(Debug, Clone, Default)]
pub struct BitTransfer {
    status: LinkStatus,
    queue: VecDeque<u8>,
    bytes_to_send: u16,
    bits_left: u8,
    current_byte: u8,
    steps_left: u8,
}

impl BitTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn status(&self) -> LinkStatus {
        self.status
    }

    pub fn steps_left(&self) -> u8 {
        self.steps_left
    }

    pub fn bits_left(&self) -> u8 {
        self.bits_left
    }

    pub fn queue(&self) -> &VecDeque<u8> {
        &self.queue
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    pub fn take_queue(&mut self) -> Vec<u8> {
        self.queue.drain(..).collect()
    }

    /// Appends bytes for the calculator to receive and arms the receiver.
    pub fn begin_receive(&mut self, bytes: &[u8]) {
        self.queue.extend(bytes.iter().copied());
        self.status = LinkStatus::PrepareReceive;
    }

    /// Expects `count` bytes from the calculator; they land in the queue.
    pub fn begin_send(&mut self, count: u16) {
        self.bytes_to_send = count;
        self.status = LinkStatus::PrepareSend;
    }

    /// Advances one port access. Returns `true` when the armed operation
    /// finished and its continuation should run.
    pub fn step(&mut self, lines: &mut LinkLines) -> bool {
        if self.status == LinkStatus::PrepareReceive {
            match self.queue.pop_front() {
                Some(byte) => {
                    self.current_byte = byte;
                    self.status = LinkStatus::Receive;
                    self.bits_left = 8;
                    self.steps_left = 5;
                }
                None => {
                    self.status = LinkStatus::Inactive;
                    return true;
                }
            }
        }

        if self.status == LinkStatus::PrepareSend && lines.state() != LINES_IDLE {
            self.status = LinkStatus::Send;
            self.bits_left = 8;
            self.steps_left = 5;
            self.current_byte = 0;
        }

        match self.status {
            LinkStatus::Receive => self.step_receive(lines),
            LinkStatus::Send => self.step_send(lines),
            _ => false,
        }
    }

    fn step_receive(&mut self, lines: &mut LinkLines) -> bool {
        match self.steps_left {
            5 => {
                // Pull the line that encodes the next bit.
                lines.input = if self.current_byte & 1 == 1 { 2 } else { 1 };
                self.current_byte >>= 1;
                self.steps_left -= 1;
            }
            4 => {
                // Calculator acknowledges by pulling the other line.
                if lines.state() & 3 == 0 {
                    self.steps_left -= 1;
                }
            }
            3 => {
                lines.input = 0;
                self.steps_left -= 1;
            }
            2 => {
                // Calculator releases its line.
                if lines.state() & 3 == 3 {
                    self.steps_left -= 1;
                }
            }
            1 => {
                self.bits_left -= 1;
                trace!("link: bit received by calc, {} left", self.bits_left);
                if self.bits_left == 0 {
                    if !self.queue.is_empty() {
                        self.status = LinkStatus::PrepareReceive;
                    } else {
                        self.status = LinkStatus::Inactive;
                        return true;
                    }
                } else {
                    self.steps_left = 5;
                }
            }
            _ => {}
        }
        false
    }

    fn step_send(&mut self, lines: &mut LinkLines) -> bool {
        match self.steps_left {
            5 => {
                // Calculator pulls a line; which one is the bit.
                let state = lines.state();
                if state != LINES_IDLE {
                    let bit = state & 1;
                    let shift = 8 - self.bits_left;
                    self.current_byte |= bit << shift;
                    self.steps_left -= 1;
                }
            }
            4 => {
                lines.input = lines.output ^ 3;
                self.steps_left -= 1;
            }
            3 => {
                if lines.output & 3 == 0 {
                    self.steps_left -= 1;
                }
            }
            2 => {
                lines.input = 0;
                self.steps_left -= 1;
            }
            1 => {
                self.bits_left -= 1;
                trace!("link: bit sent by calc, {} left", self.bits_left);
                if self.bits_left == 0 {
                    self.bytes_to_send = self.bytes_to_send.saturating_sub(1);
                    self.queue.push_back(self.current_byte);
                    if self.bytes_to_send > 0 {
                        self.status = LinkStatus::PrepareSend;
                    } else {
                        self.status = LinkStatus::Inactive;
                        return true;
                    }
                } else {
                    self.steps_left = 5;
                }
            }
            _ => {}
        }
        false
    }
}
