// ti83-rs/src/core/link/transfer.rs

//! Silent-link variable transfer, packet level.
//!
//! Each stage queues packets on the bit handshake (or arms it to collect the
//! calculator's reply) and names the stage that runs when the handshake
//! completes.

use std::io::{Cursor, Read};

use log::{debug, info, warn};

use super::bit_transfer::BitTransfer;
use super::container::{checksum, HEADER_SIZE};

/// Variable header length as it appears in the file and on the wire.
const VAR_HEADER_LEN: usize = 13;
/// Reply byte meaning the calculator has no room for the variable.
const REPLY_OUT_OF_MEMORY: u8 = 0x36;

const REQUEST_TO_SEND: [u8; 2] = [0x03, 0xC9];
const DATA_PACKET: [u8; 6] = [0x03, 0x56, 0x00, 0x00, 0x03, 0x15];
const END_OF_TRANSMISSION: [u8; 4] = [0x03, 0x92, 0x00, 0x00];
const SKIP_REPLY: [u8; 4] = [0x03, 0x56, 0x01, 0x00];

/// Stage to run when the handshake finishes its current operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Continuation {
    #[default]
    None,
    ReceiveReqAck,
    SendVariableData,
    ReceiveDataAck,
    EndTransmission,
    EndOutOfMemory,
    Finalize,
}

/// Open file and position in the packet exchange.
#[derive(Debug, Default)]
pub struct FileTransfer {
    file: Option<Cursor<Vec<u8>>>,
    variable_data: Vec<u8>,
    next: Continuation,
    completed: u32,
    rejected: u32,
    /// The variable in flight was refused; Finalize must not count it.
    refused: bool,
}

impl FileTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the file and any pending stage. Counters survive.
    pub fn reset(&mut self) {
        self.file = None;
        self.variable_data.clear();
        self.next = Continuation::None;
        self.refused = false;
    }

    pub fn next(&self) -> Continuation {
        self.next
    }

    pub fn is_file_open(&self) -> bool {
        self.file.is_some()
    }

    /// Variables finalized since construction.
    pub fn completed(&self) -> u32 {
        self.completed
    }

    /// Variables refused by the calculator for lack of memory.
    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    /// Opens a validated container, positioned at the first variable entry.
    pub fn open(&mut self, bytes: Vec<u8>) {
        let mut cursor = Cursor::new(bytes);
        cursor.set_position(HEADER_SIZE as u64);
        self.file = Some(cursor);
        self.next = Continuation::None;
        self.refused = false;
    }

    /// Runs the pending stage after the handshake completed.
    pub fn resume(&mut self, fsm: &mut BitTransfer, active: &mut bool) {
        let stage = std::mem::take(&mut self.next);
        debug!("link: stage {:?}", stage);
        match stage {
            Continuation::None => {}
            Continuation::ReceiveReqAck => self.receive_req_ack(fsm, active),
            Continuation::SendVariableData => self.send_variable_data(fsm, active),
            Continuation::ReceiveDataAck => self.receive_data_ack(fsm, active),
            Continuation::EndTransmission => self.end_transmission(fsm, active),
            Continuation::EndOutOfMemory => self.end_out_of_memory(fsm, active),
            Continuation::Finalize => self.finalize(fsm, active),
        }
    }

    /// Sends the request-to-send for the next variable, or closes the file
    /// when no full variable header remains.
    pub fn send_next_file(&mut self, fsm: &mut BitTransfer, active: &mut bool) {
        let Some(file) = self.file.as_mut() else {
            return;
        };

        let mut header = [0u8; VAR_HEADER_LEN];
        if file.read_exact(&mut header).is_err() {
            info!("link: no more variables, closing file");
            self.file = None;
            return;
        }

        let size = u16::from_le_bytes([header[2], header[3]]) as usize;
        self.variable_data = vec![0u8; size + 2];
        let mut filled = 0;
        while filled < self.variable_data.len() {
            match file.read(&mut self.variable_data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) => {
                    warn!("link: variable data read failed: {}", e);
                    break;
                }
            }
        }
        info!("link: sending variable, {} data bytes", size);

        fsm.clear_queue();
        let mut packet = Vec::with_capacity(REQUEST_TO_SEND.len() + VAR_HEADER_LEN + 2);
        packet.extend_from_slice(&REQUEST_TO_SEND);
        packet.extend_from_slice(&header);
        packet.extend_from_slice(&checksum(&header[2..]).to_le_bytes());
        fsm.begin_receive(&packet);

        self.next = Continuation::ReceiveReqAck;
        *active = true;
    }

    fn receive_req_ack(&mut self, fsm: &mut BitTransfer, active: &mut bool) {
        *active = false;
        fsm.clear_queue();
        fsm.begin_send(8);
        self.next = Continuation::SendVariableData;
    }

    fn send_variable_data(&mut self, fsm: &mut BitTransfer, active: &mut bool) {
        // Acknowledge (4 bytes) then clear-to-send or skip (4 bytes).
        let reply = fsm.take_queue();
        if reply.get(5) == Some(&REPLY_OUT_OF_MEMORY) {
            self.out_of_memory(fsm, active);
            return;
        }

        let mut packet = Vec::with_capacity(DATA_PACKET.len() + self.variable_data.len() + 2);
        packet.extend_from_slice(&DATA_PACKET);
        packet.extend_from_slice(&self.variable_data);
        let sum = checksum(self.variable_data.get(2..).unwrap_or(&[]));
        packet.extend_from_slice(&sum.to_le_bytes());
        fsm.begin_receive(&packet);

        self.next = Continuation::ReceiveDataAck;
        *active = true;
    }

    fn receive_data_ack(&mut self, fsm: &mut BitTransfer, active: &mut bool) {
        *active = false;
        fsm.clear_queue();
        fsm.begin_send(4);
        self.next = Continuation::EndTransmission;
    }

    fn end_transmission(&mut self, fsm: &mut BitTransfer, active: &mut bool) {
        fsm.clear_queue();
        fsm.begin_receive(&END_OF_TRANSMISSION);
        self.next = Continuation::Finalize;
        *active = true;
    }

    fn out_of_memory(&mut self, fsm: &mut BitTransfer, active: &mut bool) {
        warn!("link: calculator is out of memory, aborting transfer");
        self.file = None;
        self.rejected += 1;
        self.refused = true;
        *active = false;
        fsm.clear_queue();
        fsm.begin_send(3);
        self.next = Continuation::EndOutOfMemory;
    }

    fn end_out_of_memory(&mut self, fsm: &mut BitTransfer, active: &mut bool) {
        fsm.clear_queue();
        fsm.begin_receive(&SKIP_REPLY);
        self.next = Continuation::Finalize;
        *active = true;
    }

    fn finalize(&mut self, fsm: &mut BitTransfer, active: &mut bool) {
        fsm.clear_queue();
        *active = false;
        self.next = Continuation::None;
        if !std::mem::take(&mut self.refused) {
            self.completed += 1;
        }
        debug!("link: transfer finalized ({} completed)", self.completed);
        self.send_next_file(fsm, active);
    }
}
