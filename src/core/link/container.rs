// ti83-rs/src/core/link/container.rs

//! Variable file container (`.8xp`, `.83p`, ...) validation.
//!
//! Layout: 55-byte header (11-byte signature, 42-byte comment, LE u16 data
//! size), the data section, and a LE u16 checksum of the data section.

use std::io;

use thiserror::Error;

pub const SIGNATURE: [u8; 11] = [
    0x2A, 0x2A, 0x54, 0x49, 0x38, 0x33, 0x2A, 0x2A, 0x1A, 0x0A, 0x00,
];
pub const HEADER_SIZE: usize = 55;
pub const SIZE_OFFSET: usize = 53;
/// Header plus trailing checksum.
pub const OVERHEAD: usize = HEADER_SIZE + 2;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("file header signature mismatch")]
    InvalidHeader,
    #[error("file length {actual} does not match declared data size {declared}")]
    InvalidLength { declared: usize, actual: usize },
    #[error("file checksum {actual:04X} does not match computed {expected:04X}")]
    InvalidChecksum { expected: u16, actual: u16 },
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

pub type TransferResult<T> = Result<T, TransferError>;

/// 16-bit wrapping sum used by both the file and the wire packets.
pub fn checksum(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |acc, &b| acc.wrapping_add(b as u16))
}

/// Checks signature, length and checksum. Returns the declared data size.
pub fn verify(file: &[u8]) -> TransferResult<usize> {
    if file.len() < OVERHEAD || file[..SIGNATURE.len()] != SIGNATURE {
        return Err(TransferError::InvalidHeader);
    }

    let declared = u16::from_le_bytes([file[SIZE_OFFSET], file[SIZE_OFFSET + 1]]) as usize;
    if file.len() != declared + OVERHEAD {
        return Err(TransferError::InvalidLength {
            declared,
            actual: file.len(),
        });
    }

    let data_end = HEADER_SIZE + declared;
    let expected = checksum(&file[HEADER_SIZE..data_end]);
    let actual = u16::from_le_bytes([file[data_end], file[data_end + 1]]);
    if expected != actual {
        return Err(TransferError::InvalidChecksum { expected, actual });
    }

    Ok(declared)
}

/// Builds a single-variable container. Used by tests and tools.
pub fn build(var_type: u8, name: &str, data: &[u8]) -> Vec<u8> {
    build_many(&[(var_type, name, data)])
}

/// Builds a container holding each `(type, name, data)` entry in order.
pub fn build_many(vars: &[(u8, &str, &[u8])]) -> Vec<u8> {
    let mut entries = Vec::new();
    for &(var_type, name, data) in vars {
        let len = data.len() as u16;
        entries.extend_from_slice(&0x000Bu16.to_le_bytes());
        entries.extend_from_slice(&len.to_le_bytes());
        entries.push(var_type);
        let mut padded = [0u8; 8];
        for (dst, src) in padded.iter_mut().zip(name.bytes()) {
            *dst = src;
        }
        entries.extend_from_slice(&padded);
        entries.extend_from_slice(&len.to_le_bytes());
        entries.extend_from_slice(data);
    }

    let mut file = Vec::with_capacity(entries.len() + OVERHEAD);
    file.extend_from_slice(&SIGNATURE);
    file.resize(SIZE_OFFSET, 0);
    file.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    file.extend_from_slice(&entries);
    file.extend_from_slice(&checksum(&entries).to_le_bytes());
    file
}
