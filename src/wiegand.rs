//! Decoding of 26-bit Wiegand (H10301) frames as read off the reader's data lines.
//!
//! Layout, most significant bit first:
//!
//! ```text
//! P FFFFFFFF UUUUUUUUUUUUUUUU P
//! ```
//!
//! The facility code sits in bits 1..9 and the card's unique code in bits
//! 9..25. Parity bits are carried through untouched.

use serde::Serialize;
use thiserror::Error;

use crate::db::models::NewTag;

pub const FRAME_BITS: usize = 26;

/// Proxmark3 prefixes HID 26-bit captures with this preamble.
const PROXMARK_PREAMBLE: u64 = 0x20_0400_0000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WiegandError {
    #[error("Expected 26 bits, got {0}")]
    InvalidLength(usize),
    #[error("Invalid bit '{bit}' at position {position}")]
    InvalidBit { position: usize, bit: char },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedCard {
    pub binary_value: String,
    pub card_data: u32,
    pub facility_code: u32,
    pub unique_code: u32,
}

impl DecodedCard {
    pub fn hex_value(&self) -> String {
        format!("{:07X}", self.card_data)
    }

    pub fn proxmark(&self) -> String {
        format!("{:010x}", PROXMARK_PREAMBLE | u64::from(self.card_data))
    }

    pub fn into_new_tag(self) -> NewTag {
        NewTag {
            hex_value: self.hex_value(),
            facility_code: self.facility_code.to_string(),
            unique_code: self.unique_code.to_string(),
            proxmark: self.proxmark(),
            binary_value: self.binary_value,
        }
    }
}

fn bits_to_u32(bits: &[u8]) -> u32 {
    bits.iter().fold(0, |acc, &bit| (acc << 1) | u32::from(bit))
}

pub fn decode(binary: &str) -> Result<DecodedCard, WiegandError> {
    let binary = binary.trim();
    let bits = binary
        .chars()
        .enumerate()
        .map(|(position, bit)| match bit {
            '0' => Ok(0u8),
            '1' => Ok(1u8),
            _ => Err(WiegandError::InvalidBit { position, bit }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if bits.len() != FRAME_BITS {
        return Err(WiegandError::InvalidLength(bits.len()));
    }

    Ok(DecodedCard {
        binary_value: binary.to_string(),
        card_data: bits_to_u32(&bits),
        facility_code: bits_to_u32(&bits[1..9]),
        unique_code: bits_to_u32(&bits[9..25]),
    })
}
