//! Wake-on-LAN magic packet validation.
//!
//! A magic packet payload is six `0xFF` bytes followed by sixteen copies of
//! the target's 6-byte MAC address. Validation works on the hex-encoded
//! payload and only checks overall length, the synchronisation prefix, and
//! that the body is hexadecimal. The sixteen repetitions are not compared
//! against each other; the MAC is taken from the first one.

use std::fmt;

/// Number of hex characters in a magic packet payload (102 bytes).
pub const MAGIC_PAYLOAD_HEX_LEN: usize = 204;

/// Hex-encoded synchronisation stream that opens every magic packet.
pub const SYNC_STREAM_HEX: &str = "ffffffffffff";

/// Number of hex characters in one MAC address.
const MAC_HEX_LEN: usize = 12;

/// A 6-byte hardware address.
///
/// Formats as six uppercase hex octets separated by colons, which is the
/// key used to search workload descriptor files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Wrap raw octets.
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Raw octets.
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

/// Reasons a payload is not a Wake-on-LAN magic packet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// The frame carried no application payload.
    #[error("payload is empty")]
    Empty,
    /// The hex-encoded payload has the wrong length.
    #[error("payload must be exactly {expected} hex characters, got {actual}")]
    Length {
        /// Required length.
        expected: usize,
        /// Observed length.
        actual: usize,
    },
    /// The payload does not open with `ffffffffffff`.
    #[error("payload does not start with the synchronisation stream")]
    MissingPrefix,
    /// The MAC repetitions contain a character that is not hexadecimal.
    #[error("payload contains non-hex character {character:?} at offset {offset}")]
    NonHex {
        /// Offending character.
        character: char,
        /// Byte offset within the hex payload.
        offset: usize,
    },
}

/// Validate a raw captured payload and extract the target MAC address.
///
/// `None` (no application layer) and a zero-length payload are both
/// rejected as [`PayloadError::Empty`].
///
/// # Errors
///
/// Returns the [`PayloadError`] describing the first rule the payload breaks.
pub fn validate_payload(payload: Option<&[u8]>) -> Result<MacAddress, PayloadError> {
    match payload {
        Some(bytes) if !bytes.is_empty() => validate_hex(&hex::encode(bytes)),
        _ => Err(PayloadError::Empty),
    }
}

/// Validate a hex-encoded payload and extract the target MAC address.
///
/// # Errors
///
/// Returns the [`PayloadError`] describing the first rule the payload breaks,
/// checked in order: empty, length, prefix, hex alphabet.
pub fn validate_hex(hex_payload: &str) -> Result<MacAddress, PayloadError> {
    if hex_payload.is_empty() {
        return Err(PayloadError::Empty);
    }

    let actual = hex_payload.chars().count();
    if actual != MAGIC_PAYLOAD_HEX_LEN {
        return Err(PayloadError::Length {
            expected: MAGIC_PAYLOAD_HEX_LEN,
            actual,
        });
    }

    let Some(body) = hex_payload.strip_prefix(SYNC_STREAM_HEX) else {
        return Err(PayloadError::MissingPrefix);
    };

    if let Some((index, character)) = body.char_indices().find(|(_, c)| !c.is_ascii_hexdigit()) {
        return Err(PayloadError::NonHex {
            character,
            offset: index.saturating_add(SYNC_STREAM_HEX.len()),
        });
    }

    // Body is pure ASCII hex at this point, so byte slicing is safe.
    let first = body.get(..MAC_HEX_LEN).ok_or(PayloadError::Length {
        expected: MAGIC_PAYLOAD_HEX_LEN,
        actual,
    })?;
    let mut octets = [0u8; 6];
    hex::decode_to_slice(first, &mut octets).map_err(|_| PayloadError::NonHex {
        character: '?',
        offset: SYNC_STREAM_HEX.len(),
    })?;

    Ok(MacAddress(octets))
}
