//! # Wire Codec
//!
//! Fixed binary encoding for messages, receipts and outbound messages.
//!
//! bincode with fixed-width integers, big-endian byte order, and trailing
//! bytes rejected. Frames are the encoding prefixed with a 4-byte big-endian
//! length.

use crate::errors::CodecError;
use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Frame header length.
pub const FRAME_HEADER_LEN: usize = 4;

fn bincode_opts() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_big_endian()
        .reject_trailing_bytes()
}

/// Encodes `value`.
///
/// # Errors
///
/// Returns [`CodecError::Bincode`] if serialization fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    Ok(bincode_opts().serialize(value)?)
}

/// Decodes a complete encoding of `T`.
///
/// # Errors
///
/// Returns [`CodecError::Bincode`] on malformed input or trailing bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    Ok(bincode_opts().deserialize(bytes)?)
}

/// Prefixes `payload` with its length.
///
/// # Errors
///
/// Returns [`CodecError::TooLarge`] if the payload exceeds `u32::MAX` bytes.
pub fn frame(payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    let len = u32::try_from(payload.len()).map_err(|_| CodecError::TooLarge(payload.len()))?;
    let mut out = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Splits the first frame off `bytes`, returning `(payload, rest)`.
///
/// # Errors
///
/// Returns [`CodecError::Truncated`] if the header or payload is incomplete.
pub fn unframe(bytes: &[u8]) -> Result<(&[u8], &[u8]), CodecError> {
    if bytes.len() < FRAME_HEADER_LEN {
        return Err(CodecError::Truncated {
            needed: FRAME_HEADER_LEN,
            actual: bytes.len(),
        });
    }
    let mut header = [0u8; FRAME_HEADER_LEN];
    header.copy_from_slice(&bytes[..FRAME_HEADER_LEN]);
    let len = u32::from_be_bytes(header) as usize;
    let body = &bytes[FRAME_HEADER_LEN..];
    if body.len() < len {
        return Err(CodecError::Truncated {
            needed: len,
            actual: body.len(),
        });
    }
    Ok(body.split_at(len))
}

/// Encodes and frames `value`.
///
/// # Errors
///
/// See [`encode`] and [`frame`].
pub fn encode_framed<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    frame(&encode(value)?)
}

/// Decodes a sequence of frames of `T`.
///
/// # Errors
///
/// Fails on the first truncated frame or malformed payload.
pub fn decode_stream<T: DeserializeOwned>(mut bytes: &[u8]) -> Result<Vec<T>, CodecError> {
    let mut out = Vec::new();
    while !bytes.is_empty() {
        let (payload, rest) = unframe(bytes)?;
        out.push(decode(payload)?);
        bytes = rest;
    }
    Ok(out)
}
