//! # ABI Arguments
//!
//! Typed decoding of precompile arguments and encoding of the tuples the
//! engine hands to contract code (responses, precompile results).
//!
//! Arguments are a standard head/tail tuple encoding without a selector.
//! Static types occupy one 32-byte head word; dynamic types (`bytes`,
//! `(address,uint256)[]`) store an offset in the head pointing into the tail.

use crate::domain::value_objects::{Address, Bytes, CurrencyBalance, CurrencyId, U256};
use crate::errors::AbiError;

const WORD: usize = 32;

// =============================================================================
// DECODER
// =============================================================================

/// Reads arguments from an encoded tuple by position.
#[derive(Clone, Copy, Debug)]
pub struct AbiDecoder<'a> {
    data: &'a [u8],
}

impl<'a> AbiDecoder<'a> {
    /// Wraps encoded arguments.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn slice_at(&self, offset: usize, len: usize) -> Result<&'a [u8], AbiError> {
        let end = offset.checked_add(len).ok_or(AbiError::OutOfRange("offset"))?;
        self.data.get(offset..end).ok_or(AbiError::TooShort {
            needed: end,
            actual: self.data.len(),
        })
    }

    fn word_at(&self, offset: usize) -> Result<&'a [u8], AbiError> {
        self.slice_at(offset, WORD)
    }

    fn usize_at(&self, offset: usize, what: &'static str) -> Result<usize, AbiError> {
        let value = U256::from_big_endian(self.word_at(offset)?);
        if value > U256::from(u32::MAX) {
            return Err(AbiError::OutOfRange(what));
        }
        Ok(value.as_usize())
    }

    fn head(&self, index: usize) -> Result<&'a [u8], AbiError> {
        self.word_at(index * WORD)
    }

    /// `uint256` argument.
    pub fn uint(&self, index: usize) -> Result<U256, AbiError> {
        Ok(U256::from_big_endian(self.head(index)?))
    }

    /// `uint8` argument.
    pub fn uint8(&self, index: usize) -> Result<u8, AbiError> {
        let value = self.uint(index)?;
        if value > U256::from(u8::MAX) {
            return Err(AbiError::OutOfRange("uint8"));
        }
        Ok(value.low_u32() as u8)
    }

    /// `bool` argument.
    pub fn bool(&self, index: usize) -> Result<bool, AbiError> {
        match self.uint(index)? {
            v if v.is_zero() => Ok(false),
            v if v == U256::one() => Ok(true),
            _ => Err(AbiError::OutOfRange("bool")),
        }
    }

    /// `address` argument. The upper 12 bytes must be zero.
    pub fn address(&self, index: usize) -> Result<Address, AbiError> {
        let word = self.head(index)?;
        if word[..12].iter().any(|b| *b != 0) {
            return Err(AbiError::OutOfRange("address"));
        }
        Address::from_slice(&word[12..]).ok_or(AbiError::OutOfRange("address"))
    }

    /// `bytes` argument.
    pub fn bytes(&self, index: usize) -> Result<Bytes, AbiError> {
        let offset = self.usize_at(index * WORD, "bytes offset")?;
        let len = self.usize_at(offset, "bytes length")?;
        Ok(Bytes::from_slice(self.slice_at(offset + WORD, len)?))
    }

    /// `(address,uint256)[]` argument.
    pub fn currency_list(&self, index: usize) -> Result<Vec<CurrencyBalance>, AbiError> {
        let offset = self.usize_at(index * WORD, "array offset")?;
        let len = self.usize_at(offset, "array length")?;
        let items = AbiDecoder::new(self.slice_at(offset + WORD, len * 2 * WORD)?);
        (0..len)
            .map(|i| {
                Ok(CurrencyBalance::new(
                    CurrencyId(items.address(2 * i)?),
                    items.uint(2 * i + 1)?,
                ))
            })
            .collect()
    }
}

// =============================================================================
// ENCODER
// =============================================================================

/// One encodable value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// `uint256`.
    Uint(U256),
    /// `bool`.
    Bool(bool),
    /// `address`.
    Address(Address),
    /// `bytes`.
    Bytes(Vec<u8>),
    /// `(address,uint256)[]`.
    CurrencyList(Vec<CurrencyBalance>),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        matches!(self, Self::Bytes(_) | Self::CurrencyList(_))
    }

    fn head_word(&self) -> [u8; WORD] {
        let mut word = [0u8; WORD];
        match self {
            Self::Uint(v) => v.to_big_endian(&mut word),
            Self::Bool(b) => word[31] = u8::from(*b),
            Self::Address(a) => word[12..].copy_from_slice(a.as_bytes()),
            Self::Bytes(_) | Self::CurrencyList(_) => {}
        }
        word
    }

    fn tail(&self) -> Vec<u8> {
        match self {
            Self::Bytes(data) => {
                let mut out = uint_word(data.len());
                out.extend_from_slice(data);
                out.resize(WORD + data.len().div_ceil(WORD) * WORD, 0);
                out
            }
            Self::CurrencyList(items) => {
                let mut out = uint_word(items.len());
                for item in items {
                    out.extend_from_slice(&Token::Address(item.currency.0).head_word());
                    out.extend_from_slice(&Token::Uint(item.balance).head_word());
                }
                out
            }
            _ => Vec::new(),
        }
    }
}

fn uint_word(value: usize) -> Vec<u8> {
    Token::Uint(U256::from(value)).head_word().to_vec()
}

/// Encodes `tokens` as a tuple.
#[must_use]
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let heads_len = tokens.len() * WORD;
    let mut heads = Vec::with_capacity(heads_len);
    let mut tails = Vec::new();
    for token in tokens {
        if token.is_dynamic() {
            heads.extend(uint_word(heads_len + tails.len()));
            tails.extend(token.tail());
        } else {
            heads.extend_from_slice(&token.head_word());
        }
    }
    heads.extend(tails);
    heads
}

/// Encodes a single `uint256` word.
#[must_use]
pub fn encode_uint(value: U256) -> Vec<u8> {
    Token::Uint(value).head_word().to_vec()
}
