//! Fixed-width, bit-addressable register used for GPIO snapshots and masks.

use crate::consts::wire::MAX_PORTS;
use crate::error::{Error, Result};
use std::fmt;

/// A fixed-width binary value, addressable by bit index.
///
/// Bit 0 is the least significant bit. The textual forms ([`BinaryState::to_binary_string`],
/// [`BinaryState::to_hex`]) are MSB-first and zero-padded to the register width, which is
/// how the board prints and accepts `readall`/`writeall`/`iodir`/`iomask` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BinaryState {
    value: u64,
    width: u8,
}

impl Default for BinaryState {
    /// An 8-bit register with every bit cleared.
    fn default() -> Self {
        BinaryState { value: 0, width: 8 }
    }
}

impl BinaryState {
    /// Creates a register of `width` bits (1-64). `value` is masked to the width.
    pub fn new(value: u64, width: u8) -> Result<Self> {
        if width == 0 || width > MAX_PORTS {
            return Err(Error::InvalidWidth(width));
        }
        Ok(BinaryState {
            value: value & Self::mask_for(width),
            width,
        })
    }

    /// Parses a hex string (as printed by `gpio readall`) into a `width`-bit register.
    ///
    /// Surrounding whitespace is ignored. The string must contain only hex digits
    /// and must not carry more digits than the register can hold.
    pub fn from_hex(hex: &str, width: u8) -> Result<Self> {
        let digits = hex.trim();
        let max_digits = (width as usize).div_ceil(4);
        if digits.is_empty()
            || digits.len() > max_digits
            || !digits.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(Error::InvalidPayload(hex.to_string()));
        }
        let value =
            u64::from_str_radix(digits, 16).map_err(|_| Error::InvalidPayload(hex.to_string()))?;
        Self::new(value, width)
    }

    #[inline]
    fn mask_for(width: u8) -> u64 {
        u64::MAX >> (64 - u32::from(width))
    }

    /// Mask with every bit of this register's width set.
    #[inline]
    pub fn mask(&self) -> u64 {
        Self::mask_for(self.width)
    }

    /// Number of bits.
    #[inline]
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Raw numeric value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Sets or clears the bit at `index`.
    pub fn update_at(&mut self, index: u8, on: bool) -> Result<()> {
        if index >= self.width {
            return Err(Error::IndexOutOfRange {
                index,
                width: self.width,
            });
        }
        let bit = 1u64 << index;
        if on {
            self.value |= bit;
        } else {
            self.value &= !bit;
        }
        Ok(())
    }

    /// Returns the bit at `index`. Indices outside the width read as `false`.
    #[inline]
    pub fn get_at(&self, index: u8) -> bool {
        index < self.width && (self.value >> index) & 1 == 1
    }

    /// Replaces the whole value, masked to the width.
    pub fn update(&mut self, value: u64) {
        self.value = value & self.mask();
    }

    /// Replaces the whole value from an MSB-first binary string of exactly `width` characters.
    pub fn update_string(&mut self, bits: &str) -> Result<()> {
        let invalid = || Error::InvalidBinaryString {
            value: bits.to_string(),
            width: self.width,
        };
        if bits.len() != self.width as usize || !bits.chars().all(|c| c == '0' || c == '1') {
            return Err(invalid());
        }
        self.value = u64::from_str_radix(bits, 2).map_err(|_| invalid())?;
        Ok(())
    }

    /// MSB-first binary string, exactly `width` characters long.
    pub fn to_binary_string(&self) -> String {
        format!("{:0w$b}", self.value, w = self.width as usize)
    }

    /// Lowercase hex, zero-padded to `ceil(width / 4)` digits.
    pub fn to_hex(&self) -> String {
        format!(
            "{:0w$x}",
            self.value,
            w = (self.width as usize).div_ceil(4)
        )
    }

    /// Returns a new register with every bit flipped. `self` is left untouched.
    #[must_use]
    pub fn inverted(&self) -> Self {
        BinaryState {
            value: !self.value & self.mask(),
            width: self.width,
        }
    }

    /// Sets every bit.
    pub fn set_all_on(&mut self) -> &mut Self {
        self.value = self.mask();
        self
    }

    /// Clears every bit.
    pub fn set_all_off(&mut self) -> &mut Self {
        self.value = 0;
        self
    }
}

impl fmt::Display for BinaryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_binary_string())
    }
}

impl fmt::LowerHex for BinaryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_bit() {
        let mut state = BinaryState::default();
        state.update_at(0, true).unwrap();
        assert!(state.get_at(0));
    }

    #[test]
    fn test_set_and_get_more_bits() {
        let mut state = BinaryState::default();
        state.update_at(3, true).unwrap();
        assert!(!state.get_at(0));
        assert!(!state.get_at(1));
        assert!(!state.get_at(2));
        assert!(state.get_at(3));
    }

    #[test]
    fn test_update_at_out_of_range() {
        let mut state = BinaryState::default();
        match state.update_at(8, true) {
            Err(Error::IndexOutOfRange { index, width }) => {
                assert_eq!(index, 8);
                assert_eq!(width, 8);
            }
            other => panic!("Expected IndexOutOfRange, got: {:?}", other),
        }
        assert!(!state.get_at(8));
    }

    #[test]
    fn test_update_string() {
        let mut state = BinaryState::default();
        state.update_string("11101010").unwrap();
        let expected = [false, true, false, true, false, true, true, true];
        for (i, bit) in expected.iter().enumerate() {
            assert_eq!(state.get_at(i as u8), *bit, "bit {}", i);
        }
    }

    #[test]
    fn test_update_string_rejects_bad_input() {
        let mut state = BinaryState::new(0x5a, 8).unwrap();
        assert!(state.update_string("1010").is_err());
        assert!(state.update_string("101010101").is_err());
        assert!(state.update_string("1010102a").is_err());
        assert!(state.update_string("+0000001").is_err());
        // Value untouched after a rejected parse
        assert_eq!(state.value(), 0x5a);
    }

    #[test]
    fn test_binary_string() {
        let mut state = BinaryState::default();
        for i in 0..8u8 {
            state.update_at(i, i % 2 == 0).unwrap();
        }
        assert_eq!(state.to_binary_string(), "01010101");
        assert_eq!(state.to_string(), "01010101");
    }

    #[test]
    fn test_inverted_is_pure() {
        let mut state = BinaryState::default();
        state.update_string("01010111").unwrap();
        let inverted = state.inverted();
        assert_eq!(state.to_binary_string(), "01010111");
        assert_eq!(inverted.to_binary_string(), "10101000");
        assert_eq!(inverted.inverted(), state);
    }

    #[test]
    fn test_all_on_all_off() {
        let mut state = BinaryState::default();
        assert_eq!(state.set_all_on().to_binary_string(), "11111111");
        assert_eq!(state.set_all_off().to_binary_string(), "00000000");
    }

    #[test]
    fn test_hex_is_masked_and_padded() {
        let mut state = BinaryState::default();
        state.update(65534);
        assert_eq!(state.to_hex(), "fe");

        let state = BinaryState::new(65534, 16).unwrap();
        assert_eq!(state.to_hex(), "fffe");
        assert_eq!(state.to_binary_string(), "1111111111111110");

        let state = BinaryState::new(0x3, 12).unwrap();
        assert_eq!(state.to_hex(), "003");
        assert_eq!(format!("{:x}", state), "003");
    }

    #[test]
    fn test_width_bounds() {
        assert!(matches!(BinaryState::new(0, 0), Err(Error::InvalidWidth(0))));
        assert!(matches!(BinaryState::new(0, 65), Err(Error::InvalidWidth(65))));
        let full = *BinaryState::new(0, 64).unwrap().set_all_on();
        assert_eq!(full.value(), u64::MAX);
        assert_eq!(full.to_hex(), "ffffffffffffffff");
        assert_eq!(full.inverted().value(), 0);
    }

    #[test]
    fn test_hex_and_string_round_trip() {
        for width in [8u8, 16, 32, 64] {
            let mask = u64::MAX >> (64 - width as u32);
            for value in [0u64, 1, 0xa5, 0x8000_0001, u64::MAX] {
                let value = value & mask;
                let state = BinaryState::new(value, width).unwrap();
                assert_eq!(u64::from_str_radix(&state.to_hex(), 16).unwrap(), value);

                let mut reparsed = state;
                reparsed.update_string(&state.to_binary_string()).unwrap();
                assert_eq!(reparsed, state);
            }
        }
    }

    #[test]
    fn test_from_hex() {
        let state = BinaryState::from_hex("ff\r", 8).unwrap();
        assert_eq!(state.value(), 0xff);
        let state = BinaryState::from_hex("0a", 16).unwrap();
        assert_eq!(state.value(), 0x0a);

        assert!(matches!(BinaryState::from_hex("", 8), Err(Error::InvalidPayload(_))));
        assert!(matches!(BinaryState::from_hex("fff", 8), Err(Error::InvalidPayload(_))));
        assert!(matches!(BinaryState::from_hex("zz", 8), Err(Error::InvalidPayload(_))));
        assert!(matches!(
            BinaryState::from_hex(">gpio readall", 8),
            Err(Error::InvalidPayload(_))
        ));
    }
}
