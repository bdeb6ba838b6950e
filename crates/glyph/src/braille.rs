// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! Byte to braille cell codec.

/// First code point of the Unicode braille patterns block.
const BRAILLE_BASE: u32 = 0x2800;

/// A lossless, stateless mapping between bytes and display symbols.
pub trait SymbolCodec {
    /// Map a byte to its display symbol.
    fn byte_to_symbol(&self, byte: u8) -> char;

    /// Map a display symbol back to its byte, if the symbol belongs to the codec.
    fn symbol_to_byte(&self, symbol: char) -> Option<u8>;

    /// Encode a byte slice as a string of symbols.
    fn encode(&self, bytes: &[u8]) -> String {
        return bytes.iter().map(|b| self.byte_to_symbol(*b)).collect();
    }

    /// Decode a string of symbols. Returns `None` if any symbol is foreign.
    fn decode(&self, symbols: &str) -> Option<Vec<u8>> {
        return symbols.chars().map(|c| self.symbol_to_byte(c)).collect();
    }
}

/// The 256-cell braille codec: byte `n` is the cell `U+2800 + n`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Braille;

impl SymbolCodec for Braille {
    fn byte_to_symbol(&self, byte: u8) -> char {
        // Every value in U+2800..=U+28FF is an assigned scalar value.
        return char::from_u32(BRAILLE_BASE + byte as u32).unwrap_or('\u{2800}');
    }

    fn symbol_to_byte(&self, symbol: char) -> Option<u8> {
        let code = symbol as u32;
        if !(BRAILLE_BASE..BRAILLE_BASE + 256).contains(&code) {
            return None;
        }
        return Some((code - BRAILLE_BASE) as u8);
    }
}
