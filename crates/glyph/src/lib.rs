// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! Symbols and concepts for reasoning artifacts.
//!
//! This crate holds the two pure collaborators that the distiller leans on
//! but does not own:
//!
//! - [`SymbolCodec`]: a lossless byte to display-symbol mapping. The default
//!   [`Braille`] codec maps byte `n` to the Unicode braille cell `U+2800 + n`,
//!   so every one of the 256 byte values has exactly one cell.
//! - [`ConceptDictionary`]: a best-effort mapping from words to small concept
//!   indices. The default [`Vocabulary`] is an in-memory table.
//!
//! # Example
//!
//! ```
//! use glyph::{Braille, SymbolCodec, Vocabulary, extract_concepts};
//!
//! let vocab = Vocabulary::builtin();
//! let concepts = extract_concepts("The sky is blue", &vocab);
//! assert!(!concepts.is_empty());
//!
//! let cells = Braille.encode(&concepts);
//! assert_eq!(Braille.decode(&cells), Some(concepts));
//! ```

mod braille;
mod concept;

pub use braille::Braille;
pub use braille::SymbolCodec;
pub use concept::ConceptDictionary;
pub use concept::Vocabulary;
pub use concept::extract_concepts;
pub use concept::normalize_word;
pub use concept::MAX_CONCEPTS;
