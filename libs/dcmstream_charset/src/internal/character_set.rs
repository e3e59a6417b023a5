//! Defines the character sets in the DICOM standard that this crate is able
//! to decode directly, keyed by their defined terms.

use crate::internal::decoders;

/// Describes a single character set: its defined term as used in the
/// *'(0008,0005) Specific Character Set'* data element, a human-readable
/// description, and the function that decodes its next codepoint.
///
#[derive(Debug, PartialEq)]
pub struct CharacterSet {
  pub defined_term: &'static str,
  pub description: &'static str,
  pub decode_next_codepoint: DecodeNextCodepointFn,
}

/// A function that decodes the next codepoint from the given bytes and
/// returns it along with the remaining bytes. Errors when the leading bytes
/// aren't valid in the character set. Must not be called with no bytes.
///
pub type DecodeNextCodepointFn = fn(&[u8]) -> Result<(char, &[u8]), ()>;

/// ISO IR 6, also known as ISO 646 and US-ASCII. The DICOM default
/// repertoire.
///
pub const ISO_IR_6: CharacterSet = CharacterSet {
  defined_term: "ISO_IR 6",
  description: "Default repertoire",
  decode_next_codepoint: decoders::iso_ir_6,
};

/// ISO IR 13, also known as JIS X 0201. Japanese romaji and half-width
/// katakana.
///
pub const ISO_IR_13: CharacterSet = CharacterSet {
  defined_term: "ISO_IR 13",
  description: "Japanese katakana",
  decode_next_codepoint: decoders::jis_x_0201,
};

/// ISO IR 100, also known as ISO 8859-1 and Latin-1. Used by many Western
/// European languages.
///
pub const ISO_IR_100: CharacterSet = CharacterSet {
  defined_term: "ISO_IR 100",
  description: "Latin alphabet No. 1",
  decode_next_codepoint: decoders::iso_8859_1,
};

/// ISO IR 144, also known as ISO 8859-5. Used by Slavic languages written in
/// a Cyrillic alphabet.
///
pub const ISO_IR_144: CharacterSet = CharacterSet {
  defined_term: "ISO_IR 144",
  description: "Cyrillic",
  decode_next_codepoint: decoders::iso_8859_5,
};

/// ISO IR 166, also known as TIS 620-2533 and ISO 8859-11. Thai.
///
pub const ISO_IR_166: CharacterSet = CharacterSet {
  defined_term: "ISO_IR 166",
  description: "Thai",
  decode_next_codepoint: decoders::tis_620,
};

/// ISO IR 192, i.e. Unicode in UTF-8.
///
pub const ISO_IR_192: CharacterSet = CharacterSet {
  defined_term: "ISO_IR 192",
  description: "Unicode in UTF-8",
  decode_next_codepoint: decoders::utf8,
};

/// The defined terms for character sets that are valid in DICOM data but
/// that this crate has no decoder for. These all require either an external
/// lookup table or ISO 2022 Code Extension support.
///
const RECOGNIZED_UNSUPPORTED: [&str; 12] = [
  "ISO_IR 101",
  "ISO_IR 109",
  "ISO_IR 110",
  "ISO_IR 126",
  "ISO_IR 127",
  "ISO_IR 138",
  "ISO_IR 148",
  "ISO_IR 203",
  "ISO_IR 58",
  "ISO_IR 87",
  "GB18030",
  "GBK",
];

/// Looks up a character set from its defined term. The comparison is done on
/// an uppercased defined term.
///
pub fn from_string(defined_term: &str) -> Result<&'static CharacterSet, String> {
  match defined_term {
    "ISO_IR 6" | "ISO IR 6" => Ok(&ISO_IR_6),
    "ISO_IR 13" => Ok(&ISO_IR_13),
    "ISO_IR 100" => Ok(&ISO_IR_100),
    "ISO_IR 144" => Ok(&ISO_IR_144),
    "ISO_IR 166" => Ok(&ISO_IR_166),
    "ISO_IR 192" => Ok(&ISO_IR_192),

    _ if RECOGNIZED_UNSUPPORTED.contains(&defined_term)
      || defined_term.starts_with("ISO 2022") =>
    {
      Err(format!(
        "Character set '{defined_term}' has no decoder available"
      ))
    }

    _ => Err(format!("Invalid character set: '{defined_term}'")),
  }
}
