//! Decodes DICOM string data that uses a Specific Character Set into a
//! native UTF-8 string.
//!
//! The DICOM default repertoire, UTF-8, and the common single-byte character
//! sets are decoded directly. Character sets that require ISO 2022 Code
//! Extension techniques (e.g. Japanese and Korean multi-byte sets) are
//! recognized by name but are not decodable by this crate; a dedicated
//! decoder has to be plugged in by the consumer for such data.

mod internal;

use internal::character_set::{self, CharacterSet};

/// The type of string to be decoded. This determines the characters that act
/// as delimiters and reset the active character set during decoding of
/// encoded strings that use ISO 2022 escape sequences.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StringType {
  /// A single-valued string without multiplicity. Only the control
  /// characters act as delimiters. Used with the `ShortText`, `LongText`,
  /// and `UnlimitedText` value representations.
  SingleValue,

  /// A multi-valued string. The control characters and backslash act as
  /// delimiters. Used with the `LongString`, `ShortString`, and
  /// `UnlimitedCharacters` value representations.
  MultiValue,

  /// A person name string. The control characters, backslash, caret, and
  /// equals sign act as delimiters. Used with the `PersonName` value
  /// representation.
  PersonName,
}

/// A specific character set as defined by the *'(0008,0005) Specific
/// Character Set'* data element.
///
#[derive(Clone, Debug, PartialEq)]
pub struct SpecificCharacterSet(&'static CharacterSet);

impl SpecificCharacterSet {
  /// Converts the raw value of a *'(0008,0005) Specific Character Set'* data
  /// element into a [`SpecificCharacterSet`] that can decode bytes into a
  /// native string.
  ///
  /// Values naming more than one character set use ISO 2022 Code Extension
  /// techniques and are not supported, as are the multi-byte character sets
  /// that require them.
  ///
  pub fn from_string(specific_character_set: &str) -> Result<Self, String> {
    let charsets: Vec<String> = specific_character_set
      .split('\\')
      .map(str::trim)
      .map(str::to_uppercase)
      .collect();

    match charsets.as_slice() {
      // An empty value means the DICOM default character set
      [s] if s.is_empty() => Ok(Self(&character_set::ISO_IR_6)),

      [s] => character_set::from_string(s).map(Self),

      _ => Err(format!(
        "SpecificCharacterSet '{specific_character_set}' uses ISO 2022 code \
         extensions which are not supported"
      )),
    }
  }

  /// The defined term for this character set, e.g. `"ISO_IR 100"`.
  ///
  pub fn defined_term(&self) -> &'static str {
    self.0.defined_term
  }

  /// Returns whether this character set is byte compatible with UTF-8. This
  /// is only the case for the DICOM default character set (ISO_IR 6) and
  /// UTF-8 itself (ISO_IR 192).
  ///
  pub fn is_utf8_compatible(&self) -> bool {
    self.0 == &character_set::ISO_IR_6 || self.0 == &character_set::ISO_IR_192
  }

  /// Decodes bytes in this character set into a native string. Bytes that
  /// are invalid in the character set decode to the `?` character.
  ///
  /// The string type determines which characters delimit the individual
  /// values or components of the string. For the character sets supported by
  /// this crate delimiters do not affect decoding, but they are honored in
  /// the API so that ISO 2022 aware decoders can slot in behind it.
  ///
  pub fn decode_bytes(
    &self,
    mut bytes: &[u8],
    _string_type: StringType,
  ) -> String {
    let mut result = String::with_capacity(bytes.len());

    while !bytes.is_empty() {
      match (self.0.decode_next_codepoint)(bytes) {
        Ok((c, rest)) => {
          result.push(c);
          bytes = rest;
        }

        Err(()) => {
          result.push('?');
          bytes = &bytes[1..];
        }
      }
    }

    result
  }
}

impl Default for SpecificCharacterSet {
  fn default() -> Self {
    Self(&character_set::ISO_IR_6)
  }
}

/// Sanitizes bytes that should contain only characters from the Default
/// Character Repertoire by replacing disallowed bytes with a question mark.
/// The allowed bytes are the printable ASCII range plus the control
/// characters used as delimiters in DICOM string values.
///
pub fn sanitize_default_charset_bytes(bytes: &mut [u8]) {
  for byte in bytes.iter_mut() {
    let is_allowed = matches!(*byte, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x1B)
      || (0x20..=0x7E).contains(byte);

    if !is_allowed {
      *byte = b'?';
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn from_string_test() {
    assert!(SpecificCharacterSet::from_string("ISO_IR 6").is_ok());
    assert!(SpecificCharacterSet::from_string("").is_ok());
    assert!(SpecificCharacterSet::from_string("ISO_IR 100").is_ok());
    assert!(SpecificCharacterSet::from_string(" iso_ir 192 ").is_ok());

    assert!(SpecificCharacterSet::from_string("BAD_NAME").is_err());
    assert!(
      SpecificCharacterSet::from_string("ISO 2022 IR 13\\ISO 2022 IR 87")
        .is_err()
    );
  }

  #[test]
  fn is_utf8_compatible_test() {
    let charset = SpecificCharacterSet::from_string("ISO_IR 6").unwrap();
    assert!(charset.is_utf8_compatible());

    let charset = SpecificCharacterSet::from_string("ISO_IR 192").unwrap();
    assert!(charset.is_utf8_compatible());

    let charset = SpecificCharacterSet::from_string("ISO_IR 100").unwrap();
    assert!(!charset.is_utf8_compatible());
  }

  #[test]
  fn decode_latin_1_test() {
    let charset = SpecificCharacterSet::from_string("ISO_IR 100").unwrap();

    assert_eq!(
      charset.decode_bytes(b"caf\xE9", StringType::SingleValue),
      "café"
    );
  }

  #[test]
  fn decode_cyrillic_test() {
    let charset = SpecificCharacterSet::from_string("ISO_IR 144").unwrap();

    assert_eq!(
      charset.decode_bytes(
        &[0xBB, 0xEE, 0xDA, 0x30],
        StringType::SingleValue
      ),
      "Люк0"
    );
  }

  #[test]
  fn decode_thai_test() {
    let charset = SpecificCharacterSet::from_string("ISO_IR 166").unwrap();

    assert_eq!(
      charset.decode_bytes(&[0xA1, 0x20, 0xE4], StringType::SingleValue),
      "ก \u{0E44}"
    );
  }

  #[test]
  fn decode_utf8_test() {
    let charset = SpecificCharacterSet::from_string("ISO_IR 192").unwrap();

    assert_eq!(
      charset.decode_bytes("héllo".as_bytes(), StringType::SingleValue),
      "héllo"
    );

    // Invalid UTF-8 decodes to question marks
    assert_eq!(
      charset.decode_bytes(&[0x41, 0xFF, 0x42], StringType::SingleValue),
      "A?B"
    );
  }

  #[test]
  fn sanitize_default_charset_bytes_test() {
    let mut bytes = vec![0x41, 0xC3, 0xA9, 0x42, 0x0A];
    sanitize_default_charset_bytes(&mut bytes);

    assert_eq!(bytes, vec![0x41, 0x3F, 0x3F, 0x42, 0x0A]);
  }
}
