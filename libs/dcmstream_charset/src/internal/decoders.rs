//! Codepoint decoders for the character sets that can be decoded without
//! lookup tables or ISO 2022 escape sequence handling.

/// Decodes the next codepoint of ISO 646 / US-ASCII data. Bytes outside the
/// 7-bit range are invalid.
///
pub fn iso_ir_6(bytes: &[u8]) -> Result<(char, &[u8]), ()> {
  match bytes.split_first() {
    Some((byte, rest)) if *byte < 0x80 => Ok((*byte as char, rest)),
    _ => Err(()),
  }
}

/// Decodes the next codepoint of ISO 8859-1 / Latin-1 data, where every byte
/// maps directly onto the Unicode codepoint of the same value.
///
pub fn iso_8859_1(bytes: &[u8]) -> Result<(char, &[u8]), ()> {
  match bytes.split_first() {
    Some((byte, rest)) => Ok((*byte as char, rest)),
    None => Err(()),
  }
}

/// Decodes the next codepoint of ISO 8859-5 Cyrillic data. The high half maps
/// onto the U+0400 block, with three exceptions.
///
pub fn iso_8859_5(bytes: &[u8]) -> Result<(char, &[u8]), ()> {
  let (byte, rest) = bytes.split_first().ok_or(())?;

  let codepoint = match *byte {
    b if b < 0xA0 => u32::from(b),
    0xA0 => 0x00A0,
    0xAD => 0x00AD,
    0xF0 => 0x2116,
    0xFD => 0x00A7,
    b => 0x0400 + u32::from(b) - 0xA0,
  };

  Ok((char::from_u32(codepoint).ok_or(())?, rest))
}

/// Decodes the next codepoint of TIS 620-2533 Thai data. The high half maps
/// onto the U+0E00 block, with undefined gaps.
///
pub fn tis_620(bytes: &[u8]) -> Result<(char, &[u8]), ()> {
  let (byte, rest) = bytes.split_first().ok_or(())?;

  let codepoint = match *byte {
    b if b < 0xA0 => u32::from(b),
    0xA0 => 0x00A0,
    b @ (0xA1..=0xDA | 0xDF..=0xFB) => 0x0E00 + u32::from(b) - 0xA0,
    _ => return Err(()),
  };

  Ok((char::from_u32(codepoint).ok_or(())?, rest))
}

/// Decodes the next codepoint of JIS X 0201 data: ASCII with the yen sign
/// and overline substitutions, plus half-width katakana in the high half.
///
pub fn jis_x_0201(bytes: &[u8]) -> Result<(char, &[u8]), ()> {
  let (byte, rest) = bytes.split_first().ok_or(())?;

  let codepoint = match *byte {
    0x5C => 0x00A5,
    0x7E => 0x203E,
    b if b < 0x80 => u32::from(b),
    b @ 0xA1..=0xDF => 0xFF61 + u32::from(b) - 0xA1,
    _ => return Err(()),
  };

  Ok((char::from_u32(codepoint).ok_or(())?, rest))
}

/// Decodes the next codepoint of UTF-8 data.
///
pub fn utf8(bytes: &[u8]) -> Result<(char, &[u8]), ()> {
  if bytes.is_empty() {
    return Err(());
  }

  let sequence_length = match bytes[0] {
    0x00..=0x7F => 1,
    0xC2..=0xDF => 2,
    0xE0..=0xEF => 3,
    0xF0..=0xF4 => 4,
    _ => return Err(()),
  };

  if bytes.len() < sequence_length {
    return Err(());
  }

  let (sequence, rest) = bytes.split_at(sequence_length);

  match core::str::from_utf8(sequence) {
    Ok(s) => Ok((s.chars().next().ok_or(())?, rest)),
    Err(_) => Err(()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn iso_ir_6_test() {
    assert_eq!(iso_ir_6(b"Az"), Ok(('A', b"z".as_slice())));
    assert_eq!(iso_ir_6(&[0x80]), Err(()));
  }

  #[test]
  fn iso_8859_5_test() {
    assert_eq!(iso_8859_5(&[0xA1]).unwrap().0, 'Ё');
    assert_eq!(iso_8859_5(&[0xF1]).unwrap().0, 'ё');
    assert_eq!(iso_8859_5(&[0xF0]).unwrap().0, '№');
  }

  #[test]
  fn jis_x_0201_test() {
    assert_eq!(jis_x_0201(&[0x5C]).unwrap().0, '¥');
    assert_eq!(jis_x_0201(&[0xA6]).unwrap().0, 'ヲ');
  }

  #[test]
  fn utf8_test() {
    assert_eq!(utf8("é!".as_bytes()), Ok(('é', b"!".as_slice())));
    assert_eq!(utf8(&[0xC3]), Err(()));
    assert_eq!(utf8(&[0xFF, 0x41]), Err(()));
  }
}
