/// Configuration used when reading DICOM P10 data.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct P10ReadConfig {
  pub(crate) max_token_size: u32,
  pub(crate) max_string_size: u32,
  pub(crate) max_sequence_depth: usize,
  pub(crate) require_dicm_prefix: bool,
  pub(crate) require_ordered_data_elements: bool,
}

impl Default for P10ReadConfig {
  fn default() -> Self {
    Self {
      max_token_size: 0xFFFFFFFE,
      max_string_size: 0xFFFFFFFE,
      max_sequence_depth: 10_000,
      require_dicm_prefix: false,
      require_ordered_data_elements: true,
    }
  }
}

impl P10ReadConfig {
  /// The maximum size in bytes of a DICOM P10 token emitted by a read
  /// context. Must be a multiple of 8; values that aren't are rounded down.
  ///
  /// The maximum token size bounds two tokens:
  ///
  /// 1. [`P10Token::FileMetaInformation`], where it caps the size of the
  ///    File Meta Information. Exceeding it errors the read.
  ///
  /// 2. [`P10Token::DataElementValueBytes`], where it caps the size of one
  ///    token's `data`. Data element values longer than this are split
  ///    across multiple tokens. Non-UTF-8 string values are the exception,
  ///    see [`P10ReadConfig::max_string_size()`].
  ///
  /// By default there is no limit, i.e. each data element value is emitted
  /// in exactly one token.
  ///
  /// [`P10Token::FileMetaInformation`]: crate::P10Token::FileMetaInformation
  /// [`P10Token::DataElementValueBytes`]:
  ///   crate::P10Token::DataElementValueBytes
  ///
  pub fn max_token_size(mut self, value: u32) -> Self {
    self.max_token_size = { value / 8 } * 8;
    self
  }

  /// The maximum size in bytes of non-UTF-8 string values. Such values are
  /// converted to UTF-8 by the read context, which requires the whole value
  /// to be buffered in memory regardless of the maximum token size.
  ///
  /// This maximum is never less than the maximum token size, and by default
  /// there is no limit.
  ///
  pub fn max_string_size(mut self, value: u32) -> Self {
    self.max_string_size = core::cmp::max(value, self.max_token_size);
    self
  }

  /// The maximum sequence nesting depth that can be read. Protects against
  /// malformed or malicious data with pathological nesting.
  ///
  /// Defaults to ten thousand, i.e. no meaningful maximum is enforced.
  ///
  pub fn max_sequence_depth(mut self, value: usize) -> Self {
    self.max_sequence_depth = value;
    self
  }

  /// Whether to require 'DICM' at bytes 128-132 of the input. This is
  /// required for well-formed DICOM P10 data but is absent in some data seen
  /// in the wild.
  ///
  /// Off by default.
  ///
  pub fn require_dicm_prefix(mut self, value: bool) -> Self {
    self.require_dicm_prefix = value;
    self
  }

  /// Whether to error when data elements are not in ascending tag order.
  /// Out-of-order data elements are malformed, and reading them in a
  /// streaming fashion can give incorrect results, e.g. a *'(0008,0005)
  /// Specific Character Set'* data element appearing after string data
  /// elements means they will have been decoded with the wrong character
  /// set, and a *'(gggg,00xx) Private Creator'* appearing after the data
  /// elements it names means their VRs can't be inferred.
  ///
  /// On by default.
  ///
  pub fn require_ordered_data_elements(mut self, value: bool) -> Self {
    self.require_ordered_data_elements = value;
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn max_token_size_is_multiple_of_8_test() {
    let config = P10ReadConfig::default().max_token_size(1001);
    assert_eq!(config.max_token_size, 1000);
  }

  #[test]
  fn max_string_size_is_at_least_max_token_size_test() {
    let config = P10ReadConfig::default()
      .max_token_size(4096)
      .max_string_size(1024);

    assert_eq!(config.max_string_size, 4096);
  }
}
