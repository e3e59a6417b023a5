//! Tracks where in the hierarchy of sequences and items a DICOM P10 read is
//! currently at, along with the data needed to correctly interpret incoming
//! data elements at that position.
//!
//! The location tracks:
//!
//! 1. The end offsets of defined-length sequences and items, so that
//!    synthetic delimiter tokens can be emitted when those offsets are
//!    reached. This converts defined lengths to undefined lengths.
//!
//! 2. The active specific character set used to decode string values that
//!    aren't UTF-8. Set by the *'(0008,0005) Specific Character Set'* data
//!    element, most commonly in the root data set, and overridable inside a
//!    sequence item.
//!
//! 3. The values of data elements needed to determine the VR of later data
//!    elements when the transfer syntax is 'Implicit VR Little Endian'. E.g.
//!    *'(0028,0106) Smallest Image Pixel Value'* is either `UnsignedShort`
//!    or `SignedShort` depending on the value of *'(0028,0103) Pixel
//!    Representation'*.

use std::collections::BTreeMap;

use dcmstream_charset::{SpecificCharacterSet, StringType};
use dcmstream_core::{
  DataElementTag, RcByteSlice, ValueRepresentation, dictionary, utils,
};

use crate::{P10Error, P10Token, internal::value_length::ValueLength};

/// A P10 location is a stack of entries with the innermost entry at the end.
/// A root data set entry is always at the bottom, followed by alternating
/// sequence and item entries.
///
#[derive(Debug)]
pub struct P10Location {
  entries: Vec<LocationEntry>,
}

#[derive(Debug)]
enum LocationEntry {
  RootDataSet {
    clarifying_data_elements: ClarifyingDataElements,
    last_data_element_tag: DataElementTag,
  },
  Sequence {
    tag: DataElementTag,
    is_implicit_vr: bool,
    ends_at: Option<u64>,
    item_count: usize,
  },
  Item {
    clarifying_data_elements: ClarifyingDataElements,
    last_data_element_tag: DataElementTag,
    ends_at: Option<u64>,
  },
}

/// The data elements whose values are needed to determine the VRs of some
/// later data elements in implicit VR transfer syntaxes, and to decode
/// non-UTF-8 string data.
///
#[derive(Clone, Debug)]
struct ClarifyingDataElements {
  specific_character_set: SpecificCharacterSet,
  bits_allocated: Option<u16>,
  pixel_representation: Option<u16>,
  waveform_bits_stored: Option<u16>,
  waveform_bits_allocated: Option<u16>,
  private_creators: BTreeMap<DataElementTag, String>,
}

impl Default for ClarifyingDataElements {
  fn default() -> Self {
    Self {
      specific_character_set: SpecificCharacterSet::default(),
      bits_allocated: None,
      pixel_representation: None,
      waveform_bits_stored: None,
      waveform_bits_allocated: None,
      private_creators: BTreeMap::new(),
    }
  }
}

impl ClarifyingDataElements {
  fn private_creator_for_tag(&self, tag: DataElementTag) -> Option<&String> {
    if !tag.is_private() {
      return None;
    }

    let private_creator_tag = tag.with_element(tag.element >> 8);

    self.private_creators.get(&private_creator_tag)
  }
}

/// Returns whether a data element tag is for a clarifying data element whose
/// full value needs to be materialized by the read process and recorded in
/// the location.
///
pub fn is_clarifying_data_element(tag: DataElementTag) -> bool {
  tag == dictionary::SPECIFIC_CHARACTER_SET.tag
    || tag == dictionary::BITS_ALLOCATED.tag
    || tag == dictionary::PIXEL_REPRESENTATION.tag
    || tag == dictionary::WAVEFORM_BITS_STORED.tag
    || tag == dictionary::WAVEFORM_BITS_ALLOCATED.tag
    || tag.is_private_creator()
}

impl P10Location {
  /// Creates a new P10 location with an initial entry for the root data set.
  ///
  pub fn new() -> Self {
    Self {
      entries: vec![LocationEntry::RootDataSet {
        clarifying_data_elements: ClarifyingDataElements::default(),
        last_data_element_tag: DataElementTag::ZERO,
      }],
    }
  }

  /// Checks that the given data element tag is greater than the previous tag
  /// at the current location. Data elements in a data set or sequence item
  /// must appear in ascending order, and enforcing this matters for
  /// streaming reads because lower-numbered data elements are used in the
  /// interpretation of higher-numbered ones.
  ///
  #[allow(clippy::result_unit_err)]
  pub fn check_data_element_ordering(
    &mut self,
    tag: DataElementTag,
  ) -> Result<(), ()> {
    match self.entries.last_mut() {
      Some(LocationEntry::RootDataSet {
        last_data_element_tag,
        ..
      })
      | Some(LocationEntry::Item {
        last_data_element_tag,
        ..
      }) => {
        if tag > *last_data_element_tag {
          *last_data_element_tag = tag;
          Ok(())
        } else {
          Err(())
        }
      }

      Some(LocationEntry::Sequence { .. }) => Ok(()),

      None => Err(()),
    }
  }

  /// Returns whether any sequence in the location forces the use of the
  /// 'Implicit VR Little Endian' transfer syntax for its content. This
  /// happens for sequences read from an explicit VR of `UN` (Unknown) with
  /// undefined length.
  ///
  /// Ref: DICOM Correction Proposal CP-246.
  ///
  pub fn is_implicit_vr_forced(&self) -> bool {
    self.entries.iter().any(|entry| {
      matches!(
        entry,
        LocationEntry::Sequence {
          is_implicit_vr: true,
          ..
        }
      )
    })
  }

  /// Swaps the endianness of value bytes for a data element.
  ///
  /// Pixel data and waveform data with a VR of OW but a bits allocated value
  /// of 32 or 64 actually store 32/64-bit words rather than the 16-bit words
  /// the VR indicates, and are swapped at their actual width.
  ///
  pub fn swap_endianness(
    &self,
    tag: DataElementTag,
    vr: ValueRepresentation,
    data: &mut [u8],
  ) {
    let vr = if vr == ValueRepresentation::OtherWordString {
      let bits_allocated = if tag == dictionary::PIXEL_DATA.tag {
        self.active_clarifying_data_elements().bits_allocated
      } else if tag == dictionary::WAVEFORM_DATA.tag {
        self
          .active_clarifying_data_elements()
          .waveform_bits_allocated
      } else {
        None
      };

      match bits_allocated {
        Some(32) => ValueRepresentation::UnsignedLong,
        Some(64) => ValueRepresentation::UnsignedVeryLong,
        _ => vr,
      }
    } else {
      vr
    };

    vr.swap_endianness(data);
  }

  /// Checks whether the entry at the head of the location is a
  /// defined-length sequence or item whose end offset has been reached, and
  /// if so pops it and returns the delimiter token to emit for it.
  ///
  pub fn next_delimiter_token(&mut self, bytes_read: u64) -> Option<P10Token> {
    match self.entries.last() {
      Some(LocationEntry::Sequence {
        tag,
        ends_at: Some(ends_at),
        ..
      }) if *ends_at <= bytes_read => {
        let tag = *tag;
        self.entries.pop();
        Some(P10Token::SequenceDelimiter { tag })
      }

      Some(LocationEntry::Item {
        ends_at: Some(ends_at),
        ..
      }) if *ends_at <= bytes_read => {
        self.entries.pop();
        Some(P10Token::SequenceItemDelimiter)
      }

      _ => None,
    }
  }

  /// Returns the delimiter tokens needed to close every open sequence and
  /// item in the location, innermost first, ending with [`P10Token::End`],
  /// regardless of whether any end offsets have been reached.
  ///
  pub fn pending_delimiter_tokens(&self) -> Vec<P10Token> {
    self
      .entries
      .iter()
      .rev()
      .map(|entry| match entry {
        LocationEntry::Sequence { tag, .. } => {
          P10Token::SequenceDelimiter { tag: *tag }
        }
        LocationEntry::Item { .. } => P10Token::SequenceItemDelimiter,
        LocationEntry::RootDataSet { .. } => P10Token::End,
      })
      .collect()
  }

  /// Pushes a new sequence onto the location.
  ///
  pub fn add_sequence(
    &mut self,
    tag: DataElementTag,
    is_implicit_vr: bool,
    ends_at: Option<u64>,
  ) -> Result<(), String> {
    match self.entries.last() {
      Some(LocationEntry::RootDataSet { .. })
      | Some(LocationEntry::Item { .. }) => {
        self.entries.push(LocationEntry::Sequence {
          tag,
          is_implicit_vr,
          ends_at,
          item_count: 0,
        });

        Ok(())
      }

      _ => {
        let private_creator = self
          .active_clarifying_data_elements()
          .private_creator_for_tag(tag);

        Err(format!(
          "Sequence data element '{}' encountered outside of the root data \
           set or an item",
          dictionary::tag_with_name(tag, private_creator.map(|x| x.as_str()))
        ))
      }
    }
  }

  /// Pops the current sequence off the location, returning its tag.
  ///
  pub fn end_sequence(&mut self) -> Result<DataElementTag, String> {
    match self.entries.last() {
      Some(LocationEntry::Sequence { tag, .. }) => {
        let tag = *tag;
        self.entries.pop();
        Ok(tag)
      }

      _ => {
        Err("Sequence delimiter encountered outside of a sequence".to_string())
      }
    }
  }

  /// Pushes a new item onto the location and returns its index. The item
  /// inherits a snapshot of the currently active clarifying data elements as
  /// its initial state.
  ///
  pub fn add_item(
    &mut self,
    ends_at: Option<u64>,
    length: ValueLength,
  ) -> Result<usize, String> {
    let clarifying_data_elements =
      self.active_clarifying_data_elements().clone();

    match self.entries.last_mut() {
      Some(LocationEntry::Sequence { item_count, .. }) => {
        let index = *item_count;

        *item_count += 1;

        self.entries.push(LocationEntry::Item {
          clarifying_data_elements,
          last_data_element_tag: DataElementTag::ZERO,
          ends_at,
        });

        Ok(index)
      }

      _ => Err(format!(
        "Item encountered outside of a sequence, length: {length}"
      )),
    }
  }

  /// Increments the item count of the current sequence for a new pixel data
  /// item and returns the item's index. Pixel data items don't push a
  /// location entry because they can't contain nested data elements.
  ///
  pub fn add_pixel_data_item(&mut self) -> Result<usize, String> {
    match self.entries.last_mut() {
      Some(LocationEntry::Sequence { item_count, .. }) => {
        let index = *item_count;
        *item_count += 1;
        Ok(index)
      }

      _ => {
        Err("Pixel data item encountered outside of a sequence".to_string())
      }
    }
  }

  /// Pops the current item off the location.
  ///
  pub fn end_item(&mut self) -> Result<(), String> {
    match self.entries.last() {
      Some(LocationEntry::Item { .. }) => {
        self.entries.pop();
        Ok(())
      }

      _ => Err("Item delimiter encountered outside of an item".to_string()),
    }
  }

  /// Returns the clarifying data elements that apply at the current
  /// location, i.e. those of the innermost item, or of the root data set.
  ///
  fn active_clarifying_data_elements(&self) -> &ClarifyingDataElements {
    for entry in self.entries.iter().rev() {
      match entry {
        LocationEntry::RootDataSet {
          clarifying_data_elements,
          ..
        }
        | LocationEntry::Item {
          clarifying_data_elements,
          ..
        } => return clarifying_data_elements,

        _ => (),
      }
    }

    unreachable!();
  }

  fn active_clarifying_data_elements_mut(
    &mut self,
  ) -> &mut ClarifyingDataElements {
    for entry in self.entries.iter_mut().rev() {
      match entry {
        LocationEntry::RootDataSet {
          clarifying_data_elements,
          ..
        }
        | LocationEntry::Item {
          clarifying_data_elements,
          ..
        } => return clarifying_data_elements,

        _ => (),
      }
    }

    unreachable!();
  }

  /// Records a clarifying data element's value in the location.
  ///
  /// The *'(0008,0005) Specific Character Set'* data element is the only one
  /// whose value bytes are altered: they are rewritten to `ISO_IR 192` so
  /// that downstream consumers only ever see UTF-8.
  ///
  pub fn add_clarifying_data_element(
    &mut self,
    tag: DataElementTag,
    vr: ValueRepresentation,
    value_bytes: &mut RcByteSlice,
  ) -> Result<(), P10Error> {
    if tag == dictionary::SPECIFIC_CHARACTER_SET.tag {
      self.update_specific_character_set(value_bytes)?;
    } else if vr == ValueRepresentation::UnsignedShort {
      let value_bytes: &[u8] = value_bytes;
      if let Ok(bytes) = TryInto::<[u8; 2]>::try_into(value_bytes) {
        self.update_unsigned_short_clarifying_data_element(
          tag,
          u16::from_le_bytes(bytes),
        );
      }
    } else if vr == ValueRepresentation::LongString && tag.is_private_creator()
    {
      self.update_private_creator(tag, value_bytes);
    }

    Ok(())
  }

  fn update_specific_character_set(
    &mut self,
    value_bytes: &mut RcByteSlice,
  ) -> Result<(), P10Error> {
    let charset_string = core::str::from_utf8(value_bytes).map_err(|_| {
      P10Error::SpecificCharacterSetInvalid {
        specific_character_set: utils::inspect_u8_slice(value_bytes, 64),
        details: "Invalid UTF-8".to_string(),
      }
    })?;

    let charset =
      SpecificCharacterSet::from_string(charset_string).map_err(|details| {
        P10Error::SpecificCharacterSetInvalid {
          specific_character_set: charset_string.chars().take(64).collect(),
          details,
        }
      })?;

    self
      .active_clarifying_data_elements_mut()
      .specific_character_set = charset;

    *value_bytes = b"ISO_IR 192".to_vec().into();

    Ok(())
  }

  fn update_unsigned_short_clarifying_data_element(
    &mut self,
    tag: DataElementTag,
    value: u16,
  ) {
    let clarifying_data_elements = self.active_clarifying_data_elements_mut();

    if tag == dictionary::BITS_ALLOCATED.tag {
      clarifying_data_elements.bits_allocated = Some(value);
    } else if tag == dictionary::PIXEL_REPRESENTATION.tag {
      clarifying_data_elements.pixel_representation = Some(value);
    } else if tag == dictionary::WAVEFORM_BITS_STORED.tag {
      clarifying_data_elements.waveform_bits_stored = Some(value);
    } else if tag == dictionary::WAVEFORM_BITS_ALLOCATED.tag {
      clarifying_data_elements.waveform_bits_allocated = Some(value);
    }
  }

  fn update_private_creator(
    &mut self,
    tag: DataElementTag,
    value_bytes: &[u8],
  ) {
    let private_creator = match core::str::from_utf8(value_bytes) {
      Ok(value) => value.trim_end_matches(' ').to_string(),
      Err(_) => return,
    };

    self
      .active_clarifying_data_elements_mut()
      .private_creators
      .insert(tag, private_creator);
  }

  /// Returns whether the currently active specific character set is byte
  /// compatible with UTF-8.
  ///
  pub fn is_specific_character_set_utf8_compatible(&self) -> bool {
    self
      .active_clarifying_data_elements()
      .specific_character_set
      .is_utf8_compatible()
  }

  /// Decodes encoded string bytes using the currently active specific
  /// character set and returns their UTF-8 bytes, re-padded to even length.
  ///
  pub fn decode_string_bytes(
    &self,
    vr: ValueRepresentation,
    value_bytes: &[u8],
  ) -> Vec<u8> {
    let charset = &self
      .active_clarifying_data_elements()
      .specific_character_set;

    let string_type = match vr {
      ValueRepresentation::PersonName => StringType::PersonName,

      ValueRepresentation::LongString
      | ValueRepresentation::ShortString
      | ValueRepresentation::UnlimitedCharacters => StringType::MultiValue,

      _ => StringType::SingleValue,
    };

    let mut bytes = charset.decode_bytes(value_bytes, string_type).into_bytes();

    vr.pad_bytes_to_even_length(&mut bytes);

    bytes
  }

  /// When reading an implicit VR transfer syntax, determines the VR for a
  /// data element, or the tag of the clarifying data element that was
  /// missing or invalid when the VR can't be determined.
  ///
  /// Most data elements have exactly one valid VR in the dictionary. The
  /// data elements that allow more than one VR need additional context:
  ///
  /// - US/SS ambiguity resolves through *'(0028,0103) Pixel
  ///   Representation'*.
  /// - OB/OW ambiguity for waveform values resolves through *'(003A,021A)
  ///   Waveform Bits Stored'* or *'(5400,1004) Waveform Bits Allocated'*.
  /// - *'(7FE0,0010) Pixel Data'* is always OW because OB is not usable in
  ///   an implicit VR transfer syntax. Ref: PS3.5 8.2.
  /// - *'(60xx,3000) Overlay Data'* is always OW. Ref: PS3.5 8.1.2.
  /// - *'(0028,3006) LUT Data'* reads as OW, under which the raw bytes of
  ///   both candidate VRs are identical.
  ///
  /// Anything else resolves to UN.
  ///
  pub fn infer_vr_for_tag(
    &self,
    tag: DataElementTag,
  ) -> Result<ValueRepresentation, DataElementTag> {
    let clarifying_data_elements = self.active_clarifying_data_elements();

    let private_creator = clarifying_data_elements.private_creator_for_tag(tag);

    let allowed_vrs =
      match dictionary::find(tag, private_creator.map(|x| x.as_str())) {
        Ok(item) => item.vrs,
        Err(()) => &[],
      };

    match allowed_vrs {
      [vr] => Ok(*vr),

      [
        ValueRepresentation::OtherByteString,
        ValueRepresentation::OtherWordString,
      ] => {
        if tag == dictionary::PIXEL_DATA.tag {
          Ok(ValueRepresentation::OtherWordString)
        } else if tag.group >= 0x6000
          && tag.group <= 0x60FF
          && tag.element == 0x3000
        {
          Ok(ValueRepresentation::OtherWordString)
        } else if tag == dictionary::CHANNEL_MINIMUM_VALUE.tag
          || tag == dictionary::CHANNEL_MAXIMUM_VALUE.tag
        {
          match clarifying_data_elements.waveform_bits_stored {
            Some(8) => Ok(ValueRepresentation::OtherByteString),
            Some(16) => Ok(ValueRepresentation::OtherWordString),
            _ => Err(dictionary::WAVEFORM_BITS_STORED.tag),
          }
        } else if tag == dictionary::WAVEFORM_PADDING_VALUE.tag
          || tag == dictionary::WAVEFORM_DATA.tag
        {
          match clarifying_data_elements.waveform_bits_allocated {
            Some(8) => Ok(ValueRepresentation::OtherByteString),
            Some(16) => Ok(ValueRepresentation::OtherWordString),
            _ => Err(dictionary::WAVEFORM_BITS_ALLOCATED.tag),
          }
        } else {
          Ok(ValueRepresentation::Unknown)
        }
      }

      [
        ValueRepresentation::UnsignedShort,
        ValueRepresentation::SignedShort,
      ] => match clarifying_data_elements.pixel_representation {
        Some(0) => Ok(ValueRepresentation::UnsignedShort),
        Some(1) => Ok(ValueRepresentation::SignedShort),
        _ => Err(dictionary::PIXEL_REPRESENTATION.tag),
      },

      [
        ValueRepresentation::UnsignedShort,
        ValueRepresentation::OtherWordString,
      ] if tag == dictionary::LUT_DATA.tag => {
        Ok(ValueRepresentation::OtherWordString)
      }

      _ => Ok(ValueRepresentation::Unknown),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn data_element_ordering_test() {
    let mut location = P10Location::new();

    assert_eq!(
      location.check_data_element_ordering(DataElementTag::new(8, 0x20)),
      Ok(())
    );
    assert_eq!(
      location.check_data_element_ordering(DataElementTag::new(8, 0x21)),
      Ok(())
    );
    assert_eq!(
      location.check_data_element_ordering(DataElementTag::new(8, 0x21)),
      Err(())
    );

    // A new item starts a fresh ordering scope
    location
      .add_sequence(DataElementTag::new(8, 0x1140), false, None)
      .unwrap();
    location.add_item(None, ValueLength::Undefined).unwrap();

    assert_eq!(
      location.check_data_element_ordering(DataElementTag::new(8, 0x18)),
      Ok(())
    );
  }

  #[test]
  fn us_ss_disambiguation_test() {
    let mut location = P10Location::new();

    let tag = dictionary::SMALLEST_IMAGE_PIXEL_VALUE.tag;

    // Unknown when pixel representation hasn't been seen
    assert_eq!(
      location.infer_vr_for_tag(tag),
      Err(dictionary::PIXEL_REPRESENTATION.tag)
    );

    location
      .add_clarifying_data_element(
        dictionary::PIXEL_REPRESENTATION.tag,
        ValueRepresentation::UnsignedShort,
        &mut vec![1, 0].into(),
      )
      .unwrap();

    assert_eq!(
      location.infer_vr_for_tag(tag),
      Ok(ValueRepresentation::SignedShort)
    );
  }

  #[test]
  fn overlay_data_infers_ow_test() {
    let location = P10Location::new();

    assert_eq!(
      location.infer_vr_for_tag(DataElementTag::new(0x6004, 0x3000)),
      Ok(ValueRepresentation::OtherWordString)
    );
  }

  #[test]
  fn pixel_data_infers_ow_test() {
    let location = P10Location::new();

    assert_eq!(
      location.infer_vr_for_tag(dictionary::PIXEL_DATA.tag),
      Ok(ValueRepresentation::OtherWordString)
    );
  }

  #[test]
  fn unknown_tag_infers_un_test() {
    let location = P10Location::new();

    assert_eq!(
      location.infer_vr_for_tag(DataElementTag::new(0x0009, 0x1010)),
      Ok(ValueRepresentation::Unknown)
    );
  }

  #[test]
  fn specific_character_set_is_rewritten_to_utf8_test() {
    let mut location = P10Location::new();

    let mut value_bytes: RcByteSlice = b"ISO_IR 100".to_vec().into();
    location
      .add_clarifying_data_element(
        dictionary::SPECIFIC_CHARACTER_SET.tag,
        ValueRepresentation::CodeString,
        &mut value_bytes,
      )
      .unwrap();

    assert_eq!(&*value_bytes, b"ISO_IR 192");
    assert!(!location.is_specific_character_set_utf8_compatible());
  }

  #[test]
  fn swap_endianness_uses_bits_allocated_test() {
    let mut location = P10Location::new();

    location
      .add_clarifying_data_element(
        dictionary::BITS_ALLOCATED.tag,
        ValueRepresentation::UnsignedShort,
        &mut vec![32, 0].into(),
      )
      .unwrap();

    let mut data = [0, 0, 0, 1, 0, 0, 0, 2];
    location.swap_endianness(
      dictionary::PIXEL_DATA.tag,
      ValueRepresentation::OtherWordString,
      &mut data,
    );

    assert_eq!(data, [1, 0, 0, 0, 2, 0, 0, 0]);
  }

  #[test]
  fn delimiter_tokens_test() {
    let mut location = P10Location::new();

    location
      .add_sequence(DataElementTag::new(8, 0x1140), false, Some(100))
      .unwrap();
    location.add_item(Some(80), ValueLength::new(40)).unwrap();

    assert_eq!(location.next_delimiter_token(50), None);
    assert_eq!(
      location.next_delimiter_token(80),
      Some(P10Token::SequenceItemDelimiter)
    );
    assert_eq!(
      location.next_delimiter_token(100),
      Some(P10Token::SequenceDelimiter {
        tag: DataElementTag::new(8, 0x1140)
      })
    );

    assert_eq!(location.pending_delimiter_tokens(), vec![P10Token::End]);
  }
}
