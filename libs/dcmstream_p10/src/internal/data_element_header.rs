use dcmstream_core::{DataElementTag, ValueRepresentation, dictionary};

use crate::internal::value_length::ValueLength;

/// The header of a single DICOM data element: its tag, VR, and value length.
/// The VR is optional because item and delimitation items don't have one.
///
pub struct DataElementHeader {
  pub tag: DataElementTag,
  pub vr: Option<ValueRepresentation>,
  pub length: ValueLength,
}

impl core::fmt::Display for DataElementHeader {
  /// Formats a data element header as `"(GROUP,ELEMENT) VR NAME"`, e.g.
  /// `"(0008,0020) DA Study Date"`.
  ///
  fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
    let tag_name = dictionary::tag_name(self.tag, None);

    match self.vr {
      Some(vr) => write!(f, "{} {} {}", self.tag, vr, tag_name),
      None => write!(f, "{} {}", self.tag, tag_name),
    }
  }
}

/// The two sizes that a value length can be stored in when using an explicit
/// VR transfer syntax.
///
pub enum ValueLengthSize {
  U16,
  U32,
}

impl ValueLengthSize {
  /// The maximum representable value length in bytes. `0xFFFFFFFF` is
  /// excluded for 32-bit lengths because it encodes the undefined length.
  ///
  pub fn max_length(&self) -> usize {
    match self {
      Self::U16 => 0xFFFF,
      Self::U32 => 0xFFFFFFFE,
    }
  }
}

impl DataElementHeader {
  /// Returns the size of the value length field for a VR when stored in the
  /// DICOM P10 format with explicit VRs.
  ///
  pub fn value_length_size(vr: ValueRepresentation) -> ValueLengthSize {
    match vr {
      ValueRepresentation::AgeString
      | ValueRepresentation::ApplicationEntity
      | ValueRepresentation::AttributeTag
      | ValueRepresentation::CodeString
      | ValueRepresentation::Date
      | ValueRepresentation::DateTime
      | ValueRepresentation::DecimalString
      | ValueRepresentation::FloatingPointDouble
      | ValueRepresentation::FloatingPointSingle
      | ValueRepresentation::IntegerString
      | ValueRepresentation::LongString
      | ValueRepresentation::LongText
      | ValueRepresentation::PersonName
      | ValueRepresentation::ShortString
      | ValueRepresentation::ShortText
      | ValueRepresentation::SignedLong
      | ValueRepresentation::SignedShort
      | ValueRepresentation::Time
      | ValueRepresentation::UniqueIdentifier
      | ValueRepresentation::UnsignedLong
      | ValueRepresentation::UnsignedShort => ValueLengthSize::U16,

      ValueRepresentation::OtherByteString
      | ValueRepresentation::OtherDoubleString
      | ValueRepresentation::OtherFloatString
      | ValueRepresentation::OtherLongString
      | ValueRepresentation::OtherVeryLongString
      | ValueRepresentation::OtherWordString
      | ValueRepresentation::Sequence
      | ValueRepresentation::SignedVeryLong
      | ValueRepresentation::UniversalResourceIdentifier
      | ValueRepresentation::Unknown
      | ValueRepresentation::UnlimitedCharacters
      | ValueRepresentation::UnlimitedText
      | ValueRepresentation::UnsignedVeryLong => ValueLengthSize::U32,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn to_string_test() {
    assert_eq!(
      DataElementHeader {
        tag: dictionary::STUDY_DATE.tag,
        vr: Some(ValueRepresentation::Date),
        length: ValueLength::ZERO,
      }
      .to_string(),
      "(0008,0020) DA Study Date"
    );

    assert_eq!(
      DataElementHeader {
        tag: dictionary::ITEM.tag,
        vr: None,
        length: ValueLength::ZERO,
      }
      .to_string(),
      "(FFFE,E000) Item"
    );
  }

  #[test]
  fn value_length_size_test() {
    assert!(matches!(
      DataElementHeader::value_length_size(ValueRepresentation::Date),
      ValueLengthSize::U16
    ));
    assert!(matches!(
      DataElementHeader::value_length_size(
        ValueRepresentation::OtherByteString
      ),
      ValueLengthSize::U32
    ));
    assert_eq!(ValueLengthSize::U16.max_length(), 0xFFFF);
    assert_eq!(ValueLengthSize::U32.max_length(), 0xFFFFFFFE);
  }
}
