//! A data element value that can hold any of the DICOM value
//! representations. Data element values are usually stored in a [`DataSet`]
//! that maps data element tags to data element values.

use byteorder::ByteOrder;
use unicode_segmentation::UnicodeSegmentation;

use crate::{
  DataElementTag, DataError, DataSet, RcByteSlice, ValueRepresentation,
  dictionary, utils,
};

/// A DICOM data element value holding one of the following kinds of data:
///
/// 1. Binary value. Raw bytes for a specific VR. This is the most common
///    case. When the VR is a string type the bytes are UTF-8 encoded. The
///    data is always little endian.
///
/// 2. Lookup table descriptor value. Exactly six bytes holding three 16-bit
///    integers, the second of which is interpreted using the value's VR
///    (either `SignedShort` or `UnsignedShort`), while the first and last are
///    always unsigned. The raw bytes are preserved as-is.
///
/// 3. Encapsulated pixel data value. The raw item fragments of an
///    encapsulated pixel data sequence. The VR must be `OtherByteString` or
///    `OtherWordString`.
///
/// 4. Sequence value. A list of nested data sets.
///
/// Binary data is stored unparsed and is converted to a usable type on
/// request. This means non-conformant data, which is common in the wild, can
/// be passed through untouched.
///
/// Ref: PS3.5 6.2.
///
#[derive(Clone, Debug, PartialEq)]
pub struct DataElementValue(RawValue);

#[derive(Clone, Debug, PartialEq)]
enum RawValue {
  Binary {
    vr: ValueRepresentation,
    bytes: RcByteSlice,
  },
  LookupTableDescriptor {
    vr: ValueRepresentation,
    bytes: RcByteSlice,
  },
  EncapsulatedPixelData {
    vr: ValueRepresentation,
    items: Vec<RcByteSlice>,
  },
  Sequence {
    items: Vec<DataSet>,
  },
}

impl DataElementValue {
  /// Constructs a new binary data element value with the specified value
  /// representation. The only VR that's not allowed is
  /// [`ValueRepresentation::Sequence`]. The length of `bytes` must respect
  /// the VR's length requirements, and for string VRs the bytes must be valid
  /// UTF-8.
  ///
  pub fn new_binary(
    vr: ValueRepresentation,
    bytes: RcByteSlice,
  ) -> Result<Self, DataError> {
    if vr == ValueRepresentation::Sequence {
      return Err(DataError::new_value_invalid(format!(
        "Value representation '{vr}' is not valid for binary data"
      )));
    }

    if vr.is_string() && core::str::from_utf8(&bytes).is_err() {
      return Err(DataError::new_value_invalid(format!(
        "Bytes for '{vr}' are not valid UTF-8"
      )));
    }

    let value = Self::new_binary_unchecked(vr, bytes);
    value.validate_length()?;

    Ok(value)
  }

  /// Constructs a new binary data element value like [`Self::new_binary`],
  /// but without validating `vr` or `bytes`.
  ///
  pub fn new_binary_unchecked(
    vr: ValueRepresentation,
    bytes: RcByteSlice,
  ) -> Self {
    Self(RawValue::Binary { vr, bytes })
  }

  /// Constructs a new lookup table descriptor value. The VR must be
  /// [`ValueRepresentation::SignedShort`] or
  /// [`ValueRepresentation::UnsignedShort`], and `bytes` must be exactly six
  /// bytes long.
  ///
  pub fn new_lookup_table_descriptor(
    vr: ValueRepresentation,
    bytes: RcByteSlice,
  ) -> Result<Self, DataError> {
    if vr != ValueRepresentation::SignedShort
      && vr != ValueRepresentation::UnsignedShort
    {
      return Err(DataError::new_value_invalid(format!(
        "Value representation '{vr}' is not valid for lookup table \
         descriptor data"
      )));
    }

    let value = Self::new_lookup_table_descriptor_unchecked(vr, bytes);
    value.validate_length()?;

    Ok(value)
  }

  /// Constructs a new lookup table descriptor value like
  /// [`Self::new_lookup_table_descriptor`], but without validation.
  ///
  pub fn new_lookup_table_descriptor_unchecked(
    vr: ValueRepresentation,
    bytes: RcByteSlice,
  ) -> Self {
    Self(RawValue::LookupTableDescriptor { vr, bytes })
  }

  /// Constructs a new encapsulated pixel data value. The VR must be
  /// [`ValueRepresentation::OtherByteString`] or
  /// [`ValueRepresentation::OtherWordString`]. `items` holds the data of the
  /// encapsulated pixel data items, where the first item is an optional
  /// Basic Offset Table followed by fragments of pixel data. Each item must
  /// be of even length. Ref: PS3.5 A.4.
  ///
  pub fn new_encapsulated_pixel_data(
    vr: ValueRepresentation,
    items: Vec<RcByteSlice>,
  ) -> Result<Self, DataError> {
    if vr != ValueRepresentation::OtherByteString
      && vr != ValueRepresentation::OtherWordString
    {
      return Err(DataError::new_value_invalid(format!(
        "Value representation '{vr}' is not valid for encapsulated pixel data"
      )));
    }

    let value = Self::new_encapsulated_pixel_data_unchecked(vr, items);
    value.validate_length()?;

    Ok(value)
  }

  /// Constructs a new encapsulated pixel data value like
  /// [`Self::new_encapsulated_pixel_data`], but without validation.
  ///
  pub fn new_encapsulated_pixel_data_unchecked(
    vr: ValueRepresentation,
    items: Vec<RcByteSlice>,
  ) -> Self {
    Self(RawValue::EncapsulatedPixelData { vr, items })
  }

  /// Constructs a new sequence value from a list of items, each of which is a
  /// nested data set.
  ///
  pub fn new_sequence(items: Vec<DataSet>) -> Self {
    Self(RawValue::Sequence { items })
  }

  /// Creates a new `CodeString` data element value.
  ///
  pub fn new_code_string(values: &[&str]) -> Result<Self, DataError> {
    new_string_list(ValueRepresentation::CodeString, values)
  }

  /// Creates a new `IntegerString` data element value.
  ///
  pub fn new_integer_string(values: &[i32]) -> Result<Self, DataError> {
    let s = values
      .iter()
      .map(|i| i.to_string())
      .collect::<Vec<_>>()
      .join("\\");

    let mut bytes = s.into_bytes();
    ValueRepresentation::IntegerString.pad_bytes_to_even_length(&mut bytes);

    Self::new_binary(ValueRepresentation::IntegerString, bytes.into())
  }

  /// Creates a new `DecimalString` data element value.
  ///
  pub fn new_decimal_string(values: &[f64]) -> Result<Self, DataError> {
    let s = values
      .iter()
      .map(|f| {
        // DS values are limited to 16 bytes
        let mut s = format!("{f}");
        s.truncate(16);
        s
      })
      .collect::<Vec<_>>()
      .join("\\");

    let mut bytes = s.into_bytes();
    ValueRepresentation::DecimalString.pad_bytes_to_even_length(&mut bytes);

    Self::new_binary(ValueRepresentation::DecimalString, bytes.into())
  }

  /// Creates a new `LongString` data element value.
  ///
  pub fn new_long_string(values: &[&str]) -> Result<Self, DataError> {
    new_string_list(ValueRepresentation::LongString, values)
  }

  /// Creates a new `LongText` data element value.
  ///
  pub fn new_long_text(value: &str) -> Result<Self, DataError> {
    let mut bytes = value.as_bytes().to_vec();
    ValueRepresentation::LongText.pad_bytes_to_even_length(&mut bytes);

    Self::new_binary(ValueRepresentation::LongText, bytes.into())
  }

  /// Creates a new `PersonName` data element value.
  ///
  pub fn new_person_name(values: &[&str]) -> Result<Self, DataError> {
    new_string_list(ValueRepresentation::PersonName, values)
  }

  /// Creates a new `ShortString` data element value.
  ///
  pub fn new_short_string(values: &[&str]) -> Result<Self, DataError> {
    new_string_list(ValueRepresentation::ShortString, values)
  }

  /// Creates a new `UniqueIdentifier` data element value.
  ///
  pub fn new_unique_identifier(values: &[&str]) -> Result<Self, DataError> {
    new_string_list(ValueRepresentation::UniqueIdentifier, values)
  }

  /// Creates a new `OtherByteString` data element value.
  ///
  pub fn new_other_byte_string(bytes: Vec<u8>) -> Result<Self, DataError> {
    Self::new_binary(ValueRepresentation::OtherByteString, bytes.into())
  }

  /// Creates a new `OtherWordString` data element value.
  ///
  pub fn new_other_word_string(bytes: Vec<u8>) -> Result<Self, DataError> {
    Self::new_binary(ValueRepresentation::OtherWordString, bytes.into())
  }

  /// Creates a new `OtherVeryLongString` data element value.
  ///
  pub fn new_other_very_long_string(
    values: &[u64],
  ) -> Result<Self, DataError> {
    let mut bytes = vec![0u8; values.len() * 8];
    byteorder::LittleEndian::write_u64_into(values, &mut bytes);

    Self::new_binary(ValueRepresentation::OtherVeryLongString, bytes.into())
  }

  /// Creates a new `SignedShort` data element value.
  ///
  pub fn new_signed_short(values: &[i16]) -> Result<Self, DataError> {
    let mut bytes = vec![0u8; values.len() * 2];
    byteorder::LittleEndian::write_i16_into(values, &mut bytes);

    Self::new_binary(ValueRepresentation::SignedShort, bytes.into())
  }

  /// Creates a new `UnsignedShort` data element value.
  ///
  pub fn new_unsigned_short(values: &[u16]) -> Result<Self, DataError> {
    let mut bytes = vec![0u8; values.len() * 2];
    byteorder::LittleEndian::write_u16_into(values, &mut bytes);

    Self::new_binary(ValueRepresentation::UnsignedShort, bytes.into())
  }

  /// Creates a new `UnsignedLong` data element value.
  ///
  pub fn new_unsigned_long(values: &[u32]) -> Result<Self, DataError> {
    let mut bytes = vec![0u8; values.len() * 4];
    byteorder::LittleEndian::write_u32_into(values, &mut bytes);

    Self::new_binary(ValueRepresentation::UnsignedLong, bytes.into())
  }

  /// Returns the value representation of a data element value.
  ///
  pub fn value_representation(&self) -> ValueRepresentation {
    match &self.0 {
      RawValue::Binary { vr, .. }
      | RawValue::LookupTableDescriptor { vr, .. }
      | RawValue::EncapsulatedPixelData { vr, .. } => *vr,
      RawValue::Sequence { .. } => ValueRepresentation::Sequence,
    }
  }

  /// Returns the raw bytes of a data element value that holds a single chunk
  /// of binary data. Sequences and encapsulated pixel data error.
  ///
  pub fn bytes(&self) -> Result<&RcByteSlice, DataError> {
    match &self.0 {
      RawValue::Binary { bytes, .. }
      | RawValue::LookupTableDescriptor { bytes, .. } => Ok(bytes),
      _ => Err(DataError::new_value_not_present()),
    }
  }

  /// Returns the raw bytes of a data element value when its VR is one of the
  /// specified allowed VRs.
  ///
  pub fn vr_bytes(
    &self,
    allowed_vrs: &[ValueRepresentation],
  ) -> Result<&RcByteSlice, DataError> {
    if allowed_vrs.contains(&self.value_representation()) {
      self.bytes()
    } else {
      Err(DataError::new_value_not_present())
    }
  }

  /// Returns the items of a sequence value.
  ///
  pub fn sequence_items(&self) -> Result<&Vec<DataSet>, DataError> {
    match &self.0 {
      RawValue::Sequence { items } => Ok(items),
      _ => Err(DataError::new_value_not_present()),
    }
  }

  /// Returns the items of a sequence value for mutation.
  ///
  pub fn sequence_items_mut(&mut self) -> Result<&mut Vec<DataSet>, DataError> {
    match &mut self.0 {
      RawValue::Sequence { items } => Ok(items),
      _ => Err(DataError::new_value_not_present()),
    }
  }

  /// Returns the item fragments of an encapsulated pixel data value.
  ///
  pub fn encapsulated_pixel_data(
    &self,
  ) -> Result<&Vec<RcByteSlice>, DataError> {
    match &self.0 {
      RawValue::EncapsulatedPixelData { items, .. } => Ok(items),
      _ => Err(DataError::new_value_not_present()),
    }
  }

  /// Returns the singular string value of a data element. Errors if the value
  /// isn't a string, or it holds other than exactly one string.
  ///
  pub fn get_string(&self) -> Result<&str, DataError> {
    let vr = self.value_representation();

    if !vr.is_string() {
      return Err(DataError::new_value_not_present());
    }

    let s = core::str::from_utf8(self.bytes()?).map_err(|_| {
      DataError::new_value_invalid("String bytes are not valid UTF-8".into())
    })?;

    if is_multi_valued_string_vr(vr) {
      match s.split('\\').collect::<Vec<_>>().as_slice() {
        [s] => Ok(trim_string_value(vr, s)),
        _ => Err(DataError::new_multiplicity_mismatch()),
      }
    } else {
      Ok(trim_string_value(vr, s))
    }
  }

  /// Returns all string values of a data element. Errors if the value isn't
  /// of a string type that supports multiplicity.
  ///
  pub fn get_strings(&self) -> Result<Vec<&str>, DataError> {
    let vr = self.value_representation();

    if !is_multi_valued_string_vr(vr) {
      return Err(DataError::new_value_not_present());
    }

    let s = core::str::from_utf8(self.bytes()?).map_err(|_| {
      DataError::new_value_invalid("String bytes are not valid UTF-8".into())
    })?;

    Ok(s.split('\\').map(|s| trim_string_value(vr, s)).collect())
  }

  /// Returns the singular integer value of a data element, converted to the
  /// requested integer type. Errors if the value doesn't hold exactly one
  /// integer or it is out of range for the requested type.
  ///
  pub fn get_int<T: num_traits::NumCast>(&self) -> Result<T, DataError> {
    match self.get_ints_internal()?.as_slice() {
      [i] => num_traits::NumCast::from(*i).ok_or_else(|| {
        DataError::new_value_invalid(format!("Integer {i} is out of range"))
      }),
      _ => Err(DataError::new_multiplicity_mismatch()),
    }
  }

  /// Returns all integer values of a data element, converted to the requested
  /// integer type.
  ///
  pub fn get_ints<T: num_traits::NumCast>(&self) -> Result<Vec<T>, DataError> {
    self
      .get_ints_internal()?
      .iter()
      .map(|i| {
        num_traits::NumCast::from(*i).ok_or_else(|| {
          DataError::new_value_invalid(format!("Integer {i} is out of range"))
        })
      })
      .collect()
  }

  fn get_ints_internal(&self) -> Result<Vec<i128>, DataError> {
    use crate::ValueRepresentation as VR;

    match &self.0 {
      RawValue::Binary { vr: VR::IntegerString, bytes } => {
        let s = core::str::from_utf8(bytes).map_err(|_| {
          DataError::new_value_invalid(
            "IntegerString bytes are not valid UTF-8".into(),
          )
        })?;

        let s = s.trim_matches(['\0', ' ']);
        if s.is_empty() {
          return Ok(vec![]);
        }

        s.split('\\')
          .map(|value| {
            value.trim_matches(' ').parse::<i128>().map_err(|_| {
              DataError::new_value_invalid(format!(
                "IntegerString value '{value}' is invalid"
              ))
            })
          })
          .collect()
      }

      RawValue::Binary { vr, bytes } => match vr {
        VR::SignedShort => Ok(split_chunks(bytes, 2)?
          .map(|b| i128::from(byteorder::LittleEndian::read_i16(b)))
          .collect()),
        VR::UnsignedShort => Ok(split_chunks(bytes, 2)?
          .map(|b| i128::from(byteorder::LittleEndian::read_u16(b)))
          .collect()),
        VR::SignedLong => Ok(split_chunks(bytes, 4)?
          .map(|b| i128::from(byteorder::LittleEndian::read_i32(b)))
          .collect()),
        VR::UnsignedLong => Ok(split_chunks(bytes, 4)?
          .map(|b| i128::from(byteorder::LittleEndian::read_u32(b)))
          .collect()),
        VR::SignedVeryLong => Ok(split_chunks(bytes, 8)?
          .map(|b| i128::from(byteorder::LittleEndian::read_i64(b)))
          .collect()),
        VR::UnsignedVeryLong => Ok(split_chunks(bytes, 8)?
          .map(|b| i128::from(byteorder::LittleEndian::read_u64(b)))
          .collect()),

        _ => Err(DataError::new_value_not_present()),
      },

      // The first and last values of a lookup table descriptor are unsigned,
      // the middle value is interpreted using the VR
      RawValue::LookupTableDescriptor { vr, bytes } => {
        if bytes.len() != 6 {
          return Err(DataError::new_value_invalid(
            "Lookup table descriptor has invalid size".into(),
          ));
        }

        let entry_count =
          i128::from(byteorder::LittleEndian::read_u16(&bytes[0..2]));
        let first_value = match vr {
          VR::SignedShort => {
            i128::from(byteorder::LittleEndian::read_i16(&bytes[2..4]))
          }
          _ => i128::from(byteorder::LittleEndian::read_u16(&bytes[2..4])),
        };
        let bits_per_entry =
          i128::from(byteorder::LittleEndian::read_u16(&bytes[4..6]));

        Ok(vec![entry_count, first_value, bits_per_entry])
      }

      _ => Err(DataError::new_value_not_present()),
    }
  }

  /// Returns the singular floating point value of a data element.
  ///
  pub fn get_float(&self) -> Result<f64, DataError> {
    match self.get_floats()?.as_slice() {
      [f] => Ok(*f),
      _ => Err(DataError::new_multiplicity_mismatch()),
    }
  }

  /// Returns all floating point values of a data element.
  ///
  pub fn get_floats(&self) -> Result<Vec<f64>, DataError> {
    use crate::ValueRepresentation as VR;

    match &self.0 {
      RawValue::Binary { vr: VR::DecimalString, bytes } => {
        let s = core::str::from_utf8(bytes).map_err(|_| {
          DataError::new_value_invalid(
            "DecimalString bytes are not valid UTF-8".into(),
          )
        })?;

        let s = s.trim_matches(['\0', ' ']);
        if s.is_empty() {
          return Ok(vec![]);
        }

        s.split('\\')
          .map(|value| {
            value.trim_matches(' ').parse::<f64>().map_err(|_| {
              DataError::new_value_invalid(format!(
                "DecimalString value '{value}' is invalid"
              ))
            })
          })
          .collect()
      }

      RawValue::Binary { vr: VR::FloatingPointSingle, bytes } => {
        Ok(split_chunks(bytes, 4)?
          .map(|b| f64::from(byteorder::LittleEndian::read_f32(b)))
          .collect())
      }

      RawValue::Binary { vr: VR::FloatingPointDouble, bytes } => {
        Ok(split_chunks(bytes, 8)?
          .map(byteorder::LittleEndian::read_f64)
          .collect())
      }

      _ => Err(DataError::new_value_not_present()),
    }
  }

  /// Returns the total size in bytes of a data element value, excluding the
  /// size of any containing structures.
  ///
  pub fn total_byte_size(&self) -> u64 {
    match &self.0 {
      RawValue::Binary { bytes, .. }
      | RawValue::LookupTableDescriptor { bytes, .. } => bytes.len() as u64,

      RawValue::EncapsulatedPixelData { items, .. } => {
        items.iter().map(|item| item.len() as u64).sum()
      }

      RawValue::Sequence { items } => {
        items.iter().map(|item| item.total_byte_size()).sum()
      }
    }
  }

  /// Checks that the length of a data element value respects the length
  /// requirements of its value representation.
  ///
  pub fn validate_length(&self) -> Result<(), DataError> {
    let vr = self.value_representation();

    match &self.0 {
      RawValue::Binary { bytes, .. } => {
        let requirements = vr.length_requirements();

        if bytes.len() > requirements.bytes_max {
          return Err(DataError::new_value_length_invalid(
            vr,
            bytes.len() as u64,
            format!("Must not exceed {} bytes", requirements.bytes_max),
          ));
        }

        if let Some(multiple_of) = requirements.bytes_multiple_of
          && bytes.len() % multiple_of != 0
        {
          return Err(DataError::new_value_length_invalid(
            vr,
            bytes.len() as u64,
            format!("Must be a multiple of {multiple_of} bytes"),
          ));
        }

        Ok(())
      }

      RawValue::LookupTableDescriptor { bytes, .. } => {
        if bytes.len() == 6 {
          Ok(())
        } else {
          Err(DataError::new_value_length_invalid(
            vr,
            bytes.len() as u64,
            "Lookup table descriptor length must be exactly 6 bytes".into(),
          ))
        }
      }

      RawValue::EncapsulatedPixelData { items, .. } => {
        for item in items {
          if item.len() % 2 == 1 {
            return Err(DataError::new_value_length_invalid(
              vr,
              item.len() as u64,
              "Encapsulated pixel data item lengths must be even".into(),
            ));
          }
        }

        Ok(())
      }

      RawValue::Sequence { .. } => Ok(()),
    }
  }

  /// Formats a data element value as a human-readable single line of text.
  /// Output longer than `output_width` is truncated with a trailing ellipsis.
  ///
  pub fn to_string(&self, _tag: DataElementTag, output_width: usize) -> String {
    // The maximum number of items that could be needed in a comma-separated
    // list of values before reaching the output width
    let max_list_size = output_width.div_ceil(3);

    let result: Result<(String, Option<String>), ()> = match &self.0 {
      RawValue::Binary { vr, bytes } if vr.is_string() => {
        match core::str::from_utf8(bytes) {
          Ok(s) => {
            let formatted = if is_multi_valued_string_vr(*vr) {
              s.split('\\')
                .map(|value| format!("{:?}", trim_string_value(*vr, value)))
                .collect::<Vec<_>>()
                .join(", ")
            } else {
              format!("{:?}", trim_string_value(*vr, s))
            };

            // Add a descriptive suffix for recognized UIDs
            let suffix = if *vr == ValueRepresentation::UniqueIdentifier {
              dictionary::uid_name(s.trim_end_matches('\0'))
                .ok()
                .map(|name| format!(" ({name})"))
            } else {
              None
            };

            Ok((formatted, suffix))
          }

          Err(_) => Ok(("!! Invalid UTF-8 data".to_string(), None)),
        }
      }

      RawValue::Binary { vr, bytes } => match vr {
        ValueRepresentation::FloatingPointDouble
        | ValueRepresentation::FloatingPointSingle => self
          .get_floats()
          .map(|floats| {
            (
              floats
                .iter()
                .take(max_list_size)
                .map(|f| format!("{f:?}"))
                .collect::<Vec<_>>()
                .join(", "),
              None,
            )
          })
          .map_err(|_| ()),

        ValueRepresentation::SignedShort
        | ValueRepresentation::SignedLong
        | ValueRepresentation::SignedVeryLong
        | ValueRepresentation::UnsignedShort
        | ValueRepresentation::UnsignedLong
        | ValueRepresentation::UnsignedVeryLong => self
          .get_ints::<i128>()
          .map(|ints| {
            (
              ints
                .iter()
                .take(max_list_size)
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(", "),
              None,
            )
          })
          .map_err(|_| ()),

        ValueRepresentation::AttributeTag => match split_chunks(bytes, 4) {
          Ok(chunks) => Ok((
            chunks
              .take(max_list_size)
              .map(|b| {
                DataElementTag::new(
                  byteorder::LittleEndian::read_u16(&b[0..2]),
                  byteorder::LittleEndian::read_u16(&b[2..4]),
                )
                .to_string()
              })
              .collect::<Vec<_>>()
              .join(", "),
            None,
          )),

          Err(_) => Err(()),
        },

        _ => Ok((utils::inspect_u8_slice(bytes, max_list_size), None)),
      },

      RawValue::LookupTableDescriptor { .. } => self
        .get_ints::<i128>()
        .map(|ints| {
          (
            ints
              .iter()
              .map(|i| i.to_string())
              .collect::<Vec<_>>()
              .join(", "),
            None,
          )
        })
        .map_err(|_| ()),

      RawValue::EncapsulatedPixelData { items, .. } => {
        let total_size: usize = items.iter().map(|item| item.len()).sum();

        Ok((
          format!("Items: {}, bytes: {}", items.len(), total_size),
          None,
        ))
      }

      RawValue::Sequence { items } => {
        Ok((format!("Items: {}", items.len()), None))
      }
    };

    match result {
      Ok((s, suffix)) => {
        let suffix = suffix.unwrap_or_default();

        // Width available for the value once the suffix is taken into
        // account. Always allow at least 10 characters.
        let output_width =
          core::cmp::max(output_width.saturating_sub(suffix.len()), 10);

        if s.len() > output_width {
          let graphemes =
            UnicodeSegmentation::graphemes(s.as_str(), true)
              .collect::<Vec<&str>>();

          if graphemes.len() > output_width {
            format!("{} …{}", graphemes[0..output_width - 2].join(""), suffix)
          } else {
            format!("{s}{suffix}")
          }
        } else {
          format!("{s}{suffix}")
        }
      }

      Err(()) => "<error converting to string>".to_string(),
    }
  }
}

/// Returns whether a string VR uses backslash-delimited multiple values.
///
fn is_multi_valued_string_vr(vr: ValueRepresentation) -> bool {
  matches!(
    vr,
    ValueRepresentation::AgeString
      | ValueRepresentation::CodeString
      | ValueRepresentation::Date
      | ValueRepresentation::DateTime
      | ValueRepresentation::DecimalString
      | ValueRepresentation::IntegerString
      | ValueRepresentation::LongString
      | ValueRepresentation::PersonName
      | ValueRepresentation::ShortString
      | ValueRepresentation::Time
      | ValueRepresentation::UniqueIdentifier
      | ValueRepresentation::UnlimitedCharacters
  )
}

/// Strips the padding that applies to a string VR: trailing NUL bytes for
/// `UniqueIdentifier`, trailing spaces for other string VRs, and leading
/// spaces too for VRs where leading spaces are not significant.
///
fn trim_string_value(vr: ValueRepresentation, s: &str) -> &str {
  match vr {
    ValueRepresentation::UniqueIdentifier => s.trim_end_matches('\0'),

    ValueRepresentation::UnlimitedCharacters
    | ValueRepresentation::LongText
    | ValueRepresentation::ShortText
    | ValueRepresentation::UnlimitedText => s.trim_end_matches(' '),

    _ => s.trim_matches(' '),
  }
}

/// Splits bytes into exact chunks of the given size, erroring if the data
/// isn't an exact multiple of the chunk size.
///
fn split_chunks(
  bytes: &[u8],
  chunk_size: usize,
) -> Result<core::slice::ChunksExact<'_, u8>, DataError> {
  if bytes.len() % chunk_size != 0 {
    return Err(DataError::new_value_invalid(format!(
      "Data of length {} is not a multiple of {} bytes",
      bytes.len(),
      chunk_size
    )));
  }

  Ok(bytes.chunks_exact(chunk_size))
}

/// Builds a string data element value from a list of values joined with
/// backslashes and padded to even length.
///
fn new_string_list(
  vr: ValueRepresentation,
  values: &[&str],
) -> Result<DataElementValue, DataError> {
  for value in values {
    if value.contains('\\') {
      return Err(DataError::new_value_invalid(format!(
        "String list value for '{vr}' contains backslashes"
      )));
    }
  }

  let mut bytes = values.join("\\").into_bytes();
  vr.pad_bytes_to_even_length(&mut bytes);

  DataElementValue::new_binary(vr, bytes.into())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_binary_validates_test() {
    assert!(
      DataElementValue::new_binary(
        ValueRepresentation::Sequence,
        vec![].into()
      )
      .is_err()
    );

    assert!(
      DataElementValue::new_binary(
        ValueRepresentation::UnsignedShort,
        vec![0, 1, 2].into()
      )
      .is_err()
    );

    assert!(
      DataElementValue::new_binary(
        ValueRepresentation::LongString,
        vec![0xFF, 0xFE].into()
      )
      .is_err()
    );
  }

  #[test]
  fn get_string_test() {
    let value = DataElementValue::new_unique_identifier(&["1.23"]).unwrap();
    assert_eq!(value.bytes().unwrap().len(), 4);
    assert_eq!(value.get_string(), Ok("1.23"));

    let value = DataElementValue::new_code_string(&["A", "B"]).unwrap();
    assert_eq!(value.get_string(), Err(DataError::new_multiplicity_mismatch()));
    assert_eq!(value.get_strings(), Ok(vec!["A", "B"]));

    let value = DataElementValue::new_long_text("Hi ").unwrap();
    assert_eq!(value.get_string(), Ok("Hi"));
  }

  #[test]
  fn get_int_test() {
    let value = DataElementValue::new_unsigned_short(&[0xFFFF]).unwrap();
    assert_eq!(value.get_int::<u16>(), Ok(0xFFFF));
    assert!(value.get_int::<i16>().is_err());

    let value = DataElementValue::new_signed_short(&[-1]).unwrap();
    assert_eq!(value.get_int::<i64>(), Ok(-1));

    let value = DataElementValue::new_integer_string(&[10, -20]).unwrap();
    assert_eq!(value.get_ints::<i32>(), Ok(vec![10, -20]));
    assert!(value.get_int::<i32>().is_err());
  }

  #[test]
  fn get_float_test() {
    let value = DataElementValue::new_decimal_string(&[1.5, -0.25]).unwrap();
    assert_eq!(value.get_floats(), Ok(vec![1.5, -0.25]));
  }

  #[test]
  fn lookup_table_descriptor_test() {
    let value = DataElementValue::new_lookup_table_descriptor(
      ValueRepresentation::SignedShort,
      vec![0x00, 0x01, 0xFF, 0xFF, 0x10, 0x00].into(),
    )
    .unwrap();

    assert_eq!(value.get_ints::<i128>(), Ok(vec![256, -1, 16]));

    let value = DataElementValue::new_lookup_table_descriptor(
      ValueRepresentation::UnsignedShort,
      vec![0x00, 0x01, 0xFF, 0xFF, 0x10, 0x00].into(),
    )
    .unwrap();

    assert_eq!(value.get_ints::<i128>(), Ok(vec![256, 65535, 16]));
  }

  #[test]
  fn to_string_test() {
    let value = DataElementValue::new_unsigned_short(&[1, 2, 3]).unwrap();
    assert_eq!(value.to_string(DataElementTag::ZERO, 80), "1, 2, 3");

    let value =
      DataElementValue::new_unique_identifier(&["1.2.840.10008.1.2.1"])
        .unwrap();
    assert_eq!(
      value.to_string(DataElementTag::ZERO, 80),
      "\"1.2.840.10008.1.2.1\" (Explicit VR Little Endian)"
    );

    let value = DataElementValue::new_sequence(vec![DataSet::new()]);
    assert_eq!(value.to_string(DataElementTag::ZERO, 80), "Items: 1");
  }
}
