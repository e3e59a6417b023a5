//! Defines the tokens that DICOM P10 data is parsed into by the `p10_read`
//! module and serialized from by the `p10_write` module.

use dcmstream_core::{
  DataElementTag, DataElementValue, DataSet, DataSetPath, RcByteSlice,
  TransferSyntax, ValueRepresentation, dictionary,
};

use crate::internal::{
  data_element_header::DataElementHeader, value_length::ValueLength,
};

/// A DICOM P10 token is the smallest piece of structured DICOM P10 data. A
/// stream of these tokens is most commonly the result of progressively
/// reading raw DICOM P10 bytes, or of converting an in-memory data set into
/// tokens for serialization.
///
#[derive(Clone, Debug, PartialEq)]
pub enum P10Token {
  /// The 128-byte File Preamble and the "DICM" prefix present at the start
  /// of DICOM P10 data. The content of the preamble bytes is
  /// application-defined and is commonly all zeroes.
  ///
  /// When reading data that has no File Preamble and "DICM" prefix this
  /// token is emitted with all bytes set to zero.
  FilePreambleAndDICMPrefix { preamble: Box<[u8; 128]> },

  /// The File Meta Information, materialized into a data set.
  ///
  /// When reading data that has no File Meta Information this token is
  /// emitted with an empty data set.
  FileMetaInformation { data_set: DataSet },

  /// The start of the next data element. Always followed by one or more
  /// [`P10Token::DataElementValueBytes`] tokens carrying the value bytes.
  DataElementHeader {
    tag: DataElementTag,
    vr: ValueRepresentation,
    length: u32,
    path: DataSetPath,
  },

  /// Raw bytes for the value of the current data element. Values whose
  /// length exceeds the maximum token size are split across multiple of
  /// these tokens. `bytes_remaining` is the number of bytes still to come
  /// after this token; zero marks the final token for the value.
  DataElementValueBytes {
    tag: DataElementTag,
    vr: ValueRepresentation,
    data: RcByteSlice,
    bytes_remaining: u32,
  },

  /// The start of a new sequence. When this is the start of an encapsulated
  /// pixel data sequence the VR is [`ValueRepresentation::OtherByteString`]
  /// or [`ValueRepresentation::OtherWordString`]; otherwise it is
  /// [`ValueRepresentation::Sequence`].
  SequenceStart {
    tag: DataElementTag,
    vr: ValueRepresentation,
    path: DataSetPath,
  },

  /// The end of the current sequence.
  SequenceDelimiter { tag: DataElementTag },

  /// The start of a new item in the current sequence.
  SequenceItemStart { index: usize },

  /// The end of the current sequence item.
  SequenceItemDelimiter,

  /// The start of a new item in the current encapsulated pixel data
  /// sequence. The item's fragment data follows in one or more
  /// [`P10Token::DataElementValueBytes`] tokens. There is no item delimiter.
  PixelDataItem { index: usize, length: u32 },

  /// The end of the DICOM P10 data. All provided data has been successfully
  /// parsed.
  End,
}

impl core::fmt::Display for P10Token {
  fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
    match self {
      P10Token::FilePreambleAndDICMPrefix { .. } => {
        write!(f, "FilePreambleAndDICMPrefix")
      }

      P10Token::FileMetaInformation { data_set } => {
        let elements = data_set
          .iter()
          .map(|(tag, value)| {
            format!(
              "{}: {}",
              DataElementHeader {
                tag: *tag,
                vr: Some(value.value_representation()),
                length: ValueLength::ZERO,
              },
              value.to_string(*tag, 80)
            )
          })
          .collect::<Vec<String>>()
          .join(", ");

        write!(f, "FileMetaInformation: {elements}")
      }

      P10Token::DataElementHeader {
        tag, vr, length, ..
      } => write!(
        f,
        "DataElementHeader: {}, name: {}, vr: {}, length: {} bytes",
        tag,
        dictionary::tag_name(*tag, None),
        vr,
        length
      ),

      P10Token::DataElementValueBytes {
        data,
        bytes_remaining,
        ..
      } => write!(
        f,
        "DataElementValueBytes: {} bytes of data, {} bytes remaining",
        data.len(),
        bytes_remaining
      ),

      P10Token::SequenceStart { tag, vr, .. } => write!(
        f,
        "SequenceStart: {}, name: {}, vr: {}",
        tag,
        dictionary::tag_name(*tag, None),
        vr
      ),

      P10Token::SequenceDelimiter { .. } => write!(f, "SequenceDelimiter"),

      P10Token::SequenceItemStart { index } => {
        write!(f, "SequenceItemStart: item {index}")
      }

      P10Token::SequenceItemDelimiter => write!(f, "SequenceItemDelimiter"),

      P10Token::PixelDataItem { index, length } => {
        write!(f, "PixelDataItem: item {index}, {length} bytes")
      }

      P10Token::End => write!(f, "End"),
    }
  }
}

impl P10Token {
  /// Returns whether this token is part of the file header prior to the main
  /// data set, i.e. a [`P10Token::FilePreambleAndDICMPrefix`] or
  /// [`P10Token::FileMetaInformation`] token.
  ///
  pub fn is_header_token(&self) -> bool {
    matches!(
      self,
      P10Token::FilePreambleAndDICMPrefix { .. }
        | P10Token::FileMetaInformation { .. }
    )
  }

  /// If this token is a [`P10Token::FileMetaInformation`] then changes the
  /// transfer syntax it specifies. Other tokens are unchanged.
  ///
  pub fn change_transfer_syntax(
    &mut self,
    new_transfer_syntax: &TransferSyntax,
  ) {
    if let P10Token::FileMetaInformation { data_set } = self {
      data_set
        .insert_string_value(
          &dictionary::TRANSFER_SYNTAX_UID,
          &[new_transfer_syntax.uid],
        )
        .unwrap();
    }
  }
}

/// Converts all the data elements in a data set directly to DICOM P10
/// tokens, returned via a callback.
///
pub fn data_elements_to_tokens<E>(
  data_set: &DataSet,
  path: &DataSetPath,
  token_callback: &mut impl FnMut(&P10Token) -> Result<(), E>,
) -> Result<(), E> {
  for (tag, value) in data_set.iter() {
    let mut path = path.clone();
    path.add_data_element(*tag).unwrap();

    data_element_to_tokens(*tag, value, &path, token_callback)?;
  }

  Ok(())
}

/// Converts a single DICOM data element to DICOM P10 tokens, returned via a
/// callback.
///
pub fn data_element_to_tokens<E>(
  tag: DataElementTag,
  value: &DataElementValue,
  path: &DataSetPath,
  token_callback: &mut impl FnMut(&P10Token) -> Result<(), E>,
) -> Result<(), E> {
  let vr = value.value_representation();

  // Values with their bytes directly available are written out as-is
  if let Ok(bytes) = value.bytes() {
    token_callback(&P10Token::DataElementHeader {
      tag,
      vr,
      length: bytes.len() as u32,
      path: path.clone(),
    })?;

    token_callback(&P10Token::DataElementValueBytes {
      tag,
      vr,
      data: bytes.clone(),
      bytes_remaining: 0,
    })?;

    return Ok(());
  }

  // Encapsulated pixel data writes each item individually followed by a
  // sequence delimiter
  if let Ok(items) = value.encapsulated_pixel_data() {
    token_callback(&P10Token::SequenceStart {
      tag,
      vr,
      path: path.clone(),
    })?;

    for (index, item) in items.iter().enumerate() {
      token_callback(&P10Token::PixelDataItem {
        index,
        length: item.len() as u32,
      })?;

      token_callback(&P10Token::DataElementValueBytes {
        tag: dictionary::ITEM.tag,
        vr,
        data: item.clone(),
        bytes_remaining: 0,
      })?;
    }

    token_callback(&P10Token::SequenceDelimiter { tag })?;

    return Ok(());
  }

  // Sequences write their item data sets recursively, each followed by an
  // item delimiter, with a sequence delimiter at the end
  if let Ok(items) = value.sequence_items() {
    token_callback(&P10Token::SequenceStart {
      tag,
      vr,
      path: path.clone(),
    })?;

    for (index, item) in items.iter().enumerate() {
      token_callback(&P10Token::SequenceItemStart { index })?;

      let mut path = path.clone();
      path.add_sequence_item(index).unwrap();

      data_elements_to_tokens(item, &path, token_callback)?;

      token_callback(&P10Token::SequenceItemDelimiter)?;
    }

    token_callback(&P10Token::SequenceDelimiter { tag })?;

    return Ok(());
  }

  // One of the branches above is always taken
  unreachable!();
}
