//! Serializes a stream of DICOM P10 tokens, or a complete data set, into
//! DICOM P10 bytes.

use byteorder::ByteOrder;

use dcmstream_core::{
  DataElementValue, DataSet, DataSetPath, RcByteSlice, TransferSyntax,
  dictionary, transfer_syntax, transfer_syntax::Endianness,
};

use crate::{
  P10Error, P10FilterTransform, P10InsertTransform, P10Token, P10WriteConfig,
  internal::{
    data_element_header::{DataElementHeader, ValueLengthSize},
    value_length::ValueLength,
  },
  p10_token,
};

/// Data is compressed in chunks of this size when writing a deflated
/// transfer syntax.
///
const ZLIB_DEFLATE_CHUNK_SIZE: usize = 64 * 1024;

/// A write context holds the state of an in-progress DICOM P10 write. DICOM
/// P10 tokens are fed in with [`Self::write_token`], and the serialized P10
/// bytes they produce are collected with [`Self::read_bytes`].
///
pub struct P10WriteContext {
  config: P10WriteConfig,
  p10_bytes: Vec<RcByteSlice>,
  p10_total_byte_count: u64,
  is_ended: bool,
  transfer_syntax: &'static TransferSyntax,
  zlib_stream: Option<flate2::Compress>,
  path: DataSetPath,
  sequence_item_counts: Vec<usize>,
}

impl P10WriteContext {
  /// Creates a new write context for writing DICOM P10 data.
  ///
  pub fn new(config: Option<P10WriteConfig>) -> Self {
    Self {
      config: config.unwrap_or_default(),
      p10_bytes: vec![],
      p10_total_byte_count: 0,
      is_ended: false,
      transfer_syntax: &transfer_syntax::IMPLICIT_VR_LITTLE_ENDIAN,
      zlib_stream: None,
      path: DataSetPath::new(),
      sequence_item_counts: vec![],
    }
  }

  /// Returns the DICOM P10 bytes generated by recent calls to
  /// [`Self::write_token`] and clears them from the write context.
  ///
  pub fn read_bytes(&mut self) -> Vec<RcByteSlice> {
    core::mem::take(&mut self.p10_bytes)
  }

  /// Writes the next DICOM P10 token to the write context. Use
  /// [`Self::read_bytes`] to collect the bytes generated as a result.
  ///
  pub fn write_token(&mut self, token: &P10Token) -> Result<(), P10Error> {
    if self.is_ended {
      return Err(P10Error::TokenStreamInvalid {
        when: "Writing DICOM P10 token".to_string(),
        details: "Received a token after the write was completed".to_string(),
        token: token.clone(),
      });
    }

    match token {
      // The File Meta Information token determines the transfer syntax for
      // the main data set, and starts a zlib compressor when that transfer
      // syntax is deflated. The File Meta Information's own bytes are never
      // deflated.
      P10Token::FileMetaInformation { data_set } => {
        let transfer_syntax_uid = data_set
          .get_string(dictionary::TRANSFER_SYNTAX_UID.tag)
          .unwrap_or(transfer_syntax::IMPLICIT_VR_LITTLE_ENDIAN.uid);

        self.transfer_syntax = TransferSyntax::from_uid(transfer_syntax_uid)
          .map_err(|_| P10Error::TransferSyntaxNotSupported {
            transfer_syntax_uid: transfer_syntax_uid.to_string(),
          })?;

        if self.transfer_syntax.is_deflated {
          self.zlib_stream = Some(flate2::Compress::new(
            flate2::Compression::new(self.config.zlib_compression_level),
            false,
          ));
        }

        let token_bytes = self.file_meta_information_to_bytes(data_set)?;
        self.p10_total_byte_count += token_bytes.len() as u64;
        self.p10_bytes.push(token_bytes);

        Ok(())
      }

      // The end token flushes all remaining data out of the zlib stream when
      // one is active, and completes the write
      P10Token::End => {
        if let Some(zlib_stream) = self.zlib_stream.as_mut() {
          loop {
            let mut output = vec![0u8; ZLIB_DEFLATE_CHUNK_SIZE];

            let total_out = zlib_stream.total_out();
            let status = zlib_stream
              .compress(&[], &mut output, flate2::FlushCompress::Finish)
              .map_err(|e| P10Error::OtherError {
                error_type: "Zlib deflate failure".to_string(),
                details: e.to_string(),
              })?;
            output.resize((zlib_stream.total_out() - total_out) as usize, 0);

            if !output.is_empty() {
              self.p10_total_byte_count += output.len() as u64;
              self.p10_bytes.push(output.into());
            }

            if status == flate2::Status::StreamEnd {
              break;
            }
          }

          self.zlib_stream = None;
        }

        self.is_ended = true;

        Ok(())
      }

      token => {
        // Update the current path for tokens that descend
        match token {
          P10Token::DataElementHeader { tag, .. } => {
            self.path.add_data_element(*tag)
          }

          P10Token::SequenceStart { tag, .. } => {
            self.sequence_item_counts.push(0);
            self.path.add_data_element(*tag)
          }

          P10Token::SequenceItemStart { .. }
          | P10Token::PixelDataItem { .. } => {
            match self.sequence_item_counts.last_mut() {
              Some(count) => {
                *count += 1;
                self.path.add_sequence_item(*count - 1)
              }
              None => Err("No active sequence".to_string()),
            }
          }

          _ => Ok(()),
        }
        .map_err(|_| P10Error::TokenStreamInvalid {
          when: "Writing token to context".to_string(),
          details: "The data set path is not in a valid state for this token"
            .to_string(),
          token: token.clone(),
        })?;

        let token_bytes = self.token_to_bytes(token)?;

        // Update the current path for tokens that ascend
        match token {
          P10Token::DataElementValueBytes {
            bytes_remaining: 0, ..
          }
          | P10Token::SequenceItemDelimiter => self.path.pop(),

          P10Token::SequenceDelimiter { .. } => {
            self.sequence_item_counts.pop();
            self.path.pop()
          }

          _ => Ok(()),
        }
        .map_err(|_| P10Error::TokenStreamInvalid {
          when: "Writing token to context".to_string(),
          details: "The data set path is empty".to_string(),
          token: token.clone(),
        })?;

        // Pass the bytes through the zlib compressor when one is active
        if self.zlib_stream.is_some() {
          self.deflate_token_bytes(&token_bytes)?;
        } else {
          self.p10_total_byte_count += token_bytes.len() as u64;
          self.p10_bytes.push(token_bytes);
        }

        Ok(())
      }
    }
  }

  fn deflate_token_bytes(
    &mut self,
    token_bytes: &[u8],
  ) -> Result<(), P10Error> {
    let zlib_stream = self.zlib_stream.as_mut().unwrap();

    let mut bytes_remaining = token_bytes;

    while !bytes_remaining.is_empty() {
      let mut output = vec![0u8; ZLIB_DEFLATE_CHUNK_SIZE];

      let total_in = zlib_stream.total_in();
      let total_out = zlib_stream.total_out();

      zlib_stream
        .compress(bytes_remaining, &mut output, flate2::FlushCompress::None)
        .map_err(|e| P10Error::OtherError {
          error_type: "Zlib deflate failure".to_string(),
          details: e.to_string(),
        })?;

      output.resize((zlib_stream.total_out() - total_out) as usize, 0);

      if !output.is_empty() {
        self.p10_total_byte_count += output.len() as u64;
        self.p10_bytes.push(output.into());
      }

      let input_bytes_consumed = (zlib_stream.total_in() - total_in) as usize;
      if input_bytes_consumed == 0 {
        return Err(P10Error::OtherError {
          error_type: "Zlib deflate failure".to_string(),
          details: "Zlib compressor did not consume any bytes".to_string(),
        });
      }

      bytes_remaining = &bytes_remaining[input_bytes_consumed..];
    }

    Ok(())
  }

  /// Serializes the File Meta Information to bytes in 'Explicit VR Little
  /// Endian', the transfer syntax that File Meta Information always uses
  /// regardless of the transfer syntax of the main data set.
  ///
  /// The *'(0002,0000) File Meta Information Group Length'* value is
  /// computed from the byte length of the group-0002 data elements that
  /// follow it, and the *'(0002,0001) File Meta Information Version'*,
  /// *'(0002,0012) Implementation Class UID'*, and *'(0002,0013)
  /// Implementation Version Name'* data elements are filled in.
  ///
  fn file_meta_information_to_bytes(
    &self,
    data_set: &DataSet,
  ) -> Result<RcByteSlice, P10Error> {
    let mut fmi = data_set.clone();

    fmi.delete(dictionary::FILE_META_INFORMATION_GROUP_LENGTH.tag);

    fmi.insert(
      dictionary::FILE_META_INFORMATION_VERSION.tag,
      DataElementValue::new_other_byte_string(vec![0, 1]).unwrap(),
    );

    fmi
      .insert_string_value(&dictionary::IMPLEMENTATION_CLASS_UID, &[
        self.config.implementation_class_uid.as_str(),
      ])
      .map_err(|e| P10Error::DataInvalid {
        when: "Serializing File Meta Information".to_string(),
        details: e.to_string(),
        path: self.path.clone(),
        offset: self.p10_total_byte_count,
      })?;

    fmi
      .insert_string_value(&dictionary::IMPLEMENTATION_VERSION_NAME, &[
        self.config.implementation_version_name.as_str(),
      ])
      .map_err(|e| P10Error::DataInvalid {
        when: "Serializing File Meta Information".to_string(),
        details: e.to_string(),
        path: self.path.clone(),
        offset: self.p10_total_byte_count,
      })?;

    let mut fmi_bytes = Vec::with_capacity(256);

    // The group length element comes first, with a placeholder value that is
    // filled in once the rest of the group has been serialized
    fmi_bytes
      .extend_from_slice(&[0x02, 0x00, 0x00, 0x00, 0x55, 0x4C, 0x04, 0x00]);
    fmi_bytes.extend_from_slice(&[0, 0, 0, 0]);

    for (tag, value) in fmi.into_iter() {
      let vr = value.value_representation();

      let value_bytes = value.bytes().map_err(|_| P10Error::DataInvalid {
        when: "Serializing File Meta Information".to_string(),
        details: format!(
          "Tag '{tag}' with value representation '{vr}' is not allowed in \
           File Meta Information"
        ),
        path: self.path.clone(),
        offset: self.p10_total_byte_count,
      })?;

      let header_bytes = self.data_element_header_to_bytes(
        &DataElementHeader {
          tag,
          vr: Some(vr),
          length: ValueLength::new(value_bytes.len() as u32),
        },
        Endianness::LittleEndian,
      )?;

      fmi_bytes.extend_from_slice(&header_bytes);
      fmi_bytes.extend_from_slice(value_bytes);
    }

    // Fill in the final group length value
    let group_length = fmi_bytes.len() as u32 - 12;
    byteorder::LittleEndian::write_u32(&mut fmi_bytes[8..12], group_length);

    Ok(fmi_bytes.into())
  }

  /// Converts a single DICOM P10 token to raw DICOM P10 bytes.
  ///
  fn token_to_bytes(&self, token: &P10Token) -> Result<RcByteSlice, P10Error> {
    match token {
      P10Token::FilePreambleAndDICMPrefix { preamble } => {
        let mut bytes = Vec::with_capacity(132);

        bytes.extend_from_slice(preamble.as_ref());
        bytes.extend_from_slice(b"DICM");

        Ok(bytes.into())
      }

      P10Token::DataElementHeader {
        tag, vr, length, ..
      } => {
        let vr = match self.transfer_syntax.vr_serialization {
          transfer_syntax::VrSerialization::VrExplicit => Some(*vr),
          transfer_syntax::VrSerialization::VrImplicit => None,
        };

        self.data_element_header_to_bytes(
          &DataElementHeader {
            tag: *tag,
            vr,
            length: ValueLength::new(*length),
          },
          self.transfer_syntax.endianness,
        )
      }

      P10Token::DataElementValueBytes { vr, data, .. } => {
        if self.transfer_syntax.endianness.is_big() {
          // Swapping endianness requires a copy of the data
          let mut data = data.clone().into_vec();
          vr.swap_endianness(&mut data);
          Ok(data.into())
        } else {
          Ok(data.clone())
        }
      }

      P10Token::SequenceStart { tag, vr, .. } => {
        let vr = match self.transfer_syntax.vr_serialization {
          transfer_syntax::VrSerialization::VrExplicit => Some(*vr),
          transfer_syntax::VrSerialization::VrImplicit => None,
        };

        self.data_element_header_to_bytes(
          &DataElementHeader {
            tag: *tag,
            vr,
            length: ValueLength::Undefined,
          },
          self.transfer_syntax.endianness,
        )
      }

      P10Token::SequenceDelimiter { .. } => self.data_element_header_to_bytes(
        &DataElementHeader {
          tag: dictionary::SEQUENCE_DELIMITATION_ITEM.tag,
          vr: None,
          length: ValueLength::ZERO,
        },
        self.transfer_syntax.endianness,
      ),

      P10Token::SequenceItemStart { .. } => self
        .data_element_header_to_bytes(
          &DataElementHeader {
            tag: dictionary::ITEM.tag,
            vr: None,
            length: ValueLength::Undefined,
          },
          self.transfer_syntax.endianness,
        ),

      P10Token::SequenceItemDelimiter => self.data_element_header_to_bytes(
        &DataElementHeader {
          tag: dictionary::ITEM_DELIMITATION_ITEM.tag,
          vr: None,
          length: ValueLength::ZERO,
        },
        self.transfer_syntax.endianness,
      ),

      P10Token::PixelDataItem { length, .. } => self
        .data_element_header_to_bytes(
          &DataElementHeader {
            tag: dictionary::ITEM.tag,
            vr: None,
            length: ValueLength::new(*length),
          },
          self.transfer_syntax.endianness,
        ),

      // These tokens are serialized by their own arms in `write_token` and
      // never reach here
      P10Token::FileMetaInformation { .. } | P10Token::End => {
        Ok(RcByteSlice::empty())
      }
    }
  }

  /// Serializes a data element header to bytes. A header with no VR is
  /// written in the implicit VR form.
  ///
  fn data_element_header_to_bytes(
    &self,
    header: &DataElementHeader,
    endianness: Endianness,
  ) -> Result<RcByteSlice, P10Error> {
    let length = header.length.to_u32();

    let mut bytes = Vec::with_capacity(12);

    match endianness {
      Endianness::LittleEndian => {
        bytes.extend_from_slice(&header.tag.group.to_le_bytes());
        bytes.extend_from_slice(&header.tag.element.to_le_bytes());
      }
      Endianness::BigEndian => {
        bytes.extend_from_slice(&header.tag.group.to_be_bytes());
        bytes.extend_from_slice(&header.tag.element.to_be_bytes());
      }
    };

    match header.vr {
      // Implicit VR: a 32-bit length follows the tag directly
      None => match endianness {
        Endianness::LittleEndian => {
          bytes.extend_from_slice(&length.to_le_bytes())
        }
        Endianness::BigEndian => bytes.extend_from_slice(&length.to_be_bytes()),
      },

      // Explicit VR: the VR bytes follow the tag, then a 16-bit or 32-bit
      // length depending on the VR
      Some(vr) => {
        bytes.extend_from_slice(&vr.to_bytes());

        match DataElementHeader::value_length_size(vr) {
          ValueLengthSize::U16 => {
            if length > 0xFFFF {
              return Err(P10Error::DataInvalid {
                when: "Serializing data element header".to_string(),
                details: format!(
                  "Length 0x{length:X} exceeds the maximum of 0xFFFF"
                ),
                path: self.path.clone(),
                offset: self.p10_total_byte_count,
              });
            }

            match endianness {
              Endianness::LittleEndian => {
                bytes.extend_from_slice(&(length as u16).to_le_bytes())
              }
              Endianness::BigEndian => {
                bytes.extend_from_slice(&(length as u16).to_be_bytes())
              }
            }
          }

          // 32-bit lengths are preceded by two reserved bytes
          ValueLengthSize::U32 => {
            bytes.extend_from_slice(&[0, 0]);

            match endianness {
              Endianness::LittleEndian => {
                bytes.extend_from_slice(&length.to_le_bytes())
              }
              Endianness::BigEndian => {
                bytes.extend_from_slice(&length.to_be_bytes())
              }
            }
          }
        };
      }
    }

    Ok(bytes.into())
  }
}

impl Default for P10WriteContext {
  fn default() -> Self {
    Self::new(None)
  }
}

/// Converts a data set to a stream of DICOM P10 tokens returned via a
/// callback: the File Preamble, the File Meta Information, the main data
/// set's data elements, and the end token.
///
/// File Meta Information data elements in the data set are routed into the
/// File Meta Information token rather than the main data set, and a
/// *'(0008,0005) Specific Character Set'* data element specifying UTF-8 is
/// inserted because all string values in a data set are UTF-8.
///
pub fn data_set_to_tokens<E>(
  data_set: &DataSet,
  path: &DataSetPath,
  token_callback: &mut impl FnMut(&P10Token) -> Result<(), E>,
) -> Result<(), E> {
  // Filter that removes File Meta Information data elements from the main
  // data set's token stream
  let mut remove_fmi_transform =
    P10FilterTransform::new(Box::new(|tag, _vr, _length, path| {
      !(tag.is_file_meta_information() && path.is_root())
    }));

  // Insert transform that adds the '(0008,0005) Specific Character Set' data
  // element, specifying UTF-8 (ISO_IR 192)
  let mut charset_data_set = DataSet::new();
  charset_data_set
    .insert_string_value(&dictionary::SPECIFIC_CHARACTER_SET, &["ISO_IR 192"])
    .unwrap();
  let mut insert_charset_transform =
    P10InsertTransform::new(charset_data_set);

  let mut process_token = |token: &P10Token| -> Result<(), E> {
    if token.is_header_token() {
      return token_callback(token);
    }

    // The transforms are infallible here because the tokens for a data set
    // are well-formed by construction
    if !remove_fmi_transform.add_token(token).unwrap() {
      return Ok(());
    }

    let tokens = insert_charset_transform.add_token(token).unwrap();

    for token in tokens {
      token_callback(&token)?;
    }

    Ok(())
  };

  process_token(&P10Token::FilePreambleAndDICMPrefix {
    preamble: Box::new([0; 128]),
  })?;

  process_token(&P10Token::FileMetaInformation {
    data_set: data_set.file_meta_information(),
  })?;

  p10_token::data_elements_to_tokens(data_set, path, &mut process_token)?;

  process_token(&P10Token::End)
}

/// Converts a data set to DICOM P10 bytes returned via a callback.
///
pub fn data_set_to_bytes(
  data_set: &DataSet,
  path: &DataSetPath,
  bytes_callback: &mut impl FnMut(RcByteSlice) -> Result<(), P10Error>,
  config: Option<P10WriteConfig>,
) -> Result<(), P10Error> {
  let mut context = P10WriteContext::new(config);

  let mut process_token = |token: &P10Token| -> Result<(), P10Error> {
    context.write_token(token)?;

    for bytes in context.read_bytes() {
      bytes_callback(bytes)?;
    }

    Ok(())
  };

  data_set_to_tokens(data_set, path, &mut process_token)
}

#[cfg(test)]
mod tests {
  use super::*;

  use dcmstream_core::{DataElementTag, ValueRepresentation};

  fn header_bytes(
    context: &P10WriteContext,
    tag: DataElementTag,
    vr: Option<ValueRepresentation>,
    length: u32,
    endianness: Endianness,
  ) -> Vec<u8> {
    context
      .data_element_header_to_bytes(
        &DataElementHeader {
          tag,
          vr,
          length: ValueLength::new(length),
        },
        endianness,
      )
      .unwrap()
      .into_vec()
  }

  #[test]
  fn data_element_header_to_bytes_test() {
    let context = P10WriteContext::new(None);

    // Implicit VR, both endiannesses
    assert_eq!(
      header_bytes(
        &context,
        dictionary::WAVEFORM_DATA.tag,
        None,
        0x12345678,
        Endianness::LittleEndian,
      ),
      vec![0x00, 0x54, 0x10, 0x10, 0x78, 0x56, 0x34, 0x12]
    );
    assert_eq!(
      header_bytes(
        &context,
        dictionary::WAVEFORM_DATA.tag,
        None,
        0x12345678,
        Endianness::BigEndian,
      ),
      vec![0x54, 0x00, 0x10, 0x10, 0x12, 0x34, 0x56, 0x78]
    );

    // Explicit VR with a 16-bit length
    assert_eq!(
      header_bytes(
        &context,
        dictionary::SMALLEST_IMAGE_PIXEL_VALUE.tag,
        Some(ValueRepresentation::SignedShort),
        0x1234,
        Endianness::LittleEndian,
      ),
      vec![0x28, 0x00, 0x06, 0x01, 0x53, 0x53, 0x34, 0x12]
    );

    // Explicit VR with a 32-bit length and reserved bytes
    assert_eq!(
      header_bytes(
        &context,
        dictionary::PIXEL_DATA.tag,
        Some(ValueRepresentation::OtherWordString),
        0x12345678,
        Endianness::LittleEndian,
      ),
      vec![
        0xE0, 0x7F, 0x10, 0x00, 0x4F, 0x57, 0x00, 0x00, 0x78, 0x56, 0x34,
        0x12
      ]
    );

    // A length too large for the VR's 16-bit length field errors
    assert_eq!(
      context.data_element_header_to_bytes(
        &DataElementHeader {
          tag: dictionary::PATIENT_AGE.tag,
          vr: Some(ValueRepresentation::AgeString),
          length: ValueLength::new(0x12345),
        },
        Endianness::LittleEndian,
      ),
      Err(P10Error::DataInvalid {
        when: "Serializing data element header".to_string(),
        details: "Length 0x12345 exceeds the maximum of 0xFFFF".to_string(),
        path: DataSetPath::new(),
        offset: 0,
      })
    );
  }

  #[test]
  fn file_meta_information_group_length_test() {
    let context = P10WriteContext::new(
      Some(
        P10WriteConfig::default()
          .implementation_class_uid("1.2.3".to_string())
          .implementation_version_name("TEST".to_string()),
      ),
    );

    let fmi_bytes = context
      .file_meta_information_to_bytes(&DataSet::new())
      .unwrap();

    // (0002,0000) UL 4, then (0002,0001) OB 2, (0002,0012) UI 6,
    // (0002,0013) SH 4
    let expected_group_length =
      (12 + 2) + (8 + 6) + (8 + 4);

    assert_eq!(
      byteorder::LittleEndian::read_u32(&fmi_bytes[8..12]),
      expected_group_length
    );
    assert_eq!(fmi_bytes.len() as u32, 12 + expected_group_length);
  }
}
