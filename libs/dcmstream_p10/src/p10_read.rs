//! Converts incoming chunks of raw DICOM P10 data into DICOM P10 tokens.
//!
//! The conversion is streaming: chunks of raw binary data of any size are
//! added to a read context, and DICOM P10 tokens are progressively made
//! available as their data arrives. See [`P10Token`] for the tokens that are
//! emitted.
//!
//! If the DICOM P10 data already exists fully in memory it can be added to a
//! new read context as one complete and final chunk and have all its tokens
//! read out at once; nothing requires that a read context be used in a
//! streaming fashion.
//!
//! Memory usage during a read is controlled via [`P10ReadConfig`].

use byteorder::ByteOrder;

use dcmstream_core::{
  DataElementTag, DataElementValue, DataSet, DataSetPath, RcByteSlice,
  TransferSyntax, ValueRepresentation, dictionary, transfer_syntax,
};

use crate::internal::byte_stream::{ByteStream, ByteStreamError};
use crate::internal::data_element_header::{
  DataElementHeader, ValueLengthSize,
};
use crate::internal::p10_location::{self, P10Location};
use crate::{
  P10Error, P10ReadConfig, P10Token, internal::value_length::ValueLength,
};

/// A read context holds the state of an in-progress DICOM P10 read. Raw
/// DICOM P10 bytes are fed in with [`Self::write_bytes`], and DICOM P10
/// tokens are read out with [`Self::read_tokens`].
///
#[derive(Debug)]
pub struct P10ReadContext {
  config: P10ReadConfig,
  stream: ByteStream,
  next_action: NextAction,
  transfer_syntax: &'static TransferSyntax,
  path: DataSetPath,
  location: P10Location,
  has_emitted_specific_character_set: bool,
}

/// What the read context will attempt to read next from its byte stream.
///
#[derive(Debug)]
enum NextAction {
  ReadFilePreambleAndDICMPrefix,
  ReadFileMetaInformation {
    starts_at: u64,
    ends_at: Option<u64>,
    data_set: DataSet,
  },
  ReadDataElementHeader,
  ReadDataElementValueBytes {
    tag: DataElementTag,
    vr: ValueRepresentation,
    length: u32,
    bytes_remaining: u32,
    emit_tokens: bool,
  },
  ReadPixelDataItem {
    vr: ValueRepresentation,
  },
}

impl P10ReadContext {
  /// Creates a new read context for reading DICOM P10 data.
  ///
  pub fn new(config: Option<P10ReadConfig>) -> Self {
    Self {
      config: config.unwrap_or_default(),
      stream: ByteStream::new(),
      next_action: NextAction::ReadFilePreambleAndDICMPrefix,
      transfer_syntax: &transfer_syntax::IMPLICIT_VR_LITTLE_ENDIAN,
      path: DataSetPath::new(),
      location: P10Location::new(),
      has_emitted_specific_character_set: false,
    }
  }

  /// Sets the transfer syntax to assume when the DICOM P10 data doesn't
  /// specify one in its File Meta Information, or has no File Meta
  /// Information at all.
  ///
  /// The default is 'Implicit VR Little Endian'. Set this prior to reading
  /// any tokens out of the read context.
  ///
  pub fn set_fallback_transfer_syntax(
    &mut self,
    transfer_syntax: &'static TransferSyntax,
  ) {
    self.transfer_syntax = transfer_syntax;
  }

  /// Returns the transfer syntax of the data being read. This starts as the
  /// fallback transfer syntax and is updated when a transfer syntax is read
  /// out of the File Meta Information.
  ///
  pub fn transfer_syntax(&self) -> &TransferSyntax {
    self.transfer_syntax
  }

  /// Writes raw DICOM P10 bytes to the read context to be parsed into DICOM
  /// P10 tokens by subsequent calls to [`Self::read_tokens`]. Setting `done`
  /// signals the end of the incoming data, after which any further call to
  /// this function errors with [`P10Error::WriteAfterCompletion`].
  ///
  pub fn write_bytes(
    &mut self,
    bytes: RcByteSlice,
    done: bool,
  ) -> Result<(), P10Error> {
    self.stream.write(bytes, done).map_err(|e| {
      self.map_byte_stream_error(e, "Writing data to DICOM P10 read context")
    })
  }

  /// Reads the next DICOM P10 tokens out of the read context. On success,
  /// zero or more tokens are returned and the function can be called again.
  ///
  /// An error of [`P10Error::DataRequired`] means no further tokens can be
  /// read until more data is supplied with [`Self::write_bytes`].
  ///
  pub fn read_tokens(&mut self) -> Result<Vec<P10Token>, P10Error> {
    match self.next_action {
      NextAction::ReadFilePreambleAndDICMPrefix => {
        self.read_file_preamble_and_dicm_prefix_token()
      }

      NextAction::ReadFileMetaInformation { .. } => {
        self.read_file_meta_information_token()
      }

      NextAction::ReadDataElementHeader => {
        // Emit a delimiter token for a defined-length sequence or item when
        // its end offset has been reached
        if let Some(token) = self.next_delimiter_token() {
          return Ok(vec![token]);
        }

        // Detect the end of the DICOM data. Any sequences and items still
        // open are closed with delimiter tokens, which means that data
        // truncated on a data element boundary reads without error. To be
        // strict about truncation, check here that the location has exactly
        // its root entry left.
        if self.stream.is_fully_consumed() {
          return Ok(self.location.pending_delimiter_tokens());
        }

        let is_at_root = self.path.len() == 0;

        let (mut tokens, tag) = self.read_data_element_header_token()?;

        // A Specific Character Set data element is guaranteed to be present
        // in the emitted token stream so that consumers always see the
        // character set declared, even when the input data omits it. The
        // value is always ISO_IR 192 because all emitted strings are UTF-8.
        if !self.has_emitted_specific_character_set
          && is_at_root
          && tag >= dictionary::SPECIFIC_CHARACTER_SET.tag
        {
          if tag > dictionary::SPECIFIC_CHARACTER_SET.tag {
            tokens.splice(0..0, Self::specific_character_set_utf8_tokens());
          }

          self.has_emitted_specific_character_set = true;
        }

        Ok(tokens)
      }

      NextAction::ReadDataElementValueBytes {
        tag,
        vr,
        length,
        bytes_remaining,
        emit_tokens,
      } => self.read_data_element_value_bytes_token(
        tag,
        vr,
        length,
        bytes_remaining,
        emit_tokens,
      ),

      NextAction::ReadPixelDataItem { vr } => {
        self.read_pixel_data_item_token(vr)
      }
    }
  }

  /// Checks whether a delimiter token for a defined-length sequence or item
  /// needs to be emitted, and pops the current path entry when one is.
  ///
  fn next_delimiter_token(&mut self) -> Option<P10Token> {
    let bytes_read = self.stream.bytes_read();

    let token = self.location.next_delimiter_token(bytes_read)?;

    if matches!(token, P10Token::SequenceDelimiter { .. })
      || token == P10Token::SequenceItemDelimiter
    {
      self.path.pop().unwrap();
    }

    Some(token)
  }

  /// Reads the 128-byte File Preamble and the 4-byte `DICM` prefix that
  /// follows it. When the `DICM` bytes aren't present at the expected offset
  /// the File Preamble is taken to be absent from the input and a zero-filled
  /// preamble token is emitted, unless the read config requires the prefix.
  ///
  fn read_file_preamble_and_dicm_prefix_token(
    &mut self,
  ) -> Result<Vec<P10Token>, P10Error> {
    let preamble = match self.stream.peek(132) {
      Ok(data) => {
        if &data[128..132] == b"DICM" {
          self.stream.read(132).map_err(|e| {
            self.map_byte_stream_error(e, "Reading file header")
          })?;

          let mut preamble = [0u8; 128];
          preamble.copy_from_slice(&data[0..128]);

          Ok(Box::new(preamble))
        } else if self.config.require_dicm_prefix {
          Err(P10Error::DicmPrefixNotPresent)
        } else {
          Ok(Box::new([0u8; 128]))
        }
      }

      // Data that ends before 132 bytes has no File Preamble at all
      Err(ByteStreamError::DataEnd) if !self.config.require_dicm_prefix => {
        Ok(Box::new([0u8; 128]))
      }

      Err(ByteStreamError::DataEnd) => Err(P10Error::DicmPrefixNotPresent),

      Err(e) => Err(self.map_byte_stream_error(e, "Reading file header")),
    }?;

    self.next_action = NextAction::ReadFileMetaInformation {
      starts_at: self.stream.bytes_read(),
      ends_at: None,
      data_set: DataSet::new(),
    };

    Ok(vec![P10Token::FilePreambleAndDICMPrefix { preamble }])
  }

  /// Reads the File Meta Information into a data set and returns it as a
  /// single token once complete. When a *'(0002,0000) File Meta Information
  /// Group Length'* data element is present its value determines where the
  /// File Meta Information ends; otherwise data elements are read until one
  /// with a group other than 0x0002 is encountered.
  ///
  fn read_file_meta_information_token(
    &mut self,
  ) -> Result<Vec<P10Token>, P10Error> {
    let NextAction::ReadFileMetaInformation {
      starts_at,
      ends_at,
      data_set: fmi_data_set,
    } = &mut self.next_action
    else {
      unreachable!();
    };

    loop {
      if let Some(ends_at) = ends_at
        && self.stream.bytes_read() >= *ends_at
      {
        break;
      }

      // Peek the 8 bytes holding the tag, the VR, and, for VRs with a 16-bit
      // length field, the value length
      let data = self.stream.peek(8).map_err(|e| {
        map_byte_stream_error(
          e,
          "Reading File Meta Information",
          &self.stream,
          &self.path,
        )
      })?;

      let group = byteorder::LittleEndian::read_u16(&data[0..2]);
      let element = byteorder::LittleEndian::read_u16(&data[2..4]);
      let tag = DataElementTag::new(group, element);

      // When the File Meta Information length isn't known, a group other
      // than 0x0002 marks the end of the File Meta Information
      if tag.group != 0x0002 && ends_at.is_none() {
        break;
      }

      // When the length is known, a group other than 0x0002 inside it makes
      // the File Meta Information invalid
      if tag.group != 0x0002 {
        return Err(P10Error::DataInvalid {
          when: "Reading File Meta Information".to_string(),
          details: "Data element in File Meta Information does not have the \
            group 0x0002"
            .to_string(),
          path: DataSetPath::new_with_data_element(tag),
          offset: self.stream.bytes_read(),
        });
      }

      let vr = ValueRepresentation::from_bytes(&data[4..6]).map_err(|_| {
        P10Error::DataInvalid {
          when: "Reading File Meta Information".to_string(),
          details: "Data element has invalid VR".to_string(),
          path: DataSetPath::new_with_data_element(tag),
          offset: self.stream.bytes_read(),
        }
      })?;

      // Sequences aren't allowed in the File Meta Information
      if vr == ValueRepresentation::Sequence {
        return Err(P10Error::DataInvalid {
          when: "Reading File Meta Information".to_string(),
          details: "Data element in File Meta Information is a sequence"
            .to_string(),
          path: DataSetPath::new_with_data_element(tag),
          offset: self.stream.bytes_read(),
        });
      }

      let (value_offset, value_length) =
        match DataElementHeader::value_length_size(vr) {
          // 16-bit lengths come out of the 8 bytes already peeked
          ValueLengthSize::U16 => (
            8usize,
            usize::from(byteorder::LittleEndian::read_u16(&data[6..8])),
          ),

          // 32-bit lengths need another 4 bytes
          ValueLengthSize::U32 => {
            let data = self.stream.peek(12).map_err(|e| {
              map_byte_stream_error(
                e,
                "Reading File Meta Information",
                &self.stream,
                &self.path,
              )
            })?;

            (
              12usize,
              byteorder::LittleEndian::read_u32(&data[8..12]) as usize,
            )
          }
        };

      let data_element_size = value_offset + value_length;

      // The File Meta Information is capped at the max token size
      if fmi_data_set.total_byte_size() + data_element_size as u64
        > u64::from(self.config.max_token_size)
      {
        return Err(P10Error::MaximumExceeded {
          details: format!(
            "File Meta Information exceeds the max token size of {} bytes",
            self.config.max_token_size
          ),
          path: DataSetPath::new_with_data_element(tag),
          offset: self.stream.bytes_read(),
        });
      }

      let data = self.stream.read(data_element_size).map_err(|e| {
        map_byte_stream_error(
          e,
          "Reading File Meta Information data element value",
          &self.stream,
          &self.path,
        )
      })?;

      let value =
        DataElementValue::new_binary_unchecked(vr, data.drop(value_offset));

      // The group length data element determines the end offset of the File
      // Meta Information and is not included in the resulting data set
      if tag == dictionary::FILE_META_INFORMATION_GROUP_LENGTH.tag {
        if ends_at.is_none() && fmi_data_set.is_empty() {
          match value.get_int::<u32>() {
            Ok(group_length) => {
              *ends_at = Some(*starts_at + 12 + u64::from(group_length));
            }
            Err(_) => {
              return Err(P10Error::DataInvalid {
                when: "Reading File Meta Information".to_string(),
                details: format!(
                  "Group length is invalid: {}",
                  value.to_string(tag, 80)
                ),
                path: DataSetPath::new_with_data_element(tag),
                offset: self.stream.bytes_read(),
              });
            }
          }
        }

        continue;
      }

      // Put the transfer syntax specified by the File Meta Information onto
      // the read context
      if tag == dictionary::TRANSFER_SYNTAX_UID.tag {
        let uid = value.get_string().map_err(|e| P10Error::DataInvalid {
          when: "Reading File Meta Information".to_string(),
          details: e.to_string(),
          path: DataSetPath::new_with_data_element(tag),
          offset: self.stream.bytes_read(),
        })?;

        self.transfer_syntax = TransferSyntax::from_uid(uid).map_err(|_| {
          P10Error::TransferSyntaxNotSupported {
            transfer_syntax_uid: uid.to_string(),
          }
        })?;
      }

      fmi_data_set.insert(tag, value);
    }

    // All data following the File Meta Information of a deflated transfer
    // syntax passes through zlib inflate before parsing
    if self.transfer_syntax.is_deflated {
      self.stream.start_zlib_inflate();
    }

    // The transfer syntax that will be used to read the main data set is
    // recorded in the emitted File Meta Information token
    if self.transfer_syntax != &transfer_syntax::IMPLICIT_VR_LITTLE_ENDIAN {
      fmi_data_set
        .insert_string_value(
          &dictionary::TRANSFER_SYNTAX_UID,
          &[self.transfer_syntax.uid],
        )
        .unwrap();
    }

    let token = P10Token::FileMetaInformation {
      data_set: core::mem::take(fmi_data_set),
    };

    self.next_action = NextAction::ReadDataElementHeader;

    Ok(vec![token])
  }

  /// Returns the two tokens for a *'(0008,0005) Specific Character Set'*
  /// data element specifying UTF-8 (ISO_IR 192).
  ///
  fn specific_character_set_utf8_tokens() -> [P10Token; 2] {
    let tag = dictionary::SPECIFIC_CHARACTER_SET.tag;
    let vr = ValueRepresentation::CodeString;
    let data = b"ISO_IR 192";

    [
      P10Token::DataElementHeader {
        tag,
        vr,
        length: data.len() as u32,
        path: DataSetPath::new_with_data_element(tag),
      },
      P10Token::DataElementValueBytes {
        tag,
        vr,
        data: data.to_vec().into(),
        bytes_remaining: 0,
      },
    ]
  }

  fn read_data_element_header_token(
    &mut self,
  ) -> Result<(Vec<P10Token>, DataElementTag), P10Error> {
    let header = self.read_data_element_header()?;

    // A VR of UN (Unknown) is attempted to be inferred
    let vr = match header.vr {
      Some(ValueRepresentation::Unknown) => {
        Some(self.location.infer_vr_for_tag(header.tag).map_err(
          |missing_tag| P10Error::DataInvalid {
            when: format!(
              "Inferring VR for data element '{}'",
              dictionary::tag_with_name(header.tag, None)
            ),
            details: format!(
              "The value for the '{}' data element is missing or invalid",
              dictionary::tag_with_name(missing_tag, None)
            ),
            path: self.path.clone(),
            offset: self.stream.bytes_read(),
          },
        )?)
      }
      vr => vr,
    };

    match (header.tag, vr, header.length) {
      // The start of a new sequence, either from an SQ data element or from
      // a UN data element with undefined length
      (tag, Some(ValueRepresentation::Sequence), _)
      | (tag, Some(ValueRepresentation::Unknown), ValueLength::Undefined) => {
        self.check_data_element_ordering(&header)?;

        let ends_at = match header.length {
          ValueLength::Defined { length } => {
            Some(self.stream.bytes_read() + u64::from(length))
          }
          ValueLength::Undefined => None,
        };

        // When the original VR was UN and the length is undefined the
        // sequence's content must be read as 'Implicit VR Little Endian'.
        // Ref: DICOM Correction Proposal CP-246.
        let is_implicit_vr = header.vr == Some(ValueRepresentation::Unknown);

        self
          .location
          .add_sequence(tag, is_implicit_vr, ends_at)
          .map_err(|details| P10Error::DataInvalid {
            when: "Reading data element header".to_string(),
            details,
            path: self.path.clone(),
            offset: self.stream.bytes_read(),
          })?;

        if self.path.len() / 2 >= self.config.max_sequence_depth {
          return Err(P10Error::MaximumExceeded {
            details: "Maximum allowed sequence depth reached".to_string(),
            path: self.path.clone(),
            offset: self.stream.bytes_read(),
          });
        }

        self.path.add_data_element(tag).unwrap();

        Ok((
          vec![P10Token::SequenceStart {
            tag,
            vr: ValueRepresentation::Sequence,
            path: self.path.clone(),
          }],
          tag,
        ))
      }

      // The start of a new sequence item
      (tag, None, _) if tag == dictionary::ITEM.tag => {
        let ends_at = match header.length {
          ValueLength::Defined { length } => {
            Some(self.stream.bytes_read() + u64::from(length))
          }
          ValueLength::Undefined => None,
        };

        let index = self.location.add_item(ends_at, header.length).map_err(
          |details| P10Error::DataInvalid {
            when: "Reading data element header".to_string(),
            details,
            path: self.path.clone(),
            offset: self.stream.bytes_read(),
          },
        )?;

        self.path.add_sequence_item(index).unwrap();

        Ok((vec![P10Token::SequenceItemStart { index }], tag))
      }

      // The start of an encapsulated pixel data sequence, whose items are
      // read as pixel data items
      (tag, Some(vr), ValueLength::Undefined)
        if tag == dictionary::PIXEL_DATA.tag
          && (vr == ValueRepresentation::OtherByteString
            || vr == ValueRepresentation::OtherWordString) =>
      {
        self.check_data_element_ordering(&header)?;

        self
          .location
          .add_sequence(tag, false, None)
          .map_err(|details| P10Error::DataInvalid {
            when: "Reading data element header".to_string(),
            details,
            path: self.path.clone(),
            offset: self.stream.bytes_read(),
          })?;

        self.path.add_data_element(tag).unwrap();

        self.next_action = NextAction::ReadPixelDataItem { vr };

        Ok((
          vec![P10Token::SequenceStart {
            tag,
            vr,
            path: self.path.clone(),
          }],
          tag,
        ))
      }

      // A sequence delimitation item ends the current sequence
      (tag, None, ValueLength::ZERO)
        if tag == dictionary::SEQUENCE_DELIMITATION_ITEM.tag =>
      {
        // A sequence delimiter outside of any sequence is ignored rather
        // than erroring. Such rogue delimiters exist in the wild and
        // skipping them loses nothing.
        let tokens = match self.location.end_sequence() {
          Ok(tag) => {
            self.path.pop().unwrap();

            vec![P10Token::SequenceDelimiter { tag }]
          }

          Err(_) => vec![],
        };

        Ok((tokens, tag))
      }

      // An item delimitation item ends the current item
      (tag, None, ValueLength::ZERO)
        if tag == dictionary::ITEM_DELIMITATION_ITEM.tag =>
      {
        self
          .location
          .end_item()
          .map_err(|details| P10Error::DataInvalid {
            when: "Reading data element header".to_string(),
            details,
            path: self.path.clone(),
            offset: self.stream.bytes_read(),
          })?;

        self.path.pop().unwrap();

        Ok((vec![P10Token::SequenceItemDelimiter], tag))
      }

      // Everything else is a standard data element whose value bytes follow
      (tag, Some(vr), ValueLength::Defined { length }) => {
        self.check_data_element_ordering(&header)?;

        let materialized_value_required =
          self.is_materialized_value_required(tag, vr);

        // Fully materialized values are bounded by the max string size
        if materialized_value_required && length > self.config.max_string_size
        {
          return Err(P10Error::MaximumExceeded {
            details: format!(
              "Value for '{}' with VR {} and length {} bytes exceeds the \
               maximum allowed string size of {} bytes",
              dictionary::tag_with_name(tag, None),
              vr,
              length,
              self.config.max_string_size
            ),
            path: self.path.clone(),
            offset: self.stream.bytes_read(),
          });
        }

        self
          .path
          .add_data_element(tag)
          .map_err(|_| P10Error::DataInvalid {
            when: "Reading data element header".to_string(),
            details: format!(
              "Data element '{header}' is not valid for the current path"
            ),
            path: self.path.clone(),
            offset: self.stream.bytes_read(),
          })?;

        // The '(FFFC,FFFC) Data Set Trailing Padding' data element and group
        // length data elements (element 0x0000) are parsed but emit no
        // tokens. Ref: PS3.10 7.2, PS3.5 7.2.
        let emit_tokens = tag != dictionary::DATA_SET_TRAILING_PADDING.tag
          && tag.element != 0x0000;

        // The header token for a materialized value is only emitted once all
        // its data is available, because conversion to UTF-8 changes the
        // value length
        let tokens = if emit_tokens && !materialized_value_required {
          vec![P10Token::DataElementHeader {
            tag,
            vr,
            length,
            path: self.path.clone(),
          }]
        } else {
          vec![]
        };

        self.next_action = NextAction::ReadDataElementValueBytes {
          tag,
          vr,
          length,
          bytes_remaining: length,
          emit_tokens,
        };

        Ok((tokens, tag))
      }

      (_, _, _) => Err(P10Error::DataInvalid {
        when: "Reading data element header".to_string(),
        details: format!("Invalid data element '{header}'"),
        path: self.path.clone(),
        offset: self.stream.bytes_read(),
      }),
    }
  }

  /// Reads a data element header. Depending on the transfer syntax and VR
  /// this consumes either 8 or 12 bytes.
  ///
  fn read_data_element_header(
    &mut self,
  ) -> Result<DataElementHeader, P10Error> {
    let transfer_syntax = self.active_transfer_syntax();

    // Peek the 4 bytes holding the tag
    let tag = match self.stream.peek(4) {
      Ok(data) => {
        let (group, element) = match transfer_syntax.endianness {
          transfer_syntax::Endianness::LittleEndian => (
            byteorder::LittleEndian::read_u16(&data[0..2]),
            byteorder::LittleEndian::read_u16(&data[2..4]),
          ),

          transfer_syntax::Endianness::BigEndian => (
            byteorder::BigEndian::read_u16(&data[0..2]),
            byteorder::BigEndian::read_u16(&data[2..4]),
          ),
        };

        DataElementTag::new(group, element)
      }

      Err(e) => {
        return Err(
          self.map_byte_stream_error(e, "Reading data element header"),
        );
      }
    };

    // File Meta Information data elements aren't allowed in the root of the
    // main data set. They are tolerated inside sequence items because a
    // TransferSyntaxUID as the first data element of an item has been
    // observed in the wild, invalid though it is.
    if tag.group == 0x0002 && self.path.is_root() {
      return Err(P10Error::DataInvalid {
        when: "Reading data element header".to_string(),
        details: format!(
          "File Meta Information data element '{tag}' found in the main data \
           set"
        ),
        path: DataSetPath::new_with_data_element(tag),
        offset: self.stream.bytes_read(),
      });
    }

    // The item and delimitation tags always use implicit VR serialization
    let vr_serialization = if tag == dictionary::ITEM.tag
      || tag == dictionary::ITEM_DELIMITATION_ITEM.tag
      || tag == dictionary::SEQUENCE_DELIMITATION_ITEM.tag
    {
      transfer_syntax::VrSerialization::VrImplicit
    } else {
      transfer_syntax.vr_serialization
    };

    match vr_serialization {
      transfer_syntax::VrSerialization::VrExplicit => {
        self.read_explicit_vr_and_length(tag)
      }
      transfer_syntax::VrSerialization::VrImplicit => {
        self.read_implicit_vr_and_length(tag)
      }
    }
  }

  /// Checks that the given data element tag is greater than the previous one
  /// at the current location, when the read config requires ordering.
  ///
  fn check_data_element_ordering(
    &mut self,
    header: &DataElementHeader,
  ) -> Result<(), P10Error> {
    if !self.config.require_ordered_data_elements {
      return Ok(());
    }

    self
      .location
      .check_data_element_ordering(header.tag)
      .map_err(|_| P10Error::DataInvalid {
        when: "Reading data element header".to_string(),
        details: format!("Data element '{header}' is not in ascending order"),
        path: self.path.clone(),
        offset: self.stream.bytes_read(),
      })
  }

  /// Returns the transfer syntax used to decode the current data. This is
  /// the transfer syntax from the File Meta Information, except when
  /// 'Implicit VR Little Endian' is being forced by an enclosing `UN`
  /// sequence with undefined length.
  ///
  /// Ref: DICOM Correction Proposal CP-246.
  ///
  fn active_transfer_syntax(&self) -> &'static TransferSyntax {
    if self.location.is_implicit_vr_forced() {
      &transfer_syntax::IMPLICIT_VR_LITTLE_ENDIAN
    } else {
      self.transfer_syntax
    }
  }

  /// Reads the implicit VR and value length following a data element tag.
  /// The VR is reported as UN (Unknown) and inferred later, except for the
  /// item and delimitation tags which have no VR at all.
  ///
  fn read_implicit_vr_and_length(
    &mut self,
    tag: DataElementTag,
  ) -> Result<DataElementHeader, P10Error> {
    let data = self.stream.read(8).map_err(|e| {
      self.map_byte_stream_error(e, "Reading data element header")
    })?;

    let value_length = match self.active_transfer_syntax().endianness {
      transfer_syntax::Endianness::LittleEndian => {
        byteorder::LittleEndian::read_u32(&data[4..8])
      }
      transfer_syntax::Endianness::BigEndian => {
        byteorder::BigEndian::read_u32(&data[4..8])
      }
    };

    let vr = if tag == dictionary::ITEM.tag
      || tag == dictionary::ITEM_DELIMITATION_ITEM.tag
      || tag == dictionary::SEQUENCE_DELIMITATION_ITEM.tag
    {
      None
    } else {
      Some(ValueRepresentation::Unknown)
    };

    Ok(DataElementHeader {
      tag,
      vr,
      length: ValueLength::new(value_length),
    })
  }

  /// Reads the explicit VR and value length following a data element tag.
  ///
  fn read_explicit_vr_and_length(
    &mut self,
    tag: DataElementTag,
  ) -> Result<DataElementHeader, P10Error> {
    // Peek and validate the two VR bytes
    let vr = match self.stream.peek(6) {
      Ok(data) => {
        let vr_bytes = &data[4..6];

        match ValueRepresentation::from_bytes(vr_bytes) {
          Ok(vr) => Ok(vr),

          // A VR of two spaces or two NUL bytes reads as UN and gets an
          // inference attempt. Not part of the DICOM standard, but such data
          // exists in the wild.
          Err(()) => match vr_bytes {
            [0x00, 0x00] | [0x20, 0x20] => Ok(ValueRepresentation::Unknown),

            _ => Err(P10Error::DataInvalid {
              when: "Reading data element VR".to_string(),
              details: format!(
                "Unrecognized VR {:?} for tag '{}'",
                vr_bytes,
                dictionary::tag_with_name(tag, None)
              ),
              path: self.path.clone(),
              offset: self.stream.bytes_read(),
            }),
          },
        }
      }

      Err(e) => Err(
        self.map_byte_stream_error(e, "Reading explicit VR data element \
           header"),
      ),
    }?;

    // The total header size varies by VR
    let header_size = match DataElementHeader::value_length_size(vr) {
      ValueLengthSize::U32 => 12,
      ValueLengthSize::U16 => 8,
    };

    // Consume the full header: tag, VR, and value length
    let data = self.stream.read(header_size).map_err(|e| {
      self.map_byte_stream_error(e, "Reading explicit VR data element header")
    })?;

    let length = match self.active_transfer_syntax().endianness {
      transfer_syntax::Endianness::LittleEndian => match header_size {
        12 => byteorder::LittleEndian::read_u32(&data[8..12]),
        _ => byteorder::LittleEndian::read_u16(&data[6..8]).into(),
      },
      transfer_syntax::Endianness::BigEndian => match header_size {
        12 => byteorder::BigEndian::read_u32(&data[8..12]),
        _ => byteorder::BigEndian::read_u16(&data[6..8]).into(),
      },
    };

    Ok(DataElementHeader {
      tag,
      vr: Some(vr),
      length: ValueLength::new(length),
    })
  }

  fn read_data_element_value_bytes_token(
    &mut self,
    tag: DataElementTag,
    vr: ValueRepresentation,
    value_length: u32,
    bytes_remaining: u32,
    emit_tokens: bool,
  ) -> Result<Vec<P10Token>, P10Error> {
    let materialized_value_required =
      self.is_materialized_value_required(tag, vr);

    // A materialized value is read as a whole; anything else is read in
    // chunks of up to the max token size
    let bytes_to_read = if materialized_value_required {
      value_length
    } else {
      core::cmp::min(bytes_remaining, self.config.max_token_size)
    };

    let mut data = match self.stream.read(bytes_to_read as usize) {
      Ok(data) => data,

      Err(e) => {
        let when = format!(
          "Reading {bytes_to_read} data element value bytes, VR: {vr}"
        );

        return Err(self.map_byte_stream_error(e, &when));
      }
    };

    // Data element values are always emitted in little endian
    if self.active_transfer_syntax().endianness.is_big() {
      let mut raw_data = data.into_vec();
      self.location.swap_endianness(tag, vr, &mut raw_data);
      data = raw_data.into();
    }

    let bytes_remaining = bytes_remaining - bytes_to_read;

    let data = if materialized_value_required {
      self.process_materialized_data_element(tag, vr, data)?
    } else {
      data
    };

    let mut tokens = Vec::with_capacity(2);

    if emit_tokens {
      // The header token for a materialized value is emitted now because
      // UTF-8 conversion above may have changed the value length
      if materialized_value_required {
        let max_length = DataElementHeader::value_length_size(vr).max_length();

        if data.len() > max_length {
          return Err(P10Error::DataInvalid {
            when: "Reading data element value bytes".to_string(),
            details: format!(
              "Length of {} bytes exceeds the maximum of {} bytes after \
               conversion to UTF-8",
              data.len(),
              max_length
            ),
            path: self.path.clone(),
            offset: self.stream.bytes_read(),
          });
        }

        tokens.push(P10Token::DataElementHeader {
          tag,
          vr,
          length: data.len() as u32,
          path: self.path.clone(),
        });
      }

      tokens.push(P10Token::DataElementValueBytes {
        tag,
        vr,
        data,
        bytes_remaining,
      });
    }

    if bytes_remaining == 0 {
      self.path.pop().unwrap();

      // The data element is complete. When inside an encapsulated pixel data
      // sequence the next thing to read is the next pixel data item.
      self.next_action = if tag == dictionary::ITEM.tag {
        NextAction::ReadPixelDataItem { vr }
      } else {
        NextAction::ReadDataElementHeader
      };
    } else {
      self.next_action = NextAction::ReadDataElementValueBytes {
        tag,
        vr,
        length: value_length,
        bytes_remaining,
        emit_tokens,
      };
    }

    Ok(tokens)
  }

  /// Returns whether the full value for a data element must be held in
  /// memory before its tokens can be emitted.
  ///
  fn is_materialized_value_required(
    &self,
    tag: DataElementTag,
    vr: ValueRepresentation,
  ) -> bool {
    // Clarifying data elements are always materialized
    if p10_location::is_clarifying_data_element(tag) {
      return true;
    }

    // Encoded strings are materialized when the active character set isn't
    // UTF-8 compatible, in order to convert them to UTF-8
    if vr.is_encoded_string() {
      return !self.location.is_specific_character_set_utf8_compatible();
    }

    // Other string values are defined to be ISO-646/US-ASCII, which in
    // theory is valid UTF-8 already. Invalid ISO-646 bytes exist in the wild
    // though, so these strings are materialized and sanitized by replacing
    // disallowed bytes with a question mark.
    vr.is_string()
  }

  fn process_materialized_data_element(
    &mut self,
    tag: DataElementTag,
    vr: ValueRepresentation,
    mut value_bytes: RcByteSlice,
  ) -> Result<RcByteSlice, P10Error> {
    if vr.is_string() {
      // Private Creator values are limited to the Default Character
      // Repertoire and are sanitized against it rather than being decoded
      // with the active character set. Ref: PS3.5 7.8.1.
      if vr.is_encoded_string() && !tag.is_private_creator() {
        value_bytes =
          self.location.decode_string_bytes(vr, &value_bytes).into();
      } else {
        let mut data = value_bytes.into_vec();
        dcmstream_charset::sanitize_default_charset_bytes(&mut data);
        value_bytes = data.into();
      }
    }

    // Record the value in the location when this is a clarifying data
    // element
    self
      .location
      .add_clarifying_data_element(tag, vr, &mut value_bytes)?;

    Ok(value_bytes)
  }

  fn read_pixel_data_item_token(
    &mut self,
    vr: ValueRepresentation,
  ) -> Result<Vec<P10Token>, P10Error> {
    let header = self.read_data_element_header()?;

    match header {
      // Pixel data items have no VR and a defined length
      DataElementHeader {
        tag,
        vr: None,
        length: ValueLength::Defined { length },
      } if tag == dictionary::ITEM.tag => {
        self.next_action = NextAction::ReadDataElementValueBytes {
          tag: dictionary::ITEM.tag,
          vr,
          length,
          bytes_remaining: length,
          emit_tokens: true,
        };

        let index = self.location.add_pixel_data_item().map_err(|details| {
          P10Error::DataInvalid {
            when: "Reading encapsulated pixel data item".to_string(),
            details,
            path: self.path.clone(),
            offset: self.stream.bytes_read(),
          }
        })?;

        self.path.add_sequence_item(index).unwrap();

        Ok(vec![P10Token::PixelDataItem { index, length }])
      }

      DataElementHeader {
        tag,
        vr: None,
        length: ValueLength::ZERO,
      } if tag == dictionary::SEQUENCE_DELIMITATION_ITEM.tag => {
        self.location.end_sequence().map_err(|details| {
          P10Error::DataInvalid {
            when: "Reading encapsulated pixel data item".to_string(),
            details,
            path: self.path.clone(),
            offset: self.stream.bytes_read(),
          }
        })?;

        self.path.pop().unwrap();

        self.next_action = NextAction::ReadDataElementHeader;

        Ok(vec![P10Token::SequenceDelimiter {
          tag: dictionary::PIXEL_DATA.tag,
        }])
      }

      header => Err(P10Error::DataInvalid {
        when: "Reading encapsulated pixel data item".to_string(),
        details: format!("Invalid data element '{header}'"),
        path: self.path.clone(),
        offset: self.stream.bytes_read(),
      }),
    }
  }

  fn map_byte_stream_error(
    &self,
    error: ByteStreamError,
    when: &str,
  ) -> P10Error {
    map_byte_stream_error(error, when, &self.stream, &self.path)
  }
}

/// Maps an error from the byte stream through to a P10 error.
///
fn map_byte_stream_error(
  error: ByteStreamError,
  when: &str,
  stream: &ByteStream,
  path: &DataSetPath,
) -> P10Error {
  let offset = stream.bytes_read();

  match error {
    ByteStreamError::DataRequired => P10Error::DataRequired {
      when: when.to_string(),
    },

    ByteStreamError::DataEnd => P10Error::DataEndedUnexpectedly {
      when: when.to_string(),
      path: path.clone(),
      offset,
    },

    ByteStreamError::ZlibDataError => P10Error::DataInvalid {
      when: when.to_string(),
      details: "Zlib data is invalid".to_string(),
      path: path.clone(),
      offset,
    },

    ByteStreamError::WriteAfterCompletion => P10Error::WriteAfterCompletion,
  }
}

impl Default for P10ReadContext {
  fn default() -> Self {
    Self::new(None)
  }
}
