//! Extracts frames of pixel data from a stream of DICOM P10 tokens.

use std::collections::VecDeque;

use byteorder::ByteOrder;

use dcmstream_core::{
  DataElementValue, DataError, DataSet, DcmError, RcByteSlice,
  ValueRepresentation, dictionary,
};
use dcmstream_p10::{
  P10CustomTypeTransform, P10CustomTypeTransformError, P10Error,
  P10FilterTransform, P10Token,
};

use crate::PixelDataFrame;

/// Transform that takes a stream of DICOM P10 tokens and emits the frames of
/// pixel data it contains. Frames are emitted as soon as their data is
/// complete, and carry their data as borrowed fragments so that no pixel
/// data is copied.
///
/// Both native and encapsulated pixel data are supported. For encapsulated
/// pixel data, frame boundaries come from the Basic Offset Table when it is
/// present, else from the Extended Offset Table when one exists, else each
/// item is one frame (or all items form a single frame when *'(0028,0008)
/// Number of Frames'* is one).
///
pub struct P10PixelDataFrameTransform {
  is_encapsulated: bool,

  // Gathers the values of the data elements needed to interpret the pixel
  // data
  details: P10CustomTypeTransform<PixelDataFrameDetails>,

  // Admits only the '(7FE0,0010) Pixel Data' data element at the root
  pixel_data_filter: P10FilterTransform,

  // The size in bits of a single frame of native pixel data
  native_frame_size_in_bits: u64,

  // Chunks of pixel data not yet emitted as part of a frame. The second
  // value is, for native pixel data, the bit offset into the chunk where
  // un-emitted data begins, and for encapsulated pixel data, the size in
  // bits of the item header preceding the chunk (non-zero only for an
  // item's first chunk).
  pixel_data: VecDeque<(RcByteSlice, u64)>,

  pixel_data_write_offset: u64,
  pixel_data_read_offset: u64,

  // Offsets and optional lengths of each frame of encapsulated pixel data,
  // from either the Basic Offset Table or the Extended Offset Table
  offset_table: Option<OffsetTable>,

  // Whether the next value bytes chunk is the first of its pixel data item
  is_first_chunk_of_item: bool,

  next_frame_index: usize,
}

type OffsetTable = VecDeque<(u64, Option<u64>)>;

/// The size in bits of an encapsulated pixel data item header, i.e. its tag
/// and length.
///
const ITEM_HEADER_SIZE_IN_BITS: u64 = 64;

#[derive(Clone, Debug, PartialEq)]
struct PixelDataFrameDetails {
  number_of_frames: usize,
  rows: u16,
  columns: u16,
  bits_allocated: u16,
  extended_offset_table: Option<DataElementValue>,
  extended_offset_table_lengths: Option<DataElementValue>,
}

impl PixelDataFrameDetails {
  fn from_data_set(data_set: &DataSet) -> Result<Self, DataError> {
    let number_of_frames =
      data_set.get_int_with_default::<usize>(dictionary::NUMBER_OF_FRAMES.tag, 1)?;

    Ok(Self {
      number_of_frames,
      rows: data_set.get_int_with_default(dictionary::ROWS.tag, 0)?,
      columns: data_set.get_int_with_default(dictionary::COLUMNS.tag, 0)?,
      bits_allocated: data_set
        .get_int_with_default(dictionary::BITS_ALLOCATED.tag, 8)?,
      extended_offset_table: data_set
        .get_value(dictionary::EXTENDED_OFFSET_TABLE.tag)
        .ok()
        .cloned(),
      extended_offset_table_lengths: data_set
        .get_value(dictionary::EXTENDED_OFFSET_TABLE_LENGTHS.tag)
        .ok()
        .cloned(),
    })
  }
}

/// An error from extracting frames of pixel data out of a stream of DICOM
/// P10 tokens.
///
#[derive(Clone, Debug, PartialEq)]
pub enum P10PixelDataFrameTransformError {
  /// The stream of DICOM P10 tokens was itself invalid.
  P10Error(P10Error),

  /// The data elements describing the pixel data were missing or invalid.
  DataError(DataError),
}

impl core::fmt::Display for P10PixelDataFrameTransformError {
  fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
    match self {
      Self::P10Error(e) => e.fmt(f),
      Self::DataError(e) => e.fmt(f),
    }
  }
}

impl DcmError for P10PixelDataFrameTransformError {
  fn to_lines(&self, task_description: &str) -> Vec<String> {
    match self {
      Self::P10Error(e) => e.to_lines(task_description),
      Self::DataError(e) => e.to_lines(task_description),
    }
  }
}

static DETAILS_TAGS: [dcmstream_core::DataElementTag; 6] = [
  dictionary::NUMBER_OF_FRAMES.tag,
  dictionary::ROWS.tag,
  dictionary::COLUMNS.tag,
  dictionary::BITS_ALLOCATED.tag,
  dictionary::EXTENDED_OFFSET_TABLE.tag,
  dictionary::EXTENDED_OFFSET_TABLE_LENGTHS.tag,
];

impl P10PixelDataFrameTransform {
  /// Creates a new transform for extracting frames of pixel data from a
  /// stream of DICOM P10 tokens.
  ///
  pub fn new() -> Self {
    let details = P10CustomTypeTransform::<PixelDataFrameDetails>::new(
      &DETAILS_TAGS,
      PixelDataFrameDetails::from_data_set,
    );

    let pixel_data_filter =
      P10FilterTransform::new(Box::new(|tag, _vr, _length, path| {
        tag == dictionary::PIXEL_DATA.tag && path.is_root()
      }));

    Self {
      is_encapsulated: false,
      details,
      pixel_data_filter,
      native_frame_size_in_bits: 0,
      pixel_data: VecDeque::new(),
      pixel_data_write_offset: 0,
      pixel_data_read_offset: 0,
      offset_table: None,
      is_first_chunk_of_item: false,
      next_frame_index: 0,
    }
  }

  /// Adds the next DICOM P10 token and returns any frames of pixel data that
  /// are now complete.
  ///
  pub fn add_token(
    &mut self,
    token: &P10Token,
  ) -> Result<Vec<PixelDataFrame>, P10PixelDataFrameTransformError> {
    match self.details.add_token(token) {
      Ok(()) => (),
      Err(P10CustomTypeTransformError::P10Error(e)) => {
        return Err(P10PixelDataFrameTransformError::P10Error(e));
      }
      Err(P10CustomTypeTransformError::DataError(e)) => {
        return Err(P10PixelDataFrameTransformError::DataError(e));
      }
    };

    if !token.is_header_token()
      && self
        .pixel_data_filter
        .add_token(token)
        .map_err(P10PixelDataFrameTransformError::P10Error)?
    {
      self
        .process_next_pixel_data_token(token)
        .map_err(P10PixelDataFrameTransformError::DataError)
    } else {
      Ok(vec![])
    }
  }

  /// Returns the value of the *'(0028,0008) Number of Frames'* data element,
  /// defaulting to one.
  ///
  pub fn number_of_frames(&self) -> usize {
    match self.details.get_output() {
      Some(details) => details.number_of_frames,
      None => 1,
    }
  }

  fn process_next_pixel_data_token(
    &mut self,
    token: &P10Token,
  ) -> Result<Vec<PixelDataFrame>, DataError> {
    match token {
      // The start of native pixel data
      P10Token::DataElementHeader { length, .. } => {
        self.is_encapsulated = false;
        self.native_frame_size_in_bits =
          self.validate_native_pixel_data_length(*length)?;

        Ok(vec![])
      }

      // The start of encapsulated pixel data
      P10Token::SequenceStart { .. } => {
        self.is_encapsulated = true;
        Ok(vec![])
      }

      // The end of encapsulated pixel data. Any remaining pixel data forms
      // the final frame.
      P10Token::SequenceDelimiter { .. } => {
        let mut frames = vec![];

        if !self.pixel_data.is_empty() {
          let mut frame = PixelDataFrame::new();
          frame.set_index(self.next_frame_index);
          self.next_frame_index += 1;

          for (chunk, _) in self.pixel_data.drain(..) {
            frame.push_fragment(chunk);
          }

          // Apply this frame's length when the offset table specifies one
          if let Some(offset_table) = self.offset_table.as_ref()
            && let Some((_, Some(frame_length))) = offset_table.front()
          {
            apply_length_to_frame(&mut frame, *frame_length)?;
          }

          frames.push(frame);
        }

        Ok(frames)
      }

      // The start of a new encapsulated pixel data item. The 8 bytes of the
      // item's header count towards the offsets in the offset table.
      P10Token::PixelDataItem { .. } => {
        self.pixel_data_write_offset += ITEM_HEADER_SIZE_IN_BITS;
        self.is_first_chunk_of_item = true;

        Ok(vec![])
      }

      P10Token::DataElementValueBytes {
        data,
        bytes_remaining,
        ..
      } => {
        let header_bits = if self.is_encapsulated && self.is_first_chunk_of_item
        {
          ITEM_HEADER_SIZE_IN_BITS
        } else {
          0
        };
        self.is_first_chunk_of_item = false;

        self.pixel_data.push_back((data.clone(), header_bits));
        self.pixel_data_write_offset += data.len() as u64 * 8;

        if self.is_encapsulated {
          if *bytes_remaining == 0 {
            self.get_pending_encapsulated_frames()
          } else {
            Ok(vec![])
          }
        } else if self.native_frame_size_in_bits > 0 {
          Ok(self.get_pending_native_frames())
        } else {
          Ok(vec![])
        }
      }

      _ => Ok(vec![]),
    }
  }

  /// Checks the declared length of native pixel data against the frame
  /// details and returns the size in bits of a single frame.
  ///
  /// When *'(0028,0100) Bits Allocated'* is one the frame size is `Rows ×
  /// Columns` bits and frames are packed with no padding between them;
  /// otherwise the pixel data length must divide evenly into the number of
  /// frames.
  ///
  fn validate_native_pixel_data_length(
    &self,
    length: u32,
  ) -> Result<u64, DataError> {
    let number_of_frames = self.number_of_frames();

    if number_of_frames == 0 {
      return Ok(0);
    }

    let details = self.details.get_output().ok_or_else(|| {
      DataError::new_value_invalid(
        "Pixel data was encountered before the data elements that describe \
         it"
          .to_string(),
      )
    })?;

    if details.bits_allocated == 1 {
      let pixel_count = u64::from(details.rows) * u64::from(details.columns);
      let expected_length =
        (pixel_count * number_of_frames as u64).div_ceil(8);

      if u64::from(length) != expected_length {
        return Err(DataError::new_value_invalid(format!(
          "Bitmap pixel data has length {length} bytes but {expected_length} \
           bytes were expected"
        )));
      }

      Ok(pixel_count)
    } else {
      if length as usize % number_of_frames != 0 {
        return Err(DataError::new_value_invalid(format!(
          "Multi-frame pixel data of length {length} bytes does not divide \
           evenly into {number_of_frames} frames"
        )));
      }

      Ok(u64::from(length) * 8 / number_of_frames as u64)
    }
  }

  /// Consumes native pixel data for as many complete frames as possible and
  /// returns them.
  ///
  fn get_pending_native_frames(&mut self) -> Vec<PixelDataFrame> {
    let mut frames = vec![];

    let frame_size = self.native_frame_size_in_bits;

    while self.pixel_data_read_offset + frame_size
      <= self.pixel_data_write_offset
    {
      let mut frame = PixelDataFrame::new();

      frame.set_index(self.next_frame_index);
      frame.set_bit_offset(self.pixel_data_read_offset as usize % 8);

      while frame.len_bits() < frame_size {
        let (chunk, chunk_offset) = self.pixel_data.pop_front().unwrap();

        let chunk_bits = chunk.len() as u64 * 8 - chunk_offset;

        // Add the whole remainder of the chunk when the frame needs all of
        // it, otherwise split the chunk at the frame boundary and return the
        // unused part to the queue for the next frame
        if chunk_bits <= frame_size - frame.len_bits() {
          frame.push_fragment(chunk.drop((chunk_offset / 8) as usize));
          self.pixel_data_read_offset += chunk_bits;
        } else {
          let bits_needed = frame_size - frame.len_bits();

          frame.push_fragment(chunk.slice(
            (chunk_offset / 8) as usize,
            (chunk_offset + bits_needed).div_ceil(8) as usize,
          ));

          self.pixel_data.push_front((chunk, chunk_offset + bits_needed));
          self.pixel_data_read_offset += bits_needed;
        }
      }

      // Don't emit more frames than '(0028,0008) Number of Frames'
      // specifies. With 1bpp data whose frame size is under a byte, the
      // unused bits at the end of the data can otherwise contain whole
      // phantom frames.
      if self.next_frame_index < self.number_of_frames() {
        frames.push(frame);
      }

      self.next_frame_index += 1;
    }

    frames
  }

  /// Consumes encapsulated pixel data for as many complete frames as
  /// possible and returns them.
  ///
  fn get_pending_encapsulated_frames(
    &mut self,
  ) -> Result<Vec<PixelDataFrame>, DataError> {
    match self.offset_table.as_mut() {
      // The first pixel data item is the Basic Offset Table, which is now
      // complete and can be read
      None => {
        self.offset_table = Some(self.read_offset_table()?);
        self.pixel_data.clear();
        self.pixel_data_write_offset = 0;
        self.pixel_data_read_offset = 0;

        Ok(vec![])
      }

      Some(offset_table) => {
        let mut frames = vec![];

        if offset_table.is_empty() {
          // With no offset table and more than one frame, each pixel data
          // item is a frame. A single frame's items all accumulate until the
          // sequence delimiter.
          if self.number_of_frames() > 1 {
            let mut frame = PixelDataFrame::new();

            frame.set_index(self.next_frame_index);
            self.next_frame_index += 1;

            for (chunk, _) in self.pixel_data.drain(..) {
              frame.push_fragment(chunk);
            }

            self.pixel_data_read_offset = self.pixel_data_write_offset;

            frames.push(frame);
          }
        } else {
          // The next entry in the offset table is where the current frame
          // ends
          while let Some((offset, _)) = offset_table.get(1).copied() {
            if self.pixel_data_write_offset < offset * 8 {
              break;
            }

            let mut frame = PixelDataFrame::new();

            frame.set_index(self.next_frame_index);
            self.next_frame_index += 1;

            while self.pixel_data_read_offset < offset * 8 {
              let Some((chunk, header_bits)) = self.pixel_data.pop_front()
              else {
                break;
              };

              self.pixel_data_read_offset +=
                header_bits + chunk.len() as u64 * 8;

              frame.push_fragment(chunk);
            }

            // The frame must end exactly on the expected offset
            if self.pixel_data_read_offset != offset * 8 {
              return Err(DataError::new_value_invalid(
                "Pixel data offset table is malformed".to_string(),
              ));
            }

            let (_, frame_length) = offset_table.pop_front().unwrap();

            if let Some(frame_length) = frame_length {
              apply_length_to_frame(&mut frame, frame_length)?;
            }

            frames.push(frame);
          }
        }

        Ok(frames)
      }
    }
  }

  /// Determines the offset table to use for the frames of encapsulated pixel
  /// data, from the Basic Offset Table in the first pixel data item or from
  /// an Extended Offset Table.
  ///
  fn read_offset_table(&self) -> Result<OffsetTable, DataError> {
    let basic_offset_table = self.read_basic_offset_table()?;
    let extended_offset_table = self.read_extended_offset_table()?;

    if basic_offset_table.is_empty() {
      Ok(extended_offset_table.unwrap_or_default())
    } else {
      // The Extended Offset Table must be absent when there is a Basic
      // Offset Table. Ref: PS3.5 A.4.
      if extended_offset_table.is_some() {
        return Err(DataError::new_value_invalid(
          "Extended Offset Table must be absent when there is a Basic Offset \
           Table"
            .to_string(),
        ));
      }

      Ok(basic_offset_table)
    }
  }

  fn read_basic_offset_table(&self) -> Result<OffsetTable, DataError> {
    let mut offset_table_data = vec![];
    for (chunk, _) in self.pixel_data.iter() {
      offset_table_data.extend_from_slice(chunk);
    }

    if offset_table_data.is_empty() {
      return Ok(VecDeque::new());
    }

    if offset_table_data.len() % 4 != 0 {
      return Err(DataError::new_value_invalid(
        "Basic Offset Table length is not a multiple of 4".to_string(),
      ));
    }

    let mut offsets = vec![0u32; offset_table_data.len() / 4];
    byteorder::LittleEndian::read_u32_into(&offset_table_data, &mut offsets);

    // The first offset must be zero. Ref: PS3.5 A.4.
    if offsets.first() != Some(&0) {
      return Err(DataError::new_value_invalid(
        "Basic Offset Table first value must be zero".to_string(),
      ));
    }

    if !offsets.is_sorted() {
      return Err(DataError::new_value_invalid(
        "Basic Offset Table values are not sorted".to_string(),
      ));
    }

    Ok(offsets.into_iter().map(|o| (u64::from(o), None)).collect())
  }

  fn read_extended_offset_table(
    &self,
  ) -> Result<Option<OffsetTable>, DataError> {
    let Some(PixelDataFrameDetails {
      extended_offset_table: Some(extended_offset_table),
      extended_offset_table_lengths: Some(extended_offset_table_lengths),
      ..
    }) = self.details.get_output()
    else {
      return Ok(None);
    };

    // Read the value of the '(7FE0,0001) Extended Offset Table' data element
    let offsets_bytes = extended_offset_table
      .vr_bytes(&[ValueRepresentation::OtherVeryLongString])?;

    if offsets_bytes.len() % 8 != 0 {
      return Err(DataError::new_value_invalid(
        "Extended Offset Table has invalid size".to_string(),
      ));
    }

    let mut offsets = vec![0u64; offsets_bytes.len() / 8];
    byteorder::LittleEndian::read_u64_into(offsets_bytes, &mut offsets);

    if *offsets.first().unwrap_or(&0) != 0 {
      return Err(DataError::new_value_invalid(
        "Extended Offset Table first value must be zero".to_string(),
      ));
    }

    if !offsets.is_sorted() {
      return Err(DataError::new_value_invalid(
        "Extended Offset Table values are not sorted".to_string(),
      ));
    }

    // Read the value of the '(7FE0,0002) Extended Offset Table Lengths' data
    // element
    let lengths_bytes = extended_offset_table_lengths
      .vr_bytes(&[ValueRepresentation::OtherVeryLongString])?;

    if lengths_bytes.len() % 8 != 0 {
      return Err(DataError::new_value_invalid(
        "Extended Offset Table Lengths has invalid size".to_string(),
      ));
    }

    let mut lengths = vec![0u64; lengths_bytes.len() / 8];
    byteorder::LittleEndian::read_u64_into(lengths_bytes, &mut lengths);

    if offsets.len() != lengths.len() {
      return Err(DataError::new_value_invalid(
        "Extended Offset Table and Lengths don't have the same number of \
         items"
          .to_string(),
      ));
    }

    Ok(Some(
      offsets
        .into_iter()
        .zip(lengths)
        .map(|(offset, length)| (offset, Some(length)))
        .collect(),
    ))
  }
}

impl Default for P10PixelDataFrameTransform {
  fn default() -> Self {
    Self::new()
  }
}

/// Validates and applies a frame length from the offset table to a frame,
/// trimming excess bytes off the end of the frame when it is longer than the
/// specified length.
///
fn apply_length_to_frame(
  frame: &mut PixelDataFrame,
  frame_length: u64,
) -> Result<(), DataError> {
  match frame.len() {
    len if len == frame_length => (),

    len if len > frame_length => {
      frame.drop_end_bytes(len - frame_length);
    }

    len => {
      return Err(DataError::new_value_invalid(format!(
        "Extended Offset Table Length value '{frame_length}' is invalid for \
         frame of length '{len}'"
      )));
    }
  }

  Ok(())
}
