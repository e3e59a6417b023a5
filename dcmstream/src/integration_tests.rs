//! End-to-end tests that exercise reading, writing, transforming, and frame
//! extraction on in-memory DICOM P10 data.

use byteorder::ByteOrder;

use dcmstream_core::*;
use dcmstream_p10::*;
use dcmstream_pixel_data::*;

//
// Helpers for constructing raw DICOM P10 byte streams.
//

/// Returns a complete DICOM P10 file: preamble, 'DICM', File Meta
/// Information with the given transfer syntax UID, and the given main data
/// set bytes.
///
fn p10_file(transfer_syntax_uid: &str, body: &[u8]) -> Vec<u8> {
  let mut uid_bytes = transfer_syntax_uid.as_bytes().to_vec();
  if uid_bytes.len() % 2 == 1 {
    uid_bytes.push(0);
  }

  let mut fmi = vec![];
  fmi.extend_from_slice(&explicit_short_element(
    0x0002, 0x0010, b"UI", &uid_bytes,
  ));

  let mut bytes = vec![0u8; 128];
  bytes.extend_from_slice(b"DICM");

  // (0002,0000) File Meta Information Group Length
  bytes.extend_from_slice(&explicit_short_element(
    0x0002,
    0x0000,
    b"UL",
    &(fmi.len() as u32).to_le_bytes(),
  ));

  bytes.extend_from_slice(&fmi);
  bytes.extend_from_slice(body);

  bytes
}

/// Serializes an explicit VR little endian data element whose VR has a
/// 16-bit length field.
///
fn explicit_short_element(
  group: u16,
  element: u16,
  vr: &[u8; 2],
  value: &[u8],
) -> Vec<u8> {
  let mut bytes = vec![];

  bytes.extend_from_slice(&group.to_le_bytes());
  bytes.extend_from_slice(&element.to_le_bytes());
  bytes.extend_from_slice(vr);
  bytes.extend_from_slice(&(value.len() as u16).to_le_bytes());
  bytes.extend_from_slice(value);

  bytes
}

/// Serializes an explicit VR little endian data element whose VR has a
/// 32-bit length field preceded by two reserved bytes.
///
fn explicit_long_element(
  group: u16,
  element: u16,
  vr: &[u8; 2],
  length: u32,
  value: &[u8],
) -> Vec<u8> {
  let mut bytes = vec![];

  bytes.extend_from_slice(&group.to_le_bytes());
  bytes.extend_from_slice(&element.to_le_bytes());
  bytes.extend_from_slice(vr);
  bytes.extend_from_slice(&[0, 0]);
  bytes.extend_from_slice(&length.to_le_bytes());
  bytes.extend_from_slice(value);

  bytes
}

/// Serializes an implicit VR little endian data element.
///
fn implicit_element(group: u16, element: u16, value: &[u8]) -> Vec<u8> {
  let mut bytes = vec![];

  bytes.extend_from_slice(&group.to_le_bytes());
  bytes.extend_from_slice(&element.to_le_bytes());
  bytes.extend_from_slice(&(value.len() as u32).to_le_bytes());
  bytes.extend_from_slice(value);

  bytes
}

/// Serializes the tag and length of an encapsulated pixel data item.
///
fn pixel_data_item(length: u32) -> Vec<u8> {
  let mut bytes = vec![];

  bytes.extend_from_slice(&0xFFFEu16.to_le_bytes());
  bytes.extend_from_slice(&0xE000u16.to_le_bytes());
  bytes.extend_from_slice(&length.to_le_bytes());

  bytes
}

/// Reads all DICOM P10 tokens out of the given bytes.
///
fn read_all_tokens(bytes: Vec<u8>) -> Result<Vec<P10Token>, P10Error> {
  read_all_tokens_with_config(bytes, None)
}

fn read_all_tokens_with_config(
  bytes: Vec<u8>,
  config: Option<P10ReadConfig>,
) -> Result<Vec<P10Token>, P10Error> {
  let mut context = P10ReadContext::new(config);
  context.write_bytes(bytes.into(), true)?;

  let mut tokens = vec![];

  loop {
    let new_tokens = context.read_tokens()?;
    let is_ended = new_tokens.contains(&P10Token::End);

    tokens.extend(new_tokens);

    if is_ended {
      return Ok(tokens);
    }
  }
}

/// Builds a data set out of a list of DICOM P10 tokens.
///
fn build_data_set(tokens: &[P10Token]) -> Result<DataSet, P10Error> {
  let mut builder = DataSetBuilder::new();

  for token in tokens {
    builder.add_token(token)?;
  }

  Ok(builder.final_data_set().unwrap())
}

/// Serializes a list of DICOM P10 tokens back to DICOM P10 bytes.
///
fn write_all_tokens(tokens: &[P10Token]) -> Result<Vec<u8>, P10Error> {
  let mut context = P10WriteContext::new(None);
  let mut bytes = vec![];

  for token in tokens {
    context.write_token(token)?;

    for chunk in context.read_bytes() {
      bytes.extend_from_slice(&chunk);
    }
  }

  Ok(bytes)
}

//
// Scenario tests.
//

#[test]
fn minimal_preamble_and_file_meta_information_test() {
  // A file containing nothing but a preamble and two File Meta Information
  // data elements
  let mut fmi = vec![];
  fmi.extend_from_slice(&explicit_long_element(
    0x0002,
    0x0001,
    b"OB",
    2,
    &[0x00, 0x01],
  ));
  fmi.extend_from_slice(&explicit_short_element(
    0x0002, 0x0002, b"UI", b"1.23",
  ));

  let mut bytes = vec![0u8; 128];
  bytes.extend_from_slice(b"DICM");
  bytes.extend_from_slice(&explicit_short_element(
    0x0002,
    0x0000,
    b"UL",
    &(fmi.len() as u32).to_le_bytes(),
  ));
  bytes.extend_from_slice(&fmi);

  let tokens = read_all_tokens(bytes).unwrap();

  assert_eq!(tokens.len(), 3);

  assert_eq!(
    tokens[0],
    P10Token::FilePreambleAndDICMPrefix {
      preamble: Box::new([0; 128])
    }
  );

  match &tokens[1] {
    P10Token::FileMetaInformation { data_set } => {
      assert_eq!(
        data_set.tags(),
        vec![
          dictionary::FILE_META_INFORMATION_VERSION.tag,
          dictionary::MEDIA_STORAGE_SOP_CLASS_UID.tag,
        ]
      );
      assert_eq!(
        data_set.get_string(dictionary::MEDIA_STORAGE_SOP_CLASS_UID.tag),
        Ok("1.23")
      );
    }

    token => panic!("Unexpected token: {token}"),
  }

  assert_eq!(tokens[2], P10Token::End);
}

#[test]
fn implicit_vr_us_ss_disambiguation_test() {
  // '(0028,0106) Smallest Image Pixel Value' is US or SS depending on the
  // value of '(0028,0103) Pixel Representation'
  let mut body = vec![];
  body.extend_from_slice(&implicit_element(0x0028, 0x0103, &[0x01, 0x00]));
  body.extend_from_slice(&implicit_element(0x0028, 0x0106, &[0xFF, 0xFF]));

  let bytes = p10_file("1.2.840.10008.1.2", &body);

  let tokens = read_all_tokens(bytes).unwrap();

  let smallest_pixel_value_header = tokens
    .iter()
    .find(|token| {
      matches!(
        token,
        P10Token::DataElementHeader { tag, .. }
          if *tag == dictionary::SMALLEST_IMAGE_PIXEL_VALUE.tag
      )
    })
    .unwrap();

  match smallest_pixel_value_header {
    P10Token::DataElementHeader { vr, .. } => {
      assert_eq!(*vr, ValueRepresentation::SignedShort);
    }
    _ => unreachable!(),
  }

  let data_set = build_data_set(&tokens).unwrap();

  assert_eq!(
    data_set.get_int::<i16>(dictionary::SMALLEST_IMAGE_PIXEL_VALUE.tag),
    Ok(-1)
  );
}

#[test]
fn big_endian_pixel_data_endian_swap_test() {
  // 32-bit pixel data with a VR of OW is endian swapped at 4-byte width
  let mut body = vec![];

  // (0028,0100) Bits Allocated = 32, in big endian
  body.extend_from_slice(&0x0028u16.to_be_bytes());
  body.extend_from_slice(&0x0100u16.to_be_bytes());
  body.extend_from_slice(b"US");
  body.extend_from_slice(&2u16.to_be_bytes());
  body.extend_from_slice(&32u16.to_be_bytes());

  // (7FE0,0010) Pixel Data, OW, 8 bytes
  body.extend_from_slice(&0x7FE0u16.to_be_bytes());
  body.extend_from_slice(&0x0010u16.to_be_bytes());
  body.extend_from_slice(b"OW");
  body.extend_from_slice(&[0, 0]);
  body.extend_from_slice(&8u32.to_be_bytes());
  body.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 2]);

  let bytes = p10_file("1.2.840.10008.1.2.2", &body);

  let tokens = read_all_tokens(bytes).unwrap();

  let pixel_data_bytes = tokens
    .iter()
    .find_map(|token| match token {
      P10Token::DataElementValueBytes { tag, data, .. }
        if *tag == dictionary::PIXEL_DATA.tag =>
      {
        Some(data.clone())
      }
      _ => None,
    })
    .unwrap();

  assert_eq!(&*pixel_data_bytes, &[1, 0, 0, 0, 2, 0, 0, 0]);
}

#[test]
fn encapsulated_frames_with_empty_basic_offset_table_test() {
  let mut body = vec![];
  body.extend_from_slice(&explicit_short_element(0x0028, 0x0008, b"IS", b"3 "));

  // Encapsulated pixel data: empty Basic Offset Table followed by three
  // one-fragment frames
  body.extend_from_slice(&explicit_long_element(
    0x7FE0,
    0x0010,
    b"OB",
    0xFFFFFFFF,
    &[],
  ));
  body.extend_from_slice(&pixel_data_item(0));
  for fragment in [[1u8, 2u8], [3, 4], [5, 6]] {
    body.extend_from_slice(&pixel_data_item(2));
    body.extend_from_slice(&fragment);
  }
  body.extend_from_slice(&implicit_element(0xFFFE, 0xE0DD, &[]));

  let bytes = p10_file("1.2.840.10008.1.2.4.50", &body);

  let tokens = read_all_tokens(bytes).unwrap();

  let mut frame_transform = P10PixelDataFrameTransform::new();
  let mut frames = vec![];
  for token in &tokens {
    frames.extend(frame_transform.add_token(token).unwrap());
  }

  assert_eq!(frames.len(), 3);
  assert_eq!(frames[0].index(), 0);
  assert_eq!(frames[0].to_bytes(), vec![1, 2].into());
  assert_eq!(frames[1].to_bytes(), vec![3, 4].into());
  assert_eq!(frames[2].index(), 2);
  assert_eq!(frames[2].to_bytes(), vec![5, 6].into());
}

#[test]
fn native_one_bit_frames_with_remainder_test() {
  // Two 3x3 frames of 1bpp pixel data pack into ceil(18 / 8) = 3 bytes, with
  // the second frame starting partway through the second byte
  let mut body = vec![];
  body.extend_from_slice(&explicit_short_element(0x0028, 0x0008, b"IS", b"2 "));
  body.extend_from_slice(&explicit_short_element(
    0x0028,
    0x0010,
    b"US",
    &3u16.to_le_bytes(),
  ));
  body.extend_from_slice(&explicit_short_element(
    0x0028,
    0x0011,
    b"US",
    &3u16.to_le_bytes(),
  ));
  body.extend_from_slice(&explicit_short_element(
    0x0028,
    0x0100,
    b"US",
    &1u16.to_le_bytes(),
  ));
  body.extend_from_slice(&explicit_long_element(
    0x7FE0,
    0x0010,
    b"OW",
    3,
    &[0b0101_0101, 0b1010_1010, 0b0000_0011],
  ));

  let bytes = p10_file("1.2.840.10008.1.2.1", &body);

  let tokens = read_all_tokens(bytes).unwrap();

  let mut frame_transform = P10PixelDataFrameTransform::new();
  let mut frames = vec![];
  for token in &tokens {
    frames.extend(frame_transform.add_token(token).unwrap());
  }

  assert_eq!(frames.len(), 2);

  // Frame 0 covers bits [0, 9) and so spans the first two bytes
  assert_eq!(frames[0].bit_offset(), 0);
  assert_eq!(
    frames[0].fragments(),
    &[RcByteSlice::from_vec(vec![0b0101_0101, 0b1010_1010])]
  );

  // Frame 1 covers bits [9, 18) and reports a bit offset of one
  assert_eq!(frames[1].bit_offset(), 1);
  assert_eq!(frames[1].len_bits(), 15);
  assert_eq!(
    frames[1].to_bytes(),
    vec![0b1101_0101, 0b0000_0001].into()
  );
}

#[test]
fn cp_246_un_sequence_forces_implicit_vr_test() {
  // A UN data element with undefined length parses as a sequence whose
  // content is 'Implicit VR Little Endian' even though the file is explicit
  // VR. Ref: DICOM Correction Proposal CP-246.
  let mut body = vec![];

  // (0008,2218) with VR UN and undefined length
  body.extend_from_slice(&explicit_long_element(
    0x0008,
    0x2218,
    b"UN",
    0xFFFFFFFF,
    &[],
  ));

  // Item with undefined length holding '(0008,0060) Modality' in implicit VR
  body.extend_from_slice(&0xFFFEu16.to_le_bytes());
  body.extend_from_slice(&0xE000u16.to_le_bytes());
  body.extend_from_slice(&0xFFFFFFFFu32.to_le_bytes());
  body.extend_from_slice(&implicit_element(0x0008, 0x0060, b"US"));
  body.extend_from_slice(&implicit_element(0xFFFE, 0xE00D, &[]));

  body.extend_from_slice(&implicit_element(0xFFFE, 0xE0DD, &[]));

  let bytes = p10_file("1.2.840.10008.1.2.1", &body);

  let tokens = read_all_tokens(bytes).unwrap();

  assert!(tokens.iter().any(|token| matches!(
    token,
    P10Token::SequenceStart { tag, vr, .. }
      if *tag == dictionary::ANATOMIC_REGION_SEQUENCE.tag
        && *vr == ValueRepresentation::Sequence
  )));

  let data_set = build_data_set(&tokens).unwrap();

  let items = data_set
    .get_value(dictionary::ANATOMIC_REGION_SEQUENCE.tag)
    .unwrap()
    .sequence_items()
    .unwrap();

  assert_eq!(items.len(), 1);
  assert_eq!(items[0].get_string(dictionary::MODALITY.tag), Ok("US"));
}

//
// Property tests.
//

/// Returns a data set with a bit of everything in it: strings, numbers, a
/// nested sequence, and native pixel data.
///
fn test_data_set() -> DataSet {
  let mut data_set = DataSet::new();

  data_set
    .insert_string_value(&dictionary::SOP_INSTANCE_UID, &["1.2.3.4"])
    .unwrap();
  data_set
    .insert_string_value(&dictionary::PATIENT_NAME, &["Doe^John"])
    .unwrap();
  data_set
    .insert_string_value(&dictionary::PATIENT_ID, &["ABC123"])
    .unwrap();
  data_set
    .insert_int_value(&dictionary::ROWS, &[2])
    .unwrap();
  data_set
    .insert_int_value(&dictionary::COLUMNS, &[2])
    .unwrap();

  let mut item = DataSet::new();
  item
    .insert_string_value(&dictionary::MODALITY, &["US"])
    .unwrap();
  data_set.insert(
    dictionary::ANATOMIC_REGION_SEQUENCE.tag,
    DataElementValue::new_sequence(vec![item]),
  );

  data_set.insert(
    dictionary::PIXEL_DATA.tag,
    DataElementValue::new_other_word_string(vec![1, 2, 3, 4]).unwrap(),
  );

  data_set
}

/// Strips the data elements that serialization is documented to add: the
/// File Meta Information group and the Specific Character Set element.
///
fn strip_serialization_artifacts(data_set: &mut DataSet) {
  data_set.retain(|tag, _value| {
    !tag.is_file_meta_information()
      && *tag != dictionary::SPECIFIC_CHARACTER_SET.tag
  });
}

#[test]
fn data_set_round_trip_test() {
  let data_set = test_data_set();

  let mut bytes = vec![];
  data_set.write_p10_stream(&mut bytes, None).unwrap();

  assert!(is_valid_bytes(&bytes));

  let mut read_back = read_bytes(bytes.into()).map_err(|(e, _)| e).unwrap();

  assert_eq!(
    read_back.get_string(dictionary::SPECIFIC_CHARACTER_SET.tag),
    Ok("ISO_IR 192")
  );
  assert_eq!(
    read_back.get_string(dictionary::MEDIA_STORAGE_SOP_INSTANCE_UID.tag),
    Ok("1.2.3.4")
  );

  strip_serialization_artifacts(&mut read_back);
  assert_eq!(read_back, data_set);
}

#[test]
fn token_stream_round_trip_test() {
  let mut body = vec![];
  body.extend_from_slice(&implicit_element(0x0028, 0x0103, &[0x01, 0x00]));
  body.extend_from_slice(&implicit_element(0x0028, 0x0106, &[0xFF, 0xFF]));

  let bytes = p10_file("1.2.840.10008.1.2", &body);

  // Read tokens, serialize them back to bytes, and read those bytes again.
  // The two token streams must produce identical data sets, other than the
  // File Meta Information the writer fills in.
  let tokens = read_all_tokens(bytes).unwrap();
  let rewritten_bytes = write_all_tokens(&tokens).unwrap();
  let reread_tokens = read_all_tokens(rewritten_bytes).unwrap();

  let mut data_set = build_data_set(&tokens).unwrap();
  let mut reread_data_set = build_data_set(&reread_tokens).unwrap();

  data_set.retain(|tag, _value| !tag.is_file_meta_information());
  reread_data_set.retain(|tag, _value| !tag.is_file_meta_information());

  assert_eq!(reread_data_set, data_set);
}

#[test]
fn deflated_round_trip_test() {
  let mut data_set = test_data_set();
  data_set
    .insert_string_value(&dictionary::TRANSFER_SYNTAX_UID, &[
      "1.2.840.10008.1.2.1.99",
    ])
    .unwrap();

  let mut bytes = vec![];
  data_set.write_p10_stream(&mut bytes, None).unwrap();

  let mut read_back = read_bytes(bytes.into()).map_err(|(e, _)| e).unwrap();

  assert_eq!(
    read_back.get_transfer_syntax(),
    Ok(&transfer_syntax::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN)
  );

  strip_serialization_artifacts(&mut read_back);

  let mut original = data_set;
  original.delete(dictionary::TRANSFER_SYNTAX_UID.tag);

  assert_eq!(read_back, original);
}

#[test]
fn streamed_read_matches_single_read_test() {
  let mut body = vec![];
  body.extend_from_slice(&implicit_element(0x0010, 0x0020, b"ABC123"));
  body.extend_from_slice(&implicit_element(0x0028, 0x0010, &[2, 0]));

  let bytes = p10_file("1.2.840.10008.1.2", &body);

  let all_at_once_tokens = read_all_tokens(bytes.clone()).unwrap();

  // Stream the same bytes into the read context one byte at a time
  let mut context = P10ReadContext::new(None);
  let mut streamed_tokens = vec![];

  let byte_count = bytes.len();
  for (i, byte) in bytes.into_iter().enumerate() {
    context
      .write_bytes(vec![byte].into(), i + 1 == byte_count)
      .unwrap();

    loop {
      match context.read_tokens() {
        Ok(tokens) => {
          let is_ended = tokens.contains(&P10Token::End);
          streamed_tokens.extend(tokens);

          if is_ended {
            break;
          }
        }

        Err(P10Error::DataRequired { .. }) => break,

        Err(e) => panic!("Streamed read failed: {e}"),
      }
    }
  }

  assert_eq!(streamed_tokens, all_at_once_tokens);
}

#[test]
fn max_token_size_bounds_value_bytes_test() {
  let mut body = vec![];
  body.extend_from_slice(&explicit_long_element(
    0x7FE0,
    0x0010,
    b"OW",
    32,
    &[0u8; 32],
  ));

  // No preamble, DICM, or File Meta Information, so the fallback transfer
  // syntax decides how the bytes are read
  let config = P10ReadConfig::default().max_token_size(8);

  let mut context = P10ReadContext::new(Some(config));
  context
    .set_fallback_transfer_syntax(&transfer_syntax::EXPLICIT_VR_LITTLE_ENDIAN);
  context.write_bytes(body.into(), true).unwrap();

  let mut tokens = vec![];
  loop {
    let new_tokens = context.read_tokens().unwrap();
    let is_ended = new_tokens.contains(&P10Token::End);
    tokens.extend(new_tokens);

    if is_ended {
      break;
    }
  }

  let value_bytes_tokens: Vec<_> = tokens
    .iter()
    .filter_map(|token| match token {
      P10Token::DataElementValueBytes {
        tag,
        data,
        bytes_remaining,
        ..
      } if *tag == dictionary::PIXEL_DATA.tag => {
        Some((data.len(), *bytes_remaining))
      }
      _ => None,
    })
    .collect();

  assert_eq!(
    value_bytes_tokens,
    vec![(8, 24), (8, 16), (8, 8), (8, 0)]
  );
}

#[test]
fn filter_transform_removes_data_elements_test() {
  let mut body = vec![];
  body.extend_from_slice(&implicit_element(0x0010, 0x0010, b"Doe^John"));
  body.extend_from_slice(&implicit_element(0x0010, 0x0020, b"ABC123"));

  let bytes = p10_file("1.2.840.10008.1.2", &body);

  let tokens = read_all_tokens(bytes).unwrap();

  let mut filter =
    P10FilterTransform::new(Box::new(|tag, _vr, _length, _path| {
      tag != dictionary::PATIENT_NAME.tag
    }));

  let filtered_tokens: Vec<P10Token> = tokens
    .into_iter()
    .filter(|token| filter.add_token(token).unwrap())
    .collect();

  let rewritten_bytes = write_all_tokens(&filtered_tokens).unwrap();
  let data_set = build_data_set(&read_all_tokens(rewritten_bytes).unwrap())
    .unwrap();

  assert!(!data_set.has(dictionary::PATIENT_NAME.tag));
  assert_eq!(data_set.get_string(dictionary::PATIENT_ID.tag), Ok("ABC123"));
}

#[test]
fn insert_transform_round_trip_test() {
  let mut body = vec![];
  body.extend_from_slice(&implicit_element(0x0010, 0x0020, b"ABC123"));

  let bytes = p10_file("1.2.840.10008.1.2", &body);
  let tokens = read_all_tokens(bytes).unwrap();

  let mut data_elements_to_insert = DataSet::new();
  data_elements_to_insert
    .insert_string_value(&dictionary::PATIENT_NAME, &["Doe^Jane"])
    .unwrap();

  let mut insert_transform = P10InsertTransform::new(data_elements_to_insert);

  let mut output_tokens = vec![];
  for token in &tokens {
    if token.is_header_token() {
      output_tokens.push(token.clone());
    } else {
      output_tokens.extend(insert_transform.add_token(token).unwrap());
    }
  }

  let data_set = build_data_set(&output_tokens).unwrap();

  assert_eq!(
    data_set.get_string(dictionary::PATIENT_NAME.tag),
    Ok("Doe^Jane")
  );
  assert_eq!(data_set.get_string(dictionary::PATIENT_ID.tag), Ok("ABC123"));
}

#[test]
fn charset_decoding_to_utf8_test() {
  // A Latin-1 encoded patient name is converted to UTF-8 during reading
  let mut body = vec![];
  body.extend_from_slice(&implicit_element(0x0008, 0x0005, b"ISO_IR 100"));
  body.extend_from_slice(&implicit_element(0x0010, 0x0010, b"M\xFCller"));

  let bytes = p10_file("1.2.840.10008.1.2", &body);

  let data_set = build_data_set(&read_all_tokens(bytes).unwrap()).unwrap();

  // The Specific Character Set value itself now declares UTF-8
  assert_eq!(
    data_set.get_string(dictionary::SPECIFIC_CHARACTER_SET.tag),
    Ok("ISO_IR 192")
  );
  assert_eq!(
    data_set.get_string(dictionary::PATIENT_NAME.tag),
    Ok("Müller")
  );
}

#[test]
fn extended_offset_table_test() {
  // Two frames of lengths 2 and 4 described by an Extended Offset Table.
  // The second frame's item has two padding bytes on the end that its
  // length value trims off.
  let mut offsets = [0u8; 16];
  byteorder::LittleEndian::write_u64_into(&[0, 10], &mut offsets);

  let mut lengths = [0u8; 16];
  byteorder::LittleEndian::write_u64_into(&[2, 4], &mut lengths);

  let mut body = vec![];
  body.extend_from_slice(&explicit_short_element(0x0028, 0x0008, b"IS", b"2 "));
  body.extend_from_slice(&explicit_long_element(
    0x7FE0, 0x0001, b"OV", 16, &offsets,
  ));
  body.extend_from_slice(&explicit_long_element(
    0x7FE0, 0x0002, b"OV", 16, &lengths,
  ));
  body.extend_from_slice(&explicit_long_element(
    0x7FE0,
    0x0010,
    b"OB",
    0xFFFFFFFF,
    &[],
  ));
  body.extend_from_slice(&pixel_data_item(0));
  body.extend_from_slice(&pixel_data_item(2));
  body.extend_from_slice(&[1, 2]);
  body.extend_from_slice(&pixel_data_item(6));
  body.extend_from_slice(&[3, 4, 5, 6, 0, 0]);
  body.extend_from_slice(&implicit_element(0xFFFE, 0xE0DD, &[]));

  let bytes = p10_file("1.2.840.10008.1.2.4.50", &body);

  let tokens = read_all_tokens(bytes).unwrap();

  let mut frame_transform = P10PixelDataFrameTransform::new();
  let mut frames = vec![];
  for token in &tokens {
    frames.extend(frame_transform.add_token(token).unwrap());
  }

  assert_eq!(frames.len(), 2);
  assert_eq!(frames[0].to_bytes(), vec![1, 2].into());
  assert_eq!(frames[1].to_bytes(), vec![3, 4, 5, 6].into());
}

#[test]
fn truncated_data_errors_test() {
  let mut body = vec![];
  body.extend_from_slice(&implicit_element(0x0010, 0x0020, b"ABC123"));

  let mut bytes = p10_file("1.2.840.10008.1.2", &body);

  // Truncate partway through the final data element's value
  bytes.truncate(bytes.len() - 3);

  assert!(matches!(
    read_all_tokens(bytes),
    Err(P10Error::DataEndedUnexpectedly { .. })
  ));
}

#[test]
fn unordered_data_elements_error_by_default_test() {
  let mut body = vec![];
  body.extend_from_slice(&implicit_element(0x0010, 0x0020, b"ABC123"));
  body.extend_from_slice(&implicit_element(0x0010, 0x0010, b"Doe^John"));

  let bytes = p10_file("1.2.840.10008.1.2", &body);

  assert!(matches!(
    read_all_tokens(bytes.clone()),
    Err(P10Error::DataInvalid { .. })
  ));

  // The same data reads fine when ordering isn't required
  let config = P10ReadConfig::default().require_ordered_data_elements(false);
  assert!(read_all_tokens_with_config(bytes, Some(config)).is_ok());
}

#[test]
fn unsupported_transfer_syntax_errors_test() {
  let bytes = p10_file("1.2.840.10008.1.99", &[]);

  assert_eq!(
    read_all_tokens(bytes),
    Err(P10Error::TransferSyntaxNotSupported {
      transfer_syntax_uid: "1.2.840.10008.1.99".to_string()
    })
  );
}

#[test]
fn write_after_completion_errors_test() {
  let mut context = P10ReadContext::new(None);
  context.write_bytes(vec![].into(), true).unwrap();

  assert_eq!(
    context.write_bytes(vec![1].into(), false),
    Err(P10Error::WriteAfterCompletion)
  );
}
