//! A dictionary of the well-known DICOM data elements that this library
//! works with, mapping data element tags to their name, allowed VRs, and
//! value multiplicity.
//!
//! This is not the complete PS3.6 registry. It contains the File Meta
//! Information group, the delimitation items, all clarifying data elements,
//! every data element whose VR is ambiguous in the 'Implicit VR Little
//! Endian' transfer syntax, the image pixel and waveform modules, and the
//! common patient/study data elements used for display and testing. Tags not
//! present format as `unknown_tag`.

use crate::{DataElementTag, ValueMultiplicity, ValueRepresentation};

/// A single entry in the data element dictionary.
///
#[derive(Debug, PartialEq)]
pub struct Item {
  pub tag: DataElementTag,
  pub name: &'static str,
  pub vrs: &'static [ValueRepresentation],
  pub multiplicity: ValueMultiplicity,
}

const fn item(
  group: u16,
  element: u16,
  name: &'static str,
  vrs: &'static [ValueRepresentation],
  multiplicity: ValueMultiplicity,
) -> Item {
  Item {
    tag: DataElementTag::new(group, element),
    name,
    vrs,
    multiplicity,
  }
}

use crate::ValueRepresentation as VR;

const ONE: ValueMultiplicity = ValueMultiplicity::ONE;
const ONE_TO_MANY: ValueMultiplicity = ValueMultiplicity::ONE_TO_MANY;

pub const FILE_META_INFORMATION_GROUP_LENGTH: Item = item(
  0x0002,
  0x0000,
  "File Meta Information Group Length",
  &[VR::UnsignedLong],
  ONE,
);

pub const FILE_META_INFORMATION_VERSION: Item = item(
  0x0002,
  0x0001,
  "File Meta Information Version",
  &[VR::OtherByteString],
  ONE,
);

pub const MEDIA_STORAGE_SOP_CLASS_UID: Item = item(
  0x0002,
  0x0002,
  "Media Storage SOP Class UID",
  &[VR::UniqueIdentifier],
  ONE,
);

pub const MEDIA_STORAGE_SOP_INSTANCE_UID: Item = item(
  0x0002,
  0x0003,
  "Media Storage SOP Instance UID",
  &[VR::UniqueIdentifier],
  ONE,
);

pub const TRANSFER_SYNTAX_UID: Item =
  item(0x0002, 0x0010, "Transfer Syntax UID", &[VR::UniqueIdentifier], ONE);

pub const IMPLEMENTATION_CLASS_UID: Item = item(
  0x0002,
  0x0012,
  "Implementation Class UID",
  &[VR::UniqueIdentifier],
  ONE,
);

pub const IMPLEMENTATION_VERSION_NAME: Item = item(
  0x0002,
  0x0013,
  "Implementation Version Name",
  &[VR::ShortString],
  ONE,
);

pub const SPECIFIC_CHARACTER_SET: Item = item(
  0x0008,
  0x0005,
  "Specific Character Set",
  &[VR::CodeString],
  ONE_TO_MANY,
);

pub const IMAGE_TYPE: Item =
  item(0x0008, 0x0008, "Image Type", &[VR::CodeString], ONE_TO_MANY);

pub const SOP_CLASS_UID: Item =
  item(0x0008, 0x0016, "SOP Class UID", &[VR::UniqueIdentifier], ONE);

pub const SOP_INSTANCE_UID: Item =
  item(0x0008, 0x0018, "SOP Instance UID", &[VR::UniqueIdentifier], ONE);

pub const STUDY_DATE: Item =
  item(0x0008, 0x0020, "Study Date", &[VR::Date], ONE);

pub const STUDY_TIME: Item =
  item(0x0008, 0x0030, "Study Time", &[VR::Time], ONE);

pub const ACCESSION_NUMBER: Item =
  item(0x0008, 0x0050, "Accession Number", &[VR::ShortString], ONE);

pub const MODALITY: Item =
  item(0x0008, 0x0060, "Modality", &[VR::CodeString], ONE);

pub const MANUFACTURER: Item =
  item(0x0008, 0x0070, "Manufacturer", &[VR::LongString], ONE);

pub const REFERRING_PHYSICIAN_NAME: Item =
  item(0x0008, 0x0090, "Referring Physician's Name", &[VR::PersonName], ONE);

pub const STUDY_DESCRIPTION: Item =
  item(0x0008, 0x1030, "Study Description", &[VR::LongString], ONE);

pub const SERIES_DESCRIPTION: Item =
  item(0x0008, 0x103E, "Series Description", &[VR::LongString], ONE);

pub const ANATOMIC_REGION_SEQUENCE: Item =
  item(0x0008, 0x2218, "Anatomic Region Sequence", &[VR::Sequence], ONE);

pub const PATIENT_NAME: Item =
  item(0x0010, 0x0010, "Patient's Name", &[VR::PersonName], ONE);

pub const PATIENT_ID: Item =
  item(0x0010, 0x0020, "Patient ID", &[VR::LongString], ONE);

pub const PATIENT_BIRTH_DATE: Item =
  item(0x0010, 0x0030, "Patient's Birth Date", &[VR::Date], ONE);

pub const PATIENT_SEX: Item =
  item(0x0010, 0x0040, "Patient's Sex", &[VR::CodeString], ONE);

pub const PATIENT_AGE: Item =
  item(0x0010, 0x1010, "Patient's Age", &[VR::AgeString], ONE);

pub const STUDY_INSTANCE_UID: Item =
  item(0x0020, 0x000D, "Study Instance UID", &[VR::UniqueIdentifier], ONE);

pub const SERIES_INSTANCE_UID: Item =
  item(0x0020, 0x000E, "Series Instance UID", &[VR::UniqueIdentifier], ONE);

pub const STUDY_ID: Item =
  item(0x0020, 0x0010, "Study ID", &[VR::ShortString], ONE);

pub const SERIES_NUMBER: Item =
  item(0x0020, 0x0011, "Series Number", &[VR::IntegerString], ONE);

pub const INSTANCE_NUMBER: Item =
  item(0x0020, 0x0013, "Instance Number", &[VR::IntegerString], ONE);

pub const SAMPLES_PER_PIXEL: Item =
  item(0x0028, 0x0002, "Samples per Pixel", &[VR::UnsignedShort], ONE);

pub const PHOTOMETRIC_INTERPRETATION: Item = item(
  0x0028,
  0x0004,
  "Photometric Interpretation",
  &[VR::CodeString],
  ONE,
);

pub const PLANAR_CONFIGURATION: Item =
  item(0x0028, 0x0006, "Planar Configuration", &[VR::UnsignedShort], ONE);

pub const NUMBER_OF_FRAMES: Item =
  item(0x0028, 0x0008, "Number of Frames", &[VR::IntegerString], ONE);

pub const ROWS: Item = item(0x0028, 0x0010, "Rows", &[VR::UnsignedShort], ONE);

pub const COLUMNS: Item =
  item(0x0028, 0x0011, "Columns", &[VR::UnsignedShort], ONE);

pub const BITS_ALLOCATED: Item =
  item(0x0028, 0x0100, "Bits Allocated", &[VR::UnsignedShort], ONE);

pub const BITS_STORED: Item =
  item(0x0028, 0x0101, "Bits Stored", &[VR::UnsignedShort], ONE);

pub const HIGH_BIT: Item =
  item(0x0028, 0x0102, "High Bit", &[VR::UnsignedShort], ONE);

pub const PIXEL_REPRESENTATION: Item =
  item(0x0028, 0x0103, "Pixel Representation", &[VR::UnsignedShort], ONE);

pub const SMALLEST_VALID_PIXEL_VALUE: Item = item(
  0x0028,
  0x0104,
  "Smallest Valid Pixel Value",
  &[VR::UnsignedShort, VR::SignedShort],
  ONE,
);

pub const LARGEST_VALID_PIXEL_VALUE: Item = item(
  0x0028,
  0x0105,
  "Largest Valid Pixel Value",
  &[VR::UnsignedShort, VR::SignedShort],
  ONE,
);

pub const SMALLEST_IMAGE_PIXEL_VALUE: Item = item(
  0x0028,
  0x0106,
  "Smallest Image Pixel Value",
  &[VR::UnsignedShort, VR::SignedShort],
  ONE,
);

pub const LARGEST_IMAGE_PIXEL_VALUE: Item = item(
  0x0028,
  0x0107,
  "Largest Image Pixel Value",
  &[VR::UnsignedShort, VR::SignedShort],
  ONE,
);

pub const SMALLEST_PIXEL_VALUE_IN_SERIES: Item = item(
  0x0028,
  0x0108,
  "Smallest Pixel Value in Series",
  &[VR::UnsignedShort, VR::SignedShort],
  ONE,
);

pub const LARGEST_PIXEL_VALUE_IN_SERIES: Item = item(
  0x0028,
  0x0109,
  "Largest Pixel Value in Series",
  &[VR::UnsignedShort, VR::SignedShort],
  ONE,
);

pub const SMALLEST_IMAGE_PIXEL_VALUE_IN_PLANE: Item = item(
  0x0028,
  0x0110,
  "Smallest Image Pixel Value in Plane",
  &[VR::UnsignedShort, VR::SignedShort],
  ONE,
);

pub const LARGEST_IMAGE_PIXEL_VALUE_IN_PLANE: Item = item(
  0x0028,
  0x0111,
  "Largest Image Pixel Value in Plane",
  &[VR::UnsignedShort, VR::SignedShort],
  ONE,
);

pub const PIXEL_PADDING_VALUE: Item = item(
  0x0028,
  0x0120,
  "Pixel Padding Value",
  &[VR::UnsignedShort, VR::SignedShort],
  ONE,
);

pub const PIXEL_PADDING_RANGE_LIMIT: Item = item(
  0x0028,
  0x0121,
  "Pixel Padding Range Limit",
  &[VR::UnsignedShort, VR::SignedShort],
  ONE,
);

pub const RED_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR: Item = item(
  0x0028,
  0x1101,
  "Red Palette Color Lookup Table Descriptor",
  &[VR::UnsignedShort, VR::SignedShort],
  ValueMultiplicity {
    min: 3,
    max: Some(3),
  },
);

pub const GREEN_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR: Item = item(
  0x0028,
  0x1102,
  "Green Palette Color Lookup Table Descriptor",
  &[VR::UnsignedShort, VR::SignedShort],
  ValueMultiplicity {
    min: 3,
    max: Some(3),
  },
);

pub const BLUE_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR: Item = item(
  0x0028,
  0x1103,
  "Blue Palette Color Lookup Table Descriptor",
  &[VR::UnsignedShort, VR::SignedShort],
  ValueMultiplicity {
    min: 3,
    max: Some(3),
  },
);

pub const MODALITY_LUT_SEQUENCE: Item =
  item(0x0028, 0x3000, "Modality LUT Sequence", &[VR::Sequence], ONE);

pub const LUT_DESCRIPTOR: Item = item(
  0x0028,
  0x3002,
  "LUT Descriptor",
  &[VR::UnsignedShort, VR::SignedShort],
  ValueMultiplicity {
    min: 3,
    max: Some(3),
  },
);

pub const LUT_DATA: Item = item(
  0x0028,
  0x3006,
  "LUT Data",
  &[VR::UnsignedShort, VR::OtherWordString],
  ONE_TO_MANY,
);

pub const WAVEFORM_BITS_STORED: Item =
  item(0x003A, 0x021A, "Waveform Bits Stored", &[VR::UnsignedShort], ONE);

pub const REAL_WORLD_VALUE_LAST_VALUE_MAPPED: Item = item(
  0x0040,
  0x9211,
  "Real World Value Last Value Mapped",
  &[VR::UnsignedShort, VR::SignedShort],
  ONE,
);

pub const REAL_WORLD_VALUE_FIRST_VALUE_MAPPED: Item = item(
  0x0040,
  0x9216,
  "Real World Value First Value Mapped",
  &[VR::UnsignedShort, VR::SignedShort],
  ONE,
);

pub const HISTOGRAM_FIRST_BIN_VALUE: Item = item(
  0x0060,
  0x3004,
  "Histogram First Bin Value",
  &[VR::UnsignedShort, VR::SignedShort],
  ONE,
);

pub const HISTOGRAM_LAST_BIN_VALUE: Item = item(
  0x0060,
  0x3006,
  "Histogram Last Bin Value",
  &[VR::UnsignedShort, VR::SignedShort],
  ONE,
);

pub const CHANNEL_MINIMUM_VALUE: Item = item(
  0x5400,
  0x0110,
  "Channel Minimum Value",
  &[VR::OtherByteString, VR::OtherWordString],
  ONE,
);

pub const CHANNEL_MAXIMUM_VALUE: Item = item(
  0x5400,
  0x0112,
  "Channel Maximum Value",
  &[VR::OtherByteString, VR::OtherWordString],
  ONE,
);

pub const WAVEFORM_BITS_ALLOCATED: Item = item(
  0x5400,
  0x1004,
  "Waveform Bits Allocated",
  &[VR::UnsignedShort],
  ONE,
);

pub const WAVEFORM_PADDING_VALUE: Item = item(
  0x5400,
  0x100A,
  "Waveform Padding Value",
  &[VR::OtherByteString, VR::OtherWordString],
  ONE,
);

pub const WAVEFORM_DATA: Item = item(
  0x5400,
  0x1010,
  "Waveform Data",
  &[VR::OtherByteString, VR::OtherWordString],
  ONE,
);

pub const OVERLAY_ROWS: Item =
  item(0x6000, 0x0010, "Overlay Rows", &[VR::UnsignedShort], ONE);

pub const OVERLAY_COLUMNS: Item =
  item(0x6000, 0x0011, "Overlay Columns", &[VR::UnsignedShort], ONE);

pub const OVERLAY_BITS_ALLOCATED: Item = item(
  0x6000,
  0x0100,
  "Overlay Bits Allocated",
  &[VR::UnsignedShort],
  ONE,
);

pub const OVERLAY_DATA: Item = item(
  0x6000,
  0x3000,
  "Overlay Data",
  &[VR::OtherByteString, VR::OtherWordString],
  ONE,
);

pub const EXTENDED_OFFSET_TABLE: Item = item(
  0x7FE0,
  0x0001,
  "Extended Offset Table",
  &[VR::OtherVeryLongString],
  ONE,
);

pub const EXTENDED_OFFSET_TABLE_LENGTHS: Item = item(
  0x7FE0,
  0x0002,
  "Extended Offset Table Lengths",
  &[VR::OtherVeryLongString],
  ONE,
);

pub const PIXEL_DATA: Item = item(
  0x7FE0,
  0x0010,
  "Pixel Data",
  &[VR::OtherByteString, VR::OtherWordString],
  ONE,
);

pub const DATA_SET_TRAILING_PADDING: Item = item(
  0xFFFC,
  0xFFFC,
  "Data Set Trailing Padding",
  &[VR::OtherByteString],
  ONE,
);

pub const ITEM: Item = item(0xFFFE, 0xE000, "Item", &[], ONE);

pub const ITEM_DELIMITATION_ITEM: Item =
  item(0xFFFE, 0xE00D, "Item Delimitation Item", &[], ONE);

pub const SEQUENCE_DELIMITATION_ITEM: Item =
  item(0xFFFE, 0xE0DD, "Sequence Delimitation Item", &[], ONE);

/// All dictionary entries, sorted by tag.
///
static TABLE: [&Item; 70] = [
  &FILE_META_INFORMATION_GROUP_LENGTH,
  &FILE_META_INFORMATION_VERSION,
  &MEDIA_STORAGE_SOP_CLASS_UID,
  &MEDIA_STORAGE_SOP_INSTANCE_UID,
  &TRANSFER_SYNTAX_UID,
  &IMPLEMENTATION_CLASS_UID,
  &IMPLEMENTATION_VERSION_NAME,
  &SPECIFIC_CHARACTER_SET,
  &IMAGE_TYPE,
  &SOP_CLASS_UID,
  &SOP_INSTANCE_UID,
  &STUDY_DATE,
  &STUDY_TIME,
  &ACCESSION_NUMBER,
  &MODALITY,
  &MANUFACTURER,
  &REFERRING_PHYSICIAN_NAME,
  &STUDY_DESCRIPTION,
  &SERIES_DESCRIPTION,
  &ANATOMIC_REGION_SEQUENCE,
  &PATIENT_NAME,
  &PATIENT_ID,
  &PATIENT_BIRTH_DATE,
  &PATIENT_SEX,
  &PATIENT_AGE,
  &STUDY_INSTANCE_UID,
  &SERIES_INSTANCE_UID,
  &STUDY_ID,
  &SERIES_NUMBER,
  &INSTANCE_NUMBER,
  &SAMPLES_PER_PIXEL,
  &PHOTOMETRIC_INTERPRETATION,
  &PLANAR_CONFIGURATION,
  &NUMBER_OF_FRAMES,
  &ROWS,
  &COLUMNS,
  &BITS_ALLOCATED,
  &BITS_STORED,
  &HIGH_BIT,
  &PIXEL_REPRESENTATION,
  &SMALLEST_VALID_PIXEL_VALUE,
  &LARGEST_VALID_PIXEL_VALUE,
  &SMALLEST_IMAGE_PIXEL_VALUE,
  &LARGEST_IMAGE_PIXEL_VALUE,
  &SMALLEST_PIXEL_VALUE_IN_SERIES,
  &LARGEST_PIXEL_VALUE_IN_SERIES,
  &SMALLEST_IMAGE_PIXEL_VALUE_IN_PLANE,
  &LARGEST_IMAGE_PIXEL_VALUE_IN_PLANE,
  &PIXEL_PADDING_VALUE,
  &PIXEL_PADDING_RANGE_LIMIT,
  &RED_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR,
  &GREEN_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR,
  &BLUE_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR,
  &MODALITY_LUT_SEQUENCE,
  &LUT_DESCRIPTOR,
  &LUT_DATA,
  &WAVEFORM_BITS_STORED,
  &REAL_WORLD_VALUE_LAST_VALUE_MAPPED,
  &REAL_WORLD_VALUE_FIRST_VALUE_MAPPED,
  &HISTOGRAM_FIRST_BIN_VALUE,
  &HISTOGRAM_LAST_BIN_VALUE,
  &CHANNEL_MINIMUM_VALUE,
  &CHANNEL_MAXIMUM_VALUE,
  &WAVEFORM_BITS_ALLOCATED,
  &WAVEFORM_PADDING_VALUE,
  &WAVEFORM_DATA,
  &OVERLAY_ROWS,
  &OVERLAY_COLUMNS,
  &OVERLAY_BITS_ALLOCATED,
  &OVERLAY_DATA,
];

/// The trailing entries of [`TABLE`] whose groups sort after the overlay
/// repeating group.
///
static TABLE_TAIL: [&Item; 7] = [
  &EXTENDED_OFFSET_TABLE,
  &EXTENDED_OFFSET_TABLE_LENGTHS,
  &PIXEL_DATA,
  &DATA_SET_TRAILING_PADDING,
  &ITEM,
  &ITEM_DELIMITATION_ITEM,
  &SEQUENCE_DELIMITATION_ITEM,
];

/// Finds the dictionary entry for the given data element tag.
///
/// Overlay data elements are defined for the repeating groups `60xx` where
/// `xx` is even, and resolve to the `6000` group entries. Private tags are
/// not in the dictionary, so lookups of them always fail; the private creator
/// argument exists so that registries of well-known private data elements can
/// be consulted by future versions without changing call sites.
///
#[allow(clippy::result_unit_err)]
pub fn find(
  tag: DataElementTag,
  _private_creator: Option<&str>,
) -> Result<&'static Item, ()> {
  // Remap repeating overlay groups onto their dictionary entries
  let tag = if (0x6000..=0x60FF).contains(&tag.group) && tag.group & 1 == 0 {
    tag.with_group(0x6000)
  } else {
    tag
  };

  TABLE
    .iter()
    .chain(TABLE_TAIL.iter())
    .find(|item| item.tag == tag)
    .copied()
    .ok_or(())
}

/// Returns whether the given tag is one of the lookup table descriptor tags,
/// whose values have unusual VR rules and are stored with their raw bytes
/// preserved.
///
pub fn is_lut_descriptor_tag(tag: DataElementTag) -> bool {
  tag == LUT_DESCRIPTOR.tag
    || tag == RED_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR.tag
    || tag == GREEN_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR.tag
    || tag == BLUE_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR.tag
}

/// Returns the human-readable name for a data element tag. Unrecognized tags
/// return `"unknown_tag"`, except for private creator tags which are always
/// identifiable from the tag value alone.
///
pub fn tag_name(
  tag: DataElementTag,
  private_creator: Option<&str>,
) -> &'static str {
  if tag.is_private_creator() {
    return "Private Creator";
  }

  match find(tag, private_creator) {
    Ok(item) => item.name,
    Err(()) => "unknown_tag",
  }
}

/// Formats a data element tag as `"(GROUP,ELEMENT) NAME"`, e.g.
/// `"(0008,0020) Study Date"`.
///
pub fn tag_with_name(
  tag: DataElementTag,
  private_creator: Option<&str>,
) -> String {
  format!("{} {}", tag, tag_name(tag, private_creator))
}

/// Returns a descriptive name for the given UID, if one is known. Currently
/// only transfer syntax UIDs are named.
///
#[allow(clippy::result_unit_err)]
pub fn uid_name(uid: &str) -> Result<&'static str, ()> {
  crate::TransferSyntax::from_uid(uid).map(|ts| ts.name)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn table_is_sorted_test() {
    let all: Vec<_> = TABLE.iter().chain(TABLE_TAIL.iter()).collect();

    for pair in all.windows(2) {
      assert!(pair[0].tag < pair[1].tag, "{} >= {}", pair[0].tag, pair[1].tag);
    }
  }

  #[test]
  fn find_test() {
    assert_eq!(find(PIXEL_DATA.tag, None), Ok(&PIXEL_DATA));
    assert_eq!(find(DataElementTag::new(0x0009, 0x1001), None), Err(()));

    // Repeating overlay groups resolve to the 6000 group entries
    assert_eq!(
      find(DataElementTag::new(0x6002, 0x3000), None),
      Ok(&OVERLAY_DATA)
    );
    assert_eq!(find(DataElementTag::new(0x6001, 0x3000), None), Err(()));
  }

  #[test]
  fn tag_name_test() {
    assert_eq!(tag_name(STUDY_DATE.tag, None), "Study Date");
    assert_eq!(tag_name(DataElementTag::new(0x0009, 0x0010), None), {
      "Private Creator"
    });
    assert_eq!(tag_name(DataElementTag::new(0x1234, 0x5678), None), {
      "unknown_tag"
    });
  }

  #[test]
  fn tag_with_name_test() {
    assert_eq!(
      tag_with_name(PATIENT_AGE.tag, None),
      "(0010,1010) Patient's Age"
    );
  }

  #[test]
  fn is_lut_descriptor_tag_test() {
    assert!(is_lut_descriptor_tag(LUT_DESCRIPTOR.tag));
    assert!(is_lut_descriptor_tag(
      RED_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR.tag
    ));
    assert!(!is_lut_descriptor_tag(LUT_DATA.tag));
  }
}
