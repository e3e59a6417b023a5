//! Defines all supported DICOM transfer syntaxes.

/// How a transfer syntax serializes value representations: either implicitly,
/// where the VR is taken from the dictionary, or explicitly, where the VR is
/// stored in the data element header.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VrSerialization {
  VrImplicit,
  VrExplicit,
}

/// The byte order of a transfer syntax.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Endianness {
  LittleEndian,
  BigEndian,
}

impl Endianness {
  /// Returns whether this is big endian byte order.
  ///
  pub fn is_big(&self) -> bool {
    *self == Endianness::BigEndian
  }
}

/// Describes a single DICOM transfer syntax: its name and UID, how it
/// serializes VRs, its endianness, whether its main data set is zlib
/// deflated, and whether it stores pixel data in encapsulated form.
///
#[derive(Debug, PartialEq)]
pub struct TransferSyntax {
  pub name: &'static str,
  pub uid: &'static str,
  pub vr_serialization: VrSerialization,
  pub endianness: Endianness,
  pub is_deflated: bool,
  pub is_encapsulated: bool,
}

const fn encapsulated(name: &'static str, uid: &'static str) -> TransferSyntax {
  TransferSyntax {
    name,
    uid,
    vr_serialization: VrSerialization::VrExplicit,
    endianness: Endianness::LittleEndian,
    is_deflated: false,
    is_encapsulated: true,
  }
}

/// The 'Implicit VR Little Endian' transfer syntax.
///
pub const IMPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax {
  name: "Implicit VR Little Endian",
  uid: "1.2.840.10008.1.2",
  vr_serialization: VrSerialization::VrImplicit,
  endianness: Endianness::LittleEndian,
  is_deflated: false,
  is_encapsulated: false,
};

/// The 'Explicit VR Little Endian' transfer syntax.
///
pub const EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax {
  name: "Explicit VR Little Endian",
  uid: "1.2.840.10008.1.2.1",
  vr_serialization: VrSerialization::VrExplicit,
  endianness: Endianness::LittleEndian,
  is_deflated: false,
  is_encapsulated: false,
};

/// The 'Encapsulated Uncompressed Explicit VR Little Endian' transfer syntax.
///
pub const ENCAPSULATED_UNCOMPRESSED_EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax =
  encapsulated(
    "Encapsulated Uncompressed Explicit VR Little Endian",
    "1.2.840.10008.1.2.1.98",
  );

/// The 'Deflated Explicit VR Little Endian' transfer syntax.
///
pub const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax {
  name: "Deflated Explicit VR Little Endian",
  uid: "1.2.840.10008.1.2.1.99",
  vr_serialization: VrSerialization::VrExplicit,
  endianness: Endianness::LittleEndian,
  is_deflated: true,
  is_encapsulated: false,
};

/// The 'Explicit VR Big Endian' transfer syntax. Retired, but still seen in
/// the wild.
///
pub const EXPLICIT_VR_BIG_ENDIAN: TransferSyntax = TransferSyntax {
  name: "Explicit VR Big Endian",
  uid: "1.2.840.10008.1.2.2",
  vr_serialization: VrSerialization::VrExplicit,
  endianness: Endianness::BigEndian,
  is_deflated: false,
  is_encapsulated: false,
};

/// The 'JPEG Baseline (Process 1)' transfer syntax.
///
pub const JPEG_BASELINE_8BIT: TransferSyntax =
  encapsulated("JPEG Baseline (Process 1)", "1.2.840.10008.1.2.4.50");

/// The 'JPEG Extended (Process 2 & 4)' transfer syntax.
///
pub const JPEG_EXTENDED_12BIT: TransferSyntax =
  encapsulated("JPEG Extended (Process 2 & 4)", "1.2.840.10008.1.2.4.51");

/// The 'JPEG Lossless, Non-Hierarchical (Process 14)' transfer syntax.
///
pub const JPEG_LOSSLESS_NON_HIERARCHICAL: TransferSyntax = encapsulated(
  "JPEG Lossless, Non-Hierarchical (Process 14)",
  "1.2.840.10008.1.2.4.57",
);

/// The 'JPEG Lossless, Non-Hierarchical, First-Order Prediction (Process 14
/// [Selection Value 1])' transfer syntax.
///
pub const JPEG_LOSSLESS_NON_HIERARCHICAL_SV1: TransferSyntax = encapsulated(
  "JPEG Lossless, Non-Hierarchical, First-Order Prediction (Process 14 \
   [Selection Value 1])",
  "1.2.840.10008.1.2.4.70",
);

/// The 'JPEG-LS Lossless Image Compression' transfer syntax.
///
pub const JPEG_LS_LOSSLESS: TransferSyntax = encapsulated(
  "JPEG-LS Lossless Image Compression",
  "1.2.840.10008.1.2.4.80",
);

/// The 'JPEG-LS Lossy (Near-Lossless) Image Compression' transfer syntax.
///
pub const JPEG_LS_LOSSY_NEAR_LOSSLESS: TransferSyntax = encapsulated(
  "JPEG-LS Lossy (Near-Lossless) Image Compression",
  "1.2.840.10008.1.2.4.81",
);

/// The 'JPEG 2000 Image Compression (Lossless Only)' transfer syntax.
///
pub const JPEG_2K_LOSSLESS_ONLY: TransferSyntax = encapsulated(
  "JPEG 2000 Image Compression (Lossless Only)",
  "1.2.840.10008.1.2.4.90",
);

/// The 'JPEG 2000 Image Compression' transfer syntax.
///
pub const JPEG_2K: TransferSyntax =
  encapsulated("JPEG 2000 Image Compression", "1.2.840.10008.1.2.4.91");

/// The 'JPEG 2000 Part 2 Multi-component Image Compression (Lossless Only)'
/// transfer syntax.
///
pub const JPEG_2K_MULTI_COMPONENT_LOSSLESS_ONLY: TransferSyntax = encapsulated(
  "JPEG 2000 Part 2 Multi-component Image Compression (Lossless Only)",
  "1.2.840.10008.1.2.4.92",
);

/// The 'JPEG 2000 Part 2 Multi-component Image Compression' transfer syntax.
///
pub const JPEG_2K_MULTI_COMPONENT: TransferSyntax = encapsulated(
  "JPEG 2000 Part 2 Multi-component Image Compression",
  "1.2.840.10008.1.2.4.93",
);

/// The 'JPIP Referenced' transfer syntax.
///
pub const JPIP_REFERENCED: TransferSyntax = TransferSyntax {
  name: "JPIP Referenced",
  uid: "1.2.840.10008.1.2.4.94",
  vr_serialization: VrSerialization::VrExplicit,
  endianness: Endianness::LittleEndian,
  is_deflated: false,
  is_encapsulated: false,
};

/// The 'JPIP Referenced Deflate' transfer syntax.
///
pub const JPIP_REFERENCED_DEFLATE: TransferSyntax = TransferSyntax {
  name: "JPIP Referenced Deflate",
  uid: "1.2.840.10008.1.2.4.95",
  vr_serialization: VrSerialization::VrExplicit,
  endianness: Endianness::LittleEndian,
  is_deflated: true,
  is_encapsulated: false,
};

/// The 'MPEG2 Main Profile @ Main Level' transfer syntax.
///
pub const MPEG2_MAIN_PROFILE_MAIN_LEVEL: TransferSyntax = encapsulated(
  "MPEG2 Main Profile @ Main Level",
  "1.2.840.10008.1.2.4.100",
);

/// The 'Fragmentable MPEG2 Main Profile @ Main Level' transfer syntax.
///
pub const FRAGMENTABLE_MPEG2_MAIN_PROFILE_MAIN_LEVEL: TransferSyntax =
  encapsulated(
    "Fragmentable MPEG2 Main Profile @ Main Level",
    "1.2.840.10008.1.2.4.100.1",
  );

/// The 'MPEG2 Main Profile @ High Level' transfer syntax.
///
pub const MPEG2_MAIN_PROFILE_HIGH_LEVEL: TransferSyntax = encapsulated(
  "MPEG2 Main Profile @ High Level",
  "1.2.840.10008.1.2.4.101",
);

/// The 'Fragmentable MPEG2 Main Profile @ High Level' transfer syntax.
///
pub const FRAGMENTABLE_MPEG2_MAIN_PROFILE_HIGH_LEVEL: TransferSyntax =
  encapsulated(
    "Fragmentable MPEG2 Main Profile @ High Level",
    "1.2.840.10008.1.2.4.101.1",
  );

/// The 'MPEG-4 AVC/H.264 High Profile / Level 4.1' transfer syntax.
///
pub const MPEG4_AVC_H264_HIGH_PROFILE: TransferSyntax = encapsulated(
  "MPEG-4 AVC/H.264 High Profile / Level 4.1",
  "1.2.840.10008.1.2.4.102",
);

/// The 'Fragmentable MPEG-4 AVC/H.264 High Profile / Level 4.1' transfer
/// syntax.
///
pub const FRAGMENTABLE_MPEG4_AVC_H264_HIGH_PROFILE: TransferSyntax =
  encapsulated(
    "Fragmentable MPEG-4 AVC/H.264 High Profile / Level 4.1",
    "1.2.840.10008.1.2.4.102.1",
  );

/// The 'MPEG-4 AVC/H.264 BD-compatible High Profile / Level 4.1' transfer
/// syntax.
///
pub const MPEG4_AVC_H264_BD_COMPATIBLE_HIGH_PROFILE: TransferSyntax =
  encapsulated(
    "MPEG-4 AVC/H.264 BD-compatible High Profile / Level 4.1",
    "1.2.840.10008.1.2.4.103",
  );

/// The 'Fragmentable MPEG-4 AVC/H.264 BD-compatible High Profile / Level 4.1'
/// transfer syntax.
///
pub const FRAGMENTABLE_MPEG4_AVC_H264_BD_COMPATIBLE_HIGH_PROFILE:
  TransferSyntax = encapsulated(
  "Fragmentable MPEG-4 AVC/H.264 BD-compatible High Profile / Level 4.1",
  "1.2.840.10008.1.2.4.103.1",
);

/// The 'MPEG-4 AVC/H.264 High Profile / Level 4.2 For 2D Video' transfer
/// syntax.
///
pub const MPEG4_AVC_H264_HIGH_PROFILE_FOR_2D_VIDEO: TransferSyntax =
  encapsulated(
    "MPEG-4 AVC/H.264 High Profile / Level 4.2 For 2D Video",
    "1.2.840.10008.1.2.4.104",
  );

/// The 'Fragmentable MPEG-4 AVC/H.264 High Profile / Level 4.2 For 2D Video'
/// transfer syntax.
///
pub const FRAGMENTABLE_MPEG4_AVC_H264_HIGH_PROFILE_FOR_2D_VIDEO:
  TransferSyntax = encapsulated(
  "Fragmentable MPEG-4 AVC/H.264 High Profile / Level 4.2 For 2D Video",
  "1.2.840.10008.1.2.4.104.1",
);

/// The 'MPEG-4 AVC/H.264 High Profile / Level 4.2 For 3D Video' transfer
/// syntax.
///
pub const MPEG4_AVC_H264_HIGH_PROFILE_FOR_3D_VIDEO: TransferSyntax =
  encapsulated(
    "MPEG-4 AVC/H.264 High Profile / Level 4.2 For 3D Video",
    "1.2.840.10008.1.2.4.105",
  );

/// The 'Fragmentable MPEG-4 AVC/H.264 High Profile / Level 4.2 For 3D Video'
/// transfer syntax.
///
pub const FRAGMENTABLE_MPEG4_AVC_H264_HIGH_PROFILE_FOR_3D_VIDEO:
  TransferSyntax = encapsulated(
  "Fragmentable MPEG-4 AVC/H.264 High Profile / Level 4.2 For 3D Video",
  "1.2.840.10008.1.2.4.105.1",
);

/// The 'MPEG-4 AVC/H.264 Stereo High Profile / Level 4.2' transfer syntax.
///
pub const MPEG4_AVC_H264_STEREO_HIGH_PROFILE: TransferSyntax = encapsulated(
  "MPEG-4 AVC/H.264 Stereo High Profile / Level 4.2",
  "1.2.840.10008.1.2.4.106",
);

/// The 'Fragmentable MPEG-4 AVC/H.264 Stereo High Profile / Level 4.2'
/// transfer syntax.
///
pub const FRAGMENTABLE_MPEG4_AVC_H264_STEREO_HIGH_PROFILE: TransferSyntax =
  encapsulated(
    "Fragmentable MPEG-4 AVC/H.264 Stereo High Profile / Level 4.2",
    "1.2.840.10008.1.2.4.106.1",
  );

/// The 'HEVC/H.265 Main Profile / Level 5.1' transfer syntax.
///
pub const HEVC_H265_MAIN_PROFILE: TransferSyntax = encapsulated(
  "HEVC/H.265 Main Profile / Level 5.1",
  "1.2.840.10008.1.2.4.107",
);

/// The 'HEVC/H.265 Main 10 Profile / Level 5.1' transfer syntax.
///
pub const HEVC_H265_MAIN_10_PROFILE: TransferSyntax = encapsulated(
  "HEVC/H.265 Main 10 Profile / Level 5.1",
  "1.2.840.10008.1.2.4.108",
);

/// The 'High-Throughput JPEG 2000 (Lossless Only)' transfer syntax.
///
pub const HIGH_THROUGHPUT_JPEG_2K_LOSSLESS_ONLY: TransferSyntax = encapsulated(
  "High-Throughput JPEG 2000 (Lossless Only)",
  "1.2.840.10008.1.2.4.201",
);

/// The 'High-Throughput JPEG 2000 with RPCL Options (Lossless Only)' transfer
/// syntax.
///
pub const HIGH_THROUGHPUT_JPEG_2K_WITH_RPCL_OPTIONS_LOSSLESS_ONLY:
  TransferSyntax = encapsulated(
  "High-Throughput JPEG 2000 with RPCL Options (Lossless Only)",
  "1.2.840.10008.1.2.4.202",
);

/// The 'High-Throughput JPEG 2000' transfer syntax.
///
pub const HIGH_THROUGHPUT_JPEG_2K: TransferSyntax =
  encapsulated("High-Throughput JPEG 2000", "1.2.840.10008.1.2.4.203");

/// The 'JPIP HTJ2K Referenced' transfer syntax.
///
pub const JPIP_HIGH_THROUGHPUT_JPEG_2K_REFERENCED: TransferSyntax =
  TransferSyntax {
    name: "JPIP HTJ2K Referenced",
    uid: "1.2.840.10008.1.2.4.204",
    vr_serialization: VrSerialization::VrExplicit,
    endianness: Endianness::LittleEndian,
    is_deflated: false,
    is_encapsulated: false,
  };

/// The 'JPIP HTJ2K Referenced Deflate' transfer syntax.
///
pub const JPIP_HIGH_THROUGHPUT_JPEG_2K_REFERENCED_DEFLATE: TransferSyntax =
  TransferSyntax {
    name: "JPIP HTJ2K Referenced Deflate",
    uid: "1.2.840.10008.1.2.4.205",
    vr_serialization: VrSerialization::VrExplicit,
    endianness: Endianness::LittleEndian,
    is_deflated: true,
    is_encapsulated: false,
  };

/// The 'RLE Lossless' transfer syntax.
///
pub const RLE_LOSSLESS: TransferSyntax =
  encapsulated("RLE Lossless", "1.2.840.10008.1.2.5");

/// The 'SMPTE ST 2110-20 Uncompressed Progressive Active Video' transfer
/// syntax.
///
pub const SMPTE_ST_2110_20_UNCOMPRESSED_PROGRESSIVE_ACTIVE_VIDEO:
  TransferSyntax = encapsulated(
  "SMPTE ST 2110-20 Uncompressed Progressive Active Video",
  "1.2.840.10008.1.2.7.1",
);

/// The 'SMPTE ST 2110-20 Uncompressed Interlaced Active Video' transfer
/// syntax.
///
pub const SMPTE_ST_2110_20_UNCOMPRESSED_INTERLACED_ACTIVE_VIDEO:
  TransferSyntax = encapsulated(
  "SMPTE ST 2110-20 Uncompressed Interlaced Active Video",
  "1.2.840.10008.1.2.7.2",
);

/// The 'SMPTE ST 2110-30 PCM Audio' transfer syntax.
///
pub const SMPTE_ST_2110_30_PCM_AUDIO: TransferSyntax = TransferSyntax {
  name: "SMPTE ST 2110-30 PCM Audio",
  uid: "1.2.840.10008.1.2.7.3",
  vr_serialization: VrSerialization::VrExplicit,
  endianness: Endianness::LittleEndian,
  is_deflated: false,
  is_encapsulated: false,
};

/// All supported transfer syntaxes, ordered by UID.
///
pub const ALL: [&TransferSyntax; 42] = [
  &IMPLICIT_VR_LITTLE_ENDIAN,
  &EXPLICIT_VR_LITTLE_ENDIAN,
  &ENCAPSULATED_UNCOMPRESSED_EXPLICIT_VR_LITTLE_ENDIAN,
  &DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN,
  &EXPLICIT_VR_BIG_ENDIAN,
  &JPEG_BASELINE_8BIT,
  &JPEG_EXTENDED_12BIT,
  &JPEG_LOSSLESS_NON_HIERARCHICAL,
  &JPEG_LOSSLESS_NON_HIERARCHICAL_SV1,
  &JPEG_LS_LOSSLESS,
  &JPEG_LS_LOSSY_NEAR_LOSSLESS,
  &JPEG_2K_LOSSLESS_ONLY,
  &JPEG_2K,
  &JPEG_2K_MULTI_COMPONENT_LOSSLESS_ONLY,
  &JPEG_2K_MULTI_COMPONENT,
  &JPIP_REFERENCED,
  &JPIP_REFERENCED_DEFLATE,
  &MPEG2_MAIN_PROFILE_MAIN_LEVEL,
  &FRAGMENTABLE_MPEG2_MAIN_PROFILE_MAIN_LEVEL,
  &MPEG2_MAIN_PROFILE_HIGH_LEVEL,
  &FRAGMENTABLE_MPEG2_MAIN_PROFILE_HIGH_LEVEL,
  &MPEG4_AVC_H264_HIGH_PROFILE,
  &FRAGMENTABLE_MPEG4_AVC_H264_HIGH_PROFILE,
  &MPEG4_AVC_H264_BD_COMPATIBLE_HIGH_PROFILE,
  &FRAGMENTABLE_MPEG4_AVC_H264_BD_COMPATIBLE_HIGH_PROFILE,
  &MPEG4_AVC_H264_HIGH_PROFILE_FOR_2D_VIDEO,
  &FRAGMENTABLE_MPEG4_AVC_H264_HIGH_PROFILE_FOR_2D_VIDEO,
  &MPEG4_AVC_H264_HIGH_PROFILE_FOR_3D_VIDEO,
  &FRAGMENTABLE_MPEG4_AVC_H264_HIGH_PROFILE_FOR_3D_VIDEO,
  &MPEG4_AVC_H264_STEREO_HIGH_PROFILE,
  &FRAGMENTABLE_MPEG4_AVC_H264_STEREO_HIGH_PROFILE,
  &HEVC_H265_MAIN_PROFILE,
  &HEVC_H265_MAIN_10_PROFILE,
  &HIGH_THROUGHPUT_JPEG_2K_LOSSLESS_ONLY,
  &HIGH_THROUGHPUT_JPEG_2K_WITH_RPCL_OPTIONS_LOSSLESS_ONLY,
  &HIGH_THROUGHPUT_JPEG_2K,
  &JPIP_HIGH_THROUGHPUT_JPEG_2K_REFERENCED,
  &JPIP_HIGH_THROUGHPUT_JPEG_2K_REFERENCED_DEFLATE,
  &RLE_LOSSLESS,
  &SMPTE_ST_2110_20_UNCOMPRESSED_PROGRESSIVE_ACTIVE_VIDEO,
  &SMPTE_ST_2110_20_UNCOMPRESSED_INTERLACED_ACTIVE_VIDEO,
  &SMPTE_ST_2110_30_PCM_AUDIO,
];

impl TransferSyntax {
  /// Returns the transfer syntax with the given UID, tolerating trailing NUL
  /// padding bytes on the UID as these are used to pad UIDs to even length in
  /// serialized form. If the UID isn't recognized then an error is returned.
  ///
  #[allow(clippy::result_unit_err)]
  pub fn from_uid(uid: &str) -> Result<&'static Self, ()> {
    let uid = uid.trim_end_matches('\0');

    ALL
      .iter()
      .find(|transfer_syntax| transfer_syntax.uid == uid)
      .copied()
      .ok_or(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn all_is_sorted_by_uid_test() {
    // UIDs compare correctly as dotted numeric strings only segment by
    // segment, so compare split representations
    let as_segments = |uid: &str| -> Vec<u32> {
      uid.split('.').map(|s| s.parse().unwrap()).collect()
    };

    for pair in ALL.windows(2) {
      assert!(as_segments(pair[0].uid) < as_segments(pair[1].uid));
    }
  }

  #[test]
  fn from_uid_test() {
    for transfer_syntax in ALL {
      assert_eq!(
        TransferSyntax::from_uid(transfer_syntax.uid),
        Ok(transfer_syntax)
      );
    }

    assert_eq!(
      TransferSyntax::from_uid("1.2.840.10008.1.2.1\0"),
      Ok(&EXPLICIT_VR_LITTLE_ENDIAN)
    );

    assert_eq!(TransferSyntax::from_uid("1.2.3.4"), Err(()));
  }

  #[test]
  fn properties_test() {
    assert!(DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN.is_deflated);
    assert!(EXPLICIT_VR_BIG_ENDIAN.endianness.is_big());
    assert!(JPEG_BASELINE_8BIT.is_encapsulated);
    assert_eq!(
      IMPLICIT_VR_LITTLE_ENDIAN.vr_serialization,
      VrSerialization::VrImplicit
    );
  }
}
