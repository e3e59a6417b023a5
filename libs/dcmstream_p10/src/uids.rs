//! Defines the implementation details that are written into the File Meta
//! Information of serialized DICOM P10 data.

/// The implementation class UID included in the File Meta Information header
/// of DICOM P10 data serialized by this library, unless overridden by the
/// write config.
///
pub const IMPLEMENTATION_CLASS_UID: &str = "1.2.826.0.1.3680043.10.1891.1";

/// The implementation version name included in the File Meta Information
/// header of DICOM P10 data serialized by this library, unless overridden by
/// the write config.
///
pub static IMPLEMENTATION_VERSION_NAME: std::sync::LazyLock<String> =
  std::sync::LazyLock::new(|| {
    format!("DCMSTREAM {}", env!("CARGO_PKG_VERSION"))
  });
