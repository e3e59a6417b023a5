//! dcmstream is a collection of libraries and a CLI tool for working with
//! DICOM Part 10 data, the binary container used throughout medical imaging
//! to persist studies and transmit them between devices.

/// Core DICOM concepts: data element tags, value representations, data
/// element values, data sets, data set paths, transfer syntaxes, and the
/// data element dictionary.
///
/// This module is a re-export of the `dcmstream_core` crate.
///
pub mod core {
  pub use dcmstream_core::*;
}

/// Decodes DICOM string data that uses a Specific Character Set into native
/// UTF-8 strings.
///
/// This module is a re-export of the `dcmstream_charset` crate.
///
pub mod charset {
  pub use dcmstream_charset::*;
}

/// Reads and writes the DICOM Part 10 (P10) binary format used to store and
/// transmit DICOM-based medical imaging information.
///
/// This module is a re-export of the `dcmstream_p10` crate.
///
pub mod p10 {
  pub use dcmstream_p10::*;
}

/// Extracts frames of pixel data from streams of DICOM P10 tokens.
///
/// This module is a re-export of the `dcmstream_pixel_data` crate.
///
pub mod pixel_data {
  pub use dcmstream_pixel_data::*;
}

#[cfg(test)]
mod integration_tests;
