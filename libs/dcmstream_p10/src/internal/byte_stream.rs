use std::collections::VecDeque;

use dcmstream_core::RcByteSlice;

/// A byte stream that takes incoming chunks of binary data of any size and
/// lets the result be read and peeked as one contiguous stream of bytes.
///
/// Incoming bytes can optionally be passed through zlib inflate before being
/// made available for reading, which is used for deflated transfer syntaxes.
///
#[derive(Debug)]
pub struct ByteStream {
  chunks: VecDeque<RcByteSlice>,
  chunks_size: u64,
  bytes_read: u64,
  is_writing_finished: bool,
  zlib_stream: Option<flate2::Decompress>,
  zlib_input_queue: VecDeque<RcByteSlice>,
  zlib_inflate_complete: bool,
}

#[derive(Debug)]
pub enum ByteStreamError {
  /// The byte stream doesn't have the requested number of bytes available
  /// and needs more bytes written to it first.
  DataRequired,

  /// The read would go past the end of the byte stream.
  DataEnd,

  /// Data written to a byte stream with zlib inflate active wasn't valid
  /// zlib data.
  ZlibDataError,

  /// Data was written to the byte stream after its final bytes had already
  /// been written.
  WriteAfterCompletion,
}

/// Zlib data is inflated in chunks of at most this size so that memory usage
/// stays bounded in the presence of zlib bombs.
///
const ZLIB_INFLATE_CHUNK_SIZE: usize = 64 * 1024;

impl ByteStream {
  /// Creates a new empty byte stream.
  ///
  pub fn new() -> Self {
    Self {
      chunks: VecDeque::new(),
      chunks_size: 0,
      bytes_read: 0,
      is_writing_finished: false,
      zlib_stream: None,
      zlib_input_queue: VecDeque::new(),
      zlib_inflate_complete: false,
    }
  }

  /// Returns the total number of bytes successfully read out of this byte
  /// stream.
  ///
  pub fn bytes_read(&self) -> u64 {
    self.bytes_read
  }

  /// Returns whether the byte stream is fully consumed, i.e. no unread bytes
  /// remain and the final bytes have been written.
  ///
  pub fn is_fully_consumed(&self) -> bool {
    self.chunks_size == 0
      && self.is_writing_finished
      && (self.zlib_stream.is_none() || self.zlib_inflate_complete)
  }

  /// Writes bytes to the byte stream, making them available to subsequent
  /// calls to [`Self::read`]. If `done` is true then no further bytes can be
  /// written and the end of the stream is defined to be at the end of these
  /// bytes.
  ///
  pub fn write(
    &mut self,
    data: RcByteSlice,
    done: bool,
  ) -> Result<(), ByteStreamError> {
    if self.is_writing_finished {
      return Err(ByteStreamError::WriteAfterCompletion);
    }

    self.is_writing_finished = done;

    if data.is_empty() {
      return Ok(());
    }

    if self.zlib_stream.is_some() {
      self.zlib_input_queue.push_back(data);
    } else {
      self.chunks_size += data.len() as u64;
      self.chunks.push_back(data);
    }

    Ok(())
  }

  /// Reads and consumes bytes out of the byte stream.
  ///
  pub fn read(
    &mut self,
    byte_count: usize,
  ) -> Result<RcByteSlice, ByteStreamError> {
    if byte_count == 0 {
      return Ok(RcByteSlice::empty());
    }

    self.inflate_up_to_read_size(byte_count)?;

    if byte_count as u64 > self.chunks_size {
      if self.is_writing_finished {
        return Err(ByteStreamError::DataEnd);
      } else {
        return Err(ByteStreamError::DataRequired);
      }
    }

    self.chunks_size -= byte_count as u64;
    self.bytes_read += byte_count as u64;

    match byte_count.cmp(&self.chunks.front().unwrap().len()) {
      // When the read is served by the first chunk, return a slice into it
      // without copying
      core::cmp::Ordering::Less => {
        let result = self.chunks.front().unwrap().take(byte_count);

        let chunk = self.chunks.front_mut().unwrap();
        *chunk = chunk.drop(byte_count);

        Ok(result)
      }

      core::cmp::Ordering::Equal => Ok(self.chunks.pop_front().unwrap()),

      // The read spans multiple chunks, so a new buffer has to be allocated
      core::cmp::Ordering::Greater => {
        let mut result = Vec::with_capacity(byte_count);

        while result.len() < byte_count {
          let chunk = self.chunks.front_mut().unwrap();

          let end = core::cmp::min(chunk.len(), byte_count - result.len());
          result.extend_from_slice(&chunk[..end]);

          *chunk = chunk.drop(end);

          if chunk.is_empty() {
            self.chunks.pop_front();
          }
        }

        Ok(result.into())
      }
    }
  }

  /// Peeks at the next bytes of the byte stream without consuming them.
  ///
  pub fn peek(&mut self, byte_count: usize) -> Result<Vec<u8>, ByteStreamError> {
    if byte_count == 0 {
      return Ok(vec![]);
    }

    self.inflate_up_to_read_size(byte_count)?;

    if byte_count as u64 > self.chunks_size {
      if self.is_writing_finished {
        return Err(ByteStreamError::DataEnd);
      } else {
        return Err(ByteStreamError::DataRequired);
      }
    }

    let mut result = Vec::with_capacity(byte_count);

    for chunk in self.chunks.iter() {
      let end = core::cmp::min(chunk.len(), byte_count - result.len());
      result.extend_from_slice(&chunk[..end]);

      if result.len() >= byte_count {
        break;
      }
    }

    Ok(result)
  }

  /// Activates streaming zlib inflate on the byte stream. All currently
  /// unread bytes and all subsequently written bytes are passed through zlib
  /// decompression before being read out.
  ///
  pub fn start_zlib_inflate(&mut self) {
    self.zlib_stream = Some(flate2::Decompress::new(false));
    self.zlib_input_queue.append(&mut self.chunks);
    self.chunks_size = 0;
  }

  /// When zlib inflate is active, inflates pending input data until at least
  /// `read_size` bytes are available, or the input is exhausted. Data beyond
  /// the requested size stays compressed, keeping the stream's memory usage
  /// bounded regardless of the input's compression ratio.
  ///
  fn inflate_up_to_read_size(
    &mut self,
    read_size: usize,
  ) -> Result<(), ByteStreamError> {
    let zlib_stream = match self.zlib_stream.as_mut() {
      Some(zlib_stream) => zlib_stream,
      None => return Ok(()),
    };

    while self.chunks_size < read_size as u64 {
      let input = match self.zlib_input_queue.pop_front() {
        Some(input) => input,
        None => return Ok(()),
      };

      let initial_total_in = zlib_stream.total_in();
      let initial_total_out = zlib_stream.total_out();

      let mut output_buffer = vec![0u8; ZLIB_INFLATE_CHUNK_SIZE];

      match zlib_stream.decompress(
        &input,
        &mut output_buffer,
        flate2::FlushDecompress::None,
      ) {
        Ok(status) => {
          let bytes_consumed = zlib_stream.total_in() - initial_total_in;
          let bytes_produced = zlib_stream.total_out() - initial_total_out;

          // Keep unconsumed input bytes for the next decompression call
          if bytes_consumed < input.len() as u64 {
            self
              .zlib_input_queue
              .push_front(input.drop(bytes_consumed as usize));
          }

          if bytes_produced > 0 {
            output_buffer.resize(bytes_produced as usize, 0);
            self.chunks.push_back(output_buffer.into());
            self.chunks_size += bytes_produced;
          }

          // Exhaustion of the zlib stream after the final deflated bytes have
          // been written is required for the byte stream to be considered
          // fully consumed
          if status == flate2::Status::StreamEnd {
            self.zlib_inflate_complete = true;
            return Ok(());
          }

          if bytes_produced == 0 {
            break;
          }
        }

        Err(_) => return Err(ByteStreamError::ZlibDataError),
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn read_and_peek_test() {
    let mut stream = ByteStream::new();

    stream.write(vec![0, 1, 2].into(), false).unwrap();
    stream.write(vec![3, 4, 5, 6].into(), false).unwrap();

    assert_eq!(stream.peek(2).unwrap(), vec![0, 1]);
    assert_eq!(*stream.read(2).unwrap(), [0, 1]);
    assert_eq!(stream.bytes_read(), 2);

    // Read spanning two chunks
    assert_eq!(*stream.read(3).unwrap(), [2, 3, 4]);

    assert!(matches!(stream.read(3), Err(ByteStreamError::DataRequired)));

    stream.write(vec![7].into(), true).unwrap();
    assert_eq!(*stream.read(3).unwrap(), [5, 6, 7]);

    assert!(matches!(stream.read(1), Err(ByteStreamError::DataEnd)));
    assert!(stream.is_fully_consumed());
  }

  #[test]
  fn write_after_completion_test() {
    let mut stream = ByteStream::new();

    stream.write(vec![0].into(), true).unwrap();

    assert!(matches!(
      stream.write(vec![1].into(), false),
      Err(ByteStreamError::WriteAfterCompletion)
    ));
  }

  #[test]
  fn zlib_inflate_test() {
    // Deflate some test data using a raw deflate stream
    let data = b"Hello, zlib streaming world".repeat(100);
    let mut compressor =
      flate2::Compress::new(flate2::Compression::new(6), false);
    let mut compressed = Vec::with_capacity(data.len());
    compressor
      .compress_vec(&data, &mut compressed, flate2::FlushCompress::Finish)
      .unwrap();

    let mut stream = ByteStream::new();
    stream.start_zlib_inflate();

    // Write the deflated data in two halves
    let half = compressed.len() / 2;
    stream.write(compressed[..half].to_vec().into(), false).unwrap();
    stream.write(compressed[half..].to_vec().into(), true).unwrap();

    let inflated = stream.read(data.len()).unwrap();
    assert_eq!(*inflated, *data);
    assert!(stream.is_fully_consumed());
  }
}
