//! Chunked transfer of large binary and character values.
//!
//! Values move through the positional primitives one bounded chunk at a
//! time: read up to a chunk from the source, write it at the running
//! offset, stop when a read returns nothing (or the column's max length is
//! reached), then fix the final length.
//!
//! [`BlobReader`] and [`CharReader`] expose a single ordinal as a stream.
//! They hold the getters mutably, so no other ordinal of the row can be
//! touched until the stream is dropped.

use std::io;

use tracing::trace;

use crate::error::{Error, Result};
use crate::options::MarshalOptions;
use crate::protocol::accessor::throw_if_invalid_setter_access;
use crate::protocol::compat::can_access_getter_directly;
use crate::protocol::getter_setter::{ValueGetters, ValueSetters};
use crate::protocol::structured::RowReader;
use crate::protocol::types::{ColumnMetadata, ValueKind, WireType};

/// A source of UTF-16 code units.
pub trait CharRead {
    /// Fill `buffer` with up to `buffer.len()` units, returning how many
    /// were read. Zero means the source is exhausted.
    fn read_chars(&mut self, buffer: &mut [u16]) -> io::Result<usize>;
}

impl<I: Iterator<Item = u16>> CharRead for I {
    fn read_chars(&mut self, buffer: &mut [u16]) -> io::Result<usize> {
        let mut count = 0;
        for slot in buffer.iter_mut() {
            match self.next() {
                Some(unit) => {
                    *slot = unit;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

/// Core copy loop. `max_length <= 0` means no limit.
fn copy_chunks<T, R, W>(
    max_length: i64,
    chunk_size: usize,
    mut read: R,
    mut write: W,
) -> Result<i64>
where
    T: Copy + Default,
    R: FnMut(i64, &mut [T]) -> Result<usize>,
    W: FnMut(i64, &[T]) -> Result<usize>,
{
    let mut buffer = vec![T::default(); chunk_size.max(1)];
    let mut offset = 0i64;
    loop {
        let mut size = buffer.len();
        if max_length > 0 {
            let left = max_length - offset;
            if left <= 0 {
                break;
            }
            size = size.min(left as usize);
        }
        let read = read(offset, &mut buffer[..size])?;
        if read == 0 {
            break;
        }
        let written = write(offset, &buffer[..read])?;
        trace!(offset, read, written, "copied chunk");
        if written == 0 {
            break;
        }
        offset += written as i64;
    }
    Ok(offset)
}

fn ensure_stream_setter(meta: &ColumnMetadata, kind: ValueKind) -> Result<()> {
    if meta.wire_type() == WireType::Variant {
        return Err(Error::invalid_cast(format!(
            "cannot stream a {} value into variant column '{}'",
            kind,
            meta.name()
        )));
    }
    throw_if_invalid_setter_access(meta, kind)
}

pub(crate) fn write_bytes_from_reader<S, R>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    reader: &mut R,
    options: &MarshalOptions,
) -> Result<i64>
where
    S: ValueSetters + ?Sized,
    R: io::Read + ?Sized,
{
    options.validate()?;
    let written = copy_chunks::<u8, _, _>(
        meta.max_length(),
        options.byte_chunk_size,
        |_, buffer| Ok(reader.read(buffer)?),
        |offset, chunk| setters.set_bytes(ordinal, offset, chunk),
    )?;
    setters.set_bytes_length(ordinal, written)?;
    Ok(written)
}

/// Stream bytes from `reader` into a binary column, returning the final length.
///
/// Reading stops at the column's max length.
pub fn set_bytes_from_reader<S, R>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    reader: &mut R,
    options: &MarshalOptions,
) -> Result<i64>
where
    S: ValueSetters + ?Sized,
    R: io::Read + ?Sized,
{
    ensure_stream_setter(meta, ValueKind::ByteArray)?;
    write_bytes_from_reader(setters, ordinal, meta, reader, options)
}

/// Stream UTF-16 units from `reader` into a character column, returning
/// the final length.
pub fn set_chars_from_reader<S, R>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    reader: &mut R,
    options: &MarshalOptions,
) -> Result<i64>
where
    S: ValueSetters + ?Sized,
    R: CharRead + ?Sized,
{
    ensure_stream_setter(meta, ValueKind::CharArray)?;
    options.validate()?;
    let written = copy_chunks::<u16, _, _>(
        meta.max_length(),
        options.char_chunk_size,
        |_, buffer| Ok(reader.read_chars(buffer)?),
        |offset, chunk| setters.set_chars(ordinal, offset, chunk),
    )?;
    setters.set_chars_length(ordinal, written)?;
    Ok(written)
}

/// Copy a binary field of the reader's current row in chunks.
pub(crate) fn copy_bytes_from_row<S, R>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    reader: &mut R,
    source_ordinal: usize,
    options: &MarshalOptions,
) -> Result<i64>
where
    S: ValueSetters + ?Sized,
    R: RowReader + ?Sized,
{
    options.validate()?;
    let written = copy_chunks::<u8, _, _>(
        meta.max_length(),
        options.byte_chunk_size,
        |offset, buffer| reader.get_bytes(source_ordinal, offset, buffer),
        |offset, chunk| setters.set_bytes(ordinal, offset, chunk),
    )?;
    setters.set_bytes_length(ordinal, written)?;
    Ok(written)
}

/// Copy a character field of the reader's current row in chunks.
pub(crate) fn copy_chars_from_row<S, R>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    reader: &mut R,
    source_ordinal: usize,
    options: &MarshalOptions,
) -> Result<i64>
where
    S: ValueSetters + ?Sized,
    R: RowReader + ?Sized,
{
    options.validate()?;
    let written = copy_chunks::<u16, _, _>(
        meta.max_length(),
        options.char_chunk_size,
        |offset, buffer| reader.get_chars(source_ordinal, offset, buffer),
        |offset, chunk| setters.set_chars(ordinal, offset, chunk),
    )?;
    setters.set_chars_length(ordinal, written)?;
    Ok(written)
}

/// Read a whole binary value chunk by chunk.
pub fn drain_bytes<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    options: &MarshalOptions,
) -> Result<Vec<u8>> {
    options.validate()?;
    let hint = getters.get_bytes_length(ordinal)?;
    let mut out = Vec::with_capacity(hint.clamp(0, options.byte_chunk_size as i64) as usize);
    copy_chunks::<u8, _, _>(
        -1,
        options.byte_chunk_size,
        |offset, buffer| getters.get_bytes(ordinal, offset, buffer),
        |_, chunk| {
            out.extend_from_slice(chunk);
            Ok(chunk.len())
        },
    )?;
    Ok(out)
}

/// Read a whole character value chunk by chunk.
pub fn drain_chars<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    options: &MarshalOptions,
) -> Result<Vec<u16>> {
    options.validate()?;
    let hint = getters.get_chars_length(ordinal)?;
    let mut out = Vec::with_capacity(hint.clamp(0, options.char_chunk_size as i64) as usize);
    copy_chunks::<u16, _, _>(
        -1,
        options.char_chunk_size,
        |offset, buffer| getters.get_chars(ordinal, offset, buffer),
        |_, chunk| {
            out.extend_from_slice(chunk);
            Ok(chunk.len())
        },
    )?;
    Ok(out)
}

fn open_stream<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
    kind: ValueKind,
) -> Result<()> {
    if !can_access_getter_directly(meta, kind) {
        return Err(Error::invalid_cast(format!(
            "column '{}' of type {} cannot be read as a {}",
            meta.name(),
            meta.wire_type(),
            kind
        )));
    }
    if getters.is_null(ordinal)? {
        return Err(Error::NullValue { ordinal });
    }
    Ok(())
}

/// Streaming read of one binary ordinal.
pub struct BlobReader<'a, G: ValueGetters + ?Sized> {
    getters: &'a mut G,
    ordinal: usize,
    position: i64,
    chunk_size: usize,
}

impl<'a, G: ValueGetters + ?Sized> BlobReader<'a, G> {
    /// Open a stream over `ordinal`. Fails on null or on a column that
    /// cannot be streamed as bytes.
    pub fn open(
        getters: &'a mut G,
        ordinal: usize,
        meta: &ColumnMetadata,
        options: &MarshalOptions,
    ) -> Result<Self> {
        options.validate()?;
        open_stream(getters, ordinal, meta, ValueKind::ByteStream)?;
        Ok(Self {
            getters,
            ordinal,
            position: 0,
            chunk_size: options.byte_chunk_size,
        })
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Total length of the value, or -1 if unknown.
    pub fn total_length(&mut self) -> Result<i64> {
        self.getters.get_bytes_length(self.ordinal)
    }
}

impl<G: ValueGetters + ?Sized> io::Read for BlobReader<'_, G> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let size = buf.len().min(self.chunk_size);
        if size == 0 {
            return Ok(0);
        }
        let read = self
            .getters
            .get_bytes(self.ordinal, self.position, &mut buf[..size])
            .map_err(io::Error::other)?;
        self.position += read as i64;
        Ok(read)
    }
}

/// Streaming read of one character ordinal.
pub struct CharReader<'a, G: ValueGetters + ?Sized> {
    getters: &'a mut G,
    ordinal: usize,
    position: i64,
    chunk_size: usize,
}

impl<'a, G: ValueGetters + ?Sized> CharReader<'a, G> {
    pub fn open(
        getters: &'a mut G,
        ordinal: usize,
        meta: &ColumnMetadata,
        options: &MarshalOptions,
    ) -> Result<Self> {
        options.validate()?;
        open_stream(getters, ordinal, meta, ValueKind::TextStream)?;
        Ok(Self {
            getters,
            ordinal,
            position: 0,
            chunk_size: options.char_chunk_size,
        })
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    /// Read the rest of the stream into a string.
    pub fn read_to_string(&mut self) -> Result<String> {
        let mut units = Vec::new();
        let mut buffer = vec![0u16; self.chunk_size.max(1)];
        loop {
            let read = self.read_chars(&mut buffer)?;
            if read == 0 {
                break;
            }
            units.extend_from_slice(&buffer[..read]);
        }
        Ok(String::from_utf16_lossy(&units))
    }
}

impl<G: ValueGetters + ?Sized> CharRead for CharReader<'_, G> {
    fn read_chars(&mut self, buffer: &mut [u16]) -> io::Result<usize> {
        let size = buffer.len().min(self.chunk_size);
        if size == 0 {
            return Ok(0);
        }
        let read = self
            .getters
            .get_chars(self.ordinal, self.position, &mut buffer[..size])
            .map_err(io::Error::other)?;
        self.position += read as i64;
        Ok(read)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::protocol::accessor;
    use crate::protocol::record_buffer::RecordBuffer;

    fn blob_row(data: &[u8]) -> (RecordBuffer, ColumnMetadata) {
        let meta = ColumnMetadata::new_sized("b", WireType::VarBinary, -1).unwrap();
        let mut row = RecordBuffer::new(vec![meta.clone()]);
        accessor::set_byte_array(&mut row, 0, &meta, data).unwrap();
        (row, meta)
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_chunked_drain_matches_single_read() {
        let options = MarshalOptions::new().with_byte_chunk_size(16);
        for len in [0usize, 1, 16, 17, 16 * 5 + 3] {
            let data = pattern(len);
            let (mut row, meta) = blob_row(&data);

            let chunked = drain_bytes(&mut row, 0, &options).unwrap();

            let mut single = vec![0u8; len];
            let read =
                accessor::get_bytes(&mut row, 0, &meta, 0, Some(&mut single), 0, len as i64, true)
                    .unwrap();
            assert_eq!(read, len as i64);
            assert_eq!(chunked, single, "length {}", len);
        }
    }

    #[test]
    fn test_blob_reader_streams_in_chunks() {
        let options = MarshalOptions::new().with_byte_chunk_size(7);
        let data = pattern(50);
        let (mut row, meta) = blob_row(&data);

        let mut reader = BlobReader::open(&mut row, 0, &meta, &options).unwrap();
        assert_eq!(reader.total_length().unwrap(), 50);
        let mut buf = [0u8; 32];
        assert_eq!(reader.read(&mut buf).unwrap(), 7);

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(reader.position(), 50);
        assert_eq!(&data[7..], &rest[..]);
    }

    #[test]
    fn test_blob_reader_rejects_null_and_char_columns() {
        let meta = ColumnMetadata::new_sized("b", WireType::VarBinary, 10).unwrap();
        let mut row = RecordBuffer::new(vec![meta.clone()]);
        assert!(matches!(
            BlobReader::open(&mut row, 0, &meta, &MarshalOptions::default()),
            Err(Error::NullValue { .. })
        ));

        let chars = ColumnMetadata::new_sized("c", WireType::NVarChar, 10).unwrap();
        assert!(matches!(
            BlobReader::open(&mut row, 0, &chars, &MarshalOptions::default()),
            Err(Error::InvalidCast { .. })
        ));
    }

    #[test]
    fn test_set_bytes_from_reader_chunks_and_stops_at_max() {
        let options = MarshalOptions::new().with_byte_chunk_size(3);
        let meta = ColumnMetadata::new_sized("b", WireType::VarBinary, 8).unwrap();
        let mut row = RecordBuffer::new(vec![meta.clone()]);
        let data = pattern(20);
        let written =
            set_bytes_from_reader(&mut row, 0, &meta, &mut data.as_slice(), &options).unwrap();
        assert_eq!(written, 8);
        assert_eq!(accessor::get_byte_array(&mut row, 0, &meta).unwrap(), &data[..8]);
    }

    #[test]
    fn test_chunk_size_past_wire_maximum_rejected() {
        let options = MarshalOptions::new().with_byte_chunk_size(1_000_000);
        let meta = ColumnMetadata::new_sized("b", WireType::VarBinary, -1).unwrap();
        let mut row = RecordBuffer::new(vec![meta.clone()]);
        let data = pattern(20_000);
        match set_bytes_from_reader(&mut row, 0, &meta, &mut data.as_slice(), &options) {
            Err(Error::InvalidArgument { argument, .. }) => assert_eq!(argument, "byte_chunk_size"),
            _ => panic!("Expected InvalidArgument error"),
        }
        assert!(row.value(0).map(|v| v.is_null()).unwrap_or(false));

        let (mut row, meta) = blob_row(&data);
        assert!(matches!(
            BlobReader::open(&mut row, 0, &meta, &options),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(drain_bytes(&mut row, 0, &options), Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn test_set_bytes_from_empty_reader() {
        let meta = ColumnMetadata::new_sized("b", WireType::VarBinary, -1).unwrap();
        let mut row = RecordBuffer::new(vec![meta.clone()]);
        let written =
            set_bytes_from_reader(&mut row, 0, &meta, &mut io::empty(), &MarshalOptions::default())
                .unwrap();
        assert_eq!(written, 0);
        assert!(accessor::get_byte_array(&mut row, 0, &meta).unwrap().is_empty());
    }

    #[test]
    fn test_stream_into_variant_rejected() {
        let meta = ColumnMetadata::new("v", WireType::Variant).unwrap();
        let mut row = RecordBuffer::new(vec![meta.clone()]);
        assert!(matches!(
            set_bytes_from_reader(&mut row, 0, &meta, &mut io::empty(), &MarshalOptions::default()),
            Err(Error::InvalidCast { .. })
        ));
    }

    #[test]
    fn test_chars_from_iterator_and_back() {
        let options = MarshalOptions::new().with_char_chunk_size(4);
        let meta = ColumnMetadata::new_sized("c", WireType::NVarChar, -1).unwrap();
        let mut row = RecordBuffer::new(vec![meta.clone()]);
        let text = "streamed through small chunks";
        let mut source = text.encode_utf16();
        let written = set_chars_from_reader(&mut row, 0, &meta, &mut source, &options).unwrap();
        assert_eq!(written, text.len() as i64);

        let mut reader = CharReader::open(&mut row, 0, &meta, &options).unwrap();
        assert_eq!(reader.read_to_string().unwrap(), text);
    }
}
