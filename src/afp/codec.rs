//! Sequential structured field reader and writer
//!
//! Framing: each field is one 0x5A carriage control byte followed by an
//! 8-byte introducer (2-byte big-endian length covering introducer plus
//! data, 3-byte field identifier, flag byte, 2-byte sequence number) and the
//! payload. The reader tracks its byte offset and keeps the raw bytes of the
//! last field read, so callers can record byte ranges and copy unmodified
//! fields through bit-exactly.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};

use super::StructuredField;

const CARRIAGE_CONTROL: u8 = 0x5A;
const INTRODUCER_LEN: usize = 8;

/// Positioned structured field reader
pub struct AfpReader<R> {
    inner: R,
    offset: u64,
    last: Vec<u8>,
}

impl AfpReader<BufReader<File>> {
    /// Open a file for buffered structured field reading
    pub fn open(path: &Path) -> Result<Self> {
        Ok(AfpReader::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: Read + Seek> AfpReader<R> {
    /// Wrap a stream positioned at offset 0
    pub fn new(inner: R) -> Self {
        AfpReader {
            inner,
            offset: 0,
            last: Vec::new(),
        }
    }

    /// Read the next structured field, or `None` at a clean end of stream.
    ///
    /// An end of stream inside a field surfaces as [`Error::Truncated`]; the
    /// format has no framing to resynchronize on.
    pub fn next_field(&mut self) -> Result<Option<StructuredField>> {
        let start = self.offset;

        let mut cc = [0u8; 1];
        if self.inner.read(&mut cc)? == 0 {
            return Ok(None);
        }
        if cc[0] != CARRIAGE_CONTROL {
            return Err(Error::BadCarriageControl(start));
        }

        let mut introducer = [0u8; INTRODUCER_LEN];
        self.read_exact(&mut introducer, start)?;

        let length = u16::from_be_bytes([introducer[0], introducer[1]]) as usize;
        if length < INTRODUCER_LEN {
            return Err(Error::Truncated(start));
        }
        let id = u32::from_be_bytes([0, introducer[2], introducer[3], introducer[4]]);
        let flags = introducer[5];
        let seqno = u16::from_be_bytes([introducer[6], introducer[7]]);

        let mut data = vec![0u8; length - INTRODUCER_LEN];
        self.read_exact(&mut data, start)?;

        self.last.clear();
        self.last.push(CARRIAGE_CONTROL);
        self.last.extend_from_slice(&introducer);
        self.last.extend_from_slice(&data);
        self.offset = start + 1 + length as u64;

        Ok(Some(StructuredField {
            id,
            flags,
            seqno,
            data,
        }))
    }

    /// Byte offset just past the last field or raw bytes read
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reposition the stream to an absolute byte offset
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        self.offset = pos;
        self.last.clear();
        Ok(())
    }

    /// Raw encoded bytes of the last field read
    pub fn last_raw(&self) -> &[u8] {
        &self.last
    }

    /// Read raw bytes at the current position, bypassing field framing
    pub fn read_raw(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.inner.read(buf)?;
        self.offset += n as u64;
        Ok(n)
    }

    fn read_exact(&mut self, buf: &mut [u8], field_start: u64) -> Result<()> {
        self.inner.read_exact(buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::Truncated(field_start)
            } else {
                Error::Io(e)
            }
        })
    }
}

/// Sequential structured field writer
pub struct AfpWriter<W: Write> {
    inner: W,
}

impl AfpWriter<BufWriter<File>> {
    /// Create or truncate a file for buffered structured field writing
    pub fn create(path: &Path) -> Result<Self> {
        Ok(AfpWriter::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> AfpWriter<W> {
    pub fn new(inner: W) -> Self {
        AfpWriter { inner }
    }

    /// Serialize one structured field
    pub fn write_field(&mut self, sf: &StructuredField) -> Result<()> {
        let length = INTRODUCER_LEN + sf.data.len();
        if length > u16::MAX as usize {
            return Err(Error::FieldTooLong(sf.data.len()));
        }
        let id = sf.id.to_be_bytes();
        let mut introducer = [0u8; 1 + INTRODUCER_LEN];
        introducer[0] = CARRIAGE_CONTROL;
        introducer[1..3].copy_from_slice(&(length as u16).to_be_bytes());
        introducer[3..6].copy_from_slice(&id[1..4]);
        introducer[6] = sf.flags;
        introducer[7..9].copy_from_slice(&sf.seqno.to_be_bytes());
        self.inner.write_all(&introducer)?;
        self.inner.write_all(&sf.data)?;
        Ok(())
    }

    /// Copy already-encoded bytes through unchanged
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::afp::sfid;
    use std::io::Cursor;

    fn encode(fields: &[StructuredField]) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut writer = AfpWriter::new(&mut buf);
        for sf in fields {
            writer.write_field(sf).unwrap();
        }
        buf
    }

    #[test]
    fn test_round_trip() {
        let fields = vec![
            StructuredField::new(sfid::BRG),
            StructuredField::with_data(sfid::NOP, vec![1, 2, 3, 4]),
            StructuredField::new(sfid::ERG),
        ];
        let bytes = encode(&fields);

        let mut reader = AfpReader::new(Cursor::new(bytes));
        let mut decoded = Vec::new();
        while let Some(sf) = reader.next_field().unwrap() {
            decoded.push(sf);
        }
        assert_eq!(decoded, fields);
    }

    #[test]
    fn test_offsets_and_last_raw() {
        let fields = vec![
            StructuredField::with_data(sfid::NOP, vec![0xAA; 3]),
            StructuredField::new(sfid::NOP),
        ];
        let bytes = encode(&fields);

        let mut reader = AfpReader::new(Cursor::new(bytes.clone()));
        reader.next_field().unwrap().unwrap();
        // 1 carriage control + 8 introducer + 3 data
        assert_eq!(reader.offset(), 12);
        assert_eq!(reader.last_raw(), &bytes[..12]);

        reader.next_field().unwrap().unwrap();
        assert_eq!(reader.offset(), bytes.len() as u64);
        assert_eq!(reader.last_raw(), &bytes[12..]);
    }

    #[test]
    fn test_seek_rereads_field() {
        let fields = vec![
            StructuredField::with_data(sfid::NOP, vec![7]),
            StructuredField::with_data(sfid::NOP, vec![8]),
        ];
        let bytes = encode(&fields);

        let mut reader = AfpReader::new(Cursor::new(bytes));
        reader.next_field().unwrap().unwrap();
        let second_start = reader.offset();
        reader.next_field().unwrap().unwrap();

        reader.seek(second_start).unwrap();
        let again = reader.next_field().unwrap().unwrap();
        assert_eq!(again.data, vec![8]);
    }

    #[test]
    fn test_truncated_field_is_an_error() {
        let bytes = encode(&[StructuredField::with_data(sfid::NOP, vec![0; 16])]);
        let mut reader = AfpReader::new(Cursor::new(&bytes[..10]));
        assert!(matches!(reader.next_field(), Err(Error::Truncated(0))));
    }

    #[test]
    fn test_missing_carriage_control_is_an_error() {
        let mut reader = AfpReader::new(Cursor::new(vec![0x00, 0x01, 0x02]));
        assert!(matches!(
            reader.next_field(),
            Err(Error::BadCarriageControl(0))
        ));
    }
}
