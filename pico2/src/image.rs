//! Flash image format for the configuration store.
//!
//! The committed contents of a [`MemoryStore`] are written as one image per
//! flash sector. Two sectors alternate; the valid image with the newer
//! sequence number wins at mount, so a reset mid-write falls back to the
//! previous image.
//!
//! ```text
//! 0   magic "EDKV"
//! 4   version (u8), reserved (u8), entry count (u16 LE)
//! 8   sequence (u32 LE)
//! 12  payload length (u32 LE)
//! 16  CRC-32 of the payload (u32 LE)
//! 20  payload: entries back to back
//!
//! entry: tag (u8) | ns len (u8) | ns | key len (u8) | key | value
//! value: U32, F32 = 4 bytes LE; Bool = 1 byte; Str = len (u8) | bytes
//! ```

use crc::{CRC_32_ISO_HDLC, Crc};
use ecu_dash_common::config::{MAX_KEY_LEN, MAX_STR_LEN, MemoryStore, StoredValue};
use heapless::String;

pub const MAGIC: [u8; 4] = *b"EDKV";
pub const VERSION: u8 = 1;
pub const HEADER_LEN: usize = 20;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

const TAG_U32: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_F32: u8 = 2;
const TAG_STR: u8 = 3;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum ImageError {
    /// Erased or foreign sector.
    BadMagic,
    UnsupportedVersion(u8),
    /// Payload does not match its checksum.
    Corrupt,
    /// Entry runs past the payload or carries an unknown tag.
    Malformed,
    /// Encoded image does not fit the sector.
    TooLarge,
    /// More entries than the store holds.
    StoreFull,
}

/// Header fields of a valid image.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Header {
    pub sequence: u32,
    pub count: u16,
    pub payload_len: u32,
    pub crc: u32,
}

/// Whether sequence `a` was written after `b`, allowing for wrap-around.
#[inline]
pub const fn is_newer(
    a: u32,
    b: u32,
) -> bool {
    (a.wrapping_sub(b) as i32) > 0
}

/// Index of the newer of two optional image sequences.
pub fn newest(slots: [Option<u32>; 2]) -> Option<usize> {
    match slots {
        [Some(a), Some(b)] => Some(if is_newer(b, a) { 1 } else { 0 }),
        [Some(_), None] => Some(0),
        [None, Some(_)] => Some(1),
        [None, None] => None,
    }
}

fn read_u16(bytes: &[u8]) -> u16 { u16::from_le_bytes([bytes[0], bytes[1]]) }

fn read_u32(bytes: &[u8]) -> u32 { u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) }

/// Parse and check the header, including the payload checksum.
pub fn read_header(bytes: &[u8]) -> Result<Header, ImageError> {
    if bytes.len() < HEADER_LEN || bytes[0..4] != MAGIC {
        return Err(ImageError::BadMagic);
    }
    if bytes[4] != VERSION {
        return Err(ImageError::UnsupportedVersion(bytes[4]));
    }
    let header = Header {
        count: read_u16(&bytes[6..8]),
        sequence: read_u32(&bytes[8..12]),
        payload_len: read_u32(&bytes[12..16]),
        crc: read_u32(&bytes[16..20]),
    };
    let payload = bytes
        .get(HEADER_LEN..HEADER_LEN + header.payload_len as usize)
        .ok_or(ImageError::Corrupt)?;
    if CRC32.checksum(payload) != header.crc {
        return Err(ImageError::Corrupt);
    }
    Ok(header)
}

// =============================================================================
// Encoding
// =============================================================================

struct Writer<'a> {
    out: &'a mut [u8],
    pos: usize,
}

impl Writer<'_> {
    fn bytes(
        &mut self,
        data: &[u8],
    ) -> Result<(), ImageError> {
        let end = self.pos + data.len();
        self.out.get_mut(self.pos..end).ok_or(ImageError::TooLarge)?.copy_from_slice(data);
        self.pos = end;
        Ok(())
    }

    fn short(
        &mut self,
        data: &[u8],
    ) -> Result<(), ImageError> {
        self.bytes(&[data.len() as u8])?;
        self.bytes(data)
    }
}

/// Write the committed contents of `store` into `out`. Returns the image
/// length.
pub fn encode<const N: usize>(
    store: &MemoryStore<N>,
    sequence: u32,
    out: &mut [u8],
) -> Result<usize, ImageError> {
    if out.len() < HEADER_LEN {
        return Err(ImageError::TooLarge);
    }
    let mut w = Writer {
        out,
        pos: HEADER_LEN,
    };
    let mut count: u16 = 0;
    for (namespace, key, value) in store.all_entries() {
        let tag = match value {
            StoredValue::U32(_) => TAG_U32,
            StoredValue::Bool(_) => TAG_BOOL,
            StoredValue::F32(_) => TAG_F32,
            StoredValue::Str(_) => TAG_STR,
        };
        w.bytes(&[tag])?;
        w.short(namespace.as_bytes())?;
        w.short(key.as_bytes())?;
        match value {
            StoredValue::U32(v) => w.bytes(&v.to_le_bytes())?,
            StoredValue::Bool(v) => w.bytes(&[u8::from(*v)])?,
            StoredValue::F32(v) => w.bytes(&v.to_le_bytes())?,
            StoredValue::Str(s) => w.short(s.as_bytes())?,
        }
        count += 1;
    }

    let len = w.pos;
    let payload_len = (len - HEADER_LEN) as u32;
    let crc = CRC32.checksum(&w.out[HEADER_LEN..len]);
    let header = &mut w.out[..HEADER_LEN];
    header[0..4].copy_from_slice(&MAGIC);
    header[4] = VERSION;
    header[5] = 0;
    header[6..8].copy_from_slice(&count.to_le_bytes());
    header[8..12].copy_from_slice(&sequence.to_le_bytes());
    header[12..16].copy_from_slice(&payload_len.to_le_bytes());
    header[16..20].copy_from_slice(&crc.to_le_bytes());
    Ok(len)
}

// =============================================================================
// Decoding
// =============================================================================

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(
        &mut self,
        n: usize,
    ) -> Result<&'a [u8], ImageError> {
        let slice = self.data.get(self.pos..self.pos + n).ok_or(ImageError::Malformed)?;
        self.pos += n;
        Ok(slice)
    }

    fn short(&mut self) -> Result<&'a [u8], ImageError> {
        let len = self.take(1)?[0] as usize;
        self.take(len)
    }

    fn text<const L: usize>(&mut self) -> Result<String<L>, ImageError> {
        let raw = core::str::from_utf8(self.short()?).map_err(|_| ImageError::Malformed)?;
        String::try_from(raw).map_err(|_| ImageError::Malformed)
    }
}

/// Rebuild a store from a checked image.
pub fn decode<const N: usize>(bytes: &[u8]) -> Result<(MemoryStore<N>, Header), ImageError> {
    let header = read_header(bytes)?;
    let mut r = Reader {
        data: &bytes[HEADER_LEN..HEADER_LEN + header.payload_len as usize],
        pos: 0,
    };
    let mut store = MemoryStore::new();
    for _ in 0..header.count {
        let tag = r.take(1)?[0];
        let namespace: String<MAX_KEY_LEN> = r.text()?;
        let key: String<MAX_KEY_LEN> = r.text()?;
        let value = match tag {
            TAG_U32 => StoredValue::U32(read_u32(r.take(4)?)),
            TAG_BOOL => StoredValue::Bool(r.take(1)?[0] != 0),
            TAG_F32 => StoredValue::F32(f32::from_bits(read_u32(r.take(4)?))),
            TAG_STR => StoredValue::Str(r.text::<MAX_STR_LEN>()?),
            _ => return Err(ImageError::Malformed),
        };
        store.restore(&namespace, &key, value).map_err(|_| ImageError::StoreFull)?;
    }
    Ok((store, header))
}

/// Whether a session `end()` on `store` left it with unsaved commits.
pub fn has_new_commits<const N: usize>(
    store: &MemoryStore<N>,
    persisted_commits: u32,
) -> bool {
    store.commit_count() != persisted_commits
}

// =============================================================================
// Unit Tests
// =============================================================================
