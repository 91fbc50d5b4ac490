//! Drill-map file format.
//!
//! Layout: a fixed uncompressed header (`DeepDrill` magic, version triple,
//! width and height as little-endian i64) followed by one zlib-compressed
//! blob. The inflated blob is a sequence of channel records, each a channel
//! id byte, a format byte and `width · height` encoded samples. Complex
//! channels store `re` then `im` per sample.

use super::{DrillMap, MapEntry};
use crate::error::{Error, Result};
use crate::options::{MAX_MAP_HEIGHT, MAX_MAP_WIDTH};
use crate::progress;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

pub const MAGIC: &[u8; 9] = b"DeepDrill";

pub const VER_MAJOR: u8 = 1;
pub const VER_MINOR: u8 = 0;
pub const VER_BETA: u8 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelId {
    Iterations = 0,
    LogNorms = 1,
    Derivatives = 2,
    Normals = 3,
}

impl ChannelId {
    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Iterations),
            1 => Ok(Self::LogNorms),
            2 => Ok(Self::Derivatives),
            3 => Ok(Self::Normals),
            other => Err(Error::InvalidChannelId(other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelFormat {
    I16 = 0,
    I24 = 1,
    I32 = 2,
    /// Fixed point: `i16 / i16::MAX`.
    Fp16 = 3,
    Float = 4,
    Double = 5,
}

impl ChannelFormat {
    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::I16),
            1 => Ok(Self::I24),
            2 => Ok(Self::I32),
            3 => Ok(Self::Fp16),
            4 => Ok(Self::Float),
            5 => Ok(Self::Double),
            other => Err(Error::Format(format!("invalid data format: {}", other))),
        }
    }
}

/// Byte cursor over the (un)compressed payload.
struct Cursor {
    buffer: Vec<u8>,
    ptr: usize,
}

impl Cursor {
    fn new() -> Self {
        Self {
            buffer: Vec::new(),
            ptr: 0,
        }
    }

    fn eof(&self) -> bool {
        self.ptr == self.buffer.len()
    }

    fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    fn write_i16(&mut self, value: i16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn write_i24(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes()[..3]);
    }

    fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn write_f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn write_f64(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        if self.ptr + n > self.buffer.len() {
            return Err(Error::Format("unexpected end of map data".into()));
        }
        let slice = &self.buffer[self.ptr..self.ptr + n];
        self.ptr += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn read_i24(&mut self) -> Result<i32> {
        let b = self.take(3)?;
        // Sign-extend the 24-bit two's complement value.
        let raw = (b[0] as i32) | (b[1] as i32) << 8 | (b[2] as i32) << 16;
        Ok(raw << 8 >> 8)
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn compress(&self) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&self.buffer)?;
        Ok(encoder.finish()?)
    }

    fn from_compressed(bytes: &[u8], capacity: usize) -> Result<Self> {
        let mut buffer = Vec::with_capacity(capacity);
        ZlibDecoder::new(bytes).read_to_end(&mut buffer)?;
        Ok(Self { buffer, ptr: 0 })
    }
}

fn write_integer(cursor: &mut Cursor, fmt: ChannelFormat, value: i32) -> Result<()> {
    match fmt {
        ChannelFormat::I16 => cursor.write_i16(value as i16),
        ChannelFormat::I24 => cursor.write_i24(value),
        ChannelFormat::I32 => cursor.write_i32(value),
        _ => return Err(Error::Format("invalid data format".into())),
    }
    Ok(())
}

fn read_integer(cursor: &mut Cursor, fmt: ChannelFormat) -> Result<i32> {
    match fmt {
        ChannelFormat::I16 => Ok(cursor.read_i16()? as i32),
        ChannelFormat::I24 => cursor.read_i24(),
        ChannelFormat::I32 => cursor.read_i32(),
        _ => Err(Error::Format("invalid data format".into())),
    }
}

fn write_scalar(cursor: &mut Cursor, fmt: ChannelFormat, value: f64) -> Result<()> {
    match fmt {
        ChannelFormat::Fp16 => {
            let fixed = (value * i16::MAX as f64).round();
            cursor.write_i16(fixed.clamp(i16::MIN as f64, i16::MAX as f64) as i16);
        }
        ChannelFormat::Float => cursor.write_f32(value as f32),
        ChannelFormat::Double => cursor.write_f64(value),
        _ => return Err(Error::Format("invalid data format".into())),
    }
    Ok(())
}

fn read_scalar(cursor: &mut Cursor, fmt: ChannelFormat) -> Result<f64> {
    match fmt {
        ChannelFormat::Fp16 => Ok(cursor.read_i16()? as f64 / i16::MAX as f64),
        ChannelFormat::Float => Ok(cursor.read_f32()? as f64),
        ChannelFormat::Double => cursor.read_f64(),
        _ => Err(Error::Format("invalid data format".into())),
    }
}

impl DrillMap {
    /// Write the map with the default channel set: iteration counts (i32),
    /// lognorms (float32) and normal vectors (fp16).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_channels(
            path,
            &[
                (ChannelId::Iterations, ChannelFormat::I32),
                (ChannelId::LogNorms, ChannelFormat::Float),
                (ChannelId::Normals, ChannelFormat::Fp16),
            ],
        )
    }

    /// Write the map with an explicit channel selection.
    pub fn save_channels<P: AsRef<Path>>(
        &self,
        path: P,
        channels: &[(ChannelId, ChannelFormat)],
    ) -> Result<()> {
        let bar = progress::phase("Saving map file", channels.len() as u64);

        let mut file = File::create(path.as_ref())?;

        // Header
        file.write_all(MAGIC)?;
        file.write_all(&[VER_MAJOR, VER_MINOR, VER_BETA])?;
        file.write_all(&(self.width as i64).to_le_bytes())?;
        file.write_all(&(self.height as i64).to_le_bytes())?;

        // Channel records
        let mut cursor = Cursor::new();
        for &(id, fmt) in channels {
            self.save_channel(&mut cursor, id, fmt)?;
            bar.inc(1);
        }

        file.write_all(&cursor.compress()?)?;
        bar.finish_and_clear();

        debug!(
            path = %path.as_ref().display(),
            width = self.width,
            height = self.height,
            channels = channels.len(),
            "map file written"
        );
        Ok(())
    }

    fn save_channel(&self, cursor: &mut Cursor, id: ChannelId, fmt: ChannelFormat) -> Result<()> {
        cursor.write_u8(id as u8);
        cursor.write_u8(fmt as u8);

        for y in 0..self.height {
            for x in 0..self.width {
                let entry = self.get(x, y);
                match id {
                    ChannelId::Iterations => write_integer(cursor, fmt, entry.last)?,
                    ChannelId::LogNorms => write_scalar(cursor, fmt, entry.lognorm as f64)?,
                    ChannelId::Derivatives => {
                        write_scalar(cursor, fmt, entry.derivative.re)?;
                        write_scalar(cursor, fmt, entry.derivative.im)?;
                    }
                    ChannelId::Normals => {
                        write_scalar(cursor, fmt, entry.normal.re)?;
                        write_scalar(cursor, fmt, entry.normal.im)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Read a map file. The plane metadata is not stored in the file; the
    /// returned map carries the channel data only.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let mut file = File::open(path)?;

        // Header
        let mut magic = [0u8; 9];
        file.read_exact(&mut magic)
            .map_err(|_| Error::Format("not a valid map file: invalid header".into()))?;
        if &magic != MAGIC {
            return Err(Error::Format("not a valid map file: invalid header".into()));
        }

        let mut version = [0u8; 3];
        file.read_exact(&mut version)?;

        let mut dim = [0u8; 8];
        file.read_exact(&mut dim)?;
        let width = i64::from_le_bytes(dim);
        file.read_exact(&mut dim)?;
        let height = i64::from_le_bytes(dim);

        if width < 1 || width as usize > MAX_MAP_WIDTH || height < 1 || height as usize > MAX_MAP_HEIGHT {
            return Err(Error::Format(format!(
                "map dimensions out of range: {} x {}",
                width, height
            )));
        }
        let (width, height) = (width as usize, height as usize);

        // Payload
        let mut compressed = Vec::new();
        file.read_to_end(&mut compressed)?;
        let mut cursor =
            Cursor::from_compressed(&compressed, width * height * std::mem::size_of::<MapEntry>())?;

        let mut map = DrillMap::bare(width, height);
        while !cursor.eof() {
            map.load_channel(&mut cursor)?;
        }

        debug!(
            path = %path.display(),
            width,
            height,
            iterations = map.has_iterations(),
            lognorms = map.has_lognorms(),
            derivatives = map.has_derivatives(),
            normals = map.has_normals(),
            "map file loaded"
        );
        Ok(map)
    }

    fn load_channel(&mut self, cursor: &mut Cursor) -> Result<()> {
        let id = ChannelId::from_u8(cursor.read_u8()?)?;
        let fmt = ChannelFormat::from_u8(cursor.read_u8()?)?;

        for y in 0..self.height {
            for x in 0..self.width {
                let mut entry = *self.get(x, y);
                match id {
                    ChannelId::Iterations => entry.last = read_integer(cursor, fmt)?,
                    ChannelId::LogNorms => entry.lognorm = read_scalar(cursor, fmt)? as f32,
                    ChannelId::Derivatives => {
                        entry.derivative.re = read_scalar(cursor, fmt)?;
                        entry.derivative.im = read_scalar(cursor, fmt)?;
                    }
                    ChannelId::Normals => {
                        entry.normal.re = read_scalar(cursor, fmt)?;
                        entry.normal.im = read_scalar(cursor, fmt)?;
                    }
                }
                self.set(x, y, entry);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::DrillResult;
    use deepdrill_core::StandardComplex;
    use std::io::Write as _;

    fn sample_map(width: usize, height: usize) -> DrillMap {
        let mut map = DrillMap::bare(width, height);
        for y in 0..height {
            for x in 0..width {
                let n = (y * width + x) as i32;
                map.set(
                    x,
                    y,
                    MapEntry {
                        result: DrillResult::Escaped,
                        first: 0,
                        last: n * 3 + 1,
                        lognorm: n as f32 * 0.25,
                        zn: StandardComplex::ZERO,
                        derivative: StandardComplex::new(n as f64, -n as f64),
                        normal: StandardComplex::new(
                            ((n % 17) as f64 / 17.0) * 2.0 - 1.0,
                            ((n % 5) as f64 / 5.0) * 2.0 - 1.0,
                        ),
                    },
                );
            }
        }
        map
    }

    #[test]
    fn default_channels_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.map");

        let map = sample_map(16, 9);
        map.save(&path).unwrap();
        let loaded = DrillMap::load(&path).unwrap();

        assert_eq!(loaded.width, 16);
        assert_eq!(loaded.height, 9);
        for y in 0..9 {
            for x in 0..16 {
                let a = map.get(x, y);
                let b = loaded.get(x, y);
                assert_eq!(a.last, b.last);
                assert_eq!(a.lognorm, b.lognorm);
                // Normals quantize through fp16 fixed point.
                assert!((a.normal.re - b.normal.re).abs() < 1.0 / 16000.0);
                assert!((a.normal.im - b.normal.im).abs() < 1.0 / 16000.0);
            }
        }
    }

    #[test]
    fn integer_formats_roundtrip_exactly() {
        for fmt in [ChannelFormat::I16, ChannelFormat::I24, ChannelFormat::I32] {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("it.map");

            let mut map = DrillMap::bare(8, 8);
            for y in 0..8 {
                for x in 0..8 {
                    // Keep values inside the narrowest format's range.
                    let last = (y * 8 + x) as i32 * 100 - 3000;
                    map.set(x, y, MapEntry { last, ..MapEntry::default() });
                }
            }
            map.save_channels(&path, &[(ChannelId::Iterations, fmt)]).unwrap();
            let loaded = DrillMap::load(&path).unwrap();
            for y in 0..8 {
                for x in 0..8 {
                    assert_eq!(loaded.get(x, y).last, map.get(x, y).last, "{:?}", fmt);
                }
            }
        }
    }

    #[test]
    fn i24_covers_millions_of_iterations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep.map");

        let mut map = DrillMap::bare(2, 1);
        map.set(0, 0, MapEntry { last: 5_000_000, ..MapEntry::default() });
        map.set(1, 0, MapEntry { last: -1, ..MapEntry::default() });
        map.save_channels(&path, &[(ChannelId::Iterations, ChannelFormat::I24)]).unwrap();

        let loaded = DrillMap::load(&path).unwrap();
        assert_eq!(loaded.get(0, 0).last, 5_000_000);
        assert_eq!(loaded.get(1, 0).last, -1);
    }

    #[test]
    fn float_formats_roundtrip() {
        for fmt in [ChannelFormat::Float, ChannelFormat::Double] {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("ln.map");

            let map = sample_map(8, 8);
            map.save_channels(&path, &[(ChannelId::LogNorms, fmt)]).unwrap();
            let loaded = DrillMap::load(&path).unwrap();
            for y in 0..8 {
                for x in 0..8 {
                    assert_eq!(loaded.get(x, y).lognorm, map.get(x, y).lognorm);
                }
            }
        }
    }

    #[test]
    fn derivative_channel_is_optional_but_supported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deriv.map");

        let map = sample_map(6, 4);
        map.save_channels(&path, &[(ChannelId::Derivatives, ChannelFormat::Double)])
            .unwrap();
        let loaded = DrillMap::load(&path).unwrap();
        assert!(loaded.has_derivatives());
        assert!(!loaded.has_iterations());
        for y in 0..4 {
            for x in 0..6 {
                assert_eq!(loaded.get(x, y).derivative, map.get(x, y).derivative);
            }
        }
    }

    #[test]
    fn resave_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.map");
        let second = dir.path().join("b.map");

        sample_map(32, 18).save(&first).unwrap();
        DrillMap::load(&first).unwrap().save(&second).unwrap();

        let a = std::fs::read(&first).unwrap();
        let b = std::fs::read(&second).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn corrupted_magic_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.map");

        sample_map(4, 4).save(&path).unwrap();
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] ^= 0xff;
        std::fs::write(&path, bytes).unwrap();

        match DrillMap::load(&path) {
            Err(Error::Format(msg)) => assert!(msg.contains("invalid header")),
            other => panic!("expected format error, got {:?}", other.err()),
        }
    }

    #[test]
    fn unknown_channel_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chan.map");

        // Hand-build a file with channel id 7.
        let mut cursor = Cursor::new();
        cursor.write_u8(7);
        cursor.write_u8(ChannelFormat::I32 as u8);
        cursor.write_i32(0);

        let mut file = File::create(&path).unwrap();
        file.write_all(MAGIC).unwrap();
        file.write_all(&[VER_MAJOR, VER_MINOR, VER_BETA]).unwrap();
        file.write_all(&1i64.to_le_bytes()).unwrap();
        file.write_all(&1i64.to_le_bytes()).unwrap();
        file.write_all(&cursor.compress().unwrap()).unwrap();
        drop(file);

        match DrillMap::load(&path) {
            Err(Error::InvalidChannelId(7)) => {}
            other => panic!("expected invalid channel id, got {:?}", other.err()),
        }
    }

    #[test]
    fn oversized_dimensions_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dim.map");

        let mut file = File::create(&path).unwrap();
        file.write_all(MAGIC).unwrap();
        file.write_all(&[VER_MAJOR, VER_MINOR, VER_BETA]).unwrap();
        file.write_all(&99999i64.to_le_bytes()).unwrap();
        file.write_all(&1i64.to_le_bytes()).unwrap();
        drop(file);

        assert!(matches!(DrillMap::load(&path), Err(Error::Format(_))));
    }

    #[test]
    fn truncated_payload_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trunc.map");

        // A channel header that promises samples it does not contain.
        let mut cursor = Cursor::new();
        cursor.write_u8(ChannelId::Iterations as u8);
        cursor.write_u8(ChannelFormat::I32 as u8);
        cursor.write_i32(1); // one sample, four promised

        let mut file = File::create(&path).unwrap();
        file.write_all(MAGIC).unwrap();
        file.write_all(&[VER_MAJOR, VER_MINOR, VER_BETA]).unwrap();
        file.write_all(&2i64.to_le_bytes()).unwrap();
        file.write_all(&2i64.to_le_bytes()).unwrap();
        file.write_all(&cursor.compress().unwrap()).unwrap();
        drop(file);

        assert!(DrillMap::load(&path).is_err());
    }

    #[test]
    fn missing_file_is_file_not_found() {
        assert!(matches!(
            DrillMap::load("/nonexistent/path/xyz.map"),
            Err(Error::FileNotFound(_))
        ));
    }

    #[test]
    fn fp16_quantization_is_idempotent() {
        // Once quantized, values survive further roundtrips unchanged.
        let mut cursor = Cursor::new();
        for i in -5..=5 {
            write_scalar(&mut cursor, ChannelFormat::Fp16, i as f64 / 7.0).unwrap();
        }
        let mut first = Vec::new();
        for _ in -5..=5 {
            first.push(read_scalar(&mut cursor, ChannelFormat::Fp16).unwrap());
        }

        let mut cursor2 = Cursor::new();
        for v in &first {
            write_scalar(&mut cursor2, ChannelFormat::Fp16, *v).unwrap();
        }
        for v in &first {
            assert_eq!(read_scalar(&mut cursor2, ChannelFormat::Fp16).unwrap(), *v);
        }
    }
}
