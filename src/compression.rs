//! Compression codec negotiation and pooled compressors.
//!
//! A producer is configured with an ordered preference list of
//! [`CompressionCodec`]s. [`load_produce_compressor`] walks that list and
//! returns a [`Compressor`] for the first codec the negotiated produce
//! request version supports, or `None` to produce uncompressed.
//!
//! The codec is opaque to the batch encoder: bytes in, bytes out, plus
//! [`Compressor::attrs`] bits to OR into the batch attributes word. A
//! compressor that fails produces no output and the encoder keeps the
//! uncompressed region; compression is an optimization, never a
//! correctness requirement.
//!
//! Compressor state worth reusing (scratch buffers, the zstd context) is
//! kept in a per-[`Compressor`] free list so repeated batches do not
//! reallocate. Checkout hands back an RAII guard, so the resource returns
//! to the pool on every exit path.

use std::io::Write;
use std::sync::Mutex;

use tracing::debug;

use crate::error::{Error, Result};

/// Compression applied to the record region of a batch, identified on the
/// wire by a small integer tag in the low bits of the batch attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Gzip,
    Snappy,
    Lz4,
    Zstd,
}

impl CompressionType {
    /// Attribute bits for this codec in the batch attributes word.
    pub fn attrs(self) -> i16 {
        match self {
            CompressionType::None => 0,
            CompressionType::Gzip => 1,
            CompressionType::Snappy => 2,
            CompressionType::Lz4 => 3,
            CompressionType::Zstd => 4,
        }
    }

    /// Whether a produce request at `version` may carry this codec.
    /// Zstd requires v7+ (Kafka 2.1).
    pub fn supported_by(self, version: i16) -> bool {
        match self {
            CompressionType::Zstd => version >= 7,
            _ => true,
        }
    }
}

/// A codec choice plus an optional codec-specific level.
///
/// Build the preference list for a producer from these, most preferred
/// first:
///
/// ```
/// use gregor::compression::CompressionCodec;
///
/// let preference = vec![
///     CompressionCodec::zstd(),
///     CompressionCodec::gzip().with_level(4),
///     CompressionCodec::none(),
/// ];
/// for codec in &preference {
///     codec.validate().unwrap();
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionCodec {
    typ: CompressionType,
    level: Option<i32>,
}

impl CompressionCodec {
    pub fn none() -> Self {
        CompressionCodec {
            typ: CompressionType::None,
            level: None,
        }
    }

    pub fn gzip() -> Self {
        CompressionCodec {
            typ: CompressionType::Gzip,
            level: None,
        }
    }

    pub fn snappy() -> Self {
        CompressionCodec {
            typ: CompressionType::Snappy,
            level: None,
        }
    }

    pub fn lz4() -> Self {
        CompressionCodec {
            typ: CompressionType::Lz4,
            level: None,
        }
    }

    pub fn zstd() -> Self {
        CompressionCodec {
            typ: CompressionType::Zstd,
            level: None,
        }
    }

    /// Set a codec-specific level. Only gzip and zstd accept levels.
    pub fn with_level(mut self, level: i32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn codec_type(&self) -> CompressionType {
        self.typ
    }

    /// Check the level against the codec's accepted range.
    pub fn validate(&self) -> Result<()> {
        match (self.typ, self.level) {
            (_, None) => Ok(()),
            (CompressionType::Gzip, Some(l)) if (0..=9).contains(&l) => Ok(()),
            (CompressionType::Zstd, Some(l)) if (1..=22).contains(&l) => Ok(()),
            (typ, Some(l)) => Err(Error::Config(format!(
                "compression level {} is invalid for {:?}",
                l, typ
            ))),
        }
    }

    fn level_or_default(&self) -> i32 {
        self.level.unwrap_or(match self.typ {
            CompressionType::Gzip => 6,
            CompressionType::Zstd => 3,
            _ => 0,
        })
    }
}

/// Walk `preference` in order and build a [`Compressor`] for the first
/// codec usable at the given produce request `version`. Returns `None`
/// when no codec matches or the matching codec is
/// [`CompressionType::None`]; the batch is then produced uncompressed.
pub fn load_produce_compressor(
    preference: &[CompressionCodec],
    version: i16,
) -> Option<Compressor> {
    for codec in preference {
        if !codec.typ.supported_by(version) {
            continue;
        }
        if codec.typ == CompressionType::None {
            return None;
        }
        debug!(codec = ?codec.typ, version, "selected produce compression");
        return Some(Compressor::new(*codec));
    }
    None
}

/// A single-codec compressor with a free list of reusable internals.
///
/// Safe to share across threads; concurrent checkouts either pop distinct
/// pooled resources or build fresh ones.
pub struct Compressor {
    typ: CompressionType,
    level: i32,
    pool: Mutex<Vec<Zipr>>,
}

impl Compressor {
    fn new(codec: CompressionCodec) -> Self {
        Compressor {
            typ: codec.typ,
            level: codec.level_or_default(),
            pool: Mutex::new(Vec::new()),
        }
    }

    /// Attribute bits to OR into the batch attributes word when this
    /// compressor's output is kept.
    pub fn attrs(&self) -> i16 {
        self.typ.attrs()
    }

    /// Compress `src`, returning `None` on any codec failure (the caller
    /// keeps the uncompressed bytes). The pooled internals are checked out
    /// for the duration of the call and returned on every path.
    pub fn compress(&self, src: &[u8]) -> Option<Vec<u8>> {
        let mut zipr = self.checkout();
        let out = zipr.compress(src, self.level).map(|bytes| bytes.to_vec());
        if out.is_none() {
            debug!(codec = ?self.typ, len = src.len(), "compression failed, keeping uncompressed");
        }
        out
    }

    fn checkout(&self) -> PooledZipr<'_> {
        let zipr = self
            .pool
            .lock()
            .expect("compressor pool poisoned")
            .pop()
            .unwrap_or_else(|| Zipr::new(self.typ));
        PooledZipr {
            pool: &self.pool,
            zipr: Some(zipr),
        }
    }

    #[cfg(test)]
    fn pooled(&self) -> usize {
        self.pool.lock().expect("compressor pool poisoned").len()
    }
}

/// RAII checkout of a pooled [`Zipr`]; returns it to the free list on drop.
struct PooledZipr<'a> {
    pool: &'a Mutex<Vec<Zipr>>,
    zipr: Option<Zipr>,
}

impl PooledZipr<'_> {
    fn compress(&mut self, src: &[u8], level: i32) -> Option<&[u8]> {
        self.zipr
            .as_mut()
            .expect("zipr present until drop")
            .compress(src, level)
    }
}

impl Drop for PooledZipr<'_> {
    fn drop(&mut self) {
        if let Some(zipr) = self.zipr.take() {
            self.pool.lock().expect("compressor pool poisoned").push(zipr);
        }
    }
}

/// Per-codec compression state. The scratch buffer (and for zstd, the
/// compression context) survives between checkouts.
enum Zipr {
    Gzip { buf: Vec<u8> },
    Snappy { enc: snap::raw::Encoder, buf: Vec<u8> },
    Lz4 { buf: Vec<u8> },
    Zstd { ctx: Option<zstd::bulk::Compressor<'static>>, buf: Vec<u8> },
}

impl Zipr {
    fn new(typ: CompressionType) -> Self {
        match typ {
            CompressionType::Gzip => Zipr::Gzip { buf: Vec::new() },
            CompressionType::Snappy => Zipr::Snappy {
                enc: snap::raw::Encoder::new(),
                buf: Vec::new(),
            },
            CompressionType::Lz4 => Zipr::Lz4 { buf: Vec::new() },
            CompressionType::Zstd => Zipr::Zstd {
                ctx: None,
                buf: Vec::new(),
            },
            CompressionType::None => unreachable!("no compressor is built for CompressionType::None"),
        }
    }

    fn compress(&mut self, src: &[u8], level: i32) -> Option<&[u8]> {
        match self {
            Zipr::Gzip { buf } => {
                buf.clear();
                let mut enc =
                    flate2::write::GzEncoder::new(&mut *buf, flate2::Compression::new(level as u32));
                enc.write_all(src).ok()?;
                enc.finish().ok()?;
                Some(buf.as_slice())
            }
            Zipr::Snappy { enc, buf } => {
                buf.resize(snap::raw::max_compress_len(src.len()), 0);
                let n = enc.compress(src, buf).ok()?;
                Some(&buf[..n])
            }
            Zipr::Lz4 { buf } => {
                buf.clear();
                let mut enc = lz4_flex::frame::FrameEncoder::new(&mut *buf);
                enc.write_all(src).ok()?;
                enc.finish().ok()?;
                Some(buf.as_slice())
            }
            Zipr::Zstd { ctx, buf } => {
                if ctx.is_none() {
                    *ctx = zstd::bulk::Compressor::new(level).ok();
                }
                *buf = ctx.as_mut()?.compress(src).ok()?;
                Some(buf.as_slice())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    const SAMPLE: &[u8] =
        b"the quick brown fox jumps over the lazy dog, the quick brown fox jumps again";

    fn compressor(codec: CompressionCodec) -> Compressor {
        Compressor::new(codec)
    }

    #[test]
    fn test_attrs_per_codec() {
        assert_eq!(CompressionType::None.attrs(), 0);
        assert_eq!(CompressionType::Gzip.attrs(), 1);
        assert_eq!(CompressionType::Snappy.attrs(), 2);
        assert_eq!(CompressionType::Lz4.attrs(), 3);
        assert_eq!(CompressionType::Zstd.attrs(), 4);
    }

    #[test]
    fn test_zstd_requires_v7() {
        assert!(!CompressionType::Zstd.supported_by(6));
        assert!(CompressionType::Zstd.supported_by(7));
        assert!(CompressionType::Gzip.supported_by(0));
        assert!(CompressionType::Snappy.supported_by(3));
    }

    #[test]
    fn test_validate_levels() {
        assert!(CompressionCodec::gzip().validate().is_ok());
        assert!(CompressionCodec::gzip().with_level(9).validate().is_ok());
        assert!(CompressionCodec::gzip().with_level(10).validate().is_err());
        assert!(CompressionCodec::zstd().with_level(22).validate().is_ok());
        assert!(CompressionCodec::zstd().with_level(0).validate().is_err());
        assert!(CompressionCodec::snappy().with_level(1).validate().is_err());
        assert!(CompressionCodec::lz4().with_level(1).validate().is_err());
        assert!(CompressionCodec::none().validate().is_ok());
    }

    #[test]
    fn test_preference_walk_picks_first_supported() {
        let preference = vec![CompressionCodec::zstd(), CompressionCodec::gzip()];

        // zstd unsupported at v3, falls through to gzip
        let compressor = load_produce_compressor(&preference, 3).unwrap();
        assert_eq!(compressor.attrs(), 1);

        // zstd supported at v7
        let compressor = load_produce_compressor(&preference, 7).unwrap();
        assert_eq!(compressor.attrs(), 4);
    }

    #[test]
    fn test_preference_none_short_circuits() {
        // An explicit "none" preference wins over later codecs
        let preference = vec![CompressionCodec::none(), CompressionCodec::gzip()];
        assert!(load_produce_compressor(&preference, 7).is_none());
    }

    #[test]
    fn test_empty_preference_means_uncompressed() {
        assert!(load_produce_compressor(&[], 7).is_none());
    }

    #[test]
    fn test_gzip_round_trip() {
        let c = compressor(CompressionCodec::gzip());
        let compressed = c.compress(SAMPLE).unwrap();

        let mut out = Vec::new();
        flate2::read::GzDecoder::new(&compressed[..])
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, SAMPLE);
    }

    #[test]
    fn test_snappy_round_trip() {
        let c = compressor(CompressionCodec::snappy());
        let compressed = c.compress(SAMPLE).unwrap();

        let out = snap::raw::Decoder::new().decompress_vec(&compressed).unwrap();
        assert_eq!(out, SAMPLE);
    }

    #[test]
    fn test_lz4_round_trip() {
        let c = compressor(CompressionCodec::lz4());
        let compressed = c.compress(SAMPLE).unwrap();

        let mut out = Vec::new();
        lz4_flex::frame::FrameDecoder::new(&compressed[..])
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, SAMPLE);
    }

    #[test]
    fn test_zstd_round_trip() {
        let c = compressor(CompressionCodec::zstd());
        let compressed = c.compress(SAMPLE).unwrap();

        let out = zstd::decode_all(&compressed[..]).unwrap();
        assert_eq!(out, SAMPLE);
    }

    #[test]
    fn test_pool_reuses_internals() {
        let c = compressor(CompressionCodec::gzip());
        assert_eq!(c.pooled(), 0);

        c.compress(SAMPLE).unwrap();
        assert_eq!(c.pooled(), 1);

        // A second compress checks the same resource out and back in
        c.compress(SAMPLE).unwrap();
        assert_eq!(c.pooled(), 1);
    }

    #[test]
    fn test_compress_repeatable() {
        let c = compressor(CompressionCodec::gzip());
        let first = c.compress(SAMPLE).unwrap();
        let second = c.compress(SAMPLE).unwrap();
        assert_eq!(first, second);
    }
}
