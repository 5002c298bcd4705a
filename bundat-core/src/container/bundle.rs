//! Chunked bundle framing.
//!
//! Layout (all little-endian):
//! `[0]` decompressed size, `[36]` chunk count, `[40]` compression
//! granularity, `[60..]` one `i32` compressed size per chunk, then the
//! compressed chunks back-to-back. Every chunk inflates to `granularity`
//! bytes except the last one, which holds the remainder.

use crate::codec::{Compressor, Decompressor};
use crate::error::{BundatError, Result};
use crate::util::buf::i32_at;
use byteorder::{LittleEndian, WriteBytesExt};
use rayon::prelude::*;
use tracing::{debug, trace};

pub const HEADER_LEN: usize = 60;

const S_DECOMPRESSED_SIZE: usize = 0;
const S_CHUNK_COUNT: usize = 36;
const S_GRANULARITY: usize = 40;
const S_CHUNK_SIZES: usize = 60;
const CHUNK_SIZE_LEN: usize = 4;

/// Granularity the game client writes bundles with.
pub const DEFAULT_GRANULARITY: u32 = 256 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleHeader {
    pub decompressed_size: u32,
    pub chunk_count: u32,
    pub granularity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkEntry {
    pub index: usize,
    /// Offset of the compressed bytes from the start of the bundle.
    pub c_off: usize,
    pub c_len: usize,
    /// Offset of this chunk inside the decompressed stream.
    pub u_off: usize,
    pub u_len: usize,
}

#[derive(Debug, Clone)]
pub struct SliceOptions {
    /// Inflate intersecting chunks on the rayon pool when more than one is needed.
    pub parallel: bool,
}

impl Default for SliceOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}

fn header_field(bundle: &[u8], off: usize, what: &str) -> Result<u32> {
    let v = i32_at(bundle, off)
        .ok_or_else(|| BundatError::Format(format!("bundle truncated reading {what}")))?;
    u32::try_from(v).map_err(|_| BundatError::Format(format!("negative bundle {what}: {v}")))
}

impl BundleHeader {
    pub fn read_from(bundle: &[u8]) -> Result<Self> {
        if bundle.len() < HEADER_LEN {
            return Err(BundatError::Format(format!(
                "bundle too small for header: {} bytes",
                bundle.len()
            )));
        }
        let h = Self {
            decompressed_size: header_field(bundle, S_DECOMPRESSED_SIZE, "decompressed size")?,
            chunk_count: header_field(bundle, S_CHUNK_COUNT, "chunk count")?,
            granularity: header_field(bundle, S_GRANULARITY, "granularity")?,
        };
        if h.chunk_count > 0 && h.granularity == 0 {
            return Err(BundatError::Format("bundle granularity is zero".into()));
        }
        Ok(h)
    }

    /// Decompressed length of chunk `idx`.
    ///
    /// When the total size divides evenly the last chunk is a full one.
    pub fn chunk_len(&self, idx: usize) -> usize {
        let gran = self.granularity as usize;
        if idx + 1 < self.chunk_count as usize {
            return gran;
        }
        match self.decompressed_size as usize % gran.max(1) {
            0 if self.decompressed_size > 0 => gran,
            rem => rem,
        }
    }
}

pub fn decompressed_bundle_size(bundle: &[u8]) -> Result<u32> {
    header_field(bundle, S_DECOMPRESSED_SIZE, "decompressed size")
}

/// Walks the chunk-size array keeping the compressed and decompressed cursors.
///
/// Payload bounds are not checked here; see [`ChunkEntry::payload`].
pub fn read_chunk_table(bundle: &[u8], header: &BundleHeader) -> Result<Vec<ChunkEntry>> {
    let count = header.chunk_count as usize;
    let table_end = count
        .checked_mul(CHUNK_SIZE_LEN)
        .and_then(|n| n.checked_add(S_CHUNK_SIZES))
        .ok_or_else(|| BundatError::Format("chunk table size overflow".into()))?;
    if bundle.len() < table_end {
        return Err(BundatError::Format(format!(
            "bundle truncated in chunk table: have {}, need {table_end}",
            bundle.len()
        )));
    }

    let mut out = Vec::with_capacity(count);
    let mut c_off = table_end;
    let mut u_off = 0usize;
    for index in 0..count {
        let c_len = header_field(bundle, S_CHUNK_SIZES + index * CHUNK_SIZE_LEN, "chunk size")?
            as usize;
        let u_len = header.chunk_len(index);
        trace!(index, c_off, c_len, u_off, u_len, "chunk");
        out.push(ChunkEntry {
            index,
            c_off,
            c_len,
            u_off,
            u_len,
        });
        c_off = c_off.saturating_add(c_len);
        u_off = u_off.saturating_add(u_len);
    }
    Ok(out)
}

impl ChunkEntry {
    /// Compressed bytes of this chunk, cut short where the bundle ends early.
    pub fn payload<'b>(&self, bundle: &'b [u8]) -> &'b [u8] {
        let end = self.c_off.saturating_add(self.c_len).min(bundle.len());
        &bundle[self.c_off.min(end)..end]
    }
}

/// Part of one chunk that lands in the requested slice.
struct Piece {
    chunk: ChunkEntry,
    begin: usize,
    end: usize,
}

pub fn decompress_slice_in_bundle(
    bundle: &[u8],
    slice_offset: usize,
    out: &mut [u8],
    codec: &dyn Decompressor,
) -> Result<()> {
    decompress_slice_with(bundle, slice_offset, out, codec, &SliceOptions::default())
}

/// Fills `out` with decompressed bytes `[slice_offset, slice_offset + out.len())`.
///
/// Only chunks intersecting the slice are inflated. Decompressor failures are
/// returned as-is.
pub fn decompress_slice_with(
    bundle: &[u8],
    slice_offset: usize,
    out: &mut [u8],
    codec: &dyn Decompressor,
    opts: &SliceOptions,
) -> Result<()> {
    let header = BundleHeader::read_from(bundle)?;
    let slice_end = slice_offset
        .checked_add(out.len())
        .filter(|&end| end <= header.decompressed_size as usize)
        .ok_or_else(|| {
            BundatError::Format(format!(
                "slice {}+{} exceeds bundle size {}",
                slice_offset,
                out.len(),
                header.decompressed_size
            ))
        })?;
    if out.is_empty() {
        return Ok(());
    }

    let chunks = read_chunk_table(bundle, &header)?;
    let pieces: Vec<Piece> = chunks
        .into_iter()
        .filter(|c| c.u_off.max(slice_offset) < (c.u_off + c.u_len).min(slice_end))
        .map(|c| Piece {
            begin: slice_offset.saturating_sub(c.u_off),
            end: (slice_end - c.u_off).min(c.u_len),
            chunk: c,
        })
        .collect();

    let covered: usize = pieces.iter().map(|p| p.end - p.begin).sum();
    if covered != out.len() {
        return Err(BundatError::Format(format!(
            "chunk table covers {covered} of {} requested bytes",
            out.len()
        )));
    }
    debug!(
        slice_offset,
        len = out.len(),
        chunks = pieces.len(),
        codec = ?codec.id(),
        "inflating bundle slice"
    );

    let mut rest: &mut [u8] = out;
    let mut jobs = Vec::with_capacity(pieces.len());
    for p in pieces {
        let (seg, tail) = std::mem::take(&mut rest).split_at_mut(p.end - p.begin);
        rest = tail;
        jobs.push((p, seg));
    }

    let fill = |(p, seg): (Piece, &mut [u8])| -> Result<()> {
        let c = &p.chunk;
        let raw = codec.inflate(c.payload(bundle), c.u_len)?;
        let part = raw.get(p.begin..p.end).ok_or_else(|| {
            BundatError::Decode(format!(
                "chunk[{}] inflated to {} bytes, expected {}",
                c.index,
                raw.len(),
                c.u_len
            ))
        })?;
        seg.copy_from_slice(part);
        Ok(())
    };

    if opts.parallel && jobs.len() > 1 {
        jobs.into_par_iter().try_for_each(fill)
    } else {
        jobs.into_iter().try_for_each(fill)
    }
}

/// Inflates the whole bundle.
pub fn decompress_bundle(bundle: &[u8], codec: &dyn Decompressor) -> Result<Vec<u8>> {
    let size = decompressed_bundle_size(bundle)? as usize;
    let mut out = vec![0u8; size];
    decompress_slice_in_bundle(bundle, 0, &mut out, codec)?;
    Ok(out)
}

/// Builds a bundle around `data`, one chunk per `granularity` bytes.
pub fn encode_bundle(
    data: &[u8],
    granularity: u32,
    codec: &dyn Compressor,
    level: i32,
) -> Result<Vec<u8>> {
    if granularity == 0 {
        return Err(BundatError::Format("bundle granularity is zero".into()));
    }
    let to_i32 = |n: usize, what: &str| {
        i32::try_from(n).map_err(|_| BundatError::Format(format!("{what} too large: {n}")))
    };

    let chunks: Vec<Vec<u8>> = data
        .par_chunks(granularity as usize)
        .map(|raw| codec.deflate(raw, level))
        .collect::<Result<_>>()?;

    let payload: usize = chunks.iter().map(Vec::len).sum();
    let head_len = 48 + chunks.len() * CHUNK_SIZE_LEN;
    let mut out = Vec::with_capacity(12 + head_len + payload);

    out.write_i32::<LittleEndian>(to_i32(data.len(), "bundle")?)?;
    out.write_i32::<LittleEndian>(to_i32(payload, "payload")?)?;
    out.write_i32::<LittleEndian>(to_i32(head_len, "head")?)?;
    out.write_u32::<LittleEndian>(codec.id() as u32)?;
    out.write_u32::<LittleEndian>(1)?;
    out.write_u64::<LittleEndian>(data.len() as u64)?;
    out.write_u64::<LittleEndian>(payload as u64)?;
    out.write_i32::<LittleEndian>(to_i32(chunks.len(), "chunk count")?)?;
    out.write_u32::<LittleEndian>(granularity)?;
    out.extend_from_slice(&[0u8; 16]);
    debug_assert_eq!(out.len(), S_CHUNK_SIZES);

    for c in &chunks {
        out.write_i32::<LittleEndian>(to_i32(c.len(), "chunk")?)?;
    }
    for c in &chunks {
        out.extend_from_slice(c);
    }
    Ok(out)
}
