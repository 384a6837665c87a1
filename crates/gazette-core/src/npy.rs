//! NPY v1.0 codec for embedding vectors.
//!
//! Embedding blobs are stored in the NumPy `.npy` format (version 1.0,
//! little-endian f32, one dimension) so the sidecar store stays readable by
//! the analytics tooling that consumes it. Only the narrow subset the
//! pipeline produces is supported; anything else is a codec error.
//!
//! # Layout
//!
//! ```text
//! \x93NUMPY [major=1][minor=0] [u16 LE header len] [header dict, space-padded, '\n'-terminated]
//! [f32 LE] [f32 LE] ...
//! ```

use crate::error::{Error, Result};

const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Encode a vector as NPY v1.0 bytes.
pub fn encode_f32(vector: &[f32]) -> Vec<u8> {
    let header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({},), }}",
        vector.len()
    );
    // Pad with spaces so the data section starts on a 64-byte boundary;
    // the header must end with a newline.
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (64 - unpadded % 64) % 64;
    let header_len = (header.len() + padding + 1) as u16;

    let mut out = Vec::with_capacity(unpadded + padding + vector.len() * 4);
    out.extend_from_slice(MAGIC);
    out.push(1); // major version
    out.push(0); // minor version
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    out.extend(std::iter::repeat(b' ').take(padding));
    out.push(b'\n');
    for value in vector {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Decode NPY v1.0 bytes into a vector.
///
/// Accepts exactly what [`encode_f32`] produces: little-endian f32,
/// C order, one dimension.
pub fn decode_f32(data: &[u8]) -> Result<Vec<f32>> {
    if data.len() < 10 || &data[..6] != MAGIC {
        return Err(Error::EmbeddingCodec("missing NPY magic".to_string()));
    }
    if data[6] != 1 {
        return Err(Error::EmbeddingCodec(format!(
            "unsupported NPY version {}.{}",
            data[6], data[7]
        )));
    }
    let header_len = u16::from_le_bytes([data[8], data[9]]) as usize;
    let body_start = 10 + header_len;
    if data.len() < body_start {
        return Err(Error::EmbeddingCodec("truncated NPY header".to_string()));
    }
    let header = std::str::from_utf8(&data[10..body_start])
        .map_err(|e| Error::EmbeddingCodec(format!("non-UTF8 NPY header: {e}")))?;

    if !header.contains("'descr': '<f4'") {
        return Err(Error::EmbeddingCodec(format!(
            "unsupported dtype in header: {}",
            header.trim()
        )));
    }
    if !header.contains("'fortran_order': False") {
        return Err(Error::EmbeddingCodec(
            "fortran-order arrays are not supported".to_string(),
        ));
    }
    let count = parse_shape(header)?;

    let body = &data[body_start..];
    if body.len() != count * 4 {
        return Err(Error::EmbeddingCodec(format!(
            "shape ({count},) does not match {} data bytes",
            body.len()
        )));
    }
    Ok(body
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Extract the element count from a `'shape': (N,)` header entry.
fn parse_shape(header: &str) -> Result<usize> {
    let start = header
        .find("'shape': (")
        .ok_or_else(|| Error::EmbeddingCodec("missing shape in header".to_string()))?
        + "'shape': (".len();
    let rest = &header[start..];
    let end = rest
        .find(')')
        .ok_or_else(|| Error::EmbeddingCodec("unterminated shape in header".to_string()))?;
    let dims: Vec<&str> = rest[..end]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if dims.len() != 1 {
        return Err(Error::EmbeddingCodec(format!(
            "expected one dimension, got shape ({})",
            &rest[..end]
        )));
    }
    dims[0]
        .parse()
        .map_err(|_| Error::EmbeddingCodec(format!("bad shape dimension '{}'", dims[0])))
}
