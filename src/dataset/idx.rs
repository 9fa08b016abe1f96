//! IDX array files.
//!
//! Header: two zero bytes, a type byte (only `0x08`, unsigned byte, is
//! supported), the number of dimensions, then one big-endian `u32` per
//! dimension. The payload is the row-major data.

use crate::error::{Result, SignsError};
use std::fs;
use std::io::Write;
use std::path::Path;

const TYPE_U8: u8 = 0x08;

/// An n-dimensional `u8` array read from an IDX file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdxArray {
    pub dims: Vec<usize>,
    pub data: Vec<u8>,
}

// Read a big-endian u32 and advance the byte offset (IDX format uses BE).
fn read_be_u32(data: &[u8], offset: &mut usize) -> Option<u32> {
    let bytes: [u8; 4] = data.get(*offset..*offset + 4)?.try_into().ok()?;
    *offset += 4;
    Some(u32::from_be_bytes(bytes))
}

/// Parse an in-memory IDX file. `path` is only used in error messages.
pub fn parse_idx(bytes: &[u8], path: &Path) -> Result<IdxArray> {
    if bytes.len() < 4 || bytes[0] != 0 || bytes[1] != 0 {
        return Err(SignsError::dataset(path, "missing IDX magic number"));
    }
    if bytes[2] != TYPE_U8 {
        return Err(SignsError::dataset(
            path,
            format!("unsupported IDX element type 0x{:02x}", bytes[2]),
        ));
    }

    let rank = bytes[3] as usize;
    let mut offset = 4usize;
    let mut dims = Vec::with_capacity(rank);
    for _ in 0..rank {
        let dim = read_be_u32(bytes, &mut offset)
            .ok_or_else(|| SignsError::dataset(path, "IDX header is truncated"))?;
        dims.push(dim as usize);
    }

    let total = dims
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| SignsError::dataset(path, "IDX dimensions overflow"))?;
    let payload = &bytes[offset..];
    if payload.len() < total {
        return Err(SignsError::dataset(
            path,
            format!("expected {} data bytes, found {}", total, payload.len()),
        ));
    }

    Ok(IdxArray {
        dims,
        data: payload[..total].to_vec(),
    })
}

/// Read and parse an IDX file.
pub fn read_idx(path: &Path) -> Result<IdxArray> {
    let bytes = fs::read(path).map_err(|e| SignsError::io(path, e))?;
    parse_idx(&bytes, path)
}

/// Write a `u8` array as an IDX file.
///
/// # Panics
///
/// Panics if `data` does not hold exactly `dims.iter().product()` values.
pub fn write_idx(path: &Path, dims: &[usize], data: &[u8]) -> Result<()> {
    assert_eq!(
        data.len(),
        dims.iter().product::<usize>(),
        "IDX payload does not match its dimensions"
    );
    let rank = u8::try_from(dims.len())
        .map_err(|_| SignsError::dataset(path, "too many IDX dimensions"))?;

    let mut bytes = Vec::with_capacity(4 + 4 * dims.len() + data.len());
    bytes.extend_from_slice(&[0, 0, TYPE_U8, rank]);
    for &dim in dims {
        let dim = u32::try_from(dim)
            .map_err(|_| SignsError::dataset(path, "IDX dimension exceeds u32"))?;
        bytes.extend_from_slice(&dim.to_be_bytes());
    }
    bytes.extend_from_slice(data);

    let mut file = fs::File::create(path).map_err(|e| SignsError::io(path, e))?;
    file.write_all(&bytes).map_err(|e| SignsError::io(path, e))
}
