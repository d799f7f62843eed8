//! Versioned binary encoding of matrices.
//!
//! Layout, little-endian throughout:
//!
//! ```text
//! magic   [u8; 4]  b"DMAT"
//! version u8       currently 1
//! backend u8       0 = nalgebra, 1 = ndarray
//! flags   u8       bit 0: element payload present
//! _pad    u8       zero
//! rows    u64
//! cols    u64
//! data    rows * cols f64, in the backend's flat index order (only when
//!         the payload flag is set)
//! ```
//!
//! The payload-free variant serves lazy reconstruction paths: it carries the
//! shape and backend only, and decodes to a zero-filled matrix.

use log::debug;

use crate::error::{MatrixError, Result};
use crate::factory::Backend;
use crate::matrix::Matrix;

const MAGIC: [u8; 4] = *b"DMAT";
const VERSION: u8 = 1;
const FLAG_HAS_DATA: u8 = 0b0000_0001;
const HEADER_LEN: usize = 24;

const TAG_NALGEBRA: u8 = 0;
const TAG_NDARRAY: u8 = 1;

fn backend_tag(backend: Backend) -> u8 {
    match backend {
        Backend::Nalgebra => TAG_NALGEBRA,
        Backend::Ndarray => TAG_NDARRAY,
    }
}

fn tag_backend(tag: u8) -> Result<Backend> {
    match tag {
        TAG_NALGEBRA => Ok(Backend::Nalgebra),
        TAG_NDARRAY => Ok(Backend::Ndarray),
        other => Err(MatrixError::Decode(format!("unknown backend tag {other}"))),
    }
}

impl Matrix {
    /// Encodes shape, backend, and all elements in flat index order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.encode_header(true);
        for v in self.iter() {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    /// Encodes shape and backend only; decoding yields a zero-filled matrix
    /// of the declared shape.
    pub fn to_bytes_shape_only(&self) -> Vec<u8> {
        self.encode_header(false)
    }

    fn encode_header(&self, with_data: bool) -> Vec<u8> {
        let capacity = if with_data {
            HEADER_LEN + 8 * self.element_count()
        } else {
            HEADER_LEN
        };
        let mut out = Vec::with_capacity(capacity);
        out.extend_from_slice(&MAGIC);
        out.push(VERSION);
        out.push(backend_tag(self.backend()));
        out.push(if with_data { FLAG_HAS_DATA } else { 0 });
        out.push(0);
        out.extend_from_slice(&(self.nrows() as u64).to_le_bytes());
        out.extend_from_slice(&(self.ncols() as u64).to_le_bytes());
        out
    }

    /// Decodes a buffer produced by [`Matrix::to_bytes`] or
    /// [`Matrix::to_bytes_shape_only`], reconstructing storage of the
    /// declared shape on the declared backend and populating it by flat
    /// index.
    pub fn from_bytes(bytes: &[u8]) -> Result<Matrix> {
        if bytes.len() < HEADER_LEN {
            return Err(MatrixError::Decode(format!(
                "buffer too short for header: {} bytes",
                bytes.len()
            )));
        }
        if bytes[0..4] != MAGIC {
            return Err(MatrixError::Decode("bad magic".into()));
        }
        if bytes[4] != VERSION {
            return Err(MatrixError::Decode(format!(
                "unsupported version {}",
                bytes[4]
            )));
        }
        let backend = tag_backend(bytes[5])?;
        let has_data = bytes[6] & FLAG_HAS_DATA != 0;

        let u64_at = |offset: usize| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes[offset..offset + 8]);
            u64::from_le_bytes(raw)
        };
        let rows = u64_at(8) as usize;
        let cols = u64_at(16) as usize;
        // Reject shapes whose payload size cannot be represented before
        // anything is allocated for them.
        let payload = rows
            .checked_mul(cols)
            .and_then(|count| count.checked_mul(8))
            .ok_or_else(|| {
                MatrixError::Decode(format!("declared shape {rows}x{cols} is too large"))
            })?;
        let count = payload / 8;

        let expected = if has_data {
            HEADER_LEN.checked_add(payload).ok_or_else(|| {
                MatrixError::Decode(format!("declared shape {rows}x{cols} is too large"))
            })?
        } else {
            HEADER_LEN
        };
        if bytes.len() != expected {
            return Err(MatrixError::Decode(format!(
                "expected {expected} bytes for a {rows}x{cols} matrix, got {}",
                bytes.len()
            )));
        }

        debug!("decoding {rows}x{cols} matrix on {backend} (payload: {has_data})");
        let mut matrix = backend.zeros(rows, cols);
        if has_data {
            for i in 0..count {
                let offset = HEADER_LEN + 8 * i;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&bytes[offset..offset + 8]);
                matrix.set_flat(i, f64::from_le_bytes(raw))?;
            }
        }
        Ok(matrix)
    }
}
