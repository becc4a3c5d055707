use crate::config::EdgeMargins;
use crate::types::{GeocodeError, GeocodeResult};
use ndarray::{Array2, ArrayViewMut1, Axis};
use std::path::Path;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Byte order of raw raster samples on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

/// Zero the unreliable samples at both ends of one raster line.
///
/// Everything before `first + left` is zeroed, where `first` is the first nonzero
/// sample, and everything from `last + 1 - right` on, where `last` is the last nonzero
/// sample. A line with no nonzero sample is left alone.
///
/// Both margins count the anchor sample itself: with `right = 20` exactly the last 20
/// samples up to and including `last` are zeroed, never the sample before them.
pub fn blank_line(line: &mut [f32], left: usize, right: usize) {
    let width = line.len();
    let first = match line.iter().position(|&v| v != 0.0) {
        Some(first) => first,
        None => return,
    };
    // a first nonzero sample guarantees a last one
    let last = line.iter().rposition(|&v| v != 0.0).unwrap_or(first);

    let head_end = first.saturating_add(left).min(width);
    let tail_start = (last + 1).saturating_sub(right);

    line[..head_end].fill(0.0);
    line[tail_start..].fill(0.0);
}

fn blank_row(mut row: ArrayViewMut1<f32>, left: usize, right: usize) {
    match row.as_slice_mut() {
        Some(line) => blank_line(line, left, right),
        None => {
            let mut line = row.to_vec();
            blank_line(&mut line, left, right);
            row.iter_mut().zip(line).for_each(|(dst, src)| *dst = src);
        }
    }
}

/// Edge blanking over a whole raster (rows are lines)
pub fn blank_edges(data: &mut Array2<f32>, margins: EdgeMargins) {
    let EdgeMargins { left, right } = margins;

    #[cfg(feature = "parallel")]
    data.axis_iter_mut(Axis(0))
        .into_par_iter()
        .for_each(|row| blank_row(row, left, right));

    #[cfg(not(feature = "parallel"))]
    data.axis_iter_mut(Axis(0))
        .for_each(|row| blank_row(row, left, right));
}

/// Edge blanking over a flat row-major buffer of `width * height` samples
pub fn blank_buffer(
    buffer: &mut [f32],
    width: usize,
    height: usize,
    margins: EdgeMargins,
) -> GeocodeResult<()> {
    if width.checked_mul(height) != Some(buffer.len()) {
        return Err(GeocodeError::InvalidFormat(format!(
            "buffer of {} samples does not match {}x{} raster",
            buffer.len(),
            width,
            height
        )));
    }
    if width == 0 {
        return Ok(());
    }
    buffer
        .chunks_exact_mut(width)
        .for_each(|line| blank_line(line, margins.left, margins.right));
    Ok(())
}

/// Decode raw float32 samples into a `height x width` raster
pub fn decode_samples(
    bytes: &[u8],
    width: usize,
    height: usize,
    order: ByteOrder,
) -> GeocodeResult<Array2<f32>> {
    let expected = width * height * 4;
    if bytes.len() != expected {
        return Err(GeocodeError::InvalidFormat(format!(
            "raw raster is {} bytes, expected {} for {}x{} float32",
            bytes.len(),
            expected,
            width,
            height
        )));
    }

    let samples: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|c| {
            let raw = [c[0], c[1], c[2], c[3]];
            match order {
                ByteOrder::Big => f32::from_be_bytes(raw),
                ByteOrder::Little => f32::from_le_bytes(raw),
            }
        })
        .collect();

    Array2::from_shape_vec((height, width), samples)
        .map_err(|e| GeocodeError::InvalidFormat(format!("Failed to reshape raster: {}", e)))
}

/// Encode a raster back into raw float32 samples
pub fn encode_samples(data: &Array2<f32>, order: ByteOrder) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(data.len() * 4);
    for &v in data.iter() {
        match order {
            ByteOrder::Big => bytes.extend_from_slice(&v.to_be_bytes()),
            ByteOrder::Little => bytes.extend_from_slice(&v.to_le_bytes()),
        }
    }
    bytes
}

/// Blank the edges of a raw float32 raster file in place.
///
/// The toolchain writes big-endian samples; byte order is normalized here so the
/// line scan always runs on native values.
pub fn blank_raw_file<P: AsRef<Path>>(
    path: P,
    width: usize,
    height: usize,
    margins: EdgeMargins,
    order: ByteOrder,
) -> GeocodeResult<()> {
    let path = path.as_ref();
    log::info!(
        "Blanking bad data in {} ({}x{}, margins {}/{})",
        path.display(), width, height, margins.left, margins.right
    );

    let bytes = std::fs::read(path)?;
    let mut data = decode_samples(&bytes, width, height, order)?;
    blank_edges(&mut data, margins);
    std::fs::write(path, encode_samples(&data, order))?;
    Ok(())
}
