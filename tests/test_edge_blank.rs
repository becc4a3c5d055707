use s1geocode::core::edge_blank::{blank_buffer, blank_edges, blank_line, blank_raw_file, ByteOrder};
use s1geocode::EdgeMargins;
use ndarray::Array2;
use tempfile::TempDir;

/// Raster with ragged valid regions, like a GRD swath edge
fn ragged(height: usize, width: usize) -> Array2<f32> {
    Array2::from_shape_fn((height, width), |(r, c)| {
        let start = r % 7;
        let end = width - (r * 3) % 11;
        if c >= start && c < end && (c + r) % 13 != 0 {
            (r * width + c) as f32 + 1.0
        } else {
            0.0
        }
    })
}

#[test]
fn test_raster_matches_line_by_line_scan() {
    let margins = EdgeMargins::new(3, 2);
    let mut raster = ragged(64, 40);
    let mut expected = raster.clone().into_raw_vec();
    for line in expected.chunks_exact_mut(40) {
        blank_line(line, margins.left, margins.right);
    }

    let mut flat = raster.clone().into_raw_vec();
    blank_buffer(&mut flat, 40, 64, margins).unwrap();
    assert_eq!(flat, expected);

    blank_edges(&mut raster, margins);
    assert_eq!(raster.into_raw_vec(), expected);
}

#[test]
fn test_blank_big_endian_file_in_place() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("out.vv.mgrd");
    let lines = [[0.0f32, 0.0, 5.0, 7.0, 9.0, 0.0, 0.0], [0.0; 7]];
    let bytes: Vec<u8> = lines.iter().flatten().flat_map(|v| v.to_be_bytes()).collect();
    std::fs::write(&path, bytes).unwrap();

    blank_raw_file(&path, 7, 2, EdgeMargins::new(1, 1), ByteOrder::Big).unwrap();

    let samples: Vec<f32> = std::fs::read(&path)
        .unwrap()
        .chunks_exact(4)
        .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    assert_eq!(&samples[..7], &[0.0, 0.0, 0.0, 7.0, 0.0, 0.0, 0.0]);
    assert!(samples[7..].iter().all(|&v| v == 0.0));
}

#[test]
fn test_wrong_size_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("short.mgrd");
    std::fs::write(&path, vec![0u8; 10]).unwrap();
    assert!(blank_raw_file(&path, 7, 2, EdgeMargins::default(), ByteOrder::Big).is_err());
    assert_eq!(std::fs::read(&path).unwrap().len(), 10);
}
