//! ImageWriter output read back through FitsImage.

use fvc_actor::camera::{CameraState, ExposureType, Frame, Resolution};
use fvc_actor::error::StorageError;
use fvc_actor::fits::checksum;
use fvc_actor::fits::{FitsImage, ImageWriter};
use tempfile::TempDir;

fn state() -> CameraState {
    CameraState {
        device_name: "MQ013MG-E2".to_string(),
        device_serial: "1a2b3c".to_string(),
        exposure_time_us: 1500,
        min_exposure_time_us: 10,
        max_exposure_time_us: 1_000_000,
        gain_db: 7.5,
        min_gain_db: 0.0,
        max_gain_db: 24.0,
    }
}

fn sensor_frame(exposure_type: ExposureType, frame_count: u32) -> Frame {
    let resolution = Resolution::SENSOR;
    let pixels = (0..resolution.pixel_count())
        .map(|i| (i.wrapping_mul(2654435761) >> 7) as u16)
        .collect();
    Frame {
        pixels,
        resolution,
        frame_count,
        timestamp: "2025-03-04T05:06:07".to_string(),
        exposure_type,
    }
}

#[test]
fn test_roundtrip_pixels_and_header() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("FVC_object_000001.fits");
    let frame = sensor_frame(ExposureType::Object, 4);

    ImageWriter::new().write(&path, &frame, &state()).unwrap();
    let image = FitsImage::open(&path).unwrap();

    assert_eq!(image.resolution, Resolution::SENSOR);
    assert_eq!(image.pixels, frame.pixels);
    assert_eq!(image.header.get_int("NAXIS1"), Some(1280));
    assert_eq!(image.header.get_int("NAXIS2"), Some(1024));
    assert_eq!(image.header.get_int("BZERO"), Some(32768));
    assert_eq!(image.header.get_str("DATE"), Some("2025-03-04T05:06:07"));
    assert_eq!(image.header.get_str("INSTRUME"), Some("MQ013MG-E2 SN1a2b3c"));
    assert_eq!(image.header.get_int("EXPTIME"), Some(1500));
    assert_eq!(image.header.get_int("NFRAME"), Some(4));
    assert_eq!(image.header.get_float("GAIN"), Some(7.5));
    assert_eq!(image.header.get_str("IMTYPE"), Some("object"));
}

#[test]
fn test_exptime_follows_exposure_type() {
    let tmp = TempDir::new().unwrap();
    for (exposure_type, expected) in [
        (ExposureType::Object, 1500),
        (ExposureType::Bias, 10),
        (ExposureType::Test, 0),
    ] {
        let path = tmp.path().join(format!("{}.fits", exposure_type));
        ImageWriter::new()
            .write(&path, &sensor_frame(exposure_type, 1), &state())
            .unwrap();
        let image = FitsImage::open(&path).unwrap();
        assert_eq!(image.header.get_int("EXPTIME"), Some(expected));
        assert_eq!(image.header.get_str("IMTYPE"), Some(exposure_type.as_str()));
    }
}

#[test]
fn test_file_checksum_is_valid() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("frame.fits");
    ImageWriter::new()
        .write(&path, &sensor_frame(ExposureType::Bias, 1), &state())
        .unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len() % 2880, 0);
    assert_eq!(checksum::checksum(&bytes), checksum::VALID_SUM);

    let image = FitsImage::from_bytes(&bytes).unwrap();
    let recorded = image.header.get_str("CHECKSUM").unwrap();
    assert_eq!(recorded.len(), 16);
    assert!(recorded.bytes().all(|c| c.is_ascii_alphanumeric()));
}

#[test]
fn test_tampered_file_rejected() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("frame.fits");
    ImageWriter::new()
        .write(&path, &sensor_frame(ExposureType::Object, 1), &state())
        .unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 2880 - 1;
    bytes[last] = bytes[last].wrapping_add(1);
    std::fs::write(&path, &bytes).unwrap();

    let err = FitsImage::open(&path).unwrap_err();
    assert!(matches!(err, StorageError::ChecksumMismatch { .. }));
}

#[test]
fn test_overwrite_existing_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("frame.fits");
    ImageWriter::new()
        .write(&path, &sensor_frame(ExposureType::Object, 1), &state())
        .unwrap();
    ImageWriter::new()
        .write(&path, &sensor_frame(ExposureType::Object, 9), &state())
        .unwrap();
    let image = FitsImage::open(&path).unwrap();
    assert_eq!(image.header.get_int("NFRAME"), Some(9));
}

#[test]
fn test_empty_frame_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("empty.fits");
    let mut frame = sensor_frame(ExposureType::Object, 1);
    frame.pixels = Vec::new();

    let err = ImageWriter::new().write(&path, &frame, &state()).unwrap_err();
    assert!(matches!(err, StorageError::NoData));
    assert!(!path.exists());
}
