use super::*;
use crate::foundation::core::{Dims3, VoxelSize};

fn scratch(name: &str) -> PathBuf {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("target")
        .join("unit-codec");
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

fn float_header(w: usize, h: usize, d: usize, t: usize) -> NiftiHeader {
    let geometry = Geometry {
        dims: Dims3::new(w, h, d),
        timepoints: t,
        voxel_size: VoxelSize::default(),
    };
    NiftiHeader::for_geometry(&geometry, VoxelType::Float32).unwrap()
}

#[test]
fn write_then_read_keeps_samples_and_geometry() {
    let path = scratch("round_trip.nii");
    let hdr = float_header(2, 3, 1, 2);
    let samples: Vec<f32> = (0..12).map(|i| i as f32 * 0.5).collect();

    Nifti1Codec.write(&path, &hdr, &samples).unwrap();
    let img = Nifti1Codec.read(&path).unwrap();

    assert_eq!(img.geometry().dims, Dims3::new(2, 3, 1));
    assert_eq!(img.geometry().timepoints, 2);
    assert_eq!(img.voxel_type(), Some(VoxelType::Float32));
    assert_eq!(img.data(), Some(&VoxelData::Float32(samples)));
    assert!(img.extensions().is_empty());
}

#[test]
fn write_rejects_sample_count_mismatch() {
    let path = scratch("mismatch.nii");
    let err = Nifti1Codec
        .write(&path, &float_header(2, 2, 2, 1), &[0.0; 7])
        .unwrap_err();
    assert!(matches!(err, IcaError::InvalidArgument(_)));
}

#[test]
fn write_into_missing_directory_is_output_error() {
    let path = scratch("no-such-dir").join("deeper").join("x.nii");
    let err = Nifti1Codec
        .write(&path, &float_header(1, 1, 1, 1), &[1.0])
        .unwrap_err();
    assert!(matches!(err, IcaError::OutputWrite { .. }));
}

#[test]
fn missing_file_is_input_io() {
    let err = Nifti1Codec
        .read(&scratch("does_not_exist.nii"))
        .unwrap_err();
    assert!(matches!(err, IcaError::InputIo { .. }));
}

#[test]
fn gzip_output_is_written_and_read_transparently() {
    let path = scratch("compressed.nii.gz");
    let hdr = float_header(2, 2, 1, 3);
    let samples: Vec<f32> = (0..12).map(|i| i as f32 - 4.0).collect();

    Nifti1Codec.write(&path, &hdr, &samples).unwrap();
    let on_disk = std::fs::read(&path).unwrap();
    assert_eq!(&on_disk[..2], &[0x1f, 0x8b]);

    let img = Nifti1Codec.read(&path).unwrap();
    assert_eq!(img.geometry().timepoints, 3);
    assert_eq!(img.data(), Some(&VoxelData::Float32(samples.clone())));

    let decoded = Nifti1Codec.decode(&path, &on_disk).unwrap();
    assert_eq!(decoded.data(), Some(&VoxelData::Float32(samples)));
}

#[test]
fn header_image_pair_is_read_through_either_half() {
    let mut hdr = NiftiHeader::for_geometry(
        &Geometry {
            dims: Dims3::new(2, 2, 1),
            timepoints: 1,
            voxel_size: VoxelSize::default(),
        },
        VoxelType::Uint8,
    )
    .unwrap();
    hdr.vox_offset = 0.0;
    let mut header_bytes = hdr.to_le_bytes();
    header_bytes[344..348].copy_from_slice(b"ni1\0");
    std::fs::write(scratch("pair.hdr"), header_bytes).unwrap();
    std::fs::write(scratch("pair.img"), [1u8, 2, 3, 4]).unwrap();

    for name in ["pair.hdr", "pair.img"] {
        let img = Nifti1Codec.read(&scratch(name)).unwrap();
        assert_eq!(img.data(), Some(&VoxelData::Uint8(vec![1, 2, 3, 4])), "{name}");
        assert!(img.extensions().is_empty());
    }

    let err = Nifti1Codec.read(&scratch("unpaired.hdr")).unwrap_err();
    assert!(matches!(err, IcaError::InputIo { .. }));
}

/// A float header whose bytes are patched after encoding.
fn patched_header_bytes(patch: impl FnOnce(&mut [u8])) -> Vec<u8> {
    let mut bytes = encode_nifti1(&float_header(1, 1, 1, 1), VoxelView::Float32(&[1.0]));
    patch(&mut bytes);
    bytes
}

#[test]
fn huge_dimensions_are_unreadable_not_a_panic() {
    let bytes = patched_header_bytes(|b| {
        b[40..42].copy_from_slice(&7i16.to_le_bytes());
        for axis in 1..8 {
            let at = 40 + axis * 2;
            b[at..at + 2].copy_from_slice(&32767i16.to_le_bytes());
        }
    });
    let err = Nifti1Codec
        .decode(Path::new("huge.nii"), &bytes)
        .unwrap_err();
    assert!(matches!(err, IcaError::UnreadableImage { .. }), "{err}");
}

#[test]
fn absurd_vox_offset_is_unreadable_not_a_panic() {
    let bytes = patched_header_bytes(|b| b[108..112].copy_from_slice(&1e30f32.to_le_bytes()));
    let err = Nifti1Codec
        .decode(Path::new("offset.nii"), &bytes)
        .unwrap_err();
    assert!(matches!(err, IcaError::UnreadableImage { .. }), "{err}");
    assert!(err.to_string().contains("vox_offset"));
}

#[test]
fn corrupt_gzip_stream_is_unreadable() {
    let err = Nifti1Codec
        .decode(Path::new("func.nii.gz"), &[0x1f, 0x8b, 8, 0, 0, 0])
        .unwrap_err();
    assert!(matches!(err, IcaError::UnreadableImage { .. }));
    assert!(err.to_string().contains("gzip"));
}

#[test]
fn take_data_leaves_header_usable() {
    let hdr = float_header(1, 1, 1, 1);
    let mut img = VolumeImage::from_parts(
        "mem.nii",
        hdr.clone(),
        vec![NiftiExtension {
            code: 4,
            data: vec![0; 8],
        }],
        Some(VoxelData::Float32(vec![3.0])),
    );
    assert!(img.has_data());

    let data = img.take_data();
    assert_eq!(data, Some(VoxelData::Float32(vec![3.0])));
    assert!(!img.has_data());
    assert!(img.take_data().is_none());
    assert_eq!(img.header(), &hdr);

    img.free_extensions();
    assert!(img.extensions().is_empty());
}
