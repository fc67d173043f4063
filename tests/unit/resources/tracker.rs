use super::*;
use crate::codec::nifti::NiftiHeader;
use crate::codec::voxel::VoxelData;

fn image_with_data(path: &str) -> VolumeImage {
    VolumeImage::from_parts(
        path,
        NiftiHeader::default(),
        Vec::new(),
        Some(VoxelData::Uint8(vec![1, 2, 3])),
    )
}

#[test]
fn register_and_borrow_buffers() {
    let mut tracker = ResourceTracker::new(None);
    let a = tracker.register_buffer("A", vec![1.0, 2.0]).unwrap();
    let b = tracker.register_buffer("B", vec![0.0; 4]).unwrap();

    assert_ne!(a, b);
    assert_eq!(tracker.buffer(a).unwrap(), &[1.0, 2.0]);
    assert_eq!(tracker.buffer_label(b).unwrap(), "B");
    assert_eq!(tracker.allocated_bytes(), 6 * 4);

    tracker.buffer_mut(b).unwrap()[3] = 7.0;
    assert_eq!(tracker.buffer(b).unwrap()[3], 7.0);
}

#[test]
fn capacity_bound_is_enforced_per_registry() {
    let ledger = Arc::new(ResourceLedger::default());
    let mut tracker = ResourceTracker::with_ledger(Some(1), ledger.clone());
    tracker.register_buffer("A", vec![0.0]).unwrap();

    let err = tracker.register_buffer("B", vec![0.0]).unwrap_err();
    assert!(matches!(
        err,
        IcaError::CapacityExceeded {
            kind: ResourceKind::Buffer,
            capacity: 1
        }
    ));

    // The image registry has its own bound.
    tracker.register_image("I", image_with_data("a.nii")).unwrap();
    let err = tracker
        .register_image("J", image_with_data("b.nii"))
        .unwrap_err();
    assert!(err.to_string().contains("image registry"));

    drop(tracker);
    let snap = ledger.snapshot();
    assert_eq!(snap.buffers_registered, 1);
    assert_eq!(snap.outstanding_buffers(), 0);
    assert_eq!(snap.outstanding_images(), 0);
}

#[test]
fn release_all_releases_each_entry_once() {
    let ledger = Arc::new(ResourceLedger::default());
    let mut tracker = ResourceTracker::with_ledger(None, ledger.clone());
    let a = tracker.register_buffer("A", vec![0.0; 3]).unwrap();
    tracker.register_buffer("B", vec![0.0; 3]).unwrap();
    tracker.register_image("I", image_with_data("x.nii")).unwrap();

    assert_eq!(tracker.release_all_buffers(), 2);
    assert_eq!(tracker.release_all_buffers(), 0);
    assert!(matches!(tracker.buffer(a), Err(IcaError::Resource(_))));
    assert_eq!(tracker.allocated_bytes(), 0);

    assert_eq!(tracker.release_all_images(), 1);
    drop(tracker);

    let snap = ledger.snapshot();
    assert_eq!(snap.buffers_released, 2);
    assert_eq!(snap.images_released, 1);
    assert_eq!(snap.attached_data_released, 1);
}

#[test]
fn handles_are_not_reused_after_release() {
    let mut tracker = ResourceTracker::new(None);
    let old = tracker.register_buffer("A", vec![1.0]).unwrap();
    tracker.release_all_buffers();
    let new = tracker.register_buffer("B", vec![2.0]).unwrap();
    assert_ne!(old, new);
    assert!(tracker.buffer(old).is_err());
    assert_eq!(tracker.buffer(new).unwrap(), &[2.0]);
}

#[test]
fn drop_releases_everything() {
    let ledger = Arc::new(ResourceLedger::default());
    {
        let mut tracker = ResourceTracker::with_ledger(None, ledger.clone());
        tracker.register_buffer("A", vec![0.0]).unwrap();
        let id = tracker.register_image("I", image_with_data("y.nii")).unwrap();
        tracker.image_mut(id).unwrap().take_data();
    }
    let snap = ledger.snapshot();
    assert_eq!(snap.outstanding_buffers(), 0);
    assert_eq!(snap.outstanding_images(), 0);
    // Data was taken before teardown, so no attached data was released with the image.
    assert_eq!(snap.attached_data_released, 0);
}

#[test]
fn checkout_hands_out_disjoint_borrows() {
    let mut tracker = ResourceTracker::new(None);
    let input = tracker.register_buffer("IN", vec![1.0, 2.0]).unwrap();
    let output = tracker.register_buffer("OUT", vec![0.0, 0.0]).unwrap();

    {
        let mut co = tracker.checkout();
        let src = co.shared(input).unwrap();
        let dst = co.exclusive(output).unwrap();
        dst.copy_from_slice(src);

        assert!(matches!(co.exclusive(input), Err(IcaError::Resource(_))));
        assert!(co.shared(BufferId(99)).is_err());
    }

    assert_eq!(tracker.buffer(output).unwrap(), &[1.0, 2.0]);
}
