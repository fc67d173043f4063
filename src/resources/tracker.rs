use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::codec::VolumeImage;
use crate::foundation::error::{IcaError, IcaResult, ResourceKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Handle of a buffer owned by a [`ResourceTracker`].
pub struct BufferId(usize);

impl std::fmt::Display for BufferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Handle of an image owned by a [`ResourceTracker`].
pub struct ImageId(usize);

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "image#{}", self.0)
    }
}

#[derive(Debug, Default)]
/// Shared registration/release counters.
///
/// A ledger outlives the tracker it is attached to, so callers can check after teardown that
/// every registered resource was released exactly once.
pub struct ResourceLedger {
    buffers_registered: AtomicUsize,
    buffers_released: AtomicUsize,
    images_registered: AtomicUsize,
    images_released: AtomicUsize,
    attached_data_released: AtomicUsize,
}

impl ResourceLedger {
    /// Current counter values.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            buffers_registered: self.buffers_registered.load(Ordering::SeqCst),
            buffers_released: self.buffers_released.load(Ordering::SeqCst),
            images_registered: self.images_registered.load(Ordering::SeqCst),
            images_released: self.images_released.load(Ordering::SeqCst),
            attached_data_released: self.attached_data_released.load(Ordering::SeqCst),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
/// Point-in-time copy of a [`ResourceLedger`].
pub struct LedgerSnapshot {
    /// Buffers accepted by `register_buffer`.
    pub buffers_registered: usize,
    /// Buffers dropped by the tracker.
    pub buffers_released: usize,
    /// Images accepted by `register_image`.
    pub images_registered: usize,
    /// Images dropped by the tracker.
    pub images_released: usize,
    /// Images that still had voxel data attached when released.
    pub attached_data_released: usize,
}

impl LedgerSnapshot {
    /// Buffers registered but not yet released.
    pub fn outstanding_buffers(&self) -> usize {
        self.buffers_registered.saturating_sub(self.buffers_released)
    }

    /// Images registered but not yet released.
    pub fn outstanding_images(&self) -> usize {
        self.images_registered.saturating_sub(self.images_released)
    }
}

#[derive(Debug)]
struct BufferSlot {
    label: &'static str,
    data: Vec<f32>,
}

#[derive(Debug)]
struct ImageSlot {
    label: &'static str,
    image: VolumeImage,
}

/// Sole owner of every buffer and image loaded during a run.
///
/// Handles are never reused: a released slot stays empty, so a stale handle fails with
/// [`IcaError::Resource`] instead of aliasing a newer entry. Dropping the tracker releases every
/// live entry, which is what guarantees cleanup on early returns.
#[derive(Debug)]
pub struct ResourceTracker {
    capacity: Option<usize>,
    buffers: Vec<Option<BufferSlot>>,
    images: Vec<Option<ImageSlot>>,
    live_buffers: usize,
    live_images: usize,
    ledger: Arc<ResourceLedger>,
}

impl ResourceTracker {
    /// Tracker with an optional per-registry bound and a private ledger.
    pub fn new(capacity: Option<usize>) -> Self {
        Self::with_ledger(capacity, Arc::new(ResourceLedger::default()))
    }

    /// Tracker reporting into a caller-supplied ledger.
    pub fn with_ledger(capacity: Option<usize>, ledger: Arc<ResourceLedger>) -> Self {
        Self {
            capacity,
            buffers: Vec::new(),
            images: Vec::new(),
            live_buffers: 0,
            live_images: 0,
            ledger,
        }
    }

    /// Ledger this tracker reports into.
    pub fn ledger(&self) -> &Arc<ResourceLedger> {
        &self.ledger
    }

    /// Take ownership of `data`.
    ///
    /// When the registry is full the buffer is dropped before returning the error.
    pub fn register_buffer(&mut self, label: &'static str, data: Vec<f32>) -> IcaResult<BufferId> {
        if let Some(capacity) = self.capacity.filter(|&c| self.live_buffers >= c) {
            drop(data);
            return Err(IcaError::CapacityExceeded {
                kind: ResourceKind::Buffer,
                capacity,
            });
        }

        let id = BufferId(self.buffers.len());
        tracing::debug!(%id, label, len = data.len(), "registered buffer");
        self.buffers.push(Some(BufferSlot { label, data }));
        self.live_buffers += 1;
        self.ledger.buffers_registered.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    /// Take ownership of `image` (and of any voxel data still attached to it).
    pub fn register_image(
        &mut self,
        label: &'static str,
        image: VolumeImage,
    ) -> IcaResult<ImageId> {
        if let Some(capacity) = self.capacity.filter(|&c| self.live_images >= c) {
            drop(image);
            return Err(IcaError::CapacityExceeded {
                kind: ResourceKind::Image,
                capacity,
            });
        }

        let id = ImageId(self.images.len());
        tracing::debug!(%id, label, path = %image.path().display(), "registered image");
        self.images.push(Some(ImageSlot { label, image }));
        self.live_images += 1;
        self.ledger.images_registered.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    fn buffer_slot(&self, id: BufferId) -> IcaResult<&BufferSlot> {
        self.buffers
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| IcaError::resource(format!("{id} is not live")))
    }

    /// Borrow a buffer.
    pub fn buffer(&self, id: BufferId) -> IcaResult<&[f32]> {
        Ok(&self.buffer_slot(id)?.data)
    }

    /// Label given at registration.
    pub fn buffer_label(&self, id: BufferId) -> IcaResult<&'static str> {
        Ok(self.buffer_slot(id)?.label)
    }

    /// Mutably borrow a buffer.
    pub fn buffer_mut(&mut self, id: BufferId) -> IcaResult<&mut [f32]> {
        self.buffers
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .map(|slot| slot.data.as_mut_slice())
            .ok_or_else(|| IcaError::resource(format!("{id} is not live")))
    }

    /// Borrow an image.
    pub fn image(&self, id: ImageId) -> IcaResult<&VolumeImage> {
        self.images
            .get(id.0)
            .and_then(Option::as_ref)
            .map(|slot| &slot.image)
            .ok_or_else(|| IcaError::resource(format!("{id} is not live")))
    }

    /// Mutably borrow an image, e.g. to take its voxel data.
    pub fn image_mut(&mut self, id: ImageId) -> IcaResult<&mut VolumeImage> {
        self.images
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .map(|slot| &mut slot.image)
            .ok_or_else(|| IcaError::resource(format!("{id} is not live")))
    }

    /// Number of live buffers.
    pub fn live_buffers(&self) -> usize {
        self.live_buffers
    }

    /// Number of live images.
    pub fn live_images(&self) -> usize {
        self.live_images
    }

    /// Bytes held by live buffers.
    pub fn allocated_bytes(&self) -> usize {
        self.buffers
            .iter()
            .flatten()
            .map(|slot| slot.data.len() * std::mem::size_of::<f32>())
            .sum()
    }

    /// Borrow several buffers at once, each at most once.
    pub fn checkout(&mut self) -> BufferCheckout<'_> {
        BufferCheckout {
            slots: self
                .buffers
                .iter_mut()
                .map(|slot| slot.as_mut().map(|s| &mut s.data))
                .collect(),
        }
    }

    /// Drop every live buffer in registration order. Returns how many were released.
    pub fn release_all_buffers(&mut self) -> usize {
        let mut released = 0;
        for slot in self.buffers.iter_mut() {
            if let Some(slot) = slot.take() {
                tracing::trace!(label = slot.label, "released buffer");
                drop(slot);
                released += 1;
            }
        }
        self.live_buffers = 0;
        self.ledger
            .buffers_released
            .fetch_add(released, Ordering::SeqCst);
        released
    }

    /// Drop every live image in registration order. Returns how many were released.
    pub fn release_all_images(&mut self) -> usize {
        let mut released = 0;
        let mut with_data = 0;
        for slot in self.images.iter_mut() {
            if let Some(slot) = slot.take() {
                if slot.image.has_data() {
                    with_data += 1;
                }
                tracing::trace!(label = slot.label, "released image");
                drop(slot);
                released += 1;
            }
        }
        self.live_images = 0;
        self.ledger
            .images_released
            .fetch_add(released, Ordering::SeqCst);
        self.ledger
            .attached_data_released
            .fetch_add(with_data, Ordering::SeqCst);
        released
    }
}

impl Drop for ResourceTracker {
    fn drop(&mut self) {
        let buffers = self.release_all_buffers();
        let images = self.release_all_images();
        if buffers + images > 0 {
            tracing::debug!(buffers, images, "resource tracker released remaining entries");
        }
    }
}

/// Disjoint borrows of tracked buffers, obtained from [`ResourceTracker::checkout`].
pub struct BufferCheckout<'a> {
    slots: Vec<Option<&'a mut Vec<f32>>>,
}

impl<'a> BufferCheckout<'a> {
    fn take(&mut self, id: BufferId) -> IcaResult<&'a mut Vec<f32>> {
        match self.slots.get_mut(id.0) {
            Some(slot) => slot.take().ok_or_else(|| {
                IcaError::resource(format!("{id} is not live or already checked out"))
            }),
            None => Err(IcaError::resource(format!("{id} is not live"))),
        }
    }

    /// Mutable borrow of one buffer.
    pub fn exclusive(&mut self, id: BufferId) -> IcaResult<&'a mut [f32]> {
        Ok(self.take(id)?.as_mut_slice())
    }

    /// Shared borrow of one buffer.
    pub fn shared(&mut self, id: BufferId) -> IcaResult<&'a [f32]> {
        Ok(self.take(id)?.as_slice())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resources/tracker.rs"]
mod tests;
