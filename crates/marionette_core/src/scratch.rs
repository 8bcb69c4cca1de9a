//! Per-frame Scratch Memory
//!
//! Every temporary pose produced during one `GraphInstance::update` is carved
//! out of a caller-owned bump arena. The caller resets the arena once per frame
//! before updating any instance, which keeps steady-state evaluation free of
//! heap allocations.
//!
//! The engine only needs one capability from the arena: "give me N joint
//! transforms, or tell me you can't". Exhaustion is reported as `None` and
//! degrades the affected output for that frame instead of aborting.
//!
//! ```rust,ignore
//! let mut arena = bumpalo::Bump::with_capacity(instance.scratch_bytes_per_update());
//! loop {
//!     arena.reset();
//!     instance.update(dt, &arena);
//! }
//! ```

use bumpalo::Bump;

use crate::transform::JointTransform;

/// Source of frame-scoped pose buffers.
pub trait ScratchAllocator {
    /// Allocates `len` joint transforms initialised to `fill`.
    ///
    /// Returns `None` when the arena cannot satisfy the request.
    #[allow(clippy::mut_from_ref)]
    fn alloc_joints(&self, len: usize, fill: JointTransform) -> Option<&mut [JointTransform]>;
}

impl ScratchAllocator for Bump {
    #[allow(clippy::mut_from_ref)]
    fn alloc_joints(&self, len: usize, fill: JointTransform) -> Option<&mut [JointTransform]> {
        // The fallible variant honours `Bump::set_allocation_limit`.
        self.try_alloc_slice_fill_copy(len, fill).ok()
    }
}

/// Bytes needed for `poses` full poses of `joint_count` joints, including
/// per-allocation alignment slack.
#[must_use]
pub fn pose_bytes(joint_count: usize, poses: usize) -> usize {
    let size = std::mem::size_of::<JointTransform>();
    let align = std::mem::align_of::<JointTransform>();
    (joint_count * size + align) * poses
}
