//! Pass queue and stable priority compilation.

use super::{RenderPass, RenderPassEvent};

/// Handle to a pass in a [`PassQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassHandle(u32);

impl PassHandle {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    /// Registration index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Passes registered for one camera, in registration order.
#[derive(Default)]
pub struct PassQueue {
    passes: Vec<Box<dyn RenderPass>>,
}

impl PassQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pass.
    pub fn enqueue(&mut self, pass: Box<dyn RenderPass>) -> PassHandle {
        let handle = PassHandle::new(self.passes.len() as u32);
        log::trace!("Enqueued pass '{}' at {:?}", pass.name(), pass.event());
        self.passes.push(pass);
        handle
    }

    /// Get a pass by handle.
    pub fn get(&self, handle: PassHandle) -> Option<&dyn RenderPass> {
        self.passes.get(handle.index()).map(|pass| pass.as_ref())
    }

    /// All passes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn RenderPass> {
        self.passes.iter().map(|pass| pass.as_ref())
    }

    /// Number of registered passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Returns true if no pass is registered.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Remove every pass, keeping the allocation.
    pub fn clear(&mut self) {
        self.passes.clear();
    }

    /// Move all passes out of `other`, appending them in order.
    pub fn append(&mut self, other: &mut PassQueue) {
        self.passes.append(&mut other.passes);
    }

    /// Compile the queue into an execution order.
    pub fn compile(&self) -> CompiledQueue {
        let mut result = CompiledQueue::default();
        compile_into(&self.passes, &mut result);
        result
    }
}

impl std::fmt::Debug for PassQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// A compiled pass queue ready for execution.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CompiledQueue {
    pass_order: Vec<PassHandle>,
}

impl CompiledQueue {
    /// Pass execution order as handles.
    pub fn pass_order(&self) -> &[PassHandle] {
        &self.pass_order
    }

    /// Number of passes.
    pub fn pass_count(&self) -> usize {
        self.pass_order.len()
    }

    /// Check if the compiled queue is empty.
    pub fn is_empty(&self) -> bool {
        self.pass_order.is_empty()
    }
}

/// Compile into an existing [`CompiledQueue`], reusing its allocation.
///
/// Passes are ordered by [`RenderPassEvent`]. The sort is stable: passes
/// sharing an event keep their registration order.
pub(crate) fn compile_into(passes: &[Box<dyn RenderPass>], target: &mut CompiledQueue) {
    target.pass_order.clear();
    target
        .pass_order
        .extend((0..passes.len() as u32).map(PassHandle::new));

    let events: Vec<RenderPassEvent> = passes.iter().map(|pass| pass.event()).collect();
    target.pass_order.sort_by_key(|handle| events[handle.index()]);
}
