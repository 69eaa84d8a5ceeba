//! Render pass trait and execution context.

use bitflags::bitflags;

use crate::backend::{Backend, BackendCommand, DrawQueue, RenderTarget, TextureHandle};
use crate::camera::CameraFrameConfig;
use crate::error::FrameResult;
use crate::globals::{GlobalTexture, ShaderGlobals};
use crate::resources::{FrameResourceSet, ResourceAllocator, TargetSlot};

use super::RenderPassEvent;

bitflags! {
    /// Auxiliary camera buffers a pass reads.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PassInput: u32 {
        /// Camera depth texture.
        const DEPTH = 1 << 0;
        /// View-space normals texture.
        const NORMAL = 1 << 1;
        /// Opaque color copy.
        const COLOR = 1 << 2;
        /// Motion vectors texture.
        const MOTION = 1 << 3;
    }
}

/// A unit of GPU work in a camera's pass chain.
///
/// Built-in passes and externally authored passes implement the same trait.
/// A pass declares its priority key and input needs up front; the
/// orchestrator uses them to allocate auxiliary targets and to sort the
/// chain before anything executes.
pub trait RenderPass: Send {
    /// Pass name for debugging and command logs.
    fn name(&self) -> &str;

    /// Priority key.
    fn event(&self) -> RenderPassEvent;

    /// Auxiliary buffers this pass reads.
    fn input(&self) -> PassInput {
        PassInput::empty()
    }

    /// Returns true if this pass samples the color copy with the
    /// orientation of the opaque target. Forces the copy to exist.
    fn requires_unflipped_color(&self) -> bool {
        false
    }

    /// Returns true if this pass reads main or additional light data.
    ///
    /// The pending clustering job is joined before the first such pass runs.
    fn reads_light_data(&self) -> bool {
        false
    }

    /// Record the pass.
    fn execute(&self, ctx: &mut PassExecuteContext<'_>) -> FrameResult<()>;
}

impl std::fmt::Debug for dyn RenderPass + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPass")
            .field("name", &self.name())
            .field("event", &self.event())
            .field("input", &self.input())
            .finish()
    }
}

/// Context for executing a render pass.
///
/// Gives read access to the frame resources and GPU-global bindings and
/// records commands into the backend.
pub struct PassExecuteContext<'a> {
    backend: &'a mut dyn Backend,
    allocator: &'a mut ResourceAllocator,
    globals: &'a mut ShaderGlobals,
    camera: &'a CameraFrameConfig,
    frame_index: u64,
    intermediate: bool,
}

impl<'a> PassExecuteContext<'a> {
    pub(crate) fn new(
        backend: &'a mut dyn Backend,
        allocator: &'a mut ResourceAllocator,
        globals: &'a mut ShaderGlobals,
        camera: &'a CameraFrameConfig,
        frame_index: u64,
        intermediate: bool,
    ) -> Self {
        Self {
            backend,
            allocator,
            globals,
            camera,
            frame_index,
            intermediate,
        }
    }

    /// Camera being rendered.
    pub fn camera(&self) -> &CameraFrameConfig {
        self.camera
    }

    /// GPU-global bindings as seen by shaders.
    pub fn globals(&self) -> &ShaderGlobals {
        self.globals
    }

    /// Monotonic frame counter.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Snapshot of the camera's frame resources.
    pub fn resources(&self) -> FrameResourceSet {
        self.allocator.frame_resources()
    }

    /// Resolve a frame resource, failing if it was not allocated this frame.
    pub fn texture(&self, slot: TargetSlot) -> FrameResult<TextureHandle> {
        self.allocator.frame_resources().get(slot)
    }

    /// Current color write target.
    pub fn color_target(&self) -> RenderTarget {
        match self.allocator.color_buffers().peek_back() {
            Some(back) if self.intermediate => RenderTarget::Texture(back),
            _ => RenderTarget::Backbuffer,
        }
    }

    /// Current depth attachment.
    pub fn depth_target(&self) -> RenderTarget {
        match self.allocator.get(TargetSlot::CameraDepth) {
            Some(depth) => RenderTarget::Texture(depth),
            None => RenderTarget::Backbuffer,
        }
    }

    /// The color buffer opposite the write target, allocated on first use.
    pub fn front_buffer(&mut self) -> FrameResult<TextureHandle> {
        self.allocator.front_color_buffer(&mut *self.backend)
    }

    /// Swap front and back color buffers and re-bind the global color texture.
    pub fn swap_color_buffers(&mut self) {
        self.allocator.swap_color_buffers();
        match self.allocator.color_buffers().peek_back() {
            Some(back) => self.globals.set_texture(GlobalTexture::CameraColor, back),
            None => self.globals.clear_texture(GlobalTexture::CameraColor),
        }
    }

    /// Record a raw backend command.
    pub fn record(&mut self, command: BackendCommand) {
        self.backend.submit(command);
    }

    /// Begin a pass writing at most one color attachment.
    pub fn begin_pass(
        &mut self,
        name: &str,
        event: RenderPassEvent,
        color: Option<RenderTarget>,
        depth: Option<RenderTarget>,
    ) {
        self.begin_multi_target_pass(name, event, color.into_iter().collect(), depth);
    }

    /// Begin a pass writing several color attachments at once.
    pub fn begin_multi_target_pass(
        &mut self,
        name: &str,
        event: RenderPassEvent,
        colors: Vec<RenderTarget>,
        depth: Option<RenderTarget>,
    ) {
        self.record(BackendCommand::BeginPass {
            name: name.to_string(),
            event,
            colors,
            depth,
        });
    }

    /// Draw a renderer list.
    pub fn draw(&mut self, queue: DrawQueue) {
        self.record(BackendCommand::Draw { queue });
    }

    /// Copy `src` into a frame texture, blitting when the source is the backbuffer.
    pub fn copy(&mut self, src: RenderTarget, dst: TextureHandle) {
        match src {
            RenderTarget::Texture(src) => self.record(BackendCommand::CopyTexture { src, dst }),
            RenderTarget::Backbuffer => self.record(BackendCommand::Blit {
                src,
                dst: RenderTarget::Texture(dst),
            }),
        }
    }

    /// Full-screen blit.
    pub fn blit(&mut self, src: RenderTarget, dst: RenderTarget) {
        self.record(BackendCommand::Blit { src, dst });
    }

    /// End the current pass.
    pub fn end_pass(&mut self) {
        self.record(BackendCommand::EndPass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_input_flags() {
        let input = PassInput::DEPTH | PassInput::MOTION;
        assert!(input.contains(PassInput::DEPTH));
        assert!(!input.contains(PassInput::NORMAL));
        assert_eq!(PassInput::default(), PassInput::empty());
    }
}
