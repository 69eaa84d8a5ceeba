//! Camera pass chain.
//!
//! Every camera renders a flat list of passes. Built-in passes and passes
//! registered by external code share the same [`RenderPass`] trait and are
//! ordered by a single priority key, [`RenderPassEvent`].
//!
//! # Ordering
//!
//! The queue is compiled with a stable sort on the event. Passes with equal
//! events keep their registration order, so the orchestrator never reorders
//! work that was registered at the same slot.
//!
//! ```text
//! shadows -> prepasses -> [gbuffer -> deferred lights] -> opaques -> skybox
//!         -> depth/color copy -> transparents -> post -> composite -> overlay UI
//! ```

mod event;
mod pass;
mod queue;

pub use event::RenderPassEvent;
pub use pass::{PassExecuteContext, PassInput, RenderPass};
pub use queue::{CompiledQueue, PassHandle, PassQueue};
