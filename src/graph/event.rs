//! Pass priority keys.

use std::fmt;

/// Priority key controlling where a pass runs in the camera's pass chain.
///
/// Events are plain integers so externally authored passes can slot
/// themselves between the named points, e.g.
/// `RenderPassEvent::AFTER_RENDERING_OPAQUES.offset(1)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RenderPassEvent(i32);

impl RenderPassEvent {
    pub const BEFORE_RENDERING: Self = Self(0);
    pub const BEFORE_RENDERING_SHADOWS: Self = Self(50);
    pub const AFTER_RENDERING_SHADOWS: Self = Self(100);
    pub const BEFORE_RENDERING_PRE_PASSES: Self = Self(150);
    pub const AFTER_RENDERING_PRE_PASSES: Self = Self(200);
    pub const BEFORE_RENDERING_GBUFFER: Self = Self(210);
    pub const AFTER_RENDERING_GBUFFER: Self = Self(220);
    pub const BEFORE_RENDERING_DEFERRED_LIGHTS: Self = Self(230);
    pub const AFTER_RENDERING_DEFERRED_LIGHTS: Self = Self(240);
    pub const BEFORE_RENDERING_OPAQUES: Self = Self(250);
    pub const AFTER_RENDERING_OPAQUES: Self = Self(300);
    pub const BEFORE_RENDERING_SKYBOX: Self = Self(350);
    pub const AFTER_RENDERING_SKYBOX: Self = Self(400);
    pub const BEFORE_RENDERING_TRANSPARENTS: Self = Self(450);
    pub const AFTER_RENDERING_TRANSPARENTS: Self = Self(500);
    pub const BEFORE_RENDERING_POST_PROCESSING: Self = Self(550);
    pub const AFTER_RENDERING_POST_PROCESSING: Self = Self(600);
    pub const AFTER_RENDERING: Self = Self(1000);

    /// Create an event from a raw priority.
    pub const fn from_raw(value: i32) -> Self {
        Self(value)
    }

    /// Raw priority value.
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Event shifted by `delta` priority steps.
    pub const fn offset(self, delta: i32) -> Self {
        Self(self.0 + delta)
    }

    fn label(self) -> Option<&'static str> {
        Some(match self {
            Self::BEFORE_RENDERING => "BeforeRendering",
            Self::BEFORE_RENDERING_SHADOWS => "BeforeRenderingShadows",
            Self::AFTER_RENDERING_SHADOWS => "AfterRenderingShadows",
            Self::BEFORE_RENDERING_PRE_PASSES => "BeforeRenderingPrePasses",
            Self::AFTER_RENDERING_PRE_PASSES => "AfterRenderingPrePasses",
            Self::BEFORE_RENDERING_GBUFFER => "BeforeRenderingGbuffer",
            Self::AFTER_RENDERING_GBUFFER => "AfterRenderingGbuffer",
            Self::BEFORE_RENDERING_DEFERRED_LIGHTS => "BeforeRenderingDeferredLights",
            Self::AFTER_RENDERING_DEFERRED_LIGHTS => "AfterRenderingDeferredLights",
            Self::BEFORE_RENDERING_OPAQUES => "BeforeRenderingOpaques",
            Self::AFTER_RENDERING_OPAQUES => "AfterRenderingOpaques",
            Self::BEFORE_RENDERING_SKYBOX => "BeforeRenderingSkybox",
            Self::AFTER_RENDERING_SKYBOX => "AfterRenderingSkybox",
            Self::BEFORE_RENDERING_TRANSPARENTS => "BeforeRenderingTransparents",
            Self::AFTER_RENDERING_TRANSPARENTS => "AfterRenderingTransparents",
            Self::BEFORE_RENDERING_POST_PROCESSING => "BeforeRenderingPostProcessing",
            Self::AFTER_RENDERING_POST_PROCESSING => "AfterRenderingPostProcessing",
            Self::AFTER_RENDERING => "AfterRendering",
            _ => return None,
        })
    }
}

impl fmt::Debug for RenderPassEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => write!(f, "{label}"),
            None => write!(f, "RenderPassEvent({})", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_ordering() {
        assert!(RenderPassEvent::BEFORE_RENDERING_SHADOWS < RenderPassEvent::BEFORE_RENDERING_PRE_PASSES);
        assert!(RenderPassEvent::AFTER_RENDERING_PRE_PASSES < RenderPassEvent::BEFORE_RENDERING_GBUFFER);
        assert!(RenderPassEvent::AFTER_RENDERING_DEFERRED_LIGHTS < RenderPassEvent::BEFORE_RENDERING_OPAQUES);
        assert!(RenderPassEvent::AFTER_RENDERING_SKYBOX < RenderPassEvent::BEFORE_RENDERING_TRANSPARENTS);
        assert!(RenderPassEvent::AFTER_RENDERING_POST_PROCESSING < RenderPassEvent::AFTER_RENDERING);
    }

    #[test]
    fn test_event_offset_and_debug() {
        let event = RenderPassEvent::AFTER_RENDERING.offset(2);
        assert_eq!(event.raw(), 1002);
        assert_eq!(format!("{:?}", event), "RenderPassEvent(1002)");
        assert_eq!(
            format!("{:?}", RenderPassEvent::BEFORE_RENDERING_OPAQUES),
            "BeforeRenderingOpaques"
        );
    }
}
