/// Frame buffer vocabulary shared by resources and backends

use std::fmt;
use crate::graphics_device::{TextureId, TextureImageTarget};

/// Named attachment point of a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FrameBufferSlot {
    /// Color attachment 0..=15
    Color(u8),
    Depth,
}

impl FrameBufferSlot {
    /// Highest color attachment count
    pub const MAX_COLOR_ATTACHMENTS: u8 = 16;

    pub const COLOR0: FrameBufferSlot = FrameBufferSlot::Color(0);
    pub const COLOR1: FrameBufferSlot = FrameBufferSlot::Color(1);
    pub const COLOR2: FrameBufferSlot = FrameBufferSlot::Color(2);
    pub const COLOR3: FrameBufferSlot = FrameBufferSlot::Color(3);

    pub fn is_depth(&self) -> bool {
        matches!(self, FrameBufferSlot::Depth)
    }

    /// Color slot index, `None` for depth
    pub fn color_index(&self) -> Option<u8> {
        match self {
            FrameBufferSlot::Color(index) => Some(*index),
            FrameBufferSlot::Depth => None,
        }
    }
}

impl fmt::Display for FrameBufferSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameBufferSlot::Color(index) => write!(f, "Color{}", index),
            FrameBufferSlot::Depth => write!(f, "Depth"),
        }
    }
}

/// Texture image bound to a frame buffer slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachedImage {
    pub texture: TextureId,
    pub target: TextureImageTarget,
}

/// Result of a frame buffer completeness check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameBufferStatus {
    Complete,
    /// Driver description of the failure
    Incomplete(String),
}
