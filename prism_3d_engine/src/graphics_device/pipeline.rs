/// Fixed-function pipeline state shared by resources and backends

use bitflags::bitflags;

/// Blend equation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendFunction {
    #[default]
    Add,
    Subtract,
}

/// Blend factor applied to the source or destination color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SourceColor,
    OneMinusSourceColor,
    DestinationColor,
    OneMinusDestinationColor,
    SourceAlpha,
    OneMinusSourceAlpha,
    DestinationAlpha,
    OneMinusDestinationAlpha,
}

/// How fragments are combined with the target's contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendMode {
    pub function: BlendFunction,
    pub source_factor: BlendFactor,
    pub destination_factor: BlendFactor,
}

impl BlendMode {
    pub const ADDITIVE: BlendMode = BlendMode {
        function: BlendFunction::Add,
        source_factor: BlendFactor::One,
        destination_factor: BlendFactor::One,
    };

    pub const ALPHA: BlendMode = BlendMode {
        function: BlendFunction::Add,
        source_factor: BlendFactor::SourceAlpha,
        destination_factor: BlendFactor::OneMinusSourceAlpha,
    };

    pub fn new(function: BlendFunction, source_factor: BlendFactor, destination_factor: BlendFactor) -> Self {
        Self { function, source_factor, destination_factor }
    }

    /// Source replaces destination; blending can stay disabled
    pub fn is_trivial(&self) -> bool {
        *self == Self::default()
    }
}

impl Default for BlendMode {
    fn default() -> Self {
        Self {
            function: BlendFunction::Add,
            source_factor: BlendFactor::One,
            destination_factor: BlendFactor::Zero,
        }
    }
}

/// Face culling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    None,
    #[default]
    CounterClockwise,
    Clockwise,
}

/// Viewport rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn from_size(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

bitflags! {
    /// Buffers affected by a clear
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearBuffers: u32 {
        const COLOR = 0b01;
        const DEPTH = 0b10;
    }
}
