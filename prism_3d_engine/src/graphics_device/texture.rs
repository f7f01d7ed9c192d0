/// Texture vocabulary shared by resources and backends

/// Component type of one pixel channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    /// 8-bit unsigned normalized
    Byte,
    /// 16-bit float
    Float16,
    /// 32-bit float
    Float32,
}

impl PixelType {
    /// Size of one channel in bytes
    pub fn size(self) -> usize {
        match self {
            PixelType::Byte => 1,
            PixelType::Float16 => 2,
            PixelType::Float32 => 4,
        }
    }
}

/// Pixel layout: channel type and channel count (1-4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormat {
    pixel_type: PixelType,
    cardinality: u8,
}

impl PixelFormat {
    pub const R8: PixelFormat = PixelFormat { pixel_type: PixelType::Byte, cardinality: 1 };
    pub const RG8: PixelFormat = PixelFormat { pixel_type: PixelType::Byte, cardinality: 2 };
    pub const RGB8: PixelFormat = PixelFormat { pixel_type: PixelType::Byte, cardinality: 3 };
    pub const RGBA8: PixelFormat = PixelFormat { pixel_type: PixelType::Byte, cardinality: 4 };
    pub const R16F: PixelFormat = PixelFormat { pixel_type: PixelType::Float16, cardinality: 1 };
    pub const RGB16F: PixelFormat = PixelFormat { pixel_type: PixelType::Float16, cardinality: 3 };
    pub const RGBA16F: PixelFormat = PixelFormat { pixel_type: PixelType::Float16, cardinality: 4 };
    pub const R32F: PixelFormat = PixelFormat { pixel_type: PixelType::Float32, cardinality: 1 };
    pub const RGB32F: PixelFormat = PixelFormat { pixel_type: PixelType::Float32, cardinality: 3 };
    pub const RGBA32F: PixelFormat = PixelFormat { pixel_type: PixelType::Float32, cardinality: 4 };

    /// Build a pixel format, rejecting cardinalities outside 1..=4
    pub fn new(pixel_type: PixelType, cardinality: u8) -> Option<Self> {
        (1..=4)
            .contains(&cardinality)
            .then_some(Self { pixel_type, cardinality })
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    pub fn cardinality(&self) -> u8 {
        self.cardinality
    }

    /// Size of one pixel in bytes
    pub fn size(&self) -> usize {
        self.pixel_type.size() * self.cardinality as usize
    }

    /// Whether a texture in this format can back a depth attachment
    pub fn is_depth_compatible(&self) -> bool {
        self.cardinality == 1
    }
}

impl Default for PixelFormat {
    fn default() -> Self {
        PixelFormat::RGBA8
    }
}

/// Interpretation of stored color values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorSpace {
    /// Gamma-encoded (sRGB)
    #[default]
    NonLinear,
    /// Linear
    Linear,
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFilter {
    Nearest,
    #[default]
    Linear,
}

/// Side of a cube texture, in upload order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeSide {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeSide {
    /// All six sides in upload order
    pub const ALL: [CubeSide; 6] = [
        CubeSide::PositiveX,
        CubeSide::NegativeX,
        CubeSide::PositiveY,
        CubeSide::NegativeY,
        CubeSide::PositiveZ,
        CubeSide::NegativeZ,
    ];

    /// Position of the side in [`CubeSide::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Dimensionality of a GPU texture object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Texture2,
    Texture3,
    Cube,
}

/// Intended use of a texture at upload time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureUsage {
    /// Color texture, sampled or used as a color attachment
    #[default]
    Color,
    /// Depth texture backing a depth attachment
    Depth,
}

/// Everything a backend needs to create a texture object
///
/// `layers` holds one entry per 2D image: one for `Texture2`, `depth` for
/// `Texture3`, six for `Cube` (in [`CubeSide::ALL`] order). `None` leaves the
/// storage uninitialized.
#[derive(Debug, Clone)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub kind: TextureKind,
    pub usage: TextureUsage,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub pixel_format: PixelFormat,
    pub color_space: ColorSpace,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    pub mipmapped: bool,
    pub wrapped: bool,
    pub layers: Vec<Option<&'a [u8]>>,
}

impl TextureDesc<'_> {
    /// Bytes of GPU storage, excluding mipmaps
    pub fn byte_size(&self) -> usize {
        let images = match self.kind {
            TextureKind::Texture2 => 1,
            TextureKind::Texture3 => self.depth as usize,
            TextureKind::Cube => 6,
        };
        self.width as usize * self.height as usize * images * self.pixel_format.size()
    }
}

/// One 2D image inside a texture object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureImageTarget {
    /// The single image of a 2D texture
    Texture2,
    /// One layer of a 3D texture
    Layer(u32),
    /// One side of a cube texture
    CubeSide(CubeSide),
}

impl TextureImageTarget {
    /// Texture kind owning this image
    pub fn kind(&self) -> TextureKind {
        match self {
            TextureImageTarget::Texture2 => TextureKind::Texture2,
            TextureImageTarget::Layer(_) => TextureKind::Texture3,
            TextureImageTarget::CubeSide(_) => TextureKind::Cube,
        }
    }
}
