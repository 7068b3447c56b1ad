use serde::{Deserialize, Serialize};

/// Temperature of the surrounding air in °C. Tiles never heat the air and
/// cool towards this baseline.
pub const AMBIENT_TEMPERATURE: f32 = 27.0;

/// Integer cell coordinate inside a layer. `y` grows downwards, so "below"
/// is `y + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellPos {
    pub x: u32,
    pub y: u32,
}

impl CellPos {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Position shifted by `(dx, dy)`, or `None` if it would leave the
    /// non-negative quadrant. Upper bounds are checked by the owning layer.
    pub fn offset(self, dx: i32, dy: i32) -> Option<Self> {
        let x = self.x.checked_add_signed(dx)?;
        let y = self.y.checked_add_signed(dy)?;
        Some(Self { x, y })
    }

    /// The four axis neighbors in the fixed order left, right, up, down.
    /// Heat diffusion and propagation both depend on this order.
    pub fn axis_neighbors(self) -> [Option<Self>; 4] {
        [
            self.offset(-1, 0),
            self.offset(1, 0),
            self.offset(0, -1),
            self.offset(0, 1),
        ]
    }
}

impl std::fmt::Display for CellPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// 8-bit RGB color used for tile appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Color of any powered conductor-family tile.
    pub const POWERED: Rgb = Rgb(255, 191, 0);
    /// Outline drawn around tiles holding a via.
    pub const VIA_MARKER: Rgb = Rgb(255, 212, 0);

    /// `#rrggbb` form, handy for logs and text renderers.
    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}
