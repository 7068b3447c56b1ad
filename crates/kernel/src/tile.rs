//! Tiles: the atomic simulated unit of a layer.
//!
//! A tile is a [`TileKind`] tag plus capability records. Every tile has
//! [`Thermal`] state; power-capable kinds carry [`PowerState`], transistors
//! and logic gates add [`GateState`] and pixels add [`PixelState`].

use std::cmp::Ordering;

use asct_common::{AMBIENT_TEMPERATURE, CellPos, Rgb};
use serde::{Deserialize, Serialize};

/// Heat added to a tile each time it accepts a power value.
pub const SWITCHING_HEAT: f32 = 0.1;

/// Behavior tag of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileKind {
    /// Passive block: conducts heat, melts, never carries power.
    Static,
    /// Plain wire.
    Conductor,
    /// N-doped silicon; never feeds P-type.
    NType,
    /// P-doped silicon; feeds anything.
    PType,
    /// Gated switch armed by N-type and fired by P-type.
    Transistor,
    /// Transistor latched conductive; a one-way buffer.
    LogicGate,
    /// Light cell flooding power to same-colored pixels.
    Pixel,
}

impl TileKind {
    pub fn is_power_capable(self) -> bool {
        !matches!(self, TileKind::Static)
    }

    pub fn is_conductor_family(self) -> bool {
        matches!(
            self,
            TileKind::Conductor
                | TileKind::NType
                | TileKind::PType
                | TileKind::Transistor
                | TileKind::LogicGate
        )
    }

    /// Whether a powered tile of this kind forwards power onto a neighbor of
    /// kind `target`. Vias bypass this filter.
    pub fn forwards_to(self, target: TileKind) -> bool {
        match self {
            TileKind::NType => target != TileKind::PType,
            TileKind::Transistor => !matches!(target, TileKind::NType | TileKind::PType),
            TileKind::LogicGate => target != TileKind::NType,
            _ => true,
        }
    }

    /// Category a tile of this kind is listed under unless its content pack
    /// says otherwise.
    pub fn default_category(self) -> &'static str {
        match self {
            TileKind::Static | TileKind::Conductor | TileKind::Pixel => "structural",
            _ => "logic",
        }
    }
}

/// Heat and gravity state shared by every tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thermal {
    /// Current temperature in °C.
    pub temperature: f32,
    pub melting_temperature: f32,
    /// Fraction of temperature handed to a colder neighbor tile per contact.
    pub irradiation_ratio: f32,
    /// Fraction of temperature lost to an empty neighbor cell per contact.
    pub air_irradiation_ratio: f32,
    /// Base viscosity; lower falls faster once molten.
    pub viscosity: u32,
    /// Ticks to wait before the next fall, re-rolled after every attempt.
    pub fall_threshold: u32,
    /// Ticks counted towards `fall_threshold`.
    pub fall_ticks: u32,
}

impl Default for Thermal {
    fn default() -> Self {
        Self {
            temperature: AMBIENT_TEMPERATURE,
            melting_temperature: 200.0,
            irradiation_ratio: 0.025,
            air_irradiation_ratio: 0.015,
            viscosity: 2,
            fall_threshold: 2,
            fall_ticks: 0,
        }
    }
}

impl Thermal {
    pub fn is_molten(&self) -> bool {
        self.temperature > self.melting_temperature
    }
}

/// Refractory power state machine.
///
/// A receptive tile accepts the first power value written to it and then
/// ignores writes for `unpowered_delay` physical updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerState {
    pub powered: bool,
    pub can_receive_power: bool,
    pub unpowered_for: u32,
    pub unpowered_delay: u32,
}

impl Default for PowerState {
    fn default() -> Self {
        Self {
            powered: false,
            can_receive_power: true,
            unpowered_for: 0,
            unpowered_delay: 4,
        }
    }
}

impl PowerState {
    fn accept(&mut self, value: bool) -> bool {
        if !self.can_receive_power {
            return false;
        }
        self.powered = value;
        self.can_receive_power = false;
        self.unpowered_for = 0;
        true
    }

    fn advance(&mut self) {
        if self.can_receive_power {
            return;
        }
        self.unpowered_for += 1;
        if self.unpowered_for >= self.unpowered_delay {
            self.can_receive_power = true;
            self.unpowered_for = 0;
        }
    }

    fn reopen(&mut self) {
        self.can_receive_power = true;
        self.unpowered_for = 0;
    }
}

/// Transistor gate. Logic gates keep `conductive` latched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateState {
    pub conductive: bool,
    pub conductive_for: u32,
    pub conductive_delay: u32,
    /// Shown while armed but unpowered.
    pub conductive_color: Rgb,
    /// Inset color drawn over logic gates.
    pub inner_color: Option<Rgb>,
}

impl Default for GateState {
    fn default() -> Self {
        Self {
            conductive: false,
            conductive_for: 0,
            conductive_delay: 4,
            conductive_color: Rgb(220, 159, 255),
            inner_color: None,
        }
    }
}

/// Light cell state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelState {
    /// Armed whenever the powered value changes; cleared after one flood.
    pub spreading: bool,
    pub off_color: Rgb,
}

/// What an external renderer needs to draw one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderState {
    pub color: Rgb,
    pub inner: Option<Rgb>,
    pub via: bool,
}

/// One occupied cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    kind: TileKind,
    name: String,
    short_name: String,
    pos: CellPos,
    color: Rgb,
    pub thermal: Thermal,
    power: Option<PowerState>,
    gate: Option<GateState>,
    pixel: Option<PixelState>,
    /// Layer index of the via partner; it sits at the same position.
    via: Option<usize>,
}

impl Tile {
    fn with_kind(
        kind: TileKind,
        pos: CellPos,
        name: impl Into<String>,
        short_name: impl Into<String>,
        color: Rgb,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            short_name: short_name.into(),
            pos,
            color,
            thermal: Thermal::default(),
            power: kind.is_power_capable().then(PowerState::default),
            gate: None,
            pixel: None,
            via: None,
        }
    }

    pub fn static_block(
        pos: CellPos,
        name: impl Into<String>,
        short_name: impl Into<String>,
        color: Rgb,
    ) -> Self {
        Self::with_kind(TileKind::Static, pos, name, short_name, color)
    }

    pub fn conductor(
        pos: CellPos,
        name: impl Into<String>,
        short_name: impl Into<String>,
        color: Rgb,
    ) -> Self {
        Self::with_kind(TileKind::Conductor, pos, name, short_name, color)
    }

    pub fn n_silicon(pos: CellPos) -> Self {
        Self::with_kind(TileKind::NType, pos, "N-type Silicon", "NSLC", Rgb(50, 100, 230))
    }

    pub fn p_silicon(pos: CellPos) -> Self {
        Self::with_kind(TileKind::PType, pos, "P-type Silicon", "PSLC", Rgb(156, 10, 10))
    }

    pub fn transistor(pos: CellPos) -> Self {
        let mut tile =
            Self::with_kind(TileKind::Transistor, pos, "Transistor", "TRST", Rgb(103, 75, 120));
        tile.thermal.melting_temperature = 140.0;
        tile.gate = Some(GateState::default());
        tile
    }

    pub fn logic_gate(
        pos: CellPos,
        name: impl Into<String>,
        short_name: impl Into<String>,
        inner_color: Rgb,
    ) -> Self {
        let mut tile = Self::transistor(pos);
        tile.kind = TileKind::LogicGate;
        tile.name = name.into();
        tile.short_name = short_name.into();
        tile.gate = Some(GateState {
            conductive: true,
            inner_color: Some(inner_color),
            ..GateState::default()
        });
        tile
    }

    pub fn pixel(
        pos: CellPos,
        name: impl Into<String>,
        short_name: impl Into<String>,
        color: Rgb,
        off_color: Rgb,
    ) -> Self {
        let mut tile = Self::with_kind(TileKind::Pixel, pos, name, short_name, color);
        tile.pixel = Some(PixelState {
            spreading: true,
            off_color,
        });
        tile
    }

    /// Fresh copy of this tile at `pos`, without any via. Used to stamp
    /// registered prototypes into a layer.
    pub fn placed_at(&self, pos: CellPos) -> Self {
        Self {
            pos,
            via: None,
            ..self.clone()
        }
    }

    pub fn kind(&self) -> TileKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn pos(&self) -> CellPos {
        self.pos
    }

    pub(crate) fn set_pos(&mut self, pos: CellPos) {
        self.pos = pos;
    }

    /// Base color, independent of power state. Pixels flood across equal
    /// base colors.
    pub fn base_color(&self) -> Rgb {
        self.color
    }

    pub fn temperature(&self) -> f32 {
        self.thermal.temperature
    }

    pub fn set_temperature(&mut self, temperature: f32) {
        self.thermal.temperature = temperature;
    }

    pub fn power(&self) -> Option<&PowerState> {
        self.power.as_ref()
    }

    pub fn gate(&self) -> Option<&GateState> {
        self.gate.as_ref()
    }

    pub fn pixel_state(&self) -> Option<&PixelState> {
        self.pixel.as_ref()
    }

    pub fn is_powered(&self) -> bool {
        self.power.as_ref().is_some_and(|p| p.powered)
    }

    pub fn is_receptive(&self) -> bool {
        self.power.as_ref().is_some_and(|p| p.can_receive_power)
    }

    pub fn is_conductive(&self) -> bool {
        self.gate.as_ref().is_some_and(|g| g.conductive)
    }

    pub fn is_spreading(&self) -> bool {
        self.pixel.as_ref().is_some_and(|p| p.spreading)
    }

    pub fn via(&self) -> Option<usize> {
        self.via
    }

    pub(crate) fn set_via(&mut self, partner_layer: Option<usize>) {
        self.via = partner_layer;
    }

    /// Offer a power value to this tile. `source` is the kind of the tile
    /// forwarding the value, or `None` for a forced write or a pixel hop.
    /// Returns whether the tile switched.
    pub fn try_set_powered(&mut self, value: bool, source: Option<TileKind>) -> bool {
        match self.kind {
            TileKind::Static => false,
            TileKind::Transistor | TileKind::LogicGate => self.gated_set(value, source),
            TileKind::Pixel => self.pixel_set(value, source),
            _ => self.switch(value),
        }
    }

    fn switch(&mut self, value: bool) -> bool {
        let Some(power) = self.power.as_mut() else {
            return false;
        };
        if !power.accept(value) {
            return false;
        }
        self.thermal.temperature += SWITCHING_HEAT;
        true
    }

    fn gated_set(&mut self, value: bool, source: Option<TileKind>) -> bool {
        match source {
            Some(source) if self.is_receptive() => match source {
                TileKind::NType => {
                    if let Some(gate) = self.gate.as_mut() {
                        gate.conductive = true;
                        gate.conductive_for = 0;
                    }
                    false
                }
                TileKind::PType if self.is_conductive() => self.switch(true),
                _ => false,
            },
            _ => self.switch(value),
        }
    }

    fn pixel_set(&mut self, value: bool, source: Option<TileKind>) -> bool {
        let before = self.is_powered();
        let switched = match source {
            Some(TileKind::PType) => self.switch(true),
            Some(TileKind::NType) => self.switch(false),
            Some(_) => false,
            None => self.switch(value),
        };
        if self.is_powered() != before {
            if let Some(pixel) = self.pixel.as_mut() {
                pixel.spreading = true;
            }
        }
        switched
    }

    /// Conductor post-spread: a plain pulse emitter drops its power after
    /// forwarding it.
    pub(crate) fn finish_spread(&mut self) {
        if let Some(power) = self.power.as_mut() {
            power.powered = false;
        }
    }

    pub(crate) fn finish_flood(&mut self) {
        if let Some(pixel) = self.pixel.as_mut() {
            pixel.spreading = false;
        }
    }

    /// Advance the refractory counter and the transistor gate by one update.
    pub(crate) fn advance_timers(&mut self) {
        if let Some(power) = self.power.as_mut() {
            power.advance();
        }
        let Some(gate) = self.gate.as_mut() else {
            return;
        };
        if self.kind == TileKind::LogicGate {
            gate.conductive_for = 0;
            return;
        }
        if gate.conductive {
            gate.conductive_for += 1;
            if gate.conductive_for >= gate.conductive_delay {
                gate.conductive = false;
                gate.conductive_for = 0;
                if let Some(power) = self.power.as_mut() {
                    power.reopen();
                }
            }
        }
    }

    /// Color to draw right now: powered beats conductive beats base.
    pub fn display_color(&self) -> Rgb {
        match self.kind {
            TileKind::Static => self.color,
            TileKind::Pixel => match &self.pixel {
                Some(pixel) if !self.is_powered() => pixel.off_color,
                _ => self.color,
            },
            _ if self.is_powered() => Rgb::POWERED,
            _ => match &self.gate {
                Some(gate) if gate.conductive => gate.conductive_color,
                _ => self.color,
            },
        }
    }

    pub fn render_state(&self) -> RenderState {
        RenderState {
            color: self.display_color(),
            inner: self.gate.as_ref().and_then(|g| g.inner_color),
            via: self.via.is_some(),
        }
    }

    /// Catalog ordering: tiles sort by display name.
    pub fn cmp_by_name(&self, other: &Tile) -> Ordering {
        self.name.cmp(&other.name)
    }
}
