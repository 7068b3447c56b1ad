use asct_common::CellPos;

/// Errors from addressed map and layer operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("position {pos} out of range for layer side {side}")]
    OutOfBounds { pos: CellPos, side: u32 },
    #[error("layer {0} does not exist")]
    NoSuchLayer(usize),
    #[error("invalid layer side {0}: must be between 1 and {max}", max = crate::config::MAX_LAYER_SIDE)]
    InvalidSide(u32),
}
