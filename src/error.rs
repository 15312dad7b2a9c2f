use thiserror::Error;

/// Errors raised while parsing or validating a disposition template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispositionError {
    /// An entry did not follow the `x1xy1:x2xy2[~flags]` shape.
    #[error("malformed disposition entry `{0}`")]
    Malformed(String),

    /// The end corner of an entry lies before its start corner.
    #[error("disposition entry `{0}` ends before it starts")]
    Inverted(String),

    /// The flags suffix was not a valid bitmask.
    #[error("invalid disposition flags `{0}`")]
    Flags(String),

    /// The template contained no entries.
    #[error("disposition template is empty")]
    Empty,

    /// A frame extends beyond the grid it is laid out on.
    #[error("frame at {x}x{y} ({w}x{h}) exceeds the {cols}x{rows} grid")]
    OutOfBounds {
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        cols: u32,
        rows: u32,
    },

    /// Two frames claim the same grid cell.
    #[error("frames overlap at cell {x}x{y}")]
    Overlap { x: u32, y: u32 },
}
