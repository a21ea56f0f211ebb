use std::io;

/// Errors from ring construction.
///
/// These are all fatal: no backing region is mapped when construction
/// fails. Fullness and emptiness during use are not errors and are
/// reported through return values instead.
#[derive(Debug)]
pub enum ConfigError {
    /// Capacity must be at least one slot.
    ZeroCapacity,
    /// Cells must be at least one byte.
    ZeroCellSize,
    /// A structured layout needs at least one field.
    EmptyLayout,
    /// `(capacity + 1) * cell_size` does not fit in `usize`.
    RegionSize { capacity: u32, cell_size: usize },
    /// The backing mapping could not be established.
    Map(io::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroCapacity => write!(f, "capacity must be > 0"),
            Self::ZeroCellSize => write!(f, "cell size must be > 0"),
            Self::EmptyLayout => write!(f, "field layout must not be empty"),
            Self::RegionSize {
                capacity,
                cell_size,
            } => {
                write!(
                    f,
                    "region size overflow: {} slots of {} bytes",
                    *capacity as u64 + 1,
                    cell_size
                )
            }
            Self::Map(e) => write!(f, "failed to map shared region: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Map(e) => Some(e),
            _ => None,
        }
    }
}
