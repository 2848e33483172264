use serde::{Deserialize, Serialize};
use std::fmt;

/// Editor buffer number.
///
/// Stable for the lifetime of the buffer. The editor may reuse a number
/// after the buffer is wiped, which is why the registry exposes an explicit
/// discard operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BufferId(pub u32);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for BufferId {
    fn from(number: u32) -> Self {
        Self(number)
    }
}

/// Source of per-buffer change ticks.
///
/// The editor bumps a buffer's tick on every modification. Ticks only ever
/// grow, so comparing the tick recorded at dispatch time against the current
/// one tells whether a buffer was edited since.
///
/// # Examples
///
/// ```
/// use bufsync_core::{BufferId, ChangeTickOracle};
///
/// struct Frozen;
///
/// impl ChangeTickOracle for Frozen {
///     fn change_tick(&self, _buffer: BufferId) -> u64 {
///         7
///     }
/// }
///
/// assert_eq!(Frozen.change_tick(BufferId(1)), 7);
/// ```
pub trait ChangeTickOracle: Send + Sync {
    /// Returns the current change tick of `buffer`.
    fn change_tick(&self, buffer: BufferId) -> u64;
}

/// Classifies a buffer by the filetypes the editor assigned to it.
///
/// A buffer can carry several filetypes (e.g. `cpp.doxygen` splits into
/// `cpp` and `doxygen`).
pub trait FiletypeClassifier: Send + Sync {
    /// Returns every filetype of `buffer`, possibly empty.
    fn filetypes(&self, buffer: BufferId) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_id_display() {
        assert_eq!(BufferId(42).to_string(), "42");
    }

    #[test]
    fn test_buffer_id_serde_transparent() {
        let id: BufferId = serde_json::from_str("3").unwrap();
        assert_eq!(id, BufferId(3));
        assert_eq!(serde_json::to_string(&id).unwrap(), "3");
    }

    #[test]
    fn test_buffer_id_from_u32() {
        assert_eq!(BufferId::from(9), BufferId(9));
    }
}
