//! Verbosity levels gating diagnostic output.
//!
//! All human-readable diagnostics in the crate are emitted through the
//! [`log`] facade, so the embedding application decides where they end up (a
//! terminal logger conventionally sends errors and warnings to stderr, info
//! and debug text to stdout). On top of the facade's own filtering, every
//! message is gated by a [`Verbosity`] level: sessions carry their own level,
//! and the process-wide default set with [`set_default_verbosity`] applies
//! wherever no session override exists. This keeps output of parallel
//! sessions independently controllable.

use std::sync::atomic::{AtomicU8, Ordering};

/// Verbosity level, ordered from silent to chattiest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Verbosity {
    /// No console output at all.
    None = 0,
    /// Errors only.
    Error = 1,
    /// Errors and warnings.
    Warn = 2,
    /// Errors, warnings and informative progress output.
    Info = 3,
    /// Everything, including per-iteration debugging output.
    Debug = 4,
}

impl Verbosity {
    /// Returns whether a message at `level` should be emitted under this
    /// verbosity setting.
    pub fn allows(self, level: Verbosity) -> bool {
        self >= level
    }

    fn from_u8(raw: u8) -> Verbosity {
        match raw {
            0 => Verbosity::None,
            1 => Verbosity::Error,
            2 => Verbosity::Warn,
            3 => Verbosity::Info,
            _ => Verbosity::Debug,
        }
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Error
    }
}

static DEFAULT_VERBOSITY: AtomicU8 = AtomicU8::new(Verbosity::Error as u8);

/// Returns the process-wide default verbosity.
pub fn default_verbosity() -> Verbosity {
    Verbosity::from_u8(DEFAULT_VERBOSITY.load(Ordering::Relaxed))
}

/// Sets the process-wide default verbosity.
///
/// Applies to sessions that have not set their own level and to catalog
/// registration diagnostics. Already bound methods keep the level they were
/// handed by their session.
pub fn set_default_verbosity(level: Verbosity) {
    DEFAULT_VERBOSITY.store(level as u8, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        assert!(Verbosity::Debug.allows(Verbosity::Error));
        assert!(Verbosity::Warn.allows(Verbosity::Warn));
        assert!(!Verbosity::None.allows(Verbosity::Error));
        assert!(!Verbosity::Info.allows(Verbosity::Debug));
    }

    #[test]
    fn round_trip() {
        for level in [
            Verbosity::None,
            Verbosity::Error,
            Verbosity::Warn,
            Verbosity::Info,
            Verbosity::Debug,
        ] {
            assert_eq!(Verbosity::from_u8(level as u8), level);
        }
    }
}
