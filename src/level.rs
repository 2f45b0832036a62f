use std::fmt;
use std::str::FromStr;

/// Width of the level code written into every shipped record.
pub const LEVEL_CODE_WIDTH: usize = 4;

/// Severity of a log call, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Panic,
}

impl Level {
    /// All levels in ascending severity.
    pub const ALL: [Level; 6] = [
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
        Level::Panic,
    ];

    /// Canonical upper-case name of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
            Level::Panic => "PANIC",
        }
    }

    /// Fixed-width code used for the `level` field of a shipped record.
    pub fn code(&self) -> &'static str {
        level_code(self.as_str())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Truncate a level name to at most [`LEVEL_CODE_WIDTH`] characters.
///
/// Works on character boundaries, so short or non-ASCII names are returned
/// as long as they are instead of panicking.
pub fn level_code(name: &str) -> &str {
    match name.char_indices().nth(LEVEL_CODE_WIDTH) {
        Some((idx, _)) => &name[..idx],
        None => name,
    }
}

/// Error returned when a level name cannot be parsed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            "panic" => Ok(Level::Panic),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            _ => Level::Error,
        }
    }
}

/// Gate applied before any formatting work happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelFilter {
    min: Level,
}

impl LevelFilter {
    pub fn new(min: Level) -> Self {
        Self { min }
    }

    pub fn min(&self) -> Level {
        self.min
    }

    /// Whether a call at `level` should be formatted, shipped and rendered.
    pub fn is_eligible(&self, level: Level) -> bool {
        level >= self.min
    }
}

impl Default for LevelFilter {
    fn default() -> Self {
        Self::new(Level::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_prefixes_of_canonical_names() {
        for level in Level::ALL {
            let code = level.code();
            assert!(code.len() <= LEVEL_CODE_WIDTH);
            assert!(level.as_str().starts_with(code));
        }
        assert_eq!(Level::Info.code(), "INFO");
        assert_eq!(Level::Error.code(), "ERRO");
        assert_eq!(Level::Debug.code(), "DEBU");
    }

    #[test]
    fn short_and_multibyte_names_do_not_panic() {
        assert_eq!(level_code("OK"), "OK");
        assert_eq!(level_code(""), "");
        assert_eq!(level_code("WARNING"), "WARN");
        assert_eq!(level_code("ÄÖÜßX"), "ÄÖÜß");
    }

    #[test]
    fn filter_short_circuits_below_threshold() {
        let filter = LevelFilter::new(Level::Warn);
        assert!(!filter.is_eligible(Level::Debug));
        assert!(!filter.is_eligible(Level::Info));
        assert!(filter.is_eligible(Level::Warn));
        assert!(filter.is_eligible(Level::Panic));
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("Warning".parse::<Level>(), Ok(Level::Warn));
        assert_eq!(" error ".parse::<Level>(), Ok(Level::Error));
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn maps_tracing_levels() {
        assert_eq!(Level::from(tracing::Level::TRACE), Level::Debug);
        assert_eq!(Level::from(tracing::Level::ERROR), Level::Error);
    }
}
