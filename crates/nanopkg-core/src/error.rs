//! Error types for nanopkg operations.
//!
//! Each error carries:
//! - a stable [`ErrorCode`] (e.g. `E0301`) grouped by the taxonomy kind it belongs to
//! - a human-readable message
//! - zero or more remediation suggestions surfaced by the CLI

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Stable error codes, grouped by taxonomy kind.
///
/// `E01xx` config, `E02xx` network, `E03xx` verification, `E04xx` parse,
/// `E05xx` dependency, `E06xx` filesystem, `E07xx` script, `E08xx` interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Missing or invalid architecture table.
    E0101,
    /// Malformed source or destination entry.
    E0102,
    /// Mutually exclusive configuration options set together.
    E0103,

    /// Fetch of a URL failed.
    E0201,
    /// Repository unreachable after retries.
    E0202,

    /// Checksum mismatch.
    E0301,
    /// Signature verification failed.
    E0302,

    /// Malformed control stanza.
    E0401,
    /// Malformed version or dependency atom.
    E0402,

    /// Resolver reported unsatisfiable problems.
    E0501,

    /// Filesystem write/extract/permission failure.
    E0601,

    /// Maintainer script exited non-zero.
    E0701,

    /// Operation interrupted by signal.
    E0801,
}

impl ErrorCode {
    /// The canonical string form, e.g. `"E0301"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::E0101 => "E0101",
            Self::E0102 => "E0102",
            Self::E0103 => "E0103",
            Self::E0201 => "E0201",
            Self::E0202 => "E0202",
            Self::E0301 => "E0301",
            Self::E0302 => "E0302",
            Self::E0401 => "E0401",
            Self::E0402 => "E0402",
            Self::E0501 => "E0501",
            Self::E0601 => "E0601",
            Self::E0701 => "E0701",
            Self::E0801 => "E0801",
        }
    }

    /// Process exit code associated with this error kind, per the error
    /// handling design's propagation policy. `Interrupted` is handled
    /// specially by the signal handler (`128 + signum`) and is not covered
    /// by this mapping.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::E0501 => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Thin wrapper so `ErrorCode` can be used as a `#[source]`.
#[derive(Debug, Clone, Copy)]
pub struct ErrorCodeSource(pub ErrorCode);

impl fmt::Display for ErrorCodeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ErrorCodeSource {}

/// The error type shared by every nanopkg crate.
#[derive(Error, Debug)]
pub enum Error {
    /// `ConfigError` — missing arch list, bad URL, conflicting options.
    #[error("[{code}] configuration error: {message}")]
    Config {
        #[source]
        code: ErrorCodeSource,
        message: String,
        suggestions: Vec<String>,
    },

    /// `NetworkError` — fetch failed.
    #[error("[{code}] network error fetching {url}: {message}")]
    Network {
        #[source]
        code: ErrorCodeSource,
        url: String,
        message: String,
        suggestions: Vec<String>,
    },

    /// `VerificationError` — bad checksum or signature.
    #[error("[{code}] verification failed for {path}: {message}")]
    Verification {
        #[source]
        code: ErrorCodeSource,
        path: PathBuf,
        message: String,
        suggestions: Vec<String>,
    },

    /// `ParseError` — malformed index stanza, version or atom.
    #[error("[{code}] parse error: {message}")]
    Parse {
        #[source]
        code: ErrorCodeSource,
        message: String,
        suggestions: Vec<String>,
    },

    /// `DependencyError` — resolver found problems.
    #[error("[{code}] dependency resolution failed: {message}")]
    Dependency {
        #[source]
        code: ErrorCodeSource,
        message: String,
        problems: Vec<String>,
        suggestions: Vec<String>,
    },

    /// `FilesystemError` — write/extract/permission.
    #[error("[{code}] filesystem error at {path}: {message}")]
    Filesystem {
        #[source]
        code: ErrorCodeSource,
        path: PathBuf,
        message: String,
        suggestions: Vec<String>,
    },

    /// `ScriptError` — maintainer script non-zero exit.
    #[error("[{code}] script failed for {package} ({phase}): {message}")]
    Script {
        #[source]
        code: ErrorCodeSource,
        package: String,
        phase: String,
        message: String,
        suggestions: Vec<String>,
    },

    /// `Interrupted` — SIGINT received.
    #[error("[{code}] interrupted by signal {signum}")]
    Interrupted {
        #[source]
        code: ErrorCodeSource,
        signum: i32,
    },

    /// Wrapped `std::io::Error` for call sites that only need `?` propagation
    /// and don't classify the error themselves (prefer [`Error::filesystem`]
    /// when the taxonomy kind matters to the caller).
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Suggestions attached to this error, if any.
    #[must_use]
    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::Config { suggestions, .. }
            | Self::Network { suggestions, .. }
            | Self::Verification { suggestions, .. }
            | Self::Parse { suggestions, .. }
            | Self::Dependency { suggestions, .. }
            | Self::Filesystem { suggestions, .. }
            | Self::Script { suggestions, .. } => suggestions,
            Self::Interrupted { .. } | Self::Io { .. } => &[],
        }
    }

    /// The exit code this error should surface as, per the error handling
    /// design's propagation policy. `Interrupted` is `128 + signum`.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { code, .. }
            | Self::Network { code, .. }
            | Self::Verification { code, .. }
            | Self::Parse { code, .. }
            | Self::Dependency { code, .. }
            | Self::Filesystem { code, .. }
            | Self::Script { code, .. } => code.0.exit_code(),
            Self::Interrupted { signum, .. } => 128 + signum,
            Self::Io { .. } => 1,
        }
    }

    /// Wrap a raw IO error with path context, classifying it into the
    /// taxonomy's `FilesystemError` kind.
    #[must_use]
    pub fn filesystem(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let suggestions = match err.kind() {
            std::io::ErrorKind::NotFound => {
                vec![format!("Check that {} exists", path.display())]
            }
            std::io::ErrorKind::PermissionDenied => {
                vec![format!("Check permissions on {}", path.display())]
            }
            _ => vec![format!("Check the file: {}", path.display())],
        };
        Self::Filesystem {
            code: ErrorCodeSource(ErrorCode::E0601),
            path,
            message: err.to_string(),
            suggestions,
        }
    }

    /// Plain IO error propagation without classification; used at call
    /// sites where the caller will classify the error itself.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// A `ConfigError`.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCodeSource(ErrorCode::E0101),
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    /// A `ConfigError` with suggestions.
    #[must_use]
    pub fn config_with(message: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self::Config {
            code: ErrorCodeSource(ErrorCode::E0101),
            message: message.into(),
            suggestions,
        }
    }

    /// A `NetworkError` after retries have been exhausted.
    #[must_use]
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            code: ErrorCodeSource(ErrorCode::E0201),
            url: url.into(),
            message: message.into(),
            suggestions: vec!["Check network connectivity and retry 'update'".to_string()],
        }
    }

    /// A `VerificationError` (bad checksum or signature).
    #[must_use]
    pub fn verification(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Verification {
            code: ErrorCodeSource(ErrorCode::E0301),
            path: path.into(),
            message: message.into(),
            suggestions: vec![
                "The cached file was removed; retry the operation".to_string(),
                "Run 'update' if the index itself may be stale".to_string(),
            ],
        }
    }

    /// A `ParseError`; the caller continues processing the surrounding
    /// index or stanza stream rather than aborting.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            code: ErrorCodeSource(ErrorCode::E0401),
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    /// A `DependencyError` carrying the resolver's enumerated problems.
    #[must_use]
    pub fn dependency(message: impl Into<String>, problems: Vec<String>) -> Self {
        Self::Dependency {
            code: ErrorCodeSource(ErrorCode::E0501),
            message: message.into(),
            problems,
            suggestions: vec!["Re-run with --force-depends to override".to_string()],
        }
    }

    /// A `ScriptError` for a maintainer script that exited non-zero.
    #[must_use]
    pub fn script(
        package: impl Into<String>,
        phase: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Script {
            code: ErrorCodeSource(ErrorCode::E0701),
            package: package.into(),
            phase: phase.into(),
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    /// An `Interrupted` error for a caught signal.
    #[must_use]
    pub fn interrupted(signum: i32) -> Self {
        Self::Interrupted {
            code: ErrorCodeSource(ErrorCode::E0801),
            signum,
        }
    }

    /// Render the error message followed by any suggestions, one per line,
    /// prefixed with a hint marker. Used by the CLI's top-level handler.
    #[must_use]
    pub fn display_with_suggestions(&self) -> String {
        let mut out = self.to_string();
        for s in self.suggestions() {
            out.push_str("\n  hint: ");
            out.push_str(s);
        }
        out
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;
