//! Unified error types for the oven controller core.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level control loop's error handling uniform. All variants are `Copy`
//! so they can be passed through the controller and console dispatcher
//! without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The persistent profile store failed or is not usable.
    Store(StoreError),
    /// A profile or phase failed validation.
    Profile(ProfileError),
    /// A console command was malformed or not executable.
    Console(ConsoleError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Profile(e) => write!(f, "profile: {e}"),
            Self::Console(e) => write!(f, "console: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The signature bytes at offset 0 do not match the expected constant.
    /// Requires an explicit reformat before the catalog can be used.
    BadSignature,
    /// No room left in the catalog region for the record being appended.
    Full,
    /// A read or write was attempted past the end of the backing memory.
    OutOfBounds,
    /// The backing memory reported a failure.
    Io,
    /// A stored record could not be decoded (corrupt name or count field).
    Corrupted,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadSignature => write!(f, "bad signature"),
            Self::Full => write!(f, "catalog full"),
            Self::OutOfBounds => write!(f, "access out of bounds"),
            Self::Io => write!(f, "I/O error"),
            Self::Corrupted => write!(f, "record corrupted"),
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Profile validation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileError {
    /// Profile name is empty.
    EmptyName,
    /// Profile declares fewer than one phase.
    NoPhases,
    /// Profile declares more phases than the inline buffer can hold.
    TooManyPhases,
    /// A phase name is empty or not NUL-terminated within its field.
    BadPhaseName,
    /// A phase slope magnitude exceeds the configured maximum.
    SlopeOutOfRange,
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "empty profile name"),
            Self::NoPhases => write!(f, "profile has no phases"),
            Self::TooManyPhases => write!(f, "too many phases"),
            Self::BadPhaseName => write!(f, "bad phase name"),
            Self::SlopeOutOfRange => write!(f, "slope out of range"),
        }
    }
}

impl From<ProfileError> for Error {
    fn from(e: ProfileError) -> Self {
        Self::Profile(e)
    }
}

// ---------------------------------------------------------------------------
// Console errors
// ---------------------------------------------------------------------------

/// Console command failures, one variant per wire reason code.
///
/// The dispatcher translates every failed command into a
/// `CONSOLEERROR[<code>]` response using [`ConsoleError::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleError {
    /// Wrong number of arguments for the command.
    ArgsCount,
    /// A numeric argument is outside its valid range.
    ArgOutOfRange,
    /// The operation is not valid in the current state
    /// (unknown option, no active profile, controller busy).
    ArgInvalidOpt,
    /// Could not reserve phase memory for a loaded or new profile.
    NoMemory,
}

impl ConsoleError {
    /// Wire reason code as transmitted to the host.
    pub const fn code(self) -> &'static str {
        match self {
            Self::ArgsCount => "ARGSCOUNT",
            Self::ArgOutOfRange => "ARGOUTOFRANGE",
            Self::ArgInvalidOpt => "ARGINVALIDOPT",
            Self::NoMemory => "NOMEMORY",
        }
    }
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<ConsoleError> for Error {
    fn from(e: ConsoleError) -> Self {
        Self::Console(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
