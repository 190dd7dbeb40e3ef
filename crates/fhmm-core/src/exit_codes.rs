//! Exit codes for the fhmm CLI.
//!
//! Exit code ranges:
//! - 0: Success
//! - 10-19: User/input errors (fixable by changing the request or config)
//! - 20-29: Internal errors (bugs, should be reported)

use fhmm_common::Error;

/// Exit codes for fhmm operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Disaggregation completed
    Success = 0,

    // ========================================================================
    // User / Input Errors (10-19)
    // ========================================================================
    /// Invalid arguments
    ArgsError = 10,

    /// Malformed request, model set or observation sequence
    InputError = 11,

    /// Config file missing, unparsable or invalid
    ConfigError = 12,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Map a core error onto the exit code contract.
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::DimensionMismatch { .. }
            | Error::InvalidModel { .. }
            | Error::NoModels
            | Error::DuplicateAppliance { .. }
            | Error::EmptyObservation
            | Error::LengthMismatch { .. }
            | Error::UnknownAppliance { .. }
            | Error::PositionOutOfRange { .. }
            | Error::NonFiniteObservation { .. }
            | Error::ObservationOutOfRange { .. }
            | Error::DegenerateModel { .. }
            | Error::Json(_) => ExitCode::InputError,
            Error::Config(_) => ExitCode::ConfigError,
            Error::IndexOutOfRange { .. } => ExitCode::InternalError,
            Error::Io(_) => ExitCode::IoError,
        }
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Success
    }

    /// Check if this exit code is a user/input error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Check if this exit code is an internal error (codes 20-29).
    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Success => "OK",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::InputError => "ERR_INPUT",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::ArgsError.as_i32(), 10);
        assert_eq!(ExitCode::InputError.as_i32(), 11);
        assert_eq!(ExitCode::ConfigError.as_i32(), 12);
        assert_eq!(ExitCode::InternalError.as_i32(), 20);
        assert_eq!(ExitCode::IoError.as_i32(), 21);
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(ExitCode::from_error(&Error::NoModels), ExitCode::InputError);
        assert_eq!(
            ExitCode::from_error(&Error::Config("bad".into())),
            ExitCode::ConfigError
        );
        assert_eq!(
            ExitCode::from_error(&Error::IndexOutOfRange {
                step: 0,
                index: 5,
                bound: 4
            }),
            ExitCode::InternalError
        );
        let io = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(ExitCode::from_error(&io), ExitCode::IoError);
    }

    #[test]
    fn test_ranges() {
        assert!(ExitCode::Success.is_success());
        assert!(ExitCode::InputError.is_user_error());
        assert!(!ExitCode::InputError.is_internal_error());
        assert!(ExitCode::IoError.is_internal_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(ExitCode::ConfigError.to_string(), "ERR_CONFIG (12)");
    }
}
