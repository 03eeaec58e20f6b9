//! Process exit statuses and the error type every command returns.

use std::fmt;
use std::process::ExitCode;

/// Exit statuses scripts can rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Ok,
    Error,
    MissingVaultName,
    InvalidAddress,
    MissingKey,
    InvalidCredentials,
    ClientCreationFailed,
    SecretNotFound,
    SecretExpired,
    RotationGenerateFailed,
    GenerateFailed,
    GetFailed,
    SetFailed,
    RemoveFailed,
    ListFailed,
    ConfigFailed,
    ConfigNotFound,
    Cancelled,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Error => 1,
            Self::MissingVaultName => 2,
            Self::InvalidAddress => 3,
            Self::MissingKey => 4,
            Self::InvalidCredentials => 10,
            Self::ClientCreationFailed => 11,
            Self::SecretNotFound => 12,
            Self::SecretExpired => 13,
            Self::RotationGenerateFailed => 14,
            Self::GenerateFailed => 15,
            Self::GetFailed => 16,
            Self::SetFailed => 17,
            Self::RemoveFailed => 18,
            Self::ListFailed => 19,
            Self::ConfigFailed => 20,
            Self::ConfigNotFound => 21,
            Self::Cancelled => 99,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// A failed command: the status to exit with and what went wrong.
pub struct CommandFailure {
    pub status: ExitStatus,
    pub error: anyhow::Error,
}

impl CommandFailure {
    pub fn new(status: ExitStatus, error: impl Into<anyhow::Error>) -> Self {
        Self { status, error: error.into() }
    }

    pub fn msg(status: ExitStatus, message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self { status, error: anyhow::Error::msg(message) }
    }

    pub fn cancelled() -> Self {
        Self::msg(ExitStatus::Cancelled, "Operation cancelled.")
    }
}

impl fmt::Debug for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandFailure")
            .field("status", &self.status)
            .field("error", &format_args!("{:#}", self.error))
            .finish()
    }
}

pub type CommandResult<T = ()> = Result<T, CommandFailure>;

/// Attaches an exit status to any error.
pub trait OrExit<T> {
    fn or_exit(self, status: ExitStatus) -> CommandResult<T>;
}

impl<T, E> OrExit<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn or_exit(self, status: ExitStatus) -> CommandResult<T> {
        self.map_err(|err| CommandFailure::new(status, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let expected = [
            (ExitStatus::Ok, 0),
            (ExitStatus::Error, 1),
            (ExitStatus::MissingVaultName, 2),
            (ExitStatus::InvalidAddress, 3),
            (ExitStatus::MissingKey, 4),
            (ExitStatus::InvalidCredentials, 10),
            (ExitStatus::ClientCreationFailed, 11),
            (ExitStatus::SecretNotFound, 12),
            (ExitStatus::SecretExpired, 13),
            (ExitStatus::RotationGenerateFailed, 14),
            (ExitStatus::GenerateFailed, 15),
            (ExitStatus::GetFailed, 16),
            (ExitStatus::SetFailed, 17),
            (ExitStatus::RemoveFailed, 18),
            (ExitStatus::ListFailed, 19),
            (ExitStatus::ConfigFailed, 20),
            (ExitStatus::ConfigNotFound, 21),
            (ExitStatus::Cancelled, 99),
        ];
        for (status, code) in expected {
            assert_eq!(status.code(), code, "{:?}", status);
        }
    }

    #[test]
    fn or_exit_keeps_error_message() {
        let result: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"));
        let failure = result.or_exit(ExitStatus::SetFailed).unwrap_err();
        assert_eq!(failure.status, ExitStatus::SetFailed);
        assert_eq!(failure.error.to_string(), "disk on fire");
    }
}
