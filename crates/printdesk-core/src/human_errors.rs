// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the status line.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The severity drives how the UI presents it.

use crate::error::PrintdeskError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Worth trying again as-is.
    Transient,
    /// User must do something (connect a printer, pick another file).
    ActionRequired,
    /// Retrying will not help.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether trying again unchanged can succeed.
    pub retriable: bool,
    pub severity: Severity,
}

impl HumanError {
    /// Message and suggestion as a single status line.
    pub fn status_line(&self) -> String {
        format!("{} {}", self.message, self.suggestion)
    }
}

/// Convert a `PrintdeskError` into a `HumanError`.
pub fn humanize_error(err: &PrintdeskError) -> HumanError {
    match err {
        PrintdeskError::FileNotFound(path) => HumanError {
            message: "The file couldn't be found.".into(),
            suggestion: format!(
                "It may have been moved or deleted. Try choosing the file again. ({})",
                path.display()
            ),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        PrintdeskError::UnsupportedType(detail) => HumanError {
            message: "This type of document can't be printed from here.".into(),
            suggestion: format!(
                "Open it in an application that understands it, or save it as a PDF first. ({detail})"
            ),
            retriable: false,
            severity: Severity::Permanent,
        },

        PrintdeskError::PrintInProgress => HumanError {
            message: "Another document is still being printed.".into(),
            suggestion: "Wait for it to finish, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        PrintdeskError::LoadTimeout(after) => HumanError {
            message: "The document took too long to prepare.".into(),
            suggestion: format!(
                "Large files can take a while. Try again, or open the file in another application. (waited {}s)",
                after.as_secs()
            ),
            retriable: true,
            severity: Severity::Transient,
        },

        PrintdeskError::LoadError(_) => HumanError {
            message: "The document couldn't be prepared for printing.".into(),
            suggestion: "The file may be damaged. Try opening it in another application to check it works.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        PrintdeskError::NoActiveSurface => HumanError {
            message: "There's nothing on screen to print.".into(),
            suggestion: "Open the page you want to print, then try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        PrintdeskError::PrintDevice(_) | PrintdeskError::Bridge(_) => HumanError {
            message: "Failed to print.".into(),
            suggestion: "Please make sure a printer is properly connected.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        PrintdeskError::InvalidStateTransition { .. } => HumanError {
            message: "That action isn't available right now.".into(),
            suggestion: "Wait for the current step to finish, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        PrintdeskError::UpdateFeed(_) => HumanError {
            message: "We couldn't reach the update server.".into(),
            suggestion: "Check your internet connection, then check for updates again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        PrintdeskError::IntegrityMismatch { .. } => HumanError {
            message: "The downloaded update was damaged.".into(),
            suggestion: "Download the update again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        PrintdeskError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "The file couldn't be found.".into(),
                suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "The app doesn't have permission to use that file.".into(),
                suggestion: "Check the file permissions, or copy the file to a different location first.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "There was a problem reading or writing a file.".into(),
                suggestion: "Try again. If this keeps happening, your disk may be full.".into(),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        PrintdeskError::Serialization(_) => HumanError {
            message: "The app had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        PrintdeskError::PlatformUnavailable => HumanError {
            message: "Printing isn't available on this system.".into(),
            suggestion: "No print service was found. Install or enable one, then restart the app.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn missing_file_is_action_required() {
        let human = humanize_error(&PrintdeskError::FileNotFound("/tmp/missing.txt".into()));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("/tmp/missing.txt"));
    }

    #[test]
    fn timeout_is_transient() {
        let human = humanize_error(&PrintdeskError::LoadTimeout(Duration::from_secs(10)));
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn device_error_mentions_printer_connection() {
        let human = humanize_error(&PrintdeskError::PrintDevice("cancelled".into()));
        assert!(human.status_line().contains("printer is properly connected"));
    }

    #[test]
    fn unsupported_type_is_permanent() {
        let human = humanize_error(&PrintdeskError::UnsupportedType("docx".into()));
        assert_eq!(human.severity, Severity::Permanent);
        assert!(!human.retriable);
    }
}
