//! Terminal detection and capability utilities

use is_terminal::IsTerminal;
use std::env;
use std::io::{stderr, stdout};

/// Check if stdout is connected to an interactive terminal
pub fn is_interactive() -> bool {
    if !stdout().is_terminal() {
        return false;
    }

    // CI runners may allocate a TTY without anyone watching it
    if is_ci_environment() {
        return false;
    }

    env::var("DEBIAN_FRONTEND").unwrap_or_default() != "noninteractive"
}

/// Check if stderr is connected to a terminal
pub fn stderr_is_terminal() -> bool {
    stderr().is_terminal()
}

/// Check if the terminal supports ANSI escape codes for colors and progress bars
pub fn supports_ansi() -> bool {
    if !is_interactive() {
        return false;
    }

    let term = env::var("TERM").unwrap_or_default();
    if cfg!(windows) {
        return term != "dumb";
    }
    !(term == "dumb" || term.is_empty())
}

/// Check if running in a CI environment
fn is_ci_environment() -> bool {
    let ci_vars = [
        "CI",
        "CONTINUOUS_INTEGRATION",
        "JENKINS_URL",
        "GITHUB_ACTIONS",
        "GITLAB_CI",
        "TRAVIS",
        "CIRCLECI",
        "BUILDKITE",
        "DRONE",
        "TEAMCITY_VERSION",
        "TF_BUILD", // Azure DevOps
    ];

    ci_vars.iter().any(|var| env::var(var).is_ok())
}

/// Determine if progress bars should be shown by default
///
/// Progress goes to stderr, so both streams must be terminals that
/// understand ANSI codes.
pub fn should_show_progress_by_default() -> bool {
    is_interactive() && stderr_is_terminal() && supports_ansi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ansi_implies_interactive() {
        if supports_ansi() {
            assert!(is_interactive());
        }
    }

    #[test]
    fn test_interactive_never_in_ci() {
        if is_ci_environment() {
            assert!(!is_interactive());
            assert!(!should_show_progress_by_default());
        }
    }

    #[test]
    fn test_progress_implies_interactive() {
        if should_show_progress_by_default() {
            assert!(is_interactive());
        }
    }
}
