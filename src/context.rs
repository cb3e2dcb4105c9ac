//! Component F: builds an AI-consumable snapshot of a pane's visible state.
//! The builder only ever reads; it never mutates the terminal state it is
//! given.

use std::collections::HashMap;
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::redact::{is_sensitive_env_key, redact_env_value, redact_string};
use crate::terminal::TerminalState;

/// Named per `ContextSnapshot`'s `terminalSize` field instead of a bare
/// tuple, for stable serde field naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSize {
    pub rows: u16,
    pub cols: u16,
}

/// Classifies the spawned shell by executable basename, following
/// `shell::detect`'s own classification approach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Unknown(String),
}

impl ShellType {
    pub fn from_shell_name(name: &str) -> Self {
        match name {
            "bash" => ShellType::Bash,
            "zsh" => ShellType::Zsh,
            "fish" => ShellType::Fish,
            "pwsh" | "powershell" => ShellType::PowerShell,
            other => ShellType::Unknown(other.to_string()),
        }
    }
}

/// Which parts of a snapshot to include. A disabled toggle nulls its
/// corresponding field rather than substituting a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextToggles {
    pub include_current_directory: bool,
    pub include_recent_output: bool,
    pub include_last_command: bool,
    pub include_git_status: bool,
    pub include_environment: bool,
    pub include_scrollback: bool,
}

impl Default for ContextToggles {
    fn default() -> Self {
        Self {
            include_current_directory: true,
            include_recent_output: true,
            include_last_command: true,
            include_git_status: true,
            include_environment: false,
            include_scrollback: false,
        }
    }
}

/// Immutable snapshot of a pane's state, shaped for an AI provider's context
/// window. Every string field has already passed through the redactor by
/// the time callers see it — `redact_snapshot` is applied unconditionally
/// by `ContextSnapshotBuilder::build`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub current_working_directory: Option<String>,
    pub shell_type: ShellType,
    pub recent_output_lines: Vec<String>,
    pub last_command: Option<String>,
    pub last_command_exit_status: Option<i32>,
    pub git_branch: Option<String>,
    pub git_status: Option<String>,
    pub environment_variables: Option<HashMap<String, String>>,
    pub scrollback_lines: Option<Vec<String>>,
    pub terminal_size: TerminalSize,
    pub redacted: bool,
    pub redaction_count: u32,
}

/// Default capture budget: last 50 grid rows, per spec.
pub const DEFAULT_CAPTURE_ROWS: u16 = 50;

pub struct ContextSnapshotBuilder {
    toggles: ContextToggles,
    capture_rows: u16,
}

impl ContextSnapshotBuilder {
    pub fn new(toggles: ContextToggles) -> Self {
        Self {
            toggles,
            capture_rows: DEFAULT_CAPTURE_ROWS,
        }
    }

    pub fn with_capture_rows(mut self, rows: u16) -> Self {
        self.capture_rows = rows;
        self
    }

    /// Builds a fully redacted snapshot from the given terminal state and
    /// shell type. `process_env` supplies the environment to capture when
    /// `includeEnvironment` is set — callers pass the PTY child's
    /// environment when available, falling back to the host's own.
    pub fn build(
        &self,
        state: &TerminalState,
        shell_type: ShellType,
        process_env: &HashMap<String, String>,
    ) -> ContextSnapshot {
        let shell = state.shell_integration();

        let current_working_directory = self
            .toggles
            .include_current_directory
            .then(|| shell.current_working_directory.clone())
            .flatten();

        let last_command = self
            .toggles
            .include_last_command
            .then(|| shell.last_command.clone())
            .flatten();
        let last_command_exit_status = self
            .toggles
            .include_last_command
            .then_some(shell.last_exit_status)
            .flatten();

        let git_branch = shell.git_branch.clone();
        let git_status = if self.toggles.include_git_status {
            let cwd = current_working_directory.clone().or_else(|| shell.current_working_directory.clone());
            run_git_status(cwd.as_deref())
        } else {
            None
        };

        let recent_output_lines = if self.toggles.include_recent_output {
            state.recent_visible_lines(self.capture_rows)
        } else {
            Vec::new()
        };

        let scrollback_lines = self
            .toggles
            .include_scrollback
            .then(|| state.scrollback_lines());

        let environment_variables = self
            .toggles
            .include_environment
            .then(|| process_env.clone());

        let (rows, cols) = state.dimensions();
        let terminal_size = TerminalSize { rows, cols };

        let mut snapshot = ContextSnapshot {
            current_working_directory,
            shell_type,
            recent_output_lines,
            last_command,
            last_command_exit_status,
            git_branch,
            git_status,
            environment_variables,
            scrollback_lines,
            terminal_size,
            redacted: false,
            redaction_count: 0,
        };
        redact_snapshot(&mut snapshot);
        snapshot
    }
}

/// Applies the secret redactor to every string field of a snapshot in
/// place, tallying `redactionCount` and setting `redacted` at the end.
pub fn redact_snapshot(snapshot: &mut ContextSnapshot) {
    let mut total = 0usize;

    if let Some(cwd) = &mut snapshot.current_working_directory {
        let (out, count) = redact_string(cwd);
        *cwd = out;
        total += count;
    }
    if let Some(cmd) = &mut snapshot.last_command {
        let (out, count) = redact_string(cmd);
        *cmd = out;
        total += count;
    }
    if let Some(status) = &mut snapshot.git_status {
        let (out, count) = redact_string(status);
        *status = out;
        total += count;
    }
    for line in &mut snapshot.recent_output_lines {
        let (out, count) = redact_string(line);
        *line = out;
        total += count;
    }
    if let Some(lines) = &mut snapshot.scrollback_lines {
        for line in lines.iter_mut() {
            let (out, count) = redact_string(line);
            *line = out;
            total += count;
        }
    }
    if let Some(env) = &mut snapshot.environment_variables {
        for (key, value) in env.iter_mut() {
            if is_sensitive_env_key(key) {
                let (out, count) = redact_env_value(value);
                *value = out;
                total += count;
            } else {
                let (out, count) = redact_string(value);
                *value = out;
                total += count;
            }
        }
    }

    snapshot.redaction_count = total as u32;
    snapshot.redacted = total > 0;
}

/// Best-effort `git status --porcelain=v1 --branch` capture. Never fails
/// the caller: not-a-repo or a missing `git` binary simply leave the field
/// absent, matching `shell::detect`'s "never fail on an external process"
/// posture.
fn run_git_status(cwd: Option<&str>) -> Option<String> {
    let mut cmd = Command::new("git");
    cmd.args(["status", "--porcelain=v1", "--branch"]);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    let output = cmd.output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_type_classifies_known_names() {
        assert_eq!(ShellType::from_shell_name("zsh"), ShellType::Zsh);
        assert_eq!(ShellType::from_shell_name("bash"), ShellType::Bash);
        assert_eq!(
            ShellType::from_shell_name("tcsh"),
            ShellType::Unknown("tcsh".to_string())
        );
    }

    #[test]
    fn disabled_toggle_nulls_field_not_placeholder() {
        let state = TerminalState::new(24, 80);
        let toggles = ContextToggles {
            include_current_directory: false,
            ..ContextToggles::default()
        };
        let builder = ContextSnapshotBuilder::new(toggles);
        let snapshot = builder.build(&state, ShellType::Zsh, &HashMap::new());
        assert!(snapshot.current_working_directory.is_none());
    }

    #[test]
    fn redaction_count_zero_on_clean_snapshot() {
        let mut snapshot = ContextSnapshot {
            current_working_directory: Some("/home/user/project".to_string()),
            shell_type: ShellType::Bash,
            recent_output_lines: vec!["hello world".to_string()],
            last_command: Some("ls -la".to_string()),
            last_command_exit_status: Some(0),
            git_branch: Some("main".to_string()),
            git_status: None,
            environment_variables: None,
            scrollback_lines: None,
            terminal_size: TerminalSize { rows: 24, cols: 80 },
            redacted: false,
            redaction_count: 0,
        };
        redact_snapshot(&mut snapshot);
        assert_eq!(snapshot.redaction_count, 0);
        assert!(!snapshot.redacted);
    }

    #[test]
    fn sensitive_env_values_wholesale_redacted() {
        let mut env = HashMap::new();
        env.insert("OPENAI_API_KEY".to_string(), "supersecretvalue".to_string());
        env.insert("PATH".to_string(), "/usr/bin".to_string());
        let mut snapshot = ContextSnapshot {
            current_working_directory: None,
            shell_type: ShellType::Bash,
            recent_output_lines: Vec::new(),
            last_command: None,
            last_command_exit_status: None,
            git_branch: None,
            git_status: None,
            environment_variables: Some(env),
            scrollback_lines: None,
            terminal_size: TerminalSize { rows: 24, cols: 80 },
            redacted: false,
            redaction_count: 0,
        };
        redact_snapshot(&mut snapshot);
        let env = snapshot.environment_variables.unwrap();
        assert_eq!(env.get("OPENAI_API_KEY").unwrap(), "[REDACTED]");
        assert_eq!(env.get("PATH").unwrap(), "/usr/bin");
        assert!(snapshot.redacted);
    }
}
