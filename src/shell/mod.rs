pub mod detect;
pub mod hooks;

use crate::render::TerminalEvent;

/// Phase of the shell-integration state machine (§4.5): `Idle ->
/// PromptActive -> CommandEntered -> Running -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Phase {
    #[default]
    Idle,
    PromptActive,
    CommandEntered,
    Running,
}

/// Tracks the private OSC 1337 shell-integration channel: prompt, command,
/// cwd, branch, and exit-status metadata the shell-side hook scripts emit.
/// Absence of the channel (no OSC 1337 ever seen) leaves every field `None`.
#[derive(Debug, Clone, Default)]
pub struct ShellIntegration {
    pub current_working_directory: Option<String>,
    pub git_branch: Option<String>,
    pub prompt_start_row: Option<i64>,
    pub prompt_end_row: Option<i64>,
    pub command_start_row: Option<i64>,
    /// The command currently being typed/run, cleared once `CommandEnd`
    /// moves it into `last_command`.
    pub current_command: Option<String>,
    /// The most recently completed command's text — what a context snapshot
    /// reports as `lastCommand`. Populated at `CommandEnd`.
    pub last_command: Option<String>,
    pub last_exit_status: Option<i32>,
    pub version: Option<u32>,
    phase: Phase,
    /// Text printed while `phase == CommandEntered`, i.e. between
    /// `PromptEnd` and `CommandStart`/`CommandEnd`.
    accumulated: String,
    pending_events: Vec<TerminalEvent>,
}

impl ShellIntegration {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a `ShellIntegrationVersion` directive (or any other
    /// directive) has been observed.
    pub fn active(&self) -> bool {
        self.version.is_some() || self.phase != Phase::Idle || self.last_command.is_some()
    }

    /// Dispatch one `key[=value]` payload from an OSC 1337 sequence.
    /// `global_row` is the absolute (scrollback-inclusive) row the cursor
    /// was on when the directive arrived. Unknown keys are ignored to
    /// preserve forward compatibility, per spec.
    pub fn handle_directive(&mut self, payload: &str, global_row: i64) {
        // OSC 1337 also carries the iTerm2 inline-image namespace
        // (`File=...`); that sits with the sixel/DCS device-control support
        // this crate excludes (§1 Non-goals), so it's treated as an
        // unrecognized directive and ignored.
        if payload.starts_with("File=") {
            return;
        }

        let (key, value) = match payload.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (payload, None),
        };

        match key {
            "ShellIntegrationVersion" => {
                self.version = value.and_then(|v| v.parse().ok());
            }
            "CurrentDir" => {
                if let Some(path) = value {
                    self.current_working_directory = Some(path.to_string());
                    self.pending_events.push(TerminalEvent::CwdChanged {
                        path: path.to_string(),
                    });
                }
            }
            "GitBranch" => {
                self.git_branch = value.map(|v| v.to_string());
            }
            "PromptStart" => {
                self.prompt_start_row = Some(global_row);
                self.prompt_end_row = None;
                self.accumulated.clear();
                self.phase = Phase::PromptActive;
                self.pending_events.push(TerminalEvent::PromptStarted {
                    row: global_row.max(0) as u16,
                });
            }
            "PromptEnd" => {
                self.prompt_end_row = Some(global_row);
                self.accumulated.clear();
                self.phase = Phase::CommandEntered;
            }
            "CommandStart" => {
                self.command_start_row = Some(global_row);
                let command = self.accumulated.trim().to_string();
                self.current_command = if command.is_empty() {
                    None
                } else {
                    Some(command.clone())
                };
                self.accumulated.clear();
                self.phase = Phase::Running;
                self.pending_events
                    .push(TerminalEvent::CommandStarted { command });
            }
            "CommandEnd" => {
                let status = value.and_then(|v| v.parse::<i32>().ok()).unwrap_or(0);
                let command = self
                    .current_command
                    .take()
                    .or_else(|| {
                        let trimmed = self.accumulated.trim();
                        (!trimmed.is_empty()).then(|| trimmed.to_string())
                    });
                if command.is_some() {
                    self.last_command = command;
                }
                self.last_exit_status = Some(status);
                self.accumulated.clear();
                self.phase = Phase::Idle;
                self.pending_events
                    .push(TerminalEvent::CommandEnded { exit_code: status });
            }
            _ => {}
        }
    }

    /// Feed printed text through the accumulator; only text seen while the
    /// channel is between `PromptEnd` and `CommandStart`/`CommandEnd`
    /// becomes part of `currentCommand`.
    pub fn accumulate_print(&mut self, c: char) {
        if self.phase == Phase::CommandEntered {
            self.accumulated.push(c);
        }
    }

    pub fn take_pending_events(&mut self) -> Vec<TerminalEvent> {
        std::mem::take(&mut self.pending_events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_end_to_command_end_without_command_start() {
        let mut shell = ShellIntegration::new();
        shell.handle_directive("CurrentDir=/tmp", 0);
        shell.handle_directive("PromptEnd", 0);
        for c in "ls".chars() {
            shell.accumulate_print(c);
        }
        shell.handle_directive("CommandEnd=0", 1);

        assert_eq!(shell.current_working_directory.as_deref(), Some("/tmp"));
        assert_eq!(shell.last_command.as_deref(), Some("ls"));
        assert_eq!(shell.last_exit_status, Some(0));
        assert!(shell.current_command.is_none());
    }

    #[test]
    fn command_start_stops_accumulation() {
        let mut shell = ShellIntegration::new();
        shell.handle_directive("PromptEnd", 0);
        for c in "echo hi".chars() {
            shell.accumulate_print(c);
        }
        shell.handle_directive("CommandStart", 0);
        for c in " this should not accumulate".chars() {
            shell.accumulate_print(c);
        }
        shell.handle_directive("CommandEnd=1", 1);

        assert_eq!(shell.last_command.as_deref(), Some("echo hi"));
        assert_eq!(shell.last_exit_status, Some(1));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut shell = ShellIntegration::new();
        shell.handle_directive("SomeFutureKey=value", 0);
        assert!(shell.last_command.is_none());
        assert!(shell.pending_events.is_empty());
    }

    #[test]
    fn file_payloads_are_ignored() {
        let mut shell = ShellIntegration::new();
        shell.handle_directive("File=name=x.png;inline=1:aGVsbG8=", 0);
        assert!(!shell.active());
    }
}
