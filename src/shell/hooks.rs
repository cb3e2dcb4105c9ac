use std::path::PathBuf;

/// Directory containing the shell hook scripts, shipped at the repo root
/// (not under the crate's test-fixture `examples/` tree) as
/// `shell-hooks/spellcaster.<shell>`.
pub fn hooks_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("shell-hooks")
}

/// Get the hook script path for a given shell.
/// Maps shell names to their hook script filenames (e.g. "pwsh" -> "spellcaster.ps1").
pub fn hook_script_path(shell_name: &str) -> Option<PathBuf> {
    let dir = hooks_dir();
    let filename = match shell_name {
        "pwsh" | "powershell" => "spellcaster.ps1".to_string(),
        _ => format!("spellcaster.{}", shell_name),
    };
    let path = dir.join(filename);

    if path.exists() {
        Some(path)
    } else {
        None
    }
}

/// Build the shell command that sources our hooks.
/// For POSIX shells this is injected via environment variables;
/// for PowerShell it returns a dot-source command used in `-Command` args.
pub fn shell_init_command(shell_name: &str) -> Option<String> {
    let script = hook_script_path(shell_name)?;
    let script_str = script.to_string_lossy();

    match shell_name {
        "zsh" => Some(format!(
            r#"if [ -f "{script_str}" ]; then source "{script_str}"; fi"#
        )),
        "bash" => Some(format!(
            r#"if [ -f "{script_str}" ]; then source "{script_str}"; fi"#
        )),
        "fish" => Some(format!(
            r#"if test -f "{script_str}"; source "{script_str}"; end"#
        )),
        "pwsh" | "powershell" => Some(format!(
            r#". "{script_str}""#
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hooks_dir_resolves_under_crate_root() {
        let dir = hooks_dir();
        assert!(dir.exists(), "hooks dir should exist: {:?}", dir);
        assert!(dir.ends_with("shell-hooks"));
    }

    #[test]
    fn hook_script_path_finds_existing_shells() {
        assert!(hook_script_path("zsh").is_some(), "spellcaster.zsh should exist");
        assert!(hook_script_path("bash").is_some(), "spellcaster.bash should exist");
        assert!(hook_script_path("fish").is_some(), "spellcaster.fish should exist");
    }

    #[test]
    fn hook_script_path_maps_powershell_to_ps1() {
        let pwsh = hook_script_path("pwsh");
        let powershell = hook_script_path("powershell");
        assert!(pwsh.is_some(), "spellcaster.ps1 should exist for pwsh");
        assert!(powershell.is_some(), "spellcaster.ps1 should exist for powershell");
        assert_eq!(pwsh, powershell, "pwsh and powershell should resolve to same file");
    }

    #[test]
    fn hook_script_path_returns_none_for_unknown_shell() {
        assert!(hook_script_path("cmd").is_none());
        assert!(hook_script_path("nushell").is_none());
        assert!(hook_script_path("").is_none());
    }

    #[test]
    fn shell_init_command_generates_posix_source_for_zsh() {
        let cmd = shell_init_command("zsh").expect("zsh should produce init command");
        assert!(cmd.contains("source"), "zsh init should use `source`");
        assert!(cmd.contains("spellcaster.zsh"), "zsh init should reference spellcaster.zsh");
        assert!(cmd.starts_with("if [ -f"), "should guard with file existence check");
    }

    #[test]
    fn shell_init_command_generates_posix_source_for_bash() {
        let cmd = shell_init_command("bash").expect("bash should produce init command");
        assert!(cmd.contains("source"), "bash init should use `source`");
        assert!(cmd.contains("spellcaster.bash"), "bash init should reference spellcaster.bash");
    }

    #[test]
    fn shell_init_command_generates_fish_syntax() {
        let cmd = shell_init_command("fish").expect("fish should produce init command");
        assert!(cmd.contains("test -f"), "fish should use `test -f`");
        assert!(cmd.contains("; end"), "fish should close with `; end`");
        assert!(cmd.contains("spellcaster.fish"));
    }

    #[test]
    fn shell_init_command_generates_dot_source_for_powershell() {
        let cmd = shell_init_command("pwsh").expect("pwsh should produce init command");
        assert!(cmd.starts_with(". "), "PowerShell should use dot-source");
        assert!(cmd.contains("spellcaster.ps1"));

        let cmd2 = shell_init_command("powershell").expect("powershell variant");
        assert!(cmd2.starts_with(". "), "powershell should also dot-source");
    }

    #[test]
    fn shell_init_command_returns_none_for_unsupported_shells() {
        assert!(shell_init_command("cmd").is_none());
        assert!(shell_init_command("nushell").is_none());
        assert!(shell_init_command("unknown_shell").is_none());
    }
}
