// src/system/compose.rs

//! Assembly of the final command string sent to a transport.
//!
//! Session state is not kept alive in a real shell process; it is replayed
//! by prefixing every outgoing command with the stored context. The prefix
//! order is fixed: the directory clause comes first, then the activation
//! clause, then the caller's command. An activation script given as a
//! relative path therefore resolves against the stored directory.

/// Renders `cd <dir>; source <venv>; <command>`, omitting the clauses for
/// which no state is stored (or whose use was switched off by the caller).
pub fn compose_command(command: &str, dir: Option<&str>, venv: Option<&str>) -> String {
    let mut composed = String::with_capacity(
        command.len() + dir.map_or(0, |d| d.len() + 5) + venv.map_or(0, |v| v.len() + 9),
    );
    if let Some(dir) = dir {
        composed.push_str("cd ");
        composed.push_str(dir);
        composed.push_str("; ");
    }
    if let Some(venv) = venv {
        composed.push_str("source ");
        composed.push_str(venv);
        composed.push_str("; ");
    }
    composed.push_str(command);
    composed
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_state_passes_command_through() {
        assert_eq!(compose_command("ls -la", None, None), "ls -la");
    }

    #[test]
    fn test_directory_prefix_only() {
        assert_eq!(
            compose_command("ls", Some("/home/alice/project"), None),
            "cd /home/alice/project; ls"
        );
    }

    #[test]
    fn test_activation_prefix_only() {
        assert_eq!(
            compose_command("python --version", None, Some("/opt/venv/bin/activate")),
            "source /opt/venv/bin/activate; python --version"
        );
    }

    #[test]
    fn test_directory_clause_precedes_activation_clause() {
        // The ordering is load-bearing: a relative activation path must
        // resolve inside the stored directory.
        assert_eq!(
            compose_command("make test", Some("/srv/app"), Some("venv/bin/activate")),
            "cd /srv/app; source venv/bin/activate; make test"
        );
    }
}
