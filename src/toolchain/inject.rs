use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use crate::error::{CoziError, Result};
use crate::model::config::InjectorConfig;

/// Patches the built framework into the client. Returns the child's exit code.
pub trait Injector {
    fn inject(&self, cwd: &Path) -> Result<i32>;
}

/// Runs the framework's interactive inject script and answers its prompts by
/// writing a fixed keystroke script to stdin, pausing before each step.
#[derive(Debug, Clone)]
pub struct ScriptedInjector {
    program: String,
    args: Vec<String>,
    keystrokes: Vec<String>,
    step_delay: Duration,
}

impl ScriptedInjector {
    pub fn new(program: &str, config: &InjectorConfig) -> Self {
        Self {
            program: program.to_string(),
            args: config.args.clone(),
            keystrokes: config.keystrokes.clone(),
            step_delay: config.step_delay(),
        }
    }
}

impl Injector for ScriptedInjector {
    fn inject(&self, cwd: &Path) -> Result<i32> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| CoziError::subprocess(&self.program, format!("could not run: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            for (step, keys) in self.keystrokes.iter().enumerate() {
                thread::sleep(self.step_delay);
                let sent = stdin
                    .write_all(keys.as_bytes())
                    .and_then(|()| stdin.flush());
                if let Err(err) = sent {
                    // The prompt already exited; its status says how it went.
                    tracing::debug!(step, "injector stdin closed: {err}");
                    break;
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| CoziError::io(format!("wait for {}", self.program), e))?;
        let code = status.code().unwrap_or(-1);
        tracing::info!(code, "injector finished");
        Ok(code)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn injector(script: &str, keystrokes: &[&str]) -> ScriptedInjector {
        ScriptedInjector {
            program: "sh".into(),
            args: vec!["-c".into(), script.into()],
            keystrokes: keystrokes.iter().map(|k| k.to_string()).collect(),
            step_delay: Duration::ZERO,
        }
    }

    #[test]
    fn keystrokes_reach_the_child() {
        let tmp = TempDir::new().unwrap();
        let code = injector("cat > seen.txt", &["\u{1b}[B\r", "\u{4}"])
            .inject(tmp.path())
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("seen.txt")).unwrap(),
            "\u{1b}[B\r\u{4}"
        );
    }

    #[test]
    fn exit_code_is_reported() {
        let tmp = TempDir::new().unwrap();
        let code = injector("exit 3", &[]).inject(tmp.path()).unwrap();
        assert_eq!(code, 3);
    }

    #[test]
    fn missing_program_is_a_subprocess_failure() {
        let tmp = TempDir::new().unwrap();
        let mut broken = injector("true", &[]);
        broken.program = "cozi-no-such-program".into();

        let err = broken.inject(tmp.path()).unwrap_err();
        assert!(matches!(err, CoziError::Subprocess { .. }));
    }
}
