//! External tools (extractor, formatter, site builder) behind one trait.

use crate::error::ToolError;
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::thread;

/// A command-line tool the generator delegates to.
///
/// `args` are appended to the tool's own argv prefix. When `stdin` is given
/// it is written to the process and the pipe closed; otherwise stdin is null.
pub trait Tool: Send + Sync {
    /// Program name for messages.
    fn name(&self) -> &str;

    /// Run to completion and return stdout.
    fn invoke(&self, args: &[String], stdin: Option<&str>) -> Result<String, ToolError>;
}

/// A tool run as a child process.
#[derive(Debug, Clone)]
pub struct ProcessTool {
    argv: Vec<String>,
}

impl ProcessTool {
    pub fn new(argv: Vec<String>) -> Self {
        ProcessTool { argv }
    }
}

impl Tool for ProcessTool {
    fn name(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or("")
    }

    fn invoke(&self, args: &[String], stdin: Option<&str>) -> Result<String, ToolError> {
        let program = self.name().to_string();
        tracing::debug!(program = %program, ?args, "running tool");

        let mut child = Command::new(&program)
            .args(self.argv.iter().skip(1))
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: program.clone(),
                source,
            })?;

        // Feed stdin from a separate thread so a large document can't
        // deadlock against a full stdout pipe.
        let writer = match (child.stdin.take(), stdin) {
            (Some(mut pipe), Some(input)) => {
                let input = input.to_string();
                Some(thread::spawn(move || pipe.write_all(input.as_bytes())))
            }
            _ => None,
        };

        let output = child.wait_with_output().map_err(|source| ToolError::Spawn {
            program: program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(ToolError::Failed {
                program,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // The tool exited successfully without reading all input.
                Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {}
                Ok(Err(source)) => return Err(ToolError::Spawn { program, source }),
                Err(_) => {
                    return Err(ToolError::Spawn {
                        program,
                        source: std::io::Error::new(ErrorKind::Other, "stdin writer panicked"),
                    })
                }
            }
        }

        String::from_utf8(output.stdout).map_err(|_| ToolError::InvalidOutput { program })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> ProcessTool {
        ProcessTool::new(vec!["sh".to_string(), "-c".to_string(), script.to_string(), "sh".to_string()])
    }

    #[test]
    fn captures_stdout_and_passes_args() {
        let tool = sh("echo \"$1|$2\"");
        let out = tool.invoke(&["a".to_string(), "".to_string()], None).unwrap();
        assert_eq!(out, "a|\n");
    }

    #[test]
    fn pipes_stdin_through() {
        let tool = sh("cat");
        let out = tool.invoke(&[], Some("# Title\n\nbody\n")).unwrap();
        assert_eq!(out, "# Title\n\nbody\n");
    }

    #[test]
    fn large_input_does_not_deadlock() {
        let tool = sh("cat");
        let input = "line\n".repeat(200_000);
        let out = tool.invoke(&[], Some(&input)).unwrap();
        assert_eq!(out.len(), input.len());
    }

    #[test]
    fn non_zero_exit_carries_stderr() {
        let tool = sh("echo boom >&2; exit 3");
        match tool.invoke(&[], None) {
            Err(ToolError::Failed { program, stderr, .. }) => {
                assert_eq!(program, "sh");
                assert_eq!(stderr, "boom");
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let tool = ProcessTool::new(vec!["refgen-no-such-program".to_string()]);
        assert!(matches!(tool.invoke(&[], None), Err(ToolError::Spawn { .. })));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let tool = sh("printf '\\377\\376'");
        assert!(matches!(tool.invoke(&[], None), Err(ToolError::InvalidOutput { .. })));
    }
}
