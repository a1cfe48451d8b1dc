/*!
 * Symbolic validation with an external Prolog parser.
 *
 * Coptic output is checked by a dependency parser written in Prolog. The
 * interpreter (Trealla by default) runs as a subprocess in its own process
 * group; the program is written to its stdin and the answer is read from
 * stdout. The caller enforces the time limit: on expiry the whole group is
 * killed and the child reaped, so a parser stuck in a search loop cannot
 * outlive the request.
 */

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;

use super::{ValidationVerdict, Validator, ValidatorKind, VerdictStatus};

/// Time allowed for the `--version` availability probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Time allowed for draining the output pipes once the child is gone
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Symbolic validator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolicConfig {
    /// Prolog interpreter executable
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Arguments making the interpreter read a program from stdin
    #[serde(default = "default_interpreter_args")]
    pub interpreter_args: Vec<String>,

    /// Parser program consulted before the query
    #[serde(default = "default_parser_path")]
    pub parser_path: PathBuf,

    /// Parse predicate, called as `goal(Text, Tree)`
    #[serde(default = "default_goal")]
    pub goal: String,

    /// Hard limit for one parser run
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_interpreter() -> String {
    "tpl".to_string()
}

fn default_interpreter_args() -> Vec<String> {
    vec!["-q".to_string(), "--consult".to_string()]
}

fn default_parser_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join("copticNLP")
        .join("coptic-dependency-parser")
        .join("coptic_parser_master.pl")
}

fn default_goal() -> String {
    "parse_coptic".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for SymbolicConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            interpreter_args: default_interpreter_args(),
            parser_path: default_parser_path(),
            goal: default_goal(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Quote a string as a Prolog atom
pub fn quote_atom(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for c in text.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => quoted.push_str(&format!("\\x{:x}\\", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

/// A Prolog program built from consulted files and one goal
///
/// The goal runs as a directive; `halt(0)` follows it, and a trailing
/// `halt(1)` only runs if the goal failed or raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrologQuery {
    consults: Vec<PathBuf>,
    goal: String,
}

impl PrologQuery {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            consults: Vec::new(),
            goal: goal.into(),
        }
    }

    /// Consult a file before running the goal
    pub fn consult(mut self, path: impl Into<PathBuf>) -> Self {
        self.consults.push(path.into());
        self
    }

    /// Query that prints `VALID` when `predicate(Text, _)` succeeds and `INVALID` otherwise
    pub fn parse_check(parser: &Path, predicate: &str, text: &str) -> Self {
        let goal = format!(
            "({}({}, _) -> write('VALID') ; write('INVALID'))",
            predicate,
            quote_atom(text)
        );
        Self::new(goal).consult(parser)
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// Program text for the interpreter
    pub fn program(&self) -> String {
        let mut program = String::new();
        for path in &self.consults {
            program.push_str(&format!(":- consult({}).\n", quote_atom(&path.to_string_lossy())));
        }
        program.push_str(&format!(":- {}, nl, halt(0).\n", self.goal));
        program.push_str(":- halt(1).\n");
        program
    }
}

/// How a parser run ended
#[derive(Debug)]
enum RunOutcome {
    Finished {
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
    TimedOut,
}

/// Whether stdout carries a standalone `VALID` token
pub fn has_valid_token(stdout: &str) -> bool {
    stdout.split_whitespace().any(|token| token == "VALID")
}

/// Validator backed by a Prolog parser subprocess
#[derive(Debug, Clone)]
pub struct SymbolicValidator {
    config: SymbolicConfig,
}

impl SymbolicValidator {
    pub fn new(config: SymbolicConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SymbolicConfig {
        &self.config
    }

    /// Program checking `text`
    pub fn build_query(&self, text: &str) -> PrologQuery {
        PrologQuery::parse_check(&self.config.parser_path, &self.config.goal, text)
    }

    /// Whether the interpreter answers `--version` within a few seconds
    pub async fn is_available(&self) -> bool {
        let status = Command::new(&self.config.interpreter)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        tokio::select! {
            result = status => matches!(result, Ok(status) if status.success()),
            _ = tokio::time::sleep(PROBE_TIMEOUT) => {
                debug!("Interpreter '{}' did not answer the version probe", self.config.interpreter);
                false
            }
        }
    }

    /// Spawn the interpreter, feed it `program` and wait under the time limit
    async fn run(&self, program: &str) -> std::io::Result<RunOutcome> {
        let mut command = Command::new(&self.config.interpreter);
        command
            .args(&self.config.interpreter_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn()?;
        let pid = child.id();
        let stdin = child.stdin.take();
        let mut stdout_task = tokio::spawn(read_pipe(child.stdout.take()));
        let mut stderr_task = tokio::spawn(read_pipe(child.stderr.take()));

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let waited = tokio::select! {
            result = exchange(&mut child, stdin, program) => Some(result),
            _ = tokio::time::sleep(timeout) => None,
        };

        match waited {
            Some(Ok(status)) => {
                // Leftover background processes of the interpreter go with it
                kill_process_group(pid);
                let stdout = drain(&mut stdout_task).await;
                let stderr = drain(&mut stderr_task).await;
                Ok(RunOutcome::Finished { status, stdout, stderr })
            }
            Some(Err(e)) => {
                terminate(&mut child, pid).await;
                stdout_task.abort();
                stderr_task.abort();
                Err(e)
            }
            None => {
                terminate(&mut child, pid).await;
                stdout_task.abort();
                stderr_task.abort();
                Ok(RunOutcome::TimedOut)
            }
        }
    }
}

/// Write the program, close stdin and wait for the exit status
async fn exchange(child: &mut Child, stdin: Option<ChildStdin>, program: &str) -> std::io::Result<ExitStatus> {
    if let Some(mut pipe) = stdin {
        // A parser that exits early closes the pipe; its exit status says the rest
        if let Err(e) = pipe.write_all(program.as_bytes()).await {
            debug!("Writing to interpreter stdin failed: {}", e);
        }
        let _ = pipe.shutdown().await;
    }
    child.wait().await
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buffer = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buffer).await;
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect a reader task, giving up once the drain window is over
async fn drain(task: &mut JoinHandle<String>) -> String {
    match tokio::time::timeout(DRAIN_TIMEOUT, &mut *task).await {
        Ok(Ok(output)) => output,
        _ => {
            task.abort();
            String::new()
        }
    }
}

/// Kill the child's process group and reap the child
async fn terminate(child: &mut Child, pid: Option<u32>) {
    kill_process_group(pid);
    if let Err(e) = child.kill().await {
        debug!("Reaping interpreter failed: {}", e);
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        // SAFETY: killpg only sends a signal. The child leads its own group
        // (process_group(0)), so the group id equals its pid.
        unsafe {
            libc::killpg(pid as libc::pid_t, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

#[async_trait]
impl Validator for SymbolicValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Symbolic
    }

    async fn validate(&self, _source: &str, translation: &str, language: &str) -> ValidationVerdict {
        let kind = ValidatorKind::Symbolic;
        let program = self.build_query(translation).program();

        match self.run(&program).await {
            Ok(RunOutcome::Finished { status, stdout, stderr }) => {
                if status.success() && has_valid_token(&stdout) {
                    debug!("Symbolic parser accepted the translation");
                    ValidationVerdict::valid(kind, language)
                } else if status.success() {
                    ValidationVerdict::from_errors(
                        kind,
                        language,
                        vec!["Coptic syntax error detected".to_string()],
                        VerdictStatus::Invalid,
                    )
                    .with_extra("details", stderr)
                } else {
                    let message = match status.code() {
                        Some(code) => format!("Validation error: parser exited with status {}", code),
                        None => "Validation error: parser terminated by signal".to_string(),
                    };
                    warn!("{}", message);
                    ValidationVerdict::error(kind, language, message).with_extra("details", stderr)
                }
            }
            Ok(RunOutcome::TimedOut) => {
                warn!(
                    "Symbolic parser timed out after {}s, process group killed",
                    self.config.timeout_secs
                );
                ValidationVerdict::timeout(kind, language, "Coptic parser timeout")
            }
            Err(e) => {
                warn!("Failed to run '{}': {}", self.config.interpreter, e);
                ValidationVerdict::error(kind, language, format!("Validation error: {}", e))
            }
        }
    }
}
