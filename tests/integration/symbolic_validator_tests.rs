/*!
 * Tests for the symbolic validator subprocess handling.
 *
 * A POSIX shell stands in for the Prolog interpreter: the scripts read the
 * program from stdin (or ignore it) and answer the way the parser would.
 */

use std::time::{Duration, Instant};

use traductal::validation::{SymbolicConfig, SymbolicValidator, Validator, VerdictStatus};

fn shell_validator(script: &str, timeout_secs: u64) -> SymbolicValidator {
    SymbolicValidator::new(SymbolicConfig {
        interpreter: "sh".to_string(),
        interpreter_args: vec!["-c".to_string(), script.to_string()],
        timeout_secs,
        ..Default::default()
    })
}

#[tokio::test]
async fn test_validate_withValidAnswer_shouldBeValid() {
    let validator = shell_validator("cat >/dev/null; echo VALID", 5);
    let verdict = validator.validate("I am", "ⲁⲛⲟⲕ ⲡⲉ", "cop").await;

    assert_eq!(verdict.status, VerdictStatus::Valid);
    assert!(verdict.errors.is_empty());
}

#[tokio::test]
async fn test_validate_withInvalidAnswer_shouldReportSyntaxError() {
    let validator = shell_validator("cat >/dev/null; echo 'no parse' >&2; echo INVALID", 5);
    let verdict = validator.validate("I am", "ⲁⲛⲟⲕ", "cop").await;

    assert_eq!(verdict.status, VerdictStatus::Invalid);
    assert_eq!(verdict.errors, vec!["Coptic syntax error detected".to_string()]);
    assert_eq!(verdict.extra["details"], "no parse\n");
    assert!(verdict.has_errors());
}

#[tokio::test]
async fn test_validate_shouldFeedProgramOnStdin() {
    let validator = shell_validator("grep -q \"parse_coptic('ⲁⲛⲟⲕ', _)\" && echo VALID", 5);
    let verdict = validator.validate("I am", "ⲁⲛⲟⲕ", "cop").await;

    assert_eq!(verdict.status, VerdictStatus::Valid);
}

#[tokio::test]
async fn test_validate_withNonZeroExit_shouldBeError() {
    let validator = shell_validator("cat >/dev/null; exit 3", 5);
    let verdict = validator.validate("I am", "ⲁⲛⲟⲕ", "cop").await;

    assert_eq!(verdict.status, VerdictStatus::Error);
    assert_eq!(
        verdict.errors,
        vec!["Validation error: parser exited with status 3".to_string()]
    );
    assert!(!verdict.has_errors());
}

#[tokio::test]
async fn test_validate_withHangingParser_shouldTimeOutAndReturnPromptly() {
    let validator = shell_validator("sleep 30", 1);
    let started = Instant::now();

    let verdict = validator.validate("I am", "ⲁⲛⲟⲕ", "cop").await;

    assert_eq!(verdict.status, VerdictStatus::Timeout);
    assert_eq!(verdict.errors, vec!["Coptic parser timeout".to_string()]);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_validate_withTimeout_shouldKillWholeProcessGroup() {
    let dir = tempfile::TempDir::new().unwrap();
    let pid_file = dir.path().join("grandchild.pid");
    let script = format!("sleep 30 & echo $! > '{}'; wait", pid_file.display());
    let validator = shell_validator(&script, 1);

    let verdict = validator.validate("I am", "ⲁⲛⲟⲕ", "cop").await;
    assert_eq!(verdict.status, VerdictStatus::Timeout);

    let pid = std::fs::read_to_string(&pid_file).unwrap().trim().to_string();
    let proc_entry = std::path::PathBuf::from(format!("/proc/{}", pid));

    // The orphaned grandchild is reaped by init shortly after the kill
    let deadline = Instant::now() + Duration::from_secs(3);
    while proc_entry.exists() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(!proc_entry.exists(), "grandchild {} survived the timeout", pid);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_validate_withBackgroundProcessLeftBehind_shouldKillItOnNormalExit() {
    let dir = tempfile::TempDir::new().unwrap();
    let pid_file = dir.path().join("leftover.pid");
    let script = format!(
        "cat >/dev/null; sleep 30 >/dev/null 2>&1 & echo $! > '{}'; echo VALID",
        pid_file.display()
    );
    let validator = shell_validator(&script, 5);
    let started = Instant::now();

    let verdict = validator.validate("I am", "ⲁⲛⲟⲕ ⲡⲉ", "cop").await;
    assert_eq!(verdict.status, VerdictStatus::Valid);
    assert!(started.elapsed() < Duration::from_secs(3));

    let pid = std::fs::read_to_string(&pid_file).unwrap().trim().to_string();
    let proc_entry = std::path::PathBuf::from(format!("/proc/{}", pid));

    let deadline = Instant::now() + Duration::from_secs(3);
    while proc_entry.exists() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(!proc_entry.exists(), "background process {} outlived the parser", pid);
}

#[tokio::test]
async fn test_validate_withMissingInterpreter_shouldBeError() {
    let validator = SymbolicValidator::new(SymbolicConfig {
        interpreter: "/nonexistent/traductal-tpl".to_string(),
        ..Default::default()
    });
    let verdict = validator.validate("I am", "ⲁⲛⲟⲕ", "cop").await;

    assert_eq!(verdict.status, VerdictStatus::Error);
    assert!(verdict.errors[0].starts_with("Validation error:"));
}

#[tokio::test]
async fn test_isAvailable_withMissingInterpreter_shouldBeFalse() {
    let missing = SymbolicValidator::new(SymbolicConfig {
        interpreter: "/nonexistent/traductal-tpl".to_string(),
        ..Default::default()
    });
    assert!(!missing.is_available().await);
}
