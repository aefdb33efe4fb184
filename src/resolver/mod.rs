//! Resolver script invocation
//!
//! 리졸버 스크립트를 PowerShell로 실행하고 표준 출력을 돌려받습니다.
//! 스크립트는 임시 `.ps1` 파일로 기록한 뒤 실행 정책 구문과 함께 같은 세션에서
//! 호출합니다. 빈 출력은 실패가 아니라 "주소 없음"이라는 값입니다.

use anyhow::{Context, Result};
use std::io::Write;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::utils::apply_creation_flags;

/// Non-blank stdout lines of a resolver run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverOutput {
    lines: Vec<String>,
}

impl ResolverOutput {
    pub fn from_stdout(stdout: &str) -> Self {
        Self {
            lines: stdout
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// First output line, trimmed. Empty when the script printed nothing.
    pub fn address(&self) -> &str {
        self.lines.first().map(|l| l.trim()).unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.address().is_empty()
    }

    /// Whole output, one line per entry.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Runs a resolver script and returns what it printed.
#[allow(async_fn_in_trait)]
pub trait Resolve {
    async fn resolve(&self, script: &str) -> Result<ResolverOutput>;
}

/// Runs the script through a PowerShell executable.
#[derive(Debug, Clone)]
pub struct PowerShellResolver {
    interpreter: String,
    policy_directive: String,
    timeout: Duration,
}

impl PowerShellResolver {
    pub fn new(interpreter: impl Into<String>, policy_directive: impl Into<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            policy_directive: policy_directive.into(),
            timeout,
        }
    }

    /// `-Command` argument: policy directive, then the script file in the same session.
    fn command_text(&self, script_path: &std::path::Path) -> String {
        let directive = self.policy_directive.trim().trim_end_matches(';');
        let quoted = quote_single(&script_path.to_string_lossy());
        if directive.is_empty() {
            format!("& {}", quoted)
        } else {
            format!("{}; & {}", directive, quoted)
        }
    }
}

impl Resolve for PowerShellResolver {
    async fn resolve(&self, script: &str) -> Result<ResolverOutput> {
        let mut file = tempfile::Builder::new()
            .prefix("openvpn-wrapper-")
            .suffix(".ps1")
            .tempfile()
            .context("Failed to create temporary script file")?;
        // Windows PowerShell 5는 BOM이 없으면 UTF-8을 ANSI로 읽음
        file.write_all("\u{feff}".as_bytes())?;
        file.write_all(script.as_bytes())?;
        file.flush()?;

        let command_text = self.command_text(file.path());
        tracing::debug!("Running resolver: {} -Command {}", self.interpreter, command_text);

        let mut cmd = Command::new(&self.interpreter);
        cmd.args(["-NoProfile", "-NonInteractive", "-Command", &command_text])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        apply_creation_flags(&mut cmd);

        let child = cmd
            .spawn()
            .with_context(|| format!("Failed to start {}", self.interpreter))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.with_context(|| format!("{} process error", self.interpreter))?,
            Err(_) => {
                // 타임아웃 — kill_on_drop으로 프로세스 종료됨
                tracing::warn!("Resolver timed out after {}s", self.timeout.as_secs());
                anyhow::bail!("Resolver script timed out after {}s", self.timeout.as_secs());
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            tracing::error!("Resolver failed (exit {:?}): {}", output.status.code(), stderr.trim());
            anyhow::bail!(
                "Resolver script exited with {:?}: {}",
                output.status.code(),
                stderr.trim()
            );
        }
        if !stderr.trim().is_empty() {
            tracing::warn!("Resolver stderr: {}", stderr.trim());
        }

        let result = ResolverOutput::from_stdout(&stdout);
        tracing::debug!("Resolver output: {:?}", result);
        Ok(result)
    }
}

/// PowerShell single-quoted string literal.
fn quote_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_output_address_is_first_line() {
        let out = ResolverOutput::from_stdout("\r\n  2001:db8::42  \r\n$ovpnFile = \"C:\\a.ovpn\"\r\n");
        assert_eq!(out.address(), "2001:db8::42");
        assert!(!out.is_blank());
        assert_eq!(out.text(), "  2001:db8::42\n$ovpnFile = \"C:\\a.ovpn\"");
    }

    #[test]
    fn test_empty_output_is_blank() {
        assert!(ResolverOutput::from_stdout("").is_blank());
        assert!(ResolverOutput::from_stdout("\n   \n").is_blank());
        assert_eq!(ResolverOutput::default().address(), "");
    }

    #[test]
    fn test_command_text_quotes_path() {
        let resolver = PowerShellResolver::new(
            "pwsh",
            "Set-ExecutionPolicy -Scope CurrentUser -ExecutionPolicy Unrestricted;",
            Duration::from_secs(1),
        );
        assert_eq!(
            resolver.command_text(Path::new("/tmp/it's.ps1")),
            "Set-ExecutionPolicy -Scope CurrentUser -ExecutionPolicy Unrestricted; & '/tmp/it''s.ps1'"
        );

        let bare = PowerShellResolver::new("pwsh", "  ", Duration::from_secs(1));
        assert_eq!(bare.command_text(Path::new("/tmp/a.ps1")), "& '/tmp/a.ps1'");
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_an_error() {
        let resolver = PowerShellResolver::new(
            "openvpn-wrapper-no-such-shell",
            "",
            Duration::from_secs(5),
        );
        let result = resolver.resolve("Write-Output '::1'").await;
        assert!(result.is_err());
    }
}
