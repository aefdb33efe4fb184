//! Resolver script source handling
//!
//! 리졸버 스크립트(PowerShell)의 소스와 출력에서 `$name = "value"` 형식의
//! 변수 할당을 읽어냅니다. 스크립트 소스는 캐시된 OpenVPN GUI 경로를
//! 저장하는 용도로도 쓰이며, 그 경우에만 파일을 다시 씁니다.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Returns the quoted value assigned to `variable` in `text`.
///
/// The first line whose trimmed start begins with `$variable` is used and the
/// value is the text strictly between its first and last `"`. A leading `$`
/// on `variable` is optional. `None` when no line matches or the matched line
/// does not hold a pair of quotes; `Some("")` for `$x = ""`.
pub fn extract<'a>(text: &'a str, variable: &str) -> Option<&'a str> {
    let line = text.lines().find(|line| assigns(line, variable))?;
    let first = line.find('"')?;
    let last = line.rfind('"')?;
    if first >= last {
        return None;
    }
    Some(&line[first + 1..last])
}

fn assigns(line: &str, variable: &str) -> bool {
    let name = variable.trim_start_matches('$');
    line.trim_start()
        .strip_prefix('$')
        .map_or(false, |rest| rest.starts_with(name))
}

/// Removes every line starting with `$variable` at column 0 and, when `value`
/// is given, inserts `$variable = "value"` right before the first empty line
/// (or at the end if the text has none). Indented assignments and
/// whitespace-only lines are left alone. Line endings of the input are kept.
pub fn with_assignment(text: &str, variable: &str, value: Option<&str>) -> String {
    let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };
    let name = variable.trim_start_matches('$');
    let prefix = format!("${}", name);

    let mut lines: Vec<String> = text
        .lines()
        .filter(|line| !line.starts_with(&prefix))
        .map(str::to_string)
        .collect();

    if let Some(value) = value {
        let at = lines.iter().position(|line| line.is_empty()).unwrap_or(lines.len());
        lines.insert(at, format!("${} = \"{}\"", name, value));
    }

    let mut out = lines.join(newline);
    out.push_str(newline);
    out
}

/// The resolver script, read once at startup.
#[derive(Debug, Clone)]
pub struct ScriptSource {
    path: PathBuf,
    text: String,
}

impl ScriptSource {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read resolver script: {}", path.display()))?;
        tracing::debug!("Loaded resolver script {} ({} bytes)", path.display(), text.len());
        Ok(Self {
            path: path.to_path_buf(),
            text,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Non-empty value of `variable` in the script source.
    pub fn variable(&self, variable: &str) -> Option<&str> {
        extract(&self.text, variable).filter(|value| !value.is_empty())
    }

    /// Rewrites the script file with `variable` replaced by `value`
    /// (or removed when `value` is `None`). The in-memory text is not touched.
    pub fn persist_assignment(&self, variable: &str, value: Option<&str>) -> Result<()> {
        let updated = with_assignment(&self.text, variable, value);
        std::fs::write(&self.path, updated)
            .with_context(|| format!("Failed to update resolver script: {}", self.path.display()))?;
        tracing::info!(
            "Updated ${} in {} ({})",
            variable.trim_start_matches('$'),
            self.path.display(),
            if value.is_some() { "set" } else { "removed" }
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "$dnsServer = \"2001:4860:4860::8888\"\n\
                          $hostName = \"vpn.example.com\"\n\
                          $ovpnFile = \"C:\\path\\a.ovpn\"\n\
                          \n\
                          (Resolve-DnsName $hostName -Server $dnsServer -Type AAAA).IPAddress\n";

    #[test]
    fn test_extract_quoted_value() {
        assert_eq!(extract(SCRIPT, "$ovpnFile"), Some("C:\\path\\a.ovpn"));
        assert_eq!(extract(SCRIPT, "ovpnFile"), Some("C:\\path\\a.ovpn"));
        assert_eq!(extract(SCRIPT, "hostName"), Some("vpn.example.com"));
    }

    #[test]
    fn test_extract_absent_variable() {
        assert_eq!(extract(SCRIPT, "$ovpnProgram"), None);
        assert_eq!(extract("", "$ovpnFile"), None);
    }

    #[test]
    fn test_extract_is_case_sensitive() {
        assert_eq!(extract(SCRIPT, "$OvpnFile"), None);
    }

    #[test]
    fn test_extract_guards_missing_quotes() {
        assert_eq!(extract("$ovpnFile = C:\\a.ovpn", "$ovpnFile"), None);
        assert_eq!(extract("$ovpnFile = \"C:\\a.ovpn", "$ovpnFile"), None);
        assert_eq!(extract("$ovpnFile = \"\"", "$ovpnFile"), Some(""));
    }

    #[test]
    fn test_extract_uses_first_and_last_quote() {
        let text = "  $ovpnFile = \"C:\\My \"VPN\"\\a.ovpn\"  # note\r\n";
        assert_eq!(extract(text, "$ovpnFile"), Some("C:\\My \"VPN\"\\a.ovpn"));
    }

    #[test]
    fn test_extract_first_matching_line_wins() {
        let text = "Write-Host \"$ovpnFile\"\n$ovpnFile = \"first\"\n$ovpnFile = \"second\"\n";
        assert_eq!(extract(text, "$ovpnFile"), Some("first"));
    }

    #[test]
    fn test_extract_from_resolver_output() {
        let output = "2001:db8::42\n$ovpnFile = \"D:\\vpn\\home.ovpn\"";
        assert_eq!(extract(output, "$ovpnFile"), Some("D:\\vpn\\home.ovpn"));
    }

    #[test]
    fn test_with_assignment_inserts_before_first_blank_line() {
        let updated = with_assignment(SCRIPT, "ovpnProgram", Some("C:\\OpenVPN\\openvpn-gui.exe"));
        let lines: Vec<&str> = updated.lines().collect();
        assert_eq!(lines[3], "$ovpnProgram = \"C:\\OpenVPN\\openvpn-gui.exe\"");
        assert_eq!(lines[4], "");
        assert_eq!(extract(&updated, "ovpnProgram"), Some("C:\\OpenVPN\\openvpn-gui.exe"));
    }

    #[test]
    fn test_with_assignment_replaces_existing_line() {
        let text = "$ovpnProgram = \"C:\\old.exe\"\n$ovpnFile = \"a.ovpn\"\n\nbody\n";
        let updated = with_assignment(text, "$ovpnProgram", Some("C:\\new.exe"));
        assert_eq!(updated, "$ovpnFile = \"a.ovpn\"\n$ovpnProgram = \"C:\\new.exe\"\n\nbody\n");
    }

    #[test]
    fn test_with_assignment_remove_only() {
        let text = "$ovpnProgram = \"C:\\old.exe\"\r\n$ovpnFile = \"a.ovpn\"\r\n\r\nbody\r\n";
        let updated = with_assignment(text, "ovpnProgram", None);
        assert_eq!(updated, "$ovpnFile = \"a.ovpn\"\r\n\r\nbody\r\n");
    }

    #[test]
    fn test_with_assignment_only_touches_column_zero_and_empty_lines() {
        let text = "if ($x) {\n    $ovpnProgram = \"C:\\inner.exe\"\n}\n   \n$ovpnProgram = \"C:\\old.exe\"\n\nbody\n";
        let updated = with_assignment(text, "ovpnProgram", Some("C:\\new.exe"));
        assert_eq!(
            updated,
            "if ($x) {\n    $ovpnProgram = \"C:\\inner.exe\"\n}\n   \n$ovpnProgram = \"C:\\new.exe\"\n\nbody\n"
        );
    }

    #[test]
    fn test_with_assignment_appends_without_blank_line() {
        let updated = with_assignment("$a = \"1\"", "b", Some("2"));
        assert_eq!(updated, "$a = \"1\"\n$b = \"2\"\n");
    }

    #[test]
    fn test_script_source_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ResolveIPv6.ps1");
        std::fs::write(&path, SCRIPT).unwrap();

        let script = ScriptSource::load(&path).unwrap();
        assert_eq!(script.variable("ovpnProgram"), None);
        script.persist_assignment("ovpnProgram", Some("C:\\gui.exe")).unwrap();

        let reloaded = ScriptSource::load(&path).unwrap();
        assert_eq!(reloaded.variable("ovpnProgram"), Some("C:\\gui.exe"));
        assert_eq!(reloaded.variable("ovpnFile"), Some("C:\\path\\a.ovpn"));
        // in-memory copy stays as loaded
        assert_eq!(script.text(), SCRIPT);
    }
}
