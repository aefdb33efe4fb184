//! IPv6 literal recognition and whole-token replacement
//!
//! OpenVPN 프로필 안에 들어 있는 IPv6 주소 리터럴을 찾아 새 주소로 교체합니다.
//!
//! - 리터럴은 공백(또는 문자열 시작/끝)으로 구분된 토큰 전체가 문법에 맞을 때만 인정됩니다.
//!   `xfe80::1x`, `[2001:db8::1]:1194` 같은 토큰 내부는 건드리지 않습니다.
//! - IPv4 주소, 호스트명, 포트 번호는 그대로 남습니다.
//! - 교체 값은 검증하지 않고 그대로 삽입합니다 (리졸버 결과를 신뢰).

use regex::Regex;

const H16: &str = "[0-9a-fA-F]{1,4}";
const IPV4: &str =
    r"(?:(?:25[0-5]|(?:2[0-4]|1?[0-9])?[0-9])\.){3}(?:25[0-5]|(?:2[0-4]|1?[0-9])?[0-9])";

/// Alternatives of the IPv6 text grammar, in the order they are tried.
fn literal_alternatives() -> Vec<String> {
    vec![
        // 1:2:3:4:5:6:7:8
        format!("(?:{H16}:){{7}}{H16}"),
        // 1::  ..  1:2:3:4:5:6:7::
        format!("(?:{H16}:){{1,7}}:"),
        // 1::8  ..  1:2:3:4:5:6::8
        format!("(?:{H16}:){{1,6}}:{H16}"),
        format!("(?:{H16}:){{1,5}}(?::{H16}){{1,2}}"),
        format!("(?:{H16}:){{1,4}}(?::{H16}){{1,3}}"),
        format!("(?:{H16}:){{1,3}}(?::{H16}){{1,4}}"),
        format!("(?:{H16}:){{1,2}}(?::{H16}){{1,5}}"),
        format!("{H16}:(?::{H16}){{1,6}}"),
        // ::2:3:4:5:6:7:8  ..  ::8, and bare ::
        format!(":(?:(?::{H16}){{1,7}}|:)"),
        // fe80::7:8%eth0
        format!("fe80:(?::[0-9a-fA-F]{{0,4}}){{0,4}}%[0-9a-zA-Z]+"),
        // ::255.255.255.255, ::ffff:255.255.255.255, ::ffff:0:255.255.255.255
        format!("::(?:ffff(?::0{{1,4}})?:)?{IPV4}"),
        // 2001:db8:3:4::192.0.2.33
        format!("(?:{H16}:){{1,4}}:{IPV4}"),
    ]
}

/// Result of a search-and-replace pass over a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    /// Whole-text comparison against the input, not a substitution count.
    pub changed: bool,
}

/// Recognizes whitespace-delimited IPv6 literals.
#[derive(Debug, Clone)]
pub struct Ipv6Matcher {
    literal: Regex,
    token: Regex,
}

impl Ipv6Matcher {
    pub fn new() -> Result<Self, regex::Error> {
        let pattern = format!("^(?:{})$", literal_alternatives().join("|"));
        Ok(Self {
            literal: Regex::new(&pattern)?,
            token: Regex::new(r"\S+")?,
        })
    }

    /// `true` if the whole `token` is an IPv6 literal.
    pub fn is_literal(&self, token: &str) -> bool {
        self.literal.is_match(token)
    }

    /// All literals found in `document`, in order of appearance.
    pub fn literals<'a>(&'a self, document: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.token
            .find_iter(document)
            .map(|m| m.as_str())
            .filter(move |token| self.is_literal(token))
    }

    /// Replaces every delimited literal in `document` with `replacement`.
    ///
    /// The workflow expects a single literal per profile, but all matching
    /// tokens are substituted.
    pub fn find_and_replace(&self, document: &str, replacement: &str) -> Substitution {
        let mut text = String::with_capacity(document.len() + replacement.len());
        let mut last = 0;

        for token in self.token.find_iter(document) {
            if !self.is_literal(token.as_str()) {
                continue;
            }
            text.push_str(&document[last..token.start()]);
            text.push_str(replacement);
            last = token.end();
        }
        text.push_str(&document[last..]);

        let changed = text != document;
        Substitution { text, changed }
    }
}
