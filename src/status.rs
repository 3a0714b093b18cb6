// src/status.rs

//! Best-effort parsing of orchestrator CLI reports.
//!
//! All functions here are pure and never fail: malformed input degrades to an
//! empty result, so a parse problem can never block a sweep.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// Substrings marking status lines in an instance-status (`ns-show`) report.
pub const STATUS_KEYWORDS: [&str; 2] = ["config-status", "operational-status"];

pub const RUNNING_MARKER: &str = "running";
pub const CONFIGURED_MARKER: &str = "configured";

/// Header cell of the `ns-list` table.
const INSTANCE_LIST_HEADER: &str = "ns instance name";

/// Extract the status lines of an instance-status report.
///
/// Every line mentioning one of [`STATUS_KEYWORDS`] is kept verbatim
/// (trimmed) as one token.
pub fn parse_instance_status(raw: &str) -> BTreeSet<String> {
    raw.lines()
        .filter(|line| STATUS_KEYWORDS.iter().any(|kw| line.contains(kw)))
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Ready means a "running" marker and a "configured" marker are both present.
///
/// A marker counts when it appears as a whole word in one of the tokens, so
/// `"running"` matches `| operational-status | running |` but not
/// `| operational-status | not-runningish |`.
pub fn is_ready(tokens: &BTreeSet<String>) -> bool {
    let has = |marker: &str| tokens.iter().any(|t| contains_word(t, marker));
    has(RUNNING_MARKER) && has(CONFIGURED_MARKER)
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .any(|w| w.eq_ignore_ascii_case(word))
}

static ACCOUNT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]+)(\d+)$").expect("static regex"));

/// Extract numeric account identifiers from a `vim-list` style report.
///
/// Tokens are split on whitespace and `|`; a token counts when it is exactly
/// `<prefix><digits>` (e.g. `pop6001` for prefix `pop`). Everything else is
/// skipped. Identifiers are returned in encounter order.
pub fn parse_account_list(raw: &str, prefix: &str) -> Vec<u32> {
    raw.split(|c: char| c.is_whitespace() || c == '|')
        .filter_map(|token| {
            let token = token.trim_matches(|c: char| c == ',' || c == '"' || c == '\'');
            let caps = ACCOUNT_TOKEN.captures(token)?;
            if &caps[1] != prefix {
                return None;
            }
            caps[2].parse::<u32>().ok()
        })
        .collect()
}

/// Extract instance names from the first column of an `ns-list` table.
///
/// Border rows (`+----+`) and the header row are skipped.
pub fn parse_instance_list(raw: &str) -> Vec<String> {
    let mut names = Vec::new();
    for line in raw.lines() {
        let first = line
            .split('|')
            .map(|cell| cell.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '+' | '-')))
            .find(|cell| !cell.is_empty());

        match first {
            Some(cell) if cell == INSTANCE_LIST_HEADER => continue,
            Some(cell) => names.push(cell.to_string()),
            None => continue,
        }
    }
    names
}

/// Parse the HTTP status code `curl -w '%{http_code}'` printed as its last line.
pub fn parse_http_status(raw: &str) -> Option<u16> {
    raw.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .and_then(|l| l.parse::<u16>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS_SHOW: &str = "\
+--------------------+---------------+
| field              | value         |
+--------------------+---------------+
| name               | \"PiPoInst0\"   |
| operational-status | \"running\"     |
| config-status      | \"configured\"  |
+--------------------+---------------+
";

    fn tokens(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn instance_status_keeps_only_status_lines() {
        let parsed = parse_instance_status(NS_SHOW);
        assert_eq!(parsed.len(), 2);
        assert!(parsed.iter().all(|l| l.contains("status")));
        assert!(is_ready(&parsed));
    }

    #[test]
    fn garbage_status_yields_empty_set() {
        assert!(parse_instance_status("").is_empty());
        assert!(parse_instance_status("\u{0}\u{1}garbage\n???").is_empty());
    }

    #[test]
    fn ready_requires_both_markers() {
        assert!(!is_ready(&BTreeSet::new()));
        assert!(!is_ready(&tokens(&["| operational-status | running |"])));
        assert!(!is_ready(&tokens(&["| config-status | configured |"])));
        assert!(is_ready(&tokens(&[
            "| operational-status | running |",
            "| config-status | configured |",
        ])));
    }

    #[test]
    fn ready_ignores_partial_words() {
        let t = tokens(&[
            "| operational-status | init |",
            "| config-status | configuring |",
        ]);
        assert!(!is_ready(&t));
    }

    #[test]
    fn account_list_in_encounter_order() {
        assert_eq!(
            parse_account_list("pop6001 ... \npop6002 ...", "pop"),
            vec![6001, 6002]
        );
    }

    #[test]
    fn account_list_reads_table_rows() {
        let raw = "\
+----------+--------------------------------------+
| vim name | uuid                                 |
+----------+--------------------------------------+
| pop6003  | 0d6b1c2e-7b4e-4a55-9d5f-2b1d0b8b7a11 |
| other1   | 6e1f6f10-91a6-4c43-9a1e-58f1cc2f3f90 |
| pop6001  | 1b7a0e52-3d5c-4f3a-8b77-7d1d2b4c1a22 |
+----------+--------------------------------------+
";
        assert_eq!(parse_account_list(raw, "pop"), vec![6003, 6001]);
    }

    #[test]
    fn account_list_without_matches_is_empty() {
        assert!(parse_account_list("no accounts here\n", "pop").is_empty());
        assert!(parse_account_list("", "pop").is_empty());
        assert!(parse_account_list("popcorn 12pop", "pop").is_empty());
    }

    #[test]
    fn instance_list_skips_header_and_borders() {
        let raw = "\
+------------------+--------------------------------------+
| ns instance name | id                                   |
+------------------+--------------------------------------+
| PiPoInst0        | 5b2c0e0a-1111-2222-3333-444455556666 |
| PiPoInst1        | 6c3d1f1b-1111-2222-3333-444455556666 |
+------------------+--------------------------------------+
";
        assert_eq!(parse_instance_list(raw), vec!["PiPoInst0", "PiPoInst1"]);
        assert!(parse_instance_list("").is_empty());
    }

    #[test]
    fn http_status_from_last_line() {
        assert_eq!(parse_http_status("{\"ok\":true}\n201\n"), Some(201));
        assert_eq!(parse_http_status("nope"), None);
    }
}
