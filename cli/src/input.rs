//! Reads the candidate source file.
//!
//! Two formats are accepted: a plain text file with one CIDR block or IP
//! literal per line (blank lines and `#` comments ignored), or a JSON array
//! of `{"address": ...}` objects as written by the pool file. A JSON list is
//! treated as pre-expanded: every address is probed and sampling is skipped.

use std::net::IpAddr;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One entry of the persisted address pool.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolEntry {
    pub address: String,
}

pub enum Input {
    /// Tokens still to be expanded and sampled, one group per token.
    Tokens(Vec<String>),
    /// Already-concrete addresses; probe all of them.
    Literals(Vec<IpAddr>),
}

/// Reading the file at all is the one fatal error of the pipeline; bad
/// entries inside it are skipped with a warning.
pub fn read_input(path: &Path) -> anyhow::Result<Input> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read input file {}", path.display()))?;
    let trimmed = content.trim();

    if trimmed.starts_with('[') {
        // Falls through to line mode when the array does not parse.
        if let Ok(entries) = serde_json::from_str::<Vec<PoolEntry>>(trimmed) {
            let addrs = entries
                .iter()
                .filter_map(|entry| match entry.address.parse::<IpAddr>() {
                    Ok(addr) => Some(addr),
                    Err(_) => {
                        warn!("skipping pool entry '{}': not an IP address", entry.address);
                        None
                    }
                })
                .collect();
            return Ok(Input::Literals(addrs));
        }
    }

    let tokens = trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect();
    Ok(Input::Tokens(tokens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("edgescan-input-{}-{name}", std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn text_file_yields_tokens_without_comments() {
        let path = write_temp("text", "# header\n1.1.1.0/24\n\n  8.8.8.8  \n");
        let Input::Tokens(tokens) = read_input(&path).unwrap() else {
            panic!("expected token mode");
        };
        assert_eq!(tokens, vec!["1.1.1.0/24".to_string(), "8.8.8.8".to_string()]);
    }

    #[test]
    fn json_file_yields_literals() {
        let path = write_temp(
            "json",
            r#"[{"address": "1.1.1.1"}, {"address": "2606:4700::1111"}]"#,
        );
        let Input::Literals(addrs) = read_input(&path).unwrap() else {
            panic!("expected literal mode");
        };
        assert_eq!(addrs.len(), 2);
        assert_eq!(addrs[0], "1.1.1.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn json_file_skips_unparseable_addresses() {
        let path = write_temp("badjson", r#"[{"address": "1.1.1.1"}, {"address": "nope"}]"#);
        let Input::Literals(addrs) = read_input(&path).unwrap() else {
            panic!("expected literal mode");
        };
        assert_eq!(addrs.len(), 1);
    }

    #[test]
    fn broken_json_falls_back_to_line_mode() {
        let path = write_temp("broken", "[not json at all");
        let Input::Tokens(tokens) = read_input(&path).unwrap() else {
            panic!("expected token fallback");
        };
        assert_eq!(tokens, vec!["[not json at all".to_string()]);
    }

    #[test]
    fn missing_file_is_fatal() {
        assert!(read_input(Path::new("/nonexistent/edgescan-ip.txt")).is_err());
    }
}
