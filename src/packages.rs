//! Package lists
//!
//! Accepts plain lists (names separated by whitespace or commas, `#`
//! comments) and DEPENDS.txt-style files:
//!
//! ```text
//! package foo         # section header, not installed
//! depend bar baz      # installed
//! hard qux            # installed
//! soft quux           # installed
//! ```

use crate::error::{TlsetupError, TlsetupResult};
use std::collections::BTreeSet;
use std::path::Path;
use tokio::fs;

/// Flatten a package list into sorted, unique names
pub fn flatten(text: &str) -> Vec<String> {
    let mut names = BTreeSet::new();
    for line in text.lines() {
        let line = line.split('#').next().unwrap_or_default();
        let mut words = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|w| !w.is_empty());
        let Some(first) = words.next() else {
            continue;
        };
        match first {
            "package" => {}
            "depend" | "hard" | "soft" => names.extend(words.map(str::to_string)),
            name => {
                names.insert(name.to_string());
                names.extend(words.map(str::to_string));
            }
        }
    }
    names.into_iter().collect()
}

/// Merge inline names with the contents of an optional package file
pub async fn collect(inline: &[String], file: Option<&Path>) -> TlsetupResult<Vec<String>> {
    let mut text = inline.join("\n");
    if let Some(path) = file {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| TlsetupError::io(format!("reading package file {}", path.display()), e))?;
        text.push('\n');
        text.push_str(&content);
    }
    Ok(flatten(&text))
}
