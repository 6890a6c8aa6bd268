use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// The only files a dev proposal may touch: the bot's own deployable source
/// artifacts, addressed by the same path locally and in the code repo.
pub const DEV_ALLOWLIST: &[&str] = &["crates/bot/src/main.rs", "crates/bot/Cargo.toml"];

/// One staged multi-file change, held in a single slot until the operator
/// confirms with /dev_apply. Last write wins.
#[derive(Debug, Clone)]
pub struct DevProposal {
    pub created_at: DateTime<Utc>,
    pub reason: String,
    pub files: BTreeMap<String, String>,
}

impl DevProposal {
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "Created: {}",
            self.created_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        ));

        let reason = if self.reason.is_empty() {
            "(none)"
        } else {
            self.reason.as_str()
        };
        lines.push(format!("Reason: {reason}"));

        let file_list = if self.files.is_empty() {
            "(none)".to_string()
        } else {
            self.files.keys().cloned().collect::<Vec<_>>().join(", ")
        };
        lines.push(format!("Files: {file_list}"));

        for (path, content) in &self.files {
            lines.push(format!("{path}: {} chars", content.chars().count()));
        }

        lines.join("\n")
    }
}

pub fn is_allowlisted(path: &str) -> bool {
    DEV_ALLOWLIST.contains(&path)
}

/// Keeps only allowlisted entries with string contents; everything else is
/// silently dropped.
pub fn filter_allowlisted(files: &Value) -> BTreeMap<String, String> {
    let mut kept = BTreeMap::new();

    if let Some(map) = files.as_object() {
        for (path, content) in map {
            if is_allowlisted(path)
                && let Some(text) = content.as_str()
            {
                kept.insert(path.clone(), text.to_string());
            }
        }
    }

    kept
}
