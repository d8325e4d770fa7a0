//! Migration directives
//!
//! Directives configure a single migration from its comment preamble, in the
//! form `@ratchet.Key=Value`. The preamble is the run of blank lines and
//! comments before the first line of SQL; anything after that is never
//! scanned for directives.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CoreError, CoreResult};
use crate::statement::StatementKind;

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*@ratchet\.(?P<key>\w+)=(?P<value>\w+)").expect("static regex")
});

const KEY_STATEMENT_KIND: &str = "StatementKind";
// Spelling used by older releases; still accepted.
const KEY_STATEMENT_KIND_ALIAS: &str = "migrationKind";
const KEY_CONCURRENCY: &str = "Concurrency";

/// Per-migration configuration parsed from the file preamble.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationDirectives {
    /// Overrides the classifier's file kind unconditionally
    pub statement_kind: Option<StatementKind>,
    /// Overrides the partitioned-DML concurrency for this migration
    pub concurrency: Option<usize>,
}

/// Extract directives from a migration file's preamble.
///
/// Unknown directive keys fail loudly with [`CoreError::UnknownDirective`].
/// Unknown `StatementKind` values are accepted here and surface later when
/// the coordinator refuses to execute them.
pub fn parse_directives(migration: &str) -> CoreResult<MigrationDirectives> {
    let preamble = extract_preamble(migration);

    let mut directives = MigrationDirectives::default();
    for caps in DIRECTIVE_RE.captures_iter(&preamble) {
        let key = &caps["key"];
        let value = &caps["value"];
        match key {
            KEY_STATEMENT_KIND | KEY_STATEMENT_KIND_ALIAS => {
                directives.statement_kind = Some(StatementKind::from_tag(value));
            }
            KEY_CONCURRENCY => {
                let concurrency: usize =
                    value
                        .parse()
                        .map_err(|_| CoreError::InvalidDirectiveValue {
                            key: key.to_string(),
                            value: value.to_string(),
                        })?;
                if concurrency == 0 {
                    return Err(CoreError::InvalidDirectiveValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    });
                }
                directives.concurrency = Some(concurrency);
            }
            _ => {
                return Err(CoreError::UnknownDirective {
                    key: key.to_string(),
                })
            }
        }
    }

    Ok(directives)
}

/// Return all comment content from the start of a migration file, up to the
/// first non-empty, non-comment line. Comment markers are stripped and each
/// captured line is trimmed.
fn extract_preamble(migration: &str) -> String {
    const BLOCK_START: &str = "/*";
    const BLOCK_END: &str = "*/";
    const LINE_PREFIX: &str = "--";
    const LINE_ALT_PREFIX: &str = "#";

    let mut comments: Vec<String> = Vec::new();
    let mut in_block = false;
    for raw in migration.lines() {
        let mut line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if !in_block {
            if let Some(rest) = line.strip_prefix(BLOCK_START) {
                in_block = true;
                line = rest;
            } else if let Some(rest) = line.strip_prefix(LINE_PREFIX) {
                line = rest;
            } else if let Some(rest) = line.strip_prefix(LINE_ALT_PREFIX) {
                line = rest;
            } else {
                // Not in a comment and the line is not empty: the preamble
                // is over.
                break;
            }
        }

        if in_block {
            if let Some(idx) = line.find(BLOCK_END) {
                line = &line[..idx];
                in_block = false;
            }
        }

        let line = line.trim();
        if !line.is_empty() {
            comments.push(line.to_string());
        }
    }

    comments.join("\n")
}

#[cfg(test)]
#[path = "directive_test.rs"]
mod tests;
