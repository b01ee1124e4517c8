//! Script lint pipeline: advisory style and correctness checks
//!
//! Diagnostics are informational only; this pipeline never fails the
//! overall task. The rule set comes from the configured rule file (JSON,
//! same shape as [`LintRules`]) with built-in defaults when absent.

use crate::globlist;
use crate::pipeline::{PipelineContext, PipelineError, PipelineOutcome};
use crate::report;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Ordered lint groups, relative to the script source root. Non-recursive;
/// the build pipeline's recursive superset covers nested files.
pub const LINT_ORDER: &[&str] = &[
    "Config.js",
    "Base/*.js",
    "Layout/*.js",
    "Modules/*.js",
    "Themes/*.js",
    "Utilities/*.js",
    "Library/*.js",
    "Main.js",
];

fn default_true() -> bool {
    true
}

fn default_max_line_length() -> usize {
    120
}

/// Toggleable lint rules, loaded from the rule file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintRules {
    /// Flag loose equality (`==` / `!=`)
    #[serde(default = "default_true")]
    pub eqeqeq: bool,
    /// Flag `console.*` calls left in
    #[serde(default = "default_true")]
    pub no_console: bool,
    /// Flag `debugger` statements
    #[serde(default = "default_true")]
    pub no_debugger: bool,
    /// Flag trailing whitespace
    #[serde(default = "default_true")]
    pub no_trailing_whitespace: bool,
    /// Flag lines longer than this; 0 disables
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    /// Permit tab indentation
    #[serde(default)]
    pub allow_tabs: bool,
}

impl Default for LintRules {
    fn default() -> Self {
        Self {
            eqeqeq: true,
            no_console: true,
            no_debugger: true,
            no_trailing_whitespace: true,
            max_line_length: default_max_line_length(),
            allow_tabs: false,
        }
    }
}

/// Load the rule file, falling back to defaults.
///
/// A missing file is normal; an unreadable or malformed one is reported
/// and ignored, matching the advisory nature of the whole pipeline.
pub fn load_rules(path: &Path) -> LintRules {
    match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(rules) => rules,
            Err(err) => {
                report::warn(&format!("ignoring malformed rule file {}: {}", path.display(), err));
                LintRules::default()
            }
        },
        Err(_) => LintRules::default(),
    }
}

/// A single advisory finding
#[derive(Debug, Clone)]
pub struct LintFinding {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    pub rule: &'static str,
    pub message: String,
}

impl fmt::Display for LintFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {} [{}]",
            self.file.display(),
            self.line,
            self.column,
            self.message,
            self.rule
        )
    }
}

/// Line-based checker with the regexes compiled once per run.
pub struct Linter {
    rules: LintRules,
    loose_equality: Regex,
    console_call: Regex,
    debugger_statement: Regex,
}

impl Linter {
    pub fn new(rules: LintRules) -> Self {
        Self {
            rules,
            // `==`/`!=` not part of `===`/`!==`/`<=`/`>=`
            loose_equality: Regex::new(r"[^=!<>]([=!]=)[^=]").unwrap(),
            console_call: Regex::new(r"\bconsole\s*\.\s*\w+\s*\(").unwrap(),
            debugger_statement: Regex::new(r"\bdebugger\b").unwrap(),
        }
    }

    /// Check one source file, returning all findings.
    pub fn check(&self, file: &Path, source: &str) -> Vec<LintFinding> {
        let mut findings = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let lineno = index + 1;
            let mut push = |column: usize, rule: &'static str, message: String| {
                findings.push(LintFinding {
                    file: file.to_path_buf(),
                    line: lineno,
                    column,
                    rule,
                    message,
                });
            };

            if self.rules.eqeqeq {
                if let Some(m) = self.loose_equality.captures(line).and_then(|c| c.get(1)) {
                    push(m.start() + 1, "eqeqeq", format!("expected strict comparison, found '{}'", m.as_str()));
                }
            }
            if self.rules.no_console {
                if let Some(m) = self.console_call.find(line) {
                    push(m.start() + 1, "no-console", "console call left in source".to_string());
                }
            }
            if self.rules.no_debugger {
                if let Some(m) = self.debugger_statement.find(line) {
                    push(m.start() + 1, "no-debugger", "debugger statement".to_string());
                }
            }
            if self.rules.no_trailing_whitespace && line.ends_with([' ', '\t']) {
                push(line.len(), "no-trailing-whitespace", "trailing whitespace".to_string());
            }
            if self.rules.max_line_length > 0 && line.chars().count() > self.rules.max_line_length {
                push(
                    self.rules.max_line_length + 1,
                    "max-line-length",
                    format!("line exceeds {} characters", self.rules.max_line_length),
                );
            }
            if !self.rules.allow_tabs && line.starts_with('\t') {
                push(1, "no-tabs", "tab indentation".to_string());
            }
        }
        findings
    }
}

/// Run the lint pipeline.
pub fn run(ctx: &PipelineContext<'_>) -> Result<PipelineOutcome, PipelineError> {
    let src_root = ctx.path(&ctx.config.paths.scripts_src);
    let rules_path = ctx.path(&ctx.config.lint.rules);
    let linter = Linter::new(load_rules(&rules_path));

    let sources = globlist::resolve(&src_root, LINT_ORDER)?;
    let mut total = 0;
    for path in &sources {
        let source = fs::read_to_string(path)?;
        let findings = linter.check(path, &source);
        for finding in &findings {
            report::info(&format!("  {}", finding));
        }
        total += findings.len();
    }

    if total == 0 {
        report::info(&format!("lint clean ({} files)", sources.len()));
        Ok(PipelineOutcome::Completed)
    } else {
        report::info(&format!("lint found {} issues in {} files", total, sources.len()));
        Ok(PipelineOutcome::Diagnostics(total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lint(source: &str) -> Vec<LintFinding> {
        Linter::new(LintRules::default()).check(Path::new("test.js"), source)
    }

    #[test]
    fn test_loose_equality_flagged() {
        let findings = lint("if (a == b) { return; }\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, "eqeqeq");
        assert_eq!(findings[0].line, 1);
    }

    #[test]
    fn test_strict_equality_not_flagged() {
        assert!(lint("if (a === b && c !== d) { return; }\n").is_empty());
    }

    #[test]
    fn test_console_and_debugger() {
        let findings = lint("console.log('x');\ndebugger;\n");
        let rules: Vec<_> = findings.iter().map(|f| f.rule).collect();
        assert_eq!(rules, vec!["no-console", "no-debugger"]);
        assert_eq!(findings[1].line, 2);
    }

    #[test]
    fn test_rules_can_be_disabled() {
        let rules = LintRules { no_console: false, ..LintRules::default() };
        let findings = Linter::new(rules).check(Path::new("t.js"), "console.log(1);\n");
        assert!(findings.is_empty());
    }

    #[test]
    fn test_malformed_rule_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".lintrc");
        fs::write(&path, "{not json").unwrap();
        let rules = load_rules(&path);
        assert!(rules.eqeqeq);
    }
}
