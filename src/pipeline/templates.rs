//! Template pipeline: compiles handlebars sources into one registration
//! script under a shared namespace
//!
//! Each template registers under `App.templates` keyed by its
//! root-relative path. Registrations are guarded so a duplicate key is a
//! no-op rather than a redeclaration, and keys are emitted in sorted order
//! so identical inputs produce byte-identical output.

use crate::pipeline::{PipelineContext, PipelineError, PipelineOutcome};
use crate::report;
use glob::glob;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Namespace object the registrations attach to
const NAMESPACE: &str = "App";

/// Template source extension
const TEMPLATE_EXT: &str = "hbs";

/// Derive the registration key from a template path relative to the
/// templates root: extension stripped, components `/`-joined.
pub fn template_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let stem = rel.with_extension("");
    let mut parts = Vec::new();
    for component in stem.components() {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Escape template source into a JavaScript double-quoted string literal.
pub fn js_string_literal(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + 2);
    out.push('"');
    for c in source.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Render the registration script for validated templates.
pub fn render_registrations(templates: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    out.push_str("// Generated by conveyor; do not edit.\n");
    let _ = writeln!(out, "this[\"{ns}\"] = this[\"{ns}\"] || {{}};", ns = NAMESPACE);
    let _ = writeln!(
        out,
        "this[\"{ns}\"][\"templates\"] = this[\"{ns}\"][\"templates\"] || {{}};",
        ns = NAMESPACE
    );
    for (key, source) in templates {
        let _ = writeln!(
            out,
            "this[\"{ns}\"][\"templates\"][\"{key}\"] = this[\"{ns}\"][\"templates\"][\"{key}\"] || Handlebars.compile({literal});",
            ns = NAMESPACE,
            key = key,
            literal = js_string_literal(source)
        );
    }
    out
}

/// Run the template pipeline.
pub fn run(ctx: &PipelineContext<'_>) -> Result<PipelineOutcome, PipelineError> {
    let templates_root = ctx.path(&ctx.config.paths.templates_root);
    let pattern = format!("{}/**/*.{}", templates_root.display(), TEMPLATE_EXT);

    let mut paths: Vec<_> = glob(&pattern)?.filter_map(Result::ok).collect();
    paths.sort();

    let mut registry = handlebars::Handlebars::new();
    let mut templates: BTreeMap<String, String> = BTreeMap::new();
    let mut rejected = 0;

    for path in &paths {
        let key = match template_key(&templates_root, path) {
            Some(key) => key,
            None => continue,
        };
        let source = fs::read_to_string(path)?;

        // Surface syntax errors at build time; a bad template is dropped
        // from the bundle, it does not abort the run.
        if let Err(err) = registry.register_template_string(&key, &source) {
            report::warn(&format!("template {} rejected: {}", path.display(), err));
            rejected += 1;
            continue;
        }
        templates.entry(key).or_insert(source);
    }

    let bundle = ctx.path(&ctx.config.paths.template_bundle());
    if let Some(parent) = bundle.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&bundle, render_registrations(&templates))?;

    report::info(&format!("wrote {} ({} templates)", bundle.display(), templates.len()));
    ctx.request_reload();
    if rejected > 0 {
        Ok(PipelineOutcome::Diagnostics(rejected))
    } else {
        Ok(PipelineOutcome::Completed)
    }
}
