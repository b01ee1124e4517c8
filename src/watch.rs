//! Watch coordinator: maps filesystem change events to pipeline re-runs
//!
//! Four fixed rules, registered once at watch-start and live until the
//! process exits. Raw events are coalesced in a short debounce window,
//! logged (kind + path), then each matched pipeline runs at most once per
//! batch through the task graph, so prerequisites still apply.

use crate::config::Config;
use crate::pipeline::{PipelineContext, PipelineKind};
use crate::report;
use crate::tasks;
use glob::Pattern;
use notify::{recommended_watcher, Event, EventKind, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::time::Duration;
use thiserror::Error;

/// Watch loop error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WatchError {
    /// Failed to initialize or register the file watcher
    #[error("failed to start file watcher: {0}")]
    Init(#[from] notify::Error),
    /// Invalid watch pattern
    #[error("invalid watch pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    /// Event channel closed
    #[error("watch channel closed: {0}")]
    Channel(String),
}

/// Kind of filesystem change, as reported to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Changed,
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Created => f.write_str("created"),
            ChangeKind::Changed => f.write_str("changed"),
            ChangeKind::Deleted => f.write_str("deleted"),
        }
    }
}

/// Classify a raw notify event; access-only events are ignored.
pub fn classify(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Modify(_) => Some(ChangeKind::Changed),
        EventKind::Remove(_) => Some(ChangeKind::Deleted),
        _ => None,
    }
}

/// A binding from change patterns to the pipeline that must re-run.
pub struct WatchRule {
    pub pipeline: PipelineKind,
    patterns: Vec<Pattern>,
    excludes: Vec<Pattern>,
}

impl WatchRule {
    fn new(
        pipeline: PipelineKind,
        patterns: &[String],
        excludes: &[String],
    ) -> Result<Self, glob::PatternError> {
        Ok(Self {
            pipeline,
            patterns: patterns.iter().map(|p| Pattern::new(p)).collect::<Result<_, _>>()?,
            excludes: excludes.iter().map(|p| Pattern::new(p)).collect::<Result<_, _>>()?,
        })
    }

    /// Whether a root-relative path triggers this rule.
    pub fn matches(&self, rel: &Path) -> bool {
        self.patterns.iter().any(|p| p.matches_path(rel))
            && !self.excludes.iter().any(|p| p.matches_path(rel))
    }
}

/// Build the fixed rule table from the configured paths.
pub fn rules(config: &Config) -> Result<Vec<WatchRule>, glob::PatternError> {
    let paths = &config.paths;
    let styles_src = paths.styles_src.display();
    Ok(vec![
        // Style sources, minus the generated fragment (feedback loop)
        WatchRule::new(
            PipelineKind::Styles,
            &[format!("{}/**/*.scss", styles_src)],
            &[format!("{}/Sprite.scss", styles_src)],
        )?,
        WatchRule::new(
            PipelineKind::Sprite,
            &[format!("{}/*.png", paths.sprite_src.display())],
            &[],
        )?,
        WatchRule::new(
            PipelineKind::Scripts,
            &[format!("{}/**/*", paths.scripts_src.display())],
            &[],
        )?,
        WatchRule::new(
            PipelineKind::Templates,
            &[format!("{}/**/*.hbs", paths.templates_root.display())],
            &[],
        )?,
    ])
}

/// Pipelines a root-relative path routes to.
pub fn match_pipelines(rules: &[WatchRule], rel: &Path) -> Vec<PipelineKind> {
    rules.iter().filter(|rule| rule.matches(rel)).map(|rule| rule.pipeline).collect()
}

/// Watch the project and re-run pipelines on change. Blocks until the
/// event channel dies; there is no graceful shutdown beyond process exit.
pub fn run(ctx: &PipelineContext<'_>) -> Result<(), WatchError> {
    let rules = rules(ctx.config)?;
    let debounce = Duration::from_millis(ctx.config.watch.debounce_ms);

    let (tx, rx) = channel();
    let mut watcher = recommended_watcher(tx)?;
    watcher.watch(ctx.root, RecursiveMode::Recursive)?;
    report::info(&format!("watching {} for changes", ctx.root.display()));

    loop {
        let first = match rx.recv() {
            Ok(event) => event,
            Err(err) => return Err(WatchError::Channel(err.to_string())),
        };

        // Coalesce the burst that follows a save
        let mut batch = vec![first];
        loop {
            match rx.recv_timeout(debounce) {
                Ok(event) => batch.push(event),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(WatchError::Channel("event sender dropped".to_string()))
                }
            }
        }

        let mut triggered: BTreeSet<PipelineKind> = BTreeSet::new();
        for event in batch {
            let event: Event = match event {
                Ok(event) => event,
                Err(err) => {
                    // Non-fatal; keep watching
                    report::warn(&format!("watch event error: {}", err));
                    continue;
                }
            };
            let kind = match classify(&event.kind) {
                Some(kind) => kind,
                None => continue,
            };
            for path in &event.paths {
                let rel = match path.strip_prefix(ctx.root) {
                    Ok(rel) => rel,
                    Err(_) => continue,
                };
                let matched = match_pipelines(&rules, rel);
                if !matched.is_empty() {
                    report::info(&format!("{}: {}", kind, path.display()));
                    triggered.extend(matched);
                }
            }
        }

        if !triggered.is_empty() {
            let requested: Vec<PipelineKind> = triggered.into_iter().collect();
            tasks::run(ctx, &requested);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn default_rules() -> Vec<WatchRule> {
        rules(&Config::default()).unwrap()
    }

    #[test]
    fn test_style_change_routes_to_styles_only() {
        let matched =
            match_pipelines(&default_rules(), &PathBuf::from("App/Styles/Scss/Layout/foo.scss"));
        assert_eq!(matched, vec![PipelineKind::Styles]);
    }

    #[test]
    fn test_generated_fragment_is_excluded() {
        let matched = match_pipelines(&default_rules(), &PathBuf::from("App/Styles/Scss/Sprite.scss"));
        assert!(matched.is_empty());
    }

    #[test]
    fn test_sprite_source_routes_to_sprite() {
        let matched = match_pipelines(&default_rules(), &PathBuf::from("App/Images/Sprite/icon.png"));
        assert_eq!(matched, vec![PipelineKind::Sprite]);
    }

    #[test]
    fn test_nested_script_routes_to_scripts() {
        let matched =
            match_pipelines(&default_rules(), &PathBuf::from("App/Scripts/Source/Modules/nav.js"));
        assert_eq!(matched, vec![PipelineKind::Scripts]);
    }

    #[test]
    fn test_template_routes_to_templates() {
        let matched = match_pipelines(&default_rules(), &PathBuf::from("App/Views/Shared/Header.hbs"));
        assert_eq!(matched, vec![PipelineKind::Templates]);
    }

    #[test]
    fn test_compiled_outputs_do_not_loop() {
        let rules = default_rules();
        for output in
            ["App/Styles/App.css", "App/Scripts/App.js", "App/Scripts/Templates.js", "App/Images/Sprite.png"]
        {
            assert!(match_pipelines(&rules, &PathBuf::from(output)).is_empty(), "{}", output);
        }
    }

    #[test]
    fn test_classify_event_kinds() {
        use notify::event::{CreateKind, ModifyKind, RemoveKind};
        assert_eq!(classify(&EventKind::Create(CreateKind::File)), Some(ChangeKind::Created));
        assert_eq!(classify(&EventKind::Modify(ModifyKind::Any)), Some(ChangeKind::Changed));
        assert_eq!(classify(&EventKind::Remove(RemoveKind::File)), Some(ChangeKind::Deleted));
        assert_eq!(classify(&EventKind::Access(notify::event::AccessKind::Any)), None);
    }
}
