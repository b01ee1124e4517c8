//! Task orchestration: a small directed acyclic graph over the pipelines
//!
//! Only two real edges exist: sprite packing must precede the style build
//! (the generated fragment has to be on disk before glob resolution), and
//! lint runs before the script build. Everything else may interleave
//! freely; tasks in the same dependency wave run in parallel.
//!
//! A failed task is reported and never blocks its dependents.

use crate::pipeline::{self, PipelineContext, PipelineKind, PipelineOutcome};
use crate::report;
use rayon::prelude::*;

/// Pipelines the default (build-once) entry point runs.
pub const DEFAULT_TASKS: &[PipelineKind] =
    &[PipelineKind::Templates, PipelineKind::Styles, PipelineKind::Scripts];

/// Prerequisites that must run before the given pipeline.
pub fn dependencies(kind: PipelineKind) -> &'static [PipelineKind] {
    match kind {
        PipelineKind::Styles => &[PipelineKind::Sprite],
        PipelineKind::Scripts => &[PipelineKind::Lint],
        _ => &[],
    }
}

fn visit(kind: PipelineKind, visited: &mut Vec<PipelineKind>) {
    if visited.contains(&kind) {
        return;
    }
    for dep in dependencies(kind) {
        visit(*dep, visited);
    }
    visited.push(kind);
}

/// Expand requested tasks with their transitive prerequisites, in
/// topological order (dependencies first). Requesting a task twice runs
/// it once.
pub fn expand(requested: &[PipelineKind]) -> Vec<PipelineKind> {
    let mut order = Vec::new();
    for kind in requested {
        visit(*kind, &mut order);
    }
    order
}

/// Group a topologically ordered task list into dependency waves; tasks
/// within one wave have no edges between them and may run concurrently.
pub fn waves(order: &[PipelineKind]) -> Vec<Vec<PipelineKind>> {
    let mut level_of: Vec<(PipelineKind, usize)> = Vec::new();
    for kind in order {
        let level = dependencies(*kind)
            .iter()
            .filter_map(|dep| level_of.iter().find(|(k, _)| k == dep).map(|(_, l)| l + 1))
            .max()
            .unwrap_or(0);
        level_of.push((*kind, level));
    }

    let max_level = level_of.iter().map(|(_, l)| *l).max().unwrap_or(0);
    let mut grouped: Vec<Vec<PipelineKind>> = vec![Vec::new(); max_level + 1];
    for (kind, level) in level_of {
        grouped[level].push(kind);
    }
    grouped.retain(|wave| !wave.is_empty());
    grouped
}

/// Run the requested tasks plus prerequisites, wave by wave.
pub fn run(
    ctx: &PipelineContext<'_>,
    requested: &[PipelineKind],
) -> Vec<(PipelineKind, PipelineOutcome)> {
    let order = expand(requested);
    let mut results = Vec::with_capacity(order.len());

    for wave in waves(&order) {
        let wave_results: Vec<(PipelineKind, PipelineOutcome)> =
            wave.par_iter().map(|kind| (*kind, pipeline::run(*kind, ctx))).collect();

        for (kind, outcome) in &wave_results {
            if let PipelineOutcome::Failed(message) = outcome {
                report::warn(&format!("{} did not complete: {}", kind, message));
            }
        }
        results.extend(wave_results);
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use PipelineKind::*;

    #[test]
    fn test_expand_pulls_in_prerequisites() {
        assert_eq!(expand(&[Styles]), vec![Sprite, Styles]);
        assert_eq!(expand(&[Scripts]), vec![Lint, Scripts]);
    }

    #[test]
    fn test_expand_deduplicates() {
        let order = expand(&[Styles, Sprite, Styles]);
        assert_eq!(order, vec![Sprite, Styles]);
    }

    #[test]
    fn test_default_task_order() {
        let order = expand(DEFAULT_TASKS);
        let pos = |k: PipelineKind| order.iter().position(|x| *x == k).unwrap();
        assert!(pos(Sprite) < pos(Styles));
        assert!(pos(Lint) < pos(Scripts));
        assert_eq!(order.len(), 5);
    }

    #[test]
    fn test_waves_respect_edges() {
        let order = expand(DEFAULT_TASKS);
        let grouped = waves(&order);
        assert_eq!(grouped.len(), 2);
        assert!(grouped[0].contains(&Sprite));
        assert!(grouped[0].contains(&Lint));
        assert!(grouped[0].contains(&Templates));
        assert!(grouped[1].contains(&Styles));
        assert!(grouped[1].contains(&Scripts));
    }

    #[test]
    fn test_independent_task_is_single_wave() {
        let grouped = waves(&expand(&[Images]));
        assert_eq!(grouped, vec![vec![Images]]);
    }
}
