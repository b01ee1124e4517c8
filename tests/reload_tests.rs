//! Reload broadcast behavior across pipelines
//!
//! Writing pipelines (styles, scripts, templates) must request a refresh;
//! lint-only and image-minify runs never do.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use conveyor::config::Config;
use conveyor::pipeline::{PipelineContext, PipelineKind};
use conveyor::serve::ReloadHub;
use conveyor::tasks;

const SETTLE: Duration = Duration::from_millis(20);

fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn scratch_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "App/Styles/Scss/Base/Reset.scss", "body { margin: 0; }\n");
    write_file(temp.path(), "App/Scripts/Source/Config.js", "var Config = {};\n");
    write_file(temp.path(), "App/Views/Home.hbs", "<h1>{{title}}</h1>");
    temp
}

fn run_with_hub(kinds: &[PipelineKind]) -> u64 {
    let temp = scratch_project();
    let config = Config::default();
    let hub = ReloadHub::new(SETTLE);
    let ctx = PipelineContext::with_reload(temp.path(), &config, &hub);
    tasks::run(&ctx, kinds);
    // Give scheduled broadcasts time to land, then read the counter
    thread::sleep(SETTLE * 5);
    hub.generation()
}

#[test]
fn writing_pipelines_broadcast_after_the_delay() {
    assert_eq!(run_with_hub(&[PipelineKind::Styles]), 1);
    assert_eq!(run_with_hub(&[PipelineKind::Scripts]), 1);
    assert_eq!(run_with_hub(&[PipelineKind::Templates]), 1);
}

#[test]
fn default_build_broadcasts_once_per_writer() {
    assert_eq!(run_with_hub(tasks::DEFAULT_TASKS), 3);
}

#[test]
fn lint_and_image_runs_stay_silent() {
    assert_eq!(run_with_hub(&[PipelineKind::Lint]), 0);
    assert_eq!(run_with_hub(&[PipelineKind::Images]), 0);
    assert_eq!(run_with_hub(&[PipelineKind::Sprite]), 0);
}

#[test]
fn broadcast_respects_the_settle_delay() {
    let hub = ReloadHub::new(Duration::from_millis(80));
    hub.notify();
    // Immediately after notify the delay has not elapsed yet
    assert_eq!(hub.generation(), 0);
    let generation = hub.wait_past(0, Duration::from_secs(2));
    assert_eq!(generation, 1);
}

#[test]
fn pollers_see_each_broadcast_at_least_once() {
    let hub = ReloadHub::new(Duration::from_millis(5));
    let waiter = {
        let hub = hub.clone();
        thread::spawn(move || hub.wait_past(0, Duration::from_secs(2)))
    };
    hub.notify();
    assert_eq!(waiter.join().unwrap(), 1);
}
