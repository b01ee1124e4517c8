//! Style pipeline: ordered SCSS concatenation, compilation, vendor
//! prefixing, minification, source map emission
//!
//! Concatenation order is the declared group order below, not filesystem
//! order: reset first, then the generated sprite fragment so hand-written
//! styles can reference its classes, then the aggregate last.

use crate::globlist;
use crate::pipeline::{PipelineContext, PipelineError, PipelineOutcome};
use crate::report;
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;
use std::fs;

/// Ordered style-source groups, relative to the SCSS root.
pub const STYLE_ORDER: &[&str] = &[
    "Base/Reset.scss",
    "Sprite.scss",
    "Base/*.scss",
    "Layout/*.scss",
    "Modules/*.scss",
    "Plugins/*.scss",
    "Themes/*.scss",
    "Utilities/*.scss",
    "Main.scss",
];

/// Browser list the prefixer targets.
pub const TARGET_BROWSERS: &[&str] = &[
    "last 2 versions",
    "safari >= 5",
    "ie >= 8",
    "opera >= 12.1",
    "ios >= 6",
    "android >= 4",
];

/// Name the compiled unit carries in source maps.
const UNIT_NAME: &str = "App.scss";

fn prefix_targets() -> Result<Targets, PipelineError> {
    let browsers =
        Browsers::from_browserslist(TARGET_BROWSERS).map_err(|e| PipelineError::Css(e.to_string()))?;
    Ok(Targets { browsers, ..Targets::default() })
}

/// Run the style pipeline.
pub fn run(ctx: &PipelineContext<'_>) -> Result<PipelineOutcome, PipelineError> {
    let scss_root = ctx.path(&ctx.config.paths.styles_src);
    let out_dir = ctx.path(&ctx.config.paths.styles_root);

    // The sprite fragment is generated by the sprite pipeline. A cold build
    // without it still succeeds; the include is just empty.
    if !ctx.path(&ctx.config.paths.sprite_fragment()).is_file() {
        report::warn("Sprite.scss not found; sprite styles will be missing from this build");
    }

    let sources = globlist::resolve(&scss_root, STYLE_ORDER)?;
    let unit = globlist::concat(&sources)?;

    let options = grass::Options::default()
        .style(grass::OutputStyle::Expanded)
        .load_path(&scss_root);
    let compiled =
        grass::from_string(unit, &options).map_err(|e| PipelineError::Scss(e.to_string()))?;

    let targets = prefix_targets()?;
    let mut stylesheet = StyleSheet::parse(
        &compiled,
        ParserOptions { filename: UNIT_NAME.into(), ..ParserOptions::default() },
    )
    .map_err(|e| PipelineError::Css(e.to_string()))?;
    stylesheet
        .minify(MinifyOptions { targets: targets.clone(), ..MinifyOptions::default() })
        .map_err(|e| PipelineError::Css(e.to_string()))?;

    let mut source_map = SourceMap::new("/");
    source_map.add_source(UNIT_NAME);
    source_map
        .set_source_content(0, &compiled)
        .map_err(|e| PipelineError::Css(e.to_string()))?;

    let output = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            source_map: Some(&mut source_map),
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| PipelineError::Css(e.to_string()))?;
    let map_json = source_map.to_json(None).map_err(|e| PipelineError::Css(e.to_string()))?;

    let bundle = ctx.path(&ctx.config.paths.style_bundle());
    let bundle_map = ctx.path(&ctx.config.paths.style_bundle_map());
    fs::create_dir_all(&out_dir)?;
    let mut css = output.code;
    css.push_str("\n/*# sourceMappingURL=App.css.map */\n");
    fs::write(&bundle, css)?;
    fs::write(&bundle_map, map_json)?;

    report::info(&format!("wrote {} ({} sources)", bundle.display(), sources.len()));
    ctx.request_reload();
    Ok(PipelineOutcome::Completed)
}
