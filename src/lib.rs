//! Conveyor - asset pipeline runner
//!
//! Wires a fixed set of file-processing pipelines over a conventional
//! web-app asset tree: style compilation, script concatenation and
//! minification, sprite-sheet packing, template precompilation, plus a
//! dev server with browser reload and a watcher that maps filesystem
//! changes back onto the pipelines.

pub mod cli;
pub mod config;
pub mod globlist;
pub mod pipeline;
pub mod report;
pub mod serve;
pub mod tasks;
pub mod watch;
