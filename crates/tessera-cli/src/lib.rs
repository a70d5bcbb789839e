//! CLI logic for the Tessera scene runner.
//!
//! A scene file describes a semantic catalog, visual models and a list of
//! editing actions. The runner replays the actions through the
//! [`tessera::Editor`], checks the resulting models and reports them.

pub mod error_adapter;
pub mod scene;

mod args;
mod config;
mod error;
mod report;

pub use args::Args;
pub use error::CliError;

use std::{
    fs,
    io::{self, Write},
};

use log::{info, warn};

use tessera::{Editor, notification::NotificationLog};

use report::Report;
use scene::Scene;

/// Run the Tessera CLI application
///
/// Loads the scene, replays its actions and writes the report to the output
/// file, or to standard output when no output is given.
///
/// # Errors
///
/// Returns `CliError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Scene parsing errors and scenes describing invalid visual models
/// - Visual models left inconsistent by the actions
/// - Failed actions when `--strict` is set
pub fn run(args: &Args) -> Result<(), CliError> {
    info!(input_path = args.input; "Replaying scene");

    let config = config::load_config(args.config.as_ref())?;

    let source = fs::read_to_string(&args.input)?;
    let scene = Scene::parse(&source)?;
    let semantic = scene.semantic_catalog();
    let registry = scene.visual_models()?;

    let notifications = NotificationLog::new();
    let mut editor = Editor::new(registry, &semantic)
        .with_config(config)
        .with_notifications(&notifications);
    if let Some(center) = scene.viewport() {
        editor.set_viewport_center(center);
    }

    for action in scene.actions() {
        if !action.apply(&mut editor) {
            warn!(action = action.name(); "Action failed");
        }
    }

    let registry = editor.into_registry();
    registry.verify()?;

    let entries = notifications.entries();
    let report = Report::new(&registry, &entries).to_string();
    match &args.output {
        Some(path) => {
            fs::write(path, report)?;
            info!(output_file = path; "Report written");
        }
        None => io::stdout().write_all(report.as_bytes())?,
    }

    let failed = notifications.errors().len();
    if args.strict && failed > 0 {
        return Err(CliError::ActionsFailed(failed));
    }

    Ok(())
}
