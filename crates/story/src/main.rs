mod report;
mod session;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Parser;
use freespace_editor::{EditorConfig, RichTextEditor, Toolbar};
use tracing_subscriber::EnvFilter;

use crate::report::StepReport;
use crate::session::Session;

/// Replays a scripted editing session and prints what the toolbar and the
/// hidden form field show after every step.
#[derive(Parser, Debug)]
#[command(name = "freespace-editor-story", version)]
struct Args {
    /// Session script (JSON).
    session: PathBuf,
    /// Editor configuration (TOML). Missing keys fall back to defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Toolbar markup to discover controls from instead of the standard set.
    #[arg(long)]
    toolbar: Option<PathBuf>,
    /// Print one JSON report per line instead of text.
    #[arg(long)]
    json: bool,
    /// Publish after the last step and print the cleaned markup.
    #[arg(long)]
    publish: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    let Some(path) = path else {
        return Ok(EditorConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: EditorConfig =
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config.with_defaults())
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    let session = Session::load(&args.session)?;
    tracing::info!(
        session = %args.session.display(),
        steps = session.steps.len(),
        "replaying session"
    );

    let mut editor = RichTextEditor::with_config(&session.initial, config);
    if let Some(path) = &args.toolbar {
        let markup = std::fs::read_to_string(path)
            .with_context(|| format!("reading toolbar markup {}", path.display()))?;
        editor = editor.with_toolbar(Toolbar::discover(&markup));
    }
    editor.run_deferred();

    for (ix, step) in session.steps.iter().enumerate() {
        let note = session::run_step(&mut editor, step)
            .with_context(|| format!("step {} ({})", ix + 1, step.name()))?;
        StepReport::capture(ix + 1, step.name(), note, &editor).print(args.json)?;
    }

    if args.publish {
        let published = editor.publish();
        if args.json {
            println!("{}", serde_json::json!({ "published": published }));
        } else {
            println!("published: {published}");
        }
    }
    Ok(())
}
