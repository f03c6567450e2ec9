//! sharedit - collaborative markdown editing with live preview.
//!
//! # Usage
//!
//! ```bash
//! sharedit README.md
//! sharedit --watch --out preview.html README.md
//! sharedit --doc roadmap --theme bubble notes.md
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use sharedit::app::App;
use sharedit::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    save_config_flags,
};
use sharedit::editor::Theme;

/// Share a markdown file through a sync session and render its preview
#[derive(Parser, Debug)]
#[command(name = "sharedit", version, about, long_about = None)]
struct Cli {
    /// Markdown file to share
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Shared document name (defaults to the file stem)
    #[arg(long, value_name = "NAME")]
    doc: Option<String>,

    /// Watch the file and re-submit changes
    #[arg(short, long)]
    watch: bool,

    /// Write the preview HTML here instead of stdout
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,

    /// Editor theme
    #[arg(long, value_enum)]
    theme: Option<Theme>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = ConfigFlags {
        watch: cli.watch,
        theme: cli.theme,
        doc: cli.doc.clone(),
        out: cli.out.clone(),
    };

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    // Verify file exists
    if !cli.file.exists() {
        anyhow::bail!("File not found: {}", cli.file.display());
    }

    let app = App::new(cli.file)
        .with_watch(effective.watch)
        .with_document(effective.doc)
        .with_output(effective.out)
        .with_theme(effective.theme.unwrap_or_default());

    app.run().context("Application error")
}
