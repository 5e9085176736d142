use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "wristnotes")]
#[command(about = "Mirror Apple Notes into a local store and read them from the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to sync settings (JSON)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch every note from the Notes app and replace the local copy
    Sync,
    /// List synced notes, most recently modified first
    List {
        /// Number of notes to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render a synced note
    Show {
        /// Note ID or unique ID suffix (e.g. `p42`)
        id: String,
        /// Output display blocks as JSON
        #[arg(long)]
        json: bool,
    },
}
