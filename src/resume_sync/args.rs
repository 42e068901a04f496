use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "resume-sync")]
#[command(version)]
#[command(about = "Inspect and drive the resume editor's local state", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Data directory (defaults to $RESUME_SYNC_DATA, then the platform data dir)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Directory acting as the server (defaults to <data-dir>/remote)
    #[arg(long, global = true)]
    pub remote_dir: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the active resume and the last selection
    Show,

    /// Fetch a resume from the server and bind it as the selection
    #[command(alias = "s")]
    Select {
        /// Server id of the resume
        id: String,
    },

    /// Restore the last selected resume into the editor
    Restore,

    /// Start over with an empty resume (keeps the last selection)
    Reset,

    /// Send the active resume to the server
    Save {
        /// Server id to save under
        id: String,
    },

    /// List cached job records, refetching when stale
    #[command(alias = "ls")]
    Jobs {
        /// Only records whose status starts with this
        #[arg(short, long)]
        status: Option<String>,

        /// User the records belong to (defaults to the cached user)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Change the status of a job record
    Status {
        /// Job id
        id: String,

        /// New status
        to: String,

        /// User the record belongs to (defaults to the cached user)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Show the field-level differences between two resume files
    Diff {
        /// Resume JSON before the change
        before: PathBuf,

        /// Resume JSON after the change
        after: PathBuf,
    },

    /// Check stored entries and remove corrupt ones
    Doctor,

    /// Get or set configuration
    Config {
        /// Configuration key (e.g., freshness-secs)
        key: Option<String>,

        /// Value to set (if omitted, prints current value)
        value: Option<String>,
    },
}
