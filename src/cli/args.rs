//! Command line argument parsing

use crate::config::{ClientConfig, DEFAULT_META_PATH, DEFAULT_OUTPUT_DIR, DEFAULT_SERVER};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// vidq - terminal client for a video download service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Base URL of the download service
    #[arg(long, env = "VIDQ_SERVER", value_name = "URL", default_value = DEFAULT_SERVER, global = true)]
    pub server: String,

    /// HTTP timeout (e.g., 30s, 1m)
    #[arg(long, value_name = "DURATION", default_value = "30s", global = true)]
    pub timeout: humantime::Duration,

    /// Time between task list refreshes
    #[arg(long, value_name = "DURATION", default_value = "1s", global = true)]
    pub poll_interval: humantime::Duration,

    /// File holding cached task metadata
    #[arg(long, env = "VIDQ_META_PATH", value_name = "PATH", default_value = DEFAULT_META_PATH, global = true)]
    pub meta_path: PathBuf,

    /// Directory for saved files
    #[arg(short, long, env = "VIDQ_OUTPUT_DIR", value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR, global = true)]
    pub output: PathBuf,

    /// Ask where to save each file
    #[arg(long, global = true)]
    pub ask: bool,

    /// Override User-Agent header
    #[arg(long, value_name = "USER_AGENT", global = true)]
    pub user_agent: Option<String>,

    /// Proxy URL (http/https/socks)
    #[arg(long, value_name = "URL", global = true)]
    pub proxy: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Look up a video and list its formats
    Info {
        /// Video page URL
        url: String,
    },

    /// Look up a video and queue it for download
    Get {
        /// Video page URL
        url: String,

        /// Format id to request instead of the preselected one
        #[arg(short = 'f', long, value_name = "FORMAT")]
        quality: Option<String>,

        /// Wait for the task to finish and save the file
        #[arg(long)]
        save: bool,
    },

    /// Search for videos
    Search {
        /// Search terms
        query: Vec<String>,

        /// Number of result pages to fetch
        #[arg(long, default_value = "1")]
        pages: usize,
    },

    /// Show completions for a partial query
    Suggest {
        /// Partial search terms
        query: Vec<String>,
    },

    /// List download tasks
    Tasks {
        /// Keep refreshing until interrupted
        #[arg(short, long)]
        watch: bool,
    },

    /// Save the file of a finished task
    Save {
        /// Task id or unambiguous id prefix
        task_id: String,
    },

    /// Drop cached metadata for a task
    Forget {
        /// Full task id
        task_id: String,
    },

    /// Interactive shell (default)
    Shell,
}

impl Args {
    /// Get HTTP timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        self.timeout.into()
    }

    /// Get poll interval as Duration
    pub fn poll_interval_duration(&self) -> Duration {
        self.poll_interval.into()
    }

    /// Subcommand to run; the shell when none was given
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Shell)
    }

    /// Get output verbosity level
    pub fn verbosity_level(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    /// Component configuration from the parsed flags
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.server.clone())
            .with_timeout(self.timeout_duration())
            .with_user_agent(self.user_agent.clone())
            .with_proxy(self.proxy.clone())
            .with_poll_interval(self.poll_interval_duration())
            .with_meta_path(self.meta_path.clone())
            .with_output_dir(self.output.clone())
            .with_save_dialog(self.ask)
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityLevel {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    Normal,
    /// Verbose (debug info)
    Verbose,
}

/// Join positional words into one query string
pub fn join_query(words: &[String]) -> String {
    words.join(" ")
}
