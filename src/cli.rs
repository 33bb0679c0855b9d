use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to bind, overrides the config file
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on, overrides the config file
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Subtitle a single video and write a bilingual SRT
    Process {
        /// Video URL
        url: String,

        /// Spoken language of the video
        #[arg(short, long)]
        language: Option<String>,

        /// Language to translate the subtitles into
        #[arg(short, long)]
        target_language: Option<String>,

        /// Directory for the subtitle file
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Check a URL and print the video's metadata
    Validate {
        /// Video URL
        url: String,
    },

    /// Write a configuration file with default values
    InitConfig {
        /// Destination file
        #[arg(default_value = "config.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
