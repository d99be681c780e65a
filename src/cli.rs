//! CLI argument definitions.

use clap::{Parser, Subcommand};

use crate::commands::{ConfigCmd, ServeCmd, TagCmd};

#[derive(Parser)]
#[command(name = "keyshop")]
#[command(about = "Reseller portal API over a KeyAuth seller account")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeCmd),

    /// Inspect configuration
    Config(ConfigCmd),

    /// Print the ownership tag for a reseller identity
    Tag(TagCmd),
}

impl Command {
    pub async fn execute(&self) -> anyhow::Result<()> {
        match self {
            Command::Serve(cmd) => cmd.run().await,
            Command::Config(cmd) => cmd.run().await,
            Command::Tag(cmd) => cmd.run().await,
        }
    }
}
