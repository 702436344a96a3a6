use clap::{Parser, Subcommand};

/// 主控台的一行指令
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "console", no_binary_name = true, disable_help_flag = true)]
pub struct ConsoleLine {
    #[command(subcommand)]
    pub command: ConsoleCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum ConsoleCommand {
    /// Put a new package on the conveyor
    Ingest {
        size: u32,
        #[arg(required = true, num_args = 1..)]
        destination: Vec<String>,
        #[arg(long)]
        fragile: bool,
    },
    /// Store the package at the head of the conveyor
    Process,
    /// Load the best selection of stored packages onto the truck
    Consolidate { capacity: u32 },
    /// Load one package onto the truck
    Load { item_id: String },
    /// Take one package off the truck, keeping the rest in order
    Rollback { item_id: String },
    /// Empty the truck
    Unload,
    /// Put dead-lettered packages back on the conveyor
    Retry,
    /// Re-read free bins from the ledger
    Reload,
    Status,
    /// Print the audit trail, or export it as CSV
    Events {
        #[arg(long)]
        csv: Option<String>,
    },
    #[command(alias = "exit")]
    Quit,
}

impl ConsoleLine {
    pub fn parse_line(line: &str) -> Result<Self, clap::Error> {
        Self::try_parse_from(line.split_whitespace())
    }
}
