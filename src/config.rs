use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command line configuration for the chaining and batch tools
#[derive(Parser, Debug, Clone)]
#[command(name = "claimchain", version, about = "Billing code chains, daily rounding and claim batches")]
pub struct Config {
    /// Log every rounding and batch event
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Clinic offset from UTC used to decide what "today" is (e.g. -6 or +05:30)
    #[arg(long, global = true, default_value = "0", allow_hyphen_values = true)]
    pub utc_offset: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Query the billing code chains of a catalog
    Chains {
        catalog: PathBuf,
        #[command(subcommand)]
        query: ChainQuery,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Run one rounding pass for a service
    Round {
        catalog: PathBuf,
        service: PathBuf,
        /// Rounding date, defaults to today in the clinic's offset
        #[arg(long)]
        today: Option<String>,
        /// Save the updated service back to its file
        #[arg(long)]
        write: bool,
    },
    /// Set the discharge date on a service's current per-diem code
    Discharge {
        catalog: PathBuf,
        service: PathBuf,
        date: String,
        #[arg(long)]
        write: bool,
    },
    /// Produce a claim batch file from a claim description
    Batch {
        catalog: PathBuf,
        claim: PathBuf,
        /// Write the batch here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check a batch file's structure and trailer totals
    Verify { file: PathBuf },
    /// Write a fake catalog, service and claim to a directory
    Fake {
        dir: PathBuf,
        #[arg(long, default_value_t = 3)]
        chains: usize,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ChainQuery {
    /// Totals across every chain
    Stats,
    /// The chain started by a root code
    Root {
        id: i64,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// The chain record of one code
    Code { id: i64 },
    /// Every chain a code belongs to
    Containing { id: i64 },
    /// Chains with the most codes
    Longest {
        #[arg(default_value_t = 10)]
        limit: usize,
    },
    /// Chains reaching the furthest day
    Highest {
        #[arg(default_value_t = 10)]
        limit: usize,
    },
    /// Records whose cumulative day range falls between two bounds
    Range {
        #[arg(long)]
        min: Option<i64>,
        #[arg(long)]
        max: Option<i64>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Records whose code or title contains a term
    Search {
        term: String,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        limit: Option<usize>,
    },
}

/// Parse command line arguments into the application configuration
pub fn config() -> Config {
    Config::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chain_query() {
        let config = Config::try_parse_from([
            "claimchain", "--verbose", "chains", "catalog.json", "--json", "range", "--min", "5",
        ])
        .unwrap();
        assert!(config.verbose);
        assert_eq!(config.utc_offset, "0");
        match config.command {
            Command::Chains { query, json, .. } => {
                assert!(json);
                assert!(matches!(query, ChainQuery::Range { min: Some(5), max: None, .. }));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_negative_offset_and_round_flags() {
        let config = Config::try_parse_from([
            "claimchain", "round", "catalog.json", "service.json", "--today", "yesterday",
            "--write", "--utc-offset", "-6",
        ])
        .unwrap();
        assert_eq!(config.utc_offset, "-6");
        match config.command {
            Command::Round { today, write, .. } => {
                assert_eq!(today.as_deref(), Some("yesterday"));
                assert!(write);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
