use std::{error::Error, path::PathBuf, process};

use clap::{Args, Parser, Subcommand};
use split_ledger_lib::{
    balances_report, check_report, equal_split_report, group_codes_report, group_report,
    random_split_report, settlements_report, SeededRandom, SnapshotFiles,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "split-ledger", version, about = "Shared expense balances and settlements")]
struct Cli {
    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GroupArgs {
    #[arg(long)]
    members: PathBuf,
    #[arg(long)]
    expenses: PathBuf,
    #[arg(long)]
    splits: PathBuf,
}

impl GroupArgs {
    fn files(self) -> SnapshotFiles {
        SnapshotFiles {
            members: self.members,
            expenses: self.expenses,
            splits: self.splits,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Net balance of every member.
    Balances {
        #[command(flatten)]
        group: GroupArgs,
        /// Include total paid and total owed columns.
        #[arg(long)]
        full: bool,
    },
    /// Transfers that settle every balance.
    Settle {
        #[command(flatten)]
        group: GroupArgs,
    },
    /// Balances followed by settlements.
    Report {
        #[command(flatten)]
        group: GroupArgs,
    },
    /// List inconsistencies in the stored group.
    Check {
        #[command(flatten)]
        group: GroupArgs,
    },
    SplitEqual {
        #[arg(long)]
        amount: String,
        #[arg(long = "member", required = true)]
        members: Vec<String>,
    },
    SplitRandom {
        #[arg(long)]
        amount: String,
        #[arg(long = "member", required = true)]
        members: Vec<String>,
        #[arg(long)]
        seed: Option<u64>,
    },
    GroupCode {
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn random_source(seed: Option<u64>) -> SeededRandom {
    seed.map(SeededRandom::new)
        .unwrap_or_else(SeededRandom::from_clock)
}

fn run(command: Commands) -> Result<String, Box<dyn Error>> {
    match command {
        Commands::Balances { group, full } => balances_report(&group.files(), full),
        Commands::Settle { group } => settlements_report(&group.files()),
        Commands::Report { group } => group_report(&group.files()),
        Commands::Check { group } => check_report(&group.files()),
        Commands::SplitEqual { amount, members } => equal_split_report(&amount, &members),
        Commands::SplitRandom {
            amount,
            members,
            seed,
        } => random_split_report(&amount, &members, &mut random_source(seed)),
        Commands::GroupCode { seed, count } => group_codes_report(&mut random_source(seed), count),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli.command) {
        Ok(result) => {
            print!("{}", result);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("an error occurred: {}", e);
            process::exit(1);
        }
    }
}
