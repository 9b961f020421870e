//! FeedMute CLI
//!
//! Harness for running the filtering pipeline against page fixtures and for
//! stress-testing the scan queue.

mod run;
mod stress;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fm-cli")]
#[command(about = "FeedMute filter harness and stress tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter a page fixture and report what was hidden
    Run {
        /// Page fixture JSON file
        #[arg(short, long)]
        page: String,

        /// Settings JSON file (store keys: enabled, blacklist, ...)
        #[arg(short, long)]
        config: Option<String>,

        /// Fixture nodes delivered as a mutation burst after startup
        #[arg(short, long)]
        mutations: Option<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Synthesize a feed and time batch passes through the scan queue
    Stress {
        /// Number of posts to generate
        #[arg(short, long, default_value_t = 1000)]
        posts: usize,

        /// Every Nth post mentions the blocked user
        #[arg(short, long, default_value_t = 10)]
        blocked_every: usize,

        /// Enable the watchdog auto-disable circuit breaker
        #[arg(short, long)]
        watchdog: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            page,
            config,
            mutations,
            verbose,
        } => run::cmd_run(&page, config.as_deref(), mutations.as_deref(), verbose),
        Commands::Stress {
            posts,
            blocked_every,
            watchdog,
        } => stress::cmd_stress(posts, blocked_every, watchdog),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
