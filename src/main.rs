//! `provider-aws`: runs the managed-resource controllers.
//!
//! ```bash
//! provider-aws --debug --poll-interval 5m --max-reconcile-rate 10 --kinds VPC,Subnet
//! ```

use anyhow::Result;
use clap::Parser;
use provider_aws::config::{self, parse_duration, parse_kind_list};
use provider_aws::runtime::{initialize, run_watch_loop};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "provider-aws")]
#[command(about = "Kubernetes managed-resource controllers for AWS", long_about = None)]
struct Cli {
    /// Enable debug logging (ignored when RUST_LOG is set)
    #[arg(short, long)]
    debug: bool,

    /// How often up-to-date resources are observed again, e.g. 1m or 1h
    #[arg(long, env = "POLL_INTERVAL", value_parser = parse_duration)]
    poll_interval: Option<Duration>,

    /// Maximum concurrent reconciles per kind
    #[arg(long)]
    max_reconcile_rate: Option<u16>,

    /// Comma separated kinds to run controllers for (default: all)
    #[arg(long)]
    kinds: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut controller, server) = config::load_config();
    if let Some(interval) = cli.poll_interval {
        controller.poll_interval = interval;
    }
    if let Some(rate) = cli.max_reconcile_rate {
        anyhow::ensure!(rate > 0, "--max-reconcile-rate must be at least 1");
        controller.max_reconcile_rate = rate;
    }
    if let Some(kinds) = cli.kinds {
        controller.enabled_kinds = parse_kind_list(&kinds);
    }

    let init = initialize(controller, server, cli.debug).await?;
    run_watch_loop(init.runtime).await?;

    Ok(())
}
