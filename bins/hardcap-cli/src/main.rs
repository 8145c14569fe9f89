//! hardcap-cli — operate a tiered-price token sale from the command line.
//!
//! The sale and its ledger live in a JSON state file; every command loads
//! it, applies one operation against the system clock and writes it back.

mod settings;
mod state;
mod units;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use hardcap_core::constants::TOKEN;
use hardcap_core::ledger::MemoryCreditLedger;
use hardcap_core::traits::CreditLedger;
use hardcap_core::types::{Address, Amount, Timestamp};
use hardcap_sale::Crowdsale;

use settings::Settings;
use units::{format_units, parse_units, DECIMALS};

/// Tiered-price token sale operator.
#[derive(Parser)]
#[command(name = "hardcap-cli")]
#[command(version, about = "Run a capped, tiered-price token sale")]
struct Cli {
    /// Sale state file (default: <data dir>/hardcap/sale.json).
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a new sale from a settings file and HARDCAP_* variables.
    Init(InitArgs),
    /// Show the sale state.
    Status,
    /// Price a payment without buying.
    Quote {
        /// Payment in ether (e.g. 1.5).
        #[arg(long)]
        ether: String,
    },
    /// Pay for tokens.
    Buy(BuyArgs),
    /// Assign tokens without payment (assigner only).
    Assign(AssignArgs),
    /// Assign to several accounts at once, all or nothing (assigner only).
    AssignBatch(AssignBatchArgs),
    /// Set the account receiving the team share (operator only, once).
    SetReserve {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        holder: Address,
    },
    /// Close the sale and split the supply.
    Finalize {
        #[arg(long)]
        caller: Address,
    },
    /// Mark the pending overflow as refunded (operator only).
    Refund {
        #[arg(long)]
        caller: Address,
    },
    /// Token balance of an account.
    Balance {
        #[arg(long)]
        address: Address,
    },
}

#[derive(Args)]
struct InitArgs {
    /// Settings file (TOML or JSON).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overwrite an existing state file.
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct BuyArgs {
    /// Paying account.
    #[arg(long)]
    from: Address,

    /// Account receiving the tokens (default: the payer).
    #[arg(long)]
    beneficiary: Option<Address>,

    /// Payment in ether (e.g. 1.5).
    #[arg(long)]
    ether: String,
}

#[derive(Args)]
struct AssignArgs {
    #[arg(long)]
    caller: Address,

    #[arg(long)]
    to: Address,

    /// Tokens, in whole or fractional units.
    #[arg(long)]
    tokens: String,
}

#[derive(Args)]
struct AssignBatchArgs {
    #[arg(long)]
    caller: Address,

    /// Recipients (comma-separated)
    #[arg(long, value_delimiter = ',', required = true)]
    to: Vec<Address>,

    /// Token amounts matching `--to` (comma-separated)
    #[arg(long, value_delimiter = ',', required = true)]
    tokens: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    let path = cli.state.unwrap_or_else(state::default_state_path);

    match cli.command {
        Commands::Init(args) => init(&path, args),
        Commands::Status => status(&state::load(&path)?),
        Commands::Quote { ether } => quote(&state::load(&path)?, &ether),
        Commands::Buy(args) => with_sale(&path, |sale| buy(sale, args)),
        Commands::Assign(args) => with_sale(&path, |sale| assign(sale, args)),
        Commands::AssignBatch(args) => with_sale(&path, |sale| assign_batch(sale, args)),
        Commands::SetReserve { caller, holder } => with_sale(&path, |sale| {
            sale.set_reserve_holder(caller, holder)?;
            println!("Reserve holder: {holder}");
            Ok(())
        }),
        Commands::Finalize { caller } => with_sale(&path, |sale| finalize(sale, caller)),
        Commands::Refund { caller } => with_sale(&path, |sale| {
            match sale.acknowledge_refund(caller)? {
                Some(record) => println!(
                    "Refunded {} ETH to {}",
                    format_units(record.amount, DECIMALS),
                    record.owner
                ),
                None => println!("No overflow pending"),
            }
            Ok(())
        }),
        Commands::Balance { address } => {
            let sale = state::load(&path)?;
            println!("{} tokens", format_units(sale.ledger().balance_of(&address), DECIMALS));
            Ok(())
        }
    }
}

/// Load the sale, run `op`, and persist only if it succeeded.
fn with_sale(
    path: &std::path::Path,
    op: impl FnOnce(&mut Crowdsale<MemoryCreditLedger>) -> Result<()>,
) -> Result<()> {
    let mut sale = state::load(path)?;
    op(&mut sale)?;
    state::save(path, &sale)
}

fn init(path: &std::path::Path, args: InitArgs) -> Result<()> {
    state::ensure_absent(path, args.force)?;
    let settings = Settings::load(args.config.as_deref())?;
    let config = settings.sale_config()?;
    let sale_account = config.parties.sale;

    let mut ledger = MemoryCreditLedger::new(sale_account);
    if settings.premint > 0 {
        let premint = (settings.premint as Amount)
            .checked_mul(TOKEN)
            .context("premint too large")?;
        ledger.mint(&sale_account, sale_account, premint)?;
    }
    let sale = Crowdsale::new(config, ledger)?;
    state::save(path, &sale)?;

    info!("sale state written to {}", path.display());
    println!("Sale created at {}", path.display());
    println!("  Opens:  {}", format_time(sale.config().opening_time));
    println!("  Closes: {}", format_time(sale.closing_time()));
    println!("  Cap:    {} tokens", format_units(sale.rate_table().cap(), DECIMALS));
    Ok(())
}

fn status(sale: &Crowdsale<MemoryCreditLedger>) -> Result<()> {
    let window = sale.window();
    println!("Phase:        {} of {}", sale.phase() + 1, sale.rate_table().len());
    println!("Rate:         {} tokens/ETH", sale.current_rate());
    println!("Allocated:    {} tokens", format_units(sale.total_allocated(), DECIMALS));
    println!("Remaining:    {} tokens", format_units(sale.remaining_capacity(), DECIMALS));
    println!("Raised:       {} ETH", format_units(sale.wei_raised(), DECIMALS));
    println!("Opens:        {}", format_time(window.opening_time()));
    println!(
        "Closes:       {}{}",
        format_time(window.closing_time()),
        if window.is_extended() { " (extension used)" } else { "" }
    );
    println!("Open now:     {}", sale.is_open());
    if let Some(record) = sale.overflow() {
        println!("Overflow:     {} ETH owed to {}", format_units(record.amount, DECIMALS), record.owner);
    }
    match sale.reserve_holder() {
        Some(holder) => println!("Reserve:      {holder}"),
        None => println!("Reserve:      not set"),
    }
    match sale.finalized_at() {
        Some(at) => println!("Finalized:    {}", format_time(at)),
        None => println!("Finalized:    no"),
    }
    println!("Supply:       {} tokens", format_units(sale.ledger().total_supply(), DECIMALS));
    println!("Holders:      {}", sale.ledger().holder_count());
    Ok(())
}

fn quote(sale: &Crowdsale<MemoryCreditLedger>, ether: &str) -> Result<()> {
    let wei = parse_units(ether, DECIMALS)?;
    let walk = sale.quote(wei)?;
    for seg in &walk.segments {
        println!(
            "  phase {} @ {}: {} tokens for {} ETH",
            seg.phase + 1,
            seg.rate,
            format_units(seg.tokens, DECIMALS),
            format_units(seg.wei, DECIMALS)
        );
    }
    println!("Tokens:   {}", format_units(walk.tokens, DECIMALS));
    println!("Cost:     {} ETH", format_units(walk.wei_consumed, DECIMALS));
    if walk.overflow > 0 {
        println!("Refund:   {} ETH (cap reached)", format_units(walk.overflow, DECIMALS));
    }
    Ok(())
}

fn buy(sale: &mut Crowdsale<MemoryCreditLedger>, args: BuyArgs) -> Result<()> {
    let wei = parse_units(&args.ether, DECIMALS)?;
    let beneficiary = args.beneficiary.unwrap_or(args.from);
    let r = sale.buy_tokens(args.from, beneficiary, wei)?;
    println!("Bought {} tokens for {}", format_units(r.tokens, DECIMALS), r.beneficiary);
    println!("  Paid {} ETH, forwarded to {}", format_units(r.wei_accepted, DECIMALS), r.forwarded_to);
    if let Some(overflow) = r.overflow {
        println!("  Cap reached: {} ETH to refund", format_units(overflow.amount, DECIMALS));
    }
    if let Some(closing) = r.extended_to {
        println!("  Sale extended to {}", format_time(closing));
    }
    Ok(())
}

fn assign(sale: &mut Crowdsale<MemoryCreditLedger>, args: AssignArgs) -> Result<()> {
    let tokens = parse_units(&args.tokens, DECIMALS)?;
    let r = sale.assign(args.caller, args.to, tokens)?;
    println!("Assigned {} tokens to {}", format_units(r.tokens, DECIMALS), r.beneficiary);
    if r.unassigned > 0 {
        println!("  Cap reached: {} tokens not assigned", format_units(r.unassigned, DECIMALS));
    }
    Ok(())
}

fn assign_batch(sale: &mut Crowdsale<MemoryCreditLedger>, args: AssignBatchArgs) -> Result<()> {
    let amounts = args
        .tokens
        .iter()
        .map(|t| parse_units(t, DECIMALS))
        .collect::<Result<Vec<_>>>()?;
    let receipts = sale.assign_batch(args.caller, &args.to, &amounts)?;
    for r in &receipts {
        println!("Assigned {} tokens to {}", format_units(r.tokens, DECIMALS), r.beneficiary);
    }
    Ok(())
}

fn finalize(sale: &mut Crowdsale<MemoryCreditLedger>, caller: Address) -> Result<()> {
    let f = sale.finalize(caller)?;
    println!("Sale finalized at {}", format_time(f.finalized_at));
    println!("  Sold:     {}", format_units(f.split.sold, DECIMALS));
    println!("  Team:     {} -> {}", format_units(f.split.team, DECIMALS), f.reserve_holder);
    println!("  Platform: {} -> {}", format_units(f.split.platform, DECIMALS), sale.config().parties.platform);
    println!("  Burned:   {}", format_units(f.burned, DECIMALS));
    println!("  Supply:   {}", format_units(sale.ledger().total_supply(), DECIMALS));
    Ok(())
}

fn format_time(ts: Timestamp) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// `format = "json"` selects structured JSON output; anything else is text.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}
