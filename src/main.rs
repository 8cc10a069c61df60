use clap::{Parser, Subcommand};

mod cmd;

/// Split shared expenses and work out who owes whom
#[derive(Parser, Debug)]
#[command(name = "splitc", version, about)]
struct Cli {
    /// Show debug logging (RUST_LOG overrides this)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Divide one amount between participants
    Split(cmd::split::SplitCommand),
    /// Net balances and the simplified settle-up list for a group
    Balances(cmd::balances::BalancesCommand),
    /// Check a group ledger for inconsistencies
    Validate(cmd::validate::ValidateCommand),
    /// Spending breakdown by category, month and payer
    Analytics(cmd::analytics::AnalyticsCommand),
    /// A member's position across groups
    Dashboard(cmd::dashboard::DashboardCommand),
    /// Print the ledger JSON schema or an example ledger
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Split(split) => split.exec(),
        Command::Balances(balances) => balances.exec(),
        Command::Validate(validate) => validate.exec(),
        Command::Analytics(analytics) => analytics.exec(),
        Command::Dashboard(dashboard) => dashboard.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}

fn init_logging(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    match std::env::var("RUST_LOG") {
        Ok(filters) => {
            builder.parse_filters(&filters);
        }
        Err(_) => {
            let level = if verbose {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Warn
            };
            builder.filter_level(level);
        }
    }
    builder.init();
}
