#![warn(clippy::uninlined_format_args)]

mod cli;

use std::{borrow::Cow, fmt::Display, io, process};

use clap::Parser;
use serde::Serialize;
use tally_application::{ExpenseRow, LedgerService};
use tally_domain::SettlementPlanner;
use tally_infrastructure::JsonFileExpenseStore;
use tally_presentation::{LedgerPresenter, to_json};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, OutputFormat};

type CliResult<T> = Result<T, Cow<'static, str>>;

fn main() {
    // A missing .env file is fine; the environment and flags still apply.
    let _ = dotenvy::dotenv();
    setup_logging();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(output) => print!("{output}"),
        Err(err) => {
            eprintln!("Error: {err}");
            process::exit(1);
        }
    }
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> CliResult<String> {
    let config = cli.ledger_config();
    let store = JsonFileExpenseStore::new(&cli.file);
    let planner = SettlementPlanner::new(config.context);
    let service = LedgerService::new(&store, &store, &planner, config);
    let presenter = LedgerPresenter::new(config.context.scale);
    tracing::debug!(file = %cli.file.display(), command = ?cli.command, "Running");

    match &cli.command {
        Command::Balances => {
            let people = service.balances().map_err(failure)?;
            render(
                cli.format,
                || presenter.balance_table(&people),
                || presenter.person_views(&people),
            )
        }
        Command::Settlements => {
            let settlements = service.settlements().map_err(failure)?;
            render(
                cli.format,
                || presenter.settlement_table(&settlements),
                || presenter.settlement_views(&settlements),
            )
        }
        Command::Stats => {
            let stats = service.stats().map_err(failure)?;
            render(
                cli.format,
                || presenter.stats_table(&stats),
                || presenter.stats_view(&stats),
            )
        }
        Command::Settle { from, to, amount } => {
            let row = service
                .settle(from, to, amount.money())
                .map_err(failure)?;
            let rows = [row];
            render(
                cli.format,
                || {
                    format!(
                        "Recorded settlement #{}: {} paid {} {}\n",
                        rows[0].id,
                        rows[0].paid_by,
                        rows[0].split_with.join(", "),
                        rows[0].amount
                    )
                },
                || presenter.settled_views(&rows),
            )
        }
        Command::Settled => {
            let rows = service.settled_transactions().map_err(failure)?;
            render(
                cli.format,
                || presenter.settled_table(&rows),
                || presenter.settled_views(&rows),
            )
        }
        Command::List => {
            let rows = service.expenses().map_err(failure)?;
            render(
                cli.format,
                || presenter.expense_table(&rows),
                || presenter.expense_views(&rows),
            )
        }
        Command::Add(args) => {
            let row = service.add_expense(args.to_expense()).map_err(failure)?;
            confirm(cli.format, &presenter, "Recorded", row)
        }
        Command::Edit(args) => {
            let row = service
                .update_expense(args.id, args.to_patch())
                .map_err(failure)?;
            confirm(cli.format, &presenter, "Updated", row)
        }
        Command::Delete { id } => {
            let row = service.delete_expense(*id).map_err(failure)?;
            confirm(cli.format, &presenter, "Deleted", row)
        }
    }
}

/// One line naming the affected expense, or its JSON view.
fn confirm(
    format: OutputFormat,
    presenter: &LedgerPresenter,
    action: &str,
    row: ExpenseRow,
) -> CliResult<String> {
    let rows = [row];
    render(
        format,
        || {
            let row = &rows[0];
            format!(
                "{action} expense #{}: {} paid {} for {}\n",
                row.id, row.paid_by, row.amount, row.description
            )
        },
        || presenter.expense_views(&rows).pop(),
    )
}

fn render<T: Serialize>(
    format: OutputFormat,
    text: impl FnOnce() -> String,
    json: impl FnOnce() -> T,
) -> CliResult<String> {
    match format {
        OutputFormat::Text => Ok(text()),
        OutputFormat::Json => to_json(&json()).map_err(failure),
    }
}

fn failure(err: impl Display) -> Cow<'static, str> {
    Cow::Owned(err.to_string())
}
