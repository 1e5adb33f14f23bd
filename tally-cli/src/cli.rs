use std::{path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, ValueEnum};
use indexmap::IndexMap;
use tally_application::{ExpensePatch, LedgerConfig, NewExpense, RecordPolicy, SplitType};
use tally_domain::{Amount, LedgerContext, RoundingMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain-text tables
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Shared-expense ledger: balances and who pays whom", long_about = None)]
#[command(version)]
pub struct Cli {
    /// JSON file holding the expense rows
    #[arg(short, long, env = "TALLY_FILE", default_value = "expenses.json")]
    pub file: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Rounding applied to reported amounts (half-up or half-even)
    #[arg(long, env = "TALLY_ROUNDING", default_value = "half-up")]
    pub rounding: RoundingMode,

    /// Leave out rows that cannot be read or split instead of failing
    #[arg(long, env = "TALLY_SKIP_INVALID")]
    pub skip_invalid: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Paid, owed and net balance per person
    Balances,
    /// Transfers that settle every balance
    Settlements,
    /// Expense count, total amount and pending settlements
    Stats,
    /// Record that one person paid another
    Settle {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, value_parser = Amount::parse)]
        amount: Amount,
    },
    /// Settlement payments recorded so far
    Settled,
    /// Every stored expense, settlements included
    List,
    /// Record a new expense
    Add(AddArgs),
    /// Change fields of a stored expense
    Edit(EditArgs),
    /// Remove a stored expense
    Delete {
        #[arg(long)]
        id: u64,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[arg(long, value_parser = Amount::parse)]
    pub amount: Amount,

    #[arg(long)]
    pub description: String,

    #[arg(long)]
    pub paid_by: String,

    /// Participants besides the payer, comma separated
    #[arg(long, value_delimiter = ',')]
    pub split_with: Vec<String>,

    #[arg(long, value_parser = SplitType::from_str, default_value = "equal")]
    pub split_type: SplitType,

    /// Percentage or exact share per person, as NAME=VALUE (repeatable)
    #[arg(long = "detail", value_parser = parse_detail)]
    pub details: Vec<(String, String)>,

    #[arg(long)]
    pub category: Option<String>,
}

impl AddArgs {
    pub fn to_expense(&self) -> NewExpense {
        NewExpense {
            amount: self.amount.to_string(),
            description: self.description.clone(),
            paid_by: self.paid_by.clone(),
            split_with: self.split_with.clone(),
            split_type: Some(self.split_type.as_str().to_owned()),
            split_details: self.details.iter().cloned().collect(),
            category: self.category.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct EditArgs {
    #[arg(long)]
    pub id: u64,

    #[arg(long, value_parser = Amount::parse)]
    pub amount: Option<Amount>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub paid_by: Option<String>,

    /// Replaces the participant list, comma separated
    #[arg(long, value_delimiter = ',')]
    pub split_with: Option<Vec<String>>,

    #[arg(long, value_parser = SplitType::from_str)]
    pub split_type: Option<SplitType>,

    /// Replaces every split detail, as NAME=VALUE (repeatable)
    #[arg(long = "detail", value_parser = parse_detail)]
    pub details: Vec<(String, String)>,

    #[arg(long)]
    pub category: Option<String>,
}

impl EditArgs {
    pub fn to_patch(&self) -> ExpensePatch {
        ExpensePatch {
            amount: self.amount.map(|amount| amount.to_string()),
            description: self.description.clone(),
            paid_by: self.paid_by.clone(),
            split_with: self.split_with.clone(),
            split_type: self.split_type.map(|split| split.as_str().to_owned()),
            split_details: (!self.details.is_empty())
                .then(|| self.details.iter().cloned().collect::<IndexMap<_, _>>()),
            category: self.category.clone(),
        }
    }
}

fn parse_detail(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    if name.trim().is_empty() {
        return Err(format!("missing name in '{raw}'"));
    }
    Ok((name.trim().to_owned(), value.trim().to_owned()))
}

impl Cli {
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            context: LedgerContext {
                rounding_mode: self.rounding,
                ..LedgerContext::cents()
            },
            record_policy: if self.skip_invalid {
                RecordPolicy::SkipInvalid
            } else {
                RecordPolicy::Strict
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tally_domain::Money;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("tally").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_to_strict_half_up_text() {
        let cli = parse(&["--file", "ledger.json", "balances"]).expect("valid args");

        assert_eq!(cli.file, PathBuf::from("ledger.json"));
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(matches!(cli.command, Command::Balances));
        assert_eq!(
            cli.ledger_config(),
            LedgerConfig {
                context: LedgerContext::cents(),
                record_policy: RecordPolicy::Strict,
            }
        );
    }

    #[test]
    fn reads_global_options() {
        let cli = parse(&[
            "--file",
            "x.json",
            "--format",
            "json",
            "--rounding",
            "half-even",
            "--skip-invalid",
            "stats",
        ])
        .expect("valid args");

        let config = cli.ledger_config();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(config.context.rounding_mode, RoundingMode::HalfEven);
        assert_eq!(config.record_policy, RecordPolicy::SkipInvalid);
    }

    #[test]
    fn parses_settle_arguments() {
        let cli = parse(&[
            "--file", "x.json", "settle", "--from", "Bob", "--to", "Alice", "--amount", "12.50",
        ])
        .expect("valid args");

        match cli.command {
            Command::Settle { from, to, amount } => {
                assert_eq!(from, "Bob");
                assert_eq!(to, "Alice");
                assert_eq!(amount.money(), Money::new(1250, 2));
            }
            other => panic!("expected settle, got {other:?}"),
        }
    }

    #[test]
    fn parses_add_arguments() {
        let cli = parse(&[
            "add",
            "--amount",
            "90",
            "--description",
            "Dinner",
            "--paid-by",
            "Ann",
            "--split-with",
            "Ben,Cleo",
            "--split-type",
            "exact",
            "--detail",
            "Ann=30",
            "--detail",
            " Ben = 60 ",
        ])
        .expect("valid args");

        let Command::Add(args) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(
            args.to_expense(),
            NewExpense {
                amount: "90".to_owned(),
                description: "Dinner".to_owned(),
                paid_by: "Ann".to_owned(),
                split_with: vec!["Ben".to_owned(), "Cleo".to_owned()],
                split_type: Some("exact".to_owned()),
                split_details: IndexMap::from_iter([
                    ("Ann".to_owned(), "30".to_owned()),
                    ("Ben".to_owned(), "60".to_owned()),
                ]),
                category: None,
            }
        );
    }

    #[test]
    fn edit_patches_only_given_fields() {
        let cli = parse(&["edit", "--id", "3", "--description", "Taxi", "--split-with", "A,B"])
            .expect("valid args");

        let Command::Edit(args) = cli.command else {
            panic!("expected edit");
        };
        assert_eq!(args.id, 3);
        assert_eq!(
            args.to_patch(),
            ExpensePatch {
                description: Some("Taxi".to_owned()),
                split_with: Some(vec!["A".to_owned(), "B".to_owned()]),
                ..ExpensePatch::default()
            }
        );
    }

    #[rstest]
    #[case::no_separator("Ann")]
    #[case::no_name("=30")]
    fn rejects_malformed_details(#[case] detail: &str) {
        assert!(parse_detail(detail).is_err());
    }

    #[rstest]
    #[case::add_missing_payer(&["add", "--amount", "5", "--description", "Tea"])]
    #[case::add_unknown_split(&[
        "add", "--amount", "5", "--description", "Tea", "--paid-by", "A", "--split-type", "shares",
    ])]
    #[case::add_oversized_amount(&[
        "add", "--amount", "100000000", "--description", "Tea", "--paid-by", "A",
    ])]
    #[case::delete_without_id(&["delete"])]
    #[case::zero_amount(&["--file", "x.json", "settle", "--from", "A", "--to", "B", "--amount", "0"])]
    #[case::text_amount(&["--file", "x.json", "settle", "--from", "A", "--to", "B", "--amount", "ten"])]
    #[case::unknown_rounding(&["--file", "x.json", "--rounding", "up", "balances"])]
    #[case::unknown_format(&["--file", "x.json", "--format", "xml", "balances"])]
    #[case::missing_command(&["--file", "x.json"])]
    fn rejects_invalid_arguments(#[case] args: &[&str]) {
        assert!(parse(args).is_err());
    }
}
