use anyhow::{bail, Context, Result};
use dotenv::dotenv;
use std::env;
use std::io;
use std::path::PathBuf;

use transaction_insights::{write_transactions_csv, Config, RecordSource, TransactionDataFetcher};

const USAGE: &str = "\
Usage: transaction-insights [--file PATH] <command>

Commands:
  total                     Sum of clean transaction amounts
  total-sent-by <NAME>      Sum of clean amounts sent by NAME
  max                       Highest clean transaction amount
  clients                   Number of unique clients
  open-issues <NAME>        Whether NAME has an unsolved compliance issue
  by-beneficiary [--csv]    Clean transactions indexed by beneficiary
  unsolved-issues           Ids of open compliance issues
  solved-messages           Messages of solved compliance issues
  top [N] [--csv]           N largest clean transactions (default from config)
  top-sender                Sender of the largest clean transaction
  top-sender-total          Sender with the largest total sent
  report [--json]           Every query at once

Environment: TRANSACTIONS_FILE, TRANSACTIONS_CACHE, INSIGHTS_TOP_N, RUST_LOG";

#[derive(Debug, PartialEq)]
enum Command {
    Total,
    TotalSentBy(String),
    Max,
    Clients,
    OpenIssues(String),
    ByBeneficiary { csv: bool },
    UnsolvedIssues,
    SolvedMessages,
    Top { n: Option<usize>, csv: bool },
    TopSender,
    TopSenderTotal,
    Report { json: bool },
    Help,
}

#[derive(Debug, PartialEq)]
struct Cli {
    file: Option<PathBuf>,
    command: Command,
}

fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let cli = parse_args(&args)?;

    if cli.command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut config = Config::from_env().context("Failed to read configuration")?;
    if let Some(file) = cli.file {
        config.transactions_file = file;
    }

    let fetcher = TransactionDataFetcher::from_config(&config);
    run(&fetcher, cli.command, config.top_n)
}

fn parse_args(args: &[String]) -> Result<Cli> {
    let mut file = None;
    let mut csv = false;
    let mut json = false;
    let mut positional: Vec<&str> = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--file" | "-f" => {
                let path = iter.next().context("--file needs a path")?;
                file = Some(PathBuf::from(path));
            }
            "--csv" => csv = true,
            "--json" => json = true,
            "--help" | "-h" => positional.insert(0, "help"),
            other => positional.push(other),
        }
    }

    let Some((name, rest)) = positional.split_first() else {
        return Ok(Cli { file, command: Command::Help });
    };
    // Client names contain spaces; accept them quoted or unquoted
    let client = rest.join(" ");

    let command = match *name {
        "help" => Command::Help,
        "total" => Command::Total,
        "total-sent-by" => Command::TotalSentBy(require_name(client, "total-sent-by")?),
        "max" => Command::Max,
        "clients" => Command::Clients,
        "open-issues" => Command::OpenIssues(require_name(client, "open-issues")?),
        "by-beneficiary" => Command::ByBeneficiary { csv },
        "unsolved-issues" => Command::UnsolvedIssues,
        "solved-messages" => Command::SolvedMessages,
        "top" => {
            let n = match rest.first() {
                Some(value) => Some(value.parse().with_context(|| format!("Invalid count: {}", value))?),
                None => None,
            };
            Command::Top { n, csv }
        }
        "top-sender" => Command::TopSender,
        "top-sender-total" => Command::TopSenderTotal,
        "report" => Command::Report { json },
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    };

    Ok(Cli { file, command })
}

fn require_name(name: String, command: &str) -> Result<String> {
    if name.trim().is_empty() {
        bail!("{} needs a client name", command);
    }
    Ok(name)
}

fn run<S: RecordSource>(fetcher: &TransactionDataFetcher<S>, command: Command, default_top_n: usize) -> Result<()> {
    match command {
        Command::Total => {
            println!("💰 Total amount: {:.2}", fetcher.total_transaction_amount()?);
        }
        Command::TotalSentBy(name) => {
            let total = fetcher.total_transaction_amount_sent_by(&name)?;
            println!("💰 Total sent by {}: {:.2}", name, total);
        }
        Command::Max => {
            println!("📈 Max amount: {:.2}", fetcher.max_transaction_amount()?);
        }
        Command::Clients => {
            println!("👥 Unique clients: {}", fetcher.count_unique_clients()?);
        }
        Command::OpenIssues(name) => {
            if fetcher.has_open_compliance_issues(&name)? {
                println!("⚠️  {} has an open compliance issue", name);
            } else {
                println!("✓ {} has no open compliance issue", name);
            }
        }
        Command::ByBeneficiary { csv } => {
            let index = fetcher.transactions_by_beneficiary_name()?;
            if csv {
                let rows: Vec<_> = index.into_values().collect();
                write_transactions_csv(io::stdout().lock(), &rows)?;
            } else {
                println!("📒 {} beneficiaries", index.len());
                for (name, tx) in &index {
                    println!("  {:<24} {:>10.2}  (mtn {}, from {})", name, tx.amount, tx.mtn, tx.sender_full_name);
                }
            }
        }
        Command::UnsolvedIssues => {
            let ids = fetcher.unsolved_issue_ids()?;
            println!("🚩 {} unsolved issues", ids.len());
            for id in ids {
                println!("  {}", id);
            }
        }
        Command::SolvedMessages => {
            let messages = fetcher.all_solved_issue_messages()?;
            println!("✅ {} solved issue messages", messages.len());
            for message in messages {
                println!("  - {}", message);
            }
        }
        Command::Top { n, csv } => {
            let n = n.unwrap_or(default_top_n);
            let top = fetcher.top_transactions_by_amount(n)?;
            if csv {
                write_transactions_csv(io::stdout().lock(), &top)?;
            } else {
                println!("🏆 Top {} transactions by amount", n);
                for (rank, tx) in top.iter().enumerate() {
                    println!(
                        "  {}. {:>10.2}  {} → {} (mtn {})",
                        rank + 1,
                        tx.amount,
                        tx.sender_full_name,
                        tx.beneficiary_full_name,
                        tx.mtn
                    );
                }
            }
        }
        Command::TopSender => match fetcher.top_sender()? {
            Some(name) => println!("🏆 Top sender: {}", name),
            None => println!("No clean transactions"),
        },
        Command::TopSenderTotal => match fetcher.top_sender_by_total_sent()? {
            Some(name) => println!("🏆 Top sender by total sent: {}", name),
            None => println!("No clean transactions"),
        },
        Command::Report { json } => {
            let report = fetcher.report(default_top_n)?;
            if json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", report.render_text());
            }
        }
        Command::Help => println!("{}", USAGE),
    }

    Ok(())
}
