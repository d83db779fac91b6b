use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use engine::{DuesStatus, PaymentMethod, TransactionKind};

#[derive(Parser, Debug)]
#[command(name = "duesbook")]
#[command(about = "Dues book of a sports club: members, dues, deposits and the cash fund")]
pub struct Cli {
    /// Settings file (defaults to `duesbook.toml` when present).
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Database connection string (also read from `DATABASE_URL`).
    /// Overrides the `[database]` settings.
    #[arg(long, global = true, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Identity writes are made on behalf of (also read from `DUESBOOK_USER`).
    #[arg(long = "as", global = true, env = "DUESBOOK_USER")]
    pub identity: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage club members.
    Member(Member),
    /// Record dues and list what is still owed.
    Dues(Dues),
    /// Deposit money for a member, or straight into the cash fund (`kas_klub`).
    Deposit(DepositArgs),
    /// Record and list expenses paid from the cash fund.
    Expense(Expense),
    /// Read or change the per-game tariff.
    Tariff(Tariff),
    /// List journal entries, latest first.
    Journal(JournalArgs),
    /// Cash fund balance and outstanding debts.
    Summary,
    /// Wipe history.
    Reset(ResetArgs),
}

#[derive(Args, Debug)]
pub struct Member {
    #[command(subcommand)]
    pub command: MemberCommand,
}

#[derive(Subcommand, Debug)]
pub enum MemberCommand {
    Add {
        #[arg(long)]
        name: String,
    },
    /// Add several members at once, skipping names already present.
    AddMany {
        #[arg(required = true)]
        names: Vec<String>,
    },
    Rename {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
    },
    /// Delete a member together with their journal entries.
    Delete {
        #[arg(long)]
        id: String,
    },
    List,
    Show {
        #[arg(long)]
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct Dues {
    #[command(subcommand)]
    pub command: DuesCommand,
}

#[derive(Subcommand, Debug)]
pub enum DuesCommand {
    /// Record the dues of one member.
    Record(RecordDuesArgs),
    /// Record the dues of a whole session.
    Batch(BatchDuesArgs),
    /// Unpaid dues of a member, oldest first.
    Unpaid {
        #[arg(long)]
        member: String,
    },
}

#[derive(Args, Debug)]
pub struct RecordDuesArgs {
    #[arg(long)]
    pub member: String,
    #[arg(long)]
    pub games: i64,
    #[arg(long, default_value = "unpaid")]
    pub status: DuesStatus,
    /// Where the money of a paid entry comes from: `balance` or `cash`.
    #[arg(long)]
    pub method: Option<PaymentMethod>,
    /// Price per game; defaults to the stored tariff.
    #[arg(long)]
    pub tariff: Option<i64>,
    /// Session day (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct BatchDuesArgs {
    /// One entry per member, as `MEMBER_ID:GAMES:paid|unpaid`.
    #[arg(long = "entry", required = true, value_parser = parse_entry)]
    pub entries: Vec<EntryArg>,
    #[arg(long)]
    pub tariff: Option<i64>,
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryArg {
    pub member_id: String,
    pub games_played: i64,
    pub status: DuesStatus,
}

fn parse_entry(raw: &str) -> Result<EntryArg, String> {
    let mut parts = raw.rsplitn(3, ':');
    let (Some(status), Some(games), Some(member_id)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected MEMBER_ID:GAMES:paid|unpaid, got `{raw}`"));
    };
    if member_id.trim().is_empty() {
        return Err(format!("missing member id in `{raw}`"));
    }
    let games_played = games
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("invalid games count in `{raw}`"))?;
    let status = status.parse::<DuesStatus>().map_err(|err| err.to_string())?;
    Ok(EntryArg {
        member_id: member_id.trim().to_string(),
        games_played,
        status,
    })
}

#[derive(Args, Debug)]
pub struct DepositArgs {
    #[arg(long)]
    pub member: String,
    #[arg(long)]
    pub amount: i64,
}

#[derive(Args, Debug)]
pub struct Expense {
    #[command(subcommand)]
    pub command: ExpenseCommand,
}

#[derive(Subcommand, Debug)]
pub enum ExpenseCommand {
    Record {
        #[arg(long)]
        description: String,
        #[arg(long)]
        amount: i64,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    List,
}

#[derive(Args, Debug)]
pub struct Tariff {
    #[command(subcommand)]
    pub command: TariffCommand,
}

#[derive(Subcommand, Debug)]
pub enum TariffCommand {
    Set {
        #[arg(long)]
        value: i64,
    },
    Show,
}

#[derive(Args, Debug)]
pub struct JournalArgs {
    #[arg(long)]
    pub member: Option<String>,
    #[arg(long)]
    pub kind: Option<TransactionKind>,
    #[arg(long)]
    pub status: Option<DuesStatus>,
}

#[derive(Args, Debug)]
pub struct ResetArgs {
    /// `all`, `month-ago` or `date-range`.
    pub mode: String,
    #[arg(long)]
    pub start: Option<NaiveDate>,
    #[arg(long)]
    pub end: Option<NaiveDate>,
}
