use chrono::{NaiveDate, Utc};
use clap::Parser;
use engine::{DuesStatus, Engine, PaymentMethod, RecordDuesCmd, ResetMode, TransactionFilter};
use migration::{Migrator, MigratorTrait};
use serde_json::{Value, json};

use cli::{
    BatchDuesArgs, Cli, Command, Dues, DuesCommand, Expense, ExpenseCommand, JournalArgs, Member,
    MemberCommand, RecordDuesArgs, Tariff, TariffCommand,
};
use settings::Database;

mod cli;
mod settings;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const DEFAULT_DATABASE_URL: &str = "sqlite:./duesbook.db?mode=rwc";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let (body, failed) = match run(cli).await {
        Ok(data) => (success(data), false),
        Err(err) => (json!({ "success": false, "message": err.to_string() }), true),
    };
    println!("{body}");
    if failed {
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<Value, BoxError> {
    let settings = settings::Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(format!(
            "duesbook={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = connect_database(cli.database_url.as_deref(), settings.database.as_ref()).await?;

    let mut builder = Engine::builder().database(db);
    if let Some(identity) = cli.identity.or(settings.club.identity) {
        builder = builder.identity(identity);
    }
    let engine = builder.build().await?;

    if engine.identity().is_some() && engine.ensure_cash_fund().await? {
        tracing::info!("created the cash fund");
    }

    execute(&engine, cli.command).await
}

async fn connect_database(
    url: Option<&str>,
    config: Option<&Database>,
) -> Result<sea_orm::DatabaseConnection, BoxError> {
    let url = match (url, config) {
        (Some(url), _) => url.to_string(),
        (None, Some(Database::Memory)) => String::from("sqlite::memory:"),
        (None, Some(Database::Sqlite(path))) => format!("sqlite:{}?mode=rwc", path),
        (None, None) => DEFAULT_DATABASE_URL.to_string(),
    };
    tracing::debug!("connecting to {url}");

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

/// Merge command data into the `{"success": true}` envelope.
fn success(data: Value) -> Value {
    let mut body = json!({ "success": true });
    if let (Value::Object(body), Value::Object(data)) = (&mut body, data) {
        body.extend(data);
    }
    body
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

async fn tariff_or_current(engine: &Engine, tariff: Option<i64>) -> Result<i64, BoxError> {
    match tariff {
        Some(value) => Ok(value),
        None => Ok(engine.tariff().await?.value),
    }
}

async fn execute(engine: &Engine, command: Command) -> Result<Value, BoxError> {
    let data = match command {
        Command::Member(Member { command }) => match command {
            MemberCommand::Add { name } => json!({ "id": engine.create_member(&name).await? }),
            MemberCommand::AddMany { names } => {
                serde_json::to_value(engine.create_members(&names).await?)?
            }
            MemberCommand::Rename { id, name } => {
                engine.rename_member(&id, &name).await?;
                json!({ "id": id })
            }
            MemberCommand::Delete { id } => {
                let removed = engine.delete_member(&id).await?;
                json!({ "id": id, "removed_transactions": removed })
            }
            MemberCommand::List => json!({ "members": engine.members().await? }),
            MemberCommand::Show { id } => json!({ "member": engine.member(&id).await? }),
        },
        Command::Dues(Dues { command }) => match command {
            DuesCommand::Record(args) => record_dues(engine, args).await?,
            DuesCommand::Batch(args) => record_batch(engine, args).await?,
            DuesCommand::Unpaid { member } => {
                json!({ "transactions": engine.unpaid_dues(&member).await? })
            }
        },
        Command::Deposit(args) => {
            serde_json::to_value(engine.deposit_balance(&args.member, args.amount).await?)?
        }
        Command::Expense(Expense { command }) => match command {
            ExpenseCommand::Record {
                description,
                amount,
                date,
            } => {
                let id = engine
                    .record_expense(&description, amount, date.unwrap_or_else(today))
                    .await?;
                json!({ "id": id })
            }
            ExpenseCommand::List => json!({ "expenses": engine.expenses().await? }),
        },
        Command::Tariff(Tariff { command }) => match command {
            TariffCommand::Set { value } => json!({ "tariff": engine.set_tariff(value).await? }),
            TariffCommand::Show => json!({ "tariff": engine.tariff().await? }),
        },
        Command::Journal(JournalArgs {
            member,
            kind,
            status,
        }) => {
            let filter = TransactionFilter {
                member_id: member,
                kind,
                dues_status: status,
            };
            json!({ "transactions": engine.transactions(filter).await? })
        }
        Command::Summary => serde_json::to_value(engine.summary().await?)?,
        Command::Reset(args) => {
            let mode = ResetMode::parse(&args.mode, args.start, args.end)?;
            engine.reset_data(mode).await?;
            json!({ "mode": args.mode })
        }
    };
    Ok(data)
}

async fn record_dues(engine: &Engine, args: RecordDuesArgs) -> Result<Value, BoxError> {
    let tariff = tariff_or_current(engine, args.tariff).await?;
    let date = args.date.unwrap_or_else(today);
    let cmd = match args.status {
        DuesStatus::Unpaid => RecordDuesCmd::unpaid(args.member, args.games, tariff, date),
        DuesStatus::Paid => RecordDuesCmd::paid(
            args.member,
            args.games,
            tariff,
            date,
            args.method.unwrap_or(PaymentMethod::None),
        ),
    };
    let id = engine.record_dues(cmd).await?;
    Ok(json!({ "id": id }))
}

async fn record_batch(engine: &Engine, args: BatchDuesArgs) -> Result<Value, BoxError> {
    let tariff = tariff_or_current(engine, args.tariff).await?;
    let date = args.date.unwrap_or_else(today);
    let entries = args
        .entries
        .into_iter()
        .map(|entry| {
            engine::BatchDuesEntry::new(
                entry.member_id,
                entry.games_played,
                entry.status,
                tariff,
                date,
            )
        })
        .collect();
    let recorded = engine.record_batch_dues(entries).await?;
    Ok(json!({ "recorded": recorded }))
}
