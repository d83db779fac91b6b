use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    BatchDuesEntry, CASH_FUND_ID, Collection, DuesStatus, Engine, EngineError, PaymentMethod,
    RecordDuesCmd, TransactionFilter, TransactionKind,
};
use migration::MigratorTrait;

const TARIFF: i64 = 5_000;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .identity("treasurer")
        .build()
        .await
        .unwrap();
    assert!(engine.ensure_cash_fund().await.unwrap());
    (engine, db)
}

fn session_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 9, 12).unwrap()
}

async fn balance(engine: &Engine, member_id: &str) -> i64 {
    engine.member(member_id).await.unwrap().balance
}

async fn fund_balance(engine: &Engine) -> i64 {
    engine.cash_fund().await.unwrap().balance
}

async fn unpaid_dues(engine: &Engine, member_id: &str, games: i64) {
    engine
        .record_dues(RecordDuesCmd::unpaid(member_id, games, TARIFF, session_day()))
        .await
        .unwrap();
}

/// Cash fund balance implied by the journal: cash dues + deposits - expenses.
async fn expected_fund_balance(engine: &Engine) -> i64 {
    let journal = engine
        .transactions(TransactionFilter::default())
        .await
        .unwrap();
    let cash_dues: i64 = journal
        .iter()
        .filter(|t| t.kind == TransactionKind::Dues && t.payment_method == PaymentMethod::Cash)
        .map(|t| t.amount)
        .sum();
    let deposits: i64 = journal
        .iter()
        .filter(|t| t.kind.is_deposit())
        .map(|t| t.amount)
        .sum();
    let spent: i64 = engine
        .expenses()
        .await
        .unwrap()
        .iter()
        .map(|e| e.amount)
        .sum();
    cash_dues + deposits - spent
}

async fn count_rows(db: &DatabaseConnection, sql: &str) -> i64 {
    let row = db
        .query_one(Statement::from_string(db.get_database_backend(), sql))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "n").unwrap()
}

#[tokio::test]
async fn deleting_a_member_removes_its_journal() {
    let (engine, _db) = engine_with_db().await;
    let budi = engine.create_member("Budi").await.unwrap();
    let sari = engine.create_member("Sari").await.unwrap();

    unpaid_dues(&engine, &budi, 2).await;
    unpaid_dues(&engine, &budi, 1).await;
    engine.deposit_balance(&budi, 4_000).await.unwrap();
    unpaid_dues(&engine, &sari, 1).await;

    let removed = engine.delete_member(&budi).await.unwrap();
    assert_eq!(removed, 3);

    let left = engine
        .transactions(TransactionFilter::default().member(budi.as_str()))
        .await
        .unwrap();
    assert!(left.is_empty());
    assert_eq!(
        engine.member(&budi).await,
        Err(EngineError::NotFound(format!("member \"{budi}\"")))
    );

    let others = engine
        .transactions(TransactionFilter::default().member(sari.as_str()))
        .await
        .unwrap();
    assert_eq!(others.len(), 1);
}

#[tokio::test]
async fn deleting_a_missing_member_fails() {
    let (engine, _db) = engine_with_db().await;
    assert_eq!(
        engine.delete_member("ghost").await,
        Err(EngineError::NotFound("member \"ghost\"".to_string()))
    );
}

#[tokio::test]
async fn cash_fund_cannot_be_renamed_or_deleted() {
    let (engine, _db) = engine_with_db().await;
    assert!(matches!(
        engine.delete_member(CASH_FUND_ID).await,
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        engine.rename_member(CASH_FUND_ID, "Treasury").await,
        Err(EngineError::InvalidInput(_))
    ));
    assert!(engine.cash_fund().await.is_ok());
}

#[tokio::test]
async fn rename_keeps_the_journal_snapshot() {
    let (engine, _db) = engine_with_db().await;
    let id = engine.create_member("Budi").await.unwrap();
    unpaid_dues(&engine, &id, 1).await;

    engine.rename_member(&id, "Budi Santoso").await.unwrap();

    assert_eq!(engine.member(&id).await.unwrap().name, "Budi Santoso");
    let journal = engine
        .transactions(TransactionFilter::default().member(id.as_str()))
        .await
        .unwrap();
    assert_eq!(journal[0].member_name, "Budi");

    assert_eq!(
        engine.rename_member("ghost", "Nobody").await,
        Err(EngineError::NotFound("member \"ghost\"".to_string()))
    );
}

#[tokio::test]
async fn writes_need_an_identity() {
    let (_engine, db) = engine_with_db().await;
    let anonymous = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();

    assert_eq!(
        anonymous.create_member("Budi").await,
        Err(EngineError::NotAuthenticated)
    );
    assert_eq!(
        anonymous.ensure_cash_fund().await,
        Err(EngineError::NotAuthenticated)
    );
    assert_eq!(
        anonymous.deposit_balance(CASH_FUND_ID, 1_000).await,
        Err(EngineError::NotAuthenticated)
    );
    // Reads stay available.
    assert_eq!(anonymous.cash_fund().await.unwrap().balance, 0);
}

#[tokio::test]
async fn cash_fund_bootstrap_is_idempotent() {
    let (engine, db) = engine_with_db().await;
    engine.deposit_balance(CASH_FUND_ID, 7_500).await.unwrap();

    assert!(!engine.ensure_cash_fund().await.unwrap());
    assert!(!engine.ensure_cash_fund().await.unwrap());

    assert_eq!(fund_balance(&engine).await, 7_500);
    assert_eq!(
        count_rows(&db, "SELECT COUNT(*) AS n FROM members WHERE id = 'kas_klub'").await,
        1
    );
}

#[tokio::test]
async fn dues_move_money_according_to_status_and_method() {
    let (engine, _db) = engine_with_db().await;
    let id = engine.create_member("Budi").await.unwrap();

    // Unpaid: debt grows, cash fund untouched.
    unpaid_dues(&engine, &id, 2).await;
    assert_eq!(balance(&engine, &id).await, -10_000);
    assert_eq!(fund_balance(&engine).await, 0);

    // Paid from balance: member balance drawn down, cash fund untouched.
    engine
        .record_dues(RecordDuesCmd::paid(
            &id,
            1,
            TARIFF,
            session_day(),
            PaymentMethod::Balance,
        ))
        .await
        .unwrap();
    assert_eq!(balance(&engine, &id).await, -15_000);
    assert_eq!(fund_balance(&engine).await, 0);

    // Paid in cash: only the cash fund moves.
    engine
        .record_dues(RecordDuesCmd::paid(
            &id,
            3,
            TARIFF,
            session_day(),
            PaymentMethod::Cash,
        ))
        .await
        .unwrap();
    assert_eq!(balance(&engine, &id).await, -15_000);
    assert_eq!(fund_balance(&engine).await, 15_000);

    let journal = engine
        .transactions(TransactionFilter::default().member(id.as_str()))
        .await
        .unwrap();
    assert_eq!(journal.len(), 3);
    // Latest first.
    assert_eq!(journal[0].payment_method, PaymentMethod::Cash);
    assert_eq!(journal[0].dues_status, Some(DuesStatus::Paid));
    assert_eq!(journal[0].amount, 15_000);
    assert_eq!(journal[2].payment_method, PaymentMethod::None);
    assert_eq!(journal[2].dues_status, Some(DuesStatus::Unpaid));
    assert!(journal.iter().all(|t| t.kind == TransactionKind::Dues));
}

#[tokio::test]
async fn dues_input_is_validated() {
    let (engine, _db) = engine_with_db().await;
    let id = engine.create_member("Budi").await.unwrap();

    assert!(matches!(
        engine
            .record_dues(RecordDuesCmd::unpaid(&id, 0, TARIFF, session_day()))
            .await,
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        engine
            .record_dues(RecordDuesCmd::paid(
                &id,
                1,
                TARIFF,
                session_day(),
                PaymentMethod::None
            ))
            .await,
        Err(EngineError::InvalidInput(_))
    ));
    assert_eq!(
        engine
            .record_dues(RecordDuesCmd::unpaid("ghost", 1, TARIFF, session_day()))
            .await,
        Err(EngineError::NotFound("member \"ghost\"".to_string()))
    );
    assert!(
        engine
            .transactions(TransactionFilter::default())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn deposit_settles_oldest_unpaid_dues_first() {
    let (engine, _db) = engine_with_db().await;
    let id = engine.create_member("Budi").await.unwrap();
    unpaid_dues(&engine, &id, 2).await; // 10_000
    unpaid_dues(&engine, &id, 3).await; // 15_000
    unpaid_dues(&engine, &id, 4).await; // 20_000
    let before = engine.unpaid_dues(&id).await.unwrap();
    assert_eq!(
        before.iter().map(|t| t.amount).collect::<Vec<_>>(),
        vec![10_000, 15_000, 20_000]
    );

    let receipt = engine.deposit_balance(&id, 26_000).await.unwrap();

    assert_eq!(receipt.settled, vec![before[0].id, before[1].id]);
    assert_eq!(receipt.kind, TransactionKind::DebtPayment);
    assert_eq!(receipt.balance, -19_000);

    let still_unpaid = engine.unpaid_dues(&id).await.unwrap();
    assert_eq!(still_unpaid.len(), 1);
    assert_eq!(still_unpaid[0].id, before[2].id);
    assert_eq!(still_unpaid[0].amount, 20_000);

    let paid = engine
        .transactions(
            TransactionFilter::default()
                .member(id.as_str())
                .kind(TransactionKind::Dues)
                .dues_status(DuesStatus::Paid),
        )
        .await
        .unwrap();
    let mut amounts: Vec<i64> = paid.iter().map(|t| t.amount).collect();
    amounts.sort();
    assert_eq!(amounts, vec![10_000, 15_000]);

    assert_eq!(fund_balance(&engine).await, 26_000);
}

#[tokio::test]
async fn deposit_kind_depends_on_the_debt() {
    let (engine, _db) = engine_with_db().await;
    let mut cases = Vec::new();
    for (name, deposit) in [("Exact", 5_000), ("Over", 8_000), ("Under", 3_000)] {
        let id = engine.create_member(name).await.unwrap();
        unpaid_dues(&engine, &id, 1).await;
        assert_eq!(balance(&engine, &id).await, -5_000);
        cases.push((id, deposit));
    }

    let expected = [
        (TransactionKind::DebtSettlement, 0),
        (TransactionKind::DebtSettlementPlusDeposit, 3_000),
        (TransactionKind::DebtPayment, -2_000),
    ];
    for ((id, deposit), (kind, after)) in cases.iter().zip(expected) {
        let receipt = engine.deposit_balance(id, *deposit).await.unwrap();
        assert_eq!(receipt.kind, kind);
        assert_eq!(balance(&engine, id).await, after);

        let entry = engine
            .transactions(TransactionFilter::default().member(id.as_str()).kind(kind))
            .await
            .unwrap();
        assert_eq!(entry.len(), 1);
        assert_eq!(entry[0].amount, *deposit);
        assert_eq!(entry[0].games_played, 0);
        assert_eq!(entry[0].payment_method, PaymentMethod::Cash);
        assert_eq!(entry[0].dues_status, Some(DuesStatus::Paid));
    }
}

#[tokio::test]
async fn deposit_on_credit_is_a_balance_deposit() {
    let (engine, _db) = engine_with_db().await;
    let id = engine.create_member("Budi").await.unwrap();

    let receipt = engine.deposit_balance(&id, 20_000).await.unwrap();

    assert_eq!(receipt.kind, TransactionKind::BalanceDeposit);
    assert!(receipt.settled.is_empty());
    assert_eq!(balance(&engine, &id).await, 20_000);
    assert_eq!(fund_balance(&engine).await, 20_000);
}

#[tokio::test]
async fn deposit_to_the_cash_fund_counts_once() {
    let (engine, _db) = engine_with_db().await;

    let receipt = engine.deposit_balance(CASH_FUND_ID, 12_000).await.unwrap();

    assert_eq!(receipt.kind, TransactionKind::BalanceDeposit);
    assert_eq!(receipt.balance, 12_000);
    assert_eq!(fund_balance(&engine).await, 12_000);
}

#[tokio::test]
async fn deposit_input_is_validated() {
    let (engine, _db) = engine_with_db().await;
    let id = engine.create_member("Budi").await.unwrap();

    assert!(matches!(
        engine.deposit_balance(&id, 0).await,
        Err(EngineError::InvalidInput(_))
    ));
    assert_eq!(
        engine.deposit_balance("ghost", 1_000).await,
        Err(EngineError::NotFound("member \"ghost\"".to_string()))
    );
    assert_eq!(fund_balance(&engine).await, 0);
}

#[tokio::test]
async fn batch_dues_skip_missing_members() {
    let (engine, _db) = engine_with_db().await;
    let budi = engine.create_member("Budi").await.unwrap();
    let sari = engine.create_member("Sari").await.unwrap();

    let recorded = engine
        .record_batch_dues(vec![
            BatchDuesEntry::new(&budi, 2, DuesStatus::Paid, TARIFF, session_day()),
            BatchDuesEntry::new("ghost", 5, DuesStatus::Paid, TARIFF, session_day()),
            BatchDuesEntry::new(&sari, 1, DuesStatus::Unpaid, TARIFF, session_day()),
        ])
        .await
        .unwrap();

    assert_eq!(recorded, 2);
    assert_eq!(fund_balance(&engine).await, 10_000);
    assert_eq!(balance(&engine, &budi).await, 0);
    assert_eq!(balance(&engine, &sari).await, -5_000);

    let journal = engine
        .transactions(TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(journal.len(), 2);
    let paid = journal.iter().find(|t| t.member_id == budi).unwrap();
    assert_eq!(paid.payment_method, PaymentMethod::Cash);
    let unpaid = journal.iter().find(|t| t.member_id == sari).unwrap();
    assert_eq!(unpaid.payment_method, PaymentMethod::None);
    assert_eq!(unpaid.dues_status, Some(DuesStatus::Unpaid));
}

#[tokio::test]
async fn batch_without_valid_entries_is_a_no_op() {
    let (engine, _db) = engine_with_db().await;

    let recorded = engine
        .record_batch_dues(vec![BatchDuesEntry::new(
            "ghost",
            2,
            DuesStatus::Paid,
            TARIFF,
            session_day(),
        )])
        .await
        .unwrap();
    assert_eq!(recorded, 0);
    assert_eq!(engine.record_batch_dues(Vec::new()).await, Ok(0));
    assert_eq!(fund_balance(&engine).await, 0);
}

#[tokio::test]
async fn batch_with_an_invalid_row_records_nothing() {
    let (engine, _db) = engine_with_db().await;
    let budi = engine.create_member("Budi").await.unwrap();

    let result = engine
        .record_batch_dues(vec![
            BatchDuesEntry::new(&budi, 2, DuesStatus::Unpaid, TARIFF, session_day()),
            BatchDuesEntry::new(&budi, 0, DuesStatus::Unpaid, TARIFF, session_day()),
        ])
        .await;

    assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    assert_eq!(balance(&engine, &budi).await, 0);
}

#[tokio::test]
async fn expenses_come_out_of_the_cash_fund() {
    let (engine, _db) = engine_with_db().await;
    engine.deposit_balance(CASH_FUND_ID, 50_000).await.unwrap();

    engine
        .record_expense("Shuttlecocks", 32_000, session_day())
        .await
        .unwrap();
    engine
        .record_expense("Court rent", 25_000, session_day())
        .await
        .unwrap();

    assert_eq!(fund_balance(&engine).await, -7_000);
    let expenses = engine.expenses().await.unwrap();
    assert_eq!(expenses.len(), 2);
    assert_eq!(expenses[0].description, "Court rent");

    assert!(matches!(
        engine.record_expense("Nets", 0, session_day()).await,
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        engine.record_expense("  ", 1_000, session_day()).await,
        Err(EngineError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn cash_fund_reconciles_with_the_journal() {
    let (engine, _db) = engine_with_db().await;
    let budi = engine.create_member("Budi").await.unwrap();
    let sari = engine.create_member("Sari").await.unwrap();

    unpaid_dues(&engine, &budi, 3).await;
    engine
        .record_dues(RecordDuesCmd::paid(
            &sari,
            2,
            TARIFF,
            session_day(),
            PaymentMethod::Cash,
        ))
        .await
        .unwrap();
    engine.deposit_balance(&budi, 20_000).await.unwrap();
    engine
        .record_dues(RecordDuesCmd::paid(
            &budi,
            1,
            TARIFF,
            session_day(),
            PaymentMethod::Balance,
        ))
        .await
        .unwrap();
    engine
        .record_batch_dues(vec![
            BatchDuesEntry::new(&budi, 1, DuesStatus::Paid, TARIFF, session_day()),
            BatchDuesEntry::new(&sari, 2, DuesStatus::Unpaid, TARIFF, session_day()),
        ])
        .await
        .unwrap();
    engine.deposit_balance(CASH_FUND_ID, 3_000).await.unwrap();
    engine
        .record_expense("Shuttlecocks", 18_000, session_day())
        .await
        .unwrap();

    assert_eq!(fund_balance(&engine).await, expected_fund_balance(&engine).await);
    assert_eq!(fund_balance(&engine).await, 10_000 + 20_000 + 5_000 + 3_000 - 18_000);
}

#[tokio::test]
async fn aborted_dues_leave_no_trace() {
    let (engine, db) = engine_with_db().await;
    let id = engine.create_member("Budi").await.unwrap();
    engine.deposit_balance(&id, 10_000).await.unwrap();

    db.execute_unprepared(
        "CREATE TRIGGER reject_journal BEFORE INSERT ON transactions \
         BEGIN SELECT RAISE(ABORT, 'simulated conflict'); END;",
    )
    .await
    .unwrap();

    let result = engine
        .record_dues(RecordDuesCmd::paid(
            &id,
            1,
            TARIFF,
            session_day(),
            PaymentMethod::Balance,
        ))
        .await;
    assert!(matches!(result, Err(EngineError::Store(_))));

    let cash = engine
        .record_dues(RecordDuesCmd::paid(
            &id,
            1,
            TARIFF,
            session_day(),
            PaymentMethod::Cash,
        ))
        .await;
    assert!(matches!(cash, Err(EngineError::Store(_))));

    db.execute_unprepared("DROP TRIGGER reject_journal")
        .await
        .unwrap();

    assert_eq!(balance(&engine, &id).await, 10_000);
    assert_eq!(fund_balance(&engine).await, 10_000);
    let dues = engine
        .transactions(TransactionFilter::default().kind(TransactionKind::Dues))
        .await
        .unwrap();
    assert!(dues.is_empty());
}

#[tokio::test]
async fn tariff_is_a_single_overwritten_value() {
    let (engine, db) = engine_with_db().await;
    assert_eq!(engine.tariff().await.unwrap().value, 0);

    engine.set_tariff(5_000).await.unwrap();
    engine.set_tariff(6_000).await.unwrap();

    let tariff = engine.tariff().await.unwrap();
    assert_eq!(tariff.value, 6_000);
    assert_eq!(tariff.effective_date, tariff.updated_at.date_naive());
    assert_eq!(count_rows(&db, "SELECT COUNT(*) AS n FROM tariff").await, 1);

    assert!(matches!(
        engine.set_tariff(-1).await,
        Err(EngineError::InvalidInput(_))
    ));
    assert_eq!(engine.tariff().await.unwrap().value, 6_000);
}

#[tokio::test]
async fn bulk_add_skips_existing_names() {
    let (engine, _db) = engine_with_db().await;
    engine.create_member("Budi").await.unwrap();

    let added = engine
        .create_members(&["budi", "Sari", " ", "Tono", "SARI"])
        .await
        .unwrap();

    assert_eq!(added.created.len(), 2);
    assert_eq!(added.skipped, vec!["budi".to_string(), "SARI".to_string()]);
    let names: Vec<String> = engine
        .members()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(names, vec!["Budi", "Sari", "Tono"]);
}

#[tokio::test]
async fn summary_lists_debtors_largest_first() {
    let (engine, _db) = engine_with_db().await;
    let budi = engine.create_member("Budi").await.unwrap();
    let sari = engine.create_member("Sari").await.unwrap();
    let tono = engine.create_member("Tono").await.unwrap();
    unpaid_dues(&engine, &budi, 1).await;
    unpaid_dues(&engine, &sari, 3).await;
    engine.deposit_balance(&tono, 2_000).await.unwrap();

    let summary = engine.summary().await.unwrap();

    assert_eq!(summary.cash_fund_balance, 2_000);
    assert_eq!(summary.total_outstanding, 20_000);
    let order: Vec<&str> = summary.debtors.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(order, vec!["Sari", "Budi"]);
    assert_eq!(summary.debtors[0].amount, 15_000);
}

#[tokio::test]
async fn largest_debt_stays_within_range() {
    let (engine, _db) = engine_with_db().await;
    let id = engine.create_member("Budi").await.unwrap();
    engine
        .record_dues(RecordDuesCmd::unpaid(&id, 1, i64::MAX, session_day()))
        .await
        .unwrap();
    assert_eq!(balance(&engine, &id).await, -i64::MAX);

    // One more unit would make the debt impossible to negate.
    assert!(matches!(
        engine
            .record_dues(RecordDuesCmd::unpaid(&id, 1, 1, session_day()))
            .await,
        Err(EngineError::InvalidInput(_))
    ));
    assert_eq!(balance(&engine, &id).await, -i64::MAX);
    assert_eq!(
        engine
            .transactions(TransactionFilter::default().member(id.as_str()))
            .await
            .unwrap()
            .len(),
        1
    );

    let receipt = engine.deposit_balance(&id, 1).await.unwrap();
    assert_eq!(receipt.kind, TransactionKind::DebtPayment);
    assert_eq!(receipt.balance, -i64::MAX + 1);

    let summary = engine.summary().await.unwrap();
    assert_eq!(summary.total_outstanding, i64::MAX - 1);
    assert_eq!(summary.debtors[0].amount, i64::MAX - 1);

    let sari = engine.create_member("Sari").await.unwrap();
    unpaid_dues(&engine, &sari, 1).await;
    assert!(matches!(
        engine.summary().await,
        Err(EngineError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn committed_writes_reach_subscribers() {
    let (engine, _db) = engine_with_db().await;
    let mut changes = engine.subscribe();

    let id = engine.create_member("Budi").await.unwrap();
    let change = changes.recv().await.unwrap();
    assert!(change.touches(Collection::Members));

    engine.deposit_balance(&id, 1_000).await.unwrap();
    let change = changes.recv().await.unwrap();
    assert!(change.touches(Collection::Transactions));
    assert!(change.touches(Collection::Members));

    // A failed write publishes nothing.
    assert!(engine.deposit_balance("ghost", 1_000).await.is_err());
    engine.set_tariff(4_000).await.unwrap();
    let change = changes.recv().await.unwrap();
    assert_eq!(change.collections, vec![Collection::Tariff]);
}
