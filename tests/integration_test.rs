//! 集成測試

use std::collections::BTreeMap;
use std::rc::Rc;

use celllink::*;
use rust_decimal::Decimal;

fn ledger_columns(table: &mut Table) -> Rc<WindowedAggregation> {
    table.add_column(FlatColumn::new("account")).unwrap();
    table.add_column(FlatColumn::new("amount")).unwrap();
    table
        .add_column(
            WindowedAggregation::new("balance", "account")
                .with_input(AggregationInput::new("account", "amount")),
        )
        .unwrap()
}

fn post(table: &mut Table, date: Date, key: &str, account: &str, amount: i64) {
    table
        .set_cell(&CellAddress::new(date, "account"), key, account)
        .unwrap();
    table
        .set_cell(&CellAddress::new(date, "amount"), key, amount)
        .unwrap();
}

fn balance(table: &mut Table, date: Date, key: &str) -> CellValue {
    table
        .get_cell(&CellAddress::new(date, "balance"), key)
        .unwrap()
}

#[test]
fn test_running_balance_ledger() {
    // 場景：兩個帳戶跨三個季度的交易，餘額不含當筆交易
    let storage = MemoryStorage::new();
    let mut table = Table::open_with_storage(
        TableConfig::new("ledger", "/unused"),
        Rc::new(storage.clone()),
    )
    .unwrap();
    let balance_column = ledger_columns(&mut table);

    post(&mut table, 20110103, "t1", "Checking", 1000);
    post(&mut table, 20110210, "t2", "Savings", 500);
    post(&mut table, 20110415, "t3", "Checking", -200);
    post(&mut table, 20110720, "t4", "Checking", 50);

    let report = table.refresh().unwrap();
    assert!(report.columns().contains(&"balance"));

    assert_eq!(balance(&mut table, 20110103, "t1"), CellValue::from(0));
    assert_eq!(balance(&mut table, 20110210, "t2"), CellValue::from(0));
    assert_eq!(balance(&mut table, 20110415, "t3"), CellValue::from(1000));
    assert_eq!(balance(&mut table, 20110720, "t4"), CellValue::from(800));

    // 每季起點各一個檢查點
    assert_eq!(
        balance_column.checkpoint_dates(),
        vec![20110101, 20110401, 20110701]
    );

    // 回補一筆較早的交易，只影響之後的餘額
    post(&mut table, 20110501, "t5", "Checking", 300);
    table.refresh().unwrap();

    assert_eq!(balance(&mut table, 20110415, "t3"), CellValue::from(1000));
    assert_eq!(balance(&mut table, 20110501, "t5"), CellValue::from(800));
    assert_eq!(balance(&mut table, 20110720, "t4"), CellValue::from(1100));

    let mut expected = Snapshot::new();
    expected.insert("Checking".to_string(), Decimal::from(1100));
    expected.insert("Savings".to_string(), Decimal::from(500));
    assert_eq!(balance_column.checkpoint(20110701), Some(expected));
}

#[test]
fn test_persistence_across_reopen() {
    let storage = MemoryStorage::new();

    {
        let mut table = Table::open_with_storage(
            TableConfig::new("ledger", "/unused"),
            Rc::new(storage.clone()),
        )
        .unwrap();
        ledger_columns(&mut table);
        post(&mut table, 20110103, "t1", "Checking", 1000);
        post(&mut table, 20110415, "t2", "Checking", -200);
        // 關閉前自動刷新
        table.close().unwrap();
    }

    assert!(storage.contains("DATES-ledger"));
    assert!(storage.contains("COLUMNS-ledger"));
    assert!(storage.contains("SNAPSHOT-ledger.balance_dates"));

    let mut table = Table::open_with_storage(
        TableConfig::new("ledger", "/unused"),
        Rc::new(storage.clone()),
    )
    .unwrap();
    let balance_column = ledger_columns(&mut table);

    // 既有欄位沿用已存的值，不需重算
    assert!(!table.needs_refresh());
    assert_eq!(balance(&mut table, 20110415, "t2"), CellValue::from(1000));
    assert_eq!(balance_column.checkpoint_dates(), vec![20110101, 20110401]);

    // 新交易從最近的檢查點續算
    post(&mut table, 20110502, "t3", "Checking", 10);
    table.refresh().unwrap();
    assert_eq!(balance(&mut table, 20110502, "t3"), CellValue::from(800));
    table.close().unwrap();
}

#[test]
fn test_file_storage_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = TableConfig::new("prices", dir.path()).with_cell_cache_capacity(2);

    {
        let mut table = Table::open(config.clone()).unwrap();
        table.add_column(FlatColumn::new("close")).unwrap();
        // 跨越多個月份，迫使頁面被移出快取
        for (i, date) in [20110103, 20110201, 20110301, 20110401].into_iter().enumerate() {
            table
                .set_cell(&CellAddress::new(date, "close"), "TSMC", 70 + i as i64)
                .unwrap();
        }
        assert!(table.cell_stats().pages_evicted > 0);
        table.close().unwrap();
    }

    let mut table = Table::open(config.with_read_only(true)).unwrap();
    table.add_column(FlatColumn::new("close")).unwrap();

    let frame = table.materialize(&["close"], None).unwrap();
    assert_eq!(frame.len(), 4);
    assert_eq!(
        frame.value(20110301, "TSMC", "close"),
        Some(&CellValue::from(72))
    );

    assert!(matches!(
        table.set_cell(&CellAddress::new(20110501, "close"), "TSMC", 1),
        Err(CellLinkError::ReadOnly(_))
    ));
    table.close().unwrap();
}

#[test]
fn test_formula_over_aggregation() {
    // 場景：三年移動加總，再除以年數得到年平均
    let mut table = Table::open_with_storage(
        TableConfig::new("points", "/unused"),
        Rc::new(MemoryStorage::new()),
    )
    .unwrap();
    table.add_column(FlatColumn::new("Label")).unwrap();
    table.add_column(FlatColumn::new("Points")).unwrap();
    table
        .add_column(
            WindowedAggregation::new("WF", "Label")
                .with_input(AggregationInput::new("Label", "Points"))
                .with_window_years(3),
        )
        .unwrap();
    table
        .add_column(FormulaColumn::new(
            "Average",
            &["WF"],
            |row: &BTreeMap<ColumnName, CellValue>| {
                CellValue::from(row["WF"].number_or(Decimal::ZERO) / Decimal::from(3))
            },
        ))
        .unwrap();

    for (date, points) in [(10000, 1), (20000, 20), (30000, 300), (40000, 4000), (50000, 50000)] {
        table.set_cell(&CellAddress::new(date, "Label"), "X", "X").unwrap();
        table.set_cell(&CellAddress::new(date, "Points"), "X", points).unwrap();
    }
    table.refresh().unwrap();

    let frame = table.materialize(&["WF", "Average"], None).unwrap();
    assert_eq!(
        frame.column_values("WF").unwrap(),
        [0, 1, 21, 321, 4320]
            .map(CellValue::from)
            .iter()
            .collect::<Vec<_>>()
    );
    assert_eq!(
        frame.value(50000, "X", "Average"),
        Some(&CellValue::from(Decimal::from(1440)))
    );
    assert!(!table.needs_refresh());
}

#[test]
fn test_refresh_order_respects_dependencies() {
    let mut table = Table::open_with_storage(
        TableConfig::new("graph", "/unused"),
        Rc::new(MemoryStorage::new()),
    )
    .unwrap();
    table.add_column(FlatColumn::new("a")).unwrap();
    table.add_column(FlatColumn::new("z")).unwrap();
    table
        .add_column(FormulaColumn::new("b", &["a"], |row| row["a"].clone()))
        .unwrap();
    table
        .add_column(FormulaColumn::new("c", &["b", "z"], |row| row["b"].clone()))
        .unwrap();

    let order = table.refresh_order().to_vec();
    let position = |name: &str| order.iter().position(|n| n == name).unwrap();

    assert!(position("a") < position("b"));
    assert!(position("b") < position("c"));
    assert!(position("z") < position("c"));
    assert_eq!(table.dependencies("b"), vec!["c"]);
}
