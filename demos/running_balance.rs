//! 帳戶餘額示例

use std::rc::Rc;

use celllink::*;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== 帳戶餘額示例 ===\n");

    let mut table = Table::open_with_storage(
        TableConfig::new("ledger", "/tmp/celllink"),
        Rc::new(MemoryStorage::new()),
    )?;

    table.add_column(FlatColumn::new("account"))?;
    table.add_column(FlatColumn::new("amount"))?;
    let balance = table.add_column(
        WindowedAggregation::new("balance", "account")
            .with_input(AggregationInput::new("account", "amount")),
    )?;

    let transactions = [
        (20250106, "T001", "Checking", 5000),
        (20250115, "T002", "Savings", 20000),
        (20250203, "T003", "Checking", -1200),
        (20250410, "T004", "Checking", -300),
        (20250512, "T005", "Savings", 1500),
        (20250701, "T006", "Checking", 800),
    ];

    for (date, key, account, amount) in transactions {
        table.set_cell(&CellAddress::new(date, "account"), key, account)?;
        table.set_cell(&CellAddress::new(date, "amount"), key, amount)?;
    }

    let report = table.refresh()?;
    println!(
        "刷新 {} 個欄位，共 {} 個髒位址\n",
        report.refreshed.len(),
        report.total_dirty()
    );

    let frame = table.materialize(&["account", "amount", "balance"], None)?;
    println!("{:<10} {:<6} {:<10} {:>8} {:>10}", "日期", "交易", "帳戶", "金額", "交易前餘額");
    for row in &frame.rows {
        println!(
            "{:<10} {:<6} {:<10} {:>8} {:>10}",
            row.date, row.key, row.values[0], row.values[1], row.values[2]
        );
    }

    println!("\n檢查點:");
    for date in balance.checkpoint_dates() {
        println!("  - {}: {:?}", date, balance.checkpoint(date).unwrap_or_default());
    }

    table.close()
}
