//! 公式欄位與可用日示例

use std::rc::Rc;

use celllink::*;
use rust_decimal::Decimal;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== 公式欄位示例 ===\n");

    let mut table = Table::open_with_storage(
        TableConfig::new("orders", "/tmp/celllink").with_enforce_availability(true),
        Rc::new(MemoryStorage::new()),
    )?;

    table.add_column(FlatColumn::new("price"))?;
    table.add_column(FlatColumn::new("quantity"))?;
    table.add_column(ConstColumn::new("tax_rate", Decimal::new(5, 2)))?;
    table.add_column(FormulaColumn::new("subtotal", &["price", "quantity"], |row| {
        CellValue::from(row["price"].number_or(Decimal::ZERO) * row["quantity"].number_or(Decimal::ZERO))
    }))?;
    table.add_column(FormulaColumn::new("total", &["subtotal", "tax_rate"], |row| {
        let subtotal = row["subtotal"].number_or(Decimal::ZERO);
        let rate = row["tax_rate"].number_or(Decimal::ZERO);
        CellValue::from((subtotal * (Decimal::ONE + rate)).round_dp(2))
    }))?;
    table.add_column(ProtectedColumn::new("returned"))?;

    println!("刷新順序: {:?}\n", table.refresh_order());

    let orders = [
        (20251001, "SO-001", 120, 3),
        (20251001, "SO-002", 45, 10),
        (20251002, "SO-003", 990, 1),
    ];
    for (date, key, price, quantity) in orders {
        table.set_cell(&CellAddress::new(date, "price"), key, price)?;
        table.set_cell(&CellAddress::new(date, "quantity"), key, quantity)?;
    }
    table.refresh()?;

    // 修改單價只會重算同一天的小計與總計
    table.set_cell(&CellAddress::new(20251001, "price"), "SO-002", 50)?;
    let report = table.refresh()?;
    println!("修改後重算: {:?}\n", report.refreshed);

    let frame = table.materialize(&["price", "quantity", "subtotal", "total"], None)?;
    for row in &frame.rows {
        println!(
            "{} {}  單價 {:>4}  數量 {:>3}  小計 {:>6}  含稅 {:>8}",
            row.date, row.key, row.values[0], row.values[1], row.values[2], row.values[3]
        );
    }

    // 退貨標記隔天才可讀取
    let returned = CellAddress::new(20251002, "returned");
    table.set_cell(&returned, "SO-003", "yes")?;
    match table.get_cell_as_of(&returned, "SO-003", 20251002, true) {
        Err(e) => println!("\n當天讀取: {}", e),
        Ok(value) => println!("\n當天讀取: {}", value),
    }
    println!(
        "隔天讀取: {}",
        table.get_cell_as_of(&returned, "SO-003", 20251003, true)?
    );

    table.close()
}
