//! 三年移動加總示例
//!
//! 使用檔案儲存，第二次開啟時只重算新資料。

use celllink::*;

fn open(root: &std::path::Path) -> Result<(Table, std::rc::Rc<WindowedAggregation>)> {
    let mut table = Table::open(TableConfig::new("dividends", root))?;
    table.add_column(FlatColumn::new("ticker"))?;
    table.add_column(FlatColumn::new("dividend"))?;
    let moving = table.add_column(
        WindowedAggregation::new("dividend_3y", "ticker")
            .with_input(AggregationInput::new("ticker", "dividend"))
            .with_window_years(3),
    )?;
    Ok((table, moving))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== 三年移動加總示例 ===\n");

    let root = std::env::temp_dir().join(format!("celllink-demo-{}", std::process::id()));

    // 第一次開啟：寫入 2018–2023 的股利
    let (mut table, _) = open(&root)?;
    for (year, amount) in [(2018, 3.0), (2019, 3.5), (2020, 4.0), (2021, 5.0), (2022, 5.5), (2023, 6.0)] {
        let date = year * 10000 + 715;
        table.set_cell(&CellAddress::new(date, "ticker"), "2330", "2330")?;
        table.set_cell(&CellAddress::new(date, "dividend"), "2330", amount)?;
    }
    table.close()?;

    // 第二次開啟：只新增 2024 一筆
    let (mut table, moving) = open(&root)?;
    table.set_cell(&CellAddress::new(20240715, "ticker"), "2330", "2330")?;
    table.set_cell(&CellAddress::new(20240715, "dividend"), "2330", 7.0)?;
    let report = table.refresh()?;
    println!("第二次刷新：{:?}\n", report.columns());

    let frame = table.materialize(&["dividend", "dividend_3y"], None)?;
    for row in &frame.rows {
        println!("{}  股利 {:>5}  前三年合計 {:>6}", row.date, row.values[0], row.values[1]);
    }
    println!("\n檢查點數量: {}", moving.checkpoint_dates().len());

    table.close()?;
    std::fs::remove_dir_all(&root)?;
    Ok(())
}
