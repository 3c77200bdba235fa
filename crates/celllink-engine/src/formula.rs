//! 公式欄位：同一列其他欄位的函數

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};

use celllink_core::{CellAddress, CellValue, ColumnName, Result};

use crate::column::{Column, ColumnEnv};
use crate::table::Table;

/// 列函數：輸入欄位名稱 → 同日同鍵的值
pub type RowFn = Box<dyn Fn(&BTreeMap<ColumnName, CellValue>) -> CellValue>;

/// 公式欄位
///
/// 對每個髒位址上的每個鍵，讀取輸入欄位在同一日期的值後套用函數。
/// 任一輸入缺值時結果為缺值，函數不會被呼叫。
pub struct FormulaColumn {
    name: ColumnName,
    inputs: Vec<ColumnName>,
    function: RowFn,
    enforce_availability: Cell<bool>,
}

impl FormulaColumn {
    /// 創建新的公式欄位
    pub fn new<F>(name: impl Into<ColumnName>, inputs: &[&str], function: F) -> Self
    where
        F: Fn(&BTreeMap<ColumnName, CellValue>) -> CellValue + 'static,
    {
        Self {
            name: name.into(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            function: Box::new(function),
            enforce_availability: Cell::new(false),
        }
    }

    /// 計算單一列
    fn evaluate(&self, table: &mut Table, address: &CellAddress, key: &str) -> Result<CellValue> {
        let enforce = self.enforce_availability.get();
        let mut row = BTreeMap::new();
        for input in &self.inputs {
            let value = table.get_cell_as_of(&address.with_column(input.clone()), key, address.date, enforce)?;
            if value.is_missing() {
                return Ok(CellValue::Missing);
            }
            row.insert(input.clone(), value);
        }
        Ok((self.function)(&row))
    }
}

impl Column for FormulaColumn {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_columns(&self) -> &[ColumnName] {
        &self.inputs
    }

    fn open(&self, env: &ColumnEnv<'_>) -> Result<()> {
        self.enforce_availability.set(env.config.enforce_availability);
        Ok(())
    }

    fn refresh(&self, table: &mut Table, dirty: &BTreeSet<CellAddress>) -> Result<()> {
        for address in dirty {
            for key in table.keys_at(address.date) {
                let value = self.evaluate(table, address, &key)?;
                table.set_cell(address, &key, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{FlatColumn, ProtectedColumn};
    use celllink_cache::MemoryStorage;
    use celllink_core::{CellLinkError, TableConfig};
    use rust_decimal::Decimal;
    use std::rc::Rc;

    fn product(row: &BTreeMap<ColumnName, CellValue>) -> CellValue {
        let price = row["price"].number_or(Decimal::ZERO);
        let quantity = row["quantity"].number_or(Decimal::ZERO);
        CellValue::from(price * quantity)
    }

    fn open_table(config: TableConfig) -> Table {
        Table::open_with_storage(config, Rc::new(MemoryStorage::new())).unwrap()
    }

    #[test]
    fn test_formula_recomputes_on_input_change() {
        let mut table = open_table(TableConfig::new("orders", "/unused"));
        table.add_column(FlatColumn::new("price")).unwrap();
        table.add_column(FlatColumn::new("quantity")).unwrap();
        table
            .add_column(FormulaColumn::new("total", &["price", "quantity"], product))
            .unwrap();

        let price = CellAddress::new(20110101, "price");
        let total = CellAddress::new(20110101, "total");
        table.set_cell(&price, "A", 10).unwrap();
        table.set_cell(&CellAddress::new(20110101, "quantity"), "A", 3).unwrap();
        table.refresh().unwrap();
        assert_eq!(table.get_cell(&total, "A").unwrap(), CellValue::from(30));

        table.set_cell(&price, "A", 12).unwrap();
        assert!(table.is_dirty(&total));
        table.refresh().unwrap();
        assert_eq!(table.get_cell(&total, "A").unwrap(), CellValue::from(36));
    }

    #[test]
    fn test_formula_missing_input_yields_missing() {
        let mut table = open_table(TableConfig::new("orders", "/unused"));
        table.add_column(FlatColumn::new("price")).unwrap();
        table.add_column(FlatColumn::new("quantity")).unwrap();
        table
            .add_column(FormulaColumn::new("total", &["price", "quantity"], product))
            .unwrap();

        table.set_cell(&CellAddress::new(20110101, "price"), "A", 10).unwrap();
        table.refresh().unwrap();

        assert!(table
            .get_cell(&CellAddress::new(20110101, "total"), "A")
            .unwrap()
            .is_missing());
    }

    #[test]
    fn test_formula_chain_cascades_within_one_refresh() {
        let mut table = open_table(TableConfig::new("orders", "/unused"));
        table.add_column(FlatColumn::new("price")).unwrap();
        table
            .add_column(FormulaColumn::new("double", &["price"], |row| {
                CellValue::from(row["price"].number_or(Decimal::ZERO) * Decimal::TWO)
            }))
            .unwrap();
        table
            .add_column(FormulaColumn::new("quad", &["double"], |row| {
                CellValue::from(row["double"].number_or(Decimal::ZERO) * Decimal::TWO)
            }))
            .unwrap();

        table.set_cell(&CellAddress::new(20110101, "price"), "A", 5).unwrap();
        table.refresh().unwrap();
        table.set_cell(&CellAddress::new(20110101, "price"), "A", 7).unwrap();
        table.refresh().unwrap();

        assert_eq!(
            table.get_cell(&CellAddress::new(20110101, "quad"), "A").unwrap(),
            CellValue::from(28)
        );
        assert!(!table.needs_refresh());
    }

    #[test]
    fn test_formula_respects_availability() {
        let mut table =
            open_table(TableConfig::new("signals", "/unused").with_enforce_availability(true));
        table.add_column(ProtectedColumn::new("target")).unwrap();
        table
            .add_column(FormulaColumn::new("leak", &["target"], |row| row["target"].clone()))
            .unwrap();

        table.set_cell(&CellAddress::new(20110101, "target"), "A", 1).unwrap();

        assert!(matches!(
            table.refresh(),
            Err(CellLinkError::NotAvailable { requested: 20110101, available: 20110102, .. })
        ));
    }
}
