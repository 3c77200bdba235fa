//! 表格輸出
//!
//! 將指定欄位在日期索引中每個（日期, 鍵）的目前值展開成列。

use serde::{Deserialize, Serialize};

use celllink_core::{CellAddress, CellKey, CellValue, ColumnName, Date, Result};

use crate::table::Table;

/// 輸出的一列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub date: Date,
    pub key: CellKey,
    /// 與 [`Frame::columns`] 同順序的值
    pub values: Vec<CellValue>,
}

/// 表格
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub columns: Vec<ColumnName>,
    pub rows: Vec<Row>,
}

impl Frame {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 欄位在列值中的位置
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// 某欄位的所有值（依列順序）
    pub fn column_values(&self, column: &str) -> Option<Vec<&CellValue>> {
        let index = self.column_index(column)?;
        Some(self.rows.iter().map(|row| &row.values[index]).collect())
    }

    /// 指定（日期, 鍵）的值
    pub fn value(&self, date: Date, key: &str, column: &str) -> Option<&CellValue> {
        let index = self.column_index(column)?;
        self.rows
            .iter()
            .find(|row| row.date == date && row.key == key)
            .map(|row| &row.values[index])
    }
}

impl Table {
    /// 輸出表格
    ///
    /// `dates` 為 `None` 時輸出日期索引中的所有日期；列依日期、鍵排序。
    pub fn materialize(&mut self, columns: &[&str], dates: Option<&[Date]>) -> Result<Frame> {
        for column in columns {
            self.column(column)?;
        }

        let dates: Vec<Date> = match dates {
            Some(dates) => {
                let mut dates = dates.to_vec();
                dates.sort_unstable();
                dates.dedup();
                dates
            }
            None => self.dates().to_vec(),
        };

        let mut rows = Vec::new();
        for date in dates {
            for key in self.keys_at(date) {
                let values = columns
                    .iter()
                    .map(|column| self.get_cell(&CellAddress::new(date, *column), &key))
                    .collect::<Result<Vec<_>>>()?;
                rows.push(Row { date, key, values });
            }
        }

        tracing::debug!("輸出表格：{} 欄 × {} 列", columns.len(), rows.len());
        Ok(Frame {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        })
    }
}
