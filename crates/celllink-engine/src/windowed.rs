//! 視窗彙總欄位
//!
//! 對每一列（日期, 鍵），計算在它之前、位於時間視窗內的所有列，依標籤分組的
//! 數值總和。例如帳戶餘額（視窗無限長），或近 N 年的移動加總。
//!
//! 累計狀態會在固定邊界日（預設為季初）存成檢查點。刷新時從最早髒日期之前
//! 的最後一個檢查點開始重算，不需要重播全部歷史。

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::rc::Rc;

use rust_decimal::Decimal;

use celllink_cache::{PageStorage, PagedStore, SnapshotPaging, SnapshotStore};
use celllink_core::date::quarter_start;
use celllink_core::{
    CellAddress, CellLinkError, ColumnName, Date, Result, Snapshot, MAX_DATE,
};

use crate::column::{Column, ColumnEnv};
use crate::date_index::DateIndex;
use crate::persist;
use crate::table::Table;

/// 彙總來源：標籤欄位與數值欄位
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationInput {
    pub label_column: ColumnName,
    pub value_column: ColumnName,
}

impl AggregationInput {
    pub fn new(label_column: impl Into<ColumnName>, value_column: impl Into<ColumnName>) -> Self {
        Self {
            label_column: label_column.into(),
            value_column: value_column.into(),
        }
    }
}

/// 檢查點間隔
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckpointCadence {
    /// 每季第一天
    #[default]
    Quarterly,
    /// 固定整數間隔（用於非日曆的整數日期）
    Every(Date),
}

impl CheckpointCadence {
    /// 日期所屬區間的起點（不晚於日期本身）
    pub fn boundary(&self, date: Date) -> Date {
        match self {
            CheckpointCadence::Quarterly => quarter_start(date),
            CheckpointCadence::Every(step) => date.div_euclid(*step) * step,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            CheckpointCadence::Every(step) if *step <= 0 => Err(CellLinkError::InvalidConfig(
                format!("檢查點間隔必須大於 0: {step}"),
            )),
            _ => Ok(()),
        }
    }
}

/// 開啟後的檢查點狀態
struct CheckpointState {
    storage: Rc<dyn PageStorage>,
    index_object: String,
    index: DateIndex,
    snapshots: SnapshotStore,
    read_only: bool,
}

/// 視窗彙總欄位
///
/// 每一列寫入的是「此日期之前」的累計值，不含該列本身的貢獻。
pub struct WindowedAggregation {
    name: ColumnName,
    output_label: ColumnName,
    inputs: Vec<AggregationInput>,
    window: Date,
    cadence: CheckpointCadence,
    required: Vec<ColumnName>,
    state: RefCell<Option<CheckpointState>>,
}

impl WindowedAggregation {
    /// 創建新的視窗彙總欄位
    ///
    /// `output_label` 是決定每一列讀取哪個標籤累計值的欄位。
    /// 預設視窗無限長、每季一個檢查點。
    pub fn new(name: impl Into<ColumnName>, output_label: impl Into<ColumnName>) -> Self {
        let mut column = Self {
            name: name.into(),
            output_label: output_label.into(),
            inputs: Vec::new(),
            window: MAX_DATE,
            cadence: CheckpointCadence::default(),
            required: Vec::new(),
            state: RefCell::new(None),
        };
        column.update_required();
        column
    }

    /// 建構器模式：加入彙總來源
    pub fn with_input(mut self, input: AggregationInput) -> Self {
        self.inputs.push(input);
        self.update_required();
        self
    }

    /// 建構器模式：設置視窗長度（年）
    pub fn with_window_years(mut self, years: i64) -> Self {
        self.window = celllink_core::date::years(years);
        self
    }

    /// 建構器模式：設置視窗長度（日期差）
    pub fn with_window(mut self, window: Date) -> Self {
        self.window = window;
        self
    }

    /// 建構器模式：設置檢查點間隔
    pub fn with_checkpoint_cadence(mut self, cadence: CheckpointCadence) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn window(&self) -> Date {
        self.window
    }

    pub fn cadence(&self) -> CheckpointCadence {
        self.cadence
    }

    pub fn inputs(&self) -> &[AggregationInput] {
        &self.inputs
    }

    /// 已記錄的檢查點日期（未開啟時為空）
    pub fn checkpoint_dates(&self) -> Vec<Date> {
        self.state
            .borrow()
            .as_ref()
            .map(|state| state.index.dates().to_vec())
            .unwrap_or_default()
    }

    /// 讀取檢查點
    pub fn checkpoint(&self, date: Date) -> Option<Snapshot> {
        let mut state = self.state.borrow_mut();
        let state = state.as_mut()?;
        if !state.index.contains_date(date) {
            return None;
        }
        state.snapshots.get_snapshot(date)
    }

    fn update_required(&mut self) {
        let mut required: Vec<ColumnName> = Vec::new();
        let candidates = self
            .inputs
            .iter()
            .flat_map(|input| [&input.label_column, &input.value_column])
            .chain(std::iter::once(&self.output_label));
        for column in candidates {
            if !required.contains(column) {
                required.push(column.clone());
            }
        }
        self.required = required;
    }

    /// 某日期所有列依標籤分組的數值總和（缺值以 0 計）
    fn increment(&self, table: &mut Table, date: Date) -> Result<Snapshot> {
        let mut delta = Snapshot::new();
        for key in table.keys_at(date) {
            for input in &self.inputs {
                let label = table.get_cell(&CellAddress::new(date, input.label_column.clone()), &key)?;
                let Some(label) = label.label() else {
                    continue;
                };
                let value = table.get_cell(&CellAddress::new(date, input.value_column.clone()), &key)?;
                *delta.entry(label).or_insert(Decimal::ZERO) += value.number_or(Decimal::ZERO);
            }
        }
        Ok(delta)
    }

    /// 從視窗移除早於 `cutoff` 的日期，並扣除其貢獻
    fn expire(
        &self,
        table: &mut Table,
        window: &mut VecDeque<Date>,
        running: &mut Snapshot,
        cutoff: Date,
    ) -> Result<()> {
        while let Some(&oldest) = window.front() {
            if oldest >= cutoff {
                break;
            }
            window.pop_front();
            for (label, amount) in self.increment(table, oldest)? {
                *running.entry(label).or_insert(Decimal::ZERO) -= amount;
            }
        }
        Ok(())
    }
}

impl Column for WindowedAggregation {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_columns(&self) -> &[ColumnName] {
        &self.required
    }

    fn open(&self, env: &ColumnEnv<'_>) -> Result<()> {
        if self.window <= 0 {
            return Err(CellLinkError::InvalidConfig(format!(
                "視窗長度必須大於 0: {}",
                self.window
            )));
        }
        self.cadence.validate()?;

        let index_object = persist::snapshot_index_object(env.table_name, &self.name);
        let index = DateIndex::load(env.storage.as_ref(), &index_object);
        let snapshots = PagedStore::new(
            SnapshotPaging,
            persist::snapshot_namespace(env.table_name, &self.name),
            env.storage.clone(),
            env.config.checkpoint_store_config(),
        )?;

        tracing::debug!("開啟視窗彙總欄位 {}：{} 個檢查點", self.name, index.len());
        self.state.replace(Some(CheckpointState {
            storage: env.storage.clone(),
            index_object,
            index,
            snapshots,
            read_only: env.config.read_only,
        }));
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let Some(mut state) = self.state.borrow_mut().take() else {
            return Ok(());
        };
        if state.read_only {
            return state.snapshots.close();
        }
        state.snapshots.flush_all()?;
        state.index.save(state.storage.as_ref(), &state.index_object)
    }

    fn refresh(&self, table: &mut Table, dirty: &BTreeSet<CellAddress>) -> Result<()> {
        let Some(min_date) = dirty.iter().map(|address| address.date).min() else {
            return Ok(());
        };

        let mut guard = self.state.borrow_mut();
        let state = guard
            .as_mut()
            .ok_or_else(|| CellLinkError::ColumnNotOpen(self.name.clone()))?;

        // 檢查點 b 的狀態只包含早於 b 的日期，因此 b 本身也可作為起點
        let (start, mut running) = match state.index.latest_at_or_before(min_date) {
            Some(checkpoint) => {
                let snapshot = state.snapshots.get_snapshot(checkpoint).ok_or_else(|| {
                    CellLinkError::MissingCheckpoint {
                        column: self.name.clone(),
                        date: checkpoint,
                    }
                })?;
                (checkpoint, snapshot)
            }
            None => {
                let earliest = table.date_index().first().map_or(min_date, |d| d.min(min_date));
                (self.cadence.boundary(earliest), Snapshot::new())
            }
        };

        let dates = table.date_index().slice(Some(start), None).to_vec();
        let mut window: VecDeque<Date> = table
            .date_index()
            .slice(Some(start - self.window), Some(start - 1))
            .iter()
            .copied()
            .collect();
        let mut boundaries: VecDeque<Date> = dates
            .iter()
            .map(|date| self.cadence.boundary(*date))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter(|boundary| *boundary >= start)
            .collect();

        tracing::debug!(
            "視窗彙總 {}：從 {} 開始重算 {} 個日期（最早髒日期 {}）",
            self.name,
            start,
            dates.len(),
            min_date
        );

        for date in dates {
            while let Some(&boundary) = boundaries.front() {
                if boundary > date {
                    break;
                }
                boundaries.pop_front();
                self.expire(table, &mut window, &mut running, boundary - self.window)?;
                state.index.insert_date(boundary);
                state.snapshots.set_snapshot(boundary, running.clone())?;
                tracing::debug!("寫入檢查點 {}@{}：{} 個標籤", self.name, boundary, running.len());
            }

            window.push_back(date);
            self.expire(table, &mut window, &mut running, date - self.window)?;

            for key in table.keys_at(date) {
                let label = table.get_cell(&CellAddress::new(date, self.output_label.clone()), &key)?;
                let total = label
                    .label()
                    .and_then(|label| running.get(&label).copied())
                    .unwrap_or(Decimal::ZERO);
                table.set_cell(&CellAddress::new(date, self.name.clone()), &key, total)?;
            }

            for (label, amount) in self.increment(table, date)? {
                *running.entry(label).or_insert(Decimal::ZERO) += amount;
            }
        }

        Ok(())
    }
}
