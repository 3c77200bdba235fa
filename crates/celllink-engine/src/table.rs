//! 資料表
//!
//! 持有儲存格的分頁儲存、欄位依賴圖、髒標記與日期索引，
//! 並依依賴順序驅動欄位刷新。

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::time::Instant;

use celllink_cache::{
    CellPaging, CellStore, DirtyTracker, FileStorage, PageStorage, PagedStore, StoreStats,
};
use celllink_core::{
    validate_column_name, CellAddress, CellKey, CellLinkError, CellValue, ColumnName, Date,
    Result, TableConfig, MAX_DATE,
};

use crate::column::{Column, ColumnEnv};
use crate::date_index::DateIndex;
use crate::persist::{self, Manifest};
use crate::scheduler::DependencyGraph;
use crate::{ColumnRefresh, RefreshReport};

/// 資料表
pub struct Table {
    config: TableConfig,
    storage: Rc<dyn PageStorage>,
    cells: CellStore,
    columns: BTreeMap<ColumnName, Rc<dyn Column>>,
    graph: DependencyGraph,
    dirty: DirtyTracker,
    date_index: DateIndex,
    /// 上次關閉時的欄位清單
    manifest: Manifest,
}

impl Table {
    /// 以檔案儲存開啟資料表（根目錄取自配置）
    pub fn open(config: TableConfig) -> Result<Self> {
        let storage = Rc::new(FileStorage::new(config.root_dir.clone()));
        Self::open_with_storage(config, storage)
    }

    /// 以指定的底層儲存開啟資料表
    pub fn open_with_storage(config: TableConfig, storage: Rc<dyn PageStorage>) -> Result<Self> {
        config.validate()?;

        let cells = PagedStore::new(
            CellPaging,
            persist::cells_namespace(&config.name),
            storage.clone(),
            config.cell_store_config(),
        )?;
        let date_index = DateIndex::load(storage.as_ref(), &persist::dates_object(&config.name));
        let manifest: Manifest =
            persist::load_with_backup(storage.as_ref(), &persist::manifest_object(&config.name))
                .unwrap_or_default();

        tracing::info!(
            "開啟資料表 {}：{} 個日期，{} 個既有欄位{}",
            config.name,
            date_index.len(),
            manifest.columns.len(),
            if config.read_only { "（唯讀）" } else { "" }
        );

        Ok(Self {
            config,
            storage,
            cells,
            columns: BTreeMap::new(),
            graph: DependencyGraph::new(),
            dirty: DirtyTracker::new(),
            date_index,
            manifest,
        })
    }

    /// 加入欄位
    ///
    /// 欄位需要的上游欄位必須已註冊。新欄位沒有任何歷史值，所以資料表中
    /// 每個既有日期都會被標記為髒；上次關閉時已存在的欄位則直接沿用已存的值，
    /// 只有關閉時尚未刷新的日期會再標記為髒。
    ///
    /// 失敗時資料表維持原狀。
    pub fn add_column<C: Column + 'static>(&mut self, column: C) -> Result<Rc<C>> {
        let name = column.name().to_string();
        validate_column_name(&name)?;
        if self.columns.contains_key(&name) {
            return Err(CellLinkError::DuplicateColumn(name));
        }
        if let Some(missing) = column
            .required_columns()
            .iter()
            .find(|required| !self.columns.contains_key(*required))
        {
            return Err(CellLinkError::ColumnNotFound(missing.clone()));
        }

        // 先在副本上驗證依賴圖，欄位開啟成功後才替換
        let mut graph = self.graph.clone();
        graph.add_node(name.clone());
        for required in column.required_columns() {
            graph.declare_dependency(required, &name)?;
        }
        graph.rebuild_order()?;

        let column = Rc::new(column);
        column.open(&ColumnEnv {
            table_name: &self.config.name,
            storage: self.storage.clone(),
            config: &self.config,
        })?;
        self.graph = graph;

        self.dirty.register(name.clone());
        let reattached = self.manifest.contains(&name);
        if !self.config.read_only {
            if reattached {
                for date in self.manifest.pending_dates(&name) {
                    self.dirty.mark_dirty(CellAddress::new(date, name.clone()));
                }
            } else {
                for &date in self.date_index.dates() {
                    self.dirty.mark_dirty(CellAddress::new(date, name.clone()));
                }
            }
        }

        let handle: Rc<dyn Column> = column.clone();
        self.columns.insert(name.clone(), handle);

        tracing::info!(
            "加入欄位 {}{}，需要欄位: {:?}",
            name,
            if reattached { "（沿用既有資料）" } else { "" },
            column.required_columns()
        );
        Ok(column)
    }

    /// 宣告 `to` 依賴 `from`
    ///
    /// 只修改依賴圖；需要呼叫 [`Table::rebuild_order`] 才會更新刷新順序。
    pub fn declare_dependency(&mut self, from: &str, to: &str) -> Result<()> {
        if !self.columns.contains_key(to) {
            return Err(CellLinkError::ColumnNotFound(to.to_string()));
        }
        self.graph.declare_dependency(from, to)
    }

    /// 重新計算刷新順序
    ///
    /// 有循環時回傳 `CycleDetected`，並撤回上次重建後宣告的所有依賴。
    pub fn rebuild_order(&mut self) -> Result<()> {
        self.graph.rebuild_order()?;
        Ok(())
    }

    /// 目前的刷新順序
    pub fn refresh_order(&self) -> &[ColumnName] {
        self.graph.refresh_order()
    }

    /// 依賴某欄位的欄位
    pub fn dependencies(&self, column: &str) -> Vec<ColumnName> {
        self.graph.dependents(column).cloned().collect()
    }

    /// 計算某位址時讀取的其他位址
    pub fn cell_dependencies(&self, address: &CellAddress) -> Result<Vec<CellAddress>> {
        Ok(self.column(&address.column)?.cell_dependencies(address))
    }

    /// 取得欄位
    pub fn column(&self, name: &str) -> Result<Rc<dyn Column>> {
        self.columns
            .get(name)
            .cloned()
            .ok_or_else(|| CellLinkError::ColumnNotFound(name.to_string()))
    }

    /// 所有欄位名稱（排序）
    pub fn column_names(&self) -> Vec<ColumnName> {
        self.columns.keys().cloned().collect()
    }

    /// 讀取儲存格（不檢查可用日）
    pub fn get_cell(&mut self, address: &CellAddress, key: &str) -> Result<CellValue> {
        self.get_cell_as_of(address, key, MAX_DATE, false)
    }

    /// 以 `as_of` 日期讀取儲存格
    ///
    /// `enforce` 為 true 且 `as_of` 早於欄位的可用日時回傳 `NotAvailable`。
    /// 儲存中沒有值時呼叫欄位的 `key_init`，並將結果（包括缺值）存回，
    /// 之後的讀取不會再觸發初始化。
    pub fn get_cell_as_of(
        &mut self,
        address: &CellAddress,
        key: &str,
        as_of: Date,
        enforce: bool,
    ) -> Result<CellValue> {
        let column = self.column(&address.column)?;

        if enforce {
            let available = column.available_on_date(address);
            if as_of < available {
                return Err(CellLinkError::NotAvailable {
                    address: address.clone(),
                    requested: as_of,
                    available,
                });
            }
        }

        if let Some(value) = self.cells.get(address, key) {
            return Ok(value);
        }

        let value = column.key_init(address, key);
        if !self.config.read_only {
            if let Err(e) = self.cells.set(address, key, value.clone()) {
                tracing::warn!(address = %address, key, error = %e, "無法儲存初始值");
            }
        }
        Ok(value)
    }

    /// 寫入儲存格
    ///
    /// 鍵首次出現在該日期時，整列所有欄位都會初始化並標記為髒。
    /// 寫入後，所有依賴此欄位的欄位在該日期被標記為髒。
    pub fn set_cell(
        &mut self,
        address: &CellAddress,
        key: &str,
        value: impl Into<CellValue>,
    ) -> Result<()> {
        if self.config.read_only {
            return Err(CellLinkError::ReadOnly(format!("資料表 {}", self.config.name)));
        }
        if !self.columns.contains_key(&address.column) {
            return Err(CellLinkError::ColumnNotFound(address.column.clone()));
        }

        if self.date_index.push(address.date, key) {
            let columns: Vec<Rc<dyn Column>> = self.columns.values().cloned().collect();
            for column in columns {
                let row_address = address.with_column(column.name());
                let initial = column.key_init(&row_address, key);
                if !initial.is_missing() {
                    self.cells.set(&row_address, key, initial)?;
                }
                self.dirty.mark_dirty(row_address);
            }
        }

        self.cells.set(address, key, value.into())?;

        for dependent in self.graph.dependents(&address.column) {
            self.dirty.mark_dirty(address.with_column(dependent.clone()));
        }
        Ok(())
    }

    /// 手動標記位址為髒
    pub fn mark_dirty(&mut self, address: CellAddress) -> Result<()> {
        if !self.columns.contains_key(&address.column) {
            return Err(CellLinkError::ColumnNotFound(address.column));
        }
        self.dirty.mark_dirty(address);
        Ok(())
    }

    /// 欄位的髒位址
    pub fn dirty_addresses(&self, column: &str) -> BTreeSet<CellAddress> {
        self.dirty.dirty_addresses(column)
    }

    /// 檢查位址是否為髒
    pub fn is_dirty(&self, address: &CellAddress) -> bool {
        self.dirty.is_dirty(address)
    }

    /// 是否有任何欄位需要刷新
    pub fn needs_refresh(&self) -> bool {
        self.dirty.any_dirty()
    }

    /// 依刷新順序重新計算所有髒欄位
    ///
    /// 唯讀資料表不做任何事。
    pub fn refresh(&mut self) -> Result<RefreshReport> {
        if self.config.read_only {
            tracing::debug!("唯讀資料表 {} 略過刷新", self.config.name);
            return Ok(RefreshReport::empty());
        }

        let start_time = Instant::now();
        let order = self.graph.refresh_order().to_vec();
        tracing::info!("開始刷新資料表 {}：{} 個欄位", self.config.name, order.len());

        let mut report = RefreshReport::empty();
        for name in order {
            let dirty = self.dirty.dirty_addresses(&name);
            if dirty.is_empty() {
                continue;
            }
            let Some(column) = self.columns.get(&name).cloned() else {
                continue;
            };

            tracing::debug!("刷新欄位 {}：{} 個髒位址", name, dirty.len());
            column.refresh(self, &dirty)?;
            self.dirty.clear(&name);

            report.add(ColumnRefresh {
                column: name,
                dirty_count: dirty.len(),
            });
        }

        let elapsed = start_time.elapsed().as_millis();
        report.elapsed_ms = Some(elapsed);
        tracing::info!(
            "刷新完成：{} 個欄位，耗時 {} ms",
            report.refreshed.len(),
            elapsed
        );
        Ok(report)
    }

    /// 日期下的所有鍵
    pub fn keys_at(&self, date: Date) -> Vec<CellKey> {
        self.date_index.keys_at(date)
    }

    /// 所有日期（遞增）
    pub fn dates(&self) -> &[Date] {
        self.date_index.dates()
    }

    /// 日期索引
    pub fn date_index(&self) -> &DateIndex {
        &self.date_index
    }

    /// 資料表名稱
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// 資料表配置
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn is_read_only(&self) -> bool {
        self.config.read_only
    }

    /// 儲存格快取統計
    pub fn cell_stats(&self) -> StoreStats {
        self.cells.stats()
    }

    /// 關閉資料表
    ///
    /// 仍有髒位址時先刷新一次，再關閉所有欄位並寫回儲存格、日期索引與欄位清單。
    ///
    /// 刷新或關閉欄位失敗時，已寫入的資料仍會寫回，未刷新的日期記錄在欄位清單中，
    /// 下次開啟時重新標記為髒；之後才回傳第一個錯誤。
    pub fn close(mut self) -> Result<()> {
        let mut result = if !self.config.read_only && self.dirty.any_dirty() {
            self.refresh().map(|_| ())
        } else {
            Ok(())
        };
        if let Err(e) = &result {
            tracing::warn!(error = %e, "資料表 {} 關閉前刷新失敗，保留未刷新的日期", self.config.name);
        }

        for column in self.columns.values() {
            if let Err(e) = column.close() {
                tracing::warn!(column = column.name(), error = %e, "欄位關閉失敗");
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }

        if self.config.read_only {
            self.cells.close()?;
            tracing::info!("關閉唯讀資料表 {}", self.config.name);
            return result;
        }

        self.cells.flush_all()?;
        self.date_index
            .save(self.storage.as_ref(), &persist::dates_object(&self.config.name))?;

        let manifest = Manifest {
            columns: self.columns.keys().cloned().collect(),
            pending: self
                .dirty
                .get_dirty_columns()
                .into_iter()
                .map(|column| {
                    let dates: BTreeSet<Date> =
                        self.dirty.dirty_addresses(&column).into_iter().map(|a| a.date).collect();
                    (column, dates)
                })
                .collect(),
        };
        persist::save_with_backup(
            self.storage.as_ref(),
            &persist::manifest_object(&self.config.name),
            &manifest,
        )?;

        tracing::info!(
            "關閉資料表 {}：{} 個欄位，{} 個日期，{} 個欄位待刷新",
            self.config.name,
            self.columns.len(),
            self.date_index.len(),
            manifest.pending.len()
        );
        result
    }
}
