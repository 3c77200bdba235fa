//! 分頁儲存
//!
//! 將（位址, 鍵）映射到值。資料依分頁策略切成多個頁面，每頁是一個
//! 獨立載入、寫回的鍵值表；記憶體中只保留最近使用的若干頁。
//!
//! ```
//! use std::rc::Rc;
//! use celllink_cache::{CellPaging, MemoryStorage, PagedStore};
//! use celllink_core::{CellAddress, CellValue, StoreConfig};
//!
//! let storage = Rc::new(MemoryStorage::new());
//! let mut cells: PagedStore<CellPaging, CellValue> =
//!     PagedStore::new(CellPaging, "CELLS-demo", storage, StoreConfig::new(4)).unwrap();
//!
//! let addr = CellAddress::new(20110101, "account");
//! cells.set(&addr, "KEY1", CellValue::from("A")).unwrap();
//! cells.set(&addr, "KEY1", CellValue::from("D")).unwrap(); // 覆寫
//!
//! assert_eq!(cells.get(&addr, "KEY1"), Some(CellValue::from("D")));
//! assert_eq!(cells.get(&addr, "KEY2"), None);
//! ```

use std::collections::BTreeMap;
use std::io;
use std::rc::Rc;

use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::Serialize;

use celllink_core::{CellLinkError, CellValue, Date, Result, Snapshot, StoreConfig};

use crate::paging::{CellPaging, Paging, SnapshotPaging};
use crate::storage::PageStorage;

/// 檢查點頁內唯一的鍵
pub const SNAPSHOT_KEY: &str = "SNAPSHOT";

/// 頁面：複合鍵 → 值
pub type Page<V> = BTreeMap<String, V>;

/// 儲存格儲存
pub type CellStore = PagedStore<CellPaging, CellValue>;

/// 檢查點儲存
pub type SnapshotStore = PagedStore<SnapshotPaging, Snapshot>;

/// 快取統計
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub page_hits: u64,
    pub page_misses: u64,
    pub pages_loaded: u64,
    pub load_failures: u64,
    pub pages_evicted: u64,
    pub pages_flushed: u64,
}

/// 以 LRU 快取頁面的分頁儲存
pub struct PagedStore<P: Paging, V> {
    paging: P,
    namespace: String,
    storage: Rc<dyn PageStorage>,
    /// 最近使用的頁面在前
    cache: LruCache<String, Page<V>>,
    config: StoreConfig,
    stats: StoreStats,
}

impl<P, V> PagedStore<P, V>
where
    P: Paging,
    V: Clone + Serialize + DeserializeOwned,
{
    /// 創建新的分頁儲存
    ///
    /// `namespace` 會加在每個頁面的物件名稱前，以區分共用同一儲存的不同資料。
    /// 快取容量為 0 時回傳 `InvalidConfig`。
    pub fn new(
        paging: P,
        namespace: impl Into<String>,
        storage: Rc<dyn PageStorage>,
        config: StoreConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            paging,
            namespace: namespace.into(),
            storage,
            cache: LruCache::unbounded(),
            config,
            stats: StoreStats::default(),
        })
    }

    /// 讀取位址上某個鍵的值
    ///
    /// 任何載入失敗（I/O、頁面損毀）都視為沒有值：在這個領域裡，
    /// 「尚未計算」與「讀取失敗」的後續處理相同，都會觸發重新計算。
    pub fn get(&mut self, address: &P::Address, key: &str) -> Option<V> {
        let page_name = self.paging.page_name(address);
        let entry_key = self.paging.entry_key(address, key);

        match self.page_mut(&page_name) {
            Ok(page) => page.get(&entry_key).cloned(),
            Err(e) => {
                tracing::warn!(page = %page_name, error = %e, "頁面讀取失敗，視為無值");
                None
            }
        }
    }

    /// 寫入位址上某個鍵的值（覆寫）
    pub fn set(&mut self, address: &P::Address, key: &str, value: V) -> Result<()> {
        if self.config.read_only {
            return Err(CellLinkError::ReadOnly(format!("頁面儲存 {}", self.namespace)));
        }

        let page_name = self.paging.page_name(address);
        let entry_key = self.paging.entry_key(address, key);
        let page = self.page_mut(&page_name)?;
        page.insert(entry_key, value);
        Ok(())
    }

    /// 將所有常駐頁面寫回並清空快取
    pub fn flush_all(&mut self) -> Result<()> {
        if self.config.read_only {
            return Err(CellLinkError::ReadOnly(format!("頁面儲存 {}", self.namespace)));
        }

        for (name, page) in self.cache.iter() {
            let object = format!("{}_{}", self.namespace, name);
            write_page(self.storage.as_ref(), &object, page)?;
            self.stats.pages_flushed += 1;
        }
        tracing::debug!(namespace = %self.namespace, pages = self.cache.len(), "寫回所有頁面");
        self.cache.clear();
        Ok(())
    }

    /// 關閉：唯讀時直接丟棄快取，否則寫回所有頁面
    pub fn close(&mut self) -> Result<()> {
        if self.config.read_only {
            self.cache.clear();
            return Ok(());
        }
        self.flush_all()
    }

    /// 常駐頁面名稱（最近使用的在前）
    pub fn resident_pages(&self) -> Vec<String> {
        self.cache.iter().map(|(name, _)| name.clone()).collect()
    }

    /// 檢查頁面是否常駐（不影響 LRU 順序）
    pub fn is_resident(&self, page_name: &str) -> bool {
        self.cache.contains(page_name)
    }

    /// 頁面在底層儲存中的物件名稱
    pub fn object_name(&self, page_name: &str) -> String {
        format!("{}_{}", self.namespace, page_name)
    }

    /// 命名空間
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// 是否唯讀
    pub fn is_read_only(&self) -> bool {
        self.config.read_only
    }

    /// 快取統計
    pub fn stats(&self) -> StoreStats {
        self.stats
    }

    /// 取得頁面（必要時從底層儲存載入），並標記為最近使用
    fn page_mut(&mut self, page_name: &str) -> Result<&mut Page<V>> {
        if self.cache.contains(page_name) {
            self.stats.page_hits += 1;
        } else {
            self.stats.page_misses += 1;
            let page = self.load_page(page_name)?;
            self.cache.put(page_name.to_string(), page);
            // 只在載入新頁面後檢查容量
            self.evict_overflow()?;
        }

        self.cache
            .get_mut(page_name)
            .ok_or_else(|| CellLinkError::Io(io::Error::other(format!("頁面不在快取中: {page_name}"))))
    }

    /// 從底層儲存載入頁面，不存在時回傳空頁
    fn load_page(&mut self, page_name: &str) -> Result<Page<V>> {
        let object = self.object_name(page_name);
        let loaded = self
            .storage
            .load(&object)
            .map_err(CellLinkError::from)
            .and_then(|bytes| match bytes {
                Some(bytes) => serde_json::from_slice(&bytes).map_err(CellLinkError::from),
                None => Ok(Page::new()),
            });

        match loaded {
            Ok(page) => {
                self.stats.pages_loaded += 1;
                Ok(page)
            }
            Err(e) => {
                self.stats.load_failures += 1;
                Err(e)
            }
        }
    }

    /// 超過容量時，寫回並移除最久未使用的頁面
    fn evict_overflow(&mut self) -> Result<()> {
        if self.cache.len() <= self.config.cache_capacity {
            return Ok(());
        }

        // 先寫回再移除：寫入失敗時頁面仍留在快取中
        if !self.config.read_only {
            if let Some((name, page)) = self.cache.peek_lru() {
                let object = format!("{}_{}", self.namespace, name);
                write_page(self.storage.as_ref(), &object, page)?;
                self.stats.pages_flushed += 1;
            }
        }

        if let Some((name, _)) = self.cache.pop_lru() {
            self.stats.pages_evicted += 1;
            tracing::debug!(namespace = %self.namespace, page = %name, "頁面移出快取");
        }
        Ok(())
    }
}

impl PagedStore<SnapshotPaging, Snapshot> {
    /// 讀取檢查點
    pub fn get_snapshot(&mut self, date: Date) -> Option<Snapshot> {
        self.get(&date, SNAPSHOT_KEY)
    }

    /// 寫入檢查點
    pub fn set_snapshot(&mut self, date: Date, snapshot: Snapshot) -> Result<()> {
        self.set(&date, SNAPSHOT_KEY, snapshot)
    }
}

fn write_page<V: Serialize>(storage: &dyn PageStorage, object: &str, page: &Page<V>) -> Result<()> {
    let bytes = serde_json::to_vec(page)?;
    storage.store(object, &bytes)?;
    Ok(())
}
