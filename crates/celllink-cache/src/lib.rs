//! # Cell-Link Cache
//!
//! 分頁儲存、頁面快取與髒標記追蹤模組

pub mod dirty_tracking;
pub mod paged_store;
pub mod paging;
pub mod storage;

// Re-export 主要類型
pub use dirty_tracking::DirtyTracker;
pub use paged_store::{CellStore, Page, PagedStore, SnapshotStore, StoreStats, SNAPSHOT_KEY};
pub use paging::{CellPaging, Paging, SnapshotPaging};
pub use storage::{FileStorage, MemoryStorage, PageStorage};
