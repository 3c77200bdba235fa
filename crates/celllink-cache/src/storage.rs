//! 頁面底層儲存
//!
//! 只需要以名稱載入與寫入位元組；序列化格式與目錄配置由上層決定。

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use uuid::Uuid;

/// 以名稱定址的位元組儲存
pub trait PageStorage {
    /// 載入物件，不存在時回傳 `None`
    fn load(&self, name: &str) -> io::Result<Option<Vec<u8>>>;

    /// 寫入物件（覆寫）
    fn store(&self, name: &str, bytes: &[u8]) -> io::Result<()>;
}

/// 記憶體儲存
///
/// 複製出的實例共用同一份資料，可在關閉資料表後以同一份儲存重新開啟。
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    objects: Rc<RefCell<HashMap<String, Vec<u8>>>>,
    writes: Rc<RefCell<Vec<String>>>,
}

impl MemoryStorage {
    /// 創建空的記憶體儲存
    pub fn new() -> Self {
        Self::default()
    }

    /// 取得物件內容
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.objects.borrow().get(name).cloned()
    }

    /// 檢查物件是否存在
    pub fn contains(&self, name: &str) -> bool {
        self.objects.borrow().contains_key(name)
    }

    /// 直接寫入物件（測試時用來放入損毀資料）
    pub fn insert(&self, name: impl Into<String>, bytes: Vec<u8>) {
        self.objects.borrow_mut().insert(name.into(), bytes);
    }

    /// 依名稱排序的所有物件名稱
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.objects.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// 依寫入順序記錄的物件名稱
    pub fn write_log(&self) -> Vec<String> {
        self.writes.borrow().clone()
    }

    /// 清除寫入記錄
    pub fn clear_write_log(&self) {
        self.writes.borrow_mut().clear();
    }
}

impl PageStorage for MemoryStorage {
    fn load(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.get(name))
    }

    fn store(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        self.objects
            .borrow_mut()
            .insert(name.to_string(), bytes.to_vec());
        self.writes.borrow_mut().push(name.to_string());
        Ok(())
    }
}

/// 檔案儲存：每個物件一個檔案
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// 創建以指定目錄為根的檔案儲存（目錄於首次寫入時建立）
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 根目錄
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 物件對應的檔案路徑
    pub fn path_for(&self, name: &str) -> PathBuf {
        let file_name: String = name
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '_',
                other => other,
            })
            .collect();
        self.root.join(file_name)
    }
}

impl PageStorage for FileStorage {
    fn load(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn store(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        let target = self.path_for(name);

        // 先寫入暫存檔再改名，避免留下寫到一半的檔案
        let temp = self.root.join(format!(".{}.tmp", Uuid::new_v4()));
        fs::write(&temp, bytes)?;
        if let Err(e) = fs::rename(&temp, &target) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }
        Ok(())
    }
}
