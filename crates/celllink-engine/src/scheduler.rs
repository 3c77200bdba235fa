//! 欄位依賴排程
//!
//! 依賴圖以「欄位 → 依賴它的欄位」表示，刷新順序保證上游欄位排在下游之前。

use std::collections::{BTreeMap, BTreeSet};

use celllink_core::{CellLinkError, ColumnName, Result};

/// 依賴圖：欄位 → 依賴它的欄位集合
pub type DependencyMap = BTreeMap<ColumnName, BTreeSet<ColumnName>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// 計算拓撲順序
///
/// 深度優先走訪，依完成順序的倒序排列。遇到走訪中的節點即回報循環；
/// 指向圖中不存在之節點的邊會被忽略（欄位可能尚未全部註冊）。
///
/// 互不相關的欄位之間沒有固定順序，只保證上游在下游之前。
pub fn topological_order(graph: &DependencyMap) -> Result<Vec<ColumnName>> {
    let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
    let mut finished: Vec<&str> = Vec::with_capacity(graph.len());

    for node in graph.keys() {
        visit(node, graph, &mut marks, &mut finished)?;
    }

    Ok(finished.into_iter().rev().map(str::to_string).collect())
}

fn visit<'a>(
    node: &'a str,
    graph: &'a DependencyMap,
    marks: &mut BTreeMap<&'a str, Mark>,
    finished: &mut Vec<&'a str>,
) -> Result<()> {
    match marks.get(node) {
        Some(Mark::InProgress) => return Err(CellLinkError::CycleDetected),
        Some(Mark::Done) => return Ok(()),
        None => {}
    }

    marks.insert(node, Mark::InProgress);
    if let Some(dependents) = graph.get(node) {
        for dependent in dependents {
            if graph.contains_key(dependent) {
                visit(dependent, graph, marks, finished)?;
            }
        }
    }
    marks.insert(node, Mark::Done);
    finished.push(node);
    Ok(())
}

/// 欄位依賴圖與刷新順序
///
/// 宣告依賴與重建順序是兩個分開的步驟：`declare_dependency` 只修改圖，
/// 需要顯式呼叫 `rebuild_order` 才會重新計算順序。
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: DependencyMap,
    /// 上次成功重建順序時的依賴圖
    committed: DependencyMap,
    order: Vec<ColumnName>,
}

impl DependencyGraph {
    /// 創建空的依賴圖
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入節點
    pub fn add_node(&mut self, name: impl Into<ColumnName>) {
        self.edges.entry(name.into()).or_default();
    }

    /// 檢查節點是否存在
    pub fn contains(&self, name: &str) -> bool {
        self.edges.contains_key(name)
    }

    /// 宣告 `to` 依賴 `from`（`from` 變動時 `to` 需要重新計算）
    pub fn declare_dependency(&mut self, from: &str, to: &str) -> Result<()> {
        let dependents = self
            .edges
            .get_mut(from)
            .ok_or_else(|| CellLinkError::ColumnNotFound(from.to_string()))?;
        dependents.insert(to.to_string());
        Ok(())
    }

    /// 依賴某欄位的欄位
    pub fn dependents(&self, name: &str) -> impl Iterator<Item = &ColumnName> + '_ {
        self.edges.get(name).into_iter().flatten()
    }

    /// 重新計算刷新順序
    ///
    /// 有循環時回傳錯誤，依賴圖退回上次成功重建時的狀態，順序不變。
    pub fn rebuild_order(&mut self) -> Result<&[ColumnName]> {
        match topological_order(&self.edges) {
            Ok(order) => {
                self.order = order;
                self.committed = self.edges.clone();
                tracing::debug!("刷新順序: {:?}", self.order);
                Ok(&self.order)
            }
            Err(e) => {
                tracing::warn!("依賴圖存在循環，退回上次的依賴圖");
                self.edges = self.committed.clone();
                Err(e)
            }
        }
    }

    /// 目前的刷新順序
    pub fn refresh_order(&self) -> &[ColumnName] {
        &self.order
    }

    /// 依賴圖
    pub fn edges(&self) -> &DependencyMap {
        &self.edges
    }
}
