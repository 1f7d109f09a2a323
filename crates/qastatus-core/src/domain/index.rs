//! ChildIndex - タスクフォレストの 親 → 子 インデックス
//!
//! # 設計
//! - フォレストのスナップショットごとに 1 回、O(n) で構築
//! - `children_of` は O(1)、走査形式は呼び出しごとに O(n)
//! - どちらも `ChildSource` を実装し、同じ子を同じ順序で返す

use std::borrow::Cow;
use std::collections::HashMap;

use super::task::{Task, TaskId};

/// タスクの直下の子を解決できるもの
pub trait ChildSource {
    fn children_of<'s>(&'s self, parent: &TaskId) -> Cow<'s, [&'s Task]>;
}

/// 走査形式: タスク一覧全体を `parent_id` で絞り込む
impl ChildSource for [Task] {
    fn children_of<'s>(&'s self, parent: &TaskId) -> Cow<'s, [&'s Task]> {
        Cow::Owned(
            self.iter()
                .filter(|task| task.parent_id.as_ref() == Some(parent))
                .collect(),
        )
    }
}

impl ChildSource for Vec<Task> {
    fn children_of<'s>(&'s self, parent: &TaskId) -> Cow<'s, [&'s Task]> {
        self.as_slice().children_of(parent)
    }
}

/// 事前計算した `parent_id → 子` インデックス
///
/// 子は元のスライスでの順序を保つので、走査形式と反復順序が一致する。
pub struct ChildIndex<'a> {
    children: HashMap<&'a TaskId, Vec<&'a Task>>,
    by_id: HashMap<&'a TaskId, &'a Task>,
}

impl<'a> ChildIndex<'a> {
    /// `tasks` からインデックスを構築
    pub fn build(tasks: &'a [Task]) -> Self {
        let mut children: HashMap<&'a TaskId, Vec<&'a Task>> = HashMap::new();
        let mut by_id = HashMap::with_capacity(tasks.len());
        for task in tasks {
            by_id.insert(&task.id, task);
            if let Some(parent) = &task.parent_id {
                children.entry(parent).or_default().push(task);
            }
        }
        Self { children, by_id }
    }

    /// id でタスクを引く
    pub fn get(&self, id: &TaskId) -> Option<&'a Task> {
        self.by_id.get(id).copied()
    }

    /// 親を持たない、または親がフォレストにいないタスク
    pub fn roots(&self) -> impl Iterator<Item = &'a Task> + '_ {
        self.by_id.values().copied().filter(|task| match &task.parent_id {
            None => true,
            Some(parent) => !self.by_id.contains_key(parent),
        })
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl ChildSource for ChildIndex<'_> {
    fn children_of<'s>(&'s self, parent: &TaskId) -> Cow<'s, [&'s Task]> {
        match self.children.get(parent) {
            Some(children) => Cow::Borrowed(children.as_slice()),
            None => Cow::Borrowed(&[]),
        }
    }
}

impl ChildIndex<'_> {
    /// 親リンクの循環を検出
    ///
    /// 各タスクの親は高々 1 つなので、どのタスクから `parent_id` をたどっても
    /// ルートに着くかループする。たどる間ノードに色を付け、現在の経路上の
    /// ノードに戻れば循環、以前の探索で完了済みのノードに着けば循環ではない。
    ///
    /// 循環を構成する id（子が先）を返す。フォレストなら None。
    pub fn find_cycle(&self) -> Option<Vec<TaskId>> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Color {
            OnPath,
            Done,
        }

        let mut colors: HashMap<&TaskId, Color> = HashMap::with_capacity(self.by_id.len());
        let mut ids: Vec<&TaskId> = self.by_id.keys().copied().collect();
        ids.sort();

        for start in ids {
            if colors.contains_key(start) {
                continue;
            }
            let mut path: Vec<&TaskId> = Vec::new();
            let mut current = Some(start);
            while let Some(id) = current {
                match colors.get(id) {
                    Some(Color::Done) => break,
                    Some(Color::OnPath) => {
                        let at = path.iter().position(|p| *p == id).unwrap_or(0);
                        return Some(path[at..].iter().map(|p| (*p).clone()).collect());
                    }
                    None => {}
                }
                colors.insert(id, Color::OnPath);
                path.push(id);
                current = self
                    .by_id
                    .get(id)
                    .and_then(|task| task.parent_id.as_ref())
                    .filter(|parent| self.by_id.contains_key(parent));
            }
            for id in path {
                colors.insert(id, Color::Done);
            }
        }
        None
    }
}
