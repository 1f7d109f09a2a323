//! StatusComputer - タスクフォレスト上の派生テストステータス
//!
//! Leaf は自身のテストケースから、Container は直下の子の派生ステータスから
//! （再帰的に）判定する。I/O も呼び出しをまたぐ状態も持たない純粋関数。

use std::collections::{HashMap, HashSet};

use super::index::{ChildIndex, ChildSource};
use super::status::{TestResult, TestStatus};
use super::task::{Task, TaskId, TaskKind};

/// `task` の派生ステータスを計算
///
/// `source` はタスク全体のスライス（`parent_id` を走査）か構築済みの
/// [`ChildIndex`]。どちらでも結果は同じ。
///
/// # 循環
/// フォレストは非巡回が前提。循環があっても、現在の経路上の祖先にあたる子は
/// 親のロールアップから外すので必ず停止する。事前に弾くなら
/// [`ChildIndex::find_cycle`] を使う。
pub fn compute<S>(task: &Task, source: &S) -> TestStatus
where
    S: ChildSource + ?Sized,
{
    let mut path = HashSet::new();
    let mut memo = NoMemo;
    rollup(task, source, &mut path, &mut memo).0
}

/// `tasks` 全体のステータスを `Task::key` ごとに計算
///
/// インデックスを 1 回だけ構築し、この呼び出しの中で部分木の結果を memo する。
/// 循環を含む入力でも各エントリは `compute(task, tasks)` と一致する。
pub fn compute_all(tasks: &[Task]) -> HashMap<String, TestStatus> {
    let index = ChildIndex::build(tasks);
    let mut memo: HashMap<TaskId, TestStatus> = HashMap::with_capacity(tasks.len());
    tasks
        .iter()
        .map(|task| {
            let mut path = HashSet::new();
            let (status, _) = rollup(task, &index, &mut path, &mut memo);
            (task.key.clone(), status)
        })
        .collect()
}

/// Leaf タスクのステータスを自身のテストケースから判定
///
/// - ケースなし → ToExecute
/// - 全件実行済み: Failed があれば Pending、なければ Completed
/// - 未実行あり: Failed → Pending、Passed → Executing、それ以外 → ToExecute
pub fn leaf_status(task: &Task) -> TestStatus {
    let cases = &task.test_cases;
    if cases.is_empty() {
        return TestStatus::ToExecute;
    }

    let any_failed = cases.iter().any(|c| c.result == TestResult::Failed);
    let all_executed = cases.iter().all(|c| c.result.is_executed());

    if all_executed {
        if any_failed {
            TestStatus::Pending
        } else {
            TestStatus::Completed
        }
    } else if any_failed {
        TestStatus::Pending
    } else if cases.iter().any(|c| c.result == TestResult::Passed) {
        TestStatus::Executing
    } else {
        TestStatus::ToExecute
    }
}

/// 直下の子の派生ステータスから Container のステータスを集約
///
/// 優先順位: 全件 Completed → Pending を含む → Executing を含む → ToExecute。
/// 子のいない Container は Pending（空の Leaf とは非対称）。
pub fn container_status<I>(children: I) -> TestStatus
where
    I: IntoIterator<Item = TestStatus>,
{
    let mut seen_any = false;
    let mut all_completed = true;
    let mut any_pending = false;
    let mut any_executing = false;

    for status in children {
        seen_any = true;
        match status {
            TestStatus::Completed => {}
            TestStatus::Pending => {
                all_completed = false;
                any_pending = true;
            }
            TestStatus::Executing => {
                all_completed = false;
                any_executing = true;
            }
            TestStatus::ToExecute => all_completed = false,
        }
    }

    if !seen_any {
        TestStatus::Pending
    } else if all_completed {
        TestStatus::Completed
    } else if any_pending {
        TestStatus::Pending
    } else if any_executing {
        TestStatus::Executing
    } else {
        TestStatus::ToExecute
    }
}

trait Memo {
    fn get(&self, id: &TaskId) -> Option<TestStatus>;
    fn put(&mut self, id: &TaskId, status: TestStatus);
}

struct NoMemo;

impl Memo for NoMemo {
    fn get(&self, _id: &TaskId) -> Option<TestStatus> {
        None
    }

    fn put(&mut self, _id: &TaskId, _status: TestStatus) {}
}

impl Memo for HashMap<TaskId, TestStatus> {
    fn get(&self, id: &TaskId) -> Option<TestStatus> {
        HashMap::get(self, id).copied()
    }

    fn put(&mut self, id: &TaskId, status: TestStatus) {
        self.insert(id.clone(), status);
    }
}

/// 1 タスク分のロールアップ
///
/// 戻り値の bool は「部分木のどこかで循環辺を切った」かどうか。切った結果は
/// 入口の位置に依存するので、その祖先も含めて memo には入れない。
fn rollup<S, M>(
    task: &Task,
    source: &S,
    path: &mut HashSet<TaskId>,
    memo: &mut M,
) -> (TestStatus, bool)
where
    S: ChildSource + ?Sized,
    M: Memo,
{
    if task.kind == TaskKind::Leaf {
        return (leaf_status(task), false);
    }
    if let Some(status) = memo.get(&task.id) {
        return (status, false);
    }

    path.insert(task.id.clone());
    let children = source.children_of(&task.id);
    let mut statuses = Vec::with_capacity(children.len());
    let mut cut = false;
    for child in children.iter() {
        if path.contains(&child.id) {
            // 循環辺: 子がすでに祖先にいる
            cut = true;
            continue;
        }
        let (status, child_cut) = rollup(child, source, path, memo);
        cut |= child_cut;
        statuses.push(status);
    }
    path.remove(&task.id);

    let status = container_status(statuses);
    if !cut {
        memo.put(&task.id, status);
    }
    (status, cut)
}
