//! 重试调度：延时执行一次性任务，可取消
//!
//! 每次 schedule 派生一个子 CancellationToken 并在 tokio 工作线程上 sleep；
//! 取消后任务保证不会再运行。根 token 取消（进程关闭）时所有未到期的任务一并作废。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// 任务 ID
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TaskId(u64);

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(0);

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskId {
    pub fn new() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// 已调度任务的取消句柄
#[derive(Debug)]
pub struct RetryToken {
    id: TaskId,
    token: CancellationToken,
}

impl RetryToken {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    fn cancel(&self) {
        self.token.cancel();
    }
}

/// 延时任务调度器
///
/// 同一时刻只允许一个未完成 token 是调用方（FocusController）的约定，这里不做限制。
#[derive(Debug, Clone)]
pub struct RetryScheduler {
    root: CancellationToken,
}

impl RetryScheduler {
    pub fn new(root: CancellationToken) -> Self {
        Self { root }
    }

    /// delay 之后在工作线程上运行 job 一次；必须在 tokio 运行时内调用
    pub fn schedule<F>(&self, delay: Duration, job: F) -> RetryToken
    where
        F: FnOnce() + Send + 'static,
    {
        let id = TaskId::new();
        let token = self.root.child_token();
        let guard = token.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = guard.cancelled() => {
                    tracing::trace!("Retry task {:?} cancelled before firing", id);
                }
                _ = tokio::time::sleep(delay) => {
                    if !guard.is_cancelled() {
                        job();
                    }
                }
            }
        });

        RetryToken { id, token }
    }

    /// 取消任务；已开始运行的 job 不会被打断
    pub fn cancel(&self, token: &RetryToken) {
        token.cancel();
    }
}

impl Default for RetryScheduler {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}
