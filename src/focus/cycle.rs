//! 对焦周期：ID、尝试次数、待执行的重试

use crate::core::task_scheduler::RetryToken;

/// 对焦周期标识；每个新周期递增，用于识别过期的重试与回调
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CycleId(u64);

impl CycleId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// 一次按键对焦：从 requestFocus 开始，到锁定、放弃或被取消结束
#[derive(Debug)]
pub struct FocusCycle {
    pub(crate) id: CycleId,
    pub(crate) attempt_count: u32,
    /// 仅在等待重试延时期间非空
    pub(crate) pending_retry: Option<RetryToken>,
}

impl FocusCycle {
    pub(crate) fn new(id: CycleId) -> Self {
        Self {
            id,
            attempt_count: 0,
            pending_retry: None,
        }
    }

    pub fn id(&self) -> CycleId {
        self.id
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn retry_pending(&self) -> bool {
        self.pending_retry.is_some()
    }
}
