//! 对焦控制器：按键对焦的重试状态机
//!
//! Idle --requestFocus--> Focusing --成功回调--> Idle（标题 "locked"）
//! Focusing --失败回调--> 记一次尝试，延时后重新触发（先 cancelAutoFocus 再 autoFocus）
//! 任意状态 --cancel--> Idle（取消待执行的重试）
//!
//! 控制器从不持有设备句柄，每次调用由 SessionController 借出会话；
//! 重试与设备回调都带着 CycleId 回到控制器任务，周期失效后到达的一律丢弃。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::camera::FocusCallback;
use crate::config::AppConfig;
use crate::core::orchestrator::CameraEvent;
use crate::core::task_scheduler::RetryScheduler;
use crate::core::{
    CameraError, FocusState, FocusStatus, RecoveryAction, RecoveryEngine, StatusLine,
};
use crate::focus::{CycleId, FocusCycle};
use crate::session::{CameraHost, CameraSession};

pub struct FocusController {
    scheduler: RetryScheduler,
    recovery: RecoveryEngine,
    /// 弱引用：控制器任务自身不应让事件通道保持打开
    events: mpsc::WeakUnboundedSender<CameraEvent>,
    host: Arc<dyn CameraHost>,
    status_line: StatusLine,
    retry_interval: Duration,
    /// None 表示不设上限，一直重试到锁定或会话结束
    max_attempts: Option<u32>,
    cycle: Option<FocusCycle>,
    next_cycle: u64,
}

impl FocusController {
    pub fn new(
        cfg: &AppConfig,
        scheduler: RetryScheduler,
        events: &mpsc::UnboundedSender<CameraEvent>,
        host: Arc<dyn CameraHost>,
    ) -> Self {
        Self {
            scheduler,
            recovery: RecoveryEngine::new(),
            events: events.downgrade(),
            host,
            status_line: StatusLine::from_config(cfg),
            retry_interval: cfg.focus.retry_interval(),
            max_attempts: cfg.focus.max_attempts,
            cycle: None,
            next_cycle: 1,
        }
    }

    pub fn state(&self) -> FocusState {
        if self.cycle.is_some() {
            FocusState::Focusing
        } else {
            FocusState::Idle
        }
    }

    pub fn cycle(&self) -> Option<&FocusCycle> {
        self.cycle.as_ref()
    }

    pub fn attempt_count(&self) -> u32 {
        self.cycle.as_ref().map_or(0, |c| c.attempt_count)
    }

    pub fn retry_pending(&self) -> bool {
        self.cycle.as_ref().is_some_and(|c| c.retry_pending())
    }

    /// 用户或会话请求对焦；已有周期在跑时忽略，保证同一时刻只有一个对焦周期
    pub fn request_focus(&mut self, session: Option<&mut CameraSession>) {
        tracing::debug!("Focus requested");
        if let Some(cycle) = &self.cycle {
            tracing::debug!(cycle = ?cycle.id, "Focus cycle already running, request ignored");
            return;
        }
        let Some(session) = session else {
            tracing::debug!("No open camera session, focus request ignored");
            return;
        };

        let id = CycleId::from_raw(self.next_cycle);
        self.next_cycle += 1;
        self.cycle = Some(FocusCycle::new(id));
        tracing::info!(cycle = ?id, "focusing");
        self.notify(FocusStatus::Focusing);
        self.trigger_focus(session);
    }

    /// 设备回调：对焦扫描结束
    pub fn on_focus_result(&mut self, id: CycleId, success: bool) -> Result<(), CameraError> {
        let cycle = self.current(id)?;
        if cycle.pending_retry.is_some() {
            return Err(CameraError::StaleOperation(format!(
                "focus result for {:?} while a retry is pending",
                id
            )));
        }
        tracing::debug!(cycle = ?id, "Focus Callback: {}", success);
        if success {
            self.resolve(true);
        } else {
            self.record_failed_attempt();
        }
        Ok(())
    }

    /// 重试延时到期：再次校验周期后重新触发；会话已不存在则结束周期
    pub fn on_retry_due(
        &mut self,
        id: CycleId,
        session: Option<&mut CameraSession>,
    ) -> Result<(), CameraError> {
        let cycle = self.current(id)?;
        let token = cycle.pending_retry.take().ok_or_else(|| {
            CameraError::StaleOperation(format!("no retry pending for {:?}", id))
        })?;
        if token.is_cancelled() {
            return Err(CameraError::StaleOperation(format!(
                "retry {:?} was cancelled",
                token.id()
            )));
        }
        tracing::debug!(cycle = ?id, "after auto focus sleep {}", cycle.attempt_count);

        match session {
            Some(session) => self.trigger_focus(session),
            None => {
                tracing::warn!(cycle = ?id, "Camera handle invalidated, cancelling focus cycle");
                self.cancel();
            }
        }
        Ok(())
    }

    /// 结束当前周期并取消待执行的重试；任何状态下都可调用
    pub fn cancel(&mut self) {
        if let Some(mut cycle) = self.cycle.take() {
            if let Some(token) = cycle.pending_retry.take() {
                self.scheduler.cancel(&token);
            }
            tracing::debug!(
                cycle = ?cycle.id,
                "Focus cycle cancelled after {} attempts",
                cycle.attempt_count
            );
        }
    }

    fn current(&mut self, id: CycleId) -> Result<&mut FocusCycle, CameraError> {
        match self.cycle.as_mut() {
            Some(cycle) if cycle.id == id => Ok(cycle),
            Some(cycle) => Err(CameraError::StaleOperation(format!(
                "{:?} superseded by {:?}",
                id, cycle.id
            ))),
            None => Err(CameraError::StaleOperation(format!(
                "{:?} arrived while idle",
                id
            ))),
        }
    }

    /// 先取消设备上未完成的扫描，再发起新扫描
    fn trigger_focus(&mut self, session: &mut CameraSession) {
        let Some(cycle) = self.cycle.as_ref() else {
            return;
        };
        let id = cycle.id;
        tracing::debug!(cycle = ?id, attempt = cycle.attempt_count, "Focus triggered");

        let device = session.device_mut();
        if let Err(e) = device.cancel_auto_focus() {
            if self.recovery.handle_focus(&e) == RecoveryAction::CancelFocus {
                tracing::warn!(
                    cycle = ?id,
                    "cancelAutoFocus failed ({}), focus cycle cancelled",
                    e
                );
                self.cancel();
                return;
            }
            tracing::warn!(cycle = ?id, "cancelAutoFocus failed: {}", e);
        }

        let Some(events) = self.events.upgrade() else {
            tracing::debug!(cycle = ?id, "Controller channel closed, focus cycle cancelled");
            self.cancel();
            return;
        };
        if let Err(e) = device.auto_focus(FocusCallback::new(id, events)) {
            match self.recovery.handle_focus(&e) {
                RecoveryAction::RetryFocus => {
                    tracing::warn!(cycle = ?id, "autoFocus failed ({}), will retry", e);
                    self.record_failed_attempt();
                }
                RecoveryAction::Discard => {
                    tracing::debug!(cycle = ?id, "autoFocus discarded: {}", e);
                }
                _ => {
                    tracing::warn!(cycle = ?id, "autoFocus failed ({}), focus cycle cancelled", e);
                    self.cancel();
                }
            }
        }
    }

    fn record_failed_attempt(&mut self) {
        let Some(cycle) = self.cycle.as_mut() else {
            return;
        };
        cycle.attempt_count = cycle.attempt_count.saturating_add(1);

        if let Some(max) = self.max_attempts {
            if cycle.attempt_count >= max {
                tracing::warn!(cycle = ?cycle.id, "Focus gave up after {} attempts", max);
                self.resolve(false);
                return;
            }
        }

        let id = cycle.id;
        let events = self.events.clone();
        let token = self.scheduler.schedule(self.retry_interval, move || {
            if let Some(events) = events.upgrade() {
                let _ = events.send(CameraEvent::RetryDue { cycle: id });
            }
        });
        if let Some(previous) = cycle.pending_retry.replace(token) {
            self.scheduler.cancel(&previous);
        }
    }

    fn resolve(&mut self, locked: bool) {
        let Some(mut cycle) = self.cycle.take() else {
            return;
        };
        if let Some(token) = cycle.pending_retry.take() {
            self.scheduler.cancel(&token);
        }
        if locked {
            tracing::info!(cycle = ?cycle.id, attempts = cycle.attempt_count, "focus locked");
            self.notify(FocusStatus::Locked);
        }
    }

    fn notify(&self, status: FocusStatus) {
        self.host.status_changed(status, &self.status_line.title(status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraProvider, DeviceCall, SimulatedCameraProvider, SimulatorProbe};
    use crate::session::{HostEvent, RecordingHost};

    fn setup(
        provider: SimulatedCameraProvider,
        cfg: &AppConfig,
    ) -> (
        FocusController,
        CameraSession,
        SimulatorProbe,
        Arc<RecordingHost>,
        Channel,
    ) {
        let probe = provider.probe();
        let mut provider = provider;
        let session = CameraSession::new(provider.open().unwrap());
        let host = Arc::new(RecordingHost::new(true));
        let (tx, rx) = mpsc::unbounded_channel();
        let focus = FocusController::new(cfg, RetryScheduler::default(), &tx, host.clone());
        (focus, session, probe, host, Channel { _tx: tx, rx })
    }

    /// 测试持有强引用发送端，否则控制器的弱引用无法升级
    struct Channel {
        _tx: mpsc::UnboundedSender<CameraEvent>,
        rx: mpsc::UnboundedReceiver<CameraEvent>,
    }

    impl Channel {
        async fn recv(&mut self) -> Option<CameraEvent> {
            self.rx.recv().await
        }

        fn try_recv(&mut self) -> Result<CameraEvent, mpsc::error::TryRecvError> {
            self.rx.try_recv()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_while_focusing_is_ignored() {
        let cfg = AppConfig::default();
        let (mut focus, mut session, probe, host, _rx) =
            setup(SimulatedCameraProvider::new(), &cfg);

        focus.request_focus(Some(&mut session));
        focus.request_focus(Some(&mut session));
        focus.request_focus(Some(&mut session));

        assert_eq!(focus.state(), FocusState::Focusing);
        assert_eq!(probe.count(DeviceCall::AutoFocus), 1);
        assert_eq!(host.statuses(), vec![FocusStatus::Focusing]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_schedules_retry_then_locks() {
        let cfg = AppConfig::default();
        let provider = SimulatedCameraProvider::new().with_focus_outcomes([false, true]);
        let (mut focus, mut session, probe, host, mut rx) = setup(provider, &cfg);

        focus.request_focus(Some(&mut session));
        let Some(CameraEvent::FocusResult { cycle, success }) = rx.recv().await else {
            panic!("expected focus result");
        };
        assert!(!success);
        focus.on_focus_result(cycle, success).unwrap();
        assert_eq!(focus.attempt_count(), 1);
        assert!(focus.retry_pending());

        let Some(CameraEvent::RetryDue { cycle }) = rx.recv().await else {
            panic!("expected retry");
        };
        focus.on_retry_due(cycle, Some(&mut session)).unwrap();
        let Some(CameraEvent::FocusResult { cycle, success }) = rx.recv().await else {
            panic!("expected focus result");
        };
        focus.on_focus_result(cycle, success).unwrap();

        assert_eq!(focus.state(), FocusState::Idle);
        assert_eq!(probe.count(DeviceCall::AutoFocus), 2);
        assert_eq!(probe.count(DeviceCall::CancelAutoFocus), 2);
        assert_eq!(
            host.statuses(),
            vec![FocusStatus::Focusing, FocusStatus::Locked]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_count_saturates_when_unbounded() {
        let cfg = AppConfig::default();
        let provider = SimulatedCameraProvider::new().with_focus_outcomes([false]);
        let (mut focus, mut session, _probe, _host, mut rx) = setup(provider, &cfg);

        focus.request_focus(Some(&mut session));
        if let Some(cycle) = focus.cycle.as_mut() {
            cycle.attempt_count = u32::MAX;
        }
        let Some(CameraEvent::FocusResult { cycle, success }) = rx.recv().await else {
            panic!("expected focus result");
        };
        focus.on_focus_result(cycle, success).unwrap();

        assert_eq!(focus.attempt_count(), u32::MAX);
        assert_eq!(focus.state(), FocusState::Focusing);
        assert!(focus.retry_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_result_after_cancel_is_discarded() {
        let cfg = AppConfig::default();
        let provider = SimulatedCameraProvider::new().with_focus_outcomes([true]);
        let (mut focus, mut session, _probe, host, mut rx) = setup(provider, &cfg);

        focus.request_focus(Some(&mut session));
        focus.cancel();
        let Some(CameraEvent::FocusResult { cycle, success }) = rx.recv().await else {
            panic!("expected focus result");
        };

        let result = focus.on_focus_result(cycle, success);
        assert!(matches!(result, Err(CameraError::StaleOperation(_))));
        assert_eq!(focus.state(), FocusState::Idle);
        assert!(!host
            .events()
            .contains(&HostEvent::Status(FocusStatus::Locked, "AutoFocus - locked".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_pending_retry() {
        let cfg = AppConfig::default();
        let provider = SimulatedCameraProvider::new().with_focus_outcomes([false]);
        let (mut focus, mut session, probe, _host, mut rx) = setup(provider, &cfg);

        focus.request_focus(Some(&mut session));
        let Some(CameraEvent::FocusResult { cycle, success }) = rx.recv().await else {
            panic!("expected focus result");
        };
        focus.on_focus_result(cycle, success).unwrap();
        assert!(focus.retry_pending());

        focus.cancel();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(probe.count(DeviceCall::AutoFocus), 1);

        let result = focus.on_retry_due(cycle, Some(&mut session));
        assert!(matches!(result, Err(CameraError::StaleOperation(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_trigger_counts_as_failed_attempt() {
        let cfg = AppConfig::default();
        let provider = SimulatedCameraProvider::new()
            .with_busy_triggers(1)
            .with_focus_outcomes([true]);
        let (mut focus, mut session, _probe, host, mut rx) = setup(provider, &cfg);

        focus.request_focus(Some(&mut session));
        assert_eq!(focus.attempt_count(), 1);
        assert!(focus.retry_pending());

        let Some(CameraEvent::RetryDue { cycle }) = rx.recv().await else {
            panic!("expected retry");
        };
        focus.on_retry_due(cycle, Some(&mut session)).unwrap();
        let Some(CameraEvent::FocusResult { cycle, success }) = rx.recv().await else {
            panic!("expected focus result");
        };
        focus.on_focus_result(cycle, success).unwrap();
        assert_eq!(host.statuses().last(), Some(&FocusStatus::Locked));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_without_session_cancels_cycle() {
        let cfg = AppConfig::default();
        let provider = SimulatedCameraProvider::new().with_focus_outcomes([false]);
        let (mut focus, mut session, _probe, _host, mut rx) = setup(provider, &cfg);

        focus.request_focus(Some(&mut session));
        let Some(CameraEvent::FocusResult { cycle, success }) = rx.recv().await else {
            panic!("expected focus result");
        };
        focus.on_focus_result(cycle, success).unwrap();
        let Some(CameraEvent::RetryDue { cycle }) = rx.recv().await else {
            panic!("expected retry");
        };

        focus.on_retry_due(cycle, None).unwrap();
        assert_eq!(focus.state(), FocusState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_released_handle_cancels_instead_of_retrying() {
        let cfg = AppConfig::default();
        let (mut focus, mut session, probe, _host, _rx) =
            setup(SimulatedCameraProvider::new(), &cfg);

        session.device_mut().release();
        focus.request_focus(Some(&mut session));

        assert_eq!(focus.state(), FocusState::Idle);
        assert!(!focus.retry_pending());
        assert_eq!(probe.count(DeviceCall::AutoFocus), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_cap_gives_up_without_lock() {
        let mut cfg = AppConfig::default();
        cfg.focus.max_attempts = Some(2);
        let provider = SimulatedCameraProvider::new().with_focus_outcomes([false, false]);
        let (mut focus, mut session, _probe, host, mut rx) = setup(provider, &cfg);

        focus.request_focus(Some(&mut session));
        loop {
            match rx.recv().await {
                Some(CameraEvent::FocusResult { cycle, success }) => {
                    focus.on_focus_result(cycle, success).unwrap();
                }
                Some(CameraEvent::RetryDue { cycle }) => {
                    focus.on_retry_due(cycle, Some(&mut session)).unwrap();
                }
                _ => unreachable!(),
            }
            if focus.state() == FocusState::Idle {
                break;
            }
        }

        assert_eq!(host.statuses(), vec![FocusStatus::Focusing]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_cycle_gets_new_id() {
        let cfg = AppConfig::default();
        let (mut focus, mut session, _probe, _host, mut rx) =
            setup(SimulatedCameraProvider::new(), &cfg);

        focus.request_focus(Some(&mut session));
        let first = focus.cycle().map(|c| c.id()).unwrap();
        let Some(CameraEvent::FocusResult { cycle, success }) = rx.recv().await else {
            panic!("expected focus result");
        };
        focus.on_focus_result(cycle, success).unwrap();

        focus.request_focus(Some(&mut session));
        let second = focus.cycle().map(|c| c.id()).unwrap();
        assert!(second > first);
    }
}
