//! 模拟摄像头（用于演示与测试，无需硬件）
//!
//! 记录每一次设备调用；对焦结果可按脚本给出，或按「失败 N 次后锁定」的规律循环。
//! 被 cancelAutoFocus 取消的扫描不会回调；同时存在两个未完成扫描会被计入 overlapping_triggers。

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::camera::{CameraDevice, CameraProvider, FocusCallback, FocusMode};
use crate::config::SimulatorSection;
use crate::core::CameraError;

/// 设备调用记录
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceCall {
    Open,
    GetFocusMode,
    SetFocusMode(FocusMode),
    SetDisplayOrientation(u16),
    StartPreview,
    StopPreview,
    AutoFocus,
    CancelAutoFocus,
    Release,
}

#[derive(Debug)]
struct SimState {
    calls: Vec<DeviceCall>,
    open: bool,
    preview: bool,
    fail_open: bool,
    fail_start_preview: bool,
    fail_stop_preview: bool,
    focus_mode: FocusMode,
    scripted: VecDeque<bool>,
    failures_before_lock: u32,
    consecutive_failures: u32,
    busy_triggers: u32,
    outstanding_scan: Option<u64>,
    next_scan: u64,
    overlapping_triggers: u32,
}

impl SimState {
    fn next_outcome(&mut self) -> bool {
        if let Some(outcome) = self.scripted.pop_front() {
            return outcome;
        }
        if self.consecutive_failures < self.failures_before_lock {
            self.consecutive_failures += 1;
            false
        } else {
            self.consecutive_failures = 0;
            true
        }
    }
}

fn lock_state(shared: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 模拟摄像头提供者
#[derive(Debug, Clone)]
pub struct SimulatedCameraProvider {
    shared: Arc<Mutex<SimState>>,
    scan_duration: Duration,
}

impl Default for SimulatedCameraProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCameraProvider {
    /// 默认：扫描立即完成且每次都锁定，设备初始为连续对焦模式
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(SimState {
                calls: Vec::new(),
                open: false,
                preview: false,
                fail_open: false,
                fail_start_preview: false,
                fail_stop_preview: false,
                focus_mode: FocusMode::ContinuousPicture,
                scripted: VecDeque::new(),
                failures_before_lock: 0,
                consecutive_failures: 0,
                busy_triggers: 0,
                outstanding_scan: None,
                next_scan: 0,
                overlapping_triggers: 0,
            })),
            scan_duration: Duration::ZERO,
        }
    }

    pub fn from_config(section: &SimulatorSection) -> Self {
        Self::new()
            .with_scan_duration(Duration::from_millis(section.scan_duration_ms))
            .with_failures_before_lock(section.failures_before_lock)
    }

    pub fn with_scan_duration(mut self, duration: Duration) -> Self {
        self.scan_duration = duration;
        self
    }

    /// 依次给出的对焦结果；用完后回到 failures_before_lock 规律
    pub fn with_focus_outcomes(self, outcomes: impl IntoIterator<Item = bool>) -> Self {
        lock_state(&self.shared).scripted.extend(outcomes);
        self
    }

    pub fn with_failures_before_lock(self, failures: u32) -> Self {
        lock_state(&self.shared).failures_before_lock = failures;
        self
    }

    /// 接下来 n 次 autoFocus 同步返回 DeviceBusy
    pub fn with_busy_triggers(self, n: u32) -> Self {
        lock_state(&self.shared).busy_triggers = n;
        self
    }

    pub fn with_initial_focus_mode(self, mode: FocusMode) -> Self {
        lock_state(&self.shared).focus_mode = mode;
        self
    }

    pub fn failing_open(self) -> Self {
        lock_state(&self.shared).fail_open = true;
        self
    }

    pub fn failing_preview(self) -> Self {
        lock_state(&self.shared).fail_start_preview = true;
        self
    }

    /// stopPreview 总是失败（拆除时应只记录，释放照常进行）
    pub fn failing_stop_preview(self) -> Self {
        lock_state(&self.shared).fail_stop_preview = true;
        self
    }

    /// 只读探针，provider 移交给控制器后仍可观察设备
    pub fn probe(&self) -> SimulatorProbe {
        SimulatorProbe {
            shared: self.shared.clone(),
        }
    }
}

impl CameraProvider for SimulatedCameraProvider {
    fn open(&mut self) -> Result<Box<dyn CameraDevice>, CameraError> {
        let mut state = lock_state(&self.shared);
        state.calls.push(DeviceCall::Open);
        if state.fail_open {
            return Err(CameraError::DeviceUnavailable(
                "camera service refused to open".to_string(),
            ));
        }
        if state.open {
            return Err(CameraError::DeviceUnavailable(
                "camera already opened by another client".to_string(),
            ));
        }
        state.open = true;
        Ok(Box::new(SimulatedCamera {
            shared: self.shared.clone(),
            scan_duration: self.scan_duration,
            released: false,
        }))
    }
}

/// 模拟设备句柄
#[derive(Debug)]
pub struct SimulatedCamera {
    shared: Arc<Mutex<SimState>>,
    scan_duration: Duration,
    released: bool,
}

impl SimulatedCamera {
    fn record(&self, call: DeviceCall) -> Result<MutexGuard<'_, SimState>, CameraError> {
        let mut state = lock_state(&self.shared);
        state.calls.push(call);
        if self.released {
            return Err(CameraError::DeviceReleased);
        }
        Ok(state)
    }
}

impl CameraDevice for SimulatedCamera {
    fn focus_mode(&self) -> Result<FocusMode, CameraError> {
        let state = self.record(DeviceCall::GetFocusMode)?;
        Ok(state.focus_mode)
    }

    fn set_focus_mode(&mut self, mode: FocusMode) -> Result<(), CameraError> {
        let mut state = self.record(DeviceCall::SetFocusMode(mode))?;
        state.focus_mode = mode;
        Ok(())
    }

    fn set_display_orientation(&mut self, degrees: u16) -> Result<(), CameraError> {
        self.record(DeviceCall::SetDisplayOrientation(degrees))?;
        Ok(())
    }

    fn start_preview(&mut self) -> Result<(), CameraError> {
        let mut state = self.record(DeviceCall::StartPreview)?;
        if state.fail_start_preview {
            return Err(CameraError::DeviceUnavailable(
                "preview surface rejected".to_string(),
            ));
        }
        state.preview = true;
        Ok(())
    }

    fn stop_preview(&mut self) -> Result<(), CameraError> {
        let mut state = self.record(DeviceCall::StopPreview)?;
        if state.fail_stop_preview {
            return Err(CameraError::DeviceBusy("stopPreview rejected".to_string()));
        }
        state.preview = false;
        Ok(())
    }

    fn auto_focus(&mut self, callback: FocusCallback) -> Result<(), CameraError> {
        let mut state = self.record(DeviceCall::AutoFocus)?;
        if state.busy_triggers > 0 {
            state.busy_triggers -= 1;
            return Err(CameraError::DeviceBusy("autoFocus rejected".to_string()));
        }
        if state.outstanding_scan.is_some() {
            state.overlapping_triggers += 1;
        }
        let scan = state.next_scan;
        state.next_scan += 1;
        let success = state.next_outcome();

        if self.scan_duration.is_zero() {
            state.outstanding_scan = None;
            drop(state);
            callback.complete(success);
            return Ok(());
        }

        state.outstanding_scan = Some(scan);
        drop(state);

        let shared = self.shared.clone();
        let duration = self.scan_duration;
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let mut state = lock_state(&shared);
            if state.outstanding_scan != Some(scan) {
                return;
            }
            state.outstanding_scan = None;
            drop(state);
            callback.complete(success);
        });
        Ok(())
    }

    fn cancel_auto_focus(&mut self) -> Result<(), CameraError> {
        let mut state = self.record(DeviceCall::CancelAutoFocus)?;
        state.outstanding_scan = None;
        Ok(())
    }

    fn release(&mut self) {
        let mut state = lock_state(&self.shared);
        state.calls.push(DeviceCall::Release);
        if !self.released {
            state.open = false;
            state.preview = false;
            state.outstanding_scan = None;
        }
        drop(state);
        self.released = true;
    }
}

/// 设备状态探针
#[derive(Debug, Clone)]
pub struct SimulatorProbe {
    shared: Arc<Mutex<SimState>>,
}

impl SimulatorProbe {
    pub fn calls(&self) -> Vec<DeviceCall> {
        lock_state(&self.shared).calls.clone()
    }

    pub fn count(&self, call: DeviceCall) -> usize {
        lock_state(&self.shared)
            .calls
            .iter()
            .filter(|c| **c == call)
            .count()
    }

    pub fn is_open(&self) -> bool {
        lock_state(&self.shared).open
    }

    pub fn is_previewing(&self) -> bool {
        lock_state(&self.shared).preview
    }

    pub fn focus_mode(&self) -> FocusMode {
        lock_state(&self.shared).focus_mode
    }

    pub fn scan_outstanding(&self) -> bool {
        lock_state(&self.shared).outstanding_scan.is_some()
    }

    /// 在上一次扫描未结束时又发起扫描的次数
    pub fn overlapping_triggers(&self) -> u32 {
        lock_state(&self.shared).overlapping_triggers
    }

    pub fn clear_calls(&self) {
        lock_state(&self.shared).calls.clear();
    }
}
