//! 摄像头会话：一次打开的设备句柄及其预览状态

use uuid::Uuid;

use crate::camera::CameraDevice;
use crate::core::CameraError;

/// 独占持有设备句柄；预览标志只存在于会话内，会话消失即无预览
pub struct CameraSession {
    id: Uuid,
    device: Box<dyn CameraDevice>,
    preview_active: bool,
    orientation_degrees: Option<u16>,
}

impl CameraSession {
    pub fn new(device: Box<dyn CameraDevice>) -> Self {
        Self {
            id: Uuid::new_v4(),
            device,
            preview_active: false,
            orientation_degrees: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn preview_active(&self) -> bool {
        self.preview_active
    }

    pub fn orientation_degrees(&self) -> Option<u16> {
        self.orientation_degrees
    }

    pub(crate) fn device(&self) -> &dyn CameraDevice {
        &*self.device
    }

    pub(crate) fn device_mut(&mut self) -> &mut dyn CameraDevice {
        &mut *self.device
    }

    pub(crate) fn apply_orientation(&mut self, degrees: u16) -> Result<(), CameraError> {
        self.device.set_display_orientation(degrees)?;
        self.orientation_degrees = Some(degrees);
        Ok(())
    }

    pub(crate) fn start_preview(&mut self) -> Result<(), CameraError> {
        self.device.start_preview()?;
        self.preview_active = true;
        Ok(())
    }

    /// 停止预览并释放设备；设备错误只记录，释放总会执行
    pub(crate) fn close(mut self) {
        if self.preview_active {
            if let Err(e) = self.device.stop_preview() {
                tracing::warn!(session = %self.id, "stopPreview failed during teardown: {}", e);
            }
            self.preview_active = false;
        }
        self.device.release();
        tracing::info!(session = %self.id, "Camera released");
    }
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("id", &self.id)
            .field("preview_active", &self.preview_active)
            .field("orientation_degrees", &self.orientation_degrees)
            .finish()
    }
}
