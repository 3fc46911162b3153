//! 宿主侧回调能力
//!
//! 每种外部事件源一个窄 trait；CameraHandle 全部实现，把事件转成 CameraEvent 投递给控制器任务。

use crate::camera::Rotation;

/// 预览表面生命周期
pub trait SurfaceCallback {
    fn surface_created(&self);

    /// 格式或尺寸变化，控制器不处理
    fn surface_changed(&self, format: i32, width: u32, height: u32);

    fn surface_destroyed(&self);
}

/// 设备旋转通知
pub trait RotationCallback {
    fn on_rotation_changed(&self, rotation: Rotation);
}

/// 权限请求结果
pub trait PermissionCallback {
    fn on_permission_result(&self, granted: bool);
}

/// 预览帧
pub trait PreviewFrameCallback {
    fn on_preview_frame(&self, data: &[u8]);
}
