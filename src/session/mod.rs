//! 会话层：设备获取/释放、预览、权限与旋转，以及宿主接口

pub mod camera_session;
pub mod controller;
pub mod host;

pub use camera_session::CameraSession;
pub use controller::SessionController;
pub use host::{CameraHost, HostEvent, RecordingHost};
