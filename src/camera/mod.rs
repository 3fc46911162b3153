//! 摄像头设备层：设备 trait、旋转映射、宿主回调能力、模拟器

pub mod device;
pub mod listener;
pub mod orientation;
pub mod sim;

pub use device::{CameraDevice, CameraProvider, FocusCallback, FocusMode};
pub use listener::{PermissionCallback, PreviewFrameCallback, RotationCallback, SurfaceCallback};
pub use orientation::Rotation;
pub use sim::{DeviceCall, SimulatedCameraProvider, SimulatorProbe};
