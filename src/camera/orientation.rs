//! 屏幕旋转到预览方向的映射
//!
//! 设备只有两种固定安装方向：旋转 0 时预览需转 180°，旋转 180 时预览不转。

use serde::Serialize;

use crate::core::CameraError;

/// 设备绝对旋转（两态）
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Rotation {
    #[default]
    Rotation0,
    Rotation180,
}

impl Rotation {
    pub fn degrees(&self) -> u16 {
        match self {
            Self::Rotation0 => 0,
            Self::Rotation180 => 180,
        }
    }

    pub fn flipped(&self) -> Self {
        match self {
            Self::Rotation0 => Self::Rotation180,
            Self::Rotation180 => Self::Rotation0,
        }
    }

    /// 当前旋转下应施加给预览的角度
    pub fn display_orientation(&self) -> u16 {
        match self {
            Self::Rotation0 => 180,
            Self::Rotation180 => 0,
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = CameraError;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Self::Rotation0),
            180 => Ok(Self::Rotation180),
            other => Err(CameraError::UnsupportedRotation(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_table() {
        assert_eq!(Rotation::Rotation0.display_orientation(), 180);
        assert_eq!(Rotation::Rotation180.display_orientation(), 0);
    }

    #[test]
    fn test_mapping_is_involution() {
        for rotation in [Rotation::Rotation0, Rotation::Rotation180] {
            let once = Rotation::try_from(rotation.display_orientation()).unwrap();
            let twice = Rotation::try_from(once.display_orientation()).unwrap();
            assert_eq!(twice, rotation);
        }
    }

    #[test]
    fn test_flip_restores_orientation() {
        let start = Rotation::Rotation0;
        let back = start.flipped().flipped();
        assert_eq!(back.display_orientation(), start.display_orientation());
    }

    #[test]
    fn test_intermediate_rotation_rejected() {
        assert_eq!(
            Rotation::try_from(90),
            Err(CameraError::UnsupportedRotation(90))
        );
        assert_eq!(Rotation::try_from(180).unwrap().degrees(), 180);
    }
}
