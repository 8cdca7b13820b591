//! Hierarchical pose composition
//!
//! Turns a frame's parent-relative joint poses into model-space poses. Joints are visited in
//! index order, so every parent is resolved before its children.

use glam::Vec3;

use crate::error::{BakeError, Result};
use crate::md5anim::{ChannelFlags, JointInfo};
use crate::model::{quat_from_xyz, JointPose};

/// Channels in the order animated components are consumed
const CHANNELS: [ChannelFlags; 6] = [
    ChannelFlags::TX,
    ChannelFlags::TY,
    ChannelFlags::TZ,
    ChannelFlags::QX,
    ChannelFlags::QY,
    ChannelFlags::QZ,
];

/// Compose one frame's model-space joint poses
///
/// For each joint the base pose is copied, the channels set in its flags are replaced by
/// consecutive values of `anim_data` starting at its start index, and w is rebuilt from the
/// resulting x, y, z. Roots keep that local pose; children are transformed by their parent.
pub fn compose(
    hierarchy: &[JointInfo],
    base_frame: &[JointPose],
    anim_data: &[f32],
) -> Result<Vec<JointPose>> {
    if base_frame.len() != hierarchy.len() {
        return Err(BakeError::JointCountMismatch {
            mesh: hierarchy.len(),
            anim: base_frame.len(),
        });
    }

    let mut poses: Vec<JointPose> = Vec::new();
    poses.try_reserve_exact(hierarchy.len())?;

    for (index, (info, base)) in hierarchy.iter().zip(base_frame).enumerate() {
        let local = animate(info, base, anim_data)?;

        let pose = match info.parent {
            None => local,
            Some(parent) if parent < index => {
                let parent = &poses[parent];
                JointPose {
                    position: parent.rotate(local.position) + parent.position,
                    orientation: (parent.orientation * local.orientation).normalize(),
                }
            }
            Some(parent) => {
                return Err(BakeError::SkeletonOrder {
                    joint: info.name.clone(),
                    index,
                    parent,
                });
            }
        };
        poses.push(pose);
    }

    Ok(poses)
}

/// Apply one joint's animated channels to its base pose
fn animate(info: &JointInfo, base: &JointPose, anim_data: &[f32]) -> Result<JointPose> {
    let p = base.position;
    let q = base.orientation;
    let mut values = [p.x, p.y, p.z, q.x, q.y, q.z];

    let mut component = info.start_index;
    for (value, channel) in values.iter_mut().zip(CHANNELS) {
        if info.flags.contains(channel) {
            *value = *anim_data.get(component).ok_or(BakeError::OutOfRange {
                what: "animated component",
                index: component,
                len: anim_data.len(),
            })?;
            component += 1;
        }
    }

    let [tx, ty, tz, qx, qy, qz] = values;
    Ok(JointPose {
        position: Vec3::new(tx, ty, tz),
        orientation: quat_from_xyz(Vec3::new(qx, qy, qz)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;
    use std::f32::consts::FRAC_PI_2;

    fn info(name: &str, parent: Option<usize>, flags: u8, start_index: usize) -> JointInfo {
        JointInfo {
            name: name.to_string(),
            parent,
            flags: ChannelFlags::from_bits(flags).unwrap(),
            start_index,
        }
    }

    /// Unit quaternion with w <= 0, the form MD5 stores
    fn md5_quat(q: Quat) -> Quat {
        if q.w > 0.0 { -q } else { q }
    }

    #[test]
    fn test_root_pose_equals_local() {
        let q = md5_quat(Quat::from_rotation_y(0.7));
        let base = [JointPose {
            position: Vec3::new(1.0, 2.0, 3.0),
            orientation: q,
        }];
        let poses = compose(&[info("root", None, 0, 0)], &base, &[]).unwrap();
        assert_eq!(poses[0].position, base[0].position);
        assert!((poses[0].orientation.w - q.w).abs() < 1e-6);
        assert!((poses[0].orientation.xyz() - q.xyz()).length() < 1e-6);
    }

    #[test]
    fn test_child_inherits_parent_rotation() {
        let turn = md5_quat(Quat::from_rotation_z(FRAC_PI_2));
        let base = [
            JointPose {
                position: Vec3::new(0.0, 0.0, 1.0),
                orientation: turn,
            },
            JointPose {
                position: Vec3::new(2.0, 0.0, 0.0),
                orientation: quat_from_xyz(Vec3::ZERO),
            },
        ];
        let hierarchy = [info("root", None, 0, 0), info("child", Some(0), 0, 0)];
        let poses = compose(&hierarchy, &base, &[]).unwrap();

        // +X rotated a quarter turn about Z lands on +Y
        assert!((poses[1].position - Vec3::new(0.0, 2.0, 1.0)).length() < 1e-5);
        assert!(poses[1].orientation.is_normalized());
        let forward = poses[1].rotate(Vec3::X);
        assert!((forward - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_channels_consumed_in_order() {
        let base = [JointPose::default(), JointPose::default()];
        // root animates Ty, child animates Tx and Qz
        let hierarchy = [info("root", None, 0b000010, 0), info("child", Some(0), 0b100001, 1)];
        let half = std::f32::consts::FRAC_1_SQRT_2;
        let data = [5.0, 1.0, half];

        let poses = compose(&hierarchy, &base, &data).unwrap();
        assert_eq!(poses[0].position, Vec3::new(0.0, 5.0, 0.0));
        assert!((poses[1].position - Vec3::new(1.0, 5.0, 0.0)).length() < 1e-6);
        assert!((poses[1].orientation.z.abs() - half).abs() < 1e-6);
    }

    #[test]
    fn test_missing_component_is_error() {
        let hierarchy = [info("root", None, 0b111, 0)];
        assert!(matches!(
            compose(&hierarchy, &[JointPose::default()], &[1.0, 2.0]),
            Err(BakeError::OutOfRange { index: 2, len: 2, .. })
        ));
    }

    #[test]
    fn test_parent_after_child_is_error() {
        let hierarchy = [info("a", Some(1), 0, 0), info("b", None, 0, 0)];
        let base = [JointPose::default(), JointPose::default()];
        assert!(matches!(
            compose(&hierarchy, &base, &[]),
            Err(BakeError::SkeletonOrder { index: 0, parent: 1, .. })
        ));
    }

    #[test]
    fn test_base_frame_length_checked() {
        let hierarchy = [info("root", None, 0, 0)];
        assert!(matches!(
            compose(&hierarchy, &[], &[]),
            Err(BakeError::JointCountMismatch { .. })
        ));
    }
}
