//! Animation clip parser (.md5anim)
//!
//! ```text
//! MD5Version 10
//! commandline "..."
//! numFrames <n>
//! numJoints <n>
//! frameRate <fps>
//! numAnimatedComponents <n>
//! hierarchy {
//!     "name" parent flags startIndex
//! }
//! bounds {
//!     ( minx miny minz ) ( maxx maxy maxz )
//! }
//! baseframe {
//!     ( px py pz ) ( qx qy qz )
//! }
//! frame i {
//!     <numAnimatedComponents floats>
//! }
//! ```

use crate::error::{BakeError, Result};
use crate::lexer::{Lexer, Scan, Token};
use crate::md5mesh::parse_parent;
use crate::model::{quat_from_xyz, Bounds, JointPose, Skeleton};
use crate::pose;

/// Frame rate used when the clip does not carry a usable one
pub const DEFAULT_FRAME_RATE: f32 = 24.0;

/// Which pose channels a joint reads from the per-frame data
///
/// Animated channels are consumed in bit order starting at the joint's start index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelFlags(u8);

impl ChannelFlags {
    pub const TX: Self = Self(1 << 0);
    pub const TY: Self = Self(1 << 1);
    pub const TZ: Self = Self(1 << 2);
    pub const QX: Self = Self(1 << 3);
    pub const QY: Self = Self(1 << 4);
    pub const QZ: Self = Self(1 << 5);

    pub const ALL: Self = Self(0x3F);

    /// Flags from raw bits, `None` if any bit above the six channels is set
    pub fn from_bits(bits: u8) -> Option<Self> {
        (bits & !Self::ALL.0 == 0).then_some(Self(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Number of animated components this joint consumes per frame
    pub fn component_count(self) -> usize {
        self.0.count_ones() as usize
    }
}

/// One hierarchy entry
#[derive(Debug, Clone, PartialEq)]
pub struct JointInfo {
    pub name: String,
    pub parent: Option<usize>,
    pub flags: ChannelFlags,
    pub start_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimClip {
    pub commandline: String,
    pub frame_rate: f32,
    pub num_animated_components: usize,
    pub hierarchy: Vec<JointInfo>,
    /// Parent-relative base pose; animated channels overwrite its components
    pub base_frame: Vec<JointPose>,
    /// Bounds as written, one per frame
    pub bounds: Vec<Bounds>,
    /// Animated components, one list per frame
    pub frames: Vec<Vec<f32>>,
}

impl AnimClip {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Resolved model-space joint poses of one frame
    pub fn frame_pose(&self, frame: usize) -> Result<Vec<JointPose>> {
        let data = self.frames.get(frame).ok_or(BakeError::OutOfRange {
            what: "frame",
            index: frame,
            len: self.frames.len(),
        })?;
        pose::compose(&self.hierarchy, &self.base_frame, data)
    }
}

/// Parse an .md5anim document against the skeleton it animates
///
/// The hierarchy must describe the same joints, in the same order and with the same
/// parents, as `skeleton`.
pub fn parse_md5anim(src: &str, skeleton: &Skeleton) -> Result<AnimClip> {
    let mut lexer = Lexer::new(src);
    lexer.version()?;

    let mut commandline = String::new();
    let mut num_frames = None;
    let mut num_joints = None;
    let mut frame_rate = None;
    let mut num_components = None;
    let mut hierarchy = None;
    let mut bounds = None;
    let mut base_frame = None;
    let mut frames: Vec<Vec<f32>> = Vec::new();

    while let Some(token) = lexer.next_token() {
        match token {
            Token::Word("commandline") => {
                commandline = lexer.quoted("commandline")?.to_string();
            }
            Token::Word("numFrames") => {
                let n = lexer.count("numFrames")?;
                frames.try_reserve_exact(n)?;
                num_frames = Some(n);
            }
            Token::Word("numJoints") => {
                let n = lexer.count("numJoints")?;
                if n != skeleton.joints.len() {
                    return Err(BakeError::JointCountMismatch {
                        mesh: skeleton.joints.len(),
                        anim: n,
                    });
                }
                num_joints = Some(n);
            }
            Token::Word("frameRate") => {
                let line = lexer.line();
                frame_rate = Some(match lexer.scan_float() {
                    Scan::Value(rate) if rate > 0.0 => rate,
                    Scan::Value(rate) => {
                        tracing::warn!(
                            "line {}: frameRate {} is not positive, using {}",
                            line,
                            rate,
                            DEFAULT_FRAME_RATE
                        );
                        DEFAULT_FRAME_RATE
                    }
                    Scan::Malformed(found) => {
                        tracing::warn!(
                            "line {}: malformed frameRate {:?}, using {}",
                            line,
                            found,
                            DEFAULT_FRAME_RATE
                        );
                        DEFAULT_FRAME_RATE
                    }
                    Scan::Missing => {
                        tracing::warn!(
                            "line {}: frameRate has no value, using {}",
                            line,
                            DEFAULT_FRAME_RATE
                        );
                        DEFAULT_FRAME_RATE
                    }
                });
            }
            Token::Word("numAnimatedComponents") => {
                num_components = Some(lexer.count("numAnimatedComponents")?);
            }
            Token::Word("hierarchy") => {
                let (joints, components) =
                    require_hierarchy_counts(&lexer, num_joints, num_components)?;
                let parsed = parse_hierarchy(&mut lexer, joints, components)?;
                match_skeleton(&parsed, skeleton)?;
                hierarchy = Some(parsed);
            }
            Token::Word("bounds") => {
                let n = num_frames
                    .ok_or_else(|| BakeError::format(lexer.line(), "bounds before numFrames"))?;
                bounds = Some(parse_bounds(&mut lexer, n)?);
            }
            Token::Word("baseframe") => {
                let n = num_joints
                    .ok_or_else(|| BakeError::format(lexer.line(), "baseframe before numJoints"))?;
                base_frame = Some(parse_base_frame(&mut lexer, n)?);
            }
            Token::Word("frame") => {
                let declared = num_frames
                    .ok_or_else(|| BakeError::format(lexer.line(), "frame before numFrames"))?;
                let components = num_components.ok_or_else(|| {
                    BakeError::format(lexer.line(), "frame before numAnimatedComponents")
                })?;
                if frames.len() >= declared {
                    return Err(BakeError::format(
                        lexer.line(),
                        format!("more frame blocks than numFrames {}", declared),
                    ));
                }
                lexer.index("frame", frames.len())?;
                frames.push(parse_frame(&mut lexer, components)?);
            }
            _ => {
                return Err(BakeError::format(
                    lexer.line(),
                    format!("unexpected {:?} in md5anim", token),
                ));
            }
        }
    }

    let num_frames = num_frames.ok_or(BakeError::UnexpectedEof {
        expected: "numFrames",
    })?;
    let hierarchy = hierarchy.ok_or(BakeError::UnexpectedEof {
        expected: "hierarchy",
    })?;
    let base_frame = base_frame.ok_or(BakeError::UnexpectedEof {
        expected: "baseframe",
    })?;
    let bounds = match bounds {
        Some(bounds) => bounds,
        None if num_frames == 0 => Vec::new(),
        None => return Err(BakeError::UnexpectedEof { expected: "bounds" }),
    };
    if frames.len() != num_frames {
        return Err(BakeError::format(
            lexer.line(),
            format!(
                "numFrames is {} but {} frame blocks were found",
                num_frames,
                frames.len()
            ),
        ));
    }

    let frame_rate = frame_rate.unwrap_or_else(|| {
        tracing::warn!("md5anim has no frameRate, using {}", DEFAULT_FRAME_RATE);
        DEFAULT_FRAME_RATE
    });

    tracing::debug!(
        "Parsed md5anim: {} frames at {} fps, {} animated components",
        frames.len(),
        frame_rate,
        num_components.unwrap_or(0)
    );

    Ok(AnimClip {
        commandline,
        frame_rate,
        num_animated_components: num_components.unwrap_or(0),
        hierarchy,
        base_frame,
        bounds,
        frames,
    })
}

fn require_hierarchy_counts(
    lexer: &Lexer<'_>,
    num_joints: Option<usize>,
    num_components: Option<usize>,
) -> Result<(usize, usize)> {
    let joints =
        num_joints.ok_or_else(|| BakeError::format(lexer.line(), "hierarchy before numJoints"))?;
    let components = num_components.ok_or_else(|| {
        BakeError::format(lexer.line(), "hierarchy before numAnimatedComponents")
    })?;
    Ok((joints, components))
}

fn parse_hierarchy(
    lexer: &mut Lexer<'_>,
    count: usize,
    components: usize,
) -> Result<Vec<JointInfo>> {
    lexer.expect(Token::OpenBrace, "after hierarchy")?;

    let mut hierarchy = Vec::new();
    hierarchy.try_reserve_exact(count)?;
    for index in 0..count {
        let name = lexer.quoted("joint name")?.to_string();
        let parent = parse_parent(lexer, &name, index)?;

        let raw = lexer.count("joint flags")?;
        let flags = u8::try_from(raw)
            .ok()
            .and_then(ChannelFlags::from_bits)
            .ok_or_else(|| {
                BakeError::format(
                    lexer.line(),
                    format!("joint '{}' has invalid channel flags {}", name, raw),
                )
            })?;

        let start_index = lexer.count("joint startIndex")?;
        let end = start_index.saturating_add(flags.component_count());
        if end > components {
            return Err(BakeError::OutOfRange {
                what: "animated component",
                index: end - 1,
                len: components,
            });
        }

        hierarchy.push(JointInfo {
            name,
            parent,
            flags,
            start_index,
        });
    }

    lexer.expect(Token::CloseBrace, "after last hierarchy joint")?;
    Ok(hierarchy)
}

fn match_skeleton(hierarchy: &[JointInfo], skeleton: &Skeleton) -> Result<()> {
    for (index, (info, joint)) in hierarchy.iter().zip(&skeleton.joints).enumerate() {
        if info.name != joint.name || info.parent != joint.parent {
            return Err(BakeError::HierarchyMismatch {
                index,
                mesh: describe_joint(&joint.name, joint.parent),
                anim: describe_joint(&info.name, info.parent),
            });
        }
    }
    Ok(())
}

fn describe_joint(name: &str, parent: Option<usize>) -> String {
    match parent {
        Some(p) => format!("{} (parent {})", name, p),
        None => format!("{} (root)", name),
    }
}

fn parse_bounds(lexer: &mut Lexer<'_>, count: usize) -> Result<Vec<Bounds>> {
    lexer.expect(Token::OpenBrace, "after bounds")?;

    let mut bounds = Vec::new();
    bounds.try_reserve_exact(count)?;
    for _ in 0..count {
        let min = lexer.vec3("bounds min")?;
        let max = lexer.vec3("bounds max")?;
        bounds.push(Bounds { min, max });
    }

    lexer.expect(Token::CloseBrace, "after last bounds entry")?;
    Ok(bounds)
}

fn parse_base_frame(lexer: &mut Lexer<'_>, count: usize) -> Result<Vec<JointPose>> {
    lexer.expect(Token::OpenBrace, "after baseframe")?;

    let mut poses = Vec::new();
    poses.try_reserve_exact(count)?;
    for _ in 0..count {
        let position = lexer.vec3("baseframe position")?;
        let orientation = quat_from_xyz(lexer.vec3("baseframe orientation")?);
        poses.push(JointPose {
            position,
            orientation,
        });
    }

    lexer.expect(Token::CloseBrace, "after last baseframe joint")?;
    Ok(poses)
}

fn parse_frame(lexer: &mut Lexer<'_>, components: usize) -> Result<Vec<f32>> {
    let frame_line = lexer.line();
    lexer.expect(Token::OpenBrace, "after frame index")?;

    let mut data = Vec::new();
    data.try_reserve_exact(components)?;
    loop {
        match lexer.scan_float() {
            Scan::Value(v) => data.push(v),
            Scan::Missing => break,
            Scan::Malformed(found) => {
                return Err(BakeError::MalformedNumber {
                    line: lexer.line(),
                    field: "frame component",
                    found: found.to_string(),
                });
            }
        }
    }
    lexer.expect(Token::CloseBrace, "closing frame")?;

    if data.len() != components {
        return Err(BakeError::format(
            frame_line,
            format!(
                "frame has {} components, numAnimatedComponents is {}",
                data.len(),
                components
            ),
        ));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Joint;
    use glam::{Quat, Vec3};

    fn skeleton() -> Skeleton {
        let joint = |name: &str, parent| Joint {
            name: name.to_string(),
            parent,
            pose: JointPose::default(),
        };
        Skeleton {
            joints: vec![joint("origin", None), joint("hand", Some(0))],
        }
    }

    const CLIP: &str = r#"MD5Version 10
commandline "clip"

numFrames 2
numJoints 2
frameRate 30
numAnimatedComponents 2

hierarchy {
	"origin"	-1 0 0	//
	"hand"	0 5 0	// origin ( Tx Tz )
}

bounds {
	( -1 -1 -1 ) ( 1 1 1 )
	( -2 -2 -2 ) ( 2 2 2 )
}

baseframe {
	( 0 0 0 ) ( 0 0 0 )
	( 0 0 10 ) ( 0 0 0 )
}

frame 0 {
	1 10
}

frame 1 {
	2 20
}
"#;

    #[test]
    fn test_channel_flags() {
        let flags = ChannelFlags::from_bits(0b101).unwrap();
        assert!(flags.contains(ChannelFlags::TX));
        assert!(!flags.contains(ChannelFlags::TY));
        assert!(flags.contains(ChannelFlags::TZ));
        assert_eq!(flags.component_count(), 2);
        assert_eq!(ChannelFlags::ALL.component_count(), 6);
        assert!(ChannelFlags::from_bits(64).is_none());
    }

    #[test]
    fn test_parse_clip() {
        let clip = parse_md5anim(CLIP, &skeleton()).unwrap();
        assert_eq!(clip.commandline, "clip");
        assert_eq!(clip.frame_rate, 30.0);
        assert_eq!(clip.frame_count(), 2);
        assert_eq!(clip.num_animated_components, 2);
        assert_eq!(clip.hierarchy[1].flags, ChannelFlags::from_bits(5).unwrap());
        assert_eq!(clip.bounds[1].max, Vec3::splat(2.0));
        assert_eq!(clip.base_frame[1].position, Vec3::new(0.0, 0.0, 10.0));
        assert_eq!(clip.frames[1], vec![2.0, 20.0]);
    }

    #[test]
    fn test_frame_pose_applies_channels() {
        let clip = parse_md5anim(CLIP, &skeleton()).unwrap();
        let pose = clip.frame_pose(1).unwrap();
        assert_eq!(pose[0].position, Vec3::ZERO);
        assert!((pose[1].position - Vec3::new(2.0, 0.0, 20.0)).length() < 1e-5);
        assert!(clip.frame_pose(2).is_err());
    }

    #[test]
    fn test_joint_count_mismatch() {
        let mut skel = skeleton();
        skel.joints.pop();
        assert!(matches!(
            parse_md5anim(CLIP, &skel),
            Err(BakeError::JointCountMismatch { mesh: 1, anim: 2 })
        ));
    }

    #[test]
    fn test_hierarchy_name_mismatch() {
        let src = CLIP.replace("\"hand\"", "\"foot\"");
        match parse_md5anim(&src, &skeleton()) {
            Err(BakeError::HierarchyMismatch { index, mesh, anim }) => {
                assert_eq!(index, 1);
                assert!(mesh.starts_with("hand"));
                assert!(anim.starts_with("foot"));
            }
            other => panic!("expected HierarchyMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_hierarchy_order() {
        let src = CLIP.replace("\"hand\"\t0 5 0", "\"hand\"\t1 5 0");
        assert!(matches!(
            parse_md5anim(&src, &skeleton()),
            Err(BakeError::SkeletonOrder { index: 1, parent: 1, .. })
        ));
    }

    #[test]
    fn test_components_past_end() {
        let src = CLIP.replace("\"hand\"\t0 5 0", "\"hand\"\t0 5 1");
        assert!(matches!(
            parse_md5anim(&src, &skeleton()),
            Err(BakeError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_frame_component_count() {
        let src = CLIP.replace("\t2 20\n", "\t2 20 30\n");
        assert!(matches!(
            parse_md5anim(&src, &skeleton()),
            Err(BakeError::Format { .. })
        ));

        let src = CLIP.replace("\t2 20\n", "\t2 x\n");
        assert!(matches!(
            parse_md5anim(&src, &skeleton()),
            Err(BakeError::MalformedNumber { field: "frame component", .. })
        ));

        let src = CLIP.replace("\t2 20\n", "\t2 NaN\n");
        assert!(matches!(
            parse_md5anim(&src, &skeleton()),
            Err(BakeError::MalformedNumber { field: "frame component", .. })
        ));
    }

    #[test]
    fn test_frame_rate_defaults() {
        let src = CLIP.replace("frameRate 30", "frameRate fast");
        let clip = parse_md5anim(&src, &skeleton()).unwrap();
        assert_eq!(clip.frame_rate, DEFAULT_FRAME_RATE);

        let src = CLIP.replace("frameRate 30\n", "");
        let clip = parse_md5anim(&src, &skeleton()).unwrap();
        assert_eq!(clip.frame_rate, DEFAULT_FRAME_RATE);

        let src = CLIP.replace("frameRate 30", "frameRate inf");
        let clip = parse_md5anim(&src, &skeleton()).unwrap();
        assert_eq!(clip.frame_rate, DEFAULT_FRAME_RATE);

        let src = CLIP.replace("frameRate 30", "frameRate -5");
        let clip = parse_md5anim(&src, &skeleton()).unwrap();
        assert_eq!(clip.frame_rate, DEFAULT_FRAME_RATE);
    }

    #[test]
    fn test_zero_frames() {
        let src = r#"MD5Version 10
numFrames 0
numJoints 2
frameRate 24
numAnimatedComponents 0
hierarchy {
	"origin" -1 0 0
	"hand" 0 0 0
}
bounds {
}
baseframe {
	( 0 0 0 ) ( 0 0 0 )
	( 0 0 10 ) ( 0 0 0 )
}
"#;
        let clip = parse_md5anim(src, &skeleton()).unwrap();
        assert_eq!(clip.frame_count(), 0);
        assert!(clip.bounds.is_empty());
        assert_eq!(clip.base_frame[0].orientation, Quat::from_xyzw(0.0, 0.0, 0.0, -1.0));
    }

    #[test]
    fn test_missing_frame_block() {
        let cut = CLIP.find("frame 1").unwrap();
        assert!(matches!(
            parse_md5anim(&CLIP[..cut], &skeleton()),
            Err(BakeError::Format { .. })
        ));
    }
}
