use crate::FrameError;
use serde::{Deserialize, Serialize};

pub const EPICRAW1_HEADER_LEN: usize = 168;
pub const EPICRAW2_HEADER_LEN: usize = 40;

pub(crate) const EPICRAW1_TAG: &[u8; 8] = b"EPICRAW1";
pub(crate) const EPICRAW2_TAG: &[u8; 8] = b"EPICRAW2";

/// Container revision, identified by the 8-byte tag at the start of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameFormat {
    /// Fixed 168-byte header, RGB24 image.
    EpicRaw1,
    /// Length-prefixed sections, RGB48 image.
    EpicRaw2,
}

impl FrameFormat {
    /// Identify the revision of `bytes`.
    ///
    /// A tag whose eighth byte is zero predates the explicit version suffix
    /// and is read as [`FrameFormat::EpicRaw1`].
    pub fn detect(bytes: &[u8]) -> Result<Self, FrameError> {
        let tag: [u8; 8] = bytes
            .get(..8)
            .and_then(|s| s.try_into().ok())
            .ok_or(FrameError::Truncated {
                what: "frame tag",
                needed: 8,
                got: bytes.len(),
            })?;

        if &tag == EPICRAW1_TAG {
            Ok(Self::EpicRaw1)
        } else if &tag == EPICRAW2_TAG {
            Ok(Self::EpicRaw2)
        } else if tag[7] == 0 {
            Ok(Self::EpicRaw1)
        } else {
            Err(FrameError::UnsupportedFormat { tag })
        }
    }

    pub fn tag(&self) -> &'static [u8; 8] {
        match self {
            Self::EpicRaw1 => EPICRAW1_TAG,
            Self::EpicRaw2 => EPICRAW2_TAG,
        }
    }

    pub fn header_len(&self) -> usize {
        match self {
            Self::EpicRaw1 => EPICRAW1_HEADER_LEN,
            Self::EpicRaw2 => EPICRAW2_HEADER_LEN,
        }
    }

    /// Bytes per image channel sample.
    pub fn image_sample_size(&self) -> usize {
        match self {
            Self::EpicRaw1 => 1,
            Self::EpicRaw2 => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::EpicRaw1 => "EpicRaw1",
            Self::EpicRaw2 => "EpicRaw2",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_explicit_tags() {
        assert_eq!(
            FrameFormat::detect(b"EPICRAW1rest").unwrap(),
            FrameFormat::EpicRaw1
        );
        assert_eq!(
            FrameFormat::detect(b"EPICRAW2rest").unwrap(),
            FrameFormat::EpicRaw2
        );
    }

    #[test]
    fn legacy_tag_without_suffix_is_first_revision() {
        assert_eq!(
            FrameFormat::detect(b"EPICRAW\0....").unwrap(),
            FrameFormat::EpicRaw1
        );
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(matches!(
            FrameFormat::detect(b"PNGIMAGE"),
            Err(FrameError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            FrameFormat::detect(b"EPIC"),
            Err(FrameError::Truncated { .. })
        ));
    }
}
