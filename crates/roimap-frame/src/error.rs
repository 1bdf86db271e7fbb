/// Errors produced while decoding or encoding EpicRaw frames.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum FrameError {
    #[error("buffer too short for {what}: need {needed} bytes, got {got}")]
    Truncated {
        what: &'static str,
        needed: usize,
        got: usize,
    },

    #[error("unsupported frame tag {tag:?}")]
    UnsupportedFormat { tag: [u8; 8] },

    #[error("invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: i64, height: i64 },

    #[error("negative length {len} declared for the {section} section")]
    NegativeLength { section: &'static str, len: i32 },

    #[error("{width}x{height} frame is too large for a {section} section")]
    PayloadOverflow {
        section: &'static str,
        width: usize,
        height: usize,
    },

    #[error("{section} section holds {got} bytes, expected {expected}")]
    SectionSize {
        section: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("capture config is not valid UTF-8")]
    ConfigEncoding,

    #[error("invalid capture config JSON: {0}")]
    ConfigJson(#[from] serde_json::Error),

    #[error("{what} cannot be stored in a {format} frame")]
    Unencodable {
        what: &'static str,
        format: &'static str,
    },
}
