//! What gets rendered: the fixed target plus the caller's input properties.

use std::{fmt, str::FromStr};

use render_video_protocol::RenderRequest;
use serde::Serialize;
use url::Url;

use super::error::DomainError;

/// Output codecs accepted by the render function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    H264,
    H265,
    Vp8,
    Vp9,
    Prores,
    Gif,
    Mp3,
    Aac,
    Wav,
}

impl Codec {
    pub fn as_str(self) -> &'static str {
        match self {
            Codec::H264 => "h264",
            Codec::H265 => "h265",
            Codec::Vp8 => "vp8",
            Codec::Vp9 => "vp9",
            Codec::Prores => "prores",
            Codec::Gif => "gif",
            Codec::Mp3 => "mp3",
            Codec::Aac => "aac",
            Codec::Wav => "wav",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Codec {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "h264" => Ok(Codec::H264),
            "h265" => Ok(Codec::H265),
            "vp8" => Ok(Codec::Vp8),
            "vp9" => Ok(Codec::Vp9),
            "prores" => Ok(Codec::Prores),
            "gif" => Ok(Codec::Gif),
            "mp3" => Ok(Codec::Mp3),
            "aac" => Ok(Codec::Aac),
            "wav" => Ok(Codec::Wav),
            other => Err(DomainError::UnknownCodec(other.to_string())),
        }
    }
}

/// Fixed part of every render: which composition, from which bundle, in which codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTarget {
    pub composition: String,
    pub serve_url: Url,
    pub codec: Codec,
}

/// One submission as handed to a rendering backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub target: RenderTarget,
    pub input_props: RenderRequest,
}

impl RenderJob {
    pub fn new(target: RenderTarget, input_props: RenderRequest) -> Self {
        Self {
            target,
            input_props,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_parses_case_insensitively() {
        assert_eq!("H264".parse::<Codec>(), Ok(Codec::H264));
        assert_eq!(" prores ".parse::<Codec>(), Ok(Codec::Prores));
        assert_eq!(
            "mkv".parse::<Codec>(),
            Err(DomainError::UnknownCodec("mkv".into()))
        );
    }
}
