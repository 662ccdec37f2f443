use serde::{Deserialize, Serialize};

/// Audio codec requested for a recording.
///
/// Selected on the command channel by a small integer encoder id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AudioCodec {
    #[default]
    AacLc,
    AacEld,
    AacHe,
    AmrNb,
    AmrWb,
    Opus,
}

/// Output container implied by a codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AudioContainer {
    Mpeg4,
    ThreeGpp,
}

impl AudioCodec {
    /// Map an encoder id to a codec. Unknown ids fall back to AAC-LC.
    pub fn from_encoder_id(id: i64) -> Self {
        match id {
            1 => Self::AacEld,
            2 => Self::AacHe,
            3 => Self::AmrNb,
            4 => Self::AmrWb,
            5 => Self::Opus,
            _ => Self::AacLc,
        }
    }

    /// Encoder id this codec is selected by.
    pub fn encoder_id(&self) -> i64 {
        match self {
            Self::AacLc => 0,
            Self::AacEld => 1,
            Self::AacHe => 2,
            Self::AmrNb => 3,
            Self::AmrWb => 4,
            Self::Opus => 5,
        }
    }

    /// Core Audio format identifier (big-endian four-char code).
    pub fn format_id(&self) -> u32 {
        let code = match self {
            Self::AacLc => b"aac ",
            Self::AacEld => b"aace",
            Self::AacHe => b"aach",
            Self::AmrNb => b"samr",
            Self::AmrWb => b"sawb",
            Self::Opus => b"opus",
        };
        u32::from_be_bytes(*code)
    }

    /// AMR variants are written to 3GPP, everything else to MPEG-4.
    pub fn container(&self) -> AudioContainer {
        match self {
            Self::AmrNb | Self::AmrWb => AudioContainer::ThreeGpp,
            _ => AudioContainer::Mpeg4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoder_ids_map_to_codecs() {
        let expected = [
            (0, AudioCodec::AacLc),
            (1, AudioCodec::AacEld),
            (2, AudioCodec::AacHe),
            (3, AudioCodec::AmrNb),
            (4, AudioCodec::AmrWb),
            (5, AudioCodec::Opus),
            (6, AudioCodec::AacLc),
        ];
        for (id, codec) in expected {
            assert_eq!(AudioCodec::from_encoder_id(id), codec, "encoder id {id}");
        }
    }

    #[test]
    fn negative_and_large_ids_use_default() {
        assert_eq!(AudioCodec::from_encoder_id(-1), AudioCodec::default());
        assert_eq!(AudioCodec::from_encoder_id(i64::MAX), AudioCodec::AacLc);
    }

    #[test]
    fn format_ids_are_four_char_codes() {
        assert_eq!(AudioCodec::AacLc.format_id(), 0x6161_6320);
        assert_eq!(AudioCodec::Opus.format_id(), 0x6f70_7573);
        assert_eq!(AudioCodec::AmrNb.format_id(), 0x7361_6d72);
    }

    #[test]
    fn amr_uses_three_gpp() {
        assert_eq!(AudioCodec::AmrWb.container(), AudioContainer::ThreeGpp);
        assert_eq!(AudioCodec::AacHe.container(), AudioContainer::Mpeg4);
    }
}
