use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const CHINESE_VOICES: &[&str] = &[
    "Xiaoxiao", // female, most used
    "Xiaoyi",
    "Yunxia",
    "Yunjian", // male, most used
    "Yunxi",
    "Yunyang",
];

const ENGLISH_VOICES: &[&str] = &[
    "Jenny", // female, most used
    "Aria",
    "Ana",
    "Guy", // male, most used
    "Christopher",
    "Steffan",
];

/// Represents a text-to-speech voice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub language: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Chinese,
    English,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Chinese, Language::English];

    /// BCP 47 tag understood by the synthesis tool.
    pub fn tag(&self) -> &'static str {
        match self {
            Language::Chinese => "zh-CN",
            Language::English => "en-US",
        }
    }

    pub fn voices(&self) -> &'static [&'static str] {
        match self {
            Language::Chinese => CHINESE_VOICES,
            Language::English => ENGLISH_VOICES,
        }
    }

    pub fn voice_name(&self, index: usize) -> Option<&'static str> {
        self.voices().get(index).copied()
    }

    pub fn voice_index(&self, name: &str) -> Option<usize> {
        self.voices()
            .iter()
            .position(|v| v.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Chinese => write!(f, "Chinese"),
            Language::English => write!(f, "English"),
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chinese" | "zh" | "zh-cn" => Ok(Language::Chinese),
            "english" | "en" | "en-us" => Ok(Language::English),
            other => Err(format!("unsupported language: {}", other)),
        }
    }
}

/// Voice identifier passed to the synthesis tool, e.g. `zh-CN-XiaoxiaoNeural`.
pub fn neural_voice_id(language: Language, name: &str) -> String {
    format!("{}-{}Neural", language.tag(), name)
}

pub fn list_voices(language: Language) -> Vec<Voice> {
    language
        .voices()
        .iter()
        .map(|name| Voice {
            id: neural_voice_id(language, name),
            name: name.to_string(),
            language: language.tag().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_lookup_by_index_and_name() {
        assert_eq!(Language::Chinese.voice_name(0), Some("Xiaoxiao"));
        assert_eq!(Language::English.voice_name(3), Some("Guy"));
        assert_eq!(Language::English.voice_name(6), None);
        assert_eq!(Language::Chinese.voice_index("yunjian"), Some(3));
        assert_eq!(Language::Chinese.voice_index("Jenny"), None);
    }

    #[test]
    fn test_neural_voice_id() {
        assert_eq!(
            neural_voice_id(Language::Chinese, "Xiaoxiao"),
            "zh-CN-XiaoxiaoNeural"
        );
        assert_eq!(neural_voice_id(Language::English, "Aria"), "en-US-AriaNeural");
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!("EN".parse::<Language>(), Ok(Language::English));
        assert_eq!("zh-cn".parse::<Language>(), Ok(Language::Chinese));
        assert!("klingon".parse::<Language>().is_err());
    }

    #[test]
    fn test_list_voices_covers_table() {
        let voices = list_voices(Language::English);
        assert_eq!(voices.len(), 6);
        assert_eq!(voices[0].id, "en-US-JennyNeural");
        assert!(voices.iter().all(|v| v.language == "en-US"));
    }
}
