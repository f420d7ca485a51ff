use serde::{Deserialize, Serialize};

const LONG_STEM_CHARS: usize = 24;
const UNSTRUCTURED_STEM_CHARS: usize = 18;
const ODD_SYMBOLS: &[char] = &[
    '!', '*', '=', '+', '@', '#', '$', '%', '^', '&', '(', ')', '[', ']', '{', '}', ';', ',',
    '\'', '`', '~', '<', '>', '|', '\\',
];
const CAMERA_TOKENS: &[&str] = &[
    "img",
    "dsc",
    "dscn",
    "dscf",
    "pxl_",
    "mvimg",
    "mmexport",
    "wx_camera",
    "screenshot",
    "snapchat",
    "image",
    "photo_",
    "download",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MessySignal {
    TooLong,
    OddSymbols,
    ManySymbols,
    RandomToken,
    Unstructured,
    CameraToken,
}

#[derive(Debug, Clone, Default)]
pub struct MessyRules {
    pub extra_tokens: Vec<String>,
}

impl MessyRules {
    pub fn with_extra_tokens(tokens: &[String]) -> Self {
        Self {
            extra_tokens: tokens
                .iter()
                .map(|token| token.trim().to_lowercase())
                .filter(|token| !token.is_empty())
                .collect(),
        }
    }

    pub fn is_messy(&self, stem: &str) -> bool {
        self.classify(stem).is_some()
    }

    // First hit wins.
    pub fn classify(&self, stem: &str) -> Option<MessySignal> {
        if stem.is_empty() {
            return None;
        }

        if stem.chars().count() >= LONG_STEM_CHARS {
            return Some(MessySignal::TooLong);
        }

        if stem.chars().any(|ch| ODD_SYMBOLS.contains(&ch)) {
            return Some(MessySignal::OddSymbols);
        }

        let symbols = stem
            .chars()
            .filter(|&ch| !ch.is_alphanumeric() && !is_separator(ch))
            .count();
        if symbols >= 3 {
            return Some(MessySignal::ManySymbols);
        }

        if stem.split(is_separator).any(is_random_token) {
            return Some(MessySignal::RandomToken);
        }

        if !stem.chars().any(is_separator)
            && stem.chars().count() >= UNSTRUCTURED_STEM_CHARS
            && has_digit(stem)
            && stem.chars().any(char::is_alphabetic)
        {
            return Some(MessySignal::Unstructured);
        }

        let lower = stem.to_lowercase();
        let camera = CAMERA_TOKENS.iter().any(|token| lower.starts_with(token))
            || self
                .extra_tokens
                .iter()
                .any(|token| lower.starts_with(token.as_str()));
        if camera && has_digit(stem) {
            return Some(MessySignal::CameraToken);
        }

        None
    }
}

pub fn contains_cjk(value: &str) -> bool {
    value.chars().any(is_cjk)
}

fn is_cjk(ch: char) -> bool {
    matches!(
        ch as u32,
        0x3040..=0x30FF
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xAC00..=0xD7AF
            | 0xF900..=0xFAFF
            | 0x20000..=0x2EBEF
    )
}

fn is_separator(ch: char) -> bool {
    matches!(ch, '_' | '-' | '.' | ' ')
}

fn has_digit(value: &str) -> bool {
    value.chars().any(|ch| ch.is_ascii_digit())
}

fn is_random_token(token: &str) -> bool {
    let len = token.chars().count();
    let digits = token.chars().any(|ch| ch.is_ascii_digit());
    let letters = token.chars().any(|ch| ch.is_ascii_alphabetic());

    let hex = len >= 6 && token.chars().all(|ch| ch.is_ascii_hexdigit()) && digits && letters;
    let numeric = len >= 10 && token.chars().all(|ch| ch.is_ascii_digit());
    let mixed = len >= 12 && token.chars().all(|ch| ch.is_ascii_alphanumeric()) && digits && letters;

    hex || numeric || mixed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(stem: &str) -> Option<MessySignal> {
        MessyRules::default().classify(stem)
    }

    #[test]
    fn hex_like_tokens_are_messy() {
        assert_eq!(classify("a1b2c3"), Some(MessySignal::RandomToken));
        assert_eq!(classify("d4e5f6"), Some(MessySignal::RandomToken));
        assert_eq!(classify("1700000000123"), Some(MessySignal::RandomToken));
    }

    #[test]
    fn long_and_symbol_heavy_stems_are_messy() {
        assert_eq!(
            classify("a very long holiday photo name"),
            Some(MessySignal::TooLong)
        );
        assert_eq!(classify("pic(1)"), Some(MessySignal::OddSymbols));
        assert_eq!(classify("a?b?c?"), Some(MessySignal::ManySymbols));
    }

    #[test]
    fn unstructured_alnum_blob_is_messy() {
        assert_eq!(classify("summer2024"), None);
        assert_eq!(classify("QmXoypizjWknFiJnKL9"), Some(MessySignal::RandomToken));
        assert_eq!(classify("résumé2024photoxyz"), Some(MessySignal::Unstructured));
    }

    #[test]
    fn camera_tokens_need_a_digit() {
        assert_eq!(classify("IMG_1234"), Some(MessySignal::CameraToken));
        assert_eq!(classify("DSCF0042"), Some(MessySignal::CameraToken));
        assert_eq!(classify("imagery"), None);
    }

    #[test]
    fn meaningful_names_are_clean() {
        assert_eq!(classify("sunset_beach"), None);
        assert_eq!(classify("family-2024"), None);
        assert_eq!(classify(""), None);
    }

    #[test]
    fn extra_tokens_extend_camera_list() {
        let rules = MessyRules::with_extra_tokens(&[" Scan ".to_string(), String::new()]);
        assert_eq!(rules.classify("scan_07"), Some(MessySignal::CameraToken));
        assert!(!MessyRules::default().is_messy("scan_07"));
    }

    #[test]
    fn detects_cjk_scripts() {
        assert!(contains_cjk("夕阳"));
        assert!(contains_cjk("しゃしん"));
        assert!(contains_cjk("사진"));
        assert!(!contains_cjk("sunset"));
    }
}
