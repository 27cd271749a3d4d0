//! Press signal decoding and burst classification.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::DEFAULT_PRESS_PATTERN;

#[allow(clippy::expect_used)]
static DEFAULT_PRESS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_PRESS_PATTERN).expect("default press pattern is valid"));

/// Outcome of decoding one characteristic notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A button press.
    Press,
    /// Anything else the peripheral sends; dropped without touching state.
    Ignored(String),
}

/// Turns raw notification bytes into [`Notification`]s.
#[derive(Debug, Clone)]
pub struct PressDecoder {
    pattern: Regex,
}

impl Default for PressDecoder {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PRESS_REGEX.clone(),
        }
    }
}

impl PressDecoder {
    /// Decoder matching trimmed payload text against `pattern`.
    #[must_use]
    pub const fn new(pattern: Regex) -> Self {
        Self { pattern }
    }

    /// Decode a payload. Invalid UTF-8 is replaced, never rejected.
    #[must_use]
    pub fn decode(&self, payload: &[u8]) -> Notification {
        let text = String::from_utf8_lossy(payload);
        let text = text.trim();
        if self.pattern.is_match(text) {
            Notification::Press
        } else {
            Notification::Ignored(text.to_string())
        }
    }
}

/// Meaning of a completed press burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Two presses: UI-level alert navigation.
    Double,
    /// Three presses: emergency dispatch.
    Triple,
    /// Any other count.
    Other(u32),
}

impl Classification {
    /// Classify the number of presses in one burst.
    #[must_use]
    pub const fn from_count(count: u32) -> Self {
        match count {
            2 => Self::Double,
            3 => Self::Triple,
            n => Self::Other(n),
        }
    }

    /// Whether this burst must send an emergency alert.
    #[must_use]
    pub const fn triggers_emergency(self) -> bool {
        matches!(self, Self::Triple)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_press_signal() {
        let decoder = PressDecoder::default();
        assert_eq!(decoder.decode(b"Button Pressed!"), Notification::Press);
        assert_eq!(decoder.decode(b"  Button Pressed!\r\n"), Notification::Press);
    }

    #[test]
    fn test_decode_ignores_other_payloads() {
        let decoder = PressDecoder::default();
        assert_eq!(
            decoder.decode(b"Battery: 80%"),
            Notification::Ignored("Battery: 80%".to_string())
        );
        assert_eq!(decoder.decode(b""), Notification::Ignored(String::new()));
        assert!(matches!(
            decoder.decode(b"Button Pressed!!"),
            Notification::Ignored(_)
        ));
        assert!(matches!(
            decoder.decode(&[0xff, 0xfe, 0x00]),
            Notification::Ignored(_)
        ));
    }

    #[test]
    fn test_custom_pattern() {
        let decoder = PressDecoder::new(Regex::new("^(PRESS|CLICK)$").unwrap());
        assert_eq!(decoder.decode(b"CLICK"), Notification::Press);
        assert!(matches!(
            decoder.decode(b"Button Pressed!"),
            Notification::Ignored(_)
        ));
    }

    #[test]
    fn test_classification() {
        assert_eq!(Classification::from_count(1), Classification::Other(1));
        assert_eq!(Classification::from_count(2), Classification::Double);
        assert_eq!(Classification::from_count(3), Classification::Triple);
        assert_eq!(Classification::from_count(4), Classification::Other(4));
        assert_eq!(Classification::from_count(9), Classification::Other(9));

        assert!(Classification::Triple.triggers_emergency());
        assert!(!Classification::Double.triggers_emergency());
        assert!(!Classification::Other(4).triggers_emergency());
    }
}
