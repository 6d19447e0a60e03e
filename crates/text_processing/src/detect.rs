//! Script-based language detection

use std::collections::HashMap;

use zonos_tts_core::LanguageTag;

/// Unicode scripts the detector distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    Latin,
    Cyrillic,
    Greek,
    Arabic,
    Hebrew,
    Devanagari,
    Bengali,
    Tamil,
    Thai,
    Hangul,
    Kana,
    Han,
}

/// Script-based language detector
#[derive(Debug, Clone)]
pub struct ScriptDetector {
    script_to_language: HashMap<Script, &'static str>,
    max_scan_chars: usize,
}

impl ScriptDetector {
    /// Create a new script detector that inspects at most `max_scan_chars` letters
    pub fn new(max_scan_chars: usize) -> Self {
        let mut map = HashMap::new();
        map.insert(Script::Latin, "en-us");
        map.insert(Script::Cyrillic, "ru");
        map.insert(Script::Greek, "el");
        map.insert(Script::Arabic, "ar");
        map.insert(Script::Devanagari, "hi");
        map.insert(Script::Bengali, "bn");
        map.insert(Script::Tamil, "ta");
        // Hebrew and Thai are counted but the model has no voice for them
        map.insert(Script::Hangul, "ko");
        map.insert(Script::Kana, "ja");
        map.insert(Script::Han, "cmn");

        Self {
            script_to_language: map,
            max_scan_chars,
        }
    }

    /// Detect language from text based on script
    pub fn detect(&self, text: &str) -> Option<LanguageTag> {
        self.detect_with_confidence(text).map(|(lang, _)| lang)
    }

    /// Dominant script and its share of the inspected letters
    pub fn detect_script(&self, text: &str) -> Option<(Script, f32)> {
        let (counts, total) = self.script_counts(text);
        if total == 0 {
            return None;
        }

        let kana = counts.get(&Script::Kana).copied().unwrap_or(0);

        let (mut script, mut count) = counts
            .into_iter()
            .max_by_key(|(script, count)| (*count, Self::tie_break(*script)))?;

        // Japanese mixes kanji with kana; any kana at all means Japanese
        if script == Script::Han && kana > 0 {
            script = Script::Kana;
            count += kana;
        }

        Some((script, count as f32 / total as f32))
    }

    /// Get confidence score for language detection
    pub fn detect_with_confidence(&self, text: &str) -> Option<(LanguageTag, f32)> {
        let (script, confidence) = self.detect_script(text)?;
        let tag = self.script_to_language.get(&script)?;
        let language = LanguageTag::parse(tag).ok()?;
        Some((language, confidence))
    }

    /// Detect if text is code-switched (multiple scripts)
    pub fn is_code_switched(&self, text: &str) -> bool {
        self.script_counts(text).0.len() > 1
    }

    fn script_counts(&self, text: &str) -> (HashMap<Script, usize>, usize) {
        let mut counts: HashMap<Script, usize> = HashMap::new();
        let mut total = 0usize;

        for script in text
            .chars()
            .filter(|c| c.is_alphabetic())
            .take(self.max_scan_chars)
            .filter_map(Self::char_to_script)
        {
            *counts.entry(script).or_insert(0) += 1;
            total += 1;
        }

        (counts, total)
    }

    /// Stable ordering so equal counts never depend on hash order
    fn tie_break(script: Script) -> u8 {
        match script {
            Script::Latin => 0,
            Script::Han => 1,
            _ => 2,
        }
    }

    /// Map character to script based on Unicode range
    fn char_to_script(c: char) -> Option<Script> {
        let code = c as u32;
        let script = match code {
            // ASCII/Latin, Latin-1, Extended A/B, IPA, Latin Extended Additional
            0x0041..=0x024F | 0x1E00..=0x1EFF => Script::Latin,
            // Greek
            0x0370..=0x03FF | 0x1F00..=0x1FFF => Script::Greek,
            // Cyrillic
            0x0400..=0x052F => Script::Cyrillic,
            // Hebrew
            0x0590..=0x05FF => Script::Hebrew,
            // Arabic
            0x0600..=0x06FF | 0x0750..=0x077F | 0x08A0..=0x08FF => Script::Arabic,
            // Devanagari
            0x0900..=0x097F | 0xA8E0..=0xA8FF => Script::Devanagari,
            // Bengali/Assamese
            0x0980..=0x09FF => Script::Bengali,
            // Tamil
            0x0B80..=0x0BFF => Script::Tamil,
            // Thai
            0x0E00..=0x0E7F => Script::Thai,
            // Hangul syllables and jamo
            0x1100..=0x11FF | 0x3130..=0x318F | 0xAC00..=0xD7AF => Script::Hangul,
            // Hiragana, Katakana
            0x3040..=0x30FF | 0x31F0..=0x31FF => Script::Kana,
            // CJK unified ideographs
            0x4E00..=0x9FFF | 0x3400..=0x4DBF => Script::Han,
            _ => return None,
        };
        Some(script)
    }
}

impl Default for ScriptDetector {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_english() {
        let detector = ScriptDetector::default();
        assert_eq!(detector.detect("Hello world").unwrap().as_str(), "en-us");
        assert_eq!(detector.detect_script("Hello world").unwrap().0, Script::Latin);
    }

    #[test]
    fn test_detect_russian() {
        let detector = ScriptDetector::default();
        assert_eq!(detector.detect("Привет, мир!").unwrap().as_str(), "ru");
    }

    #[test]
    fn test_detect_japanese_with_kanji() {
        let detector = ScriptDetector::default();
        // mostly kanji with some hiragana
        assert_eq!(detector.detect("日本語の文章").unwrap().as_str(), "ja");
        assert_eq!(detector.detect("中文句子").unwrap().as_str(), "cmn");
    }

    #[test]
    fn test_detect_korean_and_hindi() {
        let detector = ScriptDetector::default();
        assert_eq!(detector.detect("안녕하세요").unwrap().as_str(), "ko");
        assert_eq!(detector.detect("नमस्ते").unwrap().as_str(), "hi");
    }

    #[test]
    fn test_scripts_without_model_language() {
        let detector = ScriptDetector::default();
        assert_eq!(detector.detect_script("שלום עולם").unwrap().0, Script::Hebrew);
        assert!(detector.detect("שלום עולם").is_none());
        assert_eq!(detector.detect_script("สวัสดีครับ").unwrap().0, Script::Thai);
        assert!(detector.detect("สวัสดีครับ").is_none());
    }

    #[test]
    fn test_nothing_to_detect() {
        let detector = ScriptDetector::default();
        assert!(detector.detect("").is_none());
        assert!(detector.detect("12345 !!! ...").is_none());
    }

    #[test]
    fn test_code_switching() {
        let detector = ScriptDetector::default();
        assert!(detector.is_code_switched("Hello мир"));
        assert!(!detector.is_code_switched("Hello world"));
    }

    #[test]
    fn test_detect_with_confidence() {
        let detector = ScriptDetector::default();

        let (lang, conf) = detector.detect_with_confidence("Привет").unwrap();
        assert_eq!(lang.as_str(), "ru");
        assert!(conf > 0.99);

        let (_lang, conf) = detector.detect_with_confidence("Hello Привет").unwrap();
        assert!(conf < 0.9);
    }

    #[test]
    fn test_scan_is_bounded() {
        let detector = ScriptDetector::new(5);
        // only the first five letters are inspected
        let text = format!("Hello{}", "мир".repeat(100));
        let (lang, conf) = detector.detect_with_confidence(&text).unwrap();
        assert_eq!(lang.as_str(), "en-us");
        assert!((conf - 1.0).abs() < f32::EPSILON);
    }
}
