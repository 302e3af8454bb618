use jieba_rs::Jieba;
use pinyin::ToPinyin;

/// Token inserted between consecutive romanized syllables.
const SPACE: &str = " ";

/// Splits mixed Chinese/Latin text into the tokens the F5 vocabulary is built from.
///
/// Latin text is kept character by character. Each Chinese ideograph becomes
/// one pinyin syllable with a trailing tone number (`ni3`, `lv4`), and
/// syllables are separated by single space tokens.
pub struct PhoneticTokenizer {
    jieba: Jieba,
}

impl Default for PhoneticTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PhoneticTokenizer {
    /// Create a tokenizer with the bundled segmentation dictionary.
    pub fn new() -> Self {
        Self { jieba: Jieba::new() }
    }

    /// Tokenize each text independently.
    pub fn tokenize_batch<S: AsRef<str>>(&self, texts: &[S]) -> Vec<Vec<String>> {
        texts.iter().map(|t| self.tokenize(t.as_ref())).collect()
    }

    /// Tokenize one text.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = text.replace(';', ",");

        let mut raw = Vec::new();
        for segment in self.jieba.cut(&normalized, false) {
            push_segment(segment, &mut raw);
        }

        collapse_spaces(raw)
    }
}

fn push_segment(segment: &str, tokens: &mut Vec<String>) {
    if is_latin_segment(segment) {
        tokens.extend(segment.chars().map(String::from));
        return;
    }

    for ch in segment.chars() {
        if is_cjk_ideograph(ch) {
            push_syllable(tokens, romanize(ch));
        } else {
            // CJK punctuation and everything else pass through untouched
            tokens.push(ch.to_string());
        }
    }
}

fn push_syllable(tokens: &mut Vec<String>, syllable: String) {
    if tokens.last().is_some_and(|prev| !is_punctuation_token(prev)) {
        tokens.push(SPACE.to_string());
    }
    tokens.push(syllable);
}

/// Drop empty tokens, a leading space, and spaces that directly follow punctuation.
fn collapse_spaces(raw: Vec<String>) -> Vec<String> {
    let mut result = Vec::with_capacity(raw.len());
    let mut previous: Option<&str> = None;

    for token in &raw {
        // a space leading the text or following punctuation is dropped
        let drop_space = previous.map_or(true, is_punctuation_token);
        previous = Some(token.as_str());
        if token.is_empty() || (token == SPACE && drop_space) {
            continue;
        }
        result.push(token.clone());
    }

    result
}

/// First reading of `ch` with the tone as a trailing digit, `ü` spelled `v`.
fn romanize(ch: char) -> String {
    match ch.to_pinyin() {
        Some(py) => py.with_tone_num_end().replace('ü', "v"),
        None => {
            log::debug!("No pinyin reading for {ch:?}, keeping the character");
            ch.to_string()
        }
    }
}

/// Segment made only of Latin-1 characters, excluding CJK punctuation.
fn is_latin_segment(segment: &str) -> bool {
    segment
        .chars()
        .all(|c| (c as u32) < 0x100 && !is_cjk_punctuation(c))
}

fn is_cjk_ideograph(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}')
}

/// CJK symbols and punctuation, plus the full-width forms block.
fn is_cjk_punctuation(c: char) -> bool {
    matches!(c, '\u{3000}'..='\u{303F}' | '\u{FF00}'..='\u{FFEF}')
}

/// Unicode punctuation (connector, dash, open/close, quote, other).
fn is_unicode_punctuation(c: char) -> bool {
    match c {
        '!' | '"' | '#' | '%' | '&' | '\'' | '(' | ')' | '*' | ',' | '-' | '.' | '/' | ':'
        | ';' | '?' | '@' | '[' | '\\' | ']' | '_' | '{' | '}' => true,
        '¡' | '§' | '«' | '¶' | '·' | '»' | '¿' => true,
        '\u{2010}'..='\u{2027}'
        | '\u{2030}'..='\u{2043}'
        | '\u{2045}'..='\u{2051}'
        | '\u{2053}'..='\u{205E}'
        | '\u{2E00}'..='\u{2E2E}'
        | '\u{2E30}'..='\u{2E4F}' => true,
        // vertical forms, CJK compatibility forms, small form variants
        '\u{FE10}'..='\u{FE19}'
        | '\u{FE30}'..='\u{FE52}'
        | '\u{FE54}'..='\u{FE61}'
        | '\u{FE63}'
        | '\u{FE68}'
        | '\u{FE6A}'..='\u{FE6B}' => true,
        _ => false,
    }
}

fn is_punctuation_token(token: &str) -> bool {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => is_unicode_punctuation(c) || is_cjk_punctuation(c),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{collapse_spaces, is_punctuation_token, romanize, PhoneticTokenizer};

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn latin_text_is_split_per_character() {
        let tokenizer = PhoneticTokenizer::new();
        for text in ["ab", "Hello world", "In short we embarked", "x-y_z (ok)"] {
            let tokens = tokenizer.tokenize(text);
            assert_eq!(tokens.len(), text.chars().count(), "{text:?}");
            assert_eq!(tokens.concat(), text);
        }
    }

    #[test]
    fn semicolon_becomes_comma() {
        let tokenizer = PhoneticTokenizer::new();
        assert_eq!(tokenizer.tokenize("a;b"), strings(&["a", ",", "b"]));
    }

    #[test]
    fn space_after_ascii_punctuation_is_dropped() {
        let tokenizer = PhoneticTokenizer::new();
        assert_eq!(tokenizer.tokenize("a, b").concat(), "a,b");
    }

    #[test]
    fn chinese_becomes_spaced_syllables() {
        let tokenizer = PhoneticTokenizer::new();
        assert_eq!(tokenizer.tokenize("你好"), strings(&["ni3", " ", "hao3"]));
    }

    #[test]
    fn mixed_text_keeps_latin_letters_and_syllables() {
        let tokenizer = PhoneticTokenizer::new();
        let tokens = tokenizer.tokenize("你好, world");
        assert_eq!(
            tokens,
            strings(&["ni3", " ", "hao3", ",", "w", "o", "r", "l", "d"])
        );
    }

    #[test]
    fn no_space_after_chinese_punctuation() {
        let tokenizer = PhoneticTokenizer::new();
        let tokens = tokenizer.tokenize("你好。再见");
        assert_eq!(
            tokens,
            strings(&["ni3", " ", "hao3", "。", "zai4", " ", "jian4"])
        );
    }

    #[test]
    fn umlaut_is_spelled_v() {
        assert_eq!(romanize('绿'), "lv4");
        assert_eq!(romanize('女'), "nv3");
    }

    #[test]
    fn unknown_character_is_kept() {
        let tokenizer = PhoneticTokenizer::new();
        assert_eq!(tokenizer.tokenize("é"), strings(&["é"]));
        assert_eq!(tokenizer.tokenize("ω"), strings(&["ω"]));
    }

    #[test]
    fn batch_tokenizes_each_text() {
        let tokenizer = PhoneticTokenizer::new();
        let batch = tokenizer.tokenize_batch(&["ab", "你"]);
        assert_eq!(batch, vec![strings(&["a", "b"]), strings(&["ni3"])]);
    }

    #[test]
    fn collapse_drops_space_after_punctuation_and_empty_tokens() {
        let raw = strings(&["a", ",", " ", "b", "", " ", "c", "！", " ", "d"]);
        assert_eq!(
            collapse_spaces(raw),
            strings(&["a", ",", "b", " ", "c", "！", "d"])
        );
    }

    #[test]
    fn punctuation_tokens_are_single_chars() {
        assert!(is_punctuation_token(","));
        assert!(is_punctuation_token("。"));
        assert!(is_punctuation_token("，"));
        assert!(is_punctuation_token("—"));
        assert!(!is_punctuation_token(" "));
        assert!(!is_punctuation_token("+"));
        assert!(!is_punctuation_token("ni3"));
        assert!(!is_punctuation_token(",,"));
    }

    #[test]
    fn leading_space_is_dropped() {
        let tokenizer = PhoneticTokenizer::new();
        assert_eq!(tokenizer.tokenize(" hello"), strings(&["h", "e", "l", "l", "o"]));
        assert_eq!(
            collapse_spaces(strings(&[" ", "a", " ", "b"])),
            strings(&["a", " ", "b"])
        );
    }

    #[test]
    fn compatibility_and_small_form_punctuation() {
        for mark in ["\u{FE10}", "\u{FE50}", "\u{FE35}", "\u{FE5D}", "\u{FE6B}", "\u{2E3A}"] {
            assert!(is_punctuation_token(mark), "{mark:?}");
        }
        assert!(!is_punctuation_token("\u{FE62}"));
        assert!(!is_punctuation_token("\u{2E2F}"));

        let tokenizer = PhoneticTokenizer::new();
        assert_eq!(tokenizer.tokenize("\u{FE50}你"), strings(&["\u{FE50}", "ni3"]));
    }
}
