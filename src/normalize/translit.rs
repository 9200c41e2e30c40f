//! Best-effort romanization of non-Latin display text.
//!
//! Strategy selection:
//! - any Hangul syllable (U+AC00..=U+D7AF) → [`HangulRomanizer`]
//! - any other non-ASCII → [`KanaRomanizer`], falling back to
//!   [`GenericTransliterator`] when it cannot handle the text
//!
//! No failure escapes [`Romanizer::romanize`]; the original text is kept.

use serde::Serialize;

/// Transliteration failure (never surfaced past [`Romanizer`]).
#[derive(Debug, Clone, PartialEq)]
pub enum TranslitError {
    /// Text contains characters the strategy has no mapping for
    Unsupported(char),
    /// Strategy produced nothing for non-empty input
    Empty,
}

impl std::fmt::Display for TranslitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslitError::Unsupported(c) => write!(f, "No romanization for U+{:04X}", *c as u32),
            TranslitError::Empty => write!(f, "Transliteration produced empty output"),
        }
    }
}

impl std::error::Error for TranslitError {}

/// A single script strategy.
pub trait Transliterator: Send + Sync {
    fn transliterate(&self, text: &str) -> Result<String, TranslitError>;
}

/// Which strategy produced a romanized string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Text was already ASCII
    Unchanged,
    Korean,
    Japanese,
    Generic,
    /// Every applicable strategy failed; original text kept
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Romanized {
    pub text: String,
    pub strategy: Strategy,
}

/// Script-aware romanizer with pluggable strategies.
pub struct Romanizer {
    korean: Box<dyn Transliterator>,
    japanese: Option<Box<dyn Transliterator>>,
    generic: Box<dyn Transliterator>,
}

impl Default for Romanizer {
    fn default() -> Self {
        Self {
            korean: Box::new(HangulRomanizer),
            japanese: Some(Box::new(KanaRomanizer)),
            generic: Box::new(GenericTransliterator),
        }
    }
}

impl Romanizer {
    pub fn new(
        korean: Box<dyn Transliterator>,
        japanese: Option<Box<dyn Transliterator>>,
        generic: Box<dyn Transliterator>,
    ) -> Self {
        Self {
            korean,
            japanese,
            generic,
        }
    }

    pub fn romanize(&self, text: &str) -> Romanized {
        if text.is_ascii() {
            return Romanized {
                text: text.to_string(),
                strategy: Strategy::Unchanged,
            };
        }

        if text.chars().any(is_hangul) {
            return match self.korean.transliterate(text) {
                Ok(out) => Romanized {
                    text: out,
                    strategy: Strategy::Korean,
                },
                Err(e) => self.keep_original(text, e),
            };
        }

        if let Some(japanese) = &self.japanese {
            match japanese.transliterate(text) {
                Ok(out) => {
                    return Romanized {
                        text: out,
                        strategy: Strategy::Japanese,
                    }
                }
                Err(e) => tracing::debug!(error = %e, "Kana romanization failed, using generic table"),
            }
        }

        match self.generic.transliterate(text) {
            Ok(out) => Romanized {
                text: out,
                strategy: Strategy::Generic,
            },
            Err(e) => self.keep_original(text, e),
        }
    }

    /// Romanized text only.
    pub fn romanize_text(&self, text: &str) -> String {
        self.romanize(text).text
    }

    fn keep_original(&self, text: &str, err: TranslitError) -> Romanized {
        tracing::debug!(error = %err, "Keeping original text");
        Romanized {
            text: text.to_string(),
            strategy: Strategy::Failed,
        }
    }
}

/// Hangul syllable block used for script detection.
pub fn is_hangul(c: char) -> bool {
    ('\u{AC00}'..='\u{D7AF}').contains(&c)
}

/// Generic table-driven transliteration (`deunicode`).
pub struct GenericTransliterator;

impl Transliterator for GenericTransliterator {
    fn transliterate(&self, text: &str) -> Result<String, TranslitError> {
        let out = deunicode::deunicode(text);
        if out.trim().is_empty() && !text.trim().is_empty() {
            return Err(TranslitError::Empty);
        }
        Ok(out)
    }
}

/// Revised Romanization of Korean for precomposed syllables.
///
/// Applies liaison when a final consonant is followed by a silent initial
/// (한국어 → hangugeo). Non-Hangul characters go through the generic table;
/// those without an entry are dropped.
pub struct HangulRomanizer;

const SYLLABLE_BASE: u32 = 0xAC00;
const SYLLABLE_COUNT: u32 = 11172;
const MEDIAL_COUNT: u32 = 21;
const FINAL_COUNT: u32 = 28;
const SILENT_INITIAL: usize = 11;

const INITIALS: [&str; 19] = [
    "g", "kk", "n", "d", "tt", "r", "m", "b", "pp", "s", "ss", "", "j", "jj", "ch", "k", "t", "p",
    "h",
];

const MEDIALS: [&str; 21] = [
    "a", "ae", "ya", "yae", "eo", "e", "yeo", "ye", "o", "wa", "wae", "oe", "yo", "u", "wo", "we",
    "wi", "yu", "eu", "ui", "i",
];

/// Final consonant as pronounced at a syllable end.
const FINALS: [&str; 28] = [
    "", "k", "k", "k", "n", "n", "n", "t", "l", "k", "m", "l", "l", "l", "p", "l", "m", "p", "p",
    "t", "t", "ng", "t", "t", "k", "t", "p", "t",
];

/// (kept in this syllable, carried to a following silent initial)
const LIAISON: [(&str, &str); 28] = [
    ("", ""),
    ("", "g"),
    ("", "kk"),
    ("k", "s"),
    ("", "n"),
    ("n", "j"),
    ("n", ""),
    ("", "d"),
    ("", "r"),
    ("l", "g"),
    ("l", "m"),
    ("l", "b"),
    ("l", "s"),
    ("l", "t"),
    ("l", "p"),
    ("", "r"),
    ("", "m"),
    ("", "b"),
    ("p", "s"),
    ("", "s"),
    ("", "ss"),
    ("ng", ""),
    ("", "j"),
    ("", "ch"),
    ("", "k"),
    ("", "t"),
    ("", "p"),
    ("", ""),
];

struct Syllable {
    initial: usize,
    medial: usize,
    final_: usize,
}

fn decompose(c: char) -> Option<Syllable> {
    let offset = (c as u32).checked_sub(SYLLABLE_BASE)?;
    if offset >= SYLLABLE_COUNT {
        return None;
    }
    Some(Syllable {
        initial: (offset / (MEDIAL_COUNT * FINAL_COUNT)) as usize,
        medial: ((offset % (MEDIAL_COUNT * FINAL_COUNT)) / FINAL_COUNT) as usize,
        final_: (offset % FINAL_COUNT) as usize,
    })
}

impl Transliterator for HangulRomanizer {
    fn transliterate(&self, text: &str) -> Result<String, TranslitError> {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len() * 2);
        let mut carried = "";

        for (i, &c) in chars.iter().enumerate() {
            let Some(syllable) = decompose(c) else {
                carried = "";
                push_generic(&mut out, c);
                continue;
            };

            if syllable.initial == SILENT_INITIAL && !carried.is_empty() {
                out.push_str(carried);
            } else {
                out.push_str(INITIALS[syllable.initial]);
            }
            out.push_str(MEDIALS[syllable.medial]);

            let next_is_silent = chars
                .get(i + 1)
                .and_then(|&n| decompose(n))
                .map(|n| n.initial == SILENT_INITIAL)
                .unwrap_or(false);

            if next_is_silent && syllable.final_ != 0 {
                let (kept, moved) = LIAISON[syllable.final_];
                out.push_str(kept);
                carried = moved;
            } else {
                out.push_str(FINALS[syllable.final_]);
                carried = "";
            }
        }

        if out.trim().is_empty() && !text.trim().is_empty() {
            return Err(TranslitError::Empty);
        }
        Ok(out)
    }
}

/// Characters without a table entry are dropped so the rest of the text
/// still romanizes.
fn push_generic(out: &mut String, c: char) {
    if c.is_ascii() {
        out.push(c);
        return;
    }
    match deunicode::deunicode_char(c) {
        Some(mapped) => out.push_str(mapped),
        None => tracing::debug!(code_point = %c.escape_unicode(), "Dropping unmappable character"),
    }
}

/// Hepburn romanization of hiragana and katakana.
///
/// Handles small-kana digraphs (きゃ → kya), the small tsu geminate
/// (がっこう → gakkou) and the long-vowel mark (ラーメン → raamen).
/// Kanji are not handled and make the whole string fail over to the generic
/// strategy.
pub struct KanaRomanizer;

const KATAKANA_OFFSET: u32 = 0x60;

fn to_hiragana(c: char) -> char {
    match c {
        '\u{30A1}'..='\u{30F6}' => char::from_u32(c as u32 - KATAKANA_OFFSET).unwrap_or(c),
        _ => c,
    }
}

#[rustfmt::skip]
fn kana_syllable(c: char) -> Option<&'static str> {
    let romaji = match c {
        'あ' => "a", 'い' => "i", 'う' => "u", 'え' => "e", 'お' => "o",
        'か' => "ka", 'き' => "ki", 'く' => "ku", 'け' => "ke", 'こ' => "ko",
        'が' => "ga", 'ぎ' => "gi", 'ぐ' => "gu", 'げ' => "ge", 'ご' => "go",
        'さ' => "sa", 'し' => "shi", 'す' => "su", 'せ' => "se", 'そ' => "so",
        'ざ' => "za", 'じ' => "ji", 'ず' => "zu", 'ぜ' => "ze", 'ぞ' => "zo",
        'た' => "ta", 'ち' => "chi", 'つ' => "tsu", 'て' => "te", 'と' => "to",
        'だ' => "da", 'ぢ' => "ji", 'づ' => "zu", 'で' => "de", 'ど' => "do",
        'な' => "na", 'に' => "ni", 'ぬ' => "nu", 'ね' => "ne", 'の' => "no",
        'は' => "ha", 'ひ' => "hi", 'ふ' => "fu", 'へ' => "he", 'ほ' => "ho",
        'ば' => "ba", 'び' => "bi", 'ぶ' => "bu", 'べ' => "be", 'ぼ' => "bo",
        'ぱ' => "pa", 'ぴ' => "pi", 'ぷ' => "pu", 'ぺ' => "pe", 'ぽ' => "po",
        'ま' => "ma", 'み' => "mi", 'む' => "mu", 'め' => "me", 'も' => "mo",
        'や' => "ya", 'ゆ' => "yu", 'よ' => "yo",
        'ら' => "ra", 'り' => "ri", 'る' => "ru", 'れ' => "re", 'ろ' => "ro",
        'わ' => "wa", 'ゐ' => "i", 'ゑ' => "e", 'を' => "o", 'ん' => "n",
        'ゔ' => "vu",
        'ぁ' => "a", 'ぃ' => "i", 'ぅ' => "u", 'ぇ' => "e", 'ぉ' => "o",
        'ゃ' => "ya", 'ゅ' => "yu", 'ょ' => "yo", 'ゎ' => "wa",
        'ゕ' => "ka", 'ゖ' => "ke",
        _ => return None,
    };
    Some(romaji)
}

fn small_y(c: char) -> Option<&'static str> {
    match c {
        'ゃ' => Some("a"),
        'ゅ' => Some("u"),
        'ょ' => Some("o"),
        _ => None,
    }
}

fn japanese_punctuation(c: char) -> Option<&'static str> {
    match c {
        '、' => Some(","),
        '。' => Some("."),
        '・' => Some(" "),
        '「' | '」' | '『' | '』' => Some("\""),
        '！' => Some("!"),
        '？' => Some("?"),
        '〜' | '～' => Some("~"),
        '\u{3000}' => Some(" "),
        _ => None,
    }
}

impl Transliterator for KanaRomanizer {
    fn transliterate(&self, text: &str) -> Result<String, TranslitError> {
        let chars: Vec<char> = text.chars().map(to_hiragana).collect();
        let mut out = String::with_capacity(text.len());
        let mut geminate = false;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];

            if c == 'っ' {
                geminate = true;
                i += 1;
                continue;
            }

            if c == 'ー' {
                if let Some(vowel) = out.chars().last().filter(|v| "aeiou".contains(*v)) {
                    out.push(vowel);
                }
                i += 1;
                continue;
            }

            let Some(base) = kana_syllable(c) else {
                geminate = false;
                if c.is_ascii() {
                    out.push(c);
                } else if let Some(p) = japanese_punctuation(c) {
                    out.push_str(p);
                } else {
                    return Err(TranslitError::Unsupported(c));
                }
                i += 1;
                continue;
            };

            let mut syllable = base.to_string();
            if let Some(vowel) = chars.get(i + 1).copied().and_then(small_y) {
                if let Some(stem) = base.strip_suffix('i').filter(|s| !s.is_empty()) {
                    syllable = if stem.ends_with("sh") || stem.ends_with("ch") || stem == "j" {
                        format!("{}{}", stem, vowel)
                    } else {
                        format!("{}y{}", stem, vowel)
                    };
                    i += 1;
                }
            }

            if geminate {
                match syllable.chars().next() {
                    Some('c') => out.push('t'),
                    Some(first) if !"aeiouny".contains(first) => out.push(first),
                    _ => {}
                }
                geminate = false;
            }

            out.push_str(&syllable);
            i += 1;
        }

        if out.is_empty() && !text.is_empty() {
            return Err(TranslitError::Empty);
        }
        Ok(out)
    }
}
