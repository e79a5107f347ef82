// src/services/title_patterns.rs
//
// Title Pattern Parser
//
// Deterministic series detection from a book title. No I/O, never fails.
//
// CRITICAL RULES:
// - Rules are evaluated in a fixed priority order, first match wins
// - Priority order IS the tie-break: rules are never re-ranked
// - Syntactically specific rules (explicit name + number) come first,
//   bare heuristics last

use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::domain::{DetectionMethod, DetectionResult};

/// Number token: digits (optionally fractional) or a word one..fifteen
pub(crate) const NUM: &str = r"(\d+(?:\.\d+)?|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|thirteen|fourteen|fifteen)\b";

const ORDINAL: &str = r"(first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth|eleventh|twelfth|thirteenth|fourteenth|fifteenth)";

/// Parenthetical contents that describe an edition, not a series
const EDITION_WORDS: &[&str] = &[
    "edition",
    "unabridged",
    "abridged",
    "illustrated",
    "hardcover",
    "paperback",
    "novel",
    "reprint",
    "annotated",
    "omnibus",
    "audiobook",
    "ebook",
    "boxed set",
    "box set",
];

/// Words after which a trailing "I" is a pronoun, not a numeral
const PRONOUN_LEADS: &[&str] = &[
    "am", "and", "as", "because", "but", "can", "could", "did", "do", "how", "if", "may",
    "might", "must", "shall", "should", "so", "than", "that", "what", "when", "where", "who",
    "why", "will", "would", "was", "have", "had", "me", "know",
];

// ============================================================================
// RULE TYPES
// ============================================================================

/// What a single rule extracted from the title
#[derive(Debug, Clone, PartialEq)]
pub enum TitleMatch {
    /// Series name, with the book's position when the rule carries one
    Series { name: String, position: Option<f64> },

    /// Only the book's position is known
    PositionOnly { position: f64 },
}

type Extractor = fn(&Captures) -> Option<TitleMatch>;

struct TitleRule {
    name: &'static str,
    regex: Regex,
    confidence: f64,
    extract: Extractor,
}

/// Ordered rule set. Build once, share everywhere.
pub struct TitlePatterns {
    rules: Vec<TitleRule>,
}

impl Default for TitlePatterns {
    fn default() -> Self {
        let rule = |name: &'static str, pattern: String, confidence: f64, extract: Extractor| TitleRule {
            name,
            regex: Regex::new(&pattern).unwrap(),
            confidence,
            extract,
        };

        Self {
            rules: vec![
                // Title (Series, #N) / Title (Series, Book N)
                rule(
                    "paren_series_comma_number",
                    format!(r"(?i)\(\s*([^()]+?)\s*,\s*(?:#\s*(\d+(?:\.\d+)?)|book\s+{})\s*\)\s*$", NUM),
                    0.9,
                    |c| series_at(c, 1, c.get(2).or_else(|| c.get(3)).map(|m| m.as_str())),
                ),
                // Title (Series #N)
                rule(
                    "paren_series_hash_number",
                    r"\(\s*([^()#]+?)\s+#\s*(\d+(?:\.\d+)?)\s*\)\s*$".to_string(),
                    0.9,
                    |c| series_at(c, 1, c.get(2).map(|m| m.as_str())),
                ),
                // Title: Book N of Series
                rule(
                    "colon_book_of_series",
                    format!(r"(?i)^.+?\s*:\s*book\s+{}\s+of\s+(.+?)\s*$", NUM),
                    0.85,
                    |c| series_at(c, 2, c.get(1).map(|m| m.as_str())),
                ),
                // Series: Book N – Title
                rule(
                    "series_colon_book_number",
                    format!(r"(?i)^([^:]+?)\s*:\s*book\s+{}\s*(?:[-–—:]\s*.*)?$", NUM),
                    0.85,
                    |c| series_at(c, 1, c.get(2).map(|m| m.as_str())),
                ),
                // Series, Book N / Series - Book N
                rule(
                    "series_comma_book_number",
                    format!(r"(?i)^(.+?)\s*(?:,|\s[-–—])\s*book\s+{}\s*$", NUM),
                    0.8,
                    |c| series_at(c, 1, c.get(2).map(|m| m.as_str())),
                ),
                // Title (Series)
                rule(
                    "trailing_paren_name",
                    r"^.+?\s*\(([^()\d]+)\)\s*$".to_string(),
                    0.65,
                    extract_trailing_paren_name,
                ),
                // Series #N
                rule(
                    "series_hash_number",
                    r"^(.+?)\s+#\s*(\d+(?:\.\d+)?)\s*$".to_string(),
                    0.75,
                    |c| series_at(c, 1, c.get(2).map(|m| m.as_str())),
                ),
                // Series, Vol. N / Series, Volume N
                rule(
                    "series_comma_volume",
                    format!(r"(?i)^(.+?)\s*,\s*vol(?:ume|\.)?\s*{}\s*$", NUM),
                    0.8,
                    |c| series_at(c, 1, c.get(2).map(|m| m.as_str())),
                ),
                // Series, Part N
                rule(
                    "series_comma_part",
                    format!(r"(?i)^(.+?)\s*,\s*part\s+{}\s*$", NUM),
                    0.75,
                    |c| series_at(c, 1, c.get(2).map(|m| m.as_str())),
                ),
                // [Series Book N]
                rule(
                    "bracket_series_book",
                    format!(r"(?i)\[\s*([^\[\]]+?)\s+book\s+{}\s*\]", NUM),
                    0.8,
                    |c| series_at(c, 1, c.get(2).map(|m| m.as_str())),
                ),
                // Series IV
                rule(
                    "trailing_roman_numeral",
                    r"^(.+?)[\s,:\-–—]+([IVXL]+)\s*$".to_string(),
                    0.7,
                    extract_roman_suffix,
                ),
                // (Book N) / (#N)
                rule(
                    "paren_position_only",
                    format!(r"(?i)\(\s*(?:book\s+{}|#\s*(\d+(?:\.\d+)?))\s*\)", NUM),
                    0.6,
                    |c| {
                        let token = c.get(1).or_else(|| c.get(2))?;
                        parse_number(token.as_str()).map(|position| TitleMatch::PositionOnly { position })
                    },
                ),
                // Prefix: Subtitle
                rule(
                    "colon_prefix_heuristic",
                    r"^([^:]+?)\s*:\s*\S.*$".to_string(),
                    0.5,
                    extract_colon_prefix,
                ),
                // The First Book / Second Volume
                rule(
                    "ordinal_book",
                    format!(r"(?i)\b{}\s+(?:book|volume|part)\b", ORDINAL),
                    0.7,
                    |c| {
                        let ordinal = c.get(1)?;
                        ordinal_to_number(ordinal.as_str())
                            .map(|n| TitleMatch::PositionOnly { position: n as f64 })
                    },
                ),
            ],
        }
    }
}

impl TitlePatterns {
    /// Shared rule set
    pub fn shared() -> &'static TitlePatterns {
        static PATTERNS: OnceLock<TitlePatterns> = OnceLock::new();
        PATTERNS.get_or_init(TitlePatterns::default)
    }

    /// Run the rules in priority order; the first rule that extracts wins
    pub fn parse(&self, title: &str) -> DetectionResult {
        let title = title.trim();
        if title.is_empty() {
            return DetectionResult::none();
        }

        for rule in &self.rules {
            let Some(captures) = rule.regex.captures(title) else {
                continue;
            };

            let Some(found) = (rule.extract)(&captures) else {
                continue;
            };

            log::trace!("title '{}' matched rule {}", title, rule.name);

            return match found {
                TitleMatch::Series { name, position } => {
                    DetectionResult::named(name, position, DetectionMethod::Pattern, rule.confidence)
                }
                TitleMatch::PositionOnly { position } => {
                    DetectionResult::position_only(position, DetectionMethod::Pattern, rule.confidence)
                }
            };
        }

        DetectionResult::none()
    }

    /// Names of the rules in evaluation order
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }
}

/// Parse a title with the shared rule set
pub fn parse_title(title: &str) -> DetectionResult {
    TitlePatterns::shared().parse(title)
}

// ============================================================================
// EXTRACTORS
// ============================================================================

fn series_at(captures: &Captures, name_group: usize, number: Option<&str>) -> Option<TitleMatch> {
    let name = clean_series_name(captures.get(name_group)?.as_str())?;
    let position = match number {
        Some(token) => Some(parse_number(token)?),
        None => None,
    };
    Some(TitleMatch::Series { name, position })
}

fn extract_trailing_paren_name(captures: &Captures) -> Option<TitleMatch> {
    let inner = captures.get(1)?.as_str().trim();
    let lowered = inner.to_lowercase();

    let positional = ["book ", "volume ", "vol ", "vol.", "part ", "#"];
    if positional.iter().any(|p| lowered.starts_with(p)) || word_to_number(&lowered).is_some() {
        return None;
    }
    if EDITION_WORDS.iter().any(|w| lowered.contains(w)) {
        return None;
    }

    let name = clean_series_name(inner)?;
    Some(TitleMatch::Series { name, position: None })
}

fn extract_roman_suffix(captures: &Captures) -> Option<TitleMatch> {
    let numeral = captures.get(2)?.as_str();
    let position = roman_to_number(numeral).filter(|n| (1..=20).contains(n))?;
    let head = captures.get(1)?.as_str();

    if numeral == "I" {
        let last_word = head.split_whitespace().last()?.to_lowercase();
        if PRONOUN_LEADS.contains(&last_word.as_str()) {
            return None;
        }
    }

    let name = clean_series_name(head)?;
    Some(TitleMatch::Series {
        name,
        position: Some(position as f64),
    })
}

fn extract_colon_prefix(captures: &Captures) -> Option<TitleMatch> {
    static THE_WORD: OnceLock<Regex> = OnceLock::new();
    static COLLECTION_SUFFIX: OnceLock<Regex> = OnceLock::new();

    let prefix = captures.get(1)?.as_str().trim();
    if prefix.split_whitespace().count() > 5 {
        return None;
    }

    let the_word = THE_WORD.get_or_init(|| Regex::new(r"^The\s+\S+$").unwrap());
    let collection = COLLECTION_SUFFIX
        .get_or_init(|| Regex::new(r"(?i)^\S.*\s(series|chronicles|saga)$").unwrap());

    if !the_word.is_match(prefix) && !collection.is_match(prefix) {
        return None;
    }

    let name = clean_series_name(prefix)?;
    Some(TitleMatch::Series { name, position: None })
}

// ============================================================================
// NUMBER HELPERS (shared with the catalog lookups)
// ============================================================================

/// Trim whitespace and trailing separators from a captured name
pub fn clean_series_name(raw: &str) -> Option<String> {
    let cleaned = raw
        .trim()
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ':' | ';' | '-' | '–' | '—'))
        .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ':' | ';' | '-' | '–' | '—'))
        .trim();

    if cleaned.chars().any(|c| c.is_alphanumeric()) {
        Some(cleaned.to_string())
    } else {
        None
    }
}

/// Digits or a number word. Zero is kept for prequels ("#0").
pub fn parse_number(token: &str) -> Option<f64> {
    let token = token.trim();
    if let Ok(n) = token.parse::<f64>() {
        return (n.is_finite() && n >= 0.0).then_some(n);
    }
    word_to_number(token).map(|n| n as f64)
}

/// one..fifteen
pub fn word_to_number(word: &str) -> Option<u32> {
    const WORDS: [&str; 15] = [
        "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven",
        "twelve", "thirteen", "fourteen", "fifteen",
    ];
    let lowered = word.trim().to_lowercase();
    WORDS.iter().position(|w| *w == lowered).map(|i| i as u32 + 1)
}

/// first..fifteenth
pub fn ordinal_to_number(word: &str) -> Option<u32> {
    const ORDINALS: [&str; 15] = [
        "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth",
        "tenth", "eleventh", "twelfth", "thirteenth", "fourteenth", "fifteenth",
    ];
    let lowered = word.trim().to_lowercase();
    ORDINALS.iter().position(|w| *w == lowered).map(|i| i as u32 + 1)
}

/// Standard subtractive notation; non-canonical forms ("IIII", "VX") are rejected
pub fn roman_to_number(numeral: &str) -> Option<u32> {
    fn value(c: char) -> Option<u32> {
        match c {
            'I' => Some(1),
            'V' => Some(5),
            'X' => Some(10),
            'L' => Some(50),
            'C' => Some(100),
            'D' => Some(500),
            'M' => Some(1000),
            _ => None,
        }
    }

    let values = numeral
        .chars()
        .map(value)
        .collect::<Option<Vec<u32>>>()?;
    if values.is_empty() {
        return None;
    }

    let mut total: i64 = 0;
    for (i, current) in values.iter().enumerate() {
        match values.get(i + 1) {
            Some(next) if current < next => total -= i64::from(*current),
            _ => total += i64::from(*current),
        }
    }

    let total = u32::try_from(total).ok().filter(|n| *n > 0)?;
    (to_roman(total) == numeral).then_some(total)
}

fn to_roman(mut n: u32) -> String {
    const TABLE: [(u32, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];

    let mut out = String::new();
    for (value, symbol) in TABLE {
        while n >= value {
            out.push_str(symbol);
            n -= value;
        }
    }
    out
}

/// Best-effort position from free text such as "Book 2", "#3", "Vol. 4",
/// "; 5", "bk. 6", "Part Two" or a bare number
pub fn extract_position(text: &str) -> Option<f64> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

    let patterns = PATTERNS.get_or_init(|| {
        vec![
            Regex::new(&format!(r"(?i)\bbook\s+{}", NUM)).unwrap(),
            Regex::new(r"#\s*(\d+(?:\.\d+)?)").unwrap(),
            Regex::new(&format!(r"(?i)\bvol(?:ume|\.)?\s*{}", NUM)).unwrap(),
            Regex::new(&format!(r"(?i)\bpart\s+{}", NUM)).unwrap(),
            Regex::new(r"(?i)\b(?:bk|no|nr|v)\.?\s*(\d+(?:\.\d+)?)\b").unwrap(),
            Regex::new(r";\s*(\d+(?:\.\d+)?)\b").unwrap(),
            Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*$").unwrap(),
        ]
    });

    patterns
        .iter()
        .filter_map(|re| re.captures(text))
        .find_map(|c| c.get(1).and_then(|m| parse_number(m.as_str())))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn series(title: &str) -> (Option<String>, Option<f64>, f64) {
        let result = parse_title(title);
        (result.series_name, result.position_in_series, result.confidence.score())
    }

    #[test]
    fn test_paren_comma_forms() {
        assert_eq!(
            series("The Way of Kings (The Stormlight Archive, #1)"),
            (Some("The Stormlight Archive".to_string()), Some(1.0), 0.9)
        );
        assert_eq!(
            series("Mort (Discworld, Book 4)"),
            (Some("Discworld".to_string()), Some(4.0), 0.9)
        );
        assert_eq!(
            series("Harry Potter and the Chamber of Secrets (Harry Potter, #2)"),
            (Some("Harry Potter".to_string()), Some(2.0), 0.9)
        );
    }

    #[test]
    fn test_compact_paren_hash() {
        let result = parse_title("Catching Fire (The Hunger Games #2)");
        assert_eq!(result.series_name.as_deref(), Some("The Hunger Games"));
        assert_eq!(result.position_in_series, Some(2.0));
        assert_eq!(result.confidence.score(), 0.9);
        assert_eq!(result.detection_method, DetectionMethod::Pattern);
    }

    #[test]
    fn test_prequel_zero_keeps_series_name() {
        assert_eq!(
            series("New Spring (The Wheel of Time #0)"),
            (Some("The Wheel of Time".to_string()), Some(0.0), 0.9)
        );
        assert_eq!(
            series("Prequel (Discworld, #0)"),
            (Some("Discworld".to_string()), Some(0.0), 0.9)
        );
        assert_eq!(
            series("Origins (Saga, Book 0)"),
            (Some("Saga".to_string()), Some(0.0), 0.9)
        );
    }

    #[test]
    fn test_fractional_novella_position() {
        assert_eq!(
            series("Edge of Dawn (The Hunger Games #1.5)"),
            (Some("The Hunger Games".to_string()), Some(1.5), 0.9)
        );
    }

    #[test]
    fn test_colon_book_forms_with_word_numbers() {
        assert_eq!(
            series("The Expanse: Book One - Leviathan Wakes"),
            (Some("The Expanse".to_string()), Some(1.0), 0.85)
        );
        assert_eq!(
            series("The Eye of the World: Book One of The Wheel of Time"),
            (Some("The Wheel of Time".to_string()), Some(1.0), 0.85)
        );
        assert_eq!(
            series("Earthsea: Book Fourteen"),
            (Some("Earthsea".to_string()), Some(14.0), 0.85)
        );
    }

    #[test]
    fn test_comma_and_dash_book() {
        assert_eq!(series("Mistborn, Book 2"), (Some("Mistborn".to_string()), Some(2.0), 0.8));
        assert_eq!(series("Mistborn - Book 3"), (Some("Mistborn".to_string()), Some(3.0), 0.8));
    }

    #[test]
    fn test_trailing_paren_name_only() {
        assert_eq!(
            series("Ender's Game (Ender's Saga)"),
            (Some("Ender's Saga".to_string()), None, 0.65)
        );
    }

    #[test]
    fn test_edition_parentheticals_are_not_series() {
        let result = parse_title("Moby Dick (Illustrated Edition)");
        assert!(result.is_none());
    }

    #[test]
    fn test_bare_hash() {
        assert_eq!(series("Jack Reacher #4"), (Some("Jack Reacher".to_string()), Some(4.0), 0.75));
    }

    #[test]
    fn test_volume_and_part() {
        assert_eq!(series("Saga, Vol. 3"), (Some("Saga".to_string()), Some(3.0), 0.8));
        assert_eq!(series("Berserk, Volume 12"), (Some("Berserk".to_string()), Some(12.0), 0.8));
        assert_eq!(series("Dune, Part 2"), (Some("Dune".to_string()), Some(2.0), 0.75));
    }

    #[test]
    fn test_bracketed_series_book() {
        assert_eq!(
            series("Guards! Guards! [Discworld Book 8]"),
            (Some("Discworld".to_string()), Some(8.0), 0.8)
        );
    }

    #[test]
    fn test_trailing_roman_numeral() {
        assert_eq!(series("Rocky IV"), (Some("Rocky".to_string()), Some(4.0), 0.7));
        assert_eq!(series("Final Fantasy XII"), (Some("Final Fantasy".to_string()), Some(12.0), 0.7));
        assert!(parse_title("Who Am I").is_none());
    }

    #[test]
    fn test_position_only_forms() {
        let result = parse_title("Untitled Story (Book 3)");
        assert_eq!(result.series_name, None);
        assert_eq!(result.position_in_series, Some(3.0));
        assert_eq!(result.confidence.score(), 0.6);
        assert_eq!(result.detection_method, DetectionMethod::Pattern);

        let result = parse_title("Another Story (#5)");
        assert_eq!(result.position_in_series, Some(5.0));

        let result = parse_title("The First Book of Lost Swords");
        assert_eq!(result.series_name, None);
        assert_eq!(result.position_in_series, Some(1.0));
        assert_eq!(result.confidence.score(), 0.7);
    }

    #[test]
    fn test_colon_prefix_heuristic() {
        assert_eq!(
            series("The Witcher: Blood of Elves"),
            (Some("The Witcher".to_string()), None, 0.5)
        );
        assert_eq!(
            series("Dragon Chronicles: The Awakening"),
            (Some("Dragon Chronicles".to_string()), None, 0.5)
        );
        assert!(parse_title("Sapiens: A Brief History of Humankind").is_none());
    }

    #[test]
    fn test_no_match_is_none() {
        let result = parse_title("Pride and Prejudice");
        assert!(result.is_none());
        assert_eq!(result.confidence.score(), 0.0);
        assert!(parse_title("").is_none());
        assert!(parse_title("   ").is_none());
    }

    #[test]
    fn test_priority_order_breaks_ties() {
        // Both the paren rule and the trailing-roman rule could apply; the
        // paren rule is earlier and wins
        let result = parse_title("Rocky II (Rocky Saga, #2)");
        assert_eq!(result.series_name.as_deref(), Some("Rocky Saga"));
        assert_eq!(result.confidence.score(), 0.9);
    }

    #[test]
    fn test_rule_order_is_stable() {
        let names = TitlePatterns::default().rule_names();
        assert_eq!(names.first(), Some(&"paren_series_comma_number"));
        assert_eq!(names.last(), Some(&"ordinal_book"));
        assert_eq!(names.len(), 14);
    }

    #[test]
    fn test_roman_decoding() {
        assert_eq!(roman_to_number("IV"), Some(4));
        assert_eq!(roman_to_number("IX"), Some(9));
        assert_eq!(roman_to_number("XIV"), Some(14));
        assert_eq!(roman_to_number("XX"), Some(20));
        assert_eq!(roman_to_number("IIII"), None);
        assert_eq!(roman_to_number("VX"), None);
        assert_eq!(roman_to_number(""), None);
    }

    #[test]
    fn test_number_words() {
        assert_eq!(word_to_number("Fifteen"), Some(15));
        assert_eq!(word_to_number("sixteen"), None);
        assert_eq!(ordinal_to_number("Third"), Some(3));
        assert_eq!(parse_number("0"), Some(0.0));
        assert_eq!(parse_number("-1"), None);
        assert_eq!(parse_number("2.5"), Some(2.5));
    }

    #[test]
    fn test_extract_position_from_free_text() {
        assert_eq!(extract_position("Book 2"), Some(2.0));
        assert_eq!(extract_position("The Hunger Games #3"), Some(3.0));
        assert_eq!(extract_position("Harry Potter ; 5"), Some(5.0));
        assert_eq!(extract_position("Discworld, bk. 6"), Some(6.0));
        assert_eq!(extract_position("Part Two"), Some(2.0));
        assert_eq!(extract_position("7"), Some(7.0));
        assert_eq!(extract_position("Discworld"), None);
    }
}
