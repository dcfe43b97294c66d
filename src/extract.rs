//! Field extractors
//!
//! Each multi-step dialogue reads exactly one field per turn through one of
//! these. Extractors are heuristic keyword/pattern matchers, kept apart from
//! the agent state machines so they can be swapped and tested in isolation.
//! `None` always means "ask again", never "guess".

use crate::models::{DebtStatus, EmploymentType};
use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"\d[\d.,]*").expect("valid number pattern");
    static ref INTEGER: Regex = Regex::new(r"\b\d+\b").expect("valid integer pattern");
    static ref ISO_DATE: Regex =
        Regex::new(r"\b(\d{4})[-/](\d{1,2})[-/](\d{1,2})\b").expect("valid ISO date pattern");
    static ref DAY_FIRST_DATE: Regex =
        Regex::new(r"\b(\d{1,2})[/.-](\d{1,2})[/.-](\d{4})\b").expect("valid day-first pattern");
    static ref CURRENCY_CODE: Regex = Regex::new(r"^[a-z]{3}$").expect("valid code pattern");
}

/// Reads one typed field out of a free-text utterance.
pub trait Extractor: Send + Sync {
    type Output;

    fn extract(&self, text: &str) -> Option<Self::Output>;
}

/// Lower-cased word tokens; apostrophes stay inside words ("don't").
pub fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect()
}

pub fn contains_any_word(tokens: &[String], vocabulary: &[&str]) -> bool {
    tokens.iter().any(|t| vocabulary.contains(&t.as_str()))
}

pub fn contains_any_phrase(text: &str, phrases: &[&str]) -> bool {
    let lower = text.to_lowercase();
    phrases.iter().any(|p| lower.contains(p))
}

//
// ================= Customer Id =================
//

/// An identifier of exactly `length` digits; dots, dashes, slashes and
/// spaces are ignored.
pub struct CustomerIdExtractor {
    pub length: usize,
}

impl Default for CustomerIdExtractor {
    fn default() -> Self {
        Self { length: 11 }
    }
}

impl Extractor for CustomerIdExtractor {
    type Output = String;

    fn extract(&self, text: &str) -> Option<String> {
        let cleaned: String = text
            .trim()
            .chars()
            .filter(|c| !matches!(c, '.' | '-' | '/' | ' '))
            .collect();

        if cleaned.len() == self.length && cleaned.chars().all(|c| c.is_ascii_digit()) {
            Some(cleaned)
        } else {
            None
        }
    }
}

//
// ================= Birthdate =================
//

/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `DD/MM/YYYY`, `DD-MM-YYYY` and
/// `DD.MM.YYYY`. Impossible or future dates are rejected.
pub struct BirthdateExtractor;

impl Extractor for BirthdateExtractor {
    type Output = NaiveDate;

    fn extract(&self, text: &str) -> Option<NaiveDate> {
        let cleaned = text.trim().replace(['"', '\''], "");

        let (year, month, day) = if let Some(caps) = ISO_DATE.captures(&cleaned) {
            (caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?)
        } else if let Some(caps) = DAY_FIRST_DATE.captures(&cleaned) {
            (caps[3].parse().ok()?, caps[2].parse().ok()?, caps[1].parse().ok()?)
        } else {
            return None;
        };

        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        if date > Utc::now().date_naive() {
            return None;
        }
        Some(date)
    }
}

//
// ================= Money =================
//

const ZERO_WORDS: &[&str] = &["zero", "none", "nothing", "nil"];

/// Normalises `8,000`, `8.000,50`, `1500.50` and friends to an `f64`.
fn normalize_number(raw: &str) -> Option<f64> {
    let raw = raw.trim_end_matches(['.', ',']);
    let has_dot = raw.contains('.');
    let has_comma = raw.contains(',');

    let normalized = if has_dot && has_comma {
        let dot = raw.rfind('.')?;
        let comma = raw.rfind(',')?;
        if comma > dot {
            raw.replace('.', "").replace(',', ".")
        } else {
            raw.replace(',', "")
        }
    } else if has_dot || has_comma {
        let sep = if has_dot { '.' } else { ',' };
        let occurrences = raw.matches(sep).count();
        let tail = raw.rsplit(sep).next().unwrap_or_default();
        if occurrences > 1 || tail.len() == 3 {
            raw.replace(sep, "")
        } else {
            raw.replace(sep, ".")
        }
    } else {
        raw.to_string()
    };

    normalized.parse::<f64>().ok()
}

/// First monetary amount in the text. Understands a `k` / `thousand`
/// multiplier and the words "zero" / "none".
pub struct MoneyExtractor;

impl Extractor for MoneyExtractor {
    type Output = f64;

    fn extract(&self, text: &str) -> Option<f64> {
        let lower = text.to_lowercase();

        let Some(found) = NUMBER.find(&lower) else {
            return contains_any_word(&words(&lower), ZERO_WORDS).then_some(0.0);
        };

        let mut value = normalize_number(found.as_str())?;
        let rest = lower[found.end()..].trim_start();
        if rest.starts_with("thousand")
            || (rest.starts_with('k') && !rest[1..].starts_with(|c: char| c.is_alphabetic()))
        {
            value *= 1000.0;
        }

        (value >= 0.0 && value.is_finite()).then_some(value)
    }
}

/// A requested credit limit. Stricter than [`MoneyExtractor`]: utterances of
/// two characters or fewer are menu picks, not amounts, and the value must
/// lie in the plausible range.
pub struct CreditAmountExtractor {
    pub min: f64,
    pub max: f64,
}

impl Default for CreditAmountExtractor {
    fn default() -> Self {
        Self {
            min: 1_000.0,
            max: 1_000_000.0,
        }
    }
}

impl Extractor for CreditAmountExtractor {
    type Output = f64;

    fn extract(&self, text: &str) -> Option<f64> {
        if text.trim().chars().count() <= 2 {
            return None;
        }
        let value = MoneyExtractor.extract(text)?;
        (self.min..=self.max).contains(&value).then_some(value)
    }
}

//
// ================= Employment =================
//

const UNEMPLOYED_WORDS: &[&str] = &["unemployed", "jobless"];
const UNEMPLOYED_PHRASES: &[&str] = &["no job", "not working", "without a job", "out of work"];
const SELF_EMPLOYED_WORDS: &[&str] = &["freelancer", "freelance", "autonomous", "contractor"];
const SELF_EMPLOYED_PHRASES: &[&str] = &["self-employed", "self employed", "own business"];
const FORMAL_WORDS: &[&str] = &["formal", "employed", "salaried", "registered", "employee", "clt"];
const FORMAL_PHRASES: &[&str] = &["full-time", "full time"];

/// Unemployment is checked first and self-employment before formal, since
/// "unemployed" and "self-employed" both contain "employed".
pub struct EmploymentExtractor;

impl Extractor for EmploymentExtractor {
    type Output = EmploymentType;

    fn extract(&self, text: &str) -> Option<EmploymentType> {
        let tokens = words(text);

        if contains_any_word(&tokens, UNEMPLOYED_WORDS) || contains_any_phrase(text, UNEMPLOYED_PHRASES) {
            Some(EmploymentType::Unemployed)
        } else if contains_any_word(&tokens, SELF_EMPLOYED_WORDS)
            || contains_any_phrase(text, SELF_EMPLOYED_PHRASES)
        {
            Some(EmploymentType::SelfEmployed)
        } else if contains_any_word(&tokens, FORMAL_WORDS) || contains_any_phrase(text, FORMAL_PHRASES) {
            Some(EmploymentType::Formal)
        } else {
            None
        }
    }
}

//
// ================= Dependents =================
//

const NUMBER_WORDS: &[(&str, u32)] = &[
    ("zero", 0),
    ("none", 0),
    ("no", 0),
    ("nobody", 0),
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
];

/// A small non-negative count, as digits or a number word.
pub struct CountExtractor {
    pub max: u32,
}

impl Default for CountExtractor {
    fn default() -> Self {
        Self { max: 20 }
    }
}

impl Extractor for CountExtractor {
    type Output = u32;

    fn extract(&self, text: &str) -> Option<u32> {
        if let Some(found) = INTEGER.find(text) {
            let value: u32 = found.as_str().parse().ok()?;
            return (value <= self.max).then_some(value);
        }

        words(text).iter().find_map(|token| {
            NUMBER_WORDS
                .iter()
                .find(|(word, _)| word == token)
                .map(|(_, n)| *n)
        })
    }
}

//
// ================= Yes / No =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    Yes,
    No,
}

impl From<YesNo> for DebtStatus {
    fn from(answer: YesNo) -> Self {
        match answer {
            YesNo::Yes => DebtStatus::Yes,
            YesNo::No => DebtStatus::No,
        }
    }
}

const NEGATIVE_WORDS: &[&str] = &[
    "no", "nope", "not", "none", "never", "without", "don't", "dont", "nothing", "zero", "free",
    "nah",
];
const POSITIVE_WORDS: &[&str] = &["yes", "yeah", "yep", "yup", "sure", "have", "do", "some", "ok", "okay"];

/// Negative phrasing wins: "no, I don't have any" contains "have".
pub struct YesNoExtractor;

impl Extractor for YesNoExtractor {
    type Output = YesNo;

    fn extract(&self, text: &str) -> Option<YesNo> {
        let tokens = words(text);
        if contains_any_word(&tokens, NEGATIVE_WORDS) {
            Some(YesNo::No)
        } else if contains_any_word(&tokens, POSITIVE_WORDS) {
            Some(YesNo::Yes)
        } else {
            None
        }
    }
}

//
// ================= Currencies =================
//

/// ISO codes the currency desk will quote.
pub const KNOWN_CURRENCIES: &[&str] = &[
    "BRL", "USD", "EUR", "GBP", "JPY", "CNY", "ARS", "CAD", "AUD", "CHF",
];

const CURRENCY_ALIASES: &[(&str, &str)] = &[
    ("real", "BRL"),
    ("reais", "BRL"),
    ("dollar", "USD"),
    ("dollars", "USD"),
    ("buck", "USD"),
    ("bucks", "USD"),
    ("euro", "EUR"),
    ("euros", "EUR"),
    ("pound", "GBP"),
    ("pounds", "GBP"),
    ("sterling", "GBP"),
    ("yen", "JPY"),
    ("yuan", "CNY"),
    ("renminbi", "CNY"),
    ("peso", "ARS"),
    ("pesos", "ARS"),
    ("franc", "CHF"),
    ("francs", "CHF"),
];

/// Currency codes in order of appearance, without duplicates. Three-letter
/// tokens only count when they are known codes, so "ATM" or "the" never
/// become currencies.
pub struct CurrencyExtractor;

impl Extractor for CurrencyExtractor {
    type Output = Vec<String>;

    fn extract(&self, text: &str) -> Option<Vec<String>> {
        let prepared = text
            .to_lowercase()
            .replace("us$", " usd ")
            .replace("r$", " brl ");
        let tokens = words(&prepared);

        let mut codes: Vec<String> = Vec::new();
        let mut push = |code: &str| {
            if !codes.iter().any(|c| c == code) {
                codes.push(code.to_string());
            }
        };

        let mut i = 0;
        while i < tokens.len() {
            let token = tokens[i].as_str();
            let next_is_dollar = tokens
                .get(i + 1)
                .map(|t| t == "dollar" || t == "dollars")
                .unwrap_or(false);

            match token {
                "canadian" | "australian" => {
                    push(if token == "canadian" { "CAD" } else { "AUD" });
                    if next_is_dollar {
                        i += 1;
                    }
                }
                _ => {
                    if let Some((_, code)) = CURRENCY_ALIASES.iter().find(|(alias, _)| *alias == token) {
                        push(code);
                    } else if CURRENCY_CODE.is_match(token) {
                        let upper = token.to_uppercase();
                        if KNOWN_CURRENCIES.contains(&upper.as_str()) {
                            push(&upper);
                        }
                    }
                }
            }
            i += 1;
        }

        Some(codes)
    }
}
