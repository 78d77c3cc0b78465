//! Spelling out numerals as English words.
//!
//! Follows the reading rules of the `g2p_en` normalizer: currency first,
//! then decimals, ordinals and plain cardinals, with four-digit values
//! between 1001 and 2999 read as years.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Strategy for replacing numeric literals with words.
pub trait NumberExpander: Send + Sync {
    /// Return `text` with every numeric literal spelled out.
    ///
    /// The output must contain no ASCII digits.
    fn expand(&self, text: &str) -> String;
}

static COMMA_NUMBER: LazyLock<Regex> = LazyLock::new(|| compile(r"([0-9][0-9,]+[0-9])"));
static POUNDS: LazyLock<Regex> = LazyLock::new(|| compile(r"£([0-9,]*[0-9]+)"));
static DOLLARS: LazyLock<Regex> = LazyLock::new(|| compile(r"\$([0-9.,]*[0-9]+)"));
static DECIMAL: LazyLock<Regex> = LazyLock::new(|| compile(r"([0-9]+\.[0-9]+)"));
static ORDINAL: LazyLock<Regex> = LazyLock::new(|| compile(r"[0-9]+(st|nd|rd|th)"));
static NUMBER: LazyLock<Regex> = LazyLock::new(|| compile(r"[0-9]+"));

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static number pattern is valid")
}

const ONES: [&str; 20] = [
    "zero",
    "one",
    "two",
    "three",
    "four",
    "five",
    "six",
    "seven",
    "eight",
    "nine",
    "ten",
    "eleven",
    "twelve",
    "thirteen",
    "fourteen",
    "fifteen",
    "sixteen",
    "seventeen",
    "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const SCALES: [&str; 7] = [
    "",
    "thousand",
    "million",
    "billion",
    "trillion",
    "quadrillion",
    "quintillion",
];

/// English cardinal, ordinal and currency readings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishNumbers;

impl NumberExpander for EnglishNumbers {
    fn expand(&self, text: &str) -> String {
        let text = COMMA_NUMBER.replace_all(text, |caps: &Captures| caps[1].replace(',', ""));
        let text = POUNDS.replace_all(&text, "$1 pounds");
        let text = DOLLARS.replace_all(&text, |caps: &Captures| expand_dollars(&caps[1]));
        let text = DECIMAL.replace_all(&text, |caps: &Captures| caps[1].replace('.', " point "));
        let text = ORDINAL.replace_all(&text, |caps: &Captures| {
            let digits = caps[0].trim_end_matches(char::is_alphabetic);
            match digits.parse::<u64>() {
                Ok(n) => ordinal(n),
                Err(_) => spell_digits(digits),
            }
        });
        NUMBER
            .replace_all(&text, |caps: &Captures| expand_number(&caps[0]))
            .into_owned()
    }
}

fn expand_dollars(amount: &str) -> String {
    let parts: Vec<&str> = amount.split('.').collect();
    if parts.len() > 2 {
        return format!("{amount} dollars");
    }
    let dollars = parse_or_zero(parts[0]);
    let cents = parts.get(1).map_or(0, |c| parse_or_zero(c));
    let dollar_unit = if dollars == 1 { "dollar" } else { "dollars" };
    let cent_unit = if cents == 1 { "cent" } else { "cents" };
    match (dollars, cents) {
        (0, 0) => "zero dollars".to_string(),
        (d, 0) => format!("{d} {dollar_unit}"),
        (0, c) => format!("{c} {cent_unit}"),
        (d, c) => format!("{d} {dollar_unit}, {c} {cent_unit}"),
    }
}

fn parse_or_zero(digits: &str) -> u64 {
    let digits: String = digits.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

fn expand_number(digits: &str) -> String {
    let Ok(n) = digits.parse::<u64>() else {
        return spell_digits(digits);
    };
    if n > 1000 && n < 3000 {
        if n == 2000 {
            "two thousand".to_string()
        } else if n > 2000 && n < 2010 {
            format!("two thousand {}", cardinal(n % 100, false))
        } else if n % 100 == 0 {
            format!("{} hundred", cardinal(n / 100, false))
        } else {
            let low = n % 100;
            let low = if low < 10 {
                format!("oh {}", ONES[low as usize])
            } else {
                cardinal(low, false)
            };
            format!("{} {}", cardinal(n / 100, false), low)
        }
    } else {
        cardinal(n, false)
    }
}

/// Digit-by-digit reading for literals too long for `u64`.
fn spell_digits(digits: &str) -> String {
    digits
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| ONES[d as usize])
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cardinal words for `n`, e.g. `121` → `one hundred twenty-one`.
///
/// With `with_and`, a British-style "and" joins hundreds to the remainder.
pub fn cardinal(n: u64, with_and: bool) -> String {
    if n == 0 {
        return ONES[0].to_string();
    }

    let mut groups = Vec::new();
    let mut rest = n;
    while rest > 0 {
        groups.push((rest % 1000) as usize);
        rest /= 1000;
    }

    let mut words: Vec<String> = Vec::new();
    for (scale, &group) in groups.iter().enumerate().rev() {
        if group == 0 {
            continue;
        }
        words.push(below_thousand(group, with_and));
        if scale > 0 {
            words.push(SCALES[scale].to_string());
        }
    }
    words.join(" ")
}

fn below_thousand(n: usize, with_and: bool) -> String {
    let hundreds = n / 100;
    let rest = n % 100;
    let mut out = String::new();
    if hundreds > 0 {
        out.push_str(ONES[hundreds]);
        out.push_str(" hundred");
        if rest > 0 {
            out.push_str(if with_and { " and " } else { " " });
        }
    }
    if rest > 0 || hundreds == 0 {
        out.push_str(&below_hundred(rest));
    }
    out
}

fn below_hundred(n: usize) -> String {
    if n < 20 {
        ONES[n].to_string()
    } else if n % 10 == 0 {
        TENS[n / 10].to_string()
    } else {
        format!("{}-{}", TENS[n / 10], ONES[n % 10])
    }
}

/// Ordinal words for `n`, e.g. `21` → `twenty-first`.
pub fn ordinal(n: u64) -> String {
    let words = cardinal(n, true);
    let split = words
        .rfind(|c: char| c == ' ' || c == '-')
        .map_or(0, |i| i + 1);
    let (head, last) = words.split_at(split);
    let last = match last {
        "one" => "first".to_string(),
        "two" => "second".to_string(),
        "three" => "third".to_string(),
        "five" => "fifth".to_string(),
        "eight" => "eighth".to_string(),
        "nine" => "ninth".to_string(),
        "twelve" => "twelfth".to_string(),
        word if word.ends_with('y') => format!("{}ieth", &word[..word.len() - 1]),
        word => format!("{word}th"),
    };
    format!("{head}{last}")
}
