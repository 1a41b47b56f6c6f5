use serde::{Deserialize, Serialize};

use crate::entropy::shannon_entropy;
use crate::url_parts::{contains_ipv4, UrlParts};

/// Width of the lexical block. Columns `[0, LEXICAL_FEATURE_COUNT)` of every
/// feature matrix hold these values in [`LEXICAL_FEATURE_NAMES`] order.
pub const LEXICAL_FEATURE_COUNT: usize = 34;

pub const LEXICAL_FEATURE_NAMES: [&str; LEXICAL_FEATURE_COUNT] = [
    "url_length",
    "hostname_length",
    "path_length",
    "query_length",
    "num_dots",
    "num_hyphens",
    "num_underscores",
    "num_slashes",
    "num_questionmarks",
    "num_equal",
    "num_at",
    "num_ampersand",
    "num_exclamation",
    "num_space",
    "num_tilde",
    "num_comma",
    "num_plus",
    "num_asterisk",
    "num_hashtag",
    "num_dollar",
    "num_percent",
    "num_digits",
    "num_letters",
    "digit_letter_ratio",
    "domain_length",
    "num_subdomains",
    "tld_length",
    "has_ip",
    "is_https",
    "entropy",
    "path_tokens",
    "has_double_slash_in_path",
    "has_at_symbol",
    "num_params",
];

/// Fixed-schema lexical record for one URL.
///
/// Field order matches [`LEXICAL_FEATURE_NAMES`]; [`LexicalFeatures::to_row`]
/// is the only place that turns the record into positional columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LexicalFeatures {
    pub url_length: usize,
    pub hostname_length: usize,
    pub path_length: usize,
    pub query_length: usize,
    pub num_dots: usize,
    pub num_hyphens: usize,
    pub num_underscores: usize,
    pub num_slashes: usize,
    pub num_questionmarks: usize,
    pub num_equal: usize,
    pub num_at: usize,
    pub num_ampersand: usize,
    pub num_exclamation: usize,
    pub num_space: usize,
    pub num_tilde: usize,
    pub num_comma: usize,
    pub num_plus: usize,
    pub num_asterisk: usize,
    pub num_hashtag: usize,
    pub num_dollar: usize,
    pub num_percent: usize,
    pub num_digits: usize,
    pub num_letters: usize,
    pub digit_letter_ratio: f64,
    pub domain_length: usize,
    pub num_subdomains: usize,
    pub tld_length: usize,
    pub has_ip: bool,
    pub is_https: bool,
    pub entropy: f64,
    pub path_tokens: usize,
    pub has_double_slash_in_path: bool,
    pub has_at_symbol: bool,
    pub num_params: usize,
}

impl LexicalFeatures {
    pub fn to_row(&self) -> [f64; LEXICAL_FEATURE_COUNT] {
        [
            self.url_length as f64,
            self.hostname_length as f64,
            self.path_length as f64,
            self.query_length as f64,
            self.num_dots as f64,
            self.num_hyphens as f64,
            self.num_underscores as f64,
            self.num_slashes as f64,
            self.num_questionmarks as f64,
            self.num_equal as f64,
            self.num_at as f64,
            self.num_ampersand as f64,
            self.num_exclamation as f64,
            self.num_space as f64,
            self.num_tilde as f64,
            self.num_comma as f64,
            self.num_plus as f64,
            self.num_asterisk as f64,
            self.num_hashtag as f64,
            self.num_dollar as f64,
            self.num_percent as f64,
            self.num_digits as f64,
            self.num_letters as f64,
            self.digit_letter_ratio,
            self.domain_length as f64,
            self.num_subdomains as f64,
            self.tld_length as f64,
            bool_to_f64(self.has_ip),
            bool_to_f64(self.is_https),
            self.entropy,
            self.path_tokens as f64,
            bool_to_f64(self.has_double_slash_in_path),
            bool_to_f64(self.has_at_symbol),
            self.num_params as f64,
        ]
    }

    /// Value of a named column, `None` for names outside the schema.
    pub fn get(&self, name: &str) -> Option<f64> {
        let idx = LEXICAL_FEATURE_NAMES.iter().position(|n| *n == name)?;
        Some(self.to_row()[idx])
    }
}

pub fn feature_names() -> Vec<&'static str> {
    LEXICAL_FEATURE_NAMES.to_vec()
}

fn bool_to_f64(v: bool) -> f64 {
    if v {
        1.0
    } else {
        0.0
    }
}

pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn extract(url: &str) -> LexicalFeatures {
        let parts = UrlParts::parse(url);
        Self::extract_with_parts(url, &parts)
    }

    /// Lexical features from an already split URL.
    ///
    /// Character counts always run over the raw input. Lengths, `has_ip`
    /// and the path fields come from the raw split in `parts`; the domain
    /// fields come from its normalised host. All are zero when `parts` is
    /// degraded.
    pub fn extract_with_parts(url: &str, parts: &UrlParts) -> LexicalFeatures {
        let counts = CharCounts::scan(url);
        let host = parts.host_parts();
        LexicalFeatures {
            url_length: counts.total,
            hostname_length: parts.netloc.chars().count(),
            path_length: parts.path.chars().count(),
            query_length: parts.query.chars().count(),
            num_dots: counts.dots,
            num_hyphens: counts.hyphens,
            num_underscores: counts.underscores,
            num_slashes: counts.slashes,
            num_questionmarks: counts.questionmarks,
            num_equal: counts.equals,
            num_at: counts.ats,
            num_ampersand: counts.ampersands,
            num_exclamation: counts.exclamations,
            num_space: counts.spaces,
            num_tilde: counts.tildes,
            num_comma: counts.commas,
            num_plus: counts.pluses,
            num_asterisk: counts.asterisks,
            num_hashtag: counts.hashes,
            num_dollar: counts.dollars,
            num_percent: counts.percents,
            num_digits: counts.digits,
            num_letters: counts.letters,
            digit_letter_ratio: counts.digits as f64 / counts.letters.max(1) as f64,
            domain_length: host.registered_domain().chars().count(),
            num_subdomains: host.subdomain_count(),
            tld_length: host.suffix.chars().count(),
            has_ip: contains_ipv4(&parts.netloc),
            is_https: parts.scheme == "https",
            entropy: shannon_entropy(url),
            path_tokens: path_token_count(&parts.path),
            has_double_slash_in_path: parts.path.contains("//"),
            has_at_symbol: counts.ats > 0,
            num_params: parts.query.matches('=').count(),
        }
    }
}

/// Path segments after splitting on `/`, `-`, `_` and `.`, ignoring empties.
fn path_token_count(path: &str) -> usize {
    path.split(['/', '-', '_', '.'])
        .filter(|t| !t.is_empty())
        .count()
}

/// First code point of each run of ten decimal digits (`Nd`) in the BMP.
const DECIMAL_ZEROS: [u32; 37] = [
    0x0030, 0x0660, 0x06F0, 0x07C0, 0x0966, 0x09E6, 0x0A66, 0x0AE6, 0x0B66, 0x0BE6, 0x0C66,
    0x0CE6, 0x0D66, 0x0DE6, 0x0E50, 0x0ED0, 0x0F20, 0x1040, 0x1090, 0x17E0, 0x1810, 0x1946,
    0x19D0, 0x1A80, 0x1A90, 0x1B50, 0x1BB0, 0x1C40, 0x1C50, 0xA620, 0xA8D0, 0xA900, 0xA9D0,
    0xA9F0, 0xAA50, 0xABF0, 0xFF10,
];

/// Digit-valued symbols that are not decimal digits: super/subscripts and
/// the circled, parenthesised and full-stop digit forms.
const DIGIT_RANGES: [(u32, u32); 14] = [
    (0x00B2, 0x00B3),
    (0x00B9, 0x00B9),
    (0x2070, 0x2070),
    (0x2074, 0x2079),
    (0x2080, 0x2089),
    (0x2460, 0x2468),
    (0x2474, 0x247C),
    (0x2488, 0x2490),
    (0x24EA, 0x24EA),
    (0x24F5, 0x24FD),
    (0x24FF, 0x24FF),
    (0x2776, 0x277E),
    (0x2780, 0x2788),
    (0x278A, 0x2792),
];

/// Decimal digits and digit-valued symbols. Numerals such as `Ⅻ` and
/// fractions such as `½` are numeric but not digits.
fn is_digit(ch: char) -> bool {
    if ch.is_ascii() {
        return ch.is_ascii_digit();
    }
    let cp = ch as u32;
    DECIMAL_ZEROS.iter().any(|&zero| (zero..zero + 10).contains(&cp))
        || DIGIT_RANGES.iter().any(|&(lo, hi)| (lo..=hi).contains(&cp))
}

#[derive(Default)]
struct CharCounts {
    total: usize,
    digits: usize,
    letters: usize,
    dots: usize,
    hyphens: usize,
    underscores: usize,
    slashes: usize,
    questionmarks: usize,
    equals: usize,
    ats: usize,
    ampersands: usize,
    exclamations: usize,
    spaces: usize,
    tildes: usize,
    commas: usize,
    pluses: usize,
    asterisks: usize,
    hashes: usize,
    dollars: usize,
    percents: usize,
}

impl CharCounts {
    fn scan(text: &str) -> Self {
        let mut c = Self::default();
        for ch in text.chars() {
            c.total += 1;
            if is_digit(ch) {
                c.digits += 1;
            } else if ch.is_alphabetic() && !ch.is_numeric() {
                c.letters += 1;
            }
            match ch {
                '.' => c.dots += 1,
                '-' => c.hyphens += 1,
                '_' => c.underscores += 1,
                '/' => c.slashes += 1,
                '?' => c.questionmarks += 1,
                '=' => c.equals += 1,
                '@' => c.ats += 1,
                '&' => c.ampersands += 1,
                '!' => c.exclamations += 1,
                ' ' => c.spaces += 1,
                '~' => c.tildes += 1,
                ',' => c.commas += 1,
                '+' => c.pluses += 1,
                '*' => c.asterisks += 1,
                '#' => c.hashes += 1,
                '$' => c.dollars += 1,
                '%' => c.percents += 1,
                _ => {}
            }
        }
        c
    }
}
