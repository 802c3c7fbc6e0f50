/*!
 * Display metadata for subtitle languages.
 *
 * Turns a raw language tag, optionally followed by a free-text title
 * (`por Brazilian (SDH)`, `en-US`, `chi Traditional`), into a display name,
 * a flag glyph, an optional regional variant and accessibility badges.
 *
 * Classification is a pure function of its input: no I/O, no caching, and
 * unrecognized input falls back to a globe glyph with the raw string as the
 * display name.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

// @const: Glyph used for unrecognized languages
pub const UNKNOWN_FLAG: &str = "🌐";

/// One row of the language table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LanguageEntry {
    name: &'static str,
    flag: &'static str,
    variant: Option<&'static str>,
}

const fn entry(name: &'static str, flag: &'static str) -> LanguageEntry {
    LanguageEntry {
        name,
        flag,
        variant: None,
    }
}

const fn regional(name: &'static str, flag: &'static str, variant: &'static str) -> LanguageEntry {
    LanguageEntry {
        name,
        flag,
        variant: Some(variant),
    }
}

// @const: ISO 639-1, ISO 639-2 and region-tagged codes, keyed in lower case
static LANGUAGE_TABLE: Lazy<HashMap<&'static str, LanguageEntry>> = Lazy::new(|| {
    HashMap::from([
        ("en", entry("English", "🇬🇧")),
        ("eng", entry("English", "🇬🇧")),
        ("en-us", regional("English", "🇺🇸", "US")),
        ("en-gb", regional("English", "🇬🇧", "UK")),
        ("en-au", regional("English", "🇦🇺", "Australia")),
        ("en-ca", regional("English", "🇨🇦", "Canada")),
        ("pt", entry("Portuguese", "🇵🇹")),
        ("por", entry("Portuguese", "🇵🇹")),
        ("pt-br", regional("Portuguese", "🇧🇷", "Brazil")),
        ("pt-pt", regional("Portuguese", "🇵🇹", "Portugal")),
        ("pb", regional("Portuguese", "🇧🇷", "Brazil")),
        ("pob", regional("Portuguese", "🇧🇷", "Brazil")),
        ("es", entry("Spanish", "🇪🇸")),
        ("spa", entry("Spanish", "🇪🇸")),
        ("es-es", regional("Spanish", "🇪🇸", "Spain")),
        ("es-mx", regional("Spanish", "🇲🇽", "Mexico")),
        ("es-ar", regional("Spanish", "🇦🇷", "Argentina")),
        ("es-419", regional("Spanish", "🌎", "Latin America")),
        ("fr", entry("French", "🇫🇷")),
        ("fre", entry("French", "🇫🇷")),
        ("fra", entry("French", "🇫🇷")),
        ("fr-fr", regional("French", "🇫🇷", "France")),
        ("fr-ca", regional("French", "🇨🇦", "Canada")),
        ("de", entry("German", "🇩🇪")),
        ("ger", entry("German", "🇩🇪")),
        ("deu", entry("German", "🇩🇪")),
        ("it", entry("Italian", "🇮🇹")),
        ("ita", entry("Italian", "🇮🇹")),
        ("ru", entry("Russian", "🇷🇺")),
        ("rus", entry("Russian", "🇷🇺")),
        ("zh", entry("Chinese", "🇨🇳")),
        ("chi", entry("Chinese", "🇨🇳")),
        ("zho", entry("Chinese", "🇨🇳")),
        ("zh-cn", regional("Chinese", "🇨🇳", "Simplified")),
        ("zh-tw", regional("Chinese", "🇹🇼", "Traditional")),
        ("zh-hk", regional("Chinese", "🇭🇰", "Hong Kong")),
        ("ja", entry("Japanese", "🇯🇵")),
        ("jpn", entry("Japanese", "🇯🇵")),
        ("ar", entry("Arabic", "🇸🇦")),
        ("ara", entry("Arabic", "🇸🇦")),
        ("ko", entry("Korean", "🇰🇷")),
        ("kor", entry("Korean", "🇰🇷")),
        ("nl", entry("Dutch", "🇳🇱")),
        ("dut", entry("Dutch", "🇳🇱")),
        ("nld", entry("Dutch", "🇳🇱")),
        ("sv", entry("Swedish", "🇸🇪")),
        ("swe", entry("Swedish", "🇸🇪")),
        ("no", entry("Norwegian", "🇳🇴")),
        ("nor", entry("Norwegian", "🇳🇴")),
        ("da", entry("Danish", "🇩🇰")),
        ("dan", entry("Danish", "🇩🇰")),
        ("fi", entry("Finnish", "🇫🇮")),
        ("fin", entry("Finnish", "🇫🇮")),
        ("pl", entry("Polish", "🇵🇱")),
        ("pol", entry("Polish", "🇵🇱")),
        ("tr", entry("Turkish", "🇹🇷")),
        ("tur", entry("Turkish", "🇹🇷")),
        ("he", entry("Hebrew", "🇮🇱")),
        ("heb", entry("Hebrew", "🇮🇱")),
        ("hi", entry("Hindi", "🇮🇳")),
        ("hin", entry("Hindi", "🇮🇳")),
    ])
});

// @const: Accessibility markers, tested on the raw input
static SDH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)sdh|deaf|hard.?of.?hearing").unwrap());
static FORCED_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)forced|signs?.?only").unwrap());
static CC_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bcc\b|closed.?caption").unwrap());

// @const: Keywords removed before the table lookup
static ACCESSIBILITY_STRIP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\s\-_]*(sdh|deaf|hard.?of.?hearing|forced|signs?.?only|\bcc\b|closed.?caption)[\s\-_]*")
        .unwrap()
});
static REGIONAL_STRIP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[\s\-_]*(brazil(ian)?|brasil|portugal|latin.?american|latam|european|castilian|spain|american|british|canadian|simplified|traditional|\busa\b|\bus\b|\buk\b)[\s\-_]*",
    )
    .unwrap()
});

/// Regional qualifier detected in the raw input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Region {
    Brazil,
    Portugal,
    LatinAmerica,
    Spain,
    UnitedStates,
    UnitedKingdom,
    Canada,
    Simplified,
    Traditional,
}

static REGION_PATTERNS: Lazy<Vec<(Region, Regex)>> = Lazy::new(|| {
    [
        (Region::Brazil, r"(?i)brazil(ian)?|brasil"),
        (Region::Portugal, r"(?i)portugal|european.*port"),
        (Region::LatinAmerica, r"(?i)latin.?american|latam|419"),
        (Region::Spain, r"(?i)spain|castilian|european.*spa"),
        (Region::UnitedStates, r"(?i)\b(us|usa|american)\b"),
        (Region::UnitedKingdom, r"(?i)\b(uk|british|gb)\b"),
        (Region::Canada, r"(?i)canad(a|ian)"),
        (Region::Simplified, r"(?i)simplified|简|cn"),
        (Region::Traditional, r"(?i)traditional|繁|tw|hk"),
    ]
    .into_iter()
    .map(|(region, pattern)| (region, Regex::new(pattern).unwrap()))
    .collect()
});

/// Regional overrides per base language, in precedence order
fn regional_variants(language: &str) -> &'static [(Region, &'static str, &'static str)] {
    match language {
        "Portuguese" => &[
            (Region::Brazil, "🇧🇷", "Brazil"),
            (Region::Portugal, "🇵🇹", "Portugal"),
        ],
        "Spanish" => &[
            (Region::LatinAmerica, "🌎", "Latin America"),
            (Region::Spain, "🇪🇸", "Spain"),
        ],
        "English" => &[
            (Region::UnitedStates, "🇺🇸", "US"),
            (Region::UnitedKingdom, "🇬🇧", "UK"),
            (Region::Canada, "🇨🇦", "Canada"),
        ],
        "Chinese" => &[
            (Region::Simplified, "🇨🇳", "Simplified"),
            (Region::Traditional, "🇹🇼", "Traditional"),
        ],
        "French" => &[(Region::Canada, "🇨🇦", "Canada")],
        _ => &[],
    }
}

/// Accessibility badge attached to a subtitle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubtitleBadge {
    Sdh,
    Forced,
    ClosedCaption,
}

impl SubtitleBadge {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sdh => "SDH",
            Self::Forced => "Forced",
            Self::ClosedCaption => "CC",
        }
    }
}

impl std::fmt::Display for SubtitleBadge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Display-ready description of a subtitle's language
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleLanguageInfo {
    /// Language name, with ` (variant)` appended when a variant is set
    pub display_name: String,
    /// Base language name, `None` when unrecognized
    pub language: Option<&'static str>,
    pub flag: &'static str,
    pub variant: Option<&'static str>,
    pub is_sdh: bool,
    pub is_forced: bool,
    pub is_cc: bool,
}

impl SubtitleLanguageInfo {
    /// Whether the language table recognized the input
    pub fn is_known(&self) -> bool {
        self.language.is_some()
    }

    /// Accessibility badges in display order
    pub fn badges(&self) -> Vec<SubtitleBadge> {
        let mut badges = Vec::new();
        if self.is_sdh {
            badges.push(SubtitleBadge::Sdh);
        }
        if self.is_forced {
            badges.push(SubtitleBadge::Forced);
        }
        if self.is_cc {
            badges.push(SubtitleBadge::ClosedCaption);
        }
        badges
    }
}

fn prefix(code: &str, len: usize) -> String {
    code.chars().take(len).collect()
}

fn lookup(clean_code: &str) -> Option<LanguageEntry> {
    LANGUAGE_TABLE
        .get(clean_code)
        .or_else(|| LANGUAGE_TABLE.get(prefix(clean_code, 2).as_str()))
        .or_else(|| LANGUAGE_TABLE.get(prefix(clean_code, 3).as_str()))
        .copied()
}

/// Classify a raw language code, region tag or composite label
pub fn classify(language_code: &str) -> SubtitleLanguageInfo {
    let is_sdh = SDH_REGEX.is_match(language_code);
    let is_forced = FORCED_REGEX.is_match(language_code);
    let is_cc = CC_REGEX.is_match(language_code);

    let regions: Vec<Region> = REGION_PATTERNS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(language_code))
        .map(|(region, _)| *region)
        .collect();

    let lowered = language_code.to_lowercase();
    let without_accessibility = ACCESSIBILITY_STRIP_REGEX.replace_all(lowered.trim(), "");
    let clean_code = REGIONAL_STRIP_REGEX.replace_all(&without_accessibility, "");
    let clean_code = clean_code.trim();

    let resolved = lookup(clean_code).map(|mut found| {
        if let Some((_, flag, variant)) = regional_variants(found.name)
            .iter()
            .find(|(region, _, _)| regions.contains(region))
        {
            found.flag = *flag;
            found.variant = Some(*variant);
        }
        found
    });

    match resolved {
        Some(found) => {
            let display_name = match found.variant {
                Some(variant) => format!("{} ({})", found.name, variant),
                None => found.name.to_string(),
            };
            SubtitleLanguageInfo {
                display_name,
                language: Some(found.name),
                flag: found.flag,
                variant: found.variant,
                is_sdh,
                is_forced,
                is_cc,
            }
        }
        None => SubtitleLanguageInfo {
            display_name: language_code.to_string(),
            language: None,
            flag: UNKNOWN_FLAG,
            variant: None,
            is_sdh,
            is_forced,
            is_cc,
        },
    }
}

/// Classify a stream from its language tag and title together
pub fn classify_stream(language: Option<&str>, title: Option<&str>) -> SubtitleLanguageInfo {
    let parts: Vec<&str> = [language, title]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        return classify("unknown");
    }

    let combined = classify(&parts.join(" "));
    if combined.variant.is_some() || parts.len() < 2 {
        return combined;
    }

    // `pt-BR` + `Portuguese`: the region lives only in the tag
    let by_tag = classify(parts[0]);
    if by_tag.variant.is_some() && by_tag.language == combined.language {
        return SubtitleLanguageInfo {
            display_name: by_tag.display_name,
            flag: by_tag.flag,
            variant: by_tag.variant,
            ..combined
        };
    }
    combined
}
