/*!
 * Tests for ISO language code utilities
 */

use scriptum::language_utils::{
    LanguageCodeType, base_language, get_language_name, language_codes_match,
    normalize_to_part1_or_part2t, normalize_to_part2t, validate_language_code,
};

#[test]
fn test_validate_language_code_withValidCodes_shouldReturnType() {
    assert_eq!(validate_language_code("en").unwrap(), LanguageCodeType::Part1);
    assert_eq!(validate_language_code("por").unwrap(), LanguageCodeType::Part2T);
    assert_eq!(validate_language_code("fre").unwrap(), LanguageCodeType::Part2B);
}

#[test]
fn test_validate_language_code_withInvalidCodes_shouldFail() {
    assert!(validate_language_code("xx").is_err());
    assert!(validate_language_code("").is_err());
    assert!(validate_language_code("english").is_err());
}

#[test]
fn test_normalize_to_part2t_withVariousForms_shouldReturnTerminologyCode() {
    assert_eq!(normalize_to_part2t("pt").unwrap(), "por");
    assert_eq!(normalize_to_part2t("ger").unwrap(), "deu");
    assert_eq!(normalize_to_part2t("pt-BR").unwrap(), "por");
    assert_eq!(normalize_to_part2t("ENG").unwrap(), "eng");
}

#[test]
fn test_normalize_to_part1_withRegionTag_shouldReturnBaseCode() {
    assert_eq!(normalize_to_part1_or_part2t("pt-BR").unwrap(), "pt");
    assert_eq!(normalize_to_part1_or_part2t("fre").unwrap(), "fr");
    assert_eq!(base_language("zh-Hant"), "zh");
}

#[test]
fn test_language_codes_match_withEquivalentCodes_shouldMatch() {
    assert!(language_codes_match("en", "eng"));
    assert!(language_codes_match("chi", "zh"));
    assert!(language_codes_match("pt-BR", "pt"));
    assert!(!language_codes_match("en", "fr"));
    assert!(!language_codes_match("unknown", "en"));
}

#[test]
fn test_get_language_name_withCodes_shouldReturnEnglishName() {
    assert_eq!(get_language_name("pt").unwrap(), "Portuguese");
    assert_eq!(get_language_name("spa").unwrap(), "Spanish");
    assert!(get_language_name("qqq-XX").is_err());
}
