use once_cell::sync::Lazy;
use regex::Regex;

// Optional footnote marker, then a number written with comma decimals and
// space thousands separators (plain, no-break or narrow no-break). Only a '%'
// or '*' may follow the number, so labels such as "0-4 ans", "80 ans et +" or
// dates are left alone.
static NUM_PAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\*?\s*(\d[\d ,\x{A0}\x{202F}]*)\s*[%*]?\s*$").expect("valid number regex")
});

/// Normalize a table cell.
///
/// Returns the text with numbers in machine readable form (`1 234,5` becomes
/// `1234.5`) and labels stripped of their formatting whitespace.
pub fn normalize_cell(text: &str) -> String {
    let numeric = NUM_PAT.captures(text).and_then(|caps| caps.get(1)).map(|m| {
        m.as_str()
            .trim()
            .trim_end_matches(',')
            .replace(',', ".")
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
    });

    let text = numeric.as_deref().unwrap_or(text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_locale_numbers() {
        assert_eq!(normalize_cell("1 234,5"), "1234.5");
        assert_eq!(normalize_cell("12 345"), "12345");
        assert_eq!(normalize_cell("3,7"), "3.7");
        assert_eq!(normalize_cell("1\u{a0}234"), "1234");
        assert_eq!(normalize_cell("2\u{202f}500,25"), "2500.25");
    }

    #[test]
    fn strips_footnote_marker() {
        assert_eq!(normalize_cell("*42"), "42");
        assert_eq!(normalize_cell("* 1 005"), "1005");
        assert_eq!(normalize_cell("17*"), "17");
    }

    #[test]
    fn tolerates_surrounding_whitespace_and_units() {
        assert_eq!(normalize_cell("\n   1 234,5 \n"), "1234.5");
        assert_eq!(normalize_cell("12,5 %"), "12.5");
        assert_eq!(normalize_cell("42,"), "42");
    }

    #[test]
    fn collapses_label_whitespace() {
        assert_eq!(normalize_cell("  a   b\n c "), "a b c");
        assert_eq!(normalize_cell("Ahuntsic-\tCartierville"), "Ahuntsic- Cartierville");
        assert_eq!(normalize_cell(""), "");
        assert_eq!(normalize_cell(" \n\t "), "");
    }

    #[test]
    fn labels_starting_with_digits_are_not_numbers() {
        assert_eq!(normalize_cell("0-4 ans"), "0-4 ans");
        assert_eq!(normalize_cell("2020-04-12"), "2020-04-12");
        assert_eq!(normalize_cell("80 ans et +"), "80 ans et +");
        assert_eq!(normalize_cell("5 à 9 ans"), "5 à 9 ans");
        assert_eq!(normalize_cell("70  ans et plus"), "70 ans et plus");
        assert_eq!(normalize_cell("2 doses"), "2 doses");
    }

    #[test]
    fn normalizing_twice_changes_nothing() {
        for raw in [
            "1 234,5",
            "*42",
            "  a   b\n c ",
            "0-4 ans",
            "80 ans et +",
            "12,5 %",
            "1234.5",
            "Total",
            "",
        ] {
            let once = normalize_cell(raw);
            assert_eq!(normalize_cell(&once), once, "input {:?}", raw);
        }
    }
}
