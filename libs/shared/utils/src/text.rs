/// Lower-cases and strips the diacritics patients often omit when typing
/// Spanish, so "Mañana" and "manana" compare equal. Curly apostrophes are
/// straightened as well.
pub fn fold_accents(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(|ch| match ch {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            '’' | '‘' => '\'',
            other => other,
        })
        .collect()
}

/// Lower-cased words of `text`, split on anything that is not a letter,
/// digit or apostrophe.
pub fn words(text: &str) -> Vec<String> {
    fold_accents(text)
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_accents() {
        assert_eq!(fold_accents("Mañana a las 3, ¿Sí?"), "manana a las 3, ¿si?");
        assert_eq!(fold_accents("I CAN’T"), "i can't");
    }

    #[test]
    fn test_words() {
        assert_eq!(words("No, that's NOT right!"), vec!["no", "that's", "not", "right"]);
        assert_eq!(words("  "), Vec::<String>::new());
    }
}
