/// Сегодняшняя дата в формате `YYYY-MM-DD` (локальное время сервера).
pub fn today_string() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Проверяет формат даты `YYYY-MM-DD`.
///
/// # Example
///
/// ```
/// use meemee::core::utils::is_valid_date;
///
/// assert!(is_valid_date("2024-05-01"));
/// assert!(!is_valid_date("01.05.2024"));
/// ```
pub fn is_valid_date(value: &str) -> bool {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

/// Обрезает строку до `max_chars` символов, добавляя многоточие.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut result: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    result.push('…');
    result
}

/// Возвращает правильную форму слова "генерация" для русского языка.
///
/// Правила склонения:
/// - 1, 21, 31, ... -> "генерация"
/// - 2-4, 22-24, 32-34, ... -> "генерации"
/// - 5-20, 25-30, 35-40, ... -> "генераций"
///
/// # Example
///
/// ```
/// use meemee::core::utils::pluralize_generations;
///
/// assert_eq!(pluralize_generations(1), "генерация");
/// assert_eq!(pluralize_generations(3), "генерации");
/// assert_eq!(pluralize_generations(11), "генераций");
/// ```
pub fn pluralize_generations(n: i64) -> &'static str {
    let n = n.unsigned_abs();
    let n_mod_100 = n % 100;
    let n_mod_10 = n % 10;

    // Исключения: 11, 12, 13, 14 - всегда "генераций"
    if (11..=14).contains(&n_mod_100) {
        return "генераций";
    }

    match n_mod_10 {
        1 => "генерация",
        2..=4 => "генерации",
        _ => "генераций",
    }
}

#[cfg(test)]
mod tests {
    use super::{is_valid_date, pluralize_generations, truncate_chars};

    #[test]
    fn test_pluralize_generations() {
        assert_eq!(pluralize_generations(0), "генераций");
        assert_eq!(pluralize_generations(1), "генерация");
        assert_eq!(pluralize_generations(21), "генерация");
        assert_eq!(pluralize_generations(4), "генерации");
        assert_eq!(pluralize_generations(12), "генераций");
        assert_eq!(pluralize_generations(112), "генераций");
        assert_eq!(pluralize_generations(25), "генераций");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("Привет", 10), "Привет");
        assert_eq!(truncate_chars("Привет, мир", 7), "Привет…");
    }

    #[test]
    fn test_is_valid_date() {
        assert!(is_valid_date("2024-02-29"));
        assert!(!is_valid_date("2023-02-29"));
        assert!(!is_valid_date("today"));
    }
}
