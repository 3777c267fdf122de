//! Identifier case conversions shared by the model and the generators.

/// Canonical lower-snake form: an underscore before every uppercase letter
/// that is not in first position, then lowercase.
///
/// This is the form junction tables and their foreign columns are named
/// with, so `OrderItem` becomes `order_item` and `UserID` becomes `user_i_d`.
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

/// Acronym-aware snake case used for column and file names.
///
/// `OrderID` becomes `order_id`, `HTTPStatus` becomes `http_status`.
pub fn to_column_name(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if i > 0 && (prev_lower || (prev_upper && next_lower)) {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

/// Converts `snake_case`, `SCREAMING_CASE` or `kebab-case` to PascalCase.
pub fn to_pascal_case(s: &str) -> String {
    s.split(|c: char| c == '_' || c == '-' || c == ' ')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let lower = if word.chars().all(|c| !c.is_lowercase()) {
                word.to_lowercase()
            } else {
                word.to_string()
            };
            let mut chars = lower.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}

/// Lowercases the first character, keeping a leading acronym together
/// (`ID` becomes `id`, `OrderNo` becomes `orderNo`, `URLPath` becomes `urlPath`).
pub fn lower_first(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let run = chars.iter().take_while(|c| c.is_uppercase()).count();
    let lower_len = match run {
        0 => return s.to_string(),
        n if n == chars.len() => n,
        1 => 1,
        n => n - 1,
    };
    chars
        .iter()
        .enumerate()
        .flat_map(|(i, c)| {
            if i < lower_len {
                c.to_lowercase().collect::<Vec<_>>()
            } else {
                vec![*c]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_snake_case() {
        assert_eq!(to_snake_case("Order"), "order");
        assert_eq!(to_snake_case("OrderItem"), "order_item");
        assert_eq!(to_snake_case("UserID"), "user_i_d");
    }

    #[test]
    fn test_column_names() {
        assert_eq!(to_column_name("OrderNo"), "order_no");
        assert_eq!(to_column_name("OrderID"), "order_id");
        assert_eq!(to_column_name("ID"), "id");
        assert_eq!(to_column_name("HTTPStatus"), "http_status");
        assert_eq!(to_column_name("Line2Address"), "line2_address");
    }

    #[test]
    fn test_pascal_and_lower_first() {
        assert_eq!(to_pascal_case("IN_PROGRESS"), "InProgress");
        assert_eq!(to_pascal_case("pending"), "Pending");
        assert_eq!(lower_first("OrderNo"), "orderNo");
        assert_eq!(lower_first("ID"), "id");
        assert_eq!(lower_first("URLPath"), "urlPath");
    }
}
