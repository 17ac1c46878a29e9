//! Identifier transformations used by template helpers.

/// Converts a declaration name to snake_case.
///
/// Accepts camelCase, PascalCase, kebab-case and space separated words.
///
/// ```
/// use argen::generation::utils::to_snake_case;
///
/// assert_eq!(to_snake_case("accountBalance"), "account_balance");
/// assert_eq!(to_snake_case("AccountBalance"), "account_balance");
/// assert_eq!(to_snake_case("account-balance"), "account_balance");
/// ```
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;

    for ch in s.chars() {
        if ch.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower = false;
        } else if ch.is_alphanumeric() {
            out.push(ch);
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        } else if matches!(ch, '-' | '_' | ' ') {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
        }
    }

    out.trim_matches('_').to_string()
}

/// Converts a declaration name to PascalCase, for type names.
///
/// ```
/// use argen::generation::utils::to_pascal_case;
///
/// assert_eq!(to_pascal_case("account_balance"), "AccountBalance");
/// assert_eq!(to_pascal_case("ACCOUNT_BALANCE"), "AccountBalance");
/// ```
pub fn to_pascal_case(s: &str) -> String {
    to_snake_case(s)
        .split('_')
        .filter(|w| !w.is_empty())
        .map(upper_first)
        .collect()
}

/// Converts a declaration name to camelCase.
pub fn to_camel_case(s: &str) -> String {
    lower_first(&to_pascal_case(s))
}

pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Makes a snake_case Rust identifier, suffixing reserved words with `_`.
pub fn sanitize_ident(s: &str) -> String {
    let snake = to_snake_case(s);

    match snake.as_str() {
        "as" | "break" | "const" | "continue" | "crate" | "else" | "enum" | "extern" | "false"
        | "fn" | "for" | "if" | "impl" | "in" | "let" | "loop" | "match" | "mod" | "move"
        | "mut" | "pub" | "ref" | "return" | "self" | "static" | "struct" | "super" | "trait"
        | "true" | "type" | "unsafe" | "use" | "where" | "while" | "async" | "await" | "dyn"
        | "abstract" | "become" | "box" | "do" | "final" | "macro" | "override" | "priv"
        | "typeof" | "unsized" | "virtual" | "yield" | "try" | "gen" => format!("{snake}_"),
        _ => snake,
    }
}
