//! Identifier conversion and escaping

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Rust keywords: strict, reserved, and those added by later editions.
static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
        "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod",
        "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super",
        "trait", "true", "type", "unsafe", "use", "where", "while", "abstract", "become", "box",
        "do", "final", "gen", "macro", "override", "priv", "try", "typeof", "unsized",
        "virtual", "yield",
    ]
    .into_iter()
    .collect()
});

pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(name)
}

/// Append `_` to reserved words.
pub fn escape_reserved(name: &str) -> String {
    if is_reserved(name) {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

/// Convert camelCase / PascalCase to snake_case, keeping acronyms together.
///
/// `balanceOf` → `balance_of`, `getETHBalance` → `get_eth_balance`,
/// `ERC20Token` → `erc20_token`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower);
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
        }
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }

    out
}

/// Turn any ABI name into a usable Rust identifier.
pub fn sanitize_identifier(name: &str) -> String {
    let snake = to_snake_case(name);
    let snake = if snake.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", snake)
    } else {
        snake
    };
    escape_reserved(&snake)
}

/// Keep an ABI parameter name as written, only making it a legal identifier.
pub fn sanitize_param_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    escape_reserved(&out)
}

/// `balanceOf` → `Balance of`. Each capital starts a new lowercase word, so
/// `getTokenURI` reads `Get token u r i`.
pub fn camel_to_readable(name: &str) -> String {
    let mut words = String::with_capacity(name.len() + 8);
    for c in name.chars() {
        if c == '_' || c == '-' {
            if !words.is_empty() && !words.ends_with(' ') {
                words.push(' ');
            }
            continue;
        }
        if c.is_ascii_uppercase() && !words.is_empty() && !words.ends_with(' ') {
            words.push(' ');
        }
        words.push(c.to_ascii_lowercase());
    }

    let trimmed = words.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Hands out `name`, `name_2`, `name_3`… so overloads never collide.
#[derive(Debug, Default)]
pub struct UniqueNames {
    seen: HashMap<String, usize>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a name as taken so a later `claim` of it gets a suffix.
    pub fn reserve(&mut self, name: &str) {
        self.seen.entry(name.to_string()).or_insert(1);
    }

    pub fn claim(&mut self, name: String) -> String {
        let mut occurrence = self.seen.get(&name).copied().unwrap_or(0) + 1;
        let mut candidate = name.clone();
        if occurrence > 1 {
            candidate = format!("{}_{}", name, occurrence);
            while self.seen.contains_key(&candidate) {
                occurrence += 1;
                candidate = format!("{}_{}", name, occurrence);
            }
            self.seen.insert(candidate.clone(), 1);
        }
        self.seen.insert(name, occurrence);
        candidate
    }
}

/// Sanitized, collision-free keys for a parameter list. Unnamed entries get
/// `unnamed(i)`.
pub fn unique_keys<'a, I, F>(names: I, unnamed: F) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
    F: Fn(usize) -> String,
{
    let mut seen = UniqueNames::new();
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let key = if name.is_empty() {
                unnamed(i)
            } else {
                sanitize_param_name(name)
            };
            seen.claim(key)
        })
        .collect()
}
