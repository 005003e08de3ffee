//! Text rendering utilities for human-friendly error messages.
//!
//! Every injector failure ends up as a single line of the form
//! `ErrorName(source)[context]: reason`. The context is either a token
//! chain (`A -> B -> C`), a provider description (`{provide:"A", deps:[]}`)
//! or plain text.

/// What goes between the brackets of a formatted error.
#[derive(Debug, Clone, Copy)]
pub enum Context<'a> {
    /// A token path, rendered as `a -> b -> c`.
    Chain(&'a [String]),
    /// A description object, rendered as `{key:value, ...}`.
    Fields(&'a [(&'static str, String)]),
    /// Anything else, rendered as is.
    Text(&'a str),
}

impl Context<'_> {
    /// Renders the context clause.
    pub fn render(&self) -> String {
        match self {
            Context::Chain(chain) => render_chain(chain),
            Context::Fields(fields) => render_fields(fields),
            Context::Text(text) => (*text).to_string(),
        }
    }
}

/// Formats a complete single-line error message.
///
/// # Examples
/// ```
/// use sijill_support::rendering::{format_error, Context};
///
/// let path = vec!["B".to_string(), "A".to_string()];
/// let msg = format_error("StaticInjectorError", Some("app"), Context::Chain(&path), "No provider for A!");
/// assert_eq!(msg, "StaticInjectorError(app)[B -> A]: No provider for A!");
/// ```
pub fn format_error(
    error_name: &str,
    source: Option<&str>,
    context: Context<'_>,
    text: &str,
) -> String {
    let source = source.map(|s| format!("({s})")).unwrap_or_default();
    format!(
        "{error_name}{source}[{}]: {}",
        context.render(),
        single_line(text),
    )
}

/// Renders a dependency chain as a readable string.
///
/// # Examples
/// ```
/// use sijill_support::rendering::render_chain;
///
/// let chain = vec!["UserService", "UserRepo", "Database", "UserService"];
/// let rendered = render_chain(&chain);
/// assert_eq!(rendered, "UserService -> UserRepo -> Database -> UserService");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Renders key/value pairs as `{key:value, key:value}`.
///
/// Values are written verbatim; callers quote string literals themselves.
pub fn render_fields(fields: &[(&'static str, String)]) -> String {
    let parts: Vec<String> = fields
        .iter()
        .map(|(key, value)| format!("{key}:{value}"))
        .collect();
    format!("{{{}}}", parts.join(", "))
}

/// Collapses a multi-line reason into one line.
fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Shortens a fully qualified type name for display.
///
/// ```
/// use sijill_support::rendering::shorten_type_name;
///
/// let short = shorten_type_name("my_app::services::user::UserService");
/// assert_eq!(short, "UserService");
///
/// let short = shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Logger>");
/// assert_eq!(short, "Arc<dyn Logger>");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut current_segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                current_segment.clear();
            }
            '<' | '>' | ',' | ' ' => {
                result.push_str(&current_segment);
                result.push(ch);
                current_segment.clear();
            }
            _ => {
                current_segment.push(ch);
            }
        }
    }

    result.push_str(&current_segment);
    result
}

/// Picks registered token names that look like the requested one.
///
/// Used for the "did you mean" clause of a missing-provider error.
pub fn suggest_similar(
    requested: &str,
    available: &[String],
    max_suggestions: usize,
) -> Vec<String> {
    let requested_lower = requested.to_lowercase();
    if requested_lower.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter_map(|name| {
            let name_lower = name.to_lowercase();
            if name_lower == requested_lower {
                return None;
            }

            if name_lower.contains(&requested_lower) || requested_lower.contains(&name_lower) {
                return Some((name.as_str(), 100));
            }

            let common = name_lower
                .chars()
                .zip(requested_lower.chars())
                .take_while(|(a, b)| a == b)
                .count();

            if common >= 3 {
                return Some((name.as_str(), common * 10));
            }

            None
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored.dedup_by(|a, b| a.0 == b.0);
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}
