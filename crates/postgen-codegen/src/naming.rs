//! Identifier derivation for directories, artifacts, types and fields.

/// Separator substituted for whitespace and other disallowed characters.
pub const SEPARATOR: char = '_';

/// Sanitize a display name into an identifier.
///
/// Lowercases, and maps whitespace and every character that is neither
/// alphanumeric nor `_` to [`SEPARATOR`]. The result is safe as a file name
/// and as an identifier stem.
///
/// ```
/// use postgen_codegen::naming::sanitize;
///
/// assert_eq!(sanitize("Basic Collection"), "basic_collection");
/// assert_eq!(sanitize("Create Order"), "create_order");
/// ```
pub fn sanitize(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .map(|c| {
            if c.is_alphanumeric() || c == SEPARATOR {
                c
            } else {
                SEPARATOR
            }
        })
        .collect()
}

/// PascalCase form of a sanitized identifier (`create_order` → `CreateOrder`).
pub fn pascal_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    for word in split_words(ident) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    out
}

/// snake_case form of an arbitrary key (`orderId` → `order_id`).
pub fn snake_case(name: &str) -> String {
    split_words(name)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Split on non-alphanumeric characters and lower→upper case boundaries.
fn split_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in name.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_numeric();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}
