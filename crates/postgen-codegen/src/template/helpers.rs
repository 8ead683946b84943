//! The closed set of template helpers.

/// A helper callable from a template as `{{name arg...}}`.
///
/// There is no way to register more: templates can only reshape data with
/// these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Helper {
    /// `join list sep` joins a list of scalars with a separator.
    Join,
    /// `lines list` joins a list of scalars with newlines.
    Lines,
    /// `replace text from to` replaces the first occurrence.
    Replace,
    /// `replace_all text from to` replaces every occurrence.
    ReplaceAll,
    /// `escape text` makes text safe inside a double-quoted string literal.
    Escape,
}

impl Helper {
    pub const ALL: [Helper; 5] = [
        Helper::Join,
        Helper::Lines,
        Helper::Replace,
        Helper::ReplaceAll,
        Helper::Escape,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|h| h.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Helper::Join => "join",
            Helper::Lines => "lines",
            Helper::Replace => "replace",
            Helper::ReplaceAll => "replace_all",
            Helper::Escape => "escape",
        }
    }

    /// Number of arguments the helper takes.
    pub fn arity(self) -> usize {
        match self {
            Helper::Join => 2,
            Helper::Lines | Helper::Escape => 1,
            Helper::Replace | Helper::ReplaceAll => 3,
        }
    }

    /// Whether the first argument is a list rather than a scalar.
    pub(crate) fn takes_list(self) -> bool {
        matches!(self, Helper::Join | Helper::Lines)
    }

    /// Apply to already-resolved arguments.
    ///
    /// `items` is the list argument for list helpers; `args` holds the
    /// remaining scalar arguments in order (for text helpers, the subject
    /// first).
    pub(crate) fn apply(self, items: &[String], args: &[String]) -> String {
        match self {
            Helper::Join => items.join(&args[0]),
            Helper::Lines => items.join("\n"),
            Helper::Replace => args[0].replacen(args[1].as_str(), &args[2], 1),
            Helper::ReplaceAll => args[0].replace(args[1].as_str(), &args[2]),
            Helper::Escape => escape(&args[0]),
        }
    }
}

/// Escapes accepted by both Go and Rust string literals.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_ascii_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}
