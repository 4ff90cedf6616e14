// Tag requests come in as a string, a list or a category mapping, and leave as
// the `+`-joined expression the upstream `tags=` parameter expects.

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

/// A caller's tag request before formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagInput {
    /// Tags separated by whitespace or commas.
    Text(String),
    List(Vec<String>),
    /// Category -> tags. Categories are visited in key order.
    Grouped(BTreeMap<String, Vec<String>>),
}

/// How a booru wants excluded tags spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExcludeSyntax {
    /// Every excluded term carries its own `-`: `a+-b+-c`.
    PerTerm,
    /// A single leading `-` is applied once, terms joined by bare `-`.
    Leading,
}

/// Delimiter selection for [`TagInput::format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMode {
    Include,
    Exclude(ExcludeSyntax),
}

impl TagMode {
    fn delimiter(&self) -> &'static str {
        match self {
            TagMode::Include => "+",
            TagMode::Exclude(ExcludeSyntax::PerTerm) => "+-",
            TagMode::Exclude(ExcludeSyntax::Leading) => "-",
        }
    }
}

impl TagInput {
    /// Trimmed, non-empty tags in request order.
    pub fn tags(&self) -> Vec<&str> {
        let raw: Vec<&str> = match self {
            TagInput::Text(s) => s.split(|c: char| c.is_whitespace() || c == ',').collect(),
            TagInput::List(list) => list.iter().map(String::as_str).collect(),
            TagInput::Grouped(groups) => groups.values().flatten().map(String::as_str).collect(),
        };
        raw.into_iter().map(str::trim).filter(|tag| !tag.is_empty()).collect()
    }

    /// Join the tags with the delimiter of `mode`. No tags yields an empty string.
    pub fn format(&self, mode: TagMode) -> String {
        self.tags().join(mode.delimiter())
    }
}

/// Format an optional tag request; absence means "no constraint".
pub fn format_tags(tags: Option<&TagInput>, mode: TagMode) -> String {
    tags.map(|t| t.format(mode)).unwrap_or_default()
}

/// Combine included and excluded tags into one upstream tag expression.
/// Returns an empty string when neither side constrains the query.
pub fn tag_expression(tags: Option<&TagInput>, exclude: Option<&TagInput>, syntax: ExcludeSyntax) -> String {
    let included = format_tags(tags, TagMode::Include);
    let excluded = format_tags(exclude, TagMode::Exclude(syntax));

    match (included.is_empty(), excluded.is_empty()) {
        (false, false) => format!("{}+-{}", included, excluded),
        (false, true) => included,
        (true, false) => format!("-{}", excluded),
        (true, true) => String::new(),
    }
}
