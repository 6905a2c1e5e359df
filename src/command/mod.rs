use serde::Serialize;

/// The typed result of parsing one free-text input line.
///
/// Parsing is total: any line maps to exactly one variant, with `Unknown`
/// carrying the raw text for user feedback. Dispatch matches on the
/// trimmed ASCII-lowercased line; field values are sliced from the
/// original line so their case is preserved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    CreateMemory {
        content: String,
        category: Option<String>,
        tags: Vec<String>,
    },
    /// Bare trigger: table content arrives over many turns in the builder,
    /// not on this line.
    CreateTable,
    CreateList,
    CreateTimeline,
    SavePicture {
        /// Pre-filled from a `description: "..."` clause when present.
        description: Option<String>,
        tags: Vec<String>,
    },
    EditMemory {
        id: Option<String>,
        updates: EditPatch,
    },
    Delete(DeleteCommand),
    Retrieve(RetrieveFilters),
    Help,
    Clear,
    Unknown {
        raw: String,
    },
}

/// Updates requested by an `edit memory` command. `append` comes from the
/// `add:` pseudo-field and means "append to the existing content".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EditPatch {
    pub content: Option<String>,
    pub append: Option<String>,
}

impl EditPatch {
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.append.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteTarget {
    Memory,
    Picture,
    Image,
}

impl DeleteTarget {
    pub fn noun(&self) -> &'static str {
        match self {
            DeleteTarget::Memory => "memory",
            DeleteTarget::Picture => "picture",
            DeleteTarget::Image => "image",
        }
    }
}

/// A parsed delete request. A command with no id, no filters, and
/// `delete_all` unset is still a valid parse — rejecting it with guidance
/// is the dispatcher's job, not the parser's.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteCommand {
    pub target: DeleteTarget,
    pub id: Option<String>,
    pub delete_all: bool,
    pub tags: Vec<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrieveFilters {
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub search: Option<String>,
    pub first: bool,
    /// Entry type filter: "table" from "all tables", "image" from
    /// "pictures"/"images".
    pub kind: Option<String>,
}

/// Keywords that mark a line as command-shaped. A line starting with one
/// of these that matches no full pattern is `Unknown` rather than free
/// text, so a mistyped command is never silently misread.
const COMMAND_KEYWORDS: &[&str] = &[
    "create", "save", "edit", "delete", "show", "bring", "list", "search", "mother", "update",
    "retrieve",
];

const MOOD_WORDS: &[&str] = &[
    "happy", "sad", "angry", "excited", "calm", "anxious", "work", "personal", "ideas",
];

/// Classify one input line. Pure and total; never panics.
pub fn parse(raw: &str) -> Command {
    let text = raw.trim();
    let lower = text.to_ascii_lowercase();

    if lower.starts_with("create memory") {
        return parse_create_memory(text, &lower);
    }
    if lower.starts_with("create table") {
        return Command::CreateTable;
    }
    if lower.starts_with("create list") {
        return Command::CreateList;
    }
    if lower.starts_with("create timeline") {
        return Command::CreateTimeline;
    }
    if lower.starts_with("save picture") || lower.starts_with("save image") {
        return parse_save_picture(text, &lower);
    }
    if lower.starts_with("edit memory") || lower.starts_with("update memory") {
        return parse_edit_memory(text, &lower);
    }
    if lower.starts_with("delete all")
        || lower.starts_with("delete memory")
        || lower.starts_with("delete memories")
        || lower.starts_with("delete picture")
        || lower.starts_with("delete image")
    {
        return parse_delete(text, &lower);
    }
    if lower.starts_with("mother,")
        || lower.starts_with("show")
        || lower.starts_with("bring up")
        || lower.starts_with("list")
        || lower.starts_with("search")
    {
        return parse_retrieve(text, &lower);
    }
    if lower == "help" || lower == "?" || lower.starts_with("help") {
        return Command::Help;
    }
    if lower == "clear" || lower == "cls" {
        return Command::Clear;
    }

    let first_word = lower.split_whitespace().next().unwrap_or("");
    if COMMAND_KEYWORDS.contains(&first_word) {
        return Command::Unknown { raw: raw.into() };
    }

    Command::Unknown { raw: raw.into() }
}

fn parse_create_memory(text: &str, lower: &str) -> Command {
    // Quoted content wins; otherwise everything after "create memory:"
    // with trailing tags:/category: clauses stripped.
    let content = first_quoted(text).unwrap_or_else(|| {
        match colon_rest(text, lower, "create memory") {
            Some(rest) => strip_trailing_clauses(rest),
            None => String::new(),
        }
    });

    let tags = match tags_clause(text, lower) {
        Some(tags) if !tags.is_empty() => tags,
        _ => hashtags(text),
    };

    Command::CreateMemory {
        content,
        category: category_word(text, lower),
        tags,
    }
}

fn parse_save_picture(text: &str, lower: &str) -> Command {
    let description = keyword_colon_end(lower, "description")
        .and_then(|at| quoted_at(&text[at..]));
    let tags = match keyword_colon_end(lower, "tags") {
        Some(at) => {
            let rest = &text[at..];
            let end = rest.find(['"', '\'']).unwrap_or(rest.len());
            split_tags(&rest[..end])
        }
        None => Vec::new(),
    };
    Command::SavePicture { description, tags }
}

fn parse_edit_memory(text: &str, lower: &str) -> Command {
    let id = id_token(text);
    let mut updates = EditPatch::default();

    if lower.contains("add:") {
        if let Some(at) = keyword_colon_end(lower, "add") {
            updates.append = quoted_at(&text[at..]);
        }
    } else if let Some(content) = first_quoted(text) {
        updates.content = Some(content);
    } else if let Some(pos) = text.find(':') {
        let rest = text[pos + 1..].trim();
        if !rest.is_empty() {
            updates.content = Some(rest.to_string());
        }
    }

    Command::EditMemory { id, updates }
}

fn parse_delete(text: &str, lower: &str) -> Command {
    let id = id_token(text);
    let tags = match bounded_tag_filter(text, lower) {
        Some(tags) => tags,
        None if id.is_none() => hashtags(text),
        None => Vec::new(),
    };

    Command::Delete(DeleteCommand {
        target: delete_target(lower),
        id,
        delete_all: lower.contains("delete all"),
        tags,
        category: category_word(text, lower),
    })
}

fn parse_retrieve(text: &str, lower: &str) -> Command {
    let mut filters = RetrieveFilters::default();

    filters.tags = match bounded_tag_filter(text, lower) {
        Some(tags) => tags,
        None => hashtags(text),
    };

    filters.category = category_word(text, lower).or_else(|| mood_category(lower));

    if let Some(at) = keyword_colon_end(lower, "from") {
        let rest = &text[at..];
        let end = rest.find('.').unwrap_or(rest.len());
        let date = rest[..end].trim();
        if !date.is_empty() {
            filters.date = Some(date.to_string());
        }
    }

    if let Some(at) = keyword_colon_end(lower, "containing") {
        let rest = &text[at..];
        let end = rest.find('.').unwrap_or(rest.len());
        let term = rest[..end].trim();
        if !term.is_empty() {
            filters.search = Some(term.to_string());
        }
    } else if let Some(at) = keyword_colon_end(lower, "search") {
        filters.search = quoted_at(&text[at..]);
    }

    filters.first = lower.contains("first memory");
    if lower.contains("all tables") {
        filters.kind = Some("table".into());
    }
    if lower.contains("pictures") || lower.contains("images") {
        filters.kind = Some("image".into());
    }

    Command::Retrieve(filters)
}

// ---------------------------------------------------------------
// Extraction rules. Each is a named, independently testable unit
// working on the original-case text, with an ASCII-lowered shadow
// for matching where needed.
// ---------------------------------------------------------------

/// First quoted span in the text, either quote style. Mixed open/close
/// quotes are tolerated; the span must be non-empty.
pub fn first_quoted(text: &str) -> Option<String> {
    let open = text.find(['"', '\''])?;
    let rest = &text[open + 1..];
    let close = rest.find(['"', '\''])?;
    if close == 0 {
        return None;
    }
    Some(rest[..close].to_string())
}

/// All `#word` hashtags (alphanumerics and underscores).
pub fn hashtags(text: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'#' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len()
                && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
            {
                end += 1;
            }
            if end > start {
                tags.push(text[start..end].to_string());
            }
            i = end;
        } else {
            i += 1;
        }
    }
    tags
}

/// A store-assigned id: `#` followed by alphanumerics, dashes, or
/// underscores. Non-numeric document-store keys must pass.
pub fn id_token(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'#' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len()
                && (bytes[end].is_ascii_alphanumeric()
                    || bytes[end] == b'-'
                    || bytes[end] == b'_')
            {
                end += 1;
            }
            if end > start {
                return Some(text[start..end].to_string());
            }
        }
        i += 1;
    }
    None
}

/// Single-word category from a `category: word` clause (`in category:`
/// works too; the value may be quoted).
pub fn category_word(text: &str, lower: &str) -> Option<String> {
    let mut at = keyword_colon_end(lower, "category")?;
    let rest = text[at..].trim_start();
    at += text[at..].len() - rest.len();
    let rest = text[at..].strip_prefix(['"', '\'']).unwrap_or(&text[at..]);
    let end = rest
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    Some(rest[..end].to_string())
}

/// `tags:` clause of a create-memory command. The value runs until a
/// following `category:` clause (optionally led by "in"), a quote, or
/// the end of the line. Returns `Some(vec![])` for a present-but-empty
/// clause — that is an empty tag list, not an error.
pub fn tags_clause(text: &str, lower: &str) -> Option<Vec<String>> {
    let start = keyword_colon_end(lower, "tags")?;
    let rest = &text[start..];
    let rest_lower = &lower[start..];

    let mut end = rest.len();
    if let Some(cat) = rest_lower.find("category:") {
        end = end.min(clause_lead_start(rest_lower, cat, "in"));
    }
    if let Some(quote) = rest.find(['"', '\'']) {
        end = end.min(quote);
    }

    Some(split_tags(&rest[..end]))
}

/// Tag filter for delete/retrieve: `tagged:`, `tags:`, or `tag:` (spaces
/// allowed before the colon), value bounded by a quote or period.
pub fn bounded_tag_filter(text: &str, lower: &str) -> Option<Vec<String>> {
    let at = ["tagged", "tags", "tag"]
        .iter()
        .filter_map(|kw| keyword_colon_end(lower, kw))
        .min()?;
    let rest = text[at..].trim_start();
    let rest = rest.strip_prefix(['"', '\'']).unwrap_or(rest);
    let end = rest.find(['"', '\'', '.']).unwrap_or(rest.len());
    let tags = split_tags(&rest[..end]);
    if tags.is_empty() { None } else { Some(tags) }
}

/// Find `keyword` followed by an optional run of whitespace and a colon;
/// returns the index just past the colon.
fn keyword_colon_end(lower: &str, keyword: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(found) = lower[from..].find(keyword) {
        let at = from + found;
        let after = &lower[at + keyword.len()..];
        let ws = after.len() - after.trim_start().len();
        if after[ws..].starts_with(':') {
            return Some(at + keyword.len() + ws + 1);
        }
        from = at + keyword.len();
    }
    None
}

/// Everything after `prefix` + optional spaces + `:`, trimmed.
fn colon_rest<'a>(text: &'a str, lower: &str, prefix: &str) -> Option<&'a str> {
    let start = lower.find(prefix)? + prefix.len();
    let after = &lower[start..];
    let ws = after.len() - after.trim_start().len();
    if !after[ws..].starts_with(':') {
        return None;
    }
    let rest = text[start + ws + 1..].trim();
    if rest.is_empty() { None } else { Some(rest) }
}

/// First quoted span at or after the start of `rest`.
fn quoted_at(rest: &str) -> Option<String> {
    first_quoted(rest)
}

/// Remove trailing `tags:`/`category:` clauses (with their optional
/// "with"/"in" leads) from fallback create-memory content.
fn strip_trailing_clauses(content: &str) -> String {
    let lower = content.to_ascii_lowercase();
    let mut cut = content.len();
    if let Some(pos) = lower.find("tags:") {
        cut = cut.min(clause_lead_start(&lower, pos, "with"));
    }
    if let Some(pos) = lower.find("category:") {
        cut = cut.min(clause_lead_start(&lower, pos, "in"));
    }
    content[..cut].trim().to_string()
}

/// Given the byte position of a clause keyword, walk back over whitespace
/// and an optional standalone lead word so the whole clause is covered.
fn clause_lead_start(lower: &str, keyword_pos: usize, lead: &str) -> usize {
    let head = lower[..keyword_pos].trim_end();
    if head.ends_with(lead) {
        let lead_start = head.len() - lead.len();
        let standalone = lead_start == 0 || lower[..lead_start].ends_with(' ');
        if standalone {
            return lower[..lead_start].trim_end().len();
        }
    }
    head.len()
}

/// Comma-split a tag clause value: trim, drop quote characters, drop
/// empties. Case is preserved.
fn split_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|t| t.trim().replace(['"', '\''], ""))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Leftmost of memory/picture/image decides the delete target.
fn delete_target(lower: &str) -> DeleteTarget {
    let candidates = [
        (lower.find("memory"), DeleteTarget::Memory),
        (lower.find("picture"), DeleteTarget::Picture),
        (lower.find("image"), DeleteTarget::Image),
    ];
    candidates
        .into_iter()
        .filter_map(|(pos, target)| pos.map(|p| (p, target)))
        .min_by_key(|(p, _)| *p)
        .map(|(_, target)| target)
        .unwrap_or(DeleteTarget::Memory)
}

/// "show happy moments" style shorthand: a mood word directly before
/// "moments" or "memories" acts as a category filter.
fn mood_category(lower: &str) -> Option<String> {
    for mood in MOOD_WORDS {
        if lower.contains(&format!("{mood} moments"))
            || lower.contains(&format!("{mood} memories"))
        {
            return Some((*mood).to_string());
        }
    }
    None
}
