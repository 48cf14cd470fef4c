/// One classified line of a tool response.
///
/// The responses are loosely structured markdown. Every parser walks the
/// same token stream and decides per grammar which kinds it cares about;
/// anything it does not recognise is skipped, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// Number of leading spaces
    pub indent: usize,
    /// The line with surrounding whitespace removed
    pub text: &'a str,
    pub kind: LineKind<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Blank,
    /// `#`..`######` followed by a space
    Heading { level: usize, text: &'a str },
    /// `Key: value`, `**Key:** value` or `- **Key:** value`
    Label { key: &'a str, value: &'a str },
    /// `- item` or `* item` that is not a label
    Bullet(&'a str),
    Text,
}

impl<'a> Line<'a> {
    /// Label value if this line is a label with the given key (case-insensitive)
    pub fn label(&self, wanted: &str) -> Option<&'a str> {
        match self.kind {
            LineKind::Label { key, value } if key.to_lowercase() == wanted.to_lowercase() => {
                Some(value)
            }
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.kind == LineKind::Blank
    }
}

/// Split a response into classified lines
pub fn tokenize(input: &str) -> impl Iterator<Item = Line<'_>> {
    input.lines().map(classify)
}

pub fn classify(raw: &str) -> Line<'_> {
    let raw = raw.trim_end_matches('\r');
    let indent = count_indent(raw);
    let text = raw.trim();

    let kind = if text.is_empty() {
        LineKind::Blank
    } else if let Some((level, heading)) = split_heading(text) {
        LineKind::Heading {
            level,
            text: heading,
        }
    } else if let Some((key, value)) = split_label(text) {
        LineKind::Label { key, value }
    } else if let Some(item) = text.strip_prefix("- ").or_else(|| text.strip_prefix("* ")) {
        LineKind::Bullet(item.trim())
    } else {
        LineKind::Text
    };

    Line { indent, text, kind }
}

/// Count leading spaces
pub fn count_indent(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn split_heading(text: &str) -> Option<(usize, &str)> {
    let level = text.len() - text.trim_start_matches('#').len();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &text[level..];
    rest.starts_with(' ').then(|| (level, rest.trim()))
}

/// Recognise `Key: value` in its plain and bold spellings.
fn split_label(text: &str) -> Option<(&str, &str)> {
    let text = text.strip_prefix("- ").unwrap_or(text).trim_start();

    if let Some(rest) = text.strip_prefix("**") {
        let end = rest.find("**")?;
        let inner = &rest[..end];
        let after = &rest[end + 2..];
        if let Some(key) = inner.strip_suffix(':') {
            return Some((key.trim(), after.trim()));
        }
        return after.strip_prefix(':').map(|v| (inner.trim(), v.trim()));
    }

    let (key, value) = text.split_once(':')?;
    let key = key.trim();
    if key.is_empty()
        || key.chars().count() > 40
        || !key.chars().all(|c| c.is_alphabetic() || c == ' ')
    {
        return None;
    }
    Some((key, value.trim()))
}

/// Strip one pair of surrounding backticks
pub fn unquote(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix('`')
        .and_then(|v| v.strip_suffix('`'))
        .unwrap_or(value)
}

/// First unsigned integer appearing in `value`
pub fn first_number(value: &str) -> Option<usize> {
    let start = value.find(|c: char| c.is_ascii_digit())?;
    let digits: String = value[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Split a comma separated list, dropping empty entries
pub fn split_csv(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Value of a trailing `(ID: x)` marker, and the text before it
pub fn split_id_suffix(value: &str) -> (&str, Option<&str>) {
    if let Some(open) = value.rfind("(ID:")
        && let Some(close) = value[open..].find(')')
    {
        let id = value[open + 4..open + close].trim();
        let id = (!id.is_empty()).then_some(id);
        return (value[..open].trim(), id);
    }
    (value.trim(), None)
}
