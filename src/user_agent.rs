//! User-agent stack codec: `/name:version(comments)/…/`, the way a Bitmessage
//! node identifies the software (and any relays) in its chain. Parsing is lenient:
//! malformed input degrades to a best-effort partial result rather than an error, since
//! this field is advisory only and never gates the handshake.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentEntry {
    pub name: String,
    pub version: String,
    pub comments: Vec<String>,
}

impl UserAgentEntry {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        UserAgentEntry { name: name.into(), version: version.into(), comments: Vec::new() }
    }

    fn to_segment(&self) -> String {
        let mut segment = format!("{}:{}", self.name, self.version);
        for comment in &self.comments {
            segment.push('(');
            segment.push_str(comment);
            segment.push(')');
        }
        segment
    }
}

/// Joins entries into a single `/`-delimited stack string.
pub fn encode(entries: &[UserAgentEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push('/');
        out.push_str(&entry.to_segment());
    }
    out.push('/');
    out
}

/// Parses a lenient best-effort stack: segments are the text between consecutive `/`s,
/// each split on the first `:` (missing version defaults to `0.0.0`) with any
/// parenthesized `(comment)` suffixes stripped off and collected. Never fails outright;
/// a segment that doesn't parse is simply skipped.
pub fn decode(stack: &str) -> Vec<UserAgentEntry> {
    stack
        .split('/')
        .filter(|segment| !segment.is_empty())
        .filter_map(parse_segment)
        .collect()
}

fn parse_segment(segment: &str) -> Option<UserAgentEntry> {
    let (before_comments, comments) = split_comments(segment);
    if before_comments.is_empty() {
        return None;
    }
    let (name, version) = match before_comments.split_once(':') {
        Some((name, version)) if !name.is_empty() => (name, version),
        _ => (before_comments, "0.0.0"),
    };
    Some(UserAgentEntry { name: name.to_string(), version: version.to_string(), comments })
}

fn split_comments(segment: &str) -> (&str, Vec<String>) {
    let mut comments = Vec::new();
    let head = match segment.find('(') {
        Some(pos) => {
            let (head, rest) = segment.split_at(pos);
            let mut rest = rest;
            while let Some(close) = rest.find(')') {
                let comment = &rest[1..close];
                comments.push(comment.to_string());
                rest = &rest[close + 1..];
                if !rest.starts_with('(') {
                    break;
                }
            }
            head
        }
        None => segment,
    };
    (head, comments)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encodes_and_decodes_a_simple_stack() {
        let entries = vec![UserAgentEntry::new("PyBitmessage", "0.6.3.2")];
        let stack = encode(&entries);
        assert_eq!(stack, "/PyBitmessage:0.6.3.2/");
        assert_eq!(decode(&stack), entries);
    }

    #[test]
    fn decodes_a_relayed_stack_with_comments() {
        let stack = "/BitmessageGo:1.0(linux)/Relay:2.1(proxy)(logging)/";
        let entries = decode(stack);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "BitmessageGo");
        assert_eq!(entries[0].version, "1.0");
        assert_eq!(entries[0].comments, vec!["linux".to_string()]);
        assert_eq!(entries[1].comments, vec!["proxy".to_string(), "logging".to_string()]);
    }

    #[test]
    fn missing_version_defaults_to_zero() {
        let entries = decode("/justaname/");
        assert_eq!(entries, vec![UserAgentEntry::new("justaname", "0.0.0")]);
    }

    #[test]
    fn malformed_input_degrades_gracefully_instead_of_failing() {
        assert_eq!(decode(""), vec![]);
        assert_eq!(decode("not-even-slash-delimited"), vec![UserAgentEntry::new("not-even-slash-delimited", "0.0.0")]);
        assert_eq!(decode("//"), vec![]);
    }
}
