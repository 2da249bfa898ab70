//! Tolerant streaming markup scanner.
//!
//! A single forward pass over raw HTML-ish text that reports start tags and
//! text runs to a [`MarkupVisitor`]. Built for scraping, not validation: any
//! input is accepted, malformed constructs degrade to fewer events, and the
//! scanner never fails.

/// Callbacks invoked by [`scan`] as structure is recognized.
///
/// Tag and attribute names arrive ASCII-lowercased; attribute values are
/// verbatim. End tags, comments, declarations and processing instructions
/// produce no callbacks.
pub trait MarkupVisitor {
    fn tag_open(&mut self, name: &str, attrs: &[(String, String)]);
    fn text(&mut self, text: &str);
}

/// Scan `input` once, reporting events to `visitor`.
///
/// Recognized constructs:
/// - start tags, including self-closing (`<br/>` reports the same
///   `tag_open` as `<br>`); attributes may be double-quoted, single-quoted,
///   unquoted or valueless (empty value);
/// - end tags, comments (`<!-- -->`), `<!…>` declarations and `<?…>`
///   instructions, all consumed silently;
/// - text runs between tags, reported with a small set of character
///   entities decoded;
/// - `<script>` and `<style>` bodies, reported as a single raw text run
///   with nothing inside them treated as markup.
///
/// A `<` that introduces none of the above stays literal text. A tag still
/// open when the input ends is dropped without an event; an unterminated
/// comment or quoted value swallows the rest of the input. No state
/// survives between calls.
pub fn scan<V: MarkupVisitor>(input: &str, visitor: &mut V) {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut pos = 0;
    let mut text_start = 0;
    while pos < len {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }
        match bytes.get(pos + 1).copied() {
            Some(c) if c.is_ascii_alphabetic() => {
                emit_text(input, text_start, pos, visitor);
                match parse_start_tag(input, pos) {
                    Some(tag) => {
                        visitor.tag_open(&tag.name, &tag.attrs);
                        pos = tag.end;
                        if tag.name == "script" || tag.name == "style" {
                            pos = emit_raw_section(input, pos, &tag.name, visitor);
                        }
                    }
                    // Tag still open at end of input: drop it.
                    None => pos = len,
                }
                text_start = pos;
            }
            Some(b'/') => {
                emit_text(input, text_start, pos, visitor);
                pos = skip_past_gt(bytes, pos + 2);
                text_start = pos;
            }
            Some(b'!') => {
                emit_text(input, text_start, pos, visitor);
                pos = skip_declaration(bytes, pos);
                text_start = pos;
            }
            Some(b'?') => {
                emit_text(input, text_start, pos, visitor);
                pos = skip_past_gt(bytes, pos + 2);
                text_start = pos;
            }
            // Literal '<' (or input ends here): part of the text run.
            _ => pos += 1,
        }
    }
    emit_text(input, text_start, len, visitor);
}

struct RawTag {
    name: String,
    attrs: Vec<(String, String)>,
    /// Byte offset just past the closing `>`.
    end: usize,
}

/// Parse the start tag opening at `open` (which holds `<`). Returns `None`
/// when the tag never closes before end of input.
fn parse_start_tag(input: &str, open: usize) -> Option<RawTag> {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut i = open + 1;
    let name_start = i;
    while i < len && is_name_byte(bytes[i]) {
        i += 1;
    }
    let name = input[name_start..i].to_ascii_lowercase();
    let mut attrs: Vec<(String, String)> = Vec::new();
    loop {
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= len {
            return None;
        }
        match bytes[i] {
            b'>' => {
                return Some(RawTag {
                    name,
                    attrs,
                    end: i + 1,
                });
            }
            b'/' => i += 1,
            _ => {
                let attr_start = i;
                while i < len
                    && !bytes[i].is_ascii_whitespace()
                    && !matches!(bytes[i], b'=' | b'>' | b'/')
                {
                    i += 1;
                }
                if i == attr_start {
                    // Stray '=' with no attribute name, skip it.
                    i += 1;
                    continue;
                }
                let attr_name = input[attr_start..i].to_ascii_lowercase();
                while i < len && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                let value = if i < len && bytes[i] == b'=' {
                    i += 1;
                    while i < len && bytes[i].is_ascii_whitespace() {
                        i += 1;
                    }
                    if i >= len {
                        return None;
                    }
                    match bytes[i] {
                        quote @ (b'"' | b'\'') => {
                            i += 1;
                            let value_start = i;
                            while i < len && bytes[i] != quote {
                                i += 1;
                            }
                            if i >= len {
                                return None;
                            }
                            let value = input[value_start..i].to_string();
                            i += 1;
                            value
                        }
                        _ => {
                            let value_start = i;
                            while i < len && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                                i += 1;
                            }
                            input[value_start..i].to_string()
                        }
                    }
                } else {
                    String::new()
                };
                attrs.push((attr_name, value));
            }
        }
    }
}

/// Report everything up to the matching close tag as one raw text run.
/// Entities are left undecoded and nested `<` is not markup here.
fn emit_raw_section<V: MarkupVisitor>(
    input: &str,
    from: usize,
    name: &str,
    visitor: &mut V,
) -> usize {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut i = from;
    while i + 1 < len {
        if bytes[i] == b'<' && bytes[i + 1] == b'/' && close_tag_name_at(bytes, i + 2, name) {
            if i > from {
                visitor.text(&input[from..i]);
            }
            return skip_past_gt(bytes, i + 2);
        }
        i += 1;
    }
    if from < len {
        visitor.text(&input[from..]);
    }
    len
}

fn close_tag_name_at(bytes: &[u8], at: usize, name: &str) -> bool {
    let name_bytes = name.as_bytes();
    let end = at + name_bytes.len();
    if end > bytes.len() {
        return false;
    }
    if !bytes[at..end].eq_ignore_ascii_case(name_bytes) {
        return false;
    }
    match bytes.get(end) {
        None => true,
        Some(b) => b.is_ascii_whitespace() || *b == b'>',
    }
}

fn skip_declaration(bytes: &[u8], open: usize) -> usize {
    if bytes[open..].starts_with(b"<!--") {
        match find_subslice(&bytes[open + 4..], b"-->") {
            Some(offset) => open + 4 + offset + 3,
            None => bytes.len(),
        }
    } else {
        skip_past_gt(bytes, open + 2)
    }
}

fn skip_past_gt(bytes: &[u8], from: usize) -> usize {
    let start = from.min(bytes.len());
    match bytes[start..].iter().position(|&b| b == b'>') {
        Some(offset) => start + offset + 1,
        None => bytes.len(),
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b':' | b'_')
}

fn emit_text<V: MarkupVisitor>(input: &str, start: usize, end: usize, visitor: &mut V) {
    if start >= end {
        return;
    }
    let run = &input[start..end];
    if run.contains('&') {
        visitor.text(&decode_entities(run));
    } else {
        visitor.text(run);
    }
}

const ENTITIES: [(&str, &str); 7] = [
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&nbsp;", " "),
];

/// Decode the named entities above in one pass; anything unrecognized is
/// kept literally.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        let mut matched = None;
        for (pattern, replacement) in ENTITIES {
            if tail.starts_with(pattern) {
                matched = Some((pattern.len(), replacement));
                break;
            }
        }
        match matched {
            Some((skip, replacement)) => {
                out.push_str(replacement);
                rest = &tail[skip..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
