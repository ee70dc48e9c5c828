//! Markdown compiler for chat replies
//!
//! Reply text is never trusted as markup: it is escaped first, split into
//! paragraph blocks on blank lines, and rewritten with a handful of inline
//! rules (bold, italic, line breaks, simple `-`/`*` lists). The output only
//! ever uses the tags in [`Tag`].
//!
//! The same restricted tag set is what gets persisted in the chat history, so
//! [`parse_fragment`] can read both the compiler's own output and restored
//! history back into a [`Fragment`].

use std::sync::OnceLock;

use regex::Regex;

/// The only tags a compiled message can contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    P,
    Strong,
    Em,
    Br,
    Ul,
    Li,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::P => "p",
            Tag::Strong => "strong",
            Tag::Em => "em",
            Tag::Br => "br",
            Tag::Ul => "ul",
            Tag::Li => "li",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "p" => Some(Tag::P),
            "strong" => Some(Tag::Strong),
            "em" => Some(Tag::Em),
            "br" => Some(Tag::Br),
            "ul" => Some(Tag::Ul),
            "li" => Some(Tag::Li),
            _ => None,
        }
    }

    /// Void tags have no children and no closing tag
    pub fn is_void(&self) -> bool {
        matches!(self, Tag::Br)
    }
}

/// A node of a compiled message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Text(String),
    Element {
        tag: Tag,
        attributes: Vec<(String, String)>,
        children: Vec<MarkupNode>,
    },
}

impl MarkupNode {
    pub fn text(text: impl Into<String>) -> Self {
        MarkupNode::Text(text.into())
    }

    pub fn element(tag: Tag, children: Vec<MarkupNode>) -> Self {
        MarkupNode::Element {
            tag,
            attributes: Vec::new(),
            children,
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            MarkupNode::Text(text) => out.push_str(&escape_html(text)),
            MarkupNode::Element {
                tag,
                attributes,
                children,
            } => {
                out.push('<');
                out.push_str(tag.as_str());
                for (name, value) in attributes {
                    out.push_str(&format!(" {}=\"{}\"", name, escape_html(value)));
                }
                out.push('>');
                if tag.is_void() {
                    return;
                }
                for child in children {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(tag.as_str());
                out.push('>');
            }
        }
    }

    fn write_text(&self, out: &mut String) {
        match self {
            MarkupNode::Text(text) => out.push_str(text),
            MarkupNode::Element { tag: Tag::Br, .. } => out.push('\n'),
            MarkupNode::Element { children, .. } => {
                for child in children {
                    child.write_text(out);
                }
            }
        }
    }
}

/// An ordered run of top-level nodes (the compiled message body)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub children: Vec<MarkupNode>,
}

impl Fragment {
    pub fn new(children: Vec<MarkupNode>) -> Self {
        Self { children }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.write_html(&mut out);
        }
        out
    }

    /// Text content with `br` rendered as newlines
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.write_text(&mut out);
        }
        out
    }
}

fn paragraph_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{2,}").expect("valid paragraph regex"))
}

fn bold() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid bold regex"))
}

fn italic() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*(.+?)\*").expect("valid italic regex"))
}

fn list_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[-*]\s+").expect("valid list regex"))
}

fn list_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-*]\s+").expect("valid marker regex"))
}

fn line_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\r?\n").expect("valid line break regex"))
}

/// Escape the five HTML-significant characters. `&` goes first so the
/// entities produced for the others are not escaped again.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Compile raw reply text to markup. Empty input yields an empty string.
pub fn compile_html(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let escaped = escape_html(raw);
    paragraph_break()
        .split(&escaped)
        .map(|block| compile_block(block.trim()))
        .collect()
}

/// Compile raw reply text straight to a tree
pub fn compile(raw: &str) -> Fragment {
    parse_fragment(&compile_html(raw))
}

fn compile_block(block: &str) -> String {
    // Bold runs first so its markers are gone before italics are matched
    let html = bold().replace_all(block, "<strong>${1}</strong>");
    let html = italic().replace_all(&html, "<em>${1}</em>");

    if list_line().is_match(&html) {
        let items: String = line_break()
            .split(&html)
            .map(|line| format!("<li>{}</li>", list_marker().replace(line, "")))
            .collect();
        return format!("<ul>{}</ul>", items);
    }

    format!("<p>{}</p>", line_break().replace_all(&html, "<br>"))
}

/// Decode the entities the escaper produces (plus a few common ones)
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let decoded = rest.find(';').and_then(|end| {
            let entity = &rest[1..end];
            decode_entity(entity).map(|c| (c, end + 1))
        });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = entity.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

struct OpenElement {
    tag: Option<Tag>,
    attributes: Vec<(String, String)>,
    children: Vec<MarkupNode>,
}

/// Builds a tree from a flat stream of tags and text, closing mis-nested
/// elements the way a forgiving HTML parser would
struct TreeBuilder {
    stack: Vec<OpenElement>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![OpenElement {
                tag: None,
                attributes: Vec::new(),
                children: Vec::new(),
            }],
        }
    }

    fn current(&mut self) -> &mut Vec<MarkupNode> {
        let last = self.stack.len() - 1;
        &mut self.stack[last].children
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let children = self.current();
        if let Some(MarkupNode::Text(previous)) = children.last_mut() {
            previous.push_str(text);
        } else {
            children.push(MarkupNode::Text(text.to_string()));
        }
    }

    fn open(&mut self, tag: Tag, attributes: Vec<(String, String)>) {
        if tag.is_void() {
            self.current().push(MarkupNode::Element {
                tag,
                attributes,
                children: Vec::new(),
            });
            return;
        }
        self.stack.push(OpenElement {
            tag: Some(tag),
            attributes,
            children: Vec::new(),
        });
    }

    fn close(&mut self, tag: Tag) {
        let Some(index) = self.stack.iter().rposition(|open| open.tag == Some(tag)) else {
            return;
        };
        while self.stack.len() > index {
            self.pop();
        }
    }

    fn pop(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        if let Some(open) = self.stack.pop() {
            if let Some(tag) = open.tag {
                self.current().push(MarkupNode::Element {
                    tag,
                    attributes: open.attributes,
                    children: open.children,
                });
            }
        }
    }

    fn finish(mut self) -> Fragment {
        while self.stack.len() > 1 {
            self.pop();
        }
        let root = self.stack.pop().map(|open| open.children).unwrap_or_default();
        Fragment::new(root)
    }
}

/// Parse restricted markup into a tree.
///
/// Unknown tags are dropped but their content is kept, a closing tag that is
/// not open is ignored, and attributes of known tags are kept in order.
pub fn parse_fragment(html: &str) -> Fragment {
    let mut builder = TreeBuilder::new();
    let mut rest = html;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('<') {
            if let Some(end) = after.find('>') {
                handle_tag(&mut builder, &after[..end]);
                rest = &after[end + 1..];
            } else {
                builder.text("<");
                rest = after;
            }
            continue;
        }

        let next = rest.find('<').unwrap_or(rest.len());
        builder.text(&decode_entities(&rest[..next]));
        rest = &rest[next..];
    }

    builder.finish()
}

fn handle_tag(builder: &mut TreeBuilder, inner: &str) {
    let inner = inner.trim();
    if inner.starts_with('!') || inner.starts_with('?') {
        return;
    }

    if let Some(name) = inner.strip_prefix('/') {
        if let Some(tag) = Tag::from_name(name.trim()) {
            builder.close(tag);
        }
        return;
    }

    let inner = inner.strip_suffix('/').unwrap_or(inner);
    let name_end = inner
        .find(|c: char| c.is_whitespace())
        .unwrap_or(inner.len());
    if let Some(tag) = Tag::from_name(&inner[..name_end]) {
        builder.open(tag, parse_attributes(&inner[name_end..]));
    }
}

fn parse_attributes(source: &str) -> Vec<(String, String)> {
    let mut attributes = Vec::new();
    let mut rest = source.trim_start();

    while !rest.is_empty() {
        let name_end = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_ascii_lowercase();
        rest = rest[name_end..].trim_start();

        let value = if let Some(after) = rest.strip_prefix('=') {
            let after = after.trim_start();
            match after.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let body = &after[1..];
                    let end = body.find(quote).unwrap_or(body.len());
                    rest = body.get(end + 1..).unwrap_or("");
                    decode_entities(&body[..end])
                }
                _ => {
                    let end = after
                        .find(char::is_whitespace)
                        .unwrap_or(after.len());
                    rest = &after[end..];
                    decode_entities(&after[..end])
                }
            }
        } else {
            String::new()
        };

        if !name.is_empty() {
            attributes.push((name, value));
        }
        rest = rest.trim_start();
    }

    attributes
}
