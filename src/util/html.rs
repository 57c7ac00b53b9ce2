use std::{
    collections::{HashMap, HashSet},
    sync::OnceLock,
};

use regex::Regex;
use scraper::{node::Node, ElementRef, Html};
use url::Url;

/// Allowlist-based HTML cleaner for untrusted page fragments.
///
/// Elements outside the allowlist are unwrapped (their children survive),
/// except for raw-text and embedding elements which are dropped together with
/// their content. Attributes survive only when listed for the element or
/// globally; URL-bearing attributes must be relative or use an allowed scheme.
///
/// The policy is immutable after construction and is shared by reference
/// between concurrent requests.
#[derive(Debug, Clone)]
pub struct SanitizePolicy {
    allowed_tags: HashSet<&'static str>,
    global_attrs: HashSet<&'static str>,
    tag_attrs: HashMap<&'static str, HashSet<&'static str>>,
    url_attrs: HashSet<&'static str>,
    url_schemes: HashSet<&'static str>,
    dropped_with_content: HashSet<&'static str>,
}

const UGC_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "b", "bdi", "bdo", "blockquote", "br", "caption", "cite", "code",
    "col", "colgroup", "dd", "del", "details", "dfn", "div", "dl", "dt", "em", "figcaption",
    "figure", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i", "img", "ins", "kbd", "li", "mark",
    "ol", "p", "pre", "q", "rp", "rt", "ruby", "s", "samp", "small", "span", "strike", "strong",
    "sub", "summary", "sup", "table", "tbody", "td", "tfoot", "th", "thead", "time", "tr", "tt",
    "u", "ul", "var", "wbr",
];

const DROPPED_WITH_CONTENT: &[&str] = &[
    "script", "style", "noscript", "iframe", "frame", "frameset", "object", "embed", "applet",
    "template", "textarea", "select", "svg", "math", "head", "title",
];

const VOID_TAGS: &[&str] = &["area", "br", "col", "hr", "img", "wbr"];

const MAX_SANITIZE_PASSES: usize = 4;

impl SanitizePolicy {
    /// Policy for user-generated content: common structure and formatting,
    /// links and images, no scripting, styling or embedded documents.
    pub fn ugc() -> Self {
        let tag_attrs: HashMap<&'static str, HashSet<&'static str>> = [
            ("a", vec!["href"]),
            ("img", vec!["src", "alt", "width", "height"]),
            ("blockquote", vec!["cite"]),
            ("q", vec!["cite"]),
            ("del", vec!["cite", "datetime"]),
            ("ins", vec!["cite", "datetime"]),
            ("time", vec!["datetime"]),
            ("ol", vec!["start", "type", "reversed"]),
            ("li", vec!["value"]),
            ("td", vec!["colspan", "rowspan", "headers"]),
            ("th", vec!["colspan", "rowspan", "headers", "scope"]),
            ("col", vec!["span"]),
            ("colgroup", vec!["span"]),
            ("details", vec!["open"]),
        ]
        .into_iter()
        .map(|(tag, attrs)| (tag, attrs.into_iter().collect()))
        .collect();

        Self {
            allowed_tags: UGC_TAGS.iter().copied().collect(),
            global_attrs: ["dir", "lang", "title"].into_iter().collect(),
            tag_attrs,
            url_attrs: ["href", "src", "cite"].into_iter().collect(),
            url_schemes: ["http", "https", "mailto"].into_iter().collect(),
            dropped_with_content: DROPPED_WITH_CONTENT.iter().copied().collect(),
        }
    }

    pub fn sanitize(&self, fragment: &str) -> String {
        if fragment.trim().is_empty() {
            return String::new();
        }

        // Unwrapping can leave nesting the parser refuses to build (`<p>` in
        // `<p>`, `<a>` in `<a>`); re-parse until the output is stable.
        let mut current = self.sanitize_pass(fragment);
        for _ in 1..MAX_SANITIZE_PASSES {
            let next = self.sanitize_pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
        tracing::debug!(bytes = current.len(), "sanitizer output did not settle");
        current
    }

    fn sanitize_pass(&self, fragment: &str) -> String {
        let parsed = Html::parse_fragment(fragment);
        let mut out = String::with_capacity(fragment.len());
        self.write_children(parsed.root_element(), &mut out);
        out
    }

    fn write_children(&self, parent: ElementRef<'_>, out: &mut String) {
        for child in parent.children() {
            match child.value() {
                Node::Text(text) => out.push_str(&escape_text(text)),
                Node::Element(_) => {
                    if let Some(element) = ElementRef::wrap(child) {
                        self.write_element(element, out);
                    }
                }
                _ => {}
            }
        }
    }

    fn write_element(&self, element: ElementRef<'_>, out: &mut String) {
        let name = element.value().name();

        if self.dropped_with_content.contains(name) {
            return;
        }
        if !self.allowed_tags.contains(name) {
            self.write_children(element, out);
            return;
        }

        out.push('<');
        out.push_str(name);

        let mut attrs: Vec<(&str, &str)> = element.value().attrs().collect();
        attrs.sort_unstable_by_key(|(attr, _)| *attr);

        let mut has_href = false;
        for (attr, value) in attrs {
            if !self.attr_allowed(name, attr) {
                continue;
            }
            if self.url_attrs.contains(attr) && !self.url_allowed(value) {
                continue;
            }
            has_href |= name == "a" && attr == "href";
            out.push(' ');
            out.push_str(attr);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
        if has_href {
            out.push_str(" rel=\"nofollow\"");
        }
        out.push('>');

        if VOID_TAGS.contains(&name) {
            return;
        }

        // The parser swallows one newline right after <pre>; re-emit it so a
        // second pass sees the same text.
        if name == "pre" && starts_with_newline(element) {
            out.push('\n');
        }

        self.write_children(element, out);

        out.push_str("</");
        out.push_str(name);
        out.push('>');
    }

    fn attr_allowed(&self, tag: &str, attr: &str) -> bool {
        if attr.starts_with("on") {
            return false;
        }
        self.global_attrs.contains(attr)
            || self
                .tag_attrs
                .get(tag)
                .map(|attrs| attrs.contains(attr))
                .unwrap_or(false)
    }

    fn url_allowed(&self, value: &str) -> bool {
        match Url::parse(value.trim()) {
            Ok(parsed) => self.url_schemes.contains(parsed.scheme()),
            Err(url::ParseError::RelativeUrlWithoutBase) => true,
            Err(_) => false,
        }
    }
}

fn starts_with_newline(element: ElementRef<'_>) -> bool {
    element
        .children()
        .next()
        .and_then(|child| match child.value() {
            Node::Text(text) => Some(text.starts_with('\n')),
            _ => None,
        })
        .unwrap_or(false)
}

pub fn escape_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_attr(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn empty_tag_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"<p>\s*</p>",
            r"<div>\s*</div>",
            r"<span>\s*</span>",
            r"<strong>\s*</strong>",
            r"<em>\s*</em>",
            r"<h[1-6]>\s*</h[1-6]>",
        ]
        .into_iter()
        .map(|pattern| Regex::new(pattern).expect("empty tag pattern is valid"))
        .collect()
    })
}

/// Drops attribute-less block and inline tags that hold nothing but
/// whitespace. Works on serialized HTML, one pattern after another.
pub fn remove_empty_tags(html: &str) -> String {
    let mut html = html.to_string();
    for pattern in empty_tag_patterns() {
        html = pattern.replace_all(&html, "").into_owned();
    }
    html
}

/// Wraps a sanitized fragment in the styled container shown by the frontend.
pub fn wrap_content(html: &str) -> String {
    format!(
        concat!(
            "<div class=\"parsed-content\" style=\"",
            "font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; ",
            "line-height: 1.7; ",
            "color: #333; ",
            "max-width: 100%; ",
            "overflow-wrap: break-word;",
            "\">{}</div>"
        ),
        html
    )
}

/// Sanitize, drop empty tags, wrap.
pub fn format_content(policy: &SanitizePolicy, raw_html: &str) -> String {
    let cleaned = policy.sanitize(raw_html);
    wrap_content(&remove_empty_tags(&cleaned))
}

/// Minimal container for content that did not come from a page: the text is
/// escaped and placed in a single paragraph.
pub fn wrap_plain_text(policy: &SanitizePolicy, text: &str) -> String {
    let paragraph = format!("<p>{}</p>", escape_text(text));
    format!(
        "<div class=\"parsed-content\">{}</div>",
        policy.sanitize(&paragraph)
    )
}
