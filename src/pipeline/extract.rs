use scraper::{ElementRef, Html, Selector};

pub const MAX_TEXT_CHARS: usize = 10_000;
const TRUNCATION_MARKER: &str = "...";

const MIN_BLOCK_CHARS: usize = 500;
const MIN_BLOCK_PERIODS: usize = 5;

/// One entry of an ordered selector list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorRule {
    Tag(&'static str),
    /// Tag carrying every listed class.
    TagClasses(&'static str, &'static [&'static str]),
    Class(&'static str),
    /// `tag` anywhere below `ancestor`.
    Within(&'static str, &'static str),
    ClassContains(&'static str),
    IdContains(&'static str),
}

impl SelectorRule {
    pub fn to_css(&self) -> String {
        match self {
            SelectorRule::Tag(tag) => (*tag).to_string(),
            SelectorRule::TagClasses(tag, classes) => format!("{tag}.{}", classes.join(".")),
            SelectorRule::Class(class) => format!(".{class}"),
            SelectorRule::Within(ancestor, tag) => format!("{ancestor} {tag}"),
            SelectorRule::ClassContains(pattern) => format!("[class*=\"{pattern}\"]"),
            SelectorRule::IdContains(pattern) => format!("[id*=\"{pattern}\"]"),
        }
    }

    fn selector(&self) -> Option<Selector> {
        match Selector::parse(&self.to_css()) {
            Ok(selector) => Some(selector),
            Err(err) => {
                tracing::warn!(rule = ?self, error = ?err, "skipping unparsable selector rule");
                None
            }
        }
    }
}

/// Most specific first: known publishing platforms, then generic headings.
pub const TITLE_RULES: &[SelectorRule] = &[
    SelectorRule::TagClasses("h1", &["tm-title"]),
    SelectorRule::TagClasses("h1", &["article__title"]),
    SelectorRule::TagClasses("h1", &["post__title"]),
    SelectorRule::Within("article", "h1"),
    SelectorRule::Tag("h1"),
    SelectorRule::Tag("title"),
];

pub const CONTENT_RULES: &[SelectorRule] = &[
    SelectorRule::TagClasses("div", &["article-formatted-body"]),
    SelectorRule::TagClasses("div", &["content", "content--full"]),
    SelectorRule::TagClasses("div", &["article-content"]),
    SelectorRule::Tag("article"),
    SelectorRule::TagClasses("div", &["post-content"]),
    SelectorRule::Tag("main"),
    SelectorRule::TagClasses("div", &["content"]),
];

const BLOCK_RULES: &[SelectorRule] = &[
    SelectorRule::Tag("div"),
    SelectorRule::Tag("section"),
    SelectorRule::Tag("article"),
];

/// Stripped from the chosen content node before rendering.
pub const NOISE_RULES: &[SelectorRule] = &[
    SelectorRule::Tag("script"),
    SelectorRule::Tag("style"),
    SelectorRule::Tag("nav"),
    SelectorRule::Tag("iframe"),
    SelectorRule::Class("comments"),
    SelectorRule::Class("tm-comments"),
    SelectorRule::Tag("footer"),
    SelectorRule::Class("ad"),
    SelectorRule::Class("ads"),
    SelectorRule::Class("advertisement"),
    SelectorRule::Class("social-share"),
    SelectorRule::Class("share"),
    SelectorRule::Class("header"),
    SelectorRule::Class("menu"),
    SelectorRule::Class("sidebar"),
    SelectorRule::Tag("form"),
    SelectorRule::Tag("button"),
    SelectorRule::Tag("input"),
    SelectorRule::ClassContains("comment"),
    SelectorRule::IdContains("comment"),
    SelectorRule::ClassContains("ad"),
    SelectorRule::IdContains("ad"),
    SelectorRule::ClassContains("banner"),
    SelectorRule::IdContains("banner"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub html: String,
    pub text: String,
}

/// Parsed HTML page.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
        }
    }

    pub fn find_first(&self, rule: &SelectorRule) -> Option<ElementRef<'_>> {
        let selector = rule.selector()?;
        self.html.select(&selector).next()
    }

    /// Every element matching any of `rules`, in document order.
    pub fn find_all(&self, rules: &[SelectorRule]) -> Vec<ElementRef<'_>> {
        let css = rules
            .iter()
            .map(SelectorRule::to_css)
            .collect::<Vec<_>>()
            .join(", ");
        let found = match Selector::parse(&css) {
            Ok(selector) => self.html.select(&selector).collect(),
            Err(err) => {
                tracing::warn!(selector = %css, error = ?err, "skipping unparsable selector list");
                Vec::new()
            }
        };
        found
    }

    fn body(&self) -> ElementRef<'_> {
        self.find_first(&SelectorRule::Tag("body"))
            .unwrap_or_else(|| self.html.root_element())
    }
}

/// First non-empty heading from [`TITLE_RULES`], or an empty string.
pub fn extract_title(doc: &Document) -> String {
    TITLE_RULES
        .iter()
        .filter_map(|rule| doc.find_first(rule))
        .map(|element| element.text().collect::<String>().trim().to_string())
        .find(|title| !title.is_empty())
        .unwrap_or_default()
}

pub fn extract_main_content(mut doc: Document) -> ExtractedContent {
    let target = select_content_node(&doc).id();

    let noisy: Vec<_> = doc
        .find_all(NOISE_RULES)
        .into_iter()
        .filter(|element| element.id() != target && element.ancestors().any(|a| a.id() == target))
        .map(|element| element.id())
        .collect();
    for id in noisy {
        if let Some(mut node) = doc.html.tree.get_mut(id) {
            node.detach();
        }
    }

    let Some(content) = doc.html.tree.get(target).and_then(ElementRef::wrap) else {
        return ExtractedContent {
            html: String::new(),
            text: String::new(),
        };
    };

    ExtractedContent {
        html: content.inner_html(),
        text: truncate_text(&collapse_whitespace(&content.text().collect::<String>())),
    }
}

fn select_content_node(doc: &Document) -> ElementRef<'_> {
    if let Some(element) = CONTENT_RULES
        .iter()
        .filter_map(|rule| doc.find_first(rule))
        .find(|element| element.text().any(|chunk| !chunk.trim().is_empty()))
    {
        return element;
    }

    densest_block(doc).unwrap_or_else(|| doc.body())
}

/// Longest text-heavy container; the first one seen wins among equals.
fn densest_block(doc: &Document) -> Option<ElementRef<'_>> {
    let mut best: Option<(ElementRef<'_>, usize)> = None;
    for element in doc.find_all(BLOCK_RULES) {
        let text = element.text().collect::<String>();
        let length = text.chars().count();
        if length <= MIN_BLOCK_CHARS || text.matches('.').count() <= MIN_BLOCK_PERIODS {
            continue;
        }
        if best.map_or(true, |(_, best_len)| length > best_len) {
            best = Some((element, length));
        }
    }
    best.map(|(element, _)| element)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn truncate_text(text: &str) -> String {
    match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences(count: usize, filler: usize) -> String {
        let sentence = format!("{}.", "w".repeat(filler));
        sentence.repeat(count)
    }

    #[test]
    fn rules_render_to_css() {
        assert_eq!(
            SelectorRule::TagClasses("div", &["content", "content--full"]).to_css(),
            "div.content.content--full"
        );
        assert_eq!(SelectorRule::Within("article", "h1").to_css(), "article h1");
        assert_eq!(SelectorRule::IdContains("banner").to_css(), "[id*=\"banner\"]");
        for rule in TITLE_RULES.iter().chain(CONTENT_RULES).chain(NOISE_RULES) {
            assert!(rule.selector().is_some(), "rule {rule:?} must parse");
        }
    }

    #[test]
    fn find_all_merges_rules_in_document_order() {
        let doc = Document::parse(
            r#"<body><div id="top-banner">b</div><aside>a</aside><footer>f</footer></body>"#,
        );
        let names: Vec<&str> = doc
            .find_all(&[
                SelectorRule::Tag("footer"),
                SelectorRule::IdContains("banner"),
                SelectorRule::Tag("aside"),
            ])
            .iter()
            .map(|element| element.value().name())
            .collect();
        assert_eq!(names, ["div", "aside", "footer"]);

        assert!(doc.find_all(&[SelectorRule::Tag("<<")]).is_empty());
    }

    #[test]
    fn title_prefers_platform_heading() {
        let doc = Document::parse(
            "<html><head><title>Page</title></head><body><h1>Generic</h1><h1 class=\"tm-title\"> Habr </h1></body></html>",
        );
        assert_eq!(extract_title(&doc), "Habr");
    }

    #[test]
    fn title_skips_blank_headings_and_falls_back_to_title_tag() {
        let doc = Document::parse(
            "<html><head><title> From head </title></head><body><h1>   </h1></body></html>",
        );
        assert_eq!(extract_title(&doc), "From head");
    }

    #[test]
    fn title_is_empty_when_nothing_matches() {
        let doc = Document::parse("<html><body><p>no headings</p></body></html>");
        assert_eq!(extract_title(&doc), "");
    }

    #[test]
    fn content_rules_apply_in_order() {
        let doc = Document::parse(
            "<html><body><main><p>main text</p></main><article><p>article text</p></article></body></html>",
        );
        let content = extract_main_content(doc);
        assert_eq!(content.text, "article text");
        assert_eq!(content.html, "<p>article text</p>");
    }

    #[test]
    fn empty_structural_match_is_skipped() {
        let doc = Document::parse(
            "<html><body><article>  </article><main><p>real body</p></main></body></html>",
        );
        assert_eq!(extract_main_content(doc).text, "real body");
    }

    #[test]
    fn density_fallback_picks_long_block() {
        let long = sentences(6, 99);
        let short = "s".repeat(300);
        let html = format!(
            "<html><body><div id=\"short\">{short}</div><div id=\"long\">{long}</div></body></html>"
        );
        assert_eq!(long.chars().count(), 600);

        let content = extract_main_content(Document::parse(&html));
        assert_eq!(content.text, long);
    }

    #[test]
    fn density_requires_enough_periods() {
        let few_periods = format!("{}.", "x".repeat(700));
        let html = format!("<html><body><div>{few_periods}</div>\n<p>tail</p></body></html>");
        let content = extract_main_content(Document::parse(&html));
        assert_eq!(content.text, format!("{few_periods} tail"));
    }

    #[test]
    fn density_tie_keeps_first_seen() {
        let first = sentences(6, 99).replace('w', "a");
        let second = sentences(6, 99).replace('w', "b");
        let html = format!("<html><body><section>{first}</section><section>{second}</section></body></html>");
        assert_eq!(extract_main_content(Document::parse(&html)).text, first);
    }

    #[test]
    fn falls_back_to_body() {
        let doc = Document::parse("<html><body><p>short</p> <span>note</span></body></html>");
        let content = extract_main_content(doc);
        assert_eq!(content.text, "short note");
    }

    #[test]
    fn strips_noise_from_selected_node() {
        let doc = Document::parse(concat!(
            "<html><body><article>",
            "<p>Keep  this\n text</p>",
            "<script>var x = 1;</script>",
            "<div class=\"ad-banner\">Buy now</div>",
            "<section id=\"comments-list\">First!</section>",
            "<nav>menu</nav>",
            "<form><input name=\"q\"></form>",
            "<div class=\"share\">share me</div>",
            "</article></body></html>",
        ));
        let content = extract_main_content(doc);
        assert_eq!(content.text, "Keep this text");
        assert_eq!(content.html, "<p>Keep  this\n text</p>");
    }

    #[test]
    fn truncates_long_text() {
        let text = "a".repeat(10_050);
        let truncated = truncate_text(&text);
        assert_eq!(truncated.chars().count(), 10_003);
        assert!(truncated.ends_with("..."));
        assert_eq!(&truncated[..10_000], &text[..10_000]);
    }

    #[test]
    fn keeps_text_at_limit_and_counts_characters() {
        assert_eq!(truncate_text(&"b".repeat(10_000)).len(), 10_000);
        let cyrillic = "я".repeat(10_001);
        let truncated = truncate_text(&cyrillic);
        assert_eq!(truncated.chars().count(), 10_003);
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(collapse_whitespace("  a \n\t b  c "), "a b c");
    }
}
