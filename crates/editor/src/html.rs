use std::cell::RefCell;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};

use crate::core::{Document, ElementNode, Marks, NBSP, Node, is_block_tag, is_void_tag};

#[derive(Debug)]
enum HtmlToken {
    StartTag {
        name: String,
        attrs: Vec<(String, String)>,
    },
    EndTag(String),
    Text(String),
}

struct HtmlSink {
    tokens: RefCell<Vec<HtmlToken>>,
}

impl TokenSink for HtmlSink {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => {
                let name = tag.name.to_string().to_ascii_lowercase();
                match tag.kind {
                    TagKind::StartTag => {
                        let attrs = tag
                            .attrs
                            .iter()
                            .map(|a| (a.name.local.to_string(), a.value.to_string()))
                            .collect();
                        self.tokens
                            .borrow_mut()
                            .push(HtmlToken::StartTag { name, attrs });
                    }
                    TagKind::EndTag => self.tokens.borrow_mut().push(HtmlToken::EndTag(name)),
                }
            }
            Token::CharacterTokens(s) => {
                self.tokens.borrow_mut().push(HtmlToken::Text(s.to_string()));
            }
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

fn tokenize(html: &str) -> Vec<HtmlToken> {
    let sink = HtmlSink {
        tokens: RefCell::new(Vec::new()),
    };
    let tokenizer = Tokenizer::new(sink, TokenizerOpts::default());
    let mut queue = BufferQueue::default();
    queue.push_back(StrTendril::from(html));
    let _ = tokenizer.feed(&mut queue);
    tokenizer.end();
    tokenizer.sink.tokens.into_inner()
}

#[derive(Debug, Clone, Copy)]
enum MarkKind {
    Bold,
    Italic,
    Underline,
    Strike,
}

fn mark_for_tag(tag: &str) -> Option<MarkKind> {
    match tag {
        "b" | "strong" => Some(MarkKind::Bold),
        "i" | "em" => Some(MarkKind::Italic),
        "u" => Some(MarkKind::Underline),
        "s" | "strike" | "del" => Some(MarkKind::Strike),
        _ => None,
    }
}

/// Elements where whitespace-only text is formatting, not content.
fn drops_whitespace_text(tag: &str) -> bool {
    matches!(
        tag,
        "ol" | "ul" | "table" | "tbody" | "thead" | "tfoot" | "tr"
    )
}

#[derive(Default)]
struct TreeBuilder {
    root: Vec<Node>,
    stack: Vec<ElementNode>,
    marks: Vec<(String, MarkKind)>,
}

impl TreeBuilder {
    fn current_marks(&self) -> Marks {
        let mut marks = Marks::default();
        for (_, kind) in &self.marks {
            match kind {
                MarkKind::Bold => marks.bold = true,
                MarkKind::Italic => marks.italic = true,
                MarkKind::Underline => marks.underline = true,
                MarkKind::Strike => marks.strikethrough = true,
            }
        }
        marks
    }

    fn children_mut(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(el) => &mut el.children,
            None => &mut self.root,
        }
    }

    fn append(&mut self, node: Node) {
        self.children_mut().push(node);
    }

    fn append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let in_structural = self
            .stack
            .last()
            .is_some_and(|el| drops_whitespace_text(&el.tag));
        if in_structural && text.chars().all(|c| c.is_ascii_whitespace()) {
            return;
        }
        let marks = self.current_marks();
        if let Some(Node::Text(last)) = self.children_mut().last_mut() {
            if last.marks == marks {
                last.text.push_str(text);
                return;
            }
        }
        self.append(Node::styled_text(text, marks));
    }

    fn close_top(&mut self) {
        if let Some(el) = self.stack.pop() {
            self.append(Node::Element(el));
        }
    }

    fn close_until(&mut self, tag: &str) {
        if !self.stack.iter().any(|el| el.tag == tag) {
            return;
        }
        while let Some(el) = self.stack.pop() {
            let done = el.tag == tag;
            self.append(Node::Element(el));
            if done {
                break;
            }
        }
    }

    fn start_tag(&mut self, name: String, attrs: Vec<(String, String)>) {
        if let Some(kind) = mark_for_tag(&name) {
            self.marks.push((name, kind));
            return;
        }

        if is_block_tag(&name) && self.stack.last().is_some_and(|el| el.tag == "p") {
            self.close_top();
        }
        if name == "li" {
            let open_item = self
                .stack
                .iter()
                .rev()
                .find(|el| matches!(el.tag.as_str(), "li" | "ol" | "ul"))
                .is_some_and(|el| el.tag == "li");
            if open_item {
                self.close_until("li");
            }
        }

        let mut el = ElementNode::new(name);
        for (k, v) in attrs {
            el.attrs.insert(k, v);
        }
        if is_void_tag(&el.tag) {
            self.append(Node::Element(el));
        } else {
            self.stack.push(el);
        }
    }

    fn end_tag(&mut self, name: &str) {
        if mark_for_tag(name).is_some() {
            if let Some(ix) = self.marks.iter().rposition(|(tag, _)| tag == name) {
                self.marks.remove(ix);
            }
            return;
        }
        if is_void_tag(name) {
            return;
        }
        self.close_until(name);
    }

    fn finish(mut self) -> Vec<Node> {
        while !self.stack.is_empty() {
            self.close_top();
        }
        self.root
    }
}

/// Parses an HTML fragment into nodes. Inline formatting tags become marks on
/// the text leaves they cover; everything else stays an element.
pub fn parse_fragment(html: &str) -> Vec<Node> {
    let mut builder = TreeBuilder::default();
    for token in tokenize(html) {
        match token {
            HtmlToken::StartTag { name, attrs } => builder.start_tag(name, attrs),
            HtmlToken::EndTag(name) => builder.end_tag(&name),
            HtmlToken::Text(text) => builder.append_text(&text),
        }
    }
    builder.finish()
}

pub fn parse_document(html: &str) -> Document {
    Document::new(parse_fragment(html))
}

pub fn serialize_document(doc: &Document) -> String {
    serialize_nodes(&doc.children)
}

pub fn serialize_nodes(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

pub fn serialize_node(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

const MARK_TAGS: [(fn(&Marks) -> bool, &str); 4] = [
    (|m: &Marks| m.bold, "b"),
    (|m: &Marks| m.italic, "i"),
    (|m: &Marks| m.underline, "u"),
    (|m: &Marks| m.strikethrough, "s"),
];

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(t) => {
            if t.text.is_empty() {
                return;
            }
            let open: Vec<&str> = MARK_TAGS
                .iter()
                .filter(|(has, _)| has(&t.marks))
                .map(|(_, tag)| *tag)
                .collect();
            for tag in &open {
                out.push('<');
                out.push_str(tag);
                out.push('>');
            }
            out.push_str(&escape_text(&t.text));
            for tag in open.iter().rev() {
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&html_escape::encode_double_quoted_attribute(value));
                out.push('"');
            }
            out.push('>');
            if is_void_tag(&el.tag) {
                return;
            }
            for child in &el.children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

pub fn escape_text(text: &str) -> String {
    html_escape::encode_text(text).replace(NBSP, "&nbsp;")
}

pub fn escape_attribute(value: &str) -> String {
    html_escape::encode_double_quoted_attribute(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_tags_become_marks() {
        let nodes = parse_fragment("<p>a<strong>b<em>c</em></strong></p>");
        let p = nodes[0].as_element().unwrap();
        assert_eq!(p.children.len(), 3);
        let c = p.children[2].as_text().unwrap();
        assert!(c.marks.bold && c.marks.italic);
    }

    #[test]
    fn serializes_with_sorted_attributes_and_entities() {
        let html = r#"<a target="_blank" href="https://x.test/?a=1&amp;b=2">&lt;x&gt;&nbsp;y</a>"#;
        let nodes = parse_fragment(html);
        assert_eq!(
            serialize_nodes(&nodes),
            r#"<a href="https://x.test/?a=1&amp;b=2" target="_blank">&lt;x&gt;&nbsp;y</a>"#
        );
    }

    #[test]
    fn implicit_closes_for_list_items_and_paragraphs() {
        let nodes = parse_fragment("<ul>\n  <li>a\n  <li>b</ul><p>x<p>y");
        assert_eq!(
            serialize_nodes(&nodes),
            "<ul><li>a\n  </li><li>b</li></ul><p>x</p><p>y</p>"
        );
    }
}
