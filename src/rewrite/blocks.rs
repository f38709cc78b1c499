// src/rewrite/blocks.rs
// =============================================================================
// Block markup: rich content stored as HTML with comment delimiters.
//
//   <!-- wp:image {"id":12,"url":"http://site/a.png"} -->
//   <figure><img src="http://site/a.png"/></figure>
//   <!-- /wp:image -->
//
// A block has a name, optional JSON attributes, inner HTML, and may contain
// further blocks. Void blocks (`<!-- wp:spacer /-->`) have no body. Text
// outside any block becomes a "freeform" block with no name.
//
// parse_blocks + serialize_blocks reproduce markup byte for byte. Attribute
// JSON keeps its original text until `edit_attrs` reports a change; only then
// is it written back out in canonical form.
// =============================================================================

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    Html(String),
    /// Position of the next entry of `inner_blocks`
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    Paired,
    Void,
    /// Opened but never closed before the end of the document
    Unclosed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// None for freeform HTML between blocks
    pub name: Option<String>,
    pub attrs: Option<Map<String, Value>>,
    pub inner_blocks: Vec<Block>,
    pub inner_content: Vec<Chunk>,
    /// The attribute JSON as it appeared in the delimiter
    raw_attrs: Option<String>,
    form: Form,
}

impl Block {
    fn named(token: Token, form: Form) -> Self {
        Block {
            name: Some(token.name),
            attrs: token.attrs,
            inner_blocks: Vec::new(),
            inner_content: Vec::new(),
            raw_attrs: token.raw_attrs,
            form,
        }
    }

    fn freeform(html: &str) -> Self {
        Block {
            name: None,
            attrs: None,
            inner_blocks: Vec::new(),
            inner_content: vec![Chunk::Html(html.to_string())],
            raw_attrs: None,
            form: Form::Paired,
        }
    }

    /// Lets `f` edit the attributes in place. `f` returns how many values it
    /// changed; when that is zero the original attribute text is kept.
    pub fn edit_attrs(&mut self, f: impl FnOnce(&mut Map<String, Value>) -> usize) -> usize {
        let Some(attrs) = self.attrs.as_mut() else {
            return 0;
        };
        let changed = f(attrs);
        if changed > 0 {
            self.raw_attrs = None;
        }
        changed
    }

    // The HTML directly inside this block, not inside nested blocks
    pub fn html_mut(&mut self) -> impl Iterator<Item = &mut String> + '_ {
        self.inner_content.iter_mut().filter_map(|chunk| match chunk {
            Chunk::Html(html) => Some(html),
            Chunk::Block => None,
        })
    }

    // Visits this block and every block nested inside it, depth first
    pub fn for_each_mut(&mut self, f: &mut dyn FnMut(&mut Block)) {
        f(self);
        for inner in &mut self.inner_blocks {
            inner.for_each_mut(f);
        }
    }
}

pub fn has_blocks(content: &str) -> bool {
    content.contains("<!-- wp:")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Opener,
    Closer,
    Void,
}

#[derive(Debug)]
struct Token {
    kind: Delimiter,
    name: String,
    attrs: Option<Map<String, Value>>,
    raw_attrs: Option<String>,
    start: usize,
    end: usize,
}

pub fn parse_blocks(document: &str) -> Vec<Block> {
    let mut output: Vec<Block> = Vec::new();
    let mut stack: Vec<Block> = Vec::new();
    let mut offset = 0;

    while let Some(token) = next_token(document, offset) {
        push_html(&mut output, &mut stack, &document[offset..token.start]);

        let end = token.end;
        match token.kind {
            Delimiter::Void => {
                let block = Block::named(token, Form::Void);
                push_block(&mut output, &mut stack, block);
            }
            Delimiter::Opener => stack.push(Block::named(token, Form::Unclosed)),
            Delimiter::Closer => match stack.pop() {
                Some(mut block) => {
                    block.form = Form::Paired;
                    push_block(&mut output, &mut stack, block);
                }
                // A closer with nothing open is just text
                None => push_html(&mut output, &mut stack, &document[token.start..token.end]),
            },
        }

        offset = end;
    }

    push_html(&mut output, &mut stack, &document[offset..]);

    while let Some(block) = stack.pop() {
        push_block(&mut output, &mut stack, block);
    }

    output
}

pub fn serialize_blocks(blocks: &[Block]) -> String {
    blocks.iter().map(serialize_block).collect()
}

fn serialize_block(block: &Block) -> String {
    let mut out = String::new();

    let Some(name) = &block.name else {
        for chunk in &block.inner_content {
            if let Chunk::Html(html) = chunk {
                out.push_str(html);
            }
        }
        return out;
    };

    out.push_str("<!-- wp:");
    out.push_str(name);
    out.push(' ');
    match (&block.raw_attrs, &block.attrs) {
        (Some(raw), _) => {
            out.push_str(raw);
            out.push(' ');
        }
        (None, Some(attrs)) => {
            out.push_str(&serialize_attrs(attrs));
            out.push(' ');
        }
        (None, None) => {}
    }

    if block.form == Form::Void {
        out.push_str("/-->");
        return out;
    }
    out.push_str("-->");

    let mut inner_blocks = block.inner_blocks.iter();
    for chunk in &block.inner_content {
        match chunk {
            Chunk::Html(html) => out.push_str(html),
            Chunk::Block => {
                if let Some(inner) = inner_blocks.next() {
                    out.push_str(&serialize_block(inner));
                }
            }
        }
    }

    if block.form == Form::Paired {
        out.push_str("<!-- /wp:");
        out.push_str(name);
        out.push_str(" -->");
    }
    out
}

// Attribute JSON must never close the surrounding comment or open markup,
// so these sequences are written as unicode escapes
fn serialize_attrs(attrs: &Map<String, Value>) -> String {
    Value::Object(attrs.clone())
        .to_string()
        .replace("--", "\\u002d\\u002d")
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
        .replace("\\\"", "\\u0022")
}

fn push_html(output: &mut Vec<Block>, stack: &mut [Block], html: &str) {
    if html.is_empty() {
        return;
    }

    if let Some(open) = stack.last_mut() {
        open.inner_content.push(Chunk::Html(html.to_string()));
        return;
    }

    // Keep neighbouring loose text in a single freeform block
    if let Some(last) = output.last_mut() {
        if last.name.is_none() {
            last.inner_content.push(Chunk::Html(html.to_string()));
            return;
        }
    }
    output.push(Block::freeform(html));
}

fn push_block(output: &mut Vec<Block>, stack: &mut [Block], block: Block) {
    match stack.last_mut() {
        Some(parent) => {
            parent.inner_blocks.push(block);
            parent.inner_content.push(Chunk::Block);
        }
        None => output.push(block),
    }
}

fn next_token(document: &str, from: usize) -> Option<Token> {
    let mut search = from;
    while let Some(found) = document[search..].find("<!--") {
        let start = search + found;
        if let Some(token) = parse_delimiter(document, start) {
            return Some(token);
        }
        search = start + 4;
    }
    None
}

// Recognizes `<!-- wp:name {attrs} -->`, `<!-- /wp:name -->` and
// `<!-- wp:name {attrs} /-->` starting at `start`. Ordinary comments and
// delimiters with malformed attributes yield None and stay plain HTML.
fn parse_delimiter(document: &str, start: usize) -> Option<Token> {
    let after_open = &document[start + 4..];
    let close = after_open.find("-->")?;
    let inner = &after_open[..close];
    let end = start + 4 + close + 3;

    if !inner.starts_with(char::is_whitespace) {
        return None;
    }
    let inner = inner.trim_start();

    let (is_closer, inner) = match inner.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, inner),
    };
    let inner = inner.strip_prefix("wp:")?;

    let name_len = inner
        .find(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '/')))
        .unwrap_or(inner.len());
    let name = &inner[..name_len];
    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        return None;
    }

    let rest = &inner[name_len..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim();

    if is_closer {
        return rest.is_empty().then(|| Token {
            kind: Delimiter::Closer,
            name: name.to_string(),
            attrs: None,
            raw_attrs: None,
            start,
            end,
        });
    }

    let (kind, rest) = match rest.strip_suffix('/') {
        Some(body) => (Delimiter::Void, body.trim_end()),
        None => (Delimiter::Opener, rest),
    };

    let attrs = if rest.is_empty() {
        None
    } else if rest.starts_with('{') && rest.ends_with('}') {
        Some(serde_json::from_str::<Map<String, Value>>(rest).ok()?)
    } else {
        return None;
    };

    Some(Token {
        kind,
        name: name.to_string(),
        raw_attrs: attrs.as_ref().map(|_| rest.to_string()),
        attrs,
        start,
        end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const POST: &str = concat!(
        "<p>intro</p>\n",
        "<!-- wp:image {\"id\":12,\"url\":\"http://site.test/a.png\"} -->\n",
        "<figure><img src=\"http://site.test/a.png\"/></figure>\n",
        "<!-- /wp:image -->\n",
        "<!-- wp:columns -->\n",
        "<div><!-- wp:column {\"width\":\"50%\"} -->\n",
        "<div><!-- wp:paragraph --><p>hi</p><!-- /wp:paragraph --></div>\n",
        "<!-- /wp:column --></div>\n",
        "<!-- /wp:columns -->\n",
        "<!-- wp:spacer {\"height\":\"20px\"} /-->\n",
        "<!-- wp:my-plugin/card /-->"
    );

    #[test]
    fn test_canonical_markup_round_trips() {
        let blocks = parse_blocks(POST);
        assert_eq!(serialize_blocks(&blocks), POST);
    }

    #[test]
    fn test_structure() {
        let blocks = parse_blocks(POST);
        let names: Vec<Option<&str>> = blocks.iter().map(|b| b.name.as_deref()).collect();
        assert_eq!(
            names,
            vec![
                None,
                Some("image"),
                None,
                Some("columns"),
                None,
                Some("spacer"),
                None,
                Some("my-plugin/card")
            ]
        );

        let image = &blocks[1];
        assert_eq!(image.attrs.as_ref().unwrap()["id"], 12);

        let column = &blocks[3].inner_blocks[0];
        assert_eq!(column.name.as_deref(), Some("column"));
        assert_eq!(column.inner_blocks[0].name.as_deref(), Some("paragraph"));
    }

    #[test]
    fn test_plain_comments_and_bad_attrs_stay_html() {
        let doc = "<!-- just a note --><!-- wp:image {not json} --><p>x</p>";
        let blocks = parse_blocks(doc);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].name.is_none());
        assert_eq!(serialize_blocks(&blocks), doc);
    }

    #[test]
    fn test_unclosed_and_stray_closer() {
        let doc = "<!-- /wp:quote --><!-- wp:group --><p>open</p>";
        let blocks = parse_blocks(doc);
        assert_eq!(serialize_blocks(&blocks), doc);
        assert_eq!(blocks[1].name.as_deref(), Some("group"));
    }

    #[test]
    fn test_attrs_are_escaped_on_output() {
        let doc = r#"<!-- wp:html {"content":"\u003cb\u003ea \u0026 b\u003c/b\u003e \u0022q\u0022 x\u002d\u002dy"} /-->"#;
        let mut blocks = parse_blocks(doc);
        assert_eq!(
            blocks[0].attrs.as_ref().unwrap()["content"],
            "<b>a & b</b> \"q\" x--y"
        );

        blocks[0].edit_attrs(|attrs| {
            attrs.insert("content".into(), json!("<b>c & d</b> \"q\" x--y"));
            1
        });
        assert_eq!(
            serialize_blocks(&blocks),
            r#"<!-- wp:html {"content":"\u003cb\u003ec \u0026 d\u003c/b\u003e \u0022q\u0022 x\u002d\u002dy"} /-->"#
        );
    }

    #[test]
    fn test_untouched_attrs_keep_their_formatting() {
        let doc = "<!-- wp:image { \"id\": 5, \"url\": \"http:\\/\\/site.test\\/a.png\" } -->\n<img/>\n<!-- /wp:image -->";
        let mut blocks = parse_blocks(doc);

        assert_eq!(blocks[0].edit_attrs(|_| 0), 0);
        assert_eq!(serialize_blocks(&blocks), doc);

        // Once something changes, the whole attribute object is normalized
        blocks[0].edit_attrs(|attrs| {
            attrs.insert("id".into(), json!(6));
            1
        });
        assert_eq!(
            serialize_blocks(&blocks),
            "<!-- wp:image {\"id\":6,\"url\":\"http://site.test/a.png\"} -->\n<img/>\n<!-- /wp:image -->"
        );
    }

    #[test]
    fn test_html_mut_skips_nested_blocks() {
        let mut blocks = parse_blocks(POST);
        let columns = &mut blocks[3];
        let html: Vec<String> = columns.html_mut().map(|h| h.clone()).collect();
        assert_eq!(html, vec!["\n<div>", "</div>\n"]);
    }

    #[test]
    fn test_for_each_mut_visits_nested() {
        let mut blocks = parse_blocks(POST);
        let mut seen = Vec::new();
        for block in &mut blocks {
            block.for_each_mut(&mut |b| {
                if let Some(name) = &b.name {
                    seen.push(name.clone());
                }
            });
        }
        assert_eq!(seen, vec!["image", "columns", "column", "paragraph", "spacer", "my-plugin/card"]);
    }
}
