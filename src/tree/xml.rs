//! Reader for the XML markup emitted by the structural toolchain.
//!
//! The toolchain output is a deliberately small XML subset: one declaration,
//! nested elements with attributes, character data with the five predefined
//! entities plus numeric character references. Comments, CDATA and processing
//! instructions never occur in toolchain output and are rejected.
//!
//! Namespace prefixes are kept as written (`pos:position` stays
//! `pos:position`); no namespace resolution happens, which keeps the reader
//! deterministic and the tree faithful to the bytes it came from.

use crate::error::Error;
use crate::tree::{Document, Node, NodeId};

/// Parse toolchain XML output into a [`Document`].
pub fn parse_document(input: &[u8]) -> Result<Document, Error> {
    let text = std::str::from_utf8(input)
        .map_err(|e| Error::toolchain(format!("toolchain output is not UTF-8: {e}")))?;
    Parser {
        rest: text,
        offset: 0,
    }
    .parse()
}

struct Parser<'a> {
    rest: &'a str,
    offset: usize,
}

impl<'a> Parser<'a> {
    fn parse(mut self) -> Result<Document, Error> {
        self.skip_prolog();

        let (tag, attrs, self_closing) = self.read_start_tag()?;
        if self_closing {
            let mut root = Node::new(tag);
            root.attrs = attrs;
            return Ok(Document::new(root));
        }

        let mut root = Node::new(tag);
        root.attrs = attrs;
        let mut doc = Document::new(root);
        let root_id = doc.root();
        self.read_content(&mut doc, root_id)?;

        // Only whitespace may follow the root element.
        if !self.rest.trim().is_empty() {
            return Err(self.error("unexpected trailing content after root element"));
        }
        Ok(doc)
    }

    fn skip_prolog(&mut self) {
        loop {
            let trimmed = self.rest.trim_start();
            self.advance(self.rest.len() - trimmed.len());
            if self.rest.starts_with("<?") {
                match self.rest.find("?>") {
                    Some(end) => self.advance(end + 2),
                    None => return,
                }
            } else {
                return;
            }
        }
    }

    /// Read element content up to and including the matching end tag of
    /// `parent`, building children into `doc`.
    fn read_content(&mut self, doc: &mut Document, parent: NodeId) -> Result<(), Error> {
        loop {
            let chunk = self.read_text()?;
            if !chunk.is_empty() {
                self.push_text(doc, parent, chunk);
            }

            if self.rest.starts_with("</") {
                let tag = self.read_end_tag()?;
                if tag != doc.node(parent).tag {
                    return Err(self.error(format!(
                        "mismatched end tag: expected </{}>, found </{}>",
                        doc.node(parent).tag,
                        tag
                    )));
                }
                return Ok(());
            }
            if self.rest.is_empty() {
                return Err(self.error(format!(
                    "unexpected end of input inside <{}>",
                    doc.node(parent).tag
                )));
            }

            let (tag, attrs, self_closing) = self.read_start_tag()?;
            let mut node = Node::new(tag);
            node.attrs = attrs;
            let child = doc.append_child(parent, node);
            if !self_closing {
                self.read_content(doc, child)?;
            }
        }
    }

    /// Accumulate character data up to the next markup boundary.
    fn read_text(&mut self) -> Result<String, Error> {
        let end = self.rest.find('<').unwrap_or(self.rest.len());
        let raw = &self.rest[..end];
        self.advance(end);
        if raw.is_empty() {
            return Ok(String::new());
        }
        unescape(raw).map_err(|detail| self.error(detail))
    }

    fn push_text(&self, doc: &mut Document, parent: NodeId, chunk: String) {
        // Text before the first child belongs to the parent; text after a
        // child is that child's tail.
        let target = doc.node(parent).children.last().copied();
        match target {
            None => append_slot(&mut doc.node_mut(parent).text, &chunk),
            Some(last) => append_slot(&mut doc.node_mut(last).tail, &chunk),
        }
    }

    fn read_start_tag(&mut self) -> Result<(String, Vec<(String, String)>, bool), Error> {
        if self.rest.starts_with("<!") {
            return Err(self.error("comments and CDATA are not part of toolchain output"));
        }
        if !self.rest.starts_with('<') {
            return Err(self.error("expected element start tag"));
        }
        self.advance(1);

        let tag = self.read_name()?;
        let mut attrs = Vec::new();
        loop {
            self.skip_whitespace();
            if self.rest.starts_with("/>") {
                self.advance(2);
                return Ok((tag, attrs, true));
            }
            if self.rest.starts_with('>') {
                self.advance(1);
                return Ok((tag, attrs, false));
            }
            let name = self.read_name()?;
            self.skip_whitespace();
            if !self.rest.starts_with('=') {
                return Err(self.error(format!("attribute {name} is missing a value")));
            }
            self.advance(1);
            self.skip_whitespace();
            let value = self.read_quoted()?;
            attrs.push((name, value));
        }
    }

    fn read_end_tag(&mut self) -> Result<String, Error> {
        self.advance(2); // </
        let tag = self.read_name()?;
        self.skip_whitespace();
        if !self.rest.starts_with('>') {
            return Err(self.error(format!("malformed end tag </{tag}")));
        }
        self.advance(1);
        Ok(tag)
    }

    fn read_name(&mut self) -> Result<String, Error> {
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| !(c.is_alphanumeric() || matches!(c, ':' | '_' | '-' | '.')))
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        if end == 0 {
            return Err(self.error("expected a name"));
        }
        let name = self.rest[..end].to_string();
        self.advance(end);
        Ok(name)
    }

    fn read_quoted(&mut self) -> Result<String, Error> {
        let quote = match self.rest.chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("expected a quoted attribute value")),
        };
        self.advance(1);
        let end = self
            .rest
            .find(quote)
            .ok_or_else(|| self.error("unterminated attribute value"))?;
        let raw = &self.rest[..end];
        self.advance(end + 1);
        unescape(raw).map_err(|detail| self.error(detail))
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest.trim_start();
        self.advance(self.rest.len() - trimmed.len());
    }

    fn advance(&mut self, n: usize) {
        self.offset += n;
        self.rest = &self.rest[n..];
    }

    fn error(&self, detail: impl Into<String>) -> Error {
        Error::toolchain(format!(
            "XML parse error at byte {}: {}",
            self.offset,
            detail.into()
        ))
    }
}

fn append_slot(slot: &mut Option<String>, chunk: &str) {
    match slot {
        Some(existing) => existing.push_str(chunk),
        None => *slot = Some(chunk.to_string()),
    }
}

/// Resolve the predefined entities and numeric character references.
fn unescape(raw: &str) -> Result<String, String> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        let end = rest
            .find(';')
            .ok_or_else(|| format!("unterminated entity in {raw:?}"))?;
        let entity = &rest[1..end];
        match entity {
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "amp" => out.push('&'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            _ => {
                let code = entity
                    .strip_prefix("#x")
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(|dec| dec.parse()))
                    .ok_or_else(|| format!("unknown entity &{entity};"))?
                    .map_err(|_| format!("invalid character reference &{entity};"))?;
                out.push(
                    char::from_u32(code)
                        .ok_or_else(|| format!("invalid character reference &{entity};"))?,
                );
            }
        }
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
