//! A minimal element tree over quick-xml, shared by the format loaders, and
//! an indenting writer shared by the savers.

use std::borrow::Cow;
use std::io::{self, Write};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ParseError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first child called `name`, if it has any.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
    }
}

/// Reads a whole document and returns its root element.
///
/// Anything after the root element is ignored.
pub(crate) fn parse(source: &[u8]) -> Result<Element, ParseError> {
    let source = source.strip_prefix(UTF8_BOM).unwrap_or(source);
    let mut reader = Reader::from_reader(source);
    reader.trim_text(true);
    let decoder = reader.decoder();

    let mut stack: Vec<Element> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => stack.push(open_element(&start, decoder)?),
            Event::Empty(start) => {
                let element = open_element(&start, decoder)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Ok(element),
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ParseError::Malformed("Unbalanced closing tag.".into()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Ok(element),
                }
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&decoder.decode(&data)?);
                }
            }
            Event::Eof => {
                return Err(ParseError::Malformed(match stack.last() {
                    Some(open) => format!("Unexpected end of document inside <{}>.", open.name),
                    None => "Document has no root element.".to_string(),
                }))
            }
            _ => {}
        }
        buf.clear();
    }
}

fn open_element(start: &BytesStart<'_>, decoder: quick_xml::encoding::Decoder) -> Result<Element, ParseError> {
    let mut element = Element {
        name: decoder.decode(start.name().as_ref())?.into_owned(),
        ..Element::default()
    };
    for attr in start.attributes() {
        let attr = attr?;
        let key = decoder.decode(attr.key.as_ref())?.into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

/// Parses the payload and checks the root element's name.
pub(crate) fn parse_root(source: &[u8], expected: &'static str) -> Result<Element, ParseError> {
    let root = parse(source)?;
    if root.name != expected {
        return Err(ParseError::UnexpectedRoot {
            expected,
            found: root.name,
        });
    }
    Ok(root)
}

/// Writes indented XML, two spaces per level.
pub(crate) struct XmlWriter<'w> {
    out: &'w mut dyn Write,
    depth: usize,
}

impl<'w> XmlWriter<'w> {
    pub fn new(out: &'w mut dyn Write) -> Self {
        XmlWriter { out, depth: 0 }
    }

    pub fn declaration(&mut self) -> io::Result<()> {
        writeln!(self.out, "<?xml version='1.0' encoding='utf-8'?>")
    }

    pub fn open(&mut self, name: &str, attributes: &[(&str, &str)]) -> io::Result<()> {
        self.indent()?;
        write!(self.out, "<{}", name)?;
        self.write_attributes(attributes)?;
        writeln!(self.out, ">")?;
        self.depth += 1;
        Ok(())
    }

    pub fn close(&mut self, name: &str) -> io::Result<()> {
        self.depth = self.depth.saturating_sub(1);
        self.indent()?;
        writeln!(self.out, "</{}>", name)
    }

    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> io::Result<()> {
        self.indent()?;
        write!(self.out, "<{}", name)?;
        self.write_attributes(attributes)?;
        writeln!(self.out, "/>")
    }

    pub fn text_element(&mut self, name: &str, text: &str) -> io::Result<()> {
        self.text_element_with(name, &[], text)
    }

    pub fn text_element_with(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> io::Result<()> {
        self.indent()?;
        write!(self.out, "<{}", name)?;
        self.write_attributes(attributes)?;
        writeln!(self.out, ">{}</{}>", escape(text), name)
    }

    fn write_attributes(&mut self, attributes: &[(&str, &str)]) -> io::Result<()> {
        for (key, value) in attributes {
            write!(self.out, " {}=\"{}\"", key, escape(value))?;
        }
        Ok(())
    }

    fn indent(&mut self) -> io::Result<()> {
        for _ in 0..self.depth {
            self.out.write_all(b"  ")?;
        }
        Ok(())
    }
}

fn escape(text: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_attributes() {
        let xml = "\u{FEFF}<?xml version='1.0'?>\n<root a=\"1 &amp; 2\"><child>  hi &lt;there&gt; </child><empty x='y'/></root>";
        let root = parse(xml.as_bytes()).unwrap();
        assert_eq!(root.name, "root");
        assert_eq!(root.attr("a"), Some("1 & 2"));
        assert_eq!(root.child_text("child"), Some("hi <there>"));
        assert_eq!(root.child("empty").unwrap().attr("x"), Some("y"));
        assert_eq!(root.child_text("empty"), None);
    }

    #[test]
    fn unclosed_document_is_malformed() {
        let err = parse(b"<root><child>").unwrap_err();
        assert!(matches!(err, ParseError::Malformed(_)));
    }

    #[test]
    fn wrong_root_is_reported() {
        let err = parse_root(b"<other/>", "openrocket").unwrap_err();
        match err {
            ParseError::UnexpectedRoot { expected, found } => {
                assert_eq!(expected, "openrocket");
                assert_eq!(found, "other");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn writer_output_parses_back() {
        let mut out = Vec::new();
        {
            let mut w = XmlWriter::new(&mut out);
            w.declaration().unwrap();
            w.open("root", &[("v", "\"q\"")]).unwrap();
            w.text_element("name", "a < b").unwrap();
            w.empty("decal", &[("name", "x&y.png")]).unwrap();
            w.close("root").unwrap();
        }
        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.contains("\n  <name>a &lt; b</name>\n"));

        let root = parse(&out).unwrap();
        assert_eq!(root.attr("v"), Some("\"q\""));
        assert_eq!(root.child_text("name"), Some("a < b"));
        assert_eq!(root.child("decal").unwrap().attr("name"), Some("x&y.png"));
    }
}
