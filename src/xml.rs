//! Owned element tree for inventory captures, built from `quick-xml` pull
//! events.

use anyhow::{bail, Context, Error};
use quick_xml::{events::Event, Reader};

/// A node in the element tree. Text is stored as written, whitespace included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written in the document, e.g. `CLAR:Disk`.
    name: String,
    children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Parse a complete XML document.
    pub fn parse(xml: &str) -> Result<Self, Error> {
        let mut reader = Reader::from_str(xml);

        // Open elements, innermost last
        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;

        loop {
            let event = reader
                .read_event()
                .with_context(|| format!("Malformed XML at byte {}", reader.buffer_position()))?;

            match event {
                Event::Start(start) => {
                    let name = String::from_utf8(start.name().as_ref().to_vec())
                        .context("Element name is not valid UTF-8")?;
                    stack.push(Element::new(name));
                }
                Event::Empty(start) => {
                    let name = String::from_utf8(start.name().as_ref().to_vec())
                        .context("Element name is not valid UTF-8")?;
                    attach(&mut stack, &mut root, Element::new(name))?;
                }
                Event::End(_) => {
                    let element = stack.pop().context("Unbalanced closing tag")?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text.unescape().context("Failed to unescape text")?;
                    push_text(&mut stack, text.into_owned());
                }
                Event::CData(cdata) => {
                    push_text(&mut stack, String::from_utf8_lossy(&cdata).into_owned());
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            bail!("Unexpected end of document inside '{}'", stack[stack.len() - 1].name);
        }

        Ok(Document {
            root: root.context("Document has no root element")?,
        })
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// All elements matching `//step0/step1/...`: the first step may appear
    /// anywhere in the document, each following step is a direct child.
    pub fn select(&self, path: &[&str]) -> Vec<&Element> {
        let Some((first, rest)) = path.split_first() else {
            return Vec::new();
        };

        let mut matches: Vec<&Element> = self
            .root
            .descendants()
            .filter(|element| element.name == *first)
            .collect();

        for step in rest {
            matches = matches
                .into_iter()
                .flat_map(|element| element.child_elements().filter(|child| child.name == *step))
                .collect();
        }

        matches
    }

    /// First element in document order matching the path, see [`Document::select`].
    pub fn select_first(&self, path: &[&str]) -> Option<&Element> {
        self.select(path).into_iter().next()
    }
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), Error> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => bail!("Multiple root elements, second is '{}'", element.name),
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: String) {
    // Text outside the root element is ignored
    if text.is_empty() {
        return;
    }
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Text(text));
    }
}

impl Element {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Qualified name as written in the document.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name with any namespace prefix stripped.
    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Direct child elements in document order, text nodes skipped.
    pub fn child_elements(&self) -> impl DoubleEndedIterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// First direct child element with the given local name.
    pub fn child(&self, local_name: &str) -> Option<&Element> {
        self.child_elements()
            .find(|child| child.local_name() == local_name)
    }

    /// This element and every element below it, in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Text content: every descendant text node concatenated, untrimmed.
    pub fn text(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) => element.collect_text(out),
            }
        }
    }
}

/// Pre-order iterator over an element subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        self.stack.extend(element.child_elements().rev());
        Some(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = indoc::indoc! {r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <SAN:SAN xmlns:SAN="urn:san" xmlns:CLAR="urn:clar">
          <SAN:Servers>
            <SAN:Server>
              <SAN:Name>spa</SAN:Name>
              <SAN:Note><![CDATA[ raw <text> ]]></SAN:Note>
            </SAN:Server>
            <SAN:Server>
              <SAN:Name>spb &amp; co</SAN:Name>
              <SAN:Empty/>
            </SAN:Server>
          </SAN:Servers>
          <!-- comment -->
          <CLAR:Physicals>
            <CLAR:Disks>
              <CLAR:Disk><CLAR:Name>d0</CLAR:Name></CLAR:Disk>
            </CLAR:Disks>
          </CLAR:Physicals>
        </SAN:SAN>
    "#};

    #[test]
    fn test_parse_tree() {
        let doc = Document::parse(SAMPLE).unwrap();
        let root = doc.root();
        assert_eq!(root.name(), "SAN:SAN");
        assert_eq!(root.local_name(), "SAN");
        assert_eq!(root.child_elements().count(), 2);

        let servers = root.child("Servers").unwrap();
        let names: Vec<String> = servers
            .child_elements()
            .map(|s| s.child("Name").unwrap().text())
            .collect();
        assert_eq!(names, vec!["spa", "spb & co"]);
    }

    #[test]
    fn test_cdata_and_empty_elements() {
        let doc = Document::parse(SAMPLE).unwrap();
        let servers = doc.select(&["SAN:SAN", "SAN:Servers", "SAN:Server"]);
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].child("Note").unwrap().text(), " raw <text> ");

        let empty = servers[1].child("Empty").unwrap();
        assert!(empty.children().is_empty());
        assert_eq!(empty.text(), "");
    }

    #[test]
    fn test_whitespace_outside_root_is_dropped() {
        let doc = Document::parse("\n  <a> x </a>\n").unwrap();
        assert_eq!(doc.root().children(), &[Node::Text(" x ".into())]);
    }

    #[test]
    fn test_select_paths() {
        let doc = Document::parse(SAMPLE).unwrap();

        // The first step matches at any depth
        let disks = doc.select(&["CLAR:Disks", "CLAR:Disk"]);
        assert_eq!(disks.len(), 1);
        assert_eq!(disks[0].text(), "d0");

        // Steps match qualified names
        assert!(doc.select(&["Disks", "Disk"]).is_empty());
        assert!(doc.select(&["SAN:Physicals"]).is_empty());
        assert!(doc.select(&[]).is_empty());

        assert_eq!(
            doc.select_first(&["SAN:Servers", "SAN:Server"])
                .unwrap()
                .child("Name")
                .unwrap()
                .text(),
            "spa"
        );
    }

    #[test]
    fn test_descendants_order() {
        let doc = Document::parse("<a><b><c/></b><d/></a>").unwrap();
        let order: Vec<&str> = doc.root().descendants().map(|e| e.name()).collect();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_text_concatenates_descendants() {
        let doc = Document::parse("<a><b>1</b><c><d>2</d>3</c></a>").unwrap();
        assert_eq!(doc.root().text(), "123");
    }

    #[test]
    fn test_text_keeps_inner_whitespace() {
        let doc = Document::parse("<Name>a <B>b</B></Name>").unwrap();
        assert_eq!(doc.root().text(), "a b");

        let doc = Document::parse("<a>\n  <b>1</b>\n  <c>2</c>\n</a>").unwrap();
        assert_eq!(doc.root().text(), "\n  1\n  2\n");
        assert_eq!(doc.root().child_elements().count(), 2);
    }

    #[test]
    fn test_parse_failures() {
        Document::parse("").unwrap_err();
        Document::parse("<a><b></a>").unwrap_err();
        Document::parse("<a>").unwrap_err();
        Document::parse("<a/><b/>").unwrap_err();
    }
}
