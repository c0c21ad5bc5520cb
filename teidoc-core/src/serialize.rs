//! Serializer - turns a `DocumentState` back into TEI markup.
//!
//! Passages are written as `p` elements under `text/body`, with their tags
//! nested as inline elements. Tags are flat ranges in the model, so a range
//! that crosses the end of an enclosing tag cannot be expressed as XML; it
//! is clipped to the enclosing element and a warning is logged.

use crate::codec::{self, XmlElement};
use crate::document::TeiDocument;
use crate::error::Result;
use crate::models::{Character, DocumentMetadata, DocumentState, Passage, Relationship, Tag};
use std::cmp::Reverse;

pub const TEI_NAMESPACE: &str = "http://www.tei-c.org/ns/1.0";

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// Serialize the current state of `doc` as a standalone TEI document
pub fn serialize_document(doc: &TeiDocument) -> Result<String> {
    serialize_state(doc.state())
}

pub fn serialize_state(state: &DocumentState) -> Result<String> {
    let body = codec::build(&to_tree(state))?;
    Ok(format!("{}\n{}\n", XML_DECLARATION, body))
}

/// Build the TEI tree for `state`
pub fn to_tree(state: &DocumentState) -> XmlElement {
    let body = state
        .passages
        .iter()
        .fold(XmlElement::new("body"), |body, passage| {
            body.with_child(render_passage(passage))
        });

    let mut tei = XmlElement::new("TEI")
        .with_attribute("xmlns", TEI_NAMESPACE)
        .with_child(render_header(&state.metadata))
        .with_child(XmlElement::new("text").with_child(body));

    if !state.characters.is_empty() || !state.relationships.is_empty() {
        tei = tei.with_child(render_stand_off(&state.characters, &state.relationships));
    }
    tei
}

fn render_header(metadata: &DocumentMetadata) -> XmlElement {
    let title_stmt = XmlElement::new("titleStmt")
        .with_child(XmlElement::new("title").with_text(metadata.title.as_str()))
        .with_child(XmlElement::new("author").with_text(metadata.author.as_str()));

    let mut file_desc = XmlElement::new("fileDesc").with_child(title_stmt);
    if let Some(created) = &metadata.created {
        let date = XmlElement::new("date")
            .with_attribute("when", created.as_str())
            .with_text(created.as_str());
        file_desc = file_desc.with_child(XmlElement::new("publicationStmt").with_child(date));
    }

    XmlElement::new("teiHeader").with_child(file_desc)
}

/// Render one passage, nesting its tags by range
fn render_passage(passage: &Passage) -> XmlElement {
    let text = CharSlicer::new(&passage.content);

    let ordered = render_order(&passage.tags);

    // Open elements with the char offset where each one closes
    let mut stack: Vec<(XmlElement, usize)> = vec![(XmlElement::new("p"), text.len())];
    let mut cursor = 0;

    for tag in ordered {
        while stack.len() > 1 && stack.last().is_some_and(|(_, end)| *end <= tag.range.start) {
            cursor = close_top(&mut stack, &text, cursor);
        }

        let start = tag.range.start.max(cursor);
        if let Some((top, _)) = stack.last_mut() {
            top.push_text(text.slice(cursor, start));
        }
        cursor = start;

        let parent_end = stack.last().map_or(text.len(), |(_, end)| *end);
        let end = if tag.range.end > parent_end {
            tracing::warn!(
                "Tag {} {} crosses an enclosing tag in {}; clipped to {}",
                tag.id,
                tag.range,
                passage.id,
                parent_end
            );
            parent_end
        } else {
            tag.range.end
        };

        stack.push((render_tag(tag), end));
    }

    while stack.len() > 1 {
        cursor = close_top(&mut stack, &text, cursor);
    }

    let (mut p, end) = stack.pop().unwrap_or_else(|| (XmlElement::new("p"), text.len()));
    p.push_text(text.slice(cursor, end));
    p
}

/// Order tags so that each one opens after every tag that encloses it
///
/// Tags sort by start offset, and at equal starts wider tags open first.
/// A zero-length tag keeps its place relative to the tags it was listed
/// with, so `<q/><said>ab</said>` does not turn into `<said><q/>ab</said>`.
fn render_order(tags: &[Tag]) -> Vec<&Tag> {
    let mut indexed: Vec<(usize, &Tag)> = tags.iter().enumerate().collect();
    indexed.sort_by_key(|(_, tag)| tag.range.start);

    let mut ordered = Vec::with_capacity(tags.len());
    let mut rest = indexed.as_slice();
    while let Some((first, _)) = rest.split_first() {
        let start = first.1.range.start;
        let len = rest
            .iter()
            .take_while(|(_, tag)| tag.range.start == start)
            .count();
        let (group, tail) = rest.split_at(len);

        let (empty, mut spans): (Vec<_>, Vec<_>) =
            group.iter().copied().partition(|(_, tag)| tag.range.is_empty());
        spans.sort_by_key(|(_, tag)| Reverse(tag.range.end));

        let mut empty = empty.into_iter().peekable();
        for (index, tag) in spans {
            while let Some((_, before)) = empty.next_if(|&(i, _)| i < index) {
                ordered.push(before);
            }
            ordered.push(tag);
        }
        ordered.extend(empty.map(|(_, tag)| tag));

        rest = tail;
    }
    ordered
}

/// Close the innermost open element and attach it to its parent
fn close_top(stack: &mut Vec<(XmlElement, usize)>, text: &CharSlicer, cursor: usize) -> usize {
    let Some((mut element, end)) = stack.pop() else {
        return cursor;
    };
    element.push_text(text.slice(cursor, end));
    if let Some((parent, _)) = stack.last_mut() {
        parent.children.push(codec::XmlNode::Element(element));
    }
    end.max(cursor)
}

fn render_tag(tag: &Tag) -> XmlElement {
    tag.attributes
        .iter()
        .fold(XmlElement::new(tag.tag_type.as_str()), |el, (key, value)| {
            el.with_attribute(key.as_str(), value.as_str())
        })
}

fn render_stand_off(characters: &[Character], relationships: &[Relationship]) -> XmlElement {
    let mut stand_off = XmlElement::new("standOff");

    if !characters.is_empty() {
        let list = characters
            .iter()
            .fold(XmlElement::new("listPerson"), |list, character| {
                list.with_child(render_person(character))
            });
        stand_off = stand_off.with_child(list);
    }

    if !relationships.is_empty() {
        let list = relationships
            .iter()
            .fold(XmlElement::new("listRelation"), |list, relationship| {
                list.with_child(render_relation(relationship))
            });
        stand_off = stand_off.with_child(list);
    }

    stand_off
}

fn render_person(character: &Character) -> XmlElement {
    let mut person = XmlElement::new("person").with_attribute("xml:id", character.xml_id.as_str());
    if let Some(sex) = &character.sex {
        person = person.with_attribute("sex", sex.as_str());
    }
    if let Some(age) = &character.age {
        person = person.with_attribute("age", age.as_str());
    }
    person.with_child(XmlElement::new("persName").with_text(character.name.as_str()))
}

fn render_relation(relationship: &Relationship) -> XmlElement {
    let mut relation = XmlElement::new("relation")
        .with_attribute("xml:id", relationship.id.as_str())
        .with_attribute("type", relationship.relation_type.as_str());
    if let Some(subtype) = &relationship.subtype {
        relation = relation.with_attribute("subtype", subtype.as_str());
    }

    let from = format!("#{}", relationship.from.xml_id());
    let to = format!("#{}", relationship.to.xml_id());
    if relationship.is_mutual() {
        relation.with_attribute("mutual", format!("{} {}", from, to))
    } else {
        relation
            .with_attribute("active", from)
            .with_attribute("passive", to)
    }
}

/// Slices a string by char offsets
struct CharSlicer<'a> {
    text: &'a str,
    bounds: Vec<usize>,
}

impl<'a> CharSlicer<'a> {
    fn new(text: &'a str) -> Self {
        let bounds = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        Self { text, bounds }
    }

    fn len(&self) -> usize {
        self.bounds.len() - 1
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        let end = end.min(self.len());
        let start = start.min(end);
        &self.text[self.bounds[start]..self.bounds[end]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::{add_said_tag, add_tag};
    use std::collections::BTreeMap;
    use teidoc_types::TextRange;

    const TINY: &str = r##"<TEI><teiHeader><fileDesc><titleStmt><title>T</title><author>A</author></titleStmt></fileDesc></teiHeader><text><body><p><said who="#ann">Hi</said> there</p></body></text><standOff><listPerson><person xml:id="ann" sex="F"><persName>Ann</persName></person></listPerson></standOff></TEI>"##;

    #[test]
    fn test_tiny_document_snapshot() {
        let doc = TeiDocument::load(TINY).unwrap();
        let xml = codec::build(&to_tree(doc.state())).unwrap();
        insta::assert_snapshot!(xml, @r###"<TEI xmlns="http://www.tei-c.org/ns/1.0"><teiHeader><fileDesc><titleStmt><title>T</title><author>A</author></titleStmt></fileDesc></teiHeader><text><body><p><said who="#ann">Hi</said> there</p></body></text><standOff><listPerson><person xml:id="ann" sex="F"><persName>Ann</persName></person></listPerson></standOff></TEI>"###);
    }

    #[test]
    fn test_serialized_document_has_declaration() {
        let doc = TeiDocument::load(TINY).unwrap();
        let xml = serialize_document(&doc).unwrap();
        assert!(xml.starts_with(XML_DECLARATION));
    }

    #[test]
    fn test_round_trip_preserves_passages() {
        let source = r##"<TEI><teiHeader><fileDesc><titleStmt><title>Emma</title></titleStmt>
<publicationStmt><date when="1815"/></publicationStmt></fileDesc></teiHeader>
<text><body>
<p>Emma Woodhouse, <q>handsome, <rs>clever</rs></q>, and rich.</p>
<ab><said who="#emma">Poor Miss Taylor!</said> said she.</ab>
<p>Café &amp; crème — <persName ref="#harriet">Harriet</persName></p>
</body></text>
<standOff>
<listPerson><person xml:id="emma" age="21"><persName>Emma</persName></person></listPerson>
<listRelation><relation xml:id="rel-a" type="friend" active="#emma" passive="#harriet"/></listRelation>
</standOff></TEI>"##;

        let doc = TeiDocument::load(source).unwrap();
        let xml = serialize_document(&doc).unwrap();
        let reloaded = TeiDocument::load(&xml).unwrap();

        let (before, after) = (doc.state(), reloaded.state());
        assert_eq!(before.passages, after.passages);
        assert_eq!(before.metadata, after.metadata);
        assert_eq!(before.characters, after.characters);
        assert_eq!(before.relationships, after.relationships);
        assert_eq!(before.dialogue.len(), after.dialogue.len());
    }

    #[test]
    fn test_edits_are_serialized() {
        let doc = TeiDocument::load("<TEI><text><body><p>abcdef</p></body></text></TEI>").unwrap();
        let passage = doc.state().passages[0].id.clone();
        let doc = add_said_tag(&doc, &passage, TextRange::new(1, 5), None).unwrap();
        let doc = add_tag(&doc, &passage, TextRange::new(2, 3), "q", BTreeMap::new()).unwrap();

        let tree = to_tree(doc.state());
        let xml = codec::build(&tree).unwrap();
        assert!(xml.contains("<p>a<said>b<q>c</q>de</said>f</p>"));
    }

    #[test]
    fn test_crossing_range_is_clipped() {
        let doc = TeiDocument::load("<TEI><text><body><p>abcdef</p></body></text></TEI>").unwrap();
        let passage = doc.state().passages[0].id.clone();
        let doc = add_tag(&doc, &passage, TextRange::new(0, 3), "q", BTreeMap::new()).unwrap();
        let doc = add_tag(&doc, &passage, TextRange::new(2, 5), "rs", BTreeMap::new()).unwrap();

        let xml = codec::build(&to_tree(doc.state())).unwrap();
        assert!(xml.contains("<p><q>ab<rs>c</rs></q>def</p>"));
    }

    #[test]
    fn test_empty_range_tag_is_kept() {
        let doc = TeiDocument::load("<TEI><text><body><p>abc</p></body></text></TEI>").unwrap();
        let passage = doc.state().passages[0].id.clone();
        let doc = add_tag(&doc, &passage, TextRange::new(1, 1), "q", BTreeMap::new()).unwrap();

        let xml = serialize_document(&doc).unwrap();
        let reloaded = TeiDocument::load(&xml).unwrap();
        assert_eq!(reloaded.state().passages[0].tags[0].range, TextRange::new(1, 1));
        assert_eq!(reloaded.state().passages[0].content, "abc");
    }

    #[test]
    fn test_empty_tag_before_container_keeps_its_place() {
        let source = r##"<TEI><text><body><p><q/><said who="#a">ab</said></p><p><said who="#a"><q/>ab</said></p></body></text></TEI>"##;
        let doc = TeiDocument::load(source).unwrap();
        let xml = serialize_document(&doc).unwrap();

        assert!(xml.contains(r##"<p><q/><said who="#a">ab</said></p>"##));
        assert!(xml.contains(r##"<p><said who="#a"><q/>ab</said></p>"##));

        let reloaded = TeiDocument::load(&xml).unwrap();
        assert_eq!(doc.state().passages, reloaded.state().passages);
        assert_eq!(doc.state().dialogue, reloaded.state().dialogue);
    }
}
