//! Document state builder - turns parsed TEI into a `DocumentState`.
//!
//! Extraction order: metadata from the header, passages (with their tags)
//! from the text, characters from the person list, relationships from the
//! relation list.

use crate::{
    codec::{self, XmlElement, XmlNode},
    document::TeiDocument,
    error::Result,
    identity::{generate_passage_id, loaded_relationship_id, loaded_tag_id, root_lineage},
    models::*,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use teidoc_types::{CharacterId, RelationshipId, Revision, TextRange};

/// Element names treated as paragraph-level passages
pub const PASSAGE_ELEMENTS: [&str; 3] = ["p", "ab", "l"];

/// Subtrees never searched for passages
const NON_TEXT_SECTIONS: [&str; 2] = ["teiHeader", "standOff"];

/// Parse `xml` and wrap it as a revision-0 document with a single `loaded` event
pub fn load_document(xml: &str) -> Result<TeiDocument> {
    let state = build_state(xml)?;
    tracing::info!(
        "Loaded document with {} passages, {} tags, {} characters",
        state.passages.len(),
        state.tag_count(),
        state.characters.len()
    );
    Ok(TeiDocument::from_loaded(state))
}

/// Parse `xml` and materialize its state at revision 0
pub fn build_state(xml: &str) -> Result<DocumentState> {
    let tree = codec::parse(xml)?;

    let metadata = extract_metadata(&tree);
    let passages = extract_passages(&tree);
    let characters = extract_characters(&tree);
    let relationships = extract_relationships(&tree);

    let dialogue = passages
        .iter()
        .flat_map(|passage| {
            passage
                .tags
                .iter()
                .filter(|tag| tag.tag_type == TagType::Said)
                .map(move |tag| dialogue_entry(passage, tag, speaker_from_attributes(&tag.attributes)))
        })
        .collect();

    Ok(DocumentState {
        xml: Arc::from(xml),
        parsed_tree: Arc::new(tree),
        revision: Revision::ZERO,
        lineage: root_lineage(xml),
        metadata,
        passages,
        dialogue,
        characters,
        relationships,
    })
}

/// Dialogue view of a said tag
pub(crate) fn dialogue_entry(
    passage: &Passage,
    tag: &Tag,
    speaker: Option<CharacterId>,
) -> Dialogue {
    Dialogue {
        id: tag.id.clone(),
        passage_id: passage.id.clone(),
        range: tag.range,
        speaker,
        content: tag.range.slice(&passage.content).to_string(),
    }
}

/// Speaker named by a `who` pointer attribute (`#xmlId`, first pointer wins)
pub fn speaker_from_attributes(attributes: &BTreeMap<String, String>) -> Option<CharacterId> {
    attributes
        .get("who")
        .and_then(|who| first_pointer(who))
        .map(CharacterId::from_xml_id)
}

fn first_pointer(value: &str) -> Option<&str> {
    value
        .split_whitespace()
        .next()
        .map(|p| p.trim_start_matches('#'))
        .filter(|p| !p.is_empty())
}

fn xml_id(element: &XmlElement) -> Option<&str> {
    element
        .attribute("xml:id")
        .or_else(|| element.attribute("id"))
}

fn trimmed_text(element: Option<&XmlElement>) -> Option<String> {
    element
        .map(|el| el.text().trim().to_string())
        .filter(|text| !text.is_empty())
}

fn extract_metadata(tree: &XmlElement) -> DocumentMetadata {
    let Some(header) = tree.find_descendant("teiHeader") else {
        return DocumentMetadata::default();
    };

    let created = header.find_descendant("date").and_then(|date| {
        date.attribute("when")
            .map(str::to_string)
            .or_else(|| trimmed_text(Some(date)))
    });

    DocumentMetadata {
        title: trimmed_text(header.find_descendant("title")).unwrap_or_default(),
        author: trimmed_text(header.find_descendant("author")).unwrap_or_default(),
        created,
    }
}

fn extract_passages(tree: &XmlElement) -> Vec<Passage> {
    let scope = tree.find_descendant("text").unwrap_or(tree);
    let mut elements = Vec::new();
    collect_passage_elements(scope, &mut elements);

    elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| {
            let mut flattener = Flattener::new(index);
            flattener.visit(element);
            Passage {
                id: generate_passage_id(&flattener.content, index),
                index,
                content: flattener.content,
                tags: flattener.tags,
            }
        })
        .collect()
}

fn collect_passage_elements<'a>(element: &'a XmlElement, out: &mut Vec<&'a XmlElement>) {
    for child in element.child_elements() {
        let name = child.local_name();
        if PASSAGE_ELEMENTS.contains(&name) {
            out.push(child);
        } else if !NON_TEXT_SECTIONS.contains(&name) {
            collect_passage_elements(child, out);
        }
    }
}

/// Flattens a passage element into text while recording tag offsets
struct Flattener {
    passage_index: usize,
    content: String,
    offset: usize,
    tags: Vec<Tag>,
}

impl Flattener {
    fn new(passage_index: usize) -> Self {
        Self {
            passage_index,
            content: String::new(),
            offset: 0,
            tags: Vec::new(),
        }
    }

    fn visit(&mut self, element: &XmlElement) {
        for child in &element.children {
            match child {
                XmlNode::Text(text) => {
                    self.content.push_str(text);
                    self.offset += text.chars().count();
                }
                XmlNode::Element(inner) if TagType::is_known(inner.local_name()) => {
                    // Reserve the slot first so outer tags precede inner ones
                    let slot = self.tags.len();
                    self.tags.push(Tag {
                        id: loaded_tag_id(self.passage_index, slot),
                        tag_type: TagType::from_name(inner.local_name()),
                        range: TextRange::new(self.offset, self.offset),
                        attributes: inner.attributes.iter().cloned().collect(),
                    });
                    self.visit(inner);
                    self.tags[slot].range.end = self.offset;
                }
                XmlNode::Element(inner) => self.visit(inner),
            }
        }
    }
}

fn extract_characters(tree: &XmlElement) -> Vec<Character> {
    tree.find_descendants("listPerson")
        .into_iter()
        .flat_map(|list| list.find_descendants("person"))
        .filter_map(|person| {
            let Some(id) = xml_id(person) else {
                tracing::debug!("Skipping person without xml:id");
                return None;
            };
            let name = trimmed_text(person.find_descendant("persName"))
                .unwrap_or_else(|| id.to_string());
            Some(Character {
                id: CharacterId::from_xml_id(id),
                xml_id: id.to_string(),
                name,
                sex: person
                    .attribute("sex")
                    .map(str::to_string)
                    .or_else(|| trimmed_text(person.find_child("sex"))),
                age: person
                    .attribute("age")
                    .map(str::to_string)
                    .or_else(|| trimmed_text(person.find_child("age"))),
            })
        })
        .collect()
}

fn extract_relationships(tree: &XmlElement) -> Vec<Relationship> {
    tree.find_descendants("listRelation")
        .into_iter()
        .flat_map(|list| list.find_descendants("relation"))
        .enumerate()
        .filter_map(|(ordinal, relation)| {
            let id = xml_id(relation)
                .map(RelationshipId::from)
                .unwrap_or_else(|| loaded_relationship_id(ordinal));

            let (from, to, mutual) = match relation.attribute("mutual") {
                Some(mutual) => {
                    let mut pointers = mutual
                        .split_whitespace()
                        .map(|p| p.trim_start_matches('#'));
                    (pointers.next(), pointers.next(), Some(true))
                }
                None => (
                    relation.attribute("active").and_then(first_pointer),
                    relation.attribute("passive").and_then(first_pointer),
                    None,
                ),
            };

            let (Some(from), Some(to)) = (from, to) else {
                tracing::warn!("Skipping relation {} without two endpoints", id);
                return None;
            };

            let relation_type = relation
                .attribute("type")
                .or_else(|| relation.attribute("name"))
                .unwrap_or("related");

            Some(Relationship {
                id,
                from: CharacterId::from_xml_id(from),
                to: CharacterId::from_xml_id(to),
                relation_type: relation_type.to_string(),
                subtype: relation.attribute("subtype").map(str::to_string),
                mutual,
            })
        })
        .collect()
}
