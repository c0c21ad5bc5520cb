//! Document model: passages, tags, characters, relationships and dialogue.

use crate::codec::XmlElement;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use teidoc_types::{CharacterId, Lineage, PassageId, RelationshipId, Revision, TagId, TextRange};

/// Kind of annotation a tag represents
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TagType {
    Said,
    Q,
    Quote,
    PersName,
    PlaceName,
    OrgName,
    Rs,
    /// Caller-supplied element name outside the known set
    Other(String),
}

impl TagType {
    /// Element names the loader extracts as tags
    pub const KNOWN: [&'static str; 7] =
        ["said", "q", "quote", "persName", "placeName", "orgName", "rs"];

    pub fn from_name(name: &str) -> Self {
        match name {
            "said" => TagType::Said,
            "q" => TagType::Q,
            "quote" => TagType::Quote,
            "persName" => TagType::PersName,
            "placeName" => TagType::PlaceName,
            "orgName" => TagType::OrgName,
            "rs" => TagType::Rs,
            other => TagType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TagType::Said => "said",
            TagType::Q => "q",
            TagType::Quote => "quote",
            TagType::PersName => "persName",
            TagType::PlaceName => "placeName",
            TagType::OrgName => "orgName",
            TagType::Rs => "rs",
            TagType::Other(name) => name,
        }
    }

    pub fn is_known(name: &str) -> bool {
        Self::KNOWN.contains(&name)
    }
}

impl From<String> for TagType {
    fn from(name: String) -> Self {
        TagType::from_name(&name)
    }
}

impl From<TagType> for String {
    fn from(tag_type: TagType) -> Self {
        tag_type.as_str().to_string()
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An annotation span over a passage's text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,

    #[serde(rename = "type")]
    pub tag_type: TagType,

    pub range: TextRange,

    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// A paragraph-level unit of text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub id: PassageId,

    /// Display-order hint, not an identifier
    pub index: usize,

    /// Flattened text of the passage
    pub content: String,

    pub tags: Vec<Tag>,
}

impl Passage {
    /// Length of the content in characters
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    pub fn find_tag(&self, tag_id: &TagId) -> Option<&Tag> {
        self.tags.iter().find(|t| &t.id == tag_id)
    }
}

/// A person from the document's person list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: CharacterId,
    pub xml_id: String,
    pub name: String,

    #[serde(default)]
    pub sex: Option<String>,

    #[serde(default)]
    pub age: Option<String>,
}

impl Character {
    /// Create a character whose ID is derived from `xml_id`
    pub fn new(xml_id: impl Into<String>, name: impl Into<String>) -> Self {
        let xml_id = xml_id.into();
        Self {
            id: CharacterId::from_xml_id(&xml_id),
            xml_id,
            name: name.into(),
            sex: None,
            age: None,
        }
    }

    pub fn with_sex(mut self, sex: impl Into<String>) -> Self {
        self.sex = Some(sex.into());
        self
    }

    pub fn with_age(mut self, age: impl Into<String>) -> Self {
        self.age = Some(age.into());
        self
    }
}

/// Partial update merged into an existing character; `None` fields are kept
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterUpdate {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub sex: Option<String>,

    #[serde(default)]
    pub age: Option<String>,
}

impl CharacterUpdate {
    pub fn merge_into(&self, character: &Character) -> Character {
        Character {
            name: self.name.clone().unwrap_or_else(|| character.name.clone()),
            sex: self.sex.clone().or_else(|| character.sex.clone()),
            age: self.age.clone().or_else(|| character.age.clone()),
            ..character.clone()
        }
    }
}

/// A directed (or mutual) relation between two characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub from: CharacterId,
    pub to: CharacterId,

    #[serde(rename = "type")]
    pub relation_type: String,

    #[serde(default)]
    pub subtype: Option<String>,

    #[serde(default)]
    pub mutual: Option<bool>,
}

impl Relationship {
    pub fn new(
        id: impl Into<RelationshipId>,
        from: CharacterId,
        to: CharacterId,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            from,
            to,
            relation_type: relation_type.into(),
            subtype: None,
            mutual: None,
        }
    }

    pub fn is_mutual(&self) -> bool {
        self.mutual.unwrap_or(false)
    }
}

/// Materialized view of a said-typed tag; shares the tag's ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dialogue {
    pub id: TagId,
    pub passage_id: PassageId,
    pub range: TextRange,
    pub speaker: Option<CharacterId>,
    pub content: String,
}

/// Header metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: String,

    /// Publication date from the header, when present
    #[serde(default)]
    pub created: Option<String>,
}

/// Fully materialized snapshot of a document at one revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentState {
    /// Markup the document was loaded from
    pub xml: Arc<str>,

    pub parsed_tree: Arc<XmlElement>,

    /// Revision of the most recently applied event
    pub revision: Revision,

    /// Digest of the markup and every event applied since loading
    pub lineage: Lineage,

    pub metadata: DocumentMetadata,
    pub passages: Vec<Passage>,
    pub dialogue: Vec<Dialogue>,
    pub characters: Vec<Character>,
    pub relationships: Vec<Relationship>,
}

impl DocumentState {
    pub fn passage(&self, id: &PassageId) -> Option<&Passage> {
        self.passages.iter().find(|p| &p.id == id)
    }

    pub fn character(&self, id: &CharacterId) -> Option<&Character> {
        self.characters.iter().find(|c| &c.id == id)
    }

    pub fn relationship(&self, id: &RelationshipId) -> Option<&Relationship> {
        self.relationships.iter().find(|r| &r.id == id)
    }

    /// Locate a tag and the passage holding it
    pub fn find_tag(&self, tag_id: &TagId) -> Option<(&Passage, &Tag)> {
        self.passages
            .iter()
            .find_map(|p| p.find_tag(tag_id).map(|t| (p, t)))
    }

    pub fn tag_count(&self) -> usize {
        self.passages.iter().map(|p| p.tags.len()).sum()
    }
}
