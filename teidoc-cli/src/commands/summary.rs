//! Shared document summary for inspect and replay.

use serde::Serialize;
use teidoc_core::TeiDocument;

#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    pub title: String,
    pub author: String,
    pub revision: u64,
    pub head_revision: u64,
    pub events: usize,
    pub passages: usize,
    pub tags: usize,
    pub dialogue: usize,
    pub characters: usize,
    pub relationships: usize,
}

impl DocumentSummary {
    pub fn of(doc: &TeiDocument) -> Self {
        let state = doc.state();
        Self {
            title: state.metadata.title.clone(),
            author: state.metadata.author.clone(),
            revision: doc.revision().as_u64(),
            head_revision: doc.head_revision().as_u64(),
            events: doc.events().len(),
            passages: state.passages.len(),
            tags: state.tag_count(),
            dialogue: state.dialogue.len(),
            characters: state.characters.len(),
            relationships: state.relationships.len(),
        }
    }

    pub fn print(&self) {
        let title = if self.title.is_empty() {
            "(untitled)"
        } else {
            self.title.as_str()
        };
        println!("{}", title);
        if !self.author.is_empty() {
            println!("  by {}", self.author);
        }
        println!(
            "  revision {} of {} ({} events)",
            self.revision, self.head_revision, self.events
        );
        println!(
            "  {} passages, {} tags, {} dialogue lines",
            self.passages, self.tags, self.dialogue
        );
        println!(
            "  {} characters, {} relationships",
            self.characters, self.relationships
        );
    }
}
