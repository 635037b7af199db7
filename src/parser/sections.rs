use super::blocks::Block;

/// Content between one heading and the next.
#[derive(Debug, Clone)]
pub struct Section {
    /// `None` for the lead content before the first heading.
    pub heading: Option<String>,
    pub level: u8,
    pub blocks: Vec<Block>,
}

impl Section {
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(Block::paragraph_text)
    }

    pub fn first_paragraph(&self) -> Option<&str> {
        self.paragraphs().next()
    }

    pub fn list_items(&self) -> impl Iterator<Item = &Block> {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::ListItem { .. }))
    }

    pub fn heading_mentions(&self, words: &[&str]) -> bool {
        self.heading.as_deref().is_some_and(|h| {
            let h = h.to_lowercase();
            words.iter().any(|w| h.contains(w))
        })
    }
}

/// Split blocks into sections at every heading.
pub fn cluster_sections(blocks: &[Block]) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = Section {
        heading: None,
        level: 0,
        blocks: Vec::new(),
    };
    for block in blocks {
        if let Block::Heading { level, text } = block {
            let next = Section {
                heading: Some(text.clone()),
                level: *level,
                blocks: Vec::new(),
            };
            let done = std::mem::replace(&mut current, next);
            if done.heading.is_some() || !done.blocks.is_empty() {
                sections.push(done);
            }
        } else {
            current.blocks.push(block.clone());
        }
    }
    sections.push(current);
    sections
}

/// Section `idx` followed by its deeper-level subsections.
pub fn subtree(sections: &[Section], idx: usize) -> &[Section] {
    let Some(head) = sections.get(idx) else {
        return &[];
    };
    let end = sections[idx + 1..]
        .iter()
        .position(|s| s.level <= head.level)
        .map_or(sections.len(), |offset| idx + 1 + offset);
    &sections[idx..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::blocks::classify;
    use crate::parser::ParsedDocument;

    fn sections(html: &str) -> Vec<Section> {
        let doc = ParsedDocument::parse("https://example.org/", html).unwrap();
        cluster_sections(&classify(doc.root()))
    }

    #[test]
    fn lead_then_headed_sections() {
        let s = sections(
            "<p>Lead text.</p><h2>Beliefs</h2><p>First.</p><p>Second.</p><h2>Texts</h2><ul><li>Corpus</li></ul>",
        );
        assert_eq!(s.len(), 3);
        assert!(s[0].heading.is_none());
        assert_eq!(s[0].first_paragraph(), Some("Lead text."));
        assert_eq!(s[1].paragraphs().count(), 2);
        assert!(s[2].heading_mentions(&["text", "book"]));
        assert_eq!(s[2].list_items().count(), 1);
    }

    #[test]
    fn subtree_stops_at_same_level() {
        let s = sections(
            "<h2>Branches</h2><h3>Eastern</h3><ul><li>A</li></ul><h3>Western</h3><h2>History</h2>",
        );
        let idx = s
            .iter()
            .position(|x| x.heading.as_deref() == Some("Branches"))
            .unwrap();
        let names: Vec<_> = subtree(&s, idx)
            .iter()
            .filter_map(|x| x.heading.as_deref())
            .collect();
        assert_eq!(names, vec!["Branches", "Eastern", "Western"]);
    }

    #[test]
    fn empty_page_still_has_a_section() {
        assert_eq!(sections("").len(), 1);
    }
}
