use serde::Serialize;
use slotbot_core::notify::{MessageKind, NotificationMessage};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    PlainText { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainText { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header { block_id: String, text: TextObject },
    Section { block_id: String, text: TextObject },
    Context { block_id: String, elements: Vec<TextObject> },
}

/// Incoming-webhook body: `text` is the notification fallback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), blocks: Vec::new() }
    }

    pub fn header(mut self, block_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.blocks
            .push(Block::Header { block_id: block_id.into(), text: TextObject::plain(text) });
        self
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { text: self.text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

/// Slack rejects a section whose text exceeds this many characters.
pub const SECTION_TEXT_LIMIT: usize = 3000;
/// Slack rejects a message with more blocks than this.
pub const MAX_BLOCKS: usize = 50;

#[derive(Default)]
struct ListChunk {
    text: String,
    lines: usize,
}

/// Greedily packs bullet lines into chunks that each fit in one section.
fn chunk_slot_lines(lines: &[String], limit: usize) -> Vec<ListChunk> {
    let mut chunks = Vec::new();
    let mut current = ListChunk::default();
    let mut current_len = 0;

    for line in lines {
        let mut bullet = format!("• {line}");
        let mut bullet_len = bullet.chars().count();
        if bullet_len > limit {
            bullet = bullet.chars().take(limit).collect();
            bullet_len = limit;
        }

        if current.lines > 0 && current_len + 1 + bullet_len > limit {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current.lines > 0 {
            current.text.push('\n');
            current_len += 1;
        }
        current.text.push_str(&bullet);
        current_len += bullet_len;
        current.lines += 1;
    }

    if current.lines > 0 {
        chunks.push(current);
    }
    chunks
}

pub fn slot_message(message: &NotificationMessage) -> MessageTemplate {
    let block_prefix = match message.kind {
        MessageKind::Available => "slots.available",
        MessageKind::NoSlots => "slots.none",
    };

    let mut chunks = chunk_slot_lines(&message.slot_lines, SECTION_TEXT_LIMIT);
    if chunks.is_empty() {
        chunks.push(ListChunk { text: "_no slots returned_".to_string(), lines: 0 });
    }

    // subject, header section, optional link and the overflow note
    let fixed_blocks = 3 + usize::from(message.link.is_some());
    let list_budget = MAX_BLOCKS - fixed_blocks;
    let omitted: usize = if chunks.len() > list_budget {
        chunks.drain(list_budget..).map(|chunk| chunk.lines).sum()
    } else {
        0
    };

    let mut builder = MessageBuilder::new(message.text())
        .header(format!("{block_prefix}.subject.v1"), message.subject.clone())
        .section(format!("{block_prefix}.header.v1"), |section| {
            section.mrkdwn(format!("*{}*", message.header));
        });

    for (index, chunk) in chunks.into_iter().enumerate() {
        builder = builder.section(format!("{block_prefix}.list.{}.v1", index + 1), |section| {
            section.mrkdwn(chunk.text);
        });
    }

    if omitted > 0 {
        builder = builder.context(format!("{block_prefix}.overflow.v1"), |context| {
            context.mrkdwn(format!("…and {omitted} more"));
        });
    }

    if let Some(link) = &message.link {
        builder = builder.context(format!("{block_prefix}.link.v1"), |context| {
            context.mrkdwn(format!("<{link}|Book a slot>"));
        });
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use slotbot_core::notify::{MessageKind, NotificationMessage};

    use super::{
        chunk_slot_lines, slot_message, Block, MessageBuilder, TextObject, MAX_BLOCKS,
        SECTION_TEXT_LIMIT,
    };

    fn available() -> NotificationMessage {
        NotificationMessage {
            kind: MessageKind::Available,
            subject: "SlotBot: Slots Available!".to_string(),
            header: "The following slots were available".to_string(),
            slot_lines: vec![
                "Friday, April 10, 8:00 AM".to_string(),
                "Friday, April 17, 9:00 AM".to_string(),
            ],
            link: Some("https://shop.example/slots".to_string()),
        }
    }

    #[test]
    fn builder_preserves_block_order() {
        let template = MessageBuilder::new("fallback")
            .section("a", |section| {
                section.plain("first");
            })
            .context("b", |context| {
                context.mrkdwn("second");
            })
            .build();

        assert_eq!(template.text, "fallback");
        assert_eq!(
            template.blocks,
            vec![
                Block::Section { block_id: "a".to_string(), text: TextObject::plain("first") },
                Block::Context {
                    block_id: "b".to_string(),
                    elements: vec![TextObject::mrkdwn("second")],
                },
            ]
        );
    }

    #[test]
    fn slot_message_lists_slots_and_link() {
        let template = slot_message(&available());

        assert_eq!(template.blocks.len(), 4);
        assert_eq!(
            template.blocks[2],
            Block::Section {
                block_id: "slots.available.list.1.v1".to_string(),
                text: TextObject::mrkdwn(
                    "• Friday, April 10, 8:00 AM\n• Friday, April 17, 9:00 AM"
                ),
            }
        );
        assert!(template.text.ends_with("Book a slot: https://shop.example/slots"));
    }

    #[test]
    fn text_objects_use_block_kit_type_tags() {
        let value = serde_json::to_value(TextObject::plain("hi")).expect("serialize");
        assert_eq!(value, json!({ "type": "plain_text", "text": "hi" }));
    }

    #[test]
    fn no_slots_message_without_link_has_no_context_block() {
        let message = NotificationMessage {
            kind: MessageKind::NoSlots,
            subject: "SlotBot: No slots".to_string(),
            header: "The following slots were unavailable".to_string(),
            slot_lines: Vec::new(),
            link: None,
        };
        let template = slot_message(&message);

        assert_eq!(template.blocks.len(), 3);
        assert!(template
            .blocks
            .iter()
            .all(|block| !matches!(block, Block::Context { .. })));
    }

    fn section_texts(blocks: &[Block]) -> Vec<&str> {
        blocks
            .iter()
            .filter_map(|block| match block {
                Block::Section { text: TextObject::Mrkdwn { text }, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn no_slots_with_lines(count: usize) -> NotificationMessage {
        NotificationMessage {
            kind: MessageKind::NoSlots,
            subject: "SlotBot: No slots".to_string(),
            header: "The following slots were unavailable".to_string(),
            slot_lines: (0..count)
                .map(|index| {
                    format!("Wednesday, September {}, {}:00 PM", index % 30 + 1, index % 12 + 1)
                })
                .collect(),
            link: Some("https://shop.example/slots".to_string()),
        }
    }

    #[test]
    fn three_weeks_of_unavailable_slots_fit_slack_section_limits() {
        let message = no_slots_with_lines(294);
        let template = slot_message(&message);

        assert!(template.blocks.len() <= MAX_BLOCKS);
        let sections = section_texts(&template.blocks);
        assert!(sections.len() > 2, "slot list should span several sections");
        for text in &sections {
            let chars = text.chars().count();
            assert!(chars <= SECTION_TEXT_LIMIT, "section has {chars} chars");
        }

        let listed: usize = sections.iter().skip(1).map(|text| text.lines().count()).sum();
        assert_eq!(listed, 294);
        assert!(template.text.contains("Wednesday, September 30, 6:00 PM"));
        assert!(matches!(
            template.blocks.last(),
            Some(Block::Context { block_id, .. }) if block_id == "slots.none.link.v1"
        ));
    }

    #[test]
    fn oversized_lists_are_capped_with_an_overflow_note() {
        let message = no_slots_with_lines(5000);
        let template = slot_message(&message);

        assert_eq!(template.blocks.len(), MAX_BLOCKS);
        let listed: usize =
            section_texts(&template.blocks).iter().skip(1).map(|text| text.lines().count()).sum();
        let overflow = template.blocks.iter().find_map(|block| match block {
            Block::Context { block_id, elements } if block_id == "slots.none.overflow.v1" => {
                elements.first().cloned()
            }
            _ => None,
        });
        assert_eq!(overflow, Some(TextObject::mrkdwn(format!("…and {} more", 5000 - listed))));
        let fallback_lines =
            template.text.lines().filter(|line| line.starts_with("Wednesday")).count();
        assert_eq!(fallback_lines, 5000);
    }

    #[test]
    fn overlong_single_line_is_truncated_to_one_section() {
        let chunks = chunk_slot_lines(&["x".repeat(4000)], SECTION_TEXT_LIMIT);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text.chars().count(), SECTION_TEXT_LIMIT);
        assert_eq!(chunks[0].lines, 1);
    }
}
