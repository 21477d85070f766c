use serde::Serialize;

use crate::domain::slot::{AggregationResult, Slot};
use crate::notify::NotifyMode;
use crate::slots::format::SlotTimeFormatter;

pub const AVAILABLE_SUBJECT: &str = "SlotBot: Slots Available!";
pub const AVAILABLE_HEADER: &str = "The following slots were available";
pub const NO_SLOTS_SUBJECT: &str = "SlotBot: No slots";
pub const NO_SLOTS_HEADER: &str = "The following slots were unavailable";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Available,
    NoSlots,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NotificationMessage {
    pub kind: MessageKind,
    pub subject: String,
    pub header: String,
    pub slot_lines: Vec<String>,
    pub link: Option<String>,
}

impl NotificationMessage {
    /// Plain-text body: header, blank line, one line per slot, optional trailing link.
    pub fn text(&self) -> String {
        let mut body = format!("{}\n\n{}", self.header, self.slot_lines.join("\n"));
        if let Some(link) = &self.link {
            body.push_str(&format!("\n\nBook a slot: {link}"));
        }
        body
    }
}

#[derive(Clone, Debug)]
pub struct MessageComposer {
    mode: NotifyMode,
    formatter: SlotTimeFormatter,
    link: Option<String>,
}

impl MessageComposer {
    pub fn new(mode: NotifyMode, formatter: SlotTimeFormatter, link: Option<String>) -> Self {
        Self { mode, formatter, link }
    }

    pub fn mode(&self) -> NotifyMode {
        self.mode
    }

    /// `None` means the run stays silent.
    pub fn compose(&self, result: &AggregationResult) -> Option<NotificationMessage> {
        if result.has_availability() {
            return Some(self.build(
                MessageKind::Available,
                AVAILABLE_SUBJECT,
                AVAILABLE_HEADER,
                &result.available_slots,
            ));
        }

        match self.mode {
            NotifyMode::Always => Some(self.build(
                MessageKind::NoSlots,
                NO_SLOTS_SUBJECT,
                NO_SLOTS_HEADER,
                &result.unavailable_slots,
            )),
            NotifyMode::OnAvailabilityOnly => None,
        }
    }

    fn build(
        &self,
        kind: MessageKind,
        subject: &str,
        header: &str,
        slots: &[Slot],
    ) -> NotificationMessage {
        NotificationMessage {
            kind,
            subject: subject.to_owned(),
            header: header.to_owned(),
            slot_lines: slots.iter().map(|slot| self.formatter.format(slot)).collect(),
            link: self.link.clone(),
        }
    }
}
