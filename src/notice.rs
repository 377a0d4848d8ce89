/// User-facing notifications queued by the views and drained by the UI.

use std::mem;

/// How a notice is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Transient success toast.
    Info,
    /// Transient error toast; never blocks the view.
    Error,
    /// Blocking alert the user must dismiss.
    Alert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// Record the notice is about, if any.
    pub appointment_id: Option<String>,
}

#[derive(Debug, Default)]
pub struct Notices {
    queue: Vec<Notice>,
}

impl Notices {
    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Info, message.into(), None);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message.into(), None);
    }

    pub fn alert(&mut self, message: impl Into<String>, appointment_id: Option<&str>) {
        self.push(NoticeLevel::Alert, message.into(), appointment_id.map(str::to_string));
    }

    fn push(&mut self, level: NoticeLevel, message: String, appointment_id: Option<String>) {
        self.queue.push(Notice {
            level,
            message,
            appointment_id,
        });
    }

    pub fn last(&self) -> Option<&Notice> {
        self.queue.last()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        mem::take(&mut self.queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_queue_in_order() {
        let mut notices = Notices::default();
        notices.info("saved");
        notices.alert("failed", Some("A1"));
        let drained = notices.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].level, NoticeLevel::Info);
        assert_eq!(drained[1].appointment_id.as_deref(), Some("A1"));
        assert!(notices.is_empty());
    }
}
