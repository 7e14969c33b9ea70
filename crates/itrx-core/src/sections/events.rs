use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest row text shown per event by [`ScanLog::render`].
const RENDER_TEXT_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanEventKind {
    StartMatch,
    HeaderMatch,
    EndMatch,
    SectionCompleted,
}

impl fmt::Display for ScanEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanEventKind::StartMatch => "start_match",
            ScanEventKind::HeaderMatch => "header_match",
            ScanEventKind::EndMatch => "end_match",
            ScanEventKind::SectionCompleted => "section_completed",
        };
        f.write_str(s)
    }
}

/// What closed a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndTrigger {
    Pattern,
    EmptyRow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    pub row: usize,
    pub section: String,
    #[serde(rename = "event")]
    pub kind: ScanEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<EndTrigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Receiver for section-scan transitions.
pub trait ScanObserver {
    fn record(&mut self, event: ScanEvent);

    /// Observers returning false are skipped without building events.
    fn enabled(&self) -> bool {
        true
    }
}

impl ScanObserver for () {
    fn record(&mut self, _event: ScanEvent) {}

    fn enabled(&self) -> bool {
        false
    }
}

/// Append-only record of every transition made during a section scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanLog {
    events: Vec<ScanEvent>,
}

impl ScanObserver for ScanLog {
    fn record(&mut self, event: ScanEvent) {
        self.events.push(event);
    }
}

impl ScanLog {
    pub fn events(&self) -> &[ScanEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn by_section(&self, section: &str) -> Vec<&ScanEvent> {
        self.events.iter().filter(|e| e.section == section).collect()
    }

    pub fn by_event(&self, kind: ScanEventKind) -> Vec<&ScanEvent> {
        self.events.iter().filter(|e| e.kind == kind).collect()
    }

    /// Start and header matches: where a section was opened or confirmed.
    ///
    /// Reading these against the completed sections shows where a capture
    /// was abandoned or never closed.
    pub fn failures(&self) -> Vec<&ScanEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, ScanEventKind::StartMatch | ScanEventKind::HeaderMatch))
            .collect()
    }

    /// Sections that were opened but never completed.
    pub fn unclosed_sections(&self) -> Vec<&str> {
        let mut unclosed: Vec<&str> = Vec::new();
        for event in &self.events {
            match event.kind {
                ScanEventKind::StartMatch if !unclosed.contains(&event.section.as_str()) => {
                    unclosed.push(&event.section);
                }
                ScanEventKind::SectionCompleted => unclosed.retain(|s| *s != event.section),
                _ => {}
            }
        }
        unclosed
    }

    /// Plain-text listing of the first `limit` events.
    pub fn render(&self, limit: usize) -> String {
        let mut out = String::new();
        for event in self.events.iter().take(limit) {
            out.push_str(&format!(
                "[{}] Row {} | Section: {}\n",
                event.kind, event.row, event.section
            ));
            if let Some(text) = &event.text {
                let shown: String = text.chars().take(RENDER_TEXT_LIMIT).collect();
                out.push_str(&format!("   -> {}\n", shown));
            }
            out.push_str(&"-".repeat(80));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(row: usize, section: &str, kind: ScanEventKind) -> ScanEvent {
        ScanEvent {
            row,
            section: section.into(),
            kind,
            trigger: None,
            text: Some(format!("row {row}")),
        }
    }

    fn sample_log() -> ScanLog {
        let mut log = ScanLog::default();
        log.record(event(1, "A", ScanEventKind::StartMatch));
        log.record(event(2, "A", ScanEventKind::HeaderMatch));
        log.record(event(5, "A", ScanEventKind::EndMatch));
        log.record(event(5, "A", ScanEventKind::SectionCompleted));
        log.record(event(7, "B", ScanEventKind::StartMatch));
        log
    }

    #[test]
    fn test_filters() {
        let log = sample_log();
        assert_eq!(log.by_section("A").len(), 4);
        assert_eq!(log.by_event(ScanEventKind::StartMatch).len(), 2);
        assert_eq!(log.failures().len(), 3);
    }

    #[test]
    fn test_unclosed_sections() {
        assert_eq!(sample_log().unclosed_sections(), vec!["B"]);
    }

    #[test]
    fn test_render_limits_events() {
        let out = sample_log().render(2);
        assert!(out.contains("[start_match] Row 1 | Section: A"));
        assert!(out.contains("[header_match] Row 2 | Section: A"));
        assert!(!out.contains("end_match"));
    }

    #[test]
    fn test_unit_observer_disabled() {
        assert!(!().enabled());
    }

    #[test]
    fn test_event_serializes_with_event_tag() {
        let json = serde_json::to_string(&event(3, "A", ScanEventKind::HeaderMatch)).unwrap();
        assert!(json.contains("\"event\":\"header_match\""));
    }
}
