use std::sync::LazyLock;

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use tracing::debug;

use crate::model::task::{Priority, Task, TaskStatus};
use crate::parse::line::{self, Line, LineKind};

/// A parsed task together with the nesting depth its header was printed at.
///
/// Depth is the header's leading spaces divided by two. The hierarchy
/// builder turns a depth-tagged stream into `parent_id` links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEvent {
    pub depth: usize,
    pub task: Task,
}

/// `[status] Title (orta öncelik)` or the compact `[⏳] Title (Y)`, with an
/// optional tree connector or list dash in front.
static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[└├]─\s*|-\s*)?\[([^\]]+)\]\s+(.+?)\s+\((?:([YODyod])|(\S+)\s+öncelik)\)\s*$")
        .unwrap()
});

struct Header {
    status: Option<TaskStatus>,
    title: String,
    priority: Option<Priority>,
    compact: bool,
}

fn parse_header(text: &str) -> Option<Header> {
    let caps = HEADER.captures(text)?;
    let (priority, compact) = match (caps.get(3), caps.get(4)) {
        (Some(letter), _) => (Priority::from_token(letter.as_str()), true),
        (None, Some(word)) => (Priority::from_token(word.as_str()), false),
        (None, None) => (None, false),
    };
    Some(Header {
        status: TaskStatus::from_token(&caps[1]),
        title: caps[2].trim().to_string(),
        priority,
        compact,
    })
}

/// A task whose header has been seen and whose body is still being read
struct OpenRecord {
    indent: usize,
    compact: bool,
    task: Task,
    description: Vec<String>,
}

impl OpenRecord {
    fn new(header: Header, indent: usize) -> Self {
        let mut task = Task::new(String::new(), header.title);
        task.status = header.status;
        task.priority = header.priority;
        OpenRecord {
            indent,
            compact: header.compact,
            task,
            description: Vec::new(),
        }
    }

    /// Whether `line` continues this record rather than ending it
    fn owns(&self, line: &Line) -> bool {
        line.indent > self.indent || (self.compact && self.task.id.is_empty())
    }

    fn absorb(&mut self, line: &Line, today: NaiveDate) {
        if self.is_details_line(line.text) {
            self.absorb_details(line.text, today);
            return;
        }

        let LineKind::Label { key, value } = line.kind else {
            let text = line.text.strip_prefix("- ").unwrap_or(line.text);
            self.description.push(text.to_string());
            return;
        };

        let task = &mut self.task;
        match key.to_lowercase().as_str() {
            "id" => task.id = first_word(value),
            "proje" => task.project_name = non_empty(value),
            "projeid" | "proje id" => task.project_id = non_empty(&first_word(value)),
            "son tarih" => task.due_date = parse_iso_date(value),
            "oluşturma" | "oluşturulma" => task.created = parse_iso_date(value),
            "etiketler" | "etiket" => task.tags = line::split_csv(value).collect(),
            "bağımlı görev sayısı" => task.dependency_out = line::first_number(value).unwrap_or(0),
            "tamamlanmamış bağımlılık sayısı" => {
                task.dependency_unmet = line::first_number(value).unwrap_or(0)
            }
            "bu göreve bağımlı sayısı" => {
                task.dependency_in = line::first_number(value).unwrap_or(0)
            }
            _ => self.description.push(line.text.to_string()),
        }
    }

    /// Compact records put their fields on one `|`-separated line. In the
    /// labelled dialect a `|` is free text unless the line carries an ID.
    fn is_details_line(&self, text: &str) -> bool {
        let has_id_segment = || text.split('|').any(|segment| segment.trim().starts_with("ID:"));
        if self.compact {
            text.contains(" | ") || (text.starts_with("ID:") && !text.starts_with("ID: "))
        } else {
            text.contains(" | ") && has_id_segment()
        }
    }

    /// Compact details line: `Description | Tarih: 01/07 | Etiket: a,b | ID:x`.
    /// Segments that are no known field are description text and keep their
    /// separators.
    fn absorb_details(&mut self, text: &str, today: NaiveDate) {
        let mut free: Vec<&str> = Vec::new();
        for segment in text.split('|').map(str::trim) {
            if let Some(id) = segment.strip_prefix("ID:") {
                self.task.id = first_word(id);
            } else if let Some(date) = segment.strip_prefix("Tarih:") {
                self.task.due_date = parse_day_month(date, today.year());
            } else if let Some(tags) = segment
                .strip_prefix("Etiketler:")
                .or_else(|| segment.strip_prefix("Etiket:"))
            {
                self.task.tags = line::split_csv(tags).collect();
            } else if let Some(project) = segment.strip_prefix("Proje:") {
                self.task.project_name = non_empty(project);
            } else if let Some(waiting) = segment.strip_prefix("Bekleyen:") {
                let unmet = line::first_number(waiting).unwrap_or(0);
                self.task.dependency_unmet = unmet;
                self.task.dependency_out = self.task.dependency_out.max(unmet);
            } else if !segment.is_empty() {
                free.push(segment);
            }
        }
        if !free.is_empty() {
            let text = free.join(" | ");
            let text = text.strip_prefix("- ").unwrap_or(&text);
            self.description.push(text.trim().to_string());
        }
    }

    fn finish(mut self) -> Option<TaskEvent> {
        if self.task.id.is_empty() {
            debug!(title = %self.task.title, "dropping task record without ID");
            return None;
        }
        self.task.description = self.description.join(" ").trim().to_string();
        Some(TaskEvent {
            depth: self.indent / 2,
            task: self.task,
        })
    }
}

fn first_word(value: &str) -> String {
    value
        .split_whitespace()
        .next()
        .map(|w| line::unquote(w).to_string())
        .unwrap_or_default()
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

pub(crate) fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let head = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// `DD/MM` in the given year
fn parse_day_month(value: &str, year: i32) -> Option<NaiveDate> {
    let (day, month) = value.trim().split_once('/')?;
    NaiveDate::from_ymd_opt(year, month.trim().parse().ok()?, day.trim().parse().ok()?)
}

/// Parse a task listing using today's date for compact `DD/MM` due dates.
pub fn parse_task_list(text: &str) -> Vec<TaskEvent> {
    parse_task_list_on(text, Local::now().date_naive())
}

/// Parse a task listing in either the labelled or the compact dialect.
///
/// Records without an `ID` are dropped; unrecognised lines are skipped.
/// Never fails: the worst case is an empty result.
pub fn parse_task_list_on(text: &str, today: NaiveDate) -> Vec<TaskEvent> {
    let mut events = Vec::new();
    let mut open: Option<OpenRecord> = None;
    let mut dropped = 0usize;

    let mut close = |record: Option<OpenRecord>, events: &mut Vec<TaskEvent>| {
        if let Some(record) = record {
            match record.finish() {
                Some(event) => events.push(event),
                None => dropped += 1,
            }
        }
    };

    for line in line::tokenize(text) {
        if let Some(header) = parse_header(line.text) {
            close(open.take(), &mut events);
            open = Some(OpenRecord::new(header, line.indent));
            continue;
        }

        let Some(record) = open.as_mut() else {
            continue;
        };
        match line.kind {
            LineKind::Blank => {}
            LineKind::Heading { .. } => close(open.take(), &mut events),
            _ if record.owns(&line) => record.absorb(&line, today),
            _ => close(open.take(), &mut events),
        }
    }
    close(open.take(), &mut events);

    debug!(kept = events.len(), dropped, "parsed task list");
    events
}
