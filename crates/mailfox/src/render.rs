//! Plain-text rendering of the message list and the message view.

use std::fmt::Write as _;
use std::ops::Range;

use mailfox_core::{MailStore, MailboxSession, MessageSummary};

/// Rows shown in the list view.
pub const LIST_ROWS: usize = 10;

/// Rows kept above the cursor when the list scrolls.
const ROWS_ABOVE_CURSOR: usize = 5;

/// Column at which the message body wraps.
pub const WRAP_WIDTH: usize = 80;

const RULE_WIDTH: usize = 80;
const DATE_CHARS: usize = 16;
const FROM_CHARS: usize = 25;
const SUBJECT_CHARS: usize = 50;

/// Indices of the window rows to show for a given cursor.
pub fn visible_rows(len: usize, cursor: usize) -> Range<usize> {
    let start = cursor.saturating_sub(ROWS_ABOVE_CURSOR).min(len);
    start..len.min(start + LIST_ROWS)
}

/// The list view: a header with folder and counts, then the visible rows.
pub fn message_list<S: MailStore>(session: &MailboxSession<S>, user: &str) -> String {
    let messages = session.messages();
    let folder = session.selected_folder().unwrap_or("-");
    let rule = "=".repeat(RULE_WIDTH);

    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "ACCOUNT: {user} | FOLDER: {folder}");
    let _ = writeln!(
        out,
        "Messages: {}/{} displayed, {} total in folder",
        if messages.is_empty() { 0 } else { session.cursor() + 1 },
        messages.len(),
        session.total_messages()
    );
    let _ = writeln!(out, "{rule}");

    if messages.is_empty() {
        out.push_str("No messages loaded\n");
    }
    for i in visible_rows(messages.len(), session.cursor()) {
        out.push_str(&list_row(i, &messages[i], i == session.cursor()));
        out.push('\n');
    }
    let _ = writeln!(out, "{rule}");
    out
}

/// One row of the list view.
pub fn list_row(index: usize, summary: &MessageSummary, current: bool) -> String {
    let marker = if current { '>' } else { ' ' };
    let subject = if summary.subject.chars().count() > SUBJECT_CHARS {
        format!("{}...", truncate(&summary.subject, SUBJECT_CHARS))
    } else {
        summary.subject.clone()
    };
    format!(
        "{marker} {:3} | {:DATE_CHARS$} | {:FROM_CHARS$} | {subject}",
        index + 1,
        truncate(&summary.date, DATE_CHARS),
        truncate(&summary.from, FROM_CHARS),
    )
}

/// The full message view with headers and the wrapped body.
pub fn message_view(position: usize, total: usize, summary: &MessageSummary) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "MESSAGE {position}/{total}");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Subject: {}", summary.subject);
    let _ = writeln!(out, "From:    {}", summary.from);
    let _ = writeln!(out, "To:      {}", summary.to);
    let _ = writeln!(out, "Date:    {}", summary.date);
    let _ = writeln!(out, "{rule}");
    for line in wrap(summary.resolve_body(), WRAP_WIDTH) {
        out.push_str(line);
        out.push('\n');
    }
    let _ = writeln!(out, "{rule}");
    out
}

/// Hard-wraps each line of `text` at `width` characters.
pub fn wrap(text: &str, width: usize) -> Vec<&str> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for line in text.lines() {
        let mut rest = line;
        loop {
            match rest.char_indices().nth(width) {
                Some((split, _)) => {
                    lines.push(&rest[..split]);
                    rest = &rest[split..];
                }
                None => {
                    lines.push(rest);
                    break;
                }
            }
        }
    }
    lines
}

fn truncate(s: &str, max: usize) -> &str {
    s.char_indices().nth(max).map_or(s, |(end, _)| &s[..end])
}

/// Command summary shown by `h` and under the list.
pub const HELP: &str = "\
Commands:
  n: Next message     p: Previous message    v: View selected message
  l: List messages    f: Change folder       r: Refresh messages
  s: Search messages  e: Export message      c: Compose message
  a: Change account   h: Help                q: Quit";

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mailfox_core::{MessageId, parse_summary};

    fn summary(subject: &str) -> MessageSummary {
        let raw = format!(
            "Subject: {subject}\r\nFrom: Alice Example <alice@example.com>\r\n\
             Date: Mon, 7 Oct 2024 10:00:00 +0000\r\n\r\nhello\r\n"
        );
        parse_summary(raw.into_bytes(), MessageId::new("1"))
    }

    #[test]
    fn test_visible_rows_follow_cursor() {
        assert_eq!(visible_rows(0, 0), 0..0);
        assert_eq!(visible_rows(3, 0), 0..3);
        assert_eq!(visible_rows(20, 0), 0..10);
        assert_eq!(visible_rows(20, 4), 0..10);
        assert_eq!(visible_rows(20, 8), 3..13);
        assert_eq!(visible_rows(20, 19), 14..20);
    }

    #[test]
    fn test_visible_rows_always_contain_cursor() {
        for len in 1..30 {
            for cursor in 0..len {
                let rows = visible_rows(len, cursor);
                assert!(rows.contains(&cursor), "len {len} cursor {cursor}");
                assert!(rows.len() <= LIST_ROWS);
            }
        }
    }

    #[test]
    fn test_list_row_marks_current() {
        let s = summary("Quarterly report");
        let row = list_row(0, &s, true);
        assert!(row.starts_with(">   1 | "));
        assert!(row.ends_with("| Quarterly report"));
        assert!(list_row(11, &s, false).starts_with("   12 | "));
    }

    #[test]
    fn test_list_row_truncates_long_subject() {
        let long = "x".repeat(60);
        let row = list_row(0, &summary(&long), false);
        assert!(row.ends_with(&format!("{}...", "x".repeat(50))));
    }

    #[test]
    fn test_wrap_splits_long_lines() {
        let line = "a".repeat(170);
        let wrapped = wrap(&line, 80);
        assert_eq!(wrapped.iter().map(|l| l.len()).collect::<Vec<_>>(), vec![80, 80, 10]);
    }

    #[test]
    fn test_wrap_keeps_short_lines_and_blanks() {
        assert_eq!(wrap("one\n\ntwo", 80), vec!["one", "", "two"]);
    }

    #[test]
    fn test_wrap_counts_characters_not_bytes() {
        let line = "é".repeat(5);
        assert_eq!(wrap(&line, 2), vec!["éé", "éé", "é"]);
    }

    #[test]
    fn test_message_view_resolves_body() {
        let s = summary("Hi");
        let view = message_view(1, 1, &s);
        assert!(view.contains("MESSAGE 1/1"));
        assert!(view.contains("Subject: Hi"));
        assert!(view.contains("\nhello\n"));
        assert!(s.is_resolved());
    }
}
