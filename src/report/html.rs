//! Report document assembly.
//!
//! One self-contained HTML page: a header, then one block per issue with a
//! summary row and a collapsible raw-record panel. When the issue has a text
//! range and a matching project root, the block also gets a line-numbered
//! preview table built from [`FilePreview`].

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use encoding_rs::Encoding;
use jiff::Timestamp;
use serde_json::Value;

use super::css;
use super::preview::{DEFAULT_CONTEXT_LINES, FilePreview, LinePreview, Range};
use super::{RenderError, Result};
use crate::issues::{Component, ComponentSet, IssueSet};
use crate::log::{BLOCK_END, Logger};

const SEPARATOR: &str = "<div class=\"sonarcheck-issue-summary-sep\"></div>";

/// Pixels of indentation per nesting level in the raw-record panel.
const JSON_INDENT_PX: usize = 10;

/// Shows the raw-record panel and swaps the MORE toggle for LESS.
const SHOW_INFOS: &str = "this.parentNode.querySelector('.sonarcheck-issue-summary-less').style.display='';\
this.parentNode.querySelector('.sonarcheck-issue-summary-more').style.display='none';\
this.parentNode.parentNode.querySelector('.sonarcheck-issue-infos').style.display='';";

/// Hides the raw-record panel and swaps the LESS toggle for MORE.
const HIDE_INFOS: &str = "this.parentNode.querySelector('.sonarcheck-issue-summary-more').style.display='';\
this.parentNode.querySelector('.sonarcheck-issue-summary-less').style.display='none';\
this.parentNode.parentNode.querySelector('.sonarcheck-issue-infos').style.display='none';";

/// Writes the issue report as one self-contained HTML document.
pub struct HtmlReport<'a> {
    issues: &'a IssueSet,
    components: &'a ComponentSet,
    projects: &'a HashMap<String, PathBuf>,
    encoding: &'static Encoding,
    logger: &'a dyn Logger,
}

impl<'a> HtmlReport<'a> {
    pub fn new(
        issues: &'a IssueSet,
        components: &'a ComponentSet,
        projects: &'a HashMap<String, PathBuf>,
        encoding: &'static Encoding,
        logger: &'a dyn Logger,
    ) -> Self {
        Self {
            issues,
            components,
            projects,
            encoding,
            logger,
        }
    }

    pub fn write(&self, out: &mut dyn Write) -> Result<()> {
        self.logger.info("Writing HTML report");

        writeln!(out, "<html>")?;
        writeln!(out, "<head><meta charset=\"UTF-8\">")?;
        writeln!(out, "<style>")?;
        write!(out, "{}", css::STYLESHEET)?;
        writeln!(out, "</style>")?;
        writeln!(out, "</head>")?;
        writeln!(out, "<body class=\"sonarcheck\">")?;

        self.write_header(out)?;

        for issue in &self.issues.items {
            self.write_issue(out, issue)?;
        }

        writeln!(out, "</body>")?;
        writeln!(out, "</html>")?;

        self.logger.info("HTML report written");
        self.logger.info(BLOCK_END);
        Ok(())
    }

    fn write_header(&self, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "<div class=\"sonarcheck-header\">")?;

        write!(out, "<div class=\"sonarcheck-header-warning\">")?;
        write!(
            out,
            "{}",
            escape_text("This is a basic report, see the SonarQube UI for more details.")
        )?;
        writeln!(out, "</div>")?;

        write!(out, "<div class=\"sonarcheck-header-issues\">")?;
        write!(
            out,
            "{}",
            escape_text(&format!(
                "This report shows {} issues from {}. Generated at {}.",
                self.issues.items.len(),
                self.issues.total,
                Timestamp::now()
            ))
        )?;
        writeln!(out, "</div>")?;

        writeln!(out, "</div>")?;
        Ok(())
    }

    fn write_issue(&self, out: &mut dyn Write, issue: &Value) -> Result<()> {
        let component_key = text_field(issue, "component");
        if component_key.is_empty() {
            return Err(RenderError::UnspecifiedComponent);
        }
        let component = self
            .components
            .get(component_key)
            .ok_or_else(|| RenderError::UnknownComponent(component_key.to_string()))?;

        writeln!(out, "<div class=\"sonarcheck-issue\">")?;
        write_summary(out, issue, component)?;
        write_infos(out, issue)?;
        self.write_preview(out, issue, component)?;
        writeln!(out, "</div>")?;
        Ok(())
    }

    fn write_preview(&self, out: &mut dyn Write, issue: &Value, component: &Component) -> Result<()> {
        let Some(range) = text_range(issue) else {
            return Ok(());
        };

        let project_name = text_field(issue, "project");
        if project_name.is_empty() {
            return Err(RenderError::UnspecifiedProject);
        }
        let root = self
            .projects
            .get(project_name)
            .ok_or_else(|| RenderError::UnknownProject(project_name.to_string()))?;

        let path = root.join(&component.long_name);
        let preview = FilePreview::open(&path, self.encoding, range, DEFAULT_CONTEXT_LINES)?;

        writeln!(out, "<table class=\"sonarcheck-issue-preview\">")?;
        for line in preview {
            write_preview_line(out, &line?)?;
        }
        writeln!(out, "</table>")?;
        Ok(())
    }
}

fn write_summary(out: &mut dyn Write, issue: &Value, component: &Component) -> Result<()> {
    write!(out, "<div class=\"sonarcheck-issue-summary\">")?;

    write!(
        out,
        "<span class=\"sonarcheck-issue-summary-message\">{}</span>",
        escape_text(text_field(issue, "message"))
    )?;

    for (class, value) in [
        ("type", text_field(issue, "type")),
        ("severity", text_field(issue, "severity")),
    ] {
        if !value.is_empty() {
            write!(out, "{SEPARATOR}")?;
            write!(
                out,
                "<span class=\"sonarcheck-issue-summary-{class}\">{}</span>",
                escape_text(value)
            )?;
        }
    }

    if !component.name.is_empty() {
        write!(out, "{SEPARATOR}")?;
        write!(
            out,
            "<span class=\"sonarcheck-issue-summary-file\" title=\"{}\">{}</span>",
            escape_attribute(&component.long_name),
            escape_text(&component.name)
        )?;
    }

    writeln!(out, "{SEPARATOR}")?;

    write!(
        out,
        "<span class=\"sonarcheck-issue-summary-more\" onclick=\"{SHOW_INFOS}\">MORE</span>"
    )?;
    write!(
        out,
        "<span class=\"sonarcheck-issue-summary-less\" style=\"display:none\" onclick=\"{HIDE_INFOS}\">LESS</span>"
    )?;

    writeln!(out, "</div>")?;
    Ok(())
}

fn write_infos(out: &mut dyn Write, issue: &Value) -> Result<()> {
    writeln!(out, "<div class=\"sonarcheck-issue-infos\" style=\"display:none\">")?;
    write_json_node(out, issue, 0)?;
    writeln!(out, "</div>")?;
    Ok(())
}

/// Renders a JSON object one key per row, nesting objects with indentation.
fn write_json_node(out: &mut dyn Write, node: &Value, depth: usize) -> Result<()> {
    let Some(object) = node.as_object() else {
        return Ok(());
    };

    for (key, value) in object {
        write!(
            out,
            "<div class=\"sonarcheck-issue-infos-content\" style=\"margin-left:{}px\">",
            depth * JSON_INDENT_PX
        )?;

        let nested = value.is_object();
        let label = if nested {
            key.clone()
        } else {
            format!("{key} : ")
        };
        write!(
            out,
            "<span class=\"sonarcheck-issue-infos-content-key\">{}</span>",
            escape_text(&label)
        )?;

        if nested {
            write_json_node(out, value, depth + 1)?;
        } else {
            write!(
                out,
                "<span class=\"sonarcheck-issue-infos-content-value\">{}</span>",
                escape_text(&scalar_text(value))
            )?;
        }

        writeln!(out, "</div>")?;
    }
    Ok(())
}

fn write_preview_line(out: &mut dyn Write, line: &LinePreview) -> Result<()> {
    writeln!(out, "<tr class=\"sonarcheck-issue-line-preview\">")?;

    write!(out, "<td class=\"sonarcheck-issue-line-preview-number\">{}</td>", line.number)?;
    writeln!(out)?;

    write!(out, "<td class=\"sonarcheck-issue-line-preview-content\">")?;
    match line.highlight {
        Some((start, end)) => {
            let text_len = line.text.chars().count();
            let before = char_slice(&line.text, 0, start).ok_or(RenderError::OutOfSync)?;
            let code = char_slice(&line.text, start, end).ok_or(RenderError::OutOfSync)?;
            let after = char_slice(&line.text, end, text_len).ok_or(RenderError::OutOfSync)?;

            if start > 0 {
                write!(
                    out,
                    "<span class=\"sonarcheck-issue-line-preview-content-none\">{}</span>",
                    escape_preview(before)
                )?;
            }
            write!(
                out,
                "<span class=\"sonarcheck-issue-line-preview-content-code\">{}</span>",
                escape_preview(code)
            )?;
            if end < text_len {
                write!(
                    out,
                    "<span class=\"sonarcheck-issue-line-preview-content-none\">{}</span>",
                    escape_preview(after)
                )?;
            }
        }
        None => {
            write!(
                out,
                "<span class=\"sonarcheck-issue-line-preview-content-none\">{}</span>",
                escape_preview(&line.text)
            )?;
        }
    }
    writeln!(out, "</td>")?;

    writeln!(out, "</tr>")?;
    Ok(())
}

/// Reads a string field the way the server's records use them: absent means
/// empty.
fn text_field<'v>(issue: &'v Value, key: &str) -> &'v str {
    issue.get(key).and_then(Value::as_str).unwrap_or("")
}

fn int_field(value: &Value, key: &str) -> usize {
    value
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0)
}

fn text_range(issue: &Value) -> Option<Range> {
    let range = issue.get("textRange")?;
    Some(Range {
        start_line: int_field(range, "startLine"),
        end_line: int_field(range, "endLine"),
        start_offset: int_field(range, "startOffset"),
        end_offset: int_field(range, "endOffset"),
    })
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn escape_text(content: &str) -> String {
    content.replace('<', "&lt;").replace('>', "&gt;")
}

/// Preview cells additionally make whitespace visible-width.
fn escape_preview(content: &str) -> String {
    escape_text(content)
        .replace(' ', "&nbsp;")
        .replace('\t', "&nbsp;&nbsp;&nbsp;&nbsp;")
}

fn escape_attribute(content: &str) -> String {
    content.replace('"', "&quot;")
}

/// Character-offset substring; `None` when the bounds overshoot the text.
fn char_slice(text: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }
    let byte_at = |char_pos: usize| {
        text.char_indices()
            .map(|(byte, _)| byte)
            .chain(std::iter::once(text.len()))
            .nth(char_pos)
    };
    let start_byte = byte_at(start)?;
    let end_byte = byte_at(end)?;
    text.get(start_byte..end_byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use encoding_rs::UTF_8;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::log::testing::BufferLogger;

    fn component_set(components: &[(&str, &str, &str)]) -> ComponentSet {
        components
            .iter()
            .map(|(key, name, long_name)| Component {
                key: (*key).to_string(),
                name: (*name).to_string(),
                long_name: (*long_name).to_string(),
            })
            .collect()
    }

    fn render(
        issues: Vec<Value>,
        components: &ComponentSet,
        projects: &HashMap<String, PathBuf>,
    ) -> Result<String> {
        let issues = IssueSet {
            total: issues.len() as u64 + 1,
            items: issues,
        };
        let logger = BufferLogger::new();
        let report = HtmlReport::new(&issues, components, projects, UTF_8, &logger);

        let mut out = Vec::new();
        report.write(&mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn renders_summary_fields_with_escaping() {
        let components = component_set(&[("proj:a.rs", "a.rs", "src/a.rs")]);
        let html = render(
            vec![json!({
                "component": "proj:a.rs",
                "message": "x < y is always true",
                "type": "BUG",
                "severity": "MAJOR"
            })],
            &components,
            &HashMap::new(),
        )
        .unwrap();

        assert!(html.contains("x &lt; y is always true"));
        assert!(html.contains("<span class=\"sonarcheck-issue-summary-type\">BUG</span>"));
        assert!(html.contains("<span class=\"sonarcheck-issue-summary-severity\">MAJOR</span>"));
        assert!(html.contains("title=\"src/a.rs\""));
        assert!(html.contains(">MORE</span>"));
        assert!(html.contains(">LESS</span>"));
    }

    #[test]
    fn header_counts_shown_and_total() {
        let components = component_set(&[("proj:a.rs", "a.rs", "src/a.rs")]);
        let html = render(
            vec![json!({"component": "proj:a.rs", "message": "m"})],
            &components,
            &HashMap::new(),
        )
        .unwrap();

        assert!(html.contains("This report shows 1 issues from 2."));
    }

    #[test]
    fn empty_type_and_severity_are_skipped() {
        let components = component_set(&[("proj:a.rs", "a.rs", "src/a.rs")]);
        let html = render(
            vec![json!({"component": "proj:a.rs", "message": "m"})],
            &components,
            &HashMap::new(),
        )
        .unwrap();

        assert!(!html.contains("sonarcheck-issue-summary-type\">"));
        assert!(!html.contains("sonarcheck-issue-summary-severity\">"));
    }

    #[test]
    fn raw_record_panel_renders_nested_objects() {
        let components = component_set(&[("proj:a.rs", "a.rs", "src/a.rs")]);
        let html = render(
            vec![json!({
                "component": "proj:a.rs",
                "message": "m",
                "flows": [1, 2],
                "textRangeInfo": {"startLine": 3}
            })],
            &components,
            &HashMap::new(),
        )
        .unwrap();

        assert!(html.contains("message : "));
        assert!(html.contains("[1,2]"));
        // Nested keys are indented one level deeper.
        assert!(html.contains("margin-left:10px"));
        assert!(html.contains("startLine : "));
    }

    #[test]
    fn missing_component_key_fails() {
        let err = render(
            vec![json!({"message": "m"})],
            &ComponentSet::default(),
            &HashMap::new(),
        )
        .unwrap_err();

        assert!(matches!(err, RenderError::UnspecifiedComponent));
    }

    #[test]
    fn unknown_component_fails() {
        let err = render(
            vec![json!({"component": "proj:ghost.rs", "message": "m"})],
            &ComponentSet::default(),
            &HashMap::new(),
        )
        .unwrap_err();

        assert!(matches!(err, RenderError::UnknownComponent(key) if key == "proj:ghost.rs"));
    }

    #[test]
    fn text_range_without_project_fails() {
        let components = component_set(&[("proj:a.rs", "a.rs", "src/a.rs")]);
        let err = render(
            vec![json!({
                "component": "proj:a.rs",
                "message": "m",
                "textRange": {"startLine": 1, "endLine": 1, "startOffset": 0, "endOffset": 1}
            })],
            &components,
            &HashMap::new(),
        )
        .unwrap_err();

        assert!(matches!(err, RenderError::UnspecifiedProject));
    }

    #[test]
    fn unknown_project_fails() {
        let components = component_set(&[("proj:a.rs", "a.rs", "src/a.rs")]);
        let err = render(
            vec![json!({
                "component": "proj:a.rs",
                "project": "proj",
                "message": "m",
                "textRange": {"startLine": 1, "endLine": 1, "startOffset": 0, "endOffset": 1}
            })],
            &components,
            &HashMap::new(),
        )
        .unwrap_err();

        assert!(matches!(err, RenderError::UnknownProject(name) if name == "proj"));
    }

    #[test]
    fn issue_without_text_range_has_no_preview_table() {
        let components = component_set(&[("proj:a.rs", "a.rs", "src/a.rs")]);
        let html = render(
            vec![json!({"component": "proj:a.rs", "message": "m"})],
            &components,
            &HashMap::new(),
        )
        .unwrap();

        assert!(!html.contains("<table"));
    }

    #[test]
    fn preview_table_highlights_the_issue_span() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("source.rs"), "ab\ncd\nef").unwrap();
        let components = component_set(&[("proj:source.rs", "source.rs", "source.rs")]);
        let projects = HashMap::from([("proj".to_string(), dir.path().to_path_buf())]);

        let html = render(
            vec![json!({
                "component": "proj:source.rs",
                "project": "proj",
                "message": "m",
                "textRange": {"startLine": 2, "endLine": 2, "startOffset": 0, "endOffset": 1}
            })],
            &components,
            &projects,
        )
        .unwrap();

        assert!(html.contains("<table class=\"sonarcheck-issue-preview\">"));
        assert!(html.contains("-number\">1</td>"));
        assert!(html.contains("-number\">2</td>"));
        assert!(html.contains("-number\">3</td>"));
        assert!(html.contains("<span class=\"sonarcheck-issue-line-preview-content-code\">c</span>"));
        assert!(html.contains("<span class=\"sonarcheck-issue-line-preview-content-none\">d</span>"));
        assert!(html.contains("<span class=\"sonarcheck-issue-line-preview-content-none\">ab</span>"));
    }

    #[test]
    fn preview_escapes_whitespace_for_width() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("source.rs"), "\tif a < b {").unwrap();
        let components = component_set(&[("proj:source.rs", "source.rs", "source.rs")]);
        let projects = HashMap::from([("proj".to_string(), dir.path().to_path_buf())]);

        let html = render(
            vec![json!({
                "component": "proj:source.rs",
                "project": "proj",
                "message": "m",
                "textRange": {"startLine": 1, "endLine": 1, "startOffset": 1, "endOffset": 3}
            })],
            &components,
            &projects,
        )
        .unwrap();

        assert!(html.contains("&nbsp;&nbsp;&nbsp;&nbsp;"));
        assert!(html.contains("&lt;"));
    }

    #[test]
    fn out_of_sync_preview_fails_the_report() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("source.rs"), "ab").unwrap();
        let components = component_set(&[("proj:source.rs", "source.rs", "source.rs")]);
        let projects = HashMap::from([("proj".to_string(), dir.path().to_path_buf())]);

        let err = render(
            vec![json!({
                "component": "proj:source.rs",
                "project": "proj",
                "message": "m",
                "textRange": {"startLine": 1, "endLine": 1, "startOffset": 10, "endOffset": 12}
            })],
            &components,
            &projects,
        )
        .unwrap_err();

        assert!(matches!(err, RenderError::OutOfSync));
    }

    #[test]
    fn missing_source_file_fails_the_report() {
        let dir = TempDir::new().unwrap();
        let components = component_set(&[("proj:source.rs", "source.rs", "source.rs")]);
        let projects = HashMap::from([("proj".to_string(), dir.path().to_path_buf())]);

        let err = render(
            vec![json!({
                "component": "proj:source.rs",
                "project": "proj",
                "message": "m",
                "textRange": {"startLine": 1, "endLine": 1, "startOffset": 0, "endOffset": 1}
            })],
            &components,
            &projects,
        )
        .unwrap_err();

        assert!(matches!(err, RenderError::Io(_)));
    }

    #[test]
    fn char_slice_is_character_based() {
        assert_eq!(char_slice("αβγδ", 1, 3), Some("βγ"));
        assert_eq!(char_slice("ab", 0, 2), Some("ab"));
        assert_eq!(char_slice("ab", 2, 2), Some(""));
        assert_eq!(char_slice("ab", 1, 3), None);
        assert_eq!(char_slice("ab", 2, 1), None);
    }
}
