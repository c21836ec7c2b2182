//! Line-level diffing between stored and fresh renderings.
//!
//! `unified_diff` emits the classic unified format (`--- `/`+++ ` headers,
//! `@@` hunk headers, 3 context lines). `format_edit_block` turns that
//! output into the appended edit annotation: header dropped, markers
//! respliced after quote-nesting prefixes and escaped so the target
//! platform's markdown does not render them as list bullets.

use std::sync::LazyLock;

use regex::Regex;

/// Leading diff marker plus any immediately following quote markers.
static RE_DIFF_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([+\- ]>*)").unwrap());

/// Context lines kept around each change.
const CONTEXT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tag {
    Equal,
    Replace,
    Delete,
    Insert,
}

#[derive(Debug, Clone, Copy)]
struct Opcode {
    tag: Tag,
    a1: usize,
    a2: usize,
    b1: usize,
    b2: usize,
}

/// Computes a line-level unified diff between two texts.
///
/// Returns one string per output line, without trailing newlines. Identical
/// inputs produce an empty vector.
pub fn unified_diff(old: &str, new: &str) -> Vec<String> {
    let a: Vec<&str> = old.split('\n').collect();
    let b: Vec<&str> = new.split('\n').collect();
    let codes = opcodes(&a, &b);

    let mut out = Vec::new();
    let mut started = false;
    for group in grouped(&codes) {
        if !started {
            out.push("--- ".to_string());
            out.push("+++ ".to_string());
            started = true;
        }
        let first = group[0];
        let last = group[group.len() - 1];
        out.push(format!(
            "@@ -{} +{} @@",
            format_range(first.a1, last.a2),
            format_range(first.b1, last.b2)
        ));
        for op in &group {
            match op.tag {
                Tag::Equal => {
                    for line in &a[op.a1..op.a2] {
                        out.push(format!(" {}", line));
                    }
                }
                Tag::Replace | Tag::Delete => {
                    for line in &a[op.a1..op.a2] {
                        out.push(format!("-{}", line));
                    }
                }
                Tag::Insert => {}
            }
            match op.tag {
                Tag::Replace | Tag::Insert => {
                    for line in &b[op.b1..op.b2] {
                        out.push(format!("+{}", line));
                    }
                }
                _ => {}
            }
        }
    }
    out
}

/// Formats a non-empty diff as the dated annotation appended to the
/// mirrored reply: the 3-line header is dropped, each change line has its
/// marker respliced after the quote prefix and escaped, and blank-content
/// lines are dropped.
pub fn format_edit_block(diff: &[String], edit_time: i64) -> String {
    let timestamp = chrono::DateTime::from_timestamp(edit_time, 0)
        .map(|dt| dt.format("%d/%m/%Y %H:%M:%S").to_string())
        .unwrap_or_else(|| edit_time.to_string());
    let mut block = format!("Edited @ {}\n\n", timestamp);
    for line in diff.iter().skip(3) {
        let formatted = match RE_DIFF_MARKER.captures(line) {
            Some(captures) => {
                let idx = captures[1].len();
                let rest = &line[idx..];
                if rest.trim().is_empty() {
                    continue;
                }
                let marker = &line[..1];
                let escape = if matches!(marker, "+" | "-") { "\\" } else { "" };
                format!("{}{}{} {}", &line[1..idx], escape, marker, rest)
            }
            None => line.clone(),
        };
        block.push_str(&formatted);
        block.push_str("\n\n");
    }
    block
}

/// LCS-based opcodes over line slices. Matching on equality is optimal for
/// the longest common subsequence, so equal runs are taken greedily.
fn opcodes(a: &[&str], b: &[&str]) -> Vec<Opcode> {
    let n = a.len();
    let m = b.len();
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut ops = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        if i < n && j < m && a[i] == b[j] {
            let (a1, b1) = (i, j);
            while i < n && j < m && a[i] == b[j] {
                i += 1;
                j += 1;
            }
            ops.push(Opcode {
                tag: Tag::Equal,
                a1,
                a2: i,
                b1,
                b2: j,
            });
        } else {
            let (a1, b1) = (i, j);
            while i < n || j < m {
                if i < n && j < m && a[i] == b[j] {
                    break;
                }
                if i < n && (j == m || lcs[i + 1][j] >= lcs[i][j + 1]) {
                    i += 1;
                } else {
                    j += 1;
                }
            }
            let tag = match (a1 < i, b1 < j) {
                (true, true) => Tag::Replace,
                (true, false) => Tag::Delete,
                _ => Tag::Insert,
            };
            ops.push(Opcode {
                tag,
                a1,
                a2: i,
                b1,
                b2: j,
            });
        }
    }
    ops
}

/// Groups opcodes into hunks with `CONTEXT` lines of context, eliding long
/// equal runs. A change-free opcode list yields no groups.
fn grouped(codes: &[Opcode]) -> Vec<Vec<Opcode>> {
    let mut codes: Vec<Opcode> = codes.to_vec();
    if codes.is_empty() {
        return Vec::new();
    }
    if let Some(first) = codes.first_mut() {
        if first.tag == Tag::Equal {
            first.a1 = first.a1.max(first.a2.saturating_sub(CONTEXT));
            first.b1 = first.b1.max(first.b2.saturating_sub(CONTEXT));
        }
    }
    if let Some(last) = codes.last_mut() {
        if last.tag == Tag::Equal {
            last.a2 = last.a2.min(last.a1 + CONTEXT);
            last.b2 = last.b2.min(last.b1 + CONTEXT);
        }
    }

    let mut groups = Vec::new();
    let mut group: Vec<Opcode> = Vec::new();
    for op in codes {
        if op.tag == Tag::Equal && op.a2 - op.a1 > 2 * CONTEXT {
            group.push(Opcode {
                a2: (op.a1 + CONTEXT).min(op.a2),
                b2: (op.b1 + CONTEXT).min(op.b2),
                ..op
            });
            groups.push(std::mem::take(&mut group));
            group.push(Opcode {
                a1: op.a1.max(op.a2.saturating_sub(CONTEXT)),
                b1: op.b1.max(op.b2.saturating_sub(CONTEXT)),
                ..op
            });
            continue;
        }
        group.push(op);
    }
    if !group.is_empty() && !(group.len() == 1 && group[0].tag == Tag::Equal) {
        groups.push(group);
    }
    groups
}

/// Unified-format range: 1-based start, length elided when 1.
fn format_range(start: usize, stop: usize) -> String {
    let length = stop - start;
    if length == 1 {
        return format!("{}", start + 1);
    }
    let beginning = if length == 0 { start } else { start + 1 };
    format!("{},{}", beginning, length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_texts_produce_empty_diff() {
        assert!(unified_diff("line1\nline2", "line1\nline2").is_empty());
        assert!(unified_diff("", "").is_empty());
    }

    #[test]
    fn test_single_line_change() {
        let diff = unified_diff("line1\nline2", "line1\nline2changed");
        assert_eq!(
            diff,
            vec![
                "--- ",
                "+++ ",
                "@@ -1,2 +1,2 @@",
                " line1",
                "-line2",
                "+line2changed",
            ]
        );
    }

    #[test]
    fn test_insertion_only() {
        let diff = unified_diff("a\nb", "a\nb\nc");
        assert!(diff.contains(&"+c".to_string()));
        assert!(!diff.iter().any(|l| l.starts_with('-')
            && !l.starts_with("---")));
    }

    #[test]
    fn test_distant_changes_make_separate_hunks() {
        let old: Vec<String> = (0..30).map(|i| format!("line{}", i)).collect();
        let mut new = old.clone();
        new[1] = "changed1".to_string();
        new[28] = "changed28".to_string();
        let diff = unified_diff(&old.join("\n"), &new.join("\n"));
        let hunks = diff.iter().filter(|l| l.starts_with("@@")).count();
        assert_eq!(hunks, 2);
    }

    #[test]
    fn test_format_edit_block_escapes_markers() {
        let diff = unified_diff("line1\nline2", "line1\nline2changed");
        let block = format_edit_block(&diff, 1_457_543_236);
        assert!(block.starts_with("Edited @ "));
        assert!(block.contains("\\- line2"));
        assert!(block.contains("\\+ line2changed"));
        // The header is dropped entirely.
        assert!(!block.contains("--- "));
        assert!(!block.contains("+++ "));
    }

    #[test]
    fn test_format_edit_block_resplices_quote_markers() {
        let diff = unified_diff(">> old quote", ">> new quote");
        let block = format_edit_block(&diff, 0);
        // Marker lands after the quote prefix, escaped.
        assert!(block.contains(">>\\- > old quote") || block.contains(">>\\- "));
        assert!(block.contains(">>\\+ "));
    }

    #[test]
    fn test_format_edit_block_drops_blank_content_lines() {
        let diff = unified_diff("a\n\nb", "a\n\nc");
        let block = format_edit_block(&diff, 0);
        // The blank context line between a and the change disappears.
        for line in block.lines() {
            assert_ne!(line.trim(), "-");
            assert_ne!(line.trim(), "+");
        }
        assert!(block.contains("\\- b"));
        assert!(block.contains("\\+ c"));
    }

    #[test]
    fn test_format_edit_block_timestamp_format() {
        let block = format_edit_block(&Vec::new(), 1_457_543_236);
        // 09/03/2016 17:07:16 UTC
        assert!(block.contains("09/03/2016"));
    }
}
