//! Table reconstruction from unstructured page text
//!
//! Consecutive lines that segment into two or more cells form blocks; a
//! block becomes a `TableCandidate` when enough of its rows agree on a
//! token count and on where the column gaps fall. The whole pass is a pure
//! function of the page text.

use crate::config::TableConfig;
use crate::types::{NumericCell, Page, TableCandidate};

use super::numeric::{is_numeric_token, normalize_cell};

/// A cell-sized token with its char-column span in the line
#[derive(Debug, Clone)]
struct Token {
    text: String,
    start: usize,
    end: usize,
}

#[derive(Debug, Clone)]
struct Row {
    line_index: usize,
    chars: Vec<char>,
    tokens: Vec<Token>,
    /// Tokenized by explicit separators rather than whitespace gaps
    separated: bool,
}

/// Reconstruct tables from a page. Pages with an OCR error yield nothing.
pub fn reconstruct_tables(page: &Page, config: &TableConfig) -> Vec<TableCandidate> {
    if !page.is_usable() {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    let mut block: Vec<Row> = Vec::new();

    for (line_index, line) in page.raw_text.lines().enumerate() {
        let chars: Vec<char> = line.chars().collect();
        let separated = chars.iter().any(|&c| c == '|' || c == '\t');
        let tokens = tokenize(&chars, config);

        if tokens.len() < 2 {
            flush_block(&mut block, page.page_number, config, &mut candidates);
            continue;
        }

        let row = Row {
            line_index,
            chars,
            tokens,
            separated,
        };

        if !block.is_empty() {
            let modal = modal_token_count(&block);
            if row.tokens.len().abs_diff(modal) > config.token_tolerance {
                flush_block(&mut block, page.page_number, config, &mut candidates);
            }
        }
        block.push(row);
    }
    flush_block(&mut block, page.page_number, config, &mut candidates);

    resolve_overlaps(candidates)
}

/// Normalized numeric view of a candidate's data rows. Raw strings are
/// preserved inside each cell.
pub fn normalized_rows(table: &TableCandidate) -> Vec<Vec<NumericCell>> {
    table
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| normalize_cell(cell)).collect())
        .collect()
}

/// Split a line into tokens. Lines carrying explicit separators (`|` or
/// tab) split on those; otherwise whitespace runs of at least `min_gap`
/// characters separate tokens, and shorter runs stay inside a token.
fn tokenize(chars: &[char], config: &TableConfig) -> Vec<Token> {
    if chars.iter().any(|&c| c == '|' || c == '\t') {
        return tokenize_separated(chars);
    }
    tokenize_gapped(chars, config.min_gap)
}

fn tokenize_separated(chars: &[char]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut seg_start = 0usize;

    for i in 0..=chars.len() {
        let at_sep = i == chars.len() || chars[i] == '|' || chars[i] == '\t';
        if !at_sep {
            continue;
        }
        if let Some(token) = trimmed_token(chars, seg_start, i) {
            tokens.push(token);
        }
        seg_start = i + 1;
    }

    tokens
}

fn tokenize_gapped(chars: &[char], min_gap: usize) -> Vec<Token> {
    // Non-whitespace segments first
    let mut segments: Vec<(usize, usize)> = Vec::new();
    let mut start: Option<usize> = None;
    for (i, &c) in chars.iter().enumerate() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                segments.push((s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        segments.push((s, chars.len()));
    }

    // Merge segments separated by gaps shorter than min_gap
    let mut tokens: Vec<Token> = Vec::new();
    for (s, e) in segments {
        match tokens.last_mut() {
            Some(last) if s - last.end < min_gap => {
                last.text.extend(chars[last.end..e].iter());
                last.end = e;
            }
            _ => tokens.push(Token {
                text: chars[s..e].iter().collect(),
                start: s,
                end: e,
            }),
        }
    }

    tokens
}

fn trimmed_token(chars: &[char], from: usize, to: usize) -> Option<Token> {
    let mut s = from;
    let mut e = to;
    while s < e && chars[s].is_whitespace() {
        s += 1;
    }
    while e > s && chars[e - 1].is_whitespace() {
        e -= 1;
    }
    if s == e {
        return None;
    }
    Some(Token {
        text: chars[s..e].iter().collect(),
        start: s,
        end: e,
    })
}

/// Most frequent token count in the block; ties go to the larger count
fn modal_token_count(block: &[Row]) -> usize {
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for row in block {
        let n = row.tokens.len();
        match counts.iter_mut().find(|(count, _)| *count == n) {
            Some((_, freq)) => *freq += 1,
            None => counts.push((n, 1)),
        }
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(count, _)| count)
        .unwrap_or(0)
}

fn flush_block(
    block: &mut Vec<Row>,
    page_number: u32,
    config: &TableConfig,
    out: &mut Vec<TableCandidate>,
) {
    let rows = std::mem::take(block);
    if rows.len() < 2 {
        return;
    }

    let modal = modal_token_count(&rows);
    let matching = rows.iter().filter(|r| r.tokens.len() == modal).count();
    let confidence = matching as f32 / rows.len() as f32;
    if confidence < config.confidence_floor {
        return;
    }

    let boundaries = column_boundaries(&rows, config);
    let cells: Vec<Vec<String>> = if boundaries.is_empty() {
        let width = rows.iter().map(|r| r.tokens.len()).max().unwrap_or(0);
        rows.iter()
            .map(|r| {
                let mut row: Vec<String> = r.tokens.iter().map(|t| t.text.clone()).collect();
                row.resize(width, String::new());
                row
            })
            .collect()
    } else {
        rows.iter().map(|r| split_at(&r.chars, &boundaries)).collect()
    };

    let has_header = rows[0]
        .tokens
        .iter()
        .all(|t| !is_numeric_token(&t.text));

    let (header, data_rows) = if has_header {
        (cells[0].clone(), cells[1..].to_vec())
    } else {
        (Vec::new(), cells)
    };

    if data_rows.is_empty() {
        return;
    }

    out.push(TableCandidate {
        page_number,
        header,
        rows: data_rows,
        confidence,
        line_start: rows.first().map(|r| r.line_index).unwrap_or(0),
        line_end: rows.last().map(|r| r.line_index).unwrap_or(0),
    });
}

/// Column breaks from clustering gap positions across the block's rows.
///
/// An offset is supported by a row when it falls inside one of the row's
/// inter-token gaps. Maximal offset runs supported by at least
/// `column_support` of the rows become breaks, taken at the run midpoint.
/// Separator-delimited rows already carry their columns, so blocks
/// containing them skip clustering.
fn column_boundaries(rows: &[Row], config: &TableConfig) -> Vec<usize> {
    if rows.iter().any(|r| r.separated) {
        return Vec::new();
    }
    let max_len = rows.iter().map(|r| r.chars.len()).max().unwrap_or(0);
    if max_len == 0 {
        return Vec::new();
    }
    let required = (config.column_support * rows.len() as f32).ceil() as usize;

    let mut support = vec![0usize; max_len];
    for row in rows {
        for pair in row.tokens.windows(2) {
            for offset in pair[0].end..pair[1].start {
                support[offset] += 1;
            }
        }
    }

    let mut boundaries = Vec::new();
    let mut run_start: Option<usize> = None;
    for (offset, &s) in support.iter().enumerate() {
        if s >= required {
            if run_start.is_none() {
                run_start = Some(offset);
            }
        } else if let Some(start) = run_start.take() {
            boundaries.push((start + offset - 1) / 2);
        }
    }
    if let Some(start) = run_start {
        boundaries.push((start + max_len - 1) / 2);
    }

    boundaries.retain(|&b| b > 0);
    boundaries
}

fn split_at(chars: &[char], boundaries: &[usize]) -> Vec<String> {
    let mut cells = Vec::with_capacity(boundaries.len() + 1);
    let mut prev = 0usize;
    for &b in boundaries {
        let end = b.min(chars.len());
        cells.push(collect_trimmed(&chars[prev.min(chars.len())..end]));
        prev = b;
    }
    cells.push(collect_trimmed(&chars[prev.min(chars.len())..]));
    cells
}

fn collect_trimmed(chars: &[char]) -> String {
    chars.iter().collect::<String>().trim().to_string()
}

/// Keep only the best candidate among those sharing a line range.
/// Higher confidence wins; ties go to the larger row count.
fn resolve_overlaps(mut candidates: Vec<TableCandidate>) -> Vec<TableCandidate> {
    candidates.sort_by(|a, b| {
        a.line_start
            .cmp(&b.line_start)
            .then(b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut kept: Vec<TableCandidate> = Vec::new();
    for candidate in candidates {
        match kept.iter_mut().find(|k| k.overlaps(&candidate)) {
            None => kept.push(candidate),
            Some(existing) => {
                let better = candidate.confidence > existing.confidence
                    || (candidate.confidence == existing.confidence
                        && candidate.row_count() > existing.row_count());
                if better {
                    *existing = candidate;
                }
            }
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(text: &str) -> Page {
        Page::ok(1, text.to_string(), 0.95)
    }

    const HOLDINGS: &str = "\
Portfolio Holdings

Security      Qty     Price
Apple Inc     100     178.25
Bond B        50      99.10
Cash          1       1.00

End of report.";

    #[test]
    fn aligned_block_becomes_table_with_header() {
        let tables = reconstruct_tables(&page(HOLDINGS), &TableConfig::default());

        assert_eq!(tables.len(), 1);
        let t = &tables[0];
        assert_eq!(t.header, vec!["Security", "Qty", "Price"]);
        assert_eq!(t.rows.len(), 3);
        assert_eq!(t.rows[0], vec!["Apple Inc", "100", "178.25"]);
        assert_eq!(t.rows[2], vec!["Cash", "1", "1.00"]);
        assert_eq!(t.confidence, 1.0);
        assert_eq!((t.line_start, t.line_end), (2, 5));
    }

    #[test]
    fn reconstruction_is_deterministic() {
        let p = page(HOLDINGS);
        let config = TableConfig::default();
        let first = reconstruct_tables(&p, &config);
        let second = reconstruct_tables(&p, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn numeric_first_row_means_no_header() {
        let text = "100   178.25\n50    99.10\n1     1.00";
        let tables = reconstruct_tables(&page(text), &TableConfig::default());
        assert_eq!(tables.len(), 1);
        assert!(tables[0].header.is_empty());
        assert_eq!(tables[0].rows.len(), 3);
    }

    #[test]
    fn pipe_separated_rows() {
        let text = "Name | Value\nAssets | 1,500,000\nLiabilities | 900,000";
        let tables = reconstruct_tables(&page(text), &TableConfig::default());
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].header, vec!["Name", "Value"]);
        assert_eq!(tables[0].rows[0][1], "1,500,000");
    }

    #[test]
    fn prose_yields_nothing() {
        let text = "This annual report covers the fiscal year.\nNothing tabular here.";
        let tables = reconstruct_tables(&page(text), &TableConfig::default());
        assert!(tables.is_empty());
    }

    #[test]
    fn low_confidence_block_discarded() {
        // Token counts disagree heavily; widen tolerance so the block
        // holds together and only the confidence floor applies
        let text = "a  b\nc  d  e  f\ng  h\ni  j  k  l\nm  n  o";
        let config = TableConfig {
            token_tolerance: 4,
            ..TableConfig::default()
        };
        assert!(reconstruct_tables(&page(text), &config).is_empty());
    }

    #[test]
    fn errored_page_yields_nothing() {
        let p = Page::failed(1, "timeout".to_string());
        assert!(reconstruct_tables(&p, &TableConfig::default()).is_empty());
    }

    #[test]
    fn short_rows_padded_to_width() {
        let text = "Security      Qty     Price\nApple Inc     100     178.25\nTotals";
        // "Totals" breaks the block (one token), so only the first two lines
        // form a table; padding applies within a block
        let tables = reconstruct_tables(&page(text), &TableConfig::default());
        assert_eq!(tables.len(), 1);
        for row in &tables[0].rows {
            assert_eq!(row.len(), tables[0].column_count());
        }
    }

    #[test]
    fn overlapping_candidates_keep_the_best() {
        let make = |confidence: f32, rows: usize, line_start: usize, line_end: usize| {
            TableCandidate {
                page_number: 1,
                header: Vec::new(),
                rows: vec![vec!["a".to_string(), "b".to_string()]; rows],
                confidence,
                line_start,
                line_end,
            }
        };

        // Same range: higher confidence wins
        let kept = resolve_overlaps(vec![make(0.6, 3, 0, 4), make(0.9, 2, 2, 5)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, 0.9);

        // Equal confidence: larger row count wins
        let kept = resolve_overlaps(vec![make(0.8, 2, 0, 4), make(0.8, 5, 3, 6)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].row_count(), 5);

        // Disjoint ranges both survive
        let kept = resolve_overlaps(vec![make(0.7, 2, 0, 2), make(0.7, 2, 5, 8)]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn normalized_rows_preserve_raw() {
        let text = "Security      Value\nApple Inc     $1,500,000\nBond B        4.2%";
        let tables = reconstruct_tables(&page(text), &TableConfig::default());
        let cells = normalized_rows(&tables[0]);
        assert_eq!(cells[0][1].raw, "$1,500,000");
        assert_eq!(cells[0][1].value, Some(1_500_000.0));
        assert!(cells[1][1].is_percent);
        assert_eq!(cells[0][0].value, None);
    }
}
