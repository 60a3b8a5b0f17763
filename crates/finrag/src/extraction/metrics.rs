//! Metric tagging: configured keywords near numeric tokens
//!
//! A keyword occurrence tags the nearest amount token within a bounded
//! character distance as that metric's value. All matches are retained;
//! dedup and ranking belong to the document index.

use regex::RegexBuilder;

use crate::config::EntityConfig;
use crate::types::{FinancialMetric, MetricUnit};

use super::isin::context_window;
use super::numeric::{find_amount_tokens, AmountToken};

/// Extract metric tags from page text
pub fn extract(text: &str, page_number: u32, config: &EntityConfig) -> Vec<FinancialMetric> {
    let amounts = find_amount_tokens(text, page_number);
    if amounts.is_empty() {
        return Vec::new();
    }

    // Sorted keys keep output order independent of map iteration order
    let mut keys: Vec<&String> = config.metric_keywords.keys().collect();
    keys.sort();

    let mut tagged: Vec<(usize, FinancialMetric)> = Vec::new();

    for metric_key in keys {
        for keyword in &config.metric_keywords[metric_key] {
            let pattern = RegexBuilder::new(&regex::escape(keyword))
                .case_insensitive(true)
                .build();
            let pattern = match pattern {
                Ok(p) => p,
                Err(_) => continue,
            };

            for m in pattern.find_iter(text) {
                if let Some(token) = nearest_amount(&amounts, m.start(), m.end(), config.metric_distance)
                {
                    let span_start = m.start().min(token.start);
                    let span_end = m.end().max(token.end);
                    tagged.push((
                        m.start(),
                        FinancialMetric {
                            metric_key: metric_key.clone(),
                            raw_value_text: token.mention.raw_text.clone(),
                            parsed_numeric_value: token.mention.value,
                            unit: unit_for(token),
                            page_number,
                            context: context_window(
                                text,
                                span_start,
                                span_end,
                                config.context_window,
                            ),
                        },
                    ));
                }
            }
        }
    }

    tagged.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.metric_key.cmp(&b.1.metric_key)));
    tagged.into_iter().map(|(_, m)| m).collect()
}

/// Nearest token within `max_distance` of the keyword span. A token after
/// the keyword wins over one before it at equal distance.
fn nearest_amount<'a>(
    amounts: &'a [AmountToken],
    kw_start: usize,
    kw_end: usize,
    max_distance: usize,
) -> Option<&'a AmountToken> {
    let mut best: Option<(usize, bool, &AmountToken)> = None;

    for token in amounts {
        let (distance, follows) = if token.start >= kw_end {
            (token.start - kw_end, true)
        } else if token.end <= kw_start {
            (kw_start - token.end, false)
        } else {
            (0, true)
        };

        if distance > max_distance {
            continue;
        }

        let better = match &best {
            None => true,
            Some((d, f, _)) => distance < *d || (distance == *d && follows && !*f),
        };
        if better {
            best = Some((distance, follows, token));
        }
    }

    best.map(|(_, _, t)| t)
}

fn unit_for(token: &AmountToken) -> MetricUnit {
    if token.mention.is_percent {
        MetricUnit::Percent
    } else if token.mention.currency.is_some() {
        MetricUnit::Currency
    } else {
        MetricUnit::Count
    }
}
