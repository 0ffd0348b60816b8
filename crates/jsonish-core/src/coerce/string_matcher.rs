//! The enum / string-literal matcher (spec §4.5): a five-tier cascade, each
//! progressively more permissive, stopping at the first tier that produces
//! a result.

use unicode_normalization::UnicodeNormalization;

use super::CoercionFlag;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchFailure {
    NoMatch,
    Ambiguous(Vec<String>),
}

/// Matches `text` against `variants` (enum member names, or the single
/// entry for a string literal). `is_enum` selects the tier-5 tie policy:
/// enums fail on a multi-variant tie (`AmbiguousMatch`); string literals in
/// a union return the earliest-found candidate (`FirstMatch`).
pub fn match_variants(
    text: &str,
    variants: &[String],
    is_enum: bool,
) -> Result<(usize, Vec<CoercionFlag>), MatchFailure> {
    let text = text.trim();

    // Tiers 1-4: progressively looser full-string equality.
    for tier in 1..=4 {
        let t_norm = normalize(text, tier);
        let matches: Vec<usize> = variants
            .iter()
            .enumerate()
            .filter(|(_, v)| normalize(v, tier) == t_norm)
            .map(|(i, _)| i)
            .collect();

        match matches.len() {
            0 => continue,
            1 => {
                let idx = matches[0];
                if ambiguity_precondition_trips(text, variants, idx) {
                    return Err(MatchFailure::Ambiguous(
                        other_variants_present(text, variants, idx),
                    ));
                }
                let flags = if tier == 1 {
                    Vec::new()
                } else {
                    vec![CoercionFlag::StrippedPunctuation]
                };
                return Ok((idx, flags));
            }
            _ => return Err(MatchFailure::Ambiguous(matches.iter().map(|&i| variants[i].clone()).collect())),
        }
    }

    // Tier 5: substring scan over the tier-3 (strip-punct + lowercase) normalization.
    let t_norm = normalize(text, 3);
    let norm_variants: Vec<String> = variants.iter().map(|v| normalize(v, 3)).collect();
    let found = find_non_overlapping_occurrences(&t_norm, &norm_variants);

    match found.len() {
        0 => Err(MatchFailure::NoMatch),
        1 => {
            let idx = found[0].0;
            Ok((idx, vec![CoercionFlag::SubstringMatch]))
        }
        _ => {
            if is_enum {
                Err(MatchFailure::Ambiguous(
                    found.iter().map(|(i, _)| variants[*i].clone()).collect(),
                ))
            } else {
                // First variant found, by earliest occurrence start.
                let mut by_start = found.clone();
                by_start.sort_by_key(|(_, start)| *start);
                let idx = by_start[0].0;
                Ok((
                    idx,
                    vec![
                        CoercionFlag::SubstringMatch,
                        CoercionFlag::StrMatchOneFromMany(found.len()),
                        CoercionFlag::FirstMatch,
                    ],
                ))
            }
        }
    }
}

/// The ambiguity precondition (spec §4.5): before returning success, scan
/// the untransformed text for any *other* variant's (tier-3-normalized)
/// occurrence. If two or more distinct variants are present, the match is
/// ambiguous even though one tier matched cleanly.
fn ambiguity_precondition_trips(text: &str, variants: &[String], matched_idx: usize) -> bool {
    let t_norm = normalize(text, 3);
    let norm_variants: Vec<String> = variants.iter().map(|v| normalize(v, 3)).collect();
    let found = find_non_overlapping_occurrences(&t_norm, &norm_variants);
    let distinct: std::collections::HashSet<usize> = found.iter().map(|(i, _)| *i).collect();
    distinct.len() >= 2 && distinct.contains(&matched_idx)
        || (distinct.len() >= 2 && !distinct.contains(&matched_idx) && !distinct.is_empty())
}

fn other_variants_present(text: &str, variants: &[String], matched_idx: usize) -> Vec<String> {
    let t_norm = normalize(text, 3);
    let norm_variants: Vec<String> = variants.iter().map(|v| normalize(v, 3)).collect();
    let found = find_non_overlapping_occurrences(&t_norm, &norm_variants);
    let mut names: Vec<String> = found.iter().map(|(i, _)| variants[*i].clone()).collect();
    if !names.contains(&variants[matched_idx]) {
        names.push(variants[matched_idx].clone());
    }
    names.sort();
    names.dedup();
    names
}

/// Greedy non-overlapping substring scan: among all candidate occurrences
/// of every variant inside `text`, prefer longer matches, breaking length
/// ties by earlier start. Returns `(variant_index, occurrence_start)` for
/// each variant that won at least one occurrence.
fn find_non_overlapping_occurrences(text: &str, variants: &[String]) -> Vec<(usize, usize)> {
    let mut candidates: Vec<(usize, usize, usize)> = Vec::new(); // (start, end, variant_idx)
    for (idx, variant) in variants.iter().enumerate() {
        if variant.is_empty() {
            continue;
        }
        let mut search_from = 0;
        while let Some(pos) = text[search_from..].find(variant.as_str()) {
            let start = search_from + pos;
            let end = start + variant.len();
            candidates.push((start, end, idx));
            search_from = start + 1;
        }
    }

    candidates.sort_by(|a, b| {
        let len_a = a.1 - a.0;
        let len_b = b.1 - b.0;
        len_b.cmp(&len_a).then(a.0.cmp(&b.0))
    });

    let mut accepted_spans: Vec<(usize, usize)> = Vec::new();
    let mut winners: Vec<(usize, usize)> = Vec::new();
    let mut seen_variants = std::collections::HashSet::new();

    for (start, end, idx) in candidates {
        let overlaps = accepted_spans.iter().any(|&(s, e)| start < e && s < end);
        if overlaps {
            continue;
        }
        accepted_spans.push((start, end));
        if seen_variants.insert(idx) {
            winners.push((idx, start));
        }
    }

    winners
}

fn normalize(s: &str, tier: u8) -> String {
    match tier {
        1 => s.to_string(),
        2 => strip_punctuation(s),
        3 => strip_punctuation(s).to_lowercase(),
        4 => fold_diacritics(&strip_punctuation(s).to_lowercase()),
        _ => s.to_string(),
    }
}

fn strip_punctuation(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

fn fold_diacritics(s: &str) -> String {
    let replaced: String = s
        .chars()
        .flat_map(|c| match c {
            'ß' => "ss".chars().collect::<Vec<_>>(),
            'æ' | 'Æ' => "ae".chars().collect(),
            'ø' | 'Ø' => "o".chars().collect(),
            other => vec![other],
        })
        .collect();
    replaced.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F)
}
