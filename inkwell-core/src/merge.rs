//! Merge engine: reconciles findings from the basic and AI checkers.
//!
//! ## Algorithm
//!
//! 1. Drop no-op findings (fix identical to the source text).
//! 2. Sort by `(start, end)`; remaining ties use a total order so the result
//!    never depends on input order.
//! 3. Sweep left to right. A finding joins the open group when it starts
//!    before the group's union end, which for start-sorted input is exactly
//!    "overlaps some member" (transitive interval-union clustering).
//! 4. Each closed group becomes one [`CompositeError`].
//!
//! The function is pure; output order is left-to-right by span start, the
//! reading order the UI must preserve.

use std::cmp::{Ordering, Reverse};
use std::collections::BTreeSet;

use ordered_float::OrderedFloat;
use tracing::debug;

use crate::span::{Category, CompositeError, GrammarError, Origin, TextSpan};

/// Merge both checkers' findings into ordered, de-duplicated composites.
#[must_use]
pub fn merge(basic: &[GrammarError], ai: &[GrammarError]) -> Vec<CompositeError> {
    let mut findings: Vec<&GrammarError> = basic
        .iter()
        .chain(ai.iter())
        .filter(|e| !e.is_noop())
        .collect();
    findings.sort_by(|a, b| sweep_order(a, b));

    let mut composites = Vec::new();
    let mut group: Vec<&GrammarError> = Vec::new();
    let mut union: Option<TextSpan> = None;

    for finding in findings {
        match union {
            Some(u) if finding.span.start() < u.end() => {
                union = Some(u.union(&finding.span));
                group.push(finding);
            }
            Some(u) => {
                composites.push(compose(u, &group));
                group.clear();
                group.push(finding);
                union = Some(finding.span);
            }
            None => {
                group.push(finding);
                union = Some(finding.span);
            }
        }
    }
    if let Some(u) = union {
        composites.push(compose(u, &group));
    }

    debug!(
        basic = basic.len(),
        ai = ai.len(),
        composites = composites.len(),
        "merged findings"
    );
    composites
}

/// Total order used for the sweep.
fn sweep_order(a: &GrammarError, b: &GrammarError) -> Ordering {
    a.span
        .start()
        .cmp(&b.span.start())
        .then_with(|| a.span.end().cmp(&b.span.end()))
        .then_with(|| a.origin.cmp(&b.origin))
        .then_with(|| OrderedFloat(b.confidence).cmp(&OrderedFloat(a.confidence)))
        .then_with(|| a.suggested_fix.cmp(&b.suggested_fix))
        .then_with(|| a.category.cmp(&b.category))
}

/// Rank for choosing fixes: higher confidence first, Basic before AI.
fn fix_rank(e: &GrammarError) -> (Reverse<OrderedFloat<f32>>, Origin) {
    (Reverse(OrderedFloat(e.confidence)), e.origin)
}

fn compose(span: TextSpan, group: &[&GrammarError]) -> CompositeError {
    let mut ranked: Vec<&GrammarError> = group.to_vec();
    // Stable: equal ranks keep sweep order.
    ranked.sort_by_key(|e| fix_rank(e));

    // Flag-only members never shadow a member that actually proposes a fix.
    let primary_fix = ranked
        .iter()
        .find(|e| e.has_fix())
        .map(|e| e.suggested_fix.clone())
        .unwrap_or_default();

    let mut alternative_fixes: Vec<String> = Vec::new();
    for e in &ranked {
        if e.has_fix()
            && e.suggested_fix != primary_fix
            && !alternative_fixes.contains(&e.suggested_fix)
        {
            alternative_fixes.push(e.suggested_fix.clone());
        }
    }

    let contributing_origins: BTreeSet<Origin> = group.iter().map(|e| e.origin).collect();

    CompositeError {
        span,
        primary_fix,
        alternative_fixes,
        category: majority_category(group),
        contributing_origins,
    }
}

/// Most frequent category; ties go to the higher-priority category.
fn majority_category(group: &[&GrammarError]) -> Category {
    let mut votes = [0usize; Category::ALL.len()];
    for e in group {
        votes[e.category as usize] += 1;
    }
    let mut best = Category::Unknown;
    let mut best_votes = 0;
    // ALL is in priority order, so strict `>` keeps the earlier category on ties.
    for (category, count) in Category::ALL.iter().zip(votes) {
        if count > best_votes {
            best = *category;
            best_votes = count;
        }
    }
    best
}
