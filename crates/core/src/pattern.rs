//! Wildcard detection and validation for substitution rules.
//!
//! Compaction only ever replaces an explicit glyph list with prefix
//! wildcards when expanding those wildcards against the glyph universe
//! gives back exactly the same glyphs. Anything else falls back to the
//! explicit list.

use std::collections::HashSet;

use log::debug;

use crate::{
    config::MIN_WILDCARD_PREFIX,
    diagnostics::{Diagnostics, Warning},
    document::{GlyphPattern, Target},
    glyph::{GlyphName, GlyphUniverse},
};

/// The suffix shared by every substitution, if each target is its source
/// glyph plus one common `.suffix`.
pub fn common_suffix(pairs: &[(GlyphName, GlyphName)]) -> Option<String> {
    let mut suffix: Option<&str> = None;
    for (from, to) in pairs {
        let rest = to.strip_prefix(from.as_str())?;
        if !rest.starts_with('.') || rest.len() < 2 {
            return None;
        }
        match suffix {
            None => suffix = Some(rest),
            Some(seen) if seen == rest => {}
            Some(_) => return None,
        }
    }
    suffix.map(str::to_owned)
}

/// Source glyphs produced by expanding a rule's patterns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansion {
    /// Deduplicated source glyphs in pattern order; wildcard matches sorted.
    pub glyphs: Vec<GlyphName>,
    /// Wildcards left unexpanded because there was no universe.
    pub unexpanded: Vec<GlyphPattern>,
}

/// Expand `patterns` into concrete source glyphs.
///
/// With a `.suffix` target, wildcard matches that already end in the
/// suffix are skipped.
pub fn expand_sources(
    patterns: &[GlyphPattern],
    target: &Target,
    universe: Option<&GlyphUniverse>,
) -> Expansion {
    let mut expansion = Expansion::default();
    let mut seen = HashSet::new();
    let suffix = match target {
        Target::Suffix(suffix) => Some(suffix.as_str()),
        Target::Glyph(_) => None,
    };

    for pattern in patterns {
        match (pattern, universe) {
            (GlyphPattern::Literal(name), _) => {
                if seen.insert(name.clone()) {
                    expansion.glyphs.push(name.clone());
                }
            }
            (GlyphPattern::Prefix(_), Some(universe)) => {
                for name in pattern.expand(universe) {
                    if suffix.is_some_and(|suffix| name.ends_with(suffix)) {
                        continue;
                    }
                    if seen.insert(name.clone()) {
                        expansion.glyphs.push(name);
                    }
                }
            }
            (GlyphPattern::Prefix(_), None) => expansion.unexpanded.push(pattern.clone()),
        }
    }
    expansion
}

/// Group glyphs under prefix wildcards.
///
/// Walking the glyphs in order, each ungrouped glyph takes the shortest
/// prefix of at least [`MIN_WILDCARD_PREFIX`] characters it shares with
/// another ungrouped glyph. Every ungrouped glyph with that prefix joins the
/// group, whose token is the longest prefix common to all members.
pub fn group_prefixes(glyphs: &[GlyphName]) -> Vec<GlyphPattern> {
    let mut grouped = vec![false; glyphs.len()];
    let mut patterns = Vec::new();

    for (i, glyph) in glyphs.iter().enumerate() {
        if grouped[i] {
            continue;
        }
        let shares = |prefix: &str| {
            glyphs
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && !grouped[j] && other.starts_with(prefix))
        };
        let prefix = (MIN_WILDCARD_PREFIX..=glyph.len())
            .filter(|&len| glyph.is_char_boundary(len))
            .map(|len| &glyph.as_str()[..len])
            .find(|prefix| shares(prefix));

        match prefix {
            None => {
                grouped[i] = true;
                patterns.push(GlyphPattern::Literal(glyph.clone()));
            }
            Some(prefix) => {
                let members: Vec<usize> = (i..glyphs.len())
                    .filter(|&j| !grouped[j] && glyphs[j].starts_with(prefix))
                    .collect();
                let mut common = glyph.as_str();
                for &j in &members {
                    grouped[j] = true;
                    common = longest_common_prefix(common, &glyphs[j]);
                }
                patterns.push(GlyphPattern::Prefix(common.to_owned()));
            }
        }
    }
    patterns
}

fn longest_common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .char_indices()
        .zip(b.chars())
        .take_while(|((_, x), y)| x == y)
        .last()
        .map(|((i, c), _)| i + c.len_utf8())
        .unwrap_or(0);
    &a[..len]
}

/// Compact a rule's source glyphs into wildcards where that is provably
/// lossless.
///
/// Without a universe nothing is compacted. When the wildcard candidates
/// would select a different glyph set, the explicit list is returned and a
/// [`Warning::WildcardOverMatchFallback`] is recorded.
pub fn compact_sources(
    rule: &str,
    glyphs: &[GlyphName],
    target: &Target,
    universe: Option<&GlyphUniverse>,
    diagnostics: &mut Diagnostics,
) -> Vec<GlyphPattern> {
    let explicit = || glyphs.iter().cloned().map(GlyphPattern::Literal).collect::<Vec<_>>();
    let Some(universe) = universe else {
        return explicit();
    };

    let candidates = group_prefixes(glyphs);
    if !candidates.iter().any(GlyphPattern::is_wildcard) {
        return candidates;
    }

    let expanded = expand_sources(&candidates, target, Some(universe)).glyphs;
    let wanted: HashSet<&GlyphName> = glyphs.iter().collect();
    let got: HashSet<&GlyphName> = expanded.iter().collect();
    if wanted == got {
        debug!("rule '{rule}': compacted {} glyphs into {} patterns", glyphs.len(), candidates.len());
        return candidates;
    }

    let extra: Vec<GlyphName> = expanded.iter().filter(|g| !wanted.contains(g)).cloned().collect();
    let pattern = candidates
        .iter()
        .filter(|candidate| candidate.is_wildcard())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    diagnostics.push(Warning::WildcardOverMatchFallback { rule: rule.to_owned(), pattern, glyphs: extra });
    explicit()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn names(list: &[&str]) -> Vec<GlyphName> {
        list.iter().map(|n| GlyphName::new(*n)).collect()
    }

    fn pairs(list: &[(&str, &str)]) -> Vec<(GlyphName, GlyphName)> {
        list.iter().map(|(a, b)| (GlyphName::new(*a), GlyphName::new(*b))).collect()
    }

    #[test]
    fn detects_shared_suffix() {
        assert_eq!(
            common_suffix(&pairs(&[("dollar", "dollar.rvrn"), ("cent", "cent.rvrn")])).as_deref(),
            Some(".rvrn")
        );
        assert_eq!(common_suffix(&pairs(&[("dollar", "dollar.rvrn"), ("cent", "cent.alt")])), None);
        assert_eq!(common_suffix(&pairs(&[("a", "b")])), None);
        assert_eq!(common_suffix(&[]), None);
    }

    #[test]
    fn groups_by_shortest_shared_prefix() {
        let grouped = group_prefixes(&names(&["dollar", "dollar.sc", "cent", "Q", "Q.ss01"]));
        assert_eq!(
            grouped,
            vec![
                GlyphPattern::Prefix("dollar".into()),
                GlyphPattern::Literal("cent".into()),
                GlyphPattern::Literal("Q".into()),
                GlyphPattern::Literal("Q.ss01".into()),
            ]
        );
    }

    #[test]
    fn unrelated_glyphs_stay_literal() {
        let universe: GlyphUniverse =
            ["dollar", "cent", "dollar.rvrn", "cent.rvrn"].into_iter().collect();
        let mut diagnostics = Diagnostics::new();
        let patterns = compact_sources(
            "dollar",
            &names(&["dollar", "cent"]),
            &Target::Suffix(".rvrn".into()),
            Some(&universe),
            &mut diagnostics,
        );
        assert_eq!(patterns, vec![GlyphPattern::Literal("dollar".into()), GlyphPattern::Literal("cent".into())]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn wildcard_accepted_when_exact() {
        let universe: GlyphUniverse =
            ["Aring", "Aringacute", "Aring.alt", "Aringacute.alt", "B"].into_iter().collect();
        let mut diagnostics = Diagnostics::new();
        let patterns = compact_sources(
            "ring",
            &names(&["Aring", "Aringacute"]),
            &Target::Suffix(".alt".into()),
            Some(&universe),
            &mut diagnostics,
        );
        assert_eq!(patterns, vec![GlyphPattern::Prefix("Aring".into())]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn wildcard_rejected_on_over_match() {
        let universe: GlyphUniverse =
            ["dollar", "dollar.sc", "dollarsign", "dollar.rvrn", "dollar.sc.rvrn"].into_iter().collect();
        let mut diagnostics = Diagnostics::new();
        let glyphs = names(&["dollar", "dollar.sc"]);
        let patterns = compact_sources(
            "money",
            &glyphs,
            &Target::Suffix(".rvrn".into()),
            Some(&universe),
            &mut diagnostics,
        );
        assert_eq!(patterns, glyphs.into_iter().map(GlyphPattern::Literal).collect::<Vec<_>>());
        assert_eq!(
            diagnostics.into_vec(),
            vec![Warning::WildcardOverMatchFallback {
                rule: "money".into(),
                pattern: "dollar*".into(),
                glyphs: names(&["dollarsign"]),
            }]
        );
    }

    #[test]
    fn wildcard_skips_glyphs_carrying_the_suffix() {
        let universe: GlyphUniverse =
            ["dollar", "dollar.sc", "dollar.rvrn", "dollar.sc.rvrn"].into_iter().collect();
        let mut diagnostics = Diagnostics::new();
        let patterns = compact_sources(
            "money",
            &names(&["dollar", "dollar.sc"]),
            &Target::Suffix(".rvrn".into()),
            Some(&universe),
            &mut diagnostics,
        );
        assert_eq!(patterns, vec![GlyphPattern::Prefix("dollar".into())]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn no_universe_means_no_compaction() {
        let mut diagnostics = Diagnostics::new();
        let glyphs = names(&["dollar", "dollar.sc"]);
        let patterns =
            compact_sources("money", &glyphs, &Target::Suffix(".rvrn".into()), None, &mut diagnostics);
        assert_eq!(patterns.len(), 2);
        assert!(patterns.iter().all(|p| !p.is_wildcard()));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn expansion_without_universe_reports_wildcards() {
        let patterns = vec![GlyphPattern::Literal("a".into()), GlyphPattern::Prefix("dollar".into())];
        let expansion = expand_sources(&patterns, &Target::Suffix(".alt".into()), None);
        assert_eq!(expansion.glyphs, names(&["a"]));
        assert_eq!(expansion.unexpanded, vec![GlyphPattern::Prefix("dollar".into())]);
    }

    #[test]
    fn expansion_dedups_sources() {
        let universe: GlyphUniverse = ["a", "a.alt", "ab"].into_iter().collect();
        let patterns = vec![GlyphPattern::Literal("a".into()), GlyphPattern::Prefix("a".into())];
        let expansion = expand_sources(&patterns, &Target::Suffix(".alt".into()), Some(&universe));
        assert_eq!(expansion.glyphs, names(&["a", "ab"]));
    }
}
