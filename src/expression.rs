//! Pointer-type expression compiler.
//!
//! Parses expressions like `"pen|touch+touch:2"` into the full set of
//! logically distinct permutations, each expanded into an ordered list
//! of type-ordinals (`pen:1`, `touch:1`, `touch:2`). The recognizer uses
//! this compiled form to bind incoming pointers to ordinal slots.

use std::fmt;

use crate::error::MilError;
use crate::pointer::PointerKind;

/// A single compiled slot: a pointer kind plus its 1-based occurrence
/// index within the permutation (`touch:2` is the second touch slot).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordinal {
    /// The kind this slot requires.
    pub kind: PointerKind,
    /// 1-based occurrence index of `kind` within the permutation.
    pub index: u8,
}

impl fmt::Display for Ordinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.kind {
            PointerKind::Pen => "pen",
            PointerKind::Touch => "touch",
            PointerKind::Mouse => "mouse",
            PointerKind::Hover => "hover",
            PointerKind::Any => "any",
        };
        write!(f, "{name}:{}", self.index)
    }
}

/// One concrete assignment of pointer kinds to ordinal slots, generated
/// by expanding the alternations inside a pointer-type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    /// Ordered slots; `slots.len()` is this permutation's pointer count.
    pub slots: Vec<Ordinal>,
}

impl Permutation {
    /// Number of pointers this permutation requires.
    #[must_use]
    pub fn pointer_count(&self) -> usize {
        self.slots.len()
    }
}

/// A compiled pointer-type expression: the full, deduplicated set of
/// permutations an expression expands to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledExpression {
    /// Original source expression, preserved for diagnostics.
    pub source: String,
    /// All distinct permutations this expression compiles to.
    pub permutations: Vec<Permutation>,
}

struct AltKind {
    kind: PointerKind,
    multiplicity: u8,
}

/// Compiles a pointer-type expression. All failures surface as
/// [`MilError::InvalidSpec`].
pub fn compile(expr: &str) -> Result<CompiledExpression, MilError> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(MilError::InvalidSpec("empty pointer-type expression".into()));
    }

    let mut conjunct_options: Vec<Vec<Vec<PointerKind>>> = Vec::new();

    for conjunct in trimmed.split('+') {
        if conjunct.is_empty() {
            return Err(MilError::InvalidSpec(format!(
                "malformed expression '{expr}': empty conjunct"
            )));
        }

        let alt_strs: Vec<&str> = conjunct.split('|').collect();
        if alt_strs.iter().any(|s| s.is_empty()) {
            return Err(MilError::InvalidSpec(format!(
                "malformed expression '{expr}': empty alternative"
            )));
        }

        let mut alts = Vec::with_capacity(alt_strs.len());
        for alt_str in &alt_strs {
            alts.push(parse_alt_kind(alt_str, expr)?);
        }

        if alts.len() > 1 && alts.iter().any(|a| a.kind == PointerKind::Any) {
            return Err(MilError::InvalidSpec(format!(
                "malformed expression '{expr}': 'any' cannot appear in an alternation"
            )));
        }

        let options: Vec<Vec<PointerKind>> = alts
            .into_iter()
            .map(|a| vec![a.kind; a.multiplicity as usize])
            .collect();
        conjunct_options.push(options);
    }

    let mut sequences: Vec<Vec<PointerKind>> = vec![Vec::new()];
    for options in conjunct_options {
        let mut next = Vec::with_capacity(sequences.len() * options.len());
        for seq in &sequences {
            for option in &options {
                let mut extended = seq.clone();
                extended.extend(option.iter().copied());
                next.push(extended);
            }
        }
        sequences = next;
    }

    sequences.dedup();

    let permutations = sequences.into_iter().map(to_permutation).collect();

    Ok(CompiledExpression {
        source: expr.to_string(),
        permutations,
    })
}

fn parse_alt_kind(alt_str: &str, source: &str) -> Result<AltKind, MilError> {
    let mut parts = alt_str.splitn(2, ':');
    let kind_str = parts.next().unwrap_or_default();
    let mult_str = parts.next();

    let kind = PointerKind::parse(kind_str).ok_or_else(|| {
        MilError::InvalidSpec(format!("unknown pointer kind '{kind_str}' in '{source}'"))
    })?;

    let multiplicity = match mult_str {
        None => 1,
        Some(s) => {
            let n: u32 = s.parse().map_err(|_| {
                MilError::InvalidSpec(format!("bad multiplicity ':{s}' in '{source}'"))
            })?;
            if !(1..=10).contains(&n) {
                return Err(MilError::InvalidSpec(format!(
                    "multiplicity {n} out of range (1..=10) in '{source}'"
                )));
            }
            n as u8
        }
    };

    Ok(AltKind { kind, multiplicity })
}

/// Builds a permutation's slots from `sequence`, assigning each
/// occurrence its 1-based index, then canonicalizes the slot order by
/// kind so logically-equivalent conjunctions written in different
/// source order (`"pen+touch"` vs `"touch+pen"`) compile to equal
/// `Permutation`s. The sort is stable, so occurrence order within a
/// kind (`touch:1` before `touch:2`) is preserved.
fn to_permutation(sequence: Vec<PointerKind>) -> Permutation {
    let mut seen_counts: std::collections::HashMap<PointerKind, u8> =
        std::collections::HashMap::new();
    let mut slots: Vec<Ordinal> = sequence
        .into_iter()
        .map(|kind| {
            let counter = seen_counts.entry(kind).or_insert(0);
            *counter += 1;
            Ordinal { kind, index: *counter }
        })
        .collect();
    slots.sort_by_key(|slot| slot.kind);
    Permutation { slots }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_kind() {
        let compiled = compile("touch").unwrap();
        assert_eq!(compiled.permutations.len(), 1);
        assert_eq!(compiled.permutations[0].pointer_count(), 1);
        assert_eq!(compiled.permutations[0].slots[0].to_string(), "touch:1");
    }

    #[test]
    fn test_conjunction_distinct_kinds() {
        let compiled = compile("pen+touch").unwrap();
        assert_eq!(compiled.permutations.len(), 1);
        let slots = &compiled.permutations[0].slots;
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].to_string(), "pen:1");
        assert_eq!(slots[1].to_string(), "touch:1");
    }

    #[test]
    fn test_multiplicity() {
        let compiled = compile("touch:2").unwrap();
        assert_eq!(compiled.permutations.len(), 1);
        let slots = &compiled.permutations[0].slots;
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].to_string(), "touch:1");
        assert_eq!(slots[1].to_string(), "touch:2");
    }

    #[test]
    fn test_alternation_and_multiplicity_combo() {
        // "pen|touch+touch:2" -> two permutations:
        //   [pen, touch, touch]  and [touch, touch, touch]
        let compiled = compile("pen|touch+touch:2").unwrap();
        assert_eq!(compiled.permutations.len(), 2);

        let perm_a: Vec<String> = compiled.permutations[0]
            .slots
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(perm_a, vec!["pen:1", "touch:1", "touch:2"]);

        let perm_b: Vec<String> = compiled.permutations[1]
            .slots
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(perm_b, vec!["touch:1", "touch:2", "touch:3"]);
    }

    #[test]
    fn test_commutative_equivalence() {
        // Source order must not matter: logically-equivalent
        // conjunctions compile to identical permutations.
        let ab = compile("pen+touch").unwrap();
        let ba = compile("touch+pen").unwrap();
        assert_eq!(ab.permutations, ba.permutations);
    }

    #[test]
    fn test_unknown_kind_is_invalid_spec() {
        let err = compile("stylus").unwrap_err();
        assert!(matches!(err, MilError::InvalidSpec(_)));
    }

    #[test]
    fn test_multiplicity_zero_invalid() {
        let err = compile("touch:0").unwrap_err();
        assert!(matches!(err, MilError::InvalidSpec(_)));
    }

    #[test]
    fn test_multiplicity_too_large_invalid() {
        let err = compile("touch:11").unwrap_err();
        assert!(matches!(err, MilError::InvalidSpec(_)));
    }

    #[test]
    fn test_any_in_alternation_invalid() {
        let err = compile("any|touch").unwrap_err();
        assert!(matches!(err, MilError::InvalidSpec(_)));
    }

    #[test]
    fn test_any_alone_is_valid() {
        let compiled = compile("any").unwrap();
        assert_eq!(compiled.permutations.len(), 1);
    }

    #[test]
    fn test_malformed_multiplicity() {
        let err = compile("touch:abc").unwrap_err();
        assert!(matches!(err, MilError::InvalidSpec(_)));
    }

    #[test]
    fn test_case_insensitive() {
        let compiled = compile("PEN|Touch").unwrap();
        assert_eq!(compiled.permutations.len(), 2);
    }

    #[test]
    fn test_deduplicates_identical_permutations() {
        // "touch|touch" only ever yields one distinct permutation.
        let compiled = compile("touch|touch").unwrap();
        assert_eq!(compiled.permutations.len(), 1);
    }
}
