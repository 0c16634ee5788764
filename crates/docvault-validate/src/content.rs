//! Element-content matching.
//!
//! A content model is matched against the sequence of child element names
//! by tracking the *set* of positions reachable after each particle, so
//! choices and optional particles never need backtracking. The furthest
//! position any branch reached drives the diagnostic.

use std::cell::Cell;
use std::collections::{BTreeSet, VecDeque};

use crate::schema::{Particle, SchemaSet, Term};

type Positions = BTreeSet<usize>;

/// Why a child sequence does not match a content model.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Mismatch {
    /// Index of the first child that could not be matched; equal to the
    /// number of children when the content ended too early.
    pub index: usize,
    /// Element names that would have been accepted at `index`.
    pub expected: Vec<String>,
    /// Whether a wildcard would also have been accepted at `index`.
    pub wildcard: bool,
}

/// Match child element local names against a content particle.
pub(crate) fn match_children(
    schema: &SchemaSet,
    particle: &Particle,
    names: &[&str],
) -> Result<(), Mismatch> {
    let matcher = Matcher::new(schema, names);
    if matcher.accepts(particle) {
        return Ok(());
    }

    let index = matcher.furthest.get().min(names.len());
    let mut candidates = Vec::new();
    particle.element_names(schema, &mut candidates);

    let mut expected = Vec::new();
    let mut attempt: Vec<&str> = names[..index].to_vec();
    for candidate in candidates {
        attempt.push(candidate);
        if Matcher::new(schema, &attempt).reaches(particle, index + 1) {
            expected.push(candidate.to_string());
        }
        attempt.pop();
    }

    // `#` is not a legal element name, so it can only be consumed by `xs:any`.
    let wildcard = particle.has_wildcard() && {
        attempt.push("#");
        Matcher::new(schema, &attempt).reaches(particle, index + 1)
    };

    Err(Mismatch {
        index,
        expected,
        wildcard,
    })
}

struct Matcher<'s> {
    schema: &'s SchemaSet,
    names: &'s [&'s str],
    furthest: Cell<usize>,
}

impl<'s> Matcher<'s> {
    fn new(schema: &'s SchemaSet, names: &'s [&'s str]) -> Self {
        Self {
            schema,
            names,
            furthest: Cell::new(0),
        }
    }

    fn accepts(&self, particle: &Particle) -> bool {
        self.repeat(particle, &Positions::from([0]))
            .contains(&self.names.len())
    }

    /// Whether any branch consumes at least `position` children.
    fn reaches(&self, particle: &Particle, position: usize) -> bool {
        self.repeat(particle, &Positions::from([0]));
        self.furthest.get() >= position
    }

    fn consumed(&self, end: usize) {
        if end > self.furthest.get() {
            self.furthest.set(end);
        }
    }

    /// Positions reachable from `starts` by matching `particle` between its
    /// `min` and `max` times.
    fn repeat(&self, particle: &Particle, starts: &Positions) -> Positions {
        let mut result = Positions::new();
        if particle.min == 0 {
            result.extend(starts.iter().copied());
        }
        let mut frontier = starts.clone();
        let mut count = 0u32;
        while particle.max.map_or(true, |max| count < max) && !frontier.is_empty() {
            let next = self.term(&particle.term, &frontier);
            count = count.saturating_add(1);
            if next == frontier && count < particle.min {
                // A nullable term that consumed nothing reaches the same
                // positions on every further round.
                count = particle.min;
            }
            if count >= particle.min {
                // Anything reachable from here was already reachable with
                // fewer repetitions.
                if next.is_subset(&result) {
                    break;
                }
                result.extend(next.iter().copied());
            }
            frontier = next;
        }
        result
    }

    fn term(&self, term: &Term, starts: &Positions) -> Positions {
        match term {
            Term::Element(slot) => {
                let Some(decl) = self.schema.element(slot) else {
                    return Positions::new();
                };
                self.step(starts, |name| name == decl.name)
            }
            Term::Any => self.step(starts, |_| true),
            Term::Sequence(parts) => {
                let mut current = starts.clone();
                for part in parts {
                    if current.is_empty() {
                        break;
                    }
                    current = self.repeat(part, &current);
                }
                current
            }
            Term::Choice(parts) => parts
                .iter()
                .flat_map(|part| self.repeat(part, starts))
                .collect(),
            Term::All(parts) => starts
                .iter()
                .flat_map(|start| self.all(parts, *start))
                .collect(),
        }
    }

    fn step(&self, starts: &Positions, accept: impl Fn(&str) -> bool) -> Positions {
        let mut next = Positions::new();
        for &start in starts {
            if let Some(name) = self.names.get(start) {
                if accept(name) {
                    self.consumed(start + 1);
                    next.insert(start + 1);
                }
            }
        }
        next
    }

    /// `xs:all`: every particle at most once, in any order; the required
    /// ones must all appear.
    fn all(&self, parts: &[Particle], start: usize) -> Positions {
        let required: u64 = parts
            .iter()
            .enumerate()
            .filter(|(_, p)| p.min > 0)
            .fold(0, |mask, (i, _)| mask | (1 << i));

        let mut ends = Positions::new();
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([(start, 0u64)]);
        while let Some((position, mask)) = queue.pop_front() {
            if !seen.insert((position, mask)) {
                continue;
            }
            if mask & required == required {
                ends.insert(position);
            }
            for (i, part) in parts.iter().enumerate() {
                let bit = 1u64 << i;
                if mask & bit != 0 || part.max == Some(0) {
                    continue;
                }
                for end in self.term(&part.term, &Positions::from([position])) {
                    queue.push_back((end, mask | bit));
                }
            }
        }
        ends
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ElementDecl, ElementSlot, ElementType};

    fn element(name: &str, min: u32, max: Option<u32>) -> Particle {
        Particle {
            min,
            max,
            term: Term::Element(ElementSlot::Local(ElementDecl {
                name: name.to_string(),
                ty: ElementType::Any,
                fixed: None,
            })),
        }
    }

    fn check(particle: &Particle, names: &[&str]) -> Result<(), Mismatch> {
        match_children(&SchemaSet::default(), particle, names)
    }

    #[test]
    fn sequence_in_order() {
        let seq = Particle::once(Term::Sequence(vec![
            element("a", 1, Some(1)),
            element("b", 0, Some(1)),
            element("c", 1, None),
        ]));
        assert!(check(&seq, &["a", "c"]).is_ok());
        assert!(check(&seq, &["a", "b", "c", "c", "c"]).is_ok());

        let err = check(&seq, &["a", "c", "b"]).unwrap_err();
        assert_eq!(err.index, 2);
        assert_eq!(err.expected, vec!["c"]);

        let err = check(&seq, &["a"]).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.expected, vec!["b", "c"]);
    }

    #[test]
    fn choice_without_backtracking() {
        // (a, b) | (a, c): the first branch fails after consuming `a`.
        let choice = Particle::once(Term::Choice(vec![
            Particle::once(Term::Sequence(vec![element("a", 1, Some(1)), element("b", 1, Some(1))])),
            Particle::once(Term::Sequence(vec![element("a", 1, Some(1)), element("c", 1, Some(1))])),
        ]));
        assert!(check(&choice, &["a", "c"]).is_ok());
        assert!(check(&choice, &["a", "b"]).is_ok());
        let err = check(&choice, &["a", "d"]).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.expected, vec!["b", "c"]);
    }

    #[test]
    fn bounded_repetition() {
        let seq = Particle::once(Term::Sequence(vec![element("item", 2, Some(3))]));
        assert!(check(&seq, &["item", "item"]).is_ok());
        assert!(check(&seq, &["item", "item", "item"]).is_ok());
        assert_eq!(check(&seq, &["item"]).unwrap_err().index, 1);
        assert_eq!(check(&seq, &["item"; 4]).unwrap_err().index, 3);
    }

    #[test]
    fn nullable_repetition_terminates() {
        let inner = Particle {
            min: 0,
            max: None,
            term: Term::Sequence(vec![element("x", 0, Some(1))]),
        };
        let seq = Particle::once(Term::Sequence(vec![inner]));
        assert!(check(&seq, &[]).is_ok());
        assert!(check(&seq, &["x", "x", "x"]).is_ok());
    }

    #[test]
    fn huge_minimum_on_nullable_term_finishes() {
        let seq = Particle {
            min: 4_000_000_000,
            max: None,
            term: Term::Sequence(vec![element("a", 0, Some(1))]),
        };
        assert!(check(&seq, &[]).is_ok());
        assert!(check(&seq, &["a", "a", "a"]).is_ok());
        assert_eq!(check(&seq, &["a", "b"]).unwrap_err().index, 1);
    }

    #[test]
    fn all_group_any_order() {
        let all = Particle::once(Term::All(vec![
            element("a", 1, Some(1)),
            element("b", 1, Some(1)),
            element("c", 0, Some(1)),
        ]));
        assert!(check(&all, &["b", "a"]).is_ok());
        assert!(check(&all, &["c", "a", "b"]).is_ok());
        assert!(check(&all, &["a", "a", "b"]).is_err());

        let err = check(&all, &["a"]).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.expected, vec!["b", "c"]);
    }

    #[test]
    fn wildcard_accepts_unknown_names() {
        let seq = Particle::once(Term::Sequence(vec![
            element("head", 1, Some(1)),
            Particle {
                min: 0,
                max: None,
                term: Term::Any,
            },
        ]));
        assert!(check(&seq, &["head", "anything", "else"]).is_ok());
        let err = check(&seq, &["other"]).unwrap_err();
        assert_eq!(err.index, 0);
        assert_eq!(err.expected, vec!["head"]);
        assert!(!err.wildcard);
    }

    #[test]
    fn empty_content() {
        let empty = Particle::once(Term::Sequence(Vec::new()));
        assert!(check(&empty, &[]).is_ok());
        let err = check(&empty, &["x"]).unwrap_err();
        assert_eq!(err.index, 0);
        assert!(err.expected.is_empty());
    }
}
