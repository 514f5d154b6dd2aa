//! Name-keyed rule table with eager validation
//!
//! Every check that can be made without input happens here, so that a grammar
//! which constructs successfully can only fail on input problems at parse time.

use crate::peg::error::GrammarError;
use crate::peg::grammar::pattern::Pattern;
use crate::peg::grammar::rule::Rule;
use std::collections::{HashMap, HashSet};
use std::fmt;

pub struct Rules<T> {
    rules: Vec<Rule<T>>,
    index: HashMap<String, usize>,
}

impl<T> Rules<T> {
    /// Build and validate a rule table.
    ///
    /// Rejects duplicate names, references to undefined rules, empty
    /// sequences/choices and impossible repetition ranges.
    pub fn new(rules: impl IntoIterator<Item = Rule<T>>) -> Result<Self, GrammarError> {
        let rules: Vec<Rule<T>> = rules.into_iter().collect();
        let mut index = HashMap::with_capacity(rules.len());
        for (i, rule) in rules.iter().enumerate() {
            if index.insert(rule.name.clone(), i).is_some() {
                return Err(GrammarError::DuplicateRule(rule.name.clone()));
            }
        }

        let table = Self { rules, index };
        for rule in &table.rules {
            table.validate_pattern(&rule.name, &rule.pattern)?;
        }
        Ok(table)
    }

    fn validate_pattern(&self, rule: &str, pattern: &Pattern) -> Result<(), GrammarError> {
        match pattern {
            Pattern::Rule(p) if !self.index.contains_key(&p.name) => {
                return Err(GrammarError::UndefinedRule {
                    rule: p.name.clone(),
                    referenced_by: rule.to_string(),
                });
            }
            Pattern::Seq(p) if p.patterns.is_empty() => {
                return Err(GrammarError::EmptyComposite {
                    rule: rule.to_string(),
                    kind: "seq",
                });
            }
            Pattern::Choice(p) if p.patterns.is_empty() => {
                return Err(GrammarError::EmptyComposite {
                    rule: rule.to_string(),
                    kind: "choice",
                });
            }
            Pattern::Repeat(p) => {
                if let Some(max) = p.max {
                    if max == 0 || max < p.min {
                        return Err(GrammarError::InvalidRepeat {
                            rule: rule.to_string(),
                            min: p.min,
                            max,
                        });
                    }
                }
            }
            _ => {}
        }
        pattern
            .children()
            .into_iter()
            .try_for_each(|child| self.validate_pattern(rule, child))
    }

    pub fn get(&self, name: &str) -> Option<&Rule<T>> {
        self.index.get(name).map(|&i| &self.rules[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule<T>> {
        self.rules.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules that can reach themselves without consuming a token.
    ///
    /// Such rules are not supported: at parse time they only terminate through
    /// the depth guard. Returned in declaration order.
    pub fn left_recursive_rules(&self) -> Vec<&str> {
        let nullable = self.nullable_rules();
        let leftmost: Vec<HashSet<usize>> = self
            .rules
            .iter()
            .map(|rule| {
                let mut refs = HashSet::new();
                self.leftmost_refs(&rule.pattern, &nullable, &mut refs);
                refs
            })
            .collect();

        (0..self.rules.len())
            .filter(|&start| {
                let mut seen = HashSet::new();
                let mut stack: Vec<usize> = leftmost[start].iter().copied().collect();
                while let Some(current) = stack.pop() {
                    if current == start {
                        return true;
                    }
                    if seen.insert(current) {
                        stack.extend(leftmost[current].iter().copied());
                    }
                }
                false
            })
            .map(|i| self.rules[i].name.as_str())
            .collect()
    }

    fn nullable_rules(&self) -> Vec<bool> {
        let mut nullable = vec![false; self.rules.len()];
        loop {
            let mut changed = false;
            for (i, rule) in self.rules.iter().enumerate() {
                if !nullable[i] && self.is_nullable(&rule.pattern, &nullable) {
                    nullable[i] = true;
                    changed = true;
                }
            }
            if !changed {
                return nullable;
            }
        }
    }

    fn is_nullable(&self, pattern: &Pattern, nullable: &[bool]) -> bool {
        match pattern {
            Pattern::Token(_) => false,
            Pattern::Rule(p) => self.index.get(&p.name).is_some_and(|&i| nullable[i]),
            Pattern::Seq(p) => p.patterns.iter().all(|c| self.is_nullable(c, nullable)),
            Pattern::Choice(p) => p.patterns.iter().any(|c| self.is_nullable(c, nullable)),
            Pattern::Repeat(p) => p.min == 0 || self.is_nullable(&p.element, nullable),
            Pattern::Optional(_) => true,
        }
    }

    fn leftmost_refs(&self, pattern: &Pattern, nullable: &[bool], out: &mut HashSet<usize>) {
        match pattern {
            Pattern::Token(_) => {}
            Pattern::Rule(p) => {
                if let Some(&i) = self.index.get(&p.name) {
                    out.insert(i);
                }
            }
            Pattern::Seq(p) => {
                for child in &p.patterns {
                    self.leftmost_refs(child, nullable, out);
                    if !self.is_nullable(child, nullable) {
                        break;
                    }
                }
            }
            Pattern::Choice(p) => p
                .patterns
                .iter()
                .for_each(|child| self.leftmost_refs(child, nullable, out)),
            Pattern::Repeat(p) => self.leftmost_refs(&p.element, nullable, out),
            Pattern::Optional(p) => self.leftmost_refs(&p.element, nullable, out),
        }
    }
}

impl<T> fmt::Debug for Rules<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.rules.iter()).finish()
    }
}
