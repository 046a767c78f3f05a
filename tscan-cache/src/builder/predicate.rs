//! Per-operator predicate storage

use std::collections::BTreeMap;

use crate::{Operator, Value};

/// One `column <op> value` condition
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub value: Value,
}

/// Predicates grouped by operator.
///
/// Every registry operator is always present as a key, and groups are
/// iterated in registry order. Within a group, insertion order is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateSet {
    groups: BTreeMap<Operator, Vec<Predicate>>,
}

impl Default for PredicateSet {
    fn default() -> Self {
        Self {
            groups: Operator::ALL.iter().map(|op| (*op, Vec::new())).collect(),
        }
    }
}

impl PredicateSet {
    /// Create a set with an empty group for every operator
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy of this set with one more predicate appended to `operator`'s group.
    ///
    /// Unlike the builder methods this needs no table, which makes it the way to
    /// assemble standalone fragments for [`QueryBuilder::where_`](crate::QueryBuilder::where_).
    pub fn with(&self, operator: Operator, column: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut next = self.clone();
        next.push(operator, column.into(), value.into());
        next
    }

    pub(crate) fn push(&mut self, operator: Operator, column: String, value: Value) {
        self.groups
            .entry(operator)
            .or_default()
            .push(Predicate { column, value });
    }

    /// Predicates registered under `operator`, in insertion order
    pub fn get(&self, operator: Operator) -> &[Predicate] {
        self.groups.get(&operator).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Groups in registry order, including empty ones
    pub fn iter(&self) -> impl Iterator<Item = (Operator, &[Predicate])> + '_ {
        self.groups.iter().map(|(op, group)| (*op, group.as_slice()))
    }

    /// Total number of predicates across all operators
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.values().all(Vec::is_empty)
    }

    /// Merge `other` into a copy of this set.
    ///
    /// A non-empty group in `other` replaces the group for the same operator;
    /// empty groups leave the existing one untouched.
    pub fn merged(&self, other: &PredicateSet) -> Self {
        let mut next = self.clone();
        for (op, group) in other.iter().filter(|(_, group)| !group.is_empty()) {
            next.groups.insert(op, group.to_vec());
        }
        next
    }
}

impl AsRef<PredicateSet> for PredicateSet {
    fn as_ref(&self) -> &PredicateSet {
        self
    }
}
