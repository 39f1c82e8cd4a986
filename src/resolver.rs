//! Dependency-ordered field resolution.
//!
//! [`Resolver`] hands out field names in an order where every field comes
//! after all of its dependencies. It rescans the pending queue, yielding each
//! field as soon as it becomes eligible; a full pass over the queue that
//! yields nothing means the remaining fields form (or wait on) a cycle.
//!
//! Unknown dependency names are reported before anything is yielded.

use std::collections::{HashSet, VecDeque};

use thiserror::Error;
use tracing::trace;

/// Dependency graph failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The listed fields can never become eligible.
    #[error("circular dependency among fields: {}", fields.join(", "))]
    Cycle {
        /// Unresolvable fields, sorted by name.
        fields: Vec<String>,
    },

    /// A field depends on a name the schema does not declare.
    #[error("field '{field}' depends on unknown field '{dependency}'")]
    MissingDependency {
        /// Declaring field.
        field: String,
        /// Unknown name.
        dependency: String,
    },
}

#[derive(Debug)]
struct Pending<'a> {
    name: &'a str,
    dependencies: Vec<&'a str>,
}

/// Iterator over field names in dependency order.
///
/// Each yielded name is considered resolved immediately, so callers must
/// evaluate it before pulling the next one.
///
/// ```
/// use harvester_core::resolver::Resolver;
///
/// let fields = [("b", vec!["a"]), ("a", vec![])];
/// let order: Vec<_> = Resolver::new(fields.iter().map(|(n, d)| (*n, d.iter().copied())))?
///     .collect::<Result<_, _>>()?;
/// assert_eq!(order, ["a", "b"]);
/// # Ok::<(), harvester_core::resolver::GraphError>(())
/// ```
#[derive(Debug)]
pub struct Resolver<'a> {
    queue: VecDeque<Pending<'a>>,
    resolved: HashSet<&'a str>,
    unproductive: usize,
    failed: bool,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver over `(name, dependencies)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingDependency`] for the first dependency that
    /// names no field in the set.
    pub fn new<I, D>(fields: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = (&'a str, D)>,
        D: IntoIterator<Item = &'a str>,
    {
        let queue: VecDeque<Pending<'a>> = fields
            .into_iter()
            .map(|(name, dependencies)| Pending {
                name,
                dependencies: dependencies.into_iter().collect(),
            })
            .collect();

        let known: HashSet<&str> = queue.iter().map(|p| p.name).collect();
        for pending in &queue {
            if let Some(missing) = pending.dependencies.iter().find(|d| !known.contains(*d)) {
                return Err(GraphError::MissingDependency {
                    field: pending.name.to_string(),
                    dependency: (*missing).to_string(),
                });
            }
        }

        Ok(Self {
            queue,
            resolved: HashSet::new(),
            unproductive: 0,
            failed: false,
        })
    }

    /// Number of fields not yet yielded.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    fn cycle(&mut self) -> GraphError {
        self.failed = true;
        let mut fields: Vec<String> = self.queue.iter().map(|p| p.name.to_string()).collect();
        fields.sort();
        GraphError::Cycle { fields }
    }
}

impl<'a> Iterator for Resolver<'a> {
    type Item = Result<&'a str, GraphError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        while let Some(pending) = self.queue.pop_front() {
            if pending
                .dependencies
                .iter()
                .all(|d| self.resolved.contains(d))
            {
                trace!(field = pending.name, "field eligible");
                self.unproductive = 0;
                self.resolved.insert(pending.name);
                return Some(Ok(pending.name));
            }
            self.queue.push_back(pending);
            self.unproductive += 1;
            if self.unproductive >= self.queue.len() {
                return Some(Err(self.cycle()));
            }
        }
        None
    }
}
