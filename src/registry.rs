use std::collections::HashMap;

use crate::error::LoweringError;
use crate::target::TargetSpecification;
use crate::visitors::{NodeVisitor, default_visitors};

/// Table from (operator identity, target specification) to the visitor that
/// lowers it.
///
/// Built once before lowering starts, then only read; it is `Send + Sync` and
/// can be shared by concurrent lowerings of independent graphs.
#[derive(Default)]
pub struct VisitorRegistry {
    visitors: Vec<Box<dyn NodeVisitor>>,
    table: HashMap<String, HashMap<TargetSpecification, usize>>,
}

impl VisitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Result<Self, LoweringError> {
        let mut registry = Self::new();
        for visitor in default_visitors() {
            registry.register(visitor)?;
        }
        Ok(registry)
    }

    /// Binds every (identity, spec) pair the visitor declares.
    ///
    /// A pair already bound to a visitor of another name is a conflict; the
    /// registry is left untouched in that case. New pairs claimed under a name
    /// that is already registered bind to the stored instance.
    pub fn register(&mut self, visitor: Box<dyn NodeVisitor>) -> Result<(), LoweringError> {
        let descriptor = visitor.descriptor();
        let mut unbound = Vec::new();
        for (target, spec) in descriptor.pairs() {
            match self.table.get(target).and_then(|specs| specs.get(&spec)) {
                Some(&index) => {
                    let existing = self.visitors[index].descriptor().name;
                    if existing != descriptor.name {
                        return Err(LoweringError::Conflict {
                            op: target.to_string(),
                            spec,
                            existing,
                            incoming: descriptor.name,
                        });
                    }
                }
                None => unbound.push((target, spec)),
            }
        }

        if unbound.is_empty() {
            tracing::debug!(visitor = descriptor.name, "visitor already registered");
            return Ok(());
        }

        let stored = self
            .visitors
            .iter()
            .position(|known| known.descriptor().name == descriptor.name);
        let index = stored.unwrap_or(self.visitors.len());
        for (target, spec) in unbound {
            tracing::debug!(visitor = descriptor.name, op = target, %spec, "registering visitor");
            self.table
                .entry(target.to_string())
                .or_default()
                .insert(spec, index);
        }
        if stored.is_none() {
            self.visitors.push(visitor);
        }
        Ok(())
    }

    pub fn lookup(
        &self,
        target: &str,
        spec: &TargetSpecification,
    ) -> Result<&dyn NodeVisitor, LoweringError> {
        self.table
            .get(target)
            .and_then(|specs| specs.get(spec))
            .map(|&index| self.visitors[index].as_ref())
            .ok_or_else(|| LoweringError::UnregisteredOperator {
                op: target.to_string(),
                spec: *spec,
            })
    }

    pub fn visitors(&self) -> impl Iterator<Item = &dyn NodeVisitor> {
        self.visitors.iter().map(|visitor| visitor.as_ref())
    }

    /// All bindings as (identity, spec, visitor name), sorted.
    pub fn registered_pairs(&self) -> Vec<(&str, TargetSpecification, &'static str)> {
        let mut pairs: Vec<_> = self
            .table
            .iter()
            .flat_map(|(target, specs)| {
                specs.iter().map(move |(spec, &index)| {
                    (
                        target.as_str(),
                        *spec,
                        self.visitors[index].descriptor().name,
                    )
                })
            })
            .collect();
        pairs.sort();
        pairs
    }

    pub fn len(&self) -> usize {
        self.visitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visitors.is_empty()
    }
}
