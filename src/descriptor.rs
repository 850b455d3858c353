use crate::target::TargetSpecification;

/// Declarative metadata a visitor hands to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorDescriptor {
    /// Unique visitor name; two registrations conflict only if names differ.
    pub name: &'static str,
    /// Operator identities (aliases) the visitor lowers.
    pub targets: &'static [&'static str],
    /// Target specifications the visitor emits valid IR for.
    pub specs: &'static [TargetSpecification],
    /// Accepted positional argument counts.
    pub input_counts: &'static [usize],
}

impl OperatorDescriptor {
    pub fn supports(&self, spec: &TargetSpecification) -> bool {
        self.specs.contains(spec)
    }

    pub fn handles(&self, target: &str) -> bool {
        self.targets.contains(&target)
    }

    /// Every (identity, spec) pair this descriptor claims.
    pub fn pairs(&self) -> impl Iterator<Item = (&'static str, TargetSpecification)> + '_ {
        self.targets
            .iter()
            .flat_map(|target| self.specs.iter().map(move |spec| (*target, *spec)))
    }
}

#[cfg(test)]
mod tests {
    use super::OperatorDescriptor;
    use crate::target::{TOSA_1_0_FP, TOSA_1_0_INT, TOSA_0_80_BI};

    const DESCRIPTOR: OperatorDescriptor = OperatorDescriptor {
        name: "Dummy",
        targets: &["aten.dummy.default", "aten.dummy.out"],
        specs: &[TOSA_1_0_INT, TOSA_1_0_FP],
        input_counts: &[1],
    };

    #[test]
    fn enumerates_identity_spec_pairs() {
        let pairs: Vec<_> = DESCRIPTOR.pairs().collect();
        assert_eq!(pairs.len(), 4);
        assert!(pairs.contains(&("aten.dummy.out", TOSA_1_0_FP)));
        assert!(DESCRIPTOR.supports(&TOSA_1_0_INT));
        assert!(!DESCRIPTOR.supports(&TOSA_0_80_BI));
        assert!(DESCRIPTOR.handles("aten.dummy.default"));
    }
}
