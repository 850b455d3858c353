use crate::builder::IrBuilder;
use crate::error::LoweringError;
use crate::graph::GraphNode;
use crate::quant::QuantParamStore;
use crate::registry::VisitorRegistry;
use crate::target::TargetSpecification;
use crate::visitors::LoweringContext;

/// What to do when ceil-mode pooling would need a trailing pad of at least
/// the kernel extent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PadOverflow {
    #[default]
    Clamp,
    Reject,
}

#[derive(Debug, Clone, Default)]
pub struct LoweringOptions {
    pub pad_overflow: PadOverflow,
}

/// Routes graph nodes to their registered visitors.
///
/// Lowering is fail-fast: the first node that cannot be lowered aborts the
/// pass and its error is returned as is. Instructions already handed to the
/// builder are not rolled back.
pub struct LoweringEngine<'r> {
    registry: &'r VisitorRegistry,
    options: LoweringOptions,
}

impl<'r> LoweringEngine<'r> {
    pub fn new(registry: &'r VisitorRegistry, options: LoweringOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &LoweringOptions {
        &self.options
    }

    pub fn lower(
        &self,
        node: &GraphNode,
        builder: &mut dyn IrBuilder,
        qparams: &dyn QuantParamStore,
        spec: TargetSpecification,
    ) -> Result<(), LoweringError> {
        let visitor = self.registry.lookup(&node.target, &spec)?;
        debug_assert!(visitor.descriptor().supports(&spec));
        tracing::debug!(
            node = %node.name,
            op = %node.target,
            visitor = visitor.descriptor().name,
            %spec,
            "lowering node"
        );

        let mut ctx = LoweringContext {
            builder,
            qparams,
            spec,
            options: &self.options,
        };
        visitor.define_node(node, &mut ctx, &node.args, &node.output)
    }

    /// Lowers `nodes` in the given (topological) order and returns how many
    /// were lowered.
    pub fn lower_graph<'n>(
        &self,
        nodes: impl IntoIterator<Item = &'n GraphNode>,
        builder: &mut dyn IrBuilder,
        qparams: &dyn QuantParamStore,
        spec: TargetSpecification,
    ) -> Result<usize, LoweringError> {
        let mut lowered = 0;
        for node in nodes {
            self.lower(node, builder, qparams, spec)?;
            lowered += 1;
        }
        tracing::debug!(lowered, %spec, "graph lowered");
        Ok(lowered)
    }
}
