pub mod builder;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod graph;
pub mod loader;
pub mod quant;
pub mod registry;
pub mod target;
pub mod validation;
pub mod visitors;

pub use builder::{Attributes, IrBuilder, IrOperator, Opcode, ProgramBuilder};
pub use descriptor::OperatorDescriptor;
pub use dispatch::{LoweringEngine, LoweringOptions, PadOverflow};
pub use error::LoweringError;
pub use graph::{Argument, DataType, GraphNode, LoweringInput, NodeMeta, TensorArgument};
pub use loader::load_lowering_input;
pub use quant::{QuantParamStore, QuantTable, QuantizationParameters};
pub use registry::VisitorRegistry;
pub use target::{Dialect, Profile, TargetSpecification};
pub use visitors::{LoweringContext, NodeVisitor};
