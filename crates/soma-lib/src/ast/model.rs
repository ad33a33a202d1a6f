//! Model-level nodes: compilation unit, neurons and their top-level blocks.

use super::expr::{Expression, Variable};
use super::stmt::{Block, DataType, Declaration};
use super::{Meta, impl_ast_node};

/// Everything lowered from one source artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    pub artifact_name: String,
    pub neurons: Vec<Neuron>,
    pub meta: Meta,
}

/// A neuron definition. Body elements keep their source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Neuron {
    pub name: String,
    pub artifact_name: String,
    pub body: Vec<BodyElement>,
    pub meta: Meta,
}

impl Neuron {
    pub fn variable_blocks(&self) -> impl Iterator<Item = &BlockWithVariables> {
        self.body.iter().filter_map(|element| match element {
            BodyElement::Variables(block) => Some(block),
            _ => None,
        })
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.body.iter().filter_map(|element| match element {
            BodyElement::Function(function) => Some(function),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BodyElement {
    Variables(BlockWithVariables),
    Update(UpdateBlock),
    Equations(EquationsBlock),
    Input(InputBlock),
    Output(OutputBlock),
    Function(Function),
}

/// `state`, `parameters`, `internals` or `initial_values`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarBlockKind {
    State,
    Parameters,
    Internals,
    InitialValues,
}

impl std::fmt::Display for VarBlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::State => "state",
            Self::Parameters => "parameters",
            Self::Internals => "internals",
            Self::InitialValues => "initial_values",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockWithVariables {
    pub kind: VarBlockKind,
    pub declarations: Vec<Declaration>,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateBlock {
    pub block: Block,
    pub meta: Meta,
}

/// `equations:` block. Elements keep their source order regardless of kind.
#[derive(Debug, Clone, PartialEq)]
pub struct EquationsBlock {
    pub equations: Vec<EquationsElement>,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EquationsElement {
    Equation(OdeEquation),
    Shape(OdeShape),
    Function(OdeFunction),
}

/// `V_m' = -V_m / tau_m + I_syn / C_m`
#[derive(Debug, Clone, PartialEq)]
pub struct OdeEquation {
    pub lhs: Variable,
    pub rhs: Expression,
    pub meta: Meta,
}

/// `shape G = exp(-t / tau_syn)`
#[derive(Debug, Clone, PartialEq)]
pub struct OdeShape {
    pub variable: Variable,
    pub expression: Expression,
    pub meta: Meta,
}

/// `function I_total pA = I_syn + I_ext` inside `equations`.
#[derive(Debug, Clone, PartialEq)]
pub struct OdeFunction {
    pub is_recordable: bool,
    pub variable_name: String,
    pub data_type: DataType,
    pub expression: Expression,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputBlock {
    pub lines: Vec<InputLine>,
    pub meta: Meta,
}

/// One input port: `spikes [n] pA <- excitatory spike`.
#[derive(Debug, Clone, PartialEq)]
pub struct InputLine {
    pub name: String,
    pub size_parameter: Option<String>,
    pub data_type: Option<DataType>,
    pub qualifiers: Vec<InputQualifier>,
    pub signal_type: SignalType,
    pub meta: Meta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputQualifier {
    Inhibitory,
    Excitatory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalType {
    Spike,
    Current,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputBlock {
    pub signal_type: SignalType,
    pub meta: Meta,
}

/// A user-defined function with an optional return type.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<DataType>,
    pub block: Block,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub data_type: DataType,
    pub meta: Meta,
}

impl_ast_node!(
    CompilationUnit,
    Neuron,
    BlockWithVariables,
    UpdateBlock,
    EquationsBlock,
    OdeEquation,
    OdeShape,
    OdeFunction,
    InputBlock,
    InputLine,
    OutputBlock,
    Function,
    Parameter,
);
