/// AST (Abstract Syntax Tree) module
/// Contains all definitions related to the AST structure
///
/// Submodules:
/// - ast: The program root
/// - expressions: Expression nodes and operator tags
/// - statements: Statement nodes
/// - types: The type model shared by the analyzer and the generator
pub mod ast;
pub mod expressions;
pub mod statements;
pub mod types;
