//! Rule DSL compiler.
//!
//! Rule text goes through four stages before the search ever sees it:
//!
//! ```text
//! text ── tokenize ──> tokens ── parse_rule ──> Ast      (lexer.rs, parser.rs)
//!                                               │
//!                      helpers.rs ──────────────┤  macro templates, substituted as Ast
//!                                               v
//!                                     RuleCompiler::lower  (compiler.rs)
//!                                       - name resolution
//!                                       - constant folding
//!                                       - subrule extraction -> RuleLedger
//!                                               │
//!                                               v
//!                                             Expr           (expr.rs)
//!                                               │
//!                                               v
//!                                     RuleCache -> AccessRule (access.rs)
//! ```
//!
//! ## Responsibilities by module
//!
//! - `lexer.rs` / `parser.rs`: the expression grammar (a subset of Python
//!   expressions with `#` comments).
//! - `helpers.rs`: parsed helper macros and their substitution.
//! - `compiler.rs`: resolution order, builtins, time-of-day intrinsics and
//!   `at()` / `here()` subrules.
//! - `expr.rs`: the folded IR and its smart constructors.
//! - `access.rs`: closure compilation, the rule cache and the `Reach` seam the
//!   search plugs into.
//! - `error.rs`: `CompileError`.

#[path = "rules/access.rs"]
mod access;
#[path = "rules/ast.rs"]
mod ast;
#[path = "rules/compiler.rs"]
mod compiler;
#[path = "rules/error.rs"]
mod error;
#[path = "rules/expr.rs"]
mod expr;
#[path = "rules/helpers.rs"]
mod helpers;
#[path = "rules/lexer.rs"]
mod lexer;
#[path = "rules/parser.rs"]
mod parser;

#[cfg(test)]
#[path = "rules/tests.rs"]
mod tests;

pub use access::{AccessRule, EvalCtx, NoReach, Reach, RuleCache};
pub use ast::{Ast, BinOp, BoolOp, CmpOp};
pub use compiler::{Anchor, RuleCompiler, RuleLedger};
pub use error::CompileError;
pub use expr::{Builtin, Expr, Operand};
pub use helpers::{Helper, HelperRegistry};
pub use parser::parse_rule;
