//! Parsed rule text.
//!
//! `Ast` is structural (`Hash + Eq`) so it can key the per-region subrule
//! table, and prints back to canonical rule text for error messages.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    FloorDiv,
    Mod,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ast {
    Name(String),
    Str(String),
    Int(i64),
    Decimal(String),
    Bool(bool),
    Tuple(Vec<Ast>),
    Call { func: String, args: Vec<Ast> },
    Subscript { value: String, key: Box<Ast> },
    BoolOp { op: BoolOp, values: Vec<Ast> },
    Not(Box<Ast>),
    Compare { left: Box<Ast>, rest: Vec<(CmpOp, Ast)> },
    BinOp { op: BinOp, left: Box<Ast>, right: Box<Ast> },
    Neg(Box<Ast>),
}

impl Ast {
    fn is_compound(&self) -> bool {
        matches!(self, Ast::BoolOp { .. } | Ast::Not(_) | Ast::Compare { .. } | Ast::BinOp { .. } | Ast::Neg(_))
    }
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
        }
    }
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
        }
    }
}

struct Operand<'a>(&'a Ast);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_compound() { write!(f, "({})", self.0) } else { write!(f, "{}", self.0) }
    }
}

fn comma_list(f: &mut fmt::Formatter<'_>, items: &[Ast]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ast::Name(name) => f.write_str(name),
            Ast::Str(s) => write!(f, "'{s}'"),
            Ast::Int(n) => write!(f, "{n}"),
            Ast::Decimal(d) => f.write_str(d),
            Ast::Bool(true) => f.write_str("True"),
            Ast::Bool(false) => f.write_str("False"),
            Ast::Tuple(items) => {
                f.write_str("(")?;
                comma_list(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Ast::Call { func, args } => {
                write!(f, "{func}(")?;
                comma_list(f, args)?;
                f.write_str(")")
            }
            Ast::Subscript { value, key } => write!(f, "{value}[{key}]"),
            Ast::BoolOp { op, values } => {
                let sep = match op {
                    BoolOp::And => " and ",
                    BoolOp::Or => " or ",
                };
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    write!(f, "{}", Operand(value))?;
                }
                Ok(())
            }
            Ast::Not(inner) => write!(f, "not {}", Operand(inner)),
            Ast::Compare { left, rest } => {
                write!(f, "{}", Operand(left))?;
                for (op, right) in rest {
                    write!(f, " {} {}", op.symbol(), Operand(right))?;
                }
                Ok(())
            }
            Ast::BinOp { op, left, right } => write!(f, "{} {} {}", Operand(left), op.symbol(), Operand(right)),
            Ast::Neg(inner) => write!(f, "-{}", Operand(inner)),
        }
    }
}
