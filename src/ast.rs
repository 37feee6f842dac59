//! Abstract syntax tree for Helium programs.
//!
//! Mirrors the shape of the original node set (`NODE_INT`, `NODE_BINOP`,
//! `NODE_FUNCTION`, ...) but as tagged Rust enums instead of one struct with
//! every field present at once. Statement and argument chains are `Vec`s
//! rather than `next`-linked nodes.

use std::rc::Rc;

/// A location in the (preprocessed) source buffer, used for diagnostics.
///
/// `line`/`col` are per-file, retargeted by `#file` markers after
/// `#include` flattening, so they cannot be used to index into the
/// flattened buffer directly. `offset` is the byte position in that
/// flattened buffer and is what diagnostic rendering scans from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLoc {
    pub file: Rc<str>,
    pub line: u32,
    pub col: u32,
    pub offset: usize,
}

impl SourceLoc {
    pub fn new(file: Rc<str>, line: u32, col: u32, offset: usize) -> Self {
        SourceLoc { file, line, col, offset }
    }
}

/// Scalar and compound type names as they appear in declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeName {
    Int,
    Char,
    Ptr,
    /// A previously-registered struct name.
    Struct(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    BitAnd,
    BitOr,
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    Gt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    Addr,
    Deref,
}

/// Assignable locations. Validated at parse time so codegen's match is
/// exhaustive and never needs to re-reject a non-lvalue shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LValue {
    Var(String),
    Deref(Box<Expr>),
    ArrayAccess { name: String, index: Box<Expr> },
    Member { base: Box<Expr>, field: String, arrow: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Int(i64),
    Str(String),
    Var(String),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Assign(LValue, Box<Expr>),
    /// `x++` — does not push a result (see codegen notes).
    PostInc(Box<Expr>),
    ArrayAccess { name: String, index: Box<Expr> },
    Member { base: Box<Expr>, field: String, arrow: bool },
    FuncCall { name: String, args: Vec<Expr> },
    Syscall(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub loc: SourceLoc,
}

impl Expr {
    pub fn new(kind: ExprKind, loc: SourceLoc) -> Self {
        Expr { kind, loc }
    }

    /// True if this expression kind leaves exactly one value on the machine
    /// stack when evaluated as a statement. `Assign` and `PostInc` do not.
    pub fn pushes_value(&self) -> bool {
        !matches!(self.kind, ExprKind::Assign(..) | ExprKind::PostInc(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: TypeName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    VarDecl {
        name: String,
        ty: TypeName,
        init: Option<Expr>,
    },
    ArrayDecl {
        name: String,
        elem_ty: TypeName,
        len: i64,
    },
    Expr(Expr),
    Return(Option<Expr>),
    Block(Vec<Stmt>),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    /// Both `for` surface forms desugar to this during parsing.
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub loc: SourceLoc,
}

impl Stmt {
    pub fn new(kind: StmtKind, loc: SourceLoc) -> Self {
        Stmt { kind, loc }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: TypeName,
    pub body: Vec<Stmt>,
    pub loc: SourceLoc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructMember {
    pub name: String,
    pub ty: TypeName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDef {
    pub name: String,
    pub members: Vec<StructMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    pub structs: Vec<StructDef>,
    pub functions: Vec<Function>,
}

impl Program {
    pub fn find_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLoc {
        SourceLoc::new(Rc::from("t.hel"), 1, 1, 0)
    }

    #[test]
    fn post_inc_and_assign_do_not_push() {
        let e = Expr::new(ExprKind::PostInc(Box::new(Expr::new(ExprKind::Var("x".into()), loc()))), loc());
        assert!(!e.pushes_value());
        let a = Expr::new(
            ExprKind::Assign(LValue::Var("x".into()), Box::new(Expr::new(ExprKind::Int(1), loc()))),
            loc(),
        );
        assert!(!a.pushes_value());
    }

    #[test]
    fn everything_else_pushes() {
        let e = Expr::new(ExprKind::Int(3), loc());
        assert!(e.pushes_value());
        let call = Expr::new(ExprKind::FuncCall { name: "f".into(), args: vec![] }, loc());
        assert!(call.pushes_value());
    }
}
