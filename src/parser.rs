//! Recursive-descent parser: builds the AST and populates the struct
//! registry as it goes (struct definitions must precede their use as a
//! type, which the textual order of the source after preprocessing
//! guarantees).

use crate::ast::*;
use crate::diagnostics::{Diagnostic, HResult};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::struct_registry::StructRegistry;

pub struct Parser {
    lexer: Lexer,
    current: Token,
    pub structs: StructRegistry,
}

impl Parser {
    pub fn new(source: &str, file: impl Into<std::rc::Rc<str>>) -> HResult<Self> {
        let mut lexer = Lexer::new(source, file);
        let current = lexer.advance()?;
        Ok(Parser { lexer, current, structs: StructRegistry::new() })
    }

    fn loc(&self) -> SourceLoc {
        SourceLoc::new(self.current.file.clone(), self.current.line, self.current.col, self.current.offset)
    }

    fn error(&self, message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(self.loc(), message)
    }

    fn bump(&mut self) -> HResult<Token> {
        let tok = std::mem::replace(&mut self.current, self.lexer.advance()?);
        Ok(tok)
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> HResult<Token> {
        if std::mem::discriminant(&self.current.kind) != std::mem::discriminant(kind) {
            return Err(self.error(format!("expected {what}")));
        }
        self.bump()
    }

    fn at(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn ident(&mut self) -> HResult<String> {
        match self.current.kind.clone() {
            TokenKind::Ident(name) => {
                self.bump()?;
                Ok(name)
            }
            _ => Err(self.error("expected identifier")),
        }
    }

    pub fn parse_program(&mut self) -> HResult<Program> {
        let mut program = Program::default();
        loop {
            match &self.current.kind {
                TokenKind::Eof => break,
                TokenKind::Struct => {
                    let def = self.parse_struct()?;
                    self.structs.insert(def);
                }
                TokenKind::Fn => {
                    let func = self.parse_function()?;
                    program.functions.push(func);
                }
                _ => {
                    self.bump()?;
                }
            }
        }
        program.structs = std::mem::take(&mut self.structs).into_defs();
        Ok(program)
    }

    fn parse_type(&mut self) -> HResult<TypeName> {
        match self.current.kind.clone() {
            TokenKind::IntType => {
                self.bump()?;
                Ok(TypeName::Int)
            }
            TokenKind::CharType => {
                self.bump()?;
                Ok(TypeName::Char)
            }
            TokenKind::PtrType => {
                self.bump()?;
                Ok(TypeName::Ptr)
            }
            TokenKind::Ident(name) => {
                if !self.structs.contains(&name) {
                    return Err(self.error(format!("undeclared struct name '{name}' used as a type")));
                }
                self.bump()?;
                Ok(TypeName::Struct(name))
            }
            _ => Err(self.error("expected a type")),
        }
    }

    fn parse_struct(&mut self) -> HResult<StructDef> {
        self.bump()?; // struct
        let name = self.ident()?;
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut members = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            let mname = self.ident()?;
            self.expect(&TokenKind::Colon, "':'")?;
            let ty = self.parse_type()?;
            members.push(StructMember { name: mname, ty });
            if self.at(&TokenKind::Comma) {
                self.bump()?;
            } else {
                break;
            }
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        if self.at(&TokenKind::Semi) {
            self.bump()?;
        }
        Ok(StructDef { name, members })
    }

    fn parse_function(&mut self) -> HResult<Function> {
        let loc = self.loc();
        self.bump()?; // fn
        let name = self.ident()?;
        self.expect(&TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        while !self.at(&TokenKind::RParen) {
            let pname = self.ident()?;
            self.expect(&TokenKind::Colon, "':'")?;
            let ty = self.parse_type()?;
            params.push(Param { name: pname, ty });
            if self.at(&TokenKind::Comma) {
                self.bump()?;
            } else {
                break;
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        let ret = if self.at(&TokenKind::Arrow) {
            self.bump()?;
            self.parse_type()?
        } else {
            TypeName::Int
        };
        let body = self.parse_block()?;
        Ok(Function { name, params, ret, body, loc })
    }

    fn parse_block(&mut self) -> HResult<Vec<Stmt>> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.at(&TokenKind::RBrace) && !self.at(&TokenKind::Eof) {
            stmts.push(self.parse_statement()?);
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(stmts)
    }

    fn is_type_start(&self) -> bool {
        match &self.current.kind {
            TokenKind::IntType | TokenKind::CharType | TokenKind::PtrType => true,
            TokenKind::Ident(name) => self.structs.contains(name),
            _ => false,
        }
    }

    fn parse_statement(&mut self) -> HResult<Stmt> {
        let loc = self.loc();
        match &self.current.kind {
            TokenKind::LBrace => {
                let stmts = self.parse_block()?;
                Ok(Stmt::new(StmtKind::Block(stmts), loc))
            }
            TokenKind::Return => {
                self.bump()?;
                let value = if self.at(&TokenKind::Semi) { None } else { Some(self.parse_expr()?) };
                self.expect(&TokenKind::Semi, "';'")?;
                Ok(Stmt::new(StmtKind::Return(value), loc))
            }
            TokenKind::If => {
                self.bump()?;
                self.expect(&TokenKind::LParen, "'('")?;
                let cond = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "')'")?;
                let then_branch = Box::new(self.parse_statement()?);
                let else_branch = if self.at(&TokenKind::Else) {
                    self.bump()?;
                    Some(Box::new(self.parse_statement()?))
                } else {
                    None
                };
                Ok(Stmt::new(StmtKind::If { cond, then_branch, else_branch }, loc))
            }
            TokenKind::While => {
                self.bump()?;
                self.expect(&TokenKind::LParen, "'('")?;
                let cond = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "')'")?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::new(StmtKind::While { cond, body }, loc))
            }
            TokenKind::For => self.parse_for(loc),
            _ if self.is_type_start() => self.parse_var_decl(loc),
            _ => {
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::Semi, "';'")?;
                Ok(Stmt::new(StmtKind::Expr(expr), loc))
            }
        }
    }

    fn parse_for(&mut self, loc: SourceLoc) -> HResult<Stmt> {
        self.bump()?; // for

        // Range form: `for <ident> in <start>..<end> body`. Disambiguate by
        // lookahead: an identifier immediately followed by `in`.
        if let TokenKind::Ident(name) = self.current.kind.clone() {
            let next = self.lexer.peek()?;
            if next.kind == TokenKind::In {
                self.bump()?; // ident
                self.bump()?; // in
                let start = self.parse_expr()?;
                self.expect(&TokenKind::DotDot, "'..'")?;
                let end = self.parse_expr()?;
                let body = Box::new(self.parse_statement()?);

                let init_loc = loc.clone();
                let init = Stmt::new(
                    StmtKind::VarDecl { name: name.clone(), ty: TypeName::Int, init: Some(start) },
                    init_loc.clone(),
                );
                let cond = Expr::new(
                    ExprKind::Binary(
                        BinOp::Lt,
                        Box::new(Expr::new(ExprKind::Var(name.clone()), init_loc.clone())),
                        Box::new(end),
                    ),
                    init_loc.clone(),
                );
                let step = Expr::new(
                    ExprKind::PostInc(Box::new(Expr::new(ExprKind::Var(name), init_loc.clone()))),
                    init_loc,
                );
                return Ok(Stmt::new(
                    StmtKind::For { init: Some(Box::new(init)), cond: Some(cond), step: Some(step), body },
                    loc,
                ));
            }
        }

        // C-style: `for (init-stmt cond-expr; incr-expr) body`.
        self.expect(&TokenKind::LParen, "'('")?;
        let init = if self.at(&TokenKind::Semi) {
            self.bump()?;
            None
        } else {
            Some(Box::new(self.parse_statement()?))
        };
        let cond = if self.at(&TokenKind::Semi) { None } else { Some(self.parse_expr()?) };
        self.expect(&TokenKind::Semi, "';'")?;
        let step = if self.at(&TokenKind::RParen) { None } else { Some(self.parse_expr()?) };
        self.expect(&TokenKind::RParen, "')'")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::new(StmtKind::For { init, cond, step, body }, loc))
    }

    fn parse_var_decl(&mut self, loc: SourceLoc) -> HResult<Stmt> {
        let ty = self.parse_type()?;
        let name = self.ident()?;
        if self.at(&TokenKind::LBracket) {
            self.bump()?;
            let len_tok = self.current.kind.clone();
            let len = match len_tok {
                TokenKind::Int(v) => {
                    self.bump()?;
                    v
                }
                _ => return Err(self.error("array size must be an integer literal")),
            };
            self.expect(&TokenKind::RBracket, "']'")?;
            self.expect(&TokenKind::Semi, "';'")?;
            return Ok(Stmt::new(StmtKind::ArrayDecl { name, elem_ty: ty, len }, loc));
        }
        let init = if self.at(&TokenKind::Assign) {
            self.bump()?;
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(&TokenKind::Semi, "';'")?;
        Ok(Stmt::new(StmtKind::VarDecl { name, ty, init }, loc))
    }

    // --- Expressions, lowest to highest precedence ---

    fn parse_expr(&mut self) -> HResult<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> HResult<Expr> {
        let loc = self.loc();
        let lhs = self.parse_logical_or()?;
        if self.at(&TokenKind::Assign) {
            self.bump()?;
            let value = self.parse_assignment()?;
            let target = expr_to_lvalue(lhs).map_err(|_| self.error("invalid l-value in assignment"))?;
            return Ok(Expr::new(ExprKind::Assign(target, Box::new(value)), loc));
        }
        Ok(lhs)
    }

    fn parse_logical_or(&mut self) -> HResult<Expr> {
        let mut lhs = self.parse_logical_and()?;
        while self.at(&TokenKind::PipePipe) {
            let loc = self.loc();
            self.bump()?;
            let rhs = self.parse_logical_and()?;
            lhs = Expr::new(ExprKind::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs)), loc);
        }
        Ok(lhs)
    }

    fn parse_logical_and(&mut self) -> HResult<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.at(&TokenKind::AmpAmp) {
            let loc = self.loc();
            self.bump()?;
            let rhs = self.parse_equality()?;
            lhs = Expr::new(ExprKind::Binary(BinOp::And, Box::new(lhs), Box::new(rhs)), loc);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> HResult<Expr> {
        let mut lhs = self.parse_bitwise()?;
        loop {
            let op = match &self.current.kind {
                TokenKind::Eq => BinOp::Eq,
                TokenKind::NotEq => BinOp::NotEq,
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Gt => BinOp::Gt,
                _ => break,
            };
            let loc = self.loc();
            self.bump()?;
            let rhs = self.parse_bitwise()?;
            lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), loc);
        }
        Ok(lhs)
    }

    fn parse_bitwise(&mut self) -> HResult<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match &self.current.kind {
                TokenKind::Amp => BinOp::BitAnd,
                TokenKind::Pipe => BinOp::BitOr,
                _ => break,
            };
            let loc = self.loc();
            self.bump()?;
            let rhs = self.parse_additive()?;
            lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), loc);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> HResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match &self.current.kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let loc = self.loc();
            self.bump()?;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), loc);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> HResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match &self.current.kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            let loc = self.loc();
            self.bump()?;
            let rhs = self.parse_unary()?;
            lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), loc);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> HResult<Expr> {
        let loc = self.loc();
        match &self.current.kind {
            TokenKind::Amp => {
                self.bump()?;
                let target = self.parse_unary()?;
                Ok(Expr::new(ExprKind::Unary(UnOp::Addr, Box::new(target)), loc))
            }
            TokenKind::Star => {
                self.bump()?;
                let target = self.parse_unary()?;
                Ok(Expr::new(ExprKind::Unary(UnOp::Deref, Box::new(target)), loc))
            }
            TokenKind::Minus => {
                self.bump()?;
                let target = self.parse_unary()?;
                Ok(Expr::new(ExprKind::Unary(UnOp::Neg, Box::new(target)), loc))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> HResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            let loc = self.loc();
            match &self.current.kind {
                TokenKind::LBracket => {
                    self.bump()?;
                    let index = self.parse_expr()?;
                    self.expect(&TokenKind::RBracket, "']'")?;
                    let name = match &expr.kind {
                        ExprKind::Var(n) => n.clone(),
                        _ => return Err(self.error("array access base must be a variable")),
                    };
                    expr = Expr::new(ExprKind::ArrayAccess { name, index: Box::new(index) }, loc);
                }
                TokenKind::Dot => {
                    self.bump()?;
                    let field = self.ident()?;
                    if !matches!(expr.kind, ExprKind::Var(_)) {
                        return Err(self.error("member access base must be a variable"));
                    }
                    expr = Expr::new(ExprKind::Member { base: Box::new(expr), field, arrow: false }, loc);
                }
                TokenKind::Arrow => {
                    self.bump()?;
                    let field = self.ident()?;
                    if !matches!(expr.kind, ExprKind::Var(_)) {
                        return Err(self.error("member access base must be a variable"));
                    }
                    expr = Expr::new(ExprKind::Member { base: Box::new(expr), field, arrow: true }, loc);
                }
                TokenKind::Inc => {
                    self.bump()?;
                    expr = Expr::new(ExprKind::PostInc(Box::new(expr)), loc);
                }
                TokenKind::LParen => {
                    self.bump()?;
                    let name = match &expr.kind {
                        ExprKind::Var(n) => n.clone(),
                        _ => return Err(self.error("call target must be a function name")),
                    };
                    let mut args = Vec::new();
                    while !self.at(&TokenKind::RParen) {
                        args.push(self.parse_expr()?);
                        if self.at(&TokenKind::Comma) {
                            self.bump()?;
                        } else {
                            break;
                        }
                    }
                    self.expect(&TokenKind::RParen, "')'")?;
                    expr = Expr::new(ExprKind::FuncCall { name, args }, loc);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> HResult<Expr> {
        let loc = self.loc();
        match self.current.kind.clone() {
            TokenKind::Int(v) => {
                self.bump()?;
                Ok(Expr::new(ExprKind::Int(v), loc))
            }
            TokenKind::Char(v) => {
                self.bump()?;
                Ok(Expr::new(ExprKind::Int(v), loc))
            }
            TokenKind::Str(s) => {
                self.bump()?;
                Ok(Expr::new(ExprKind::Str(s), loc))
            }
            TokenKind::Ident(name) => {
                self.bump()?;
                Ok(Expr::new(ExprKind::Var(name), loc))
            }
            TokenKind::LParen => {
                self.bump()?;
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Syscall => {
                self.bump()?;
                self.expect(&TokenKind::LParen, "'('")?;
                let mut args = Vec::new();
                while !self.at(&TokenKind::RParen) {
                    args.push(self.parse_expr()?);
                    if self.at(&TokenKind::Comma) {
                        self.bump()?;
                    } else {
                        break;
                    }
                }
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(Expr::new(ExprKind::Syscall(args), loc))
            }
            TokenKind::SizeOf => {
                self.bump()?;
                self.expect(&TokenKind::LParen, "'('")?;
                let ty = self.parse_type()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(Expr::new(ExprKind::Int(self.structs.size_of(&ty)), loc))
            }
            _ => Err(self.error("unexpected token")),
        }
    }
}

fn expr_to_lvalue(expr: Expr) -> Result<LValue, ()> {
    match expr.kind {
        ExprKind::Var(name) => Ok(LValue::Var(name)),
        ExprKind::Unary(UnOp::Deref, target) => Ok(LValue::Deref(target)),
        ExprKind::ArrayAccess { name, index } => Ok(LValue::ArrayAccess { name, index }),
        ExprKind::Member { base, field, arrow } => Ok(LValue::Member { base, field, arrow }),
        _ => Err(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Program {
        let mut p = Parser::new(src, "t.hel").unwrap();
        p.parse_program().unwrap()
    }

    #[test]
    fn parses_minimal_main() {
        let prog = parse("fn main() -> int { return 42; }");
        assert_eq!(prog.functions.len(), 1);
        assert_eq!(prog.functions[0].name, "main");
    }

    #[test]
    fn parses_struct_and_member_access() {
        let prog = parse("struct P { x: int, y: char } fn main() -> int { P p; p.x = 7; return p.x; }");
        assert_eq!(prog.structs.len(), 1);
        assert_eq!(prog.structs[0].members.len(), 2);
    }

    #[test]
    fn for_range_desugars_to_for_node() {
        let prog = parse("fn main() -> int { for i in 0..3 { syscall(1, 1, 2, 1); } return 0; }");
        let body = &prog.functions[0].body;
        assert!(matches!(body[0].kind, StmtKind::For { .. }));
    }

    #[test]
    fn precedence_multiplies_before_adds() {
        let prog = parse("fn main() -> int { return 2+3*4; }");
        let StmtKind::Return(Some(expr)) = &prog.functions[0].body[0].kind else { panic!() };
        match &expr.kind {
            ExprKind::Binary(BinOp::Add, _, rhs) => {
                assert!(matches!(rhs.kind, ExprKind::Binary(BinOp::Mul, _, _)));
            }
            _ => panic!("expected top-level add"),
        }
    }

    #[test]
    fn invalid_lvalue_is_a_parse_error() {
        let mut p = Parser::new("fn main() -> int { 1 = 2; return 0; }", "t.hel").unwrap();
        assert!(p.parse_program().is_err());
    }

    #[test]
    fn member_access_on_a_non_variable_base_is_a_parse_error() {
        let mut p = Parser::new("fn main() -> int { return (f()).x; }", "t.hel").unwrap();
        assert!(p.parse_program().is_err());
    }
}
