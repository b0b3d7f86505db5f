/// Owned AST types for Lunette guest source.
///
/// All types are `Clone + Debug`. String literals are raw bytes, since guest
/// strings need not be UTF-8.
/// Source location for error reporting.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

/// A parsed chunk: the body of the implicit vararg main function.
#[derive(Clone, Debug)]
pub struct Chunk {
    pub block: Block,
}

#[derive(Clone, Debug)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum Stmt {
    Local {
        names: Vec<String>,
        values: Vec<Expr>,
        span: Span,
    },
    LocalFunction {
        name: String,
        func: Box<FuncBody>,
        span: Span,
    },
    /// `function a.b.c:m() ... end`
    Function {
        name: FuncName,
        func: Box<FuncBody>,
        span: Span,
    },
    Assign {
        targets: Vec<Expr>,
        values: Vec<Expr>,
        span: Span,
    },
    /// A call evaluated for its side effects.
    Call(Expr),
    Do(Block),
    While {
        cond: Expr,
        body: Block,
        span: Span,
    },
    Repeat {
        body: Block,
        cond: Expr,
        span: Span,
    },
    If {
        branches: Vec<(Expr, Block)>,
        else_block: Option<Block>,
        span: Span,
    },
    NumericFor {
        var: String,
        start: Expr,
        limit: Expr,
        step: Option<Expr>,
        body: Block,
        span: Span,
    },
    GenericFor {
        names: Vec<String>,
        exprs: Vec<Expr>,
        body: Block,
        span: Span,
    },
    Return {
        values: Vec<Expr>,
        span: Span,
    },
    Break {
        span: Span,
    },
}

#[derive(Clone, Debug)]
pub struct FuncName {
    pub path: Vec<String>,
    pub method: Option<String>,
}

impl FuncName {
    /// Dotted display form, used as the prototype's debug name.
    pub fn display(&self) -> String {
        let mut s = self.path.join(".");
        if let Some(m) = &self.method {
            s.push(':');
            s.push_str(m);
        }
        s
    }
}

#[derive(Clone, Debug)]
pub struct FuncBody {
    pub params: Vec<String>,
    pub is_vararg: bool,
    pub body: Block,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum TableField {
    /// `{ v }`
    Positional(Expr),
    /// `{ k = v }` and `{ [k] = v }`
    Keyed { key: Expr, value: Expr },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Len,
}

#[derive(Clone, Debug)]
pub enum Expr {
    Nil { span: Span },
    True { span: Span },
    False { span: Span },
    Int { value: i64, span: Span },
    Number { value: f64, span: Span },
    Str { value: Vec<u8>, span: Span },
    VarArg { span: Span },
    Name { name: String, span: Span },
    Index { object: Box<Expr>, key: Box<Expr>, span: Span },
    Call { callee: Box<Expr>, args: Vec<Expr>, span: Span },
    Method { object: Box<Expr>, name: String, args: Vec<Expr>, span: Span },
    Function(Box<FuncBody>),
    Table { fields: Vec<TableField>, span: Span },
    BinOp { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr>, span: Span },
    UnaryOp { op: UnaryOp, operand: Box<Expr>, span: Span },
    /// Parenthesized expression; truncates multiple results to one.
    Paren { inner: Box<Expr>, span: Span },
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Nil { span }
            | Expr::True { span }
            | Expr::False { span }
            | Expr::Int { span, .. }
            | Expr::Number { span, .. }
            | Expr::Str { span, .. }
            | Expr::VarArg { span }
            | Expr::Name { span, .. }
            | Expr::Index { span, .. }
            | Expr::Call { span, .. }
            | Expr::Method { span, .. }
            | Expr::Table { span, .. }
            | Expr::BinOp { span, .. }
            | Expr::UnaryOp { span, .. }
            | Expr::Paren { span, .. } => span,
            Expr::Function(f) => &f.span,
        }
    }

    /// Calls and `...` can produce any number of values.
    pub fn is_multi(&self) -> bool {
        matches!(self, Expr::Call { .. } | Expr::Method { .. } | Expr::VarArg { .. })
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Expr::Call { .. } | Expr::Method { .. })
    }
}
