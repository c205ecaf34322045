//! Surface AST for RiriLang.
//!
//! The tree is owned top-down with no back references. Nodes carry only
//! what the emitter needs; there are no type annotations or scope links.

/// Root of a parsed file, and after import resolution of the whole program.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub is_async: bool,
}

/// A class field: a variable declaration with an optional initializer.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<FunctionDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseClause {
    pub test: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VariableDeclaration {
        name: String,
        value: Option<Expr>,
    },
    FunctionDeclaration(FunctionDecl),
    ClassDeclaration(ClassDecl),
    Import {
        path: String,
    },
    Return(Option<Expr>),
    If {
        condition: Expr,
        then_branch: Vec<Stmt>,
        /// `else if` is stored as a single nested `If`.
        else_branch: Option<Vec<Stmt>>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        update: Option<Expr>,
        body: Vec<Stmt>,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<CaseClause>,
        default: Option<Vec<Stmt>>,
    },
    Break,
    Continue,
    Try {
        body: Vec<Stmt>,
        catch: Option<CatchClause>,
        finally_body: Option<Vec<Stmt>>,
    },
    Expression(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEq => "<=",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Binding strength in the emitted C++; higher binds tighter. The parser
    /// folds equality and relational operators at one level, so the emitter
    /// relies on these levels to keep that grouping.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::NotEq => 3,
            BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessEq | BinaryOp::GreaterEq => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    /// `object.name`
    Named(String),
    /// `object[index]`
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Block(Vec<Stmt>),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Assignment {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Only prefix minus exists in the surface language.
    Unary {
        operand: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: Property,
    },
    New {
        class_name: String,
        args: Vec<Expr>,
    },
    Array(Vec<Expr>),
    Identifier(String),
    Number(f64),
    StringLiteral(String),
    This,
    Await(Box<Expr>),
    ArrowFunction {
        params: Vec<String>,
        body: ArrowBody,
    },
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Expr {
        Expr::Identifier(name.into())
    }

    pub fn is_identifier(&self, name: &str) -> bool {
        matches!(self, Expr::Identifier(n) if n == name)
    }

    /// Property name of a dotted member access.
    pub fn member_name(&self) -> Option<&str> {
        match self {
            Expr::Member {
                property: Property::Named(name),
                ..
            } => Some(name),
            _ => None,
        }
    }
}
