use std::fmt;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Comparison
    /// Equal (`eq`)
    Equal,
    /// Not equal (`ne`)
    NotEqual,
    /// Less than (`lt`)
    LessThan,
    /// Greater than (`gt`)
    GreaterThan,
    /// Less than or equal (`le`)
    LessEqual,
    /// Greater than or equal (`ge`)
    GreaterEqual,

    // Arithmetic
    /// Addition (`add`)
    Add,
    /// Subtraction (`sub`)
    Subtract,
    /// Multiplication (`mul`)
    Multiply,
    /// Division (`div`)
    Divide,
    /// Modulo (`mod`)
    Modulo,

    // Logical
    /// Logical AND (`and`)
    And,
    /// Logical OR (`or`)
    Or,
}

impl BinOp {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let op = match keyword {
            "eq" => BinOp::Equal,
            "ne" => BinOp::NotEqual,
            "lt" => BinOp::LessThan,
            "gt" => BinOp::GreaterThan,
            "le" => BinOp::LessEqual,
            "ge" => BinOp::GreaterEqual,
            "add" => BinOp::Add,
            "sub" => BinOp::Subtract,
            "mul" => BinOp::Multiply,
            "div" => BinOp::Divide,
            "mod" => BinOp::Modulo,
            "and" => BinOp::And,
            "or" => BinOp::Or,
            _ => return None,
        };
        Some(op)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            BinOp::Equal => "eq",
            BinOp::NotEqual => "ne",
            BinOp::LessThan => "lt",
            BinOp::GreaterThan => "gt",
            BinOp::LessEqual => "le",
            BinOp::GreaterEqual => "ge",
            BinOp::Add => "add",
            BinOp::Subtract => "sub",
            BinOp::Multiply => "mul",
            BinOp::Divide => "div",
            BinOp::Modulo => "mod",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Equal
                | BinOp::NotEqual
                | BinOp::LessThan
                | BinOp::GreaterThan
                | BinOp::LessEqual
                | BinOp::GreaterEqual
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical negation (`not`)
    Not,
    /// Arithmetic negation (`-`)
    Negate,
    /// Identity (`+`)
    Plus,
}

impl UnaryOp {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "not" => Some(UnaryOp::Not),
            "minus" => Some(UnaryOp::Negate),
            "plus" => Some(UnaryOp::Plus),
            _ => None,
        }
    }
}
