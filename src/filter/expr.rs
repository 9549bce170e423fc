//! Filter expression tree
//!
//! A filter is an immutable tree: leaves bind a field name and comparison
//! operator to a literal captured at construction time, interior nodes
//! combine two subtrees with AND or OR, and the distinguished `Empty`
//! expression matches every record. `Empty` is the identity element for
//! both combinators, so it is the safe default wherever a filter argument
//! is optional.
//!
//! Expressions compose with `&` and `|`:
//!
//! ```
//! use reclite::filter::field;
//! use serde_json::json;
//!
//! let expr = field("age").gt(json!(30)) & field("name").contains_ci("a");
//! ```

use std::fmt;
use std::ops::{BitAnd, BitOr};

use serde_json::Value;

/// Comparison operator bound by a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// field = literal
    Eq,
    /// field != literal
    Ne,
    /// field < literal
    Lt,
    /// field <= literal
    Lte,
    /// field > literal
    Gt,
    /// field >= literal
    Gte,
    /// case-sensitive substring match
    Contains,
    /// case-insensitive substring match
    ContainsCi,
    /// field value is a member of the literal array
    In,
}

impl CompareOp {
    /// Operator symbol used by the display form
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Contains => "CONTAINS",
            CompareOp::ContainsCi => "ICONTAINS",
            CompareOp::In => "IN",
        }
    }
}

/// Filter expression tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Expr {
    /// Matches every record; identity for both combinators
    #[default]
    Empty,
    /// One comparison against a literal
    Leaf {
        /// Bound field name (`__id__`/`__version__` allowed)
        field: String,
        /// Comparison operator
        op: CompareOp,
        /// Literal captured at construction time
        value: Value,
    },
    /// Both sides must match
    And(Box<Expr>, Box<Expr>),
    /// Either side may match
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// A leaf comparison
    pub fn leaf(field: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Expr::Leaf {
            field: field.into(),
            op,
            value,
        }
    }

    /// True for the empty expression
    pub fn is_empty(&self) -> bool {
        matches!(self, Expr::Empty)
    }

    /// AND composition. `Empty` is the identity.
    pub fn and(self, other: Expr) -> Expr {
        match (self, other) {
            (Expr::Empty, other) => other,
            (this, Expr::Empty) => this,
            (this, other) => Expr::And(Box::new(this), Box::new(other)),
        }
    }

    /// OR composition. `Empty` is the identity.
    pub fn or(self, other: Expr) -> Expr {
        match (self, other) {
            (Expr::Empty, other) => other,
            (this, Expr::Empty) => this,
            (this, other) => Expr::Or(Box::new(this), Box::new(other)),
        }
    }
}

impl BitAnd for Expr {
    type Output = Expr;

    fn bitand(self, rhs: Expr) -> Expr {
        self.and(rhs)
    }
}

impl BitOr for Expr {
    type Output = Expr;

    fn bitor(self, rhs: Expr) -> Expr {
        self.or(rhs)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Empty => write!(f, "*"),
            Expr::Leaf { field, op, value } => {
                write!(f, "{} {} {}", field, op.symbol(), value)
            }
            Expr::And(left, right) => write!(f, "(({}) AND ({}))", left, right),
            Expr::Or(left, right) => write!(f, "(({}) OR ({}))", left, right),
        }
    }
}

/// Start of a leaf: binds the field name, the method picks the operator.
pub fn field(name: impl Into<String>) -> FieldExpr {
    FieldExpr { field: name.into() }
}

/// Builder holding the field name of a leaf under construction.
#[derive(Debug, Clone)]
pub struct FieldExpr {
    field: String,
}

impl FieldExpr {
    /// field = value
    pub fn eq(self, value: Value) -> Expr {
        Expr::leaf(self.field, CompareOp::Eq, value)
    }

    /// field != value
    pub fn ne(self, value: Value) -> Expr {
        Expr::leaf(self.field, CompareOp::Ne, value)
    }

    /// field < value
    pub fn lt(self, value: Value) -> Expr {
        Expr::leaf(self.field, CompareOp::Lt, value)
    }

    /// field <= value
    pub fn lte(self, value: Value) -> Expr {
        Expr::leaf(self.field, CompareOp::Lte, value)
    }

    /// field > value
    pub fn gt(self, value: Value) -> Expr {
        Expr::leaf(self.field, CompareOp::Gt, value)
    }

    /// field >= value
    pub fn gte(self, value: Value) -> Expr {
        Expr::leaf(self.field, CompareOp::Gte, value)
    }

    /// case-sensitive substring match
    pub fn contains(self, needle: impl Into<String>) -> Expr {
        Expr::leaf(self.field, CompareOp::Contains, Value::String(needle.into()))
    }

    /// case-insensitive substring match
    pub fn contains_ci(self, needle: impl Into<String>) -> Expr {
        Expr::leaf(self.field, CompareOp::ContainsCi, Value::String(needle.into()))
    }

    /// field value is one of the given values
    pub fn one_of(self, values: Vec<Value>) -> Expr {
        Expr::leaf(self.field, CompareOp::In, Value::Array(values))
    }
}
