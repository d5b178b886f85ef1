//! XPath Parser
//!
//! Recursive descent parser for XPath 1.0 expressions. Binary operators
//! use precedence climbing. Static result types are checked while the tree
//! is built, so operators that need node-sets fail at compile time.

use std::rc::Rc;

use super::functions::Function;
use super::lexer::{Lexer, Token};
use super::nodeset::NodeSetOrder;
use super::value::XPathType;
use super::variables::{XPathVariable, XPathVariableSet};

/// Nesting limit for expressions, predicates and steps
///
/// A parenthesized level costs five parser frames, so 128 levels stay well
/// inside a 2 MiB thread stack in unoptimized builds.
pub const MAX_DEPTH: usize = 128;

/// XPath expression AST node
#[derive(Debug, Clone)]
pub enum Expr {
    /// Root of the context node's tree (/)
    Root,
    /// Location step applied to `input`, or to the context node
    Path {
        input: Option<Box<Expr>>,
        step: Step,
    },
    /// Primary expression with predicates
    Filter {
        expr: Box<Expr>,
        predicates: Vec<Expr>,
    },
    /// Function call
    Function { func: Function, args: Vec<Expr> },
    /// Binary operation
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary negation
    Negate(Box<Expr>),
    /// Literal number
    Number(f64),
    /// Literal string
    String(String),
    /// Folded boolean constant
    Boolean(bool),
    /// Variable bound at compile time
    Variable(Rc<XPathVariable>),
}

impl Expr {
    /// Static result type
    pub fn return_type(&self) -> XPathType {
        match self {
            Expr::Root | Expr::Path { .. } | Expr::Filter { .. } => XPathType::NodeSet,
            Expr::Function { func, .. } => func.return_type(),
            Expr::Binary { op, .. } => op.return_type(),
            Expr::Negate(_) | Expr::Number(_) => XPathType::Number,
            Expr::String(_) => XPathType::String,
            Expr::Boolean(_) => XPathType::Boolean,
            Expr::Variable(var) => var.value_type(),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Union,
}

impl BinaryOp {
    /// Operator for the current token, if it can be one
    fn from_token(token: &Token) -> Option<Self> {
        let op = match token {
            Token::Name(name) => match name.as_str() {
                "or" => BinaryOp::Or,
                "and" => BinaryOp::And,
                "div" => BinaryOp::Div,
                "mod" => BinaryOp::Mod,
                _ => return None,
            },
            Token::Eq => BinaryOp::Eq,
            Token::NotEq => BinaryOp::NotEq,
            Token::Lt => BinaryOp::Lt,
            Token::LtEq => BinaryOp::LtEq,
            Token::Gt => BinaryOp::Gt,
            Token::GtEq => BinaryOp::GtEq,
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Sub,
            Token::Star => BinaryOp::Mul,
            Token::Pipe => BinaryOp::Union,
            _ => return None,
        };
        Some(op)
    }

    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::NotEq => 3,
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 6,
            BinaryOp::Union => 7,
        }
    }

    pub fn return_type(self) -> XPathType {
        match self {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                XPathType::Number
            }
            BinaryOp::Union => XPathType::NodeSet,
            _ => XPathType::Boolean,
        }
    }
}

/// Location step in a path
#[derive(Debug, Clone)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expr>,
}

/// XPath axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Self_,
    Attribute,
    Namespace,
}

impl Axis {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "child" => Some(Axis::Child),
            "descendant" => Some(Axis::Descendant),
            "descendant-or-self" => Some(Axis::DescendantOrSelf),
            "parent" => Some(Axis::Parent),
            "ancestor" => Some(Axis::Ancestor),
            "ancestor-or-self" => Some(Axis::AncestorOrSelf),
            "following-sibling" => Some(Axis::FollowingSibling),
            "preceding-sibling" => Some(Axis::PrecedingSibling),
            "following" => Some(Axis::Following),
            "preceding" => Some(Axis::Preceding),
            "self" => Some(Axis::Self_),
            "attribute" => Some(Axis::Attribute),
            "namespace" => Some(Axis::Namespace),
            _ => None,
        }
    }

    /// Order in which the axis produces nodes
    pub fn order(self) -> NodeSetOrder {
        match self {
            Axis::Ancestor | Axis::AncestorOrSelf | Axis::Preceding | Axis::PrecedingSibling => {
                NodeSetOrder::SortedReverse
            }
            _ => NodeSetOrder::Sorted,
        }
    }
}

/// Node test in a location step
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// Matches any element or attribute (*)
    Any,
    /// Matches elements or attributes with this qualified name
    Name(String),
    /// Matches names starting with `prefix:` (prefix:*)
    NamespaceWildcard(String),
    /// node() - matches any node
    Node,
    /// text() - matches text nodes
    Text,
    /// comment() - matches comments
    Comment,
    /// processing-instruction() - matches PIs, optionally by target
    ProcessingInstruction(Option<String>),
}

fn node_type_test(name: &str) -> Option<NodeTest> {
    match name {
        "node" => Some(NodeTest::Node),
        "text" => Some(NodeTest::Text),
        "comment" => Some(NodeTest::Comment),
        "processing-instruction" => Some(NodeTest::ProcessingInstruction(None)),
        _ => None,
    }
}

/// Compile failure with the offset of the offending token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub offset: usize,
}

/// XPath parser
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    variables: Option<&'a XPathVariableSet>,
    depth: usize,
}

type ParseResult<T> = Result<T, String>;

impl<'a> Parser<'a> {
    /// Create a new parser
    pub fn new(input: &'a str, variables: Option<&'a XPathVariableSet>) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Parser {
            lexer,
            current,
            variables,
            depth: 0,
        }
    }

    /// Parse a complete XPath expression
    pub fn parse(mut self) -> Result<Expr, SyntaxError> {
        let result = self.parse_expression(0).and_then(|expr| {
            if self.current == Token::Eof {
                Ok(expr)
            } else {
                Err("Incorrect query".to_string())
            }
        });
        result.map_err(|message| SyntaxError {
            message,
            offset: self.lexer.token_start(),
        })
    }

    /// Advance to next token
    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    fn descend(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err("Exceeded maximum allowed query depth".to_string());
        }
        Ok(())
    }

    fn expect(&mut self, token: Token, message: &str) -> ParseResult<()> {
        if self.current != token {
            return Err(message.to_string());
        }
        self.advance();
        Ok(())
    }

    /// Expr, binding operators above `limit`
    fn parse_expression(&mut self, limit: u8) -> ParseResult<Expr> {
        let saved = self.depth;
        self.descend()?;
        let lhs = self.parse_path_or_unary()?;
        let expr = self.parse_binary(lhs, limit)?;
        self.depth = saved;
        Ok(expr)
    }

    fn parse_binary(&mut self, mut lhs: Expr, limit: u8) -> ParseResult<Expr> {
        while let Some(op) = BinaryOp::from_token(&self.current) {
            if op.precedence() <= limit {
                break;
            }
            self.advance();
            self.descend()?;

            let mut rhs = self.parse_path_or_unary()?;
            while let Some(next) = BinaryOp::from_token(&self.current) {
                if next.precedence() <= op.precedence() {
                    break;
                }
                rhs = self.parse_binary(rhs, op.precedence())?;
            }

            if op == BinaryOp::Union
                && (lhs.return_type() != XPathType::NodeSet
                    || rhs.return_type() != XPathType::NodeSet)
            {
                return Err("Union operator has to be applied to node sets".to_string());
            }
            lhs = Expr::Binary {
                op,
                left: Box::new(lhs),
                right: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    /// UnaryExpr or PathExpr
    fn parse_path_or_unary(&mut self) -> ParseResult<Expr> {
        match &self.current {
            Token::Minus => {
                self.advance();
                self.descend()?;
                // Binds tighter than every binary operator but union
                let operand = self.parse_expression(7)?;
                Ok(Expr::Negate(Box::new(operand)))
            }
            Token::Name(name) => {
                let is_call = self.lexer.next_is_open_paren() && node_type_test(name).is_none();
                if is_call {
                    self.parse_filter_path()
                } else {
                    self.parse_location_path()
                }
            }
            Token::Variable(_) | Token::LeftParen | Token::String(_) | Token::Number(_) => {
                self.parse_filter_path()
            }
            _ => self.parse_location_path(),
        }
    }

    /// FilterExpr, optionally continued by a relative location path
    fn parse_filter_path(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_filter()?;
        match self.current {
            Token::Slash => {
                self.advance();
                self.parse_relative_path(Some(expr))
            }
            Token::DoubleSlash => {
                self.advance();
                if expr.return_type() != XPathType::NodeSet {
                    return Err("Step has to be applied to node set".to_string());
                }
                expr = descendant_or_self(Some(expr));
                self.parse_relative_path(Some(expr))
            }
            _ => Ok(expr),
        }
    }

    fn parse_filter(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_primary()?;
        if self.current != Token::LeftBracket {
            return Ok(expr);
        }
        if expr.return_type() != XPathType::NodeSet {
            return Err("Predicate has to be applied to node set".to_string());
        }
        let predicates = self.parse_predicates()?;
        Ok(Expr::Filter {
            expr: Box::new(expr),
            predicates,
        })
    }

    fn parse_predicates(&mut self) -> ParseResult<Vec<Expr>> {
        let saved = self.depth;
        let mut predicates = Vec::new();
        while self.current == Token::LeftBracket {
            self.advance();
            self.descend()?;
            predicates.push(self.parse_expression(0)?);
            self.expect(Token::RightBracket, "Expected ']' to match an opening '['")?;
        }
        self.depth = saved;
        Ok(predicates)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match std::mem::replace(&mut self.current, Token::Eof) {
            Token::Variable(name) => {
                let Some(vars) = self.variables else {
                    return Err("Unknown variable: variable set is not provided".to_string());
                };
                let Some(var) = vars.get(&name) else {
                    return Err(
                        "Unknown variable: variable set does not contain the given name".to_string(),
                    );
                };
                self.advance();
                Ok(Expr::Variable(var))
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_expression(0)?;
                self.expect(Token::RightParen, "Expected ')' to match an opening '('")?;
                Ok(expr)
            }
            Token::String(s) => {
                self.advance();
                Ok(Expr::String(s))
            }
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Token::Name(name) => {
                self.advance();
                self.parse_function_call(&name)
            }
            other => {
                self.current = other;
                Err("Unrecognizable primary expression".to_string())
            }
        }
    }

    fn parse_function_call(&mut self, name: &str) -> ParseResult<Expr> {
        self.expect(Token::LeftParen, "Unrecognized function call")?;

        let saved = self.depth;
        let mut args = Vec::new();
        while self.current != Token::RightParen {
            if !args.is_empty() {
                self.expect(Token::Comma, "No comma between function arguments")?;
            }
            self.descend()?;
            args.push(self.parse_expression(0)?);
        }
        self.advance();
        self.depth = saved;

        let Some(func) = Function::resolve(name, args.len()) else {
            return Err("Unrecognized function or wrong parameter count".to_string());
        };
        if func.takes_node_set(args.len())
            && args.iter().any(|a| a.return_type() != XPathType::NodeSet)
        {
            return Err("Function has to be applied to node set".to_string());
        }
        Ok(Expr::Function { func, args })
    }

    /// LocationPath: absolute (`/`, `//`) or relative
    fn parse_location_path(&mut self) -> ParseResult<Expr> {
        match self.current {
            Token::Slash => {
                self.advance();
                // A bare `/` selects the root
                if matches!(
                    self.current,
                    Token::Name(_) | Token::At | Token::Dot | Token::DoubleDot | Token::Star
                ) {
                    self.parse_relative_path(Some(Expr::Root))
                } else {
                    Ok(Expr::Root)
                }
            }
            Token::DoubleSlash => {
                self.advance();
                let root = descendant_or_self(Some(Expr::Root));
                self.parse_relative_path(Some(root))
            }
            _ => self.parse_relative_path(None),
        }
    }

    fn parse_relative_path(&mut self, input: Option<Expr>) -> ParseResult<Expr> {
        let mut expr = self.parse_step(input)?;
        let saved = self.depth;
        loop {
            let double = match self.current {
                Token::Slash => false,
                Token::DoubleSlash => true,
                _ => break,
            };
            self.advance();
            if double {
                expr = descendant_or_self(Some(expr));
                self.depth += 1;
            }
            self.descend()?;
            expr = self.parse_step(Some(expr))?;
        }
        self.depth = saved;
        Ok(expr)
    }

    fn parse_step(&mut self, input: Option<Expr>) -> ParseResult<Expr> {
        if input
            .as_ref()
            .is_some_and(|e| e.return_type() != XPathType::NodeSet)
        {
            return Err("Step has to be applied to node set".to_string());
        }

        let mut axis = Axis::Child;
        let mut axis_specified = false;
        match self.current {
            Token::At => {
                axis = Axis::Attribute;
                axis_specified = true;
                self.advance();
            }
            Token::Dot | Token::DoubleDot => {
                let axis = if self.current == Token::Dot {
                    Axis::Self_
                } else {
                    Axis::Parent
                };
                self.advance();
                if self.current == Token::LeftBracket {
                    return Err("Predicates are not allowed after an abbreviated step".to_string());
                }
                return Ok(path(input, axis, NodeTest::Node, Vec::new()));
            }
            _ => {}
        }

        let node_test = match std::mem::replace(&mut self.current, Token::Eof) {
            Token::Name(mut name) => {
                self.advance();
                let mut test = None;

                if self.current == Token::DoubleColon {
                    if axis_specified {
                        return Err("Two axis specifiers in one step".to_string());
                    }
                    axis = Axis::from_name(&name).ok_or_else(|| "Unknown axis".to_string())?;
                    self.advance();
                    match std::mem::replace(&mut self.current, Token::Eof) {
                        Token::Star => {
                            self.advance();
                            test = Some(NodeTest::Any);
                        }
                        Token::Name(n) => {
                            self.advance();
                            name = n;
                        }
                        other => {
                            self.current = other;
                            return Err("Unrecognized node test".to_string());
                        }
                    }
                }

                match test {
                    Some(test) => test,
                    None => self.parse_name_test(name)?,
                }
            }
            Token::Star => {
                self.advance();
                NodeTest::Any
            }
            other => {
                self.current = other;
                return Err("Unrecognized node test".to_string());
            }
        };

        let predicates = self.parse_predicates()?;
        Ok(path(input, axis, node_test, predicates))
    }

    /// Node type test, processing-instruction('target'), or a name test
    fn parse_name_test(&mut self, name: String) -> ParseResult<NodeTest> {
        if self.current != Token::LeftParen {
            return Ok(match name.strip_suffix('*') {
                Some(prefix) if prefix.len() > 1 && prefix.ends_with(':') => {
                    NodeTest::NamespaceWildcard(prefix.to_string())
                }
                _ => NodeTest::Name(name),
            });
        }

        self.advance();
        match std::mem::replace(&mut self.current, Token::Eof) {
            Token::RightParen => {
                self.advance();
                node_type_test(&name).ok_or_else(|| "Unrecognized node type".to_string())
            }
            Token::String(target) if name == "processing-instruction" => {
                self.advance();
                self.expect(
                    Token::RightParen,
                    "Unmatched brace near processing-instruction()",
                )?;
                Ok(NodeTest::ProcessingInstruction(Some(target)))
            }
            other => {
                let pi = name == "processing-instruction";
                self.current = other;
                if pi {
                    Err("Only literals are allowed as arguments to processing-instruction()"
                        .to_string())
                } else {
                    Err("Unmatched brace near node type test".to_string())
                }
            }
        }
    }
}

fn path(input: Option<Expr>, axis: Axis, node_test: NodeTest, predicates: Vec<Expr>) -> Expr {
    Expr::Path {
        input: input.map(Box::new),
        step: Step {
            axis,
            node_test,
            predicates,
        },
    }
}

/// The step `//` abbreviates
fn descendant_or_self(input: Option<Expr>) -> Expr {
    path(input, Axis::DescendantOrSelf, NodeTest::Node, Vec::new())
}
