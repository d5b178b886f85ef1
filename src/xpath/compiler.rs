//! XPath Query Compiler
//!
//! Turns expression text into a checked, constant-folded expression tree
//! and evaluates it against documents. A query that fails to compile keeps
//! its error and offset; evaluating it yields the empty value of each type.

use std::fmt;

use super::eval::{Context, Evaluator};
use super::nodeset::{XPathNode, XPathNodeSet};
use super::parser::{BinaryOp, Expr, Parser, Step};
use super::value::{XPathType, XPathValue};
use super::variables::XPathVariableSet;
use crate::dom::Document;
use crate::error::{Error, Result};

/// Outcome of compiling a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPathParseResult {
    /// Error message, `None` on success
    pub error: Option<String>,
    /// Byte offset of the offending token
    pub offset: usize,
}

impl Default for XPathParseResult {
    fn default() -> Self {
        XPathParseResult {
            error: Some("Internal error".to_string()),
            offset: 0,
        }
    }
}

impl XPathParseResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn description(&self) -> &str {
        self.error.as_deref().unwrap_or("No error")
    }
}

impl fmt::Display for XPathParseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A compiled XPath expression
#[derive(Debug)]
pub struct XPathQuery {
    source: String,
    expr: Option<Expr>,
    result: XPathParseResult,
}

impl XPathQuery {
    /// Compile `expression`; failures are recorded in `result()`
    ///
    /// Variables are resolved against `variables` now. Values assigned to
    /// them later are seen by every evaluation.
    pub fn new(expression: &str, variables: Option<&XPathVariableSet>) -> Self {
        match Parser::new(expression, variables).parse() {
            Ok(expr) => {
                trace!(expression, "compiled XPath query");
                XPathQuery {
                    source: expression.to_string(),
                    expr: Some(fold(expr)),
                    result: XPathParseResult {
                        error: None,
                        offset: 0,
                    },
                }
            }
            Err(err) => {
                debug!(expression, offset = err.offset, error = %err.message, "XPath compile failed");
                XPathQuery {
                    source: expression.to_string(),
                    expr: None,
                    result: XPathParseResult {
                        error: Some(err.message),
                        offset: err.offset,
                    },
                }
            }
        }
    }

    /// Compile `expression`, turning a failure into `Error::XPathSyntax`
    pub fn compile(expression: &str, variables: Option<&XPathVariableSet>) -> Result<Self> {
        let query = XPathQuery::new(expression, variables);
        query.syntax_error()?;
        Ok(query)
    }

    fn syntax_error(&self) -> Result<()> {
        match &self.result.error {
            Some(message) => Err(Error::XPathSyntax {
                message: message.clone(),
                offset: self.result.offset,
            }),
            None => Ok(()),
        }
    }

    pub fn result(&self) -> &XPathParseResult {
        &self.result
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Expression text as given
    pub fn expression(&self) -> &str {
        &self.source
    }

    /// Static result type; `None` for a failed compile
    pub fn return_type(&self) -> XPathType {
        self.expr
            .as_ref()
            .map_or(XPathType::None, |expr| expr.return_type())
    }

    fn evaluate(&self, doc: &Document, context: XPathNode) -> Option<XPathValue> {
        let expr = self.expr.as_ref()?;
        Some(Evaluator::new(doc).eval(expr, &Context::new(context)))
    }

    pub fn evaluate_boolean(&self, doc: &Document, context: impl Into<XPathNode>) -> bool {
        self.evaluate(doc, context.into())
            .is_some_and(|v| v.to_boolean())
    }

    /// Number result; NaN for a failed compile
    pub fn evaluate_number(&self, doc: &Document, context: impl Into<XPathNode>) -> f64 {
        self.evaluate(doc, context.into())
            .map_or(f64::NAN, |v| v.to_number(doc))
    }

    pub fn evaluate_string(&self, doc: &Document, context: impl Into<XPathNode>) -> String {
        self.evaluate(doc, context.into())
            .map(|v| v.to_string_value(doc))
            .unwrap_or_default()
    }

    /// Node-set result, with the order tag evaluation produced
    pub fn evaluate_node_set(
        &self,
        doc: &Document,
        context: impl Into<XPathNode>,
    ) -> Result<XPathNodeSet> {
        self.syntax_error()?;
        if self.return_type() != XPathType::NodeSet {
            return Err(Error::XPathError(
                "Expression does not evaluate to node set".to_string(),
            ));
        }
        Ok(self
            .evaluate(doc, context.into())
            .map(XPathValue::into_node_set)
            .unwrap_or_default())
    }

    /// First node of the result in document order
    pub fn evaluate_node(&self, doc: &Document, context: impl Into<XPathNode>) -> Result<XPathNode> {
        Ok(self.evaluate_node_set(doc, context)?.first(doc))
    }
}

fn is_constant(expr: &Expr) -> bool {
    matches!(expr, Expr::Number(_) | Expr::String(_) | Expr::Boolean(_))
}

fn constant(value: XPathValue) -> Option<Expr> {
    match value {
        XPathValue::Number(n) => Some(Expr::Number(n)),
        XPathValue::String(s) => Some(Expr::String(s)),
        XPathValue::Boolean(b) => Some(Expr::Boolean(b)),
        XPathValue::NodeSet(_) => None,
    }
}

/// Evaluate context-free subexpressions once, at compile time
fn fold(expr: Expr) -> Expr {
    match expr {
        Expr::Path { input, step } => Expr::Path {
            input: input.map(|e| Box::new(fold(*e))),
            step: Step {
                predicates: step.predicates.into_iter().map(fold).collect(),
                ..step
            },
        },
        Expr::Filter { expr, predicates } => Expr::Filter {
            expr: Box::new(fold(*expr)),
            predicates: predicates.into_iter().map(fold).collect(),
        },
        Expr::Negate(operand) => match fold(*operand) {
            Expr::Number(n) => Expr::Number(-n),
            other => Expr::Negate(Box::new(other)),
        },
        Expr::Binary { op, left, right } => {
            let left = fold(*left);
            let right = fold(*right);
            let foldable = op != BinaryOp::Union && is_constant(&left) && is_constant(&right);
            let folded = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
            if foldable {
                evaluate_constant(&folded).unwrap_or(folded)
            } else {
                folded
            }
        }
        Expr::Function { func, args } => {
            let args: Vec<Expr> = args.into_iter().map(fold).collect();
            let foldable = func.is_foldable(args.len()) && args.iter().all(is_constant);
            let call = Expr::Function { func, args };
            if foldable {
                evaluate_constant(&call).unwrap_or(call)
            } else {
                call
            }
        }
        other => other,
    }
}

fn evaluate_constant(expr: &Expr) -> Option<Expr> {
    let scratch = Document::new();
    let value = Evaluator::new(&scratch).eval(expr, &Context::new(XPathNode::Null));
    constant(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::ParseOptions;

    #[test]
    fn test_parse_result() {
        let result = XPathParseResult::default();
        assert!(!result.is_ok());
        assert_eq!(result.description(), "Internal error");

        let query = XPathQuery::new("1 + 1", None);
        assert!(query.is_ok());
        assert_eq!(query.result().description(), "No error");
        assert_eq!(query.result().offset, 0);

        let query = XPathQuery::new("123a", None);
        assert_eq!(query.result().error.as_deref(), Some("Incorrect query"));
        assert_eq!(query.result().offset, 3);
        assert_eq!(query.return_type(), XPathType::None);
    }

    #[test]
    fn test_compile_error() {
        match XPathQuery::compile("//[", None) {
            Err(Error::XPathSyntax { offset, .. }) => assert_eq!(offset, 2),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_folding() {
        let query = XPathQuery::new("1 + 2 * 3", None);
        assert!(matches!(query.expr, Some(Expr::Number(n)) if n == 7.0));
        let query = XPathQuery::new("concat('a', 'b') = 'ab'", None);
        assert!(matches!(query.expr, Some(Expr::Boolean(true))));
        let query = XPathQuery::new("-(2)", None);
        assert!(matches!(query.expr, Some(Expr::Number(n)) if n == -2.0));
        // Context-dependent calls stay
        let query = XPathQuery::new("string-length()", None);
        assert!(matches!(query.expr, Some(Expr::Function { .. })));
        let query = XPathQuery::new("a[1 + 1]", None);
        let Some(Expr::Path { step, .. }) = &query.expr else {
            panic!("expected path");
        };
        assert!(matches!(step.predicates[0], Expr::Number(n) if n == 2.0));
    }

    #[test]
    fn test_failed_query_evaluates_empty() {
        let doc = Document::new();
        let query = XPathQuery::new("(", None);
        assert!(!query.evaluate_boolean(&doc, doc.root()));
        assert!(query.evaluate_number(&doc, doc.root()).is_nan());
        assert_eq!(query.evaluate_string(&doc, doc.root()), "");
        assert!(matches!(
            query.evaluate_node_set(&doc, doc.root()),
            Err(Error::XPathSyntax { .. })
        ));
    }

    #[test]
    fn test_typed_evaluation() {
        let mut doc = Document::new();
        doc.load_string("<node attr='3'><child/></node>", ParseOptions::DEFAULT);
        let root = doc.root();

        let query = XPathQuery::new("node/@attr", None);
        assert_eq!(query.return_type(), XPathType::NodeSet);
        assert!(query.evaluate_boolean(&doc, root));
        assert_eq!(query.evaluate_number(&doc, root), 3.0);
        assert_eq!(query.evaluate_string(&doc, root), "3");
        let set = query.evaluate_node_set(&doc, root).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(doc.attr_name(set[0].attribute().unwrap()), "attr");

        let query = XPathQuery::new("1", None);
        match query.evaluate_node_set(&doc, root) {
            Err(Error::XPathError(message)) => {
                assert_eq!(message, "Expression does not evaluate to node set")
            }
            other => panic!("expected evaluation error, got {:?}", other),
        }

        let node = XPathQuery::new("node/child", None)
            .evaluate_node(&doc, root)
            .unwrap();
        assert_eq!(doc.name(node.node().unwrap()), "child");
    }
}
