//! XPath Evaluation Engine
//!
//! Walks the expression tree against a document. Node-sets are built in
//! axis order and tagged; sorting happens only where the result order is
//! observable (filters and explicit sorts).

use super::axes::step_fill;
use super::functions;
use super::nodeset::{NodeSetOrder, XPathNode, XPathNodeSet};
use super::parser::{Axis, BinaryOp, Expr, Step};
use super::value::{parse_number, string_value, XPathValue};
use crate::dom::{Document, NodeId};

/// Evaluation context: node, proximity position, and size
#[derive(Debug, Clone, Copy)]
pub(crate) struct Context {
    pub node: XPathNode,
    pub position: usize,
    pub size: usize,
}

impl Context {
    pub(crate) fn new(node: XPathNode) -> Self {
        Context {
            node,
            position: 1,
            size: 1,
        }
    }
}

pub(crate) struct Evaluator<'d> {
    doc: &'d Document,
}

impl<'d> Evaluator<'d> {
    pub(crate) fn new(doc: &'d Document) -> Self {
        Evaluator { doc }
    }

    pub(crate) fn doc(&self) -> &'d Document {
        self.doc
    }

    pub(crate) fn eval(&self, expr: &Expr, ctx: &Context) -> XPathValue {
        match expr {
            Expr::Number(n) => XPathValue::Number(*n),
            Expr::String(s) => XPathValue::String(s.clone()),
            Expr::Boolean(b) => XPathValue::Boolean(*b),
            Expr::Variable(var) => var.value(),
            Expr::Root => {
                let mut set = XPathNodeSet::with_order(NodeSetOrder::Sorted);
                if let Some(root) = self.root_of(ctx.node) {
                    set.push(XPathNode::Node(root));
                }
                XPathValue::NodeSet(set)
            }
            Expr::Path { input, step } => {
                XPathValue::NodeSet(self.eval_path(input.as_deref(), step, ctx))
            }
            Expr::Filter { expr, predicates } => {
                let mut set = self.eval_node_set(expr, ctx);
                if set.order() != NodeSetOrder::Sorted {
                    set.sort(self.doc, false);
                }
                for pred in predicates {
                    self.apply_predicate(&mut set, 0, pred);
                }
                XPathValue::NodeSet(set)
            }
            Expr::Function { func, args } => functions::call(self, *func, args, ctx),
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right, ctx),
            Expr::Negate(operand) => XPathValue::Number(-self.eval_number(operand, ctx)),
        }
    }

    pub(crate) fn eval_boolean(&self, expr: &Expr, ctx: &Context) -> bool {
        self.eval(expr, ctx).to_boolean()
    }

    pub(crate) fn eval_number(&self, expr: &Expr, ctx: &Context) -> f64 {
        self.eval(expr, ctx).to_number(self.doc)
    }

    pub(crate) fn eval_string(&self, expr: &Expr, ctx: &Context) -> String {
        self.eval(expr, ctx).to_string_value(self.doc)
    }

    /// Node-set result; compile-time checks guarantee the type
    pub(crate) fn eval_node_set(&self, expr: &Expr, ctx: &Context) -> XPathNodeSet {
        self.eval(expr, ctx).into_node_set()
    }

    /// Topmost ancestor of the context node
    fn root_of(&self, node: XPathNode) -> Option<NodeId> {
        let mut current = match node {
            XPathNode::Null => return None,
            XPathNode::Node(id) => id,
            XPathNode::Attribute { parent, .. } => parent,
        };
        if !self.doc.contains(current) {
            return None;
        }
        while let Some(parent) = self.doc.parent(current) {
            current = parent;
        }
        Some(current)
    }

    fn eval_path(&self, input: Option<&Expr>, step: &Step, ctx: &Context) -> XPathNodeSet {
        let mut out = XPathNodeSet::with_order(step.axis.order());

        match input {
            Some(input) => {
                let sources = self.eval_node_set(input, ctx);
                if step.axis == Axis::Self_ {
                    out.set_order(sources.order());
                }
                for source in &sources {
                    let start = out.len();
                    // Results from a second source interleave with the first
                    if step.axis != Axis::Self_ && start != 0 {
                        out.set_order(NodeSetOrder::Unsorted);
                    }
                    step_fill(self.doc, &mut out, *source, step.axis, &step.node_test);
                    for pred in &step.predicates {
                        self.apply_predicate(&mut out, start, pred);
                    }
                }
            }
            None => {
                step_fill(self.doc, &mut out, ctx.node, step.axis, &step.node_test);
                for pred in &step.predicates {
                    self.apply_predicate(&mut out, 0, pred);
                }
            }
        }

        // Overlapping axes can reach the same node from two sources
        let disjoint = matches!(step.axis, Axis::Child | Axis::Attribute | Axis::Self_);
        if !disjoint && out.order() == NodeSetOrder::Unsorted {
            out.dedup_unsorted();
        }
        out
    }

    /// Filter `set[start..]` by `pred`, with positions counted in set order
    ///
    /// A number result selects the node at that position; anything else is
    /// converted to boolean.
    fn apply_predicate(&self, set: &mut XPathNodeSet, start: usize, pred: &Expr) {
        let candidates = set.split_off(start);
        let size = candidates.len();
        for (i, node) in candidates.into_iter().enumerate() {
            let ctx = Context {
                node,
                position: i + 1,
                size,
            };
            let keep = match self.eval(pred, &ctx) {
                XPathValue::Number(n) => n == (i + 1) as f64,
                other => other.to_boolean(),
            };
            if keep {
                set.push(node);
            }
        }
    }

    fn eval_binary(&self, op: BinaryOp, left: &Expr, right: &Expr, ctx: &Context) -> XPathValue {
        let value = match op {
            BinaryOp::Or => self.eval_boolean(left, ctx) || self.eval_boolean(right, ctx),
            BinaryOp::And => self.eval_boolean(left, ctx) && self.eval_boolean(right, ctx),
            BinaryOp::Eq | BinaryOp::NotEq => {
                let l = self.eval(left, ctx);
                let r = self.eval(right, ctx);
                self.compare_eq(l, r, op == BinaryOp::Eq)
            }
            BinaryOp::Lt => self.compare_rel(left, right, ctx, |a, b| a < b),
            BinaryOp::LtEq => self.compare_rel(left, right, ctx, |a, b| a <= b),
            BinaryOp::Gt => self.compare_rel(left, right, ctx, |a, b| a > b),
            BinaryOp::GtEq => self.compare_rel(left, right, ctx, |a, b| a >= b),
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let l = self.eval_number(left, ctx);
                let r = self.eval_number(right, ctx);
                let n = match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                    _ => l % r,
                };
                return XPathValue::Number(n);
            }
            BinaryOp::Union => {
                let mut set = self.eval_node_set(left, ctx);
                set.append(self.eval_node_set(right, ctx));
                set.dedup_unsorted();
                set.set_order(NodeSetOrder::Unsorted);
                return XPathValue::NodeSet(set);
            }
        };
        XPathValue::Boolean(value)
    }

    fn node_number(&self, node: XPathNode) -> f64 {
        parse_number(&string_value(self.doc, node))
    }

    /// `=` and `!=` with the XPath 1.0 conversion rules
    fn compare_eq(&self, left: XPathValue, right: XPathValue, equal: bool) -> bool {
        let doc = self.doc;
        match (left, right) {
            (XPathValue::NodeSet(a), XPathValue::NodeSet(b)) => {
                let others: Vec<String> = b.iter().map(|n| string_value(doc, *n)).collect();
                a.iter().any(|n| {
                    let s = string_value(doc, *n);
                    others.iter().any(|o| (s == *o) == equal)
                })
            }
            (XPathValue::NodeSet(set), other) | (other, XPathValue::NodeSet(set)) => match other {
                XPathValue::Boolean(b) => (!set.is_empty() == b) == equal,
                XPathValue::Number(x) => set.iter().any(|n| (self.node_number(*n) == x) == equal),
                other => {
                    let s = other.to_string_value(doc);
                    set.iter().any(|n| (string_value(doc, *n) == s) == equal)
                }
            },
            (l, r) => {
                if matches!(l, XPathValue::Boolean(_)) || matches!(r, XPathValue::Boolean(_)) {
                    (l.to_boolean() == r.to_boolean()) == equal
                } else if matches!(l, XPathValue::Number(_)) || matches!(r, XPathValue::Number(_)) {
                    (l.to_number(doc) == r.to_number(doc)) == equal
                } else {
                    (l.to_string_value(doc) == r.to_string_value(doc)) == equal
                }
            }
        }
    }

    /// Relational operators compare numbers, node by node for node-sets
    fn compare_rel(&self, left: &Expr, right: &Expr, ctx: &Context, cmp: fn(f64, f64) -> bool) -> bool {
        let l = self.eval(left, ctx);
        let r = self.eval(right, ctx);
        match (l, r) {
            (XPathValue::NodeSet(a), XPathValue::NodeSet(b)) => {
                let others: Vec<f64> = b.iter().map(|n| self.node_number(*n)).collect();
                a.iter().any(|n| {
                    let x = self.node_number(*n);
                    others.iter().any(|&y| cmp(x, y))
                })
            }
            (XPathValue::NodeSet(a), r) => {
                let y = r.to_number(self.doc);
                a.iter().any(|n| cmp(self.node_number(*n), y))
            }
            (l, XPathValue::NodeSet(b)) => {
                let x = l.to_number(self.doc);
                b.iter().any(|n| cmp(x, self.node_number(*n)))
            }
            (l, r) => cmp(l.to_number(self.doc), r.to_number(self.doc)),
        }
    }
}
