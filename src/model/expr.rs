//! Integer expressions over the boolean decision variables.
//!
//! Expressions are stored in an arena ([`Exprs`]) as nodes referring to previously created nodes
//! only. Node ids are therefore a topological order of the expression graph, and a single forward
//! pass evaluates any expression. The first nodes of the arena are the decision variables
//! themselves, so the id of variable `i` is `ExprId(i)`.
//!
//! Evaluation works on intervals: each variable contributes its current domain (`[0, 0]`,
//! `[1, 1]` or `[0, 1]`) and every node computes an enclosing interval of its value. With all
//! variables fixed the intervals collapse to the exact value, which is how complete assignments are
//! evaluated.

use std::num::NonZeroUsize;

use super::vars::VarId;

/// Index of an expression node in its arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExprId(usize);

impl ExprId {
    /// Node of a decision variable. Variables occupy the first nodes of every arena, so this needs
    /// no access to the arena itself.
    pub fn of_var(var: VarId) -> ExprId {
        ExprId(var.index())
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Closed integer interval `[lo, hi]`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interval {
    pub lo: i64,
    pub hi: i64,
}

impl Interval {
    pub const BOOL: Interval = Interval { lo: 0, hi: 1 };

    pub fn point(value: i64) -> Interval {
        Interval {
            lo: value,
            hi: value,
        }
    }

    pub fn is_point(&self) -> bool {
        self.lo == self.hi
    }

    fn scaled(self, k: i64) -> Interval {
        if k >= 0 {
            Interval {
                lo: self.lo * k,
                hi: self.hi * k,
            }
        } else {
            Interval {
                lo: self.hi * k,
                hi: self.lo * k,
            }
        }
    }

    fn abs(self) -> Interval {
        if self.lo >= 0 {
            self
        } else if self.hi <= 0 {
            Interval {
                lo: -self.hi,
                hi: -self.lo,
            }
        } else {
            Interval {
                lo: 0,
                hi: self.hi.max(-self.lo),
            }
        }
    }

    fn square(self) -> Interval {
        let a = self.abs();
        Interval {
            lo: a.lo * a.lo,
            hi: a.hi * a.hi,
        }
    }

    fn checked_scaled(self, k: i64) -> Option<Interval> {
        let (a, b) = (self.lo.checked_mul(k)?, self.hi.checked_mul(k)?);
        Some(Interval {
            lo: a.min(b),
            hi: a.max(b),
        })
    }

    fn checked_abs(self) -> Option<Interval> {
        self.lo.checked_neg()?;
        self.hi.checked_neg()?;
        Some(self.abs())
    }

    fn checked_square(self) -> Option<Interval> {
        let a = self.checked_abs()?;
        Some(Interval {
            lo: a.lo.checked_mul(a.lo)?,
            hi: a.hi.checked_mul(a.hi)?,
        })
    }

    fn checked_product(self, other: Interval) -> Option<Interval> {
        for a in [self.lo, self.hi] {
            for b in [other.lo, other.hi] {
                a.checked_mul(b)?;
            }
        }
        Some(self.product(other))
    }

    fn product(self, other: Interval) -> Interval {
        let corners = [
            self.lo * other.lo,
            self.lo * other.hi,
            self.hi * other.lo,
            self.hi * other.hi,
        ];
        Interval {
            lo: corners.iter().copied().min().unwrap_or(0),
            hi: corners.iter().copied().max().unwrap_or(0),
        }
    }
}

/// One node of the expression graph
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Var(VarId),
    Const(i64),
    /// `sum(k * e) + constant`
    Linear {
        terms: Vec<(i64, ExprId)>,
        constant: i64,
    },
    Abs(ExprId),
    Square(ExprId),
    /// Floor division by a positive constant
    FloorDiv(ExprId, i64),
    Product(ExprId, ExprId),
    /// 1 if the expression differs from the constant, 0 otherwise
    IsDifferent(ExprId, i64),
}

/// Arena of expression nodes
#[derive(Clone, Debug)]
pub struct Exprs {
    nodes: Vec<Node>,
    num_vars: usize,
}

impl Exprs {
    /// Create an arena whose first `num_vars` nodes are the decision variables.
    pub fn with_vars(num_vars: usize) -> Exprs {
        Exprs {
            nodes: (0..num_vars).map(|i| Node::Var(VarId::new(i))).collect(),
            num_vars,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    pub fn node(&self, id: ExprId) -> &Node {
        &self.nodes[id.0]
    }

    /// Expression consisting of the variable `var` alone
    pub fn var(&self, var: VarId) -> ExprId {
        assert!(var.index() < self.num_vars, "unknown variable {:?}", var);
        ExprId::of_var(var)
    }

    fn push(&mut self, node: Node) -> ExprId {
        self.nodes.push(node);
        ExprId(self.nodes.len() - 1)
    }

    pub fn constant(&mut self, value: i64) -> ExprId {
        self.push(Node::Const(value))
    }

    pub fn linear(&mut self, terms: Vec<(i64, ExprId)>, constant: i64) -> ExprId {
        self.push(Node::Linear { terms, constant })
    }

    pub fn sum<I: IntoIterator<Item = ExprId>>(&mut self, items: I) -> ExprId {
        let terms = items.into_iter().map(|e| (1, e)).collect();
        self.linear(terms, 0)
    }

    pub fn scale(&mut self, expr: ExprId, k: i64) -> ExprId {
        self.linear(vec![(k, expr)], 0)
    }

    pub fn offset(&mut self, expr: ExprId, constant: i64) -> ExprId {
        self.linear(vec![(1, expr)], constant)
    }

    pub fn abs(&mut self, expr: ExprId) -> ExprId {
        self.push(Node::Abs(expr))
    }

    pub fn square(&mut self, expr: ExprId) -> ExprId {
        self.push(Node::Square(expr))
    }

    pub fn floor_div(&mut self, expr: ExprId, divisor: NonZeroUsize) -> ExprId {
        self.push(Node::FloorDiv(expr, divisor.get() as i64))
    }

    pub fn product(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.push(Node::Product(a, b))
    }

    pub fn is_different(&mut self, expr: ExprId, value: i64) -> ExprId {
        self.push(Node::IsDifferent(expr, value))
    }

    /// Compute enclosing intervals of all nodes up to and including `upto` into `out`, given the
    /// interval of each variable.
    pub fn bounds_into<F>(&self, var_bounds: F, upto: ExprId, out: &mut Vec<Interval>)
    where
        F: Fn(VarId) -> Interval,
    {
        out.clear();
        for node in self.nodes[..=upto.0].iter() {
            let interval = match node {
                Node::Var(var) => var_bounds(*var),
                Node::Const(value) => Interval::point(*value),
                Node::Linear { terms, constant } => {
                    let mut result = Interval::point(*constant);
                    for (k, e) in terms.iter() {
                        let term = out[e.0].scaled(*k);
                        result.lo += term.lo;
                        result.hi += term.hi;
                    }
                    result
                }
                Node::Abs(e) => out[e.0].abs(),
                Node::Square(e) => out[e.0].square(),
                Node::FloorDiv(e, d) => Interval {
                    lo: out[e.0].lo.div_euclid(*d),
                    hi: out[e.0].hi.div_euclid(*d),
                },
                Node::Product(a, b) => out[a.0].product(out[b.0]),
                Node::IsDifferent(e, value) => {
                    let i = out[e.0];
                    if i.is_point() && i.lo == *value {
                        Interval::point(0)
                    } else if *value < i.lo || *value > i.hi {
                        Interval::point(1)
                    } else {
                        Interval::BOOL
                    }
                }
            };
            out.push(interval);
        }
    }

    /// Check that no node up to and including `upto` can leave the `i64` range, whatever the
    /// values of the variables.
    ///
    /// Every domain of a variable is a sub-interval of `[0, 1]`, and all node operations are
    /// monotone under interval inclusion. So if the evaluation with all variables free does not
    /// overflow, neither does any evaluation by [`Exprs::bounds_into`] or [`Exprs::value`].
    pub fn is_overflow_free(&self, upto: ExprId) -> bool {
        let mut out: Vec<Interval> = Vec::with_capacity(upto.0 + 1);
        for node in self.nodes[..=upto.0].iter() {
            let interval = match node {
                Node::Var(_) => Some(Interval::BOOL),
                Node::Const(value) => Some(Interval::point(*value)),
                Node::Linear { terms, constant } => {
                    terms
                        .iter()
                        .try_fold(Interval::point(*constant), |result, (k, e)| {
                            let term = out[e.0].checked_scaled(*k)?;
                            Some(Interval {
                                lo: result.lo.checked_add(term.lo)?,
                                hi: result.hi.checked_add(term.hi)?,
                            })
                        })
                }
                Node::Abs(e) => out[e.0].checked_abs(),
                Node::Square(e) => out[e.0].checked_square(),
                Node::FloorDiv(e, d) => Some(Interval {
                    lo: out[e.0].lo.div_euclid(*d),
                    hi: out[e.0].hi.div_euclid(*d),
                }),
                Node::Product(a, b) => out[a.0].checked_product(out[b.0]),
                Node::IsDifferent(_, _) => Some(Interval::BOOL),
            };
            match interval {
                Some(interval) => out.push(interval),
                None => return false,
            }
        }
        true
    }

    /// Interval of a single expression
    pub fn bounds<F>(&self, var_bounds: F, expr: ExprId) -> Interval
    where
        F: Fn(VarId) -> Interval,
    {
        let mut out = Vec::with_capacity(expr.0 + 1);
        self.bounds_into(var_bounds, expr, &mut out);
        out[expr.0]
    }

    /// Exact value of `expr` for a complete assignment of the variables
    pub fn value(&self, values: &[bool], expr: ExprId) -> i64 {
        self.bounds(|var| Interval::point(values[var.index()] as i64), expr)
            .lo
    }
}
