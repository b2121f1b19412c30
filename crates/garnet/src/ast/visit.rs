//! Read-only traversal over the syntax tree

use super::{BlockArg, Expr, Pattern, StrPart};

/// A read-only visitor.
///
/// Override `visit_expr` to inspect nodes; call [`walk_expr`] from the
/// override to keep descending into children.
pub trait Visitor {
    /// Visit an expression.
    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    /// Visit a `case ... in` pattern.
    fn visit_pattern(&mut self, pattern: &Pattern) {
        walk_pattern(self, pattern);
    }
}

/// Visit every direct child of `expr`.
pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match expr {
        Expr::Nil
        | Expr::True
        | Expr::False
        | Expr::SelfRef
        | Expr::Integer(_)
        | Expr::Float(_)
        | Expr::Str(_)
        | Expr::Symbol(_)
        | Expr::Regex { .. }
        | Expr::Name(_)
        | Expr::Constant(_)
        | Expr::InstanceVar(_)
        | Expr::ClassVar(_)
        | Expr::GlobalVar(_)
        | Expr::Redo => {}

        Expr::Interpolated(parts) => {
            for part in parts {
                if let StrPart::Code(code) = part {
                    visitor.visit_expr(code);
                }
            }
        }
        Expr::Array(items) | Expr::Sequence(items) | Expr::Yield(items) | Expr::Raise(items) => {
            items.iter().for_each(|e| visitor.visit_expr(e));
        }
        Expr::Hash(pairs) => {
            for (k, v) in pairs {
                visitor.visit_expr(k);
                visitor.visit_expr(v);
            }
        }
        Expr::Range { start, end, .. } => {
            visitor.visit_expr(start);
            visitor.visit_expr(end);
        }
        Expr::ScopedConstant { scope, .. } => visitor.visit_expr(scope),

        Expr::AssignLocal { value, .. }
        | Expr::AssignInstanceVar { value, .. }
        | Expr::AssignClassVar { value, .. }
        | Expr::AssignGlobal { value, .. } => visitor.visit_expr(value),
        Expr::AssignConstant { path, value } => {
            if let Some(scope) = &path.scope {
                visitor.visit_expr(scope);
            }
            visitor.visit_expr(value);
        }
        Expr::AssignMember {
            receiver, value, ..
        } => {
            visitor.visit_expr(receiver);
            visitor.visit_expr(value);
        }
        Expr::AssignIndex {
            receiver,
            args,
            value,
        } => {
            visitor.visit_expr(receiver);
            args.iter().for_each(|e| visitor.visit_expr(e));
            visitor.visit_expr(value);
        }

        Expr::Binary { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        Expr::Not(inner)
        | Expr::Negate(inner)
        | Expr::Plus(inner)
        | Expr::Splat(inner)
        | Expr::DoubleSplat(inner)
        | Expr::Defined(inner)
        | Expr::Require(inner) => visitor.visit_expr(inner),

        Expr::Call(call) => {
            if let Some(receiver) = &call.receiver {
                visitor.visit_expr(receiver);
            }
            call.args.iter().for_each(|e| visitor.visit_expr(e));
            match &call.block {
                Some(BlockArg::Literal(block)) => walk_block(visitor, block),
                Some(BlockArg::Pass(expr)) => visitor.visit_expr(expr),
                None => {}
            }
        }
        Expr::Index { receiver, args } => {
            visitor.visit_expr(receiver);
            args.iter().for_each(|e| visitor.visit_expr(e));
        }
        Expr::Lambda(block) | Expr::ProcLiteral(block) => walk_block(visitor, block),

        Expr::If {
            cond,
            then_branch,
            else_branch,
        }
        | Expr::Unless {
            cond,
            then_branch,
            else_branch,
        } => {
            visitor.visit_expr(cond);
            visitor.visit_expr(then_branch);
            if let Some(e) = else_branch {
                visitor.visit_expr(e);
            }
        }
        Expr::While { cond, body } | Expr::Until { cond, body } => {
            visitor.visit_expr(cond);
            visitor.visit_expr(body);
        }
        Expr::For { iterable, body, .. } => {
            visitor.visit_expr(iterable);
            visitor.visit_expr(body);
        }
        Expr::Case(case) => {
            if let Some(subject) = &case.subject {
                visitor.visit_expr(subject);
            }
            for when in &case.whens {
                when.patterns.iter().for_each(|e| visitor.visit_expr(e));
                visitor.visit_expr(&when.body);
            }
            if let Some(e) = &case.else_body {
                visitor.visit_expr(e);
            }
        }
        Expr::CaseIn(case) => {
            visitor.visit_expr(&case.subject);
            for clause in &case.clauses {
                visitor.visit_pattern(&clause.pattern);
                if let Some(guard) = &clause.guard {
                    visitor.visit_expr(guard);
                }
                visitor.visit_expr(&clause.body);
            }
            if let Some(e) = &case.else_body {
                visitor.visit_expr(e);
            }
        }
        Expr::Break(value) | Expr::Next(value) | Expr::Return(value) => {
            if let Some(v) = value {
                visitor.visit_expr(v);
            }
        }
        Expr::Begin(begin) => {
            visitor.visit_expr(&begin.body);
            for rescue in &begin.rescues {
                rescue.classes.iter().for_each(|e| visitor.visit_expr(e));
                visitor.visit_expr(&rescue.body);
            }
            if let Some(e) = &begin.else_body {
                visitor.visit_expr(e);
            }
            if let Some(e) = &begin.ensure {
                visitor.visit_expr(e);
            }
        }

        Expr::Def(def) => {
            if let Some(target) = &def.target {
                visitor.visit_expr(target);
            }
            def.params.optional.iter().for_each(|(_, e)| visitor.visit_expr(e));
            visitor.visit_expr(&def.body);
        }
        Expr::ClassDef(class) => {
            if let Some(scope) = &class.path.scope {
                visitor.visit_expr(scope);
            }
            if let Some(superclass) = &class.superclass {
                visitor.visit_expr(superclass);
            }
            visitor.visit_expr(&class.body);
        }
        Expr::ModuleDef(module) => {
            if let Some(scope) = &module.path.scope {
                visitor.visit_expr(scope);
            }
            visitor.visit_expr(&module.body);
        }
        Expr::SingletonClass { target, body } => {
            visitor.visit_expr(target);
            visitor.visit_expr(body);
        }
    }
}

/// Visit every expression nested in a pattern.
pub fn walk_pattern<V: Visitor + ?Sized>(visitor: &mut V, pattern: &Pattern) {
    match pattern {
        Pattern::Wildcard | Pattern::Bind(_) => {}
        Pattern::Value(expr) => visitor.visit_expr(expr),
        Pattern::Array { before, after, .. } => {
            before.iter().chain(after).for_each(|p| visitor.visit_pattern(p));
        }
        Pattern::Hash(entries) => {
            for p in entries.iter().filter_map(|(_, p)| p.as_ref()) {
                visitor.visit_pattern(p);
            }
        }
        Pattern::Alternatives(options) => options.iter().for_each(|p| visitor.visit_pattern(p)),
        Pattern::Deconstruct { constant, args } => {
            visitor.visit_expr(constant);
            args.iter().for_each(|p| visitor.visit_pattern(p));
        }
    }
}

fn walk_block<V: Visitor + ?Sized>(visitor: &mut V, block: &super::BlockBody) {
    block.params.optional.iter().for_each(|(_, e)| visitor.visit_expr(e));
    visitor.visit_expr(&block.body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;

    #[derive(Default)]
    struct NameCollector {
        names: Vec<String>,
    }

    impl Visitor for NameCollector {
        fn visit_expr(&mut self, expr: &Expr) {
            if let Expr::Name(n) = expr {
                self.names.push(n.clone());
            }
            walk_expr(self, expr);
        }
    }

    #[test]
    fn test_collects_nested_names() {
        let expr = Expr::If {
            cond: Box::new(Expr::binary(
                BinaryOp::Lt,
                Expr::Name("a".into()),
                Expr::Name("b".into()),
            )),
            then_branch: Box::new(Expr::call(None, "puts", vec![Expr::Name("c".into())])),
            else_branch: None,
        };
        let mut collector = NameCollector::default();
        collector.visit_expr(&expr);
        assert_eq!(collector.names, vec!["a", "b", "c"]);
    }
}
