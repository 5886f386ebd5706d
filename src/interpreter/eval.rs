//! Tail-calling evaluator
//!
//! [`Interpreter::eval`] runs a loop over an `(expr, env)` pair held in two
//! root slots. Each pass classifies the expression and either finishes with a
//! value or hands back the next `(expr, env)` to continue with. Tail positions
//! (the chosen `if` branch, the last body expression of a closure, the last
//! operand of `and`/`or`, desugared `let`/`let*`) always continue the loop, so
//! iterative Scheme programs run in constant native stack. Sub-evaluations
//! that are not in tail position (operator, operands, `if` test) recurse.
//!
//! # Rooting
//!
//! Collection only happens at the top of a pass, while the loop's own slots
//! and every caller's registered roots are live. Anything a pass allocates or
//! holds across a nested `eval` is pushed on the root stack; the roots are
//! dropped when the next pass starts, or when `eval` returns.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::SchemeError;
use crate::interpreter::ops::Op;
use crate::memory::value::{Kind, Value};

/// Dispatches without a collection before a low-water collection may run
const LOW_WATER_BACKOFF: u64 = 64;

/// Remaining native stack that triggers a new segment
const STACK_RED_ZONE: usize = 128 * 1024;

/// Size of each new native stack segment
const STACK_GROW_SIZE: usize = 1024 * 1024;

/// Outcome of one evaluator pass
pub(crate) enum Step {
    Done(Value),
    Tail(Value, Value),
}

impl Interpreter {
    /// Evaluate `expr` in `env`.
    ///
    /// Nesting is bounded by the root stack alone: the native stack grows on
    /// demand, so running out of roots is always reported as `StackOverflow`.
    pub fn eval(&mut self, expr: Value, env: Value) -> Result<Value, SchemeError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.with_root_scope(|interp| interp.eval_loop(expr, env))
        })
    }

    fn eval_loop(&mut self, expr: Value, env: Value) -> Result<Value, SchemeError> {
        let (expr_slot, env_slot) = self.heap.push_root2(expr, env)?;
        let base = self.heap.root_depth();

        loop {
            self.heap.truncate_roots(base);
            self.maybe_collect();

            let expr = self.heap.root(expr_slot);
            let env = self.heap.root(env_slot);
            match self.dispatch(expr, env)? {
                Step::Done(value) => return Ok(value),
                Step::Tail(next_expr, next_env) => {
                    self.heap.set_root(expr_slot, next_expr);
                    self.heap.set_root(env_slot, next_env);
                }
            }
        }
    }

    /// Sampled collection, plus an early one when a pool runs low
    fn maybe_collect(&mut self) {
        self.dispatch_count += 1;
        let interval = self.config.gc_interval;
        let sampled = interval > 0 && self.dispatch_count >= interval;
        let low_water = self.dispatch_count >= LOW_WATER_BACKOFF
            && (self.heap.free_cells() < self.config.gc_low_water
                || self.heap.free_strings() < self.heap.string_capacity() / 8);
        if sampled || low_water {
            self.dispatch_count = 0;
            self.collect_garbage();
        }
    }

    fn dispatch(&mut self, expr: Value, env: Value) -> Result<Step, SchemeError> {
        match expr.kind() {
            Kind::EmptyList => Err(SchemeError::CannotApplyEmptyList),
            Kind::Symbol(_) => self.lookup(env, expr).map(Step::Done),
            Kind::Pair(_) => {
                let head = self.heap.car(expr)?;
                let operands = self.heap.cdr(expr)?;
                match Op::special_form(head) {
                    Some(form) => self.special_form(form, operands, env),
                    None => self.application(head, operands, env),
                }
            }
            _ => Ok(Step::Done(expr)),
        }
    }

    // ========== Special forms ==========

    fn special_form(&mut self, form: Op, operands: Value, env: Value) -> Result<Step, SchemeError> {
        let args = self.heap.list_to_vec(operands, form.name()).map_err(|_| {
            SchemeError::bad_syntax(form.name(), "operands must form a proper list")
        })?;

        match form {
            Op::Quote => {
                if args.len() != 1 {
                    return Err(SchemeError::bad_syntax("quote", "expects exactly one operand"));
                }
                Ok(Step::Done(args[0]))
            }
            Op::If => self.eval_if(&args, env),
            Op::Define => self.eval_define(&args, operands, env),
            Op::Lambda => {
                if args.len() < 2 {
                    return Err(SchemeError::bad_syntax("lambda", "expects parameters and a body"));
                }
                let params = args[0];
                let body = self.heap.cdr(operands)?;
                self.make_lambda(params, body, env).map(Step::Done)
            }
            Op::Let => self.eval_let(&args, operands, env),
            Op::LetStar => self.eval_let_star(&args, operands, env),
            Op::And => {
                let Some((&last, init)) = args.split_last() else {
                    return Ok(Step::Done(Value::TRUE));
                };
                for &test in init {
                    if !self.eval(test, env)?.is_truthy() {
                        return Ok(Step::Done(Value::FALSE));
                    }
                }
                Ok(Step::Tail(last, env))
            }
            Op::Or => {
                let Some((&last, init)) = args.split_last() else {
                    return Ok(Step::Done(Value::FALSE));
                };
                for &test in init {
                    let value = self.eval(test, env)?;
                    if value.is_truthy() {
                        return Ok(Step::Done(value));
                    }
                }
                Ok(Step::Tail(last, env))
            }
            _ => Err(SchemeError::NotCallable {
                value: form.name().to_string(),
            }),
        }
    }

    fn eval_if(&mut self, args: &[Value], env: Value) -> Result<Step, SchemeError> {
        if !(2..=3).contains(&args.len()) {
            return Err(SchemeError::bad_syntax(
                "if",
                format!("expects 2 or 3 operands, got {}", args.len()),
            ));
        }
        if self.eval(args[0], env)?.is_truthy() {
            Ok(Step::Tail(args[1], env))
        } else if let Some(&alternative) = args.get(2) {
            Ok(Step::Tail(alternative, env))
        } else {
            Ok(Step::Done(Value::UNSPECIFIED))
        }
    }

    /// `(define name expr)` or `(define (name . formals) body...)`
    fn eval_define(&mut self, args: &[Value], operands: Value, env: Value) -> Result<Step, SchemeError> {
        let Some(&target) = args.first() else {
            return Err(SchemeError::bad_syntax("define", "missing name"));
        };

        match target.kind() {
            Kind::Symbol(_) => {
                if args.len() != 2 {
                    return Err(SchemeError::bad_syntax(
                        "define",
                        "expects a name and exactly one expression",
                    ));
                }
                let value = self.eval(args[1], env)?;
                self.define(env, target, value)?;
            }
            Kind::Pair(_) => {
                let name = self.heap.car(target)?;
                if !name.is_symbol() {
                    return Err(SchemeError::bad_syntax("define", "procedure name must be a symbol"));
                }
                let formals = self.heap.cdr(target)?;
                let body = self.heap.cdr(operands)?;
                let closure = self.make_lambda(formals, body, env)?;
                self.define(env, name, closure)?;
            }
            _ => {
                return Err(SchemeError::bad_syntax(
                    "define",
                    "target must be a symbol or (name . formals)",
                ))
            }
        }
        Ok(Step::Done(Value::UNSPECIFIED))
    }

    /// Validate the parameter list and body, then capture `env`
    fn make_lambda(&mut self, params: Value, body: Value, env: Value) -> Result<Value, SchemeError> {
        let mut rest = params;
        while rest.is_pair() {
            if !self.heap.car(rest)?.is_symbol() {
                return Err(SchemeError::bad_syntax("lambda", "parameters must be symbols"));
            }
            rest = self.heap.cdr(rest)?;
        }
        if !rest.is_null() && !rest.is_symbol() {
            return Err(SchemeError::bad_syntax(
                "lambda",
                "parameters must be a symbol or a list of symbols",
            ));
        }
        if !body.is_pair() || self.heap.list_tail(body)? != Value::NIL {
            return Err(SchemeError::bad_syntax("lambda", "body must be a non-empty list"));
        }

        let code = self.heap.cons(params, body)?;
        Ok(self.heap.make_closure(env, code)?)
    }

    /// Split `((name value) ...)` into names and value expressions
    fn let_clauses(&self, form: &'static str, bindings: Value) -> Result<Vec<(Value, Value)>, SchemeError> {
        let clauses = self
            .heap
            .list_to_vec(bindings, form)
            .map_err(|_| SchemeError::bad_syntax(form, "bindings must form a list"))?;
        clauses
            .into_iter()
            .map(|clause| {
                let parts = self.heap.list_to_vec(clause, form).unwrap_or_default();
                match parts.as_slice() {
                    [name, value] if name.is_symbol() => Ok((*name, *value)),
                    _ => Err(SchemeError::bad_syntax(
                        form,
                        format!("bad binding {}", self.write(clause)),
                    )),
                }
            })
            .collect()
    }

    /// `(let ((p v) ...) body...)` => `((lambda (p ...) body...) v ...)`;
    /// named `(let loop ((p v) ...) body...)` binds `loop` to that lambda
    fn eval_let(&mut self, args: &[Value], operands: Value, env: Value) -> Result<Step, SchemeError> {
        if args.len() < 2 {
            return Err(SchemeError::bad_syntax("let", "expects bindings and a body"));
        }
        if args[0].is_symbol() {
            return self.eval_named_let(args, operands, env);
        }

        let clauses = self.let_clauses("let", args[0])?;
        let body = self.heap.cdr(operands)?;
        let names: Vec<Value> = clauses.iter().map(|&(name, _)| name).collect();
        let values: Vec<Value> = clauses.iter().map(|&(_, value)| value).collect();

        let params = self.heap.list_from(&names)?;
        let lambda = self.lambda_expr(params, body)?;
        let values = self.heap.list_from(&values)?;
        let application = self.heap.cons(lambda, values)?;
        Ok(Step::Tail(application, env))
    }

    /// `((lambda () (define name (lambda (p ...) body...)) (name v ...)))`
    fn eval_named_let(&mut self, args: &[Value], operands: Value, env: Value) -> Result<Step, SchemeError> {
        if args.len() < 3 {
            return Err(SchemeError::bad_syntax("let", "named let expects bindings and a body"));
        }
        let name = args[0];
        let clauses = self.let_clauses("let", args[1])?;
        let body = self.heap.cdr(self.heap.cdr(operands)?)?;
        let names: Vec<Value> = clauses.iter().map(|&(name, _)| name).collect();
        let values: Vec<Value> = clauses.iter().map(|&(_, value)| value).collect();

        let params = self.heap.list_from(&names)?;
        let procedure = self.lambda_expr(params, body)?;
        let define = self
            .heap
            .list_from(&[Value::symbol(Op::Define.id()), name, procedure])?;
        let values = self.heap.list_from(&values)?;
        let call = self.heap.cons(name, values)?;
        let outer_body = self.heap.list_from(&[define, call])?;
        let outer = self.lambda_expr(Value::NIL, outer_body)?;
        let application = self.heap.cons(outer, Value::NIL)?;
        Ok(Step::Tail(application, env))
    }

    /// `(let* ((p1 v1) (p2 v2)) body...)` =>
    /// `((lambda (p1) ((lambda (p2) body...) v2)) v1)`
    fn eval_let_star(&mut self, args: &[Value], operands: Value, env: Value) -> Result<Step, SchemeError> {
        if args.len() < 2 {
            return Err(SchemeError::bad_syntax("let*", "expects bindings and a body"));
        }
        let clauses = self.let_clauses("let*", args[0])?;
        let mut body = self.heap.cdr(operands)?;

        if clauses.is_empty() {
            let lambda = self.lambda_expr(Value::NIL, body)?;
            return Ok(Step::Tail(self.heap.cons(lambda, Value::NIL)?, env));
        }

        for &(name, value) in clauses.iter().rev() {
            let params = self.heap.cons(name, Value::NIL)?;
            let lambda = self.lambda_expr(params, body)?;
            let application = self.heap.list_from(&[lambda, value])?;
            body = self.heap.cons(application, Value::NIL)?;
        }
        Ok(Step::Tail(self.heap.car(body)?, env))
    }

    /// The expression `(lambda params . body)`
    fn lambda_expr(&mut self, params: Value, body: Value) -> Result<Value, SchemeError> {
        let code = self.heap.cons(params, body)?;
        Ok(self.heap.cons(Value::symbol(Op::Lambda.id()), code)?)
    }

    // ========== Application ==========

    fn application(&mut self, head: Value, operands: Value, env: Value) -> Result<Step, SchemeError> {
        let operator = self.eval(head, env)?;
        self.heap.push_root(operator)?;
        let args = self.eval_operands(operands, env)?;
        self.apply_values(operator, args)
    }

    /// Evaluate operands left to right into a fresh, rooted list
    fn eval_operands(&mut self, operands: Value, env: Value) -> Result<Value, SchemeError> {
        let head_slot = self.heap.push_root(Value::NIL)?;
        let mut last = Value::NIL;
        let mut rest = operands;

        while rest.is_pair() {
            let expr = self.heap.car(rest)?;
            let value = self.eval(expr, env)?;
            let cell = self.heap.cons(value, Value::NIL)?;
            if last.is_null() {
                self.heap.set_root(head_slot, cell);
            } else {
                self.heap.set_cdr(last, cell)?;
            }
            last = cell;
            rest = self.heap.cdr(rest)?;
        }
        if !rest.is_null() {
            return Err(SchemeError::bad_syntax(
                "application",
                "operands must form a proper list",
            ));
        }
        Ok(self.heap.root(head_slot))
    }

    /// Apply a procedure or closure to an evaluated argument list. Closures
    /// and `apply` come back as a tail step.
    fn apply_values(&mut self, operator: Value, args: Value) -> Result<Step, SchemeError> {
        match operator.kind() {
            Kind::Procedure(id) => {
                let op = Op::from_id(id)
                    .filter(|op| !op.is_special_form())
                    .ok_or_else(|| SchemeError::NotCallable {
                        value: self.write(operator),
                    })?;
                let argv = self.heap.list_to_vec(args, op.name())?;
                if !op.arity().accepts(argv.len()) {
                    return Err(SchemeError::ArityMismatch {
                        procedure: op.name().to_string(),
                        expected: op.arity().describe(),
                        got: argv.len(),
                    });
                }
                if op == Op::Apply {
                    let spread = self.apply_arguments(argv[1])?;
                    return self.apply_values(argv[0], spread);
                }
                self.call_builtin(op, &argv).map(Step::Done)
            }
            Kind::Closure(_) => self.enter_closure(operator, args),
            _ => Err(SchemeError::NotCallable {
                value: self.write(operator),
            }),
        }
    }

    /// Check the list handed to `apply`
    fn apply_arguments(&self, list: Value) -> Result<Value, SchemeError> {
        match self.heap.list_tail(list)? {
            tail if tail.is_null() => Ok(list),
            _ => Err(SchemeError::wrong_type("apply", "list", list.type_name())),
        }
    }

    /// Bind arguments and evaluate all but the last body expression; the last
    /// one is returned as the tail step.
    fn enter_closure(&mut self, closure: Value, args: Value) -> Result<Step, SchemeError> {
        let (captured, params, body) = self.heap.closure_parts(closure)?;
        let env = self.extend(captured, params, args)?;
        self.heap.push_root(env)?;

        let mut body = body;
        loop {
            let expr = self.heap.car(body)?;
            let rest = self.heap.cdr(body)?;
            if !rest.is_pair() {
                return Ok(Step::Tail(expr, env));
            }
            self.eval(expr, env)?;
            body = rest;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::interpreter::engine::Interpreter;
    use crate::interpreter::errors::SchemeError;

    fn eval(source: &str) -> Result<String, SchemeError> {
        let mut interp = Interpreter::new(Config::default()).expect("interpreter");
        interp.eval_str(source)
    }

    #[test]
    fn test_self_evaluating() {
        assert_eq!(eval("42").unwrap(), "42");
        assert_eq!(eval("\"hi\"").unwrap(), "\"hi\"");
        assert_eq!(eval("#\\a").unwrap(), "#\\a");
        assert_eq!(eval("#f").unwrap(), "#f");
    }

    #[test]
    fn test_empty_list_is_an_error() {
        assert_eq!(eval("()"), Err(SchemeError::CannotApplyEmptyList));
        assert_eq!(eval("'()").unwrap(), "()");
    }

    #[test]
    fn test_quote_arity() {
        assert!(matches!(eval("(quote)"), Err(SchemeError::BadSyntax { form: "quote", .. })));
        assert!(matches!(eval("(quote 1 2)"), Err(SchemeError::BadSyntax { form: "quote", .. })));
    }

    #[test]
    fn test_if() {
        assert_eq!(eval("(if #f 1 2)").unwrap(), "2");
        assert_eq!(eval("(if '() 1 2)").unwrap(), "1");
        assert_eq!(eval("(if 0 1 2)").unwrap(), "1");
        assert_eq!(eval("(if #f 1)").unwrap(), "");
        assert!(matches!(eval("(if 1)"), Err(SchemeError::BadSyntax { form: "if", .. })));
    }

    #[test]
    fn test_or_returns_first_truthy_value() {
        assert_eq!(eval("(or)").unwrap(), "#f");
        assert_eq!(eval("(or #f 2 3)").unwrap(), "2");
        assert_eq!(eval("(or #f #f)").unwrap(), "#f");
        assert_eq!(eval("(and)").unwrap(), "#t");
    }

    #[test]
    fn test_lambda_validation() {
        assert!(matches!(eval("(lambda (1) 1)"), Err(SchemeError::BadSyntax { form: "lambda", .. })));
        assert!(matches!(eval("(lambda (x))"), Err(SchemeError::BadSyntax { form: "lambda", .. })));
        assert!(matches!(eval("(lambda 5 1)"), Err(SchemeError::BadSyntax { form: "lambda", .. })));
        assert_eq!(eval("((lambda args args) 1 2)").unwrap(), "(1 2)");
        assert_eq!(eval("((lambda (a . b) b) 1 2 3)").unwrap(), "(2 3)");
    }

    #[test]
    fn test_define_shapes() {
        assert!(matches!(eval("(define 5 1)"), Err(SchemeError::BadSyntax { form: "define", .. })));
        assert!(matches!(eval("(define x)"), Err(SchemeError::BadSyntax { form: "define", .. })));
        assert_eq!(eval("(define (f . xs) xs) (f 1 2)").unwrap(), "(1 2)");
    }

    #[test]
    fn test_let_forms() {
        assert_eq!(eval("(let () 5)").unwrap(), "5");
        assert_eq!(eval("(let* () 5)").unwrap(), "5");
        assert_eq!(eval("(let ((x 1) (y 2)) (+ x y))").unwrap(), "3");
        assert!(matches!(eval("(let ((x)) x)"), Err(SchemeError::BadSyntax { form: "let", .. })));
        assert_eq!(
            eval("(let loop ((i 0) (acc '())) (if (= i 3) acc (loop (+ i 1) (cons i acc))))").unwrap(),
            "(2 1 0)"
        );
    }

    #[test]
    fn test_not_callable() {
        assert!(matches!(eval("(5 1)"), Err(SchemeError::NotCallable { .. })));
        assert!(matches!(eval("(\"f\")"), Err(SchemeError::NotCallable { .. })));
    }

    #[test]
    fn test_builtin_arity() {
        assert!(matches!(
            eval("(car 1 2)"),
            Err(SchemeError::ArityMismatch { got: 2, .. })
        ));
    }

    #[test]
    fn test_apply_in_tail_position() {
        assert_eq!(eval("(apply + '(1 2 3))").unwrap(), "6");
        assert_eq!(eval("(apply (lambda (x y) (* x y)) (list 6 7))").unwrap(), "42");
        assert!(eval("(apply + 1)").is_err());
    }
}
