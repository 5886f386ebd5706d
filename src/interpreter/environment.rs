//! Environment model
//!
//! An environment is a chain of frames built from pairs:
//!
//! ```text
//! env   = (frame . parent-env)       the global env has parent ()
//! frame = ((sym . value) ...)        newest binding first
//! ```
//!
//! Symbols are interned, so binding lookup compares words, never names.
//! Names missing from every frame fall back to the built-in procedure table,
//! which lets user definitions shadow built-ins without the global frame
//! holding a binding for each of them.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::SchemeError;
use crate::interpreter::ops::{Op, OPS};
use crate::memory::value::Value;

impl Interpreter {
    /// Pre-intern every special form and built-in name, then build the empty
    /// interaction environment.
    ///
    /// Must run on a fresh heap: the names take string slots `0..OPS.len()`
    /// in table order, so a symbol's index is its op id.
    pub(crate) fn create_environment(&mut self) -> Result<Value, SchemeError> {
        for entry in OPS {
            let symbol = self.symbols.intern(&mut self.heap, entry.name.as_bytes())?;
            if symbol.index() != entry.op.id() {
                return Err(SchemeError::InvalidArgument {
                    procedure: "create-environment",
                    message: format!(
                        "{} interned at slot {} instead of {}",
                        entry.name,
                        symbol.index(),
                        entry.op.id()
                    ),
                });
            }
        }
        Ok(self.heap.cons(Value::NIL, Value::NIL)?)
    }

    /// Find the value bound to `symbol`, innermost frame first
    pub fn lookup(&self, env: Value, symbol: Value) -> Result<Value, SchemeError> {
        let mut frames = env;
        while frames.is_pair() {
            let mut bindings = self.heap.car(frames)?;
            while bindings.is_pair() {
                let binding = self.heap.car(bindings)?;
                if self.heap.car(binding)? == symbol {
                    return Ok(self.heap.cdr(binding)?);
                }
                bindings = self.heap.cdr(bindings)?;
            }
            frames = self.heap.cdr(frames)?;
        }

        match Op::procedure(symbol) {
            Some(op) => Ok(op.value()),
            None => Err(SchemeError::UnboundVariable {
                name: self.display(symbol),
            }),
        }
    }

    /// Prepend a binding to the innermost frame of `env`
    pub fn define(&mut self, env: Value, symbol: Value, value: Value) -> Result<(), SchemeError> {
        let binding = self.heap.cons(symbol, value)?;
        let frame = self.heap.car(env)?;
        let frame = self.heap.cons(binding, frame)?;
        self.heap.set_car(env, frame)?;
        Ok(())
    }

    /// Push a frame binding `params` to `args` in front of `env`.
    ///
    /// `params` is a symbol (binds the whole argument list), a proper list of
    /// symbols (positional, exact count), or such a list ending in a dotted
    /// rest symbol. An empty parameter list still pushes an empty frame so
    /// body `define`s stay local to the call.
    pub fn extend(&mut self, env: Value, params: Value, args: Value) -> Result<Value, SchemeError> {
        let mut frame = Value::NIL;

        if params.is_symbol() {
            let binding = self.heap.cons(params, args)?;
            frame = self.heap.cons(binding, frame)?;
            return Ok(self.heap.cons(frame, env)?);
        }

        let mut p = params;
        let mut a = args;
        while p.is_pair() && a.is_pair() {
            let param = self.heap.car(p)?;
            let arg = self.heap.car(a)?;
            let binding = self.heap.cons(param, arg)?;
            frame = self.heap.cons(binding, frame)?;
            p = self.heap.cdr(p)?;
            a = self.heap.cdr(a)?;
        }

        if p.is_symbol() {
            let binding = self.heap.cons(p, a)?;
            frame = self.heap.cons(binding, frame)?;
        } else if !p.is_null() || !a.is_null() {
            let required = self.heap.list_length(params, "lambda")?;
            let expected = if self.heap.list_tail(params)?.is_symbol() {
                format!("at least {}", required)
            } else {
                format!("exactly {}", required)
            };
            return Err(SchemeError::ParameterArgumentMismatch {
                expected,
                got: self.heap.list_length(args, "apply")?,
            });
        }

        Ok(self.heap.cons(frame, env)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::interpreter::engine::Interpreter;
    use crate::interpreter::errors::SchemeError;
    use crate::interpreter::ops::Op;
    use crate::memory::value::Value;

    fn interpreter() -> Interpreter {
        Interpreter::new(Config::default()).expect("interpreter")
    }

    fn symbol(interp: &mut Interpreter, name: &str) -> Value {
        interp
            .symbols
            .intern(&mut interp.heap, name.as_bytes())
            .expect("intern")
    }

    #[test]
    fn test_op_names_have_their_ids() {
        let mut interp = interpreter();
        assert_eq!(symbol(&mut interp, "if").index(), Op::If.id());
        assert_eq!(symbol(&mut interp, "car").index(), Op::Car.id());
        assert_eq!(
            symbol(&mut interp, "string->number").index(),
            Op::StringToNumber.id()
        );
    }

    #[test]
    fn test_builtin_fallback_and_unbound() {
        let mut interp = interpreter();
        let env = interp.global_env;
        let car = symbol(&mut interp, "car");
        assert_eq!(interp.lookup(env, car).unwrap(), Op::Car.value());

        let missing = symbol(&mut interp, "missing");
        assert_eq!(
            interp.lookup(env, missing),
            Err(SchemeError::UnboundVariable {
                name: "missing".to_string()
            })
        );
    }

    #[test]
    fn test_define_shadows_in_same_frame() {
        let mut interp = interpreter();
        let env = interp.global_env;
        let x = symbol(&mut interp, "x");
        interp.define(env, x, Value::number(1.0)).unwrap();
        interp.define(env, x, Value::number(2.0)).unwrap();
        assert_eq!(interp.lookup(env, x).unwrap(), Value::number(2.0));
    }

    #[test]
    fn test_extend_shapes() {
        let mut interp = interpreter();
        let env = interp.global_env;
        let x = symbol(&mut interp, "x");
        let y = symbol(&mut interp, "y");
        let one = Value::number(1.0);
        let two = Value::number(2.0);

        let params = interp.heap.list_from(&[x, y]).unwrap();
        let args = interp.heap.list_from(&[one, two]).unwrap();
        let inner = interp.extend(env, params, args).unwrap();
        assert_eq!(interp.lookup(inner, y).unwrap(), two);

        let variadic = interp.extend(env, x, args).unwrap();
        assert_eq!(interp.lookup(variadic, x).unwrap(), args);

        let short = interp.heap.list_from(&[one]).unwrap();
        assert!(matches!(
            interp.extend(env, params, short),
            Err(SchemeError::ParameterArgumentMismatch { got: 1, .. })
        ));

        let empty = interp.extend(env, Value::NIL, Value::NIL).unwrap();
        assert_ne!(empty, env);
        assert!(interp.extend(env, Value::NIL, short).is_err());
    }

    #[test]
    fn test_rest_parameter() {
        let mut interp = interpreter();
        let env = interp.global_env;
        let x = symbol(&mut interp, "x");
        let rest = symbol(&mut interp, "rest");
        let params = interp.heap.cons(x, rest).unwrap();
        let args = interp
            .heap
            .list_from(&[Value::number(1.0), Value::number(2.0)])
            .unwrap();
        let inner = interp.extend(env, params, args).unwrap();
        assert_eq!(interp.lookup(inner, x).unwrap(), Value::number(1.0));
        let bound = interp.lookup(inner, rest).unwrap();
        assert_eq!(interp.heap.list_length(bound, "test").unwrap(), 1);
    }
}
