//! Statement interpreter.

use std::collections::{BTreeMap, HashMap};

use super::parser::{Expr, Stmt, Target};
use super::{EvalError, Value};

pub(super) fn run(program: &[Stmt]) -> Result<Value, EvalError> {
    let mut scope: HashMap<String, Value> = HashMap::new();
    let mut exports: BTreeMap<String, Value> = BTreeMap::new();
    let mut module_exports: Option<Value> = None;

    for stmt in program {
        match stmt {
            Stmt::Bind(name, expr) => {
                let value = eval(expr, &scope)?;
                scope.insert(name.clone(), value);
            }
            Stmt::Throw(expr) => {
                let value = eval(expr, &scope)?;
                return Err(EvalError::Thrown {
                    message: value.to_string(),
                });
            }
            Stmt::Assign(Target::ModuleExports, expr) => {
                module_exports = Some(eval(expr, &scope)?);
            }
            Stmt::Assign(Target::ExportsMember(name), expr) => {
                let value = eval(expr, &scope)?;
                exports.insert(name.clone(), value);
            }
            Stmt::Assign(Target::ModuleExportsMember(name), expr) => {
                let value = eval(expr, &scope)?;
                match &mut module_exports {
                    None => {
                        exports.insert(name.clone(), value);
                    }
                    Some(Value::Object(fields)) => {
                        fields.insert(name.clone(), value);
                    }
                    Some(Value::Str(_)) => {
                        return Err(EvalError::Type {
                            message: format!("cannot set property '{name}' on a string"),
                        })
                    }
                }
            }
        }
    }

    Ok(module_exports.unwrap_or(Value::Object(exports)))
}

fn eval(expr: &Expr, scope: &HashMap<String, Value>) -> Result<Value, EvalError> {
    match expr {
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Ident(name) => scope
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::Reference { name: name.clone() }),
        Expr::Concat(terms) => {
            let mut out = String::new();
            for term in terms {
                match eval(term, scope)? {
                    Value::Str(s) => out.push_str(&s),
                    value => {
                        return Err(EvalError::Type {
                            message: format!("cannot concatenate a value of type {}", value.type_name()),
                        })
                    }
                }
            }
            Ok(Value::Str(out))
        }
        Expr::Object(fields) => {
            let mut out = BTreeMap::new();
            for (key, value) in fields {
                out.insert(key.clone(), eval(value, scope)?);
            }
            Ok(Value::Object(out))
        }
    }
}
