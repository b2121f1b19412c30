//! Display and Debug implementations for Value
//!
//! `Display` gives the `to_s` form, [`inspect`] the `p` form. Both are
//! structural; user-defined `to_s`/`inspect` methods are honored one level
//! up, by the runtime.

use std::fmt;

use super::*;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Long(n) => write!(f, "{}", n),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::Str(s) | Value::Symbol(s) => f.write_str(s),
            Value::Range(r) => write!(f, "{}{}{}", r.start, range_dots(r), r.end),
            Value::Regex(re) => f.write_str(re.as_str()),
            Value::Object(o) => write!(f, "#<{}>", o.class().name()),
            Value::Class(c) => f.write_str(c.name()),
            Value::NativeType(t) => f.write_str(t.name()),
            Value::NativeNamespace(path) => f.write_str(path),
            Value::Array(_) | Value::Hash(_) | Value::Proc(_) | Value::Native(_) => {
                f.write_str(&inspect(self))
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&inspect(self))
    }
}

/// Float text: integral values keep a `.0`, huge ones use an exponent.
pub(crate) fn format_float(x: f64) -> String {
    if x.is_nan() {
        "NaN".into()
    } else if x.is_infinite() {
        if x > 0.0 { "Infinity" } else { "-Infinity" }.into()
    } else if x.fract() == 0.0 && x.abs() < 1e16 {
        format!("{:.1}", x)
    } else if x.abs() >= 1e16 {
        let text = format!("{:e}", x);
        match text.split_once('e') {
            Some((mantissa, exp)) if !mantissa.contains('.') => format!("{}.0e{}", mantissa, signed(exp)),
            Some((mantissa, exp)) => format!("{}e{}", mantissa, signed(exp)),
            None => text,
        }
    } else {
        format!("{}", x)
    }
}

fn signed(exp: &str) -> String {
    if exp.starts_with('-') {
        exp.to_string()
    } else {
        format!("+{}", exp)
    }
}

fn range_dots(r: &RangeValue) -> &'static str {
    if r.exclusive {
        "..."
    } else {
        ".."
    }
}

/// The `p` form of a value. Self-referential arrays and hashes print as
/// `[...]` / `{...}`.
pub fn inspect(value: &Value) -> String {
    let mut out = String::new();
    let mut visiting = Vec::new();
    write_inspect(value, &mut out, &mut visiting);
    out
}

fn write_inspect(value: &Value, out: &mut String, visiting: &mut Vec<usize>) {
    match value {
        Value::Nil => out.push_str("nil"),
        Value::Str(s) => out.push_str(&quote(s)),
        Value::Symbol(s) => {
            out.push(':');
            out.push_str(s);
        }
        Value::Regex(re) => {
            out.push('/');
            out.push_str(re.as_str());
            out.push('/');
        }
        Value::Range(r) => {
            write_inspect(&r.start, out, visiting);
            out.push_str(range_dots(r));
            write_inspect(&r.end, out, visiting);
        }
        Value::Array(a) => {
            let id = Rc::as_ptr(a) as usize;
            if visiting.contains(&id) {
                out.push_str("[...]");
                return;
            }
            visiting.push(id);
            out.push('[');
            for (i, item) in a.to_vec().iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_inspect(item, out, visiting);
            }
            out.push(']');
            visiting.pop();
        }
        Value::Hash(h) => {
            let id = Rc::as_ptr(h) as usize;
            if visiting.contains(&id) {
                out.push_str("{...}");
                return;
            }
            visiting.push(id);
            out.push('{');
            for (i, (k, v)) in h.entries().iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                match k {
                    Value::Symbol(name) => {
                        out.push_str(name);
                        out.push_str(": ");
                    }
                    other => {
                        write_inspect(other, out, visiting);
                        out.push_str(" => ");
                    }
                }
                write_inspect(v, out, visiting);
            }
            out.push('}');
            visiting.pop();
        }
        Value::Object(o) => {
            let id = Rc::as_ptr(o) as usize;
            let ivars = o.ivars();
            if visiting.contains(&id) || ivars.is_empty() {
                out.push_str(&format!("#<{}>", o.class().name()));
                return;
            }
            visiting.push(id);
            out.push_str("#<");
            out.push_str(o.class().name());
            for (i, (name, v)) in ivars.iter().enumerate() {
                out.push_str(if i == 0 { " " } else { ", " });
                out.push_str(name);
                out.push('=');
                write_inspect(v, out, visiting);
            }
            out.push('>');
            visiting.pop();
        }
        Value::Proc(p) => {
            out.push_str(if p.is_lambda {
                "#<Proc (lambda)>"
            } else {
                "#<Proc>"
            });
        }
        Value::Native(n) => match n.enum_info() {
            Some((member, _)) => out.push_str(&format!("{}::{}", n.native_type().name(), member)),
            None => out.push_str(&format!("#<{}>", n.native_type().name())),
        },
        other => out.push_str(&other.to_string()),
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_to_s_forms() {
        assert_eq!(Value::Nil.to_string(), "");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(0.25).to_string(), "0.25");
        assert_eq!(Value::symbol("ok").to_string(), "ok");
    }

    #[test]
    fn test_inspect_collections() {
        let hash = Value::hash(vec![
            (Value::symbol("a"), Value::Long(1)),
            (Value::string("b"), Value::string("x\n")),
        ]);
        assert_eq!(inspect(&hash), r#"{a: 1, "b" => "x\n"}"#);
        assert_eq!(
            inspect(&Value::array(vec![Value::Nil, Value::symbol("s")])),
            "[nil, :s]"
        );
    }

    #[test]
    fn test_inspect_cycle() {
        let array = Value::array(vec![Value::Long(1)]);
        if let Value::Array(a) = &array {
            a.push(array.clone()).unwrap();
        }
        assert_eq!(inspect(&array), "[1, [...]]");
    }

    #[test]
    fn test_large_float_uses_exponent() {
        assert_eq!(format_float(1e20), "1.0e+20");
    }
}
