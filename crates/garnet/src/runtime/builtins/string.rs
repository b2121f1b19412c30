//! `String`, `Symbol` and `Regexp`
//!
//! Strings are immutable: every transformation returns a new string and
//! the in-place forms raise `FrozenError`. Indices count characters, not
//! bytes.

use std::rc::Rc;

use regex::{Captures, Regex};

use super::{
    define, define_static, int_arg, range_span, slice_span, str_arg, this_str, wrong_receiver,
    yield_block,
};
use crate::ast::BinaryOp;
use crate::eval::binary::binary_op;
use crate::runtime::{CoreClasses, Machine};
use crate::value::{inspect, Args, Proc, Value};
use crate::EvalError;

pub(super) fn install(core: &CoreClasses) {
    install_string_basics(core);
    install_string_search(core);
    install_string_slicing(core);
    install_symbol(core);
    install_regexp(core);
}

fn chars_of(s: &str) -> Vec<char> {
    s.chars().collect()
}

fn byte_to_char(s: &str, byte: usize) -> usize {
    s[..byte].chars().count()
}

// ═══════════════════════════════════════════════════════════════════════
// Basics
// ═══════════════════════════════════════════════════════════════════════

fn install_string_basics(core: &CoreClasses) {
    let s = &core.string;

    define_static(s, "new", -1, |_, _, args| {
        args.check(0, 1)?;
        match args.get(0) {
            Value::Nil => Ok(Value::string("")),
            other => Ok(Value::string(str_arg(&other)?)),
        }
    });

    for op in [
        BinaryOp::Add,
        BinaryOp::Mul,
        BinaryOp::Eq,
        BinaryOp::Lt,
        BinaryOp::Gt,
        BinaryOp::Le,
        BinaryOp::Ge,
        BinaryOp::Cmp,
    ] {
        define(s, op.method_name(), 1, move |rt, this, args| {
            binary_op(rt, op, this, &args.get(0))
        });
    }

    for name in ["length", "size"] {
        define(s, name, 0, |_, this, _| Ok(Value::Long(this_str(this)?.chars().count() as i64)));
    }
    define(s, "bytesize", 0, |_, this, _| Ok(Value::Long(this_str(this)?.len() as i64)));
    define(s, "empty?", 0, |_, this, _| Ok(Value::Bool(this_str(this)?.is_empty())));
    define(s, "to_s", 0, |_, this, _| Ok(this.clone()));
    define(s, "to_str", 0, |_, this, _| Ok(this.clone()));
    define(s, "inspect", 0, |_, this, _| Ok(Value::string(inspect(this))));
    for name in ["to_sym", "intern"] {
        define(s, name, 0, |_, this, _| Ok(Value::symbol(this_str(this)?)));
    }
    define(s, "to_i", 0, |_, this, _| Ok(Value::Long(leading_int(this_str(this)?))));
    define(s, "to_f", 0, |_, this, _| Ok(Value::Float(leading_float(this_str(this)?))));
    define(s, "ord", 0, |_, this, _| {
        this_str(this)?
            .chars()
            .next()
            .map(|c| Value::Long(i64::from(u32::from(c))))
            .ok_or_else(|| EvalError::argument("empty string"))
    });

    define(s, "upcase", 0, |_, this, _| Ok(Value::string(this_str(this)?.to_uppercase())));
    define(s, "downcase", 0, |_, this, _| Ok(Value::string(this_str(this)?.to_lowercase())));
    define(s, "capitalize", 0, |_, this, _| {
        let text = this_str(this)?;
        let mut chars = text.chars();
        let capitalized = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            None => String::new(),
        };
        Ok(Value::string(capitalized))
    });
    define(s, "swapcase", 0, |_, this, _| {
        let swapped: String = this_str(this)?
            .chars()
            .flat_map(|c| {
                if c.is_uppercase() {
                    c.to_lowercase().collect::<Vec<_>>()
                } else {
                    c.to_uppercase().collect::<Vec<_>>()
                }
            })
            .collect();
        Ok(Value::string(swapped))
    });
    define(s, "reverse", 0, |_, this, _| {
        Ok(Value::string(this_str(this)?.chars().rev().collect::<String>()))
    });
    define(s, "strip", 0, |_, this, _| Ok(Value::string(this_str(this)?.trim())));
    define(s, "lstrip", 0, |_, this, _| Ok(Value::string(this_str(this)?.trim_start())));
    define(s, "rstrip", 0, |_, this, _| Ok(Value::string(this_str(this)?.trim_end())));
    define(s, "chomp", 0, |_, this, _| {
        let text = this_str(this)?;
        let text = text
            .strip_suffix("\r\n")
            .or_else(|| text.strip_suffix('\n'))
            .unwrap_or(text);
        Ok(Value::string(text))
    });
    define(s, "chop", 0, |_, this, _| {
        let mut chars = chars_of(this_str(this)?);
        chars.pop();
        Ok(Value::string(chars.into_iter().collect::<String>()))
    });

    define(s, "center", -1, |_, this, args| pad(this, &args, Justify::Center));
    define(s, "ljust", -1, |_, this, args| pad(this, &args, Justify::Left));
    define(s, "rjust", -1, |_, this, args| pad(this, &args, Justify::Right));

    for name in ["<<", "concat", "replace", "insert", "clear", "upcase!", "downcase!", "strip!", "gsub!", "sub!"] {
        define(s, name, -1, |_, this, _| {
            Err(EvalError::frozen(format!("can't modify frozen String: {}", inspect(this))))
        });
    }
}

#[derive(Clone, Copy)]
enum Justify {
    Left,
    Right,
    Center,
}

fn pad(this: &Value, args: &Args, justify: Justify) -> Result<Value, EvalError> {
    args.check(1, 2)?;
    let text = this_str(this)?;
    let width = int_arg(&args.get(0))?.max(0) as usize;
    let filler = match args.get(1) {
        Value::Nil => " ".to_string(),
        other => str_arg(&other)?.to_string(),
    };
    if filler.is_empty() {
        return Err(EvalError::argument("zero width padding"));
    }
    let len = text.chars().count();
    if width <= len {
        return Ok(this.clone());
    }
    let fill = |n: usize| filler.chars().cycle().take(n).collect::<String>();
    let total = width - len;
    let (left, right) = match justify {
        Justify::Left => (0, total),
        Justify::Right => (total, 0),
        Justify::Center => (total / 2, total - total / 2),
    };
    Ok(Value::string(format!("{}{}{}", fill(left), text, fill(right))))
}

/// `"12abc".to_i` reads the leading integer; no digits gives 0.
fn leading_int(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let mut n: i64 = 0;
    for c in digits.chars() {
        match c.to_digit(10) {
            Some(d) => n = n.saturating_mul(10).saturating_add(i64::from(d)),
            None if c == '_' => continue,
            None => break,
        }
    }
    if negative {
        -n
    } else {
        n
    }
}

fn leading_float(text: &str) -> f64 {
    let text = text.trim_start();
    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_exp = false;
    for (i, c) in text.char_indices() {
        let ok = match c {
            '0'..='9' | '_' => true,
            '+' | '-' => i == 0 || text[..i].ends_with(['e', 'E']),
            '.' if !seen_dot && !seen_exp => {
                seen_dot = true;
                true
            }
            'e' | 'E' if !seen_exp && i > 0 => {
                seen_exp = true;
                true
            }
            _ => false,
        };
        if !ok {
            break;
        }
        end = i + c.len_utf8();
    }
    let mut candidate = text[..end].replace('_', "");
    while !candidate.is_empty() {
        if let Ok(x) = candidate.parse::<f64>() {
            return x;
        }
        candidate.pop();
    }
    0.0
}

// ═══════════════════════════════════════════════════════════════════════
// Searching, splitting, substitution
// ═══════════════════════════════════════════════════════════════════════

/// A string argument becomes a literal pattern.
fn pattern_arg(value: &Value) -> Result<Rc<Regex>, EvalError> {
    match value {
        Value::Regex(re) => Ok(re.clone()),
        Value::Str(text) => Regex::new(&regex::escape(text))
            .map(Rc::new)
            .map_err(|e| EvalError::argument(e.to_string())),
        other => Err(EvalError::type_error(format!(
            "wrong argument type {} (expected Regexp)",
            other.type_name()
        ))),
    }
}

fn install_string_search(core: &CoreClasses) {
    let s = &core.string;

    define(s, "include?", 1, |_, this, args| {
        Ok(Value::Bool(this_str(this)?.contains(str_arg(&args.get(0))?)))
    });
    define(s, "start_with?", -1, |_, this, args| {
        let text = this_str(this)?;
        for prefix in &args.positional {
            let hit = match prefix {
                Value::Regex(re) => re.find(text).is_some_and(|m| m.start() == 0),
                other => text.starts_with(str_arg(other)?),
            };
            if hit {
                return Ok(Value::Bool(true));
            }
        }
        Ok(Value::Bool(false))
    });
    define(s, "end_with?", -1, |_, this, args| {
        let text = this_str(this)?;
        for suffix in &args.positional {
            if text.ends_with(str_arg(suffix)?) {
                return Ok(Value::Bool(true));
            }
        }
        Ok(Value::Bool(false))
    });
    define(s, "index", -1, |_, this, args| {
        args.check(1, 2)?;
        let text = this_str(this)?;
        let from = match args.get(1) {
            Value::Nil => 0,
            other => int_arg(&other)?,
        };
        let Some((start, _)) = slice_span(from, 0, text.chars().count()) else {
            return Ok(Value::Nil);
        };
        let offset = text.char_indices().nth(start).map_or(text.len(), |(b, _)| b);
        let found = pattern_arg(&args.get(0))?.find(&text[offset..]).map(|m| m.start() + offset);
        Ok(found
            .map(|b| Value::Long(byte_to_char(text, b) as i64))
            .unwrap_or(Value::Nil))
    });
    define(s, "count", 1, |_, this, args| {
        let arg = args.get(0);
        let set = str_arg(&arg)?;
        let n = this_str(this)?.chars().filter(|c| set.contains(*c)).count();
        Ok(Value::Long(n as i64))
    });

    define(s, "=~", 1, |_, this, args| {
        let text = this_str(this)?;
        match args.get(0) {
            Value::Regex(re) => Ok(match_position(&re, text)),
            other => Err(EvalError::type_error(format!(
                "wrong argument type {} (expected Regexp)",
                other.type_name()
            ))),
        }
    });
    define(s, "match", 1, |_, this, args| {
        let re = pattern_arg(&args.get(0))?;
        Ok(match_captures(&re, this_str(this)?))
    });
    define(s, "match?", 1, |_, this, args| {
        Ok(Value::Bool(pattern_arg(&args.get(0))?.is_match(this_str(this)?)))
    });
    define(s, "scan", 1, |_, this, args| {
        let text = this_str(this)?;
        let re = pattern_arg(&args.get(0))?;
        let found = re
            .captures_iter(text)
            .map(|caps| {
                if caps.len() == 1 {
                    Value::string(&caps[0])
                } else {
                    Value::array(
                        caps.iter()
                            .skip(1)
                            .map(|g| g.map_or(Value::Nil, |m| Value::string(m.as_str())))
                            .collect(),
                    )
                }
            })
            .collect();
        Ok(Value::array(found))
    });

    define(s, "sub", -1, |rt, this, args| substitute(rt, this, &args, Some(1)));
    define(s, "gsub", -1, |rt, this, args| substitute(rt, this, &args, None));
    define(s, "tr", 2, |_, this, args| {
        let from = chars_of(str_arg(&args.get(0))?);
        let to = chars_of(str_arg(&args.get(1))?);
        let translated = this_str(this)?
            .chars()
            .map(|c| match from.iter().position(|f| *f == c) {
                Some(i) => to.get(i).or(to.last()).copied().unwrap_or(c),
                None => c,
            })
            .collect::<String>();
        Ok(Value::string(translated))
    });

    define(s, "split", -1, |_, this, args| {
        args.check(0, 1)?;
        let text = this_str(this)?;
        let mut parts: Vec<String> = match args.get(0) {
            Value::Nil => text.split_whitespace().map(str::to_string).collect(),
            Value::Str(sep) if sep.as_ref() == " " => {
                text.split_whitespace().map(str::to_string).collect()
            }
            Value::Str(sep) if sep.is_empty() => text.chars().map(String::from).collect(),
            Value::Str(sep) => text.split(sep.as_ref()).map(str::to_string).collect(),
            Value::Regex(re) => re.split(text).map(str::to_string).collect(),
            other => {
                return Err(EvalError::type_error(format!(
                    "wrong argument type {} (expected Regexp)",
                    other.type_name()
                )))
            }
        };
        while parts.last().is_some_and(String::is_empty) {
            parts.pop();
        }
        Ok(Value::array(parts.into_iter().map(Value::string).collect()))
    });
}

fn match_position(re: &Regex, text: &str) -> Value {
    re.find(text)
        .map(|m| Value::Long(byte_to_char(text, m.start()) as i64))
        .unwrap_or(Value::Nil)
}

/// The whole match followed by each group, or `nil`.
fn match_captures(re: &Regex, text: &str) -> Value {
    match re.captures(text) {
        Some(caps) => Value::array(
            caps.iter()
                .map(|g| g.map_or(Value::Nil, |m| Value::string(m.as_str())))
                .collect(),
        ),
        None => Value::Nil,
    }
}

/// `sub`/`gsub`: a replacement string with `\1` style back-references, or
/// a block receiving the matched text.
fn substitute(
    rt: &Machine,
    this: &Value,
    args: &Args,
    limit: Option<usize>,
) -> Result<Value, EvalError> {
    let text = this_str(this)?;
    let re = pattern_arg(&args.get(0))?;
    let replacement = match (args.positional.get(1), &args.block) {
        (Some(value), _) => Replacement::Template(str_arg(value)?.to_string()),
        (None, Some(block)) => Replacement::Block(block.clone()),
        (None, None) => return Err(EvalError::arity(args.len(), 2)),
    };

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text).take(limit.unwrap_or(usize::MAX)) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&text[last..whole.start()]);
        match &replacement {
            Replacement::Template(template) => expand_template(template, &caps, &mut out),
            Replacement::Block(block) => {
                let result = yield_block(rt, block, vec![Value::string(whole.as_str())])?;
                out.push_str(&rt.display(&result)?);
            }
        }
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(Value::string(out))
}

enum Replacement {
    Template(String),
    Block(Rc<Proc>),
}

fn expand_template(template: &str, caps: &Captures<'_>, out: &mut String) {
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some(d) if d.is_ascii_digit() => {
                chars.next();
                let group = d.to_digit(10).unwrap_or(0) as usize;
                if let Some(m) = caps.get(group) {
                    out.push_str(m.as_str());
                }
            }
            Some('\\') => {
                chars.next();
                out.push('\\');
            }
            _ => out.push('\\'),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Slicing and iteration
// ═══════════════════════════════════════════════════════════════════════

fn install_string_slicing(core: &CoreClasses) {
    let s = &core.string;

    for name in ["[]", "slice"] {
        define(s, name, -1, |_, this, args| {
            args.check(1, 2)?;
            let text = this_str(this)?;
            let chars = chars_of(text);
            let span = match (args.get(0), args.positional.get(1)) {
                (Value::Range(range), None) => range_span(&range, chars.len())?,
                (Value::Str(needle), None) => {
                    return Ok(if text.contains(needle.as_ref()) {
                        Value::Str(needle)
                    } else {
                        Value::Nil
                    })
                }
                (Value::Regex(re), None) => {
                    return Ok(re.find(text).map_or(Value::Nil, |m| Value::string(m.as_str())))
                }
                (index, None) => {
                    let index = int_arg(&index)?;
                    return Ok(crate::value::resolve_index(index, chars.len())
                        .map_or(Value::Nil, |i| Value::string(chars[i].to_string())));
                }
                (start, Some(count)) => slice_span(int_arg(&start)?, int_arg(count)?, chars.len()),
            };
            Ok(span.map_or(Value::Nil, |(start, len)| {
                Value::string(chars[start..start + len].iter().collect::<String>())
            }))
        });
    }

    define(s, "chars", 0, |_, this, _| {
        Ok(Value::array(
            this_str(this)?.chars().map(|c| Value::string(c.to_string())).collect(),
        ))
    });
    define(s, "bytes", 0, |_, this, _| {
        Ok(Value::array(
            this_str(this)?.bytes().map(|b| Value::Long(i64::from(b))).collect(),
        ))
    });
    define(s, "lines", 0, |_, this, _| {
        Ok(Value::array(
            this_str(this)?.split_inclusive('\n').map(Value::string).collect(),
        ))
    });
    define(s, "each_char", 0, |rt, this, args| {
        let block = args.require_block()?;
        for c in this_str(this)?.chars() {
            yield_block(rt, &block, vec![Value::string(c.to_string())])?;
        }
        Ok(this.clone())
    });
    define(s, "each_line", 0, |rt, this, args| {
        let block = args.require_block()?;
        for line in this_str(this)?.split_inclusive('\n') {
            yield_block(rt, &block, vec![Value::string(line)])?;
        }
        Ok(this.clone())
    });
}

// ═══════════════════════════════════════════════════════════════════════
// Symbol
// ═══════════════════════════════════════════════════════════════════════

fn this_symbol(this: &Value) -> Result<&str, EvalError> {
    match this {
        Value::Symbol(name) => Ok(name),
        other => Err(wrong_receiver("Symbol", other)),
    }
}

fn install_symbol(core: &CoreClasses) {
    let y = &core.symbol;

    for name in ["to_s", "id2name", "name"] {
        define(y, name, 0, |_, this, _| Ok(Value::string(this_symbol(this)?)));
    }
    define(y, "to_sym", 0, |_, this, _| Ok(this.clone()));
    define(y, "inspect", 0, |_, this, _| Ok(Value::string(inspect(this))));
    define(y, "to_proc", 0, |_, this, _| {
        Ok(Value::proc(Proc::symbol(this_symbol(this)?)))
    });
    for name in ["length", "size"] {
        define(y, name, 0, |_, this, _| {
            Ok(Value::Long(this_symbol(this)?.chars().count() as i64))
        });
    }
    define(y, "upcase", 0, |_, this, _| Ok(Value::symbol(this_symbol(this)?.to_uppercase())));
    define(y, "downcase", 0, |_, this, _| Ok(Value::symbol(this_symbol(this)?.to_lowercase())));
    define(y, "<=>", 1, |_, this, args| {
        Ok(match args.get(0) {
            Value::Symbol(other) => Value::Long(match this_symbol(this)?.cmp(&other) {
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Equal => 0,
                std::cmp::Ordering::Greater => 1,
            }),
            _ => Value::Nil,
        })
    });
    define(y, "start_with?", 1, |_, this, args| {
        Ok(Value::Bool(this_symbol(this)?.starts_with(str_arg(&args.get(0))?)))
    });
    define(y, "end_with?", 1, |_, this, args| {
        Ok(Value::Bool(this_symbol(this)?.ends_with(str_arg(&args.get(0))?)))
    });
}

// ═══════════════════════════════════════════════════════════════════════
// Regexp
// ═══════════════════════════════════════════════════════════════════════

fn this_regex(this: &Value) -> Result<&Rc<Regex>, EvalError> {
    match this {
        Value::Regex(re) => Ok(re),
        other => Err(wrong_receiver("Regexp", other)),
    }
}

fn install_regexp(core: &CoreClasses) {
    let r = &core.regexp;

    define_static(r, "new", 1, |_, _, args| match args.get(0) {
        Value::Regex(re) => Ok(Value::Regex(re)),
        other => {
            let source = str_arg(&other)?;
            Regex::new(source)
                .map(|re| Value::Regex(Rc::new(re)))
                .map_err(|e| EvalError::argument(format!("invalid regex /{}/: {}", source, e)))
        }
    });
    define_static(r, "escape", 1, |_, _, args| {
        Ok(Value::string(regex::escape(str_arg(&args.get(0))?)))
    });

    define(r, "source", 0, |_, this, _| Ok(Value::string(this_regex(this)?.as_str())));
    define(r, "to_s", 0, |_, this, _| Ok(Value::string(this_regex(this)?.as_str())));
    define(r, "inspect", 0, |_, this, _| Ok(Value::string(inspect(this))));
    define(r, "match", 1, |rt, this, args| {
        let subject = args.get(0);
        if subject.is_nil() {
            return Ok(Value::Nil);
        }
        Ok(match_captures(this_regex(this)?, &rt.display(&subject)?))
    });
    define(r, "match?", 1, |rt, this, args| {
        let subject = args.get(0);
        if subject.is_nil() {
            return Ok(Value::Bool(false));
        }
        Ok(Value::Bool(this_regex(this)?.is_match(&rt.display(&subject)?)))
    });
    define(r, "=~", 1, |rt, this, args| {
        let subject = args.get(0);
        if subject.is_nil() {
            return Ok(Value::Nil);
        }
        Ok(match_position(this_regex(this)?, &rt.display(&subject)?))
    });
    define(r, "===", 1, |rt, this, args| {
        let subject = args.get(0);
        Ok(Value::Bool(match subject {
            Value::Str(_) | Value::Symbol(_) => this_regex(this)?.is_match(&rt.display(&subject)?),
            _ => false,
        }))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> Value {
        Machine::new().execute_text(src).unwrap()
    }

    #[test]
    fn test_leading_numbers() {
        assert_eq!(leading_int("  42abc"), 42);
        assert_eq!(leading_int("-1_000"), -1000);
        assert_eq!(leading_int("abc"), 0);
        assert_eq!(leading_float("3.5kg"), 3.5);
        assert_eq!(leading_float("1e3"), 1000.0);
        assert_eq!(leading_float("x"), 0.0);
    }

    #[test]
    fn test_split_drops_trailing_empties() {
        assert_eq!(
            run("'a,b,,'.split(',')"),
            Value::array(vec![Value::string("a"), Value::string("b")])
        );
        assert_eq!(
            run("' a  b '.split"),
            Value::array(vec![Value::string("a"), Value::string("b")])
        );
    }

    #[test]
    fn test_gsub_with_backreference() {
        assert_eq!(run("'john smith'.gsub(/(\\w+)/, '<\\\\1>')"), Value::string("<john> <smith>"));
    }

    #[test]
    fn test_sub_with_block() {
        assert_eq!(run("'abc'.sub('b') { |m| m.upcase }"), Value::string("aBc"));
    }

    #[test]
    fn test_slicing() {
        assert_eq!(run("'hello'[1]"), Value::string("e"));
        assert_eq!(run("'hello'[1, 3]"), Value::string("ell"));
        assert_eq!(run("'hello'[-3..-1]"), Value::string("llo"));
        assert_eq!(run("'hello'[9]"), Value::Nil);
    }

    #[test]
    fn test_strings_reject_mutation() {
        let err = Machine::new().execute_text("s = 'a'\ns.concat('b')").unwrap_err();
        assert_eq!(err.class_name(), "FrozenError");
    }

    #[test]
    fn test_padding() {
        assert_eq!(run("'ab'.center(6, '*')"), Value::string("**ab**"));
        assert_eq!(run("'ab'.rjust(4)"), Value::string("  ab"));
    }
}
