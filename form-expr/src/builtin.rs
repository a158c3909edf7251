//! Safe built-in methods.
//!
//! The safe-method table lists, per primitive kind, the only methods a call
//! expression may invoke on a string, number, boolean or array. Anything not
//! listed is rejected before arguments are evaluated.
//!
//! String positions count Unicode scalar values (`char`s).

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use libm::{fabs, fmod, trunc};

use crate::error::{EvalError, EvalResult};
use crate::interpreter::Interpreter;
use crate::value::{number_to_string, to_uint32, Value, MAX_SAFE_INTEGER};

/// Built-in method implementation: interpreter, receiver, arguments.
pub type Builtin = fn(&mut Interpreter, &Value, &[Value]) -> EvalResult<Value>;

/// Methods callable on strings.
pub const STRING_METHODS: &[(&str, Builtin)] = &[
    ("at", string_at),
    ("charAt", string_char_at),
    ("charCodeAt", string_char_code_at),
    ("concat", string_concat),
    ("endsWith", string_ends_with),
    ("includes", string_includes),
    ("indexOf", string_index_of),
    ("lastIndexOf", string_last_index_of),
    ("padEnd", string_pad_end),
    ("padStart", string_pad_start),
    ("repeat", string_repeat),
    ("replace", string_replace),
    ("replaceAll", string_replace_all),
    ("slice", string_slice),
    ("split", string_split),
    ("startsWith", string_starts_with),
    ("substring", string_substring),
    ("toLowerCase", string_to_lower_case),
    ("toString", string_to_string),
    ("toUpperCase", string_to_upper_case),
    ("trim", string_trim),
    ("trimEnd", string_trim_end),
    ("trimStart", string_trim_start),
];

/// Methods callable on numbers.
pub const NUMBER_METHODS: &[(&str, Builtin)] = &[
    ("toFixed", number_to_fixed),
    ("toString", number_to_string_method),
];

/// Methods callable on booleans.
pub const BOOLEAN_METHODS: &[(&str, Builtin)] = &[("toString", boolean_to_string)];

/// Methods callable on arrays.
pub const ARRAY_METHODS: &[(&str, Builtin)] = &[
    ("at", array_at),
    ("concat", array_concat),
    ("every", array_every),
    ("filter", array_filter),
    ("find", array_find),
    ("findIndex", array_find_index),
    ("includes", array_includes),
    ("indexOf", array_index_of),
    ("join", array_join),
    ("lastIndexOf", array_last_index_of),
    ("map", array_map),
    ("reduce", array_reduce),
    ("slice", array_slice),
    ("some", array_some),
];

/// Longest string `repeat`/`padStart`/`padEnd` will build.
const MAX_STRING_LENGTH: usize = 1 << 28;

/// Fraction digits that cover the exact decimal expansion of any `f64`.
const EXACT_DIGITS: usize = 1100;

/// The method table for a receiver, if its kind has one.
pub fn method_table(receiver: &Value) -> Option<&'static [(&'static str, Builtin)]> {
    match receiver {
        Value::String(_) => Some(STRING_METHODS),
        Value::Number(_) => Some(NUMBER_METHODS),
        Value::Boolean(_) => Some(BOOLEAN_METHODS),
        Value::Array(_) => Some(ARRAY_METHODS),
        _ => None,
    }
}

/// Look up an allowed method for a receiver.
pub fn lookup(receiver: &Value, name: &str) -> Option<(&'static str, Builtin)> {
    method_table(receiver)?
        .iter()
        .find(|(method, _)| *method == name)
        .copied()
}

/// Check whether `name` may be called on `receiver`.
pub fn is_allowed(receiver: &Value, name: &str) -> bool {
    lookup(receiver, name).is_some()
}

/// Invoke an allowed method.
pub fn call_method(
    interp: &mut Interpreter,
    receiver: &Value,
    name: &str,
    args: &[Value],
) -> EvalResult<Value> {
    match lookup(receiver, name) {
        Some((_, method)) => method(interp, receiver, args),
        None => Err(EvalError::method(format!(
            "Method '{}' is not supported on {}",
            name,
            receiver.kind_name()
        ))),
    }
}

// Argument helpers

fn integer_arg(args: &[Value], index: usize, method: &str, default: f64) -> EvalResult<f64> {
    match args.get(index) {
        None | Some(Value::Undefined) => Ok(default),
        Some(Value::Number(n)) if n.is_nan() => Ok(0.0),
        Some(Value::Number(n)) => Ok(trunc(*n)),
        Some(other) => Err(EvalError::operand(format!(
            "{}: expected a number argument, got {}",
            method,
            other.kind_name()
        ))),
    }
}

fn string_arg(args: &[Value], index: usize, method: &str) -> EvalResult<String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(EvalError::operand(format!(
            "{}: expected a string argument, got {}",
            method,
            other.kind_name()
        ))),
        None => Err(EvalError::operand(format!(
            "{}: expected a string argument",
            method
        ))),
    }
}

fn callback_arg(args: &[Value], method: &str) -> EvalResult<Value> {
    match args.first() {
        Some(f @ Value::Function(_)) => Ok(f.clone()),
        Some(other) => Err(EvalError::operand(format!(
            "{}: {} is not a function",
            method,
            other.kind_name()
        ))),
        None => Err(EvalError::operand(format!(
            "{}: undefined is not a function",
            method
        ))),
    }
}

/// Resolve a relative index (negative counts from the end) into `0..=len`.
fn relative_index(relative: f64, len: usize) -> usize {
    if relative < 0.0 {
        let from_end = len as f64 + relative;
        if from_end < 0.0 {
            0
        } else {
            from_end as usize
        }
    } else if relative > len as f64 {
        len
    } else {
        relative as usize
    }
}

/// Clamp an absolute index into `0..=len`.
fn clamp_index(value: f64, len: usize) -> usize {
    if value <= 0.0 {
        0
    } else if value >= len as f64 {
        len
    } else {
        value as usize
    }
}

fn receiver_chars(this: &Value) -> Vec<char> {
    match this {
        Value::String(s) => s.chars().collect(),
        other => other.to_js_string().chars().collect(),
    }
}

fn receiver_items(this: &Value) -> &[Value] {
    this.as_array().unwrap_or(&[])
}

fn find_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}

fn rfind_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    let last = from.min(haystack.len() - needle.len());
    (0..=last)
        .rev()
        .find(|&i| haystack[i..i + needle.len()] == *needle)
}

// String methods

fn string_at(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let chars = receiver_chars(this);
    let n = integer_arg(args, 0, "at", 0.0)?;
    let index = if n < 0.0 { chars.len() as f64 + n } else { n };
    if index < 0.0 || index >= chars.len() as f64 {
        return Ok(Value::Undefined);
    }
    Ok(Value::String(chars[index as usize].to_string()))
}

fn string_char_at(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let chars = receiver_chars(this);
    let n = integer_arg(args, 0, "charAt", 0.0)?;
    if n < 0.0 || n >= chars.len() as f64 {
        return Ok(Value::string(""));
    }
    Ok(Value::String(chars[n as usize].to_string()))
}

fn string_char_code_at(
    _interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
) -> EvalResult<Value> {
    let chars = receiver_chars(this);
    let n = integer_arg(args, 0, "charCodeAt", 0.0)?;
    if n < 0.0 || n >= chars.len() as f64 {
        return Ok(Value::Number(f64::NAN));
    }
    Ok(Value::Number(chars[n as usize] as u32 as f64))
}

fn string_concat(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut result = this.to_js_string();
    for arg in args {
        result.push_str(&arg.to_js_string());
    }
    Ok(Value::String(result))
}

fn string_ends_with(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let chars = receiver_chars(this);
    let search: Vec<char> = string_arg(args, 0, "endsWith")?.chars().collect();
    let end = clamp_index(integer_arg(args, 1, "endsWith", chars.len() as f64)?, chars.len());
    Ok(Value::Boolean(chars[..end].ends_with(&search)))
}

fn string_includes(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let chars = receiver_chars(this);
    let search: Vec<char> = string_arg(args, 0, "includes")?.chars().collect();
    let from = clamp_index(integer_arg(args, 1, "includes", 0.0)?, chars.len());
    Ok(Value::Boolean(find_chars(&chars, &search, from).is_some()))
}

fn string_index_of(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let chars = receiver_chars(this);
    let search: Vec<char> = string_arg(args, 0, "indexOf")?.chars().collect();
    let from = clamp_index(integer_arg(args, 1, "indexOf", 0.0)?, chars.len());
    Ok(match find_chars(&chars, &search, from) {
        Some(i) => Value::from(i),
        None => Value::Number(-1.0),
    })
}

fn string_last_index_of(
    _interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
) -> EvalResult<Value> {
    let chars = receiver_chars(this);
    let search: Vec<char> = string_arg(args, 0, "lastIndexOf")?.chars().collect();
    let from = clamp_index(
        integer_arg(args, 1, "lastIndexOf", f64::INFINITY)?,
        chars.len(),
    );
    Ok(match rfind_chars(&chars, &search, from) {
        Some(i) => Value::from(i),
        None => Value::Number(-1.0),
    })
}

fn pad(this: &Value, args: &[Value], method: &str, at_start: bool) -> EvalResult<Value> {
    let s = this.to_js_string();
    let len = s.chars().count();
    let target = integer_arg(args, 0, method, 0.0)?;
    let filler = match args.get(1) {
        None | Some(Value::Undefined) => String::from(" "),
        Some(_) => string_arg(args, 1, method)?,
    };

    if target <= len as f64 || filler.is_empty() {
        return Ok(Value::String(s));
    }
    if target > MAX_STRING_LENGTH as f64 {
        return Err(EvalError::operand(format!("{}: invalid string length", method)));
    }

    let padding: String = filler.chars().cycle().take(target as usize - len).collect();
    Ok(Value::String(if at_start {
        padding + &s
    } else {
        s + &padding
    }))
}

fn string_pad_end(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    pad(this, args, "padEnd", false)
}

fn string_pad_start(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    pad(this, args, "padStart", true)
}

fn string_repeat(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = this.to_js_string();
    let count = integer_arg(args, 0, "repeat", 0.0)?;
    if count < 0.0 || count.is_infinite() {
        return Err(EvalError::operand(format!(
            "repeat: invalid count value {}",
            number_to_string(count)
        )));
    }
    if s.len() as f64 * count > MAX_STRING_LENGTH as f64 {
        return Err(EvalError::operand("repeat: invalid string length"));
    }
    Ok(Value::String(s.repeat(count as usize)))
}

/// Expand `$$`, `$&`, `` $` `` and `$'` in a replacement string.
fn expand_replacement(template: &str, matched: &str, before: &str, after: &str) -> String {
    let mut result = String::new();
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        match chars.peek() {
            Some('$') => result.push('$'),
            Some('&') => result.push_str(matched),
            Some('`') => result.push_str(before),
            Some('\'') => result.push_str(after),
            _ => {
                result.push('$');
                continue;
            }
        }
        chars.next();
    }
    result
}

fn replace(
    interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
    method: &str,
    all: bool,
) -> EvalResult<Value> {
    let s = this.to_js_string();
    let chars: Vec<char> = s.chars().collect();
    let pattern = string_arg(args, 0, method)?;
    let needle: Vec<char> = pattern.chars().collect();
    let replacement = match args.get(1) {
        Some(v @ (Value::String(_) | Value::Function(_))) => v.clone(),
        Some(other) => Value::String(other.to_js_string()),
        None => Value::string("undefined"),
    };

    // Match positions (char offsets); an empty pattern matches between chars
    let mut positions = Vec::new();
    let mut from = 0;
    while let Some(found) = find_chars(&chars, &needle, from) {
        positions.push(found);
        if !all {
            break;
        }
        from = found + needle.len().max(1);
        if from > chars.len() {
            break;
        }
    }

    let mut result = String::new();
    let mut last = 0;
    for position in positions {
        result.extend(&chars[last..position]);
        let before: String = chars[..position].iter().collect();
        let after: String = chars[position + needle.len()..].iter().collect();
        let text = match &replacement {
            Value::Function(_) => interp
                .call_function(
                    &replacement,
                    &Value::Undefined,
                    &[
                        Value::String(pattern.clone()),
                        Value::from(position),
                        Value::String(s.clone()),
                    ],
                )?
                .to_js_string(),
            other => expand_replacement(&other.to_js_string(), &pattern, &before, &after),
        };
        result.push_str(&text);
        last = position + needle.len();
    }
    result.extend(&chars[last..]);

    Ok(Value::String(result))
}

fn string_replace(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    replace(interp, this, args, "replace", false)
}

fn string_replace_all(
    interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
) -> EvalResult<Value> {
    replace(interp, this, args, "replaceAll", true)
}

fn string_slice(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let chars = receiver_chars(this);
    let len = chars.len();
    let start = relative_index(integer_arg(args, 0, "slice", 0.0)?, len);
    let end = relative_index(integer_arg(args, 1, "slice", len as f64)?, len);
    if start >= end {
        return Ok(Value::string(""));
    }
    Ok(Value::String(chars[start..end].iter().collect()))
}

fn string_split(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = this.to_js_string();
    let limit = match args.get(1) {
        None | Some(Value::Undefined) => u32::MAX as usize,
        Some(Value::Number(n)) => to_uint32(*n) as usize,
        Some(other) => {
            return Err(EvalError::operand(format!(
                "split: expected a number limit, got {}",
                other.kind_name()
            )))
        }
    };

    let parts: Vec<Value> = match args.first() {
        None | Some(Value::Undefined) => alloc::vec![Value::String(s)],
        Some(_) => {
            let separator = string_arg(args, 0, "split")?;
            if separator.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(separator.as_str()).map(Value::from).collect()
            }
        }
    };

    Ok(Value::array(parts.into_iter().take(limit)))
}

fn string_starts_with(
    _interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
) -> EvalResult<Value> {
    let chars = receiver_chars(this);
    let search: Vec<char> = string_arg(args, 0, "startsWith")?.chars().collect();
    let from = clamp_index(integer_arg(args, 1, "startsWith", 0.0)?, chars.len());
    Ok(Value::Boolean(chars[from..].starts_with(&search)))
}

fn string_substring(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let chars = receiver_chars(this);
    let len = chars.len();
    let a = clamp_index(integer_arg(args, 0, "substring", 0.0)?, len);
    let b = clamp_index(integer_arg(args, 1, "substring", len as f64)?, len);
    let (start, end) = if a <= b { (a, b) } else { (b, a) };
    Ok(Value::String(chars[start..end].iter().collect()))
}

fn string_to_lower_case(
    _interp: &mut Interpreter,
    this: &Value,
    _args: &[Value],
) -> EvalResult<Value> {
    Ok(Value::String(this.to_js_string().to_lowercase()))
}

fn string_to_string(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::String(this.to_js_string()))
}

fn string_to_upper_case(
    _interp: &mut Interpreter,
    this: &Value,
    _args: &[Value],
) -> EvalResult<Value> {
    Ok(Value::String(this.to_js_string().to_uppercase()))
}

fn string_trim(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::string(this.to_js_string().trim()))
}

fn string_trim_end(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::string(this.to_js_string().trim_end()))
}

fn string_trim_start(
    _interp: &mut Interpreter,
    this: &Value,
    _args: &[Value],
) -> EvalResult<Value> {
    Ok(Value::string(this.to_js_string().trim_start()))
}

// Number methods

fn receiver_number(this: &Value) -> f64 {
    this.as_number().unwrap_or(f64::NAN)
}

fn number_to_fixed(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let x = receiver_number(this);
    let digits = integer_arg(args, 0, "toFixed", 0.0)?;
    if !(0.0..=100.0).contains(&digits) {
        return Err(EvalError::operand(
            "toFixed() digits argument must be between 0 and 100",
        ));
    }
    Ok(Value::String(to_fixed(x, digits as usize)))
}

/// `Number::toFixed`: exact decimal value, ties round up.
pub fn to_fixed(x: f64, digits: usize) -> String {
    if !x.is_finite() || fabs(x) >= 1e21 {
        return number_to_string(x);
    }

    let exact = format!("{:.*}", EXACT_DIGITS, fabs(x));
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));

    let mut kept: Vec<u8> = int_part.bytes().collect();
    kept.extend(frac_part.bytes().take(digits));
    while kept.len() < int_part.len() + digits {
        kept.push(b'0');
    }
    let mut int_len = int_part.len();

    if frac_part.as_bytes().get(digits).is_some_and(|d| *d >= b'5') {
        let mut i = kept.len();
        loop {
            if i == 0 {
                kept.insert(0, b'1');
                int_len += 1;
                break;
            }
            i -= 1;
            if kept[i] == b'9' {
                kept[i] = b'0';
            } else {
                kept[i] += 1;
                break;
            }
        }
    }

    let mut result = String::new();
    if x < 0.0 {
        result.push('-');
    }
    result.extend(kept[..int_len].iter().map(|&b| b as char));
    if digits > 0 {
        result.push('.');
        result.extend(kept[int_len..].iter().map(|&b| b as char));
    }
    result
}

fn number_to_string_method(
    _interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
) -> EvalResult<Value> {
    let x = receiver_number(this);
    let radix = integer_arg(args, 0, "toString", 10.0)?;
    if !(2.0..=36.0).contains(&radix) {
        return Err(EvalError::operand(
            "toString() radix must be between 2 and 36",
        ));
    }
    Ok(Value::String(number_to_radix_string(x, radix as u32)))
}

/// Format a number in the given radix.
fn number_to_radix_string(x: f64, radix: u32) -> String {
    if radix == 10 || !x.is_finite() {
        return number_to_string(x);
    }

    let base = radix as f64;
    let abs = fabs(x);
    let mut int = trunc(abs);
    let mut frac = abs - int;

    // Digits below the 53-bit significand are not represented
    let mut int_digits = Vec::new();
    while int / base >= MAX_SAFE_INTEGER + 1.0 {
        int /= base;
        int_digits.push('0');
    }
    loop {
        let digit = fmod(int, base);
        int_digits.push(char::from_digit(digit as u32, radix).unwrap_or('0'));
        int = (int - digit) / base;
        if int < 1.0 {
            break;
        }
    }

    let mut result = String::new();
    if x < 0.0 {
        result.push('-');
    }
    result.extend(int_digits.iter().rev());

    if frac > 0.0 {
        result.push('.');
        for _ in 0..52 {
            frac *= base;
            let digit = trunc(frac);
            result.push(char::from_digit(digit as u32, radix).unwrap_or('0'));
            frac -= digit;
            if frac <= 0.0 {
                break;
            }
        }
    }

    result
}

// Boolean methods

fn boolean_to_string(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::String(this.to_js_string()))
}

// Array methods

fn array_at(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = receiver_items(this);
    let n = integer_arg(args, 0, "at", 0.0)?;
    let index = if n < 0.0 { items.len() as f64 + n } else { n };
    if index < 0.0 || index >= items.len() as f64 {
        return Ok(Value::Undefined);
    }
    Ok(items[index as usize].clone())
}

fn array_concat(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut result: Vec<Value> = receiver_items(this).to_vec();
    for arg in args {
        match arg {
            Value::Array(items) => result.extend(items.iter().cloned()),
            other => result.push(other.clone()),
        }
    }
    Ok(Value::from(result))
}

/// Call `callback(element, index, array)` for each element until `visit`
/// returns `false`.
fn for_each_result<F>(
    interp: &mut Interpreter,
    this: &Value,
    callback: &Value,
    mut visit: F,
) -> EvalResult<()>
where
    F: FnMut(usize, &Value, Value) -> bool,
{
    let items = receiver_items(this);
    for (index, item) in items.iter().enumerate() {
        let result = interp.call_function(
            callback,
            &Value::Undefined,
            &[item.clone(), Value::from(index), this.clone()],
        )?;
        if !visit(index, item, result) {
            break;
        }
    }
    Ok(())
}

fn array_every(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let callback = callback_arg(args, "every")?;
    let mut all = true;
    for_each_result(interp, this, &callback, |_, _, result| {
        all = result.to_boolean();
        all
    })?;
    Ok(Value::Boolean(all))
}

fn array_some(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let callback = callback_arg(args, "some")?;
    let mut any = false;
    for_each_result(interp, this, &callback, |_, _, result| {
        any = result.to_boolean();
        !any
    })?;
    Ok(Value::Boolean(any))
}

fn array_filter(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let callback = callback_arg(args, "filter")?;
    let mut kept = Vec::new();
    for_each_result(interp, this, &callback, |_, item, result| {
        if result.to_boolean() {
            kept.push(item.clone());
        }
        true
    })?;
    Ok(Value::from(kept))
}

fn array_find(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let callback = callback_arg(args, "find")?;
    let mut found = Value::Undefined;
    for_each_result(interp, this, &callback, |_, item, result| {
        if result.to_boolean() {
            found = item.clone();
            return false;
        }
        true
    })?;
    Ok(found)
}

fn array_find_index(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let callback = callback_arg(args, "findIndex")?;
    let mut found = -1.0;
    for_each_result(interp, this, &callback, |index, _, result| {
        if result.to_boolean() {
            found = index as f64;
            return false;
        }
        true
    })?;
    Ok(Value::Number(found))
}

fn array_map(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let callback = callback_arg(args, "map")?;
    let mut mapped = Vec::with_capacity(receiver_items(this).len());
    for_each_result(interp, this, &callback, |_, _, result| {
        mapped.push(result);
        true
    })?;
    Ok(Value::from(mapped))
}

fn array_reduce(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let callback = callback_arg(args, "reduce")?;
    let items = receiver_items(this);

    let (mut accumulator, start) = match args.get(1) {
        Some(initial) => (initial.clone(), 0),
        None => match items.first() {
            Some(first) => (first.clone(), 1),
            None => {
                return Err(EvalError::operand(
                    "reduce: empty array with no initial value",
                ))
            }
        },
    };

    for (index, item) in items.iter().enumerate().skip(start) {
        accumulator = interp.call_function(
            &callback,
            &Value::Undefined,
            &[accumulator, item.clone(), Value::from(index), this.clone()],
        )?;
    }

    Ok(accumulator)
}

fn array_includes(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = receiver_items(this);
    let search = args.first().cloned().unwrap_or_default();
    let from = relative_index(integer_arg(args, 1, "includes", 0.0)?, items.len());
    Ok(Value::Boolean(
        items[from..].iter().any(|item| item.same_value_zero(&search)),
    ))
}

fn array_index_of(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = receiver_items(this);
    let search = args.first().cloned().unwrap_or_default();
    let from = relative_index(integer_arg(args, 1, "indexOf", 0.0)?, items.len());
    Ok(
        match items[from..].iter().position(|item| item.strict_equals(&search)) {
            Some(i) => Value::from(from + i),
            None => Value::Number(-1.0),
        },
    )
}

fn array_last_index_of(
    _interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
) -> EvalResult<Value> {
    let items = receiver_items(this);
    let search = args.first().cloned().unwrap_or_default();
    if items.is_empty() {
        return Ok(Value::Number(-1.0));
    }
    let from = integer_arg(args, 1, "lastIndexOf", items.len() as f64 - 1.0)?;
    let last = if from < 0.0 {
        items.len() as f64 + from
    } else {
        from.min(items.len() as f64 - 1.0)
    };
    if last < 0.0 {
        return Ok(Value::Number(-1.0));
    }
    Ok(
        match items[..=last as usize]
            .iter()
            .rposition(|item| item.strict_equals(&search))
        {
            Some(i) => Value::from(i),
            None => Value::Number(-1.0),
        },
    )
}

fn array_join(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let separator = match args.first() {
        None | Some(Value::Undefined) => String::from(","),
        Some(_) => string_arg(args, 0, "join")?,
    };

    let parts: Vec<String> = receiver_items(this)
        .iter()
        .map(|item| {
            if item.is_nullish() {
                String::new()
            } else {
                item.to_js_string()
            }
        })
        .collect();

    Ok(Value::String(parts.join(&separator)))
}

fn array_slice(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = receiver_items(this);
    let len = items.len();
    let start = relative_index(integer_arg(args, 0, "slice", 0.0)?, len);
    let end = relative_index(integer_arg(args, 1, "slice", len as f64)?, len);
    if start >= end {
        return Ok(Value::array([]));
    }
    Ok(Value::array(items[start..end].iter().cloned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    fn call(receiver: Value, name: &str, args: &[Value]) -> EvalResult<Value> {
        let mut interp = Interpreter::new(Context::new());
        call_method(&mut interp, &receiver, name, args)
    }

    #[test]
    fn test_table_membership() {
        assert!(is_allowed(&Value::from("s"), "toUpperCase"));
        assert!(!is_allowed(&Value::from("s"), "constructor"));
        assert!(is_allowed(&Value::from(1), "toFixed"));
        assert!(!is_allowed(&Value::from(1), "valueOf"));
        assert!(is_allowed(&Value::from(true), "toString"));
        assert!(is_allowed(&Value::array([]), "map"));
        assert!(!is_allowed(&Value::array([]), "push"));
        assert!(!is_allowed(&Value::Null, "toString"));
    }

    #[test]
    fn test_disallowed_method_error() {
        let err = call(Value::from("ab"), "constructor", &[]).unwrap_err();
        assert!(matches!(err, EvalError::MethodNotAllowed(_)));
    }

    #[test]
    fn test_string_search() {
        let s = Value::from("hello world");
        assert_eq!(call(s.clone(), "indexOf", &["o".into()]).unwrap(), Value::from(4));
        assert_eq!(call(s.clone(), "lastIndexOf", &["o".into()]).unwrap(), Value::from(7));
        assert_eq!(call(s.clone(), "includes", &["wor".into()]).unwrap(), Value::from(true));
        assert_eq!(call(s.clone(), "startsWith", &["world".into(), 6.into()]).unwrap(), Value::from(true));
        assert_eq!(call(s.clone(), "endsWith", &["hello".into(), 5.into()]).unwrap(), Value::from(true));
        assert_eq!(call(s, "indexOf", &["z".into()]).unwrap(), Value::from(-1));
    }

    #[test]
    fn test_pattern_must_be_a_string() {
        let err = call(Value::from("abc"), "includes", &[Value::from(1)]).unwrap_err();
        assert!(matches!(err, EvalError::InvalidOperandType(_)));
    }

    #[test]
    fn test_string_slicing() {
        let s = Value::from("form-expr");
        assert_eq!(call(s.clone(), "slice", &[(-4).into()]).unwrap(), Value::from("expr"));
        assert_eq!(call(s.clone(), "substring", &[4.into(), 0.into()]).unwrap(), Value::from("form"));
        assert_eq!(call(s.clone(), "at", &[(-1).into()]).unwrap(), Value::from("r"));
        assert_eq!(call(s.clone(), "charAt", &[20.into()]).unwrap(), Value::from(""));
        assert_eq!(call(s, "charCodeAt", &[0.into()]).unwrap(), Value::from(102));
    }

    #[test]
    fn test_string_transforms() {
        assert_eq!(call("ab".into(), "padStart", &[5.into(), "xy".into()]).unwrap(), Value::from("xyxab"));
        assert_eq!(call("ab".into(), "padEnd", &[4.into()]).unwrap(), Value::from("ab  "));
        assert_eq!(call("ab".into(), "repeat", &[3.into()]).unwrap(), Value::from("ababab"));
        assert!(call("ab".into(), "repeat", &[(-1).into()]).is_err());
        assert_eq!(call("  x ".into(), "trim", &[]).unwrap(), Value::from("x"));
        assert_eq!(call("a".into(), "concat", &[1.into(), true.into()]).unwrap(), Value::from("a1true"));
    }

    #[test]
    fn test_replace() {
        assert_eq!(call("a-b-c".into(), "replace", &["-".into(), "+".into()]).unwrap(), Value::from("a+b-c"));
        assert_eq!(call("a-b-c".into(), "replaceAll", &["-".into(), "+".into()]).unwrap(), Value::from("a+b+c"));
        assert_eq!(call("abc".into(), "replaceAll", &["".into(), "-".into()]).unwrap(), Value::from("-a-b-c-"));
        assert_eq!(call("cost".into(), "replace", &["cost".into(), "$&: $$5".into()]).unwrap(), Value::from("cost: $5"));
    }

    #[test]
    fn test_split() {
        let parts = call("a,b,,c".into(), "split", &[",".into()]).unwrap();
        assert_eq!(parts, Value::array(["a", "b", "", "c"].map(Value::from)));
        let chars = call("abc".into(), "split", &["".into(), 2.into()]).unwrap();
        assert_eq!(chars, Value::array(["a", "b"].map(Value::from)));
        let whole = call("abc".into(), "split", &[]).unwrap();
        assert_eq!(whole, Value::array([Value::from("abc")]));
    }

    #[test]
    fn test_to_fixed() {
        assert_eq!(to_fixed(3.14159, 2), "3.14");
        assert_eq!(to_fixed(2.5, 0), "3");
        assert_eq!(to_fixed(1.005, 2), "1.00");
        assert_eq!(to_fixed(9.995, 2), "9.99");
        assert_eq!(to_fixed(99.5, 0), "100");
        assert_eq!(to_fixed(-1.5, 0), "-2");
        assert_eq!(to_fixed(42.0, 3), "42.000");
        assert_eq!(to_fixed(1e21, 2), "1e+21");
        assert!(call(1.into(), "toFixed", &[101.into()]).is_err());
    }

    #[test]
    fn test_number_to_string_radix() {
        assert_eq!(call(255.into(), "toString", &[16.into()]).unwrap(), Value::from("ff"));
        assert_eq!(call(5.into(), "toString", &[2.into()]).unwrap(), Value::from("101"));
        assert_eq!(call(0.5.into(), "toString", &[2.into()]).unwrap(), Value::from("0.1"));
        assert_eq!(call(1.5.into(), "toString", &[]).unwrap(), Value::from("1.5"));
        assert!(call(1.into(), "toString", &[1.into()]).is_err());
    }

    #[test]
    fn test_radix_string_beyond_safe_integers() {
        let big = number_to_radix_string(-1e300, 36);
        assert!(big.starts_with('-'));
        assert_eq!(big.len(), 194);
        assert!(big.ends_with(&"0".repeat(150)));

        let expected = format!("1{}", "0".repeat(60));
        assert_eq!(number_to_radix_string(libm::pow(2.0, 60.0), 2), expected);
        assert_eq!(number_to_radix_string(9007199254740991.0, 16), "1fffffffffffff");
    }

    #[test]
    fn test_array_queries() {
        let arr = Value::array([1, 2, 3, 2].map(Value::from));
        assert_eq!(call(arr.clone(), "indexOf", &[2.into()]).unwrap(), Value::from(1));
        assert_eq!(call(arr.clone(), "lastIndexOf", &[2.into()]).unwrap(), Value::from(3));
        assert_eq!(call(arr.clone(), "includes", &[3.into()]).unwrap(), Value::from(true));
        assert_eq!(call(arr.clone(), "at", &[(-1).into()]).unwrap(), Value::from(2));
        assert_eq!(call(arr.clone(), "join", &["-".into()]).unwrap(), Value::from("1-2-3-2"));
        assert_eq!(
            call(arr.clone(), "slice", &[1.into(), (-1).into()]).unwrap(),
            Value::array([2, 3].map(Value::from))
        );
        assert_eq!(
            call(arr, "concat", &[Value::array([Value::from(5)]), 6.into()]).unwrap(),
            Value::array([1, 2, 3, 2, 5, 6].map(Value::from))
        );
    }

    #[test]
    fn test_array_includes_nan() {
        let arr = Value::array([Value::from(f64::NAN)]);
        assert_eq!(call(arr.clone(), "includes", &[f64::NAN.into()]).unwrap(), Value::from(true));
        assert_eq!(call(arr, "indexOf", &[f64::NAN.into()]).unwrap(), Value::from(-1));
    }

    #[test]
    fn test_callbacks_receive_index_and_array() {
        let arr = Value::array([10, 20].map(Value::from));
        let callback = Value::native("cb", 3, |_, args| {
            let len = args[2].as_array().map_or(0, |a| a.len());
            Ok(Value::from(args[0].as_number().unwrap_or(0.0) + args[1].as_number().unwrap_or(0.0) + len as f64))
        });
        assert_eq!(
            call(arr, "map", &[callback]).unwrap(),
            Value::array([12, 23].map(Value::from))
        );
    }

    #[test]
    fn test_non_callable_callback() {
        let arr = Value::array([Value::from(1)]);
        let err = call(arr, "map", &[Value::from(1)]).unwrap_err();
        assert!(matches!(err, EvalError::InvalidOperandType(_)));
    }

    #[test]
    fn test_reduce() {
        let add = Value::native("add", 2, |_, args| {
            Ok(Value::from(args[0].as_number().unwrap_or(0.0) + args[1].as_number().unwrap_or(0.0)))
        });
        let arr = Value::array([1, 2, 3].map(Value::from));
        assert_eq!(call(arr.clone(), "reduce", &[add.clone()]).unwrap(), Value::from(6));
        assert_eq!(call(arr, "reduce", &[add.clone(), 10.into()]).unwrap(), Value::from(16));
        assert!(call(Value::array([]), "reduce", &[add]).is_err());
    }
}
