//! Expression Identifier Scanner
//!
//! Extracts the names a scalar expression reads from. The scanner is a
//! single-pass lexer, not a parser: it only needs to tell value references
//! apart from everything else.
//!
//! An identifier is skipped when it is:
//!
//! - inside a string literal
//! - a property after `.` (`datum.price` reads `datum`, not `price`)
//! - an object literal key (`{label: x}` reads `x`)
//! - a built-in constant or keyword (`PI`, `true`, `datum`)
//! - the callee of a call to a built-in function (`max(a, b)`)
//!
//! A built-in function name that is *not* called is still a reference, and a
//! call to an unknown function counts its callee as a reference.

/// Functions provided by the expression engine.
pub const BUILTIN_FUNCTIONS: &[&str] = &[
    "abs", "acos", "asin", "atan", "atan2", "ceil", "clamp", "cos", "exp", "floor", "hypot",
    "log", "max", "min", "pow", "random", "round", "sin", "sqrt", "tan", "isArray",
    "isBoolean", "isDate", "isDefined", "isNumber", "isObject", "isRegExp", "isString",
    "isValid", "isNaN", "isFinite", "toBoolean", "toDate", "toNumber", "toString", "if",
    "indexof", "lastindexof", "length", "join", "reverse", "slice", "sort", "span", "extent",
    "sequence", "peek", "pad", "lower", "upper", "trim", "truncate", "replace", "split",
    "substring", "parseFloat", "parseInt", "format", "timeFormat", "timeParse", "utcFormat",
    "utcParse", "now", "datetime", "date", "day", "dayofyear", "year", "quarter", "month",
    "week", "hours", "minutes", "seconds", "milliseconds", "time", "timezoneoffset",
    "utc", "regexp", "test", "data", "indata", "merge", "inrange",
];

/// Names that never refer to a document variable.
pub const BUILTIN_CONSTANTS: &[&str] = &[
    "NaN", "Infinity", "E", "LN2", "LN10", "LOG2E", "LOG10E", "PI", "SQRT1_2", "SQRT2",
    "MIN_VALUE", "MAX_VALUE", "true", "false", "null", "undefined", "datum", "event", "item",
    "parent", "this", "typeof", "in", "new",
];

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Return the free identifiers of `expression`, deduplicated, in first-use
/// order.
pub fn scan_identifiers(expression: &str) -> Vec<String> {
    let chars: Vec<char> = expression.chars().collect();
    let mut found: Vec<String> = Vec::new();
    // Open brackets, innermost last. Used to recognise object keys.
    let mut brackets: Vec<char> = Vec::new();
    // Last significant (non-whitespace) character seen outside literals.
    let mut previous: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c == '"' || c == '\'' || c == '`' {
            i = skip_string(&chars, i);
            previous = Some(c);
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) {
            // Numbers, including exponents and hex digits.
            while i < chars.len() && (is_ident_continue(chars[i]) || chars[i] == '.') {
                i += 1;
            }
            previous = Some('0');
            continue;
        }

        if is_ident_start(c) {
            let start = i;
            while i < chars.len() && is_ident_continue(chars[i]) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let next = next_significant(&chars, i);

            let is_property = previous == Some('.') && !is_spread(&chars, start);
            let is_key = next == Some(':')
                && matches!(previous, Some('{') | Some(','))
                && brackets.last() == Some(&'{');
            let is_builtin_call =
                next == Some('(') && BUILTIN_FUNCTIONS.contains(&word.as_str());
            let is_constant = BUILTIN_CONSTANTS.contains(&word.as_str());

            if !(is_property || is_key || is_builtin_call || is_constant) && !found.contains(&word) {
                found.push(word);
            }
            previous = Some('a');
            continue;
        }

        match c {
            '(' | '[' | '{' => brackets.push(c),
            ')' | ']' | '}' => {
                brackets.pop();
            }
            _ => {}
        }
        previous = Some(c);
        i += 1;
    }

    found
}

/// Skip a string literal starting at `start`, returning the index after the
/// closing quote (or the end of input if unterminated).
fn skip_string(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

fn next_significant(chars: &[char], from: usize) -> Option<char> {
    chars[from..].iter().copied().find(|c| !c.is_whitespace())
}

/// Whether the identifier at `start` follows a `...` spread operator.
fn is_spread(chars: &[char], start: usize) -> bool {
    let before: Vec<char> = chars[..start]
        .iter()
        .rev()
        .copied()
        .filter(|c| !c.is_whitespace())
        .take(3)
        .collect();
    before == ['.', '.', '.']
}
