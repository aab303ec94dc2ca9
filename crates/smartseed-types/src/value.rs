//! Runtime values held by primitive statements and captured by probes.

use serde::{Deserialize, Serialize};

// ── Type Names ──────────────────────────────────────────────────────

/// A declared or returned type, in source notation (`int`, `java.lang.String`, `int[]`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeName(pub String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this names an array type.
    pub fn is_array(&self) -> bool {
        self.0.contains('[')
    }

    /// Whether this names a qualified (package-scoped) class.
    pub fn is_qualified(&self) -> bool {
        self.0.contains('.')
    }

    /// The type with any array markers removed (`a.B[][]` → `a.B`).
    pub fn element_type(&self) -> TypeName {
        match self.0.find('[') {
            Some(idx) => TypeName(self.0[..idx].to_string()),
            None => self.clone(),
        }
    }

    /// Internal-form name (`a/b/C`) for comparison with bytecode owners.
    pub fn internal_name(&self) -> String {
        self.0.replace('.', "/")
    }

    /// Simple name without package (`java.lang.String` → `String`).
    pub fn simple_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TypeName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── Values ──────────────────────────────────────────────────────────

/// A concrete value flowing through a test execution.
///
/// Mirrors the boxed primitive values of the program under test. `Object` stands in for any
/// non-primitive instance and only carries its runtime type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Char(char),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Object(TypeName),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the value takes part in numeric comparison (characters included, booleans not).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Char(_)
                | Value::Byte(_)
                | Value::Short(_)
                | Value::Int(_)
                | Value::Long(_)
                | Value::Float(_)
                | Value::Double(_)
        )
    }

    /// Integer view of a numeric value; floating values are truncated toward zero.
    ///
    /// Characters map to their digit value in radix 36, `-1` when they have none.
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Value::Char(c) => Some(char_numeric_value(*c)),
            Value::Byte(v) => Some(*v as i128),
            Value::Short(v) => Some(*v as i128),
            Value::Int(v) => Some(*v as i128),
            Value::Long(v) => Some(*v as i128),
            Value::Float(v) => Some(saturating_trunc(*v as f64)),
            Value::Double(v) => Some(saturating_trunc(*v)),
            _ => None,
        }
    }

    /// Floating view of a numeric value.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Char(c) => Some(char_numeric_value(*c) as f64),
            Value::Byte(v) => Some(*v as f64),
            Value::Short(v) => Some(*v as f64),
            Value::Int(v) => Some(*v as f64),
            Value::Long(v) => Some(*v as f64),
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// The type name a statement holding this value would declare.
    pub fn type_name(&self) -> TypeName {
        let name = match self {
            Value::Null => "java.lang.Object",
            Value::Bool(_) => "boolean",
            Value::Char(_) => "char",
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Str(_) => "java.lang.String",
            Value::Object(ty) => return ty.clone(),
        };
        TypeName::new(name)
    }
}

fn char_numeric_value(c: char) -> i128 {
    c.to_digit(36).map(|d| d as i128).unwrap_or(-1)
}

fn saturating_trunc(v: f64) -> i128 {
    if v.is_nan() {
        0
    } else {
        // `as` saturates at the integer bounds
        v.trunc() as i64 as i128
    }
}

fn write_float(f: &mut std::fmt::Formatter<'_>, v: f64) -> std::fmt::Result {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e7 {
        write!(f, "{:.1}", v)
    } else {
        write!(f, "{}", v)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write_float(f, *v as f64),
            Value::Double(v) => write_float(f, *v),
            Value::Str(v) => write!(f, "{}", v),
            Value::Object(ty) => write!(f, "{}@object", ty),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}
