//! Type descriptors.
//!
//! A [`TypeDescriptor`] names a class (or primitive, array or type
//! parameter) and optionally carries generic arguments. Identity is the
//! erased name only: `List<String>` and `List<Integer>` compare equal, the
//! arguments being a resolved overlay on top of the same class.

use std::fmt;
use std::hash::{Hash, Hasher};

use gravy_ast::TypeRef;

/// Qualified names of the types the engine itself refers to.
pub mod names {
    pub const OBJECT: &str = "java.lang.Object";
    pub const STRING: &str = "java.lang.String";
    pub const CHAR_SEQUENCE: &str = "java.lang.CharSequence";
    pub const BOOLEAN: &str = "java.lang.Boolean";
    pub const BYTE: &str = "java.lang.Byte";
    pub const SHORT: &str = "java.lang.Short";
    pub const CHARACTER: &str = "java.lang.Character";
    pub const INTEGER: &str = "java.lang.Integer";
    pub const LONG: &str = "java.lang.Long";
    pub const FLOAT: &str = "java.lang.Float";
    pub const DOUBLE: &str = "java.lang.Double";
    pub const NUMBER: &str = "java.lang.Number";
    pub const VOID: &str = "java.lang.Void";
    pub const CLASS: &str = "java.lang.Class";
    pub const COMPARABLE: &str = "java.lang.Comparable";
    pub const ITERABLE: &str = "java.lang.Iterable";
    pub const BIG_INTEGER: &str = "java.math.BigInteger";
    pub const BIG_DECIMAL: &str = "java.math.BigDecimal";
    pub const COLLECTION: &str = "java.util.Collection";
    pub const LIST: &str = "java.util.List";
    pub const SET: &str = "java.util.Set";
    pub const MAP: &str = "java.util.Map";
    pub const MAP_ENTRY: &str = "java.util.Map$Entry";
    pub const ITERATOR: &str = "java.util.Iterator";
    pub const PATTERN: &str = "java.util.regex.Pattern";
    pub const MATCHER: &str = "java.util.regex.Matcher";
    pub const CLOSURE: &str = "groovy.lang.Closure";
    pub const GSTRING: &str = "groovy.lang.GString";
    pub const RANGE: &str = "groovy.lang.Range";
    pub const SCRIPT: &str = "groovy.lang.Script";
    pub const DEFAULT_GROOVY_METHODS: &str = "org.codehaus.groovy.runtime.DefaultGroovyMethods";
    pub const DEFAULT_GROOVY_STATIC_METHODS: &str =
        "org.codehaus.groovy.runtime.DefaultGroovyStaticMethods";
}

const PRIMITIVES: [(&str, &str); 9] = [
    ("boolean", names::BOOLEAN),
    ("byte", names::BYTE),
    ("short", names::SHORT),
    ("char", names::CHARACTER),
    ("int", names::INTEGER),
    ("long", names::LONG),
    ("float", names::FLOAT),
    ("double", names::DOUBLE),
    ("void", names::VOID),
];

#[derive(Clone, Debug)]
pub struct TypeDescriptor {
    name: String,
    args: Vec<TypeDescriptor>,
    component: Option<Box<TypeDescriptor>>,
    placeholder: bool,
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl TypeDescriptor {
    /// A class (or primitive) with no generic arguments.
    pub fn class(name: impl Into<String>) -> Self {
        TypeDescriptor {
            name: name.into(),
            args: Vec::new(),
            component: None,
            placeholder: false,
        }
    }

    pub fn parameterized(name: impl Into<String>, args: Vec<TypeDescriptor>) -> Self {
        TypeDescriptor {
            args,
            ..TypeDescriptor::class(name)
        }
    }

    /// A type parameter such as `T` or `E`.
    pub fn placeholder(name: impl Into<String>) -> Self {
        TypeDescriptor {
            placeholder: true,
            ..TypeDescriptor::class(name)
        }
    }

    pub fn array_of(component: TypeDescriptor) -> Self {
        TypeDescriptor {
            name: format!("{}[]", component.name),
            args: Vec::new(),
            component: Some(Box::new(component)),
            placeholder: false,
        }
    }

    pub fn object() -> Self {
        Self::class(names::OBJECT)
    }

    pub fn string() -> Self {
        Self::class(names::STRING)
    }

    pub fn boolean() -> Self {
        Self::class("boolean")
    }

    pub fn int() -> Self {
        Self::class("int")
    }

    pub fn void() -> Self {
        Self::class("void")
    }

    pub fn list_of(element: TypeDescriptor) -> Self {
        Self::parameterized(names::LIST, vec![element])
    }

    pub fn map_of(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        Self::parameterized(names::MAP, vec![key, value])
    }

    pub fn closure_of(result: TypeDescriptor) -> Self {
        Self::parameterized(names::CLOSURE, vec![result])
    }

    pub fn class_of(ty: TypeDescriptor) -> Self {
        Self::parameterized(names::CLASS, vec![ty])
    }

    /// Replace the generic arguments.
    pub fn with_args(mut self, args: Vec<TypeDescriptor>) -> Self {
        self.args = args;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[TypeDescriptor] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&TypeDescriptor> {
        self.args.get(index)
    }

    pub fn component(&self) -> Option<&TypeDescriptor> {
        self.component.as_deref()
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn is_array(&self) -> bool {
        self.component.is_some()
    }

    pub fn is_object(&self) -> bool {
        self.name == names::OBJECT
    }

    pub fn is_void(&self) -> bool {
        self.name == "void" || self.name == names::VOID
    }

    pub fn is_primitive(&self) -> bool {
        PRIMITIVES.iter().any(|(p, _)| *p == self.name)
    }

    /// True for `String` and `GString`.
    pub fn is_string_like(&self) -> bool {
        self.name == names::STRING || self.name == names::GSTRING
    }

    /// The type without generic arguments (arrays keep their component
    /// erased as well).
    pub fn erasure(&self) -> TypeDescriptor {
        match &self.component {
            Some(component) => TypeDescriptor::array_of(component.erasure()),
            None => TypeDescriptor {
                name: self.name.clone(),
                args: Vec::new(),
                component: None,
                placeholder: self.placeholder,
            },
        }
    }

    /// The wrapper class for a primitive; other types are returned as-is.
    pub fn boxed(&self) -> TypeDescriptor {
        match PRIMITIVES.iter().find(|(p, _)| *p == self.name) {
            Some((_, wrapper)) => TypeDescriptor::class(*wrapper),
            None => self.clone(),
        }
    }

    /// The primitive for a wrapper class, if this is one.
    pub fn unboxed(&self) -> Option<TypeDescriptor> {
        PRIMITIVES
            .iter()
            .find(|(_, w)| *w == self.name)
            .map(|(p, _)| TypeDescriptor::class(*p))
    }

    /// Position in the numeric promotion order, or `None` for non-numbers.
    ///
    /// `byte`/`short`/`char`/`int` < `long` < `BigInteger` < `BigDecimal`
    /// < `float` < `double`; plain `Number` ranks last.
    pub fn numeric_rank(&self) -> Option<u8> {
        let name = self.unboxed().map(|p| p.name).unwrap_or_else(|| self.name.clone());
        match name.as_str() {
            "byte" | "short" | "char" | "int" => Some(0),
            "long" => Some(1),
            names::BIG_INTEGER => Some(2),
            names::BIG_DECIMAL => Some(3),
            "float" => Some(4),
            "double" => Some(5),
            names::NUMBER => Some(6),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric_rank().is_some()
    }

    /// True when this type mentions a type parameter anywhere.
    pub fn has_placeholders(&self) -> bool {
        self.placeholder
            || self.args.iter().any(|a| a.has_placeholders())
            || self.component.as_ref().is_some_and(|c| c.has_placeholders())
    }

    /// Structural equality including generic arguments.
    pub fn same_parameterization(&self, other: &TypeDescriptor) -> bool {
        self.name == other.name
            && self.args.len() == other.args.len()
            && self
                .args
                .iter()
                .zip(&other.args)
                .all(|(a, b)| a.same_parameterization(b))
    }

    /// The unqualified name: `java.util.Map$Entry` becomes `Entry`.
    pub fn simple_name(&self) -> &str {
        self.name
            .rsplit(|c| c == '.' || c == '$')
            .next()
            .unwrap_or(&self.name)
    }

    /// Display with unqualified names, for human-facing output.
    pub fn short(&self) -> ShortName<'_> {
        ShortName(self)
    }
}

impl From<&TypeRef> for TypeDescriptor {
    fn from(r: &TypeRef) -> Self {
        let mut ty = if r.placeholder {
            TypeDescriptor::placeholder(r.name.clone())
        } else {
            TypeDescriptor::parameterized(
                r.name.clone(),
                r.args.iter().map(TypeDescriptor::from).collect(),
            )
        };
        for _ in 0..r.array_dims {
            ty = TypeDescriptor::array_of(ty);
        }
        ty
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[TypeDescriptor], short: bool) -> fmt::Result {
    if args.is_empty() {
        return Ok(());
    }
    write!(f, "<")?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        if short {
            write!(f, "{}", arg.short())?;
        } else {
            write!(f, "{}", arg)?;
        }
    }
    write!(f, ">")
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(component) = &self.component {
            return write!(f, "{}[]", component);
        }
        write!(f, "{}", self.name)?;
        write_args(f, &self.args, false)
    }
}

/// See [`TypeDescriptor::short`].
pub struct ShortName<'a>(&'a TypeDescriptor);

impl fmt::Display for ShortName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ty = self.0;
        if let Some(component) = &ty.component {
            return write!(f, "{}[]", component.short());
        }
        write!(f, "{}", ty.simple_name())?;
        write_args(f, &ty.args, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_ignores_arguments() {
        let a = TypeDescriptor::list_of(TypeDescriptor::string());
        let b = TypeDescriptor::list_of(TypeDescriptor::int());
        assert_eq!(a, b);
        assert!(!a.same_parameterization(&b));
        assert!(a.same_parameterization(&a.clone()));
    }

    #[test]
    fn display_forms() {
        let ty = TypeDescriptor::map_of(
            TypeDescriptor::string(),
            TypeDescriptor::list_of(TypeDescriptor::placeholder("T")),
        );
        assert_eq!(
            ty.to_string(),
            "java.util.Map<java.lang.String, java.util.List<T>>"
        );
        assert_eq!(ty.short().to_string(), "Map<String, List<T>>");

        let arr = TypeDescriptor::array_of(TypeDescriptor::string());
        assert_eq!(arr.name(), "java.lang.String[]");
        assert_eq!(arr.short().to_string(), "String[]");
    }

    #[test]
    fn boxing_round_trip() {
        let int = TypeDescriptor::int();
        assert!(int.is_primitive());
        assert_eq!(int.boxed().name(), names::INTEGER);
        assert_eq!(int.boxed().unboxed(), Some(int));
        assert_eq!(TypeDescriptor::string().unboxed(), None);
    }

    #[test]
    fn numeric_ranks() {
        let rank = |n: &str| TypeDescriptor::class(n).numeric_rank();
        assert!(rank("int") < rank("long"));
        assert_eq!(rank("int"), rank(names::INTEGER));
        assert!(rank(names::BIG_DECIMAL) < rank("double"));
        assert_eq!(rank(names::STRING), None);
    }

    #[test]
    fn from_type_ref() {
        let r = TypeRef::generic("java.util.List", vec![TypeRef::placeholder("E")]).array();
        let ty = TypeDescriptor::from(&r);
        assert!(ty.is_array());
        let component = ty.component().unwrap();
        assert_eq!(component.name(), "java.util.List");
        assert!(component.args()[0].is_placeholder());
        assert!(ty.has_placeholders());
    }
}
