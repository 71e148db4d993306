//! Built-in library types.
//!
//! Registers the slice of the JDK and the Groovy runtime that scripts lean
//! on most: `Object`, strings, boxed numbers, collections, regex, closures,
//! ranges, scripts, and the two default extension classes
//! (`DefaultGroovyMethods`, `DefaultGroovyStaticMethods`) whose static
//! methods act as instance methods on their first parameter.

use tracing::warn;

use crate::class_table::{ClassInfo, ClassTable};
use crate::ty::names;

/// A fresh table holding every built-in type.
pub fn library() -> ClassTable {
    let mut table = ClassTable::new();
    register_builtins(&mut table);
    table
}

/// Register all built-in types into `table`.
pub fn register_builtins(table: &mut ClassTable) {
    register_lang(table);
    register_numbers(table);
    register_collections(table);
    register_regex(table);
    register_groovy(table);
    register_extensions(table);
}

fn class(header: &str) -> ClassInfo {
    ClassInfo::declare(header).unwrap_or_else(|err| {
        warn!(%err, "malformed built-in class header");
        ClassInfo::new(header)
    })
}

// ── java.lang ──────────────────────────────────────────────────────────

fn register_lang(table: &mut ClassTable) {
    table.insert(
        class(names::OBJECT)
            .method("boolean equals(Object other)")
            .method("int hashCode()")
            .method("String toString()")
            .method("Class<?> getClass()"),
    );
    table.insert(
        class("java.lang.CharSequence")
            .interface()
            .method("int length()")
            .method("char charAt(int index)")
            .method("CharSequence subSequence(int start, int end)"),
    );
    table.insert(
        class("java.lang.Comparable<T>")
            .interface()
            .method("int compareTo(T other)"),
    );
    table.insert(
        class(names::STRING)
            .implements("CharSequence")
            .implements("Comparable<String>")
            .constructor("()")
            .constructor("(String original)")
            .method("int length()")
            .method("char charAt(int index)")
            .method("boolean isEmpty()")
            .method("String toUpperCase()")
            .method("String toLowerCase()")
            .method("String trim()")
            .method("String substring(int begin)")
            .method("String substring(int begin, int end)")
            .method("boolean startsWith(String prefix)")
            .method("boolean endsWith(String suffix)")
            .method("boolean contains(CharSequence s)")
            .method("int indexOf(String s)")
            .method("String[] split(String regex)")
            .method("String replace(CharSequence target, CharSequence replacement)")
            .method("String concat(String s)")
            .method("char[] toCharArray()")
            .method("byte[] getBytes()")
            .method("boolean matches(String regex)")
            .method("static String valueOf(Object value)")
            .method("static String format(String format, Object[] args)")
            .method("static String join(CharSequence sep, Iterable<? extends CharSequence> parts)"),
    );
    for builder in ["java.lang.StringBuilder", "java.lang.StringBuffer"] {
        let simple = builder.rsplit('.').next().unwrap_or(builder);
        table.insert(
            class(builder)
                .implements("CharSequence")
                .constructor("()")
                .constructor("(String initial)")
                .method(&format!("{} append(Object value)", simple))
                .method(&format!("{} reverse()", simple))
                .method("int length()")
                .method("String toString()"),
        );
    }
    table.insert(
        class("java.lang.Class<T>")
            .method("String getName()")
            .method("String getSimpleName()")
            .method("T newInstance()")
            .method("boolean isInstance(Object obj)")
            .method("boolean isInterface()")
            .method("Class<? super T> getSuperclass()"),
    );
    table.insert(class(names::VOID));
    table.insert(
        class("java.lang.Throwable")
            .constructor("()")
            .constructor("(String message)")
            .method("String getMessage()")
            .method("Throwable getCause()")
            .method("void printStackTrace()"),
    );
    table.insert(
        class("java.lang.Exception")
            .extends("Throwable")
            .constructor("()")
            .constructor("(String message)"),
    );
    table.insert(
        class("java.lang.RuntimeException")
            .extends("Exception")
            .constructor("()")
            .constructor("(String message)"),
    );
    for name in [
        "java.lang.IllegalArgumentException",
        "java.lang.IllegalStateException",
        "java.lang.UnsupportedOperationException",
    ] {
        table.insert(
            class(name)
                .extends("RuntimeException")
                .constructor("()")
                .constructor("(String message)"),
        );
    }
    table.insert(
        class("java.io.PrintStream")
            .method("void println()")
            .method("void println(Object value)")
            .method("void print(Object value)")
            .method("PrintStream printf(String format, Object[] args)"),
    );
    table.insert(
        class("java.lang.System")
            .field("static final PrintStream out")
            .field("static final PrintStream err")
            .method("static long currentTimeMillis()")
            .method("static long nanoTime()")
            .method("static String getProperty(String key)")
            .method("static String getenv(String name)"),
    );
    table.insert(
        class("java.lang.Math")
            .field("static final double PI")
            .field("static final double E")
            .method("static int max(int a, int b)")
            .method("static long max(long a, long b)")
            .method("static double max(double a, double b)")
            .method("static int min(int a, int b)")
            .method("static long min(long a, long b)")
            .method("static double min(double a, double b)")
            .method("static int abs(int a)")
            .method("static double abs(double a)")
            .method("static double sqrt(double a)")
            .method("static double pow(double a, double b)")
            .method("static double random()")
            .method("static long round(double a)"),
    );
}

// ── Numbers ────────────────────────────────────────────────────────────

fn register_numbers(table: &mut ClassTable) {
    table.insert(
        class(names::NUMBER)
            .method("int intValue()")
            .method("long longValue()")
            .method("double doubleValue()")
            .method("float floatValue()"),
    );
    let wrappers = [
        (names::INTEGER, "int", "Integer", "parseInt"),
        (names::LONG, "long", "Long", "parseLong"),
        (names::SHORT, "short", "Short", "parseShort"),
        (names::BYTE, "byte", "Byte", "parseByte"),
        (names::FLOAT, "float", "Float", "parseFloat"),
        (names::DOUBLE, "double", "Double", "parseDouble"),
    ];
    for (name, prim, simple, parse) in wrappers {
        table.insert(
            class(name)
                .extends("Number")
                .implements(&format!("Comparable<{}>", simple))
                .field(&format!("static final {} MAX_VALUE", prim))
                .field(&format!("static final {} MIN_VALUE", prim))
                .method(&format!("static {} {}(String text)", prim, parse))
                .method(&format!("static {} valueOf({} value)", simple, prim))
                .method(&format!("static {} valueOf(String text)", simple))
                .method(&format!("static String toString({} value)", prim)),
        );
    }
    table.insert(
        class(names::CHARACTER)
            .implements("Comparable<Character>")
            .method("char charValue()")
            .method("static boolean isDigit(char c)")
            .method("static boolean isLetter(char c)"),
    );
    table.insert(
        class(names::BOOLEAN)
            .implements("Comparable<Boolean>")
            .field("static final Boolean TRUE")
            .field("static final Boolean FALSE")
            .method("boolean booleanValue()")
            .method("static boolean parseBoolean(String text)"),
    );
    table.insert(
        class(names::BIG_INTEGER)
            .extends("Number")
            .implements("Comparable<BigInteger>")
            .constructor("(String value)")
            .field("static final BigInteger ZERO")
            .field("static final BigInteger ONE")
            .method("BigInteger add(BigInteger other)")
            .method("BigInteger subtract(BigInteger other)")
            .method("BigInteger multiply(BigInteger other)")
            .method("BigInteger pow(int exponent)"),
    );
    table.insert(
        class(names::BIG_DECIMAL)
            .extends("Number")
            .implements("Comparable<BigDecimal>")
            .constructor("(String value)")
            .constructor("(double value)")
            .field("static final BigDecimal ZERO")
            .field("static final BigDecimal ONE")
            .method("BigDecimal add(BigDecimal other)")
            .method("BigDecimal subtract(BigDecimal other)")
            .method("BigDecimal multiply(BigDecimal other)")
            .method("BigDecimal divide(BigDecimal other)")
            .method("BigDecimal setScale(int scale)")
            .method("int scale()"),
    );
}

// ── java.util ──────────────────────────────────────────────────────────

fn register_collections(table: &mut ClassTable) {
    table.insert(
        class("java.lang.Iterable<T>")
            .interface()
            .method("Iterator<T> iterator()"),
    );
    table.insert(
        class("java.util.Iterator<E>")
            .interface()
            .method("boolean hasNext()")
            .method("E next()")
            .method("void remove()"),
    );
    table.insert(
        class("java.util.Collection<E>")
            .interface()
            .implements("Iterable<E>")
            .method("int size()")
            .method("boolean isEmpty()")
            .method("boolean contains(Object o)")
            .method("boolean add(E e)")
            .method("boolean addAll(Collection<? extends E> c)")
            .method("boolean remove(Object o)")
            .method("void clear()")
            .method("Object[] toArray()"),
    );
    table.insert(
        class("java.util.List<E>")
            .interface()
            .implements("Collection<E>")
            .method("E get(int index)")
            .method("E set(int index, E element)")
            .method("void add(int index, E element)")
            .method("E remove(int index)")
            .method("int indexOf(Object o)")
            .method("List<E> subList(int from, int to)"),
    );
    for list in ["java.util.ArrayList<E>", "java.util.LinkedList<E>"] {
        table.insert(
            class(list)
                .implements("List<E>")
                .constructor("()")
                .constructor("(Collection<? extends E> c)"),
        );
    }
    table.insert(
        class("java.util.Set<E>")
            .interface()
            .implements("Collection<E>"),
    );
    for set in ["java.util.HashSet<E>", "java.util.LinkedHashSet<E>"] {
        table.insert(
            class(set)
                .implements("Set<E>")
                .constructor("()")
                .constructor("(Collection<? extends E> c)"),
        );
    }
    table.insert(
        class("java.util.Map<K, V>")
            .interface()
            .method("V get(Object key)")
            .method("V put(K key, V value)")
            .method("V remove(Object key)")
            .method("V getOrDefault(Object key, V fallback)")
            .method("boolean containsKey(Object key)")
            .method("boolean containsValue(Object value)")
            .method("Set<K> keySet()")
            .method("Collection<V> values()")
            .method("Set<Map.Entry<K, V>> entrySet()")
            .method("int size()")
            .method("boolean isEmpty()")
            .method("void clear()"),
    );
    table.insert(
        class("java.util.Map$Entry<K, V>")
            .interface()
            .method("K getKey()")
            .method("V getValue()")
            .method("V setValue(V value)"),
    );
    table.insert(
        class("java.util.HashMap<K, V>")
            .implements("Map<K, V>")
            .constructor("()")
            .constructor("(Map<? extends K, ? extends V> m)"),
    );
    table.insert(
        class("java.util.LinkedHashMap<K, V>")
            .extends("HashMap<K, V>")
            .constructor("()"),
    );
}

fn register_regex(table: &mut ClassTable) {
    table.insert(
        class(names::PATTERN)
            .method("static Pattern compile(String regex)")
            .method("Matcher matcher(CharSequence input)")
            .method("String pattern()")
            .method("String[] split(CharSequence input)"),
    );
    table.insert(
        class(names::MATCHER)
            .method("boolean matches()")
            .method("boolean find()")
            .method("String group()")
            .method("String group(int index)")
            .method("int groupCount()")
            .method("int start()")
            .method("int end()"),
    );
}

// ── groovy.lang ────────────────────────────────────────────────────────

fn register_groovy(table: &mut ClassTable) {
    table.insert(
        class("groovy.lang.Closure<V>")
            .field("static final int OWNER_FIRST")
            .field("static final int DELEGATE_FIRST")
            .field("static final int OWNER_ONLY")
            .field("static final int DELEGATE_ONLY")
            .field("static final int TO_SELF")
            .method("V call()")
            .method("V call(Object arg)")
            .method("V call(Object arg1, Object arg2)")
            .method("Closure<V> curry(Object arg)")
            .method("Object getDelegate()")
            .method("void setDelegate(Object delegate)")
            .method("Object getOwner()")
            .method("Object getThisObject()")
            .method("int getResolveStrategy()")
            .method("void setResolveStrategy(int strategy)")
            .method("int getMaximumNumberOfParameters()"),
    );
    table.insert(
        class(names::GSTRING)
            .implements("CharSequence")
            .implements("Comparable<Object>")
            .method("String toString()")
            .method("String[] getStrings()")
            .method("Object[] getValues()"),
    );
    table.insert(
        class("groovy.lang.Range<T extends Comparable>")
            .interface()
            .implements("List<T>")
            .method("T getFrom()")
            .method("T getTo()")
            .method("boolean isReverse()")
            .method("boolean containsWithinBounds(Object o)"),
    );
    table.insert(class("groovy.lang.IntRange").implements("Range<Integer>"));
    table.insert(
        class("groovy.lang.Binding")
            .method("Object getVariable(String name)")
            .method("void setVariable(String name, Object value)")
            .method("Map<String, Object> getVariables()"),
    );
    table.insert(
        class(names::SCRIPT)
            .method("Object run()")
            .method("Binding getBinding()")
            .method("Object getProperty(String name)")
            .method("void setProperty(String name, Object value)")
            .method("void println()")
            .method("void println(Object value)")
            .method("void print(Object value)")
            .method("void printf(String format, Object[] values)")
            .method("Object evaluate(String text)"),
    );
}

// ── Default extension methods ──────────────────────────────────────────

const DEFAULT_GROOVY_METHODS: &[&str] = &[
    // iteration
    "static <T> List<T> each(List<T> self, Closure closure)",
    "static <T> Collection<T> each(Collection<T> self, Closure closure)",
    "static <K, V> Map<K, V> each(Map<K, V> self, Closure closure)",
    "static <T> T each(T self, Closure closure)",
    "static <T> List<T> eachWithIndex(List<T> self, Closure closure)",
    "static <K, V> Map<K, V> eachWithIndex(Map<K, V> self, Closure closure)",
    "static <T> T eachWithIndex(T self, Closure closure)",
    "static <T> List<T> reverseEach(List<T> self, Closure closure)",
    // transformation
    "static <T> List<T> collect(Collection<?> self, Closure<T> transform)",
    "static <T> List<T> collect(Map<?, ?> self, Closure<T> transform)",
    "static <T> List<T> collect(Object self, Closure<T> transform)",
    "static <T> List<T> collectMany(Iterable<?> self, Closure<Collection<? extends T>> projection)",
    "static <K, V> Map<K, V> collectEntries(Iterable<?> self, Closure<?> transform)",
    "static <K, V> Map<K, V> collectEntries(Map<?, ?> self, Closure<?> transform)",
    "static <T> T inject(Collection<?> self, T initialValue, Closure<T> closure)",
    "static <T> T inject(Map<?, ?> self, T initialValue, Closure<T> closure)",
    "static <K, T> Map<K, List<T>> groupBy(Iterable<T> self, Closure<K> closure)",
    "static <K> Map<K, Integer> countBy(Iterable<?> self, Closure<K> closure)",
    "static List<Object> flatten(Collection<?> self)",
    "static <T> List<List<T>> collate(List<T> self, int size)",
    "static <T> List<List<T>> withIndex(Iterable<T> self)",
    // filtering and searching
    "static <T> List<T> findAll(List<T> self, Closure closure)",
    "static <T> Set<T> findAll(Set<T> self, Closure closure)",
    "static <T> Collection<T> findAll(Collection<T> self, Closure closure)",
    "static <K, V> Map<K, V> findAll(Map<K, V> self, Closure closure)",
    "static <T> T find(Collection<T> self, Closure closure)",
    "static <K, V> Map.Entry<K, V> find(Map<K, V> self, Closure closure)",
    "static <T> T findResult(Iterable<?> self, Closure<T> condition)",
    "static int findIndexOf(Iterable<?> self, Closure condition)",
    "static boolean any(Object self, Closure predicate)",
    "static boolean every(Object self, Closure predicate)",
    "static int count(Iterable<?> self, Closure predicate)",
    "static <T> List<T> grep(Collection<T> self, Object filter)",
    "static <T> List<T> takeWhile(List<T> self, Closure condition)",
    "static <T> List<T> dropWhile(List<T> self, Closure condition)",
    // ordering and aggregation
    "static <T> List<T> sort(Iterable<T> self)",
    "static <T> List<T> sort(Iterable<T> self, Closure closure)",
    "static <T> List<T> toSorted(Iterable<T> self)",
    "static <T> List<T> reverse(List<T> self)",
    "static String reverse(CharSequence self)",
    "static <T> List<T> unique(List<T> self)",
    "static <T> T max(Iterable<T> self)",
    "static <T> T max(Iterable<T> self, Closure closure)",
    "static <T> T min(Iterable<T> self)",
    "static <T> T min(Iterable<T> self, Closure closure)",
    "static <T> T sum(Iterable<T> self)",
    "static Object sum(Iterable<?> self, Closure closure)",
    "static String join(Iterable<?> self, String separator)",
    "static String join(Object[] self, String separator)",
    // access
    "static <T> T first(List<T> self)",
    "static <T> T last(List<T> self)",
    "static <T> T head(List<T> self)",
    "static <T> List<T> tail(List<T> self)",
    "static <T> T getAt(List<T> self, int index)",
    "static <T> List<T> getAt(List<T> self, Range range)",
    "static <K, V> V getAt(Map<K, V> self, K key)",
    "static String getAt(CharSequence self, int index)",
    "static <T> void putAt(List<T> self, int index, T value)",
    "static <K, V> V putAt(Map<K, V> self, K key, V value)",
    "static <K, V> V get(Map<K, V> self, K key, V defaultValue)",
    "static <K, V> Map<K, V> subMap(Map<K, V> self, Collection<K> keys)",
    // conversion
    "static <T> List<T> toList(Iterable<T> self)",
    "static List<String> toList(CharSequence self)",
    "static <T> Set<T> toSet(Iterable<T> self)",
    "static <T> List<T> plus(List<T> left, Collection<T> right)",
    "static <T> List<T> minus(List<T> left, Collection<?> right)",
    "static <T> Collection<T> leftShift(Collection<T> self, T value)",
    "static <K, V> Map<K, V> plus(Map<K, V> left, Map<K, V> right)",
    "static <T> Collection<T> asImmutable(Collection<T> self)",
    "static boolean asBoolean(Object self)",
    "static <T> T asType(Object self, Class<T> type)",
    "static int size(CharSequence self)",
    "static int size(Object[] self)",
    "static boolean isCase(Object caseValue, Object switchValue)",
    // strings
    "static Integer toInteger(CharSequence self)",
    "static Long toLong(CharSequence self)",
    "static Double toDouble(CharSequence self)",
    "static BigDecimal toBigDecimal(CharSequence self)",
    "static boolean isNumber(CharSequence self)",
    "static boolean isInteger(CharSequence self)",
    "static String capitalize(CharSequence self)",
    "static String uncapitalize(CharSequence self)",
    "static String multiply(CharSequence self, Number factor)",
    "static String center(CharSequence self, Number width)",
    "static String padLeft(CharSequence self, Number width)",
    "static String padRight(CharSequence self, Number width)",
    "static List<String> readLines(CharSequence self)",
    "static List<String> tokenize(CharSequence self)",
    "static List<String> tokenize(CharSequence self, CharSequence delimiters)",
    "static Object eachLine(CharSequence self, Closure closure)",
    "static Object eachMatch(CharSequence self, CharSequence regex, Closure closure)",
    "static String stripIndent(CharSequence self)",
    "static Pattern bitwiseNegate(CharSequence self)",
    // numbers
    "static void times(Number self, Closure closure)",
    "static void upto(Number self, Number to, Closure closure)",
    "static void downto(Number self, Number to, Closure closure)",
    "static void step(Number self, Number to, Number stepNumber, Closure closure)",
    "static Number abs(Number self)",
    "static Number intdiv(Number left, Number right)",
    "static Number power(Number self, Number exponent)",
    // objects
    "static <T, U> T with(U self, Closure<T> closure)",
    "static <T> T tap(T self, Closure closure)",
    "static <T, U> T identity(U self, Closure<T> closure)",
    "static <T> T use(Object self, Class categoryClass, Closure<T> closure)",
    "static String dump(Object self)",
    "static String inspect(Object self)",
    "static boolean is(Object self, Object other)",
    "static void println(Object self)",
    "static void println(Object self, Object value)",
    "static void print(Object self, Object value)",
    "static void printf(Object self, String format, Object[] values)",
    "static void sleep(Object self, long millis)",
];

const DEFAULT_GROOVY_STATIC_METHODS: &[&str] = &[
    "static void sleep(Object self, long millis)",
    "static Matcher getLastMatcher(Matcher self)",
];

fn register_extensions(table: &mut ClassTable) {
    let mut dgm = class(names::DEFAULT_GROOVY_METHODS);
    for sig in DEFAULT_GROOVY_METHODS {
        dgm = dgm.method(sig);
    }
    table.insert(dgm);

    let mut dgsm = class(names::DEFAULT_GROOVY_STATIC_METHODS);
    for sig in DEFAULT_GROOVY_STATIC_METHODS {
        dgsm = dgsm.method(sig);
    }
    table.insert(dgsm);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::TypeDescriptor;

    #[test]
    fn every_extension_signature_parses() {
        let table = library();
        let dgm = table.get(names::DEFAULT_GROOVY_METHODS).unwrap();
        assert_eq!(dgm.methods.len(), DEFAULT_GROOVY_METHODS.len());
        assert!(dgm.methods.iter().all(|m| m.is_static && !m.params.is_empty()));
        let dgsm = table.get(names::DEFAULT_GROOVY_STATIC_METHODS).unwrap();
        assert_eq!(dgsm.methods.len(), DEFAULT_GROOVY_STATIC_METHODS.len());
    }

    #[test]
    fn collection_hierarchy() {
        let table = library();
        let h: Vec<String> = table
            .hierarchy(&TypeDescriptor::class("java.util.ArrayList"))
            .iter()
            .map(|t| t.simple_name().to_string())
            .collect();
        assert_eq!(h, vec!["ArrayList", "List", "Collection", "Iterable", "Object"]);
    }

    #[test]
    fn string_members() {
        let table = library();
        let string = TypeDescriptor::string();
        assert_eq!(table.methods_named(&string, "substring").len(), 2);
        let to_string = table.methods_named(&string, "toString");
        assert_eq!(to_string.len(), 1);
        assert_eq!(to_string[0].declaring_type.name(), names::OBJECT);
        assert!(table.is_assignable(&string, &TypeDescriptor::class(names::CHAR_SEQUENCE)));
    }

    #[test]
    fn wrapper_constants() {
        let table = library();
        let max = table
            .field_named(&TypeDescriptor::class(names::INTEGER), "MAX_VALUE")
            .unwrap();
        assert!(max.is_static && max.is_final);
        assert_eq!(max.ty.name(), "int");
    }

    #[test]
    fn map_entry_is_nested_name() {
        let table = library();
        let map = table.get(names::MAP).unwrap();
        let entry_set = map.methods.iter().find(|m| m.name == "entrySet").unwrap();
        assert_eq!(
            entry_set.return_type.to_string(),
            "java.util.Set<java.util.Map$Entry<K, V>>"
        );
    }
}
