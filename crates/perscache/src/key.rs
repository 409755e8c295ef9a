//! Cache key derivation
//!
//! A key is a SHA-256 digest over the callable's qualified name, its source
//! text (or explicit version tag), the serializer's format id, an optional
//! receiver discriminator, and the call's arguments sorted by parameter name
//! with ignored parameters removed. Every field is length-prefixed so no two
//! different inputs can concatenate to the same byte stream.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{CacheError, Result};

/// What a cached callable is, for key purposes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnIdentity {
    qualified_name: String,
    source: String,
    params: Vec<String>,
}

impl FnIdentity {
    /// Identity with a qualified name and no source text yet
    pub fn new(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            source: String::new(),
            params: Vec::new(),
        }
    }

    /// Fold the callable's source text into the key
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Use an explicit version tag in place of source text
    ///
    /// For callables whose body cannot be captured, bump the version whenever
    /// the computation changes.
    pub fn with_version(self, version: impl fmt::Display) -> Self {
        self.with_source(format!("version {version}"))
    }

    /// Declare parameter names, in positional order
    pub fn with_params(mut self, params: &[&str]) -> Self {
        self.params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Last path segment of the qualified name
    pub fn name(&self) -> &str {
        self.qualified_name
            .rsplit("::")
            .next()
            .unwrap_or(&self.qualified_name)
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }
}

/// A function together with its identity, ready to be cached
pub struct Callable<F> {
    identity: FnIdentity,
    func: F,
}

impl<F> Callable<F> {
    pub fn new(identity: FnIdentity, func: F) -> Self {
        Self { identity, func }
    }

    pub fn identity(&self) -> &FnIdentity {
        &self.identity
    }

    pub fn into_parts(self) -> (FnIdentity, F) {
        (self.identity, self.func)
    }
}

impl<F> fmt::Debug for Callable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Build a [`Callable`] from a closure, capturing its source text
///
/// The closure's tokens, its parameter names and its module-qualified name
/// are recorded at compile time, so editing the body changes every key the
/// callable produces. Arguments arrive as a tuple.
///
/// ```
/// let double = perscache::callable!(double, |x: u64| x * 2);
/// assert_eq!(double.identity().params(), ["x"]);
/// ```
///
/// The `method` form takes the receiver by reference as the first parameter:
///
/// ```
/// struct Scaler { factor: u64 }
/// impl perscache::InstanceKey for Scaler {
///     fn instance_state(&self) -> serde_json::Value {
///         self.factor.into()
///     }
/// }
///
/// let scale = perscache::callable!(method scale, |this: &Scaler, x: u64| x * this.factor);
/// assert_eq!(scale.identity().params(), ["x"]);
/// ```
///
/// Naming the single parameter's type `NamedArgs` selects the keyword form:
/// the closure receives the [`NamedArgs`] itself, so keyword arguments can be
/// listed in `ignore`. It also has a `method` variant.
///
/// ```
/// use perscache::NamedArgs;
///
/// let query = perscache::callable!(query, |args: NamedArgs| args.get::<u32>("limit").unwrap_or(10));
/// assert!(query.identity().params().is_empty());
/// let (_, func) = query.into_parts();
/// assert_eq!(func(NamedArgs::new().with("limit", &5u32)), 5);
/// ```
#[macro_export]
macro_rules! callable {
    (method $name:ident, |$recv:ident : &$rty:ty, $args:ident : NamedArgs| $body:expr) => {
        $crate::Callable::new(
            $crate::FnIdentity::new(concat!(module_path!(), "::", stringify!($name)))
                .with_source(stringify!(|$recv: &$rty, $args: NamedArgs| $body)),
            move |$recv: &$rty, $args: $crate::NamedArgs| $body,
        )
    };
    (method $name:ident, |$recv:ident : &$rty:ty $(, $arg:ident : $ty:ty)*| $body:expr) => {
        $crate::Callable::new(
            $crate::FnIdentity::new(concat!(module_path!(), "::", stringify!($name)))
                .with_source(stringify!(|$recv: &$rty $(, $arg: $ty)*| $body))
                .with_params(&[$(stringify!($arg)),*]),
            move |$recv: &$rty, ($($arg,)*): ($($ty,)*)| $body,
        )
    };
    ($name:ident, |$args:ident : NamedArgs| $body:expr) => {
        $crate::Callable::new(
            $crate::FnIdentity::new(concat!(module_path!(), "::", stringify!($name)))
                .with_source(stringify!(|$args: NamedArgs| $body)),
            move |$args: $crate::NamedArgs| $body,
        )
    };
    ($name:ident, || $body:expr) => {
        $crate::Callable::new(
            $crate::FnIdentity::new(concat!(module_path!(), "::", stringify!($name)))
                .with_source(stringify!(|| $body))
                .with_params(&[]),
            move |(): ()| $body,
        )
    };
    ($name:ident, |$($arg:ident : $ty:ty),*| $body:expr) => {
        $crate::Callable::new(
            $crate::FnIdentity::new(concat!(module_path!(), "::", stringify!($name)))
                .with_source(stringify!(|$($arg: $ty),*| $body))
                .with_params(&[$(stringify!($arg)),*]),
            move |($($arg,)*): ($($ty,)*)| $body,
        )
    };
}

/// Call arguments that can be bound to parameter names and hashed
pub trait Arguments {
    /// Pair every argument with its parameter name and canonical value
    fn bind(&self, params: &[String]) -> Result<Vec<(String, Value)>>;
}

fn positional<T: Serialize + ?Sized>(params: &[String], index: usize, value: &T) -> Result<(String, Value)> {
    let name = params
        .get(index)
        .cloned()
        .unwrap_or_else(|| format!("#{index}"));
    let value = serde_json::to_value(value).map_err(|e| CacheError::KeyDerivation {
        argument: name.clone(),
        message: e.to_string(),
    })?;
    Ok((name, value))
}

macro_rules! impl_arguments_for_tuple {
    ($($idx:tt $ty:ident),*) => {
        impl<$($ty: Serialize),*> Arguments for ($($ty,)*) {
            #[allow(unused_variables)]
            fn bind(&self, params: &[String]) -> Result<Vec<(String, Value)>> {
                Ok(vec![$(positional(params, $idx, &self.$idx)?),*])
            }
        }
    };
}

impl_arguments_for_tuple!();
impl_arguments_for_tuple!(0 A);
impl_arguments_for_tuple!(0 A, 1 B);
impl_arguments_for_tuple!(0 A, 1 B, 2 C);
impl_arguments_for_tuple!(0 A, 1 B, 2 C, 3 D);
impl_arguments_for_tuple!(0 A, 1 B, 2 C, 3 D, 4 E);
impl_arguments_for_tuple!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F);
impl_arguments_for_tuple!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G);
impl_arguments_for_tuple!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G, 7 H);

/// Keyword arguments; insertion order never affects the key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedArgs {
    values: BTreeMap<String, std::result::Result<Value, String>>,
}

impl NamedArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument
    ///
    /// A value that cannot be represented is remembered and reported when
    /// the key is derived, which makes that call skip the cache.
    pub fn with<T: Serialize + ?Sized>(mut self, name: impl Into<String>, value: &T) -> Self {
        let value = serde_json::to_value(value).map_err(|e| e.to_string());
        self.values.insert(name.into(), value);
        self
    }

    /// Read an argument back as a concrete type
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        match self.values.get(name)? {
            Ok(value) => serde_json::from_value(value.clone()).ok(),
            Err(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for NamedArgs {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::{Error, SerializeMap};

        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            match value {
                Ok(value) => map.serialize_entry(name, value)?,
                Err(message) => return Err(S::Error::custom(format!("{name}: {message}"))),
            }
        }
        map.end()
    }
}

impl Arguments for NamedArgs {
    fn bind(&self, _params: &[String]) -> Result<Vec<(String, Value)>> {
        self.values
            .iter()
            .map(|(name, value)| match value {
                Ok(value) => Ok((name.clone(), value.clone())),
                Err(message) => Err(CacheError::KeyDerivation {
                    argument: name.clone(),
                    message: message.clone(),
                }),
            })
            .collect()
    }
}

/// Receivers of cached methods
///
/// Distinct instances get distinct cache entries, told apart by the state
/// returned here. Equal states share entries, across processes too. A
/// receiver with no natural state can hold an [`InstanceId`] and return
/// [`InstanceId::to_value`]. The state must not be produced by calling the
/// instance's own cached methods.
pub trait InstanceKey {
    fn instance_state(&self) -> Value;
}

/// Unique identity for receivers without a stable state
///
/// Each id is a fresh v4 UUID, so no other object, in this run or a later
/// one, ever shares its entries. Those entries become unreachable once the
/// owner is dropped and age out through TTL or the size bound. Cloning mints
/// a new id.
#[derive(Debug)]
pub struct InstanceId(Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn to_value(&self) -> Value {
        Value::String(self.0.to_string())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InstanceId {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Receiver discriminator folded into method keys: a digest of the state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceTag(String);

impl InstanceTag {
    pub fn of<R: InstanceKey + ?Sized>(receiver: &R) -> Self {
        Self::from_state(&receiver.instance_state())
    }

    pub fn from_state(state: &Value) -> Self {
        let mut canonical = String::new();
        write_canonical(&mut canonical, state);
        InstanceTag(hex::encode(Sha256::digest(canonical.as_bytes())))
    }

    pub fn digest(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state:{}", self.0)
    }
}

/// JSON with object keys sorted at every depth
fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(out, &map[key.as_str()]);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, item);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

/// Derived identifier of one cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    name: String,
    hash: String,
    extension: String,
}

impl CacheKey {
    /// Sanitised short name of the callable
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hex digest, 64 characters
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Storage name: `<name>-<hash>.<extension>`
    pub fn file_name(&self) -> String {
        if self.extension.is_empty() {
            format!("{}-{}", self.name, self.hash)
        } else {
            format!("{}-{}.{}", self.name, self.hash, self.extension)
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

fn sanitize(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "fn".to_string()
    } else {
        sanitized
    }
}

struct FieldHasher(Sha256);

impl FieldHasher {
    fn field(&mut self, tag: &[u8], bytes: &[u8]) {
        self.0.update(tag);
        self.0.update((bytes.len() as u64).to_le_bytes());
        self.0.update(bytes);
    }
}

/// Derives [`CacheKey`]s for one callable under one serializer
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder<'a> {
    identity: &'a FnIdentity,
    format_id: &'a str,
    extension: &'a str,
    ignore: Option<&'a BTreeSet<String>>,
    instance: Option<InstanceTag>,
}

impl<'a> CacheKeyBuilder<'a> {
    pub fn new(identity: &'a FnIdentity, format_id: &'a str, extension: &'a str) -> Self {
        Self {
            identity,
            format_id,
            extension,
            ignore: None,
            instance: None,
        }
    }

    /// Parameter names left out of the key
    pub fn ignore(mut self, ignore: &'a BTreeSet<String>) -> Self {
        self.ignore = Some(ignore);
        self
    }

    /// Scope the key to one receiver
    pub fn instance(mut self, instance: Option<InstanceTag>) -> Self {
        self.instance = instance;
        self
    }

    /// Derive the key for one call
    pub fn build<A: Arguments + ?Sized>(&self, args: &A) -> Result<CacheKey> {
        let mut bound = args.bind(self.identity.params())?;
        if let Some(ignore) = self.ignore {
            bound.retain(|(name, _)| !ignore.contains(name));
        }
        bound.sort_by(|a, b| a.0.cmp(&b.0));

        let mut hasher = FieldHasher(Sha256::new());
        hasher.field(b"name", self.identity.qualified_name().as_bytes());
        hasher.field(b"source", self.identity.source().as_bytes());
        hasher.field(b"format", self.format_id.as_bytes());
        if let Some(instance) = &self.instance {
            hasher.field(b"instance", instance.to_string().as_bytes());
        }
        hasher.field(b"args", &(bound.len() as u64).to_le_bytes());

        let mut canonical = String::new();
        for (name, value) in &bound {
            canonical.clear();
            write_canonical(&mut canonical, value);
            hasher.field(b"arg", name.as_bytes());
            hasher.field(b"value", canonical.as_bytes());
        }

        Ok(CacheKey {
            name: sanitize(self.identity.name()),
            hash: hex::encode(hasher.0.finalize()),
            extension: self.extension.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    fn identity() -> FnIdentity {
        FnIdentity::new("app::data::get_data")
            .with_source("|key: String, verbose: bool| key")
            .with_params(&["key", "verbose"])
    }

    fn key_of<A: Arguments>(identity: &FnIdentity, args: &A) -> CacheKey {
        CacheKeyBuilder::new(identity, "BincodeSerializer", "bin")
            .build(args)
            .unwrap()
    }

    #[test]
    fn test_identity_short_name() {
        assert_eq!(identity().name(), "get_data");
        assert_eq!(FnIdentity::new("plain").name(), "plain");
    }

    #[test]
    fn test_file_name_layout() {
        let key = key_of(&identity(), &("abc", true));
        let file_name = key.file_name();
        assert!(file_name.starts_with("get_data-"));
        assert!(file_name.ends_with(".bin"));
        assert_eq!(key.hash().len(), 64);
        assert_eq!(key.to_string(), file_name);
    }

    #[test]
    fn test_same_inputs_same_key() {
        assert_eq!(key_of(&identity(), &("abc", true)), key_of(&identity(), &("abc", true)));
    }

    #[test]
    fn test_argument_value_changes_key() {
        assert_ne!(key_of(&identity(), &("abc", true)), key_of(&identity(), &("abd", true)));
    }

    #[test]
    fn test_source_changes_key() {
        let changed = identity().with_source("|key: String, verbose: bool| key.to_uppercase()");
        assert_ne!(key_of(&identity(), &("abc", true)), key_of(&changed, &("abc", true)));
    }

    #[test]
    fn test_version_tag_changes_key() {
        let v1 = FnIdentity::new("app::load").with_version(1);
        let v2 = FnIdentity::new("app::load").with_version(2);
        assert_ne!(key_of(&v1, &()), key_of(&v2, &()));
    }

    #[test]
    fn test_format_changes_key() {
        let identity = identity();
        let bin = CacheKeyBuilder::new(&identity, "BincodeSerializer", "bin")
            .build(&("abc", true))
            .unwrap();
        let json = CacheKeyBuilder::new(&identity, "JsonSerializer", "json")
            .build(&("abc", true))
            .unwrap();
        assert_ne!(bin.hash(), json.hash());
    }

    #[test]
    fn test_ignored_positional_argument() {
        let identity = identity();
        let ignore: BTreeSet<String> = ["verbose".to_string()].into();
        let build = |args: &(&str, bool)| {
            CacheKeyBuilder::new(&identity, "BincodeSerializer", "bin")
                .ignore(&ignore)
                .build(args)
                .unwrap()
        };
        assert_eq!(build(&("abc", true)), build(&("abc", false)));
        assert_ne!(build(&("abc", true)), build(&("xyz", true)));
    }

    #[test]
    fn test_named_args_order_irrelevant() {
        let identity = FnIdentity::new("app::query");
        let a = NamedArgs::new().with("x", &1).with("y", "two");
        let b = NamedArgs::new().with("y", "two").with("x", &1);
        assert_eq!(key_of(&identity, &a), key_of(&identity, &b));
    }

    #[test]
    fn test_named_args_get() {
        let args = NamedArgs::new().with("limit", &25u32).with("tags", &vec!["a", "b"]);
        assert_eq!(args.get::<u32>("limit"), Some(25));
        assert_eq!(args.get::<Vec<String>>("tags").unwrap(), vec!["a", "b"]);
        assert_eq!(args.get::<u32>("missing"), None);
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_unrepresentable_argument_fails_derivation() {
        let identity = FnIdentity::new("app::lookup").with_params(&["table"]);
        let table: HashMap<(u8, u8), u8> = [((1, 2), 3)].into();
        let err = CacheKeyBuilder::new(&identity, "BincodeSerializer", "bin")
            .build(&(table,))
            .unwrap_err();
        assert!(matches!(err, CacheError::KeyDerivation { ref argument, .. } if argument == "table"));
    }

    #[test]
    fn test_map_arguments_hash_independently_of_insertion_order() {
        let identity = FnIdentity::new("app::merge").with_params(&["weights"]);
        let mut first = HashMap::new();
        let mut second = HashMap::new();
        for i in 0..32 {
            first.insert(format!("k{i}"), i);
        }
        for i in (0..32).rev() {
            second.insert(format!("k{i}"), i);
        }
        assert_eq!(key_of(&identity, &(first,)), key_of(&identity, &(second,)));
    }

    #[test]
    fn test_instance_tag_scopes_key() {
        let identity = identity();
        let base = CacheKeyBuilder::new(&identity, "BincodeSerializer", "bin");
        let plain = base.clone().build(&("abc", true)).unwrap();
        let one = base
            .clone()
            .instance(Some(InstanceTag::from_state(&json!(1))))
            .build(&("abc", true))
            .unwrap();
        let two = base
            .instance(Some(InstanceTag::from_state(&json!(2))))
            .build(&("abc", true))
            .unwrap();
        assert_ne!(plain, one);
        assert_ne!(one, two);
    }

    struct Anonymous {
        id: InstanceId,
    }
    impl InstanceKey for Anonymous {
        fn instance_state(&self) -> Value {
            self.id.to_value()
        }
    }

    struct Configured {
        region: &'static str,
    }
    impl InstanceKey for Configured {
        fn instance_state(&self) -> Value {
            json!({ "region": self.region })
        }
    }

    #[test]
    fn test_instance_ids_are_unique() {
        let a = Anonymous { id: InstanceId::new() };
        let b = Anonymous { id: InstanceId::new() };
        assert_eq!(InstanceTag::of(&a), InstanceTag::of(&a));
        assert_ne!(InstanceTag::of(&a), InstanceTag::of(&b));

        let cloned = Anonymous { id: a.id.clone() };
        assert_ne!(InstanceTag::of(&a), InstanceTag::of(&cloned));
    }

    #[test]
    fn test_dropped_instance_does_not_lend_its_tag() {
        let first = Box::new(Anonymous { id: InstanceId::new() });
        let first_tag = InstanceTag::of(&*first);
        drop(first);
        let second = Box::new(Anonymous { id: InstanceId::new() });
        assert_ne!(first_tag, InstanceTag::of(&*second));
    }

    #[test]
    fn test_instance_tag_follows_state() {
        let eu1 = Configured { region: "eu" };
        let eu2 = Configured { region: "eu" };
        let us = Configured { region: "us" };
        assert_eq!(InstanceTag::of(&eu1), InstanceTag::of(&eu2));
        assert_ne!(InstanceTag::of(&eu1), InstanceTag::of(&us));
        assert_eq!(InstanceTag::of(&eu1).digest().len(), 64);
    }

    #[test]
    fn test_sanitized_name() {
        let identity = FnIdentity::new("app::weird name!");
        assert_eq!(key_of(&identity, &()).name(), "weird_name_");
    }

    #[test]
    fn test_callable_macro_captures_source_and_params() {
        let add = crate::callable!(add, |a: i32, b: i32| a + b);
        assert_eq!(add.identity().name(), "add");
        assert!(add.identity().qualified_name().ends_with("key::tests::add"));
        assert_eq!(add.identity().params(), ["a", "b"]);
        assert!(add.identity().source().contains("a + b"));

        let (_, func) = add.into_parts();
        assert_eq!(func((2, 3)), 5);
    }

    #[test]
    fn test_callable_macro_keyword_form() {
        let query = crate::callable!(query, |args: NamedArgs| args.get::<u32>("limit").unwrap_or(10));
        assert!(query.identity().params().is_empty());
        assert!(query.identity().source().contains("limit"));

        let (_, func) = query.into_parts();
        assert_eq!(func(NamedArgs::new().with("limit", &3u32)), 3);
        assert_eq!(func(NamedArgs::new()), 10);
    }

    #[test]
    fn test_callable_macro_without_arguments() {
        let answer = crate::callable!(answer, || 42);
        assert!(answer.identity().params().is_empty());
        let (_, func) = answer.into_parts();
        assert_eq!(func(()), 42);
    }

    #[test]
    fn test_callable_macro_body_change_changes_key() {
        let v1 = crate::callable!(get_data, |key: String| key);
        let v2 = crate::callable!(get_data, |key: String| key.to_uppercase());
        let args = ("abc".to_string(),);
        assert_ne!(key_of(v1.identity(), &args), key_of(v2.identity(), &args));
    }

    proptest! {
        #[test]
        fn prop_distinct_strings_distinct_keys(a in ".{0,64}", b in ".{0,64}") {
            prop_assume!(a != b);
            let identity = FnIdentity::new("app::echo").with_params(&["s"]);
            prop_assert_ne!(key_of(&identity, &(a,)), key_of(&identity, &(b,)));
        }

        #[test]
        fn prop_key_is_deterministic(n in any::<i64>(), s in "[a-z]{0,16}") {
            let identity = FnIdentity::new("app::pair").with_params(&["n", "s"]);
            prop_assert_eq!(key_of(&identity, &(n, s.clone())), key_of(&identity, &(n, s)));
        }
    }
}
