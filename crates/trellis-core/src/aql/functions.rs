//! Function registry
//!
//! Maps upper-cased function names to implementations. Built-ins are
//! installed by [`FunctionRegistry::init`] and cannot be replaced; user
//! functions live in a separate set that can be swapped atomically with
//! [`FunctionRegistry::reload`].
//!
//! # Naming rules
//!
//! | Kind | Form | Example |
//! |------|------|---------|
//! | built-in | `NAME` | `LENGTH` |
//! | user | `NAMESPACE::NAME` | `MYAPP::SCORE` |
//!
//! Lookups are case-insensitive. Plans resolve every call once and keep the
//! `Arc<FunctionDef>`, so a later reload does not affect planned queries.

use crate::error::{TraversalError, TraversalResult};
use crate::types::value::Value;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Function body: evaluated arguments in, result out
pub type FunctionImpl = Arc<dyn Fn(&[Value]) -> TraversalResult<Value> + Send + Sync>;

/// Functions resolved for one plan, keyed by upper-cased name
pub type FunctionTable = FxHashMap<String, Arc<FunctionDef>>;

/// A callable function with its arity and determinism
#[derive(Clone)]
pub struct FunctionDef {
    name: String,
    min_args: usize,
    max_args: usize,
    deterministic: bool,
    implementation: FunctionImpl,
}

impl FunctionDef {
    pub fn new<F>(
        name: impl Into<String>,
        arity: RangeInclusive<usize>,
        deterministic: bool,
        implementation: F,
    ) -> Self
    where
        F: Fn(&[Value]) -> TraversalResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into().to_ascii_uppercase(),
            min_args: *arity.start(),
            max_args: *arity.end(),
            deterministic,
            implementation: Arc::new(implementation),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the same arguments always produce the same result
    pub fn is_deterministic(&self) -> bool {
        self.deterministic
    }

    /// Reject calls with the wrong number of arguments
    pub fn check_arity(&self, actual: usize) -> TraversalResult<()> {
        if actual < self.min_args || actual > self.max_args {
            return Err(TraversalError::FunctionArgumentNumberMismatch {
                name: self.name.clone(),
                min: self.min_args,
                max: self.max_args,
                actual,
            });
        }
        Ok(())
    }

    pub fn call(&self, args: &[Value]) -> TraversalResult<Value> {
        self.check_arity(args.len())?;
        (self.implementation)(args)
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("deterministic", &self.deterministic)
            .finish_non_exhaustive()
    }
}

/// Built-in and user function lookup
pub struct FunctionRegistry {
    builtins: FxHashMap<String, Arc<FunctionDef>>,
    user: RwLock<FxHashMap<String, Arc<FunctionDef>>>,
}

impl FunctionRegistry {
    /// Create a registry holding all built-in functions and no user functions
    pub fn init() -> Self {
        let builtins = builtin_functions()
            .into_iter()
            .map(|def| (def.name.clone(), Arc::new(def)))
            .collect();

        Self {
            builtins,
            user: RwLock::new(FxHashMap::default()),
        }
    }

    /// Register a user function (`NAMESPACE::NAME`)
    pub fn register<F>(
        &self,
        name: &str,
        arity: RangeInclusive<usize>,
        deterministic: bool,
        implementation: F,
    ) -> TraversalResult<()>
    where
        F: Fn(&[Value]) -> TraversalResult<Value> + Send + Sync + 'static,
    {
        let def = FunctionDef::new(name, arity, deterministic, implementation);
        self.validate_user_name(&def.name)?;
        self.user.write().insert(def.name.clone(), Arc::new(def));
        Ok(())
    }

    /// Replace the whole user function set
    ///
    /// All names are validated first; on error the current set is kept.
    pub fn reload(&self, functions: impl IntoIterator<Item = FunctionDef>) -> TraversalResult<()> {
        let mut next = FxHashMap::default();
        for def in functions {
            self.validate_user_name(&def.name)?;
            next.insert(def.name.clone(), Arc::new(def));
        }
        *self.user.write() = next;
        Ok(())
    }

    /// Find a function by name (case-insensitive)
    pub fn lookup(&self, name: &str) -> Option<Arc<FunctionDef>> {
        let name = name.to_ascii_uppercase();
        if let Some(def) = self.builtins.get(&name) {
            return Some(def.clone());
        }
        self.user.read().get(&name).cloned()
    }

    /// Number of registered user functions
    pub fn user_function_count(&self) -> usize {
        self.user.read().len()
    }

    fn validate_user_name(&self, name: &str) -> TraversalResult<()> {
        let invalid = |message: &str| TraversalError::FunctionNameInvalid {
            name: name.to_string(),
            message: message.to_string(),
        };

        let Some((namespace, local)) = name.rsplit_once("::") else {
            return Err(invalid("user functions must be namespaced (NAMESPACE::NAME)"));
        };
        let valid_part = |part: &str| {
            part.chars().next().map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
                && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        };
        if !namespace.split("::").all(valid_part) || !valid_part(local) {
            return Err(invalid("invalid characters in function name"));
        }
        if self.builtins.contains_key(name) {
            return Err(invalid("cannot redefine a built-in function"));
        }
        Ok(())
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::init()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("builtins", &self.builtins.len())
            .field("user", &self.user.read().len())
            .finish()
    }
}

/// Number result that stays integral when possible
fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        Value::Int(value as i64)
    } else {
        Value::float(value)
    }
}

fn length(args: &[Value]) -> TraversalResult<Value> {
    let len = match &args[0] {
        Value::Null => 0,
        Value::Bool(b) => usize::from(*b),
        Value::Int(_) | Value::Float(_) => args[0].to_display_string().chars().count(),
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(pairs) => pairs.len(),
    };
    Ok(Value::from(len as u64))
}

fn boundary_element(name: &'static str, args: &[Value], first: bool) -> TraversalResult<Value> {
    match &args[0] {
        Value::Array(items) => {
            let item = if first { items.first() } else { items.last() };
            Ok(item.cloned().unwrap_or(Value::Null))
        }
        Value::Null => Ok(Value::Null),
        other => Err(TraversalError::FunctionArgumentTypeMismatch {
            name: name.to_string(),
            message: format!("expected an array, got {}", other.type_name()),
        }),
    }
}

fn builtin_functions() -> Vec<FunctionDef> {
    vec![
        FunctionDef::new("LENGTH", 1..=1, true, length),
        FunctionDef::new("COUNT", 1..=1, true, length),
        FunctionDef::new("LOWER", 1..=1, true, |args| {
            Ok(Value::from(args[0].to_display_string().to_lowercase()))
        }),
        FunctionDef::new("UPPER", 1..=1, true, |args| {
            Ok(Value::from(args[0].to_display_string().to_uppercase()))
        }),
        FunctionDef::new("CONCAT", 1..=usize::MAX, true, |args| {
            let mut out = String::new();
            for arg in args {
                match arg {
                    Value::Array(items) => items
                        .iter()
                        .filter(|item| !item.is_null())
                        .for_each(|item| out.push_str(&item.to_display_string())),
                    other => out.push_str(&other.to_display_string()),
                }
            }
            Ok(Value::from(out))
        }),
        FunctionDef::new("CONTAINS", 2..=3, true, |args| {
            let text = args[0].to_display_string();
            let search = args[1].to_display_string();
            let return_index = args.get(2).map_or(false, Value::is_truthy);
            if !return_index {
                return Ok(Value::Bool(text.contains(&search)));
            }
            let position = text
                .find(&search)
                .map(|byte| text[..byte].chars().count() as i64)
                .unwrap_or(-1);
            Ok(Value::Int(position))
        }),
        FunctionDef::new("TO_NUMBER", 1..=1, true, |args| Ok(number(args[0].to_number()))),
        FunctionDef::new("TO_STRING", 1..=1, true, |args| {
            Ok(Value::from(args[0].to_display_string()))
        }),
        FunctionDef::new("TO_BOOL", 1..=1, true, |args| Ok(Value::Bool(args[0].is_truthy()))),
        FunctionDef::new("IS_NULL", 1..=1, true, |args| Ok(Value::Bool(args[0].is_null()))),
        FunctionDef::new("FIRST", 1..=1, true, |args| boundary_element("FIRST", args, true)),
        FunctionDef::new("LAST", 1..=1, true, |args| boundary_element("LAST", args, false)),
        FunctionDef::new("ABS", 1..=1, true, |args| match &args[0] {
            Value::Int(i) => Ok(i.checked_abs().map(Value::Int).unwrap_or_else(|| Value::float((*i as f64).abs()))),
            other => Ok(number(other.to_number().abs())),
        }),
        FunctionDef::new("RAND", 0..=0, false, |_| Ok(Value::float(rand::random::<f64>()))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(registry: &FunctionRegistry, name: &str, args: &[Value]) -> Value {
        let def = registry.lookup(name).unwrap();
        def.check_arity(args.len()).unwrap();
        def.call(args).unwrap()
    }

    #[test]
    fn test_builtins_installed() {
        let registry = FunctionRegistry::init();
        for name in [
            "LENGTH", "COUNT", "LOWER", "UPPER", "CONCAT", "CONTAINS", "TO_NUMBER", "TO_STRING",
            "TO_BOOL", "IS_NULL", "FIRST", "LAST", "ABS", "RAND",
        ] {
            assert!(registry.lookup(name).is_some(), "missing {}", name);
        }
        assert!(registry.lookup("length").is_some());
        assert!(registry.lookup("NOPE").is_none());
    }

    #[test]
    fn test_determinism_flags() {
        let registry = FunctionRegistry::init();
        assert!(registry.lookup("LENGTH").unwrap().is_deterministic());
        assert!(!registry.lookup("RAND").unwrap().is_deterministic());
    }

    #[test]
    fn test_length_semantics() {
        let registry = FunctionRegistry::init();
        assert_eq!(call(&registry, "LENGTH", &[Value::Null]), Value::Int(0));
        assert_eq!(call(&registry, "LENGTH", &[Value::string("häh")]), Value::Int(3));
        assert_eq!(
            call(&registry, "LENGTH", &[Value::array([Value::Int(1), Value::Int(2)])]),
            Value::Int(2)
        );
        assert_eq!(call(&registry, "LENGTH", &[Value::Int(123)]), Value::Int(3));
    }

    #[test]
    fn test_string_functions() {
        let registry = FunctionRegistry::init();
        assert_eq!(call(&registry, "LOWER", &[Value::string("AbC")]), Value::string("abc"));
        assert_eq!(
            call(&registry, "CONCAT", &[Value::string("a"), Value::Int(1), Value::Null]),
            Value::string("a1")
        );
        assert_eq!(
            call(&registry, "CONTAINS", &[Value::string("foobar"), Value::string("bar")]),
            Value::Bool(true)
        );
        assert_eq!(
            call(
                &registry,
                "CONTAINS",
                &[Value::string("foobar"), Value::string("bar"), Value::Bool(true)]
            ),
            Value::Int(3)
        );
    }

    #[test]
    fn test_conversion_functions() {
        let registry = FunctionRegistry::init();
        assert_eq!(call(&registry, "TO_NUMBER", &[Value::string("42")]), Value::Int(42));
        assert_eq!(call(&registry, "TO_STRING", &[Value::Float(1.5)]), Value::string("1.5"));
        assert_eq!(call(&registry, "TO_BOOL", &[Value::array([])]), Value::Bool(true));
        assert_eq!(call(&registry, "ABS", &[Value::Int(-3)]), Value::Int(3));
    }

    #[test]
    fn test_first_last() {
        let registry = FunctionRegistry::init();
        let list = Value::array([Value::Int(1), Value::Int(2)]);
        assert_eq!(call(&registry, "FIRST", &[list.clone()]), Value::Int(1));
        assert_eq!(call(&registry, "LAST", &[list]), Value::Int(2));
        assert_eq!(call(&registry, "FIRST", &[Value::array([])]), Value::Null);

        let err = registry.lookup("FIRST").unwrap().call(&[Value::Int(1)]).unwrap_err();
        assert_eq!(err.code(), 1542);
    }

    #[test]
    fn test_arity_mismatch() {
        let registry = FunctionRegistry::init();
        let err = registry.lookup("LENGTH").unwrap().check_arity(2).unwrap_err();
        assert_eq!(err.code(), 1541);
        assert!(registry.lookup("CONCAT").unwrap().check_arity(10).is_ok());
    }

    #[test]
    fn test_register_user_function() {
        let registry = FunctionRegistry::init();
        registry
            .register("myapp::double", 1..=1, true, |args| {
                Ok(Value::from(args[0].to_number() * 2.0))
            })
            .unwrap();

        let def = registry.lookup("MYAPP::DOUBLE").unwrap();
        assert_eq!(def.name(), "MYAPP::DOUBLE");
        assert_eq!(def.call(&[Value::Int(4)]).unwrap(), Value::Int(8));
    }

    #[test]
    fn test_user_function_names_validated() {
        let registry = FunctionRegistry::init();
        let noop = |_: &[Value]| Ok(Value::Null);

        let err = registry.register("plain", 0..=0, false, noop).unwrap_err();
        assert_eq!(err.code(), 1580);

        let err = registry.register("a::1bad", 0..=0, false, noop).unwrap_err();
        assert_eq!(err.code(), 1580);

        assert!(registry.register("ns::sub::fn", 0..=0, false, noop).is_ok());
    }

    #[test]
    fn test_reload_swaps_user_set() {
        let registry = FunctionRegistry::init();
        registry
            .register("old::fn", 0..=0, false, |_| Ok(Value::Null))
            .unwrap();

        registry
            .reload([FunctionDef::new("new::fn", 0..=0, true, |_| Ok(Value::Int(1)))])
            .unwrap();
        assert!(registry.lookup("OLD::FN").is_none());
        assert!(registry.lookup("NEW::FN").is_some());

        // A bad entry leaves the current set untouched
        let result = registry.reload([
            FunctionDef::new("next::fn", 0..=0, true, |_| Ok(Value::Null)),
            FunctionDef::new("unnamespaced", 0..=0, true, |_| Ok(Value::Null)),
        ]);
        assert!(result.is_err());
        assert!(registry.lookup("NEW::FN").is_some());
        assert_eq!(registry.user_function_count(), 1);
    }

    #[test]
    fn test_resolved_definition_survives_reload() {
        let registry = FunctionRegistry::init();
        registry
            .register("ns::answer", 0..=0, true, |_| Ok(Value::Int(42)))
            .unwrap();
        let resolved = registry.lookup("ns::answer").unwrap();

        registry.reload(Vec::new()).unwrap();
        assert!(registry.lookup("ns::answer").is_none());
        assert_eq!(resolved.call(&[]).unwrap(), Value::Int(42));
    }
}
