/*!
# Canonicalizer

Turns one Python submission into named units of canonical lines. A unit
is either a function (by its bare name) or the module-level code
(`<module>`). Two submissions that differ only by identifier names,
string contents, comments, imports, docstrings, keyword-argument
spelling, qualified call targets or the orientation of a comparison get
identical units.

```rust,ignore
let units = Canonicalizer::default().canonicalize("def f(a):\n    return a + 1\n")?;
assert_eq!(units.get("f").unwrap().lines.len(), 2);
```
*/

pub mod normalize;
pub mod serialize;

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::CanonicalConfig;
use crate::core::ParseError;
use crate::python_parser::{Module, PythonParser};

pub use normalize::{inline_entry_point, lift_units, normalize_block, orient_comparison};
pub use serialize::{render_expr, serialize_block, serialize_function};

/// Name of the unit holding module-level code. Not a valid identifier, so
/// no function can take it.
pub const TOP_LEVEL_UNIT: &str = "<module>";

/// Canonical lines of one function or of the module level
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unit {
    pub name: String,
    pub lines: Vec<String>,
}

impl Unit {
    pub fn new(name: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            name: name.into(),
            lines,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Units of one submission, ordered by name. Units with no lines are
/// never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionUnits {
    units: BTreeMap<String, Unit>,
}

impl SubmissionUnits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a unit, replacing one with the same name; empty units are ignored
    pub fn insert(&mut self, unit: Unit) {
        if !unit.is_empty() {
            self.units.insert(unit.name.clone(), unit);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Unit> {
        self.units.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Sum of line counts over all units
    pub fn total_lines(&self) -> usize {
        self.units.values().map(Unit::len).sum()
    }
}

impl FromIterator<Unit> for SubmissionUnits {
    fn from_iter<I: IntoIterator<Item = Unit>>(iter: I) -> Self {
        let mut units = Self::new();
        for unit in iter {
            units.insert(unit);
        }
        units
    }
}

/// Source text to [`SubmissionUnits`]
#[derive(Debug, Clone, Default)]
pub struct Canonicalizer {
    parser: PythonParser,
    config: CanonicalConfig,
}

impl Canonicalizer {
    pub fn new(config: CanonicalConfig) -> Self {
        Self {
            parser: PythonParser::new(),
            config,
        }
    }

    pub fn config(&self) -> &CanonicalConfig {
        &self.config
    }

    /// Parses and canonicalises a submission
    pub fn canonicalize(&self, source: &str) -> Result<SubmissionUnits, ParseError> {
        let module = self.parser.parse(source)?;
        Ok(self.canonicalize_module(module))
    }

    /// Canonicalises an already parsed module
    pub fn canonicalize_module(&self, module: Module) -> SubmissionUnits {
        let module = if self.config.inline_entry_point {
            let inlined = inline_entry_point(module, &self.config.entry_point);
            if inlined.call_sites > 0 {
                debug!(
                    "Inlined '{}' at {} call site(s)",
                    self.config.entry_point, inlined.call_sites
                );
            }
            inlined.module
        } else {
            module
        };

        let program = lift_units(module);
        let mut units = SubmissionUnits::new();

        let top_level = normalize_block(program.top_level);
        units.insert(Unit::new(TOP_LEVEL_UNIT, serialize_block(&top_level)));

        for (name, mut def) in program.functions {
            def.params = normalize::normalize_params(def.params);
            def.returns = def.returns.map(normalize::normalize_expr);
            def.body = normalize_block(def.body);

            // сигнатура без тела юнитом не считается
            if def.body.is_empty() {
                debug!("Unit '{}' is empty after normalisation, skipped", name);
                continue;
            }
            let lines = serialize_function(&def);
            debug!("Unit '{}': {} line(s)", name, lines.len());
            units.insert(Unit::new(name, lines));
        }

        units
    }
}

/// Canonicalises with default settings
pub fn canonicalize(source: &str) -> Result<SubmissionUnits, ParseError> {
    Canonicalizer::default().canonicalize(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn units(source: &str) -> SubmissionUnits {
        canonicalize(source).unwrap()
    }

    fn lines<'a>(units: &'a SubmissionUnits, name: &str) -> &'a [String] {
        &units.get(name).unwrap().lines
    }

    #[test]
    fn test_empty_source_has_no_units() {
        assert!(units("").is_empty());
        assert!(units("# only a comment\nimport os\n\"\"\"doc\"\"\"\n").is_empty());
    }

    #[test]
    fn test_docstring_only_function_is_not_a_unit() {
        let stub = units("def f(x):\n    \"\"\"doc\"\"\"\n");
        assert!(!stub.contains("f"));
        assert!(stub.is_empty());

        let real = units("def f(y):\n    return y * 2\n");
        assert_eq!(crate::similarity::similarity(&stub, &real), 0.0);

        // `pass` остается телом
        assert!(units("def f(x):\n    pass\n").contains("f"));
    }

    #[test]
    fn test_renaming_does_not_change_units() {
        let a = units("def area(w, h):\n    result = w * h\n    return result\n");
        let b = units("def area(x, y):\n    r = x * y\n    return r\n");
        assert_eq!(a, b);
    }

    #[test]
    fn test_function_names_are_unit_keys() {
        let u = units("def f():\n    return 1\n\ndef g(a):\n    return a\n\nprint(f())\n");
        let names: Vec<&str> = u.names().collect();
        assert_eq!(names, vec![TOP_LEVEL_UNIT, "f", "g"]);
        assert_eq!(lines(&u, "f"), ["Return(value=Constant(1))"]);
        assert_eq!(u.total_lines(), 4);
    }

    #[test]
    fn test_entry_point_is_inlined_into_module_unit() {
        let wrapped = units("def main():\n    x = int(input())\n    print(x * 2)\n\nmain()\n");
        let plain = units("x = int(input())\nprint(x * 2)\n");
        assert_eq!(wrapped, plain);
        assert!(!wrapped.contains("main"));
    }

    #[test]
    fn test_uncalled_entry_point_stays_a_unit() {
        let u = units("def main():\n    return 1\n");
        assert!(u.contains("main"));
        assert!(!u.contains(TOP_LEVEL_UNIT));
    }

    #[test]
    fn test_inlining_can_be_disabled() {
        let canonicalizer = Canonicalizer::new(CanonicalConfig {
            inline_entry_point: false,
            ..CanonicalConfig::default()
        });
        let u = canonicalizer
            .canonicalize("def main():\n    x = 1\n\nmain()\n")
            .unwrap();
        assert!(u.contains("main"));
        assert_eq!(lines(&u, TOP_LEVEL_UNIT), ["Expr(value=Call(func=Name))"]);
    }

    #[test]
    fn test_reflected_comparisons_are_equal() {
        assert_eq!(units("if a <= b:\n    pass\n"), units("if b >= a:\n    pass\n"));
        assert_eq!(units("if x < 10:\n    pass\n"), units("if 10 > x:\n    pass\n"));
        assert_eq!(units("y = x == 1\n"), units("y = 1 == x\n"));
    }

    #[test]
    fn test_call_spelling_does_not_matter() {
        assert_eq!(
            units("import math\nr = math.sqrt(x=4)\n"),
            units("from math import sqrt\nr = sqrt(4)\n")
        );
    }

    #[test]
    fn test_methods_are_lifted_and_class_stays() {
        let u = units(
            "class Shape(Base):\n    sides = 4\n    def area(self):\n        return self.w * self.h\n",
        );
        assert_eq!(
            lines(&u, TOP_LEVEL_UNIT),
            ["ClassDef(bases=[Name])", "    Assign(targets=[Name], value=Constant(4))"]
        );
        assert_eq!(
            lines(&u, "area"),
            [
                "FunctionDef(args=arguments(args=[arg]))",
                "Return(value=BinOp(left=Attribute(attr=w), op=Mult, right=Attribute(attr=h)))",
            ]
        );
    }

    #[test]
    fn test_syntax_error_propagates() {
        assert!(canonicalize("def broken(:\n").is_err());
    }
}
