// src/template.rs

//! Template rendering for template files and makefile fragments

use crate::error::{Error, Result};
use crate::module::ModuleDescriptor;
use minijinja::{Environment, Value};
use serde::Serialize;
use std::collections::BTreeMap;

/// Template variables from the project configuration
pub type Vars = BTreeMap<String, toml::Value>;

/// Render `source` with `context`; `name` only labels errors
pub fn render_template<S: Serialize>(name: &str, source: &str, context: S) -> Result<String> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    let template = env
        .template_from_named_str(name, source)
        .map_err(|e| Error::Template(format!("{}: {}", name, e)))?;
    template
        .render(context)
        .map_err(|e| Error::Template(format!("{}: {}", name, e)))
}

/// Configuration variables as a rendering context
pub fn vars_context(vars: &Vars) -> BTreeMap<String, Value> {
    vars.iter()
        .map(|(key, value)| (key.clone(), Value::from_serialize(value)))
        .collect()
}

/// Configuration variables plus a `module` object holding the module's
/// name, destination directory and free-form fields
pub fn module_context(vars: &Vars, module: &ModuleDescriptor) -> BTreeMap<String, Value> {
    let mut fields: BTreeMap<String, Value> = module
        .extra
        .iter()
        .map(|(key, value)| (key.clone(), Value::from_serialize(value)))
        .collect();
    fields.insert("name".to_string(), Value::from(module.name.as_str()));
    fields.insert("dstdir".to_string(), Value::from(module.dest_dir.as_str()));

    let mut context = vars_context(vars);
    context.insert("module".to_string(), Value::from_serialize(&fields));
    context
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_with_vars() {
        let mut vars = Vars::new();
        vars.insert("arch".to_string(), toml::Value::String("x86_64".to_string()));
        let out = render_template("t", "ARCH = {{ arch }}", vars_context(&vars)).unwrap();
        assert_eq!(out, "ARCH = x86_64");
    }

    #[test]
    fn test_module_fields_are_visible() {
        let mut module = ModuleDescriptor::new("uart", "/mods/uart/mcconf.toml");
        module
            .extra
            .insert("baud".to_string(), toml::Value::Integer(115200));
        let out = render_template(
            "t",
            "{{ module.name }}@{{ module.baud }}",
            module_context(&Vars::new(), &module),
        )
        .unwrap();
        assert_eq!(out, "uart@115200");
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let err = render_template("broken", "{% if %}", vars_context(&Vars::new())).unwrap_err();
        assert!(matches!(err, Error::Template(ref m) if m.starts_with("broken")));
    }
}
