//! Named, precompiled PowerShell script templates.
//!
//! Templates use minijinja syntax (`{{ key }}`, `{% if %}`, `{% for %}`).
//! They are compiled when registered, so a malformed template is reported
//! at startup instead of on the first call that uses it. A registry is
//! filled once and then shared read-only, usually behind an `Arc`.

use crate::binder::BoundArgs;
use crate::{ScriptOpsError, ScriptOpsResult};
use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Global functions minijinja provides; referencing them is not a substitution.
const BUILTIN_GLOBALS: [&str; 4] = ["range", "dict", "namespace", "debug"];

/// A registered template and the substitution keys it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    name: String,
    source: String,
    required_keys: BTreeSet<String>,
}

impl CommandTemplate {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn required_keys(&self) -> &BTreeSet<String> {
        &self.required_keys
    }
}

#[derive(Debug)]
pub struct TemplateRegistry {
    env: Environment<'static>,
    templates: BTreeMap<String, Arc<CommandTemplate>>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRegistry {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);

        Self {
            env,
            templates: BTreeMap::new(),
        }
    }

    /// Compile and register a template.
    pub fn register(&mut self, name: &str, text: &str) -> ScriptOpsResult<Arc<CommandTemplate>> {
        if self.templates.contains_key(name) {
            return Err(ScriptOpsError::DuplicateTemplate {
                name: name.to_string(),
            });
        }

        self.env
            .add_template_owned(name.to_string(), text.to_string())
            .map_err(|err| ScriptOpsError::TemplateSyntax {
                name: name.to_string(),
                message: err.to_string(),
            })?;

        let compiled = self
            .env
            .get_template(name)
            .map_err(|err| ScriptOpsError::TemplateSyntax {
                name: name.to_string(),
                message: err.to_string(),
            })?;

        let required_keys = compiled
            .undeclared_variables(false)
            .into_iter()
            .filter(|key| !BUILTIN_GLOBALS.contains(&key.as_str()))
            .collect::<BTreeSet<_>>();

        let template = Arc::new(CommandTemplate {
            name: name.to_string(),
            source: text.to_string(),
            required_keys,
        });
        self.templates
            .insert(name.to_string(), Arc::clone(&template));

        tracing::debug!(
            template = name,
            required_keys = ?template.required_keys,
            "Registered script template"
        );

        Ok(template)
    }

    pub fn get(&self, name: &str) -> ScriptOpsResult<&Arc<CommandTemplate>> {
        self.templates
            .get(name)
            .ok_or_else(|| ScriptOpsError::UnknownTemplate {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Render a template with already bound (escaped) arguments.
    pub fn render(&self, name: &str, args: &BoundArgs) -> ScriptOpsResult<String> {
        let template = self.get(name)?;

        if let Some(key) = template
            .required_keys
            .iter()
            .find(|key| !args.contains(key))
        {
            return Err(ScriptOpsError::MissingSubstitution {
                template: name.to_string(),
                key: key.clone(),
            });
        }

        let compiled = self
            .env
            .get_template(name)
            .map_err(|_| ScriptOpsError::UnknownTemplate {
                name: name.to_string(),
            })?;

        compiled
            .render(minijinja::Value::from_serialize(args.values()))
            .map_err(|err| match err.kind() {
                ErrorKind::UndefinedError => ScriptOpsError::MissingSubstitution {
                    template: name.to_string(),
                    key: err.detail().unwrap_or("unknown").to_string(),
                },
                _ => ScriptOpsError::TemplateSyntax {
                    name: name.to_string(),
                    message: err.to_string(),
                },
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GET_LIST: &str = "Get-Thing -Name '{{ target }}' | ConvertTo-Json";

    fn registry() -> TemplateRegistry {
        let mut registry = TemplateRegistry::new();
        registry.register("GetList", GET_LIST).expect("register");
        registry
    }

    #[test]
    fn register_records_required_keys() {
        let mut registry = TemplateRegistry::new();
        let template = registry
            .register(
                "Toggle",
                "{% if enabled %}Enable{% else %}Disable{% endif %}-Thing -Name '{{ target }}'",
            )
            .unwrap();
        let keys = template.required_keys().iter().cloned().collect::<Vec<_>>();
        assert_eq!(keys, vec!["enabled".to_string(), "target".to_string()]);
        assert_eq!(template.name(), "Toggle");
    }

    #[test]
    fn loop_variables_are_not_required_keys() {
        let mut registry = TemplateRegistry::new();
        let template = registry
            .register(
                "Many",
                "{% for name in names %}'{{ name }}' {% endfor %}",
            )
            .unwrap();
        assert_eq!(
            template.required_keys().iter().cloned().collect::<Vec<_>>(),
            vec!["names".to_string()]
        );
    }

    #[test]
    fn register_rejects_malformed_syntax() {
        let mut registry = TemplateRegistry::new();
        let err = registry
            .register("Broken", "Get-Thing -Name '{{ target '")
            .unwrap_err();
        assert!(matches!(err, ScriptOpsError::TemplateSyntax { name, .. } if name == "Broken"));
        assert!(registry.is_empty());
    }

    #[test]
    fn register_rejects_duplicate_names() {
        let mut registry = registry();
        let err = registry.register("GetList", "other").unwrap_err();
        assert!(matches!(err, ScriptOpsError::DuplicateTemplate { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn render_substitutes_bound_values() {
        let registry = registry();
        let args = BoundArgs::new().text("target", "vmA").unwrap();
        let script = registry.render("GetList", &args).unwrap();
        assert_eq!(script, "Get-Thing -Name 'vmA' | ConvertTo-Json");
    }

    #[test]
    fn render_is_deterministic() {
        let registry = registry();
        let args = BoundArgs::new().text("target", "it's").unwrap();
        let first = registry.render("GetList", &args).unwrap();
        for _ in 0..10 {
            assert_eq!(registry.render("GetList", &args).unwrap(), first);
        }
        assert_eq!(first, "Get-Thing -Name 'it''s' | ConvertTo-Json");
    }

    #[test]
    fn render_reports_missing_substitution() {
        let registry = registry();
        let err = registry.render("GetList", &BoundArgs::new()).unwrap_err();
        match err {
            ScriptOpsError::MissingSubstitution { template, key } => {
                assert_eq!(template, "GetList");
                assert_eq!(key, "target");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn render_unknown_template() {
        let registry = registry();
        let err = registry.render("Nope", &BoundArgs::new()).unwrap_err();
        assert!(matches!(err, ScriptOpsError::UnknownTemplate { name } if name == "Nope"));
    }
}
