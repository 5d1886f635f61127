//! Environment resolution and expected-value templates.
//!
//! The [`EnvironmentContext`] is resolved once per run from [`HarnessConfig`]
//! and shared read-only by every scenario. [`Template`]s are the
//! environment-dependent strings scenarios are written with
//! (`jarombek-com-{env}-alb`); the engine renders them against the context.

use crate::config::{ConfigError, HarnessConfig};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Environment under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Production. Also the resolution of an absent `TEST_ENV`.
    #[default]
    Prod,
    /// Development.
    Dev,
}

impl Environment {
    /// Parse an environment name (case-insensitive, surrounding whitespace ignored).
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" => Ok(Environment::Prod),
            "dev" => Ok(Environment::Dev),
            other => Err(ConfigError::InvalidEnvironment(format!(
                "TEST_ENV must be 'prod' or 'dev', got '{}'",
                other
            ))),
        }
    }

    /// Lowercase name used in resource names.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Prod => "prod",
            Environment::Dev => "dev",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Environment-specific expected values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentContext {
    pub name: Environment,
    pub base_domain: String,
    pub website_host: String,
    /// Certificate domain patterns, primary first.
    pub wildcard_cert_patterns: [String; 2],
}

impl EnvironmentContext {
    /// Build the context for an environment under a base domain.
    #[must_use]
    pub fn for_environment(name: Environment, base_domain: &str) -> Self {
        match name {
            Environment::Prod => Self {
                name,
                base_domain: base_domain.to_string(),
                website_host: base_domain.to_string(),
                wildcard_cert_patterns: [base_domain.to_string(), format!("*.{}", base_domain)],
            },
            Environment::Dev => Self {
                name,
                base_domain: base_domain.to_string(),
                website_host: format!("dev.{}", base_domain),
                wildcard_cert_patterns: [
                    format!("*.{}", base_domain),
                    format!("*.dev.{}", base_domain),
                ],
            },
        }
    }

    /// Primary certificate domain (`jarombek.com` in prod).
    #[must_use]
    pub fn cert_primary(&self) -> &str {
        let [primary, _] = &self.wildcard_cert_patterns;
        primary
    }

    /// Secondary certificate domain (`*.jarombek.com` in prod).
    #[must_use]
    pub fn cert_secondary(&self) -> &str {
        let [_, secondary] = &self.wildcard_cert_patterns;
        secondary
    }
}

/// Resolve the environment context for this run.
#[must_use]
pub fn resolve(config: &HarnessConfig) -> EnvironmentContext {
    let context = EnvironmentContext::for_environment(config.environment, &config.base_domain);

    tracing::info!(
        target: "infra_tests.environment",
        environment = %context.name,
        website_host = %context.website_host,
        cert_primary = %context.cert_primary(),
        cert_secondary = %context.cert_secondary(),
        "Environment resolved"
    );

    context
}

/// A value resolved from the context inside a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Env,
    BaseDomain,
    WebsiteHost,
    CertPrimary,
    CertSecondary,
}

impl Placeholder {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "env" => Some(Placeholder::Env),
            "base_domain" => Some(Placeholder::BaseDomain),
            "website_host" => Some(Placeholder::WebsiteHost),
            "cert_primary" => Some(Placeholder::CertPrimary),
            "cert_secondary" => Some(Placeholder::CertSecondary),
            _ => None,
        }
    }

    fn value<'a>(&self, context: &'a EnvironmentContext) -> &'a str {
        match self {
            Placeholder::Env => context.name.as_str(),
            Placeholder::BaseDomain => &context.base_domain,
            Placeholder::WebsiteHost => &context.website_host,
            Placeholder::CertPrimary => context.cert_primary(),
            Placeholder::CertSecondary => context.cert_secondary(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Part {
    Literal(String),
    Placeholder(Placeholder),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder '{{{name}}}' in template '{template}'")]
    UnknownPlaceholder { template: String, name: String },

    #[error("unbalanced braces in template '{0}'")]
    Unbalanced(String),
}

/// A string with `{placeholder}` references to the environment context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Template {
    source: String,
    parts: Vec<Part>,
}

impl Template {
    /// Parse a template, rejecting unknown placeholders and stray braces.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars();

        while let Some(ch) = chars.next() {
            match ch {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for inner in chars.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        if inner == '{' {
                            return Err(TemplateError::Unbalanced(source.to_string()));
                        }
                        name.push(inner);
                    }
                    if !closed {
                        return Err(TemplateError::Unbalanced(source.to_string()));
                    }
                    let placeholder = Placeholder::from_name(name.trim()).ok_or_else(|| {
                        TemplateError::UnknownPlaceholder {
                            template: source.to_string(),
                            name: name.clone(),
                        }
                    })?;
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(Part::Placeholder(placeholder));
                }
                '}' => return Err(TemplateError::Unbalanced(source.to_string())),
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            parts,
        })
    }

    /// Substitute every placeholder from the context.
    #[must_use]
    pub fn render(&self, context: &EnvironmentContext) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                Part::Literal(text) => text.as_str(),
                Part::Placeholder(placeholder) => placeholder.value(context),
            })
            .collect()
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn prod() -> EnvironmentContext {
        EnvironmentContext::for_environment(Environment::Prod, "jarombek.com")
    }

    fn dev() -> EnvironmentContext {
        EnvironmentContext::for_environment(Environment::Dev, "jarombek.com")
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("prod").unwrap(), Environment::Prod);
        assert_eq!(Environment::parse(" DEV ").unwrap(), Environment::Dev);
        assert!(Environment::parse("").is_err());
        assert!(Environment::parse("production").is_err());
    }

    #[test]
    fn test_prod_context() {
        let context = prod();
        assert_eq!(context.website_host, "jarombek.com");
        assert_eq!(context.cert_primary(), "jarombek.com");
        assert_eq!(context.cert_secondary(), "*.jarombek.com");
    }

    #[test]
    fn test_dev_context() {
        let context = dev();
        assert_eq!(context.website_host, "dev.jarombek.com");
        assert_eq!(context.cert_primary(), "*.jarombek.com");
        assert_eq!(context.cert_secondary(), "*.dev.jarombek.com");
    }

    #[test]
    fn test_resolve_without_test_env_is_prod() {
        let config = HarnessConfig::from_vars(&HashMap::new()).unwrap();
        assert_eq!(resolve(&config), prod());
    }

    #[test]
    fn test_resolve_dev() {
        let vars = HashMap::from([("TEST_ENV".to_string(), "dev".to_string())]);
        let config = HarnessConfig::from_vars(&vars).unwrap();
        assert_eq!(resolve(&config), dev());
    }

    #[test]
    fn test_template_render() {
        let template = Template::parse("jarombek-com-{env}-alb").unwrap();
        assert_eq!(template.render(&prod()), "jarombek-com-prod-alb");
        assert_eq!(template.render(&dev()), "jarombek-com-dev-alb");

        let template = Template::parse("www.{website_host}.").unwrap();
        assert_eq!(template.render(&dev()), "www.dev.jarombek.com.");

        let template = Template::parse("{cert_primary}|{cert_secondary}").unwrap();
        assert_eq!(template.render(&prod()), "jarombek.com|*.jarombek.com");
    }

    #[test]
    fn test_template_without_placeholders() {
        let template = Template::parse("internet-facing").unwrap();
        assert_eq!(template.render(&prod()), "internet-facing");
        assert_eq!(template.to_string(), "internet-facing");
    }

    #[test]
    fn test_template_rejects_unknown_placeholder() {
        let err = Template::parse("jarombek-com-{region}-alb").unwrap_err();
        assert!(matches!(err, TemplateError::UnknownPlaceholder { name, .. } if name == "region"));
    }

    #[test]
    fn test_template_rejects_unbalanced_braces() {
        assert!(matches!(
            Template::parse("{env"),
            Err(TemplateError::Unbalanced(_))
        ));
        assert!(matches!(
            Template::parse("env}"),
            Err(TemplateError::Unbalanced(_))
        ));
        assert!(matches!(
            Template::parse("{{env}}"),
            Err(TemplateError::Unbalanced(_))
        ));
    }
}
