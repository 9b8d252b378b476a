//! Host environment snapshot and placeholder expansion.
//!
//! Custom message values and target URLs may reference host variables as
//! `$NAME` or `${NAME}`. Expansion happens against an immutable snapshot that
//! is shared read-only by every target processed for one event.

use std::collections::BTreeMap;

use crate::errors::TemplateError;

/// Read-only mapping from variable name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of `name`, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Substitutes `$NAME` and `${NAME}` placeholders in `template`.
    ///
    /// Unknown variables are left verbatim. `$$` produces a literal `$`, and a
    /// `$` that does not start a placeholder is kept as-is.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] for a `${` with no closing brace or an empty
    /// `${}` placeholder.
    pub fn expand(&self, template: &str) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        let mut offset = 0;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let start = offset + pos;
            let after = &rest[pos + 1..];

            let consumed = if let Some(braced) = after.strip_prefix('{') {
                let close = braced
                    .find('}')
                    .ok_or(TemplateError::Unterminated { offset: start })?;
                let name = &braced[..close];
                if name.is_empty() {
                    return Err(TemplateError::EmptyName { offset: start });
                }
                match self.get(name) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[pos..pos + close + 3]),
                }
                close + 3
            } else if after.starts_with('$') {
                out.push('$');
                2
            } else {
                let len = after
                    .find(|c: char| !is_name_char(c))
                    .unwrap_or(after.len());
                let name = &after[..len];
                match self.get(name) {
                    Some(value) if !name.is_empty() => out.push_str(value),
                    _ => out.push_str(&rest[pos..pos + 1 + len]),
                }
                len + 1
            };

            rest = &rest[pos + consumed..];
            offset = start + consumed;
        }

        out.push_str(rest);
        Ok(out)
    }

    /// Like [`Environment::expand`], but falls back to the literal template.
    ///
    /// The error, if any, is returned alongside so the caller can log it.
    pub fn expand_lossy(&self, template: &str) -> (String, Option<TemplateError>) {
        match self.expand(template) {
            Ok(expanded) => (expanded, None),
            Err(err) => (template.to_string(), Some(err)),
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<K, V> FromIterator<(K, V)> for Environment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
