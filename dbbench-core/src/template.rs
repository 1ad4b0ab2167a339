// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `{key}` placeholder substitution against a scope snapshot.
//!
//! `{{` and `}}` produce literal braces, so SQL array literals survive.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::error::ConfigError;
use crate::scope::{ScopedConfig, Value};

/// Render `template` against a flattened snapshot.
pub fn render(template: &str, values: &BTreeMap<String, Value>) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                out.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut key = String::new();
                let mut closed = false;
                for (_, k) in chars.by_ref() {
                    if k == '}' {
                        closed = true;
                        break;
                    }
                    key.push(k);
                }

                if !closed {
                    return Err(ConfigError::MalformedTemplate {
                        position,
                        reason: "unclosed placeholder",
                    });
                }
                if key.is_empty() || key.contains('{') {
                    return Err(ConfigError::MalformedTemplate {
                        position,
                        reason: "invalid placeholder name",
                    });
                }

                let value = values
                    .get(&key)
                    .ok_or(ConfigError::KeyNotFound { key })?;
                // Writing into a String cannot fail.
                let _ = write!(out, "{}", value);
            }
            '}' => {
                return Err(ConfigError::MalformedTemplate {
                    position,
                    reason: "unmatched closing brace",
                });
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

/// Render `template` against the public snapshot of `scope`.
pub fn render_scope(template: &str, scope: &ScopedConfig) -> Result<String, ConfigError> {
    render(template, &scope.snapshot(true))
}
