// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Connection string parsing.
//!
//! Format: `[user[/password]@][host][:port][/database]`. The separators
//! `/`, `@`, `:` and the backslash itself are taken literally when preceded
//! by a backslash. Fields that are not given are `None`, never `""`.

use crate::error::ConfigError;
use crate::scope::Value;
use crate::types::Port;

const ESCAPE: char = '\\';

/// Parsed connection target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<Port>,
    pub database: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Literal(char),
    Delimiter(char),
}

impl ConnectionInfo {
    /// Parse a connection string.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let tokens = tokenize(input)?;
        let invalid = |reason: &str| ConfigError::InvalidConnectionString {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let mut info = ConnectionInfo::default();

        let rest = match tokens.iter().position(|t| *t == Token::Delimiter('@')) {
            Some(at) => {
                let credentials = &tokens[..at];
                let (user, password) =
                    match credentials.iter().position(|t| *t == Token::Delimiter('/')) {
                        Some(slash) => (&credentials[..slash], Some(&credentials[slash + 1..])),
                        None => (credentials, None),
                    };

                info.user = Some(literal(user).ok_or_else(|| invalid("unescaped separator in user name"))?);
                if info.user.as_deref() == Some("") {
                    return Err(invalid("empty user name before '@'"));
                }
                if let Some(password) = password {
                    info.password =
                        Some(literal(password).ok_or_else(|| invalid("unescaped separator in password"))?);
                }
                &tokens[at + 1..]
            }
            None => &tokens[..],
        };

        let host_end = rest
            .iter()
            .position(|t| matches!(t, Token::Delimiter(_)))
            .unwrap_or(rest.len());
        let host = literal(&rest[..host_end]).unwrap_or_default();
        if !host.is_empty() {
            info.host = Some(host);
        }

        let mut rest = &rest[host_end..];

        if rest.first() == Some(&Token::Delimiter(':')) {
            let port_end = rest[1..]
                .iter()
                .position(|t| matches!(t, Token::Delimiter(_)))
                .map(|i| i + 1)
                .unwrap_or(rest.len());
            let digits = literal(&rest[1..port_end]).unwrap_or_default();
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid("port must be a number"));
            }
            let port: u16 = digits.parse().map_err(|_| invalid("port out of range"))?;
            info.port = Some(Port::new(port)?);
            rest = &rest[port_end..];
        }

        if rest.first() == Some(&Token::Delimiter('/')) {
            let database = literal(&rest[1..]).ok_or_else(|| invalid("unescaped separator in database name"))?;
            if !database.is_empty() {
                info.database = Some(database);
            }
            rest = &[];
        }

        if !rest.is_empty() {
            return Err(invalid("unexpected separator"));
        }

        Ok(info)
    }

    /// Scope entries for each field; absent fields map to null. The password
    /// is private so it never reaches a snapshot.
    pub fn scope_entries(&self) -> [(&'static str, Value); 5] {
        [
            ("username", self.user.clone().into()),
            ("_password", self.password.clone().into()),
            ("hostname", self.host.clone().into()),
            ("port", self.port.map(|p| p.to_string()).into()),
            ("database", self.database.clone().into()),
        ]
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ConfigError> {
    let mut tokens = Vec::with_capacity(input.len());
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            ESCAPE => match chars.next() {
                Some(escaped @ ('/' | '@' | ':' | ESCAPE)) => tokens.push(Token::Literal(escaped)),
                _ => {
                    return Err(ConfigError::InvalidConnectionString {
                        input: input.to_string(),
                        reason: "backslash must precede one of / @ : \\".to_string(),
                    })
                }
            },
            '/' | '@' | ':' => tokens.push(Token::Delimiter(c)),
            other => tokens.push(Token::Literal(other)),
        }
    }

    Ok(tokens)
}

/// Collect a run of literal tokens; `None` if it contains a delimiter.
fn literal(tokens: &[Token]) -> Option<String> {
    tokens
        .iter()
        .map(|t| match t {
            Token::Literal(c) => Some(*c),
            Token::Delimiter(_) => None,
        })
        .collect()
}
