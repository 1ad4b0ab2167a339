// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Layered argument parsing.
//!
//! Each scope layer parses the options it knows with a clap derive parser
//! and forwards every other token unchanged, in order, to the next layer.

use clap::{Arg, Command, Parser};

use crate::error::ConfigError;

/// Parse the options `P` declares and return the remaining tokens.
///
/// Unknown options and their values are forwarded; they may appear before,
/// between or after known options.
pub fn parse_known<P: Parser>(args: &[String]) -> Result<(P, Vec<String>), ConfigError> {
    let mut command = P::command();
    command.build();

    let mut known = Vec::new();
    let mut rest = Vec::new();
    let mut tokens = args.iter();

    while let Some(token) = tokens.next() {
        match find_option(&command, token) {
            Some((arg, inline_value)) => {
                known.push(token.clone());
                if !inline_value && arg.get_action().takes_values() {
                    if let Some(value) = tokens.next() {
                        known.push(value.clone());
                    }
                }
            }
            None => rest.push(token.clone()),
        }
    }

    let parsed = P::try_parse_from(std::iter::once(command.get_name().to_string()).chain(known))?;
    Ok((parsed, rest))
}

/// Parse `args` with `P`, rejecting anything it does not declare.
pub fn parse_all<P: Parser>(args: &[String]) -> Result<P, ConfigError> {
    let name = P::command().get_name().to_string();
    Ok(P::try_parse_from(std::iter::once(name).chain(args.iter().cloned()))?)
}

/// Match `token` against the options of `command`. The flag is true when the
/// value is attached (`--name=value`, `-cvalue`).
fn find_option<'a>(command: &'a Command, token: &str) -> Option<(&'a Arg, bool)> {
    if let Some(long) = token.strip_prefix("--") {
        let (name, inline) = match long.split_once('=') {
            Some((name, _)) => (name, true),
            None => (long, false),
        };
        if name.is_empty() {
            return None;
        }
        return command
            .get_arguments()
            .find(|arg| arg.get_long() == Some(name))
            .map(|arg| (arg, inline));
    }

    let short = token.strip_prefix('-')?;
    let mut chars = short.chars();
    let flag = chars.next()?;
    let inline = !chars.as_str().is_empty();

    command
        .get_arguments()
        .find(|arg| arg.get_short() == Some(flag))
        .map(|arg| (arg, inline))
}
