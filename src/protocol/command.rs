//! Command serialization: `Name` or `Name(arg1,arg2,...)`, NUL terminated

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use super::frame::TERMINATOR;
use crate::{MecaError, Result};

/// A command sent over the control port
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    name: String,
    args: Vec<String>,
}

fn command_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z][A-Za-z0-9_]*)\s*(?:\((.*)\))?\s*$")
            .expect("command pattern is valid")
    })
}

impl Command {
    /// Command without arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Command with arguments, each rendered with `Display`
    pub fn with_args<I, T>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: fmt::Display,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(|arg| arg.to_string()).collect(),
        }
    }

    /// Parse text such as `MoveJoints(0,0,0,0,0,0)`
    pub fn parse(text: &str) -> Result<Self> {
        let captures = command_pattern()
            .captures(text.trim_end_matches('\0'))
            .ok_or_else(|| MecaError::Protocol(format!("Invalid command syntax: {:?}", text)))?;

        let name = captures[1].to_string();
        let args = match captures.get(2) {
            Some(list) if !list.as_str().trim().is_empty() => list
                .as_str()
                .split(',')
                .map(|arg| arg.trim().to_string())
                .collect(),
            _ => Vec::new(),
        };

        Ok(Self { name, args })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Bytes written to the socket, terminator included
    pub fn to_wire(&self) -> Vec<u8> {
        let mut bytes = self.to_string().into_bytes();
        bytes.push(TERMINATOR);
        bytes
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}({})", self.name, self.args.join(","))
        }
    }
}
