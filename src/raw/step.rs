use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{ConfigError, ValidationErrors};
use crate::valid::{BuiltinStep, EnvValueSource, Step};

const EMPTY_STEP_MESSAGE: &str = "step element is empty";
const INVALID_STEP_MESSAGE: &str = "not a valid step type";

/// One step as authored, before structural validation.
///
/// Authors write steps in four shapes: a bare built-in name, a built-in
/// name with `extra_args`, an `env` map, or a custom `run` command. The
/// decoder inspects the node shape and dispatches in that fixed order; it
/// never decodes speculatively and catches errors.
#[derive(Debug, Clone, PartialEq)]
pub enum RawStep {
    Builtin(String),
    BuiltinWithArgs {
        name: String,
        extra_args: Vec<String>,
    },
    Env {
        name: Option<String>,
        value: Option<String>,
        command: Option<String>,
    },
    Run(String),
}

impl<'de> Deserialize<'de> for RawStep {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // A self-describing intermediate value works under both the YAML
        // and the JSON deserializer.
        let value = Value::deserialize(deserializer)?;
        decode_step(value).map_err(D::Error::custom)
    }
}

fn decode_step(value: Value) -> Result<RawStep, String> {
    match value {
        Value::Null => Err(EMPTY_STEP_MESSAGE.to_string()),
        Value::String(name) => {
            if name.trim().is_empty() {
                Err(EMPTY_STEP_MESSAGE.to_string())
            } else {
                Ok(RawStep::Builtin(name))
            }
        }
        Value::Object(map) => {
            if map.is_empty() {
                return Err(EMPTY_STEP_MESSAGE.to_string());
            }
            if map.len() > 1 {
                return Err(INVALID_STEP_MESSAGE.to_string());
            }
            let (key, inner) = map.into_iter().next().expect("map has one entry");
            match (key.as_str(), inner) {
                ("env", Value::Object(fields)) => decode_env_step(fields),
                ("env", _) => Err("env steps must be a map of `name` and `value` or `command`".to_string()),
                ("run", Value::String(command)) => Ok(RawStep::Run(command)),
                ("run", _) => Err("run steps must carry a command string".to_string()),
                (_, Value::Null) => Ok(RawStep::BuiltinWithArgs {
                    name: key,
                    extra_args: Vec::new(),
                }),
                (_, Value::Object(fields)) => decode_extra_args_step(key, fields),
                _ => Err(INVALID_STEP_MESSAGE.to_string()),
            }
        }
        _ => Err(INVALID_STEP_MESSAGE.to_string()),
    }
}

fn decode_env_step(fields: serde_json::Map<String, Value>) -> Result<RawStep, String> {
    let mut name = None;
    let mut value = None;
    let mut command = None;
    for (key, field) in fields {
        let text = match field {
            Value::String(text) => text,
            _ => return Err(format!("env step `{key}` must be a string")),
        };
        match key.as_str() {
            "name" => name = Some(text),
            "value" => value = Some(text),
            "command" => command = Some(text),
            _ => return Err(format!("unknown field `{key}` in env step")),
        }
    }
    Ok(RawStep::Env {
        name,
        value,
        command,
    })
}

fn decode_extra_args_step(
    name: String,
    fields: serde_json::Map<String, Value>,
) -> Result<RawStep, String> {
    let mut extra_args = Vec::new();
    for (key, field) in fields {
        if key != "extra_args" {
            return Err(format!("unknown field `{key}` in `{name}` step"));
        }
        let Value::Array(items) = field else {
            return Err("extra_args must be a list of strings".to_string());
        };
        for item in items {
            match item {
                Value::String(arg) => extra_args.push(arg),
                // Numeric args like -parallelism=2 written unquoted.
                Value::Number(num) => extra_args.push(num.to_string()),
                Value::Bool(flag) => extra_args.push(flag.to_string()),
                _ => return Err("extra_args must be a list of strings".to_string()),
            }
        }
    }
    Ok(RawStep::BuiltinWithArgs { name, extra_args })
}

impl RawStep {
    /// Local well-formedness: builtin-name membership and the env
    /// value/command exclusivity. Failures aggregate under `field`.
    pub fn validate(&self, field: &str, errs: &mut ValidationErrors) {
        match self {
            RawStep::Builtin(name) => {
                if name == "env" {
                    errs.push(field, "env steps require a name and a value or command");
                } else if let Err(message) = BuiltinStep::parse(name) {
                    errs.push(field, message);
                }
            }
            RawStep::BuiltinWithArgs { name, .. } => {
                if name == "env" {
                    errs.push(field, "env steps cannot take extra_args");
                } else if let Err(message) = BuiltinStep::parse(name) {
                    errs.push(field, message);
                }
            }
            RawStep::Env {
                name,
                value,
                command,
            } => {
                if name.as_deref().unwrap_or("").trim().is_empty() {
                    errs.push(field, "env steps must have a `name` field");
                }
                match (value, command) {
                    (Some(_), Some(_)) => {
                        errs.push(field, "env steps can set only one of `value` and `command`");
                    }
                    (None, None) => {
                        errs.push(field, "env steps must set `value` or `command`");
                    }
                    _ => {}
                }
            }
            RawStep::Run(_) => {}
        }
    }

    /// Converts into the canonical step. Schema version 2 re-tokenizes
    /// custom run commands through shell-word splitting to preserve the
    /// historical quoting behavior; version 3 keeps the string verbatim.
    pub fn to_valid(&self, version: i32) -> Result<Step, ConfigError> {
        match self {
            RawStep::Builtin(name) => Ok(Step::Builtin {
                name: parse_builtin(name)?,
            }),
            RawStep::BuiltinWithArgs { name, extra_args } => Ok(Step::BuiltinWithArgs {
                name: parse_builtin(name)?,
                extra_args: extra_args.clone(),
            }),
            RawStep::Env {
                name,
                value,
                command,
            } => {
                let name = name.clone().unwrap_or_default();
                let source = match (value, command) {
                    (Some(value), None) => EnvValueSource::Literal(value.clone()),
                    (None, Some(command)) => EnvValueSource::Command(command.clone()),
                    _ => {
                        return Err(ConfigError::parse(
                            "env step",
                            "must set exactly one of `value` and `command`",
                        ))
                    }
                };
                Ok(Step::Env { name, source })
            }
            RawStep::Run(command) => {
                let command = if version == 2 {
                    legacy_split(command)?
                } else {
                    command.clone()
                };
                Ok(Step::Run { command })
            }
        }
    }
}

fn parse_builtin(name: &str) -> Result<BuiltinStep, ConfigError> {
    BuiltinStep::parse(name).map_err(|message| ConfigError::parse("step", message))
}

fn legacy_split(command: &str) -> Result<String, ConfigError> {
    let words = shell_words::split(command).map_err(|err| {
        ConfigError::parse("run step", format!("unable to parse \"{command}\": {err}"))
    })?;
    Ok(words.join(" "))
}
