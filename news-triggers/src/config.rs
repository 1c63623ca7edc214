use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::trigger::{Trigger, TriggerKind, TriggerList};
use crate::types::{CompileError, Result};

pub const COMMENT_MARKER: &str = "//";
pub const ACTIVATION_KEYWORD: &str = "ADD";

/// A compiled trigger configuration.
///
/// Lines are processed strictly in order, so a composite can only refer to
/// triggers defined on earlier lines. Redefining a name affects later lines
/// only; composites built earlier keep the trigger they captured.
#[derive(Debug, Default)]
pub struct TriggerConfig {
    registry: HashMap<String, Trigger>,
    active: TriggerList,
}

impl TriggerConfig {
    pub fn compile<I, S>(lines: I) -> std::result::Result<Self, CompileError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::default();

        for (index, raw) in lines.into_iter().enumerate() {
            let line = index + 1;
            let trimmed = raw.as_ref().trim();
            if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
                continue;
            }

            let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();
            if fields[0] == ACTIVATION_KEYWORD {
                config.activate(line, &fields[1..])?;
            } else {
                config.define(line, &fields)?;
            }
        }

        debug!(
            "Compiled {} trigger definitions, {} active",
            config.registry.len(),
            config.active.len()
        );
        Ok(config)
    }

    /// Names currently bound, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.registry.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn get(&self, name: &str) -> Option<&Trigger> {
        self.registry.get(name)
    }

    pub fn active(&self) -> &TriggerList {
        &self.active
    }

    pub fn into_active(self) -> TriggerList {
        self.active
    }

    fn define(&mut self, line: usize, fields: &[&str]) -> std::result::Result<(), CompileError> {
        if fields.len() < 2 {
            return Err(CompileError::MalformedLine {
                line,
                reason: "expected 'NAME, TYPE, ARGUMENTS...'".to_string(),
            });
        }

        let name = fields[0];
        if name.is_empty() {
            return Err(CompileError::MalformedLine {
                line,
                reason: "trigger name is empty".to_string(),
            });
        }

        let kind: TriggerKind = fields[1]
            .parse()
            .map_err(|kind| CompileError::UnknownTriggerType { line, kind })?;

        let args = &fields[2..];
        if args.len() != kind.arity() {
            return Err(CompileError::ArityMismatch {
                line,
                kind: kind.to_string(),
                expected: kind.arity(),
                found: args.len(),
            });
        }
        if args.iter().any(|arg| arg.is_empty()) {
            return Err(CompileError::MalformedLine {
                line,
                reason: format!("empty argument for {} trigger '{}'", kind, name),
            });
        }

        let trigger = match kind {
            TriggerKind::Title => Trigger::title(args[0]),
            TriggerKind::Description => Trigger::description(args[0]),
            TriggerKind::After => Trigger::after(args[0]).map_err(|e| time_error(line, args[0], e))?,
            TriggerKind::Before => Trigger::before(args[0]).map_err(|e| time_error(line, args[0], e))?,
            TriggerKind::Not => Trigger::not(self.lookup(line, args[0])?),
            TriggerKind::And => Trigger::and(self.lookup(line, args[0])?, self.lookup(line, args[1])?),
            TriggerKind::Or => Trigger::or(self.lookup(line, args[0])?, self.lookup(line, args[1])?),
        };

        debug!("line {}: {} = {}", line, name, trigger);
        if self.registry.insert(name.to_string(), trigger).is_some() {
            debug!("line {}: trigger '{}' redefined", line, name);
        }
        Ok(())
    }

    fn activate(&mut self, line: usize, names: &[&str]) -> std::result::Result<(), CompileError> {
        if names.iter().all(|name| name.is_empty()) {
            return Err(CompileError::MalformedLine {
                line,
                reason: format!("{} needs at least one trigger name", ACTIVATION_KEYWORD),
            });
        }

        for name in names.iter().filter(|name| !name.is_empty()) {
            match self.registry.get(*name) {
                Some(trigger) => self.active.push(trigger.clone()),
                None => warn!("line {}: ignoring unknown trigger '{}' in {}", line, name, ACTIVATION_KEYWORD),
            }
        }
        Ok(())
    }

    fn lookup(&self, line: usize, name: &str) -> std::result::Result<Trigger, CompileError> {
        self.registry
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::UndefinedReference {
                line,
                name: name.to_string(),
            })
    }
}

fn time_error(line: usize, value: &str, error: crate::types::TimeError) -> CompileError {
    CompileError::MalformedTime {
        line,
        value: value.to_string(),
        reason: error.to_string(),
    }
}

/// Compile configuration lines into the ordered list of active triggers.
pub fn compile_config<I, S>(lines: I) -> std::result::Result<TriggerList, CompileError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    TriggerConfig::compile(lines).map(TriggerConfig::into_active)
}

/// Read a trigger file from disk and compile it.
pub fn load_trigger_file(path: &Path) -> Result<TriggerConfig> {
    let content = std::fs::read_to_string(path)?;
    // Editors on Windows like to prepend a byte order mark
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    let config = TriggerConfig::compile(content.lines())?;
    info!(
        "Loaded {} active triggers from {}",
        config.active().len(),
        path.display()
    );
    Ok(config)
}
