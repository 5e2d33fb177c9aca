//! Evaluation of unit modules.
//!
//! A unit module is a TOML document whose top-level tables with a `kind`
//! key construct agents, teams and workflows. Evaluating a module runs every
//! top-level definition, resolves references between them (sharing one
//! instance per definition), processes the `[__module__]` header and, only
//! when the module is the entry point, the `[__main__]` block.

use crate::core::loader::LoaderContext;
use crate::domain::model::{Agent, InstanceId, Member, Step, Team, Workflow};
use crate::utils::error::LoadFailure;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

/// Module name under which the `[__main__]` block is evaluated.
pub const ENTRY_MODULE: &str = "__main__";

const HEADER_KEY: &str = "__module__";
const MAIN_KEY: &str = "__main__";
const INLINE_LABEL: &str = "<inline>";

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern is valid"));

/// A top-level value of an evaluated module.
#[derive(Debug, Clone)]
pub enum Value {
    Agent(Arc<Agent>),
    Team(Arc<Team>),
    Workflow(Arc<Workflow>),
    Module(Arc<LoadedUnit>),
    Data(toml::Value),
}

impl Value {
    pub fn as_pipeline(&self) -> Option<&Arc<Workflow>> {
        match self {
            Value::Workflow(workflow) => Some(workflow),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&Arc<Team>> {
        match self {
            Value::Team(team) => Some(team),
            _ => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&Arc<Agent>> {
        match self {
            Value::Agent(agent) => Some(agent),
            _ => None,
        }
    }
}

/// The result of evaluating one unit module.
#[derive(Debug)]
pub struct LoadedUnit {
    name: String,
    path: PathBuf,
    values: BTreeMap<String, Value>,
    entry: Option<Value>,
}

impl LoadedUnit {
    /// The module name the unit was evaluated under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Top-level values in name order, private ones included.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// What `[__main__].run` resolved to; only set for the entry module.
    pub fn entry(&self) -> Option<&Value> {
        self.entry.as_ref()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModuleHeader {
    requires: Vec<String>,
    imports: Vec<String>,
    #[serde(rename = "from")]
    from_imports: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MainBlock {
    run: Option<String>,
    requires: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UnitRef {
    Name(String),
    Inline(toml::Table),
}

#[derive(Debug, Deserialize)]
struct AgentDef {
    id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    model: Option<String>,
    instructions: Option<String>,
    #[serde(default)]
    tools: Vec<String>,
    #[serde(default)]
    requires: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TeamDef {
    id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    mode: Option<String>,
    model: Option<String>,
    #[serde(default)]
    members: Vec<UnitRef>,
    #[serde(default)]
    requires: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StepDef {
    name: Option<String>,
    unit: UnitRef,
}

#[derive(Debug, Deserialize)]
struct WorkflowDef {
    id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    steps: Vec<StepDef>,
    #[serde(default)]
    requires: Vec<String>,
}

/// 替換環境變數 (例如 ${OPENAI_MODEL})，未設定的變數保留原樣
pub fn substitute_env_vars(content: &str) -> String {
    ENV_VAR
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
}

pub fn execute_file(
    path: &Path,
    module_name: &str,
    ctx: &mut LoaderContext,
) -> Result<LoadedUnit, LoadFailure> {
    let source = std::fs::read_to_string(path).map_err(|source| LoadFailure::Io {
        path: path.to_path_buf(),
        source,
    })?;
    execute(&source, path, module_name, ctx)
}

/// Evaluates module source under `module_name`.
///
/// The `[__main__]` block runs only when `module_name` is [`ENTRY_MODULE`].
pub fn execute(
    source: &str,
    path: &Path,
    module_name: &str,
    ctx: &mut LoaderContext,
) -> Result<LoadedUnit, LoadFailure> {
    let text = substitute_env_vars(source);
    let table: toml::Table = toml::from_str(&text).map_err(|e| syntax_error(&text, &e))?;

    let header: ModuleHeader = match table.get(HEADER_KEY) {
        Some(raw) => parse_block(HEADER_KEY, raw)?,
        None => ModuleHeader::default(),
    };
    ctx.require(&header.requires)?;

    let mut evaluator = Evaluator {
        table: &table,
        ctx,
        values: BTreeMap::new(),
        in_progress: Vec::new(),
    };

    for import in &header.imports {
        let module = import_module(import, evaluator.ctx)?;
        evaluator.bind(import, Value::Module(module));
    }

    for (source_module, names) in &header.from_imports {
        let module = import_module(source_module, evaluator.ctx)?;
        for name in names {
            let value = module
                .get(name)
                .cloned()
                .ok_or_else(|| LoadFailure::ImportName {
                    name: name.clone(),
                    module: source_module.clone(),
                })?;
            evaluator.bind(name, value);
        }
    }

    for name in table.keys() {
        if is_reserved(name) {
            continue;
        }
        evaluator.evaluate(name)?;
    }

    let entry = if module_name == ENTRY_MODULE {
        evaluator.run_main()?
    } else {
        None
    };

    Ok(LoadedUnit {
        name: module_name.to_string(),
        path: path.to_path_buf(),
        values: evaluator.values,
        entry,
    })
}

/// Resolves `name` on the search roots, evaluating and caching it on first use.
pub(crate) fn import_module(
    name: &str,
    ctx: &mut LoaderContext,
) -> Result<Arc<LoadedUnit>, LoadFailure> {
    if let Some(module) = ctx.module(name) {
        return Ok(module);
    }
    if !ctx.begin_import(name) {
        return Err(LoadFailure::CircularImport {
            module: name.to_string(),
        });
    }

    let result = match ctx.find_module(name) {
        Some(path) => {
            tracing::debug!("Importing module '{}' from {}", name, path.display());
            execute_file(&path, name, ctx)
        }
        None => Err(LoadFailure::ModuleNotFound {
            name: name.to_string(),
        }),
    };
    ctx.end_import(name);

    let module = Arc::new(result?);
    ctx.register(Arc::clone(&module));
    Ok(module)
}

// 保留錯誤位置，讓 skip 警告能指出檔案哪一行出錯
fn syntax_error(text: &str, error: &toml::de::Error) -> LoadFailure {
    let message = error
        .message()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("; ");
    let message = match error.span() {
        Some(span) => {
            let (line, column) = line_column(text, span.start);
            format!("{} (line {}, column {})", message, line, column)
        }
        None => message,
    };
    LoadFailure::Syntax { message }
}

fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let before = &text.as_bytes()[..offset.min(text.len())];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = before.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
    let column = String::from_utf8_lossy(&before[line_start..]).chars().count() + 1;
    (line, column)
}

fn is_reserved(name: &str) -> bool {
    name == HEADER_KEY || name == MAIN_KEY
}

fn parse_block<T: DeserializeOwned>(key: &str, raw: &toml::Value) -> Result<T, LoadFailure> {
    raw.clone()
        .try_into()
        .map_err(|e: toml::de::Error| LoadFailure::Syntax {
            message: format!("[{}] {}", key, e.message()),
        })
}

fn parse_def<T: DeserializeOwned>(
    label: &str,
    kind: &str,
    table: &toml::Table,
) -> Result<T, LoadFailure> {
    toml::Value::Table(table.clone())
        .try_into()
        .map_err(|e: toml::de::Error| LoadFailure::InvalidUnit {
            name: label.to_string(),
            kind: kind.to_string(),
            message: e.message().to_string(),
        })
}

struct Evaluator<'a> {
    table: &'a toml::Table,
    ctx: &'a mut LoaderContext,
    values: BTreeMap<String, Value>,
    in_progress: Vec<String>,
}

impl Evaluator<'_> {
    // 模組內的同名定義優先於 import 進來的名稱
    fn bind(&mut self, name: &str, value: Value) {
        if !self.table.contains_key(name) {
            self.values.insert(name.to_string(), value);
        }
    }

    fn evaluate(&mut self, name: &str) -> Result<Value, LoadFailure> {
        if let Some(value) = self.values.get(name) {
            return Ok(value.clone());
        }

        let table = self.table;
        let raw = match table.get(name) {
            Some(raw) if !is_reserved(name) => raw,
            _ => {
                return Err(LoadFailure::UndefinedName {
                    name: name.to_string(),
                })
            }
        };

        if self.in_progress.iter().any(|pending| pending == name) {
            return Err(LoadFailure::CircularReference {
                name: name.to_string(),
            });
        }

        self.in_progress.push(name.to_string());
        let value = match raw {
            toml::Value::Table(definition) if definition.contains_key("kind") => {
                self.construct(name, definition)
            }
            other => Ok(Value::Data(other.clone())),
        };
        self.in_progress.pop();

        let value = value?;
        self.values.insert(name.to_string(), value.clone());
        Ok(value)
    }

    fn resolve(&mut self, reference: &str) -> Result<Value, LoadFailure> {
        if let Some((module_name, attr)) = reference.rsplit_once('.') {
            if let Some(Value::Module(module)) = self.values.get(module_name) {
                return module
                    .get(attr)
                    .cloned()
                    .ok_or_else(|| LoadFailure::ImportName {
                        name: attr.to_string(),
                        module: module_name.to_string(),
                    });
            }
        }
        self.evaluate(reference)
    }

    fn construct(&mut self, label: &str, definition: &toml::Table) -> Result<Value, LoadFailure> {
        let kind = match definition.get("kind") {
            Some(toml::Value::String(kind)) => kind.as_str(),
            Some(other) => {
                return Err(LoadFailure::UnknownKind {
                    name: label.to_string(),
                    kind: other.to_string(),
                })
            }
            None => "",
        };

        match kind {
            "agent" => {
                let def: AgentDef = parse_def(label, kind, definition)?;
                self.ctx.require(&def.requires)?;
                Ok(Value::Agent(Arc::new(Agent {
                    instance: InstanceId::next(),
                    id: def.id,
                    name: def.name,
                    description: def.description,
                    model: def
                        .model
                        .unwrap_or_else(|| self.ctx.default_model().to_string()),
                    instructions: def.instructions,
                    tools: def.tools,
                })))
            }
            "team" => {
                let def: TeamDef = parse_def(label, kind, definition)?;
                self.ctx.require(&def.requires)?;
                let mut members = Vec::with_capacity(def.members.len());
                for member in &def.members {
                    members.push(self.member(member)?);
                }
                Ok(Value::Team(Arc::new(Team {
                    instance: InstanceId::next(),
                    id: def.id,
                    name: def.name,
                    description: def.description,
                    mode: def.mode,
                    model: def
                        .model
                        .unwrap_or_else(|| self.ctx.default_model().to_string()),
                    members,
                })))
            }
            "workflow" => {
                let def: WorkflowDef = parse_def(label, kind, definition)?;
                self.ctx.require(&def.requires)?;
                let mut steps = Vec::with_capacity(def.steps.len());
                for step in &def.steps {
                    steps.push(Step {
                        name: step.name.clone(),
                        unit: self.member(&step.unit)?,
                    });
                }
                Ok(Value::Workflow(Arc::new(Workflow {
                    instance: InstanceId::next(),
                    id: def.id,
                    name: def.name,
                    description: def.description,
                    steps,
                })))
            }
            other => Err(LoadFailure::UnknownKind {
                name: label.to_string(),
                kind: other.to_string(),
            }),
        }
    }

    fn member(&mut self, unit_ref: &UnitRef) -> Result<Member, LoadFailure> {
        let (label, value) = match unit_ref {
            UnitRef::Name(name) => (name.as_str(), self.resolve(name)?),
            UnitRef::Inline(definition) => (INLINE_LABEL, self.construct(INLINE_LABEL, definition)?),
        };
        match value {
            Value::Agent(agent) => Ok(Member::Agent(agent)),
            Value::Team(team) => Ok(Member::Team(team)),
            _ => Err(LoadFailure::NotAMember {
                name: label.to_string(),
            }),
        }
    }

    fn run_main(&mut self) -> Result<Option<Value>, LoadFailure> {
        let Some(raw) = self.table.get(MAIN_KEY) else {
            return Ok(None);
        };
        let main: MainBlock = parse_block(MAIN_KEY, raw)?;
        self.ctx.require(&main.requires)?;
        match main.run {
            Some(reference) => Ok(Some(self.resolve(&reference)?)),
            None => Ok(None),
        }
    }
}
