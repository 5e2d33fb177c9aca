use crate::core::hint::install_hint;
use crate::core::module::{self, LoadedUnit};
use crate::core::resolver::{SourceFile, UNIT_FILE_EXTENSION};
use crate::utils::error::LoadFailure;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_MODEL: &str = "openai:gpt-4o";

const LOADED_MODULE_PREFIX: &str = "_agentos_loaded_";

#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Packages the serving runtime has installed.
    pub packages: Vec<String>,
    /// Model assigned to agents and teams that do not name one.
    pub default_model: String,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            packages: Vec::new(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// State shared by every load of one bootstrap run.
///
/// Search roots and registered modules only accumulate: a directory added
/// while loading one file stays importable for every later file.
#[derive(Debug)]
pub struct LoaderContext {
    search_roots: Vec<PathBuf>,
    modules: HashMap<String, Arc<LoadedUnit>>,
    importing: HashSet<String>,
    packages: HashSet<String>,
    default_model: String,
    loads: u64,
}

impl LoaderContext {
    pub fn new(options: LoaderOptions) -> Self {
        Self {
            search_roots: Vec::new(),
            modules: HashMap::new(),
            importing: HashSet::new(),
            packages: options.packages.into_iter().collect(),
            default_model: options.default_model,
            loads: 0,
        }
    }

    pub fn search_roots(&self) -> &[PathBuf] {
        &self.search_roots
    }

    /// Puts `root` first on the search path unless it is already present.
    pub fn add_search_root(&mut self, root: impl Into<PathBuf>) -> bool {
        let root = root.into();
        if self.search_roots.contains(&root) {
            return false;
        }
        self.search_roots.insert(0, root);
        true
    }

    pub fn module(&self, name: &str) -> Option<Arc<LoadedUnit>> {
        self.modules.get(name).cloned()
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn is_installed(&self, package: &str) -> bool {
        self.packages.contains(package)
    }

    pub(crate) fn require(&self, packages: &[String]) -> Result<(), LoadFailure> {
        match packages.iter().find(|pkg| !self.is_installed(pkg)) {
            Some(missing) => Err(LoadFailure::ModuleNotFound {
                name: missing.clone(),
            }),
            None => Ok(()),
        }
    }

    pub(crate) fn register(&mut self, unit: Arc<LoadedUnit>) {
        self.modules.insert(unit.name().to_string(), unit);
    }

    pub(crate) fn begin_import(&mut self, name: &str) -> bool {
        self.importing.insert(name.to_string())
    }

    pub(crate) fn end_import(&mut self, name: &str) {
        self.importing.remove(name);
    }

    /// `a.b` resolves to `<root>/a/b.toml` on the first root that has it.
    pub(crate) fn find_module(&self, name: &str) -> Option<PathBuf> {
        if name.split('.').any(str::is_empty) {
            return None;
        }
        let mut relative: PathBuf = name.split('.').collect();
        relative.set_extension(UNIT_FILE_EXTENSION);
        self.search_roots
            .iter()
            .map(|root| root.join(&relative))
            .find(|candidate| candidate.is_file())
    }

    // 每次載入都用新的序號，同名檔案或重複載入都不會互相覆蓋
    fn next_module_name(&mut self, stem: &str) -> String {
        self.loads += 1;
        format!("{}{}_{}", LOADED_MODULE_PREFIX, stem, self.loads)
    }
}

impl Default for LoaderContext {
    fn default() -> Self {
        Self::new(LoaderOptions::default())
    }
}

/// A file that failed to load and was skipped.
#[derive(Debug)]
pub struct SkippedFile {
    pub file: SourceFile,
    pub failure: LoadFailure,
    pub hint: Option<String>,
}

impl fmt::Display for SkippedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skipping {} ({})", self.file.file_name(), self.failure)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n    -> {}", hint)?;
        }
        Ok(())
    }
}

/// Loads one unit module in its own namespace.
///
/// The module is evaluated under a fresh synthetic name, so its `[__main__]`
/// block never runs. Any failure is reported as a warning and returned as a
/// [`SkippedFile`]; it never aborts the run.
pub fn load(file: &SourceFile, ctx: &mut LoaderContext) -> Result<Arc<LoadedUnit>, SkippedFile> {
    match try_load(file, ctx) {
        Ok(unit) => {
            tracing::debug!("Loaded {} as {}", file, unit.name());
            Ok(unit)
        }
        Err(failure) => {
            let hint = install_hint(&failure.to_string());
            let skipped = SkippedFile {
                file: file.clone(),
                failure,
                hint,
            };
            tracing::warn!("⚠️ {}", skipped);
            Err(skipped)
        }
    }
}

fn try_load(file: &SourceFile, ctx: &mut LoaderContext) -> Result<Arc<LoadedUnit>, LoadFailure> {
    // 讓檔案的同層模組與工作目錄下的專案設定模組都能被 import
    if let Some(dir) = file.dir() {
        ctx.add_search_root(dir);
    }
    match std::env::current_dir() {
        Ok(cwd) => {
            ctx.add_search_root(cwd);
        }
        Err(e) => tracing::debug!("Working directory unavailable: {}", e),
    }

    let module_name = ctx.next_module_name(file.stem());
    let unit = Arc::new(module::execute_file(file.path(), &module_name, ctx)?);
    ctx.register(Arc::clone(&unit));
    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::module::Value;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> SourceFile {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        SourceFile::new(path).unwrap()
    }

    #[test]
    fn test_same_stem_files_do_not_collide() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let a = write(first.path(), "agents.toml", "[bot]\nkind = \"agent\"\nname = \"First\"\n");
        let b = write(second.path(), "agents.toml", "[bot]\nkind = \"agent\"\nname = \"Second\"\n");

        let mut ctx = LoaderContext::default();
        let unit_a = load(&a, &mut ctx).unwrap();
        let unit_b = load(&b, &mut ctx).unwrap();

        assert_ne!(unit_a.name(), unit_b.name());
        assert!(unit_a.name().starts_with("_agentos_loaded_agents_"));
        assert_eq!(ctx.module_count(), 2);

        let bot_a = unit_a.get("bot").and_then(Value::as_leaf).unwrap();
        let bot_b = unit_b.get("bot").and_then(Value::as_leaf).unwrap();
        assert_eq!(bot_a.name.as_deref(), Some("First"));
        assert_eq!(bot_b.name.as_deref(), Some("Second"));
    }

    #[test]
    fn test_reloading_produces_independent_unit() {
        let temp_dir = TempDir::new().unwrap();
        let file = write(temp_dir.path(), "solo.toml", "[bot]\nkind = \"agent\"\n");

        let mut ctx = LoaderContext::default();
        let first = load(&file, &mut ctx).unwrap();
        let second = load(&file, &mut ctx).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        let a = first.get("bot").and_then(Value::as_leaf).unwrap();
        let b = second.get("bot").and_then(Value::as_leaf).unwrap();
        assert!(!Arc::ptr_eq(a, b));
    }

    #[test]
    fn test_search_roots_added_once_and_kept() {
        let temp_dir = TempDir::new().unwrap();
        let a = write(temp_dir.path(), "a.toml", "");
        let b = write(temp_dir.path(), "b.toml", "[broken");

        let mut ctx = LoaderContext::default();
        load(&a, &mut ctx).unwrap();
        assert!(load(&b, &mut ctx).is_err());

        let dir = temp_dir.path().to_path_buf();
        assert_eq!(ctx.search_roots().iter().filter(|r| **r == dir).count(), 1);
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(ctx.search_roots().iter().filter(|r| **r == cwd).count(), 1);
    }

    #[test]
    fn test_sibling_imports_resolve() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "common.toml", "[researcher]\nkind = \"agent\"\nname = \"Researcher\"\n");
        let team = write(
            temp_dir.path(),
            "team.toml",
            "[__module__.from]\ncommon = [\"researcher\"]\n\n[team]\nkind = \"team\"\nmembers = [\"researcher\"]\n",
        );

        let mut ctx = LoaderContext::default();
        let unit = load(&team, &mut ctx).unwrap();
        assert!(unit.get("researcher").and_then(Value::as_leaf).is_some());
        assert!(ctx.module("common").is_some());
    }

    #[test]
    fn test_failure_is_skipped_with_hint() {
        let temp_dir = TempDir::new().unwrap();
        let file = write(
            temp_dir.path(),
            "finance.toml",
            "[__module__]\nrequires = [\"yfinance\"]\n",
        );

        let mut ctx = LoaderContext::default();
        let skipped = load(&file, &mut ctx).unwrap_err();

        assert!(matches!(skipped.failure, LoadFailure::ModuleNotFound { .. }));
        assert_eq!(skipped.hint.as_deref(), Some("pip install agentos-serve[common-tools]"));
        assert_eq!(
            skipped.to_string(),
            "skipping finance.toml (No module named 'yfinance')\n    -> pip install agentos-serve[common-tools]"
        );
    }

    #[test]
    fn test_failure_without_hint_is_single_line() {
        let temp_dir = TempDir::new().unwrap();
        let file = write(temp_dir.path(), "typo.toml", "[team]\nkind = \"team\"\nmembers = [\"ghost\"]\n");

        let skipped = load(&file, &mut LoaderContext::default()).unwrap_err();
        assert_eq!(skipped.hint, None);
        assert_eq!(skipped.to_string(), "skipping typo.toml (name 'ghost' is not defined)");
    }

    #[test]
    fn test_installed_packages_satisfy_requirements() {
        let temp_dir = TempDir::new().unwrap();
        let file = write(
            temp_dir.path(),
            "finance.toml",
            "[__module__]\nrequires = [\"yfinance\"]\n\n[analyst]\nkind = \"agent\"\n",
        );

        let mut ctx = LoaderContext::new(LoaderOptions {
            packages: vec!["yfinance".to_string()],
            default_model: "ollama:llama3.2".to_string(),
        });
        let unit = load(&file, &mut ctx).unwrap();
        let analyst = unit.get("analyst").and_then(Value::as_leaf).unwrap();
        assert_eq!(analyst.model, "ollama:llama3.2");
    }
}
