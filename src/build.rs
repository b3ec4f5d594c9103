//! Build driver.
//!
//! Discovers directory groups, runs each through the pipeline
//! (parse -> import resolution -> merge -> analyze -> codegen), consults
//! the incremental cache, and writes artifacts plus source maps. All
//! cross-file state (parsed units, export tables, the in-progress set
//! for cycle detection) lives in a `BuildContext` threaded through one
//! build invocation.

use crate::analyzer;
use crate::cache::BuildCache;
use crate::codegen::{self, source_maps, Artifact, CompiledOutputs};
use crate::error::{self, Diagnostic, Severity};
use crate::error_codes as codes;
use crate::merger;
use crate::module_system::{self, ImportRewrite, ImportTarget, ResolvedImport};
use crate::parser::ast::{ImportDecl, Item, ModuleExportTable, Program};
use crate::parser::Parser;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

pub struct BuildOptions {
    /// Source directory or single file
    pub path: PathBuf,
    pub out: PathBuf,
    pub strict: bool,
    /// Report diagnostics without writing artifacts or touching the cache
    pub check_only: bool,
}

#[derive(Debug, Default)]
pub struct BuildSummary {
    pub compiled: usize,
    pub cached: usize,
    pub failed: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl BuildSummary {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

struct ParsedUnit {
    program: Program,
    exports: ModuleExportTable,
    is_module: bool,
}

/// Per-invocation compilation state; never shared across builds.
pub struct BuildContext {
    src_root: PathBuf,
    units: HashMap<PathBuf, ParsedUnit>,
    failed_parses: HashSet<PathBuf>,
    dir_class: HashMap<PathBuf, bool>,
    in_progress: Vec<PathBuf>,
    resolved: HashSet<PathBuf>,
    diagnostics: Vec<Diagnostic>,
}

enum ClassifiedImport {
    Keep,
    Drop,
    Target(ImportTarget),
}

impl BuildContext {
    fn new(src_root: PathBuf) -> Self {
        BuildContext {
            src_root,
            units: HashMap::new(),
            failed_parses: HashSet::new(),
            dir_class: HashMap::new(),
            in_progress: Vec::new(),
            resolved: HashSet::new(),
            diagnostics: Vec::new(),
        }
    }

    fn display_name(&self, path: &Path) -> String {
        path.strip_prefix(&self.src_root)
            .unwrap_or(path)
            .display()
            .to_string()
    }

    /// Parse (once) and cache a source file. Lex and parse failures are
    /// fatal for the file and reported with a source snippet.
    fn unit(&mut self, path: &Path) -> Option<&ParsedUnit> {
        let path_buf = path.to_path_buf();
        if self.failed_parses.contains(&path_buf) {
            return None;
        }
        if !self.units.contains_key(&path_buf) {
            let source = match fs::read_to_string(&path_buf) {
                Ok(source) => source,
                Err(_) => {
                    self.failed_parses.insert(path_buf);
                    return None;
                }
            };
            let display = self.display_name(&path_buf);
            match Parser::parse_source(&source, &display) {
                Ok(program) => {
                    let exports = ModuleExportTable::from_program(&program);
                    let is_module = module_system::is_module_file(&program);
                    self.units.insert(
                        path_buf.clone(),
                        ParsedUnit {
                            program,
                            exports,
                            is_module,
                        },
                    );
                }
                Err(e) => {
                    let mut diagnostic =
                        Diagnostic::error(codes::PARSE_ERROR, e.message, e.loc.clone());
                    if let Some(snippet) = error::snippet_from_source(&source, e.loc.line) {
                        diagnostic = diagnostic.with_snippet(snippet);
                    }
                    if let Some(hint) = e.hint {
                        diagnostic = diagnostic.with_hint(hint);
                    }
                    self.diagnostics.push(diagnostic);
                    self.failed_parses.insert(path_buf);
                    return None;
                }
            }
        }
        self.units.get(&path_buf)
    }

    /// Follow relative imports depth-first; a file re-entering its own
    /// transitive import chain is a circular-import error carrying the
    /// full chain.
    fn chase_imports(&mut self, path: PathBuf) {
        if self.resolved.contains(&path) {
            return;
        }
        self.in_progress.push(path.clone());
        let imports: Vec<ImportDecl> = match self.unit(&path) {
            Some(unit) => unit
                .program
                .body
                .iter()
                .filter_map(|item| match item {
                    Item::Import(import) => Some(import.clone()),
                    _ => None,
                })
                .collect(),
            None => Vec::new(),
        };
        let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        for import in imports {
            if !module_system::is_relative_import(&import.source) {
                continue;
            }
            match module_system::resolve_import(&dir, &import.source) {
                ResolvedImport::File(target) => {
                    // same-directory siblings merge; no edge to follow
                    if target.parent() == path.parent() {
                        continue;
                    }
                    self.chase_target(target, &import);
                }
                ResolvedImport::Dir(target_dir) => {
                    for member in tova_files_in(&target_dir) {
                        self.chase_target(member, &import);
                    }
                }
                ResolvedImport::External => {}
            }
        }
        self.in_progress.pop();
        self.resolved.insert(path);
    }

    fn chase_target(&mut self, target: PathBuf, import: &ImportDecl) {
        if self.in_progress.contains(&target) {
            let start = self
                .in_progress
                .iter()
                .position(|p| *p == target)
                .unwrap_or(0);
            let chain = self.in_progress[start..].to_vec();
            self.diagnostics
                .push(module_system::cycle_error(&chain, &target, import));
            return;
        }
        if target.exists() {
            self.chase_imports(target);
        }
    }

    /// Is the merged group at `dir` a plain module (no block directives
    /// in any member)?
    fn dir_is_module(&mut self, dir: &Path) -> bool {
        if let Some(&cached) = self.dir_class.get(dir) {
            return cached;
        }
        let mut is_module = true;
        for file in tova_files_in(dir) {
            if let Some(unit) = self.unit(&file) {
                if !unit.is_module {
                    is_module = false;
                    break;
                }
            }
        }
        self.dir_class.insert(dir.to_path_buf(), is_module);
        is_module
    }

    fn classify_import(
        &mut self,
        dir: &Path,
        import: &ImportDecl,
        group_files: &HashSet<PathBuf>,
    ) -> ClassifiedImport {
        if !module_system::is_relative_import(&import.source) {
            return ClassifiedImport::Keep;
        }
        match module_system::resolve_import(dir, &import.source) {
            ResolvedImport::File(target) => {
                if group_files.contains(&target) {
                    return ClassifiedImport::Drop;
                }
                if !target.exists() {
                    self.diagnostics
                        .push(module_system::missing_module_error(import));
                    return ClassifiedImport::Keep;
                }
                let (exports, is_module) = match self.unit(&target) {
                    Some(unit) => (unit.exports.clone(), unit.is_module),
                    None => return ClassifiedImport::Keep,
                };
                self.diagnostics
                    .extend(module_system::validate_import(import, &exports));
                ClassifiedImport::Target(if is_module {
                    ImportTarget::Module
                } else {
                    ImportTarget::App
                })
            }
            ResolvedImport::Dir(target_dir) => {
                if !target_dir.is_dir() {
                    self.diagnostics
                        .push(module_system::missing_module_error(import));
                    return ClassifiedImport::Keep;
                }
                let mut merged = ModuleExportTable::default();
                for member in tova_files_in(&target_dir) {
                    if let Some(unit) = self.unit(&member) {
                        merged
                            .public_exports
                            .extend(unit.exports.public_exports.iter().cloned());
                        merged
                            .all_names
                            .extend(unit.exports.all_names.iter().cloned());
                    }
                }
                self.diagnostics
                    .extend(module_system::validate_import(import, &merged));
                let is_module = self.dir_is_module(&target_dir);
                ClassifiedImport::Target(if is_module {
                    ImportTarget::Module
                } else {
                    ImportTarget::App
                })
            }
            ResolvedImport::External => ClassifiedImport::Keep,
        }
    }

    /// Rewrite a file's imports for emission: same-group imports vanish,
    /// cross-directory `.tova` imports point at the artifact the target
    /// will emit.
    fn process_imports(
        &mut self,
        program: &mut Program,
        file_path: &Path,
        group_files: &HashSet<PathBuf>,
    ) {
        let dir = file_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();
        let mut body = Vec::with_capacity(program.body.len());
        for item in std::mem::take(&mut program.body) {
            match item {
                Item::Import(mut import) => {
                    match self.classify_import(&dir, &import, group_files) {
                        ClassifiedImport::Drop => {}
                        ClassifiedImport::Keep => body.push(Item::Import(import)),
                        ClassifiedImport::Target(target) => {
                            match module_system::rewrite_import(&import.source, &target) {
                                ImportRewrite::Drop => {}
                                ImportRewrite::Keep => body.push(Item::Import(import)),
                                ImportRewrite::Replace(source) => {
                                    import.source = source;
                                    body.push(Item::Import(import));
                                }
                            }
                        }
                    }
                }
                other => body.push(other),
            }
        }
        program.body = body;
    }
}

pub fn build(options: &BuildOptions) -> Result<BuildSummary> {
    let input = options
        .path
        .canonicalize()
        .with_context(|| format!("cannot open {}", options.path.display()))?;
    let src_root = if input.is_file() {
        input.parent().unwrap_or(Path::new(".")).to_path_buf()
    } else {
        input.clone()
    };

    let groups = discover_groups(&input)?;
    if groups.is_empty() {
        bail!("no .tova files found under {}", input.display());
    }

    let mut cache = BuildCache::load(&options.out);
    let mut ctx = BuildContext::new(src_root.clone());
    let mut summary = BuildSummary::default();

    for (dir, files) in &groups {
        let mut contents: Vec<(PathBuf, String)> = Vec::with_capacity(files.len());
        for file in files {
            let source = fs::read_to_string(file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            contents.push((file.clone(), source));
        }

        let (key, hash) = if files.len() == 1 {
            (
                BuildCache::file_key(&files[0]),
                BuildCache::hash_source(&contents[0].1),
            )
        } else {
            (BuildCache::dir_key(dir), BuildCache::hash_group(&contents))
        };

        let group_label = ctx.display_name(dir);
        let group_label = if group_label.is_empty() {
            ".".to_string()
        } else {
            group_label
        };

        if !options.check_only && cache.is_up_to_date(&key, &hash) {
            println!("  {} {}", "Cached".cyan(), group_label);
            summary.cached += 1;
            continue;
        }

        let diag_start = ctx.diagnostics.len();

        for file in files {
            ctx.chase_imports(file.clone());
        }

        let group_set: HashSet<PathBuf> = files.iter().cloned().collect();
        let mut members: Vec<(String, Program)> = Vec::with_capacity(files.len());
        let mut parse_failed = false;
        for file in files {
            let display = ctx.display_name(file);
            match ctx.unit(file) {
                Some(unit) => members.push((display, unit.program.clone())),
                None => parse_failed = true,
            }
        }
        if parse_failed {
            println!("  {} {}", "Failed".red(), group_label);
            summary.failed += 1;
            continue;
        }

        for (i, file) in files.iter().enumerate() {
            ctx.process_imports(&mut members[i].1, file, &group_set);
        }

        let program = if members.len() == 1 {
            members.into_iter().next().unwrap().1
        } else {
            let result = merger::merge_programs(members);
            ctx.diagnostics.extend(result.diagnostics);
            result.program
        };

        ctx.diagnostics
            .extend(analyzer::analyze(&program, options.strict));

        let group_failed = ctx.diagnostics[diag_start..]
            .iter()
            .any(|d| d.severity == Severity::Error);
        if group_failed {
            println!("  {} {}", "Failed".red(), group_label);
            summary.failed += 1;
            continue;
        }

        let base = if files.len() == 1 {
            files[0]
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "app".to_string())
        } else if *dir == src_root {
            "app".to_string()
        } else {
            dir.file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "app".to_string())
        };

        let outputs = codegen::generate(&program, &base);
        summary.compiled += 1;

        if options.check_only {
            println!("  {} {}", "Checked".green(), group_label);
            continue;
        }

        let rel = dir.strip_prefix(&src_root).unwrap_or(Path::new(""));
        let out_dir = options.out.join(rel);
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("cannot create {}", out_dir.display()))?;

        let sources: Vec<String> = files.iter().map(|f| ctx.display_name(f)).collect();
        let written = write_outputs(&out_dir, &base, &outputs, &sources)?;
        cache.set(key, hash, written);
        println!("  {} {}", "Compiled".green(), group_label);
    }

    if !options.check_only {
        cache.prune();
        cache.save().context("cannot write build cache manifest")?;
    }

    summary.diagnostics = ctx.diagnostics;
    Ok(summary)
}

/// Emit every artifact of a unit plus its `.js.map`, returning the
/// artifact paths for the cache entry.
fn write_outputs(
    out_dir: &Path,
    base: &str,
    outputs: &CompiledOutputs,
    sources: &[String],
) -> Result<Vec<String>> {
    let mut named: Vec<(String, &Artifact)> = Vec::new();
    if outputs.is_module {
        if let Some(ref artifact) = outputs.shared {
            named.push((format!("{}.js", base), artifact));
        }
    } else {
        if let Some(ref artifact) = outputs.shared {
            named.push((format!("{}.shared.js", base), artifact));
        }
        if let Some(ref artifact) = outputs.server {
            named.push((format!("{}.server.js", base), artifact));
        }
        for (label, artifact) in &outputs.servers {
            named.push((format!("{}.server.{}.js", base, label), artifact));
        }
        if let Some(ref artifact) = outputs.client {
            named.push((format!("{}.client.js", base), artifact));
        }
        for (label, artifact) in &outputs.clients {
            named.push((format!("{}.client.{}.js", base, label), artifact));
        }
        if let Some(ref artifact) = outputs.test {
            named.push((format!("{}.test.js", base), artifact));
        }
        if let Some(ref artifact) = outputs.bench {
            named.push((format!("{}.bench.js", base), artifact));
        }
    }

    let mut written = Vec::with_capacity(named.len());
    for (name, artifact) in named {
        let js_path = out_dir.join(&name);
        let map_name = format!("{}.map", name);

        let mut code = artifact.code.clone();
        code.push_str(&source_maps::source_map_footer(&map_name));
        fs::write(&js_path, code).with_context(|| format!("cannot write {}", js_path.display()))?;

        let map = source_maps::generate_source_map(&name, sources, &artifact.mappings);
        fs::write(out_dir.join(&map_name), map)
            .with_context(|| format!("cannot write {}", map_name))?;

        written.push(js_path.to_string_lossy().into_owned());
    }
    Ok(written)
}

/// All `.tova` files in one directory, sorted; the merger's unit of
/// grouping.
fn tova_files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("tova") {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

/// Walk the source tree collecting one group per directory that holds
/// `.tova` files. Non-recursive grouping: subdirectories stay separate.
fn discover_groups(input: &Path) -> Result<Vec<(PathBuf, Vec<PathBuf>)>> {
    if input.is_file() {
        let dir = input.parent().unwrap_or(Path::new(".")).to_path_buf();
        return Ok(vec![(dir, vec![input.to_path_buf()])]);
    }

    let mut groups = Vec::new();
    walk(input, &mut groups)?;
    groups.sort_by(|a, b| a.0.cmp(&b.0));
    return Ok(groups);

    fn walk(dir: &Path, groups: &mut Vec<(PathBuf, Vec<PathBuf>)>) -> Result<()> {
        let mut subdirs = Vec::new();
        let files = tova_files_in(dir);
        for entry in
            fs::read_dir(dir).with_context(|| format!("cannot read {}", dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') || name == "node_modules" || name == "build" || name == "target"
            {
                continue;
            }
            subdirs.push(path);
        }
        if !files.is_empty() {
            groups.push((dir.to_path_buf(), files));
        }
        subdirs.sort();
        for sub in subdirs {
            walk(&sub, groups)?;
        }
        Ok(())
    }
}
