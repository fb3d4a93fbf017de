//! Check command: parse, typecheck and elaborate files without simulating.

use std::path::{Path, PathBuf};

use cascade_core::config::GlobalConfig;
use cascade_core::march::March;
use cascade_util::errors::CascadeError;
use cascade_util::fs::{read_source, IncludePath};
use cascade_util::progress::{file_progress, status};
use cascade_verilog::ast::SourceElement;
use cascade_verilog::{elaborate, parse, Issue, Program, SourceFile};
use miette::Result;
use tracing::debug;

const MAX_INCLUDE_DEPTH: usize = 16;

pub fn exec(files: &[PathBuf], march: Option<&str>, include: Option<&str>, verbose: bool) -> Result<i32> {
    let config = GlobalConfig::load()?;
    let march: March = march.unwrap_or(config.runtime.march.as_str()).parse()?;

    let mut search = IncludePath::new();
    for dir in &config.runtime.include_dirs {
        search.push(dir);
    }
    if let Some(list) = include {
        search.extend(&IncludePath::from_colon_list(list));
    }

    let pb = file_progress(files.len() as u64, "Checking");
    for path in files {
        debug!(path = %path.display(), march = %march, "checking");
        let mut checker = Checker {
            program: Program::new(),
            include: &search,
        };
        let prelude = SourceFile::new(march.path(), march.source());
        checker.load(&prelude, None, 0)?;
        checker.load_path(path, 0)?;
        elaborate(&checker.program).map_err(|e| CascadeError::Elaboration {
            message: format!("{}: {e}", path.display()),
        })?;
        pb.inc(1);
        if verbose {
            pb.suspend(|| status("Checked", &path.display().to_string()));
        }
    }
    pb.finish_and_clear();

    status("Finished", &format!("{} file(s) checked", files.len()));
    Ok(0)
}

struct Checker<'a> {
    program: Program,
    include: &'a IncludePath,
}

impl Checker<'_> {
    fn load_path(&mut self, path: &Path, depth: usize) -> Result<()> {
        let text = read_source(path).map_err(CascadeError::Io)?;
        let file = SourceFile::new(path.display().to_string(), text);
        self.load(&file, path.parent(), depth)
    }

    fn load(&mut self, file: &SourceFile, dir: Option<&Path>, depth: usize) -> Result<()> {
        for element in parse(file)? {
            match element {
                SourceElement::Module(decl) => report(file, self.program.declare(decl))?,
                SourceElement::Item(item) => report(file, self.program.eval(item))?,
                SourceElement::Include { path, span } => {
                    if depth >= MAX_INCLUDE_DEPTH {
                        return Err(CascadeError::Parse {
                            message: format!("{}: include nesting is too deep", file.location(span)),
                        }
                        .into());
                    }
                    let resolved = self.include.resolve(&path, dir).ok_or_else(|| {
                        CascadeError::Parse {
                            message: format!("{}: unable to locate file {path}", file.location(span)),
                        }
                    })?;
                    self.load_path(&resolved, depth + 1)?;
                }
            }
        }
        Ok(())
    }
}

/// Print warnings and fail with the first error, if any.
fn report(file: &SourceFile, result: std::result::Result<Vec<Issue>, Vec<Issue>>) -> Result<()> {
    let issues = match &result {
        Ok(issues) | Err(issues) => issues,
    };
    for issue in issues.iter().filter(|i| !i.is_error()) {
        eprintln!("{:?}", miette::Report::new(issue.to_diagnostic(file)));
    }
    if let Some(error) = issues.iter().find(|i| i.is_error()) {
        return Err(error.to_diagnostic(file).into());
    }
    if result.is_err() {
        return Err(CascadeError::Typecheck {
            message: format!("{} was rejected", file.path()),
        }
        .into());
    }
    Ok(())
}
