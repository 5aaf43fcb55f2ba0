use std::path::{Path, PathBuf};
use std::process::Command;

use camino::Utf8Path;
use tracing::{debug, info};

use crate::error::CatalogError;

pub const CONVERTER: &str = "csvs-to-sqlite";
pub const INDEXER: &str = "sqlite-utils";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a program to completion. Implementations only report spawn failures
/// as errors; a non-zero exit is returned as data.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CatalogError>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CatalogError> {
        (**self).run(program, args)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CatalogError> {
        let resolved =
            find_in_path(program).ok_or_else(|| CatalogError::MissingTool(program.to_string()))?;
        debug!(program = %resolved.display(), ?args, "spawning");
        let output = Command::new(&resolved)
            .args(args)
            .output()
            .map_err(|err| CatalogError::ExternalTool {
                command: render_command(program, args),
                status: "spawn failure".to_string(),
                stderr: err.to_string(),
            })?;
        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Runs a command and turns a non-zero exit into `ExternalTool`, keeping the
/// tool's stderr as-is.
pub fn run_checked<R: CommandRunner + ?Sized>(
    runner: &R,
    program: &str,
    args: Vec<String>,
) -> Result<CommandOutput, CatalogError> {
    let output = runner.run(program, &args)?;
    if output.success() {
        return Ok(output);
    }
    let status = match output.exit_code {
        Some(code) => format!("exit code {code}"),
        None => "signal".to_string(),
    };
    let stderr = if output.stderr.trim().is_empty() {
        output.stdout.trim().to_string()
    } else {
        output.stderr.trim_end().to_string()
    };
    Err(CatalogError::ExternalTool {
        command: render_command(program, &args),
        status,
        stderr,
    })
}

/// Loads CSV inputs (paths or URLs) into one SQLite file with `csvs-to-sqlite`.
pub struct CatalogConverter<R> {
    runner: R,
}

impl<R: CommandRunner> CatalogConverter<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn convert(&self, inputs: &[&str], database: &Utf8Path) -> Result<(), CatalogError> {
        let mut args = inputs.iter().map(|input| input.to_string()).collect::<Vec<_>>();
        args.push(database.to_string());
        info!(inputs = inputs.len(), database = %database, "converting CSV files");
        run_checked(&self.runner, CONVERTER, args)?;
        Ok(())
    }
}

/// Drives `sqlite-utils` to add full-text search and compact the database.
pub struct SearchIndexer<R> {
    runner: R,
}

impl<R: CommandRunner> SearchIndexer<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn enable_fts(
        &self,
        database: &Utf8Path,
        table: &str,
        columns: &[String],
    ) -> Result<(), CatalogError> {
        let mut args = vec![
            "enable-fts".to_string(),
            "--replace".to_string(),
            database.to_string(),
            table.to_string(),
        ];
        args.extend(columns.iter().cloned());
        info!(table, ?columns, "enabling full-text search");
        run_checked(&self.runner, INDEXER, args)?;
        Ok(())
    }

    pub fn analyze(&self, database: &Utf8Path) -> Result<(), CatalogError> {
        let args = vec![
            "analyze-tables".to_string(),
            database.to_string(),
            "--save".to_string(),
        ];
        run_checked(&self.runner, INDEXER, args)?;
        Ok(())
    }

    pub fn vacuum(&self, database: &Utf8Path) -> Result<(), CatalogError> {
        run_checked(
            &self.runner,
            INDEXER,
            vec!["vacuum".to_string(), database.to_string()],
        )?;
        Ok(())
    }

    /// Full-text search on every table, then column statistics, then vacuum.
    pub fn index(
        &self,
        database: &Utf8Path,
        tables: &[&str],
        columns: &[String],
    ) -> Result<(), CatalogError> {
        for table in tables {
            self.enable_fts(database, table, columns)?;
        }
        self.analyze(database)?;
        self.vacuum(database)
    }
}

fn render_command(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{program} {}", args.join(" "))
    }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return candidate.exists().then(|| candidate.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use assert_matches::assert_matches;

    use super::*;

    struct Scripted {
        calls: RefCell<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl Scripted {
        fn new(fail_on: Option<&'static str>) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                fail_on,
            }
        }
    }

    impl CommandRunner for Scripted {
        fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CatalogError> {
            let line = render_command(program, args);
            self.calls.borrow_mut().push(line.clone());
            let failed = self.fail_on.is_some_and(|needle| line.contains(needle));
            Ok(CommandOutput {
                exit_code: Some(if failed { 1 } else { 0 }),
                stdout: String::new(),
                stderr: if failed {
                    "Error: no such table: x\n".to_string()
                } else {
                    String::new()
                },
            })
        }
    }

    #[test]
    fn indexer_runs_fts_then_analyze_then_vacuum() {
        let runner = Scripted::new(None);
        let indexer = SearchIndexer::new(&runner);
        let columns = vec!["cities".to_string(), "time".to_string()];
        indexer
            .index(Utf8Path::new("c.db"), &["t1", "t2"], &columns)
            .unwrap();

        assert_eq!(
            *runner.calls.borrow(),
            vec![
                "sqlite-utils enable-fts --replace c.db t1 cities time",
                "sqlite-utils enable-fts --replace c.db t2 cities time",
                "sqlite-utils analyze-tables c.db --save",
                "sqlite-utils vacuum c.db",
            ]
        );
    }

    #[test]
    fn non_zero_exit_surfaces_stderr_and_stops() {
        let runner = Scripted::new(Some("t1"));
        let indexer = SearchIndexer::new(&runner);
        let err = indexer
            .index(Utf8Path::new("c.db"), &["t1", "t2"], &["cities".to_string()])
            .unwrap_err();

        assert_matches!(
            err,
            CatalogError::ExternalTool { ref status, ref stderr, .. }
                if status == "exit code 1" && stderr == "Error: no such table: x"
        );
        assert_eq!(runner.calls.borrow().len(), 1);
    }

    #[test]
    fn converter_passes_inputs_then_database() {
        let runner = Scripted::new(None);
        CatalogConverter::new(&runner)
            .convert(&["https://x/a.csv.gz", "https://x/b.csv.gz"], Utf8Path::new("c.db"))
            .unwrap();
        assert_eq!(
            *runner.calls.borrow(),
            vec!["csvs-to-sqlite https://x/a.csv.gz https://x/b.csv.gz c.db"]
        );
    }

    #[test]
    fn missing_program_is_reported() {
        let err = SystemCommandRunner::new()
            .run("definitely-not-a-real-tool-9f2c", &[])
            .unwrap_err();
        assert_matches!(err, CatalogError::MissingTool(_));
    }
}
