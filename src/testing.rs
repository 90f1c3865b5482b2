//! Scripted [`Vcs`] fake for unit tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use deploy_git_vcs::{ProcessOutput, Vcs, VcsError};

/// One recorded invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

/// Records every call and answers from a per-subcommand script.
///
/// Unscripted subcommands succeed. `clone` additionally materialises a fake
/// checkout at its destination argument: a `.git/HEAD` plus a couple of
/// tracked files, so purge has something to delete.
#[derive(Debug)]
pub struct ScriptedVcs {
    responses: HashMap<String, ProcessOutput>,
    branch: String,
    last_commit: String,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedVcs {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            branch: "master".to_owned(),
            last_commit: "1a2b3c4 build: upstream change".to_owned(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn respond(mut self, subcommand: &str, output: ProcessOutput) -> Self {
        self.responses.insert(subcommand.to_owned(), output);
        self
    }

    pub fn on_branch(mut self, branch: &str) -> Self {
        self.branch = branch.to_owned();
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn subcommands(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| c.args.first().cloned())
            .collect()
    }

    pub fn called(&self, subcommand: &str) -> bool {
        self.subcommands().iter().any(|s| s == subcommand)
    }

    pub fn call(&self, subcommand: &str) -> Option<Call> {
        self.calls
            .borrow()
            .iter()
            .find(|c| c.args.first().is_some_and(|s| s == subcommand))
            .cloned()
    }
}

impl Vcs for ScriptedVcs {
    fn run(&self, args: &[&str], cwd: &Path) -> Result<ProcessOutput, VcsError> {
        self.calls.borrow_mut().push(Call {
            args: args.iter().map(|a| (*a).to_owned()).collect(),
            cwd: cwd.to_path_buf(),
        });
        let sub = args.first().copied().unwrap_or_default();
        if let Some(scripted) = self.responses.get(sub) {
            return Ok(scripted.clone());
        }
        match sub {
            "rev-parse" => Ok(ProcessOutput::ok(format!("{}\n", self.branch))),
            "log" => Ok(ProcessOutput::ok(format!("{}\n", self.last_commit))),
            "clone" => {
                let dest = Path::new(args.last().copied().unwrap_or_default());
                fake_checkout(dest).map_err(|source| VcsError::Wait {
                    program: "git".to_owned(),
                    source,
                })?;
                Ok(ProcessOutput::ok(""))
            }
            _ => Ok(ProcessOutput::ok("")),
        }
    }
}

fn fake_checkout(dest: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dest.join(".git"))?;
    fs::write(dest.join(".git").join("HEAD"), "ref: refs/heads/master\n")?;
    fs::write(dest.join("old.txt"), "stale\n")?;
    fs::create_dir_all(dest.join("assets"))?;
    fs::write(dest.join("assets").join("old.css"), "body {}\n")?;
    Ok(())
}
