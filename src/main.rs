use anyhow::Result;
use arbor::Repository;
use arbor::areas::refs::HeadTarget;
use arbor::artifacts::objects::commit::{
    AUTHOR_DATE_ENV, AUTHOR_EMAIL_ENV, AUTHOR_NAME_ENV, Author, Commit,
};
use arbor::artifacts::objects::object::{Object, ObjectBox};
use arbor::artifacts::objects::object_id::ObjectId;
use arbor::artifacts::status::file_change::{ChangeLabel, IndexChange, WorkspaceChange};
use arbor::artifacts::status::status_info::StatusReport;
use arbor::commands::porcelain::checkout::CheckoutSummary;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "ARBOR_LOG";

#[derive(Parser)]
#[command(
    name = "arbor",
    version = "0.1.0",
    about = "A content-addressed version control engine",
    long_about = "Arbor snapshots a directory tree into a content-addressed object store, \
    records history as a graph of commits and rebuilds any recorded state on demand.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "init",
        about = "Initialize a new repository",
        long_about = "Create the .arbor directory in the current directory or at the given path."
    )]
    Init {
        #[arg(index = 1, help = "The path to the repository")]
        path: Option<PathBuf>,
    },
    #[command(name = "add", about = "Stage file contents for the next commit")]
    Add {
        #[arg(index = 1, required = true, help = "Files or directories to stage")]
        paths: Vec<PathBuf>,
    },
    #[command(name = "rm", about = "Stage the removal of tracked files")]
    Rm {
        #[arg(long, help = "Keep the working tree files")]
        cached: bool,
        #[arg(index = 1, required = true, help = "Files or directories to remove")]
        paths: Vec<PathBuf>,
    },
    #[command(
        name = "commit",
        about = "Record the staged changes as a new commit",
        long_about = "Create a commit from the staged changes. The author is read from \
        --author-name/--author-email or the ARBOR_AUTHOR_NAME/ARBOR_AUTHOR_EMAIL variables."
    )]
    Commit {
        #[arg(short, long, help = "The commit message")]
        message: String,
        #[arg(long, env = AUTHOR_NAME_ENV, help = "Author name")]
        author_name: String,
        #[arg(long, env = AUTHOR_EMAIL_ENV, help = "Author email")]
        author_email: String,
        #[arg(long, env = AUTHOR_DATE_ENV, help = "Fixed author date")]
        author_date: Option<String>,
    },
    #[command(
        name = "branch",
        about = "List, create or delete branches",
        long_about = "Without arguments, list branches with the current one marked. \
        With a name, create a branch at the start point (HEAD by default)."
    )]
    Branch {
        #[arg(short, long, help = "Delete the named branch")]
        delete: bool,
        #[arg(index = 1, help = "The branch name")]
        name: Option<String>,
        #[arg(index = 2, help = "The revision to start the branch at")]
        start_point: Option<String>,
    },
    #[command(
        name = "checkout",
        about = "Switch the working tree to a branch or commit",
        long_about = "Check out a branch (attaching HEAD) or any other revision (detaching HEAD). \
        Refuses to run when local changes would be lost."
    )]
    Checkout {
        #[arg(short = 'b', help = "Create the branch at HEAD and switch to it")]
        new_branch: bool,
        #[arg(index = 1, help = "The branch or revision to check out")]
        target: String,
    },
    #[command(name = "log", about = "Show first-parent commit history")]
    Log {
        #[arg(short = 'n', long = "max-count", help = "Limit the number of commits")]
        max_count: Option<usize>,
        #[arg(long, help = "One line per commit")]
        oneline: bool,
        #[arg(index = 1, help = "The revision to start from (HEAD by default)")]
        revision: Option<String>,
    },
    #[command(name = "status", about = "Show the working tree status")]
    Status {
        #[arg(long, help = "Machine-readable XY output")]
        porcelain: bool,
    },
    #[command(
        name = "hash-object",
        about = "Compute a file's object id and optionally store it",
        long_about = "Hash a file as a blob and, with -w, write it to the object database."
    )]
    HashObject {
        #[arg(short, long, help = "Write the object to the object database")]
        write: bool,
        #[arg(index = 1)]
        file: PathBuf,
    },
    #[command(name = "cat-file", about = "Print an object")]
    CatFile {
        #[arg(short = 't', help = "Print the object type instead of its content")]
        show_type: bool,
        #[arg(short = 'p', long, help = "The object id, id prefix or revision")]
        object: String,
    },
    #[command(name = "ls-tree", about = "List the entries of a tree")]
    LsTree {
        #[arg(short = 'r', help = "Recurse into subtrees")]
        recursive: bool,
        #[arg(index = 1, help = "A tree id, or a revision naming a commit")]
        object: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    let pwd = std::env::current_dir()?;
    let mut out = std::io::stdout().lock();

    match command {
        Commands::Init { path } => {
            let path = path.map(|path| pwd.join(path)).unwrap_or(pwd);
            std::fs::create_dir_all(&path)?;
            let repository = Repository::new(&path)?;

            repository.init()?;
            writeln!(
                out,
                "Initialized empty arbor repository in {}",
                repository.metadata_path().display()
            )?;
        }
        Commands::Add { paths } => {
            let repository = Repository::open(&pwd)?;
            repository.add(&absolute(&pwd, paths)).await?;
        }
        Commands::Rm { cached, paths } => {
            let repository = Repository::open(&pwd)?;
            let paths = absolute(&pwd, paths);

            repository.rm(&paths, cached).await?;
            for path in paths {
                writeln!(out, "rm '{}'", repository.workspace().relative_path(&path)?.display())?;
            }
        }
        Commands::Commit {
            message,
            author_name,
            author_email,
            author_date,
        } => {
            let repository = Repository::open(&pwd)?;
            let author = Author::from_parts(author_name, author_email, author_date.as_deref())?;

            let oid = repository.commit(&message, author).await?;
            let commit = repository.database().parse_object_as_commit(&oid)?;
            let root = if commit.parents().is_empty() {
                "(root-commit) "
            } else {
                ""
            };
            writeln!(out, "[{}{}] {}", root, oid.to_short_oid(), commit.short_message())?;
        }
        Commands::Branch {
            delete,
            name,
            start_point,
        } => {
            let repository = Repository::open(&pwd)?;

            match (name, delete) {
                (Some(name), true) => {
                    let oid = repository.delete_branch(&name).await?;
                    writeln!(out, "Deleted branch {} (was {}).", name, oid.to_short_oid())?;
                }
                (Some(name), false) => {
                    repository
                        .create_branch(&name, start_point.as_deref())
                        .await?;
                }
                (None, true) => anyhow::bail!("branch name required"),
                (None, false) => {
                    for branch in repository.list_branches()? {
                        if branch.is_current {
                            writeln!(out, "* {}", branch.name.as_ref().green())?;
                        } else {
                            writeln!(out, "  {}", branch.name)?;
                        }
                    }
                }
            }
        }
        Commands::Checkout { new_branch, target } => {
            let repository = Repository::open(&pwd)?;
            let summary = if new_branch {
                repository.checkout_new_branch(&target).await?
            } else {
                repository.checkout(&target).await?
            };

            print_checkout(&repository, &summary, new_branch)?;
        }
        Commands::Log {
            max_count,
            oneline,
            revision,
        } => {
            let repository = Repository::open(&pwd)?;
            let history = repository
                .log(revision.as_deref())?
                .take(max_count.unwrap_or(usize::MAX));

            for (position, entry) in history.enumerate() {
                let (oid, commit) = entry?;
                if oneline {
                    writeln!(out, "{} {}", oid.to_short_oid().yellow(), commit.short_message())?;
                } else {
                    if position > 0 {
                        writeln!(out)?;
                    }
                    print_commit(&mut out, &oid, &commit)?;
                }
            }
        }
        Commands::Status { porcelain } => {
            let repository = Repository::open(&pwd)?;
            let report = repository.status().await?;

            if porcelain {
                print_status_porcelain(&mut out, &report)?;
            } else {
                print_status_long(&mut out, &repository, &report)?;
            }
        }
        Commands::HashObject { write, file } => {
            let repository = Repository::open(&pwd)?;
            let oid = repository.hash_object(&pwd.join(file), write)?;
            writeln!(out, "{oid}")?;
        }
        Commands::CatFile { show_type, object } => {
            let repository = Repository::open(&pwd)?;
            let object = repository.cat_file(&object)?;

            if show_type {
                writeln!(out, "{}", object.object_type())?;
            } else {
                match &object {
                    ObjectBox::Blob(blob) => out.write_all(blob.content())?,
                    other => writeln!(out, "{}", other.display())?,
                }
            }
        }
        Commands::LsTree { recursive, object } => {
            let repository = Repository::open(&pwd)?;

            for (path, entry) in repository.ls_tree(&object, recursive)? {
                let object_type = if entry.is_tree() { "tree" } else { "blob" };
                writeln!(
                    out,
                    "{} {} {}\t{}",
                    entry.mode.as_str(),
                    object_type,
                    entry.oid,
                    path.display()
                )?;
            }
        }
    }

    Ok(())
}

fn absolute(pwd: &Path, paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.into_iter().map(|path| pwd.join(path)).collect()
}

fn print_commit(out: &mut impl Write, oid: &ObjectId, commit: &Commit) -> Result<()> {
    writeln!(out, "{}", format!("commit {oid}").yellow())?;
    if commit.parents().len() > 1 {
        let parents = commit
            .parents()
            .iter()
            .map(|parent| parent.to_short_oid())
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "Merge: {parents}")?;
    }
    writeln!(out, "Author: {}", commit.author().display_name())?;
    writeln!(out, "Date:   {}", commit.author().readable_timestamp())?;
    writeln!(out)?;
    for line in commit.message().lines() {
        writeln!(out, "    {line}")?;
    }

    Ok(())
}

fn print_checkout(repository: &Repository, summary: &CheckoutSummary, created: bool) -> Result<()> {
    match (&summary.previous_head, &summary.head) {
        (_, HeadTarget::Branch(branch)) if created => {
            eprintln!("Switched to a new branch '{branch}'");
        }
        (HeadTarget::Branch(previous), HeadTarget::Branch(branch)) if previous == branch => {
            eprintln!("Already on '{branch}'");
        }
        (_, HeadTarget::Branch(branch)) => eprintln!("Switched to branch '{branch}'"),
        (previous, HeadTarget::Detached(oid)) => {
            if matches!(previous, HeadTarget::Branch(_)) {
                eprintln!(
                    "Note: switching to '{}'. You are in 'detached HEAD' state; \
                    commits made here do not move any branch.",
                    oid
                );
            }
            let commit = repository.database().parse_object_as_commit(oid)?;
            eprintln!("HEAD is now at {} {}", oid.to_short_oid(), commit.short_message());
        }
    }

    Ok(())
}

fn print_status_porcelain(out: &mut impl Write, report: &StatusReport) -> Result<()> {
    for (path, change) in report.changes() {
        writeln!(out, "{} {}", change, path.display())?;
    }
    for path in &report.untracked {
        writeln!(out, "?? {}", path.display())?;
    }

    Ok(())
}

fn print_status_long(
    out: &mut impl Write,
    repository: &Repository,
    report: &StatusReport,
) -> Result<()> {
    match repository.refs().head()? {
        HeadTarget::Branch(branch) => writeln!(out, "On branch {branch}")?,
        HeadTarget::Detached(oid) => {
            writeln!(out, "{} {}", "HEAD detached at".red(), oid.to_short_oid())?
        }
    }

    if report.is_clean() {
        writeln!(out, "nothing to commit, working tree clean")?;
        return Ok(());
    }

    let changes = report.changes();

    let staged = changes
        .iter()
        .filter(|(_, change)| change.index != IndexChange::None)
        .collect::<Vec<_>>();
    if !staged.is_empty() {
        writeln!(out, "\nChanges to be committed:")?;
        for (path, change) in staged {
            let line = format!("{}", path.display()).green();
            writeln!(out, "{}{}", ChangeLabel::Staged(change.index), line)?;
        }
    }

    let unstaged = changes
        .iter()
        .filter(|(_, change)| change.workspace != WorkspaceChange::None)
        .collect::<Vec<_>>();
    if !unstaged.is_empty() {
        writeln!(out, "\nChanges not staged for commit:")?;
        for (path, change) in unstaged {
            let line = format!("{}", path.display()).red();
            writeln!(out, "{}{}", ChangeLabel::Unstaged(change.workspace), line)?;
        }
    }

    if !report.untracked.is_empty() {
        writeln!(out, "\nUntracked files:")?;
        for path in &report.untracked {
            writeln!(out, "{:>8}{}", "", format!("{}", path.display()).red())?;
        }
    }

    Ok(())
}
