use crate::common::file::{FileSpec, write_file};
use arbor::Repository;
use arbor::artifacts::objects::commit::Author;
use assert_cmd::Command;
use assert_fs::TempDir;
use chrono::DateTime;
use rstest::fixture;
use std::path::Path;

pub const AUTHOR_NAME: &str = "fake_user";
pub const AUTHOR_EMAIL: &str = "fake_email@email.com";
pub const AUTHOR_DATE: &str = "2023-01-01 12:00:00 +0000";

#[fixture]
pub fn repository_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// Repository with one commit holding `1.txt`, `a/2.txt` and `a/b/3.txt`
#[fixture]
pub fn init_repository_dir(repository_dir: TempDir) -> TempDir {
    run_arbor_command(repository_dir.path(), &["init"])
        .assert()
        .success();

    write_file(FileSpec::new(repository_dir.path().join("1.txt"), "one".to_string()));
    write_file(FileSpec::new(
        repository_dir.path().join("a").join("2.txt"),
        "two".to_string(),
    ));
    write_file(FileSpec::new(
        repository_dir.path().join("a").join("b").join("3.txt"),
        "three".to_string(),
    ));

    run_arbor_command(repository_dir.path(), &["add", "."])
        .assert()
        .success();
    arbor_commit(repository_dir.path(), "Initial commit")
        .assert()
        .success();

    repository_dir
}

pub fn run_arbor_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("arbor").expect("Failed to find arbor binary");
    cmd.current_dir(dir).env("NO_COLOR", "1");
    cmd.env_remove("ARBOR_AUTHOR_NAME")
        .env_remove("ARBOR_AUTHOR_EMAIL")
        .env_remove("ARBOR_AUTHOR_DATE");
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

pub fn arbor_commit(dir: &Path, message: &str) -> Command {
    let mut cmd = run_arbor_command(dir, &["commit", "-m", message]);
    cmd.envs(vec![
        ("ARBOR_AUTHOR_NAME", AUTHOR_NAME),
        ("ARBOR_AUTHOR_EMAIL", AUTHOR_EMAIL),
        ("ARBOR_AUTHOR_DATE", AUTHOR_DATE), // %Y-%m-%d %H:%M:%S %z
    ]);
    cmd
}

/// Stdout of a successful command without its trailing newline
pub fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output)
        .expect("stdout is not UTF-8")
        .trim_end()
        .to_string()
}

/// Fixed-date author with a random identity
pub fn random_author() -> Author {
    use fake::Fake;
    use fake::faker::internet::en::FreeEmail;
    use fake::faker::name::en::Name;

    let name = Name().fake::<String>();
    let email = FreeEmail().fake::<String>();
    let timestamp = DateTime::parse_from_str(AUTHOR_DATE, "%Y-%m-%d %H:%M:%S %z")
        .expect("valid fixed date");

    Author::new_with_timestamp(name, email, timestamp)
}

/// Freshly initialized repository rooted at `dir`
pub fn init_repository(dir: &Path) -> Repository {
    let repository = Repository::new(dir).expect("Failed to open repository");
    repository.init().expect("Failed to init repository");
    repository
}
