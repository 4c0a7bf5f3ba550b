use grappler::worktree::{common_dir, repository_root, scan_worktrees};
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) -> bool {
    Command::new("git")
        .args(["-c", "user.name=grappler", "-c", "user.email=grappler@localhost"])
        .args(args)
        .current_dir(dir)
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

#[test]
fn linked_worktree_shares_common_dir_with_main_checkout() {
    let dir = TempDir::new().expect("temp dir");
    let main = dir.path().join("core");
    let linked = dir.path().join("core-feature");
    fs::create_dir_all(&main).unwrap();

    let ready = git(&main, &["init", "-q"])
        && git(&main, &["commit", "--allow-empty", "-q", "-m", "init"])
        && git(
            &main,
            &["worktree", "add", "-q", "-b", "feature", linked.to_str().unwrap()],
        );
    if !ready {
        eprintln!("git unavailable, skipping");
        return;
    }

    let from_main = common_dir(&main).unwrap();
    let from_linked = common_dir(&linked).unwrap();
    let from_subdir = {
        let nested = linked.join("src");
        fs::create_dir_all(&nested).unwrap();
        common_dir(&nested).unwrap()
    };

    let expected = fs::canonicalize(main.join(".git")).unwrap();
    assert_eq!(fs::canonicalize(&from_main).unwrap(), expected);
    assert_eq!(fs::canonicalize(&from_linked).unwrap(), expected);
    assert_eq!(fs::canonicalize(&from_subdir).unwrap(), expected);
    assert_eq!(
        fs::canonicalize(repository_root(&from_linked)).unwrap(),
        fs::canonicalize(&main).unwrap()
    );

    let worktrees = scan_worktrees(&linked).unwrap();
    assert_eq!(worktrees.len(), 2);
    assert!(worktrees.iter().any(|wt| wt.branch == "feature"));
}

#[test]
fn plain_directory_is_not_a_repository() {
    let dir = TempDir::new().expect("temp dir");
    if git(dir.path(), &["rev-parse", "--git-dir"]) {
        eprintln!("temp dir sits inside a repository, skipping");
        return;
    }
    assert!(common_dir(dir.path()).is_err());
}
