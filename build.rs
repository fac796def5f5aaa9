use std::{fs, path::Path, process::Command, time::SystemTime};

fn main() {
  let now = SystemTime::now()
    .duration_since(std::time::UNIX_EPOCH)
    .map(|d| d.as_secs())
    .unwrap_or(0);
  println!("cargo:rustc-env=BUILD_TIME={}", now);

  // Tell Cargo to rerun this script if git state changes
  println!("cargo:rerun-if-changed=.git/HEAD");
  if Path::new(".git/refs/heads").exists() {
    println!("cargo:rerun-if-changed=.git/refs/heads");
  }

  let (branch, commit) = git_info();
  let commit_short: String = commit.chars().take(7).collect();

  println!("cargo:rustc-env=GIT_BRANCH={}", branch);
  println!("cargo:rustc-env=GIT_COMMIT_SHORT={}", commit_short);
}

fn git(args: &[&str]) -> Option<String> {
  let output = Command::new("git").args(args).output().ok()?;
  if !output.status.success() {
    return None;
  }
  let s = String::from_utf8_lossy(&output.stdout).trim().to_string();
  if s.is_empty() { None } else { Some(s) }
}

fn git_info() -> (String, String) {
  if let (Some(branch), Some(commit)) = (
    git(&["rev-parse", "--abbrev-ref", "HEAD"]),
    git(&["rev-parse", "HEAD"]),
  ) {
    return (branch, commit);
  }

  // Fallback to reading .git directly
  let Ok(head) = fs::read_to_string(".git/HEAD") else {
    return ("unknown".into(), "unknown".into());
  };
  match head.strip_prefix("ref: ") {
    Some(ref_path) => {
      let ref_path = ref_path.trim();
      let branch = ref_path.rsplit('/').next().unwrap_or("unknown").to_string();
      let commit = fs::read_to_string(format!(".git/{}", ref_path))
        .map(|c| c.trim().to_string())
        .unwrap_or_else(|_| "unknown".into());
      (branch, commit)
    }
    None => ("detached".into(), head.trim().to_string()),
  }
}
