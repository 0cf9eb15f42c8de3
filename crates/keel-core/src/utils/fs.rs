use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Every file under `root` accepted by `predicate`, walking directories in
/// name order. A missing `root` yields nothing; a file `root` is tested itself.
pub fn find_files<P, F>(root: P, predicate: &F) -> io::Result<Vec<PathBuf>>
where
    P: AsRef<Path>,
    F: Fn(&Path) -> bool + ?Sized,
{
    let root = root.as_ref();
    if root.is_file() {
        return Ok(predicate(root).then(|| root.to_path_buf()).into_iter().collect());
    }

    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        if !dir.is_dir() {
            continue;
        }
        let mut entries = fs::read_dir(&dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<io::Result<Vec<_>>>()?;
        entries.sort();

        // Subdirectories are pushed in reverse so the stack visits them in order.
        let mut subdirs = Vec::new();
        for entry in entries {
            if entry.is_dir() {
                subdirs.push(entry);
            } else if entry.is_file() && predicate(&entry) {
                found.push(entry);
            }
        }
        pending.extend(subdirs.into_iter().rev());
    }
    Ok(found)
}

/// Join `path` onto `base`. An empty `path` yields `base` unchanged, and a
/// leading separator on `path` does not replace `base`.
pub fn join_paths(base: &Path, path: &str) -> PathBuf {
    let relative = path.trim_start_matches(['/', '\\']);
    if relative.is_empty() {
        base.to_path_buf()
    } else {
        base.join(relative)
    }
}
