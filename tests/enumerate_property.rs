// tests/enumerate_property.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use proptest::prelude::*;
use stalk::fs::mock::MockFileSystem;
use stalk::tree::{enumerate, IgnoreSet};

// A tree is described by parent indices: node i (i >= 1) hangs under
// node `parents[i - 1] % i`, which keeps it acyclic. Node 0 is the root.
fn tree_strategy(max_nodes: usize) -> impl Strategy<Value = Vec<usize>> {
    proptest::collection::vec(any::<usize>(), 0..max_nodes)
}

fn build_paths(parents: &[usize]) -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("root")];
    for (i, raw) in parents.iter().enumerate() {
        let node = i + 1;
        let parent = raw % node;
        let path = paths[parent].join(format!("d{node}"));
        paths.push(path);
    }
    paths
}

proptest! {
    #[test]
    fn every_directory_exactly_once(
        parents in tree_strategy(40),
        files in proptest::collection::vec(any::<usize>(), 0..20),
    ) {
        let paths = build_paths(&parents);
        let fs = MockFileSystem::new();
        for p in &paths {
            fs.add_dir(p);
        }
        for (i, raw) in files.iter().enumerate() {
            let dir = &paths[raw % paths.len()];
            fs.add_file(dir.join(format!("f{i}.txt")));
        }

        let dirs = enumerate(&fs, Path::new("root"), &IgnoreSet::empty());

        let unique: HashSet<&PathBuf> = dirs.iter().collect();
        prop_assert_eq!(unique.len(), dirs.len());
        prop_assert_eq!(
            dirs.iter().cloned().collect::<HashSet<_>>(),
            paths.iter().cloned().collect::<HashSet<_>>()
        );

        // Parents always precede their children.
        for (idx, dir) in dirs.iter().enumerate() {
            if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
                let parent_idx = dirs.iter().position(|d| d == parent).unwrap();
                prop_assert!(parent_idx < idx);
            }
        }
    }
}
