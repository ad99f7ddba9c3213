//! Bottom-up tree construction
//!
//! The builder starts from the parent commit's root tree and only expands the
//! directories a staged change touches. Directories are kept in an arena where every
//! child is pushed after its parent, so walking the arena backwards visits children
//! before parents and the whole fold runs without recursion. Untouched directories
//! keep the id they had in the parent tree and are never re-read or re-hashed.

use crate::areas::database::Database;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::{Tree, validate_entry_name};
use std::collections::BTreeMap;
use std::path::{Component, Path};
use tracing::debug;

#[derive(Debug, Clone)]
enum Slot {
    /// A blob, or a directory that has not been expanded
    Stored(DatabaseEntry),
    /// An expanded directory, by arena index
    Node(usize),
}

#[derive(Debug)]
struct DirNode {
    /// Id of the directory in the base tree, if it existed there
    base: Option<ObjectId>,
    entries: BTreeMap<String, Slot>,
    dirty: bool,
}

impl DirNode {
    fn empty() -> Self {
        DirNode {
            base: None,
            entries: BTreeMap::new(),
            dirty: true,
        }
    }

    fn from_tree(base: ObjectId, tree: Tree) -> Self {
        DirNode {
            base: Some(base),
            entries: tree
                .into_entries()
                .map(|(name, entry)| (name, Slot::Stored(entry)))
                .collect(),
            dirty: false,
        }
    }
}

pub struct TreeBuilder<'d> {
    database: &'d Database,
    nodes: Vec<DirNode>,
}

impl<'d> TreeBuilder<'d> {
    /// Start from `base_tree`, or from an empty root when there is none.
    pub fn new(database: &'d Database, base_tree: Option<&ObjectId>) -> anyhow::Result<Self> {
        let root = match base_tree {
            Some(oid) => DirNode::from_tree(oid.clone(), database.parse_object_as_tree(oid)?),
            None => DirNode::empty(),
        };

        Ok(TreeBuilder {
            database,
            nodes: vec![root],
        })
    }

    /// Place a blob entry at `path`, replacing whatever was there.
    ///
    /// Missing directories are created; a file standing where a directory is
    /// needed is replaced by that directory.
    pub fn stage(&mut self, path: &Path, entry: DatabaseEntry) -> anyhow::Result<()> {
        let (dirs, file_name) = split_path(path)?;

        let mut node = 0;
        self.nodes[node].dirty = true;
        for dir in dirs {
            node = self
                .child_dir(node, dir, true)?
                .ok_or_else(|| anyhow::anyhow!("unable to create directory {dir}"))?;
            self.nodes[node].dirty = true;
        }

        self.nodes[node]
            .entries
            .insert(file_name.to_string(), Slot::Stored(entry));

        Ok(())
    }

    /// Drop whatever is at `path`; a path that does not exist is left alone.
    pub fn remove(&mut self, path: &Path) -> anyhow::Result<()> {
        let (dirs, file_name) = split_path(path)?;

        let mut trail = vec![0];
        for dir in dirs {
            let parent = trail[trail.len() - 1];
            match self.child_dir(parent, dir, false)? {
                Some(child) => trail.push(child),
                None => return Ok(()),
            }
        }

        let node = trail[trail.len() - 1];
        if self.nodes[node].entries.remove(file_name).is_some() {
            for node in trail {
                self.nodes[node].dirty = true;
            }
        }

        Ok(())
    }

    /// Store every changed directory and return the root tree id.
    ///
    /// Directories left empty are pruned from their parent; the root is always
    /// stored, even when empty.
    pub fn build(self) -> anyhow::Result<ObjectId> {
        let mut resolved: Vec<Option<ObjectId>> = vec![None; self.nodes.len()];
        let mut stored = 0usize;

        for (index, node) in self.nodes.iter().enumerate().rev() {
            if let (false, Some(base)) = (node.dirty, &node.base) {
                resolved[index] = Some(base.clone());
                continue;
            }

            let mut tree = Tree::new();
            for (name, slot) in &node.entries {
                match slot {
                    Slot::Stored(entry) => tree.insert(name.clone(), entry.clone())?,
                    Slot::Node(child) => {
                        if let Some(oid) = &resolved[*child] {
                            tree.insert(
                                name.clone(),
                                DatabaseEntry::new(oid.clone(), EntryMode::Directory),
                            )?;
                        }
                    }
                }
            }

            if tree.is_empty() && index != 0 {
                continue;
            }

            resolved[index] = Some(self.database.store(&tree)?);
            stored += 1;
        }

        debug!(
            directories = self.nodes.len(),
            stored, "built tree from staged changes"
        );

        resolved
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| anyhow::anyhow!("root tree was not stored"))
    }

    /// Arena index of the directory `name` inside `parent`, expanding it on demand.
    ///
    /// With `create`, a missing directory (or a file in its place) becomes a new empty
    /// directory; without it, `None` is returned instead.
    fn child_dir(&mut self, parent: usize, name: &str, create: bool) -> anyhow::Result<Option<usize>> {
        let child = match self.nodes[parent].entries.get(name) {
            Some(Slot::Node(child)) => return Ok(Some(*child)),
            Some(Slot::Stored(entry)) if entry.is_tree() => {
                let tree = self.database.parse_object_as_tree(&entry.oid)?;
                DirNode::from_tree(entry.oid.clone(), tree)
            }
            _ if create => DirNode::empty(),
            _ => return Ok(None),
        };

        self.nodes.push(child);
        let index = self.nodes.len() - 1;
        self.nodes[parent]
            .entries
            .insert(name.to_string(), Slot::Node(index));

        Ok(Some(index))
    }
}

/// Split a relative path into its directory components and final name.
fn split_path(path: &Path) -> anyhow::Result<(Vec<&str>, &str)> {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => {
                let name = name
                    .to_str()
                    .ok_or_else(|| anyhow::anyhow!("path {:?} is not valid UTF-8", path))?;
                validate_entry_name(name)?;
                components.push(name);
            }
            _ => anyhow::bail!("path {:?} is not a plain relative path", path),
        }
    }

    let file_name = components
        .pop()
        .ok_or_else(|| anyhow::anyhow!("empty path"))?;

    Ok((components, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::entry_mode::FileMode;
    use crate::artifacts::objects::blob::Blob;
    use crate::artifacts::snapshot::flatten::flatten_tree;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use std::path::PathBuf;

    struct Store {
        _dir: tempfile::TempDir,
        database: Database,
    }

    #[fixture]
    fn store() -> Store {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::new(dir.path().join("objects").into_boxed_path());

        Store {
            _dir: dir,
            database,
        }
    }

    fn file(database: &Database, content: &str) -> DatabaseEntry {
        let oid = database.store(&Blob::new(content.to_string())).unwrap();
        DatabaseEntry::new(oid, EntryMode::File(FileMode::Regular))
    }

    fn build(database: &Database, base: Option<&ObjectId>, files: &[(&str, &str)]) -> ObjectId {
        let mut builder = TreeBuilder::new(database, base).unwrap();
        for (path, content) in files {
            builder
                .stage(Path::new(path), file(database, content))
                .unwrap();
        }
        builder.build().unwrap()
    }

    fn subtree(database: &Database, root: &ObjectId, name: &str) -> Option<ObjectId> {
        database
            .parse_object_as_tree(root)
            .unwrap()
            .get(name)
            .map(|entry| entry.oid.clone())
    }

    #[rstest]
    fn unchanged_sibling_subtree_is_shared(store: Store) {
        let database = &store.database;
        let first = build(
            database,
            None,
            &[("lib/a.rs", "a"), ("lib/b.rs", "b"), ("docs/readme", "r")],
        );
        let second = build(database, Some(&first), &[("docs/readme", "changed")]);

        assert_ne!(first, second);
        assert_eq!(subtree(database, &first, "lib"), subtree(database, &second, "lib"));
        assert_ne!(
            subtree(database, &first, "docs"),
            subtree(database, &second, "docs")
        );
    }

    #[rstest]
    fn incremental_and_from_scratch_builds_agree(store: Store) {
        let database = &store.database;
        let base = build(database, None, &[("a/b/c.txt", "c"), ("top.txt", "t")]);
        let incremental = build(database, Some(&base), &[("a/d.txt", "d")]);
        let scratch = build(
            database,
            None,
            &[("a/d.txt", "d"), ("top.txt", "t"), ("a/b/c.txt", "c")],
        );

        assert_eq!(incremental, scratch);
    }

    #[rstest]
    fn removing_last_file_prunes_directories(store: Store) {
        let database = &store.database;
        let base = build(database, None, &[("deep/er/file", "x"), ("keep", "k")]);

        let mut builder = TreeBuilder::new(database, Some(&base)).unwrap();
        builder.remove(Path::new("deep/er/file")).unwrap();
        builder.remove(Path::new("never/existed")).unwrap();
        let root = builder.build().unwrap();

        let files = flatten_tree(database, &root).unwrap();
        assert_eq!(files.keys().collect::<Vec<_>>(), vec![&PathBuf::from("keep")]);
        assert_eq!(subtree(database, &root, "deep"), None);
    }

    #[rstest]
    fn removing_everything_leaves_an_empty_root(store: Store) {
        let database = &store.database;
        let base = build(database, None, &[("only", "x")]);

        let mut builder = TreeBuilder::new(database, Some(&base)).unwrap();
        builder.remove(Path::new("only")).unwrap();
        let root = builder.build().unwrap();

        assert!(database.parse_object_as_tree(&root).unwrap().is_empty());
    }

    #[rstest]
    fn file_and_directory_replace_each_other(store: Store) {
        let database = &store.database;
        let base = build(database, None, &[("thing", "file")]);
        let as_dir = build(database, Some(&base), &[("thing/inner", "i")]);

        let files = flatten_tree(database, &as_dir).unwrap();
        assert_eq!(
            files.keys().collect::<Vec<_>>(),
            vec![&PathBuf::from("thing/inner")]
        );
    }

    #[rstest]
    fn untouched_base_is_returned_as_is(store: Store) {
        let database = &store.database;
        let base = build(database, None, &[("a/b", "b")]);

        let builder = TreeBuilder::new(database, Some(&base)).unwrap();
        assert_eq!(builder.build().unwrap(), base);
    }

    #[rstest]
    #[case("../escape")]
    #[case("/absolute")]
    #[case("")]
    fn rejects_non_relative_paths(store: Store, #[case] path: &str) {
        let database = &store.database;
        let mut builder = TreeBuilder::new(database, None).unwrap();

        assert!(builder.stage(Path::new(path), file(database, "x")).is_err());
    }
}
