use crate::areas::database::Database;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::objects::object_id::ObjectId;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Every file reachable from a tree, keyed by its path relative to that tree
pub type FlatTree = BTreeMap<PathBuf, DatabaseEntry>;

/// Walk the tree `oid` with an explicit stack and collect its blob entries.
pub fn flatten_tree(database: &Database, oid: &ObjectId) -> anyhow::Result<FlatTree> {
    let mut files = FlatTree::new();
    let mut pending = vec![(PathBuf::new(), oid.clone())];

    while let Some((prefix, tree_oid)) = pending.pop() {
        let tree = database.parse_object_as_tree(&tree_oid)?;

        for (name, entry) in tree.into_entries() {
            let path = prefix.join(name);

            if entry.is_tree() {
                pending.push((path, entry.oid));
            } else {
                files.insert(path, entry);
            }
        }
    }

    Ok(files)
}
