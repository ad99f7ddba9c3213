use crate::areas::database::Database;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;

/// Lazy first-parent walk from a starting commit back to a root commit.
///
/// Cloning a `RevList` restarts the walk from wherever the clone was taken. A
/// commit that cannot be loaded is yielded as an error and ends the walk.
#[derive(Debug, Clone)]
pub struct RevList<'d> {
    database: &'d Database,
    next_oid: Option<ObjectId>,
}

impl<'d> RevList<'d> {
    pub fn new(database: &'d Database, start: Option<ObjectId>) -> Self {
        RevList {
            database,
            next_oid: start,
        }
    }
}

impl Iterator for RevList<'_> {
    type Item = anyhow::Result<(ObjectId, Commit)>;

    fn next(&mut self) -> Option<Self::Item> {
        let oid = self.next_oid.take()?;

        match self.database.parse_object_as_commit(&oid) {
            Ok(commit) => {
                self.next_oid = commit.parent().cloned();
                Some(Ok((oid, commit)))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::commit::Author;
    use crate::artifacts::objects::tree::Tree;
    use chrono::DateTime;
    use pretty_assertions::assert_eq;

    fn commit(database: &Database, parents: Vec<ObjectId>, message: &str) -> ObjectId {
        let tree_oid = database.store(&Tree::new()).unwrap();
        let timestamp = DateTime::parse_from_rfc2822("Sun, 1 Jan 2023 10:00:00 +0000").unwrap();
        let author = Author::new_with_timestamp("Ada".into(), "ada@example.com".into(), timestamp);

        database
            .store(&Commit::new(parents, tree_oid, author, message.into()))
            .unwrap()
    }

    #[test]
    fn walks_first_parents_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::new(dir.path().join("objects").into_boxed_path());

        let a = commit(&database, vec![], "A");
        let b = commit(&database, vec![a.clone()], "B");
        let side = commit(&database, vec![a.clone()], "side");
        let c = commit(&database, vec![b.clone(), side], "C");

        let walk = RevList::new(&database, Some(c.clone()));
        let oids = walk
            .clone()
            .map(|item| item.unwrap().0)
            .collect::<Vec<_>>();
        assert_eq!(oids, vec![c, b, a]);

        // the walk can be replayed from a clone
        assert_eq!(walk.count(), 3);
    }

    #[test]
    fn empty_start_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::new(dir.path().join("objects").into_boxed_path());

        assert_eq!(RevList::new(&database, None).count(), 0);
    }

    #[test]
    fn missing_parent_ends_the_walk_with_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::new(dir.path().join("objects").into_boxed_path());
        let dangling = crate::artifacts::codec::hash(b"no such commit");
        let head = commit(&database, vec![dangling], "orphan");

        let items = RevList::new(&database, Some(head)).collect::<Vec<_>>();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }
}
